//! Abstract interpretation of method bodies. The engine walks basic blocks
//! in reverse post-order to a fixpoint, tracking an abstract operand stack
//! and local-variable table per program point, and projects every reachable
//! return into an [`HttpResponse`].
//!
//! Long/double values occupy two slots (value below, [`AbstractValue::Pad`]
//! above) so the generic stack instructions behave like the real machine.

pub(crate) mod instructions;
pub(crate) mod value;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    class::{BootstrapMethod, Class, MethodInfo, MethodRef},
    descriptor::{parse_field_descriptor, parse_method_descriptor, FieldType, ReturnType},
    model::{HttpResponse, MethodIdentifier, UNKNOWN_STATUS},
    names,
    pool::ClassPool,
};

use instructions as inst;
use value::{value_of_type, AbstractValue, ResponseState};

const DEFAULT_ITERATION_CAP: usize = 50;
const INLINE_DEPTH_CAP: usize = 8;

pub(crate) struct Interpreter<'p> {
    pool: &'p ClassPool,
    iteration_cap: usize,
}

pub(crate) struct Simulation {
    pub(crate) responses: BTreeSet<HttpResponse>,
    pub(crate) invoked: BTreeSet<MethodIdentifier>,
}

#[derive(Debug, Clone, PartialEq)]
enum Returned {
    Value(AbstractValue),
    Void,
}

impl<'p> Interpreter<'p> {
    pub(crate) fn new(pool: &'p ClassPool) -> Self {
        Self {
            pool,
            iteration_cap: DEFAULT_ITERATION_CAP,
        }
    }

    #[allow(dead_code)]
    pub(crate) fn with_iteration_cap(mut self, cap: usize) -> Self {
        self.iteration_cap = cap;
        self
    }

    /// Infers every response the given method may produce.
    pub(crate) fn simulate(&self, class: &Class, method: &MethodInfo) -> Simulation {
        let mut seen = HashSet::new();
        let mut invoked = BTreeSet::new();
        let returned = self.simulate_values(class, method, 0, &mut seen, &mut invoked);

        let declared = method
            .descriptor(class)
            .and_then(|d| parse_method_descriptor(&d).ok().map(|(_, d)| d.return_type));

        let responses = returned
            .iter()
            .filter_map(|r| project_return(r, declared.as_ref()))
            .collect();

        Simulation { responses, invoked }
    }

    /// Runs the engine and collects the abstract values flowing into return
    /// instructions. Used directly for inlined callees.
    fn simulate_values(
        &self,
        class: &Class,
        method: &MethodInfo,
        depth: usize,
        seen: &mut HashSet<MethodIdentifier>,
        invoked: &mut BTreeSet<MethodIdentifier>,
    ) -> Vec<Returned> {
        let Some(code_attr) = class.decode_code(&method.attributes) else {
            return Vec::new();
        };
        let Some(descriptor) = method
            .descriptor(class)
            .and_then(|d| parse_method_descriptor(&d).ok().map(|(_, d)| d))
        else {
            return Vec::new();
        };

        let code = &code_attr.code;
        let flow = match Flow::build(code, &code_attr.exception_table) {
            Some(flow) => flow,
            None => {
                warn!(
                    class = %class.this_class_name().unwrap_or_else(|| Arc::from("?")),
                    "method body not decodable, skipping inference"
                );
                return Vec::new();
            }
        };

        let is_static = method
            .access_flags
            .contains(crate::consts::MethodAccessFlag::STATIC);
        let entry = entry_state(
            class,
            &descriptor.parameters,
            is_static,
            code_attr.max_locals as usize,
        );

        let mut run = MethodRun {
            interp: self,
            class,
            code,
            bootstrap: class.bootstrap_methods(),
            depth,
            seen,
            invoked,
            returns: Vec::new(),
        };
        run.fixpoint(&flow, entry);
        run.returns
    }
}

/// One abstract machine state: operand stack plus local-variable table.
#[derive(Debug, Clone, PartialEq)]
struct MachineState {
    stack: Vec<AbstractValue>,
    locals: Vec<AbstractValue>,
}

impl MachineState {
    fn push(&mut self, value: AbstractValue) {
        self.stack.push(value);
    }

    fn push_wide(&mut self, value: AbstractValue) {
        self.stack.push(value);
        self.stack.push(AbstractValue::Pad);
    }

    fn pop(&mut self) -> AbstractValue {
        self.stack.pop().unwrap_or(AbstractValue::Unknown)
    }

    /// Pops a two-slot value (pad above, value below).
    fn pop_wide(&mut self) -> AbstractValue {
        self.pop();
        self.pop()
    }

    fn set_local(&mut self, index: usize, value: AbstractValue) {
        if index >= self.locals.len() {
            self.locals.resize(index + 1, AbstractValue::Unknown);
        }
        self.locals[index] = value;
    }

    fn local(&self, index: usize) -> AbstractValue {
        self.locals.get(index).cloned().unwrap_or(AbstractValue::Unknown)
    }

    fn widen(&mut self) {
        for value in self.stack.iter_mut().chain(self.locals.iter_mut()) {
            if !matches!(value, AbstractValue::Pad) {
                *value = AbstractValue::Unknown;
            }
        }
    }
}

fn join_states(a: &MachineState, b: &MachineState) -> MachineState {
    let depth = a.stack.len().min(b.stack.len());
    let stack = a.stack[..depth]
        .iter()
        .zip(&b.stack[..depth])
        .map(|(x, y)| x.join(y))
        .collect();
    let len = a.locals.len().max(b.locals.len());
    let locals = (0..len)
        .map(|i| {
            match (a.locals.get(i), b.locals.get(i)) {
                (Some(x), Some(y)) => x.join(y),
                _ => AbstractValue::Unknown,
            }
        })
        .collect();
    MachineState { stack, locals }
}

fn entry_state(
    class: &Class,
    parameters: &[FieldType],
    is_static: bool,
    max_locals: usize,
) -> MachineState {
    let mut locals = Vec::with_capacity(max_locals);
    if !is_static {
        let this_type = class
            .this_class_name()
            .map(|name| FieldType::Object(name.to_string()))
            .unwrap_or_else(|| FieldType::Object(names::OBJECT.to_string()));
        locals.push(AbstractValue::TypeRef(this_type));
    }
    for param in parameters {
        locals.push(value_of_type(param));
        if param.is_long() {
            locals.push(AbstractValue::Pad);
        }
    }
    locals.resize(max_locals.max(locals.len()), AbstractValue::Unknown);
    MachineState {
        stack: Vec::new(),
        locals,
    }
}

/// Basic-block structure of one method body.
struct Flow {
    blocks: Vec<Block>,
    /// Blocks that enter the graph with a pre-seeded state (entry, handlers).
    roots: Vec<(usize, Option<FieldType>)>,
    rpo_position: Vec<usize>,
}

struct Block {
    start: usize,
    end: usize,
    successors: Vec<usize>,
}

impl Flow {
    fn build(code: &[u8], exception_table: &[crate::class::ExceptionTableItem]) -> Option<Self> {
        if code.is_empty() {
            return None;
        }

        // instruction boundaries
        let mut starts = Vec::new();
        let mut pc = 0usize;
        while pc < code.len() {
            starts.push(pc);
            pc += insn_length(code, pc)?;
        }
        let start_set: BTreeSet<usize> = starts.iter().copied().collect();

        // block leaders: entry, branch targets, fall-throughs after
        // branches/terminators, exception handlers
        let mut leaders: BTreeSet<usize> = BTreeSet::new();
        leaders.insert(0);
        for &pc in &starts {
            let op = code[pc];
            let len = insn_length(code, pc)?;
            let next = pc + len;
            if is_branch(op) {
                for target in branch_targets(code, pc) {
                    if !start_set.contains(&target) {
                        return None;
                    }
                    leaders.insert(target);
                }
                if next < code.len() {
                    leaders.insert(next);
                }
            } else if is_terminator(op) && next < code.len() {
                leaders.insert(next);
            }
        }
        let mut handler_catches: BTreeMap<usize, Option<FieldType>> = BTreeMap::new();
        for item in exception_table {
            let handler = item.handler_pc as usize;
            if !start_set.contains(&handler) {
                return None;
            }
            leaders.insert(handler);
            let catch_type = item
                .catch_type
                .as_ref()
                .map(|name| FieldType::Object(name.to_string()));
            handler_catches.entry(handler).or_insert(catch_type);
        }

        // blocks from consecutive leaders
        let leader_list: Vec<usize> = leaders.iter().copied().collect();
        let mut block_of: HashMap<usize, usize> = HashMap::new();
        for (index, &leader) in leader_list.iter().enumerate() {
            block_of.insert(leader, index);
        }
        let mut blocks = Vec::with_capacity(leader_list.len());
        for (index, &leader) in leader_list.iter().enumerate() {
            let end = leader_list
                .get(index + 1)
                .copied()
                .unwrap_or(code.len());
            // last instruction of the block decides the successors
            let mut last = leader;
            let mut pc = leader;
            while pc < end {
                last = pc;
                pc += insn_length(code, pc)?;
            }
            let op = code[last];
            let mut successors = Vec::new();
            if is_branch(op) {
                for target in branch_targets(code, last) {
                    successors.push(block_of[&target]);
                }
                if is_conditional(op) {
                    let next = last + insn_length(code, last)?;
                    if let Some(&next_block) = block_of.get(&next) {
                        successors.push(next_block);
                    }
                }
            } else if !is_terminator(op) && end < code.len() {
                if let Some(&next_block) = block_of.get(&end) {
                    successors.push(next_block);
                }
            }
            successors.dedup();
            blocks.push(Block {
                start: leader,
                end,
                successors,
            });
        }

        let mut roots = vec![(0usize, None)];
        for (&handler, catch_type) in &handler_catches {
            roots.push((block_of[&handler], catch_type.clone()));
        }

        // reverse post-order from all roots
        let mut visited = vec![false; blocks.len()];
        let mut post = Vec::with_capacity(blocks.len());
        for &(root, _) in &roots {
            dfs_post_order(&blocks, root, &mut visited, &mut post);
        }
        let mut rpo_position = vec![usize::MAX; blocks.len()];
        for (position, &block) in post.iter().rev().enumerate() {
            rpo_position[block] = position;
        }

        Some(Flow {
            blocks,
            roots,
            rpo_position,
        })
    }
}

fn dfs_post_order(blocks: &[Block], root: usize, visited: &mut [bool], post: &mut Vec<usize>) {
    if visited[root] {
        return;
    }
    // iterative so deeply branched bodies cannot blow the native stack
    let mut stack = vec![(root, 0usize)];
    visited[root] = true;
    while let Some(frame) = stack.last_mut() {
        let block = frame.0;
        if frame.1 < blocks[block].successors.len() {
            let next = blocks[block].successors[frame.1];
            frame.1 += 1;
            if !visited[next] {
                visited[next] = true;
                stack.push((next, 0));
            }
        } else {
            post.push(block);
            stack.pop();
        }
    }
}

struct MethodRun<'a, 'p> {
    interp: &'a Interpreter<'p>,
    class: &'a Class,
    code: &'a [u8],
    bootstrap: Vec<BootstrapMethod>,
    depth: usize,
    seen: &'a mut HashSet<MethodIdentifier>,
    invoked: &'a mut BTreeSet<MethodIdentifier>,
    returns: Vec<Returned>,
}

impl MethodRun<'_, '_> {
    fn fixpoint(&mut self, flow: &Flow, entry: MachineState) {
        let cap = self.interp.iteration_cap;
        let block_count = flow.blocks.len();
        let mut in_states: Vec<Option<MachineState>> = vec![None; block_count];
        let mut visits = vec![0usize; block_count];
        let mut widened = vec![false; block_count];
        let mut limit_hit = false;

        // worklist ordered by reverse post-order position
        let mut worklist: BTreeSet<(usize, usize)> = BTreeSet::new();
        for &(root, ref catch_type) in &flow.roots {
            let mut state = entry.clone();
            if let Some(catch) = catch_type {
                state.stack = vec![AbstractValue::TypeRef(catch.clone())];
            } else if root != 0 {
                state.stack = vec![AbstractValue::Unknown];
            }
            in_states[root] = Some(match in_states[root].take() {
                Some(existing) => join_states(&existing, &state),
                None => state,
            });
            worklist.insert((flow.rpo_position[root], root));
        }

        while let Some(&(position, block_index)) = worklist.iter().next() {
            worklist.remove(&(position, block_index));

            visits[block_index] += 1;
            if visits[block_index] > cap * 2 {
                continue;
            }
            if visits[block_index] > cap && !widened[block_index] {
                if let Some(state) = in_states[block_index].as_mut() {
                    state.widen();
                }
                widened[block_index] = true;
                limit_hit = true;
            }

            let Some(state) = in_states[block_index].clone() else {
                continue;
            };
            let out = self.exec_block(&flow.blocks[block_index], state);
            let Some(out) = out else {
                continue;
            };

            for &successor in &flow.blocks[block_index].successors {
                let merged = match &in_states[successor] {
                    Some(existing) => join_states(existing, &out),
                    None => out.clone(),
                };
                if in_states[successor].as_ref() != Some(&merged) {
                    in_states[successor] = Some(merged);
                    worklist.insert((flow.rpo_position[successor], successor));
                }
            }
        }

        if limit_hit {
            debug!(
                class = %self.class.this_class_name().unwrap_or_else(|| Arc::from("?")),
                "fixpoint iteration cap reached, state widened to unknown"
            );
        }
    }

    /// Executes one basic block; `None` when the block ends in a return or
    /// throw (no fall-through state).
    fn exec_block(&mut self, block: &Block, mut state: MachineState) -> Option<MachineState> {
        let mut pc = block.start;
        while pc < block.end {
            let op = self.code[pc];
            let len = insn_length(self.code, pc).expect("validated by Flow::build");
            if !self.exec_insn(op, pc, &mut state) {
                return None;
            }
            pc += len;
        }
        Some(state)
    }

    /// Executes one instruction; returns false for returns and throws.
    fn exec_insn(&mut self, op: u8, pc: usize, state: &mut MachineState) -> bool {
        use AbstractValue::*;
        let code = self.code;
        match op {
            inst::NOP => {}

            // constants
            inst::ACONST_NULL => state.push(Null),
            inst::ICONST_M1..=inst::ICONST_5 => {
                state.push(IntLiteral(op as i64 - inst::ICONST_0 as i64));
            }
            inst::LCONST_0 | inst::LCONST_1 => {
                state.push_wide(IntLiteral((op - inst::LCONST_0) as i64));
            }
            inst::FCONST_0..=inst::FCONST_2 => state.push(Primitive(FieldType::Float)),
            inst::DCONST_0 | inst::DCONST_1 => state.push_wide(Primitive(FieldType::Double)),
            inst::BIPUSH => state.push(IntLiteral(code[pc + 1] as i8 as i64)),
            inst::SIPUSH => state.push(IntLiteral(i16_at(code, pc + 1) as i64)),
            inst::LDC => self.ldc(code[pc + 1] as u16, state),
            inst::LDC_W => self.ldc(u16_at(code, pc + 1), state),
            inst::LDC2_W => {
                let value = match self.class.constant(u16_at(code, pc + 1)) {
                    Some(crate::class::ConstantPoolInfo::Long(v)) => IntLiteral(*v),
                    Some(crate::class::ConstantPoolInfo::Double(_)) => {
                        Primitive(FieldType::Double)
                    }
                    _ => Unknown,
                };
                state.push_wide(value);
            }

            // loads
            inst::ILOAD | inst::FLOAD | inst::ALOAD => {
                let value = state.local(code[pc + 1] as usize);
                state.push(value);
            }
            inst::LLOAD | inst::DLOAD => {
                let value = state.local(code[pc + 1] as usize);
                state.push_wide(value);
            }
            inst::ILOAD_0..=inst::ILOAD_3 => {
                let value = state.local((op - inst::ILOAD_0) as usize);
                state.push(value);
            }
            inst::LLOAD_0..=inst::LLOAD_3 => {
                let value = state.local((op - inst::LLOAD_0) as usize);
                state.push_wide(value);
            }
            inst::FLOAD_0..=inst::FLOAD_3 => {
                let value = state.local((op - inst::FLOAD_0) as usize);
                state.push(value);
            }
            inst::DLOAD_0..=inst::DLOAD_3 => {
                let value = state.local((op - inst::DLOAD_0) as usize);
                state.push_wide(value);
            }
            inst::ALOAD_0..=inst::ALOAD_3 => {
                let value = state.local((op - inst::ALOAD_0) as usize);
                state.push(value);
            }

            // array loads
            inst::IALOAD | inst::BALOAD | inst::CALOAD | inst::SALOAD => {
                state.pop();
                state.pop();
                state.push(Primitive(FieldType::Int));
            }
            inst::LALOAD => {
                state.pop();
                state.pop();
                state.push_wide(Primitive(FieldType::Long));
            }
            inst::FALOAD => {
                state.pop();
                state.pop();
                state.push(Primitive(FieldType::Float));
            }
            inst::DALOAD => {
                state.pop();
                state.pop();
                state.push_wide(Primitive(FieldType::Double));
            }
            inst::AALOAD => {
                let index = state.pop();
                let array = state.pop();
                let value = match (&array, &index) {
                    (ArrayRef { contents, .. }, IntLiteral(i))
                        if (0..contents.len() as i64).contains(i) =>
                    {
                        contents[*i as usize].clone()
                    }
                    (ArrayRef { element, .. }, _) => value_of_type(element),
                    _ => Unknown,
                };
                state.push(value);
            }

            // stores
            inst::ISTORE | inst::FSTORE | inst::ASTORE => {
                let value = state.pop();
                state.set_local(code[pc + 1] as usize, value);
            }
            inst::LSTORE | inst::DSTORE => {
                let value = state.pop_wide();
                let index = code[pc + 1] as usize;
                state.set_local(index, value);
                state.set_local(index + 1, Pad);
            }
            inst::ISTORE_0..=inst::ISTORE_3 => {
                let value = state.pop();
                state.set_local((op - inst::ISTORE_0) as usize, value);
            }
            inst::LSTORE_0..=inst::LSTORE_3 => {
                let value = state.pop_wide();
                let index = (op - inst::LSTORE_0) as usize;
                state.set_local(index, value);
                state.set_local(index + 1, Pad);
            }
            inst::FSTORE_0..=inst::FSTORE_3 => {
                let value = state.pop();
                state.set_local((op - inst::FSTORE_0) as usize, value);
            }
            inst::DSTORE_0..=inst::DSTORE_3 => {
                let value = state.pop_wide();
                let index = (op - inst::DSTORE_0) as usize;
                state.set_local(index, value);
                state.set_local(index + 1, Pad);
            }
            inst::ASTORE_0..=inst::ASTORE_3 => {
                let value = state.pop();
                state.set_local((op - inst::ASTORE_0) as usize, value);
            }

            // array stores
            inst::IASTORE | inst::FASTORE | inst::BASTORE | inst::CASTORE | inst::SASTORE => {
                state.pop();
                state.pop();
                state.pop();
            }
            inst::LASTORE | inst::DASTORE => {
                state.pop_wide();
                state.pop();
                state.pop();
            }
            inst::AASTORE => {
                let value = state.pop();
                let index = state.pop();
                let array = state.pop();
                // the usual anewarray/dup/aastore sequence leaves the dup'd
                // copy on the stack: patch it so contents stay visible
                if let (ArrayRef { contents, .. }, IntLiteral(i)) = (&array, &index) {
                    let i = *i;
                    if (0..contents.len() as i64).contains(&i) {
                        if let Some(top) = state.stack.last_mut() {
                            if *top == array {
                                if let ArrayRef { contents, .. } = top {
                                    contents[i as usize] = value;
                                }
                            }
                        }
                    }
                }
            }

            // stack shuffling
            inst::POP => {
                state.pop();
            }
            inst::POP2 => {
                state.pop();
                state.pop();
            }
            inst::DUP => {
                let top = state.pop();
                state.push(top.clone());
                state.push(top);
            }
            inst::DUP_X1 => {
                let v1 = state.pop();
                let v2 = state.pop();
                state.push(v1.clone());
                state.push(v2);
                state.push(v1);
            }
            inst::DUP_X2 => {
                let v1 = state.pop();
                let v2 = state.pop();
                let v3 = state.pop();
                state.push(v1.clone());
                state.push(v3);
                state.push(v2);
                state.push(v1);
            }
            inst::DUP2 => {
                let v1 = state.pop();
                let v2 = state.pop();
                state.push(v2.clone());
                state.push(v1.clone());
                state.push(v2);
                state.push(v1);
            }
            inst::DUP2_X1 => {
                let v1 = state.pop();
                let v2 = state.pop();
                let v3 = state.pop();
                state.push(v2.clone());
                state.push(v1.clone());
                state.push(v3);
                state.push(v2);
                state.push(v1);
            }
            inst::DUP2_X2 => {
                let v1 = state.pop();
                let v2 = state.pop();
                let v3 = state.pop();
                let v4 = state.pop();
                state.push(v2.clone());
                state.push(v1.clone());
                state.push(v4);
                state.push(v3);
                state.push(v2);
                state.push(v1);
            }
            inst::SWAP => {
                let v1 = state.pop();
                let v2 = state.pop();
                state.push(v1);
                state.push(v2);
            }

            // arithmetic
            inst::IADD..=inst::LXOR => self.arithmetic(op, state),
            inst::IINC => {
                let index = code[pc + 1] as usize;
                let delta = code[pc + 2] as i8 as i64;
                if let IntLiteral(v) = state.local(index) {
                    state.set_local(index, IntLiteral(v.wrapping_add(delta)));
                }
            }

            // conversions
            inst::I2L => {
                let value = state.pop();
                state.push_wide(match value {
                    IntLiteral(v) => IntLiteral(v),
                    _ => Primitive(FieldType::Long),
                });
            }
            0x86 => {
                state.pop();
                state.push(Primitive(FieldType::Float));
            }
            inst::I2D => {
                state.pop();
                state.push_wide(Primitive(FieldType::Double));
            }
            inst::L2I => {
                let value = state.pop_wide();
                state.push(match value {
                    IntLiteral(v) => IntLiteral(v as i32 as i64),
                    _ => Primitive(FieldType::Int),
                });
            }
            0x89 => {
                state.pop_wide();
                state.push(Primitive(FieldType::Float));
            }
            inst::L2D => {
                state.pop_wide();
                state.push_wide(Primitive(FieldType::Double));
            }
            inst::F2I => {
                state.pop();
                state.push(Primitive(FieldType::Int));
            }
            0x8c => {
                state.pop();
                state.push_wide(Primitive(FieldType::Long));
            }
            inst::F2D => {
                state.pop();
                state.push_wide(Primitive(FieldType::Double));
            }
            inst::D2I => {
                state.pop_wide();
                state.push(Primitive(FieldType::Int));
            }
            inst::D2L => {
                state.pop_wide();
                state.push_wide(Primitive(FieldType::Long));
            }
            inst::D2F => {
                state.pop_wide();
                state.push(Primitive(FieldType::Float));
            }
            inst::I2B => {
                let value = state.pop();
                state.push(match value {
                    IntLiteral(v) => IntLiteral(v as i8 as i64),
                    _ => Primitive(FieldType::Int),
                });
            }
            0x92 => {
                let value = state.pop();
                state.push(match value {
                    IntLiteral(v) => IntLiteral(v as u16 as i64),
                    _ => Primitive(FieldType::Int),
                });
            }
            inst::I2S => {
                let value = state.pop();
                state.push(match value {
                    IntLiteral(v) => IntLiteral(v as i16 as i64),
                    _ => Primitive(FieldType::Int),
                });
            }

            // comparisons feeding a branch
            inst::LCMP => {
                state.pop_wide();
                state.pop_wide();
                state.push(Primitive(FieldType::Int));
            }
            0x95 | 0x96 => {
                state.pop();
                state.pop();
                state.push(Primitive(FieldType::Int));
            }
            0x97 | inst::DCMPG => {
                state.pop_wide();
                state.pop_wide();
                state.push(Primitive(FieldType::Int));
            }

            // branches: operands popped here, targets handled by the CFG
            inst::IFEQ..=inst::IFLE | inst::IFNULL | inst::IFNONNULL => {
                state.pop();
            }
            inst::IF_ICMPEQ..=inst::IF_ACMPNE => {
                state.pop();
                state.pop();
            }
            inst::GOTO | inst::GOTO_W => {}
            inst::JSR | inst::JSR_W => state.push(Unknown),
            inst::RET => {}
            inst::TABLESWITCH | inst::LOOKUPSWITCH => {
                state.pop();
            }

            // returns
            inst::IRETURN | inst::FRETURN => {
                let value = state.pop();
                self.record_return(Returned::Value(value));
                return false;
            }
            inst::LRETURN | inst::DRETURN => {
                let value = state.pop_wide();
                self.record_return(Returned::Value(value));
                return false;
            }
            inst::ARETURN => {
                let value = state.pop();
                self.record_return(Returned::Value(value));
                return false;
            }
            inst::RETURN => {
                self.record_return(Returned::Void);
                return false;
            }

            // fields
            inst::GETSTATIC => {
                let value = self.getstatic(u16_at(code, pc + 1));
                match value {
                    Some(v) if v.is_wide() => state.push_wide(v),
                    Some(v) => state.push(v),
                    None => state.push(Unknown),
                }
            }
            inst::PUTSTATIC => {
                self.pop_field_value(u16_at(code, pc + 1), state);
            }
            inst::GETFIELD => {
                state.pop();
                let value = self.field_value(u16_at(code, pc + 1));
                match value {
                    Some(v) if v.is_wide() => state.push_wide(v),
                    Some(v) => state.push(v),
                    None => state.push(Unknown),
                }
            }
            inst::PUTFIELD => {
                self.pop_field_value(u16_at(code, pc + 1), state);
                state.pop();
            }

            // invocations
            inst::INVOKEVIRTUAL | inst::INVOKEINTERFACE => {
                if let Some(method_ref) = self.class.resolve_method_ref(u16_at(code, pc + 1)) {
                    self.invoke(&method_ref, true, state);
                }
            }
            inst::INVOKESPECIAL => {
                if let Some(method_ref) = self.class.resolve_method_ref(u16_at(code, pc + 1)) {
                    self.invoke(&method_ref, true, state);
                }
            }
            inst::INVOKESTATIC => {
                if let Some(method_ref) = self.class.resolve_method_ref(u16_at(code, pc + 1)) {
                    self.invoke(&method_ref, false, state);
                }
            }
            inst::INVOKEDYNAMIC => {
                self.invokedynamic(u16_at(code, pc + 1), state);
            }

            // objects & arrays
            inst::NEW => {
                let value = self
                    .class
                    .resolve_class_name(u16_at(code, pc + 1))
                    .map(|name| {
                        if names::is_new_cookie(&name) {
                            CookieRef(None)
                        } else {
                            TypeRef(FieldType::Object(name.to_string()))
                        }
                    })
                    .unwrap_or(Unknown);
                state.push(value);
            }
            inst::NEWARRAY => {
                state.pop();
                let element = match code[pc + 1] {
                    4 => FieldType::Boolean,
                    5 => FieldType::Char,
                    6 => FieldType::Float,
                    7 => FieldType::Double,
                    8 => FieldType::Byte,
                    9 => FieldType::Short,
                    11 => FieldType::Long,
                    _ => FieldType::Int,
                };
                state.push(ArrayRef {
                    element,
                    contents: Vec::new(),
                });
            }
            inst::ANEWARRAY => {
                let count = state.pop();
                let element = self
                    .class
                    .resolve_class_name(u16_at(code, pc + 1))
                    .map(|name| class_name_to_type(&name))
                    .unwrap_or(FieldType::Object(names::OBJECT.to_string()));
                let contents = match count {
                    IntLiteral(n) if (0..=16).contains(&n) => vec![Null; n as usize],
                    _ => Vec::new(),
                };
                state.push(ArrayRef { element, contents });
            }
            inst::ARRAYLENGTH => {
                state.pop();
                state.push(Primitive(FieldType::Int));
            }
            inst::ATHROW => {
                state.pop();
                return false;
            }
            inst::CHECKCAST => {
                let value = state.pop();
                let kept = match &value {
                    Builder(_) | Response(_) | StringLiteral(_) | Handle(_) | CookieRef(_)
                    | ArrayRef { .. } => value,
                    _ => self
                        .class
                        .resolve_class_name(u16_at(code, pc + 1))
                        .map(|name| TypeRef(class_name_to_type(&name)))
                        .unwrap_or(Unknown),
                };
                state.push(kept);
            }
            inst::INSTANCEOF => {
                state.pop();
                state.push(Primitive(FieldType::Int));
            }
            inst::MONITORENTER | inst::MONITOREXIT => {
                state.pop();
            }
            inst::WIDE => {
                self.exec_wide(pc, state);
            }
            inst::MULTIANEWARRAY => {
                let dimensions = code[pc + 3] as usize;
                for _ in 0..dimensions {
                    state.pop();
                }
                let element = self
                    .class
                    .resolve_class_name(u16_at(code, pc + 1))
                    .map(|name| class_name_to_type(&name))
                    .unwrap_or(FieldType::Object(names::OBJECT.to_string()));
                state.push(TypeRef(element));
            }

            _ => {
                // unreachable: Flow::build rejects unknown opcodes
                debug!(opcode = op, "unmodeled instruction, stack left as-is");
            }
        }
        true
    }

    fn exec_wide(&mut self, pc: usize, state: &mut MachineState) {
        let code = self.code;
        let op = code[pc + 1];
        let index = u16_at(code, pc + 2) as usize;
        match op {
            inst::ILOAD | inst::FLOAD | inst::ALOAD => {
                let value = state.local(index);
                state.push(value);
            }
            inst::LLOAD | inst::DLOAD => {
                let value = state.local(index);
                state.push_wide(value);
            }
            inst::ISTORE | inst::FSTORE | inst::ASTORE => {
                let value = state.pop();
                state.set_local(index, value);
            }
            inst::LSTORE | inst::DSTORE => {
                let value = state.pop_wide();
                state.set_local(index, value);
                state.set_local(index + 1, AbstractValue::Pad);
            }
            inst::IINC => {
                let delta = i16_at(code, pc + 4) as i64;
                if let AbstractValue::IntLiteral(v) = state.local(index) {
                    state.set_local(index, AbstractValue::IntLiteral(v.wrapping_add(delta)));
                }
            }
            _ => {}
        }
    }

    fn arithmetic(&mut self, op: u8, state: &mut MachineState) {
        use AbstractValue::*;
        let fold = |a: &AbstractValue, b: &AbstractValue, f: fn(i64, i64) -> Option<i64>| {
            match (a, b) {
                (IntLiteral(x), IntLiteral(y)) => f(*x, *y).map(IntLiteral),
                _ => None,
            }
        };
        match op {
            // int binary
            0x60 | 0x64 | 0x68 | 0x6c | 0x70 | 0x78 | 0x7a | 0x7c | 0x7e | 0x80 | 0x82 => {
                let b = state.pop();
                let a = state.pop();
                let folded = fold(&a, &b, int_fold_fn(op));
                state.push(folded.unwrap_or(Primitive(FieldType::Int)));
            }
            // long binary
            0x61 | 0x65 | 0x69 | 0x6d | 0x71 | 0x7f | 0x81 | 0x83 => {
                let b = state.pop_wide();
                let a = state.pop_wide();
                let folded = fold(&a, &b, int_fold_fn(op));
                state.push_wide(folded.unwrap_or(Primitive(FieldType::Long)));
            }
            // long shift: int count above a wide value
            0x79 | 0x7b | 0x7d => {
                state.pop();
                let value = state.pop_wide();
                state.push_wide(match value {
                    v @ IntLiteral(_) => v,
                    _ => Primitive(FieldType::Long),
                });
            }
            // float binary
            0x62 | 0x66 | 0x6a | 0x6e | 0x72 => {
                state.pop();
                state.pop();
                state.push(Primitive(FieldType::Float));
            }
            // double binary
            0x63 | 0x67 | 0x6b | 0x6f | inst::DREM => {
                state.pop_wide();
                state.pop_wide();
                state.push_wide(Primitive(FieldType::Double));
            }
            inst::INEG => {
                let value = state.pop();
                state.push(match value {
                    IntLiteral(v) => IntLiteral(v.wrapping_neg()),
                    _ => Primitive(FieldType::Int),
                });
            }
            0x75 => {
                let value = state.pop_wide();
                state.push_wide(match value {
                    IntLiteral(v) => IntLiteral(v.wrapping_neg()),
                    _ => Primitive(FieldType::Long),
                });
            }
            0x76 => {
                state.pop();
                state.push(Primitive(FieldType::Float));
            }
            inst::DNEG => {
                state.pop_wide();
                state.push_wide(Primitive(FieldType::Double));
            }
            _ => {}
        }
    }

    fn ldc(&mut self, index: u16, state: &mut MachineState) {
        use crate::class::ConstantPoolInfo as Cpi;
        let value = match self.class.constant(index) {
            Some(Cpi::Integer(v)) => AbstractValue::IntLiteral(*v as i64),
            Some(Cpi::Float(_)) => AbstractValue::Primitive(FieldType::Float),
            Some(Cpi::String { string_index }) => self
                .class
                .resolve_utf8(*string_index)
                .map(AbstractValue::StringLiteral)
                .unwrap_or(AbstractValue::Unknown),
            Some(Cpi::Class { .. }) => {
                AbstractValue::TypeRef(FieldType::Object("java/lang/Class".to_string()))
            }
            Some(Cpi::MethodHandle { .. }) => self
                .class
                .resolve_method_handle(index)
                .map(AbstractValue::Handle)
                .unwrap_or(AbstractValue::Unknown),
            _ => AbstractValue::Unknown,
        };
        state.push(value);
    }

    fn field_value(&self, index: u16) -> Option<AbstractValue> {
        let field_ref = self.class.resolve_field_ref(index)?;
        let (_, descriptor) = parse_field_descriptor(&field_ref.descriptor).ok()?;
        Some(value_of_type(&descriptor.0))
    }

    fn getstatic(&self, index: u16) -> Option<AbstractValue> {
        let field_ref = self.class.resolve_field_ref(index)?;
        if names::is_response_status(&field_ref.class_name) {
            if let Some(code) = names::status_code_of(&field_ref.name) {
                return Some(AbstractValue::IntLiteral(code as i64));
            }
        }
        let (_, descriptor) = parse_field_descriptor(&field_ref.descriptor).ok()?;
        Some(value_of_type(&descriptor.0))
    }

    fn pop_field_value(&self, index: u16, state: &mut MachineState) {
        let wide = self
            .class
            .resolve_field_ref(index)
            .and_then(|f| parse_field_descriptor(&f.descriptor).ok().map(|(_, d)| d.0.is_long()))
            .unwrap_or(false);
        if wide {
            state.pop_wide();
        } else {
            state.pop();
        }
    }

    fn pop_arguments(
        &self,
        parameters: &[FieldType],
        state: &mut MachineState,
    ) -> Vec<AbstractValue> {
        let mut args = Vec::with_capacity(parameters.len());
        for parameter in parameters.iter().rev() {
            if parameter.is_long() {
                args.push(state.pop_wide());
            } else {
                args.push(state.pop());
            }
        }
        args.reverse();
        args
    }

    fn push_by_type(&self, return_type: &ReturnType, state: &mut MachineState) {
        if let Some(t) = return_type {
            let value = if names::is_response_builder(t.internal_name().unwrap_or("")) {
                AbstractValue::Builder(ResponseState::unknown())
            } else {
                value_of_type(t)
            };
            if t.is_long() {
                state.push_wide(value);
            } else {
                state.push(value);
            }
        }
    }

    fn invoke(&mut self, method_ref: &MethodRef, has_receiver: bool, state: &mut MachineState) {
        let Ok((_, descriptor)) = parse_method_descriptor(&method_ref.descriptor) else {
            return;
        };
        let args = self.pop_arguments(&descriptor.parameters, state);
        let receiver = has_receiver.then(|| state.pop());

        // framework response factories
        if !has_receiver && names::is_response(&method_ref.class_name) {
            if let Some(builder_state) = response_factory(&method_ref.name, &args) {
                state.push(AbstractValue::Builder(builder_state));
                return;
            }
            self.push_by_type(&descriptor.return_type, state);
            return;
        }

        // builder operations
        if names::is_response_builder(&method_ref.class_name) {
            if let Some(AbstractValue::Builder(builder_state)) = receiver {
                let result = builder_op(builder_state, &method_ref.name, &args);
                state.push(result);
                return;
            }
            self.push_by_type(&descriptor.return_type, state);
            return;
        }

        // cookie construction: name stays visible on the dup'd copy
        if method_ref.name.as_ref() == "<init>" && names::is_new_cookie(&method_ref.class_name) {
            if let Some(AbstractValue::StringLiteral(name)) = args.first() {
                let cookie = AbstractValue::CookieRef(Some(Arc::clone(name)));
                if let Some(top) = state.stack.last_mut() {
                    if matches!(top, AbstractValue::CookieRef(None)) {
                        *top = cookie;
                    }
                }
            }
            return;
        }

        // functional-interface call on a captured method reference
        if let Some(AbstractValue::Handle(target)) = &receiver {
            let target = target.clone();
            let target_binary = names::to_binary_name(&target.class_name);
            if self.interp.pool.is_project_class(&target_binary) {
                self.invoked.insert(MethodIdentifier {
                    class_name: target_binary,
                    method_name: Arc::clone(&target.name),
                    descriptor: Arc::clone(&target.descriptor),
                });
            }
            if self.inline_call(&target, state) {
                return;
            }
            self.push_by_type(&descriptor.return_type, state);
            return;
        }

        // project-local calls: remember the target and substitute its
        // return behavior when the callee is resolvable
        let binary = names::to_binary_name(&method_ref.class_name);
        if self.interp.pool.is_project_class(&binary) {
            self.invoked.insert(MethodIdentifier {
                class_name: binary,
                method_name: Arc::clone(&method_ref.name),
                descriptor: Arc::clone(&method_ref.descriptor),
            });
            if self.inline_call(method_ref, state) {
                return;
            }
        }

        self.push_by_type(&descriptor.return_type, state);
    }

    /// Substitutes a callee's return behavior at the call site. True when
    /// the callee was simulated and its result pushed.
    fn inline_call(&mut self, method_ref: &MethodRef, state: &mut MachineState) -> bool {
        if self.depth >= INLINE_DEPTH_CAP {
            return false;
        }
        let identifier = MethodIdentifier {
            class_name: names::to_binary_name(&method_ref.class_name),
            method_name: Arc::clone(&method_ref.name),
            descriptor: Arc::clone(&method_ref.descriptor),
        };
        if !self.seen.insert(identifier.clone()) {
            // cycle
            return false;
        }

        let result = self.resolve_and_simulate(method_ref);
        self.seen.remove(&identifier);

        let Some(returned) = result else {
            return false;
        };
        let mut value: Option<AbstractValue> = None;
        let mut void_seen = false;
        for item in &returned {
            match item {
                Returned::Value(v) => {
                    value = Some(match value {
                        Some(existing) => existing.join(v),
                        None => v.clone(),
                    });
                }
                Returned::Void => void_seen = true,
            }
        }
        // slot width follows the declared return type, not the inferred value
        let wide = parse_method_descriptor(&method_ref.descriptor)
            .ok()
            .and_then(|(_, d)| d.return_type)
            .is_some_and(|t| t.is_long());
        match value {
            Some(v) => {
                if wide {
                    state.push_wide(v);
                } else {
                    state.push(v);
                }
                true
            }
            // a void callee leaves the stack alone
            None => void_seen,
        }
    }

    /// Finds the target method, walking up the superclass chain for virtual
    /// targets declared above, and runs the engine on its body.
    fn resolve_and_simulate(&mut self, method_ref: &MethodRef) -> Option<Vec<Returned>> {
        let mut binary = names::to_binary_name(&method_ref.class_name);
        loop {
            let class = self.interp.pool.read_class(&binary).ok()?;
            let method = class.methods.iter().find(|m| {
                m.name(&class).as_deref() == Some(method_ref.name.as_ref())
                    && m.descriptor(&class).as_deref() == Some(method_ref.descriptor.as_ref())
            });
            if let Some(method) = method {
                let returned = self.interp.simulate_values(
                    &class,
                    method,
                    self.depth + 1,
                    self.seen,
                    self.invoked,
                );
                return Some(returned);
            }
            let super_name = class.super_class_name()?;
            binary = names::to_binary_name(&super_name);
        }
    }

    fn invokedynamic(&mut self, index: u16, state: &mut MachineState) {
        use crate::class::ConstantPoolInfo as Cpi;
        let Some(Cpi::InvokeDynamic {
            bootstrap_method_attr_index,
            name_and_type_index,
        }) = self.class.constant(index)
        else {
            return;
        };
        let Some((_, factory_descriptor)) = self.class.resolve_name_and_type(*name_and_type_index)
        else {
            return;
        };
        let Ok((_, descriptor)) = parse_method_descriptor(&factory_descriptor) else {
            return;
        };
        // captured arguments
        let _ = self.pop_arguments(&descriptor.parameters, state);

        // a lambda factory: the implementation handle hides in the
        // bootstrap-method arguments
        let handle = self
            .bootstrap
            .get(*bootstrap_method_attr_index as usize)
            .and_then(|bootstrap| {
                bootstrap
                    .arguments
                    .iter()
                    .find_map(|&argument| self.class.resolve_method_handle(argument))
            });
        match handle {
            Some(target) => state.push(AbstractValue::Handle(target)),
            None => self.push_by_type(&descriptor.return_type, state),
        }
    }

    fn record_return(&mut self, returned: Returned) {
        if !self.returns.contains(&returned) {
            self.returns.push(returned);
        }
    }
}

/// Static response factories on the framework `Response` class.
fn response_factory(name: &str, args: &[AbstractValue]) -> Option<ResponseState> {
    let entity_of = |value: Option<&AbstractValue>| value.and_then(AbstractValue::static_type);
    let state = match name {
        "ok" => {
            let mut state = ResponseState::with_status(200);
            state.entity = entity_of(args.first());
            state
        }
        "status" => {
            let mut state = ResponseState::default();
            match args.first() {
                Some(AbstractValue::IntLiteral(code)) => state.add_status(*code),
                _ => state.unknown_status = true,
            }
            state
        }
        "noContent" => ResponseState::with_status(204),
        "accepted" => {
            let mut state = ResponseState::with_status(202);
            state.entity = entity_of(args.first());
            state
        }
        "created" => ResponseState::with_status(201),
        "serverError" => ResponseState::with_status(500),
        "notAcceptable" => ResponseState::with_status(406),
        "notModified" => ResponseState::with_status(304),
        "seeOther" => ResponseState::with_status(303),
        "temporaryRedirect" => ResponseState::with_status(307),
        "fromResponse" => match args.first() {
            Some(AbstractValue::Response(state)) | Some(AbstractValue::Builder(state)) => {
                state.clone()
            }
            _ => ResponseState::unknown(),
        },
        _ => return None,
    };
    Some(state)
}

/// Builder operations; anything unrecognized keeps the chain alive.
fn builder_op(mut state: ResponseState, name: &str, args: &[AbstractValue]) -> AbstractValue {
    match name {
        "build" => return AbstractValue::Response(state),
        "clone" => {}
        "status" => match args.first() {
            Some(AbstractValue::IntLiteral(code)) => state.add_status(*code),
            _ => state.unknown_status = true,
        },
        "header" => {
            if let Some(AbstractValue::StringLiteral(header)) = args.first() {
                state.headers.insert(header.to_string());
            }
        }
        "cookie" => {
            collect_cookie_names(args, &mut state);
        }
        "entity" => {
            state.entity = args.first().and_then(AbstractValue::static_type);
        }
        _ => {}
    }
    AbstractValue::Builder(state)
}

fn collect_cookie_names(args: &[AbstractValue], state: &mut ResponseState) {
    for arg in args {
        match arg {
            AbstractValue::CookieRef(Some(name)) => {
                state.cookies.insert(name.to_string());
            }
            AbstractValue::ArrayRef { contents, .. } => collect_cookie_names(contents, state),
            _ => {}
        }
    }
}

fn project_return(returned: &Returned, declared: Option<&ReturnType>) -> Option<HttpResponse> {
    match returned {
        Returned::Void => {
            // only a genuinely void method maps the bare return to 204
            matches!(declared, Some(None)).then(|| {
                let mut state = ResponseState::default();
                state.statuses.insert(204);
                state.into_response()
            })
        }
        Returned::Value(value) => Some(project_value(value, declared)),
    }
}

fn project_value(value: &AbstractValue, declared: Option<&ReturnType>) -> HttpResponse {
    use AbstractValue::*;
    match value {
        Builder(state) | Response(state) => state.clone().into_response(),
        Null => ResponseState::with_status(200).into_response(),
        StringLiteral(_) | IntLiteral(_) | Primitive(_) | TypeRef(_) | ArrayRef { .. }
        | CookieRef(_) => {
            let static_type = value.static_type();
            entity_response(static_type.as_ref())
        }
        Handle(_) | Pad | Unknown => match declared {
            Some(Some(t)) => entity_response(Some(t)),
            _ => unknown_response(),
        },
    }
}

fn entity_response(entity: Option<&FieldType>) -> HttpResponse {
    match entity {
        Some(t) if names::is_response(t.internal_name().unwrap_or("")) => unknown_response(),
        Some(t) => {
            let mut state = ResponseState::with_status(200);
            state.entity = Some(t.clone());
            state.into_response()
        }
        None => ResponseState::with_status(200).into_response(),
    }
}

fn unknown_response() -> HttpResponse {
    HttpResponse {
        statuses: std::iter::once(UNKNOWN_STATUS).collect(),
        ..HttpResponse::default()
    }
}

fn int_fold_fn(op: u8) -> fn(i64, i64) -> Option<i64> {
    match op {
        0x60 | 0x61 => |a, b| Some(a.wrapping_add(b)),
        0x64 | 0x65 => |a, b| Some(a.wrapping_sub(b)),
        0x68 | 0x69 => |a, b| Some(a.wrapping_mul(b)),
        0x6c | 0x6d => |a, b| (b != 0).then(|| a.wrapping_div(b)),
        0x70 | 0x71 => |a, b| (b != 0).then(|| a.wrapping_rem(b)),
        0x78 => |a, b| Some(a.wrapping_shl(b as u32 & 31)),
        0x7a => |a, b| Some(a.wrapping_shr(b as u32 & 31)),
        0x7c => |a, b| Some(((a as u32) >> (b as u32 & 31)) as i64),
        0x7e | 0x7f => |a, b| Some(a & b),
        0x80 | 0x81 => |a, b| Some(a | b),
        0x82 | 0x83 => |a, b| Some(a ^ b),
        _ => |_, _| None,
    }
}

fn class_name_to_type(internal_name: &str) -> FieldType {
    if internal_name.starts_with('[') {
        parse_field_descriptor(internal_name)
            .map(|(_, d)| d.0)
            .unwrap_or(FieldType::Object(names::OBJECT.to_string()))
    } else {
        FieldType::Object(internal_name.to_string())
    }
}

fn u16_at(code: &[u8], index: usize) -> u16 {
    ((code[index] as u16) << 8) | code[index + 1] as u16
}

fn i16_at(code: &[u8], index: usize) -> i16 {
    u16_at(code, index) as i16
}

fn i32_at(code: &[u8], index: usize) -> i32 {
    ((code[index] as u32) << 24
        | (code[index + 1] as u32) << 16
        | (code[index + 2] as u32) << 8
        | code[index + 3] as u32) as i32
}

fn is_branch(op: u8) -> bool {
    matches!(
        op,
        inst::IFEQ..=inst::JSR
            | inst::TABLESWITCH
            | inst::LOOKUPSWITCH
            | inst::IFNULL
            | inst::IFNONNULL
            | inst::GOTO_W
            | inst::JSR_W
    )
}

fn is_conditional(op: u8) -> bool {
    matches!(
        op,
        inst::IFEQ..=inst::IF_ACMPNE | inst::IFNULL | inst::IFNONNULL | inst::JSR | inst::JSR_W
    )
}

fn is_terminator(op: u8) -> bool {
    matches!(op, inst::IRETURN..=inst::RETURN | inst::ATHROW | inst::RET)
}

fn branch_targets(code: &[u8], pc: usize) -> Vec<usize> {
    let op = code[pc];
    match op {
        inst::GOTO_W | inst::JSR_W => {
            vec![(pc as i64 + i32_at(code, pc + 1) as i64) as usize]
        }
        inst::TABLESWITCH => {
            let base = aligned_base(pc);
            let default = (pc as i64 + i32_at(code, base) as i64) as usize;
            let low = i32_at(code, base + 4) as i64;
            let high = i32_at(code, base + 8) as i64;
            let count = (high - low + 1).max(0) as usize;
            let mut targets = vec![default];
            for i in 0..count {
                targets.push((pc as i64 + i32_at(code, base + 12 + i * 4) as i64) as usize);
            }
            targets
        }
        inst::LOOKUPSWITCH => {
            let base = aligned_base(pc);
            let default = (pc as i64 + i32_at(code, base) as i64) as usize;
            let pairs = i32_at(code, base + 4).max(0) as usize;
            let mut targets = vec![default];
            for i in 0..pairs {
                targets.push((pc as i64 + i32_at(code, base + 8 + i * 8 + 4) as i64) as usize);
            }
            targets
        }
        _ => vec![(pc as i64 + i16_at(code, pc + 1) as i64) as usize],
    }
}

fn aligned_base(pc: usize) -> usize {
    let operand = pc + 1;
    operand + (4 - operand % 4) % 4
}

fn insn_length(code: &[u8], pc: usize) -> Option<usize> {
    let op = *code.get(pc)?;
    let length = match op {
        0x00..=0x0f
        | 0x1a..=0x35
        | 0x3b..=0x5f
        | 0x60..=0x83
        | 0x85..=0x98
        | inst::IRETURN..=inst::RETURN
        | inst::ARRAYLENGTH
        | inst::ATHROW
        | inst::MONITORENTER
        | inst::MONITOREXIT => 1,
        inst::BIPUSH
        | inst::LDC
        | inst::ILOAD..=inst::ALOAD
        | inst::ISTORE..=inst::ASTORE
        | inst::RET
        | inst::NEWARRAY => 2,
        inst::SIPUSH
        | inst::LDC_W
        | inst::LDC2_W
        | inst::IINC
        | inst::IFEQ..=inst::JSR
        | inst::GETSTATIC..=inst::INVOKESTATIC
        | inst::NEW
        | inst::ANEWARRAY
        | inst::CHECKCAST
        | inst::INSTANCEOF
        | inst::IFNULL
        | inst::IFNONNULL => 3,
        inst::MULTIANEWARRAY => 4,
        inst::INVOKEINTERFACE | inst::INVOKEDYNAMIC | inst::GOTO_W | inst::JSR_W => 5,
        inst::WIDE => {
            if *code.get(pc + 1)? == inst::IINC {
                6
            } else {
                4
            }
        }
        inst::TABLESWITCH => {
            let base = aligned_base(pc);
            if base + 12 > code.len() {
                return None;
            }
            let low = i32_at(code, base + 4) as i64;
            let high = i32_at(code, base + 8) as i64;
            if high < low {
                return None;
            }
            base - pc + 12 + ((high - low + 1) as usize) * 4
        }
        inst::LOOKUPSWITCH => {
            let base = aligned_base(pc);
            if base + 8 > code.len() {
                return None;
            }
            let pairs = i32_at(code, base + 4);
            if pairs < 0 {
                return None;
            }
            base - pc + 8 + pairs as usize * 8
        }
        _ => return None,
    };
    (pc + length <= code.len()).then_some(length)
}
