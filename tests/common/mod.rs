//! Test-only class-file assembly: just enough of the format to emit the
//! shapes the analyzer consumes, plus temp-dir and jar helpers.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_ANNOTATION: u16 = 0x2000;

#[derive(Clone, PartialEq)]
enum Constant {
    Utf8(String),
    Integer(i32),
    Class(u16),
    Str(u16),
    Fieldref(u16, u16),
    Methodref(u16, u16),
    InterfaceMethodref(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    InvokeDynamic(u16, u16),
}

struct Member {
    access: u16,
    name_index: u16,
    descriptor_index: u16,
    attributes: Vec<(u16, Vec<u8>)>,
}

/// An annotation to encode into a RuntimeVisible(Parameter)Annotations
/// attribute.
#[derive(Clone)]
pub struct Ann {
    type_descriptor: String,
    pairs: Vec<(String, AnnValue)>,
}

#[derive(Clone)]
pub enum AnnValue {
    Str(String),
    Arr(Vec<AnnValue>),
}

impl Ann {
    pub fn new(type_descriptor: &str) -> Self {
        Self {
            type_descriptor: type_descriptor.to_string(),
            pairs: Vec::new(),
        }
    }

    pub fn value(mut self, value: &str) -> Self {
        self.pairs
            .push(("value".to_string(), AnnValue::Str(value.to_string())));
        self
    }

    pub fn values(mut self, values: &[&str]) -> Self {
        self.pairs.push((
            "value".to_string(),
            AnnValue::Arr(values.iter().map(|v| AnnValue::Str(v.to_string())).collect()),
        ));
        self
    }

    pub fn path(value: &str) -> Self {
        Self::new("Ljavax/ws/rs/Path;").value(value)
    }

    pub fn application_path(value: &str) -> Self {
        Self::new("Ljavax/ws/rs/ApplicationPath;").value(value)
    }

    pub fn get() -> Self {
        Self::new("Ljavax/ws/rs/GET;")
    }

    pub fn post() -> Self {
        Self::new("Ljavax/ws/rs/POST;")
    }

    pub fn delete() -> Self {
        Self::new("Ljavax/ws/rs/DELETE;")
    }

    pub fn produces(values: &[&str]) -> Self {
        Self::new("Ljavax/ws/rs/Produces;").values(values)
    }

    pub fn path_param(name: &str) -> Self {
        Self::new("Ljavax/ws/rs/PathParam;").value(name)
    }

    pub fn query_param(name: &str) -> Self {
        Self::new("Ljavax/ws/rs/QueryParam;").value(name)
    }

    pub fn http_method(verb: &str) -> Self {
        Self::new("Ljavax/ws/rs/HttpMethod;").value(verb)
    }
}

pub struct TestClass {
    constants: Vec<Constant>,
    access: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    methods: Vec<Member>,
    fields: Vec<Member>,
    class_annotations: Vec<Ann>,
    bootstrap_methods: Vec<(u16, Vec<u16>)>,
    internal_name: String,
}

impl TestClass {
    pub fn new(internal_name: &str) -> Self {
        Self::with_access(internal_name, ACC_PUBLIC)
    }

    pub fn interface(internal_name: &str) -> Self {
        Self::with_access(internal_name, ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
    }

    pub fn annotation_type(internal_name: &str) -> Self {
        Self::with_access(
            internal_name,
            ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT | ACC_ANNOTATION,
        )
    }

    fn with_access(internal_name: &str, access: u16) -> Self {
        let mut class = Self {
            constants: Vec::new(),
            access,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            class_annotations: Vec::new(),
            bootstrap_methods: Vec::new(),
            internal_name: internal_name.to_string(),
        };
        class.this_class = class.class_const(internal_name);
        class.super_class = class.class_const("java/lang/Object");
        class
    }

    pub fn name(&self) -> &str {
        &self.internal_name
    }

    pub fn implements(&mut self, interface: &str) -> &mut Self {
        let index = self.class_const(interface);
        self.interfaces.push(index);
        self
    }

    pub fn annotate(&mut self, annotation: Ann) -> &mut Self {
        self.class_annotations.push(annotation);
        self
    }

    // constant-pool accessors, all deduplicating

    fn constant(&mut self, constant: Constant) -> u16 {
        if let Some(position) = self.constants.iter().position(|c| *c == constant) {
            return position as u16 + 1;
        }
        self.constants.push(constant);
        self.constants.len() as u16
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        self.constant(Constant::Utf8(value.to_string()))
    }

    pub fn class_const(&mut self, internal_name: &str) -> u16 {
        let name = self.utf8(internal_name);
        self.constant(Constant::Class(name))
    }

    pub fn string_const(&mut self, value: &str) -> u16 {
        let utf8 = self.utf8(value);
        self.constant(Constant::Str(utf8))
    }

    pub fn int_const(&mut self, value: i32) -> u16 {
        self.constant(Constant::Integer(value))
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.constant(Constant::NameAndType(name, descriptor))
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class_const(class);
        let name_and_type = self.name_and_type(name, descriptor);
        self.constant(Constant::Methodref(class, name_and_type))
    }

    pub fn interface_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class_const(class);
        let name_and_type = self.name_and_type(name, descriptor);
        self.constant(Constant::InterfaceMethodref(class, name_and_type))
    }

    pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class_const(class);
        let name_and_type = self.name_and_type(name, descriptor);
        self.constant(Constant::Fieldref(class, name_and_type))
    }

    /// REF_invokeStatic handle to a method of this or another class.
    pub fn static_handle(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let method = self.method_ref(class, name, descriptor);
        self.constant(Constant::MethodHandle(6, method))
    }

    /// Registers a bootstrap method carrying the implementation handle and
    /// returns a ready `invokedynamic` constant for the given factory shape.
    pub fn lambda_factory(
        &mut self,
        sam_name: &str,
        factory_descriptor: &str,
        implementation_handle: u16,
    ) -> u16 {
        self.bootstrap_methods
            .push((implementation_handle, vec![implementation_handle]));
        let bootstrap_index = self.bootstrap_methods.len() as u16 - 1;
        let name_and_type = self.name_and_type(sam_name, factory_descriptor);
        self.constant(Constant::InvokeDynamic(bootstrap_index, name_and_type))
    }

    // members

    pub fn add_method(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        annotations: Vec<Ann>,
        bytecode: Option<Vec<u8>>,
    ) -> &mut Self {
        self.add_method_with_params(access, name, descriptor, annotations, Vec::new(), bytecode)
    }

    pub fn add_method_with_params(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        annotations: Vec<Ann>,
        parameter_annotations: Vec<Vec<Ann>>,
        bytecode: Option<Vec<u8>>,
    ) -> &mut Self {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut attributes = Vec::new();
        if !annotations.is_empty() {
            let body = self.encode_annotations(&annotations);
            let attr_name = self.utf8("RuntimeVisibleAnnotations");
            attributes.push((attr_name, body));
        }
        if !parameter_annotations.is_empty() {
            let body = self.encode_parameter_annotations(&parameter_annotations);
            let attr_name = self.utf8("RuntimeVisibleParameterAnnotations");
            attributes.push((attr_name, body));
        }
        if let Some(code) = bytecode {
            let body = encode_code(8, 8, &code);
            let attr_name = self.utf8("Code");
            attributes.push((attr_name, body));
        }
        self.methods.push(Member {
            access,
            name_index,
            descriptor_index,
            attributes,
        });
        self
    }

    pub fn add_field(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        annotations: Vec<Ann>,
    ) -> &mut Self {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut attributes = Vec::new();
        if !annotations.is_empty() {
            let body = self.encode_annotations(&annotations);
            let attr_name = self.utf8("RuntimeVisibleAnnotations");
            attributes.push((attr_name, body));
        }
        self.fields.push(Member {
            access,
            name_index,
            descriptor_index,
            attributes,
        });
        self
    }

    // encoding

    fn encode_annotations(&mut self, annotations: &[Ann]) -> Vec<u8> {
        let mut out = Vec::new();
        push_u16(&mut out, annotations.len() as u16);
        for annotation in annotations {
            self.encode_annotation(annotation, &mut out);
        }
        out
    }

    fn encode_parameter_annotations(&mut self, parameters: &[Vec<Ann>]) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(parameters.len() as u8);
        for annotations in parameters {
            push_u16(&mut out, annotations.len() as u16);
            for annotation in annotations {
                self.encode_annotation(annotation, &mut out);
            }
        }
        out
    }

    fn encode_annotation(&mut self, annotation: &Ann, out: &mut Vec<u8>) {
        let type_index = self.utf8(&annotation.type_descriptor);
        push_u16(out, type_index);
        push_u16(out, annotation.pairs.len() as u16);
        let pairs = annotation.pairs.clone();
        for (name, value) in &pairs {
            let name_index = self.utf8(name);
            push_u16(out, name_index);
            self.encode_element_value(value, out);
        }
    }

    fn encode_element_value(&mut self, value: &AnnValue, out: &mut Vec<u8>) {
        match value {
            AnnValue::Str(s) => {
                out.push(b's');
                let index = self.utf8(s);
                push_u16(out, index);
            }
            AnnValue::Arr(values) => {
                out.push(b'[');
                push_u16(out, values.len() as u16);
                let values = values.clone();
                for v in &values {
                    self.encode_element_value(v, out);
                }
            }
        }
    }

    pub fn build(&mut self) -> Vec<u8> {
        let mut class_attributes: Vec<(u16, Vec<u8>)> = Vec::new();
        if !self.class_annotations.is_empty() {
            let annotations = self.class_annotations.clone();
            let body = self.encode_annotations(&annotations);
            let name = self.utf8("RuntimeVisibleAnnotations");
            class_attributes.push((name, body));
        }
        if !self.bootstrap_methods.is_empty() {
            let mut body = Vec::new();
            push_u16(&mut body, self.bootstrap_methods.len() as u16);
            for (handle, arguments) in &self.bootstrap_methods {
                push_u16(&mut body, *handle);
                push_u16(&mut body, arguments.len() as u16);
                for argument in arguments {
                    push_u16(&mut body, *argument);
                }
            }
            let name = self.utf8("BootstrapMethods");
            class_attributes.push((name, body));
        }

        let mut out = Vec::new();
        out.extend_from_slice(&[0xca, 0xfe, 0xba, 0xbe]);
        push_u16(&mut out, 0); // minor
        push_u16(&mut out, 52); // major: Java 8
        push_u16(&mut out, self.constants.len() as u16 + 1);
        for constant in &self.constants {
            encode_constant(constant, &mut out);
        }
        push_u16(&mut out, self.access);
        push_u16(&mut out, self.this_class);
        push_u16(&mut out, self.super_class);
        push_u16(&mut out, self.interfaces.len() as u16);
        for interface in &self.interfaces {
            push_u16(&mut out, *interface);
        }
        encode_members(&self.fields, &mut out);
        encode_members(&self.methods, &mut out);
        push_u16(&mut out, class_attributes.len() as u16);
        for (name, body) in &class_attributes {
            push_u16(&mut out, *name);
            push_u32(&mut out, body.len() as u32);
            out.extend_from_slice(body);
        }
        out
    }
}

fn encode_members(members: &[Member], out: &mut Vec<u8>) {
    push_u16(out, members.len() as u16);
    for member in members {
        push_u16(out, member.access);
        push_u16(out, member.name_index);
        push_u16(out, member.descriptor_index);
        push_u16(out, member.attributes.len() as u16);
        for (name, body) in &member.attributes {
            push_u16(out, *name);
            push_u32(out, body.len() as u32);
            out.extend_from_slice(body);
        }
    }
}

fn encode_constant(constant: &Constant, out: &mut Vec<u8>) {
    match constant {
        Constant::Utf8(s) => {
            out.push(1);
            push_u16(out, s.len() as u16);
            out.extend_from_slice(s.as_bytes());
        }
        Constant::Integer(v) => {
            out.push(3);
            out.extend_from_slice(&v.to_be_bytes());
        }
        Constant::Class(name) => {
            out.push(7);
            push_u16(out, *name);
        }
        Constant::Str(utf8) => {
            out.push(8);
            push_u16(out, *utf8);
        }
        Constant::Fieldref(class, name_and_type) => {
            out.push(9);
            push_u16(out, *class);
            push_u16(out, *name_and_type);
        }
        Constant::Methodref(class, name_and_type) => {
            out.push(10);
            push_u16(out, *class);
            push_u16(out, *name_and_type);
        }
        Constant::InterfaceMethodref(class, name_and_type) => {
            out.push(11);
            push_u16(out, *class);
            push_u16(out, *name_and_type);
        }
        Constant::NameAndType(name, descriptor) => {
            out.push(12);
            push_u16(out, *name);
            push_u16(out, *descriptor);
        }
        Constant::MethodHandle(kind, reference) => {
            out.push(15);
            out.push(*kind);
            push_u16(out, *reference);
        }
        Constant::InvokeDynamic(bootstrap, name_and_type) => {
            out.push(18);
            push_u16(out, *bootstrap);
            push_u16(out, *name_and_type);
        }
    }
}

fn encode_code(max_stack: u16, max_locals: u16, code: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    push_u16(&mut out, max_stack);
    push_u16(&mut out, max_locals);
    push_u32(&mut out, code.len() as u32);
    out.extend_from_slice(code);
    push_u16(&mut out, 0); // exception table
    push_u16(&mut out, 0); // attributes
    out
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn hi_lo(index: u16) -> [u8; 2] {
    index.to_be_bytes()
}

// filesystem helpers

pub fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!(
        "jaxscan_it_{}_{}_{}",
        std::process::id(),
        nanos,
        name
    ));
    fs::create_dir_all(&path).unwrap();
    path
}

/// Writes compiled classes into a directory tree rooted at a fresh temp dir.
pub fn write_classes(name: &str, classes: &[(&str, Vec<u8>)]) -> PathBuf {
    let root = temp_dir(name);
    for (internal_name, bytes) in classes {
        let path = root.join(format!("{internal_name}.class"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }
    root
}

/// Writes compiled classes into a jar at a fresh temp location.
pub fn write_jar(name: &str, classes: &[(&str, Vec<u8>)]) -> PathBuf {
    let root = temp_dir(name);
    let jar_path = root.join("classes.jar");
    let file = fs::File::create(&jar_path).unwrap();
    let mut jar = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (internal_name, bytes) in classes {
        jar.start_file(format!("{internal_name}.class"), options)
            .unwrap();
        jar.write_all(bytes).unwrap();
    }
    jar.finish().unwrap();
    jar_path
}

pub fn cleanup(path: &Path) {
    let _ = fs::remove_dir_all(path);
}
