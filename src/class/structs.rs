use std::sync::Arc;

use crate::consts::{ClassAccessFlag, FieldAccessFlag, MethodAccessFlag};

/// A parsed class file, constant-pool indexes unresolved. Attributes keep
/// their raw bytes; `class::attributes` decodes the ones the analysis needs.
#[derive(Debug)]
pub struct Class {
    pub(crate) minor_version: u16,
    pub(crate) major_version: u16,
    pub(crate) constant_pool: Vec<ConstantPoolInfo>,
    pub(crate) access_flags: ClassAccessFlag,
    pub(crate) this_class: u16,
    pub(crate) super_class: u16,
    pub(crate) interfaces: Vec<u16>,
    pub(crate) fields: Vec<FieldInfo>,
    pub(crate) methods: Vec<MethodInfo>,
    pub(crate) attributes: Vec<AttributeInfo>,
}

#[derive(Debug)]
pub enum ConstantPoolInfo {
    Utf8(Arc<str>),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class {
        name_index: u16,
    },
    String {
        string_index: u16,
    },
    Fieldref {
        class_index: u16,
        name_and_type_index: u16,
    },
    Methodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType {
        descriptor_index: u16,
    },
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    Module {
        name_index: u16,
    },
    Package {
        name_index: u16,
    },
    // second slot of a Long/Double entry
    Empty,
}

#[derive(Debug)]
pub struct FieldInfo {
    pub(crate) access_flags: FieldAccessFlag,
    pub(crate) name_index: u16,
    pub(crate) descriptor_index: u16,
    pub(crate) attributes: Vec<AttributeInfo>,
}

#[derive(Debug)]
pub struct MethodInfo {
    pub(crate) access_flags: MethodAccessFlag,
    pub(crate) name_index: u16,
    pub(crate) descriptor_index: u16,
    pub(crate) attributes: Vec<AttributeInfo>,
}

#[derive(Debug)]
pub struct AttributeInfo {
    pub(crate) attribute_name_index: u16,
    pub(crate) info: Vec<u8>,
}

/// A fully resolved method reference out of the constant pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub(crate) class_name: Arc<str>,
    pub(crate) name: Arc<str>,
    pub(crate) descriptor: Arc<str>,
    pub(crate) interface: bool,
}

#[derive(Debug, Clone)]
pub struct FieldRef {
    pub(crate) class_name: Arc<str>,
    pub(crate) name: Arc<str>,
    pub(crate) descriptor: Arc<str>,
}

impl Class {
    pub(crate) fn constant(&self, index: u16) -> Option<&ConstantPoolInfo> {
        self.constant_pool.get((index as usize).checked_sub(1)?)
    }

    pub(crate) fn resolve_utf8(&self, index: u16) -> Option<Arc<str>> {
        match self.constant(index)? {
            ConstantPoolInfo::Utf8(s) => Some(Arc::clone(s)),
            _ => None,
        }
    }

    /// Internal (slash-separated) name behind a `Class` constant.
    pub(crate) fn resolve_class_name(&self, index: u16) -> Option<Arc<str>> {
        match self.constant(index)? {
            ConstantPoolInfo::Class { name_index } => self.resolve_utf8(*name_index),
            _ => None,
        }
    }

    pub(crate) fn resolve_name_and_type(&self, index: u16) -> Option<(Arc<str>, Arc<str>)> {
        match self.constant(index)? {
            ConstantPoolInfo::NameAndType {
                name_index,
                descriptor_index,
            } => Some((self.resolve_utf8(*name_index)?, self.resolve_utf8(*descriptor_index)?)),
            _ => None,
        }
    }

    pub(crate) fn resolve_method_ref(&self, index: u16) -> Option<MethodRef> {
        let (class_index, name_and_type_index, interface) = match self.constant(index)? {
            ConstantPoolInfo::Methodref {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index, false),
            ConstantPoolInfo::InterfaceMethodref {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index, true),
            _ => return None,
        };
        let class_name = self.resolve_class_name(class_index)?;
        let (name, descriptor) = self.resolve_name_and_type(name_and_type_index)?;
        Some(MethodRef {
            class_name,
            name,
            descriptor,
            interface,
        })
    }

    pub(crate) fn resolve_field_ref(&self, index: u16) -> Option<FieldRef> {
        match self.constant(index)? {
            ConstantPoolInfo::Fieldref {
                class_index,
                name_and_type_index,
            } => {
                let class_name = self.resolve_class_name(*class_index)?;
                let (name, descriptor) = self.resolve_name_and_type(*name_and_type_index)?;
                Some(FieldRef {
                    class_name,
                    name,
                    descriptor,
                })
            }
            _ => None,
        }
    }

    /// The method behind a `MethodHandle` constant, for handle kinds that
    /// reference methods (field-handle kinds yield `None`).
    pub(crate) fn resolve_method_handle(&self, index: u16) -> Option<MethodRef> {
        match self.constant(index)? {
            ConstantPoolInfo::MethodHandle {
                reference_kind,
                reference_index,
            } => match reference_kind {
                // invokeVirtual/invokeStatic/invokeSpecial/newInvokeSpecial/invokeInterface
                5..=9 => self.resolve_method_ref(*reference_index),
                _ => None,
            },
            _ => None,
        }
    }

    /// Internal name of this class.
    pub(crate) fn this_class_name(&self) -> Option<Arc<str>> {
        self.resolve_class_name(self.this_class)
    }

    /// Internal name of the superclass, `None` for `java/lang/Object`.
    pub(crate) fn super_class_name(&self) -> Option<Arc<str>> {
        if self.super_class == 0 {
            return None;
        }
        self.resolve_class_name(self.super_class)
    }

    pub(crate) fn interface_names(&self) -> Vec<Arc<str>> {
        self.interfaces
            .iter()
            .filter_map(|&index| self.resolve_class_name(index))
            .collect()
    }

    pub(crate) fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlag::INTERFACE)
    }
}

impl MethodInfo {
    pub(crate) fn name(&self, class: &Class) -> Option<Arc<str>> {
        class.resolve_utf8(self.name_index)
    }

    pub(crate) fn descriptor(&self, class: &Class) -> Option<Arc<str>> {
        class.resolve_utf8(self.descriptor_index)
    }
}

impl FieldInfo {
    pub(crate) fn name(&self, class: &Class) -> Option<Arc<str>> {
        class.resolve_utf8(self.name_index)
    }

    pub(crate) fn descriptor(&self, class: &Class) -> Option<Arc<str>> {
        class.resolve_utf8(self.descriptor_index)
    }
}
