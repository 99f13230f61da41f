//! Second-stage decoding of the raw attribute bytes kept by the parser.
//! Only the attributes the analysis consumes are decoded; everything else
//! stays raw and is ignored.

use std::sync::Arc;

use nom::{
    bytes::complete::take,
    error_position,
    multi::count,
    number::complete::{be_u16, be_u32, u8},
    IResult,
};

use crate::{
    class::{AttributeInfo, Class},
    descriptor::{parse_field_descriptor, FieldDescriptor},
};

#[derive(Debug, Clone)]
pub struct CodeAttribute {
    pub(crate) max_stack: u16,
    pub(crate) max_locals: u16,
    pub(crate) code: Arc<[u8]>,
    pub(crate) exception_table: Vec<ExceptionTableItem>,
}

#[derive(Debug, Clone)]
pub struct ExceptionTableItem {
    pub(crate) start_pc: u16,
    pub(crate) end_pc: u16,
    pub(crate) handler_pc: u16,
    pub(crate) catch_type: Option<Arc<str>>,
}

#[derive(Debug, Clone)]
pub struct Annotation {
    pub(crate) type_descriptor: FieldDescriptor,
    pub(crate) element_value_pairs: Vec<ElementValuePair>,
}

#[derive(Debug, Clone)]
pub struct ElementValuePair {
    pub(crate) element_name: Arc<str>,
    pub(crate) value: ElementValue,
}

#[derive(Debug, Clone)]
pub enum ElementValue {
    Const(Const),
    Enum {
        type_name: Arc<str>,
        const_name: Arc<str>,
    },
    Class(Arc<str>),
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

#[derive(Debug, Clone)]
pub enum Const {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(Arc<str>),
}

#[derive(Debug, Clone)]
pub struct BootstrapMethod {
    pub(crate) method_ref: u16,
    pub(crate) arguments: Vec<u16>,
}

impl Annotation {
    /// Internal (slash-separated) name of the annotation type.
    pub(crate) fn internal_type_name(&self) -> Option<&str> {
        self.type_descriptor.0.internal_name()
    }

    pub(crate) fn element(&self, name: &str) -> Option<&ElementValue> {
        self.element_value_pairs
            .iter()
            .find(|pair| pair.element_name.as_ref() == name)
            .map(|pair| &pair.value)
    }

    /// The `value` element as a single string.
    pub(crate) fn string_value(&self, name: &str) -> Option<Arc<str>> {
        match self.element(name)? {
            ElementValue::Const(Const::String(s)) => Some(Arc::clone(s)),
            _ => None,
        }
    }

    /// The `value` element as a string array, accepting a lone string too
    /// (annotation shorthand).
    pub(crate) fn string_values(&self, name: &str) -> Vec<Arc<str>> {
        match self.element(name) {
            Some(ElementValue::Const(Const::String(s))) => vec![Arc::clone(s)],
            Some(ElementValue::Array(values)) => values
                .iter()
                .filter_map(|v| match v {
                    ElementValue::Const(Const::String(s)) => Some(Arc::clone(s)),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Class {
    fn attribute_bytes<'a>(&self, attributes: &'a [AttributeInfo], name: &str) -> Option<&'a [u8]> {
        attributes.iter().find_map(|attr| {
            let attr_name = self.resolve_utf8(attr.attribute_name_index)?;
            (attr_name.as_ref() == name).then_some(attr.info.as_slice())
        })
    }

    pub(crate) fn class_annotations(&self) -> Vec<Annotation> {
        self.decode_annotations(&self.attributes)
    }

    pub(crate) fn decode_annotations(&self, attributes: &[AttributeInfo]) -> Vec<Annotation> {
        self.attribute_bytes(attributes, "RuntimeVisibleAnnotations")
            .and_then(|bytes| parse_annotations(bytes, self).ok())
            .map(|(_, annotations)| annotations)
            .unwrap_or_default()
    }

    /// Per-parameter annotation lists, in declaration order. Missing
    /// attribute means no parameter carries annotations.
    pub(crate) fn decode_parameter_annotations(
        &self,
        attributes: &[AttributeInfo],
    ) -> Vec<Vec<Annotation>> {
        self.attribute_bytes(attributes, "RuntimeVisibleParameterAnnotations")
            .and_then(|bytes| parse_parameter_annotations(bytes, self).ok())
            .map(|(_, annotations)| annotations)
            .unwrap_or_default()
    }

    pub(crate) fn decode_signature(&self, attributes: &[AttributeInfo]) -> Option<Arc<str>> {
        let bytes = self.attribute_bytes(attributes, "Signature")?;
        let (_, index) = be_u16::<_, nom::error::Error<&[u8]>>(bytes).ok()?;
        self.resolve_utf8(index)
    }

    pub(crate) fn decode_code(&self, attributes: &[AttributeInfo]) -> Option<CodeAttribute> {
        let bytes = self.attribute_bytes(attributes, "Code")?;
        parse_code(bytes, self).ok().map(|(_, code)| code)
    }

    pub(crate) fn bootstrap_methods(&self) -> Vec<BootstrapMethod> {
        self.attribute_bytes(&self.attributes, "BootstrapMethods")
            .and_then(|bytes| parse_bootstrap_methods(bytes).ok())
            .map(|(_, methods)| methods)
            .unwrap_or_default()
    }
}

fn parse_code<'a>(input: &'a [u8], class: &Class) -> IResult<&'a [u8], CodeAttribute> {
    let (input, max_stack) = be_u16(input)?;
    let (input, max_locals) = be_u16(input)?;

    let (input, code_length) = be_u32(input)?;
    let (input, code) = take(code_length)(input)?;

    let (input, exception_table_length) = be_u16(input)?;
    let (input, exception_table) = count(
        |input| parse_exception_table_item(input, class),
        exception_table_length as _,
    )(input)?;

    // nested attributes (LineNumberTable etc.) are not needed here

    Ok((
        input,
        CodeAttribute {
            max_stack,
            max_locals,
            code: code.into(),
            exception_table,
        },
    ))
}

fn parse_exception_table_item<'a>(
    input: &'a [u8],
    class: &Class,
) -> IResult<&'a [u8], ExceptionTableItem> {
    let (input, start_pc) = be_u16(input)?;
    let (input, end_pc) = be_u16(input)?;
    let (input, handler_pc) = be_u16(input)?;
    let (input, catch_type) = be_u16(input)?;

    let catch_type = if catch_type == 0 {
        None
    } else {
        class.resolve_class_name(catch_type)
    };

    Ok((
        input,
        ExceptionTableItem {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        },
    ))
}

fn parse_annotations<'a>(input: &'a [u8], class: &Class) -> IResult<&'a [u8], Vec<Annotation>> {
    let (input, num_annotations) = be_u16(input)?;
    count(|input| parse_annotation(input, class), num_annotations as _)(input)
}

fn parse_parameter_annotations<'a>(
    input: &'a [u8],
    class: &Class,
) -> IResult<&'a [u8], Vec<Vec<Annotation>>> {
    let (input, num_parameters) = u8(input)?;
    count(
        |input| parse_annotations_u16(input, class),
        num_parameters as _,
    )(input)
}

fn parse_annotations_u16<'a>(input: &'a [u8], class: &Class) -> IResult<&'a [u8], Vec<Annotation>> {
    let (input, num_annotations) = be_u16(input)?;
    count(|input| parse_annotation(input, class), num_annotations as _)(input)
}

fn parse_annotation<'a>(input: &'a [u8], class: &Class) -> IResult<&'a [u8], Annotation> {
    let (input, type_index) = be_u16(input)?;
    let Some(type_str) = class.resolve_utf8(type_index) else {
        return Err(nom::Err::Error(error_position!(
            input,
            nom::error::ErrorKind::Verify
        )));
    };
    let Ok((_, type_descriptor)) = parse_field_descriptor(&type_str) else {
        return Err(nom::Err::Error(error_position!(
            input,
            nom::error::ErrorKind::Verify
        )));
    };

    let (input, num_element_value_pairs) = be_u16(input)?;
    let (input, element_value_pairs) = count(
        |input| parse_element_value_pair(input, class),
        num_element_value_pairs as _,
    )(input)?;

    Ok((
        input,
        Annotation {
            type_descriptor,
            element_value_pairs,
        },
    ))
}

fn parse_element_value_pair<'a>(
    input: &'a [u8],
    class: &Class,
) -> IResult<&'a [u8], ElementValuePair> {
    let (input, element_name_index) = be_u16(input)?;
    let Some(element_name) = class.resolve_utf8(element_name_index) else {
        return Err(nom::Err::Error(error_position!(
            input,
            nom::error::ErrorKind::Verify
        )));
    };
    let (input, value) = parse_element_value(input, class)?;
    Ok((
        input,
        ElementValuePair {
            element_name,
            value,
        },
    ))
}

fn parse_element_value<'a>(input: &'a [u8], class: &Class) -> IResult<&'a [u8], ElementValue> {
    let (input, tag) = u8(input)?;
    let mut input = input;
    let value = match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => {
            let const_value_index;
            (input, const_value_index) = be_u16(input)?;
            let Some(value) = resolve_constant_value(class, const_value_index) else {
                return Err(nom::Err::Error(error_position!(
                    input,
                    nom::error::ErrorKind::Verify
                )));
            };
            ElementValue::Const(value)
        }
        b'e' => {
            let (type_name_index, const_name_index);
            (input, type_name_index) = be_u16(input)?;
            (input, const_name_index) = be_u16(input)?;
            let (Some(type_name), Some(const_name)) = (
                class.resolve_utf8(type_name_index),
                class.resolve_utf8(const_name_index),
            ) else {
                return Err(nom::Err::Error(error_position!(
                    input,
                    nom::error::ErrorKind::Verify
                )));
            };
            ElementValue::Enum {
                type_name,
                const_name,
            }
        }
        b'c' => {
            let class_info_index;
            (input, class_info_index) = be_u16(input)?;
            let Some(class_info) = class.resolve_utf8(class_info_index) else {
                return Err(nom::Err::Error(error_position!(
                    input,
                    nom::error::ErrorKind::Verify
                )));
            };
            ElementValue::Class(class_info)
        }
        b'@' => {
            let annotation;
            (input, annotation) = parse_annotation(input, class)?;
            ElementValue::Annotation(Box::new(annotation))
        }
        b'[' => {
            let (num_values, values);
            (input, num_values) = be_u16(input)?;
            (input, values) = count(
                |input| parse_element_value(input, class),
                num_values as _,
            )(input)?;
            ElementValue::Array(values)
        }
        _ => {
            return Err(nom::Err::Error(error_position!(
                input,
                nom::error::ErrorKind::Tag
            )));
        }
    };
    Ok((input, value))
}

fn resolve_constant_value(class: &Class, index: u16) -> Option<Const> {
    use crate::class::ConstantPoolInfo as Cpi;
    match class.constant(index)? {
        Cpi::Integer(i) => Some(Const::Int(*i)),
        Cpi::Float(f) => Some(Const::Float(*f)),
        Cpi::Long(l) => Some(Const::Long(*l)),
        Cpi::Double(d) => Some(Const::Double(*d)),
        Cpi::Utf8(s) => Some(Const::String(Arc::clone(s))),
        Cpi::String { string_index } => class.resolve_utf8(*string_index).map(Const::String),
        _ => None,
    }
}

fn parse_bootstrap_methods(input: &[u8]) -> IResult<&[u8], Vec<BootstrapMethod>> {
    let (input, num_bootstrap_methods) = be_u16(input)?;
    count(parse_bootstrap_method, num_bootstrap_methods as _)(input)
}

fn parse_bootstrap_method(input: &[u8]) -> IResult<&[u8], BootstrapMethod> {
    let (input, method_ref) = be_u16(input)?;
    let (input, num_arguments) = be_u16(input)?;
    let (input, arguments) = count(be_u16, num_arguments as _)(input)?;
    Ok((
        input,
        BootstrapMethod {
            method_ref,
            arguments,
        },
    ))
}
