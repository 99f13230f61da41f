use nom::{
    branch::alt,
    bytes::complete::take_until,
    character::complete::{char, one_of},
    combinator::{eof, map},
    multi::many0,
    sequence::delimited,
    IResult, Parser,
};

use crate::names;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldDescriptor(pub(crate) FieldType);

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct MethodDescriptor {
    pub(crate) parameters: Vec<FieldType>,
    pub(crate) return_type: ReturnType,
}

pub type ReturnType = Option<FieldType>;

#[derive(Debug, PartialEq, Eq, Clone, Hash, PartialOrd, Ord)]
pub enum FieldType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Object(String),
    Short,
    Boolean,
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn is_long(&self) -> bool {
        matches!(self, FieldType::Long | FieldType::Double)
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }

    /// The internal (slash-separated) class name, if this is a class type.
    pub fn internal_name(&self) -> Option<&str> {
        match self {
            FieldType::Object(name) => Some(name),
            _ => None,
        }
    }

    pub fn to_descriptor(&self) -> String {
        match self {
            FieldType::Byte => "B".to_string(),
            FieldType::Char => "C".to_string(),
            FieldType::Double => "D".to_string(),
            FieldType::Float => "F".to_string(),
            FieldType::Int => "I".to_string(),
            FieldType::Long => "J".to_string(),
            FieldType::Short => "S".to_string(),
            FieldType::Boolean => "Z".to_string(),
            FieldType::Object(class_name) => format!("L{class_name};"),
            FieldType::Array(element_type) => format!("[{}", element_type.to_descriptor()),
        }
    }

    /// Human-readable type name for the output model (`java.lang.String`,
    /// `int`, `byte[]`).
    pub fn type_name(&self) -> String {
        match self {
            FieldType::Byte => "byte".to_string(),
            FieldType::Char => "char".to_string(),
            FieldType::Double => "double".to_string(),
            FieldType::Float => "float".to_string(),
            FieldType::Int => "int".to_string(),
            FieldType::Long => "long".to_string(),
            FieldType::Short => "short".to_string(),
            FieldType::Boolean => "boolean".to_string(),
            FieldType::Object(class_name) => names::to_binary_name(class_name),
            FieldType::Array(element_type) => format!("{}[]", element_type.type_name()),
        }
    }
}

impl MethodDescriptor {
    pub fn to_descriptor(&self) -> String {
        let mut out = String::from("(");
        for p in &self.parameters {
            out.push_str(&p.to_descriptor());
        }
        out.push(')');
        match &self.return_type {
            Some(t) => out.push_str(&t.to_descriptor()),
            None => out.push('V'),
        }
        out
    }
}

pub fn parse_field_descriptor(input: &str) -> IResult<&str, FieldDescriptor> {
    let (input, field_type) = parse_field_type(input)?;
    eof(input)?;
    Ok((input, FieldDescriptor(field_type)))
}

pub fn parse_method_descriptor(input: &str) -> IResult<&str, MethodDescriptor> {
    let (input, parameters) =
        delimited(char('('), many0(parse_field_type), char(')')).parse(input)?;

    let (input, return_type) = parse_return_type_descriptor(input)?;

    eof(input)?;
    Ok((
        input,
        MethodDescriptor {
            parameters,
            return_type,
        },
    ))
}

pub fn parse_return_type_descriptor(input: &str) -> IResult<&str, ReturnType> {
    alt((map(parse_field_type, Some), parse_void_type)).parse(input)
}

fn parse_field_type(input: &str) -> IResult<&str, FieldType> {
    alt((parse_base_type, parse_object_type, parse_array_type)).parse(input)
}

fn parse_base_type(input: &str) -> IResult<&str, FieldType> {
    let (input, ch) = one_of("BCDFIJSZ")(input)?;
    let field_type = match ch {
        'B' => FieldType::Byte,
        'C' => FieldType::Char,
        'D' => FieldType::Double,
        'F' => FieldType::Float,
        'I' => FieldType::Int,
        'J' => FieldType::Long,
        'S' => FieldType::Short,
        'Z' => FieldType::Boolean,
        _ => unreachable!("one_of limits the alphabet"),
    };
    Ok((input, field_type))
}

fn parse_object_type(input: &str) -> IResult<&str, FieldType> {
    let (input, _) = char('L')(input)?;

    let (input, class_name) = take_until(";")(input)?;

    let (input, _) = char(';')(input)?;

    Ok((input, FieldType::Object(class_name.to_string())))
}

fn parse_array_type(input: &str) -> IResult<&str, FieldType> {
    let (input, _) = char('[')(input)?;

    let (input, field_type) = parse_field_type(input)?;

    Ok((input, FieldType::Array(Box::new(field_type))))
}

fn parse_void_type(input: &str) -> IResult<&str, Option<FieldType>> {
    let (input, _) = char('V')(input)?;
    Ok((input, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primitive_field_descriptor() {
        let (_, desc) = parse_field_descriptor("I").unwrap();
        assert_eq!(desc.0, FieldType::Int);
    }

    #[test]
    fn parses_object_and_array_descriptors() {
        let (_, desc) = parse_field_descriptor("Ljava/lang/String;").unwrap();
        assert_eq!(desc.0, FieldType::Object("java/lang/String".to_string()));

        let (_, desc) = parse_field_descriptor("[[J").unwrap();
        assert_eq!(
            desc.0,
            FieldType::Array(Box::new(FieldType::Array(Box::new(FieldType::Long))))
        );
    }

    #[test]
    fn parses_method_descriptor_with_mixed_parameters() {
        let (_, desc) = parse_method_descriptor("(ILjava/lang/String;[B)V").unwrap();
        assert_eq!(
            desc.parameters,
            vec![
                FieldType::Int,
                FieldType::Object("java/lang/String".to_string()),
                FieldType::Array(Box::new(FieldType::Byte)),
            ]
        );
        assert_eq!(desc.return_type, None);
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse_field_descriptor("Ix").is_err());
        assert!(parse_method_descriptor("()Vx").is_err());
    }

    #[test]
    fn round_trips_method_descriptor() {
        let raw = "(Ljava/util/List;D)Ljavax/ws/rs/core/Response;";
        let (_, desc) = parse_method_descriptor(raw).unwrap();
        assert_eq!(desc.to_descriptor(), raw);
    }

    #[test]
    fn renders_readable_type_names() {
        let (_, desc) = parse_field_descriptor("[Ljava/lang/String;").unwrap();
        assert_eq!(desc.0.type_name(), "java.lang.String[]");
    }
}
