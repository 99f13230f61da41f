use std::collections::BTreeSet;
use std::sync::Arc;

use crate::class::MethodRef;
use crate::descriptor::FieldType;
use crate::model::{HttpResponse, UNKNOWN_STATUS};

/// A value on the abstract operand stack or in the local-variable table.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AbstractValue {
    /// Numeric/boolean scalar of unknown value.
    Primitive(FieldType),
    StringLiteral(Arc<str>),
    IntLiteral(i64),
    /// An opaque object of known static type.
    TypeRef(FieldType),
    Null,
    /// A response under construction.
    Builder(ResponseState),
    /// A finalized response.
    Response(ResponseState),
    /// An array; contents are tracked while indexes stay literal.
    ArrayRef {
        element: FieldType,
        contents: Vec<AbstractValue>,
    },
    /// A captured method reference; invoking it through a functional
    /// interface substitutes the referenced method's behavior.
    Handle(MethodRef),
    /// A cookie object whose name was a string literal.
    CookieRef(Option<Arc<str>>),
    /// Second slot of a long/double.
    Pad,
    Unknown,
}

/// Builder state tracked for a response under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ResponseState {
    pub(crate) statuses: BTreeSet<u16>,
    pub(crate) unknown_status: bool,
    pub(crate) headers: BTreeSet<String>,
    pub(crate) cookies: BTreeSet<String>,
    pub(crate) entity: Option<FieldType>,
}

impl ResponseState {
    pub(crate) fn with_status(code: u16) -> Self {
        let mut state = Self::default();
        state.statuses.insert(code);
        state
    }

    pub(crate) fn unknown() -> Self {
        Self {
            unknown_status: true,
            ..Self::default()
        }
    }

    /// Per-field set union, as required at control-flow merges.
    pub(crate) fn union(mut self, other: &Self) -> Self {
        self.statuses.extend(other.statuses.iter().copied());
        self.unknown_status |= other.unknown_status;
        self.headers.extend(other.headers.iter().cloned());
        self.cookies.extend(other.cookies.iter().cloned());
        if self.entity.is_none() {
            self.entity = other.entity.clone();
        }
        self
    }

    pub(crate) fn add_status(&mut self, code: i64) {
        if (100..=599).contains(&code) {
            self.statuses.insert(code as u16);
        } else {
            self.unknown_status = true;
        }
    }

    pub(crate) fn into_response(self) -> HttpResponse {
        let mut statuses: BTreeSet<u16> = self.statuses;
        if self.unknown_status {
            statuses.insert(UNKNOWN_STATUS);
        }
        if statuses.is_empty() {
            // a body built without an explicit status ships as 200
            statuses.insert(200);
        }
        HttpResponse {
            statuses,
            headers: self.headers,
            cookies: self.cookies,
            entity_type: self.entity.map(|t| t.type_name()),
        }
    }
}

impl AbstractValue {
    pub(crate) fn is_wide(&self) -> bool {
        matches!(
            self,
            AbstractValue::Primitive(FieldType::Long | FieldType::Double)
        )
    }

    /// The static type of this value, where one is known.
    pub(crate) fn static_type(&self) -> Option<FieldType> {
        match self {
            AbstractValue::Primitive(t) => Some(t.clone()),
            AbstractValue::StringLiteral(_) => {
                Some(FieldType::Object("java/lang/String".to_string()))
            }
            AbstractValue::IntLiteral(_) => Some(FieldType::Int),
            AbstractValue::TypeRef(t) => Some(t.clone()),
            AbstractValue::ArrayRef { element, .. } => {
                Some(FieldType::Array(Box::new(element.clone())))
            }
            _ => None,
        }
    }

    /// Lattice join at control-flow merges: identical values survive, builder
    /// and response states union per field, everything else widens.
    pub(crate) fn join(&self, other: &Self) -> Self {
        use AbstractValue::*;
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (Builder(a), Builder(b)) => Builder(a.clone().union(b)),
            (Response(a), Response(b)) => Response(a.clone().union(b)),
            (Builder(a), Response(b)) | (Response(a), Builder(b)) => {
                Response(a.clone().union(b))
            }
            (IntLiteral(_), IntLiteral(_)) => Primitive(FieldType::Int),
            (IntLiteral(_), Primitive(FieldType::Int))
            | (Primitive(FieldType::Int), IntLiteral(_)) => Primitive(FieldType::Int),
            (StringLiteral(_), StringLiteral(_)) => {
                TypeRef(FieldType::Object("java/lang/String".to_string()))
            }
            (Null, v @ TypeRef(_)) | (v @ TypeRef(_), Null) => v.clone(),
            (Pad, Pad) => Pad,
            _ => Unknown,
        }
    }
}

/// Abstract value for a freshly introduced value of the given declared type.
pub(crate) fn value_of_type(field_type: &FieldType) -> AbstractValue {
    if field_type.is_primitive() {
        AbstractValue::Primitive(field_type.clone())
    } else {
        AbstractValue::TypeRef(field_type.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_unions_builder_states_per_field() {
        let mut a = ResponseState::with_status(200);
        a.headers.insert("X-A".to_string());
        let mut b = ResponseState::with_status(404);
        b.headers.insert("X-B".to_string());

        let joined = AbstractValue::Builder(a).join(&AbstractValue::Builder(b));
        let AbstractValue::Builder(state) = joined else {
            panic!("expected a builder");
        };
        assert_eq!(
            state.statuses.iter().copied().collect::<Vec<_>>(),
            vec![200, 404]
        );
        assert_eq!(state.headers.len(), 2);
    }

    #[test]
    fn join_of_distinct_literals_widens_to_primitive() {
        let joined = AbstractValue::IntLiteral(1).join(&AbstractValue::IntLiteral(2));
        assert_eq!(joined, AbstractValue::Primitive(FieldType::Int));
    }

    #[test]
    fn out_of_range_status_becomes_unknown_marker() {
        let mut state = ResponseState::default();
        state.add_status(9000);
        let response = state.into_response();
        assert!(response.statuses.contains(&UNKNOWN_STATUS));
    }

    #[test]
    fn statusless_body_defaults_to_200() {
        let mut state = ResponseState::default();
        state.entity = Some(FieldType::Object("java/lang/String".to_string()));
        let response = state.into_response();
        assert_eq!(response.statuses.iter().copied().collect::<Vec<_>>(), vec![200]);
        assert_eq!(response.entity_type.as_deref(), Some("java.lang.String"));
    }
}
