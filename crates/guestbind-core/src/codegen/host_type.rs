//! Mapping of type descriptors onto Rust types.

use crate::descriptor::TypeDescriptor;

/// Rust-side shape of a guest type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostType {
    Integer,
    Float,
    Text,
    Boolean,
    /// `()`: only meaningful as a return type.
    Unit,
    /// Untyped JSON value.
    Dynamic,
    Sequence(Box<HostType>),
    Mapping(Box<HostType>),
    Nullable(Box<HostType>),
}

impl HostType {
    /// Unions collapse to [`HostType::Dynamic`]; no tagged union is synthesized.
    pub fn from_descriptor(descriptor: &TypeDescriptor) -> Self {
        match descriptor {
            TypeDescriptor::Int => HostType::Integer,
            TypeDescriptor::Float => HostType::Float,
            TypeDescriptor::String => HostType::Text,
            TypeDescriptor::Bool => HostType::Boolean,
            TypeDescriptor::None => HostType::Unit,
            TypeDescriptor::Any | TypeDescriptor::Union(_) => HostType::Dynamic,
            TypeDescriptor::List(item) => HostType::Sequence(Box::new(Self::from_descriptor(item))),
            TypeDescriptor::Map(value) => HostType::Mapping(Box::new(Self::from_descriptor(value))),
            TypeDescriptor::Optional(inner) => {
                HostType::Nullable(Box::new(Self::from_descriptor(inner)))
            }
        }
    }

    /// Rust spelling. `runtime` is the path of the runtime crate, which
    /// re-exports `serde_json`.
    pub fn render(&self, runtime: &str) -> String {
        match self {
            HostType::Integer => "i64".to_string(),
            HostType::Float => "f64".to_string(),
            HostType::Text => "String".to_string(),
            HostType::Boolean => "bool".to_string(),
            HostType::Unit => "()".to_string(),
            HostType::Dynamic => format!("{}::serde_json::Value", runtime),
            HostType::Sequence(item) => format!("Vec<{}>", item.render(runtime)),
            HostType::Mapping(value) => format!(
                "::std::collections::HashMap<String, {}>",
                value.render(runtime)
            ),
            HostType::Nullable(inner) => format!("Option<{}>", inner.render(runtime)),
        }
    }

    /// Value returned when the guest succeeds without a result.
    pub fn zero_value(&self, runtime: &str) -> String {
        match self {
            HostType::Integer => "0".to_string(),
            HostType::Float => "0.0".to_string(),
            HostType::Text => "String::new()".to_string(),
            HostType::Boolean => "false".to_string(),
            HostType::Unit => "()".to_string(),
            HostType::Dynamic => format!("{}::serde_json::Value::Null", runtime),
            HostType::Sequence(_) => "Vec::new()".to_string(),
            HostType::Mapping(_) => "::std::collections::HashMap::new()".to_string(),
            HostType::Nullable(_) => "None".to_string(),
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, HostType::Unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::parse_type;

    fn render(spelling: &str) -> String {
        HostType::from_descriptor(&parse_type(spelling)).render("guestbind")
    }

    #[test]
    fn test_primitive_mapping() {
        assert_eq!(render("int"), "i64");
        assert_eq!(render("float"), "f64");
        assert_eq!(render("str"), "String");
        assert_eq!(render("bool"), "bool");
        assert_eq!(render("None"), "()");
        assert_eq!(render("Any"), "guestbind::serde_json::Value");
    }

    #[test]
    fn test_generic_mapping() {
        assert_eq!(render("List[int]"), "Vec<i64>");
        assert_eq!(
            render("Dict[str, List[float]]"),
            "::std::collections::HashMap<String, Vec<f64>>"
        );
        assert_eq!(render("Optional[str]"), "Option<String>");
        assert_eq!(render("Union[int, str]"), "guestbind::serde_json::Value");
        assert_eq!(render("Union[int, None]"), "Option<i64>");
        assert_eq!(render("List[DataFrame]"), "Vec<guestbind::serde_json::Value>");
        assert_eq!(render("Dict[int, str]"), "guestbind::serde_json::Value");
    }

    #[test]
    fn test_zero_values() {
        let cases = [
            ("int", "0"),
            ("float", "0.0"),
            ("str", "String::new()"),
            ("bool", "false"),
            ("None", "()"),
            ("Any", "rt::serde_json::Value::Null"),
            ("List[int]", "Vec::new()"),
            ("Dict[str, int]", "::std::collections::HashMap::new()"),
            ("Optional[int]", "None"),
        ];
        for (spelling, zero) in cases {
            assert_eq!(
                HostType::from_descriptor(&parse_type(spelling)).zero_value("rt"),
                zero,
                "{spelling}"
            );
        }
    }

    #[test]
    fn test_shape_stable_across_reparse() {
        for spelling in [
            "List[Optional[Dict[str, int]]]",
            "Union[str, List[int]]",
            "Dict[str, Any]",
            "not a type",
        ] {
            let parsed = parse_type(spelling);
            let reparsed = parse_type(&parsed.to_string());
            assert_eq!(
                HostType::from_descriptor(&parsed).render("guestbind"),
                HostType::from_descriptor(&reparsed).render("guestbind")
            );
        }
    }
}
