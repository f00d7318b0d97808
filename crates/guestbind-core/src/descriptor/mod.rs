//! Structured descriptions of guest-declared types and functions.
//!
//! Guests describe types as strings (`int`, `List[str]`, `Optional[Dict[str, float]]`).
//! They are parsed exactly once into [`TypeDescriptor`]; everything downstream
//! matches on the enum.

mod parser;

pub use parser::parse_type;

use std::fmt;

use crate::config::ProtocolConfig;

/// A guest-declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Int,
    Float,
    String,
    Bool,
    /// No value; meaningful as a return type only.
    None,
    /// Unknown, unparseable or deliberately dynamic.
    Any,
    List(Box<TypeDescriptor>),
    /// String-keyed mapping; the descriptor is the value type.
    Map(Box<TypeDescriptor>),
    Optional(Box<TypeDescriptor>),
    Union(Vec<TypeDescriptor>),
}

impl TypeDescriptor {
    /// Parse a type spelling. Never fails: unrecognized input yields `Any`.
    pub fn parse(spelling: &str) -> Self {
        parse_type(spelling)
    }
}

/// Canonical spelling, accepted back by [`parse_type`].
impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Int => f.write_str("int"),
            TypeDescriptor::Float => f.write_str("float"),
            TypeDescriptor::String => f.write_str("str"),
            TypeDescriptor::Bool => f.write_str("bool"),
            TypeDescriptor::None => f.write_str("None"),
            TypeDescriptor::Any => f.write_str("Any"),
            TypeDescriptor::List(item) => write!(f, "list[{}]", item),
            TypeDescriptor::Map(value) => write!(f, "dict[str, {}]", value),
            TypeDescriptor::Optional(inner) => write!(f, "optional[{}]", inner),
            TypeDescriptor::Union(members) => {
                f.write_str("union[")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", member)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// One parameter of a guest function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    /// Name as the guest declares it; this is the wire key.
    pub name: String,
    pub ty: TypeDescriptor,
}

/// Signature of one exported guest function.
///
/// Parameters arrive as an unordered mapping; they are stored sorted by
/// original name so every consumer sees the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    name: String,
    parameters: Vec<ParameterDescriptor>,
    return_type: TypeDescriptor,
}

impl FunctionDescriptor {
    pub fn new(
        name: impl Into<String>,
        parameters: impl IntoIterator<Item = (String, TypeDescriptor)>,
        return_type: TypeDescriptor,
    ) -> Self {
        let mut parameters: Vec<ParameterDescriptor> = parameters
            .into_iter()
            .map(|(name, ty)| ParameterDescriptor { name, ty })
            .collect();
        parameters.sort_by(|a, b| a.name.cmp(&b.name));
        parameters.dedup_by(|a, b| a.name == b.name);

        Self {
            name: name.into(),
            parameters,
            return_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters in lexicographic order of their original names.
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    /// Private functions (leading `_`) are never exposed to the host.
    pub fn is_private(&self) -> bool {
        self.name.starts_with(ProtocolConfig::PRIVATE_PREFIX)
    }
}

impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", param.name, param.ty)?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_params() -> Vec<(String, TypeDescriptor)> {
        Vec::new()
    }

    #[test]
    fn test_parameters_sorted_by_original_name() {
        let func = FunctionDescriptor::new(
            "resize",
            [
                ("width".to_string(), TypeDescriptor::Int),
                ("b_height".to_string(), TypeDescriptor::Int),
                ("a_path".to_string(), TypeDescriptor::String),
            ],
            TypeDescriptor::None,
        );
        let names: Vec<&str> = func.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a_path", "b_height", "width"]);
    }

    #[test]
    fn test_order_independent_of_input_order() {
        let forward = FunctionDescriptor::new(
            "f",
            [
                ("x".to_string(), TypeDescriptor::Int),
                ("y".to_string(), TypeDescriptor::Float),
            ],
            TypeDescriptor::Any,
        );
        let backward = FunctionDescriptor::new(
            "f",
            [
                ("y".to_string(), TypeDescriptor::Float),
                ("x".to_string(), TypeDescriptor::Int),
            ],
            TypeDescriptor::Any,
        );
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_is_private() {
        let private = FunctionDescriptor::new("_helper", no_params(), TypeDescriptor::None);
        let dunder = FunctionDescriptor::new("__introspect__", no_params(), TypeDescriptor::Any);
        let public = FunctionDescriptor::new("helper", no_params(), TypeDescriptor::None);
        assert!(private.is_private());
        assert!(dunder.is_private());
        assert!(!public.is_private());
    }

    #[test]
    fn test_display() {
        let func = FunctionDescriptor::new(
            "divide",
            [
                ("b".to_string(), TypeDescriptor::Float),
                ("a".to_string(), TypeDescriptor::Float),
            ],
            TypeDescriptor::Optional(Box::new(TypeDescriptor::Float)),
        );
        assert_eq!(
            func.to_string(),
            "divide(a: float, b: float) -> optional[float]"
        );
        assert_eq!(
            TypeDescriptor::Union(vec![TypeDescriptor::Int, TypeDescriptor::String]).to_string(),
            "union[int, str]"
        );
    }
}
