//! Parser for guest type spellings.
//!
//! Grammar (whitespace insignificant, heads accepted in either case):
//!
//! ```text
//! type     := primitive | head "[" args "]" | "List" | "Dict"
//! primitive:= "int" | "float" | "str" | "bool" | "None" | "NoneType" | "Any" | "any"
//! head     := "list" | "dict" | "optional" | "union"
//! args     := type ("," type)*
//! ```
//!
//! Parsing is total. A structurally broken spelling degrades to `Any`; an
//! unknown name inside a well-formed generic degrades only that argument.

use super::TypeDescriptor;

/// Parse a guest type spelling into a descriptor.
pub fn parse_type(spelling: &str) -> TypeDescriptor {
    parse_primitive(spelling.trim())
        .or_else(|| parse_generic(spelling.trim()))
        .unwrap_or(TypeDescriptor::Any)
}

fn parse_primitive(s: &str) -> Option<TypeDescriptor> {
    let ty = match s {
        "int" => TypeDescriptor::Int,
        "float" => TypeDescriptor::Float,
        "str" => TypeDescriptor::String,
        "bool" => TypeDescriptor::Bool,
        "None" | "NoneType" => TypeDescriptor::None,
        "Any" | "any" => TypeDescriptor::Any,
        "List" | "list" => TypeDescriptor::List(Box::new(TypeDescriptor::Any)),
        "Dict" | "dict" => TypeDescriptor::Map(Box::new(TypeDescriptor::Any)),
        _ => return None,
    };
    Some(ty)
}

fn parse_generic(s: &str) -> Option<TypeDescriptor> {
    let open = s.find('[')?;
    let head = s[..open].trim();
    let inner = s[open + 1..].strip_suffix(']')?;
    let args = split_type_args(inner)?;

    match head {
        "list" | "List" => match args.as_slice() {
            [item] => Some(TypeDescriptor::List(Box::new(parse_type(item)))),
            _ => None,
        },
        "dict" | "Dict" => match args.as_slice() {
            [key, value] if parse_type(key) == TypeDescriptor::String => {
                Some(TypeDescriptor::Map(Box::new(parse_type(value))))
            }
            _ => None,
        },
        "optional" | "Optional" => match args.as_slice() {
            [inner] => Some(TypeDescriptor::Optional(Box::new(parse_type(inner)))),
            _ => None,
        },
        "union" | "Union" => Some(normalize_union(args.iter().map(|a| parse_type(a)).collect())),
        _ => None,
    }
}

/// `union[T]` is `T`; `union[T, None]` is `optional[T]`.
fn normalize_union(members: Vec<TypeDescriptor>) -> TypeDescriptor {
    let has_none = members.contains(&TypeDescriptor::None);
    let mut others: Vec<TypeDescriptor> = members
        .iter()
        .filter(|m| **m != TypeDescriptor::None)
        .cloned()
        .collect();

    match (has_none, others.len()) {
        (true, 1) => TypeDescriptor::Optional(Box::new(others.remove(0))),
        (false, 1) => others.remove(0),
        _ if members.len() == 1 => members.into_iter().next().unwrap_or(TypeDescriptor::Any),
        _ => TypeDescriptor::Union(members),
    }
}

/// Split generic arguments on top-level commas.
///
/// Returns `None` for unbalanced brackets or an empty argument.
fn split_type_args(s: &str) -> Option<Vec<&str>> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                args.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return None;
    }
    args.push(s[start..].trim());

    if args.iter().any(|a| a.is_empty()) {
        return None;
    }
    Some(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(t: TypeDescriptor) -> TypeDescriptor {
        TypeDescriptor::List(Box::new(t))
    }

    fn map(t: TypeDescriptor) -> TypeDescriptor {
        TypeDescriptor::Map(Box::new(t))
    }

    fn optional(t: TypeDescriptor) -> TypeDescriptor {
        TypeDescriptor::Optional(Box::new(t))
    }

    #[test]
    fn test_primitives() {
        assert_eq!(parse_type("int"), TypeDescriptor::Int);
        assert_eq!(parse_type("float"), TypeDescriptor::Float);
        assert_eq!(parse_type("str"), TypeDescriptor::String);
        assert_eq!(parse_type("bool"), TypeDescriptor::Bool);
        assert_eq!(parse_type("None"), TypeDescriptor::None);
        assert_eq!(parse_type("NoneType"), TypeDescriptor::None);
        assert_eq!(parse_type("Any"), TypeDescriptor::Any);
        assert_eq!(parse_type("  int "), TypeDescriptor::Int);
    }

    #[test]
    fn test_generics_both_capitalizations() {
        assert_eq!(parse_type("List[int]"), list(TypeDescriptor::Int));
        assert_eq!(parse_type("list[int]"), list(TypeDescriptor::Int));
        assert_eq!(parse_type("Dict[str, float]"), map(TypeDescriptor::Float));
        assert_eq!(parse_type("dict[str,float]"), map(TypeDescriptor::Float));
        assert_eq!(parse_type("Optional[str]"), optional(TypeDescriptor::String));
        assert_eq!(parse_type("optional[str]"), optional(TypeDescriptor::String));
        assert_eq!(parse_type("List"), list(TypeDescriptor::Any));
        assert_eq!(parse_type("Dict"), map(TypeDescriptor::Any));
    }

    #[test]
    fn test_nested() {
        assert_eq!(
            parse_type("Dict[str, List[Optional[int]]]"),
            map(list(optional(TypeDescriptor::Int)))
        );
        assert_eq!(
            parse_type("List[Dict[str, Any]]"),
            list(map(TypeDescriptor::Any))
        );
    }

    #[test]
    fn test_union() {
        assert_eq!(
            parse_type("Union[int, str]"),
            TypeDescriptor::Union(vec![TypeDescriptor::Int, TypeDescriptor::String])
        );
        assert_eq!(parse_type("Union[int, None]"), optional(TypeDescriptor::Int));
        assert_eq!(parse_type("union[None, List[str]]"), optional(list(TypeDescriptor::String)));
        assert_eq!(parse_type("Union[float]"), TypeDescriptor::Float);
        assert_eq!(parse_type("Union[None]"), TypeDescriptor::None);
        assert_eq!(
            parse_type("Union[int, str, None]"),
            TypeDescriptor::Union(vec![
                TypeDescriptor::Int,
                TypeDescriptor::String,
                TypeDescriptor::None
            ])
        );
    }

    #[test]
    fn test_unknown_argument_degrades_locally() {
        assert_eq!(parse_type("List[DataFrame]"), list(TypeDescriptor::Any));
        assert_eq!(parse_type("Optional[np.ndarray]"), optional(TypeDescriptor::Any));
    }

    #[test]
    fn test_unparseable_is_any() {
        for input in [
            "",
            "   ",
            "DataFrame",
            "List[int",
            "List[int]]",
            "List[int][str]",
            "List[]",
            "List[int, str]",
            "Dict[int, str]",
            "Dict[str]",
            "Optional[int, str]",
            "Union[]",
            "Union[int,,str]",
            "Tuple[int, int]",
            "[int]",
            "]][[",
            "int | None",
        ] {
            assert_eq!(parse_type(input), TypeDescriptor::Any, "input: {input:?}");
        }
    }

    #[test]
    fn test_display_round_trip() {
        for input in [
            "int",
            "float",
            "str",
            "bool",
            "None",
            "Any",
            "List[int]",
            "Dict[str, List[float]]",
            "Optional[Dict[str, Any]]",
            "Union[int, str]",
            "Union[int, None]",
            "Union[List[int], Dict[str, bool], None]",
            "List",
            "garbage[",
        ] {
            let parsed = parse_type(input);
            let reparsed = parse_type(&parsed.to_string());
            assert_eq!(parsed, reparsed, "input: {input:?}");
        }
    }
}
