//! # Path Parameters
//!
//! Typed path parameters declared in route patterns (`/v1/movies/{id:int}`).

use std::collections::HashMap;

/// Declared parameter type; undeclared parameters are strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamType {
    /// No conversion
    #[default]
    String,
    /// Parses to i64
    Int,
}

impl ParamType {
    /// Convert `raw`, keeping it as a string when it does not parse
    #[must_use]
    pub fn convert(self, raw: &str) -> ParamValue {
        match self {
            Self::Int => raw
                .parse()
                .map_or_else(|_| ParamValue::String(raw.to_string()), ParamValue::Int),
            Self::String => ParamValue::String(raw.to_string()),
        }
    }
}

/// Converted parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Raw text (undeclared, or failed conversion)
    String(String),
    /// Integer value
    Int(i64),
}

impl ParamValue {
    /// Get as i64 if Int variant
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::String(_) => None,
        }
    }
}

/// Rewrite `{name:int}` segments to `{name}` and record their types
///
/// Returns the pattern matchit understands and the declared types.
#[must_use]
pub fn normalize_pattern(path: &str) -> (String, HashMap<String, ParamType>) {
    let mut types = HashMap::new();
    let segments: Vec<String> = path
        .split('/')
        .map(|segment| {
            let declared = segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .and_then(|inner| inner.split_once(':'));
            match declared {
                Some((name, "int")) => {
                    types.insert(name.to_string(), ParamType::Int);
                    format!("{{{name}}}")
                }
                _ => segment.to_string(),
            }
        })
        .collect();

    (segments.join("/"), types)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_int() {
        assert_eq!(ParamType::Int.convert("123"), ParamValue::Int(123));
        assert_eq!(ParamType::Int.convert("-4"), ParamValue::Int(-4));
    }

    #[test]
    fn test_convert_int_falls_back_to_string() {
        assert_eq!(
            ParamType::Int.convert("abc"),
            ParamValue::String("abc".to_string())
        );
        assert_eq!(
            ParamType::Int.convert("99999999999999999999").as_int(),
            None
        );
    }

    #[test]
    fn test_normalize_pattern() {
        let (pattern, types) = normalize_pattern("/v1/movies/{id:int}");
        assert_eq!(pattern, "/v1/movies/{id}");
        assert_eq!(types.get("id"), Some(&ParamType::Int));

        let (pattern, types) = normalize_pattern("/v1/healthcheck");
        assert_eq!(pattern, "/v1/healthcheck");
        assert!(types.is_empty());

        let (pattern, types) = normalize_pattern("/v1/movies/{id}");
        assert_eq!(pattern, "/v1/movies/{id}");
        assert!(types.is_empty());
    }
}
