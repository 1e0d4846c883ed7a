//! The runtime value representation (§3 "Runtime value").

use crate::ast::BaseType;
use serde::Serialize;

/// A tagged union of the four runtime shapes. Numbers are always `f64`
/// (§1, §9 Open Questions): there is no separate Integer representation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum RuntimeValue {
    Real(f64),
    Boolean(bool),
    String(String),
    Array(Vec<RuntimeValue>),
}

impl RuntimeValue {
    /// The zero value for a declared base type (§4.3 "Initialization").
    pub fn default_for(base_type: BaseType) -> Self {
        match base_type {
            BaseType::Integer | BaseType::Real => RuntimeValue::Real(0.0),
            BaseType::Boolean => RuntimeValue::Boolean(false),
            BaseType::String | BaseType::Char => RuntimeValue::String(String::new()),
        }
    }

    /// Builds the nested default structure for an array declared with
    /// dimension list `dims` (outermost first), per §4.3.
    pub fn default_array(base_type: BaseType, dims: &[usize]) -> Self {
        match dims.split_first() {
            None => RuntimeValue::default_for(base_type),
            Some((&len, rest)) => {
                RuntimeValue::Array((0..len).map(|_| RuntimeValue::default_array(base_type, rest)).collect())
            }
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RuntimeValue::Real(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RuntimeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Real(_) => "number",
            RuntimeValue::Boolean(_) => "boolean",
            RuntimeValue::String(_) => "string",
            RuntimeValue::Array(_) => "array",
        }
    }

    /// `Write` formatting (§4.3 "Write formatting").
    pub fn format_for_write(&self) -> String {
        match self {
            RuntimeValue::Real(n) => format_number(*n),
            RuntimeValue::Boolean(b) => b.to_string(),
            RuntimeValue::String(s) => s.clone(),
            RuntimeValue::Array(items) => {
                let inner: Vec<String> = items.iter().map(|v| v.format_for_write()).collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }
}

/// Integral values print without a decimal point; others are rounded to
/// four places with trailing zeros trimmed.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        let rounded = format!("{:.4}", n);
        let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_reals_format_without_decimal_point() {
        assert_eq!(RuntimeValue::Real(13.0).format_for_write(), "13");
    }

    #[test]
    fn fractional_reals_round_to_four_places_and_trim() {
        assert_eq!(RuntimeValue::Real(1.0 / 3.0).format_for_write(), "0.3333");
        assert_eq!(RuntimeValue::Real(2.5).format_for_write(), "2.5");
    }

    #[test]
    fn booleans_format_lowercase() {
        assert_eq!(RuntimeValue::Boolean(true).format_for_write(), "true");
        assert_eq!(RuntimeValue::Boolean(false).format_for_write(), "false");
    }

    #[test]
    fn arrays_format_outer_dimension_with_recursive_elements() {
        let arr = RuntimeValue::Array(vec![RuntimeValue::Real(1.0), RuntimeValue::Real(2.0)]);
        assert_eq!(arr.format_for_write(), "[1, 2]");
    }

    #[test]
    fn default_array_builds_nested_structure_matching_dims() {
        let arr = RuntimeValue::default_array(BaseType::Integer, &[2, 3]);
        if let RuntimeValue::Array(outer) = arr {
            assert_eq!(outer.len(), 2);
            if let RuntimeValue::Array(inner) = &outer[0] {
                assert_eq!(inner.len(), 3);
                assert_eq!(inner[0], RuntimeValue::Real(0.0));
            } else {
                panic!("expected nested array");
            }
        } else {
            panic!("expected array");
        }
    }
}
