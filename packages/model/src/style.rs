use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Style declarations of one rule, keyed by camelCase CSS property
pub type Style = BTreeMap<String, StyleValue>;

/// A typed CSS value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StyleValue {
    /// Identifier value such as `auto`, `flex` or `inherit`
    Keyword { value: String },

    /// Numeric value with a unit (`px`, `%`, `em`, `number` for unitless)
    Unit { value: f64, unit: String },

    /// Raw text the builder could not parse; kept so the user can fix it
    Invalid { value: String },
}

impl StyleValue {
    pub fn keyword(value: impl Into<String>) -> Self {
        StyleValue::Keyword {
            value: value.into(),
        }
    }

    pub fn unit(value: f64, unit: impl Into<String>) -> Self {
        StyleValue::Unit {
            value,
            unit: unit.into(),
        }
    }

    pub fn is_inherit(&self) -> bool {
        matches!(self, StyleValue::Keyword { value } if value == "inherit")
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Keyword { value } | StyleValue::Invalid { value } => f.write_str(value),
            StyleValue::Unit { value, unit } if unit == "number" => write!(f, "{}", value),
            StyleValue::Unit { value, unit } => write!(f, "{}{}", value, unit),
        }
    }
}

/// One property change sent with `updateStyle` / `previewStyle`.
///
/// A `None` value removes the property from the rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleUpdate {
    pub property: String,
    pub value: Option<StyleValue>,
}

impl StyleUpdate {
    pub fn set(property: impl Into<String>, value: StyleValue) -> Self {
        Self {
            property: property.into(),
            value: Some(value),
        }
    }

    pub fn remove(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_value_wire_shape() {
        let json = serde_json::to_value(StyleValue::unit(10.0, "px")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "unit", "value": 10.0, "unit": "px"}));

        let parsed: StyleValue =
            serde_json::from_str(r#"{"type":"keyword","value":"inherit"}"#).unwrap();
        assert!(parsed.is_inherit());
    }

    #[test]
    fn test_display() {
        assert_eq!(StyleValue::unit(1.5, "em").to_string(), "1.5em");
        assert_eq!(StyleValue::unit(2.0, "number").to_string(), "2");
        assert_eq!(StyleValue::keyword("auto").to_string(), "auto");
    }
}
