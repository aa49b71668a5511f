// Top-level type tags with the discriminants scripts compare against.
use serde::Serialize;
use serde_json::Value;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonType {
    Null = 0,
    Object = 1,
    Array = 2,
    String = 3,
    Boolean = 4,
    NumberInteger = 5,
    NumberUnsigned = 6,
    NumberFloat = 7,
}

impl JsonType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Boolean,
            Value::Number(num) if num.is_f64() => JsonType::NumberFloat,
            Value::Number(num) if num.is_u64() => JsonType::NumberUnsigned,
            Value::Number(_) => JsonType::NumberInteger,
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::Array,
            Value::Object(_) => JsonType::Object,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, Error> {
        match code {
            0 => Ok(JsonType::Null),
            1 => Ok(JsonType::Object),
            2 => Ok(JsonType::Array),
            3 => Ok(JsonType::String),
            4 => Ok(JsonType::Boolean),
            5 => Ok(JsonType::NumberInteger),
            6 => Ok(JsonType::NumberUnsigned),
            7 => Ok(JsonType::NumberFloat),
            _ => Err(Error::new(ErrorKind::Usage).with_message(format!("invalid type code {code}"))),
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_number(self) -> bool {
        matches!(
            self,
            JsonType::NumberInteger | JsonType::NumberUnsigned | JsonType::NumberFloat
        )
    }

    /// Short label used in error messages and CLI output.
    pub fn label(self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::String => "string",
            JsonType::Boolean => "boolean",
            JsonType::NumberInteger => "number_integer",
            JsonType::NumberUnsigned => "number_unsigned",
            JsonType::NumberFloat => "number_float",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::JsonType;
    use serde_json::json;

    #[test]
    fn numbers_split_by_sign_and_fraction() {
        assert_eq!(JsonType::of(&json!(-3)), JsonType::NumberInteger);
        assert_eq!(JsonType::of(&json!(3)), JsonType::NumberUnsigned);
        assert_eq!(JsonType::of(&json!(3.5)), JsonType::NumberFloat);
        assert!(JsonType::of(&json!(0)).is_number());
        assert!(!JsonType::of(&json!("0")).is_number());
    }

    #[test]
    fn codes_round_trip() {
        for code in 0..8 {
            let kind = JsonType::from_code(code).expect("valid code");
            assert_eq!(kind.code(), code);
        }
        assert!(JsonType::from_code(8).is_err());
    }

    #[test]
    fn serializes_as_label() {
        let text = serde_json::to_string(&JsonType::NumberFloat).expect("serialize");
        assert_eq!(text, "\"number_float\"");
        assert_eq!(JsonType::NumberFloat.label(), "number_float");
    }
}
