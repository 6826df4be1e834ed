use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Serialize, Serializer};

/// A positional parameter, typed by the setter the connection must use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
pub enum BindValue {
    #[serde(serialize_with = "serialize_bytes")]
    Bytes(Vec<u8>),
    Text(String),
    BigInt(i64),
}

impl BindValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            BindValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for BindValue {
    fn from(value: &str) -> Self {
        BindValue::Text(value.to_string())
    }
}

impl From<String> for BindValue {
    fn from(value: String) -> Self {
        BindValue::Text(value)
    }
}

impl From<i64> for BindValue {
    fn from(value: i64) -> Self {
        BindValue::BigInt(value)
    }
}

impl From<&[u8]> for BindValue {
    fn from(value: &[u8]) -> Self {
        BindValue::Bytes(value.to_vec())
    }
}

fn serialize_bytes<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&STANDARD.encode(value.as_ref()))
}
