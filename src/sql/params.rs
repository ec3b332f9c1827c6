//! Convert serde_json::Value into the text form sqlx binds.
//!
//! Every parameter travels as TEXT; the builder adds a `$n::type` cast when the column type is known,
//! so PostgreSQL parses the text into the column's type.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Text(String),
}

impl PgBindValue {
    /// Numbers and booleans use their JSON spelling; arrays and objects are stored as JSON text.
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::String(s) => PgBindValue::Text(s.clone()),
            Value::Bool(b) => PgBindValue::Text(b.to_string()),
            Value::Number(n) => PgBindValue::Text(n.to_string()),
            Value::Array(_) | Value::Object(_) => PgBindValue::Text(v.to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PgBindValue::Null => None,
            PgBindValue::Text(s) => Some(s.as_str()),
        }
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <Option<&str> as Encode<Postgres>>::encode_by_ref(&self.as_text(), buf)
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_bind_as_their_json_spelling() {
        assert_eq!(PgBindValue::from_json(&json!(42)).as_text(), Some("42"));
        assert_eq!(PgBindValue::from_json(&json!(1.5)).as_text(), Some("1.5"));
        assert_eq!(PgBindValue::from_json(&json!(false)).as_text(), Some("false"));
        assert_eq!(PgBindValue::from_json(&json!("plain")).as_text(), Some("plain"));
        assert_eq!(PgBindValue::from_json(&Value::Null), PgBindValue::Null);
    }

    #[test]
    fn structured_values_bind_as_json_text() {
        let v = json!([{"label": "Home", "href": "/"}]);
        let bound = PgBindValue::from_json(&v);
        let back: Value = serde_json::from_str(bound.as_text().unwrap()).unwrap();
        assert_eq!(back, v);
    }
}
