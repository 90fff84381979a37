//! Row values.

use std::error::Error;
use std::fmt;

use bytes::BytesMut;
use tokio_postgres::types::{IsNull, ToSql, Type};

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Tries to get as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Tries to get as integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Tries to get as float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Tries to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

fn is_text_type(ty: &Type) -> bool {
    *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
}

// Parameter types are inferred by the server from the target columns, so
// scalars are narrowed (or rendered as text) to match the declared type.
// Anything else goes through the inner type's check and fails with `WrongType`.
impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        if is_text_type(ty)
            && matches!(self, Value::Boolean(_) | Value::Integer(_) | Value::Float(_))
        {
            return self.to_string().to_sql_checked(ty, out);
        }
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Boolean(b) => b.to_sql_checked(ty, out),
            Value::Integer(i) => {
                if *ty == Type::INT2 {
                    i16::try_from(*i)?.to_sql_checked(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*i)?.to_sql_checked(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (*i as f32).to_sql_checked(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*i as f64).to_sql_checked(ty, out)
                } else {
                    i.to_sql_checked(ty, out)
                }
            }
            Value::Float(f) => {
                if *ty == Type::FLOAT4 {
                    (*f as f32).to_sql_checked(ty, out)
                } else {
                    f.to_sql_checked(ty, out)
                }
            }
            Value::String(s) => s.to_sql_checked(ty, out),
            Value::Bytes(b) => b.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        self.to_sql(ty, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from("cats"), Value::String("cats".into()));
        assert_eq!(Value::from(7), Value::Integer(7));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(true)), Value::Boolean(true));

        let int_val = Value::Integer(42);
        assert_eq!(int_val.as_i64(), Some(42));
        assert_eq!(int_val.as_f64(), Some(42.0));
        assert!(int_val.as_str().is_none());
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::from("wikipedia.org").to_string(), "wikipedia.org");
        assert_eq!(Value::Integer(-3).to_string(), "-3");
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Bytes(vec![1, 2]).to_string(), "<2 bytes>");
    }

    #[test]
    fn test_to_sql_narrows_integers() {
        let mut buf = BytesMut::new();
        Value::Integer(5).to_sql(&Type::INT4, &mut buf).unwrap();
        assert_eq!(buf.len(), 4);

        let mut buf = BytesMut::new();
        Value::Integer(5).to_sql(&Type::INT8, &mut buf).unwrap();
        assert_eq!(buf.len(), 8);

        let mut buf = BytesMut::new();
        assert!(Value::Integer(i64::MAX).to_sql(&Type::INT2, &mut buf).is_err());
    }

    #[test]
    fn test_to_sql_text_column() {
        let mut buf = BytesMut::new();
        Value::Integer(42).to_sql(&Type::VARCHAR, &mut buf).unwrap();
        assert_eq!(&buf[..], b"42");
    }

    #[test]
    fn test_to_sql_null() {
        let mut buf = BytesMut::new();
        let is_null = Value::Null.to_sql(&Type::TEXT, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_to_sql_rejects_mismatched_types() {
        let mut buf = BytesMut::new();
        assert!(Value::from("1234").to_sql_checked(&Type::INT4, &mut buf).is_err());
        assert!(Value::Boolean(true).to_sql_checked(&Type::INT4, &mut buf).is_err());
        assert!(Value::Float(1.5).to_sql_checked(&Type::NUMERIC, &mut buf).is_err());
        assert!(Value::Integer(1).to_sql_checked(&Type::BOOL, &mut buf).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_to_sql_accepts_matching_types() {
        let mut buf = BytesMut::new();
        Value::from("cats").to_sql_checked(&Type::VARCHAR, &mut buf).unwrap();
        assert_eq!(&buf[..], b"cats");

        let mut buf = BytesMut::new();
        Value::Float(0.5).to_sql_checked(&Type::FLOAT4, &mut buf).unwrap();
        assert_eq!(buf.len(), 4);

        let mut buf = BytesMut::new();
        Value::Bytes(vec![1, 2, 3]).to_sql_checked(&Type::BYTEA, &mut buf).unwrap();
        assert_eq!(&buf[..], &[1, 2, 3]);
    }
}
