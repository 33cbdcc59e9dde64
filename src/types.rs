use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::SqlFluentError;

/// Values that can be bound as statement parameters or read back from a row.
///
/// Every `param(...)` call on a builder converts its argument into one of these:
/// ```rust
/// use sql_fluent::prelude::*;
///
/// let params: Vec<RowValues> = vec![1_i32.into(), "alice".into(), true.into()];
/// assert_eq!(params[0], RowValues::Int(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Exact decimal value
    Decimal(Decimal),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            RowValues::Date(d) => Some(*d),
            RowValues::Timestamp(dt) => Some(dt.date()),
            RowValues::Text(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            RowValues::Time(t) => Some(*t),
            RowValues::Timestamp(dt) => Some(dt.time()),
            RowValues::Text(s) => NaiveTime::parse_from_str(s, "%H:%M:%S%.f").ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            RowValues::Decimal(value) => value.to_f64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            RowValues::Decimal(value) => Some(*value),
            RowValues::Int(value) => Some(Decimal::from(*value)),
            RowValues::Float(value) => Decimal::from_f64(*value),
            RowValues::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Convert this value into the representation named by `target`.
    ///
    /// NULL stays NULL for every target. Values already in the target's shape are
    /// returned unchanged.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ParameterError` when the value has no sensible
    /// representation in the target type.
    pub fn coerce(self, target: SqlType) -> Result<RowValues, SqlFluentError> {
        if self.is_null() {
            return Ok(self);
        }
        let coerced = match target {
            SqlType::SmallInt | SqlType::Integer | SqlType::BigInt => match &self {
                RowValues::Int(_) => Some(self.clone()),
                RowValues::Bool(b) => Some(RowValues::Int(i64::from(*b))),
                RowValues::Text(s) => s.trim().parse().ok().map(RowValues::Int),
                RowValues::Decimal(d) if d.fract().is_zero() => d.to_i64().map(RowValues::Int),
                RowValues::Float(f) if f.fract() == 0.0 => f.to_i64().map(RowValues::Int),
                _ => None,
            },
            SqlType::Real | SqlType::Double => self.as_float().map(RowValues::Float).or_else(|| {
                self.as_text()
                    .and_then(|s| s.trim().parse().ok())
                    .map(RowValues::Float)
            }),
            SqlType::Numeric => self.as_decimal().map(RowValues::Decimal),
            SqlType::Varchar => Some(match &self {
                RowValues::Text(_) => self.clone(),
                RowValues::Int(i) => RowValues::Text(i.to_string()),
                RowValues::Float(f) => RowValues::Text(f.to_string()),
                RowValues::Decimal(d) => RowValues::Text(d.to_string()),
                RowValues::Bool(b) => RowValues::Text(b.to_string()),
                RowValues::Date(d) => RowValues::Text(d.format("%F").to_string()),
                RowValues::Time(t) => RowValues::Text(t.format("%T%.f").to_string()),
                RowValues::Timestamp(dt) => RowValues::Text(dt.format("%F %T%.f").to_string()),
                RowValues::JSON(j) => RowValues::Text(j.to_string()),
                RowValues::Blob(b) => RowValues::Text(String::from_utf8_lossy(b).into_owned()),
                RowValues::Null => RowValues::Null,
            }),
            SqlType::Boolean => match &self {
                RowValues::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "1" => Some(RowValues::Bool(true)),
                    "false" | "f" | "0" => Some(RowValues::Bool(false)),
                    _ => None,
                },
                _ => self.as_bool().copied().map(RowValues::Bool),
            },
            SqlType::Date => self.as_date().map(RowValues::Date),
            SqlType::Time => self.as_time().map(RowValues::Time),
            SqlType::Timestamp => self.as_timestamp().map(RowValues::Timestamp),
            SqlType::Binary => match &self {
                RowValues::Blob(_) => Some(self.clone()),
                RowValues::Text(s) => Some(RowValues::Blob(s.as_bytes().to_vec())),
                _ => None,
            },
            SqlType::Json => match &self {
                RowValues::JSON(_) => Some(self.clone()),
                RowValues::Text(s) => serde_json::from_str(s).ok().map(RowValues::JSON),
                _ => None,
            },
            SqlType::Array | SqlType::Struct | SqlType::Other => Some(self.clone()),
        };
        coerced.ok_or_else(|| {
            SqlFluentError::ParameterError(format!("cannot convert {self:?} to {target:?}"))
        })
    }
}

macro_rules! row_values_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for RowValues {
                fn from(value: $ty) -> Self {
                    RowValues::Int(i64::from(value))
                }
            }
        )*
    };
}

row_values_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for RowValues {
    fn from(value: f32) -> Self {
        RowValues::Float(f64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_owned())
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl From<&[u8]> for RowValues {
    fn from(value: &[u8]) -> Self {
        RowValues::Blob(value.to_vec())
    }
}

impl From<Decimal> for RowValues {
    fn from(value: Decimal) -> Self {
        RowValues::Decimal(value)
    }
}

impl From<NaiveDate> for RowValues {
    fn from(value: NaiveDate) -> Self {
        RowValues::Date(value)
    }
}

impl From<NaiveTime> for RowValues {
    fn from(value: NaiveTime) -> Self {
        RowValues::Time(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        RowValues::JSON(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Explicit target type attached to a binder.
///
/// Needed for typed NULLs, for coercing generic values before they are bound, and for
/// reading OUT/INOUT parameters back in a known shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Numeric,
    Varchar,
    Boolean,
    Date,
    Time,
    Timestamp,
    Binary,
    Json,
    /// Engine array type; pair with a type name such as `integer[]`.
    Array,
    /// Engine composite type; pair with the composite's type name.
    Struct,
    Other,
}

/// The database type supported by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `PostgreSQL` database
    #[cfg(feature = "postgres")]
    Postgres,
    /// `SQLite` database
    #[cfg(feature = "sqlite")]
    Sqlite,
}
