use std::error::Error;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::binder::{ParameterBinder, bind_values};
use crate::error::SqlFluentError;
use crate::types::RowValues;

/// Resolved send values for one statement execution.
#[derive(Debug, Clone, Default)]
pub struct Params(pub Vec<RowValues>);

impl Params {
    /// Resolve every binder's send value, in position order.
    ///
    /// # Errors
    /// Returns `SqlFluentError::ParameterError` if a typed binder cannot be coerced.
    pub fn from_binders(binders: &[ParameterBinder]) -> Result<Self, SqlFluentError> {
        Ok(Params(bind_values(binders)?))
    }

    /// Get the parameters as driver references.
    #[must_use]
    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.0.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
    }
}

type BoxError = Box<dyn Error + Sync + Send>;

fn lossy(what: &str, ty: &Type) -> BoxError {
    format!("{what} cannot be sent as {ty}").into()
}

impl ToSql for RowValues {
    fn to_sql(&self, ty: &Type, out: &mut bytes::BytesMut) -> Result<IsNull, BoxError> {
        match self {
            RowValues::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::OID => u32::try_from(*i)?.to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*i).to_sql(ty, out),
                Type::BOOL => (*i != 0).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
                    i.to_string().to_sql(ty, out)
                }
                _ => i.to_sql(ty, out),
            },
            RowValues::Float(f) => match *ty {
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::from_f64(*f)
                    .ok_or_else(|| lossy("float", ty))?
                    .to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => f.to_string().to_sql(ty, out),
                _ => f.to_sql(ty, out),
            },
            RowValues::Decimal(d) => match *ty {
                Type::FLOAT4 | Type::FLOAT8 => {
                    d.to_f64().ok_or_else(|| lossy("decimal", ty))?.to_sql(ty, out)
                }
                Type::TEXT | Type::VARCHAR => d.to_string().to_sql(ty, out),
                _ => d.to_sql(ty, out),
            },
            RowValues::Text(s) => s.to_sql(ty, out),
            RowValues::Bool(b) => b.to_sql(ty, out),
            RowValues::Date(d) => d.to_sql(ty, out),
            RowValues::Time(t) => t.to_sql(ty, out),
            RowValues::Timestamp(dt) => match *ty {
                Type::TIMESTAMPTZ => Utc.from_utc_datetime(dt).to_sql(ty, out),
                _ => dt.to_sql(ty, out),
            },
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::JSON(jsval) => jsval.to_sql(ty, out),
            RowValues::Blob(bytes) => bytes.to_sql(ty, out),
        }
    }

    // NULL has to bind against any column type, including arrays and composites.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &RowValues, ty: &Type) -> Result<Vec<u8>, BoxError> {
        let mut out = bytes::BytesMut::new();
        value.to_sql(ty, &mut out)?;
        Ok(out.to_vec())
    }

    #[test]
    fn integers_narrow_to_column_width() {
        assert_eq!(encode(&RowValues::Int(7), &Type::INT2).unwrap().len(), 2);
        assert_eq!(encode(&RowValues::Int(7), &Type::INT4).unwrap().len(), 4);
        assert_eq!(encode(&RowValues::Int(7), &Type::INT8).unwrap().len(), 8);
        assert!(encode(&RowValues::Int(70_000), &Type::INT2).is_err());
    }

    #[test]
    fn floats_narrow_to_float4() {
        assert_eq!(encode(&RowValues::Float(1.5), &Type::FLOAT4).unwrap().len(), 4);
        assert_eq!(encode(&RowValues::Float(1.5), &Type::FLOAT8).unwrap().len(), 8);
    }

    #[test]
    fn null_is_accepted_for_any_type() {
        let mut out = bytes::BytesMut::new();
        let is_null = RowValues::Null
            .to_sql_checked(&Type::INT4_ARRAY, &mut out)
            .unwrap();
        assert!(matches!(is_null, IsNull::Yes));
    }
}
