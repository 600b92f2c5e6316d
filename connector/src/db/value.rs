//! Conversion of Postgres rows into JSON rows

use std::fmt::Write as _;

use bigdecimal::ToPrimitive;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Number, Value};
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgHasArrayType, PgRow, PgTypeInfo, PgTypeKind, PgValueFormat, Postgres};
use sqlx::types::{BigDecimal, Uuid};
use sqlx::{Column, Decode, Row as _, Type, TypeInfo, ValueRef};

/// One record, keyed by column name in result-description order
pub type Row = Map<String, Value>;

/// Every row returned by one statement
pub type ResultSet = Vec<Row>;

// Sign word of the binary NUMERIC header for the special values
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_POS_INF: u16 = 0xD000;
const NUMERIC_NEG_INF: u16 = 0xF000;

/// Convert a row, keeping each column's scalar type
pub fn row_to_json(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut out = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let value = column_value(row, column.ordinal(), column.type_info())?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn column_value(row: &PgRow, idx: usize, type_info: &PgTypeInfo) -> Result<Value, sqlx::Error> {
    // Enum labels travel as their text in both wire formats
    if let PgTypeKind::Enum(_) = type_info.kind() {
        return Ok(get_text_unchecked(row, idx)?.unwrap_or(Value::Null));
    }

    // Builtins are named in upper case, extension types by their lower-case typname
    let name = type_info.name().to_ascii_uppercase();
    let value = match name.as_str() {
        "BOOL" => get::<bool>(row, idx)?.map(Value::Bool),
        "INT2" => get::<i16>(row, idx)?.map(Value::from),
        "INT4" => get::<i32>(row, idx)?.map(Value::from),
        "INT8" => get::<i64>(row, idx)?.map(Value::from),
        "OID" => get::<Oid>(row, idx)?.map(|oid| Value::from(oid.0)),
        "FLOAT4" => get::<f32>(row, idx)?.map(|f| float(f64::from(f))),
        "FLOAT8" => get::<f64>(row, idx)?.map(float),
        "NUMERIC" => numeric(row, idx)?,
        "TEXT" | "VARCHAR" | "CHAR" | "NAME" | "UNKNOWN" => get::<String>(row, idx)?.map(Value::String),
        "CITEXT" => get_text_unchecked(row, idx)?,
        "DATE" => get::<NaiveDate>(row, idx)?.map(date),
        "TIME" => get::<NaiveTime>(row, idx)?.map(time),
        "TIMESTAMP" => get::<NaiveDateTime>(row, idx)?.map(timestamp),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, idx)?.map(timestamptz),
        "UUID" => get::<Uuid>(row, idx)?.map(uuid),
        "JSON" | "JSONB" => get::<Value>(row, idx)?,
        "BYTEA" => get::<Vec<u8>>(row, idx)?.map(|b| Value::String(hex(&b))),
        array if array.ends_with("[]") => array_value(row, idx, array)?,
        _ => return Err(unsupported(idx, type_info.name())),
    };

    Ok(value.unwrap_or(Value::Null))
}

/// One-dimensional arrays of the scalar types above
fn array_value(row: &PgRow, idx: usize, name: &str) -> Result<Option<Value>, sqlx::Error> {
    match name.trim_end_matches("[]") {
        "BOOL" => list::<bool>(row, idx, Value::Bool),
        "INT2" => list::<i16>(row, idx, Value::from),
        "INT4" => list::<i32>(row, idx, Value::from),
        "INT8" => list::<i64>(row, idx, Value::from),
        "FLOAT4" => list::<f32>(row, idx, |f| float(f64::from(f))),
        "FLOAT8" => list::<f64>(row, idx, float),
        "NUMERIC" => list::<BigDecimal>(row, idx, |d| decimal(d, None)),
        "TEXT" | "VARCHAR" | "CHAR" | "NAME" => list::<String>(row, idx, Value::String),
        "DATE" => list::<NaiveDate>(row, idx, date),
        "TIME" => list::<NaiveTime>(row, idx, time),
        "TIMESTAMP" => list::<NaiveDateTime>(row, idx, timestamp),
        "TIMESTAMPTZ" => list::<DateTime<Utc>>(row, idx, timestamptz),
        "UUID" => list::<Uuid>(row, idx, uuid),
        _ => Err(unsupported(idx, name)),
    }
}

fn get<'r, T>(row: &'r PgRow, idx: usize) -> Result<Option<T>, sqlx::Error>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<Option<T>, _>(idx)
}

fn get_text_unchecked(row: &PgRow, idx: usize) -> Result<Option<Value>, sqlx::Error> {
    Ok(row
        .try_get_unchecked::<Option<String>, _>(idx)?
        .map(Value::String))
}

fn list<T>(
    row: &PgRow,
    idx: usize,
    convert: impl Fn(T) -> Value,
) -> Result<Option<Value>, sqlx::Error>
where
    T: for<'a> Decode<'a, Postgres> + Type<Postgres> + PgHasArrayType,
{
    let items = get::<Vec<Option<T>>>(row, idx)?;
    Ok(items.map(|items| {
        Value::Array(
            items
                .into_iter()
                .map(|item| item.map(&convert).unwrap_or(Value::Null))
                .collect(),
        )
    }))
}

/// NUMERIC, including the special values no decimal type can hold
fn numeric(row: &PgRow, idx: usize) -> Result<Option<Value>, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(None);
    }

    // Binary header: ndigits, weight, sign, dscale (all 16-bit big-endian)
    let dscale = match (raw.format(), raw.as_bytes()) {
        (PgValueFormat::Binary, Ok(bytes)) if bytes.len() >= 8 => {
            match u16::from_be_bytes([bytes[4], bytes[5]]) {
                NUMERIC_NAN => return Ok(Some(Value::String("NaN".to_string()))),
                NUMERIC_POS_INF => return Ok(Some(Value::String("Infinity".to_string()))),
                NUMERIC_NEG_INF => return Ok(Some(Value::String("-Infinity".to_string()))),
                _ => Some(i64::from(u16::from_be_bytes([bytes[6], bytes[7]]))),
            }
        }
        _ => None,
    };

    Ok(get::<BigDecimal>(row, idx)?.map(|d| decimal(d, dscale)))
}

/// Integer when the declared scale is zero, otherwise a float
///
/// Falls back to exact text when the value does not fit the JSON number.
fn decimal(d: BigDecimal, dscale: Option<i64>) -> Value {
    let scale = dscale.unwrap_or_else(|| d.as_bigint_and_exponent().1);
    if scale <= 0 {
        return d
            .to_i64()
            .map(Value::from)
            .unwrap_or_else(|| Value::String(d.with_scale(0).to_string()));
    }
    d.to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(d.to_string()))
}

fn float(f: f64) -> Value {
    Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(f.to_string()))
}

fn date(d: NaiveDate) -> Value {
    Value::String(d.to_string())
}

fn time(t: NaiveTime) -> Value {
    Value::String(t.to_string())
}

fn timestamp(ts: NaiveDateTime) -> Value {
    Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn timestamptz(ts: DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339())
}

fn uuid(u: Uuid) -> Value {
    Value::String(u.to_string())
}

// Postgres text form: \x followed by lowercase hex
fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

fn unsupported(idx: usize, type_name: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: idx.to_string(),
        source: format!("unsupported column type {}", type_name).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn big(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_zero_scale_decimal_is_integer() {
        assert_eq!(decimal(big("42"), Some(0)), Value::from(42));
    }

    #[test]
    fn test_scaled_decimal_is_float() {
        assert_eq!(decimal(big("1234.50"), Some(2)), serde_json::json!(1234.5));
        assert_eq!(decimal(big("1000"), Some(2)), serde_json::json!(1000.0));
    }

    #[test]
    fn test_wide_integer_decimal_keeps_every_digit() {
        let digits = "123456789012345678901234567890123";
        assert_eq!(decimal(big(digits), Some(0)), Value::String(digits.to_string()));
    }

    #[test]
    fn test_array_element_scale_comes_from_value() {
        assert_eq!(decimal(big("7"), None), Value::from(7));
        assert_eq!(decimal(big("0.25"), None), serde_json::json!(0.25));
    }

    #[test]
    fn test_non_finite_float_falls_back_to_text() {
        assert_eq!(float(f64::NAN), Value::String("NaN".to_string()));
        assert_eq!(float(2.5), serde_json::json!(2.5));
    }

    #[test]
    fn test_bytea_hex() {
        assert_eq!(hex(&[0xde, 0xad, 0x01]), "\\xdead01");
        assert_eq!(hex(&[]), "\\x");
    }

    #[test]
    fn test_unsupported_type_names_column() {
        let err = unsupported(3, "INET");
        assert!(err.to_string().contains("unsupported column type INET"));
    }
}
