//! Conversions between PostgreSQL wire values and `mover_core::Value`

use base64::Engine as _;
use bytes::BytesMut;
use std::net::IpAddr;
use tokio_postgres::types::{FromSql, ToSql, Type};
use tokio_postgres::Row as PgRow;

use mover_core::{MoverError, Result, Value};

/// Decoder for binary NUMERIC payloads.
///
/// tokio-postgres has no built-in NUMERIC target, so the wire format
/// (base-10000 digit groups with weight/sign/dscale header) is parsed by
/// hand and rendered as decimal text.
#[derive(Debug)]
pub(crate) struct PgNumericString(pub String);

impl PgNumericString {
    fn parse(raw: &[u8]) -> std::result::Result<String, Box<dyn std::error::Error + Sync + Send>> {
        if raw.len() < 8 {
            return Err("invalid NUMERIC payload: too short".into());
        }

        let ndigits = i16::from_be_bytes([raw[0], raw[1]]) as usize;
        let weight = i16::from_be_bytes([raw[2], raw[3]]);
        let sign = u16::from_be_bytes([raw[4], raw[5]]);
        let dscale = i16::from_be_bytes([raw[6], raw[7]]) as usize;
        let expected_len = 8 + ndigits * 2;

        if raw.len() < expected_len {
            return Err("invalid NUMERIC payload: truncated digits".into());
        }

        if sign == 0xC000 {
            return Ok("NaN".to_string());
        }

        let mut digits = Vec::with_capacity(ndigits);
        for index in 0..ndigits {
            let offset = 8 + index * 2;
            let group = u16::from_be_bytes([raw[offset], raw[offset + 1]]);
            if group > 9999 {
                return Err("invalid NUMERIC payload: group out of range".into());
            }
            digits.push(group);
        }

        if digits.is_empty() {
            return Ok("0".to_string());
        }

        let integer_group_count = if weight >= 0 {
            (weight as usize) + 1
        } else {
            0
        };

        let mut integer_text = String::new();
        if integer_group_count == 0 {
            integer_text.push('0');
        } else {
            for group_index in 0..integer_group_count {
                let group = digits.get(group_index).copied().unwrap_or(0);
                if group_index == 0 {
                    integer_text.push_str(&group.to_string());
                } else {
                    integer_text.push_str(&format!("{group:04}"));
                }
            }
        }

        let mut fraction_text = String::new();
        if dscale > 0 {
            // A weight below -1 means implicit all-zero groups between the
            // decimal point and the first stored digit group.
            if weight < -1 {
                fraction_text.push_str(&"0000".repeat((-weight as usize) - 1));
            }
            let start = integer_group_count.min(digits.len());
            for group in digits.iter().skip(start) {
                fraction_text.push_str(&format!("{group:04}"));
            }

            if fraction_text.len() < dscale {
                fraction_text.push_str(&"0".repeat(dscale - fraction_text.len()));
            } else {
                fraction_text.truncate(dscale);
            }

            while fraction_text.ends_with('0') {
                fraction_text.pop();
            }
        }

        let mut output = String::new();
        if sign == 0x4000 && integer_text != "0" {
            output.push('-');
        }
        output.push_str(&integer_text);
        if !fraction_text.is_empty() {
            output.push('.');
            output.push_str(&fraction_text);
        }

        Ok(output)
    }
}

impl<'a> FromSql<'a> for PgNumericString {
    fn from_sql(
        _: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Self(Self::parse(raw)?))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Encode decimal text into the binary NUMERIC wire format, the inverse of
/// `PgNumericString::parse`.
fn encode_numeric(
    text: &str,
    out: &mut BytesMut,
) -> std::result::Result<(), Box<dyn std::error::Error + Sync + Send>> {
    if text == "NaN" {
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&0i16.to_be_bytes());
        out.extend_from_slice(&0xC000u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        return Ok(());
    }

    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (integer_part, fraction_part) = text.split_once('.').unwrap_or((text, ""));
    if !integer_part.chars().chain(fraction_part.chars()).all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid NUMERIC literal: {}", text).into());
    }

    let integer_part = integer_part.trim_start_matches('0');
    let dscale = fraction_part.len();

    // Align the digits into base-10000 groups: the integer part padded on
    // the left, the fraction padded on the right.
    let mut digits_text = String::new();
    digits_text.push_str(&"0".repeat((4 - integer_part.len() % 4) % 4));
    digits_text.push_str(integer_part);
    let integer_groups = digits_text.len() / 4;
    digits_text.push_str(fraction_part);
    digits_text.push_str(&"0".repeat((4 - fraction_part.len() % 4) % 4));

    let mut groups: Vec<u16> = digits_text
        .as_bytes()
        .chunks(4)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or("0").parse().unwrap_or(0))
        .collect();

    let mut weight = integer_groups as i16 - 1;
    while groups.first() == Some(&0) {
        groups.remove(0);
        weight -= 1;
    }
    while groups.last() == Some(&0) {
        groups.pop();
    }
    if groups.is_empty() {
        weight = 0;
    }

    out.extend_from_slice(&(groups.len() as u16).to_be_bytes());
    out.extend_from_slice(&weight.to_be_bytes());
    out.extend_from_slice(&(if negative { 0x4000u16 } else { 0x0000 }).to_be_bytes());
    out.extend_from_slice(&(dscale as u16).to_be_bytes());
    for group in groups {
        out.extend_from_slice(&group.to_be_bytes());
    }

    Ok(())
}

/// Decoder for binary int4range/int8range payloads, rendered as the range
/// literal (`[lower,upper)`, `empty`, unbounded sides omitted).
#[derive(Debug)]
pub(crate) struct PgRangeString(pub String);

const RANGE_EMPTY: u8 = 0x01;
const RANGE_LB_INCLUSIVE: u8 = 0x02;
const RANGE_UB_INCLUSIVE: u8 = 0x04;
const RANGE_LB_INFINITE: u8 = 0x08;
const RANGE_UB_INFINITE: u8 = 0x10;

impl PgRangeString {
    fn parse(raw: &[u8]) -> std::result::Result<String, Box<dyn std::error::Error + Sync + Send>> {
        let flags = *raw.first().ok_or("invalid range payload: empty")?;
        if flags & RANGE_EMPTY != 0 {
            return Ok("empty".to_string());
        }

        let mut cursor = 1usize;
        let mut read_bound = || -> std::result::Result<i64, Box<dyn std::error::Error + Sync + Send>> {
            if raw.len() < cursor + 4 {
                return Err("invalid range payload: truncated bound length".into());
            }
            let len = i32::from_be_bytes(raw[cursor..cursor + 4].try_into()?) as usize;
            cursor += 4;
            if raw.len() < cursor + len {
                return Err("invalid range payload: truncated bound".into());
            }
            let element = &raw[cursor..cursor + len];
            cursor += len;
            match len {
                4 => Ok(i32::from_be_bytes(element.try_into()?) as i64),
                8 => Ok(i64::from_be_bytes(element.try_into()?)),
                _ => Err("invalid range payload: unexpected element width".into()),
            }
        };

        let lower = if flags & RANGE_LB_INFINITE == 0 {
            Some(read_bound()?)
        } else {
            None
        };
        let upper = if flags & RANGE_UB_INFINITE == 0 {
            Some(read_bound()?)
        } else {
            None
        };

        let mut output = String::new();
        output.push(if flags & RANGE_LB_INCLUSIVE != 0 { '[' } else { '(' });
        if let Some(lower) = lower {
            output.push_str(&lower.to_string());
        }
        output.push(',');
        if let Some(upper) = upper {
            output.push_str(&upper.to_string());
        }
        output.push(if flags & RANGE_UB_INCLUSIVE != 0 { ']' } else { ')' });
        Ok(output)
    }
}

impl<'a> FromSql<'a> for PgRangeString {
    fn from_sql(
        _: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Self(Self::parse(raw)?))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INT4_RANGE || *ty == Type::INT8_RANGE
    }
}

/// Last-resort decoder for custom types (enums and friends): the raw UTF-8
/// payload.
#[derive(Debug)]
pub(crate) struct PgFallbackString(pub String);

impl<'a> FromSql<'a> for PgFallbackString {
    fn from_sql(
        _: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        let text = String::from_utf8(raw.to_vec())?;
        Ok(Self(text))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

/// Convert one PostgreSQL row cell to a `Value`, by the column's type name.
pub(crate) fn postgres_to_value(row: &PgRow, idx: usize) -> Result<Value> {
    let col = &row.columns()[idx];
    let type_name = col.type_().name();

    let value = match type_name {
        "bool" => row
            .try_get::<_, Option<bool>>(idx)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "int2" | "smallint" => row
            .try_get::<_, Option<i16>>(idx)
            .ok()
            .flatten()
            .map(Value::Int16)
            .unwrap_or(Value::Null),
        "int4" | "int" | "integer" => row
            .try_get::<_, Option<i32>>(idx)
            .ok()
            .flatten()
            .map(Value::Int32)
            .unwrap_or(Value::Null),
        "int8" | "bigint" => row
            .try_get::<_, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(Value::Int64)
            .unwrap_or(Value::Null),
        "oid" => row
            .try_get::<_, Option<u32>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::Int64(v as i64))
            .unwrap_or(Value::Null),
        "float4" | "real" => row
            .try_get::<_, Option<f32>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::Float64(v as f64))
            .unwrap_or(Value::Null),
        "float8" | "double precision" => row
            .try_get::<_, Option<f64>>(idx)
            .ok()
            .flatten()
            .map(Value::Float64)
            .unwrap_or(Value::Null),
        "numeric" | "decimal" => row
            .try_get::<_, Option<PgNumericString>>(idx)
            .ok()
            .flatten()
            .map(|v| match v.0.parse::<f64>() {
                Ok(parsed) => Value::Float64(parsed),
                Err(_) => Value::String(v.0),
            })
            .unwrap_or(Value::Null),
        "text" | "varchar" | "char" | "bpchar" | "name" => row
            .try_get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
        "bytea" => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),
        "uuid" => row
            .try_get::<_, Option<uuid::Uuid>>(idx)
            .ok()
            .flatten()
            .map(Value::Uuid)
            .unwrap_or(Value::Null),
        "json" | "jsonb" => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .ok()
            .flatten()
            .map(Value::from_json)
            .unwrap_or(Value::Null),
        "date" => row
            .try_get::<_, Option<chrono::NaiveDate>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "time" => row
            .try_get::<_, Option<chrono::NaiveTime>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "timestamp" => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null),
        "timestamptz" => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_rfc3339()))
            .unwrap_or(Value::Null),
        "inet" => row
            .try_get::<_, Option<IpAddr>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "int4range" | "int8range" => row
            .try_get::<_, Option<PgRangeString>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::String(v.0))
            .unwrap_or(Value::Null),
        // Array types carry an underscore prefix on the wire.
        "_text" | "_varchar" | "_bpchar" | "_name" => row
            .try_get::<_, Option<Vec<String>>>(idx)
            .ok()
            .flatten()
            .map(|arr| Value::Array(arr.into_iter().map(Value::String).collect()))
            .unwrap_or(Value::Null),
        "_int2" => row
            .try_get::<_, Option<Vec<i16>>>(idx)
            .ok()
            .flatten()
            .map(|arr| Value::Array(arr.into_iter().map(Value::Int16).collect()))
            .unwrap_or(Value::Null),
        "_int4" => row
            .try_get::<_, Option<Vec<i32>>>(idx)
            .ok()
            .flatten()
            .map(|arr| Value::Array(arr.into_iter().map(Value::Int32).collect()))
            .unwrap_or(Value::Null),
        "_int8" => row
            .try_get::<_, Option<Vec<i64>>>(idx)
            .ok()
            .flatten()
            .map(|arr| Value::Array(arr.into_iter().map(Value::Int64).collect()))
            .unwrap_or(Value::Null),
        "_float8" => row
            .try_get::<_, Option<Vec<f64>>>(idx)
            .ok()
            .flatten()
            .map(|arr| Value::Array(arr.into_iter().map(Value::Float64).collect()))
            .unwrap_or(Value::Null),
        _ => {
            // Custom types (e.g. enums): decode the raw UTF-8 payload.
            row.try_get::<_, Option<PgFallbackString>>(idx)
                .ok()
                .flatten()
                .map(|v| Value::String(v.0))
                .unwrap_or(Value::Null)
        }
    };

    Ok(value)
}

/// Owned parameter wrapper implementing `ToSql`.
///
/// Values are coerced to the prepared statement's parameter types so
/// tokio-postgres writes the correct binary width, JSON-origin integers land
/// in the column's actual integer type, and JSON-origin arrays become typed
/// PostgreSQL arrays.
#[derive(Debug)]
pub(crate) enum PgValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Numeric(String),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    IpAddr(IpAddr),
    Json(serde_json::Value),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    DateTime(chrono::NaiveDateTime),
    DateTimeUtc(chrono::DateTime<chrono::Utc>),
    Int16Array(Vec<i16>),
    Int32Array(Vec<i32>),
    Int64Array(Vec<i64>),
    Float64Array(Vec<f64>),
    StringArray(Vec<String>),
}

impl PgValue {
    /// Convert a `Value` into the `PgValue` that matches the target
    /// PostgreSQL parameter type.
    pub(crate) fn from_value_for_type(value: &Value, target_type: &Type) -> Self {
        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),

            Value::Int16(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int32(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int64(v) => Self::coerce_int(*v, target_type),

            Value::Float64(v) => {
                if *target_type == Type::FLOAT4 {
                    PgValue::Float32(*v as f32)
                } else if *target_type == Type::NUMERIC {
                    PgValue::Numeric(v.to_string())
                } else {
                    PgValue::Float64(*v)
                }
            }

            Value::String(v) => Self::coerce_string(v, target_type),
            Value::Bytes(v) => PgValue::Bytes(v.clone()),
            Value::Uuid(v) => {
                if *target_type == Type::TEXT || *target_type == Type::VARCHAR {
                    PgValue::String(v.to_string())
                } else {
                    PgValue::Uuid(*v)
                }
            }
            Value::Json(v) => PgValue::Json(v.clone()),
            Value::Array(items) => Self::coerce_array(items, target_type),
        }
    }

    /// Fallback used when the statement does not expose a parameter type.
    pub(crate) fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),
            Value::Int16(v) => PgValue::Int16(*v),
            Value::Int32(v) => PgValue::Int32(*v),
            Value::Int64(v) => PgValue::Int64(*v),
            Value::Float64(v) => PgValue::Float64(*v),
            Value::String(v) => PgValue::String(v.clone()),
            Value::Bytes(v) => PgValue::Bytes(v.clone()),
            Value::Uuid(v) => PgValue::Uuid(*v),
            Value::Json(v) => PgValue::Json(v.clone()),
            Value::Array(items) => {
                PgValue::StringArray(items.iter().map(|v| v.to_string()).collect())
            }
        }
    }

    /// Pick the integer variant that matches the target column width.
    fn coerce_int(value: i64, target_type: &Type) -> Self {
        if *target_type == Type::INT2 {
            PgValue::Int16(value as i16)
        } else if *target_type == Type::INT4 {
            PgValue::Int32(value as i32)
        } else if *target_type == Type::FLOAT4 {
            PgValue::Float32(value as f32)
        } else if *target_type == Type::FLOAT8 {
            PgValue::Float64(value as f64)
        } else if *target_type == Type::NUMERIC {
            PgValue::Numeric(value.to_string())
        } else {
            PgValue::Int64(value)
        }
    }

    /// Coerce string literals into strongly typed parameters when the
    /// prepared statement names a concrete target type. This is what lets
    /// payloads round-trip: timestamps, dates, JSON, UUIDs, and inet values
    /// all travel as strings.
    fn coerce_string(value: &str, target_type: &Type) -> Self {
        if *target_type == Type::JSON || *target_type == Type::JSONB {
            serde_json::from_str::<serde_json::Value>(value)
                .map(PgValue::Json)
                .unwrap_or_else(|_| PgValue::String(value.to_string()))
        } else if *target_type == Type::UUID {
            value
                .parse::<uuid::Uuid>()
                .map(PgValue::Uuid)
                .unwrap_or_else(|_| PgValue::String(value.to_string()))
        } else if *target_type == Type::INET {
            value
                .parse::<IpAddr>()
                .map(PgValue::IpAddr)
                .unwrap_or_else(|_| PgValue::String(value.to_string()))
        } else if *target_type == Type::NUMERIC {
            PgValue::Numeric(value.to_string())
        } else if *target_type == Type::BYTEA {
            base64::engine::general_purpose::STANDARD
                .decode(value)
                .map(PgValue::Bytes)
                .unwrap_or_else(|_| PgValue::String(value.to_string()))
        } else if *target_type == Type::DATE {
            chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(PgValue::Date)
                .unwrap_or_else(|_| PgValue::String(value.to_string()))
        } else if *target_type == Type::TIME {
            chrono::NaiveTime::parse_from_str(value, "%H:%M:%S")
                .or_else(|_| chrono::NaiveTime::parse_from_str(value, "%H:%M:%S%.f"))
                .map(PgValue::Time)
                .unwrap_or_else(|_| PgValue::String(value.to_string()))
        } else if *target_type == Type::TIMESTAMP {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
                .map(PgValue::DateTime)
                .unwrap_or_else(|_| PgValue::String(value.to_string()))
        } else if *target_type == Type::TIMESTAMPTZ {
            chrono::DateTime::parse_from_rfc3339(value)
                .map(|v| PgValue::DateTimeUtc(v.with_timezone(&chrono::Utc)))
                .unwrap_or_else(|_| PgValue::String(value.to_string()))
        } else {
            PgValue::String(value.to_string())
        }
    }

    /// Coerce a decoded JSON array to the typed array of the destination
    /// column.
    fn coerce_array(items: &[Value], target_type: &Type) -> Self {
        if *target_type == Type::INT2_ARRAY {
            PgValue::Int16Array(
                items
                    .iter()
                    .filter_map(|v| v.as_i64())
                    .map(|v| v as i16)
                    .collect(),
            )
        } else if *target_type == Type::INT4_ARRAY {
            PgValue::Int32Array(
                items
                    .iter()
                    .filter_map(|v| v.as_i64())
                    .map(|v| v as i32)
                    .collect(),
            )
        } else if *target_type == Type::INT8_ARRAY {
            PgValue::Int64Array(items.iter().filter_map(|v| v.as_i64()).collect())
        } else if *target_type == Type::FLOAT8_ARRAY {
            PgValue::Float64Array(items.iter().filter_map(|v| v.as_f64()).collect())
        } else if *target_type == Type::JSON || *target_type == Type::JSONB {
            let tree = serde_json::Value::Array(
                items
                    .iter()
                    .map(|v| serde_json::to_value(v).unwrap_or(serde_json::Value::Null))
                    .collect(),
            );
            PgValue::Json(tree)
        } else {
            PgValue::StringArray(items.iter().map(|v| v.to_string()).collect())
        }
    }
}

impl ToSql for PgValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<postgres_types::IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            PgValue::Null => Ok(postgres_types::IsNull::Yes),
            PgValue::Bool(v) => v.to_sql(ty, out),
            PgValue::Int16(v) => v.to_sql(ty, out),
            PgValue::Int32(v) => v.to_sql(ty, out),
            PgValue::Int64(v) => v.to_sql(ty, out),
            PgValue::Float32(v) => v.to_sql(ty, out),
            PgValue::Float64(v) => v.to_sql(ty, out),
            PgValue::Numeric(v) => {
                encode_numeric(v, out)?;
                Ok(postgres_types::IsNull::No)
            }
            PgValue::String(v) => v.to_sql(ty, out),
            PgValue::Bytes(v) => v.to_sql(ty, out),
            PgValue::Uuid(v) => v.to_sql(ty, out),
            PgValue::IpAddr(v) => v.to_sql(ty, out),
            PgValue::Json(v) => v.to_sql(ty, out),
            PgValue::Date(v) => v.to_sql(ty, out),
            PgValue::Time(v) => v.to_sql(ty, out),
            PgValue::DateTime(v) => v.to_sql(ty, out),
            PgValue::DateTimeUtc(v) => v.to_sql(ty, out),
            PgValue::Int16Array(v) => v.to_sql(ty, out),
            PgValue::Int32Array(v) => v.to_sql(ty, out),
            PgValue::Int64Array(v) => v.to_sql(ty, out),
            PgValue::Float64Array(v) => v.to_sql(ty, out),
            PgValue::StringArray(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}

/// Escape a PostgreSQL identifier.
pub(crate) fn escape_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Translate a driver error, surfacing constraint details for the common
/// violation classes.
pub(crate) fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let code = db_error.code();
    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail() {
        if !detail.trim().is_empty() {
            message.push_str(&format!(" (detail: {})", detail));
        }
    }

    match code.code() {
        "23505" => format!("duplicate value violates unique constraint: {}", message),
        "23503" => format!("foreign key violation: {}", message),
        "23502" => format!("null value violates not-null constraint: {}", message),
        _ => format!("{} (code: {:?})", message, code),
    }
}

/// Wrap a query failure with the statement that produced it.
pub(crate) fn query_error(query: &str, args: &[Value], error: &tokio_postgres::Error) -> MoverError {
    let rendered_args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    MoverError::Query(format!(
        "{} (query: {}, args: [{}])",
        format_postgres_error(error),
        query,
        rendered_args.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_payload(ndigits: u16, weight: i16, sign: u16, dscale: u16, groups: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&ndigits.to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&dscale.to_be_bytes());
        for group in groups {
            raw.extend_from_slice(&group.to_be_bytes());
        }
        raw
    }

    #[test]
    fn test_numeric_parse_integer() {
        // 12345678 = groups [1234, 5678], weight 1
        let raw = numeric_payload(2, 1, 0x0000, 0, &[1234, 5678]);
        assert_eq!(PgNumericString::parse(&raw).unwrap(), "12345678");
    }

    #[test]
    fn test_numeric_parse_fraction() {
        // 1.5 = groups [1, 5000], weight 0, dscale 1
        let raw = numeric_payload(2, 0, 0x0000, 1, &[1, 5000]);
        assert_eq!(PgNumericString::parse(&raw).unwrap(), "1.5");
    }

    #[test]
    fn test_numeric_parse_negative() {
        let raw = numeric_payload(1, 0, 0x4000, 0, &[42]);
        assert_eq!(PgNumericString::parse(&raw).unwrap(), "-42");
    }

    #[test]
    fn test_numeric_parse_nan() {
        let raw = numeric_payload(0, 0, 0xC000, 0, &[]);
        assert_eq!(PgNumericString::parse(&raw).unwrap(), "NaN");
    }

    fn range_payload(flags: u8, bounds: &[i32]) -> Vec<u8> {
        let mut raw = vec![flags];
        for bound in bounds {
            raw.extend_from_slice(&4i32.to_be_bytes());
            raw.extend_from_slice(&bound.to_be_bytes());
        }
        raw
    }

    #[test]
    fn test_range_parse_closed_open() {
        // canonical int4range: [1,10)
        let raw = range_payload(RANGE_LB_INCLUSIVE, &[1, 10]);
        assert_eq!(PgRangeString::parse(&raw).unwrap(), "[1,10)");
    }

    #[test]
    fn test_range_parse_empty() {
        let raw = range_payload(RANGE_EMPTY, &[]);
        assert_eq!(PgRangeString::parse(&raw).unwrap(), "empty");
    }

    #[test]
    fn test_range_parse_unbounded_lower() {
        let raw = range_payload(RANGE_LB_INFINITE, &[5]);
        assert_eq!(PgRangeString::parse(&raw).unwrap(), "(,5)");
    }

    #[test]
    fn test_encode_numeric_round_trips_through_parse() {
        for literal in ["0", "1.5", "12345678", "-42", "0.00005", "10000", "NaN"] {
            let mut out = BytesMut::new();
            encode_numeric(literal, &mut out).unwrap();
            assert_eq!(
                PgNumericString::parse(&out).unwrap(),
                literal,
                "round trip failed for {}",
                literal
            );
        }
    }

    #[test]
    fn test_encode_numeric_rejects_garbage() {
        let mut out = BytesMut::new();
        assert!(encode_numeric("12,5", &mut out).is_err());
    }

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("user"), "\"user\"");
        assert_eq!(escape_identifier("od\"d"), "\"od\"\"d\"");
    }

    #[test]
    fn test_coerce_int_matches_column_width() {
        assert!(matches!(
            PgValue::from_value_for_type(&Value::Int64(7), &Type::INT2),
            PgValue::Int16(7)
        ));
        assert!(matches!(
            PgValue::from_value_for_type(&Value::Int64(7), &Type::INT4),
            PgValue::Int32(7)
        ));
        assert!(matches!(
            PgValue::from_value_for_type(&Value::Int32(7), &Type::INT8),
            PgValue::Int64(7)
        ));
    }

    #[test]
    fn test_coerce_string_to_json_target() {
        let coerced = PgValue::from_value_for_type(
            &Value::String("{\"a\":1}".into()),
            &Type::JSONB,
        );
        assert!(matches!(coerced, PgValue::Json(_)));
    }

    #[test]
    fn test_coerce_string_to_timestamptz_target() {
        let coerced = PgValue::from_value_for_type(
            &Value::String("2026-01-02T03:04:05+00:00".into()),
            &Type::TIMESTAMPTZ,
        );
        assert!(matches!(coerced, PgValue::DateTimeUtc(_)));
    }

    #[test]
    fn test_coerce_json_array_to_typed_array() {
        let items = vec![Value::Int64(1), Value::Int64(2)];
        assert!(matches!(
            PgValue::from_value_for_type(&Value::Array(items.clone()), &Type::INT2_ARRAY),
            PgValue::Int16Array(ref v) if v == &vec![1i16, 2]
        ));
        assert!(matches!(
            PgValue::from_value_for_type(&Value::Array(items), &Type::INT4_ARRAY),
            PgValue::Int32Array(ref v) if v == &vec![1i32, 2]
        ));

        let strings = vec![Value::String("a".into()), Value::String("b".into())];
        assert!(matches!(
            PgValue::from_value_for_type(&Value::Array(strings), &Type::VARCHAR_ARRAY),
            PgValue::StringArray(ref v) if v == &vec!["a".to_string(), "b".to_string()]
        ));
    }
}
