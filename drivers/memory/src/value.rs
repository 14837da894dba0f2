//! Dynamically typed column value stored by a [`crate::table::Table`].
//!
//! Mirrors the shape of [`edba::types::BindValue`]/[`edba::types::FetchValue`]
//! closely enough that conversion in either direction is a straight match.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use edba::error::{Error, Result};
use edba::types::{BindValue, FetchValue};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Blob(Vec<u8>),
}

impl Value {
    pub fn from_bind(v: &BindValue<'_>) -> Self {
        match v {
            BindValue::Null => Value::Null,
            BindValue::I16(x) => Value::Int(*x as i64),
            BindValue::U16(x) => Value::Int(*x as i64),
            BindValue::I32(x) => Value::Int(*x as i64),
            BindValue::U32(x) => Value::Int(*x as i64),
            BindValue::I64(x) => Value::Int(*x),
            BindValue::U64(x) => Value::Int(*x as i64),
            BindValue::F32(x) => Value::Float(*x as f64),
            BindValue::F64(x) => Value::Float(*x),
            BindValue::Str(s) => Value::Str((*s).to_string()),
            BindValue::DateTime(dt) => Value::DateTime(*dt),
            BindValue::Date(d) => Value::Date(*d),
            BindValue::Time(t) => Value::Time(*t),
            BindValue::Blob(b) => Value::Blob(b.to_vec()),
        }
    }

    /// Writes `self` into `dest`, coercing between numeric/text
    /// representations the way a real backend's `fetch` would. Returns
    /// `false` (leaving `dest` untouched) for `Value::Null`.
    pub fn write_into(&self, dest: &mut FetchValue<'_>) -> Result<bool> {
        if matches!(self, Value::Null) {
            return Ok(false);
        }
        match dest {
            FetchValue::I16(d) => **d = self.as_i64()?.try_into().map_err(cast_overflow)?,
            FetchValue::U16(d) => **d = self.as_i64()?.try_into().map_err(cast_overflow)?,
            FetchValue::I32(d) => **d = self.as_i64()?.try_into().map_err(cast_overflow)?,
            FetchValue::U32(d) => **d = self.as_i64()?.try_into().map_err(cast_overflow)?,
            FetchValue::I64(d) => **d = self.as_i64()?,
            FetchValue::U64(d) => **d = self.as_i64()?.try_into().map_err(cast_overflow)?,
            FetchValue::F32(d) => **d = self.as_f64()? as f32,
            FetchValue::F64(d) => **d = self.as_f64()?,
            FetchValue::Str(d) => **d = self.as_text(),
            FetchValue::DateTime(d) => **d = self.as_datetime()?,
            FetchValue::Date(d) => **d = self.as_date()?,
            FetchValue::Time(d) => **d = self.as_time()?,
            FetchValue::Blob(d) => **d = self.as_blob()?,
        }
        Ok(true)
    }

    fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Int(v) => Ok(*v),
            Value::Float(v) if v.fract() == 0.0 => Ok(*v as i64),
            Value::Str(s) => s
                .parse()
                .map_err(|_| Error::bad_value_cast(format!("'{s}' is not an integer"))),
            other => Err(Error::bad_value_cast(format!("{other:?} is not numeric"))),
        }
    }

    fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Int(v) => Ok(*v as f64),
            Value::Float(v) => Ok(*v),
            Value::Str(s) => s
                .parse()
                .map_err(|_| Error::bad_value_cast(format!("'{s}' is not a float"))),
            other => Err(Error::bad_value_cast(format!("{other:?} is not numeric"))),
        }
    }

    fn as_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Str(s) => s.clone(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Time(t) => t.format("%H:%M:%S").to_string(),
            Value::Blob(_) => "(BLOB)".to_string(),
        }
    }

    fn as_datetime(&self) -> Result<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Ok(*dt),
            Value::Str(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map_err(|_| Error::bad_value_cast(format!("'{s}' is not a timestamp"))),
            other => Err(Error::bad_value_cast(format!("{other:?} is not a timestamp"))),
        }
    }

    fn as_date(&self) -> Result<NaiveDate> {
        match self {
            Value::Date(d) => Ok(*d),
            Value::DateTime(dt) => Ok(dt.date()),
            Value::Str(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| Error::bad_value_cast(format!("'{s}' is not a date"))),
            other => Err(Error::bad_value_cast(format!("{other:?} is not a date"))),
        }
    }

    fn as_time(&self) -> Result<NaiveTime> {
        match self {
            Value::Time(t) => Ok(*t),
            Value::DateTime(dt) => Ok(dt.time()),
            Value::Str(s) => NaiveTime::parse_from_str(s, "%H:%M:%S")
                .map_err(|_| Error::bad_value_cast(format!("'{s}' is not a time"))),
            other => Err(Error::bad_value_cast(format!("{other:?} is not a time"))),
        }
    }

    fn as_blob(&self) -> Result<Vec<u8>> {
        match self {
            Value::Blob(b) => Ok(b.clone()),
            Value::Str(s) => Ok(s.clone().into_bytes()),
            other => Err(Error::bad_value_cast(format!("{other:?} is not a blob"))),
        }
    }
}

fn cast_overflow(_: std::num::TryFromIntError) -> Error {
    Error::bad_value_cast("value out of range for destination type")
}
