//! The two closed-sum "variant" types that cross the backend contract
//! boundary, plus the extension points ([`BindConversion`], [`FetchConversion`])
//! user types plug custom binding/fetching behavior into.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Error, Result};
use crate::row::Row;
use crate::statement::Statement;

/// A value a caller can bind to a placeholder. At most one variant is ever
/// active for a given bind call.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue<'a> {
    Null,
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    /// Also used for an engine's 80-bit "long double" bind slot: Rust has no
    /// native 80-bit float, so it collapses into the widest native float.
    F64(f64),
    Str(&'a str),
    /// Broken-down date-time, both fields set.
    DateTime(NaiveDateTime),
    /// Civil date only, no time-of-day component.
    Date(NaiveDate),
    /// Time-of-day only, no date component.
    Time(NaiveTime),
    Blob(&'a [u8]),
}

impl std::fmt::Display for BindValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindValue::Null => write!(f, "(NULL)"),
            BindValue::I16(v) => write!(f, "'{v}'"),
            BindValue::U16(v) => write!(f, "'{v}'"),
            BindValue::I32(v) => write!(f, "'{v}'"),
            BindValue::U32(v) => write!(f, "'{v}'"),
            BindValue::I64(v) => write!(f, "'{v}'"),
            BindValue::U64(v) => write!(f, "'{v}'"),
            BindValue::F32(v) => write!(f, "'{v}'"),
            BindValue::F64(v) => write!(f, "'{v}'"),
            BindValue::Str(v) => write!(f, "'{v}'"),
            BindValue::DateTime(v) => write!(f, "'{}'", v.format("%Y-%m-%d %H:%M:%S")),
            BindValue::Date(v) => write!(f, "'{}'", v.format("%Y-%m-%d")),
            BindValue::Time(v) => write!(f, "'{}'", v.format("%H:%M:%S")),
            BindValue::Blob(_) => write!(f, "(BLOB)"),
        }
    }
}

/// A destination a caller can fetch a column into. Each variant wraps a
/// mutable reference so the backend can write straight into caller storage.
pub enum FetchValue<'a> {
    I16(&'a mut i16),
    U16(&'a mut u16),
    I32(&'a mut i32),
    U32(&'a mut u32),
    I64(&'a mut i64),
    U64(&'a mut u64),
    F32(&'a mut f32),
    F64(&'a mut f64),
    Str(&'a mut String),
    DateTime(&'a mut NaiveDateTime),
    Date(&'a mut NaiveDate),
    Time(&'a mut NaiveTime),
    Blob(&'a mut Vec<u8>),
}

/// Converts a Rust value into the [`BindValue`] it natively corresponds to.
/// Shipped for every primitive bind type; user types implement this (or the
/// richer [`BindConversion`]) to plug into `Statement::bind`.
pub trait ToBindValue {
    fn to_bind_value(&self) -> BindValue<'_>;
}

macro_rules! impl_to_bind_value {
    ($ty:ty, $variant:ident) => {
        impl ToBindValue for $ty {
            fn to_bind_value(&self) -> BindValue<'_> {
                BindValue::$variant(*self)
            }
        }
    };
}

impl_to_bind_value!(i16, I16);
impl_to_bind_value!(u16, U16);
impl_to_bind_value!(i32, I32);
impl_to_bind_value!(u32, U32);
impl_to_bind_value!(i64, I64);
impl_to_bind_value!(u64, U64);
impl_to_bind_value!(f32, F32);
impl_to_bind_value!(f64, F64);

impl ToBindValue for str {
    fn to_bind_value(&self) -> BindValue<'_> {
        BindValue::Str(self)
    }
}

impl ToBindValue for &str {
    fn to_bind_value(&self) -> BindValue<'_> {
        BindValue::Str(self)
    }
}

impl ToBindValue for String {
    fn to_bind_value(&self) -> BindValue<'_> {
        BindValue::Str(self.as_str())
    }
}

impl ToBindValue for NaiveDateTime {
    fn to_bind_value(&self) -> BindValue<'_> {
        BindValue::DateTime(*self)
    }
}

impl ToBindValue for NaiveDate {
    fn to_bind_value(&self) -> BindValue<'_> {
        BindValue::Date(*self)
    }
}

impl ToBindValue for NaiveTime {
    fn to_bind_value(&self) -> BindValue<'_> {
        BindValue::Time(*self)
    }
}

impl ToBindValue for [u8] {
    fn to_bind_value(&self) -> BindValue<'_> {
        BindValue::Blob(self)
    }
}

impl ToBindValue for BindValue<'_> {
    fn to_bind_value(&self) -> BindValue<'_> {
        self.clone()
    }
}

/// A value that can be fetched into a column position or bound to a
/// placeholder, with null handled as "absence" rather than a distinct
/// branch the caller has to check.
///
/// Ships in-tree for every primitive, for `Option<T>` (the nullable-wrapper
/// contract from the dialect spec: empty binds NULL, a null column empties
/// the wrapper), and for tuples up to arity 4 (structural bind/fetch in
/// positional order).
pub trait BindConversion {
    /// Binds `self` to `stmt`'s next auto-incrementing position(s).
    fn bind_auto(&self, stmt: &mut Statement) -> Result<()>;
}

impl<T: ToBindValue> BindConversion for T {
    fn bind_auto(&self, stmt: &mut Statement) -> Result<()> {
        stmt.bind_next(self.to_bind_value())
    }
}

impl<T: ToBindValue> BindConversion for Option<T> {
    fn bind_auto(&self, stmt: &mut Statement) -> Result<()> {
        match self {
            Some(v) => stmt.bind_next(v.to_bind_value()),
            None => stmt.bind_next(BindValue::Null),
        }
    }
}

macro_rules! impl_tuple_bind_conversion {
    ($($idx:tt : $name:ident),+) => {
        impl<$($name: BindConversion),+> BindConversion for ($($name,)+) {
            fn bind_auto(&self, stmt: &mut Statement) -> Result<()> {
                $(self.$idx.bind_auto(stmt)?;)+
                Ok(())
            }
        }
    };
}

impl_tuple_bind_conversion!(0: A);
impl_tuple_bind_conversion!(0: A, 1: B);
impl_tuple_bind_conversion!(0: A, 1: B, 2: C);
impl_tuple_bind_conversion!(0: A, 1: B, 2: C, 3: D);

/// Fetches a value out of the current row. Ships in-tree for every
/// primitive, `Option<T>`, and tuples up to arity 4 (each element fetched
/// from the next auto-advancing column in order).
pub trait FetchConversion: Sized {
    /// Populates `self`-shaped storage from `row`'s next auto-advancing
    /// column(s). Use [`Row::fetch`]/[`Row::get`] directly for a single
    /// explicit column index.
    fn fetch_auto(row: &mut Row) -> Result<Self>;
}

macro_rules! impl_fetch_conversion_for_primitive {
    ($ty:ty, $variant:ident, $default:expr) => {
        impl FetchConversion for $ty {
            fn fetch_auto(row: &mut Row) -> Result<Self> {
                let mut dest: $ty = $default;
                let non_null = {
                    let mut fv = FetchValue::$variant(&mut dest);
                    row.fetch_next(&mut fv)?
                };
                if !non_null {
                    return Err(Error::null_value_fetch("column is NULL"));
                }
                Ok(dest)
            }
        }
    };
}

impl_fetch_conversion_for_primitive!(i16, I16, 0);
impl_fetch_conversion_for_primitive!(u16, U16, 0);
impl_fetch_conversion_for_primitive!(i32, I32, 0);
impl_fetch_conversion_for_primitive!(u32, U32, 0);
impl_fetch_conversion_for_primitive!(i64, I64, 0);
impl_fetch_conversion_for_primitive!(u64, U64, 0);
impl_fetch_conversion_for_primitive!(f32, F32, 0.0);
impl_fetch_conversion_for_primitive!(f64, F64, 0.0);

impl FetchConversion for String {
    fn fetch_auto(row: &mut Row) -> Result<Self> {
        let mut dest = String::new();
        let mut fv = FetchValue::Str(&mut dest);
        if !row.fetch_next(&mut fv)? {
            return Err(Error::null_value_fetch("column is NULL"));
        }
        Ok(dest)
    }
}

impl FetchConversion for NaiveDateTime {
    fn fetch_auto(row: &mut Row) -> Result<Self> {
        let mut dest = NaiveDateTime::default();
        let mut fv = FetchValue::DateTime(&mut dest);
        if !row.fetch_next(&mut fv)? {
            return Err(Error::null_value_fetch("column is NULL"));
        }
        Ok(dest)
    }
}

impl FetchConversion for NaiveDate {
    fn fetch_auto(row: &mut Row) -> Result<Self> {
        let mut dest = NaiveDate::default();
        let mut fv = FetchValue::Date(&mut dest);
        if !row.fetch_next(&mut fv)? {
            return Err(Error::null_value_fetch("column is NULL"));
        }
        Ok(dest)
    }
}

impl FetchConversion for NaiveTime {
    fn fetch_auto(row: &mut Row) -> Result<Self> {
        let mut dest = NaiveTime::default();
        let mut fv = FetchValue::Time(&mut dest);
        if !row.fetch_next(&mut fv)? {
            return Err(Error::null_value_fetch("column is NULL"));
        }
        Ok(dest)
    }
}

impl FetchConversion for Vec<u8> {
    fn fetch_auto(row: &mut Row) -> Result<Self> {
        let mut dest = Vec::new();
        let mut fv = FetchValue::Blob(&mut dest);
        if !row.fetch_next(&mut fv)? {
            return Err(Error::null_value_fetch("column is NULL"));
        }
        Ok(dest)
    }
}

impl<T: FetchConversion> FetchConversion for Option<T> {
    fn fetch_auto(row: &mut Row) -> Result<Self> {
        match row.is_next_null()? {
            true => {
                row.skip_next();
                Ok(None)
            }
            false => Ok(Some(T::fetch_auto(row)?)),
        }
    }
}

macro_rules! impl_tuple_fetch_conversion {
    ($($name:ident),+) => {
        impl<$($name: FetchConversion),+> FetchConversion for ($($name,)+) {
            fn fetch_auto(row: &mut Row) -> Result<Self> {
                Ok(($($name::fetch_auto(row)?,)+))
            }
        }
    };
}

impl_tuple_fetch_conversion!(A);
impl_tuple_fetch_conversion!(A, B);
impl_tuple_fetch_conversion!(A, B, C);
impl_tuple_fetch_conversion!(A, B, C, D);

/// Raised when a fetched column can't be represented by the destination
/// type (overflow, non-numeric text, ...).
pub fn bad_value_cast(what: impl Into<String>) -> Error {
    Error::bad_value_cast(what)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{NextRow, ResultSet};
    use crate::row::Row;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct OneNullColumn;
    impl ResultSet for OneNullColumn {
        fn has_next(&self) -> NextRow {
            NextRow::LastRowReached
        }
        fn next(&mut self) -> Result<bool> {
            Ok(false)
        }
        fn fetch(&mut self, _col: usize, _dest: &mut FetchValue<'_>) -> Result<bool> {
            Ok(false)
        }
        fn is_null(&mut self, _col: usize) -> Result<bool> {
            Ok(true)
        }
        fn cols(&self) -> usize {
            1
        }
        fn rows(&self) -> Option<u64> {
            Some(1)
        }
        fn name_to_column(&self, name: &str) -> Option<usize> {
            (name == "s").then_some(0)
        }
        fn column_to_name(&self, _col: usize) -> Result<String> {
            Ok("s".to_string())
        }
    }

    fn null_row() -> Row {
        Row::new(Rc::new(RefCell::new(
            Box::new(OneNullColumn) as Box<dyn ResultSet>
        )))
    }

    #[test]
    fn get_on_null_column_raises_null_value_fetch() {
        let mut row = null_row();
        let err = row.get::<String>(0).unwrap_err();
        assert_eq!(err.kind(), crate::error::Kind::NullValueFetch);

        let mut row = null_row();
        let err = row.get::<i64>(0).unwrap_err();
        assert_eq!(err.kind(), crate::error::Kind::NullValueFetch);
    }

    #[test]
    fn get_option_on_null_column_yields_none_instead_of_erroring() {
        let mut row = null_row();
        let v: Option<String> = row.get(0).unwrap();
        assert_eq!(v, None);
    }

    #[test]
    fn date_and_time_bind_values_format_distinctly_from_datetime() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let time = NaiveTime::from_hms_opt(13, 5, 9).unwrap();
        let dt = date.and_time(time);
        assert_eq!(BindValue::Date(date).to_string(), "'2024-03-14'");
        assert_eq!(BindValue::Time(time).to_string(), "'13:05:09'");
        assert_eq!(BindValue::DateTime(dt).to_string(), "'2024-03-14 13:05:09'");
    }
}
