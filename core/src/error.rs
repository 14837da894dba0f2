//! Crate-wide error and result types.

use std::fmt::{self, Display};

/// The semantic category of an [`Error`].
///
/// These map directly onto the error kinds a caller needs to distinguish:
/// most are recoverable (a bad placeholder name, a NULL read), a few indicate
/// a logic error in the calling code (traversing a rowset twice).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Catch-all for a backend-reported failure.
    EdbaError,
    /// A fetch target cannot represent the database value.
    BadValueCast,
    /// `get` (not `fetch`) encountered NULL.
    NullValueFetch,
    /// Fetched before advancing, or after the last row.
    EmptyRowAccess,
    /// Column name or index not present in the result set.
    InvalidColumn,
    /// Placeholder name or position not present in the statement.
    InvalidPlaceholder,
    /// `first_row` matched more than one row.
    MultipleRowsQuery,
    /// A rowset was iterated more than once.
    MultipleRowsetTraverse,
    /// The backend does not implement the requested feature.
    NotSupportedByBackend,
    /// An empty string was executed as SQL.
    EmptyStringQuery,
    /// The connection URI was malformed, or named an unknown driver.
    InvalidConnectionString,
    /// The dialect selector found no matching annotated branch.
    SqlVariantNotFound,
}

impl Kind {
    fn label(self) -> &'static str {
        match self {
            Kind::EdbaError => "edba_error",
            Kind::BadValueCast => "bad_value_cast",
            Kind::NullValueFetch => "null_value_fetch",
            Kind::EmptyRowAccess => "empty_row_access",
            Kind::InvalidColumn => "invalid_column",
            Kind::InvalidPlaceholder => "invalid_placeholder",
            Kind::MultipleRowsQuery => "multiple_rows_query",
            Kind::MultipleRowsetTraverse => "multiple_rowset_traverse",
            Kind::NotSupportedByBackend => "not_supported_by_backend",
            Kind::EmptyStringQuery => "empty_string_query",
            Kind::InvalidConnectionString => "invalid_connection_string",
            Kind::SqlVariantNotFound => "sql_variant_not_found",
        }
    }
}

/// An error raised anywhere in the frontend facade, the backend contract, or
/// the pool/registry plumbing.
#[derive(Debug)]
pub struct Error {
    kind: Kind,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

/// Result type wrapping [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds an error of the given kind with a message.
    pub fn new(kind: Kind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches an underlying cause (I/O, `libloading`, UTF-8 decoding, ...).
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn edba_error(message: impl Into<String>) -> Self {
        Self::new(Kind::EdbaError, message)
    }

    pub fn bad_value_cast(message: impl Into<String>) -> Self {
        Self::new(Kind::BadValueCast, message)
    }

    pub fn null_value_fetch(message: impl Into<String>) -> Self {
        Self::new(Kind::NullValueFetch, message)
    }

    pub fn empty_row_access(message: impl Into<String>) -> Self {
        Self::new(Kind::EmptyRowAccess, message)
    }

    pub fn invalid_column(message: impl Into<String>) -> Self {
        Self::new(Kind::InvalidColumn, message)
    }

    pub fn invalid_placeholder(message: impl Into<String>) -> Self {
        Self::new(Kind::InvalidPlaceholder, message)
    }

    pub fn multiple_rows_query(message: impl Into<String>) -> Self {
        Self::new(Kind::MultipleRowsQuery, message)
    }

    pub fn multiple_rowset_traverse(message: impl Into<String>) -> Self {
        Self::new(Kind::MultipleRowsetTraverse, message)
    }

    pub fn not_supported_by_backend(message: impl Into<String>) -> Self {
        Self::new(Kind::NotSupportedByBackend, message)
    }

    pub fn empty_string_query(message: impl Into<String>) -> Self {
        Self::new(Kind::EmptyStringQuery, message)
    }

    pub fn invalid_connection_string(message: impl Into<String>) -> Self {
        Self::new(Kind::InvalidConnectionString, message)
    }

    pub fn sql_variant_not_found(message: impl Into<String>) -> Self {
        Self::new(Kind::SqlVariantNotFound, message)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edba::{} {}", self.kind.label(), self.message)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::edba_error(value.to_string()).with_source(value)
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(value: std::str::Utf8Error) -> Self {
        Error::new(
            Kind::InvalidConnectionString,
            format!("error while decoding UTF-8: {value}"),
        )
        .with_source(value)
    }
}

#[cfg(feature = "driver_manager")]
impl From<libloading::Error> for Error {
    fn from(value: libloading::Error) -> Self {
        Error::new(
            Kind::InvalidConnectionString,
            format!("error with dynamic library: {value}"),
        )
        .with_source(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_label_and_message() {
        let e = Error::invalid_placeholder("no placeholder named 'foo'");
        assert_eq!(
            e.to_string(),
            "edba::invalid_placeholder no placeholder named 'foo'"
        );
        assert_eq!(e.kind(), Kind::InvalidPlaceholder);
    }
}
