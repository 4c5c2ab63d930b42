use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PlyError>;

/// Every way a PLY read, write, or schema-build operation can fail.
#[derive(Error, Debug)]
pub enum PlyError {
    #[error("unknown scalar type spelling: {0:?}")]
    UnknownType(String),

    #[error("unsupported format version: {0:?} (only \"1.0\" is accepted)")]
    UnsupportedVersion(String),

    #[error("unknown header keyword: {0:?}")]
    UnknownKeyword {
        keyword: String,
        /// Set when the root cause is a line-terminator mismatch (CRLF file
        /// followed by a bare-LF line, or vice versa) rather than an
        /// unrecognized token. A sub-kind of `UnknownKeyword`, not a
        /// separate variant, per the spec.
        bad_line_terminator: bool,
    },

    #[error("property line with no preceding element declaration")]
    OrphanProperty,

    #[error("failed to parse integer token {token:?}")]
    BadInteger { token: String },

    #[error("failed to parse floating point token {token:?}")]
    BadFloat { token: String },

    #[error("end of input reached while reading {context}")]
    Eof { context: &'static str },

    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("invalid UTF-8 in header text: {0}")]
    InvalidText(#[from] std::str::Utf8Error),

    #[error("schema error: {0}")]
    SchemaError(&'static str),

    #[error("schema is locked: the header has already been written")]
    SchemaLocked,

    #[error("handle used out of order: {0}")]
    InvalidState(&'static str),

    #[error("more values written than the schema declares for this property")]
    TooManyValues,

    #[error("close() called before all declared values were written")]
    Underrun,

    #[error("read aborted by callback")]
    Aborted,
}

impl PlyError {
    pub(crate) fn unknown_keyword(keyword: impl Into<String>) -> Self {
        PlyError::UnknownKeyword {
            keyword: keyword.into(),
            bad_line_terminator: false,
        }
    }

    pub(crate) fn bad_line_terminator() -> Self {
        PlyError::UnknownKeyword {
            keyword: String::new(),
            bad_line_terminator: true,
        }
    }
}
