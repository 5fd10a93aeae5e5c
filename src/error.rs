use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the documentation core
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds produced while parsing directives and resolving types
#[derive(Debug, Error)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("header {0:?} has no content")]
    EmptyHeader(String),

    #[error("duplicate {0} section")]
    DuplicateSection(String),

    #[error("duplicate response code {0}")]
    DuplicateResponse(u16),

    #[error("conflicting specification for parameter {name:?}: {reason}")]
    ConflictingParamSpec { name: String, reason: String },

    #[error("unknown directive {0:?}")]
    UnknownDirective(String),

    #[error("must have at least one response")]
    NoResponse,

    #[error("cannot resolve package {package:?}: {reason}")]
    PackageResolution { package: String, reason: String },

    #[error("type {name:?} not found in package {package}")]
    TypeNotFound { package: String, name: String },

    #[error("{lookup} is not a struct but {declaration} (in {})", file.display())]
    NotAStruct {
        lookup: String,
        declaration: String,
        file: PathBuf,
    },

    #[error("unsupported type {type_name} for field {field:?}")]
    UnsupportedType { field: String, type_name: String },

    #[error("unknown tag {tag:?} on {field:?}")]
    UnknownTag { field: String, tag: String },

    #[error("{0} is not implemented")]
    NotImplemented(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error in {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },
}

impl Error {
    /// Errors that abort the whole run instead of a single comment block
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Parse { .. })
    }
}

/// An error attributed to a position in a source file.
///
/// `line` counts from the top of the file, not from the start of the doc
/// comment, so `path:line` can be opened directly in an editor.
#[derive(Debug)]
pub struct LocatedError {
    /// Path of the file, relative to the scanned root when possible
    pub path: PathBuf,
    /// 1-based line number in the file (not within the comment block)
    pub line: usize,
    pub error: Error,
}

impl fmt::Display for LocatedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}: {}", self.path.display(), self.line, self.error)
    }
}

impl std::error::Error for LocatedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// All per-block errors collected during one scan.
#[derive(Debug, Default)]
pub struct ErrorList(pub Vec<LocatedError>);

impl ErrorList {
    pub fn push(&mut self, err: LocatedError) {
        self.0.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocatedError> {
        self.0.iter()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for err in &self.0 {
            writeln!(f, "{}", err)?;
        }
        match self.0.len() {
            1 => write!(f, "1 error"),
            n => write!(f, "{} errors", n),
        }
    }
}

impl std::error::Error for ErrorList {}
