//! Document-scoped errors
//!
//! Every error here belongs to a single document. A build collects them per
//! document and keeps going; only failures outside any one document (the
//! content root or the output directory) abort a build, and those travel as
//! `anyhow::Error`.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single document could not be built
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("missing required field `{0}`")]
    MissingRequiredField(&'static str),

    #[error("unresolved reference `{0}`")]
    UnresolvedReference(String),

    #[error("duplicate slug `{slug}` (also claimed by {other:?})")]
    DuplicateSlug { slug: String, other: PathBuf },

    #[error("asset not found: {0}")]
    AssetNotFound(String),

    #[error("read error: {0}")]
    Read(#[from] std::io::Error),
}

impl DocumentError {
    /// Short machine-readable name, used by `list` and the build report
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedMetadata(_) => "MalformedMetadata",
            Self::MissingRequiredField(_) => "MissingRequiredField",
            Self::UnresolvedReference(_) => "UnresolvedReference",
            Self::DuplicateSlug { .. } => "DuplicateSlug",
            Self::AssetNotFound(_) => "AssetNotFound",
            Self::Read(_) => "Read",
        }
    }
}

/// All errors of one document, keyed by its source path
#[derive(Debug)]
pub struct DocumentFailure {
    /// Source path relative to the content root
    pub source: PathBuf,
    pub errors: Vec<DocumentError>,
}

impl DocumentFailure {
    pub fn new(source: impl Into<PathBuf>, error: DocumentError) -> Self {
        Self {
            source: source.into(),
            errors: vec![error],
        }
    }

    pub fn with_errors(source: impl Into<PathBuf>, errors: Vec<DocumentError>) -> Self {
        Self {
            source: source.into(),
            errors,
        }
    }

    /// True if any of the errors is of the given kind
    pub fn has(&self, kind: &str) -> bool {
        self.errors.iter().any(|e| e.kind() == kind)
    }
}

impl fmt::Display for DocumentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.source.display())?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}
