//! Document model

use std::path::{Path, PathBuf};

use super::Metadata;
use crate::error::DocumentError;

/// One parsed source file: metadata plus the undecoded Markdown body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Source path relative to the content root
    pub source: PathBuf,
    pub metadata: Metadata,
    /// Raw Markdown after the metadata block
    pub body: String,
}

impl Document {
    /// Parse raw document text
    pub fn parse(source: impl Into<PathBuf>, raw: &str) -> Result<Self, DocumentError> {
        let (metadata, body) = Metadata::parse(raw)?;
        Ok(Self {
            source: source.into(),
            metadata,
            body: body.to_string(),
        })
    }

    /// Directory of the document, relative to the content root
    pub fn dir(&self) -> &Path {
        self.source.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn is_draft(&self) -> bool {
        self.metadata.draft
    }

    /// File stem, or the parent directory name for `index.md` files
    pub fn file_name(&self) -> Option<&str> {
        let stem = self.source.file_stem().and_then(|s| s.to_str())?;
        if stem == "index" {
            self.dir().file_name().and_then(|s| s.to_str())
        } else {
            Some(stem)
        }
    }
}
