//! Rendered pages and index entries

use chrono::{DateTime, FixedOffset};
use std::path::PathBuf;

use crate::content::Metadata;

/// A document rendered to HTML, ready to be written
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub slug: String,
    /// Site URL of the page
    pub url: String,
    pub source: PathBuf,
    pub metadata: Metadata,
    /// Rendered body HTML
    pub content: String,
    /// Resolved hero image URL
    pub image: Option<String>,
}

/// One line of the index listing
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub slug: String,
    pub url: String,
    pub title: String,
    pub date: DateTime<FixedOffset>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub draft: bool,
}

impl From<&RenderedPage> for IndexEntry {
    fn from(page: &RenderedPage) -> Self {
        Self {
            slug: page.slug.clone(),
            url: page.url.clone(),
            title: page.metadata.title.clone(),
            date: page.metadata.date,
            author: page.metadata.author.clone(),
            summary: page.metadata.summary.clone(),
            draft: page.metadata.draft,
        }
    }
}
