//! Create a new document

use anyhow::{bail, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::Site;

/// Front-matter written into a fresh document
#[derive(Serialize)]
struct Scaffold<'a> {
    title: &'a str,
    date: String,
    draft: bool,
}

/// Create a document named after `title` (or `path`). New documents are
/// drafts unless `publish` is set. Returns the created file.
pub fn create_document(
    site: &Site,
    title: &str,
    path: Option<&str>,
    publish: bool,
) -> Result<PathBuf> {
    let stem = match path {
        Some(p) => p.trim_end_matches(".md").to_string(),
        None => slug::slugify(title),
    };
    if stem.is_empty() {
        bail!("Cannot derive a file name from title {:?}", title);
    }

    let file_path = site.content_dir.join(format!("{}.md", stem));

    // Check if file already exists
    if file_path.exists() {
        bail!("File already exists: {:?}", file_path);
    }

    let scaffold = Scaffold {
        title,
        date: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        draft: !publish,
    };
    let content = format!("---\n{}---\n\n", serde_yaml::to_string(&scaffold)?);

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    tracing::info!("Created: {:?}", file_path);

    Ok(file_path)
}
