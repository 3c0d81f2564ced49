//! Content store - documents and assets under the content root

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::{AssetResolver, Document};
use crate::error::DocumentError;

/// Read-only view of the content root, indexed once at open
pub struct ContentStore {
    root: PathBuf,
    documents: Vec<PathBuf>,
    assets: BTreeSet<PathBuf>,
}

impl ContentStore {
    /// Index the content root. Failing to read the root itself is fatal;
    /// unreadable entries below it are skipped with a warning.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::open_excluding(root, &[])
    }

    /// Index the content root, skipping the `excludes` subtrees (relative to
    /// the root)
    pub fn open_excluding<P: AsRef<Path>>(root: P, excludes: &[PathBuf]) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        let metadata = fs::metadata(&root)
            .with_context(|| format!("cannot read content root {:?}", root))?;
        if !metadata.is_dir() {
            bail!("content root {:?} is not a directory", root);
        }
        fs::read_dir(&root).with_context(|| format!("cannot read content root {:?}", root))?;

        let mut documents = Vec::new();
        let mut assets = BTreeSet::new();

        for entry in WalkDir::new(&root)
            .follow_links(true)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e) && !is_excluded(e, &root, excludes))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path())
                .to_path_buf();

            if is_markdown_file(&relative) {
                documents.push(relative);
            } else {
                assets.insert(relative);
            }
        }

        tracing::debug!(
            "Indexed {} documents and {} assets in {:?}",
            documents.len(),
            assets.len(),
            root
        );

        Ok(Self {
            root,
            documents,
            assets,
        })
    }

    /// Document sources, relative to the root, in path order
    pub fn documents(&self) -> &[PathBuf] {
        &self.documents
    }

    pub fn assets(&self) -> impl Iterator<Item = &Path> {
        self.assets.iter().map(PathBuf::as_path)
    }

    /// Read the raw text of one document
    pub fn read(&self, source: &Path) -> Result<String, DocumentError> {
        Ok(fs::read_to_string(self.root.join(source))?)
    }

    /// Read and parse one document
    pub fn load(&self, source: &Path) -> Result<Document, DocumentError> {
        let raw = self.read(source)?;
        Document::parse(source, &raw)
    }

    /// Copy every asset into `dest`, keeping relative paths
    pub fn copy_assets(&self, dest: &Path) -> Result<usize> {
        for asset in &self.assets {
            let target = dest.join(asset);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(self.root.join(asset), &target)
                .with_context(|| format!("failed to copy asset {:?}", asset))?;
        }
        Ok(self.assets.len())
    }
}

impl AssetResolver for ContentStore {
    fn contains(&self, path: &Path) -> bool {
        self.assets.contains(path)
    }
}

fn is_excluded(entry: &DirEntry, root: &Path, excludes: &[PathBuf]) -> bool {
    entry
        .path()
        .strip_prefix(root)
        .map(|relative| excludes.iter().any(|e| e == relative))
        .unwrap_or(false)
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}
