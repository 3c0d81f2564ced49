//! quire: a static blog builder
//!
//! A site is a directory of Markdown documents with YAML front-matter plus
//! their assets. Building it parses every document on its own, assigns each
//! one a slug, renders the bodies to HTML and writes an index, one page per
//! document, an Atom feed and the copied assets. A broken document is
//! reported and left out; the rest of the site still builds.

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod server;
pub mod site;
pub mod templates;

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use content::ContentStore;
use helpers::absolute_path;

pub use commands::build::BuildReport;
pub use error::{DocumentError, DocumentFailure};
pub use site::BuildMode;

/// Name of the site configuration file
pub const CONFIG_FILE: &str = "_config.yml";

/// A site rooted at a base directory
#[derive(Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content (source) directory
    pub content_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Site {
    /// Open a site, reading `_config.yml` when present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config_path = base_dir.as_ref().join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Open a site with an explicit configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let content_dir = base_dir.join(&config.content_dir);
        let public_dir = base_dir.join(&config.public_dir);

        Self {
            config,
            base_dir,
            content_dir,
            public_dir,
        }
    }

    /// Build the static site
    pub fn build(&self, mode: BuildMode) -> Result<BuildReport> {
        commands::build::run(self, mode)
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }

    /// Refuse layouts where emptying the public directory would delete the
    /// site directory or the content
    pub fn check_layout(&self) -> Result<()> {
        let base = absolute_path(&self.base_dir)?;
        let content = absolute_path(&self.content_dir)?;
        let public = absolute_path(&self.public_dir)?;

        if base.starts_with(&public) || content.starts_with(&public) {
            bail!(
                "public_dir {:?} must not contain the site directory or content_dir {:?}",
                self.public_dir,
                self.content_dir
            );
        }
        Ok(())
    }

    /// Index the content directory, leaving out the public directory and the
    /// config file when they sit inside it
    pub fn content_store(&self) -> Result<ContentStore> {
        self.check_layout()?;

        let content = absolute_path(&self.content_dir)?;
        let config_file = self.base_dir.join(CONFIG_FILE);
        let mut excludes = Vec::new();
        for path in [&self.public_dir, &config_file] {
            let path = absolute_path(path)?;
            if let Ok(relative) = path.strip_prefix(&content) {
                excludes.push(relative.to_path_buf());
            }
        }

        ContentStore::open_excluding(&self.content_dir, &excludes)
    }
}
