//! Built-in page templates using the Tera template engine
//!
//! The templates are embedded in the binary, so a site needs nothing besides
//! its content directory and an optional `_config.yml`.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::helpers::escape_html;
use crate::site::{IndexEntry, RenderedPage};

/// Template renderer with the embedded default theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Tera's escaping also rewrites `/` in URLs; text fields go through
        // `escape_html` explicitly and rendered HTML is inserted as is
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("default/layout.html")),
            ("index.html", include_str!("default/index.html")),
            ("page.html", include_str!("default/page.html")),
        ])?;

        tera.register_filter("escape_html", escape_html_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Render the index page
    pub fn render_index(&self, config: &ConfigData, entries: &[EntryData]) -> Result<String> {
        let mut context = Context::new();
        context.insert("config", config);
        context.insert("entries", entries);
        self.render("index.html", &context)
    }

    /// Render a single document page
    pub fn render_page(&self, config: &ConfigData, page: &PageData) -> Result<String> {
        let mut context = Context::new();
        context.insert("config", config);
        context.insert("page", page);
        self.render("page.html", &context)
    }
}

/// Tera filter: escape HTML special characters
fn escape_html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("escape_html", "value", String, value);
    Ok(tera::Value::String(escape_html(&s)))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub root: String,
}

impl From<&SiteConfig> for ConfigData {
    fn from(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            root: format!("{}/", config.root.trim_end_matches('/')),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryData {
    pub title: String,
    pub url: String,
    pub date: String,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub draft: bool,
}

impl EntryData {
    pub fn new(entry: &IndexEntry, date_format: &str) -> Self {
        Self {
            title: entry.title.clone(),
            url: entry.url.clone(),
            date: entry.date.format(date_format).to_string(),
            author: entry.author.clone(),
            summary: entry.summary.clone(),
            draft: entry.draft,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageData {
    pub title: String,
    pub date: String,
    pub author: Option<String>,
    /// Summary, or the site description when the page has none
    pub description: String,
    pub image: Option<String>,
    pub draft: bool,
    pub content: String,
}

impl PageData {
    pub fn new(page: &RenderedPage, config: &SiteConfig) -> Self {
        Self {
            title: page.metadata.title.clone(),
            date: page.metadata.date.format(&config.date_format).to_string(),
            author: page.metadata.author.clone(),
            description: page
                .metadata
                .summary
                .clone()
                .unwrap_or_else(|| config.description.clone()),
            image: page.image.clone(),
            draft: page.metadata.draft,
            content: page.content.clone(),
        }
    }
}
