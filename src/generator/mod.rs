//! Generator module - writes rendered pages, the index, feed and assets to
//! the public directory

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::content::ContentStore;
use crate::helpers::{escape_xml, full_url_for, strip_html, strip_invalid_xml_chars};
use crate::site::{IndexEntry, RenderedPage};
use crate::templates::{ConfigData, EntryData, PageData, TemplateRenderer};
use crate::Site;

/// Static site writer using the built-in templates
pub struct Generator {
    site: Site,
    renderer: TemplateRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;

        Ok(Self {
            site: site.clone(),
            renderer,
        })
    }

    /// Write the whole site. `index` must only name pages present in `pages`.
    /// Returns the number of document pages written.
    pub fn generate(
        &self,
        store: &ContentStore,
        pages: &[RenderedPage],
        index: &[IndexEntry],
    ) -> Result<usize> {
        self.prepare_output()?;

        let copied = store.copy_assets(&self.site.public_dir)?;
        tracing::debug!("Copied {} assets", copied);

        let config_data = ConfigData::from(&self.site.config);

        self.generate_index_page(&config_data, index)?;
        let written = self.generate_document_pages(&config_data, pages)?;

        let by_slug: HashMap<&str, &RenderedPage> =
            pages.iter().map(|p| (p.slug.as_str(), p)).collect();
        let listed: Vec<&RenderedPage> = index
            .iter()
            .filter_map(|e| by_slug.get(e.slug.as_str()).copied())
            .collect();

        if self.site.config.feed.enable {
            self.generate_atom_feed(&listed)?;
        }
        if self.site.config.search_index {
            self.generate_search_index(&listed)?;
        }

        Ok(written)
    }

    /// Start from an empty public directory so removed or failing documents
    /// leave no stale pages behind
    fn prepare_output(&self) -> Result<()> {
        self.site.check_layout()?;

        let public_dir = &self.site.public_dir;
        if public_dir.exists() {
            fs::remove_dir_all(public_dir)?;
        }
        fs::create_dir_all(public_dir)?;
        Ok(())
    }

    /// Generate the index listing
    fn generate_index_page(&self, config_data: &ConfigData, index: &[IndexEntry]) -> Result<()> {
        let entries: Vec<EntryData> = index
            .iter()
            .map(|e| EntryData::new(e, &self.site.config.date_format))
            .collect();

        let html = self.renderer.render_index(config_data, &entries)?;
        let output_path = self.site.public_dir.join("index.html");
        fs::write(&output_path, html)?;
        tracing::debug!("Generated: {:?}", output_path);

        Ok(())
    }

    /// Generate one page per rendered document
    fn generate_document_pages(
        &self,
        config_data: &ConfigData,
        pages: &[RenderedPage],
    ) -> Result<usize> {
        for page in pages {
            let data = PageData::new(page, &self.site.config);
            let html = self.renderer.render_page(config_data, &data)?;

            let output_path = self.site.public_dir.join(&page.slug).join("index.html");
            write_file(&output_path, &html)?;
            tracing::debug!("Generated page: {:?}", output_path);
        }

        Ok(pages.len())
    }

    /// Generate Atom feed from published pages
    fn generate_atom_feed(&self, pages: &[&RenderedPage]) -> Result<()> {
        let config = &self.site.config;
        let home = full_url_for(config, "");

        let mut feed = String::new();
        feed.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
        feed.push('\n');
        feed.push_str(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#);
        feed.push('\n');
        feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.title)));
        feed.push_str(&format!(
            "  <link href=\"{}\" rel=\"self\"/>\n",
            full_url_for(config, "atom.xml")
        ));
        feed.push_str(&format!("  <link href=\"{}\"/>\n", home));

        // Newest published date keeps the feed stable across rebuilds
        let newest = pages
            .iter()
            .filter(|p| !p.metadata.draft)
            .map(|p| p.metadata.date)
            .max();
        if let Some(newest) = newest {
            feed.push_str(&format!("  <updated>{}</updated>\n", newest.to_rfc3339()));
        }
        feed.push_str(&format!("  <id>{}</id>\n", home));
        if !config.author.is_empty() {
            feed.push_str(&format!(
                "  <author><name>{}</name></author>\n",
                escape_xml(&config.author)
            ));
        }

        let published = pages.iter().filter(|p| !p.metadata.draft);
        for page in published.take(config.feed.limit) {
            let link = full_url_for(config, &format!("{}/", page.slug));
            feed.push_str("  <entry>\n");
            feed.push_str(&format!(
                "    <title>{}</title>\n",
                escape_xml(&page.metadata.title)
            ));
            feed.push_str(&format!("    <link href=\"{}\"/>\n", link));
            feed.push_str(&format!("    <id>{}</id>\n", link));
            feed.push_str(&format!(
                "    <published>{}</published>\n",
                page.metadata.date.to_rfc3339()
            ));
            feed.push_str(&format!(
                "    <updated>{}</updated>\n",
                page.metadata.date.to_rfc3339()
            ));
            if let Some(summary) = &page.metadata.summary {
                feed.push_str(&format!("    <summary>{}</summary>\n", escape_xml(summary)));
            }
            let base_url = config.url.trim_end_matches('/');
            let content = strip_invalid_xml_chars(&convert_relative_urls_to_absolute(
                &page.content,
                base_url,
            ));
            feed.push_str(&format!(
                "    <content type=\"html\"><![CDATA[{}]]></content>\n",
                content.replace("]]>", "]]]]><![CDATA[>")
            ));
            feed.push_str("  </entry>\n");
        }

        feed.push_str("</feed>\n");

        let output_path = self.site.public_dir.join("atom.xml");
        fs::write(&output_path, feed)?;
        tracing::info!("Generated atom.xml");

        Ok(())
    }

    /// Generate search index (JSON)
    fn generate_search_index(&self, pages: &[&RenderedPage]) -> Result<()> {
        let search_data: Vec<serde_json::Value> = pages
            .iter()
            .map(|p| {
                serde_json::json!({
                    "title": p.metadata.title,
                    "url": p.url,
                    "summary": p.metadata.summary,
                    "content": strip_html(&p.content),
                    "date": p.metadata.date.format("%Y-%m-%d").to_string(),
                    "draft": p.metadata.draft,
                })
            })
            .collect();

        let output_path = self.site.public_dir.join("search.json");
        let json = serde_json::to_string_pretty(&search_data)?;
        fs::write(&output_path, json)?;
        tracing::info!("Generated search.json");

        Ok(())
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// Convert root-relative URLs in HTML content to absolute URLs
fn convert_relative_urls_to_absolute(content: &str, base_url: &str) -> String {
    content
        .replace("href=\"/", &format!("href=\"{}/", base_url))
        .replace("src=\"/", &format!("src=\"{}/", base_url))
}
