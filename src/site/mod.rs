//! Site assembly - decides which documents become pages, under which slug,
//! and in what order they are listed

mod page;

use std::collections::BTreeMap;
use std::path::PathBuf;

pub use page::{IndexEntry, RenderedPage};

use crate::config::{SiteConfig, SlugSource};
use crate::content::{AssetResolver, Document, MarkdownRenderer, RenderContext};
use crate::error::{DocumentError, DocumentFailure};
use crate::helpers::page_url;

/// Which documents a build publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Drafts are left out entirely
    #[default]
    Publish,
    /// Drafts are rendered and listed
    Preview,
}

impl BuildMode {
    pub fn includes(self, document: &Document) -> bool {
        self == BuildMode::Preview || !document.is_draft()
    }
}

/// A document that has been given an output slug
#[derive(Debug, Clone)]
pub struct PlannedPage {
    pub slug: String,
    pub document: Document,
}

/// Outcome of slug planning
#[derive(Debug, Default)]
pub struct Plan {
    /// Pages to render, ordered by slug
    pub pages: Vec<PlannedPage>,
    pub drafts_skipped: usize,
    pub failures: Vec<DocumentFailure>,
}

/// Turns parsed documents into pages and an index
pub struct SiteAssembler {
    mode: BuildMode,
    slug_source: SlugSource,
    root: String,
}

impl SiteAssembler {
    pub fn new(mode: BuildMode, config: &SiteConfig) -> Self {
        Self {
            mode,
            slug_source: config.slug_source,
            root: config.root.clone(),
        }
    }

    /// Output slug of a document
    pub fn slug_for(&self, document: &Document) -> String {
        let from_file = || {
            document
                .file_name()
                .map(slug::slugify)
                .filter(|s| !s.is_empty())
        };
        let from_title = || Some(slug::slugify(&document.metadata.title)).filter(|s| !s.is_empty());

        let slug = match self.slug_source {
            SlugSource::Filename => from_file().or_else(from_title),
            SlugSource::Title => from_title().or_else(from_file),
        };
        slug.unwrap_or_else(|| "untitled".to_string())
    }

    /// Assign slugs. Every document in a slug collision fails; none of them is
    /// planned, so no page can overwrite another.
    pub fn plan(&self, documents: Vec<Document>) -> Plan {
        let mut plan = Plan::default();
        let mut claims: BTreeMap<String, Vec<Document>> = BTreeMap::new();

        for document in documents {
            if !self.mode.includes(&document) {
                tracing::debug!("Skipping draft {:?}", document.source);
                plan.drafts_skipped += 1;
                continue;
            }
            claims
                .entry(self.slug_for(&document))
                .or_default()
                .push(document);
        }

        for (slug, mut documents) in claims {
            if documents.len() == 1 {
                if let Some(document) = documents.pop() {
                    plan.pages.push(PlannedPage { slug, document });
                }
                continue;
            }

            let sources: Vec<PathBuf> = documents.iter().map(|d| d.source.clone()).collect();
            for document in documents {
                let other = sources
                    .iter()
                    .find(|s| **s != document.source)
                    .cloned()
                    .unwrap_or_default();
                tracing::warn!(
                    "Slug {:?} of {:?} collides with {:?}",
                    slug,
                    document.source,
                    other
                );
                plan.failures.push(DocumentFailure::new(
                    document.source,
                    DocumentError::DuplicateSlug {
                        slug: slug.clone(),
                        other,
                    },
                ));
            }
        }

        plan
    }

    /// Render one planned page, collecting every error in it
    pub fn render_page(
        &self,
        renderer: &MarkdownRenderer,
        assets: &dyn AssetResolver,
        page: PlannedPage,
    ) -> Result<RenderedPage, DocumentFailure> {
        let PlannedPage { slug, document } = page;
        let ctx = RenderContext {
            doc_dir: document.dir(),
            root: &self.root,
            assets,
        };

        let mut errors = Vec::new();

        let image = match document.metadata.image.as_deref() {
            Some(image) => match ctx.resolve_image(image) {
                Ok(url) => Some(url),
                Err(e) => {
                    errors.push(e);
                    None
                }
            },
            None => None,
        };

        let content = match renderer.render(&document.body, ctx) {
            Ok(html) => html,
            Err(mut render_errors) => {
                errors.append(&mut render_errors);
                String::new()
            }
        };

        if !errors.is_empty() {
            return Err(DocumentFailure::with_errors(document.source, errors));
        }

        Ok(RenderedPage {
            url: page_url(&self.root, &slug),
            slug,
            source: document.source,
            metadata: document.metadata,
            content,
            image,
        })
    }

    /// Index listing: visible pages, newest first, ties broken by slug
    pub fn index(&self, pages: &[RenderedPage]) -> Vec<IndexEntry> {
        let mut entries: Vec<IndexEntry> = pages
            .iter()
            .filter(|p| self.mode == BuildMode::Preview || !p.metadata.draft)
            .map(IndexEntry::from)
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
        entries
    }
}
