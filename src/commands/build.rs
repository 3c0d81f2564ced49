//! Build the static site

use anyhow::Result;
use std::time::Instant;

use crate::content::{ContentStore, Document, MarkdownRenderer};
use crate::error::DocumentFailure;
use crate::generator::Generator;
use crate::site::{BuildMode, IndexEntry, SiteAssembler};
use crate::Site;

/// What a build produced
#[derive(Debug)]
pub struct BuildReport {
    pub mode: BuildMode,
    /// Number of document pages written
    pub pages: usize,
    /// The index listing as written
    pub index: Vec<IndexEntry>,
    pub drafts_skipped: usize,
    /// Documents left out of the output, ordered by source path
    pub failures: Vec<DocumentFailure>,
}

impl BuildReport {
    /// Returns true if every document built
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Build the site. Document errors end up in the report; only an invalid
/// configuration, an unreadable content root or an unwritable output
/// directory fail the call.
pub fn run(site: &Site, mode: BuildMode) -> Result<BuildReport> {
    let start = Instant::now();

    site.config.validate()?;
    let store = site.content_store()?;
    let (documents, mut failures) = load_documents(&store);
    tracing::info!(
        "Loaded {} of {} documents",
        documents.len(),
        store.documents().len()
    );

    let assembler = SiteAssembler::new(mode, &site.config);
    let plan = assembler.plan(documents);
    failures.extend(plan.failures);

    let renderer = MarkdownRenderer::with_options(&site.config.highlight);
    let mut pages = Vec::with_capacity(plan.pages.len());
    for planned in plan.pages {
        match assembler.render_page(&renderer, &store, planned) {
            Ok(page) => pages.push(page),
            Err(failure) => failures.push(failure),
        }
    }

    let index = assembler.index(&pages);
    let generator = Generator::new(site)?;
    let written = generator.generate(&store, &pages, &index)?;

    failures.sort_by(|a, b| a.source.cmp(&b.source));
    for failure in &failures {
        tracing::error!("{}", failure);
    }

    tracing::info!(
        "Generated {} pages ({} listed, {} drafts skipped, {} failed) in {:.2}s",
        written,
        index.len(),
        plan.drafts_skipped,
        failures.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(BuildReport {
        mode,
        pages: written,
        index,
        drafts_skipped: plan.drafts_skipped,
        failures,
    })
}

/// Read and parse every document; each one fails on its own
pub fn load_documents(store: &ContentStore) -> (Vec<Document>, Vec<DocumentFailure>) {
    let mut documents = Vec::new();
    let mut failures = Vec::new();

    for source in store.documents() {
        match store.load(source) {
            Ok(document) => documents.push(document),
            Err(e) => {
                tracing::warn!("Failed to load {:?}: {}", source, e);
                failures.push(DocumentFailure::new(source.clone(), e));
            }
        }
    }

    (documents, failures)
}
