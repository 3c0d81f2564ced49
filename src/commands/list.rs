//! List site content

use anyhow::Result;

use super::build::load_documents;
use crate::site::{BuildMode, SiteAssembler};
use crate::Site;

/// List every document with its slug and draft state, then any documents
/// that fail to parse or collide on a slug
pub fn run(site: &Site) -> Result<()> {
    site.config.validate()?;
    let store = site.content_store()?;
    let (documents, mut failures) = load_documents(&store);

    let assembler = SiteAssembler::new(BuildMode::Preview, &site.config);
    let mut plan = assembler.plan(documents);
    failures.append(&mut plan.failures);

    plan.pages.sort_by(|a, b| {
        b.document
            .metadata
            .date
            .cmp(&a.document.metadata.date)
            .then_with(|| a.slug.cmp(&b.slug))
    });

    println!("Documents ({}):", plan.pages.len());
    for page in &plan.pages {
        let meta = &page.document.metadata;
        println!(
            "  {} {} {} [{}]{}",
            meta.date.format(&site.config.date_format),
            page.slug,
            meta.title,
            page.document.source.display(),
            if meta.draft { " (draft)" } else { "" }
        );
    }

    if !failures.is_empty() {
        println!("Failed ({}):", failures.len());
        for failure in &failures {
            let kinds: Vec<&str> = failure.errors.iter().map(|e| e.kind()).collect();
            println!("  [{}] {}", kinds.join(", "), failure);
        }
    }

    Ok(())
}
