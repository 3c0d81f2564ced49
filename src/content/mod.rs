//! Content module - content store, document parsing and Markdown rendering

mod document;
mod frontmatter;
mod markdown;
mod store;

pub use document::Document;
pub use frontmatter::Metadata;
pub use markdown::{
    AssetResolver, BlockKind, Blocks, MarkdownRenderer, RenderContext, RenderedBlock,
};
pub use store::ContentStore;
