//! Markdown rendering with syntax highlighting
//!
//! The renderer walks the pulldown-cmark event stream one top-level block at a
//! time. Each block is rewritten (code blocks highlighted, image URLs resolved
//! against the document) and turned into HTML before the next one is parsed,
//! so callers can stop early or stream blocks into a page.

use pulldown_cmark::{
    html, BrokenLink, CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::config::HighlightConfig;
use crate::error::DocumentError;
use crate::helpers::{asset_url, escape_html, is_external, resolve_relative};

/// Lookup of assets by path relative to the content root
pub trait AssetResolver {
    fn contains(&self, path: &Path) -> bool;
}

/// Where a body is rendered from
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    /// Document directory, relative to the content root
    pub doc_dir: &'a Path,
    /// Site root URL prefix
    pub root: &'a str,
    pub assets: &'a dyn AssetResolver,
}

impl<'a> RenderContext<'a> {
    /// Resolve an image reference to its site URL
    pub fn resolve_image(&self, dest: &str) -> Result<String, DocumentError> {
        if is_external(dest) {
            return Ok(dest.to_string());
        }

        let target = dest.split(['?', '#']).next().unwrap_or(dest);
        let decoded = percent_encoding::percent_decode_str(target).decode_utf8_lossy();

        match resolve_relative(self.doc_dir, &decoded) {
            Some(path) if self.assets.contains(&path) => Ok(asset_url(self.root, &path)),
            _ => Err(DocumentError::AssetNotFound(dest.to_string())),
        }
    }
}

/// Kind of a top-level block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    List { ordered: bool },
    CodeBlock { lang: Option<String> },
    BlockQuote,
    Table,
    Html,
    Rule,
    Other,
}

/// One rendered top-level block
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBlock {
    pub kind: BlockKind,
    pub html: String,
}

type BrokenRefs = Rc<RefCell<Vec<String>>>;
type LinkCallback<'a> = Box<dyn FnMut(BrokenLink<'a>) -> Option<(CowStr<'a>, CowStr<'a>)> + 'a>;

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    highlight: bool,
    line_numbers: bool,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_options(&HighlightConfig::default())
    }

    /// Create with custom settings
    pub fn with_options(config: &HighlightConfig) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: config.theme.clone(),
            highlight: config.enable,
            line_numbers: config.line_number,
        }
    }

    /// Lazily render `markdown` block by block
    pub fn blocks<'a>(&'a self, markdown: &'a str, ctx: RenderContext<'a>) -> Blocks<'a> {
        // Front-matter is split off before rendering, so no metadata block option
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_GFM;

        let broken: BrokenRefs = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&broken);
        let callback: LinkCallback<'a> = Box::new(move |link: BrokenLink<'a>| {
            // Shortcut `[text]` without a definition is plain text, not a reference
            if matches!(
                link.link_type,
                LinkType::Reference
                    | LinkType::ReferenceUnknown
                    | LinkType::Collapsed
                    | LinkType::CollapsedUnknown
            ) {
                sink.borrow_mut().push(link.reference.to_string());
            }
            None
        });

        Blocks {
            renderer: self,
            ctx,
            parser: Parser::new_with_broken_link_callback(markdown, options, Some(callback)),
            broken,
            pending: VecDeque::new(),
        }
    }

    /// Render markdown to HTML, reporting every error in the body
    pub fn render(
        &self,
        markdown: &str,
        ctx: RenderContext<'_>,
    ) -> Result<String, Vec<DocumentError>> {
        let mut html_output = String::new();
        let mut errors = Vec::new();

        for block in self.blocks(markdown, ctx) {
            match block {
                Ok(block) => html_output.push_str(&block.html),
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            Ok(html_output)
        } else {
            Err(errors)
        }
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let class = lang
            .map(|l| format!(r#" class="language-{}""#, escape_html(l)))
            .unwrap_or_default();
        let plain = || format!("<pre><code{}>{}</code></pre>\n", class, escape_html(code));

        if !self.highlight {
            return plain();
        }

        let token = lang.unwrap_or("text");

        // Try to find syntax for the language
        let syntax = self
            .syntax_set
            .find_syntax_by_token(token)
            .or_else(|| self.syntax_set.find_syntax_by_extension(token))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = match self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next())
        {
            Some(theme) => theme,
            None => return plain(),
        };

        match highlighted_html_for_string(code, &self.syntax_set, syntax, theme) {
            Ok(highlighted) if self.line_numbers => self.add_line_numbers(&highlighted, token),
            Ok(highlighted) => format!(
                r#"<figure class="highlight {}">{}</figure>"#,
                escape_html(token),
                highlighted
            ) + "\n",
            Err(e) => {
                tracing::debug!("Highlighting failed for {}: {}", token, e);
                plain()
            }
        }
    }

    /// Add a line-number gutter next to highlighted code
    fn add_line_numbers(&self, highlighted: &str, lang: &str) -> String {
        // syntect wraps the lines in a single <pre ...>; keep it and number the lines beside it
        let line_count = highlighted
            .lines()
            .filter(|l| !l.starts_with("<pre") && !l.starts_with("</pre>"))
            .count()
            .max(1);

        let gutter: Vec<String> = (1..=line_count)
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect();

        format!(
            concat!(
                r#"<figure class="highlight {}"><table><tr>"#,
                r#"<td class="gutter"><pre>{}</pre></td><td class="code">{}</td>"#,
                "</tr></table></figure>",
            ),
            escape_html(lang),
            gutter.join("\n"),
            highlighted
        ) + "\n"
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy sequence of rendered top-level blocks
pub struct Blocks<'a> {
    renderer: &'a MarkdownRenderer,
    ctx: RenderContext<'a>,
    parser: Parser<'a, LinkCallback<'a>>,
    broken: BrokenRefs,
    pending: VecDeque<DocumentError>,
}

impl<'a> Blocks<'a> {
    /// Pull the events of the next top-level block
    fn next_block_events(&mut self) -> Option<Vec<Event<'a>>> {
        let first = self.parser.next()?;
        let mut depth = usize::from(matches!(first, Event::Start(_)));
        let mut events = vec![first];

        while depth > 0 {
            let Some(event) = self.parser.next() else {
                break;
            };
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                _ => {}
            }
            events.push(event);
        }

        Some(events)
    }

    /// Rewrite code blocks and images, then render to HTML
    fn finish_block(&self, events: Vec<Event<'a>>) -> (String, Vec<DocumentError>) {
        let mut out: Vec<Event<'a>> = Vec::with_capacity(events.len());
        let mut errors = Vec::new();
        let mut code: Option<(Option<String>, String)> = None;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    code = Some((code_lang(&kind), String::new()));
                }
                Event::Text(text) if code.is_some() => {
                    if let Some((_, buffer)) = code.as_mut() {
                        buffer.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, buffer)) = code.take() {
                        let html = self.renderer.highlight_code(&buffer, lang.as_deref());
                        out.push(Event::Html(CowStr::from(html)));
                    }
                }
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    let dest_url = match self.ctx.resolve_image(&dest_url) {
                        Ok(url) => CowStr::from(url),
                        Err(e) => {
                            errors.push(e);
                            dest_url
                        }
                    };
                    out.push(Event::Start(Tag::Image {
                        link_type,
                        dest_url,
                        title,
                        id,
                    }));
                }
                other => out.push(other),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, out.into_iter());
        (html_output, errors)
    }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Result<RenderedBlock, DocumentError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.pending.pop_front() {
            return Some(Err(error));
        }

        let events = self.next_block_events()?;
        let kind = block_kind(&events[0]);
        let (html, image_errors) = self.finish_block(events);

        self.pending.extend(
            self.broken
                .borrow_mut()
                .drain(..)
                .map(DocumentError::UnresolvedReference),
        );
        self.pending.extend(image_errors);

        match self.pending.pop_front() {
            Some(error) => Some(Err(error)),
            None => Some(Ok(RenderedBlock { kind, html })),
        }
    }
}

/// Language tag of a code block: the first word of a fenced info string
fn code_lang(kind: &CodeBlockKind<'_>) -> Option<String> {
    match kind {
        CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
        CodeBlockKind::Indented => None,
    }
}

fn block_kind(first: &Event<'_>) -> BlockKind {
    match first {
        Event::Start(Tag::Paragraph) => BlockKind::Paragraph,
        Event::Start(Tag::Heading { level, .. }) => BlockKind::Heading(*level as u8),
        Event::Start(Tag::List(start)) => BlockKind::List {
            ordered: start.is_some(),
        },
        Event::Start(Tag::CodeBlock(kind)) => BlockKind::CodeBlock {
            lang: code_lang(kind),
        },
        Event::Start(Tag::BlockQuote(_)) => BlockKind::BlockQuote,
        Event::Start(Tag::Table(_)) => BlockKind::Table,
        Event::Start(Tag::HtmlBlock) | Event::Html(_) => BlockKind::Html,
        Event::Rule => BlockKind::Rule,
        _ => BlockKind::Other,
    }
}
