use std::fs;
use std::path::Path;

use quire::config::SiteConfig;
use quire::helpers::escape_html;
use quire::{BuildMode, DocumentError, Site};

const SAMPLE: &str = include_str!("fixtures/go-modules.md");

fn site_in(dir: &Path) -> Site {
    let mut config = SiteConfig::default();
    config.highlight.enable = false;
    config.url = "https://blog.example.com".to_string();
    Site::with_config(dir, config)
}

fn write(site: &Site, rel: &str, content: &str) {
    let path = site.content_dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn post(title: &str, date: &str, draft: bool) -> String {
    format!(
        "---\ntitle: {}\ndate: {}\ndraft: {}\n---\n\nAbout {}.\n",
        title, date, draft, title
    )
}

fn read_output(site: &Site, rel: &str) -> String {
    fs::read_to_string(site.public_dir.join(rel)).unwrap()
}

/// Contents of every fenced code block, in order
fn code_blocks(markdown: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<String> = None;
    for line in markdown.lines() {
        if line.starts_with("```") {
            match current.take() {
                Some(block) => blocks.push(block),
                None => current = Some(String::new()),
            }
        } else if let Some(block) = current.as_mut() {
            block.push_str(line);
            block.push('\n');
        }
    }
    blocks
}

#[test]
fn sample_article_builds_with_code_blocks_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_in(dir.path());
    write(&site, "go-modules.md", SAMPLE);
    write(&site, "tag-display-github.png", "png");
    write(&site, "edit-github.png", "png");

    let report = site.build(BuildMode::Publish).unwrap();
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.pages, 1);
    assert_eq!(report.index.len(), 1);
    assert_eq!(
        report.index[0].title,
        "How to easily upgrade, downgrade, and migrate Go modules"
    );
    assert_eq!(
        report.index[0].date.format("%Y-%m-%d").to_string(),
        "2020-03-05"
    );

    let index = read_output(&site, "index.html");
    assert!(index.contains(r#"href="/go-modules/""#));

    let page = read_output(&site, "go-modules/index.html");
    let blocks = code_blocks(SAMPLE);
    assert_eq!(blocks.len(), 7);
    for block in &blocks {
        assert!(page.contains(&escape_html(block)), "missing block:\n{}", block);
    }
    assert!(page.contains(concat!(
        r#"<pre><code class="language-go">"#,
        "func Greet(ctx context.Context, name string) (string, error) {",
    )));

    assert!(page.contains(r#"src="/tag-display-github.png""#));
    assert!(page.contains(r#"src="/edit-github.png""#));
    assert!(
        page.contains(r#"<a href="https://github.com/marwan-at-work/mod"><code>mod</code></a>"#)
    );
    assert!(site.public_dir.join("edit-github.png").exists());
}

#[test]
fn missing_images_fail_only_their_document() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_in(dir.path());
    write(&site, "go-modules.md", SAMPLE);
    write(&site, "other.md", &post("Other", "2021-01-01", false));

    let report = site.build(BuildMode::Publish).unwrap();
    assert_eq!(report.failures.len(), 1);

    let failure = &report.failures[0];
    assert_eq!(failure.source, Path::new("go-modules.md"));
    let missing: Vec<&str> = failure
        .errors
        .iter()
        .filter_map(|e| match e {
            DocumentError::AssetNotFound(p) => Some(p.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(missing, vec!["tag-display-github.png", "edit-github.png"]);

    assert!(!site.public_dir.join("go-modules").exists());
    assert!(site.public_dir.join("other/index.html").exists());
    assert_eq!(report.index.len(), 1);
    assert_eq!(report.index[0].slug, "other");
}

#[test]
fn missing_date_excludes_document() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_in(dir.path());
    write(&site, "undated.md", "---\ntitle: Undated\n---\n\nNo date here.\n");
    write(&site, "dated.md", &post("Dated", "2020-03-05", false));

    let report = site.build(BuildMode::Publish).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].errors[0],
        DocumentError::MissingRequiredField("date")
    ));
    assert!(!site.public_dir.join("undated").exists());
    assert!(site.public_dir.join("dated/index.html").exists());
}

#[test]
fn malformed_and_unresolved_documents_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_in(dir.path());
    write(&site, "bare.md", "# No front-matter\n");
    write(
        &site,
        "dangling.md",
        "---\ntitle: Dangling\ndate: 2020-03-05\n---\n\nSee [the docs][docs].\n",
    );
    write(&site, "fine.md", &post("Fine", "2020-03-05", false));

    let report = site.build(BuildMode::Publish).unwrap();
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].source, Path::new("bare.md"));
    assert!(report.failures[0].has("MalformedMetadata"));
    assert_eq!(report.failures[1].source, Path::new("dangling.md"));
    assert!(report.failures[1].has("UnresolvedReference"));
    assert_eq!(report.pages, 1);
}

#[test]
fn drafts_only_in_preview() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_in(dir.path());
    write(&site, "public.md", &post("Public", "2020-03-05", false));
    write(&site, "secret.md", &post("Secret", "2020-03-06", true));

    let report = site.build(BuildMode::Publish).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.drafts_skipped, 1);
    assert_eq!(report.index.len(), 1);
    assert!(!site.public_dir.join("secret").exists());
    assert!(!read_output(&site, "index.html").contains("Secret"));

    let report = site.build(BuildMode::Preview).unwrap();
    assert_eq!(report.index.len(), 2);
    assert_eq!(report.index[0].slug, "secret");
    assert!(site.public_dir.join("secret/index.html").exists());
    assert!(read_output(&site, "index.html").contains("Secret"));

    // The feed never carries drafts
    let feed = read_output(&site, "atom.xml");
    assert!(feed.contains("<title>Public</title>"));
    assert!(!feed.contains("<title>Secret</title>"));
}

#[test]
fn colliding_slugs_fail_both_documents() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_in(dir.path());
    write(&site, "posts/modules.md", &post("First", "2020-03-05", false));
    write(&site, "notes/modules.md", &post("Second", "2020-03-06", false));
    write(&site, "unique.md", &post("Unique", "2020-03-07", false));

    let report = site.build(BuildMode::Publish).unwrap();
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().all(|f| f.has("DuplicateSlug")));
    assert!(!site.public_dir.join("modules").exists());
    assert!(site.public_dir.join("unique/index.html").exists());
}

#[test]
fn rebuild_drops_stale_pages() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_in(dir.path());
    write(&site, "first.md", &post("First", "2020-03-05", false));
    site.build(BuildMode::Publish).unwrap();
    assert!(site.public_dir.join("first/index.html").exists());

    fs::remove_file(site.content_dir.join("first.md")).unwrap();
    write(&site, "second.md", &post("Second", "2020-03-06", false));
    site.build(BuildMode::Publish).unwrap();
    assert!(!site.public_dir.join("first").exists());
    assert!(site.public_dir.join("second/index.html").exists());
}

#[test]
fn feed_and_search_index_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_in(dir.path());
    write(&site, "hello.md", &post("Hello", "2020-03-05", false));

    site.build(BuildMode::Publish).unwrap();

    let feed = read_output(&site, "atom.xml");
    assert!(feed.contains(r#"<link href="https://blog.example.com/hello/"/>"#));
    assert!(feed.contains("<updated>2020-03-05T00:00:00+00:00</updated>"));

    let search: serde_json::Value =
        serde_json::from_str(&read_output(&site, "search.json")).unwrap();
    assert_eq!(search[0]["url"], "/hello/");
    assert_eq!(search[0]["title"], "Hello");
}

#[test]
fn unreadable_content_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_in(dir.path());
    assert!(site.build(BuildMode::Publish).is_err());
}

#[test]
fn config_file_is_read() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("_config.yml"),
        "title: Module Notes\ncontent_dir: posts\npublic_dir: out\nslug_source: title\n",
    )
    .unwrap();
    let site = Site::new(dir.path()).unwrap();
    assert_eq!(site.content_dir, dir.path().join("posts"));

    write(&site, "2020-03-05.md", &post("Upgrading Modules", "2020-03-05", false));
    let report = site.build(BuildMode::Publish).unwrap();
    assert!(report.is_clean());
    assert!(dir.path().join("out/upgrading-modules/index.html").exists());
    assert!(read_output(&site, "index.html").contains("Module Notes"));
}

fn site_with(dir: &Path, content_dir: &str, public_dir: &str) -> Site {
    let mut config = SiteConfig::default();
    config.highlight.enable = false;
    config.content_dir = content_dir.to_string();
    config.public_dir = public_dir.to_string();
    Site::with_config(dir, config)
}

#[test]
fn content_inside_public_is_never_wiped() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_with(dir.path(), "public/src", "public");
    write(&site, "hello.md", &post("Hello", "2020-03-05", false));

    assert!(site.build(BuildMode::Publish).is_err());
    assert!(site.content_dir.join("hello.md").exists());

    assert!(site.clean().is_err());
    assert!(site.content_dir.join("hello.md").exists());
}

#[test]
fn public_dir_equal_to_site_dir_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_with(dir.path(), "content", ".");
    write(&site, "hello.md", &post("Hello", "2020-03-05", false));

    assert!(site.build(BuildMode::Publish).is_err());
    assert!(site.content_dir.join("hello.md").exists());
}

#[test]
fn content_at_site_root_rebuilds_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_with(dir.path(), ".", "public");
    write(&site, "go-modules.md", SAMPLE);
    write(&site, "tag-display-github.png", "png");
    write(&site, "edit-github.png", "png");
    write(&site, "_config.yml", "title: Module Notes\n");

    for _ in 0..2 {
        let report = site.build(BuildMode::Publish).unwrap();
        assert!(report.is_clean(), "{:?}", report.failures);
        assert_eq!(report.pages, 1);
    }

    assert!(site.public_dir.join("go-modules/index.html").exists());
    assert!(site.public_dir.join("edit-github.png").exists());
    assert!(!site.public_dir.join("public").exists());
    assert!(!site.public_dir.join("_config.yml").exists());
}

#[test]
fn invalid_date_format_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = SiteConfig::default();
    config.date_format = "%Y-%Q".to_string();
    let site = Site::with_config(dir.path(), config);
    write(&site, "hello.md", &post("Hello", "2020-03-05", false));

    let err = site.build(BuildMode::Publish).unwrap_err();
    assert!(err.to_string().contains("%Y-%Q"));
    assert!(!site.public_dir.exists());
}

#[test]
fn invalid_config_file_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("_config.yml"), "feed: [1, 2]\n").unwrap();

    let err = Site::new(dir.path()).err().unwrap();
    assert!(err.to_string().contains("_config.yml"));
}
