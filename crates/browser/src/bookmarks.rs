use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use favlens_core::bookmarks::BookmarkNode;

/// Read-only bookmark tree exposed by the host.
pub trait BookmarkSource: Send + Sync {
    fn tree(&self) -> Result<BookmarkNode, BookmarkError>;
}

/// Errors raised while loading a bookmark tree.
#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("failed to read bookmark file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse bookmark file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Chrome `Bookmarks` JSON export.
///
/// The export mirrors the live bookmark tree: a `roots` object whose values
/// are folders of nested `folder`/`url` nodes. Nodes of other types are
/// skipped.
pub struct ChromeBookmarkFile {
    path: PathBuf,
}

impl ChromeBookmarkFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BookmarkSource for ChromeBookmarkFile {
    fn tree(&self) -> Result<BookmarkNode, BookmarkError> {
        let raw = std::fs::read_to_string(&self.path)?;
        let file: BookmarkFile = serde_json::from_str(&raw)?;
        // BTreeMap keeps root order deterministic across runs.
        let children = file
            .roots
            .into_iter()
            .filter_map(|(_, node)| convert(node))
            .collect();
        Ok(BookmarkNode::folder("roots", children))
    }
}

#[derive(Debug, Deserialize)]
struct BookmarkFile {
    roots: BTreeMap<String, RawNode>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    children: Vec<RawNode>,
    #[serde(default)]
    url: Option<String>,
}

fn convert(node: RawNode) -> Option<BookmarkNode> {
    match node.kind.as_str() {
        "folder" => Some(BookmarkNode::folder(
            node.name,
            node.children.into_iter().filter_map(convert).collect(),
        )),
        "url" => node
            .url
            .map(|url| BookmarkNode::bookmark(node.name, url)),
        _ => None,
    }
}

/// Deterministic built-in tree used in development when no bookmark file is
/// configured. Matches [`crate::sim::SimBrowser::sample`].
pub struct SampleBookmarks;

impl BookmarkSource for SampleBookmarks {
    fn tree(&self) -> Result<BookmarkNode, BookmarkError> {
        Ok(BookmarkNode::folder(
            "roots",
            vec![
                BookmarkNode::folder(
                    "Rust",
                    vec![
                        BookmarkNode::bookmark("docs.rs", "https://docs.rs/tokio"),
                        BookmarkNode::bookmark("crates.io", "https://crates.io/"),
                        BookmarkNode::bookmark("blog", "https://blog.rust-lang.org/"),
                        BookmarkNode::bookmark(
                            "internals",
                            "https://internals.rust-lang.org/",
                        ),
                    ],
                ),
                BookmarkNode::folder(
                    "Code",
                    vec![
                        BookmarkNode::bookmark("github", "https://github.com/"),
                        BookmarkNode::bookmark(
                            "rust repo",
                            "https://github.com/rust-lang/rust",
                        ),
                        BookmarkNode::bookmark("plain http", "http://neverssl.com/"),
                    ],
                ),
            ],
        ))
    }
}
