use std::collections::HashSet;

use url::Url;

/// Node of the read-only bookmark tree exposed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkNode {
    Folder {
        name: String,
        children: Vec<BookmarkNode>,
    },
    Bookmark {
        name: String,
        url: String,
    },
}

impl BookmarkNode {
    pub fn folder(name: impl Into<String>, children: Vec<BookmarkNode>) -> Self {
        Self::Folder {
            name: name.into(),
            children,
        }
    }

    pub fn bookmark(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Bookmark {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Collects up to `limit` distinct hostnames from HTTPS bookmark URLs in
/// depth-first order.
///
/// Non-HTTPS URLs (and strings that do not parse as URLs at all) are
/// silently skipped; duplicates collapse to their first occurrence. The
/// walk stops as soon as the limit is reached.
pub fn collect_https_hosts(root: &BookmarkNode, limit: usize) -> Vec<String> {
    let mut hosts = Vec::new();
    let mut seen = HashSet::new();
    collect_into(root, limit, &mut hosts, &mut seen);
    hosts
}

fn collect_into(
    node: &BookmarkNode,
    limit: usize,
    hosts: &mut Vec<String>,
    seen: &mut HashSet<String>,
) {
    if hosts.len() >= limit {
        return;
    }
    match node {
        BookmarkNode::Folder { children, .. } => {
            for child in children {
                if hosts.len() >= limit {
                    break;
                }
                collect_into(child, limit, hosts, seen);
            }
        }
        BookmarkNode::Bookmark { url, .. } => {
            if let Some(host) = https_host(url) {
                if seen.insert(host.clone()) {
                    hosts.push(host);
                }
            }
        }
    }
}

fn https_host(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    if parsed.scheme() != "https" {
        return None;
    }
    parsed.host_str().map(str::to_string)
}

/// Counts leaf bookmarks across the whole tree, independent of nesting
/// depth. Used for the trailing audit summary.
pub fn count_bookmarks(root: &BookmarkNode) -> u64 {
    match root {
        BookmarkNode::Folder { children, .. } => children.iter().map(count_bookmarks).sum(),
        BookmarkNode::Bookmark { .. } => 1,
    }
}
