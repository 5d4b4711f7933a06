//! `[[target]]` / `[[target | display]]` tokens and their resolution.
//!
//! Resolution runs against a [`LinkRegistry`], a snapshot taken once per
//! batch. Nothing here touches the filesystem after the snapshot exists.

use crate::error::{Diagnostics, ParseWarning};
use folio_types::{Block, Document};
use glob::{MatchOptions, Pattern};
use log::debug;
use regex::Regex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

static INLINE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[[^\[\]]+\]\]").expect("inline wikilink regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikilinkToken {
    pub target: String,
    pub display: Option<String>,
    pub raw: String,
}

impl WikilinkToken {
    pub fn into_block(self) -> Block {
        Block::Wikilink {
            target: self.target,
            display: self.display,
            resolved: None,
            token: self.raw,
        }
    }
}

/// Parses a whole `[[...]]` token. Returns `None` for anything else,
/// including an empty target.
///
/// The split happens on the first `|` not preceded by a backslash; `\|`
/// stands for a literal pipe.
pub fn parse_wikilink(raw: &str) -> Option<WikilinkToken> {
    let trimmed = raw.trim();
    let inner = trimmed.strip_prefix("[[")?.strip_suffix("]]")?;
    if inner.contains("[[") || inner.contains("]]") {
        return None;
    }

    let mut target = String::new();
    let mut display = String::new();
    let mut split = false;
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        let c = match c {
            '\\' if chars.peek() == Some(&'|') => {
                chars.next();
                '|'
            }
            '|' if !split => {
                split = true;
                continue;
            }
            other => other,
        };
        if split { display.push(c) } else { target.push(c) }
    }

    let target = target.trim().to_string();
    if target.is_empty() {
        return None;
    }
    let display = Some(display.trim().to_string()).filter(|d| !d.is_empty());
    Some(WikilinkToken {
        target,
        display,
        raw: trimmed.to_string(),
    })
}

/// Which fallback level produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact,
    CaseInsensitive,
    PrefixGlob,
    RecursiveName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: PathBuf,
    pub strategy: MatchStrategy,
}

/// A read-only snapshot of everything a wikilink can point at.
#[derive(Debug, Clone, Default)]
pub struct LinkRegistry {
    identifiers: BTreeMap<String, PathBuf>,
    outputs_root: Option<PathBuf>,
    /// Files under `outputs_root`, sorted.
    files: Vec<PathBuf>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier(mut self, id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.identifiers.insert(id.into(), path.into());
        self
    }

    /// Uses an explicit file listing for the outputs root.
    pub fn with_outputs<I, P>(mut self, root: impl Into<PathBuf>, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.outputs_root = Some(root.into());
        self.files = files.into_iter().map(Into::into).collect();
        self.files.sort();
        self
    }

    /// Walks `root` once and records every file below it.
    pub fn scan_outputs(self, root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        let mut files = Vec::new();
        if root.is_dir() {
            for entry in WalkDir::new(root) {
                let entry = entry.map_err(io::Error::other)?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        }
        debug!("Link registry captured {} output file(s) under {}", files.len(), root.display());
        Ok(self.with_outputs(root, files))
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty() && self.files.is_empty()
    }

    /// Resolves a target through exact, case-insensitive, prefix-glob and
    /// recursive-name lookups, in that order. Within one level the
    /// lexicographically smallest path wins.
    pub fn resolve(&self, target: &str) -> Option<Resolution> {
        let target = target.trim();
        if target.is_empty() {
            return None;
        }
        let found = |path: &PathBuf, strategy| Resolution {
            path: path.clone(),
            strategy,
        };

        if let Some(path) = self.identifiers.get(target) {
            return Some(found(path, MatchStrategy::Exact));
        }

        if let Some(path) = self
            .identifiers
            .iter()
            .filter(|(id, _)| id.eq_ignore_ascii_case(target))
            .map(|(_, path)| path)
            .min()
        {
            return Some(found(path, MatchStrategy::CaseInsensitive));
        }

        let root = self.outputs_root.as_deref()?;
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        if let Ok(pattern) = Pattern::new(&format!("{}*", Pattern::escape(target)))
            && let Some(path) = self.files.iter().find(|path| {
                path.parent() == Some(root)
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|name| pattern.matches_with(name, options))
            })
        {
            return Some(found(path, MatchStrategy::PrefixGlob));
        }

        self.files
            .iter()
            .find(|path| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| stem.eq_ignore_ascii_case(target))
            })
            .map(|path| found(path, MatchStrategy::RecursiveName))
    }
}

/// Splits `target#anchor`.
pub fn split_anchor(target: &str) -> (&str, Option<&str>) {
    match target.split_once('#') {
        Some((base, anchor)) => (base, Some(anchor).filter(|a| !a.is_empty())),
        None => (target, None),
    }
}

/// Resolves every wikilink block of `document`.
///
/// Same-document links (`[[#anchor]]`) resolve to an empty path. Unresolved
/// links keep `resolved: None` and produce one warning each.
/// Tokens embedded in running text, in order. `![[...]]` embeds are skipped.
pub fn inline_wikilinks(text: &str) -> Vec<WikilinkToken> {
    INLINE_TOKEN
        .find_iter(text)
        .filter(|m| !text[..m.start()].ends_with('!'))
        .filter_map(|m| parse_wikilink(m.as_str()))
        .collect()
}

fn running_text(block: &Block) -> Vec<&str> {
    match block {
        Block::Paragraph { text, .. } => vec![text.as_str()],
        Block::List { items, .. } => items.iter().map(String::as_str).collect(),
        Block::Callout { title, content, .. } => title.iter().map(String::as_str).chain([content.as_str()]).collect(),
        Block::Table { header, rows, .. } => header.iter().chain(rows.iter().flatten()).map(String::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Resolves every wikilink block against `registry`.
///
/// Tokens inside running text stay text; the ones that match nothing are
/// still reported so broken references show up in the build log.
pub fn resolve_wikilinks(document: Document, registry: &LinkRegistry) -> (Document, Vec<ParseWarning>) {
    let mut diagnostics = Diagnostics::default();
    for token in document.blocks.iter().flat_map(running_text).flat_map(inline_wikilinks) {
        let (base, _) = split_anchor(&token.target);
        if base.is_empty() {
            continue;
        }
        match registry.resolve(base) {
            Some(found) => debug!("Inline link {} matches {}", token.raw, found.path.display()),
            None => diagnostics.warn(ParseWarning::UnresolvedLink { token: token.raw }),
        }
    }
    let blocks = document
        .blocks
        .into_iter()
        .map(|block| match block {
            Block::Wikilink { target, display, token, .. } => {
                let (base, _) = split_anchor(&target);
                let resolved = if base.is_empty() {
                    Some(PathBuf::new())
                } else {
                    registry.resolve(base).map(|r| r.path)
                };
                if resolved.is_none() {
                    diagnostics.warn(ParseWarning::UnresolvedLink { token: token.clone() });
                }
                Block::Wikilink { target, display, resolved, token }
            }
            other => other,
        })
        .collect();
    (
        Document {
            metadata: document.metadata,
            blocks,
        },
        diagnostics.into_inner(),
    )
}
