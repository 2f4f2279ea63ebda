// src/exclude.rs

//! Ordered exclusion patterns with `!` negation.
//!
//! ```toml
//! exclude = ["*.log", "!keep.log", "node_modules", "build/out/"]
//! ```
//!
//! Patterns are evaluated left to right and every match overwrites the running
//! decision, so the *last* matching pattern wins:
//!
//! - `pattern` matching the path sets "excluded".
//! - `!pattern` matching the path sets "included".
//!
//! A pattern without `/` is tested against every component of the key (the
//! basename at any depth, or any ancestor directory name). A pattern with `/`
//! (a leading one included) is anchored at the root and tested against the
//! full key and each ancestor prefix. A trailing `/` restricts a pattern to
//! directories.
//!
//! The scanner, the watch engine and the poller all go through
//! [`ExclusionMatcher::is_excluded`]; there is no second implementation.

use std::fmt;

use globset::{GlobBuilder, GlobMatcher};

use crate::errors::{FimError, Result};

#[derive(Clone)]
struct CompiledPattern {
    raw: String,
    negated: bool,
    anchored: bool,
    dir_only: bool,
    matcher: GlobMatcher,
}

impl CompiledPattern {
    fn compile(raw: &str, case_insensitive: bool) -> Result<Self> {
        let invalid = |reason: &str| FimError::InvalidPattern {
            pattern: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        let (negated, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let dir_only = body.ends_with('/');
        let body = body.trim_end_matches('/');
        let anchored = body.contains('/');
        let body = body.strip_prefix('/').unwrap_or(body);

        if body.is_empty() {
            return Err(invalid("empty pattern"));
        }

        let glob = GlobBuilder::new(body)
            .literal_separator(true)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            negated,
            anchored,
            dir_only,
            matcher: glob.compile_matcher(),
        })
    }

    fn matches(&self, components: &[&str], is_dir: bool) -> bool {
        // Directory-only patterns never look at a final file component.
        let limit = if self.dir_only && !is_dir {
            components.len().saturating_sub(1)
        } else {
            components.len()
        };

        if self.anchored {
            (1..=limit).any(|n| self.matcher.is_match(components[..n].join("/")))
        } else {
            components[..limit]
                .iter()
                .any(|part| self.matcher.is_match(part))
        }
    }
}

/// Compiled, ordered exclusion list.
#[derive(Clone, Default)]
pub struct ExclusionMatcher {
    patterns: Vec<CompiledPattern>,
}

impl fmt::Debug for ExclusionMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.patterns.iter().map(|p| &p.raw))
            .finish()
    }
}

impl ExclusionMatcher {
    /// Compile patterns for a case-sensitive tree.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        Self::build(patterns, false)
    }

    /// Compile patterns; with `case_insensitive` the globs ignore case, to
    /// match keys that were case-folded by the scanner.
    pub fn build<S: AsRef<str>>(patterns: &[S], case_insensitive: bool) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| CompiledPattern::compile(p.as_ref(), case_insensitive))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Matcher that excludes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether any `!pattern` is present. Without negations an excluded
    /// directory can be pruned from a walk, since nothing below it can be
    /// re-included.
    pub fn has_negations(&self) -> bool {
        self.patterns.iter().any(|p| p.negated)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.raw.as_str())
    }

    /// Decide whether `rel_path` (a normalized key such as `"src/a.rs"`) is
    /// excluded from monitoring.
    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.evaluate(rel_path, false)
    }

    /// Like [`is_excluded`](Self::is_excluded), for a directory key. Used by
    /// the scanner to prune whole subtrees.
    pub fn is_dir_excluded(&self, rel_path: &str) -> bool {
        self.evaluate(rel_path, true)
    }

    fn evaluate(&self, rel_path: &str, is_dir: bool) -> bool {
        let components: Vec<&str> = rel_path.split('/').filter(|c| !c.is_empty()).collect();
        if components.is_empty() {
            return false;
        }

        let mut excluded = false;
        for pattern in &self.patterns {
            if pattern.matches(&components, is_dir) {
                excluded = !pattern.negated;
            }
        }
        excluded
    }
}

/// One-shot form: compile `patterns` and evaluate a single path.
pub fn is_excluded<S: AsRef<str>>(rel_path: &str, patterns: &[S]) -> Result<bool> {
    Ok(ExclusionMatcher::new(patterns)?.is_excluded(rel_path))
}
