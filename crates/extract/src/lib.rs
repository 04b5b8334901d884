//! Resource reference extraction and token substitution.
//!
//! Publishing a document is a two-phase protocol:
//!
//! 1. [`extract_html`] / [`extract_css`] find every reference to a local file,
//!    replace it with an opaque token and return the rewritten text together
//!    with the queue of `{token, path}` pairs.
//! 2. Once every queued file has been published (or inlined), [`substitute`]
//!    swaps each token for its final URL.
//!
//! Neither phase fails: anything that can't be resolved is left verbatim.

mod consts;
mod css;
mod html;
mod resolve;
mod substitute;
mod token;

pub use crate::consts::DEFAULT_EXTENSIONS;
use crate::consts::{DEFAULT_CATCH_ALL, catch_all_pattern};
pub use crate::css::extract_css;
pub use crate::html::extract_html;
pub use crate::resolve::{is_invalid, resolve};
pub use crate::substitute::{StubMap, Substitution, substitute};
pub use crate::token::{Reference, token_for};

use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A rewritten document and the references it now depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    /// One entry per distinct resolved path, in first-seen order.
    pub queue: Vec<Reference>,
}

/// Settings shared by every document in one run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Root that `/`-prefixed references resolve against.
    pub asset_root: PathBuf,
    catch_all: Regex,
}

impl Options {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self::with_extensions(asset_root, DEFAULT_EXTENSIONS)
    }

    /// Use a custom extension list for the HTML catch-all pass. Entries that
    /// aren't plain alphanumeric extensions are ignored.
    pub fn with_extensions<S: AsRef<str>>(asset_root: impl Into<PathBuf>, extensions: &[S]) -> Self {
        let extensions: Vec<String> = extensions
            .iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .collect();
        let catch_all = match extensions.is_empty() {
            true => DEFAULT_CATCH_ALL.clone(),
            false => catch_all_regex(&extensions),
        };
        Self { asset_root: asset_root.into(), catch_all }
    }

    pub(crate) fn catch_all(&self) -> &Regex {
        &self.catch_all
    }
}

fn catch_all_regex(extensions: &[String]) -> Regex {
    match Regex::new(&catch_all_pattern(extensions)) {
        Ok(regex) => regex,
        Err(err) => {
            // Extensions are alphanumeric, so only the regex size limit can trip this.
            tracing::warn!(error = %err, "custom extension list rejected, using defaults");
            DEFAULT_CATCH_ALL.clone()
        },
    }
}

/// Accumulates the queue for one document.
pub(crate) struct Collector<'a> {
    doc_dir: PathBuf,
    asset_root: &'a Path,
    seen: HashSet<PathBuf>,
    queue: Vec<Reference>,
}

impl<'a> Collector<'a> {
    pub(crate) fn new(doc_path: &Path, asset_root: &'a Path) -> Self {
        let doc_dir = doc_path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self { doc_dir, asset_root, seen: HashSet::new(), queue: Vec::new() }
    }

    /// Token for `reference` if it resolves to an existing file.
    pub(crate) fn token(&mut self, reference: &str) -> Option<String> {
        let path = resolve(reference, &self.doc_dir, self.asset_root)?;
        if !path.is_file() {
            tracing::trace!(reference, path = %path.display(), "reference does not resolve to a file");
            return None;
        }
        let token = token_for(&path);
        if self.seen.insert(path.clone()) {
            self.queue.push(Reference { token: token.clone(), path });
        }
        Some(token)
    }

    pub(crate) fn finish(self, text: String) -> Extraction {
        Extraction { text, queue: self.queue }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// A temporary site root containing `files` (relative paths, tiny bodies).
    pub(crate) fn site(files: &[&str]) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        for file in files {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"x").unwrap();
        }
        (dir, root)
    }

    pub(crate) fn at(root: &Path, file: &str) -> PathBuf {
        root.join(file)
    }
}
