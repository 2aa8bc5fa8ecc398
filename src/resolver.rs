//! Request-to-resource resolution.
//!
//! Maps a request target onto the served directory tree through an ordered
//! fallback chain: exact file, directory index, SPA root index, not found.
//! The resolver is a pure function of filesystem state; probe failures of
//! any kind (absent, wrong type, permission denied) degrade to the next
//! step instead of surfacing as errors.

use crate::mime::{self, MimeTable};
use std::fs;
use std::path::{Path, PathBuf};

/// Index file served for directory requests and SPA fallbacks.
const INDEX_FILE: &str = "index.html";

/// The outcome of resolving one request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A servable regular file and the content type to announce for it
    Found {
        path: PathBuf,
        content_type: &'static str,
    },
    /// Nothing matched; `attempted` is the last filesystem path probed,
    /// for diagnostics and the 404 body
    NotFound { attempted: PathBuf },
}

/// Resolve a request target against the root directory.
///
/// First match wins:
/// 1. the target itself, as a regular file;
/// 2. `index.html` inside the target, treated as a directory;
/// 3. with `spa` enabled, `index.html` at the root;
/// 4. not found.
pub fn resolve(root: &Path, target: &str, spa: bool, mime: &MimeTable) -> Resolution {
    let candidate = join_request_path(root, target);

    if is_regular_file(&candidate) {
        let content_type = mime.lookup(mime::extension_of(&candidate));
        return Resolution::Found {
            path: candidate,
            content_type,
        };
    }

    let index = candidate.join(INDEX_FILE);
    if is_regular_file(&index) {
        return Resolution::Found {
            path: index,
            content_type: mime::HTML,
        };
    }

    if spa {
        let root_index = root.join(INDEX_FILE);
        if is_regular_file(&root_index) {
            return Resolution::Found {
                path: root_index,
                content_type: mime::HTML,
            };
        }
        return Resolution::NotFound {
            attempted: root_index,
        };
    }

    Resolution::NotFound {
        attempted: candidate,
    }
}

/// Join the path portion of a request target onto the root.
///
/// The query string and fragment are discarded first. Segments are taken
/// literally: empty and `.` segments are skipped and `..` segments are
/// discarded, so the joined path can never escape the root.
fn join_request_path(root: &Path, target: &str) -> PathBuf {
    let path = target.split(['?', '#']).next().unwrap_or("");

    let mut joined = root.to_path_buf();
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        joined.push(segment);
    }
    joined
}

/// A filesystem probe that cannot fail: any metadata error means the path
/// does not qualify as a servable file.
fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).map(|meta| meta.is_file()).unwrap_or(false)
}
