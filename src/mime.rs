//! Content-type resolution.
//!
//! The table is built once at startup by inverting a bundled database of
//! content-type to extension mappings, then applying a small override set
//! that always wins. Lookups never fail: unknown extensions resolve to
//! `text/plain`.

use std::collections::HashMap;
use std::path::Path;

/// Content type used when an extension is unknown or missing.
pub const DEFAULT_TYPE: &str = "text/plain";

/// Content type of `index.html` fallbacks.
pub const HTML: &str = "text/html";

/// Bundled database: content type to the extensions registered for it.
///
/// The slice is folded in order, so when two entries claim the same
/// extension the later entry wins — e.g. `.xml` resolves to `text/xml` and
/// `.webm` to `video/webm` below.
const MIME_DATABASE: &[(&str, &[&str])] = &[
    // Text
    ("text/html", &["html", "htm", "shtml"]),
    ("text/css", &["css"]),
    ("text/plain", &["txt", "text", "log", "conf", "ini"]),
    ("text/markdown", &["md", "markdown"]),
    ("text/csv", &["csv"]),
    ("text/calendar", &["ics"]),
    ("text/vcard", &["vcf"]),
    ("text/yaml", &["yaml", "yml"]),
    // Scripts and data
    ("application/javascript", &["js", "mjs"]),
    ("application/json", &["json", "map"]),
    ("application/ld+json", &["jsonld"]),
    ("application/xml", &["xml", "xsl"]),
    ("text/xml", &["xml"]),
    ("application/rss+xml", &["rss"]),
    ("application/atom+xml", &["atom"]),
    ("application/xhtml+xml", &["xhtml"]),
    ("application/wasm", &["wasm"]),
    // Images
    ("image/png", &["png"]),
    ("image/jpeg", &["jpg", "jpeg"]),
    ("image/gif", &["gif"]),
    ("image/svg+xml", &["svg", "svgz"]),
    ("image/webp", &["webp"]),
    ("image/avif", &["avif"]),
    ("image/x-icon", &["ico"]),
    ("image/bmp", &["bmp"]),
    ("image/tiff", &["tif", "tiff"]),
    ("image/apng", &["apng"]),
    // Audio
    ("audio/mpeg", &["mp3"]),
    ("audio/wav", &["wav"]),
    ("audio/ogg", &["oga", "opus"]),
    ("audio/flac", &["flac"]),
    ("audio/aac", &["aac"]),
    ("audio/mp4", &["m4a"]),
    ("audio/midi", &["mid", "midi"]),
    // Video
    ("video/mp4", &["mp4", "m4v"]),
    ("audio/webm", &["webm"]),
    ("video/webm", &["webm"]),
    ("video/ogg", &["ogv"]),
    ("video/quicktime", &["mov"]),
    ("video/x-msvideo", &["avi"]),
    ("video/mpeg", &["mpeg", "mpg"]),
    // Fonts
    ("font/woff", &["woff"]),
    ("font/woff2", &["woff2"]),
    ("font/ttf", &["ttf"]),
    ("font/otf", &["otf"]),
    ("application/vnd.ms-fontobject", &["eot"]),
    // Documents and archives
    ("application/pdf", &["pdf"]),
    ("application/zip", &["zip"]),
    ("application/gzip", &["gz", "gzip"]),
    ("application/x-tar", &["tar"]),
    ("application/x-7z-compressed", &["7z"]),
    ("application/x-bzip2", &["bz2"]),
    ("application/epub+zip", &["epub"]),
    ("application/rtf", &["rtf"]),
    ("application/octet-stream", &["bin", "exe", "dll", "iso", "dmg"]),
];

/// Overrides applied after the bulk database; these always win.
const OVERRIDES: &[(&str, &str)] = &[
    (".webmanifest", "application/json+manifest"),
    (".jsm", "application/javascript"),
    (".esm", "application/javascript"),
];

/// Extension to content-type table, immutable after construction.
pub struct MimeTable {
    entries: HashMap<String, &'static str>,
}

impl MimeTable {
    /// Build the table: invert the bundled database (last write wins on
    /// duplicate extensions), then apply the overrides
    pub fn new() -> Self {
        let mut entries = HashMap::new();

        for (content_type, extensions) in MIME_DATABASE {
            for extension in *extensions {
                entries.insert(format!(".{}", extension), *content_type);
            }
        }

        for (extension, content_type) in OVERRIDES {
            entries.insert((*extension).to_string(), *content_type);
        }

        Self { entries }
    }

    /// Look up the content type for an extension (leading dot included,
    /// case-sensitive). Unknown or empty extensions resolve to `text/plain`.
    pub fn lookup(&self, extension: &str) -> &'static str {
        self.entries.get(extension).copied().unwrap_or(DEFAULT_TYPE)
    }

    /// Number of known extensions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MimeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the extension of a path: the substring from the last `.` of the
/// final segment, dot included. Returns the empty string when the final
/// segment has no dot.
pub fn extension_of(path: &Path) -> &str {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.rfind('.').map(|dot| &name[dot..]))
        .unwrap_or("")
}
