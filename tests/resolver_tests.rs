use servir::mime::MimeTable;
use servir::resolver::{resolve, Resolution};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Build a served tree for the tests:
///
/// ```text
/// root/
///   index.html
///   app.js
///   styles.css
///   notes.unknown
///   .env
///   blog/
///     index.html
///   assets/
///     logo.svg
///   empty/
/// ```
fn served_tree() -> TempDir {
    let root = TempDir::new().unwrap();
    let base = root.path();

    fs::write(base.join("index.html"), "<h1>home</h1>").unwrap();
    fs::write(base.join("app.js"), "console.log('hi');").unwrap();
    fs::write(base.join("styles.css"), "body {}").unwrap();
    fs::write(base.join("notes.unknown"), "???").unwrap();
    fs::write(base.join(".env"), "SECRET=1").unwrap();

    fs::create_dir(base.join("blog")).unwrap();
    fs::write(base.join("blog/index.html"), "<h1>blog</h1>").unwrap();

    fs::create_dir(base.join("assets")).unwrap();
    fs::write(base.join("assets/logo.svg"), "<svg/>").unwrap();

    fs::create_dir(base.join("empty")).unwrap();

    root
}

fn assert_found(resolution: Resolution, path: &Path, content_type: &str) {
    match resolution {
        Resolution::Found {
            path: found,
            content_type: found_type,
        } => {
            assert_eq!(found, path);
            assert_eq!(found_type, content_type);
        }
        Resolution::NotFound { attempted } => {
            panic!("expected {:?}, got not found at {:?}", path, attempted)
        }
    }
}

#[test]
fn test_exact_file_is_served_with_its_content_type() {
    let tree = served_tree();
    let mime = MimeTable::new();

    assert_found(
        resolve(tree.path(), "/app.js", false, &mime),
        &tree.path().join("app.js"),
        "application/javascript",
    );
    assert_found(
        resolve(tree.path(), "/styles.css", false, &mime),
        &tree.path().join("styles.css"),
        "text/css",
    );
    assert_found(
        resolve(tree.path(), "/assets/logo.svg", false, &mime),
        &tree.path().join("assets/logo.svg"),
        "image/svg+xml",
    );
}

#[test]
fn test_exact_match_ignores_the_spa_flag() {
    let tree = served_tree();
    let mime = MimeTable::new();

    // An existing file resolves identically whether or not SPA mode is on.
    let plain = resolve(tree.path(), "/app.js", false, &mime);
    let spa = resolve(tree.path(), "/app.js", true, &mime);
    assert_eq!(plain, spa);
}

#[test]
fn test_unknown_extension_falls_back_to_text_plain() {
    let tree = served_tree();
    let mime = MimeTable::new();

    assert_found(
        resolve(tree.path(), "/notes.unknown", false, &mime),
        &tree.path().join("notes.unknown"),
        "text/plain",
    );
}

#[test]
fn test_dotfile_extension_is_the_whole_name() {
    let tree = served_tree();
    let mime = MimeTable::new();

    // ".env" has no mapping, so it is served as text/plain rather than
    // being treated as extensionless.
    assert_found(
        resolve(tree.path(), "/.env", false, &mime),
        &tree.path().join(".env"),
        "text/plain",
    );
}

#[test]
fn test_directory_request_serves_its_index() {
    let tree = served_tree();
    let mime = MimeTable::new();

    for target in ["/blog", "/blog/"] {
        assert_found(
            resolve(tree.path(), target, false, &mime),
            &tree.path().join("blog/index.html"),
            "text/html",
        );
    }
}

#[test]
fn test_root_request_serves_the_root_index() {
    let tree = served_tree();
    let mime = MimeTable::new();

    assert_found(
        resolve(tree.path(), "/", false, &mime),
        &tree.path().join("index.html"),
        "text/html",
    );
}

#[test]
fn test_directory_index_wins_over_spa_fallback() {
    let tree = served_tree();
    let mime = MimeTable::new();

    // Even in SPA mode, /blog serves blog/index.html, not the root index.
    assert_found(
        resolve(tree.path(), "/blog", true, &mime),
        &tree.path().join("blog/index.html"),
        "text/html",
    );
}

#[test]
fn test_spa_deep_link_falls_back_to_the_root_index() {
    let tree = served_tree();
    let mime = MimeTable::new();

    assert_found(
        resolve(tree.path(), "/users/42/profile", true, &mime),
        &tree.path().join("index.html"),
        "text/html",
    );
}

#[test]
fn test_spa_without_a_root_index_is_not_found() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("app.js"), "x").unwrap();
    let mime = MimeTable::new();

    match resolve(root.path(), "/users/42", true, &mime) {
        Resolution::NotFound { attempted } => {
            assert_eq!(attempted, root.path().join("index.html"));
        }
        other => panic!("expected not found, got {:?}", other),
    }
}

#[test]
fn test_plain_miss_reports_the_candidate_path() {
    let tree = served_tree();
    let mime = MimeTable::new();

    match resolve(tree.path(), "/missing.txt", false, &mime) {
        Resolution::NotFound { attempted } => {
            assert_eq!(attempted, tree.path().join("missing.txt"));
        }
        other => panic!("expected not found, got {:?}", other),
    }
}

#[test]
fn test_directory_without_an_index_is_not_found() {
    let tree = served_tree();
    let mime = MimeTable::new();

    assert!(matches!(
        resolve(tree.path(), "/empty", false, &mime),
        Resolution::NotFound { .. }
    ));
}

#[test]
fn test_query_string_and_fragment_are_discarded() {
    let tree = served_tree();
    let mime = MimeTable::new();

    assert_found(
        resolve(tree.path(), "/app.js?v=3", false, &mime),
        &tree.path().join("app.js"),
        "application/javascript",
    );
    assert_found(
        resolve(tree.path(), "/app.js#section", false, &mime),
        &tree.path().join("app.js"),
        "application/javascript",
    );
}

#[test]
fn test_parent_segments_cannot_escape_the_root() {
    let root = TempDir::new().unwrap();
    let outside = root.path().join("outside.txt");
    fs::write(&outside, "secret").unwrap();

    let served = root.path().join("public");
    fs::create_dir(&served).unwrap();
    fs::write(served.join("inside.txt"), "public").unwrap();

    let mime = MimeTable::new();

    // "/../outside.txt" collapses to "outside.txt" under the served root,
    // which does not exist there.
    match resolve(&served, "/../outside.txt", false, &mime) {
        Resolution::NotFound { attempted } => {
            assert_eq!(attempted, served.join("outside.txt"));
        }
        other => panic!("traversal must not resolve, got {:?}", other),
    }

    assert!(matches!(
        resolve(&served, "/a/../../outside.txt", false, &mime),
        Resolution::NotFound { .. }
    ));
}

#[test]
fn test_resolution_is_idempotent() {
    let tree = served_tree();
    let mime = MimeTable::new();

    let first = resolve(tree.path(), "/blog", true, &mime);
    let second = resolve(tree.path(), "/blog", true, &mime);
    assert_eq!(first, second);
}
