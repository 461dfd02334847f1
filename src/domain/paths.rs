//! Lexical path utilities for resolving link and include targets.
//!
//! Nothing here touches the filesystem. Paths are corpus-relative and
//! resolution is purely lexical, the same way a static site generator maps
//! source files to URLs.

use std::path::{Component, Path, PathBuf};

/// Normalizes a relative path lexically, resolving `.` and `..` components.
///
/// Returns `None` if the path escapes its root (more `..` than there are
/// components to pop) or is absolute.
///
/// ```
/// use std::path::{Path, PathBuf};
///
/// use guidelint::domain::paths::normalize;
///
/// assert_eq!(
///     normalize(Path::new("docs/python/../general/./design.md")),
///     Some(PathBuf::from("docs/general/design.md"))
/// );
/// assert_eq!(normalize(Path::new("../outside.md")), None);
/// ```
#[must_use]
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(normalized)
}

/// Returns the corpus paths a link's page part may refer to, most specific
/// first.
///
/// - root-relative pages (`/docs/x.html`) resolve against the corpus root
/// - other pages resolve against the directory of the linking document
/// - a trailing `/` means the directory's index page
/// - a `.html` page also matches the `.md` source it is rendered from
#[must_use]
pub fn candidates(from: &Path, page: &str) -> Vec<PathBuf> {
    let (base, page) = match page.strip_prefix('/') {
        Some(stripped) => (Path::new(""), stripped),
        None => (from.parent().unwrap_or_else(|| Path::new("")), page),
    };

    let Some(resolved) = normalize(&base.join(page)) else {
        return Vec::new();
    };

    if page.is_empty() || page.ends_with('/') {
        return vec![resolved.join("index.md"), resolved.join("index.html")];
    }

    let mut candidates = vec![resolved.clone()];
    match resolved.extension().and_then(|e| e.to_str()) {
        Some("html") => candidates.push(resolved.with_extension("md")),
        None => {
            candidates.push(resolved.with_extension("md"));
            candidates.push(resolved.join("index.md"));
        }
        Some(_) => {}
    }
    candidates
}

/// Returns the path of an include target, relative to the corpus root.
///
/// `include_relative` resolves against the including document's directory;
/// plain `include` resolves against the include directory.
#[must_use]
pub fn include_path(
    include_dir: &Path,
    from: &Path,
    target: &str,
    relative: bool,
) -> Option<PathBuf> {
    let base = if relative {
        from.parent().unwrap_or_else(|| Path::new(""))
    } else {
        include_dir
    };
    normalize(&base.join(target))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("a/b/c.md", "a/b/c.md")]
    #[test_case("a/./b.md", "a/b.md")]
    #[test_case("a/b/../c.md", "a/c.md")]
    #[test_case("a/../../c.md", ""; "escapes root")]
    fn normalizes(input: &str, expected: &str) {
        let result = normalize(Path::new(input));
        if expected.is_empty() {
            assert_eq!(result, None);
        } else {
            assert_eq!(result, Some(PathBuf::from(expected)));
        }
    }

    #[test]
    fn relative_page_resolves_against_document_directory() {
        let result = candidates(Path::new("docs/python/introduction.md"), "../general/design.md");
        assert_eq!(result, vec![PathBuf::from("docs/general/design.md")]);
    }

    #[test]
    fn html_page_also_matches_markdown_source() {
        let result = candidates(Path::new("docs/index.md"), "design.html");
        assert_eq!(
            result,
            vec![
                PathBuf::from("docs/design.html"),
                PathBuf::from("docs/design.md")
            ]
        );
    }

    #[test]
    fn root_relative_page_resolves_against_root() {
        let result = candidates(Path::new("docs/python/introduction.md"), "/docs/general.html");
        assert_eq!(
            result,
            vec![
                PathBuf::from("docs/general.html"),
                PathBuf::from("docs/general.md")
            ]
        );
    }

    #[test]
    fn directory_page_resolves_to_index() {
        let result = candidates(Path::new("docs/index.md"), "python/");
        assert_eq!(
            result,
            vec![
                PathBuf::from("docs/python/index.md"),
                PathBuf::from("docs/python/index.html")
            ]
        );
    }

    #[test]
    fn extensionless_page() {
        let result = candidates(Path::new("index.md"), "design");
        assert_eq!(
            result,
            vec![
                PathBuf::from("design"),
                PathBuf::from("design.md"),
                PathBuf::from("design/index.md")
            ]
        );
    }

    #[test]
    fn escaping_page_has_no_candidates() {
        assert!(candidates(Path::new("index.md"), "../../x.md").is_empty());
    }

    #[test]
    fn include_paths() {
        let include_dir = Path::new("_includes");
        let from = Path::new("docs/python/design.md");

        assert_eq!(
            include_path(include_dir, from, "requirement/MUST", false),
            Some(PathBuf::from("_includes/requirement/MUST"))
        );
        assert_eq!(
            include_path(include_dir, from, "tables/env.md", true),
            Some(PathBuf::from("docs/python/tables/env.md"))
        );
    }
}
