//! A filesystem backed guideline corpus.
//!
//! The [`Directory`] walks a documentation tree, scans every document and
//! include file, and assembles the filesystem agnostic [`Corpus`] that the
//! linter runs over.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::instrument;
use walkdir::{DirEntry, WalkDir};

use crate::{
    domain::{lint, Check, Config, Corpus, Document, Include, LintError, Report},
    storage::markdown::parse_document,
};

/// Name of the directory under the root that holds the tool's own files.
pub const CONFIG_DIR: &str = ".guidelint";

/// A guideline corpus loaded from disk.
#[derive(Debug)]
pub struct Directory {
    /// The root of the documentation tree.
    root: PathBuf,
    config: Config,
    corpus: Corpus,
}

/// What a file under the root turned out to be.
enum Loaded {
    Document(Document),
    Include { path: PathBuf, includes: Vec<Include> },
    Other(PathBuf),
}

/// A file found while walking, relative to the root.
#[derive(Debug)]
enum Found {
    Document(PathBuf),
    Include(PathBuf),
    Other(PathBuf),
}

impl Directory {
    /// Loads the corpus rooted at `root`.
    ///
    /// The configuration is read from `.guidelint/config.toml` if it exists,
    /// otherwise defaults are used.
    ///
    /// # Errors
    ///
    /// This method can fail if:
    ///
    /// - `root` is not a directory
    /// - the configuration file exists but cannot be read or parsed
    /// - any document or include file cannot be read
    #[instrument(level = "debug", skip_all, fields(root = %root.as_ref().display()))]
    pub fn new(root: impl AsRef<Path>) -> Result<Self, LoadError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(LoadError::NotADirectory(root));
        }

        let config = load_config(&root)?;
        let (found, mut unreadable) = collect_files(&root, &config);

        let (loaded, failed): (Vec<_>, Vec<_>) = found
            .par_iter()
            .map(|file| load_file(&root, file, &config))
            .partition(Result::is_ok);

        unreadable.extend(failed.into_iter().filter_map(Result::err));
        if !unreadable.is_empty() {
            unreadable.sort();
            return Err(LoadError::Unreadable(unreadable));
        }

        let mut corpus = Corpus::new(config.include_dir());
        for file in loaded.into_iter().filter_map(Result::ok) {
            match file {
                Loaded::Document(document) => corpus.insert_document(document),
                Loaded::Include { path, includes } => corpus.insert_include_file(path, includes),
                Loaded::Other(path) => corpus.insert_site_file(path),
            }
        }

        tracing::info!(
            documents = corpus.len(),
            "loaded corpus from {}",
            root.display()
        );

        Ok(Self {
            root,
            config,
            corpus,
        })
    }

    /// Path of the configuration file for a corpus rooted at `root`.
    #[must_use]
    pub fn config_path(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join("config.toml")
    }

    /// The root of the documentation tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The effective configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The scanned corpus.
    #[must_use]
    pub const fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Runs the given checks over the corpus. An empty slice runs them all.
    ///
    /// # Errors
    ///
    /// Fails if an `ignore_links` pattern in the configuration is invalid.
    pub fn lint(&self, checks: &[Check]) -> Result<Report, LintError> {
        lint(&self.corpus, &self.config, checks)
    }
}

/// An error that prevents a corpus from being loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The root does not exist or is not a directory.
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// The configuration file is present but invalid.
    #[error("{0}")]
    Config(String),

    /// Some files could not be read.
    #[error("Unreadable files: {}", DisplayPaths(.0))]
    Unreadable(Vec<PathBuf>),
}

struct DisplayPaths<'a>(&'a [PathBuf]);

impl fmt::Display for DisplayPaths<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, path) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", path.display())?;
        }
        Ok(())
    }
}

fn load_config(root: &Path) -> Result<Config, LoadError> {
    let path = Directory::config_path(root);
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    Config::load(&path).map_err(LoadError::Config)
}

fn is_skipped_dir(entry: &DirEntry, config: &Config) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name == CONFIG_DIR || config.is_excluded(name))
}

/// Walks the tree, classifying every file. Entries the walk cannot read are
/// returned separately.
fn collect_files(root: &Path, config: &Config) -> (Vec<Found>, Vec<PathBuf>) {
    let mut found = Vec::new();
    let mut unreadable = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            let skipped = is_skipped_dir(entry, config);
            if skipped {
                tracing::debug!("Skipping directory {}", entry.path().display());
            }
            !skipped
        })
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::debug!("Failed to walk: {error}");
                if let Some(path) = error.path() {
                    unreadable.push(path.strip_prefix(root).unwrap_or(path).to_path_buf());
                }
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root).map(Path::to_path_buf) else {
            continue;
        };

        let is_document = relative
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| config.is_document_extension(e));

        found.push(if relative.starts_with(config.include_dir()) {
            Found::Include(relative)
        } else if is_document {
            Found::Document(relative)
        } else {
            Found::Other(relative)
        });
    }

    (found, unreadable)
}

fn load_file(root: &Path, file: &Found, config: &Config) -> Result<Loaded, PathBuf> {
    match file {
        Found::Document(path) => {
            let text = fs::read_to_string(root.join(path)).map_err(|error| {
                tracing::debug!("Failed to read {}: {error}", path.display());
                path.clone()
            })?;
            Ok(Loaded::Document(parse_document(path.clone(), &text, config)))
        }
        Found::Include(path) => {
            let bytes = fs::read(root.join(path)).map_err(|error| {
                tracing::debug!("Failed to read {}: {error}", path.display());
                path.clone()
            })?;
            // binary assets in the include directory can't include anything
            let includes = match String::from_utf8(bytes) {
                Ok(text) => parse_document(path.clone(), &text, config).includes,
                Err(_) => Vec::new(),
            };
            Ok(Loaded::Include {
                path: path.clone(),
                includes,
            })
        }
        Found::Other(path) => Ok(Loaded::Other(path.clone())),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::domain::Rule;

    fn write(root: &Path, path: &str, content: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn setup_corpus() -> TempDir {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let root = tmp.path();

        write(root, "_includes/requirement/MUST", "<span>MUST</span>");
        write(root, "_includes/requirement/SHOULD", "<span>SHOULD</span>");
        write(
            root,
            "docs/general/design.md",
            "---\ntitle: Design\n---\n# Authentication\n\n{% include requirement/MUST id=\"general-auth-token\" %} support token credentials.\n",
        );
        write(
            root,
            "docs/python/design.md",
            "{% include requirement/SHOULD id=\"python-auth-env\" %} read credentials from the environment, see [tokens](../general/design.md#general-auth-token).\n",
        );
        write(root, "images/logo.png", "not really a png");
        write(root, "_site/docs/general/design.md", "{% include requirement/BOGUS %}");

        tmp
    }

    #[test]
    fn loads_documents_and_site_files() {
        let tmp = setup_corpus();
        let directory = Directory::new(tmp.path()).unwrap();

        assert_eq!(directory.corpus().len(), 2);
        assert_eq!(directory.corpus().requirements().count(), 2);
        assert!(
            directory
                .corpus()
                .document(Path::new("docs/general/design.md"))
                .is_some()
        );
        assert_eq!(directory.corpus().include_files().count(), 2);
    }

    #[test]
    fn excluded_directories_are_skipped() {
        let tmp = setup_corpus();
        let directory = Directory::new(tmp.path()).unwrap();

        assert!(
            directory
                .corpus()
                .documents()
                .all(|document| !document.path().starts_with("_site"))
        );
    }

    #[test]
    fn clean_corpus_lints_clean() {
        let tmp = setup_corpus();
        let report = Directory::new(tmp.path()).unwrap().lint(&[]).unwrap();

        assert!(report.is_clean(true), "{:?}", report.violations);
        assert_eq!(report.documents, 2);
        assert_eq!(report.requirements, 2);
    }

    #[test]
    fn heading_anchors_resolve_across_heading_styles() {
        let tmp = setup_corpus();
        write(
            tmp.path(),
            "docs/python/usage.md",
            "See [sync]({% link docs/general/design.md %}#general-auth-token), \
             <a href=\"{% link docs/general/design.md %}#general-auth-token\">auth</a>.\n\n\
             ## Options ##\n\nSee [options](#options).\n\n\
             Retries\n=======\n\nSee [retries](#retries).\n",
        );

        let report = Directory::new(tmp.path()).unwrap().lint(&[]).unwrap();

        assert!(report.is_clean(true), "{:?}", report.violations);
    }

    #[test]
    fn heading_id_scheme_comes_from_config() {
        let tmp = setup_corpus();
        write(
            tmp.path(),
            ".guidelint/config.toml",
            "_version = \"1\"\nheading_ids = \"gfm\"\n",
        );
        write(
            tmp.path(),
            "docs/python/naming.md",
            "## 2. snake_case names\n\nSee [names](#2-snake_case-names).\n",
        );

        let report = Directory::new(tmp.path()).unwrap().lint(&[]).unwrap();

        assert!(report.is_clean(true), "{:?}", report.violations);
    }

    #[test]
    fn violations_carry_relative_paths() {
        let tmp = setup_corpus();
        write(
            tmp.path(),
            "docs/broken.md",
            "{% include requirement/MAY id=\"general-auth-token\" %} duplicate.\n",
        );

        let report = Directory::new(tmp.path()).unwrap().lint(&[]).unwrap();
        let rules: Vec<_> = report.violations.iter().map(|v| v.rule).collect();

        assert!(rules.contains(&Rule::DuplicateId));
        assert!(rules.contains(&Rule::MissingInclude));
        assert!(
            report
                .violations
                .iter()
                .all(|v| v.location.path.is_relative())
        );
    }

    #[test]
    fn missing_config_uses_defaults() {
        let tmp = setup_corpus();
        let directory = Directory::new(tmp.path()).unwrap();
        assert_eq!(directory.config(), &Config::default());
    }

    #[test]
    fn config_is_loaded() {
        let tmp = setup_corpus();
        write(
            tmp.path(),
            ".guidelint/config.toml",
            "_version = \"1\"\nallowed_prefixes = [\"general\"]\n",
        );

        let directory = Directory::new(tmp.path()).unwrap();
        assert!(directory.config().is_prefix_allowed("general"));
        assert!(!directory.config().is_prefix_allowed("python"));
    }

    #[test]
    fn malformed_config_is_an_error() {
        let tmp = setup_corpus();
        write(tmp.path(), ".guidelint/config.toml", "_version = \"1\"\nkeywords = 3\n");

        let error = Directory::new(tmp.path()).unwrap_err();
        assert!(matches!(error, LoadError::Config(_)));
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let error = Directory::new(tmp.path().join("nope")).unwrap_err();
        assert!(matches!(error, LoadError::NotADirectory(_)));
    }

    #[test]
    fn non_utf8_document_is_unreadable() {
        let tmp = setup_corpus();
        fs::write(tmp.path().join("docs/latin1.md"), b"fo\xf6").unwrap();

        let error = Directory::new(tmp.path()).unwrap_err();
        match error {
            LoadError::Unreadable(paths) => {
                assert_eq!(paths, vec![PathBuf::from("docs/latin1.md")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn binary_include_files_are_tolerated() {
        let tmp = setup_corpus();
        fs::write(tmp.path().join("_includes/icon.bin"), b"\xff\xfe").unwrap();

        let directory = Directory::new(tmp.path()).unwrap();
        assert_eq!(directory.corpus().include_files().count(), 3);
    }
}
