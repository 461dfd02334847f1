use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{
    lint::{Level, Rule},
    Keyword,
};

/// Configuration for linting a guideline corpus.
///
/// Stored as TOML in `.guidelint/config.toml` under the corpus root. Every
/// field has a default, so an empty file (or no file) is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// The keywords annotations are allowed to use.
    ///
    /// A keyword outside this list is reported even if it is one of the five
    /// known tokens, so a corpus can opt out of e.g. `MAY`.
    keywords: Vec<Keyword>,

    /// The ID prefixes that are allowed.
    ///
    /// This is the first segment of the ID, for example `general` or
    /// `python`. If this is empty, all prefixes are allowed.
    allowed_prefixes: Vec<String>,

    /// Directory (relative to the root) that `{% include %}` resolves against.
    include_dir: PathBuf,

    /// The include path segment that marks a requirement annotation.
    ///
    /// With the default `requirement`, `{% include requirement/MUST ... %}`
    /// is an annotation with keyword `MUST`.
    requirement_include: String,

    /// How heading anchors are generated.
    heading_ids: HeadingIds,

    /// File extensions that are scanned as documents.
    extensions: Vec<String>,

    /// Directory names that are never entered.
    exclude: Vec<String>,

    /// Regular expressions; links whose raw target matches any of them are
    /// not checked.
    ignore_links: Vec<String>,

    /// Per-rule level overrides.
    rules: BTreeMap<Rule, Level>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            allowed_prefixes: Vec::new(),
            include_dir: default_include_dir(),
            requirement_include: default_requirement_include(),
            heading_ids: HeadingIds::default(),
            extensions: default_extensions(),
            exclude: default_exclude(),
            ignore_links: Vec::new(),
            rules: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, if the TOML content is
    /// invalid, or if an `ignore_links` pattern is not a valid regular
    /// expression.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))?;
        config
            .ignore_link_patterns()
            .map_err(|e| format!("Invalid ignore_links pattern: {e}"))?;
        Ok(config)
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Serializes the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))
    }

    /// Returns the enabled keywords.
    #[must_use]
    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    /// Checks if annotations may use the keyword.
    #[must_use]
    pub fn is_keyword_enabled(&self, keyword: Keyword) -> bool {
        self.keywords.contains(&keyword)
    }

    /// Returns the allowed ID prefixes, if configured.
    #[must_use]
    pub fn allowed_prefixes(&self) -> &[String] {
        &self.allowed_prefixes
    }

    /// Checks if an ID prefix is allowed by the configuration.
    ///
    /// If `allowed_prefixes` is empty, all prefixes are allowed.
    #[must_use]
    pub fn is_prefix_allowed(&self, prefix: &str) -> bool {
        self.allowed_prefixes.is_empty() || self.allowed_prefixes.iter().any(|p| p == prefix)
    }

    /// Adds a prefix to the allowed prefixes list.
    ///
    /// Prefixes are normalized to lowercase. Returns `true` if the prefix was
    /// added, `false` if it already existed.
    pub fn add_prefix(&mut self, prefix: &str) -> bool {
        let prefix = prefix.to_lowercase();
        if self.allowed_prefixes.contains(&prefix) {
            false
        } else {
            self.allowed_prefixes.push(prefix);
            true
        }
    }

    /// Returns the include directory, relative to the corpus root.
    #[must_use]
    pub fn include_dir(&self) -> &Path {
        &self.include_dir
    }

    /// Returns the include path segment that marks requirement annotations.
    #[must_use]
    pub fn requirement_include(&self) -> &str {
        &self.requirement_include
    }

    /// Returns the heading ID scheme.
    #[must_use]
    pub const fn heading_ids(&self) -> HeadingIds {
        self.heading_ids
    }

    /// Returns the document file extensions.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Checks if a file with this extension is a document.
    #[must_use]
    pub fn is_document_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }

    /// Checks if a directory with this name should be skipped.
    #[must_use]
    pub fn is_excluded(&self, dir_name: &str) -> bool {
        self.exclude.iter().any(|e| e == dir_name)
    }

    /// Compiles the `ignore_links` patterns.
    ///
    /// # Errors
    ///
    /// Returns the first pattern that fails to compile.
    pub fn ignore_link_patterns(&self) -> Result<Vec<Regex>, regex::Error> {
        self.ignore_links.iter().map(|p| Regex::new(p)).collect()
    }

    /// Returns the level a rule runs at, taking overrides into account.
    #[must_use]
    pub fn level(&self, rule: Rule) -> Level {
        self.rules
            .get(&rule)
            .copied()
            .unwrap_or_else(|| rule.default_level())
    }

    /// Overrides the level of a rule.
    pub fn set_level(&mut self, rule: Rule, level: Level) {
        self.rules.insert(rule, level);
    }
}

/// The scheme the site generator uses to turn heading text into anchors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingIds {
    /// kramdown, the Jekyll default: ASCII letters, digits, spaces and `-`
    /// are kept, after dropping everything before the first letter.
    #[default]
    Kramdown,
    /// GitHub Flavored Markdown: punctuation is dropped, letters of any script
    /// and `_` are kept.
    Gfm,
}

fn default_keywords() -> Vec<Keyword> {
    Keyword::ALL.to_vec()
}

fn default_include_dir() -> PathBuf {
    PathBuf::from("_includes")
}

fn default_requirement_include() -> String {
    "requirement".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

fn default_exclude() -> Vec<String> {
    ["_site", ".git", "node_modules", "vendor", ".jekyll-cache"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_keywords")]
        keywords: Vec<Keyword>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        allowed_prefixes: Vec<String>,

        #[serde(default = "default_include_dir")]
        include_dir: PathBuf,

        #[serde(default = "default_requirement_include")]
        requirement_include: String,

        #[serde(default)]
        heading_ids: HeadingIds,

        #[serde(default = "default_extensions")]
        extensions: Vec<String>,

        #[serde(default = "default_exclude")]
        exclude: Vec<String>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        ignore_links: Vec<String>,

        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        rules: BTreeMap<Rule, Level>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                keywords,
                allowed_prefixes,
                include_dir,
                requirement_include,
                heading_ids,
                extensions,
                exclude,
                ignore_links,
                rules,
            } => Self {
                keywords,
                allowed_prefixes,
                include_dir,
                requirement_include,
                heading_ids,
                extensions,
                exclude,
                ignore_links,
                rules,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            keywords: config.keywords,
            allowed_prefixes: config.allowed_prefixes,
            include_dir: config.include_dir,
            requirement_include: config.requirement_include,
            heading_ids: config.heading_ids,
            extensions: config.extensions,
            exclude: config.exclude,
            ignore_links: config.ignore_links,
            rules: config.rules,
        }
    }
}
