//! The scanned form of a single Markdown document.
//!
//! A [`Document`] is the syntax-level view of a page: which tags it contains,
//! where they are, and what they say. No checking happens here; deciding
//! whether a keyword or ID is acceptable is the job of
//! [`lint`](crate::domain::lint).

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::domain::{keyword, requirement_id, Keyword, RequirementId};

/// A position within the corpus.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    /// Document path, relative to the corpus root.
    pub path: PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column (in characters).
    pub column: usize,
}

impl Location {
    /// Creates a location.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            path: path.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path.display(), self.line, self.column)
    }
}

/// A requirement annotation as written, e.g.
/// `{% include requirement/MUST id="general-client-sync" %} provide ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// The keyword segment of the include path, exactly as written.
    pub keyword: String,
    /// The raw `id` parameter, if present.
    pub id: Option<String>,
    /// The guideline sentence that follows the tag.
    pub text: String,
    /// Where the tag starts.
    pub location: Location,
}

impl Annotation {
    /// Parses the keyword strictly.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyword is not exactly one of the known tokens.
    pub fn keyword(&self) -> Result<Keyword, keyword::ParseError> {
        self.keyword.parse()
    }

    /// Parses the `id` parameter, if there is one.
    #[must_use]
    pub fn requirement_id(&self) -> Option<Result<RequirementId, requirement_id::Error>> {
        self.id.as_deref().map(str::parse)
    }
}

/// An `{% include %}` or `{% include_relative %}` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    /// The included path, as written.
    pub target: String,
    /// `true` for `include_relative`, which resolves against the including
    /// document rather than the include directory.
    pub relative: bool,
    /// `key=value` parameters passed to the include.
    pub params: BTreeMap<String, String>,
    /// Where the tag starts.
    pub location: Location,
}

/// A hyperlink found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// The raw link destination.
    pub target: String,
    /// Where the link destination starts.
    pub location: Location,
}

/// A link destination, split into the parts that matter for resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget<'a> {
    /// `#anchor`, pointing into the same page.
    Fragment(&'a str),
    /// A relative or root-relative page, with an optional fragment.
    Page {
        /// Path part of the destination.
        page: &'a str,
        /// Fragment after `#`, if any.
        fragment: Option<&'a str>,
    },
    /// Anything that cannot be checked offline: absolute URLs, other schemes,
    /// and destinations built from template expressions.
    External,
}

impl Link {
    /// Classifies the destination.
    #[must_use]
    pub fn target(&self) -> LinkTarget<'_> {
        classify(&self.target)
    }
}

fn classify(raw: &str) -> LinkTarget<'_> {
    let raw = raw.trim();
    if raw.is_empty() || raw.contains("{{") || raw.contains("{%") || raw.starts_with("//") {
        return LinkTarget::External;
    }

    // "scheme:" before any '/', '?' or '#'
    let scheme_end = raw.find(|c: char| matches!(c, ':' | '/' | '?' | '#'));
    if let Some(idx) = scheme_end {
        if raw[idx..].starts_with(':') && idx > 0 {
            return LinkTarget::External;
        }
    }

    let (before_fragment, fragment) = match raw.split_once('#') {
        Some((before, fragment)) => (before, Some(fragment)),
        None => (raw, None),
    };
    let page = before_fragment
        .split_once('?')
        .map_or(before_fragment, |(page, _)| page);

    match (page.is_empty(), fragment) {
        (true, Some(fragment)) => LinkTarget::Fragment(fragment),
        (true, None) => LinkTarget::External,
        (false, fragment) => LinkTarget::Page {
            page,
            fragment: fragment.filter(|f| !f.is_empty()),
        },
    }
}

/// Where an anchor comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorKind {
    /// Generated from heading text.
    Heading,
    /// Declared explicitly with `{#id}` or an HTML `id`/`name` attribute.
    Explicit,
    /// The ID of a requirement annotation.
    Requirement,
}

/// An HTML fragment identifier the rendered page exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// The fragment name.
    pub name: String,
    /// Where the anchor comes from.
    pub kind: AnchorKind,
    /// Where the anchor is declared.
    pub location: Location,
}

/// Jekyll front matter.
///
/// Only the keys the linter uses are typed; everything else is kept in
/// `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    /// Page title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Output URL of the page, used to resolve links between pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    /// Site folder the page is filed under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Every other key.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// A problem found while scanning that prevents part of the document from
/// being understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanDiagnostic {
    /// A `{%` with no matching `%}` on the same line.
    UnterminatedTag(Location),
    /// The front matter block is not valid YAML.
    FrontMatter {
        /// Start of the front matter block.
        location: Location,
        /// Parser message.
        message: String,
    },
}

/// A scanned Markdown document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Path relative to the corpus root.
    pub path: PathBuf,
    /// Parsed front matter, if the document has any and it is valid.
    pub front_matter: Option<FrontMatter>,
    /// Requirement annotations, in document order.
    pub annotations: Vec<Annotation>,
    /// Non-requirement include directives, in document order.
    pub includes: Vec<Include>,
    /// Hyperlinks, in document order.
    pub links: Vec<Link>,
    /// Fragment identifiers the page exposes.
    pub anchors: Vec<Anchor>,
    /// Scanning problems.
    pub diagnostics: Vec<ScanDiagnostic>,
}

impl Document {
    /// Creates an empty document at the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// The document path, relative to the corpus root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The permalink declared in front matter, without a leading `/`.
    #[must_use]
    pub fn permalink(&self) -> Option<&str> {
        self.front_matter
            .as_ref()?
            .permalink
            .as_deref()
            .map(|p| p.trim_start_matches('/'))
            .filter(|p| !p.is_empty())
    }

    /// Returns `true` if the rendered page exposes this fragment.
    #[must_use]
    pub fn has_anchor(&self, name: &str) -> bool {
        self.anchors.iter().any(|anchor| anchor.name == name)
    }

    /// Returns the anchors of the given kind.
    pub fn anchors_of(&self, kind: AnchorKind) -> impl Iterator<Item = &Anchor> {
        self.anchors.iter().filter(move |anchor| anchor.kind == kind)
    }
}
