//! Lint rules over a [`Corpus`].
//!
//! Rules are grouped into [`Check`]s so callers can run a subset. Every rule
//! has a stable kebab-case code and a default level that
//! [`Config`](crate::Config) can override.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{Config, Corpus, Location};

mod ids;
mod includes;
mod keywords;
mod references;
mod structure;

/// A group of related rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Check {
    /// Annotation keywords are known and enabled.
    Keywords,
    /// Annotation IDs are present, well formed, allowed and unique.
    Ids,
    /// Links resolve to existing pages and anchors.
    References,
    /// Include directives resolve and do not recurse.
    Includes,
    /// Tags and front matter are well formed and annotations carry text.
    Structure,
}

impl Check {
    /// Every check, in the order they run.
    pub const ALL: [Self; 5] = [
        Self::Keywords,
        Self::Ids,
        Self::References,
        Self::Includes,
        Self::Structure,
    ];
}

/// A single lint rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    /// The keyword is not one of the known tokens.
    UnknownKeyword,
    /// The keyword is known but not enabled in the configuration.
    DisallowedKeyword,
    /// The annotation has no `id` parameter.
    MissingId,
    /// The `id` parameter is not a valid requirement ID.
    MalformedId,
    /// The ID is already defined elsewhere in the corpus.
    DuplicateId,
    /// The ID prefix is not in `allowed_prefixes`.
    UnknownPrefix,
    /// A link fragment does not match any anchor on the target page.
    BrokenReference,
    /// A link points at a page that does not exist.
    MissingPage,
    /// A requirement ID is also generated as a heading anchor on the same
    /// page.
    AnchorCollision,
    /// An include directive names a file that does not exist.
    MissingInclude,
    /// Include files include each other.
    IncludeCycle,
    /// A `{%` tag is not closed on the same line.
    UnterminatedTag,
    /// The front matter block is not valid YAML.
    InvalidFrontMatter,
    /// An annotation is not followed by any guideline text.
    EmptyRequirement,
}

impl Rule {
    /// Every rule.
    pub const ALL: [Self; 14] = [
        Self::UnknownKeyword,
        Self::DisallowedKeyword,
        Self::MissingId,
        Self::MalformedId,
        Self::DuplicateId,
        Self::UnknownPrefix,
        Self::BrokenReference,
        Self::MissingPage,
        Self::AnchorCollision,
        Self::MissingInclude,
        Self::IncludeCycle,
        Self::UnterminatedTag,
        Self::InvalidFrontMatter,
        Self::EmptyRequirement,
    ];

    /// The stable code used in output and configuration.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::UnknownKeyword => "unknown-keyword",
            Self::DisallowedKeyword => "disallowed-keyword",
            Self::MissingId => "missing-id",
            Self::MalformedId => "malformed-id",
            Self::DuplicateId => "duplicate-id",
            Self::UnknownPrefix => "unknown-prefix",
            Self::BrokenReference => "broken-reference",
            Self::MissingPage => "missing-page",
            Self::AnchorCollision => "anchor-collision",
            Self::MissingInclude => "missing-include",
            Self::IncludeCycle => "include-cycle",
            Self::UnterminatedTag => "unterminated-tag",
            Self::InvalidFrontMatter => "invalid-front-matter",
            Self::EmptyRequirement => "empty-requirement",
        }
    }

    /// The check this rule belongs to.
    #[must_use]
    pub const fn check(self) -> Check {
        match self {
            Self::UnknownKeyword | Self::DisallowedKeyword => Check::Keywords,
            Self::MissingId | Self::MalformedId | Self::DuplicateId | Self::UnknownPrefix => {
                Check::Ids
            }
            Self::BrokenReference | Self::MissingPage | Self::AnchorCollision => {
                Check::References
            }
            Self::MissingInclude | Self::IncludeCycle => Check::Includes,
            Self::UnterminatedTag | Self::InvalidFrontMatter | Self::EmptyRequirement => {
                Check::Structure
            }
        }
    }

    /// The level the rule runs at unless configured otherwise.
    #[must_use]
    pub const fn default_level(self) -> Level {
        match self {
            Self::UnknownPrefix
            | Self::AnchorCollision
            | Self::InvalidFrontMatter
            | Self::EmptyRequirement => Level::Warning,
            _ => Level::Error,
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// The configured level of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Violations are errors.
    Error,
    /// Violations are warnings.
    Warning,
    /// The rule does not run.
    Off,
}

/// The severity of a reported violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fails the check.
    Error,
    /// Reported, but only fails the check when warnings are denied.
    Warning,
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// The rule that fired.
    pub rule: Rule,
    /// The severity after configuration overrides.
    pub severity: Severity,
    /// Where the problem is.
    pub location: Location,
    /// What is wrong.
    pub message: String,
    /// How to fix it, when there is something specific to say.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Errors that prevent linting from running.
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    /// An `ignore_links` pattern does not compile.
    #[error("invalid ignore_links pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// The outcome of a lint run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    /// The checks that ran.
    pub checks: Vec<Check>,
    /// Violations, sorted by location and rule.
    pub violations: Vec<Violation>,
    /// Number of documents scanned.
    pub documents: usize,
    /// Number of annotations with a well-formed ID.
    pub requirements: usize,
}

impl Report {
    /// Iterates over the violations with error severity.
    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
    }

    /// Iterates over the violations with warning severity.
    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Warning)
    }

    /// Returns `true` if nothing fails the run.
    #[must_use]
    pub fn is_clean(&self, deny_warnings: bool) -> bool {
        self.errors().next().is_none() && (!deny_warnings || self.warnings().next().is_none())
    }

    /// Counts violations per rule.
    #[must_use]
    pub fn by_rule(&self) -> BTreeMap<Rule, usize> {
        let mut counts = BTreeMap::new();
        for violation in &self.violations {
            *counts.entry(violation.rule).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the violations found by one check.
    pub fn for_check(&self, check: Check) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(move |v| v.rule.check() == check)
    }
}

/// Collects violations, applying the configured rule levels.
pub(crate) struct Sink<'a> {
    config: &'a Config,
    violations: Vec<Violation>,
}

impl<'a> Sink<'a> {
    const fn new(config: &'a Config) -> Self {
        Self {
            config,
            violations: Vec::new(),
        }
    }

    /// Records a violation unless the rule is switched off.
    pub(crate) fn emit(
        &mut self,
        rule: Rule,
        location: &Location,
        message: impl Into<String>,
        hint: Option<String>,
    ) {
        let severity = match self.config.level(rule) {
            Level::Off => return,
            Level::Error => Severity::Error,
            Level::Warning => Severity::Warning,
        };
        self.violations.push(Violation {
            rule,
            severity,
            location: location.clone(),
            message: message.into(),
            hint,
        });
    }
}

/// Runs the given checks over the corpus.
///
/// An empty `checks` slice runs every check.
///
/// # Errors
///
/// Returns an error if the configuration cannot be compiled into matchers.
#[instrument(level = "debug", skip(corpus, config))]
pub fn lint(corpus: &Corpus, config: &Config, checks: &[Check]) -> Result<Report, LintError> {
    let checks: Vec<Check> = if checks.is_empty() {
        Check::ALL.to_vec()
    } else {
        let mut checks = checks.to_vec();
        checks.sort();
        checks.dedup();
        checks
    };

    let mut sink = Sink::new(config);
    for check in &checks {
        match check {
            Check::Keywords => keywords::check(corpus, config, &mut sink),
            Check::Ids => ids::check(corpus, config, &mut sink),
            Check::References => references::check(corpus, config, &mut sink)?,
            Check::Includes => includes::check(corpus, config, &mut sink),
            Check::Structure => structure::check(corpus, &mut sink),
        }
    }

    let mut violations = sink.violations;
    violations.sort_by(|a, b| {
        a.location
            .cmp(&b.location)
            .then(a.rule.cmp(&b.rule))
            .then(a.message.cmp(&b.message))
    });

    tracing::debug!(count = violations.len(), "lint finished");

    Ok(Report {
        checks,
        violations,
        documents: corpus.len(),
        requirements: corpus.requirements().count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Annotation, Document};

    fn corpus_with(annotations: Vec<Annotation>) -> Corpus {
        let mut corpus = Corpus::new("_includes");
        for keyword in ["MUST", "SHOULD"] {
            corpus.insert_include_file(format!("_includes/requirement/{keyword}"), Vec::new());
        }
        let mut document = Document::new("doc.md");
        document.annotations = annotations;
        corpus.insert_document(document);
        corpus
    }

    fn annotation(line: usize, keyword: &str, id: Option<&str>, text: &str) -> Annotation {
        Annotation {
            keyword: keyword.to_string(),
            id: id.map(str::to_string),
            text: text.to_string(),
            location: Location::new("doc.md", line, 1),
        }
    }

    #[test]
    fn every_rule_belongs_to_a_check() {
        for rule in Rule::ALL {
            assert!(Check::ALL.contains(&rule.check()));
        }
    }

    #[test]
    fn rule_codes_match_serde_names() {
        for rule in Rule::ALL {
            let json = serde_json::to_string(&rule).unwrap();
            assert_eq!(json, format!("\"{}\"", rule.code()));
        }
    }

    #[test]
    fn clean_corpus_has_no_violations() {
        let corpus = corpus_with(vec![
            annotation(1, "MUST", Some("general-a"), "do a."),
            annotation(2, "SHOULD", Some("general-b"), "do b."),
        ]);
        let report = lint(&corpus, &Config::default(), &[]).unwrap();

        assert!(report.violations.is_empty(), "{:?}", report.violations);
        assert!(report.is_clean(true));
        assert_eq!(report.requirements, 2);
        assert_eq!(report.documents, 1);
        assert_eq!(report.checks, Check::ALL);
    }

    #[test]
    fn violations_are_sorted_by_location() {
        let corpus = corpus_with(vec![
            annotation(5, "MUST", None, "late."),
            annotation(2, "must", Some("general-a"), "early."),
        ]);
        let report = lint(&corpus, &Config::default(), &[]).unwrap();

        let lines: Vec<usize> = report.violations.iter().map(|v| v.location.line).collect();
        let mut sorted = lines.clone();
        sorted.sort_unstable();
        assert_eq!(lines, sorted);
        assert_eq!(
            report.by_rule().keys().copied().collect::<Vec<_>>(),
            [Rule::UnknownKeyword, Rule::MissingId]
        );
    }

    #[test]
    fn subset_of_checks() {
        let corpus = corpus_with(vec![annotation(1, "must", None, "")]);
        let report = lint(&corpus, &Config::default(), &[Check::Ids, Check::Ids]).unwrap();

        assert_eq!(report.checks, [Check::Ids]);
        assert_eq!(report.by_rule().into_keys().collect::<Vec<_>>(), [Rule::MissingId]);
    }

    #[test]
    fn levels_can_be_overridden() {
        let corpus = corpus_with(vec![annotation(1, "MUST", Some("general-a"), "")]);

        let report = lint(&corpus, &Config::default(), &[Check::Structure]).unwrap();
        assert_eq!(report.warnings().count(), 1);
        assert!(report.is_clean(false));
        assert!(!report.is_clean(true));

        let mut config = Config::default();
        config.set_level(Rule::EmptyRequirement, Level::Error);
        let report = lint(&corpus, &config, &[Check::Structure]).unwrap();
        assert_eq!(report.errors().count(), 1);
        assert!(!report.is_clean(false));

        config.set_level(Rule::EmptyRequirement, Level::Off);
        let report = lint(&corpus, &config, &[Check::Structure]).unwrap();
        assert!(report.violations.is_empty());
    }
}
