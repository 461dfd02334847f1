//! Requirement annotation linting for Markdown guideline corpora.
//!
//! Guideline documents tag sentences with templated annotations such as
//! `{% include requirement/MUST id="general-client-sync" %}`. This crate
//! scans a directory of such documents and checks that every annotation has a
//! valid keyword and a unique, well-formed ID, and that cross-references and
//! include directives resolve.

pub mod domain;
pub use domain::{
    Check, Config, Corpus, Keyword, Report, RequirementId, RequirementView, Rule, Severity,
    Violation,
};

/// Filesystem access: directory walking and Markdown scanning.
pub mod storage;
pub use storage::{Directory, LoadError};
