//! Domain models for requirement linting.
//!
//! This module contains the core types: requirement keywords and IDs, the
//! scanned document model, the corpus index, configuration and lint rules.
//! Nothing in here touches the filesystem except [`Config::load`] and
//! [`Config::save`].

mod config;
pub use config::{Config, HeadingIds};

/// In-memory index over scanned documents.
pub mod corpus;
pub use corpus::{Corpus, IncludeCycle, PageResolution};

/// Scanned document model.
pub mod document;
pub use document::{
    Anchor, AnchorKind, Annotation, Document, FrontMatter, Include, Link, LinkTarget, Location,
    ScanDiagnostic,
};

/// Requirement keyword types and parsing.
pub mod keyword;
pub use keyword::{Keyword, Strength};

pub mod lint;
pub use lint::{lint, Check, Level, LintError, Report, Rule, Severity, Violation};

pub mod paths;

/// Requirement identifier types and parsing.
pub mod requirement_id;
pub use requirement_id::{Error as RequirementIdError, RequirementId};

mod requirement_view;
pub use requirement_view::RequirementView;
