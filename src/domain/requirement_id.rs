use std::{fmt, ops::Deref, str::FromStr};

use non_empty_string::NonEmptyString;
use serde::{Serialize, Serializer};

/// The identifier of a requirement annotation.
///
/// Format: lowercase, dash-separated segments, e.g. `general-client-sync` or
/// `python-namespaces-async`.
///
/// - only ASCII lowercase letters, digits and `-`
/// - the first character is a letter
/// - no trailing `-` and no empty segments (`--`)
///
/// The first segment is the *prefix*, conventionally the language or area the
/// guideline belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequirementId(NonEmptyString);

impl RequirementId {
    /// Creates a new `RequirementId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] describing the first rule the string breaks.
    pub fn new(s: String) -> Result<Self, Error> {
        let Ok(non_empty) = NonEmptyString::new(s) else {
            return Err(Error::Empty);
        };

        let raw = non_empty.as_str();

        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(Error::Character(raw.to_string(), bad));
        }

        if !raw.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(Error::Start(raw.to_string()));
        }

        if raw.ends_with('-') || raw.contains("--") {
            return Err(Error::EmptySegment(raw.to_string()));
        }

        Ok(Self(non_empty))
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the first segment of the identifier.
    ///
    /// ```
    /// use guidelint::RequirementId;
    ///
    /// let id: RequirementId = "python-client-naming".parse().unwrap();
    /// assert_eq!(id.prefix(), "python");
    /// ```
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.as_str()
            .split_once('-')
            .map_or(self.as_str(), |(prefix, _)| prefix)
    }
}

/// Errors that can occur when parsing a [`RequirementId`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The identifier is empty.
    #[error("Invalid requirement ID: cannot be empty")]
    Empty,

    /// The identifier contains a character outside `[a-z0-9-]`.
    #[error("Invalid requirement ID '{0}': unexpected character '{1}' (allowed: a-z, 0-9, '-')")]
    Character(String, char),

    /// The identifier does not start with a letter.
    #[error("Invalid requirement ID '{0}': must start with a lowercase letter")]
    Start(String),

    /// The identifier ends with `-` or contains `--`.
    #[error("Invalid requirement ID '{0}': contains an empty segment")]
    EmptySegment(String),
}

impl TryFrom<String> for RequirementId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for RequirementId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl FromStr for RequirementId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl AsRef<str> for RequirementId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for RequirementId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl fmt::Display for RequirementId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RequirementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
