use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// The normative keyword of a requirement annotation.
///
/// Keywords are written as the final segment of the include path, e.g. the
/// `MUST` in `{% include requirement/MUST id="..." %}`. Parsing is strict:
/// only the exact uppercase token is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Keyword {
    /// An absolute requirement.
    #[serde(rename = "MUST")]
    Must,
    /// An absolute prohibition.
    #[serde(rename = "MUSTNOT")]
    MustNot,
    /// A recommendation that may be ignored with good reason.
    #[serde(rename = "SHOULD")]
    Should,
    /// A discouraged practice that may be acceptable with good reason.
    #[serde(rename = "SHOULDNOT")]
    ShouldNot,
    /// Truly optional behaviour.
    #[serde(rename = "MAY")]
    May,
}

/// How binding a keyword is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    /// `MUST` and `MUSTNOT`.
    Mandatory,
    /// `SHOULD` and `SHOULDNOT`.
    Recommended,
    /// `MAY`.
    Optional,
}

impl Keyword {
    /// Every keyword, strongest first.
    pub const ALL: [Self; 5] = [
        Self::Must,
        Self::MustNot,
        Self::Should,
        Self::ShouldNot,
        Self::May,
    ];

    /// The token as it appears in annotations.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Must => "MUST",
            Self::MustNot => "MUSTNOT",
            Self::Should => "SHOULD",
            Self::ShouldNot => "SHOULDNOT",
            Self::May => "MAY",
        }
    }

    /// Returns how binding the keyword is.
    #[must_use]
    pub const fn strength(self) -> Strength {
        match self {
            Self::Must | Self::MustNot => Strength::Mandatory,
            Self::Should | Self::ShouldNot => Strength::Recommended,
            Self::May => Strength::Optional,
        }
    }

    /// Whether the keyword forbids rather than requires.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self, Self::MustNot | Self::ShouldNot)
    }

    /// Suggests the keyword an author most likely meant.
    ///
    /// Matches case-insensitively and ignores separators, so `must`,
    /// `MUST_NOT`, `Must-Not` and `SHOULD NOT` all produce a suggestion.
    /// Returns `None` if nothing is close enough.
    ///
    /// ```
    /// use guidelint::Keyword;
    ///
    /// assert_eq!(Keyword::suggest("must_not"), Some(Keyword::MustNot));
    /// assert_eq!(Keyword::suggest("SHALL"), None);
    /// ```
    #[must_use]
    pub fn suggest(raw: &str) -> Option<Self> {
        let squashed: String = raw
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' ' | '\''))
            .map(|c| c.to_ascii_uppercase())
            .collect();

        match squashed.as_str() {
            // contractions lose the 'O' once the apostrophe is gone
            "MUSTNT" => Some(Self::MustNot),
            "SHOULDNT" => Some(Self::ShouldNot),
            other => Self::ALL.into_iter().find(|k| k.as_str() == other),
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not exactly one of the keyword tokens.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid keyword '{0}': expected one of MUST, MUSTNOT, SHOULD, SHOULDNOT, MAY")]
pub struct ParseError(String);

impl ParseError {
    /// The rejected input.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.0
    }
}

impl FromStr for Keyword {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ParseError(s.to_string()))
    }
}
