use serde::{Serialize, Serializer, ser::SerializeStruct};

use crate::domain::{Annotation, Document, Keyword, Location, RequirementId};

/// A borrowed view of a requirement with a well-formed ID.
///
/// Holds references into the [`Corpus`](crate::Corpus) so listing and
/// reporting never clone document content.
#[derive(Debug, Clone)]
pub struct RequirementView<'a> {
    /// The parsed requirement ID.
    pub id: RequirementId,
    /// The annotation as written.
    pub annotation: &'a Annotation,
    /// The document the annotation appears in.
    pub document: &'a Document,
}

impl RequirementView<'_> {
    /// The keyword, if it is one of the known tokens.
    #[must_use]
    pub fn keyword(&self) -> Option<Keyword> {
        self.annotation.keyword().ok()
    }

    /// Where the annotation is.
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.annotation.location
    }

    /// The guideline sentence.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.annotation.text
    }

    /// The title of the page the requirement is on, if it declares one.
    #[must_use]
    pub fn page_title(&self) -> Option<&str> {
        self.document.front_matter.as_ref()?.title.as_deref()
    }
}

impl Serialize for RequirementView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Requirement", 5)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("keyword", &self.annotation.keyword)?;
        state.serialize_field("strength", &self.keyword().map(Keyword::strength))?;
        state.serialize_field("location", self.location())?;
        state.serialize_field("text", self.text())?;
        state.end()
    }
}
