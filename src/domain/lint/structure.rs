use crate::domain::{
    lint::{Rule, Sink},
    Corpus, ScanDiagnostic,
};

pub(super) fn check(corpus: &Corpus, sink: &mut Sink<'_>) {
    for document in corpus.documents() {
        for diagnostic in &document.diagnostics {
            match diagnostic {
                ScanDiagnostic::UnterminatedTag(location) => sink.emit(
                    Rule::UnterminatedTag,
                    location,
                    "`{%` tag is not closed with `%}` on the same line",
                    None,
                ),
                ScanDiagnostic::FrontMatter { location, message } => sink.emit(
                    Rule::InvalidFrontMatter,
                    location,
                    format!("front matter is not valid YAML: {message}"),
                    None,
                ),
            }
        }

        for annotation in document.annotations.iter().filter(|a| a.text.trim().is_empty()) {
            let id = annotation.id.as_deref().unwrap_or("<no id>");
            sink.emit(
                Rule::EmptyRequirement,
                &annotation.location,
                format!("requirement `{id}` has no guideline text"),
                Some("write the guideline sentence directly after the annotation".to_string()),
            );
        }
    }
}
