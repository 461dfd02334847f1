use nonempty::NonEmpty;

use crate::domain::{
    lint::{Rule, Sink},
    Config, Corpus,
};

pub(super) fn check(corpus: &Corpus, config: &Config, sink: &mut Sink<'_>) {
    for annotation in corpus.documents().flat_map(|d| &d.annotations) {
        match annotation.requirement_id() {
            None => sink.emit(
                Rule::MissingId,
                &annotation.location,
                "requirement annotation has no `id` parameter",
                Some(format!(
                    "add an id, e.g. {{% include {}/{} id=\"<prefix>-<topic>\" %}}",
                    config.requirement_include(),
                    annotation.keyword
                )),
            ),
            Some(Err(error)) => {
                sink.emit(Rule::MalformedId, &annotation.location, error.to_string(), None);
            }
            Some(Ok(id)) if !config.is_prefix_allowed(id.prefix()) => sink.emit(
                Rule::UnknownPrefix,
                &annotation.location,
                format!("ID prefix `{}` of `{id}` is not an allowed prefix", id.prefix()),
                Some(format!(
                    "allowed prefixes: {}",
                    config.allowed_prefixes().join(", ")
                )),
            ),
            Some(Ok(_)) => {}
        }
    }

    for (id, sites) in corpus.definitions() {
        let Some(NonEmpty { head, tail }) = NonEmpty::from_vec(sites) else {
            continue;
        };
        for duplicate in tail {
            sink.emit(
                Rule::DuplicateId,
                duplicate.location(),
                format!(
                    "duplicate requirement ID `{id}` (first defined at {})",
                    head.location()
                ),
                Some("requirement IDs must be unique across the whole corpus".to_string()),
            );
        }
    }
}
