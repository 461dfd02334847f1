use crate::domain::{
    lint::{Rule, Sink},
    Config, Corpus, Keyword,
};

pub(super) fn check(corpus: &Corpus, config: &Config, sink: &mut Sink<'_>) {
    for annotation in corpus.documents().flat_map(|d| &d.annotations) {
        match annotation.keyword() {
            Ok(keyword) if !config.is_keyword_enabled(keyword) => {
                let enabled: Vec<&str> = config.keywords().iter().map(|k| k.as_str()).collect();
                sink.emit(
                    Rule::DisallowedKeyword,
                    &annotation.location,
                    format!("keyword `{keyword}` is not enabled for this corpus"),
                    Some(format!("enabled keywords: {}", enabled.join(", "))),
                );
            }
            Ok(_) => {}
            Err(_) => {
                let hint = Keyword::suggest(&annotation.keyword).map_or_else(
                    || "expected one of MUST, MUSTNOT, SHOULD, SHOULDNOT, MAY".to_string(),
                    |suggestion| format!("did you mean `{suggestion}`?"),
                );
                sink.emit(
                    Rule::UnknownKeyword,
                    &annotation.location,
                    format!("unknown requirement keyword `{}`", annotation.keyword),
                    Some(hint),
                );
            }
        }
    }
}
