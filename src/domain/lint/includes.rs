use std::collections::BTreeSet;

use crate::domain::{
    lint::{Rule, Sink},
    Config, Corpus, Include,
};

pub(super) fn check(corpus: &Corpus, config: &Config, sink: &mut Sink<'_>) {
    let include_dir = corpus.include_dir().display().to_string();

    for document in corpus.documents() {
        for include in &document.includes {
            if !corpus.include_exists(document.path(), include) {
                sink.emit(
                    Rule::MissingInclude,
                    &include.location,
                    missing_message(&include_dir, include),
                    None,
                );
            }
        }
    }

    // Each requirement template is reported once, at its first use. Unknown
    // keywords are left to the keyword rules.
    let mut reported = BTreeSet::new();
    for document in corpus.documents() {
        for annotation in &document.annotations {
            let Ok(keyword) = annotation.keyword() else {
                continue;
            };
            let template = Include {
                target: format!("{}/{keyword}", config.requirement_include()),
                relative: false,
                params: Default::default(),
                location: annotation.location.clone(),
            };
            if !reported.contains(&keyword) && !corpus.include_exists(document.path(), &template) {
                reported.insert(keyword);
                sink.emit(
                    Rule::MissingInclude,
                    &annotation.location,
                    format!(
                        "requirement template `{include_dir}/{}` does not exist",
                        template.target
                    ),
                    Some("run `guidelint init` to create the requirement templates".to_string()),
                );
            }
        }
    }

    for (path, includes) in corpus.include_files() {
        for include in includes {
            if !corpus.include_exists(path, include) {
                sink.emit(
                    Rule::MissingInclude,
                    &include.location,
                    missing_message(&include_dir, include),
                    None,
                );
            }
        }
    }

    for cycle in corpus.include_cycles() {
        let mut chain: Vec<String> = cycle
            .members
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        chain.push(chain[0].clone());
        sink.emit(
            Rule::IncludeCycle,
            &cycle.location,
            format!("include cycle: {}", chain.join(" -> ")),
            None,
        );
    }
}

fn missing_message(include_dir: &str, include: &Include) -> String {
    if include.relative {
        format!("relative include `{}` does not exist", include.target)
    } else {
        format!("include `{}` not found in {include_dir}", include.target)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::domain::{
        lint::{lint, Check, Rule},
        Annotation, Config, Corpus, Document, Include, Location,
    };

    fn include(path: &str, line: usize, target: &str, relative: bool) -> Include {
        Include {
            target: target.to_string(),
            relative,
            params: BTreeMap::new(),
            location: Location::new(path, line, 1),
        }
    }

    fn annotation(line: usize, keyword: &str) -> Annotation {
        Annotation {
            keyword: keyword.to_string(),
            id: Some(format!("general-{line}")),
            text: "text".to_string(),
            location: Location::new("docs/a.md", line, 1),
        }
    }

    fn messages(corpus: &Corpus) -> Vec<(Rule, String)> {
        lint(corpus, &Config::default(), &[Check::Includes])
            .unwrap()
            .violations
            .into_iter()
            .map(|v| (v.rule, format!("{}: {}", v.location, v.message)))
            .collect()
    }

    #[test]
    fn document_includes_must_exist() {
        let mut document = Document::new("docs/a.md");
        document.includes = vec![
            include("docs/a.md", 1, "refs.md", false),
            include("docs/a.md", 2, "tables/missing.md", false),
            include("docs/a.md", 3, "snippet.md", true),
            include("docs/a.md", 4, "gone.md", true),
        ];
        let mut corpus = Corpus::new("_includes");
        corpus.insert_include_file("_includes/refs.md", Vec::new());
        corpus.insert_site_file("docs/snippet.md");
        corpus.insert_document(document);

        assert_eq!(
            messages(&corpus),
            [
                (
                    Rule::MissingInclude,
                    "docs/a.md:2:1: include `tables/missing.md` not found in _includes"
                        .to_string()
                ),
                (
                    Rule::MissingInclude,
                    "docs/a.md:4:1: relative include `gone.md` does not exist".to_string()
                ),
            ]
        );
    }

    #[test]
    fn missing_requirement_template_reported_once_per_keyword() {
        let mut document = Document::new("docs/a.md");
        document.annotations = vec![
            annotation(1, "MUST"),
            annotation(2, "SHOULD"),
            annotation(3, "SHOULD"),
            annotation(4, "must"),
        ];
        let mut corpus = Corpus::new("_includes");
        corpus.insert_include_file("_includes/requirement/MUST", Vec::new());
        corpus.insert_document(document);

        assert_eq!(
            messages(&corpus),
            [(
                Rule::MissingInclude,
                "docs/a.md:2:1: requirement template `_includes/requirement/SHOULD` does not exist"
                    .to_string()
            )]
        );
    }

    #[test]
    fn nested_includes_and_cycles() {
        let mut corpus = Corpus::new("_includes");
        corpus.insert_include_file(
            "_includes/a.md",
            vec![include("_includes/a.md", 1, "b.md", false)],
        );
        corpus.insert_include_file(
            "_includes/b.md",
            vec![
                include("_includes/b.md", 1, "a.md", false),
                include("_includes/b.md", 2, "nope.md", false),
            ],
        );

        assert_eq!(
            messages(&corpus),
            [
                (
                    Rule::IncludeCycle,
                    "_includes/a.md:1:1: include cycle: _includes/a.md -> _includes/b.md -> _includes/a.md"
                        .to_string()
                ),
                (
                    Rule::MissingInclude,
                    "_includes/b.md:2:1: include `nope.md` not found in _includes".to_string()
                ),
            ]
        );
    }
}
