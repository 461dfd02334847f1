use crate::domain::{
    corpus::PageResolution,
    lint::{LintError, Rule, Sink},
    AnchorKind, Config, Corpus, Document, LinkTarget, RequirementId,
};

pub(super) fn check(
    corpus: &Corpus,
    config: &Config,
    sink: &mut Sink<'_>,
) -> Result<(), LintError> {
    let ignored = config.ignore_link_patterns()?;

    for document in corpus.documents() {
        for link in &document.links {
            if ignored.iter().any(|pattern| pattern.is_match(&link.target)) {
                continue;
            }

            match link.target() {
                LinkTarget::Fragment(fragment) => {
                    if !document.has_anchor(fragment) {
                        sink.emit(
                            Rule::BrokenReference,
                            &link.location,
                            format!("`#{fragment}` does not match any anchor on this page"),
                            defined_elsewhere(corpus, document, fragment),
                        );
                    }
                }
                LinkTarget::Page { page, fragment } => {
                    match corpus.resolve_page(document.path(), page) {
                        PageResolution::Missing => sink.emit(
                            Rule::MissingPage,
                            &link.location,
                            format!("link target `{page}` does not exist"),
                            None,
                        ),
                        PageResolution::Document(target) => {
                            if let Some(fragment) = fragment.filter(|f| !target.has_anchor(f)) {
                                sink.emit(
                                    Rule::BrokenReference,
                                    &link.location,
                                    format!(
                                        "`{page}#{fragment}` does not match any anchor on {}",
                                        target.path().display()
                                    ),
                                    defined_elsewhere(corpus, target, fragment),
                                );
                            }
                        }
                        PageResolution::File => {}
                    }
                }
                LinkTarget::External => {}
            }
        }

        collisions(document, sink);
    }

    Ok(())
}

/// Points at the page that defines the requirement a dangling fragment names.
fn defined_elsewhere(corpus: &Corpus, page: &Document, fragment: &str) -> Option<String> {
    let id = fragment.parse::<RequirementId>().ok()?;
    let definition = corpus.requirement(&id)?;
    (definition.document.path() != page.path()).then(|| {
        format!(
            "`{id}` is defined in {}; link to that page instead",
            definition.document.path().display()
        )
    })
}

fn collisions(document: &Document, sink: &mut Sink<'_>) {
    for requirement in document.anchors_of(AnchorKind::Requirement) {
        let clash = document
            .anchors
            .iter()
            .find(|a| a.kind != AnchorKind::Requirement && a.name == requirement.name);
        if let Some(clash) = clash {
            sink.emit(
                Rule::AnchorCollision,
                &requirement.location,
                format!(
                    "requirement ID `{}` is also the anchor of line {}",
                    requirement.name, clash.location.line
                ),
                Some(
                    "links to this anchor are ambiguous; rename the heading or the ID".to_string(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{
        lint::{lint, Check, Rule},
        Anchor, AnchorKind, Annotation, Config, Corpus, Document, Link, Location,
    };

    fn link(path: &str, line: usize, target: &str) -> Link {
        Link {
            target: target.to_string(),
            location: Location::new(path, line, 1),
        }
    }

    fn anchor(path: &str, line: usize, name: &str, kind: AnchorKind) -> Anchor {
        Anchor {
            name: name.to_string(),
            kind,
            location: Location::new(path, line, 1),
        }
    }

    fn requirement(path: &str, line: usize, id: &str) -> (Annotation, Anchor) {
        (
            Annotation {
                keyword: "MUST".to_string(),
                id: Some(id.to_string()),
                text: "text".to_string(),
                location: Location::new(path, line, 1),
            },
            anchor(path, line, id, AnchorKind::Requirement),
        )
    }

    fn corpus() -> Corpus {
        let mut general = Document::new("docs/general.md");
        let (annotation, requirement_anchor) = requirement("docs/general.md", 3, "general-sync");
        general.annotations = vec![annotation];
        general.anchors = vec![
            anchor("docs/general.md", 1, "introduction", AnchorKind::Heading),
            requirement_anchor,
        ];

        let mut python = Document::new("docs/python.md");
        python.anchors = vec![anchor("docs/python.md", 1, "python", AnchorKind::Heading)];
        python.links = vec![
            link("docs/python.md", 2, "#python"),
            link("docs/python.md", 3, "general.md#general-sync"),
            link("docs/python.md", 4, "general.html#introduction"),
            link("docs/python.md", 5, "#general-sync"),
            link("docs/python.md", 6, "general.md#nowhere"),
            link("docs/python.md", 7, "missing.md"),
            link("docs/python.md", 8, "https://example.com/#anything"),
            link("docs/python.md", 9, "../images/logo.png"),
            link("docs/python.md", 10, "/api/generated.html"),
        ];

        let mut corpus = Corpus::new("_includes");
        corpus.insert_document(general);
        corpus.insert_document(python);
        corpus.insert_site_file("images/logo.png");
        corpus
    }

    fn violations(config: &Config) -> Vec<(usize, Rule, String, Option<String>)> {
        lint(&corpus(), config, &[Check::References])
            .unwrap()
            .violations
            .into_iter()
            .map(|v| (v.location.line, v.rule, v.message, v.hint))
            .collect()
    }

    #[test]
    fn reports_broken_references_and_missing_pages() {
        let found = violations(&Config::default());
        assert_eq!(
            found,
            [
                (
                    5,
                    Rule::BrokenReference,
                    "`#general-sync` does not match any anchor on this page".to_string(),
                    Some(
                        "`general-sync` is defined in docs/general.md; link to that page instead"
                            .to_string()
                    )
                ),
                (
                    6,
                    Rule::BrokenReference,
                    "`general.md#nowhere` does not match any anchor on docs/general.md"
                        .to_string(),
                    None
                ),
                (
                    7,
                    Rule::MissingPage,
                    "link target `missing.md` does not exist".to_string(),
                    None
                ),
                (
                    10,
                    Rule::MissingPage,
                    "link target `/api/generated.html` does not exist".to_string(),
                    None
                ),
            ]
        );
    }

    #[test]
    fn ignored_links_are_skipped() {
        let config: Config =
            toml::from_str("_version = \"1\"\nignore_links = [\"^/api/\", \"missing\"]\n").unwrap();
        let lines: Vec<usize> = violations(&config).into_iter().map(|v| v.0).collect();
        assert_eq!(lines, [5, 6]);
    }

    #[test]
    fn requirement_ids_colliding_with_headings() {
        let mut document = Document::new("doc.md");
        let (annotation, requirement_anchor) = requirement("doc.md", 4, "overview");
        document.annotations = vec![annotation];
        document.anchors = vec![
            anchor("doc.md", 1, "overview", AnchorKind::Heading),
            requirement_anchor,
        ];
        let mut corpus = Corpus::new("_includes");
        corpus.insert_document(document);

        let report = lint(&corpus, &Config::default(), &[Check::References]).unwrap();
        assert_eq!(report.violations.len(), 1);
        let violation = &report.violations[0];
        assert_eq!(violation.rule, Rule::AnchorCollision);
        assert_eq!(violation.location.line, 4);
        assert_eq!(
            violation.message,
            "requirement ID `overview` is also the anchor of line 1"
        );
    }
}
