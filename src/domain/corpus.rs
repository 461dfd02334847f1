//! In-memory index over a scanned guideline corpus.
//!
//! The [`Corpus`] knows nothing about the filesystem. It is assembled by
//! [`Directory`](crate::Directory) from already-scanned documents and the list
//! of files that exist, and answers the lookups the lint rules need.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use petgraph::{algo::tarjan_scc, graphmap::DiGraphMap};
use tracing::instrument;

use crate::domain::{
    paths, Document, Include, Link, LinkTarget, Location, RequirementId, RequirementView,
};

/// An in-memory representation of every document in the corpus.
#[derive(Debug, Default)]
pub struct Corpus {
    /// Scanned documents, keyed by path relative to the root.
    documents: BTreeMap<PathBuf, Document>,

    /// Every file under the root that was not excluded, relative to the root.
    /// Includes non-document files so includes and links to images resolve.
    site_files: BTreeSet<PathBuf>,

    /// Include directory, relative to the root.
    include_dir: PathBuf,

    /// Nested includes of each file in the include directory, keyed by path
    /// relative to the root.
    include_files: BTreeMap<PathBuf, Vec<Include>>,

    /// Permalink (without leading `/`) to document path.
    permalinks: BTreeMap<String, PathBuf>,
}

/// How a link's page part resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageResolution<'a> {
    /// The page is a scanned document.
    Document(&'a Document),
    /// The page is some other file that exists.
    File,
    /// Nothing matches.
    Missing,
}

/// A set of include files that include each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeCycle {
    /// Member files, relative to the root, sorted.
    pub members: Vec<PathBuf>,
    /// An include tag that participates in the cycle.
    pub location: Location,
}

impl Corpus {
    /// Creates an empty corpus whose includes resolve against `include_dir`.
    #[must_use]
    pub fn new(include_dir: impl Into<PathBuf>) -> Self {
        Self {
            include_dir: include_dir.into(),
            ..Self::default()
        }
    }

    /// Adds a scanned document. The document's path is also recorded as a
    /// site file.
    pub fn insert_document(&mut self, document: Document) {
        if let Some(permalink) = document.permalink() {
            self.permalinks
                .insert(permalink.to_string(), document.path.clone());
        }
        self.site_files.insert(document.path.clone());
        self.documents.insert(document.path.clone(), document);
    }

    /// Records that a file exists.
    pub fn insert_site_file(&mut self, path: impl Into<PathBuf>) {
        self.site_files.insert(path.into());
    }

    /// Records a file in the include directory along with the includes it
    /// contains.
    pub fn insert_include_file(&mut self, path: impl Into<PathBuf>, includes: Vec<Include>) {
        let path = path.into();
        self.site_files.insert(path.clone());
        self.include_files.insert(path, includes);
    }

    /// Returns the include directory, relative to the root.
    #[must_use]
    pub fn include_dir(&self) -> &Path {
        &self.include_dir
    }

    /// Iterates over the files in the include directory and the includes each
    /// one contains.
    pub fn include_files(&self) -> impl Iterator<Item = (&Path, &[Include])> {
        self.include_files
            .iter()
            .map(|(path, includes)| (path.as_path(), includes.as_slice()))
    }

    /// Iterates over all documents in path order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Returns the document at the given path.
    #[must_use]
    pub fn document(&self, path: &Path) -> Option<&Document> {
        self.documents.get(path)
    }

    /// Returns the number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if the corpus has no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Returns every annotation with a well-formed ID, in path and line order.
    ///
    /// Duplicates are all returned.
    pub fn requirements(&self) -> impl Iterator<Item = RequirementView<'_>> {
        self.documents.values().flat_map(|document| {
            document.annotations.iter().filter_map(move |annotation| {
                let id = annotation.requirement_id()?.ok()?;
                Some(RequirementView {
                    id,
                    annotation,
                    document,
                })
            })
        })
    }

    /// Groups requirements by ID. Each group is in path and line order, so the
    /// first element is the definition that wins.
    #[must_use]
    pub fn definitions(&self) -> BTreeMap<RequirementId, Vec<RequirementView<'_>>> {
        let mut definitions: BTreeMap<RequirementId, Vec<RequirementView<'_>>> = BTreeMap::new();
        for view in self.requirements() {
            definitions.entry(view.id.clone()).or_default().push(view);
        }
        definitions
    }

    /// Returns the first definition of an ID.
    #[must_use]
    pub fn requirement(&self, id: &RequirementId) -> Option<RequirementView<'_>> {
        self.requirements().find(|view| &view.id == id)
    }

    /// Returns every link that points at a requirement's anchor on its
    /// defining page.
    #[must_use]
    pub fn references_to(&self, id: &RequirementId) -> Vec<&Link> {
        let Some(definition) = self.requirement(id) else {
            return Vec::new();
        };
        let target_path = definition.document.path();

        self.documents
            .values()
            .flat_map(|document| document.links.iter().map(move |link| (document, link)))
            .filter(|(document, link)| match link.target() {
                LinkTarget::Fragment(fragment) => {
                    fragment == id.as_str() && document.path() == target_path
                }
                LinkTarget::Page {
                    page,
                    fragment: Some(fragment),
                } => {
                    fragment == id.as_str()
                        && matches!(
                            self.resolve_page(document.path(), page),
                            PageResolution::Document(target) if target.path() == target_path
                        )
                }
                LinkTarget::Page { fragment: None, .. } | LinkTarget::External => false,
            })
            .map(|(_, link)| link)
            .collect()
    }

    /// Resolves the page part of a link found in the document at `from`.
    ///
    /// Permalinks declared in front matter take precedence over file paths.
    #[must_use]
    pub fn resolve_page(&self, from: &Path, page: &str) -> PageResolution<'_> {
        let permalink = page.trim_start_matches('/');
        if let Some(document) = self
            .permalinks
            .get(permalink)
            .and_then(|path| self.documents.get(path))
        {
            return PageResolution::Document(document);
        }

        let candidates = paths::candidates(from, page);
        if let Some(document) = candidates.iter().find_map(|c| self.documents.get(c)) {
            return PageResolution::Document(document);
        }
        if candidates.iter().any(|c| self.site_files.contains(c)) {
            return PageResolution::File;
        }
        PageResolution::Missing
    }

    /// Returns `true` if the include found in the document at `from` names a
    /// file that exists.
    #[must_use]
    pub fn include_exists(&self, from: &Path, include: &Include) -> bool {
        paths::include_path(&self.include_dir, from, &include.target, include.relative)
            .is_some_and(|path| self.site_files.contains(&path))
    }

    /// Finds groups of include files that include each other.
    ///
    /// Only plain `include` edges between files in the include directory are
    /// considered.
    #[instrument(level = "debug", skip(self))]
    #[must_use]
    pub fn include_cycles(&self) -> Vec<IncludeCycle> {
        let mut graph: DiGraphMap<&Path, &Location> = DiGraphMap::new();

        for (path, includes) in &self.include_files {
            graph.add_node(path.as_path());
            for include in includes.iter().filter(|i| !i.relative) {
                let Some(target) =
                    paths::include_path(&self.include_dir, path, &include.target, false)
                else {
                    continue;
                };
                if let Some((target, _)) = self.include_files.get_key_value(&target) {
                    graph.add_edge(path.as_path(), target.as_path(), &include.location);
                }
            }
        }

        let mut cycles: Vec<IncludeCycle> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .filter_map(|mut scc| {
                scc.sort();
                let location = scc.iter().find_map(|&from| {
                    scc.iter()
                        .find_map(|&to| graph.edge_weight(from, to).map(|l| (*l).clone()))
                })?;
                Some(IncludeCycle {
                    members: scc.into_iter().map(Path::to_path_buf).collect(),
                    location,
                })
            })
            .collect();

        cycles.sort_by(|a, b| a.members.cmp(&b.members));
        cycles
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::{Annotation, FrontMatter};

    fn annotation(path: &str, line: usize, id: &str) -> Annotation {
        Annotation {
            keyword: "MUST".to_string(),
            id: Some(id.to_string()),
            text: "do the thing.".to_string(),
            location: Location::new(path, line, 1),
        }
    }

    fn link(path: &str, line: usize, target: &str) -> Link {
        Link {
            target: target.to_string(),
            location: Location::new(path, line, 1),
        }
    }

    fn include(path: &str, line: usize, target: &str) -> Include {
        Include {
            target: target.to_string(),
            relative: false,
            params: BTreeMap::new(),
            location: Location::new(path, line, 1),
        }
    }

    fn sample() -> Corpus {
        let mut corpus = Corpus::new("_includes");

        let mut general = Document::new("docs/general/design.md");
        general.annotations = vec![
            annotation("docs/general/design.md", 3, "general-client-sync"),
            annotation("docs/general/design.md", 5, "general-client-async"),
        ];
        general.front_matter = Some(FrontMatter {
            permalink: Some("/general_design.html".to_string()),
            ..FrontMatter::default()
        });
        general.links = vec![link("docs/general/design.md", 7, "#general-client-sync")];

        let mut python = Document::new("docs/python/design.md");
        python.annotations = vec![
            annotation("docs/python/design.md", 2, "python-client-sync"),
            annotation("docs/python/design.md", 9, "general-client-sync"),
            annotation("docs/python/design.md", 10, "Not An Id"),
        ];
        python.links = vec![
            link("docs/python/design.md", 4, "general_design.html#general-client-sync"),
            link("docs/python/design.md", 5, "../general/design.md#general-client-sync"),
            link("docs/python/design.md", 6, "#general-client-sync"),
        ];

        corpus.insert_document(general);
        corpus.insert_document(python);
        corpus.insert_site_file("images/diagram.png");
        corpus
    }

    #[test]
    fn requirements_skip_malformed_ids() {
        let corpus = sample();
        let ids: Vec<String> = corpus.requirements().map(|r| r.id.to_string()).collect();
        assert_eq!(
            ids,
            [
                "general-client-sync",
                "general-client-async",
                "python-client-sync",
                "general-client-sync"
            ]
        );
    }

    #[test]
    fn definitions_group_duplicates_in_order() {
        let corpus = sample();
        let definitions = corpus.definitions();
        let id: RequirementId = "general-client-sync".parse().unwrap();
        let sites: Vec<String> = definitions[&id]
            .iter()
            .map(|view| view.location().to_string())
            .collect();
        assert_eq!(
            sites,
            ["docs/general/design.md:3:1", "docs/python/design.md:9:1"]
        );
        assert_eq!(definitions.len(), 3);
    }

    #[test]
    fn resolves_pages_by_permalink_and_path() {
        let corpus = sample();
        let from = Path::new("docs/python/design.md");

        let PageResolution::Document(by_permalink) =
            corpus.resolve_page(from, "general_design.html")
        else {
            panic!("permalink should resolve");
        };
        assert_eq!(by_permalink.path(), Path::new("docs/general/design.md"));

        let PageResolution::Document(by_path) = corpus.resolve_page(from, "../general/design.html")
        else {
            panic!("html path should resolve to markdown source");
        };
        assert_eq!(by_path.path(), Path::new("docs/general/design.md"));

        assert_eq!(
            corpus.resolve_page(from, "/images/diagram.png"),
            PageResolution::File
        );
        assert_eq!(
            corpus.resolve_page(from, "missing.md"),
            PageResolution::Missing
        );
    }

    #[test]
    fn backlinks_only_count_links_to_the_defining_page() {
        let corpus = sample();
        let id: RequirementId = "general-client-sync".parse().unwrap();
        let lines: Vec<(String, usize)> = corpus
            .references_to(&id)
            .iter()
            .map(|link| (link.location.path.display().to_string(), link.location.line))
            .collect();

        // the bare fragment in the python page points at the python page
        assert_eq!(
            lines,
            [
                ("docs/general/design.md".to_string(), 7),
                ("docs/python/design.md".to_string(), 4),
                ("docs/python/design.md".to_string(), 5),
            ]
        );
    }

    #[test]
    fn include_existence() {
        let mut corpus = sample();
        corpus.insert_include_file("_includes/requirement/MUST", Vec::new());

        let from = Path::new("docs/general/design.md");
        assert!(corpus.include_exists(from, &include("x", 1, "requirement/MUST")));
        assert!(!corpus.include_exists(from, &include("x", 1, "requirement/SHALL")));
    }

    #[test]
    fn detects_include_cycles() {
        let mut corpus = Corpus::new("_includes");
        corpus.insert_include_file(
            "_includes/a.md",
            vec![include("_includes/a.md", 1, "b.md")],
        );
        corpus.insert_include_file(
            "_includes/b.md",
            vec![include("_includes/b.md", 2, "a.md")],
        );
        corpus.insert_include_file(
            "_includes/self.md",
            vec![include("_includes/self.md", 3, "self.md")],
        );
        corpus.insert_include_file(
            "_includes/leaf.md",
            vec![include("_includes/leaf.md", 1, "missing.md")],
        );

        let cycles = corpus.include_cycles();
        assert_eq!(cycles.len(), 2);
        assert_eq!(
            cycles[0].members,
            [PathBuf::from("_includes/a.md"), PathBuf::from("_includes/b.md")]
        );
        assert_eq!(cycles[0].location, Location::new("_includes/a.md", 1, 1));
        assert_eq!(cycles[1].members, [PathBuf::from("_includes/self.md")]);
    }
}
