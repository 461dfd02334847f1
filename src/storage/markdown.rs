//! Scanning of Markdown documents with Liquid template tags.
//!
//! The scanner is line based. It understands just enough Markdown to avoid
//! false positives: fenced code blocks, inline code spans and HTML comments
//! are masked out. Liquid `{% raw %}` and `{% comment %}` blocks are masked
//! as well. What remains is searched for `{% include %}` tags, links, headings
//! and anchors.

use std::{collections::BTreeMap, path::PathBuf, sync::LazyLock};

use regex::Regex;

use crate::domain::{
    Anchor, AnchorKind, Annotation, Config, Document, FrontMatter, HeadingIds, Include, Link,
    Location, ScanDiagnostic,
};

static TAG_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\w+)\s*(.*?)\s*$").expect("valid regex"));

static PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|(\S+))"#).expect("valid regex")
});

// Liquid tags and outputs may contain spaces, so they are matched whole.
static INLINE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\]\(\s*<?((?:\{%.*?%\}|\{\{.*?\}\}|[^)\s>])+)>?(?:\s+(?:"[^"]*"|'[^']*'))?\s*\)"#,
    )
    .expect("valid regex")
});

static REFERENCE_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}\[[^\]]+\]:\s*<?((?:\{%.*?%\}|\{\{.*?\}\}|[^\s>])+)>?")
        .expect("valid regex")
});

static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex"));

static HTML_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<[A-Za-z][^>]*?\b(?:id|name)\s*=\s*(?:"([^"]+)"|'([^']+)')"#)
        .expect("valid regex")
});

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(#{1,6})(?:\s+(.*?))?\s*$").expect("valid regex"));

static CLOSING_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s+)#+$").expect("valid regex"));

static SETEXT_UNDERLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(?:=+|-+)\s*$").expect("valid regex"));

static HEADING_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{:?\s*#([\w-]+)\s*\}\s*$").expect("valid regex"));

static LINK_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("valid regex"));

/// Parses a Markdown document.
///
/// `path` is stored in the document and in every location. It should be
/// relative to the corpus root. The configuration supplies the include path
/// segment that marks a requirement annotation and the heading ID scheme.
///
/// Scanning never fails. Problems with the markup are recorded as
/// [`ScanDiagnostic`]s on the document.
#[must_use]
pub fn parse_document(path: impl Into<PathBuf>, text: &str, config: &Config) -> Document {
    let mut document = Document::new(path);
    let lines: Vec<&str> = text.lines().collect();

    let body_start = parse_front_matter(&mut document, &lines);

    let mut scanner = Scanner {
        path: document.path.clone(),
        requirement_prefix: format!("{}/", config.requirement_include().trim_end_matches('/')),
        heading_ids: config.heading_ids(),
        fence: None,
        block: None,
        html_comment: false,
        in_paragraph: false,
        setext_candidate: None,
        open_paragraph: None,
        heading_slugs: BTreeMap::new(),
    };

    for (index, line) in lines.iter().enumerate().skip(body_start) {
        scanner.scan_line(&mut document, index + 1, line);
    }

    tracing::trace!(
        path = %document.path.display(),
        annotations = document.annotations.len(),
        includes = document.includes.len(),
        links = document.links.len(),
        "scanned document"
    );

    document
}

/// Splits off the front matter block and returns the index of the first body
/// line.
fn parse_front_matter(document: &mut Document, lines: &[&str]) -> usize {
    if lines.first().map(|l| l.trim_end()) != Some("---") {
        return 0;
    }

    let Some(close) = lines
        .iter()
        .skip(1)
        .position(|l| matches!(l.trim_end(), "---" | "..."))
        .map(|p| p + 1)
    else {
        return 0;
    };

    let yaml = lines[1..close].join("\n");
    if yaml.trim().is_empty() {
        document.front_matter = Some(FrontMatter::default());
    } else {
        match serde_yaml::from_str::<FrontMatter>(&yaml) {
            Ok(front_matter) => document.front_matter = Some(front_matter),
            Err(error) => document.diagnostics.push(ScanDiagnostic::FrontMatter {
                location: Location::new(document.path.clone(), 1, 1),
                message: error.to_string(),
            }),
        }
    }

    close + 1
}

#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: char,
    len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Raw,
    Comment,
}

impl Block {
    const fn end_tag(self) -> &'static str {
        match self {
            Self::Raw => "endraw",
            Self::Comment => "endcomment",
        }
    }
}

/// A `{% ... %}` tag found on a line. Offsets are bytes into the line.
#[derive(Debug)]
struct Tag {
    start: usize,
    end: usize,
    name: String,
    args: String,
}

/// Views of one line with different markup blanked out. Byte offsets match
/// the original line in all of them.
#[derive(Debug, Default)]
struct Masked {
    /// Code spans, HTML comments, tags and raw or comment blocks blanked.
    content: String,
    /// As `content`, but tags are kept so templated link destinations stay
    /// whole.
    links: String,
    /// As `content`, but code spans are kept. Text is read from here.
    prose: String,
}

impl Masked {
    fn blank_all(&mut self, start: usize, end: usize) {
        blank_range(&mut self.content, start, end);
        blank_range(&mut self.links, start, end);
        blank_range(&mut self.prose, start, end);
    }

    fn blank_tag(&mut self, start: usize, end: usize) {
        blank_range(&mut self.content, start, end);
        blank_range(&mut self.prose, start, end);
    }
}

struct Scanner {
    path: PathBuf,
    requirement_prefix: String,
    heading_ids: HeadingIds,
    fence: Option<Fence>,
    block: Option<Block>,
    html_comment: bool,
    /// Whether the previous line belongs to a paragraph.
    in_paragraph: bool,
    /// The first line of the current paragraph, while it is the only one.
    setext_candidate: Option<(Location, String)>,
    /// Index of the annotation whose paragraph is still open.
    open_paragraph: Option<usize>,
    /// Heading slugs seen so far and how often.
    heading_slugs: BTreeMap<String, usize>,
}

impl Scanner {
    fn location(&self, line_no: usize, line: &str, byte: usize) -> Location {
        Location::new(self.path.clone(), line_no, line[..byte].chars().count() + 1)
    }

    fn end_paragraph(&mut self) {
        self.in_paragraph = false;
        self.setext_candidate = None;
        self.open_paragraph = None;
    }

    fn scan_line(&mut self, document: &mut Document, line_no: usize, line: &str) {
        if let Some(fence) = self.fence {
            if closes_fence(line, fence) {
                self.fence = None;
            }
            return;
        }
        if self.block.is_none() && !self.html_comment {
            if let Some(fence) = opens_fence(line) {
                self.fence = Some(fence);
                self.end_paragraph();
                return;
            }
        }

        if line.trim().is_empty() {
            self.end_paragraph();
            return;
        }

        let mut masked = self.mask_markup(line);
        let tags = self.scan_tags(document, line_no, line, &mut masked);

        if masked.prose.trim().is_empty() && tags.is_empty() {
            self.setext_candidate = None;
            return;
        }

        if SETEXT_UNDERLINE.is_match(&masked.content) {
            if let Some((location, text)) = self.setext_candidate.take() {
                self.heading(document, location, &text);
                self.end_paragraph();
                return;
            }
        }

        let atx = HEADING.captures(&masked.content).map(|caps| {
            let text = caps.get(2).map_or("", |m| &masked.prose[m.range()]);
            let start = caps.get(1).map_or(0, |m| m.start());
            (start, CLOSING_SEQUENCE.replace(text, "").into_owned())
        });
        if let Some((start, text)) = &atx {
            let location = self.location(line_no, line, *start);
            self.heading(document, location, text);
            self.end_paragraph();
        } else if self.in_paragraph {
            self.setext_candidate = None;
        } else {
            let indent = line.len() - line.trim_start().len();
            let location = self.location(line_no, line, indent);
            self.setext_candidate = Some((location, masked.prose.trim().to_string()));
            self.in_paragraph = true;
        }

        self.collect_links(document, line_no, line, &masked.links);
        self.collect_html_anchors(document, line_no, line, &masked.content);

        let mut opened_paragraph = false;
        for (i, tag) in tags.iter().enumerate() {
            let location = self.location(line_no, line, tag.start);
            match tag.name.as_str() {
                "include" | "include_relative" => {
                    let (target, params) = parse_include_args(&tag.args);
                    let relative = tag.name == "include_relative";

                    match target.strip_prefix(self.requirement_prefix.as_str()) {
                        Some(keyword) if !relative => {
                            let text_end = tags.get(i + 1).map_or(line.len(), |next| next.start);
                            let text = collapse_whitespace(&masked.prose[tag.end..text_end]);
                            let id = params.get("id").cloned();
                            if let Some(id) = id.as_ref().filter(|id| !id.is_empty()) {
                                document.anchors.push(Anchor {
                                    name: id.clone(),
                                    kind: AnchorKind::Requirement,
                                    location: location.clone(),
                                });
                            }
                            document.annotations.push(Annotation {
                                keyword: keyword.to_string(),
                                id,
                                text,
                                location,
                            });
                            self.open_paragraph = Some(document.annotations.len() - 1);
                            opened_paragraph = true;
                        }
                        _ => document.includes.push(Include {
                            target: target.to_string(),
                            relative,
                            params,
                            location,
                        }),
                    }
                }
                _ => {}
            }
        }

        if !opened_paragraph {
            if let Some(index) = self.open_paragraph {
                let annotation = &mut document.annotations[index];
                let continuation = collapse_whitespace(&masked.prose);
                if annotation.text.is_empty() {
                    annotation.text = continuation;
                } else if !continuation.is_empty() {
                    annotation.text.push(' ');
                    annotation.text.push_str(&continuation);
                }
            }
        }
    }

    /// Blanks out inline code spans and HTML comments, keeping byte offsets.
    ///
    /// Code spans are kept in the prose view.
    fn mask_markup(&mut self, line: &str) -> Masked {
        let mut content = String::with_capacity(line.len());
        let mut prose = String::with_capacity(line.len());
        let mut rest = line;

        while !rest.is_empty() {
            if self.html_comment {
                let end = match rest.find("-->") {
                    Some(end) => {
                        self.html_comment = false;
                        end + 3
                    }
                    None => rest.len(),
                };
                blank(&mut content, &rest[..end]);
                blank(&mut prose, &rest[..end]);
                rest = &rest[end..];
                continue;
            }

            let comment = rest.find("<!--");
            let code = rest.find('`');
            match (comment, code) {
                (Some(c), code) if code.is_none_or(|k| c < k) => {
                    content.push_str(&rest[..c]);
                    prose.push_str(&rest[..c]);
                    blank(&mut content, "<!--");
                    blank(&mut prose, "<!--");
                    rest = &rest[c + 4..];
                    self.html_comment = true;
                }
                (_, Some(k)) => {
                    content.push_str(&rest[..k]);
                    prose.push_str(&rest[..k]);
                    rest = &rest[k..];
                    let run = rest.len() - rest.trim_start_matches('`').len();
                    let delimiter = &rest[..run];
                    match rest[run..].find(delimiter) {
                        Some(close) => {
                            let span = run + close + run;
                            blank(&mut content, &rest[..span]);
                            prose.push_str(&rest[..span]);
                            rest = &rest[span..];
                        }
                        None => {
                            // an unmatched backtick run is literal text
                            content.push_str(delimiter);
                            prose.push_str(delimiter);
                            rest = &rest[run..];
                        }
                    }
                }
                (None, None) | (Some(_), None) => {
                    content.push_str(rest);
                    prose.push_str(rest);
                    rest = "";
                }
            }
        }

        Masked {
            links: content.clone(),
            content,
            prose,
        }
    }

    /// Finds the Liquid tags on a line.
    ///
    /// Tags and the content of raw and comment blocks are blanked out of the
    /// masks so later passes don't see them. Tags stay in the link view.
    fn scan_tags(
        &mut self,
        document: &mut Document,
        line_no: usize,
        line: &str,
        masked: &mut Masked,
    ) -> Vec<Tag> {
        let mut tags = Vec::new();
        let mut cursor = 0;

        loop {
            let Some(open) = masked.content[cursor..].find("{%").map(|i| i + cursor) else {
                if self.block.is_some() {
                    masked.blank_all(cursor, line.len());
                }
                break;
            };

            let Some(close) = masked.content[open + 2..].find("%}").map(|i| i + open + 2) else {
                if self.block.is_none() {
                    let location = self.location(line_no, line, open);
                    document
                        .diagnostics
                        .push(ScanDiagnostic::UnterminatedTag(location));
                }
                masked.blank_all(open, line.len());
                break;
            };
            let end = close + 2;

            let body = line[open + 2..close].trim_matches('-');
            let (name, args) = TAG_BODY
                .captures(body)
                .map(|caps| (caps[1].to_string(), caps[2].to_string()))
                .unwrap_or_default();

            if let Some(block) = self.block {
                masked.blank_all(cursor, end);
                if name == block.end_tag() {
                    self.block = None;
                }
                cursor = end;
                continue;
            }

            match name.as_str() {
                "raw" => {
                    masked.blank_all(open, end);
                    self.block = Some(Block::Raw);
                }
                "comment" => {
                    masked.blank_all(open, end);
                    self.block = Some(Block::Comment);
                }
                _ => {
                    masked.blank_tag(open, end);
                    tags.push(Tag {
                        start: open,
                        end,
                        name,
                        args,
                    });
                }
            }
            cursor = end;
        }

        tags
    }

    fn heading(&mut self, document: &mut Document, location: Location, text: &str) {
        if let Some(caps) = HEADING_ID.captures(text) {
            document.anchors.push(Anchor {
                name: caps[1].to_string(),
                kind: AnchorKind::Explicit,
                location,
            });
            return;
        }

        let base = slugify(text, self.heading_ids);
        let count = self.heading_slugs.entry(base.clone()).or_insert(0);
        let name = if *count == 0 {
            base
        } else {
            format!("{base}-{count}")
        };
        *count += 1;

        document.anchors.push(Anchor {
            name,
            kind: AnchorKind::Heading,
            location,
        });
    }

    fn collect_links(&self, document: &mut Document, line_no: usize, line: &str, masked: &str) {
        let mut push = |m: regex::Match<'_>| {
            document.links.push(Link {
                target: m.as_str().to_string(),
                location: self.location(line_no, line, m.start()),
            });
        };

        for caps in INLINE_LINK.captures_iter(masked) {
            if let Some(m) = caps.get(1) {
                push(m);
            }
        }
        if let Some(m) = REFERENCE_DEFINITION.captures(masked).and_then(|c| c.get(1)) {
            push(m);
        }
        for caps in HREF.captures_iter(masked) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                push(m);
            }
        }
    }

    fn collect_html_anchors(
        &self,
        document: &mut Document,
        line_no: usize,
        line: &str,
        masked: &str,
    ) {
        for caps in HTML_ANCHOR.captures_iter(masked) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                document.anchors.push(Anchor {
                    name: m.as_str().to_string(),
                    kind: AnchorKind::Explicit,
                    location: self.location(line_no, line, m.start()),
                });
            }
        }
    }
}

fn blank(masked: &mut String, hidden: &str) {
    masked.extend(std::iter::repeat_n(' ', hidden.len()));
}

fn blank_range(masked: &mut String, start: usize, end: usize) {
    masked.replace_range(start..end, &" ".repeat(end - start));
}

fn opens_fence(line: &str) -> Option<Fence> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let marker = rest.chars().next().filter(|c| matches!(c, '`' | '~'))?;
    let len = rest.len() - rest.trim_start_matches(marker).len();
    // backtick fences may not have backticks in the info string
    let info = &rest[len..];
    (len >= 3 && !(marker == '`' && info.contains('`'))).then_some(Fence { marker, len })
}

fn closes_fence(line: &str, fence: Fence) -> bool {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return false;
    }
    let len = trimmed.len() - trimmed.trim_start_matches(fence.marker).len();
    len >= fence.len && trimmed[len..].trim().is_empty()
}

/// Splits include arguments into the target path and its parameters.
fn parse_include_args(args: &str) -> (String, BTreeMap<String, String>) {
    let args = args.trim();
    let (target, rest) = args
        .split_once(char::is_whitespace)
        .unwrap_or((args, ""));

    let params = PARAM
        .captures_iter(rest)
        .filter_map(|caps| {
            let key = caps.get(1)?.as_str().to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))?
                .as_str()
                .to_string();
            Some((key, value))
        })
        .collect();

    (target.to_string(), params)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Generates a heading anchor the way the site's Markdown renderer does.
///
/// Link markup is reduced to its text first.
///
/// * [`HeadingIds::Kramdown`]: everything up to the first ASCII letter is
///   removed, then everything except ASCII letters, digits, spaces and `-`.
///   An empty result becomes `section`.
/// * [`HeadingIds::Gfm`]: everything except letters, digits, spaces, `-` and
///   `_` is removed.
///
/// In both schemes spaces become `-` and the result is lowercased.
///
/// ```
/// use guidelint::{domain::HeadingIds, storage::markdown::slugify};
///
/// assert_eq!(slugify("Client Construction", HeadingIds::Kramdown), "client-construction");
/// assert_eq!(slugify("1. The `Get` [API](x.md)!", HeadingIds::Kramdown), "the-get-api");
/// assert_eq!(slugify("1. snake_case", HeadingIds::Gfm), "1-snake_case");
/// ```
#[must_use]
pub fn slugify(heading: &str, scheme: HeadingIds) -> String {
    let text = LINK_TEXT.replace_all(heading, "$1");
    let dash = |c: char| if c == ' ' { '-' } else { c };

    match scheme {
        HeadingIds::Kramdown => {
            let start = text
                .find(|c: char| c.is_ascii_alphabetic())
                .unwrap_or(text.len());
            let slug: String = text[start..]
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-'))
                .map(dash)
                .map(|c| c.to_ascii_lowercase())
                .collect();
            if slug.is_empty() {
                "section".to_string()
            } else {
                slug
            }
        }
        HeadingIds::Gfm => text
            .chars()
            .flat_map(char::to_lowercase)
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
            .map(dash)
            .collect(),
    }
}
