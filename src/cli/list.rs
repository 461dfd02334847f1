use std::{fmt, path::PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use guidelint::{Directory, Keyword, RequirementView};
use regex::Regex;
use tracing::instrument;

const DEFAULT_LIMIT: usize = 200;
const MAX_TEXT_WIDTH: usize = 72;

/// Command arguments for `guidelint list`.
#[derive(Debug, Parser)]
#[command(about = "List requirements with filters")]
pub struct List {
    /// Columns to display (comma-separated).
    #[arg(long, value_delimiter = ',', value_name = "COL")]
    columns: Vec<ListColumn>,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Suppress headers and format rows for scripting.
    #[arg(long)]
    quiet: bool,

    /// Filter by keyword (comma-separated, case-insensitive).
    #[arg(long, value_delimiter = ',', value_name = "KEYWORD", value_parser = parse_keyword)]
    keyword: Vec<Keyword>,

    /// Filter by ID prefix (comma-separated, case-insensitive).
    #[arg(long, value_delimiter = ',', value_name = "PREFIX")]
    prefix: Vec<String>,

    /// Case-insensitive substring match against ID and guideline text.
    #[arg(long, conflicts_with = "regex")]
    contains: Option<String>,

    /// Regular expression match against ID and guideline text.
    #[arg(long)]
    regex: Option<String>,

    /// Limit number of rows returned (0 = unlimited).
    #[arg(long)]
    limit: Option<usize>,

    /// Skip the first N rows.
    #[arg(long)]
    offset: Option<usize>,
}

/// Supported output formats.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Columns available for display.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ListColumn {
    Id,
    Keyword,
    Strength,
    Page,
    Location,
    Text,
}

#[derive(Debug, Default)]
struct Filters {
    keywords: Vec<Keyword>,
    prefixes: Vec<String>,
    contains: Option<String>,
    regex: Option<Regex>,
}

impl List {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let directory = Directory::new(root)?;
        let filters = Filters::new(&self)?;

        let limit = match self.limit {
            Some(0) => None,
            Some(value) => Some(value),
            None => Some(DEFAULT_LIMIT),
        };

        let rows: Vec<RequirementView<'_>> = directory
            .corpus()
            .requirements()
            .filter(|requirement| filters.matches(requirement))
            .skip(self.offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .collect();

        match self.output {
            OutputFormat::Table => render_table(&rows, &self.columns, self.quiet),
            OutputFormat::Json => render_json(&rows, &self.columns)?,
            OutputFormat::Csv => render_csv(&rows, &self.columns, self.quiet),
        }
        Ok(())
    }
}

impl Filters {
    fn new(cmd: &List) -> anyhow::Result<Self> {
        let regex = if let Some(pattern) = &cmd.regex {
            Some(Regex::new(pattern).with_context(|| format!("invalid regex: {pattern}"))?)
        } else {
            None
        };

        Ok(Self {
            keywords: cmd.keyword.clone(),
            prefixes: cmd
                .prefix
                .iter()
                .map(String::as_str)
                .map(str::to_ascii_lowercase)
                .collect(),
            contains: cmd.contains.as_deref().map(str::to_lowercase),
            regex,
        })
    }

    fn matches(&self, requirement: &RequirementView<'_>) -> bool {
        if !self.keywords.is_empty()
            && !requirement
                .keyword()
                .is_some_and(|keyword| self.keywords.contains(&keyword))
        {
            return false;
        }

        if !self.prefixes.is_empty() && !self.prefixes.iter().any(|p| p == requirement.id.prefix())
        {
            return false;
        }

        if let Some(needle) = &self.contains {
            let haystack = format!("{} {}", requirement.id, requirement.text()).to_lowercase();
            if !haystack.contains(needle) {
                return false;
            }
        }

        if let Some(regex) = &self.regex {
            if !regex.is_match(requirement.id.as_str()) && !regex.is_match(requirement.text()) {
                return false;
            }
        }

        true
    }
}

fn parse_keyword(value: &str) -> Result<Keyword, String> {
    value
        .to_ascii_uppercase()
        .parse()
        .map_err(|err: guidelint::domain::keyword::ParseError| err.to_string())
}

fn render_table(rows: &[RequirementView<'_>], columns: &[ListColumn], quiet: bool) {
    let selected_columns = if columns.is_empty() {
        if quiet {
            vec![ListColumn::Id]
        } else {
            vec![
                ListColumn::Id,
                ListColumn::Keyword,
                ListColumn::Location,
                ListColumn::Text,
            ]
        }
    } else {
        columns.to_vec()
    };

    let data: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            selected_columns
                .iter()
                .map(|column| match column {
                    ListColumn::Text => truncate(row.text(), MAX_TEXT_WIDTH),
                    _ => column.value(row),
                })
                .collect()
        })
        .collect();

    if quiet {
        for row in data {
            println!("{}", row.join("\t"));
        }
        return;
    }

    let headers: Vec<&str> = selected_columns.iter().map(|c| c.header()).collect();

    // Determine column widths for alignment.
    let widths = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            data.iter()
                .map(|row| row[idx].chars().count())
                .max()
                .unwrap_or(0)
                .max(header.len())
        })
        .collect::<Vec<_>>();

    for (header, width) in headers.iter().zip(&widths) {
        print!("{header:<width$}  ");
    }
    println!();
    for width in &widths {
        print!("{:-<width$}  ", "");
    }
    println!();

    for row in data {
        for (value, width) in row.iter().zip(&widths) {
            print!("{value:<width$}  ");
        }
        println!();
    }
}

fn render_json(rows: &[RequirementView<'_>], columns: &[ListColumn]) -> anyhow::Result<()> {
    if columns.is_empty() {
        serde_json::to_writer_pretty(std::io::stdout(), rows)
            .context("failed to render json output")?;
    } else {
        let rows_out: Vec<_> = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| (column.key(), serde_json::Value::String(column.value(row))))
                    .collect::<serde_json::Map<_, _>>()
            })
            .collect();
        serde_json::to_writer_pretty(std::io::stdout(), &rows_out)
            .context("failed to render json output")?;
    }
    println!();
    Ok(())
}

fn render_csv(rows: &[RequirementView<'_>], columns: &[ListColumn], quiet: bool) {
    let selected_columns = if columns.is_empty() {
        vec![
            ListColumn::Id,
            ListColumn::Keyword,
            ListColumn::Strength,
            ListColumn::Location,
            ListColumn::Text,
        ]
    } else {
        columns.to_vec()
    };

    if !quiet {
        let header_line = selected_columns
            .iter()
            .map(|column| csv_escape(column.header()))
            .collect::<Vec<_>>()
            .join(",");
        println!("{header_line}");
    }

    for row in rows {
        let values: Vec<_> = selected_columns
            .iter()
            .map(|column| csv_escape(&column.value(row)))
            .collect();
        println!("{}", values.join(","));
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(width.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

impl ListColumn {
    const fn header(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Keyword => "Keyword",
            Self::Strength => "Strength",
            Self::Page => "Page",
            Self::Location => "Location",
            Self::Text => "Text",
        }
    }

    fn key(self) -> String {
        self.header().to_ascii_lowercase()
    }

    fn value(self, row: &RequirementView<'_>) -> String {
        match self {
            Self::Id => row.id.to_string(),
            Self::Keyword => row.annotation.keyword.clone(),
            Self::Strength => row
                .keyword()
                .map(|keyword| format!("{:?}", keyword.strength()).to_lowercase())
                .unwrap_or_default(),
            Self::Page => row.page_title().unwrap_or_default().to_string(),
            Self::Location => row.location().to_string(),
            Self::Text => row.text().to_string(),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Csv => "csv",
        })
    }
}
