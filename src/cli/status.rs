use std::{collections::BTreeMap, path::PathBuf, process};

use clap::Parser;
use guidelint::{Directory, Report};
use tracing::instrument;

use super::terminal::{is_narrow, Colorize};

#[derive(Debug, Parser, Default)]
#[command(about = "Show requirement counts and lint totals")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Everything the status views print.
#[derive(Debug, Default)]
struct Summary {
    documents: usize,
    by_keyword: BTreeMap<String, usize>,
    by_prefix: BTreeMap<String, usize>,
    total: usize,
    errors: usize,
    warnings: usize,
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let directory = Directory::new(root)?;
        let report = directory.lint(&[])?;

        let summary = Summary::from_directory(&directory, &report);

        match self.output {
            OutputFormat::Json => Self::output_json(&summary)?,
            OutputFormat::Table => {
                if self.quiet {
                    Self::output_quiet(&summary);
                } else {
                    Self::output_table(&summary);
                }
            }
        }

        // Exit with a non-zero code when the corpus needs attention.
        if summary.errors > 0 {
            process::exit(2);
        }

        Ok(())
    }

    fn output_json(summary: &Summary) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(&summary.to_json())?);
        Ok(())
    }

    fn output_quiet(summary: &Summary) {
        println!("{}", summary.quiet_line());
    }

    fn output_table(summary: &Summary) {
        if summary.total == 0 {
            println!(
                "No requirement annotations found in {} documents.",
                summary.documents
            );
        } else {
            print_counts("Keyword", &summary.by_keyword);
            println!();
            print_counts("Prefix", &summary.by_prefix);
            println!("Total      {} in {} documents", summary.total, summary.documents);
        }

        println!();

        if summary.errors == 0 {
            println!("Errors: {} ✅", "0".success());
        } else {
            println!("Errors: {} ⚠️", summary.errors.to_string().error());
            println!("{}", "Run 'guidelint check' to investigate.".dim());
        }
        if summary.warnings > 0 {
            println!("Warnings: {}", summary.warnings.to_string().warning());
        }
    }
}

impl Summary {
    fn from_directory(directory: &Directory, report: &Report) -> Self {
        let mut summary = Self {
            documents: directory.corpus().len(),
            errors: report.errors().count(),
            warnings: report.warnings().count(),
            ..Self::default()
        };
        for requirement in directory.corpus().requirements() {
            *summary
                .by_keyword
                .entry(requirement.annotation.keyword.clone())
                .or_insert(0) += 1;
            *summary
                .by_prefix
                .entry(requirement.id.prefix().to_string())
                .or_insert(0) += 1;
            summary.total += 1;
        }
        summary
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "documents": self.documents,
            "requirements": {
                "total": self.total,
                "by_keyword": self.by_keyword,
                "by_prefix": self.by_prefix,
            },
            "errors": self.errors,
            "warnings": self.warnings,
        })
    }

    fn quiet_line(&self) -> String {
        format!(
            "documents={} requirements={} errors={} warnings={}",
            self.documents, self.total, self.errors, self.warnings
        )
    }
}

fn print_counts(label: &str, counts: &BTreeMap<String, usize>) {
    println!("Requirements by {}", label.to_lowercase());
    println!("{}", "─".repeat(16 + label.len()).dim());

    if is_narrow() {
        // Stacked output for narrow terminals
        for (name, count) in counts {
            println!("{}: {count}", name.info());
        }
    } else {
        println!("{label:<24} Count");
        for (name, count) in counts {
            println!("{name:<24} {count}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn empty_corpus_still_reports_in_every_format() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("docs")).unwrap();
        fs::write(
            tmp.path().join("docs/index.md"),
            "# Index\n\nSee [missing](#nowhere).\n",
        )
        .unwrap();

        let directory = Directory::new(tmp.path()).unwrap();
        let report = directory.lint(&[]).unwrap();
        let summary = Summary::from_directory(&directory, &report);

        assert_eq!(summary.total, 0);
        assert_eq!(
            summary.to_json()["requirements"]["total"],
            serde_json::json!(0)
        );
        assert_eq!(summary.to_json()["documents"], serde_json::json!(1));
        assert_eq!(
            summary.quiet_line(),
            format!(
                "documents=1 requirements=0 errors={} warnings={}",
                summary.errors, summary.warnings
            )
        );
        assert!(summary.errors + summary.warnings > 0);
    }
}
