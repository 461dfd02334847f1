use std::path::PathBuf;

use clap::Parser;
use guidelint::{Check as Group, Directory, Report, Severity, Violation};
use tracing::instrument;

use super::terminal::{is_narrow, Colorize};

#[derive(Debug, Parser)]
#[command(about = "Check requirement annotations, references and includes")]
pub struct Check {
    /// Groups of rules to run (can be specified multiple times)
    #[arg(long, value_name = "TYPE")]
    check: Vec<CheckType>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress all output except the exit code
    #[arg(long, short)]
    quiet: bool,

    /// Treat warnings as errors
    #[arg(long)]
    deny_warnings: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum, PartialEq, Eq)]
enum CheckType {
    /// Annotation keywords are known and enabled
    Keywords,
    /// IDs are present, well formed, allowed and unique
    Ids,
    /// Links resolve to existing pages and anchors
    References,
    /// Include directives resolve and do not recurse
    Includes,
    /// Tags and front matter are well formed, annotations carry text
    Structure,
    /// Run all checks
    All,
}

impl CheckType {
    const fn group(self) -> Option<Group> {
        match self {
            Self::Keywords => Some(Group::Keywords),
            Self::Ids => Some(Group::Ids),
            Self::References => Some(Group::References),
            Self::Includes => Some(Group::Includes),
            Self::Structure => Some(Group::Structure),
            Self::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
    Summary,
}

impl Check {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let directory = Directory::new(root)?;

        let checks: Vec<Group> = if self.check.contains(&CheckType::All) {
            Vec::new()
        } else {
            self.check.iter().filter_map(|c| c.group()).collect()
        };

        let report = directory.lint(&checks)?;

        if !self.quiet {
            match self.output {
                OutputFormat::Table => Self::output_table(&report),
                OutputFormat::Json => self.output_json(&report)?,
                OutputFormat::Summary => Self::output_summary(&report),
            }
        }

        if !report.is_clean(self.deny_warnings) {
            std::process::exit(2);
        }

        Ok(())
    }

    fn output_table(report: &Report) {
        let narrow = is_narrow();

        for violation in &report.violations {
            print_violation(violation, narrow);
        }
        if !report.violations.is_empty() {
            println!();
        }

        println!(
            "Checked {} documents, {} requirements\n",
            report.documents, report.requirements
        );

        for group in &report.checks {
            let label = format!("{}:", group_label(*group));
            let count = report.for_check(*group).count();
            if count == 0 {
                println!("✓ {label:<12} no issues");
            } else {
                println!(
                    "{}",
                    format!("✗ {label:<12} {count} issues found").warning()
                );
            }
        }

        let errors = report.errors().count();
        let warnings = report.warnings().count();
        if errors == 0 && warnings == 0 {
            println!("\n{}", "Corpus is clean (0 issues)".success());
        } else {
            println!(
                "\n{}",
                format!("Summary: {errors} errors, {warnings} warnings").warning()
            );
            println!(
                "{}",
                "Run 'guidelint check --output json' for machine-readable output".dim()
            );
        }
    }

    fn output_json(&self, report: &Report) -> anyhow::Result<()> {
        use serde_json::json;

        let errors = report.errors().count();
        let warnings = report.warnings().count();
        let by_rule: serde_json::Map<_, _> = report
            .by_rule()
            .into_iter()
            .map(|(rule, count)| (rule.code().to_string(), json!(count)))
            .collect();

        let output = json!({
            "status": if report.is_clean(self.deny_warnings) { "clean" } else { "issues_found" },
            "checks": report.checks,
            "violations": report.violations,
            "summary": {
                "documents": report.documents,
                "requirements": report.requirements,
                "errors": errors,
                "warnings": warnings,
                "by_rule": by_rule,
            }
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_summary(report: &Report) {
        println!(
            "errors={} warnings={}",
            report.errors().count(),
            report.warnings().count()
        );
    }
}

fn print_violation(violation: &Violation, narrow: bool) {
    let severity = match violation.severity {
        Severity::Error => "error".error(),
        Severity::Warning => "warning".warning(),
    };
    let heading = format!("{severity}[{}]", violation.rule.code());

    if narrow {
        println!("{}", violation.location.to_string().dim());
        println!("  {heading}: {}", violation.message);
    } else {
        println!(
            "{} {heading}: {}",
            violation.location.to_string().dim(),
            violation.message
        );
    }
    if let Some(hint) = &violation.hint {
        println!("  {} {hint}", "= hint:".dim());
    }
}

const fn group_label(group: Group) -> &'static str {
    match group {
        Group::Keywords => "Keywords",
        Group::Ids => "IDs",
        Group::References => "References",
        Group::Includes => "Includes",
        Group::Structure => "Structure",
    }
}
