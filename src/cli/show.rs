use std::path::PathBuf;

use clap::Parser;
use guidelint::{Directory, RequirementId, RequirementView, domain::Link};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Display detailed information about a requirement")]
pub struct Show {
    /// The ID of the requirement to display
    #[clap(value_parser = super::parse_id)]
    id: RequirementId,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let directory = Directory::new(root)?;
        let corpus = directory.corpus();

        let mut definitions = corpus.definitions();
        let Some(sites) = definitions.remove(&self.id) else {
            eprintln!("Requirement {} not found", self.id);
            std::process::exit(1);
        };
        let backlinks = corpus.references_to(&self.id);

        match self.output {
            OutputFormat::Table => Self::output_table(&sites, &backlinks),
            OutputFormat::Json => Self::output_json(&sites, &backlinks)?,
        }

        Ok(())
    }

    fn output_table(sites: &[RequirementView<'_>], backlinks: &[&Link]) {
        let Some((req, duplicates)) = sites.split_first() else {
            return;
        };

        println!("# {}", req.id);
        println!("{}\n", req.text());

        println!("{}", "Metadata".dim());
        println!("  Keyword:   {}", req.annotation.keyword);
        if let Some(keyword) = req.keyword() {
            println!("  Strength:  {:?}", keyword.strength());
        }
        println!("  Location:  {}", req.location());
        if let Some(title) = req.page_title() {
            println!("  Page:      {title}");
        }

        if !duplicates.is_empty() {
            println!("\n{}", "Also defined at".dim());
            for duplicate in duplicates {
                println!("  • {} ⚠️", duplicate.location().to_string().warning());
            }
        }

        if !backlinks.is_empty() {
            println!("\n{}", "Referenced from".dim());
            for link in backlinks {
                println!("  • {} ({})", link.location, link.target.dim());
            }
        }
    }

    fn output_json(sites: &[RequirementView<'_>], backlinks: &[&Link]) -> anyhow::Result<()> {
        use serde_json::json;

        let Some((req, duplicates)) = sites.split_first() else {
            return Ok(());
        };

        let backlinks: Vec<_> = backlinks
            .iter()
            .map(|link| {
                json!({
                    "location": link.location,
                    "target": link.target,
                })
            })
            .collect();

        let mut output = serde_json::to_value(req)?;
        output["page"] = json!(req.page_title());
        output["duplicates"] = json!(
            duplicates
                .iter()
                .map(|duplicate| duplicate.location())
                .collect::<Vec<_>>()
        );
        output["backlinks"] = json!(backlinks);

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}
