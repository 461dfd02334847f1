use std::path::{Path, PathBuf};

mod check;
mod list;
mod show;
mod status;
mod terminal;

use check::Check;
use clap::ArgAction;
use guidelint::{
    domain::Level, storage::directory::CONFIG_DIR, Directory, Keyword, RequirementId, Rule,
};
use list::List;
use show::Show;
use status::Status;
use tracing::instrument;

/// Parse a requirement ID from a string, normalizing to lowercase.
///
/// IDs are lowercase in the corpus; accepting any case here saves users
/// from retyping an ID copied out of a heading.
fn parse_id(s: &str) -> Result<RequirementId, String> {
    s.to_lowercase().parse().map_err(|e| format!("{e}"))
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The path to the root of the documentation tree
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show requirement counts and lint totals (default)
    Status(Status),

    /// Set up configuration and requirement include templates
    Init,

    /// Check the corpus and report violations
    #[command(alias = "validate")]
    Check(Check),

    /// List requirements with filters
    List(List),

    /// Show detailed information about a requirement
    Show(Show),

    /// Show or modify configuration settings
    Config(Config),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(root)?,
            Self::Init => Init::run(&root)?,
            Self::Check(command) => command.run(root)?,
            Self::List(command) => command.run(root)?,
            Self::Show(command) => command.run(root)?,
            Self::Config(command) => command.run(&root)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {}

impl Init {
    #[instrument]
    fn run(root: &Path) -> anyhow::Result<()> {
        use std::fs;

        let config_dir = root.join(CONFIG_DIR);
        if config_dir.exists() {
            anyhow::bail!("Corpus already initialized (found existing {CONFIG_DIR} directory)");
        }

        fs::create_dir_all(&config_dir)
            .map_err(|e| anyhow::anyhow!("Failed to create {CONFIG_DIR} directory: {e}"))?;

        let config = guidelint::Config::default();
        config
            .save(&Directory::config_path(root))
            .map_err(|e| anyhow::anyhow!("Failed to create config.toml: {e}"))?;

        println!("Initialized guideline corpus in {}", root.display());
        println!("  Created: {CONFIG_DIR}/config.toml");

        let template_dir = config
            .include_dir()
            .join(config.requirement_include());
        fs::create_dir_all(root.join(&template_dir))
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", template_dir.display()))?;

        for keyword in config.keywords() {
            let path = template_dir.join(keyword.as_str());
            if root.join(&path).exists() {
                println!("  Kept:    {}", path.display());
                continue;
            }
            fs::write(root.join(&path), requirement_template(*keyword))
                .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", path.display()))?;
            println!("  Created: {}", path.display());
        }

        println!();
        println!("Next steps:");
        println!(
            "  Annotate a guideline: {{% include {}/MUST id=\"general-example\" %}} ...",
            config.requirement_include()
        );
        println!("  guidelint check");

        Ok(())
    }
}

/// The include template rendered in place of a requirement annotation.
fn requirement_template(keyword: Keyword) -> String {
    let label = keyword.as_str().replace("NOT", " NOT");
    let class = keyword.as_str().to_lowercase();
    format!(
        "{{% if include.id %}}<a href=\"#{{{{ include.id }}}}\" name=\"{{{{ include.id }}}}\" \
         class=\"requirement-id\">&#x2609;</a> {{% endif %}}<span class=\"requirement \
         requirement-{class}\">{label}</span>\n"
    )
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, clap::Parser)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Override the level of a rule
    SetLevel {
        /// The rule code, e.g. `unknown-prefix`
        #[arg(value_parser = parse_rule)]
        rule: Rule,
        /// `error`, `warning` or `off`
        #[arg(value_parser = parse_level)]
        level: Level,
    },

    /// Add an allowed ID prefix
    AddPrefix {
        /// The prefix, e.g. `python`
        prefix: String,
    },
}

fn parse_rule(value: &str) -> Result<Rule, String> {
    Rule::ALL
        .into_iter()
        .find(|rule| rule.code() == value)
        .ok_or_else(|| {
            let codes: Vec<_> = Rule::ALL.iter().map(|rule| rule.code()).collect();
            format!("unknown rule '{value}', expected one of: {}", codes.join(", "))
        })
}

fn parse_level(value: &str) -> Result<Level, String> {
    match value.to_ascii_lowercase().as_str() {
        "error" => Ok(Level::Error),
        "warning" | "warn" => Ok(Level::Warning),
        "off" => Ok(Level::Off),
        _ => Err(format!("unknown level '{value}', expected error, warning or off")),
    }
}

impl Config {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        use terminal::Colorize;

        let config_path = Directory::config_path(root);
        let mut config = if config_path.exists() {
            guidelint::Config::load(&config_path).map_err(|e| anyhow::anyhow!("{e}"))?
        } else {
            guidelint::Config::default()
        };

        match self.command {
            ConfigCommand::Show => {
                if !config_path.exists() {
                    println!("{}", "# defaults (no config file found)".dim());
                }
                print!("{}", config.to_toml().map_err(|e| anyhow::anyhow!("{e}"))?);
                return Ok(());
            }
            ConfigCommand::SetLevel { rule, level } => {
                config.set_level(rule, level);
                println!(
                    "{}",
                    format!("Rule {rule} set to {}", level_name(level)).success()
                );
            }
            ConfigCommand::AddPrefix { prefix } => {
                if config.add_prefix(&prefix) {
                    println!("{}", format!("Added allowed prefix '{prefix}'").success());
                } else {
                    println!("{}", format!("Prefix '{prefix}' is already allowed").info());
                    return Ok(());
                }
            }
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        config
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        Ok(())
    }
}

const fn level_name(level: Level) -> &'static str {
    match level {
        Level::Error => "error",
        Level::Warning => "warning",
        Level::Off => "off",
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn init_creates_config_and_templates() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();

        Init::run(root).expect("init should succeed");

        assert!(Directory::config_path(root).exists());
        for keyword in Keyword::ALL {
            let template = root.join("_includes/requirement").join(keyword.as_str());
            assert!(template.exists(), "missing {}", template.display());
        }

        let report = Directory::new(root).unwrap().lint(&[]).unwrap();
        assert!(report.violations.is_empty());
    }

    #[test]
    fn init_keeps_existing_templates() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        let must = root.join("_includes/requirement/MUST");
        std::fs::create_dir_all(must.parent().unwrap()).unwrap();
        std::fs::write(&must, "custom").unwrap();

        Init::run(root).unwrap();

        assert_eq!(std::fs::read_to_string(must).unwrap(), "custom");
    }

    #[test]
    fn init_twice_fails() {
        let tmp = tempdir().unwrap();
        Init::run(tmp.path()).unwrap();
        assert!(Init::run(tmp.path()).is_err());
    }

    #[test]
    fn templates_render_keyword_label() {
        let template = requirement_template(Keyword::MustNot);
        assert!(template.contains(">MUST NOT</span>"));
        assert!(template.contains("requirement-mustnot"));
        assert!(template.contains("{{ include.id }}"));
    }

    #[test]
    fn set_level_persists() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();

        Config {
            command: ConfigCommand::SetLevel {
                rule: Rule::UnknownPrefix,
                level: Level::Error,
            },
        }
        .run(root)
        .unwrap();

        let config = guidelint::Config::load(&Directory::config_path(root)).unwrap();
        assert_eq!(config.level(Rule::UnknownPrefix), Level::Error);
    }

    #[test]
    fn add_prefix_persists() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();

        Config {
            command: ConfigCommand::AddPrefix {
                prefix: "Python".to_string(),
            },
        }
        .run(root)
        .unwrap();

        let config = guidelint::Config::load(&Directory::config_path(root)).unwrap();
        assert!(config.is_prefix_allowed("python"));
    }

    #[test]
    fn parses_rules_and_levels() {
        assert_eq!(parse_rule("duplicate-id"), Ok(Rule::DuplicateId));
        assert!(parse_rule("duplicate_id").is_err());
        assert_eq!(parse_level("WARN"), Ok(Level::Warning));
        assert!(parse_level("fatal").is_err());
    }

    #[test]
    fn ids_are_case_insensitive_on_the_command_line() {
        assert_eq!(
            parse_id("Python-Client-Sync").unwrap().as_str(),
            "python-client-sync"
        );
    }
}
