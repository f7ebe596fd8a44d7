//! Command-line definition

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// LetterDesk CLI
#[derive(Debug, Parser)]
#[command(name = "letterdesk-cli")]
#[command(author, version, about = "Draft, number and submit letters", long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (default: ./config.toml if present)
    #[arg(short, long, global = true, env = "LETTERDESK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a new draft
    ///
    /// Example: letterdesk-cli new --branch riyadh --subject Offer --recipient "ACME Ltd" --body "Dear ACME,"
    New {
        /// Branch the letter is written in
        #[arg(short, long)]
        branch: String,

        /// Numbering year (default: current year)
        #[arg(short, long)]
        year: Option<i32>,

        #[command(flatten)]
        content: ContentArgs,
    },

    /// Change fields of a saved draft
    Edit {
        /// Local id of the draft
        local_id: String,

        #[command(flatten)]
        content: ContentArgs,
    },

    /// List drafts in the local cache, newest first
    List,

    /// Show one draft with its sync state
    Show {
        /// Local id of the draft
        local_id: String,
    },

    /// Number and submit a draft
    ///
    /// When the letter repository is unreachable the draft is queued and
    /// submitted by the next `resync`.
    Finalize {
        /// Local id of the draft
        local_id: String,
    },

    /// Submit every completed draft still waiting for the repository
    Resync,

    /// Discard a draft
    Abandon {
        /// Local id of the draft
        local_id: String,
    },

    /// Check whether the letter repository is reachable
    Probe,

    /// Split a reference such as RY-42/2024 into its parts
    ParseReference {
        /// Reference string
        reference: String,
    },
}

/// Letter fields; each is optional so `edit` can change only some
#[derive(Debug, Default, Args)]
pub struct ContentArgs {
    #[arg(long)]
    pub subject: Option<String>,

    #[arg(long)]
    pub recipient: Option<String>,

    #[arg(long)]
    pub body: Option<String>,

    /// Template the letter is based on
    #[arg(long)]
    pub template: Option<String>,

    /// Template field as key=value (repeatable; value parsed as JSON when possible)
    #[arg(long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, serde_json::Value)>,
}

impl Commands {
    /// Whether the command needs the draft cache and letter repository
    pub const fn needs_runtime(&self) -> bool {
        !matches!(self, Self::ParseReference { .. })
    }
}

/// Determine log filter level from verbosity count
pub const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Parse `key=value`, keeping `value` as a string unless it is valid JSON
fn parse_field(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in '{raw}'"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(args)
    }

    #[test]
    fn log_filter_verbosity_levels() {
        assert_eq!(log_filter_from_verbosity(0), "warn");
        assert_eq!(log_filter_from_verbosity(1), "info");
        assert_eq!(log_filter_from_verbosity(2), "debug");
        assert_eq!(log_filter_from_verbosity(10), "trace");
    }

    #[test]
    fn parses_new_with_content() {
        let cli = parse(&[
            "letterdesk-cli",
            "new",
            "--branch",
            "riyadh",
            "--year",
            "2024",
            "--subject",
            "Offer",
            "--recipient",
            "ACME Ltd",
            "--body",
            "Dear ACME,",
            "--field",
            "amount=1200",
            "--field",
            "currency=SAR",
        ])
        .unwrap();

        let Commands::New {
            branch,
            year,
            content,
        } = cli.command
        else {
            unreachable!("expected New");
        };
        assert_eq!(branch, "riyadh");
        assert_eq!(year, Some(2024));
        assert_eq!(content.subject.as_deref(), Some("Offer"));
        assert_eq!(
            content.fields,
            vec![
                ("amount".to_string(), serde_json::json!(1200)),
                ("currency".to_string(), serde_json::json!("SAR")),
            ]
        );
    }

    #[test]
    fn new_requires_branch() {
        assert!(parse(&["letterdesk-cli", "new", "--subject", "Offer"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["letterdesk-cli", "list", "-vv", "--config", "desk.toml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("desk.toml")));
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn parses_parse_reference() {
        let cli = parse(&["letterdesk-cli", "parse-reference", "RY-42/2024"]).unwrap();
        assert!(!cli.command.needs_runtime());
        let Commands::ParseReference { reference } = cli.command else {
            unreachable!("expected ParseReference");
        };
        assert_eq!(reference, "RY-42/2024");
    }

    #[test]
    fn finalize_needs_runtime() {
        let cli = parse(&["letterdesk-cli", "finalize", "abc"]).unwrap();
        assert!(cli.command.needs_runtime());
    }

    #[test]
    fn field_without_equals_is_rejected() {
        assert!(parse_field("amount").is_err());
        assert!(parse_field("=1").is_err());
        assert_eq!(
            parse_field("note=a=b").unwrap(),
            ("note".to_string(), serde_json::json!("a=b"))
        );
    }
}
