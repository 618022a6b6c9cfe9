use std::path::PathBuf;

use agent_wrap_api::AgentWrapApi;
use agent_wrap_core::{candidate_identifiers, normalize_identifier};
use agent_wrap_sheets::{
    FixtureSource, SheetsClient, SheetsConfig, DEFAULT_ACTIVITY_RANGE, DEFAULT_PROFILE_RANGE,
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

const CLI_CONTRACT_VERSION: &str = "cli.v1";

#[derive(Debug, Parser)]
#[command(name = "aw")]
#[command(about = "Agent year-in-review CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve one agent's summary against the configured store or a fixture.
    Lookup(LookupArgs),
    /// Show the identifier variants a lookup would try, without a fetch.
    Candidates(CandidatesArgs),
}

#[derive(Debug, Args)]
struct LookupArgs {
    mobile: String,

    /// Read rows from a JSON fixture instead of the live store.
    #[arg(long)]
    fixture: Option<PathBuf>,

    #[arg(long, env = "AGENT_WRAP_SPREADSHEET_ID")]
    spreadsheet_id: Option<String>,
    #[arg(long, env = "AGENT_WRAP_API_KEY")]
    api_key: Option<String>,
    #[arg(long, default_value = DEFAULT_ACTIVITY_RANGE)]
    activity_range: String,
    #[arg(long, default_value = DEFAULT_PROFILE_RANGE)]
    profile_range: String,
}

#[derive(Debug, Args)]
struct CandidatesArgs {
    identifier: String,
}

#[derive(Debug, Serialize)]
struct CliEnvelope<T>
where
    T: Serialize,
{
    cli_contract_version: &'static str,
    data: T,
}

fn print_envelope<T>(data: T) -> Result<()>
where
    T: Serialize,
{
    let envelope = CliEnvelope { cli_contract_version: CLI_CONTRACT_VERSION, data };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn lookup(args: LookupArgs) -> Result<()> {
    let api = if let Some(fixture) = args.fixture {
        AgentWrapApi::new(FixtureSource::new(fixture))
    } else {
        let Some(spreadsheet_id) = args.spreadsheet_id else {
            bail!("--spreadsheet-id (or AGENT_WRAP_SPREADSHEET_ID) is required without --fixture");
        };
        let Some(api_key) = args.api_key else {
            bail!("--api-key (or AGENT_WRAP_API_KEY) is required without --fixture");
        };
        AgentWrapApi::new(SheetsClient::new(SheetsConfig {
            spreadsheet_id,
            api_key,
            activity_range: args.activity_range,
            profile_range: args.profile_range,
        }))
    };

    let summary =
        api.resolve_agent_summary(&args.mobile).context("failed to read the backing store")?;
    print_envelope(summary)
}

fn candidates(args: CandidatesArgs) -> Result<()> {
    let normalized = normalize_identifier(&args.identifier);
    let candidates = candidate_identifiers(&args.identifier);
    print_envelope(json!({
        "identifier": args.identifier,
        "normalized": normalized,
        "candidates": candidates,
    }))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Lookup(args) => lookup(args),
        Command::Candidates(args) => candidates(args),
    }
}
