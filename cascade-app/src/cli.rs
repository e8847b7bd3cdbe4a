//! Command line definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cascade: walk dependent dropdown filters and verify the results they produce
#[derive(Parser, Debug)]
#[command(name = "cascade")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, default_value = "cascade.yaml", env = "CASCADE_CONFIG", global = true)]
    pub config: PathBuf,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read each level's options, selecting as instructed along the way
    Options(OptionsArgs),

    /// Enumerate every filter chain the page offers
    Chains,

    /// Enumerate chains, apply each one and verify the result table
    Run,
}

#[derive(Parser, Debug)]
pub struct OptionsArgs {
    /// Label to pick at a level, e.g. `--select country=US`
    #[arg(short, long = "select", value_name = "LEVEL=LABEL", value_parser = parse_selection)]
    pub selections: Vec<(String, String)>,
}

fn parse_selection(raw: &str) -> Result<(String, String), String> {
    let (level, label) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected LEVEL=LABEL, got '{raw}'"))?;
    let level = level.trim();
    let label = label.trim();
    if level.is_empty() || label.is_empty() {
        return Err(format!("level and label must be non-empty in '{raw}'"));
    }
    Ok((level.to_string(), label.to_string()))
}
