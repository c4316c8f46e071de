use clap::{Parser, Subcommand};

/// Parses, validates, and emits GFF3 feature forests.
#[derive(Parser, Debug)]
#[command(name = "gff3cli", author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v for info, -vv for debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parses, resolves orphans, and runs registered expectations.
    Validate {
        /// Path to input GFF3, or '-' for stdin.
        #[arg(value_name = "input")]
        input: String,
    },
    /// Parses and re-serializes the forest to stdout.
    Emit {
        /// Path to input GFF3, or '-' for stdin.
        #[arg(value_name = "input")]
        input: String,

        /// Suppress lines for nodes created by multi-parent splitting.
        #[arg(long)]
        skip_duplicates: bool,
    },
}
