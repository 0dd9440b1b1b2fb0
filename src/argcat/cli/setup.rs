use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "argcat",
    bin_name = "argcat",
    version,
    disable_help_subcommand = true
)]
#[command(about = "Validate and try out ArgCat manifests", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log parser lifecycle events
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, help_heading = "Options")]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a manifest and list its parsers
    Check {
        /// Manifest file (.yml, .yaml or .json)
        manifest: PathBuf,
    },

    /// Parse arguments against a manifest and print what each handler receives
    Run {
        /// Manifest file (.yml, .yaml or .json)
        manifest: PathBuf,

        /// Skip the main handler whenever a subcommand is given
        #[arg(long)]
        subparser_ignore_main: bool,

        /// Arguments for the described program, after `--`
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Expand argument recipes into specs
    Recipe {
        /// Recipes such as "-f/--file -> filename : str ? # The target file."
        #[arg(required = true, allow_hyphen_values = true)]
        recipes: Vec<String>,
    },
}
