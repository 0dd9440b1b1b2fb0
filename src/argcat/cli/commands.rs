//! # CLI Layer
//!
//! The only place that knows about stdout, stderr and exit codes. `run()` parses the command
//! line, installs logging and hands off to one `handle_*` function per command.

use super::setup::{Cli, Commands};
use argcat::handler::FnHandler;
use argcat::recipe::Recipe;
use argcat::{
    ArgCat, ArgCatError, Arguments, DispatchOptions, HandlerEntry, HandlerProvider, Result,
};
use clap::Parser;
use std::path::Path;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ARGCAT_LOG";

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let use_color = if cli.no_color { Some(false) } else { None };

    match cli.command {
        Commands::Check { manifest } => handle_check(&manifest, cli.verbose, use_color),
        Commands::Run {
            manifest,
            subparser_ignore_main,
            args,
        } => handle_run(
            &manifest,
            cli.verbose,
            DispatchOptions {
                subparser_ignore_main,
            },
            args,
        ),
        Commands::Recipe { recipes } => handle_recipe(&recipes),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_check(manifest: &Path, verbose: bool, use_color: Option<bool>) -> Result<()> {
    let mut argcat = ArgCat::new(verbose);
    argcat.load(manifest)?;
    match use_color {
        Some(use_color) => print!("{}", argcat.render_parsers_with_color(use_color)),
        None => argcat.print_parsers(),
    }
    Ok(())
}

/// One handler per parser that returns exactly what it was given.
struct EchoHandlers {
    params: Vec<(String, Vec<String>)>,
}

impl EchoHandlers {
    fn for_parsers(argcat: &ArgCat) -> Result<Self> {
        let params = argcat
            .parsers()
            .iter()
            .map(|p| -> Result<(String, Vec<String>)> {
                Ok((p.name.clone(), argcat.required_params(&p.name)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { params })
    }
}

impl HandlerProvider for EchoHandlers {
    fn handlers(&self) -> Vec<HandlerEntry> {
        self.params
            .iter()
            .map(|(parser, params)| {
                HandlerEntry::new(
                    parser.clone(),
                    format!("echo_{parser}"),
                    FnHandler::new(params.clone(), |args: &Arguments| {
                        Ok(args.clone().into_value())
                    }),
                )
            })
            .collect()
    }
}

fn handle_run(
    manifest: &Path,
    verbose: bool,
    options: DispatchOptions,
    args: Vec<String>,
) -> Result<()> {
    let mut argcat = ArgCat::new(verbose);
    argcat.load(manifest)?;

    let echo = EchoHandlers::for_parsers(&argcat)?;
    let report = argcat.add_handler_provider(&echo)?;
    for rejected in &report.rejected {
        warn!(parser = %rejected.parser, reason = %rejected.reason, "echo handler rejected");
    }

    match argcat.try_parse_args_with(args, options) {
        Ok(dispatch) => {
            println!("{}", serde_json::to_string_pretty(&dispatch)?);
            Ok(())
        }
        // Usage errors, --help and --version of the described program, rendered by clap.
        Err(ArgCatError::Parse(e)) => e.exit(),
        Err(e) => Err(e),
    }
}

fn handle_recipe(recipes: &[String]) -> Result<()> {
    let specs = recipes
        .iter()
        .map(|recipe| Recipe::parse(recipe))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    println!("{}", serde_json::to_string_pretty(&specs)?);
    Ok(())
}
