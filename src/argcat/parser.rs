//! Turns a validated [`Manifest`] into a `clap::Command` tree.
//!
//! One root command carries the `main` arguments; every other parser becomes a subcommand, in
//! manifest order. Alongside the command, each parser keeps a [`ParserEntry`] with its resolved
//! dests, which is what the namespace splitter and the handler registry work from.

use crate::error::Result;
use crate::handler::HandlerSlot;
use crate::manifest::{
    scalar_text, Action, ArgumentSpec, GroupSpec, Manifest, Nargs, Ordered, ParserSpec, ValueType,
    MAIN,
};
use clap::builder::{PossibleValuesParser, TypedValueParser, ValueParser};
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use serde_json::Value;
use tracing::debug;

/// An argument with its dest resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArgument {
    pub dest: String,
    pub spec: ArgumentSpec,
    pub ignored_by_subparser: bool,
}

impl ResolvedArgument {
    pub fn is_positional(&self) -> bool {
        self.spec.is_positional()
    }

    /// The dest for positionals, the joined flags otherwise.
    pub fn display_name(&self) -> String {
        if self.is_positional() {
            self.dest.clone()
        } else {
            self.spec.name_or_flags.join(", ")
        }
    }
}

/// Runtime view of one parser.
#[derive(Debug)]
pub struct ParserEntry {
    pub name: String,
    pub help: Option<String>,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub arguments: Vec<ResolvedArgument>,
    pub groups: Ordered<GroupSpec>,
    pub handler: Option<HandlerSlot>,
}

impl ParserEntry {
    fn new(name: &str, spec: &ParserSpec) -> Self {
        let arguments = spec
            .arguments
            .iter()
            .filter_map(|arg| {
                arg.resolved_dest().map(|dest| ResolvedArgument {
                    dest,
                    spec: arg.clone(),
                    ignored_by_subparser: arg.is_ignored_by_subparser(),
                })
            })
            .collect();
        Self {
            name: name.to_string(),
            help: spec.help.clone(),
            description: spec.description.clone(),
            aliases: spec.aliases.clone(),
            arguments,
            groups: spec.argument_groups.clone(),
            handler: None,
        }
    }

    /// Dests in declaration order.
    pub fn dests(&self) -> Vec<&str> {
        self.arguments.iter().map(|a| a.dest.as_str()).collect()
    }

    pub fn argument(&self, dest: &str) -> Option<&ResolvedArgument> {
        self.arguments.iter().find(|a| a.dest == dest)
    }
}

#[derive(Debug)]
pub struct ParserTree {
    command: Command,
    entries: Vec<ParserEntry>,
}

impl ParserTree {
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        manifest.validate()?;

        let mut command = root_command(manifest);
        let mut entries = Vec::with_capacity(manifest.parsers.len());

        let main_spec = manifest.main().cloned().unwrap_or_default();
        let main = ParserEntry::new(MAIN, &main_spec);
        command = add_arguments(command, &main);
        entries.push(main);

        for (name, spec) in manifest.subparsers() {
            let entry = ParserEntry::new(name, spec);
            let mut sub = Command::new(name.to_string())
                .args_override_self(true)
                .visible_aliases(spec.aliases.clone());
            if let Some(about) = spec.help.as_ref().or(spec.description.as_ref()) {
                sub = sub.about(about.clone());
            }
            if let Some(description) = &spec.description {
                sub = sub.long_about(description.clone());
            }
            command = command.subcommand(add_arguments(sub, &entry));
            debug!(parser = name, dests = ?entry.dests(), "subparser created");
            entries.push(entry);
        }

        Ok(Self { command, entries })
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn entries(&self) -> &[ParserEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&ParserEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub(crate) fn entry_mut(&mut self, name: &str) -> Option<&mut ParserEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    /// The parameter names a handler of `parser` must declare.
    ///
    /// `main` needs every main dest. A subparser needs its own dests plus the main dests that
    /// are not ignored by subparsers.
    pub fn required_params(&self, parser: &str) -> Option<Vec<String>> {
        let main = self.entry(MAIN)?;
        let entry = self.entry(parser)?;
        if parser == MAIN {
            return Some(main.dests().into_iter().map(String::from).collect());
        }
        let mut params: Vec<String> = main
            .arguments
            .iter()
            .filter(|a| !a.ignored_by_subparser)
            .map(|a| a.dest.clone())
            .collect();
        params.extend(entry.dests().into_iter().map(String::from));
        Some(params)
    }

    pub fn render_usage(&self) -> String {
        self.command.clone().render_usage().to_string()
    }

    pub fn render_help(&self) -> String {
        self.command.clone().render_help().to_string()
    }

    /// Parses `args`, which must start with the program name.
    pub fn try_get_matches_from<I, T>(&self, args: I) -> std::result::Result<ArgMatches, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        self.command.clone().try_get_matches_from(args)
    }
}

fn root_command(manifest: &Manifest) -> Command {
    let meta = &manifest.meta;
    let prog = manifest.prog();
    let mut command = Command::new(prog.clone())
        .bin_name(prog)
        .disable_help_subcommand(true)
        .subcommand_precedence_over_arg(true)
        .args_override_self(true);

    if let Some(description) = &meta.description {
        command = command.about(description.clone());
    }
    // Subcommand section notes come before the epilog.
    let after_help: Vec<&str> = meta
        .subparser
        .iter()
        .flat_map(|sub| [sub.description.as_deref(), sub.help.as_deref()])
        .chain([meta.epilog.as_deref()])
        .flatten()
        .collect();
    if !after_help.is_empty() {
        command = command.after_help(after_help.join("\n\n"));
    }
    if let Some(usage) = &meta.usage {
        command = command.override_usage(usage.clone());
    }
    if let Some(version) = &meta.version {
        command = command.version(version.clone());
    }
    if !meta.add_help {
        command = command.disable_help_flag(true);
    }
    if let Some(sub) = &meta.subparser {
        if let Some(title) = &sub.title {
            command = command.subcommand_help_heading(title.clone());
        }
        if let Some(metavar) = &sub.metavar {
            command = command.subcommand_value_name(metavar.clone());
        }
        if sub.required {
            command = command.subcommand_required(true);
        }
    }
    command
}

fn add_arguments(mut command: Command, entry: &ParserEntry) -> Command {
    for resolved in &entry.arguments {
        let heading = resolved
            .spec
            .group
            .as_ref()
            .and_then(|name| group_heading(name, entry.groups.get(name)?));
        command = command.arg(build_arg(resolved, heading));
    }

    for (name, group) in entry.groups.iter() {
        if !group.is_mutually_exclusive {
            continue;
        }
        let members: Vec<String> = entry
            .arguments
            .iter()
            .filter(|a| a.spec.group.as_deref() == Some(name))
            .map(|a| a.dest.clone())
            .collect();
        if members.is_empty() {
            continue;
        }
        command = command.group(
            ArgGroup::new(name.to_string())
                .multiple(false)
                .required(group.required)
                .args(members),
        );
    }
    command
}

/// Plain groups become a help heading; exclusive groups only get one when they are described.
fn group_heading(name: &str, group: &GroupSpec) -> Option<String> {
    match &group.description {
        Some(description) => Some(format!("{name} ({description})")),
        None if !group.is_mutually_exclusive => Some(name.to_string()),
        None => None,
    }
}

fn build_arg(resolved: &ResolvedArgument, heading: Option<String>) -> Arg {
    let spec = &resolved.spec;
    let mut arg = Arg::new(resolved.dest.clone());

    if !spec.is_positional() {
        let mut longs = spec
            .name_or_flags
            .iter()
            .filter_map(|f| f.strip_prefix("--"));
        let mut shorts = spec
            .name_or_flags
            .iter()
            .filter(|f| !f.starts_with("--"))
            .filter_map(|f| f.strip_prefix('-'))
            .filter_map(|s| s.chars().next());
        if let Some(long) = longs.next() {
            arg = arg.long(long.to_string());
        }
        for alias in longs {
            arg = arg.visible_alias(alias.to_string());
        }
        if let Some(short) = shorts.next() {
            arg = arg.short(short);
        }
        for alias in shorts {
            arg = arg.visible_short_alias(alias);
        }
        if let Some(required) = spec.required {
            arg = arg.required(required);
        }
    }

    arg = match spec.action {
        Action::Store | Action::Append => {
            let action = if spec.action == Action::Append {
                ArgAction::Append
            } else {
                ArgAction::Set
            };
            let mut arg = apply_nargs(arg.action(action).value_parser(value_parser(spec)), spec);
            if let Some(text) = spec.const_value.as_ref().and_then(scalar_text) {
                arg = arg.default_missing_value(text);
            }
            apply_default(arg, spec)
        }
        // The const is filled in by the namespace splitter.
        Action::StoreConst => arg.action(ArgAction::SetTrue),
        Action::StoreTrue | Action::StoreFalse => {
            let action = if spec.action == Action::StoreTrue {
                ArgAction::SetTrue
            } else {
                ArgAction::SetFalse
            };
            let default = spec
                .default
                .as_ref()
                .and_then(|d| ValueType::Bool.convert_value(d).ok())
                .and_then(|d| d.as_bool());
            match default {
                Some(default) => arg.action(action).default_value(default.to_string()),
                None => arg.action(action),
            }
        }
        Action::Count => arg.action(ArgAction::Count),
    };

    if let Some(help) = &spec.help {
        arg = arg.help(help.clone());
    }
    if let Some(metavar) = &spec.metavar {
        arg = arg.value_name(metavar.clone());
    }
    if let Some(heading) = heading {
        arg = arg.help_heading(heading);
    }
    arg
}

fn value_parser(spec: &ArgumentSpec) -> ValueParser {
    let value_type = spec.value_type;
    if spec.choices.is_empty() {
        ValueParser::new(move |raw: &str| value_type.convert(raw))
    } else {
        let names: Vec<String> = spec.choices.iter().filter_map(scalar_text).collect();
        ValueParser::new(
            PossibleValuesParser::new(names).try_map(move |raw: String| value_type.convert(&raw)),
        )
    }
}

fn apply_nargs(arg: Arg, spec: &ArgumentSpec) -> Arg {
    let positional = spec.is_positional();
    let arg = match spec.nargs {
        None => arg,
        Some(Nargs::Optional) if positional => arg.num_args(1),
        Some(Nargs::Optional) => arg.num_args(0..=1),
        Some(Nargs::ZeroOrMore) if positional => arg.num_args(1..),
        Some(Nargs::ZeroOrMore) => arg.num_args(0..),
        Some(Nargs::OneOrMore) => arg.num_args(1..),
        Some(Nargs::Exactly(n)) => arg.num_args(n),
    };
    if positional {
        arg.required(spec.is_required())
    } else {
        arg
    }
}

fn apply_default(arg: Arg, spec: &ArgumentSpec) -> Arg {
    match &spec.default {
        Some(Value::Array(items)) => {
            let texts: Vec<String> = items.iter().filter_map(scalar_text).collect();
            arg.default_values(texts)
        }
        Some(scalar) => match scalar_text(scalar) {
            Some(text) => arg.default_value(text),
            None => arg,
        },
        None => arg,
    }
}
