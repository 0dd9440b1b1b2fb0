//! Parser and handler listings.
//!
//! Each listing has a plain `render_*` function taking `use_color: Option<bool>`: `None` lets
//! `outstanding` detect the terminal, `Some` forces the choice.
use crate::manifest::{scalar_text, Action, ArgumentSpec, MAIN};
use crate::parser::{ParserEntry, ParserTree, ResolvedArgument};
use crate::styles::ARGCAT_THEME;
use crate::templates::{HANDLERS_TEMPLATE, PARSERS_TEMPLATE};
use outstanding::Renderer;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

pub const NO_PARSER: &str = "ArgCat does not have any parser.";

#[derive(Serialize)]
struct ParsersData {
    prog: String,
    description: Option<String>,
    parsers: Vec<ParserData>,
    name_width: usize,
    kind_width: usize,
}

#[derive(Serialize)]
struct ParserData {
    name: String,
    aliases: String,
    help: Option<String>,
    arguments: Vec<ArgumentData>,
}

#[derive(Serialize)]
struct ArgumentData {
    name: String,
    kind: String,
    help: String,
    notes: String,
}

#[derive(Serialize)]
struct HandlersData {
    parsers: Vec<HandlerData>,
    width: usize,
}

#[derive(Serialize)]
struct HandlerData {
    name: String,
    handler: Option<String>,
    is_default: bool,
}

pub fn render_parsers(tree: Option<&ParserTree>, use_color: Option<bool>) -> String {
    let tree = match tree {
        Some(tree) => tree,
        None => return format!("{}\n", NO_PARSER),
    };
    let command = tree.command();
    let parsers: Vec<ParserData> = tree.entries().iter().map(parser_data).collect();
    let arguments = parsers.iter().flat_map(|p| p.arguments.iter());
    let name_width = arguments
        .clone()
        .map(|a| UnicodeWidthStr::width(a.name.as_str()))
        .max()
        .unwrap_or(0);
    let kind_width = arguments
        .map(|a| UnicodeWidthStr::width(a.kind.as_str()))
        .max()
        .unwrap_or(0);

    let data = ParsersData {
        prog: command.get_name().to_string(),
        description: command.get_about().map(|about| about.to_string()),
        parsers,
        name_width,
        kind_width,
    };
    render("parsers", PARSERS_TEMPLATE, &data, use_color)
}

pub fn render_handlers(tree: Option<&ParserTree>, use_color: Option<bool>) -> String {
    let tree = match tree {
        Some(tree) => tree,
        None => return format!("{}\n", NO_PARSER),
    };
    let parsers: Vec<HandlerData> = tree
        .entries()
        .iter()
        .map(|entry| HandlerData {
            name: entry.name.clone(),
            handler: entry.handler.as_ref().map(|slot| {
                format!("{}({})", slot.name, slot.handler.params().join(", "))
            }),
            is_default: entry.handler.as_ref().map(|s| s.is_default).unwrap_or(false),
        })
        .collect();
    let width = parsers
        .iter()
        .map(|p| UnicodeWidthStr::width(p.name.as_str()))
        .max()
        .unwrap_or(0);
    render("handlers", HANDLERS_TEMPLATE, &HandlersData { parsers, width }, use_color)
}

fn render<T: Serialize>(name: &str, source: &str, data: &T, use_color: Option<bool>) -> String {
    let theme = ARGCAT_THEME.clone();
    let mut renderer = match use_color {
        Some(use_color) => Renderer::with_color(theme, use_color),
        None => Renderer::new(theme),
    };
    renderer
        .add_template(name, source)
        .and_then(|_| renderer.render(name, data))
        .unwrap_or_else(|e| format!("Render error: {}\n", e))
}

fn parser_data(entry: &ParserEntry) -> ParserData {
    ParserData {
        name: entry.name.clone(),
        aliases: entry.aliases.join(", "),
        help: entry.help.clone().or_else(|| entry.description.clone()),
        arguments: entry
            .arguments
            .iter()
            .map(|arg| argument_data(entry, arg))
            .collect(),
    }
}

fn argument_data(entry: &ParserEntry, arg: &ResolvedArgument) -> ArgumentData {
    let spec = &arg.spec;
    let mut notes = Vec::new();
    if let Some(group) = &spec.group {
        let exclusive = entry
            .groups
            .get(group)
            .map(|g| g.is_mutually_exclusive)
            .unwrap_or(false);
        if exclusive {
            notes.push(format!("group: {group}, exclusive"));
        } else {
            notes.push(format!("group: {group}"));
        }
    }
    if !arg.is_positional() && spec.required == Some(true) {
        notes.push("required".to_string());
    }
    if let Some(default) = &spec.default {
        let text = scalar_text(default).unwrap_or_else(|| default.to_string());
        notes.push(format!("default: {text}"));
    }
    if !spec.choices.is_empty() {
        let choices: Vec<String> = spec
            .choices
            .iter()
            .map(|c| scalar_text(c).unwrap_or_else(|| c.to_string()))
            .collect();
        notes.push(format!("choices: {}", choices.join(", ")));
    }
    if entry.name == MAIN && !arg.ignored_by_subparser {
        notes.push("passed to subparsers".to_string());
    }

    ArgumentData {
        name: arg.display_name(),
        kind: kind(spec),
        help: spec.help.clone().unwrap_or_default(),
        notes: if notes.is_empty() {
            String::new()
        } else {
            format!("[{}]", notes.join("; "))
        },
    }
}

fn kind(spec: &ArgumentSpec) -> String {
    match spec.action {
        Action::Store | Action::Append => {
            let mut kind = spec.value_type.as_str().to_string();
            if let Some(nargs) = spec.nargs {
                kind.push_str(&format!(" {nargs}"));
            }
            if spec.action == Action::Append {
                kind.push_str(" append");
            }
            kind
        }
        Action::StoreConst => match spec.const_value.as_ref().and_then(scalar_text) {
            Some(value) => format!("const={value}"),
            None => Action::StoreConst.as_str().to_string(),
        },
        other => other.as_str().to_string(),
    }
}
