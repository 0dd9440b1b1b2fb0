//! # Manifest
//!
//! The manifest is the declarative tree ArgCat builds parsers from:
//!
//! ```text
//! meta:                       program metadata (+ `subparser:` metadata)
//! parsers:
//!   main:                     always present, the root command
//!     arguments: [...]
//!   <name>:                   one entry per subcommand, in document order
//!     help / description / aliases
//!     argument_groups: { <group>: { description, is_mutually_exclusive, required } }
//!     arguments: [...]        maps, or recipe strings (see [`crate::recipe`])
//! ```
//!
//! Manifests are read from YAML or JSON files ([`Manifest::from_path`]) or assembled with the
//! fluent builder ([`crate::builder`]). Either way they go through [`Manifest::validate`] before
//! any clap object is created, so a bad manifest is reported as a [`ManifestError`] instead of a
//! clap debug assertion.

use crate::error::{ManifestError, Result};
use crate::recipe::Recipe;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;
use std::str::FromStr;

/// Name of the root parser.
pub const MAIN: &str = "main";

const DEFAULT_PROG: &str = "argcat";
const HELP_FLAGS: [&str; 2] = ["-h", "--help"];
const VERSION_FLAGS: [&str; 2] = ["-V", "--version"];

/// A name-keyed collection that keeps document order.
///
/// Serialized as a plain map. Parser and group order is user-visible (help output, dest order),
/// so a hash map is not an option here.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordered<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Ordered<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Appends a new entry. Returns `false`, leaving the collection untouched, if the name exists.
    pub fn insert(&mut self, name: impl Into<String>, value: T) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.push((name, value));
        true
    }

    fn insert_first(&mut self, name: impl Into<String>, value: T) {
        self.entries.insert(0, (name.into(), value));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Serialize> Serialize for Ordered<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct OrderedVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de> + Default> Visitor<'de> for OrderedVisitor<T> {
    type Value = Ordered<T>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of named entries")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(Ordered::new())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut ordered = Ordered::new();
        while let Some(name) = map.next_key::<String>()? {
            // `init:` with nothing below it is a parser without arguments.
            let value = map.next_value::<Option<T>>()?.unwrap_or_default();
            if !ordered.insert(name.clone(), value) {
                return Err(de::Error::custom(format!(
                    "`{name}` is defined more than once"
                )));
            }
        }
        Ok(ordered)
    }
}

impl<'de, T: Deserialize<'de> + Default> Deserialize<'de> for Ordered<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

/// The type command-line tokens are converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    #[serde(alias = "string")]
    Str,
    #[serde(alias = "integer")]
    Int,
    Float,
    #[serde(alias = "boolean")]
    Bool,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Str => "str",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
        }
    }

    /// Converts one raw token into a JSON value of this type.
    pub fn convert(&self, raw: &str) -> std::result::Result<Value, String> {
        match self {
            ValueType::Str => Ok(Value::String(raw.to_string())),
            ValueType::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("invalid int value: '{raw}'")),
            ValueType::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("invalid float value: '{raw}'")),
            ValueType::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("invalid bool value: '{raw}'")),
            },
        }
    }

    /// Converts a manifest scalar (a default, a const or a choice).
    pub fn convert_value(&self, value: &Value) -> std::result::Result<Value, String> {
        let text = scalar_text(value).ok_or_else(|| "expected a scalar".to_string())?;
        self.convert(&text)
    }
}

impl FromStr for ValueType {
    type Err = ManifestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "str" | "string" => Ok(ValueType::Str),
            "int" | "integer" => Ok(ValueType::Int),
            "float" => Ok(ValueType::Float),
            "bool" | "boolean" => Ok(ValueType::Bool),
            other => Err(ManifestError::UnknownType(other.to_string())),
        }
    }
}

/// How many tokens an argument consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NargsRepr", into = "NargsRepr")]
pub enum Nargs {
    /// `?`
    Optional,
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
    /// `N`
    Exactly(usize),
}

impl Nargs {
    /// Whether the parsed value is a list.
    pub fn is_multiple(&self) -> bool {
        !matches!(self, Nargs::Optional)
    }

    /// Whether the argument may be given with no value at all.
    pub fn accepts_none(&self) -> bool {
        matches!(self, Nargs::Optional | Nargs::ZeroOrMore)
    }

    fn takes_many_tokens(&self) -> bool {
        match self {
            Nargs::Optional => false,
            Nargs::Exactly(n) => *n > 1,
            Nargs::ZeroOrMore | Nargs::OneOrMore => true,
        }
    }
}

impl fmt::Display for Nargs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nargs::Optional => f.write_str("?"),
            Nargs::ZeroOrMore => f.write_str("*"),
            Nargs::OneOrMore => f.write_str("+"),
            Nargs::Exactly(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for Nargs {
    type Err = ManifestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "?" => Ok(Nargs::Optional),
            "*" => Ok(Nargs::ZeroOrMore),
            "+" => Ok(Nargs::OneOrMore),
            other => match other.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Nargs::Exactly(n)),
                _ => Err(ManifestError::InvalidNargs(s.to_string())),
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NargsRepr {
    Count(usize),
    Symbol(String),
}

impl TryFrom<NargsRepr> for Nargs {
    type Error = ManifestError;

    fn try_from(repr: NargsRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            NargsRepr::Count(0) => Err(ManifestError::InvalidNargs("0".to_string())),
            NargsRepr::Count(n) => Ok(Nargs::Exactly(n)),
            NargsRepr::Symbol(s) => s.parse(),
        }
    }
}

impl From<Nargs> for NargsRepr {
    fn from(nargs: Nargs) -> Self {
        match nargs {
            Nargs::Exactly(n) => NargsRepr::Count(n),
            other => NargsRepr::Symbol(other.to_string()),
        }
    }
}

/// What happens when an argument is met on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    Store,
    StoreConst,
    StoreTrue,
    StoreFalse,
    Append,
    Count,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Store => "store",
            Action::StoreConst => "store_const",
            Action::StoreTrue => "store_true",
            Action::StoreFalse => "store_false",
            Action::Append => "append",
            Action::Count => "count",
        }
    }

    /// Whether the action consumes values (as opposed to being a bare flag).
    pub fn takes_values(&self) -> bool {
        matches!(self, Action::Store | Action::Append)
    }
}

impl FromStr for Action {
    type Err = ManifestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "store" => Ok(Action::Store),
            "store_const" => Ok(Action::StoreConst),
            "store_true" => Ok(Action::StoreTrue),
            "store_false" => Ok(Action::StoreFalse),
            "append" => Ok(Action::Append),
            "count" => Ok(Action::Count),
            other => Err(ManifestError::UnknownAction(other.to_string())),
        }
    }
}

/// One argument of a parser.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArgumentSpec {
    /// A positional name (`detail`) or flags (`-f`, `--file`).
    #[serde(deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub name_or_flags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nargs: Option<Nargs>,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metavar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Only meaningful for `main` arguments: keep the value out of subparser handlers.
    /// Manifest arguments default to `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored_by_subparser: Option<bool>,
}

impl ArgumentSpec {
    pub fn new<I, S>(name_or_flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name_or_flags: name_or_flags.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn nargs(mut self, nargs: Nargs) -> Self {
        self.nargs = Some(nargs);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn default_value(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn const_value(mut self, value: impl Into<Value>) -> Self {
        self.const_value = Some(value.into());
        self
    }

    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn ignored_by_subparser(mut self, ignored: bool) -> Self {
        self.ignored_by_subparser = Some(ignored);
        self
    }

    pub fn is_positional(&self) -> bool {
        !self.name_or_flags.iter().any(|n| n.starts_with('-'))
    }

    /// The name the parsed value is stored under: `dest`, else the first long flag, else the first
    /// short flag, else the positional name. Dashes become underscores.
    pub fn resolved_dest(&self) -> Option<String> {
        if let Some(dest) = &self.dest {
            return Some(dest.clone());
        }
        let raw = if self.is_positional() {
            self.name_or_flags.first().map(String::as_str)
        } else {
            let long = self
                .name_or_flags
                .iter()
                .find_map(|f| f.strip_prefix("--"));
            long.or_else(|| {
                self.name_or_flags
                    .iter()
                    .find_map(|f| f.strip_prefix('-'))
            })
        };
        raw.filter(|s| !s.is_empty()).map(|s| s.replace('-', "_"))
    }

    /// Whether a value must be supplied on the command line.
    pub fn is_required(&self) -> bool {
        if self.is_positional() {
            // A default alone does not make a positional optional.
            !self.nargs.map(|n| n.accepts_none()).unwrap_or(false)
        } else {
            self.required.unwrap_or(false)
        }
    }

    /// The `ignored_by_subparser` flag as the manifest defines it.
    pub fn is_ignored_by_subparser(&self) -> bool {
        self.ignored_by_subparser.unwrap_or(true)
    }
}

/// An argument group of a parser.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_mutually_exclusive: bool,
    /// Mutually exclusive groups only: one member must be given.
    pub required: bool,
}

/// A parser: `main` or one subcommand.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(deserialize_with = "deserialize_arguments")]
    pub arguments: Vec<ArgumentSpec>,
    #[serde(skip_serializing_if = "Ordered::is_empty")]
    pub argument_groups: Ordered<GroupSpec>,
}

/// Metadata of the subcommand section of `main`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubparsersMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metavar: Option<String>,
    pub required: bool,
}

/// Program metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProgramMeta {
    /// Program name; defaults to the running executable's name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epilog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub add_help: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subparser: Option<SubparsersMeta>,
}

impl Default for ProgramMeta {
    fn default() -> Self {
        Self {
            prog: None,
            description: None,
            epilog: None,
            usage: None,
            version: None,
            add_help: true,
            subparser: None,
        }
    }
}

/// The whole declarative tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    pub meta: ProgramMeta,
    pub parsers: Ordered<ParserSpec>,
}

impl Default for Manifest {
    fn default() -> Self {
        let mut parsers = Ordered::new();
        parsers.insert(MAIN, ParserSpec::default());
        Self {
            meta: ProgramMeta::default(),
            parsers,
        }
    }
}

impl Manifest {
    /// Loads a manifest file. `.json` files are read as JSON, anything else as YAML.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(ManifestError::Empty.into());
        }
        let manifest: Manifest = serde_yaml::from_str(content)?;
        manifest.finish()
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(ManifestError::Empty.into());
        }
        let manifest: Manifest = serde_json::from_str(content)?;
        manifest.finish()
    }

    fn finish(mut self) -> Result<Self> {
        self.ensure_main();
        self.validate()?;
        Ok(self)
    }

    /// Makes sure the `main` parser exists, in first position.
    pub(crate) fn ensure_main(&mut self) {
        if !self.parsers.contains(MAIN) {
            self.parsers.insert_first(MAIN, ParserSpec::default());
        }
    }

    /// The program name used for the root command.
    pub fn prog(&self) -> String {
        self.meta.prog.clone().unwrap_or_else(executable_name)
    }

    pub fn main(&self) -> Option<&ParserSpec> {
        self.parsers.get(MAIN)
    }

    /// Every parser except `main`, in declaration order.
    pub fn subparsers(&self) -> impl Iterator<Item = (&str, &ParserSpec)> {
        self.parsers.iter().filter(|(name, _)| *name != MAIN)
    }

    /// Checks everything clap would otherwise reject (or assert on) when the tree is built.
    pub fn validate(&self) -> std::result::Result<(), ManifestError> {
        let mut command_names = HashSet::new();
        for (name, spec) in self.subparsers() {
            for command in std::iter::once(name).chain(spec.aliases.iter().map(String::as_str)) {
                if !command_names.insert(command) {
                    return Err(ManifestError::DuplicateParser(command.to_string()));
                }
            }
        }

        for (name, spec) in self.parsers.iter() {
            let mut reserved: Vec<&str> = Vec::new();
            let is_main = name == MAIN;
            if !is_main || self.meta.add_help {
                reserved.extend(HELP_FLAGS);
                reserved.push("help");
            }
            if is_main && self.meta.version.is_some() {
                reserved.extend(VERSION_FLAGS);
                reserved.push("version");
            }
            validate_parser(name, spec, &reserved)?;
        }

        // Main dests handed to subparser handlers share their bucket with the subparser's own.
        if let Some(main) = self.main() {
            let shared: HashSet<String> = main
                .arguments
                .iter()
                .filter(|a| !a.is_ignored_by_subparser())
                .filter_map(ArgumentSpec::resolved_dest)
                .collect();
            for (name, spec) in self.subparsers() {
                for dest in spec.arguments.iter().filter_map(ArgumentSpec::resolved_dest) {
                    if shared.contains(&dest) {
                        return Err(ManifestError::DuplicateDest {
                            parser: name.to_string(),
                            dest,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn executable_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| DEFAULT_PROG.to_string())
}

/// Text form of a manifest scalar, as it would appear on the command line.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn validate_parser(
    parser: &str,
    spec: &ParserSpec,
    reserved: &[&str],
) -> std::result::Result<(), ManifestError> {
    let mut dests: HashSet<String> = HashSet::new();
    let mut flags: HashSet<&str> = HashSet::new();
    let mut positionals: Vec<(&ArgumentSpec, String)> = Vec::new();

    for arg in &spec.arguments {
        let dest = arg.resolved_dest().ok_or_else(|| ManifestError::MissingName {
            parser: parser.to_string(),
        })?;
        let invalid = |reason: &str| ManifestError::InvalidArgument {
            parser: parser.to_string(),
            dest: dest.clone(),
            reason: reason.to_string(),
        };

        if reserved.contains(&dest.as_str()) {
            return Err(ManifestError::Reserved {
                parser: parser.to_string(),
                name: dest,
            });
        }
        if !dests.insert(dest.clone()) {
            return Err(ManifestError::DuplicateDest {
                parser: parser.to_string(),
                dest,
            });
        }

        if arg.is_positional() {
            if let Some(name) = arg.name_or_flags.first() {
                if name.is_empty() || name.chars().any(char::is_whitespace) {
                    return Err(ManifestError::InvalidFlag {
                        parser: parser.to_string(),
                        flag: name.clone(),
                    });
                }
            }
            if arg.name_or_flags.len() > 1 {
                return Err(invalid("a positional argument takes a single name"));
            }
            if arg.required.is_some() {
                return Err(invalid("`required` is not allowed for positional arguments"));
            }
            if !arg.action.takes_values() {
                return Err(invalid(&format!(
                    "action `{}` needs an optional flag",
                    arg.action.as_str()
                )));
            }
            positionals.push((arg, dest.clone()));
        } else {
            for flag in &arg.name_or_flags {
                if !is_valid_flag(flag) {
                    return Err(ManifestError::InvalidFlag {
                        parser: parser.to_string(),
                        flag: flag.clone(),
                    });
                }
                if reserved.contains(&flag.as_str()) {
                    return Err(ManifestError::Reserved {
                        parser: parser.to_string(),
                        name: flag.clone(),
                    });
                }
                if !flags.insert(flag.as_str()) {
                    return Err(ManifestError::DuplicateFlag {
                        parser: parser.to_string(),
                        flag: flag.clone(),
                    });
                }
            }
        }

        validate_values(parser, &dest, arg)?;

        if let Some(group_name) = &arg.group {
            let group = spec.argument_groups.get(group_name).ok_or_else(|| {
                ManifestError::UnknownGroup {
                    parser: parser.to_string(),
                    dest: dest.clone(),
                    group: group_name.clone(),
                }
            })?;
            if group.is_mutually_exclusive && arg.is_required() {
                return Err(ManifestError::RequiredInExclusiveGroup {
                    parser: parser.to_string(),
                    dest: dest.clone(),
                    group: group_name.clone(),
                });
            }
        }
    }

    for group in spec.argument_groups.names() {
        if dests.contains(group) {
            return Err(ManifestError::GroupConflictsWithDest {
                parser: parser.to_string(),
                group: group.to_string(),
            });
        }
    }

    let last = positionals.len().saturating_sub(1);
    let mut seen_optional = false;
    for (index, (arg, dest)) in positionals.iter().enumerate() {
        let invalid = |reason: &str| ManifestError::InvalidArgument {
            parser: parser.to_string(),
            dest: dest.clone(),
            reason: reason.to_string(),
        };
        let many = arg.action == Action::Append
            || arg.nargs.map(|n| n.takes_many_tokens()).unwrap_or(false);
        if many && index != last {
            return Err(invalid(
                "only the last positional argument may take multiple values",
            ));
        }
        if arg.is_required() {
            if seen_optional {
                return Err(invalid(
                    "a required positional argument cannot follow an optional one",
                ));
            }
        } else {
            seen_optional = true;
        }
    }

    Ok(())
}

fn is_valid_flag(flag: &str) -> bool {
    if let Some(long) = flag.strip_prefix("--") {
        !long.is_empty()
            && !long.starts_with('-')
            && !long.contains(|c: char| c.is_whitespace() || c == '=' || c == '>')
    } else if let Some(short) = flag.strip_prefix('-') {
        let mut chars = short.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if c != '-' && !c.is_whitespace())
    } else {
        false
    }
}

fn validate_values(
    parser: &str,
    dest: &str,
    arg: &ArgumentSpec,
) -> std::result::Result<(), ManifestError> {
    let invalid = |reason: &str| ManifestError::InvalidArgument {
        parser: parser.to_string(),
        dest: dest.to_string(),
        reason: reason.to_string(),
    };
    let bad_value = |value: &Value, reason: String| ManifestError::InvalidValue {
        parser: parser.to_string(),
        dest: dest.to_string(),
        value: value.to_string(),
        reason,
    };

    if arg.nargs.is_some() && !arg.action.takes_values() {
        return Err(invalid(&format!(
            "`nargs` is not allowed with action `{}`",
            arg.action.as_str()
        )));
    }

    let mut choices = Vec::with_capacity(arg.choices.len());
    for choice in &arg.choices {
        choices.push(
            arg.value_type
                .convert_value(choice)
                .map_err(|reason| bad_value(choice, reason))?,
        );
    }
    let check_choice = |value: &Value, converted: &Value| {
        if choices.is_empty() || choices.contains(converted) {
            Ok(())
        } else {
            Err(bad_value(value, "not one of the choices".to_string()))
        }
    };

    match arg.action {
        Action::StoreTrue | Action::StoreFalse => {
            if let Some(default) = &arg.default {
                ValueType::Bool
                    .convert_value(default)
                    .map_err(|reason| bad_value(default, reason))?;
            }
        }
        Action::Count => {
            if arg.default.is_some() {
                return Err(invalid("`default` is not supported with action `count`"));
            }
        }
        Action::StoreConst | Action::Store | Action::Append => {
            if let Some(default) = &arg.default {
                let multiple = arg.action == Action::Append
                    || arg.nargs.map(|n| n.is_multiple()).unwrap_or(false);
                let items: Vec<&Value> = match default {
                    Value::Array(items) if multiple => items.iter().collect(),
                    Value::Array(_) => {
                        return Err(bad_value(
                            default,
                            "a list default needs a multi-value nargs or `append`".to_string(),
                        ))
                    }
                    scalar => vec![scalar],
                };
                for item in items {
                    let converted = arg
                        .value_type
                        .convert_value(item)
                        .map_err(|reason| bad_value(item, reason))?;
                    check_choice(item, &converted)?;
                }
            }
        }
    }

    match (&arg.const_value, arg.action) {
        (None, Action::StoreConst) => Err(invalid("action `store_const` needs a `const`")),
        (Some(value), Action::StoreConst | Action::Store) => {
            if arg.action == Action::Store
                && (arg.is_positional() || !arg.nargs.map(|n| n.accepts_none()).unwrap_or(false))
            {
                return Err(invalid("`const` needs nargs `?` or `*` on an optional flag"));
            }
            let converted = arg
                .value_type
                .convert_value(value)
                .map_err(|reason| bad_value(value, reason))?;
            check_choice(value, &converted)
        }
        (Some(_), action) => Err(invalid(&format!(
            "`const` is not supported with action `{}`",
            action.as_str()
        ))),
        (None, _) => Ok(()),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(name) => vec![name],
        OneOrMany::Many(names) => names,
    })
}

/// An `arguments` entry: a full map, or a recipe string.
struct ArgumentEntry(ArgumentSpec);

impl<'de> Deserialize<'de> for ArgumentEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntryVisitor;

        impl<'de> Visitor<'de> for EntryVisitor {
            type Value = ArgumentEntry;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an argument map or a recipe string")
            }

            fn visit_str<E: de::Error>(self, recipe: &str) -> std::result::Result<Self::Value, E> {
                Recipe::parse(recipe).map(ArgumentEntry).map_err(E::custom)
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                ArgumentSpec::deserialize(de::value::MapAccessDeserializer::new(map))
                    .map(ArgumentEntry)
            }
        }

        deserializer.deserialize_any(EntryVisitor)
    }
}

fn deserialize_arguments<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<ArgumentSpec>, D::Error> {
    let entries = Option::<Vec<ArgumentEntry>>::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| entry.0)
        .collect())
}
