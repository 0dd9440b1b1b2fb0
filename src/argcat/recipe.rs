//! Recipes: one-line shorthand for an argument.
//!
//! ```text
//! NAMES [-> DEST] [: TYPE] [NARGS] [!ACTION] [= DEFAULT] [# HELP]
//!
//! detail ? # The detail of the information
//! -f/--file -> filename : str ? # The target file.
//! -s/--size : int = 1024
//! -v/--verbose !store_true
//! ```
//!
//! `NARGS` is `?`, `*`, `+` or `{N}`. A default may be quoted to keep spaces or a `#`.
//! Recipes can be used wherever a manifest lists an argument, and through
//! [`crate::builder`]'s `add_recipe`.

use crate::error::RecipeError;
use crate::manifest::{Action, ArgumentSpec, Nargs, ValueType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::str::FromStr;

static RECIPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        ^\s*
        (?P<names>[^\s:=\#!?*+{>]+)
        (?:\s*->\s*(?P<dest>[A-Za-z_][A-Za-z0-9_]*))?
        (?:\s*:\s*(?P<type>[A-Za-z]+))?
        (?:\s*(?P<nargs>[?*+]|\{\s*[0-9]+\s*\}))?
        (?:\s*!\s*(?P<action>[a-z_]+))?
        (?:\s*=\s*(?P<default>"[^"]*"|'[^']*'|[^\#]*?))?
        (?:\s*\#\s*(?P<help>.*?))?
        \s*$
        "#,
    )
    .expect("recipe pattern is valid")
});

/// Expands recipe strings into [`ArgumentSpec`]s.
pub struct Recipe;

impl Recipe {
    pub fn parse(recipe: &str) -> Result<ArgumentSpec, RecipeError> {
        if recipe.trim().is_empty() {
            return Err(RecipeError::Empty);
        }
        let caps = RECIPE
            .captures(recipe)
            .ok_or_else(|| RecipeError::Malformed(recipe.to_string()))?;

        let names: Vec<&str> = caps["names"].split('/').map(str::trim).collect();
        if names.iter().any(|n| n.is_empty()) {
            return Err(RecipeError::Malformed(recipe.to_string()));
        }
        let mut spec = ArgumentSpec::new(names);

        if let Some(dest) = caps.name("dest") {
            spec = spec.dest(dest.as_str());
        }
        if let Some(value_type) = caps.name("type") {
            spec = spec.value_type(value_type.as_str().parse::<ValueType>()?);
        }
        if let Some(nargs) = caps.name("nargs") {
            let raw = nargs.as_str().trim_start_matches('{').trim_end_matches('}');
            spec = spec.nargs(raw.parse::<Nargs>()?);
        }
        if let Some(action) = caps.name("action") {
            spec = spec.action(action.as_str().parse::<Action>()?);
        }
        if let Some(default) = caps.name("default") {
            let raw = default.as_str().trim();
            if raw.is_empty() {
                return Err(RecipeError::Malformed(recipe.to_string()));
            }
            spec.default = Some(default_value(raw, spec.value_type, spec.action));
        }
        if let Some(help) = caps.name("help") {
            let help = help.as_str().trim();
            if !help.is_empty() {
                spec = spec.help(help);
            }
        }
        Ok(spec)
    }
}

/// Quoted defaults stay strings; anything else is typed when it converts cleanly and left for
/// manifest validation to report otherwise.
fn default_value(raw: &str, value_type: ValueType, action: Action) -> Value {
    if let Some(quoted) = unquote(raw) {
        return Value::String(quoted.to_string());
    }
    let value_type = match action {
        Action::StoreTrue | Action::StoreFalse => ValueType::Bool,
        _ => value_type,
    };
    value_type
        .convert(raw)
        .unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn unquote(raw: &str) -> Option<&str> {
    ['"', '\''].iter().find_map(|q| {
        raw.strip_prefix(*q)
            .and_then(|rest| rest.strip_suffix(*q))
    })
}

impl FromStr for ArgumentSpec {
    type Err = RecipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Recipe::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ManifestError;
    use serde_json::json;

    #[test]
    fn test_positional_with_help() {
        let spec = Recipe::parse("detail ? # The detail of the information").unwrap();
        assert_eq!(spec.name_or_flags, vec!["detail"]);
        assert_eq!(spec.nargs, Some(Nargs::Optional));
        assert_eq!(spec.help.as_deref(), Some("The detail of the information"));
        assert!(spec.is_positional());
    }

    #[test]
    fn test_full_recipe() {
        let spec = Recipe::parse("-f/--file -> filename : str ? # The target file.").unwrap();
        assert_eq!(spec.name_or_flags, vec!["-f", "--file"]);
        assert_eq!(spec.dest.as_deref(), Some("filename"));
        assert_eq!(spec.value_type, ValueType::Str);
        assert_eq!(spec.nargs, Some(Nargs::Optional));
        assert_eq!(spec.help.as_deref(), Some("The target file."));
    }

    #[test]
    fn test_dest_arrow_without_spaces() {
        let spec = Recipe::parse("-f/--file->filename").unwrap();
        assert_eq!(spec.name_or_flags, vec!["-f", "--file"]);
        assert_eq!(spec.dest.as_deref(), Some("filename"));
    }

    #[test]
    fn test_typed_default() {
        let spec = Recipe::parse("-s/--size : int = 1024").unwrap();
        assert_eq!(spec.value_type, ValueType::Int);
        assert_eq!(spec.default, Some(json!(1024)));
        assert_eq!(spec.resolved_dest().as_deref(), Some("size"));
    }

    #[test]
    fn test_quoted_default_keeps_hash() {
        let spec = Recipe::parse(r#"--tag = "a # b" # The tag"#).unwrap();
        assert_eq!(spec.default, Some(json!("a # b")));
        assert_eq!(spec.help.as_deref(), Some("The tag"));
    }

    #[test]
    fn test_action_and_counted_nargs() {
        let spec = Recipe::parse("-v/--verbose !store_true").unwrap();
        assert_eq!(spec.action, Action::StoreTrue);

        let spec = Recipe::parse("point : float {2}").unwrap();
        assert_eq!(spec.nargs, Some(Nargs::Exactly(2)));
        assert_eq!(spec.value_type, ValueType::Float);
    }

    #[test]
    fn test_from_str() {
        let spec: ArgumentSpec = "files *".parse().unwrap();
        assert_eq!(spec.nargs, Some(Nargs::ZeroOrMore));
    }

    #[test]
    fn test_errors() {
        assert_eq!(Recipe::parse("   "), Err(RecipeError::Empty));
        assert_eq!(
            Recipe::parse("--size : huge"),
            Err(RecipeError::Manifest(ManifestError::UnknownType(
                "huge".to_string()
            )))
        );
        assert_eq!(
            Recipe::parse("--size !explode"),
            Err(RecipeError::Manifest(ManifestError::UnknownAction(
                "explode".to_string()
            )))
        );
        assert!(matches!(
            Recipe::parse("--size : int ? trailing"),
            Err(RecipeError::Malformed(_))
        ));
        assert!(matches!(
            Recipe::parse("-f//--file"),
            Err(RecipeError::Malformed(_))
        ));
    }
}
