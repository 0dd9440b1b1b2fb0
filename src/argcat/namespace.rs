//! Splits clap's matches into the `main` bucket and the subcommand bucket.

use crate::handler::Arguments;
use crate::manifest::{Action, Nargs, MAIN};
use crate::parser::{ParserEntry, ParserTree, ResolvedArgument};
use clap::ArgMatches;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedNamespace {
    /// The subcommand that ran, by its canonical name.
    pub subcommand: Option<String>,
    /// Every main dest.
    pub main: Arguments,
    /// The subcommand's dests plus the main dests not ignored by subparsers.
    pub sub: Option<Arguments>,
}

impl ParsedNamespace {
    pub fn split(tree: &ParserTree, matches: &ArgMatches) -> Self {
        let main_entry = match tree.entry(MAIN) {
            Some(entry) => entry,
            None => return Self::default(),
        };
        let main = collect(main_entry, matches);

        let (subcommand, sub) = match matches.subcommand() {
            Some((name, sub_matches)) => {
                let mut bucket = Arguments::new();
                for arg in main_entry.arguments.iter().filter(|a| !a.ignored_by_subparser) {
                    let value = main.get(&arg.dest).cloned().unwrap_or(Value::Null);
                    bucket.insert(arg.dest.clone(), value);
                }
                match tree.entry(name) {
                    Some(entry) => {
                        for (dest, value) in collect(entry, sub_matches).iter() {
                            bucket.insert(dest, value.clone());
                        }
                    }
                    None => warn!(subcommand = name, "subcommand has no parser entry"),
                }
                (Some(name.to_string()), Some(bucket))
            }
            None => (None, None),
        };

        Self {
            subcommand,
            main,
            sub,
        }
    }
}

fn collect(entry: &ParserEntry, matches: &ArgMatches) -> Arguments {
    entry
        .arguments
        .iter()
        .map(|arg| (arg.dest.clone(), read_value(arg, matches)))
        .collect()
}

fn read_value(arg: &ResolvedArgument, matches: &ArgMatches) -> Value {
    let id = arg.dest.as_str();
    let spec = &arg.spec;
    let multiple = spec.nargs.map(|n| n.is_multiple()).unwrap_or(false);

    let value = match spec.action {
        Action::StoreTrue | Action::StoreFalse => matches
            .try_get_one::<bool>(id)
            .map(|v| v.map(|b| Value::Bool(*b))),
        Action::Count => matches
            .try_get_one::<u8>(id)
            .map(|v| v.map(|n| Value::from(*n))),
        Action::StoreConst => matches.try_get_one::<bool>(id).map(|given| {
            let source = if given.copied().unwrap_or(false) {
                spec.const_value.as_ref()
            } else {
                spec.default.as_ref()
            };
            source.map(|raw| spec.value_type.convert_value(raw).unwrap_or_else(|_| raw.clone()))
        }),
        Action::Store if multiple => matches
            .try_get_many::<Value>(id)
            .map(|v| v.map(|values| Value::Array(values.cloned().collect()))),
        Action::Store => matches.try_get_one::<Value>(id).map(|v| v.cloned()),
        Action::Append if multiple => matches.try_get_occurrences::<Value>(id).map(|v| {
            v.map(|occurrences| {
                Value::Array(
                    occurrences
                        .map(|values| Value::Array(values.cloned().collect()))
                        .collect(),
                )
            })
        }),
        Action::Append => matches
            .try_get_many::<Value>(id)
            .map(|v| v.map(|values| Value::Array(values.cloned().collect()))),
    };

    match value {
        Ok(Some(value)) => value,
        Ok(None) if spec.is_positional() && spec.nargs == Some(Nargs::ZeroOrMore) => {
            Value::Array(Vec::new())
        }
        Ok(None) => Value::Null,
        Err(e) => {
            warn!(dest = id, error = %e, "cannot read parsed value");
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use serde_json::json;

    const MANIFEST: &str = r#"
meta:
  prog: ns
parsers:
  main:
    arguments:
      - "-v/--verbose !store_true"
      - name_or_flags: --level
        type: int
        default: 1
        ignored_by_subparser: false
      - "-q/--quiet !count"
  add:
    arguments:
      - "files *"
      - "-t/--tag !append"
      - "-p/--point : float {2} !append"
      - name_or_flags: --fast
        dest: speed
        action: store_const
        const: fast
        default: normal
      - "-o/--output ?"
      - "--no-cache !store_false"
"#;

    fn split(args: &[&str]) -> ParsedNamespace {
        let tree = ParserTree::from_manifest(&Manifest::from_yaml_str(MANIFEST).unwrap()).unwrap();
        let mut argv = vec!["ns"];
        argv.extend_from_slice(args);
        let matches = tree.try_get_matches_from(argv).unwrap();
        ParsedNamespace::split(&tree, &matches)
    }

    #[test]
    fn test_main_only() {
        let ns = split(&["-v", "-qq"]);
        assert_eq!(ns.subcommand, None);
        assert_eq!(ns.sub, None);
        assert_eq!(
            ns.main.clone().into_value(),
            json!({"verbose": true, "level": 1, "quiet": 2})
        );
    }

    #[test]
    fn test_subcommand_bucket_gets_shared_main_dests() {
        let ns = split(&["--level", "3", "add", "a.txt", "b.txt"]);
        assert_eq!(ns.subcommand.as_deref(), Some("add"));
        let sub = ns.sub.unwrap();
        assert_eq!(sub.get("level"), Some(&json!(3)));
        assert!(!sub.contains("verbose"));
        assert_eq!(sub.get("files"), Some(&json!(["a.txt", "b.txt"])));
        assert_eq!(ns.main.get("level"), Some(&json!(3)));
    }

    #[test]
    fn test_value_shapes() {
        let ns = split(&[
            "add", "-t", "x", "-t", "y", "-p", "1", "2", "-p", "3", "4", "--fast", "-o",
            "--no-cache",
        ]);
        let sub = ns.sub.unwrap();
        assert_eq!(sub.get("files"), Some(&json!([])));
        assert_eq!(sub.get("tag"), Some(&json!(["x", "y"])));
        assert_eq!(sub.get("point"), Some(&json!([[1.0, 2.0], [3.0, 4.0]])));
        assert_eq!(sub.get("speed"), Some(&json!("fast")));
        assert_eq!(sub.get("output"), Some(&json!(null)));
        assert_eq!(sub.get("no_cache"), Some(&json!(false)));
    }

    #[test]
    fn test_absent_values() {
        let sub = split(&["add"]).sub.unwrap();
        assert_eq!(sub.get("tag"), Some(&json!(null)));
        assert_eq!(sub.get("speed"), Some(&json!("normal")));
        assert_eq!(sub.get("no_cache"), Some(&json!(true)));
        assert_eq!(sub.get("output"), Some(&json!(null)));
    }
}
