use argcat::builder::SubparserInfo;
use argcat::handler;
use argcat::manifest::{Action, ArgumentSpec, Nargs, MAIN};
use argcat::{
    ArgCat, ArgCatError, DispatchOptions, HandlerEntry, HandlerProvider, Outcome,
};
use clap::error::ErrorKind;
use serde_json::json;
use std::path::PathBuf;

fn hello_cat() -> ArgCat {
    let mut argcat = ArgCat::new(false);
    argcat
        .load(
            PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("tests")
                .join("fixtures")
                .join("hello_cat.yml"),
        )
        .unwrap();
    argcat
}

/// Handlers for the hello_cat parsers, offered the way a program groups them on one type.
struct HelloCatHandlers;

impl HandlerProvider for HelloCatHandlers {
    fn handlers(&self) -> Vec<HandlerEntry> {
        vec![
            HandlerEntry::new(
                "info",
                "info_handler",
                handler!(|detail: Option<String>| format!(
                    "info {}",
                    detail.unwrap_or_else(|| "None".to_string())
                )),
            ),
            HandlerEntry::new("init", "init_handler", handler!(|| "init")),
            HandlerEntry::new(
                "config",
                "config_handler",
                handler!(|name: Option<String>, user_name: Option<String>| format!(
                    "config name = {}, user_name = {}",
                    name.as_deref().unwrap_or("None"),
                    user_name.as_deref().unwrap_or("None")
                )),
            ),
        ]
    }
}

fn hello_cat_with_handlers() -> ArgCat {
    let mut argcat = hello_cat();
    let report = argcat.add_handler_provider(&HelloCatHandlers).unwrap();
    assert_eq!(report.registered.len(), 3);
    assert!(report.rejected.is_empty());
    argcat
}

#[test]
fn test_main_and_subcommand_both_run() {
    let argcat = hello_cat_with_handlers();
    let dispatch = argcat.try_parse_args_from(["test", "init"]).unwrap();

    assert_eq!(dispatch.parsers().collect::<Vec<_>>(), vec![MAIN, "init"]);
    assert_eq!(dispatch.value(MAIN), Some(&json!({"test": "test"})));
    assert_eq!(dispatch.value("init"), Some(&json!("init")));
}

#[test]
fn test_subcommand_receives_its_values() {
    let argcat = hello_cat_with_handlers();

    let info = argcat.try_parse_args_from(["test", "info", "this"]).unwrap();
    assert_eq!(info.value("info"), Some(&json!("info this")));

    let by_alias = argcat.try_parse_args_from(["i", "that"]).unwrap();
    assert_eq!(by_alias.parsers().collect::<Vec<_>>(), vec!["info"]);
    assert_eq!(by_alias.value("info"), Some(&json!("info that")));

    let name = argcat
        .try_parse_args_from(["test", "config", "--name", "cool_name"])
        .unwrap();
    assert_eq!(
        name.value("config"),
        Some(&json!("config name = cool_name, user_name = None"))
    );

    let user = argcat
        .try_parse_args_from(["test", "config", "-u", "cool_user_name"])
        .unwrap();
    assert_eq!(
        user.value("config"),
        Some(&json!("config name = None, user_name = cool_user_name"))
    );
}

#[test]
fn test_main_is_skipped_when_its_values_are_empty() {
    let argcat = hello_cat_with_handlers();
    let dispatch = argcat.try_parse_args_from(["info"]).unwrap();
    assert_eq!(dispatch.parsers().collect::<Vec<_>>(), vec!["info"]);
    assert_eq!(dispatch.value("info"), Some(&json!("info None")));
}

#[test]
fn test_no_subcommand_runs_main_only() {
    let argcat = hello_cat_with_handlers();
    let dispatch = argcat.try_parse_args_from(Vec::<String>::new()).unwrap();
    assert_eq!(dispatch.parsers().collect::<Vec<_>>(), vec![MAIN]);
    assert_eq!(dispatch.value(MAIN), Some(&json!({"test": null})));
}

#[test]
fn test_subparser_ignore_main() {
    let argcat = hello_cat_with_handlers();
    let dispatch = argcat
        .try_parse_args_with(
            ["test", "init"],
            DispatchOptions {
                subparser_ignore_main: true,
            },
        )
        .unwrap();
    assert_eq!(dispatch.parsers().collect::<Vec<_>>(), vec!["init"]);
}

#[test]
fn test_exclusive_group_conflict() {
    let argcat = hello_cat_with_handlers();
    let err = argcat
        .try_parse_args_from(["config", "--name", "a", "--username", "b"])
        .unwrap_err();
    match err {
        ArgCatError::Parse(e) => assert_eq!(e.kind(), ErrorKind::ArgumentConflict),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_unknown_subcommand_is_a_parse_error() {
    let argcat = hello_cat_with_handlers();
    let err = argcat.try_parse_args_from(["test", "nope"]).unwrap_err();
    assert!(matches!(err, ArgCatError::Parse(_)));
}

#[test]
fn test_parser_without_handler() {
    let argcat = hello_cat();
    let dispatch = argcat.try_parse_args_from(["init"]).unwrap();
    assert_eq!(dispatch.get("init"), Some(&Outcome::NoHandler));
    assert_eq!(serde_json::to_value(&dispatch).unwrap(), json!({"init": null}));
}

fn process_cat() -> ArgCat {
    let mut argcat = ArgCat::new(false);
    argcat
        .build(|b| {
            let mut main = b.main_parser();
            main.add_exclusive_argument(ArgumentSpec::new(["first"]).help("The first thing"))?;
            main.add_argument(ArgumentSpec::new(["-v", "--verbose"]).action(Action::StoreTrue))?;
            main.add_recipe("-d/--debug !store_true # Print debug information")?;

            b.add_subparser("process", SubparserInfo::new().help("Process something."))?;
            let mut process = b.subparser("process")?;
            process.add_group("load_group", Some("Where to load from"), true)?;
            process.add_argument(
                ArgumentSpec::new(["-f", "--file"])
                    .dest("filename")
                    .nargs(Nargs::Optional)
                    .group("load_group"),
            )?;
            process.add_argument(
                "-l/--link -> link : str ? # The target link"
                    .parse::<ArgumentSpec>()?
                    .group("load_group"),
            )?;
            Ok(())
        })
        .unwrap();
    argcat
}

#[test]
fn test_built_parsers_dispatch() {
    let mut argcat = process_cat();
    assert_eq!(
        argcat.required_params("process").unwrap(),
        vec!["verbose", "debug", "filename", "link"]
    );
    argcat
        .set_parser_handler(
            "process",
            "process_handler",
            handler!(|filename: Option<String>, link: Option<String>, verbose: bool, debug: bool| {
                json!({"filename": filename, "link": link, "verbose": verbose, "debug": debug})
            }),
        )
        .unwrap();

    let main_only = argcat.try_parse_args_from(["False"]).unwrap();
    assert_eq!(
        main_only.value(MAIN),
        Some(&json!({"debug": false, "first": "False", "verbose": false}))
    );

    let dispatch = argcat
        .try_parse_args_from(["x", "-v", "process", "--file", "a.txt"])
        .unwrap();
    assert_eq!(dispatch.parsers().collect::<Vec<_>>(), vec![MAIN, "process"]);
    assert_eq!(
        dispatch.value("process"),
        Some(&json!({"filename": "a.txt", "link": null, "verbose": true, "debug": false}))
    );
}

#[test]
fn test_built_parsers_reject_mismatched_handlers() {
    let mut argcat = process_cat();
    let err = argcat
        .set_parser_handler(
            "process",
            "process_handler",
            handler!(|filename, link| (filename, link)),
        )
        .unwrap_err();
    assert!(matches!(err, ArgCatError::SignatureMismatch { .. }));
    assert!(argcat.parser("process").unwrap().handler.is_none());

    let err = argcat
        .set_parser_handler(
            "process",
            "process_handler",
            handler!(|filename, link, verbose, debug, extra| (filename, link, verbose, debug, extra)),
        )
        .unwrap_err();
    assert!(matches!(err, ArgCatError::SignatureMismatch { .. }));
}

#[test]
fn test_built_group_conflict() {
    let argcat = process_cat();
    let err = argcat
        .try_parse_args_from(["x", "process", "-f", "a", "-l", "b"])
        .unwrap_err();
    match err {
        ArgCatError::Parse(e) => assert_eq!(e.kind(), ErrorKind::ArgumentConflict),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_failed_handler_does_not_stop_dispatch() {
    let mut argcat = process_cat();
    argcat
        .set_parser_handler(
            MAIN,
            "main_handler",
            handler!(try |first: String, verbose: bool, debug: bool| {
                if first == "boom" {
                    argcat::anyhow::bail!("cannot handle {first}");
                }
                Ok(json!([verbose, debug]))
            }),
        )
        .unwrap();
    argcat
        .set_parser_handler(
            "process",
            "process_handler",
            handler!(|filename, link, verbose, debug| json!([filename, link, verbose, debug])),
        )
        .unwrap();

    let dispatch = argcat.try_parse_args_from(["boom", "process"]).unwrap();
    assert_eq!(
        dispatch.get(MAIN),
        Some(&Outcome::Failed("cannot handle boom".to_string()))
    );
    assert_eq!(
        dispatch.value("process"),
        Some(&json!([null, null, false, false]))
    );
    assert_eq!(
        serde_json::to_value(&dispatch).unwrap()[MAIN],
        json!({"error": "cannot handle boom"})
    );
}

#[test]
fn test_handler_report_lists_registered_handlers() {
    let argcat = hello_cat_with_handlers();
    let report = argcat.render_parser_handlers_with_color(false);
    assert!(report.contains("default_main_handler(test)"));
    assert!(report.contains("info_handler(detail)"));
    assert!(report.contains("config_handler(name, user_name)"));
}

#[test]
fn test_subcommand_after_variadic_main_positional() {
    let mut argcat = ArgCat::new(false);
    argcat
        .build(|b| {
            b.main_parser().add_exclusive_recipe("files * # Files to read")?;
            b.add_subparser("init", SubparserInfo::new())?;
            Ok(())
        })
        .unwrap();
    argcat
        .set_parser_handler("init", "init_handler", handler!(|| "init"))
        .unwrap();

    let dispatch = argcat.try_parse_args_from(["a", "init"]).unwrap();
    assert_eq!(dispatch.parsers().collect::<Vec<_>>(), vec![MAIN, "init"]);
    assert_eq!(dispatch.value(MAIN), Some(&json!({"files": ["a"]})));
    assert_eq!(dispatch.value("init"), Some(&json!("init")));
}
