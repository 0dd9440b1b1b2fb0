//! The [`ArgCat`] facade: load or build a manifest, register handlers, parse and dispatch.
use crate::builder::ManifestBuilder;
use crate::error::{ArgCatError, Result};
use crate::handler::{Arguments, Dispatch, FnHandler, Handler, HandlerProvider, HandlerSlot, Outcome};
use crate::manifest::{Manifest, MAIN};
use crate::namespace::ParsedNamespace;
use crate::parser::{ParserEntry, ParserTree};
use crate::report;
use serde::Serialize;
use std::ffi::OsString;
use std::path::Path;
use tracing::{error, warn};

/// Lifecycle logs go out at `info` when chatter is on, at `debug` otherwise.
macro_rules! chat {
    ($chatter:expr, $($arg:tt)+) => {
        if $chatter {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

const DEFAULT_MAIN_HANDLER: &str = "default_main_handler";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Never run the main handler when a subcommand ran.
    pub subparser_ignore_main: bool,
}

/// A handler registered by [`ArgCat::add_handler_provider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredHandler {
    pub parser: String,
    pub name: String,
}

/// A handler [`ArgCat::add_handler_provider`] refused, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedHandler {
    pub parser: String,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderReport {
    pub registered: Vec<RegisteredHandler>,
    pub rejected: Vec<RejectedHandler>,
}

#[derive(Debug, Default)]
pub struct ArgCat {
    chatter: bool,
    manifest: Option<Manifest>,
    tree: Option<ParserTree>,
}

impl ArgCat {
    pub fn new(chatter: bool) -> Self {
        Self {
            chatter,
            ..Self::default()
        }
    }

    /// Builds parsers from a manifest file.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        chat!(self.chatter, path = %path.display(), "loading manifest");
        self.reset();
        self.install(Manifest::from_path(path)?)
    }

    pub fn from_manifest(manifest: Manifest) -> Result<Self> {
        let mut argcat = Self::new(false);
        argcat.install(manifest)?;
        Ok(argcat)
    }

    /// Resets the instance, lets `f` describe the parsers, then builds them.
    pub fn build<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut ManifestBuilder) -> Result<()>,
    {
        self.reset();
        chat!(self.chatter, "build started");
        let mut builder = ManifestBuilder::new();
        f(&mut builder)?;
        self.install(builder.finish())?;
        chat!(self.chatter, "build done");
        Ok(())
    }

    fn reset(&mut self) {
        self.manifest = None;
        self.tree = None;
    }

    fn install(&mut self, mut manifest: Manifest) -> Result<()> {
        manifest.ensure_main();
        let mut tree = ParserTree::from_manifest(&manifest)?;

        let usage = tree.render_usage();
        if let Some(main) = tree.entry_mut(MAIN) {
            let params: Vec<String> = main.dests().into_iter().map(String::from).collect();
            let handler = FnHandler::new(params, move |args: &Arguments| {
                println!("{usage}");
                Ok(args.clone().into_value())
            });
            main.handler = Some(HandlerSlot {
                name: DEFAULT_MAIN_HANDLER.to_string(),
                handler: Box::new(handler),
                is_default: true,
            });
        }

        chat!(
            self.chatter,
            parsers = ?tree.entries().iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            "parsers created"
        );
        self.manifest = Some(manifest);
        self.tree = Some(tree);
        Ok(())
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn tree(&self) -> Option<&ParserTree> {
        self.tree.as_ref()
    }

    /// Every parser, `main` first. Empty until something is loaded or built.
    pub fn parsers(&self) -> &[ParserEntry] {
        self.tree.as_ref().map(|t| t.entries()).unwrap_or(&[])
    }

    pub fn parser(&self, name: &str) -> Option<&ParserEntry> {
        self.tree.as_ref().and_then(|t| t.entry(name))
    }

    /// The parameter names a handler of `parser` must declare.
    pub fn required_params(&self, parser: &str) -> Result<Vec<String>> {
        let tree = self.tree.as_ref().ok_or(ArgCatError::NotBuilt)?;
        tree.required_params(parser)
            .ok_or_else(|| ArgCatError::UnknownParser(parser.to_string()))
    }

    pub fn usage(&self) -> Result<String> {
        let tree = self.tree.as_ref().ok_or(ArgCatError::NotBuilt)?;
        Ok(tree.render_usage())
    }

    /// Registers `handler` for `parser`.
    ///
    /// The handler's parameter names must be exactly the parser's required parameters. Only the
    /// default `main` handler can be replaced.
    pub fn set_parser_handler<H>(&mut self, parser: &str, name: &str, handler: H) -> Result<()>
    where
        H: Handler + 'static,
    {
        self.set_boxed_handler(parser, name, Box::new(handler))
    }

    fn set_boxed_handler(
        &mut self,
        parser: &str,
        name: &str,
        handler: Box<dyn Handler>,
    ) -> Result<()> {
        let chatter = self.chatter;
        let tree = self.tree.as_mut().ok_or(ArgCatError::NotBuilt)?;
        let required = tree
            .required_params(parser)
            .ok_or_else(|| ArgCatError::UnknownParser(parser.to_string()))?;
        let entry = tree
            .entry_mut(parser)
            .ok_or_else(|| ArgCatError::UnknownParser(parser.to_string()))?;

        if entry.handler.as_ref().map(|s| !s.is_default).unwrap_or(false) {
            return Err(ArgCatError::HandlerExists(parser.to_string()));
        }

        let given = handler.params();
        let mut expected_set = required.clone();
        let mut given_set = given.clone();
        expected_set.sort();
        given_set.sort();
        given_set.dedup();
        if expected_set != given_set || given_set.len() != given.len() {
            return Err(ArgCatError::SignatureMismatch {
                parser: parser.to_string(),
                handler: name.to_string(),
                required,
                given,
            });
        }

        entry.handler = Some(HandlerSlot {
            name: name.to_string(),
            handler,
            is_default: false,
        });
        chat!(chatter, parser, handler = name, "handler registered");
        Ok(())
    }

    /// Registers every handler of `provider`, in handler-name order. The first handler offered
    /// for a parser wins; the others are rejected.
    pub fn add_handler_provider(&mut self, provider: &dyn HandlerProvider) -> Result<ProviderReport> {
        if self.tree.is_none() {
            return Err(ArgCatError::NotBuilt);
        }
        let mut entries = provider.handlers();
        if entries.is_empty() {
            warn!("handler provider does not offer any handler");
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut report = ProviderReport::default();
        for entry in entries {
            match self.set_boxed_handler(&entry.parser, &entry.name, entry.handler) {
                Ok(()) => report.registered.push(RegisteredHandler {
                    parser: entry.parser,
                    name: entry.name,
                }),
                Err(e) => {
                    warn!(parser = %entry.parser, handler = %entry.name, error = %e, "handler rejected");
                    report.rejected.push(RejectedHandler {
                        parser: entry.parser,
                        name: entry.name,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Parses the process arguments and dispatches them. Parse errors, help and version
    /// requests exit the process the way clap does.
    pub fn parse_args(&self) -> Dispatch {
        self.parse_args_with(DispatchOptions::default())
    }

    pub fn parse_args_with(&self, options: DispatchOptions) -> Dispatch {
        match self.try_parse_args_with(std::env::args_os().skip(1), options) {
            Ok(dispatch) => dispatch,
            Err(ArgCatError::Parse(e)) => e.exit(),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(2);
            }
        }
    }

    /// Parses `args` (without the program name) and dispatches them.
    pub fn try_parse_args_from<I, T>(&self, args: I) -> Result<Dispatch>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        self.try_parse_args_with(args, DispatchOptions::default())
    }

    pub fn try_parse_args_with<I, T>(&self, args: I, options: DispatchOptions) -> Result<Dispatch>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let tree = self.tree.as_ref().ok_or(ArgCatError::NotBuilt)?;
        let prog = OsString::from(tree.command().get_name());
        let argv = std::iter::once(prog).chain(args.into_iter().map(Into::into));
        let matches = tree.try_get_matches_from(argv)?;
        let namespace = ParsedNamespace::split(tree, &matches);
        chat!(
            self.chatter,
            subcommand = ?namespace.subcommand,
            main = ?namespace.main,
            sub = ?namespace.sub,
            "arguments parsed"
        );

        let mut dispatch = Dispatch::default();
        let run_main = namespace.subcommand.is_none()
            || (!options.subparser_ignore_main && namespace.main.is_any_truthy());
        if run_main {
            dispatch.push(MAIN, self.invoke(tree, MAIN, &namespace.main));
        }
        if let (Some(name), Some(sub)) = (&namespace.subcommand, &namespace.sub) {
            dispatch.push(name.clone(), self.invoke(tree, name, sub));
        }
        Ok(dispatch)
    }

    fn invoke(&self, tree: &ParserTree, parser: &str, args: &Arguments) -> Outcome {
        let slot = match tree.entry(parser).and_then(|e| e.handler.as_ref()) {
            Some(slot) => slot,
            None => {
                chat!(self.chatter, parser, "no handler");
                return Outcome::NoHandler;
            }
        };
        chat!(self.chatter, parser, handler = %slot.name, "calling handler");
        match slot.handler.call(args) {
            Ok(value) => Outcome::Handled(value),
            Err(e) => {
                let message = format!("{:#}", e);
                error!(
                    parser,
                    handler = %slot.name,
                    params = ?slot.handler.params(),
                    received = ?args.names().collect::<Vec<_>>(),
                    error = %message,
                    "handler failed"
                );
                Outcome::Failed(message)
            }
        }
    }

    pub fn render_parsers(&self) -> String {
        report::render_parsers(self.tree.as_ref(), None)
    }

    pub fn render_parsers_with_color(&self, use_color: bool) -> String {
        report::render_parsers(self.tree.as_ref(), Some(use_color))
    }

    pub fn print_parsers(&self) {
        print!("{}", self.render_parsers());
    }

    pub fn render_parser_handlers(&self) -> String {
        report::render_handlers(self.tree.as_ref(), None)
    }

    pub fn render_parser_handlers_with_color(&self, use_color: bool) -> String {
        report::render_handlers(self.tree.as_ref(), Some(use_color))
    }

    pub fn print_parser_handlers(&self) {
        print!("{}", self.render_parser_handlers());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerEntry;
    use crate::manifest::{ArgumentSpec, Nargs};
    use serde_json::json;

    fn built() -> ArgCat {
        let mut argcat = ArgCat::new(false);
        argcat
            .build(|b| {
                b.add_subparser("init", crate::builder::SubparserInfo::new())?;
                b.main_parser().add_argument(ArgumentSpec::new(["-v", "--verbose"]).action(crate::manifest::Action::StoreTrue))?;
                b.main_parser()
                    .add_exclusive_argument(ArgumentSpec::new(["test"]).nargs(Nargs::Optional))?;
                Ok(())
            })
            .unwrap();
        argcat
    }

    #[test]
    fn test_not_built() {
        let mut argcat = ArgCat::new(false);
        assert!(argcat.parsers().is_empty());
        assert!(matches!(
            argcat.try_parse_args_from(Vec::<String>::new()),
            Err(ArgCatError::NotBuilt)
        ));
        assert!(matches!(
            argcat.set_parser_handler("main", "h", crate::handler!(|| 1)),
            Err(ArgCatError::NotBuilt)
        ));
        assert_eq!(argcat.render_parsers_with_color(false), "ArgCat does not have any parser.\n");
    }

    #[test]
    fn test_required_params() {
        let argcat = built();
        assert_eq!(argcat.required_params(MAIN).unwrap(), vec!["verbose", "test"]);
        assert_eq!(argcat.required_params("init").unwrap(), vec!["verbose"]);
        assert!(matches!(
            argcat.required_params("nope"),
            Err(ArgCatError::UnknownParser(_))
        ));
    }

    #[test]
    fn test_default_main_handler_returns_its_arguments() {
        let argcat = built();
        let dispatch = argcat.try_parse_args_from(["value"]).unwrap();
        assert_eq!(
            dispatch.value(MAIN),
            Some(&json!({"verbose": false, "test": "value"}))
        );
        assert!(argcat.parser(MAIN).unwrap().handler.as_ref().unwrap().is_default);
    }

    #[test]
    fn test_main_handler_can_be_replaced_once() {
        let mut argcat = built();
        argcat
            .set_parser_handler(MAIN, "main_handler", crate::handler!(|verbose: bool, test| json!([verbose, test])))
            .unwrap();
        let err = argcat
            .set_parser_handler(MAIN, "other", crate::handler!(|verbose, test| (verbose, test)))
            .unwrap_err();
        assert!(matches!(err, ArgCatError::HandlerExists(_)));
        assert_eq!(err.to_string(), "Multiple handlers for one parser `main`");
    }

    #[test]
    fn test_signature_mismatch_reports_required_params() {
        let mut argcat = built();
        let err = argcat
            .set_parser_handler("init", "init_handler", crate::handler!(|verbose, test| 0))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Handler `init_handler(verbose, test)` does not meet the requirement of the parser `init`, \
             which requires a handler with parameters `(verbose)`"
        );
        assert!(argcat.set_parser_handler("nope", "h", crate::handler!(|| 0)).is_err());
    }

    #[test]
    fn test_dispatch_rules() {
        let mut argcat = built();
        argcat
            .set_parser_handler("init", "init_handler", crate::handler!(|verbose: bool| format!("init {verbose}")))
            .unwrap();

        let quiet = argcat.try_parse_args_from(["init"]).unwrap();
        assert_eq!(quiet.parsers().collect::<Vec<_>>(), vec!["init"]);
        assert_eq!(quiet.value("init"), Some(&json!("init false")));

        let loud = argcat.try_parse_args_from(["-v", "init"]).unwrap();
        assert_eq!(loud.parsers().collect::<Vec<_>>(), vec!["main", "init"]);

        let ignored = argcat
            .try_parse_args_with(["-v", "init"], DispatchOptions { subparser_ignore_main: true })
            .unwrap();
        assert_eq!(ignored.parsers().collect::<Vec<_>>(), vec!["init"]);
    }

    #[test]
    fn test_failed_handler_is_reported() {
        let mut argcat = built();
        argcat
            .set_parser_handler("init", "init_handler", crate::handler!(try |verbose: bool| {
                anyhow::ensure!(verbose, "needs --verbose");
                Ok("ok")
            }))
            .unwrap();
        let dispatch = argcat.try_parse_args_from(["init"]).unwrap();
        assert_eq!(dispatch.get("init"), Some(&Outcome::Failed("needs --verbose".to_string())));
    }

    struct Provider;

    impl HandlerProvider for Provider {
        fn handlers(&self) -> Vec<HandlerEntry> {
            vec![
                HandlerEntry::new("init", "init_b", crate::handler!(|verbose| verbose)),
                HandlerEntry::new("init", "init_a", crate::handler!(|verbose| verbose)),
                HandlerEntry::new("nope", "ghost", crate::handler!(|| 0)),
            ]
        }
    }

    #[test]
    fn test_handler_provider_first_name_wins() {
        let mut argcat = built();
        let report = argcat.add_handler_provider(&Provider).unwrap();
        assert_eq!(
            report.registered,
            vec![RegisteredHandler {
                parser: "init".to_string(),
                name: "init_a".to_string()
            }]
        );
        let rejected: Vec<&str> = report.rejected.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(rejected, vec!["ghost", "init_b"]);
        assert_eq!(
            argcat.parser("init").unwrap().handler.as_ref().unwrap().name,
            "init_a"
        );
    }

    #[test]
    fn test_build_resets_previous_parsers() {
        let mut argcat = built();
        argcat.build(|_| Ok(())).unwrap();
        assert_eq!(argcat.parsers().len(), 1);
        assert!(argcat.parser("init").is_none());
    }
}
