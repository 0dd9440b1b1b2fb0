//! Fluent construction of a [`Manifest`], used through [`crate::ArgCat::build`]:
//!
//! ```ignore
//! argcat.build(|b| {
//!     b.set_prog_info(ProgramMeta { prog: Some("cat".into()), ..Default::default() });
//!     b.add_subparser("init", SubparserInfo::new().help("Initialize something."))?;
//!     b.main_parser().add_exclusive_recipe("test ? # Just for test")?;
//!     b.subparser("init")?.add_recipe("-f/--force !store_true")?;
//!     Ok(())
//! })?;
//! ```
//!
//! Every `add_*` returns a copy of what was stored.
use crate::error::{ArgCatError, ManifestError, Result};
use crate::manifest::{ArgumentSpec, GroupSpec, Manifest, ParserSpec, ProgramMeta, SubparsersMeta, MAIN};
use crate::recipe::Recipe;
use tracing::debug;

/// Help, description and aliases of a new subparser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubparserInfo {
    pub help: Option<String>,
    pub description: Option<String>,
    pub aliases: Vec<String>,
}

impl SubparserInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }
}

pub struct ManifestBuilder {
    manifest: Manifest,
}

impl ManifestBuilder {
    pub(crate) fn new() -> Self {
        Self {
            manifest: Manifest::default(),
        }
    }

    /// Replaces the program metadata. Subparser metadata already set is kept unless `meta`
    /// carries its own.
    pub fn set_prog_info(&mut self, meta: ProgramMeta) -> &mut Self {
        let subparser = meta.subparser.clone().or_else(|| self.manifest.meta.subparser.take());
        self.manifest.meta = ProgramMeta { subparser, ..meta };
        self
    }

    pub fn set_subparsers_info(&mut self, info: SubparsersMeta) -> &mut Self {
        self.manifest.meta.subparser = Some(info);
        self
    }

    pub fn add_subparser(&mut self, name: &str, info: SubparserInfo) -> Result<ParserSpec> {
        let spec = ParserSpec {
            help: info.help,
            description: info.description,
            aliases: info.aliases,
            ..ParserSpec::default()
        };
        if !self.manifest.parsers.insert(name, spec.clone()) {
            return Err(ArgCatError::ParserExists(name.to_string()));
        }
        debug!(parser = name, "subparser added");
        Ok(spec)
    }

    pub fn main_parser(&mut self) -> MainParserBuilder<'_> {
        MainParserBuilder {
            inner: self.parser_builder(MAIN),
        }
    }

    pub fn subparser(&mut self, name: &str) -> Result<ParserBuilder<'_>> {
        if !self.manifest.parsers.contains(name) {
            return Err(ArgCatError::UnknownParser(name.to_string()));
        }
        Ok(self.parser_builder(name))
    }

    fn parser_builder(&mut self, name: &str) -> ParserBuilder<'_> {
        self.manifest.ensure_main();
        ParserBuilder {
            name: name.to_string(),
            manifest: &mut self.manifest,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub(crate) fn finish(self) -> Manifest {
        self.manifest
    }
}

/// Adds arguments and groups to one parser.
pub struct ParserBuilder<'a> {
    name: String,
    manifest: &'a mut Manifest,
}

impl ParserBuilder<'_> {
    fn spec(&mut self) -> Result<&mut ParserSpec> {
        self.manifest
            .parsers
            .get_mut(&self.name)
            .ok_or_else(|| ArgCatError::UnknownParser(self.name.clone()))
    }

    pub fn add_argument(&mut self, argument: ArgumentSpec) -> Result<ArgumentSpec> {
        if argument.resolved_dest().is_none() {
            return Err(ManifestError::MissingName {
                parser: self.name.clone(),
            }
            .into());
        }
        self.spec()?.arguments.push(argument.clone());
        Ok(argument)
    }

    pub fn add_recipe(&mut self, recipe: &str) -> Result<ArgumentSpec> {
        self.add_argument(Recipe::parse(recipe)?)
    }

    pub fn add_group(
        &mut self,
        name: &str,
        description: Option<&str>,
        is_mutually_exclusive: bool,
    ) -> Result<GroupSpec> {
        let group = GroupSpec {
            description: description.map(String::from),
            is_mutually_exclusive,
            required: false,
        };
        let parser = self.name.clone();
        if !self.spec()?.argument_groups.insert(name, group.clone()) {
            return Err(ArgCatError::GroupExists {
                parser,
                group: name.to_string(),
            });
        }
        Ok(group)
    }
}

/// The `main` parser builder: arguments either reach subparser handlers or stay exclusive to
/// the main handler.
pub struct MainParserBuilder<'a> {
    inner: ParserBuilder<'a>,
}

impl MainParserBuilder<'_> {
    /// Adds an argument that is also passed to subparser handlers.
    pub fn add_argument(&mut self, argument: ArgumentSpec) -> Result<ArgumentSpec> {
        self.inner
            .add_argument(argument.ignored_by_subparser(false))
    }

    /// Adds an argument only the main handler receives.
    pub fn add_exclusive_argument(&mut self, argument: ArgumentSpec) -> Result<ArgumentSpec> {
        self.inner.add_argument(argument.ignored_by_subparser(true))
    }

    pub fn add_recipe(&mut self, recipe: &str) -> Result<ArgumentSpec> {
        self.add_argument(Recipe::parse(recipe)?)
    }

    pub fn add_exclusive_recipe(&mut self, recipe: &str) -> Result<ArgumentSpec> {
        self.add_exclusive_argument(Recipe::parse(recipe)?)
    }

    pub fn add_group(
        &mut self,
        name: &str,
        description: Option<&str>,
        is_mutually_exclusive: bool,
    ) -> Result<GroupSpec> {
        self.inner.add_group(name, description, is_mutually_exclusive)
    }
}
