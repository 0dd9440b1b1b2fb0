//! # ArgCat Architecture
//!
//! ArgCat is a **declarative layer over clap**. A program describes its commands once, as a
//! YAML/JSON manifest or through a fluent builder, and receives parsed values in plain handlers
//! that are matched to commands by their parameter names.
//!
//! ## The Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Manifest (manifest.rs, recipe.rs, builder.rs)              │
//! │  - program metadata, `main` + subparsers, arguments, groups │
//! │  - validated before anything reaches clap                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Parser tree (parser.rs)                                    │
//! │  - one root clap::Command, one subcommand per subparser     │
//! │  - per-parser entries: resolved dests, groups, handler      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Namespace split (namespace.rs)                             │
//! │  - `main` bucket: every main dest                           │
//! │  - subcommand bucket: its dests + shared main dests         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Dispatch (argcat.rs, handler.rs)                           │
//! │  - handler params must equal the parser's required params   │
//! │  - ordered outcome per parser that ran                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sharing main arguments
//!
//! Every `main` argument carries `ignored_by_subparser`. Manifest arguments default to `true`
//! (only the main handler sees them); `MainParserBuilder::add_argument` sets `false`, which
//! adds the dest to every subparser handler's required parameters.
//!
//! ## When handlers run
//!
//! The subcommand handler runs whenever a subcommand was given. The main handler runs when no
//! subcommand was given, or when some main value is truthy and
//! [`DispatchOptions::subparser_ignore_main`] is off. `main` starts with a default handler
//! that prints the usage line; it can be replaced once.
//!
//! ## Module Overview
//!
//! - [`manifest`]: the declarative model, file loading and validation
//! - [`recipe`]: one-line argument shorthand
//! - [`builder`]: fluent manifest construction
//! - [`parser`]: manifest to clap adapter
//! - [`namespace`]: post-parse bucket split
//! - [`handler`]: handler trait, `handler!` macro, argument buckets, outcomes
//! - [`report`]: parser and handler listings
//! - [`error`]: error types
//! - `cli`: the `argcat` binary (not part of the lib API)

mod argcat;
pub mod builder;
pub mod error;
pub mod handler;
pub mod manifest;
pub mod namespace;
pub mod parser;
pub mod recipe;
pub mod report;
mod styles;
mod templates;

pub use crate::argcat::{
    ArgCat, DispatchOptions, ProviderReport, RegisteredHandler, RejectedHandler,
};
pub use crate::error::{ArgCatError, Result};
pub use crate::handler::{Arguments, Dispatch, Handler, HandlerEntry, HandlerProvider, Outcome};

#[doc(hidden)]
pub use anyhow;
#[doc(hidden)]
pub use serde_json;
