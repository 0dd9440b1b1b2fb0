//! Styles for the parser and handler listings.
//!
//! Templates refer to styles by semantic name only (see [`names`]); the colors are decided here.
//! The theme is built once, through `once_cell::sync::Lazy`.
use console::Style;
use once_cell::sync::Lazy;
use outstanding::{rgb_to_ansi256, Theme};

/// Style identifiers shared between templates and renderers.
pub mod names {
    pub const TITLE: &str = "title";
    pub const PARSER: &str = "parser";
    pub const ARGUMENT: &str = "argument";
    pub const KIND: &str = "kind";
    pub const HANDLER: &str = "handler";
    pub const MUTED: &str = "muted";
}

pub static ARGCAT_THEME: Lazy<Theme> = Lazy::new(|| {
    let muted = Style::new().color256(rgb_to_ansi256((138, 138, 138)));
    Theme::new()
        .add(names::TITLE, Style::new().bold())
        .add(
            names::PARSER,
            Style::new().color256(rgb_to_ansi256((196, 140, 0))).bold(),
        )
        .add(names::ARGUMENT, Style::new().cyan())
        .add(names::KIND, muted.clone().italic())
        .add(names::HANDLER, Style::new().green())
        .add(names::MUTED, muted)
});
