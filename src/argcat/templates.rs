//! # Report templates
//!
//! Listings are rendered through `outstanding` from stand-alone minijinja files, included here as
//! string constants.
//!
//! Line breaks are explicit: every block tag trims the newline that follows it (`-%}`), so each
//! output line comes from exactly one template line. Indentation is written as `{{ "  " }}` for
//! the same reason.
//!
//! Widths, argument kinds and notes are computed in `report.rs`; templates only place and style
//! them.
pub const PARSERS_TEMPLATE: &str = include_str!("templates/parsers.tmp");
pub const HANDLERS_TEMPLATE: &str = include_str!("templates/handlers.tmp");
