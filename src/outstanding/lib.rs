//! # Outstanding - Styled CLI Template Rendering
//!
//! Renders terminal reports from minijinja templates, with named `console` styles applied
//! through a template filter and dropped when the output cannot show colors.
//!
//! Templates only describe layout; styles live in a [`Theme`]:
//!
//! ```rust
//! use outstanding::{Renderer, Theme};
//! use console::Style;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Row {
//!     name: String,
//!     help: String,
//! }
//!
//! let theme = Theme::new().add("name", Style::new().bold());
//! let mut renderer = Renderer::with_color(theme, false);
//! renderer
//!     .add_template("row", r#"{{ name | pad(8) | style("name") }}{{ help }}"#)
//!     .unwrap();
//!
//! let row = Row { name: "--file".into(), help: "The target file".into() };
//! assert_eq!(renderer.render("row", &row).unwrap(), "--file  The target file");
//! ```
//!
//! ## Filters
//!
//! - `style(name)`: applies the named style. Unknown names are prefixed with an indicator
//!   (`(!?)` by default) so typos show up in the output instead of silently rendering plain.
//! - `pad(width)`: left-aligns text to a display width, counting wide characters as two
//!   columns. Pad before styling, escape codes would otherwise count towards the width.
//!
//! ## Color detection
//!
//! [`Renderer::new`] asks `console` whether stdout supports colors. [`Renderer::with_color`]
//! takes the decision from the caller (a `--no-color` flag); with `true` the styles are
//! forced on even when stdout is not a terminal.

use console::{Style, Term};
use minijinja::{Environment, Error, Value};
use serde::Serialize;
use std::collections::HashMap;
use unicode_width::UnicodeWidthStr;

/// Default prefix shown when a style name is not found.
pub const DEFAULT_MISSING_STYLE_INDICATOR: &str = "(!?)";

/// A collection of named styles.
///
/// ```rust
/// use outstanding::Styles;
/// use console::Style;
///
/// let styles = Styles::new().add("error", Style::new().bold().red());
/// assert!(styles.apply("typo", "Hello").starts_with("(!?)"));
/// ```
#[derive(Clone)]
pub struct Styles {
    styles: HashMap<String, Style>,
    missing_indicator: String,
}

impl Default for Styles {
    fn default() -> Self {
        Self {
            styles: HashMap::new(),
            missing_indicator: DEFAULT_MISSING_STYLE_INDICATOR.to_string(),
        }
    }
}

impl Styles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indicator prepended when a style name is not found. Empty disables it.
    pub fn missing_indicator(mut self, indicator: &str) -> Self {
        self.missing_indicator = indicator.to_string();
        self
    }

    /// Adds a named style, replacing any style of the same name.
    pub fn add(mut self, name: &str, style: Style) -> Self {
        self.styles.insert(name.to_string(), style);
        self
    }

    /// Applies a named style, emitting ANSI codes whatever the terminal.
    pub fn apply(&self, name: &str, text: &str) -> String {
        match self.styles.get(name) {
            Some(style) => style.clone().force_styling(true).apply_to(text).to_string(),
            None => self.mark_missing(text),
        }
    }

    /// Same check as [`Styles::apply`] without the ANSI codes.
    pub fn apply_plain(&self, name: &str, text: &str) -> String {
        if self.styles.contains_key(name) {
            text.to_string()
        } else {
            self.mark_missing(text)
        }
    }

    fn mark_missing(&self, text: &str) -> String {
        if self.missing_indicator.is_empty() {
            text.to_string()
        } else {
            format!("{} {}", self.missing_indicator, text)
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.styles.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// A named collection of styles used when rendering templates.
#[derive(Clone, Default)]
pub struct Theme {
    styles: Styles,
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_styles(styles: Styles) -> Self {
        Self { styles }
    }

    /// Adds a named style, returning an updated theme for chaining.
    pub fn add(mut self, name: &str, style: Style) -> Self {
        self.styles = self.styles.add(name, style);
        self
    }

    pub fn styles(&self) -> &Styles {
        &self.styles
    }
}

/// A set of compiled templates sharing one theme.
pub struct Renderer {
    env: Environment<'static>,
    use_color: bool,
}

impl Renderer {
    /// Creates a renderer, styling output only if stdout supports colors.
    pub fn new(theme: Theme) -> Self {
        let use_color = Term::stdout().features().colors_supported();
        Self::with_color(theme, use_color)
    }

    pub fn with_color(theme: Theme, use_color: bool) -> Self {
        let mut env = Environment::new();
        register_filters(&mut env, theme, use_color);
        Self { env, use_color }
    }

    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Compiles and registers a named template.
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<(), Error> {
        self.env
            .add_template_owned(name.to_string(), source.to_string())
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, Error> {
        self.env.get_template(name)?.render(data)
    }
}

fn register_filters(env: &mut Environment<'static>, theme: Theme, use_color: bool) {
    let styles = theme.styles;
    env.add_filter("style", move |value: Value, name: String| -> String {
        let text = value.to_string();
        if use_color {
            styles.apply(&name, &text)
        } else {
            styles.apply_plain(&name, &text)
        }
    });
    env.add_filter("pad", |value: Value, width: usize| -> String {
        pad(&value.to_string(), width)
    });
}

/// Left-aligns `text` to `width` display columns. Longer text is returned unchanged.
pub fn pad(text: &str, width: usize) -> String {
    let used = UnicodeWidthStr::width(text);
    if used >= width {
        text.to_string()
    } else {
        format!("{}{}", text, " ".repeat(width - used))
    }
}

/// Converts an RGB triplet to the nearest ANSI 256-color palette index.
pub fn rgb_to_ansi256((r, g, b): (u8, u8, u8)) -> u8 {
    if r == g && g == b {
        if r < 8 {
            16
        } else if r > 248 {
            231
        } else {
            232 + ((r as u16 - 8) * 24 / 247) as u8
        }
    } else {
        let red = (r as u16 * 5 / 255) as u8;
        let green = (g as u16 * 5 / 255) as u8;
        let blue = (b as u16 * 5 / 255) as u8;
        16 + 36 * red + 6 * green + blue
    }
}
