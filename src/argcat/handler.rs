//! # Handlers
//!
//! A handler is anything that declares parameter names and can be called with an
//! [`Arguments`] bucket. ArgCat matches handlers to parsers by comparing those names with the
//! parser's dests, so the parameter list *is* the signature:
//!
//! ```ignore
//! let greet = argcat::handler!(|name: String, times: u32| {
//!     (0..times).map(|_| format!("hello {name}")).collect::<Vec<_>>()
//! });
//! // params() == ["name", "times"]
//! ```
//!
//! `handler!(try |..| body)` is the same with a body returning `anyhow::Result`. Handlers can be
//! written by hand through [`FnHandler`] or the [`Handler`] trait, and grouped behind a
//! [`HandlerProvider`] to register many at once.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

pub type HandlerResult = anyhow::Result<Value>;

pub trait Handler {
    /// Declared parameter names, compared with the parser's dests.
    fn params(&self) -> Vec<String>;

    fn call(&self, args: &Arguments) -> HandlerResult;
}

/// A handler built from a parameter list and a closure.
pub struct FnHandler<F> {
    params: Vec<String>,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Arguments) -> HandlerResult,
{
    pub fn new<I, S>(params: I, f: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            f,
        }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&Arguments) -> HandlerResult,
{
    fn params(&self) -> Vec<String> {
        self.params.clone()
    }

    fn call(&self, args: &Arguments) -> HandlerResult {
        (self.f)(args)
    }
}

/// Builds a [`FnHandler`] whose parameter names are the closure's parameter names.
///
/// Each parameter is deserialized from the argument of the same name; parameters without a
/// type annotation receive the raw `serde_json::Value`.
#[macro_export]
macro_rules! handler {
    (try || $body:expr) => {
        $crate::handler!(try | | $body)
    };
    (try |$($param:ident $(: $ty:ty)?),* $(,)?| $body:expr) => {
        $crate::handler::FnHandler::new(
            {
                let params: ::std::vec::Vec<&str> = ::std::vec![$(::std::stringify!($param)),*];
                params
            },
            move |#[allow(unused_variables)] args: &$crate::handler::Arguments| -> $crate::handler::HandlerResult {
                $(
                    #[allow(unused_variables)]
                    let $param: $crate::__handler_param!($($ty)?) =
                        args.extract(::std::stringify!($param))?;
                )*
                let result: $crate::anyhow::Result<_> = $body;
                ::std::result::Result::Ok($crate::serde_json::to_value(result?)?)
            },
        )
    };
    (|| $body:expr) => {
        $crate::handler!(| | $body)
    };
    (|$($param:ident $(: $ty:ty)?),* $(,)?| $body:expr) => {
        $crate::handler!(try |$($param $(: $ty)?),*| ::std::result::Result::<_, $crate::anyhow::Error>::Ok($body))
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __handler_param {
    () => {
        $crate::serde_json::Value
    };
    ($ty:ty) => {
        $ty
    };
}

/// Null, `false`, zero and empty strings, lists or maps are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// The named values handed to a handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deserializes one argument. A missing argument is read as `null`, so `Option<T>` works.
    pub fn extract<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self.0.get(name).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).with_context(|| format!("argument `{name}`"))
    }

    /// Deserializes the whole bucket into a struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        serde_json::from_value(Value::Object(self.0.clone())).context("arguments")
    }

    pub fn is_any_truthy(&self) -> bool {
        self.0.values().any(is_truthy)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A named handler offered by a [`HandlerProvider`].
pub struct HandlerEntry {
    pub parser: String,
    pub name: String,
    pub handler: Box<dyn Handler>,
}

impl HandlerEntry {
    pub fn new(
        parser: impl Into<String>,
        name: impl Into<String>,
        handler: impl Handler + 'static,
    ) -> Self {
        Self {
            parser: parser.into(),
            name: name.into(),
            handler: Box::new(handler),
        }
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("parser", &self.parser)
            .field("name", &self.name)
            .field("params", &self.handler.params())
            .finish()
    }
}

/// A set of handlers registered together with `ArgCat::add_handler_provider`.
pub trait HandlerProvider {
    fn handlers(&self) -> Vec<HandlerEntry>;
}

/// The handler registered on a parser.
pub struct HandlerSlot {
    pub name: String,
    pub handler: Box<dyn Handler>,
    /// The built-in `main` handler; it may be replaced once.
    pub is_default: bool,
}

impl fmt::Debug for HandlerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSlot")
            .field("name", &self.name)
            .field("params", &self.handler.params())
            .field("is_default", &self.is_default)
            .finish()
    }
}

/// What happened to one parser during dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Handled(Value),
    /// The handler returned an error; the message is kept.
    Failed(String),
    NoHandler,
}

impl Outcome {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Handled(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, Outcome::Handled(_))
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Outcome::Handled(value) => value.serialize(serializer),
            Outcome::Failed(message) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", message)?;
                map.end()
            }
            Outcome::NoHandler => serializer.serialize_none(),
        }
    }
}

/// Outcomes of one dispatch, keyed by parser name in the order handlers ran.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatch {
    outcomes: Vec<(String, Outcome)>,
}

impl Dispatch {
    pub(crate) fn push(&mut self, parser: impl Into<String>, outcome: Outcome) {
        self.outcomes.push((parser.into(), outcome));
    }

    pub fn get(&self, parser: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == parser)
            .map(|(_, outcome)| outcome)
    }

    /// The value a parser's handler returned, if it ran successfully.
    pub fn value(&self, parser: &str) -> Option<&Value> {
        self.get(parser).and_then(Outcome::value)
    }

    pub fn parsers(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Outcome)> {
        self.outcomes.iter().map(|(name, o)| (name.as_str(), o))
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl Serialize for Dispatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.outcomes.len()))?;
        for (parser, outcome) in &self.outcomes {
            map.serialize_entry(parser, outcome)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => Arguments::from(map),
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_truthiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(-1), json!("False"), json!([0]), json!({"a": null})] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn test_is_any_truthy() {
        assert!(!args(json!({"verbose": false, "debug": false, "test": null})).is_any_truthy());
        assert!(args(json!({"verbose": false, "first": "False"})).is_any_truthy());
        assert!(!Arguments::new().is_any_truthy());
    }

    #[test]
    fn test_extract() {
        let bucket = args(json!({"name": "cat", "size": 3, "tags": ["a", "b"], "missing": null}));
        assert_eq!(bucket.extract::<String>("name").unwrap(), "cat");
        assert_eq!(bucket.extract::<u32>("size").unwrap(), 3);
        assert_eq!(bucket.extract::<Vec<String>>("tags").unwrap(), vec!["a", "b"]);
        assert_eq!(bucket.extract::<Option<String>>("missing").unwrap(), None);
        assert_eq!(bucket.extract::<Option<String>>("absent").unwrap(), None);
        let err = bucket.extract::<u32>("name").unwrap_err();
        assert!(err.to_string().contains("argument `name`"));
    }

    #[test]
    fn test_deserialize_struct() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Config {
            name: Option<String>,
            user_name: Option<String>,
        }
        let bucket = args(json!({"name": "kitty", "user_name": null}));
        assert_eq!(
            bucket.deserialize::<Config>().unwrap(),
            Config {
                name: Some("kitty".to_string()),
                user_name: None
            }
        );
    }

    #[test]
    fn test_handler_macro_params_and_call() {
        let greet = crate::handler!(|name: String, times: u32| {
            (0..times).map(|_| format!("hello {name}")).collect::<Vec<_>>()
        });
        assert_eq!(greet.params(), vec!["name", "times"]);
        let result = greet.call(&args(json!({"name": "cat", "times": 2}))).unwrap();
        assert_eq!(result, json!(["hello cat", "hello cat"]));
    }

    #[test]
    fn test_handler_macro_untyped_and_empty() {
        let echo = crate::handler!(|detail| detail);
        assert_eq!(echo.params(), vec!["detail"]);
        assert_eq!(echo.call(&args(json!({"detail": null}))).unwrap(), json!(null));

        let init = crate::handler!(|| "init");
        assert!(init.params().is_empty());
        assert_eq!(init.call(&Arguments::new()).unwrap(), json!("init"));
    }

    #[test]
    #[deny(unused_variables)]
    fn test_handler_macro_without_params_binds_nothing() {
        let ping = crate::handler!(|| "pong");
        let checked = crate::handler!(try || Ok(1));
        assert_eq!(ping.call(&Arguments::new()).unwrap(), json!("pong"));
        assert_eq!(checked.call(&Arguments::new()).unwrap(), json!(1));
    }

    #[test]
    fn test_handler_macro_try() {
        let check = crate::handler!(try |size: i64| {
            anyhow::ensure!(size > 0, "size must be positive");
            Ok(size * 2)
        });
        assert_eq!(check.call(&args(json!({"size": 4}))).unwrap(), json!(8));
        let err = check.call(&args(json!({"size": 0}))).unwrap_err();
        assert_eq!(err.to_string(), "size must be positive");
    }

    #[test]
    fn test_fn_handler() {
        let handler = FnHandler::new(["a", "b"], |args: &Arguments| Ok(json!(args.len())));
        assert_eq!(handler.params(), vec!["a", "b"]);
        assert_eq!(handler.call(&args(json!({"a": 1, "b": 2}))).unwrap(), json!(2));
    }

    #[test]
    fn test_dispatch_serialization_keeps_order() {
        let mut dispatch = Dispatch::default();
        dispatch.push("main", Outcome::Handled(json!({"test": "test"})));
        dispatch.push("init", Outcome::Failed("boom".to_string()));
        dispatch.push("info", Outcome::NoHandler);
        assert_eq!(dispatch.parsers().collect::<Vec<_>>(), vec!["main", "init", "info"]);
        assert_eq!(
            serde_json::to_string(&dispatch).unwrap(),
            r#"{"main":{"test":"test"},"init":{"error":"boom"},"info":null}"#
        );
        assert_eq!(dispatch.value("main"), Some(&json!({"test": "test"})));
        assert_eq!(dispatch.value("init"), None);
    }
}
