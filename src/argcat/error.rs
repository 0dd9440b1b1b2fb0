use thiserror::Error;

/// Problems found while reading or validating a manifest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest is empty")]
    Empty,

    #[error("parser `{0}` is defined more than once")]
    DuplicateParser(String),

    #[error("an argument of parser `{parser}` has neither a name nor a dest")]
    MissingName { parser: String },

    #[error("invalid flag `{flag}` in parser `{parser}`")]
    InvalidFlag { parser: String, flag: String },

    #[error("dest `{dest}` is used more than once in parser `{parser}`")]
    DuplicateDest { parser: String, dest: String },

    #[error("flag `{flag}` is used more than once in parser `{parser}`")]
    DuplicateFlag { parser: String, flag: String },

    #[error("`{name}` is reserved in parser `{parser}`")]
    Reserved { parser: String, name: String },

    #[error("argument `{dest}` of parser `{parser}` refers to unknown group `{group}`")]
    UnknownGroup {
        parser: String,
        dest: String,
        group: String,
    },

    #[error("group `{group}` of parser `{parser}` has the same name as an argument")]
    GroupConflictsWithDest { parser: String, group: String },

    #[error("argument `{dest}` of parser `{parser}` is required but belongs to mutually exclusive group `{group}`")]
    RequiredInExclusiveGroup {
        parser: String,
        dest: String,
        group: String,
    },

    #[error("invalid value `{value}` for argument `{dest}` of parser `{parser}`: {reason}")]
    InvalidValue {
        parser: String,
        dest: String,
        value: String,
        reason: String,
    },

    #[error("argument `{dest}` of parser `{parser}`: {reason}")]
    InvalidArgument {
        parser: String,
        dest: String,
        reason: String,
    },

    #[error("unknown type `{0}` (expected str, int, float or bool)")]
    UnknownType(String),

    #[error("unknown action `{0}`")]
    UnknownAction(String),

    #[error("invalid nargs `{0}` (expected ?, *, + or a positive count)")]
    InvalidNargs(String),
}

/// Problems found while expanding a recipe string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecipeError {
    #[error("recipe is empty")]
    Empty,

    #[error("cannot read recipe `{0}`")]
    Malformed(String),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

#[derive(Error, Debug)]
pub enum ArgCatError {
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Recipe error: {0}")]
    Recipe(#[from] RecipeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Parse(#[from] clap::Error),

    #[error("Unknown parser `{0}`")]
    UnknownParser(String),

    #[error("`{0}` parser existed so cannot be added again")]
    ParserExists(String),

    #[error("Group `{group}` already exists in parser `{parser}`")]
    GroupExists { parser: String, group: String },

    #[error("Multiple handlers for one parser `{0}`")]
    HandlerExists(String),

    #[error(
        "Handler `{handler}({params})` does not meet the requirement of the parser `{parser}`, \
         which requires a handler with parameters `({expected})`",
        params = .given.join(", "),
        expected = .required.join(", ")
    )]
    SignatureMismatch {
        parser: String,
        handler: String,
        required: Vec<String>,
        given: Vec<String>,
    },

    #[error("ArgCat does not have any parser")]
    NotBuilt,
}

pub type Result<T> = std::result::Result<T, ArgCatError>;
