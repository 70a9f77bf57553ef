//! Argument definitions: one named option or one positional slot.

use crate::config::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::IntErrorKind;
use thiserror::Error;
use tracing::debug;

/// A value could not be assigned to an argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Callback run after processing for an argument that was supplied.
pub type Callback = Box<dyn Fn(&Arg) -> anyhow::Result<()>>;

/// A coerced argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// The value type of an argument.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ArgKind {
    /// Boolean switch, consumes no following token
    Flag,
    /// Raw text (default)
    #[default]
    String,
    /// Floating point number
    Number,
    /// Whole number written with a leading digit
    Integer,
    /// One of a fixed set of values
    Enum(Vec<String>),
}

impl ArgKind {
    /// Resolve a type name, accepting the short aliases (`bool`, `str`,
    /// `num`, `int`). `enum` takes its allowed values from `values`.
    pub fn from_name(
        arg: &str,
        kind: &str,
        values: Option<Vec<String>>,
    ) -> Result<ArgKind, SchemaError> {
        match kind {
            "flag" | "bool" | "boolean" => Ok(ArgKind::Flag),
            "string" | "str" => Ok(ArgKind::String),
            "number" | "num" => Ok(ArgKind::Number),
            "integer" | "int" => Ok(ArgKind::Integer),
            "enum" => match values {
                Some(values) if !values.is_empty() => Ok(ArgKind::Enum(values)),
                _ => Err(SchemaError::EmptyEnum(arg.to_string())),
            },
            other => Err(SchemaError::UnknownType {
                name: arg.to_string(),
                kind: other.to_string(),
            }),
        }
    }

    /// Number of tokens consumed after the matching key.
    pub fn arity(&self) -> usize {
        match self {
            ArgKind::Flag => 0,
            _ => 1,
        }
    }
}

/// Identifier of an argument: a name for options, a 1-based ordinal for
/// positionals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgName {
    Named(String),
    Ordinal(usize),
}

impl ArgName {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgName::Named(name) => Some(name),
            ArgName::Ordinal(_) => None,
        }
    }
}

impl fmt::Display for ArgName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgName::Named(name) => f.write_str(name),
            ArgName::Ordinal(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for ArgName {
    fn from(value: &str) -> Self {
        ArgName::Named(value.to_string())
    }
}

impl From<String> for ArgName {
    fn from(value: String) -> Self {
        ArgName::Named(value)
    }
}

impl From<usize> for ArgName {
    fn from(value: usize) -> Self {
        ArgName::Ordinal(value)
    }
}

/// Serializable description of an argument definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgSummary {
    pub name: String,
    pub short: Option<char>,
    pub long: Option<String>,
    pub description: Option<String>,
    pub help: Option<String>,
    pub group: String,
}

/// Definition of a single option or positional slot.
///
/// Built by value with the consuming setters, then handed to
/// [`Largs::arg`](crate::Largs::arg) or
/// [`Largs::positional`](crate::Largs::positional). Processing state (the
/// current value and the token that supplied it) lives on the definition.
pub struct Arg {
    name: ArgName,
    short: Option<char>,
    long: Option<String>,
    kind: ArgKind,
    required: bool,
    default: Option<Value>,
    value: Option<Value>,
    group: String,
    description: Option<String>,
    help: Option<String>,
    example: Option<String>,
    provided: Option<String>,
    on_assigned: Option<Callback>,
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arg")
            .field("name", &self.name)
            .field("short", &self.short)
            .field("long", &self.long)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("value", &self.value)
            .field("group", &self.group)
            .field("provided", &self.provided)
            .finish_non_exhaustive()
    }
}

impl Arg {
    /// Create a definition.
    ///
    /// An ordinal name makes it positional. A one character name becomes
    /// the short key, anything longer the long key.
    pub fn new(name: impl Into<ArgName>) -> Self {
        let name = name.into();
        let (short, long) = match &name {
            ArgName::Ordinal(_) => (None, None),
            ArgName::Named(n) => {
                let mut chars = n.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => (Some(c), None),
                    _ => (None, Some(n.clone())),
                }
            }
        };

        Self {
            name,
            short,
            long,
            kind: ArgKind::String,
            required: false,
            default: None,
            value: None,
            group: String::new(),
            description: None,
            help: None,
            example: None,
            provided: None,
            on_assigned: None,
        }
    }

    /// Create a positional definition. The engine assigns its ordinal when
    /// it is registered.
    pub fn positional() -> Self {
        Self::new(ArgName::Ordinal(0))
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn long(mut self, long: impl Into<String>) -> Self {
        self.long = Some(long.into());
        self
    }

    /// Set the value type. `Flag` also defaults the value to `false`.
    pub fn kind(mut self, kind: ArgKind) -> Self {
        if kind == ArgKind::Flag {
            self.default = Some(Value::Bool(false));
            self.value = Some(Value::Bool(false));
        }
        self.kind = kind;
        self
    }

    /// Set the value type by name, see [`ArgKind::from_name`].
    pub fn type_name(self, kind: &str, values: Option<Vec<String>>) -> Result<Self, SchemaError> {
        let kind = ArgKind::from_name(&self.name.to_string(), kind, values)?;
        Ok(self.kind(kind))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default, which also pre-seeds the current value.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.value = Some(value.clone());
        self.default = Some(value);
        self
    }

    /// Presentation group; only affects help ordering.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Description, used in help when no help text is set.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// Run `callback` once processing finishes, if this argument was supplied.
    pub fn on_assigned<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Arg) -> anyhow::Result<()> + 'static,
    {
        self.on_assigned = Some(Box::new(callback));
        self
    }

    pub(crate) fn numbered(mut self, ordinal: usize) -> Self {
        self.name = ArgName::Ordinal(ordinal);
        self
    }

    pub fn name(&self) -> &ArgName {
        &self.name
    }

    pub fn short_key(&self) -> Option<char> {
        self.short
    }

    pub fn long_key(&self) -> Option<&str> {
        self.long.as_deref()
    }

    pub fn arg_kind(&self) -> &ArgKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_flag(&self) -> bool {
        self.kind == ArgKind::Flag
    }

    pub fn is_positional(&self) -> bool {
        matches!(self.name, ArgName::Ordinal(_))
    }

    /// Whether a token supplied this argument during processing.
    pub fn was_provided(&self) -> bool {
        self.provided.is_some()
    }

    pub fn has_callback(&self) -> bool {
        self.on_assigned.is_some()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn group_label(&self) -> &str {
        &self.group
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn example_text(&self) -> Option<&str> {
        self.example.as_deref()
    }

    /// Canonical command line form: `--long/-s`, `--long` or `-s`.
    pub fn display_form(&self) -> String {
        match (&self.long, self.short) {
            (Some(long), Some(short)) => format!("--{}/-{}", long, short),
            (Some(long), None) => format!("--{}", long),
            (None, Some(short)) => format!("-{}", short),
            (None, None) => self.name.to_string(),
        }
    }

    /// The form the user actually typed, falling back to the name.
    pub fn used_form(&self) -> String {
        match &self.provided {
            Some(token) if !self.is_positional() => token.clone(),
            _ => self.name.to_string(),
        }
    }

    pub fn summary(&self) -> ArgSummary {
        ArgSummary {
            name: self.name.to_string(),
            short: self.short,
            long: self.long.clone(),
            description: self.description.clone(),
            help: self.help.clone(),
            group: self.group.clone(),
        }
    }

    /// Coerce `raw` according to the argument type and store it.
    pub fn assign(&mut self, raw: &str) -> Result<(), ValidationError> {
        debug!(name = %self.name, raw, kind = ?self.kind, "assigning value");
        let value = match &self.kind {
            ArgKind::Flag => Value::Bool(!(raw.is_empty() || raw.eq_ignore_ascii_case("false"))),
            ArgKind::String => Value::String(raw.to_string()),
            ArgKind::Number => match raw.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Value::Number(n),
                _ => {
                    return Err(ValidationError(format!(
                        "Arg \"{}\" was \"{}\" but must be a number [0-9]+.[0-9]+",
                        self.used_form(),
                        raw
                    )))
                }
            },
            ArgKind::Integer => {
                let parsed = raw
                    .starts_with(|c: char| c.is_ascii_digit())
                    .then(|| raw.parse::<i64>());
                match parsed {
                    Some(Ok(i)) => Value::Integer(i),
                    Some(Err(e)) if *e.kind() == IntErrorKind::PosOverflow => {
                        return Err(ValidationError(format!(
                            "Arg \"{}\" was \"{}\" but must be at most {}",
                            self.used_form(),
                            raw,
                            i64::MAX
                        )))
                    }
                    _ => {
                        return Err(ValidationError(format!(
                            "Arg \"{}\" was \"{}\" but must be an integer [0-9]+",
                            self.used_form(),
                            raw
                        )))
                    }
                }
            }
            ArgKind::Enum(values) => {
                if !values.iter().any(|v| v == raw) {
                    return Err(ValidationError(format!(
                        "Arg \"{}\" was \"{}\" but must be one of: {}",
                        self.used_form(),
                        raw,
                        values.join(", ")
                    )));
                }
                Value::String(raw.to_string())
            }
        };
        self.value = Some(value);
        Ok(())
    }

    /// Take this argument's value from the tokens following `matched`, the
    /// token that selected it (`-x`, `--xx`, or a positional's name).
    ///
    /// Returns how many of `remaining` were consumed.
    pub fn consume_from(
        &mut self,
        remaining: &[String],
        matched: &str,
    ) -> Result<usize, ValidationError> {
        self.provided = Some(matched.to_string());
        if self.kind.arity() == 0 {
            self.value = Some(Value::Bool(true));
            return Ok(0);
        }

        let raw = remaining.first().ok_or_else(|| {
            ValidationError(format!(
                "The \"{}\" option requires a parameter",
                self.used_form()
            ))
        })?;
        self.assign(raw)?;
        Ok(1)
    }

    /// Invoke the callback if one is set and the argument was supplied.
    pub(crate) fn notify(&self) -> anyhow::Result<()> {
        match &self.on_assigned {
            Some(callback) if self.was_provided() => callback(self),
            _ => Ok(()),
        }
    }

    /// Forget any value supplied by a previous pass.
    pub(crate) fn clear(&mut self) {
        self.provided = None;
        self.value = self.default.clone();
    }
}
