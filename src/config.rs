//! Declarative JSON schemas and schema errors.

use crate::arg::{Arg, ArgKind, ArgName, Value};
use crate::largs::Largs;
use serde::Deserialize;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

/// Errors raised while building a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse JSON schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown arg type \"{kind}\" for \"{name}\"")]
    UnknownType { name: String, kind: String },

    #[error("enum argument \"{0}\" needs at least one allowed value")]
    EmptyEnum(String),

    #[error("\"values\" on argument \"{0}\" requires type \"enum\"")]
    ValuesWithoutEnum(String),

    #[error("name \"{0}\" is already taken by an option or sub-command")]
    ReservedName(String),

    #[error("argument names cannot be empty")]
    EmptyName,

    #[error("positional argument {0} cannot be registered as an option")]
    PositionalOption(String),

    #[error("option \"{0}\" cannot be registered as a positional argument")]
    NamedPositional(String),
}

/// Settings for one option or positional slot.
///
/// Any key not listed here is rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgConfig {
    /// Short key (e.g. 'v' for -v)
    pub short: Option<char>,
    /// Long key (e.g. "verbose" for --verbose)
    pub long: Option<String>,
    /// Type name: flag, string, number, integer or enum (aliases allowed)
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Allowed values for enum arguments
    pub values: Option<Vec<String>>,
    /// Whether the argument must be supplied
    #[serde(default)]
    pub required: bool,
    /// Default value, stored as given
    pub default: Option<Value>,
    /// Help group
    pub group: Option<String>,
    /// Description, used when no help text is set
    pub description: Option<String>,
    /// Help text
    pub help: Option<String>,
    /// Usage example
    pub example: Option<String>,
}

impl ArgConfig {
    /// Build the definition named `name` from these settings.
    ///
    /// The type is applied before the default so an explicit default
    /// always wins over the flag default of `false`.
    pub fn to_arg(&self, name: impl Into<ArgName>) -> Result<Arg, SchemaError> {
        let mut arg = Arg::new(name);
        let arg_name = arg.name().to_string();

        if let Some(short) = self.short {
            arg = arg.short(short);
        }
        if let Some(ref long) = self.long {
            arg = arg.long(long.clone());
        }
        match self.kind.as_deref() {
            Some(kind) => arg = arg.type_name(kind, self.values.clone())?,
            None if self.values.is_some() => {
                return Err(SchemaError::ValuesWithoutEnum(arg_name));
            }
            None => {}
        }
        if self.values.is_some() && !matches!(arg.arg_kind(), ArgKind::Enum(_)) {
            return Err(SchemaError::ValuesWithoutEnum(arg_name));
        }
        if self.required {
            arg = arg.required();
        }
        if let Some(ref default) = self.default {
            arg = arg.default(default.clone());
        }
        if let Some(ref group) = self.group {
            arg = arg.group(group.clone());
        }
        if let Some(ref description) = self.description {
            arg = arg.description(description.clone());
        }
        if let Some(ref help) = self.help {
            arg = arg.help(help.clone());
        }
        if let Some(ref example) = self.example {
            arg = arg.example(example.clone());
        }
        Ok(arg)
    }
}

/// A JSON object read into a list, keeping document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Entries<T>(Vec<(String, T)>);

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Entries(Vec::new())
    }
}

impl<T> Entries<T> {
    pub fn iter(&self) -> impl Iterator<Item = &(String, T)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> FromIterator<(String, T)> for Entries<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Entries(iter.into_iter().collect())
    }
}

impl<'de, T> Deserialize<'de> for Entries<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{MapAccess, Visitor};

        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T> Visitor<'de> for EntriesVisitor<T>
        where
            T: Deserialize<'de>,
        {
            type Value = Entries<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of names to settings")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, T>()? {
                    entries.push((key, value));
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

/// Option settings by option name, in declaration order.
pub type ArgsConfig = Entries<ArgConfig>;

/// A whole engine: options, positionals and sub-commands.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    /// Label shown in the help header
    pub label: Option<String>,
    /// Version string; also sets up -v/--version
    pub version: Option<String>,
    /// Set up -h/--help
    #[serde(default)]
    pub help: bool,
    /// Options by name
    #[serde(default)]
    pub options: ArgsConfig,
    /// Positional slots in order
    #[serde(default)]
    pub positional: Vec<ArgConfig>,
    /// Sub-commands by name
    #[serde(default)]
    pub commands: Entries<CommandConfig>,
}

impl CommandConfig {
    /// Parse a JSON string into a CommandConfig.
    pub fn from_json(json: &str) -> Result<CommandConfig, SchemaError> {
        let config: CommandConfig = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Build the engine described by this config.
    pub fn build(&self) -> Result<Largs, SchemaError> {
        let mut largs = Largs::new();
        if let Some(ref label) = self.label {
            largs.label(label.clone());
        }
        if self.help {
            largs.help()?;
        }
        if let Some(ref version) = self.version {
            largs.version(version.clone())?;
        }

        largs.args(&self.options)?;

        for settings in &self.positional {
            largs.positional(settings.to_arg(ArgName::Ordinal(0))?)?;
        }

        for (name, command) in self.commands.iter() {
            largs.add_command(name.clone(), command.build()?)?;
        }

        Ok(largs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "label": "app",
            "version": "0.2.0",
            "help": true,
            "options": {
                "first": {"short": "f", "long": "firstthing", "required": true},
                "second": {"short": "s", "long": "two", "type": "integer", "default": 1,
                           "help": "Some more help for the two integer"}
            },
            "positional": [
                {"type": "enum", "values": ["this", "other"], "required": true}
            ],
            "commands": {
                "build": {"options": {"what": {"type": "flag"}}}
            }
        }"#;

        let config = CommandConfig::from_json(json).unwrap();
        assert_eq!(config.label, Some("app".to_string()));
        assert_eq!(config.version, Some("0.2.0".to_string()));
        assert!(config.help);
        assert_eq!(config.options.len(), 2);
        assert_eq!(config.positional.len(), 1);
        assert_eq!(config.commands.len(), 1);

        let names: Vec<&str> = config.options.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);

        let (_, second) = &config.options.iter().nth(1).unwrap();
        assert_eq!(second.default, Some(Value::Integer(1)));
        assert_eq!(second.kind.as_deref(), Some("integer"));

        let largs = config.build().unwrap();
        assert_eq!(largs.label_text(), Some("app"));
        assert!(largs.has_help());
        assert_eq!(largs.lookup_long("firstthing").unwrap().short_key(), Some('f'));
        assert_eq!(
            largs.lookup_long("two").unwrap().value(),
            Some(&Value::Integer(1))
        );
        assert!(largs.positionals()[0].is_required());
        let build = largs.command("build").unwrap();
        assert!(build.lookup_long("what").unwrap().is_flag());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = CommandConfig::from_json("{}").unwrap();
        assert!(config.label.is_none());
        assert!(config.version.is_none());
        assert!(!config.help);
        assert!(config.options.is_empty());
        assert!(config.positional.is_empty());
        assert!(config.commands.is_empty());
        config.build().unwrap();
    }

    #[test]
    fn test_options_keep_document_order() {
        let config = CommandConfig::from_json(
            r#"{"options": {"zeta": {}, "alpha": {}, "mid": {}}}"#,
        )
        .unwrap();
        let largs = config.build().unwrap();
        let names: Vec<String> = largs.each_arg().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_error_on_unknown_setting() {
        let result = CommandConfig::from_json(r#"{"options": {"a": {"shorty": "x"}}}"#);
        assert!(matches!(result, Err(SchemaError::Json(_))));
    }

    #[test]
    fn test_error_on_unknown_top_level_field() {
        let result = CommandConfig::from_json(r#"{"args": []}"#);
        assert!(matches!(result, Err(SchemaError::Json(_))));
    }

    #[test]
    fn test_error_on_invalid_short() {
        let result = CommandConfig::from_json(r#"{"options": {"a": {"short": "ab"}}}"#);
        assert!(matches!(result, Err(SchemaError::Json(_))));
    }

    #[test]
    fn test_error_on_unknown_type() {
        let config =
            CommandConfig::from_json(r#"{"options": {"id": {"type": "badtype"}}}"#).unwrap();
        let result = config.build();
        assert!(matches!(
            result,
            Err(SchemaError::UnknownType { name, kind }) if name == "id" && kind == "badtype"
        ));
    }

    #[test]
    fn test_error_on_enum_without_values() {
        let config = CommandConfig::from_json(r#"{"options": {"mode": {"type": "enum"}}}"#).unwrap();
        assert!(matches!(config.build(), Err(SchemaError::EmptyEnum(_))));
    }

    #[test]
    fn test_error_on_values_without_enum() {
        let config =
            CommandConfig::from_json(r#"{"options": {"mode": {"values": ["a"]}}}"#).unwrap();
        assert!(matches!(config.build(), Err(SchemaError::ValuesWithoutEnum(_))));

        let config = CommandConfig::from_json(
            r#"{"options": {"mode": {"type": "string", "values": ["a"]}}}"#,
        )
        .unwrap();
        assert!(matches!(config.build(), Err(SchemaError::ValuesWithoutEnum(_))));
    }

    #[test]
    fn test_error_on_option_command_collision() {
        let config = CommandConfig::from_json(
            r#"{"options": {"build": {}}, "commands": {"build": {}}}"#,
        )
        .unwrap();
        assert!(matches!(
            config.build(),
            Err(SchemaError::ReservedName(name)) if name == "build"
        ));
    }

    #[test]
    fn test_default_applied_after_flag_type() {
        let config = CommandConfig::from_json(
            r#"{"options": {"colour": {"default": true, "type": "flag"}}}"#,
        )
        .unwrap();
        let largs = config.build().unwrap();
        assert_eq!(
            largs.lookup_name("colour").unwrap().value(),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn test_single_char_option_name_is_short() {
        let config = CommandConfig::from_json(
            r#"{"options": {"f": {"required": true, "help": "This is the f description"}}}"#,
        )
        .unwrap();
        let largs = config.build().unwrap();
        let f = largs.lookup_short('f').unwrap();
        assert!(f.is_required());
        assert_eq!(f.help_text(), Some("This is the f description"));
    }
}
