//! The processing engine and its schema-building surface.

use crate::arg::{Arg, ArgKind, ArgName};
use crate::config::{ArgsConfig, SchemaError};
use crate::output::Snapshot;
use std::fmt;
use tracing::debug;

/// Output key holding positional values; not usable as an option name.
pub const POSITIONAL_KEY: &str = "positional";

/// Callback run with the finished snapshot at the end of a pass.
pub type Handler = Box<dyn Fn(&Snapshot) -> anyhow::Result<()>>;

/// A set of argument definitions plus optional sub-commands.
///
/// An engine processes one argument vector. Values are written onto the
/// definitions, so processing again requires [`Largs::reset`] or
/// [`Largs::clear_values`] first.
#[derive(Default)]
pub struct Largs {
    pub(crate) label: Option<String>,
    pub(crate) version: Option<String>,
    pub(crate) help: bool,
    pub(crate) options: Vec<Arg>,
    pub(crate) positionals: Vec<Arg>,
    pub(crate) declared_positionals: usize,
    pub(crate) commands: Vec<(String, Largs)>,
    pub(crate) processed_positional: usize,
    pub(crate) handler: Option<Handler>,
    pub(crate) binary: Option<String>,
    pub(crate) script: Option<String>,
    pub(crate) invoked: Option<usize>,
    pub(crate) trailing: Vec<String>,
}

impl fmt::Debug for Largs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Largs")
            .field("label", &self.label)
            .field("version", &self.version)
            .field("help", &self.help)
            .field("options", &self.options)
            .field("positionals", &self.positionals)
            .field("commands", &self.commands)
            .field("processed_positional", &self.processed_positional)
            .field("invoked", &self.invoked)
            .finish_non_exhaustive()
    }
}

impl Largs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Clear every definition, sub-command and piece of processing state.
    pub fn reset(&mut self) -> &mut Self {
        self.options.clear();
        self.positionals.clear();
        self.declared_positionals = 0;
        self.commands.clear();
        self.processed_positional = 0;
        self.help = false;
        self.version = None;
        self.invoked = None;
        self.trailing.clear();
        self
    }

    /// Drop the values of a previous pass, keeping the schema.
    pub fn clear_values(&mut self) -> &mut Self {
        for arg in self.options.iter_mut() {
            arg.clear();
        }
        // Positionals created on the fly belong to the previous vector.
        self.positionals.truncate(self.declared_positionals);
        for arg in self.positionals.iter_mut() {
            arg.clear();
        }
        for (_, command) in self.commands.iter_mut() {
            command.clear_values();
        }
        self.processed_positional = 0;
        self.invoked = None;
        self.trailing.clear();
        self
    }

    pub fn label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = Some(label.into());
        self
    }

    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn version_text(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Whether `-h/--help` was set up with [`Largs::help`].
    pub fn has_help(&self) -> bool {
        self.help
    }

    /// Register an option, replacing any option of the same name in place.
    pub fn arg(&mut self, arg: Arg) -> Result<&mut Self, SchemaError> {
        let name = match arg.name() {
            ArgName::Named(name) => name.clone(),
            ArgName::Ordinal(n) => return Err(SchemaError::PositionalOption(n.to_string())),
        };
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if name == POSITIONAL_KEY || self.command(&name).is_some() {
            return Err(SchemaError::ReservedName(name));
        }
        check_kind(&arg)?;

        debug!(name = %name, short = ?arg.short_key(), long = ?arg.long_key(), "registering option");
        match self.options.iter().position(|a| a.name() == arg.name()) {
            Some(idx) => self.options[idx] = arg,
            None => self.options.push(arg),
        }
        Ok(self)
    }

    /// Register options from a declarative map of settings.
    pub fn args(&mut self, config: &ArgsConfig) -> Result<&mut Self, SchemaError> {
        for (name, settings) in config.iter() {
            let arg = settings.to_arg(name.as_str())?;
            self.arg(arg)?;
        }
        Ok(self)
    }

    /// Register the next positional slot.
    pub fn positional(&mut self, arg: Arg) -> Result<&mut Self, SchemaError> {
        if let ArgName::Named(name) = arg.name() {
            return Err(SchemaError::NamedPositional(name.clone()));
        }
        check_kind(&arg)?;
        let ordinal = self.positionals.len() + 1;
        self.positionals.push(arg.numbered(ordinal));
        self.declared_positionals += 1;
        Ok(self)
    }

    /// Register a sub-command. It takes every token after its name.
    pub fn add_command(
        &mut self,
        name: impl Into<String>,
        command: Largs,
    ) -> Result<&mut Self, SchemaError> {
        let name = name.into();
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if name == POSITIONAL_KEY || self.lookup_name(&name).is_some() {
            return Err(SchemaError::ReservedName(name));
        }
        match self.commands.iter().position(|(n, _)| *n == name) {
            Some(idx) => self.commands[idx].1 = command,
            None => self.commands.push((name, command)),
        }
        Ok(self)
    }

    pub fn set_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&Snapshot) -> anyhow::Result<()> + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Set up `-h/--help`.
    pub fn help(&mut self) -> Result<&mut Self, SchemaError> {
        let arg = Arg::new("help")
            .short('h')
            .kind(ArgKind::Flag)
            .description("This help")
            .group("zdefault");
        self.arg(arg)?;
        self.help = true;
        Ok(self)
    }

    /// Set up `-v/--version` reporting `version`.
    pub fn version(&mut self, version: impl Into<String>) -> Result<&mut Self, SchemaError> {
        let arg = Arg::new("version")
            .short('v')
            .kind(ArgKind::Flag)
            .description("Display the version")
            .group("zdefault");
        self.arg(arg)?;
        self.version = Some(version.into());
        Ok(self)
    }

    // Lookups

    /// Options in declaration order.
    pub fn each_arg(&self) -> impl Iterator<Item = &Arg> {
        self.options.iter()
    }

    /// Options ordered by group label, declaration order within a group.
    pub fn args_by_group(&self) -> Vec<&Arg> {
        let mut ordered: Vec<&Arg> = self.options.iter().collect();
        ordered.sort_by(|a, b| a.group_label().cmp(b.group_label()));
        ordered
    }

    pub fn positionals(&self) -> &[Arg] {
        &self.positionals
    }

    pub fn commands(&self) -> impl Iterator<Item = (&str, &Largs)> {
        self.commands.iter().map(|(name, cmd)| (name.as_str(), cmd))
    }

    pub fn command(&self, name: &str) -> Option<&Largs> {
        self.commands
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cmd)| cmd)
    }

    pub fn lookup_short(&self, short: char) -> Option<&Arg> {
        self.options.iter().find(|a| a.short_key() == Some(short))
    }

    pub fn lookup_long(&self, long: &str) -> Option<&Arg> {
        self.options.iter().find(|a| a.long_key() == Some(long))
    }

    pub fn lookup_name(&self, name: &str) -> Option<&Arg> {
        self.options.iter().find(|a| a.name().as_str() == Some(name))
    }

    pub fn lookup_group(&self, group: &str) -> Vec<&Arg> {
        self.options
            .iter()
            .filter(|a| a.group_label() == group)
            .collect()
    }

    /// Short keys of all options, as `-x`.
    pub fn short_keys(&self) -> Vec<String> {
        self.options
            .iter()
            .filter_map(|a| a.short_key())
            .map(|c| format!("-{}", c))
            .collect()
    }

    /// Long keys of all options, as `--xxx`.
    pub fn long_keys(&self) -> Vec<String> {
        self.options
            .iter()
            .filter_map(|a| a.long_key())
            .map(|l| format!("--{}", l))
            .collect()
    }

    /// Path of the binary from the last processed invocation.
    pub fn binary(&self) -> Option<&str> {
        self.binary.as_deref()
    }

    /// Path of the script from the last processed invocation.
    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }
}

fn check_kind(arg: &Arg) -> Result<(), SchemaError> {
    match arg.arg_kind() {
        ArgKind::Enum(values) if values.is_empty() => {
            Err(SchemaError::EmptyEnum(arg.name().to_string()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArgConfig;

    #[test]
    fn test_with_label() {
        let mut l = Largs::with_label("id");
        assert_eq!(l.label_text(), Some("id"));
        l.label("whatever");
        assert_eq!(l.label_text(), Some("whatever"));
    }

    #[test]
    fn test_lookup_short() {
        let mut l = Largs::with_label("class");
        l.arg(Arg::new("b")).unwrap();
        let b = l.lookup_short('b').unwrap();
        assert_eq!(b.name().as_str(), Some("b"));
        assert_eq!(b.short_key(), Some('b'));
    }

    #[test]
    fn test_lookup_long() {
        let mut l = Largs::with_label("class");
        l.arg(Arg::new("ba")).unwrap();
        let b = l.lookup_long("ba").unwrap();
        assert_eq!(b.name().as_str(), Some("ba"));
        assert!(l.lookup_long("bb").is_none());
    }

    #[test]
    fn test_lookup_group() {
        let mut l = Largs::with_label("class");
        l.arg(Arg::new("ba").group("second"))
            .unwrap()
            .arg(Arg::new("cd").group("second"))
            .unwrap()
            .arg(Arg::new("ef").group("first"))
            .unwrap();

        let names: Vec<String> = l
            .lookup_group("second")
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(names, vec!["ba", "cd"]);
    }

    #[test]
    fn test_args_by_group_is_stable() {
        let mut l = Largs::new();
        l.help().unwrap();
        l.arg(Arg::new("zz")).unwrap();
        l.arg(Arg::new("aa").group("b")).unwrap();
        l.arg(Arg::new("yy")).unwrap();

        let names: Vec<String> = l
            .args_by_group()
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(names, vec!["zz", "yy", "aa", "help"]);
    }

    #[test]
    fn test_arg_replaces_same_name() {
        let mut l = Largs::new();
        l.arg(Arg::new("a")).unwrap();
        l.arg(Arg::new("b")).unwrap();
        l.arg(Arg::new("a").required()).unwrap();
        assert_eq!(l.each_arg().count(), 2);
        assert!(l.each_arg().next().unwrap().is_required());
    }

    #[test]
    fn test_arg_rejects_command_name() {
        let mut l = Largs::new();
        l.add_command("build", Largs::new()).unwrap();
        let result = l.arg(Arg::new("build"));
        assert!(matches!(result, Err(SchemaError::ReservedName(name)) if name == "build"));
    }

    #[test]
    fn test_command_rejects_option_name() {
        let mut l = Largs::new();
        l.arg(Arg::new("build")).unwrap();
        let result = l.add_command("build", Largs::new());
        assert!(matches!(result, Err(SchemaError::ReservedName(_))));
    }

    #[test]
    fn test_builtins_reject_command_names() {
        let mut l = Largs::new();
        l.add_command("help", Largs::new()).unwrap();
        l.add_command("version", Largs::new()).unwrap();

        let result = l.help();
        assert!(matches!(result, Err(SchemaError::ReservedName(name)) if name == "help"));
        let result = l.version("1");
        assert!(matches!(result, Err(SchemaError::ReservedName(name)) if name == "version"));
        assert!(!l.has_help());
        assert!(l.version_text().is_none());
        assert!(l.lookup_short('h').is_none());
    }

    #[test]
    fn test_positional_key_is_reserved() {
        let mut l = Largs::new();
        let result = l.arg(Arg::new("positional"));
        assert!(matches!(result, Err(SchemaError::ReservedName(_))));
    }

    #[test]
    fn test_arg_rejects_positional() {
        let mut l = Largs::new();
        let result = l.arg(Arg::positional());
        assert!(matches!(result, Err(SchemaError::PositionalOption(_))));
    }

    #[test]
    fn test_positional_rejects_named() {
        let mut l = Largs::new();
        let result = l.positional(Arg::new("file"));
        assert!(matches!(result, Err(SchemaError::NamedPositional(name)) if name == "file"));
    }

    #[test]
    fn test_empty_enum_rejected() {
        let mut l = Largs::new();
        let result = l.arg(Arg::new("mode").kind(ArgKind::Enum(vec![])));
        assert!(matches!(result, Err(SchemaError::EmptyEnum(name)) if name == "mode"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut l = Largs::new();
        assert!(matches!(l.arg(Arg::new("")), Err(SchemaError::EmptyName)));
    }

    #[test]
    fn test_positionals_are_numbered() {
        let mut l = Largs::new();
        l.positional(Arg::positional()).unwrap();
        l.positional(Arg::new(7usize).required()).unwrap();
        let names: Vec<String> = l.positionals().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["1", "2"]);
        assert!(l.positionals()[1].is_required());
    }

    #[test]
    fn test_help_and_version_options() {
        let mut l = Largs::new();
        l.help().unwrap().version("2").unwrap();
        assert!(l.has_help());
        assert_eq!(l.version_text(), Some("2"));

        let help = l.lookup_short('h').unwrap();
        assert_eq!(help.long_key(), Some("help"));
        assert!(help.is_flag());
        assert_eq!(help.group_label(), "zdefault");

        let version = l.lookup_long("version").unwrap();
        assert_eq!(version.short_key(), Some('v'));
    }

    #[test]
    fn test_args_from_config() {
        let config: ArgsConfig = serde_json::from_str(
            r#"{
                "what": {"long": "what", "short": "a", "type": "integer"},
                "that": {"type": "string"}
            }"#,
        )
        .unwrap();
        let mut l = Largs::new();
        l.args(&config).unwrap();

        let what = l.lookup_short('a').unwrap();
        assert_eq!(what.arg_kind(), &ArgKind::Integer);
        assert_eq!(l.lookup_long("that").unwrap().name().to_string(), "that");
        assert_eq!(l.long_keys(), vec!["--what", "--that"]);
        assert_eq!(l.short_keys(), vec!["-a"]);
    }

    #[test]
    fn test_args_from_config_entries() {
        let config: ArgsConfig = vec![(
            "f".to_string(),
            ArgConfig {
                required: true,
                ..ArgConfig::default()
            },
        )]
        .into_iter()
        .collect();
        let mut l = Largs::new();
        l.args(&config).unwrap();
        assert!(l.lookup_short('f').unwrap().is_required());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut l = Largs::with_label("id");
        l.help().unwrap().version("1").unwrap();
        l.arg(Arg::new("a")).unwrap();
        l.positional(Arg::positional()).unwrap();
        l.add_command("build", Largs::new()).unwrap();

        l.reset();
        assert_eq!(l.each_arg().count(), 0);
        assert!(l.positionals().is_empty());
        assert_eq!(l.commands().count(), 0);
        assert!(!l.has_help());
        assert!(l.version_text().is_none());
        assert_eq!(l.label_text(), Some("id"));
    }
}
