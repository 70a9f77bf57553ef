//! The processed configuration object and its JSON form.

use crate::arg::Value;
use crate::largs::POSITIONAL_KEY;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Values produced by one processing pass.
///
/// Serializes as a JSON object: every option by name (unset options as
/// `null`), then `positional` when positionals were declared or used, then
/// one nested object per invoked sub-command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    options: Vec<(String, Option<Value>)>,
    positional: Option<Vec<Option<Value>>>,
    commands: Vec<(String, Snapshot)>,
    trailing: Vec<String>,
}

impl Snapshot {
    pub fn new(
        options: Vec<(String, Option<Value>)>,
        positional: Option<Vec<Option<Value>>>,
        commands: Vec<(String, Snapshot)>,
        trailing: Vec<String>,
    ) -> Self {
        Self {
            options,
            positional,
            commands,
            trailing,
        }
    }

    /// Whether `name` is an option of the engine, set or not.
    pub fn contains(&self, name: &str) -> bool {
        self.options.iter().any(|(n, _)| n == name)
    }

    /// Value of option `name`, or `None` when unknown or unset.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.options
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Option values in declaration order.
    pub fn options(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.options.iter().map(|(n, v)| (n.as_str(), v.as_ref()))
    }

    pub fn positional(&self) -> Option<&[Option<Value>]> {
        self.positional.as_deref()
    }

    /// Snapshot of sub-command `name`, if it was invoked.
    pub fn command(&self, name: &str) -> Option<&Snapshot> {
        self.commands
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    /// Name of the invoked sub-command, if any.
    pub fn command_name(&self) -> Option<&str> {
        self.commands.first().map(|(n, _)| n.as_str())
    }

    /// Tokens after a `--` terminator, untouched.
    pub fn trailing(&self) -> &[String] {
        &self.trailing
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for Snapshot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = self.options.len() + self.commands.len() + usize::from(self.positional.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (name, value) in &self.options {
            map.serialize_entry(name, value)?;
        }
        if let Some(ref positional) = self.positional {
            map.serialize_entry(POSITIONAL_KEY, positional)?;
        }
        for (name, command) in &self.commands {
            map.serialize_entry(name, command)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_snapshot(pairs: &[(&str, Option<Value>)]) -> Snapshot {
        Snapshot::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            None,
            vec![],
            vec![],
        )
    }

    #[test]
    fn test_basic_output() {
        let snapshot = make_snapshot(&[
            ("first", Some(Value::from("one"))),
            ("second", Some(Value::from(2))),
        ]);
        assert_eq!(
            snapshot.to_json().unwrap(),
            r#"{"first":"one","second":2}"#
        );
    }

    #[test]
    fn test_unset_is_null() {
        let snapshot = make_snapshot(&[("ui", None)]);
        assert_eq!(snapshot.to_json().unwrap(), r#"{"ui":null}"#);
        assert!(snapshot.contains("ui"));
        assert!(snapshot.value("ui").is_none());
        assert!(!snapshot.contains("other"));
    }

    #[test]
    fn test_keeps_declaration_order() {
        let snapshot = make_snapshot(&[
            ("zeta", Some(Value::from(true))),
            ("alpha", Some(Value::from(1.5))),
        ]);
        assert_eq!(
            snapshot.to_json().unwrap(),
            r#"{"zeta":true,"alpha":1.5}"#
        );
        let names: Vec<&str> = snapshot.options().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_positional_and_commands() {
        let build = make_snapshot(&[("what", Some(Value::from(true)))]);
        let snapshot = Snapshot::new(
            vec![("v".to_string(), Some(Value::from(false)))],
            Some(vec![Some(Value::from("a")), None]),
            vec![("build".to_string(), build.clone())],
            vec![],
        );
        assert_eq!(
            snapshot.to_json().unwrap(),
            r#"{"v":false,"positional":["a",null],"build":{"what":true}}"#
        );
        assert_eq!(snapshot.command("build"), Some(&build));
        assert_eq!(snapshot.command_name(), Some("build"));
        assert!(snapshot.command("test").is_none());
    }

    #[test]
    fn test_trailing_not_serialized() {
        let snapshot = Snapshot::new(vec![], None, vec![], vec!["-x".to_string()]);
        assert_eq!(snapshot.to_json().unwrap(), "{}");
        assert_eq!(snapshot.trailing(), &["-x".to_string()]);
    }

    #[test]
    fn test_pretty() {
        let snapshot = make_snapshot(&[("a", Some(Value::from(1)))]);
        assert_eq!(snapshot.to_json_pretty().unwrap(), "{\n  \"a\": 1\n}");
    }
}
