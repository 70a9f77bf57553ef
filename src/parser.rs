//! Argument vector processing: normalization, dispatch and validation.

use crate::arg::{Arg, ValidationError};
use crate::largs::Largs;
use crate::output::Snapshot;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors that can occur while processing an argument vector.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A `-x` or `--xxx` token matched no option. `known` lists the keys of
    /// the same form that would have matched.
    #[error("The \"{token}\" argument is unknown")]
    UnknownArgument { token: String, known: Vec<String> },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// One line per missing option, in declaration order.
    #[error("Missing required arguments{}", missing_lines(.0))]
    MissingRequired(Vec<String>),

    /// Number of required positionals when any of them is missing.
    #[error("{} {}", .0, shortfall_suffix(.0))]
    MissingPositionals(usize),

    #[error("handler for \"{name}\" failed: {source}")]
    Callback {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

fn missing_lines(errors: &[String]) -> String {
    errors.iter().map(|e| format!("\n {}", e)).collect()
}

fn shortfall_suffix(count: &usize) -> &'static str {
    if *count == 1 {
        "argument is required"
    } else {
        "arguments are required"
    }
}

impl ParseError {
    /// Per-field messages of a missing required options error.
    pub fn missing(&self) -> &[String] {
        match self {
            ParseError::MissingRequired(errors) => errors,
            _ => &[],
        }
    }
}

fn invalid(description: &str, arg: &str, full: Option<&str>) -> ValidationError {
    match full {
        Some(full) => ValidationError(format!("{} \"{}\" in \"{}\"", description, arg, full)),
        None => ValidationError(format!("{} \"{}\"", description, arg)),
    }
}

impl Largs {
    /// The option a `-x` or `--xxx` token selects, if any.
    pub(crate) fn lookup_token(&self, token: &str) -> Option<&Arg> {
        if let Some(long) = token.strip_prefix("--") {
            return self.lookup_long(long);
        }
        let mut chars = token.strip_prefix('-')?.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => self.lookup_short(c),
            _ => None,
        }
    }

    /// Split combined short flags (`-abc`) into separate tokens in place.
    ///
    /// Every token starting with `-` is checked, including one that will
    /// become the value of the option before it. Only the last letter of a
    /// cluster may be an option taking a value. Stops at `--` and at a
    /// sub-command name; tokens after those belong to someone else. Running
    /// it on its own output changes nothing.
    pub fn normalise(&self, argv: &mut Vec<String>) -> Result<(), ParseError> {
        let mut i = 0;
        let mut value_next = false;

        while i < argv.len() {
            let token = argv[i].clone();
            let is_value = std::mem::take(&mut value_next);

            if token == "--" {
                break;
            }
            if !token.starts_with('-') {
                // A value that happens to spell a command name stays a value.
                if !is_value && self.command(&token).is_some() {
                    break;
                }
                i += 1;
                continue;
            }
            if token == "-" {
                i += 1;
                continue;
            }
            if token.starts_with("---") {
                return Err(invalid("Invalid argument", &token, None).into());
            }
            if token.starts_with("--") {
                value_next = self.lookup_token(&token).map_or(false, |a| !a.is_flag());
                i += 1;
                continue;
            }

            let letters: Vec<char> = token.chars().skip(1).collect();
            if letters.len() > 1 {
                debug!(token = %token, "expanding combined short options");
                for letter in &letters[..letters.len() - 1] {
                    if self.lookup_short(*letter).map_or(false, |a| !a.is_flag()) {
                        return Err(invalid(
                            "Combined arguments can only be flags.",
                            &letter.to_string(),
                            Some(&token),
                        )
                        .into());
                    }
                }
                let expanded: Vec<String> = letters.iter().map(|c| format!("-{}", c)).collect();
                argv.splice(i..=i, expanded);
                i += letters.len() - 1;
            }

            value_next = self.lookup_token(&argv[i]).map_or(false, |a| !a.is_flag());
            i += 1;
        }

        trace!(?argv, "normalised");
        Ok(())
    }

    /// Process a full process argument vector.
    ///
    /// Positions 0 and 1 (binary and script) are recorded and skipped. The
    /// label defaults to the script path.
    pub fn go(&mut self, process_argv: &[String]) -> Result<Snapshot, ParseError> {
        let tokens = self.strip_invocation(process_argv);
        self.process(tokens)
    }

    pub(crate) fn strip_invocation(&mut self, process_argv: &[String]) -> Vec<String> {
        debug!(?process_argv, "processing invocation");
        self.binary = process_argv.first().cloned();
        self.script = process_argv.get(1).cloned();
        if self.label.is_none() {
            self.label = self.script.clone();
        }
        process_argv.iter().skip(2).cloned().collect()
    }

    /// Process tokens that no longer include the binary and script.
    pub fn process(&mut self, mut argv: Vec<String>) -> Result<Snapshot, ParseError> {
        self.normalise(&mut argv)?;
        self.dispatch(argv)?;
        self.finish()
    }

    fn dispatch(&mut self, argv: Vec<String>) -> Result<(), ParseError> {
        let mut queue: VecDeque<String> = argv.into();

        while let Some(token) = queue.pop_front() {
            if token == "--" {
                self.trailing = queue.drain(..).collect();
                debug!(trailing = ?self.trailing, "stopped at terminator");
                break;
            }

            if let Some(long) = token.strip_prefix("--") {
                debug!(long, "long option");
                let slurped = self.process_long(long, queue.make_contiguous())?;
                queue.drain(..slurped);
            } else if let Some(short) = token.strip_prefix('-').filter(|s| !s.is_empty()) {
                debug!(short, "short option");
                let slurped = self.process_short(short, queue.make_contiguous())?;
                queue.drain(..slurped);
            } else if let Some(idx) = self.commands.iter().position(|(n, _)| *n == token) {
                debug!(command = %token, "handing remaining tokens to sub-command");
                let rest: Vec<String> = queue.drain(..).collect();
                self.commands[idx].1.process(rest)?;
                self.invoked = Some(idx);
                break;
            } else {
                debug!(positional = %token, "positional");
                self.process_positional(token)?;
            }
        }

        Ok(())
    }

    fn process_short(&mut self, short: &str, remaining: &[String]) -> Result<usize, ParseError> {
        let mut chars = short.chars();
        let key = match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        };
        match self.options.iter().position(|a| key.is_some() && a.short_key() == key) {
            Some(idx) => {
                let matched = format!("-{}", short);
                Ok(self.options[idx].consume_from(remaining, &matched)?)
            }
            None => Err(ParseError::UnknownArgument {
                token: short.to_string(),
                known: self.short_keys(),
            }),
        }
    }

    fn process_long(&mut self, long: &str, remaining: &[String]) -> Result<usize, ParseError> {
        match self.options.iter().position(|a| a.long_key() == Some(long)) {
            Some(idx) => {
                let matched = format!("--{}", long);
                Ok(self.options[idx].consume_from(remaining, &matched)?)
            }
            None => Err(ParseError::UnknownArgument {
                token: long.to_string(),
                known: self.long_keys(),
            }),
        }
    }

    fn process_positional(&mut self, token: String) -> Result<(), ParseError> {
        // Positionals do not have to be declared up front.
        if self.positionals.len() == self.processed_positional {
            let ordinal = self.positionals.len() + 1;
            self.positionals.push(Arg::positional().numbered(ordinal));
        }
        let arg = &mut self.positionals[self.processed_positional];
        let name = arg.name().to_string();
        arg.consume_from(std::slice::from_ref(&token), &name)?;
        self.processed_positional += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<Snapshot, ParseError> {
        let missing: Vec<String> = self
            .options
            .iter()
            .filter(|a| a.is_required() && a.value().is_none())
            .map(|a| format!("\"{}\" is required", a.display_form()))
            .collect();
        if !missing.is_empty() {
            debug!(count = missing.len(), "missing required options");
            return Err(ParseError::MissingRequired(missing));
        }

        let required = self.positionals.iter().filter(|a| a.is_required());
        let positional_required = required.clone().count();
        if required.clone().any(|a| a.value().is_none()) {
            return Err(ParseError::MissingPositionals(positional_required));
        }

        for arg in self.options.iter() {
            if arg.was_provided() && arg.has_callback() {
                debug!(name = %arg.name(), "running option handler");
                arg.notify().map_err(|source| ParseError::Callback {
                    name: arg.name().to_string(),
                    source,
                })?;
            }
        }

        let snapshot = self.snapshot();
        if let Some(ref handler) = self.handler {
            debug!(label = ?self.label, "running engine handler");
            handler(&snapshot).map_err(|source| ParseError::Callback {
                name: self.label.clone().unwrap_or_default(),
                source,
            })?;
        }
        Ok(snapshot)
    }

    /// Current values as a snapshot.
    pub fn snapshot(&self) -> Snapshot {
        let options = self
            .options
            .iter()
            .map(|a| (a.name().to_string(), a.value().cloned()))
            .collect();
        let positional = (!self.positionals.is_empty())
            .then(|| self.positionals.iter().map(|a| a.value().cloned()).collect());
        let commands = self
            .invoked
            .map(|idx| {
                let (name, command) = &self.commands[idx];
                vec![(name.clone(), command.snapshot())]
            })
            .unwrap_or_default();

        Snapshot::new(options, positional, commands, self.trailing.clone())
    }
}
