//! largs - declarative command line argument processing.
//!
//! Describe options, positional slots and sub-commands with [`Arg`] and
//! [`Largs`] (or a JSON [`CommandConfig`]), then process an argument
//! vector into a typed [`Snapshot`].

pub mod arg;
pub mod config;
pub mod help;
pub mod largs;
pub mod output;
pub mod parser;

pub use arg::{Arg, ArgKind, ArgName, ArgSummary, ValidationError, Value};
pub use config::{ArgConfig, ArgsConfig, CommandConfig, SchemaError};
pub use help::{render_error, render_help, render_version, run, Outcome, Rendered};
pub use largs::Largs;
pub use output::Snapshot;
pub use parser::ParseError;
