//! Help, version and error text for an engine.
//!
//! Everything here returns text and a requested exit code. Writing to the
//! terminal and exiting is left to the caller.

use crate::largs::Largs;
use crate::output::Snapshot;
use crate::parser::ParseError;
use tracing::debug;

/// Text to show and the exit code to finish with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rendered {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Result of [`run`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Processing succeeded.
    Options(Snapshot),
    /// Help, version or an error should be shown before exiting.
    Exit(Rendered),
}

/// Render the option listing.
///
/// ```text
/// app 1.0.0
///
/// Help:
///   -o   --output        - Output file
///   -h   --help          - This help
/// ```
pub fn render_help(largs: &Largs) -> String {
    let mut header = largs.label_text().unwrap_or_default().to_string();
    if let Some(version) = largs.version_text() {
        header.push(' ');
        header.push_str(version);
    }

    let mut text = format!("{}\n\nHelp:\n", header);
    for arg in largs.args_by_group() {
        let short = match arg.short_key() {
            Some(c) => format!("-{:<2}", c),
            None => "   ".to_string(),
        };
        let long = arg
            .long_key()
            .map(|l| format!("--{}", l))
            .unwrap_or_default();
        let help = arg
            .help_text()
            .or_else(|| arg.description_text())
            .unwrap_or_default();
        text.push_str(&format!("  {}  {:<14}  - {}\n", short, long, help));
    }
    text
}

/// Render the version line.
pub fn render_version(largs: &Largs) -> String {
    format!("{}\n", largs.version_text().unwrap_or_default())
}

/// Render a processing failure. Missing required options also show the
/// help text when help is set up.
pub fn render_error(largs: &Largs, error: &ParseError) -> Rendered {
    let stdout = match error {
        ParseError::MissingRequired(_) if largs.has_help() => render_help(largs),
        _ => String::new(),
    };
    Rendered {
        stdout,
        stderr: format!("Error: {}\n", error),
        exit_code: 1,
    }
}

/// Whether `tokens` ask for the built-in option `name` before any `--`.
///
/// Walks the tokens the way processing will, so the value of an option is
/// never taken for a request.
fn requested(largs: &Largs, tokens: &[String], name: &str) -> bool {
    let mut tokens = tokens.to_vec();
    if largs.normalise(&mut tokens).is_err() {
        return false;
    }

    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        if token == "--" || largs.command(token).is_some() {
            break;
        }
        match largs.lookup_token(token) {
            Some(arg) if arg.name().as_str() == Some(name) => return true,
            Some(arg) if !arg.is_flag() => {
                iter.next();
            }
            _ => {}
        }
    }
    false
}

/// Process a full argument vector and decide what to show.
///
/// Help and version requests win over processing, help first. Errors are
/// rendered with [`render_error`].
pub fn run(largs: &mut Largs, process_argv: &[String]) -> Outcome {
    let tokens = largs.strip_invocation(process_argv);

    if largs.has_help() && requested(largs, &tokens, "help") {
        debug!("help requested");
        return Outcome::Exit(Rendered {
            stdout: render_help(largs),
            ..Rendered::default()
        });
    }
    if largs.version_text().is_some() && requested(largs, &tokens, "version") {
        debug!("version requested");
        return Outcome::Exit(Rendered {
            stdout: render_version(largs),
            ..Rendered::default()
        });
    }

    match largs.process(tokens) {
        Ok(snapshot) => Outcome::Options(snapshot),
        Err(error) => {
            debug!(%error, "processing failed");
            Outcome::Exit(render_error(largs, &error))
        }
    }
}
