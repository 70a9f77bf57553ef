//! largs - process an argument vector against a JSON schema.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use largs::{render_help, render_version, run, ArgSummary, CommandConfig, Largs, Outcome};

/// Process command line arguments against a declarative JSON schema.
#[derive(Parser, Debug)]
#[command(name = "largs", version, about, disable_help_subcommand = true)]
struct Cli {
    /// Log processing steps to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process arguments and print the resulting options as JSON
    Parse {
        /// JSON schema for the target program
        #[arg(long)]
        config: String,

        /// Program name shown in help when the schema has no label
        #[arg(long)]
        label: Option<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// Arguments to process for the target program
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Print help text for the target program
    Help {
        /// JSON schema for the target program
        #[arg(long)]
        config: String,
    },

    /// Print version of the target program
    Version {
        /// JSON schema for the target program
        #[arg(long)]
        config: String,
    },

    /// Print the option definitions of the schema as JSON
    Schema {
        /// JSON schema for the target program
        #[arg(long)]
        config: String,
    },
}

fn init_logging(debug: bool) {
    let filter = if debug { "largs=debug" } else { "largs=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(config: &str) -> Result<Largs> {
    let cfg = CommandConfig::from_json(config).context("failed to parse schema JSON")?;
    cfg.build().context("invalid schema")
}

/// The invocation seen by the engine: binary, script, then arguments.
fn invocation(label: Option<String>, args: Vec<String>) -> Vec<String> {
    let mut argv = vec![
        "largs".to_string(),
        label.unwrap_or_else(|| "largs".to_string()),
    ];
    argv.extend(args);
    argv
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Commands::Parse {
            config,
            label,
            pretty,
            args,
        } => {
            let mut largs = load(&config)?;
            match run(&mut largs, &invocation(label, args)) {
                Outcome::Options(snapshot) => {
                    let json = if pretty {
                        snapshot.to_json_pretty()
                    } else {
                        snapshot.to_json()
                    }
                    .context("failed to serialize options")?;
                    println!("{}", json);
                }
                Outcome::Exit(rendered) => {
                    print!("{}", rendered.stdout);
                    eprint!("{}", rendered.stderr);
                    std::process::exit(rendered.exit_code);
                }
            }
        }
        Commands::Help { config } => {
            let largs = load(&config)?;
            print!("{}", render_help(&largs));
        }
        Commands::Version { config } => {
            let largs = load(&config)?;
            print!("{}", render_version(&largs));
        }
        Commands::Schema { config } => {
            let largs = load(&config)?;
            let summaries: Vec<ArgSummary> = largs.each_arg().map(|a| a.summary()).collect();
            let json =
                serde_json::to_string_pretty(&summaries).context("failed to serialize schema")?;
            println!("{}", json);
        }
    }

    Ok(())
}
