use crate::config::{Config, OptionsPatch};
use crate::driver::StepDriver;
use crate::errors::RuntimeFault;
use crate::interpreter::executor::Val;
use crate::instrument::{instrument_source, strip_line_comments};
use crate::normalize::{payload_json, WatchResult};
use crate::step::StepRecord;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stepwise")]
#[command(about = "Stepwise - run scripts one statement at a time", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a script to completion, printing every step
    Run {
        /// Script to run
        file: PathBuf,

        /// Expression to watch at every step (repeatable)
        #[arg(short = 'w', long = "watch")]
        watch: Vec<String>,

        /// Print steps as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Step through a script interactively
    Step {
        /// Script to step through
        file: PathBuf,

        /// Expression to watch at every step (repeatable)
        #[arg(short = 'w', long = "watch")]
        watch: Vec<String>,
    },

    /// Print the instrumented program body
    Instrument {
        file: PathBuf,
    },

    /// Print a script with its line comments removed
    StripComments {
        file: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    let mut builder = Config::builder().config_path(cli.config);
    if let Commands::Run { watch, .. } | Commands::Step { watch, .. } = &cli.command {
        if !watch.is_empty() {
            builder = builder.watch(watch.clone());
        }
    }
    // Load before anything else so config errors are reported up front
    let config = builder.build()?;
    init_logging(&config);

    match cli.command {
        Commands::Run { file, json, .. } => {
            let source = read_source(&file).await?;
            let mut driver = StepDriver::new(&source, config.runtime_options())?;
            driver
                .run_to_completion(|record| {
                    if json {
                        println!("{}", record.to_json());
                    } else {
                        print!("{}", format_record(&record));
                    }
                    std::future::ready(())
                })
                .await;
        }

        Commands::Step { file, .. } => {
            let source = read_source(&file).await?;
            let driver = StepDriver::new(&source, config.runtime_options())?;
            step_interactively(driver, &file).await?;
        }

        Commands::Instrument { file } => {
            print!("{}", instrument_source(&read_source(&file).await?));
        }

        Commands::StripComments { file } => {
            print!("{}", strip_line_comments(&read_source(&file).await?));
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over the configured filter
fn init_logging(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn read_source(file: &Path) -> Result<String> {
    tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))
}

/* ===================== Interactive Stepping ===================== */

const STEP_HELP: &str = "commands: next (n), continue (c), print <expr> (p), watch <expr>, unwatch, reset, quit (q)";

async fn step_interactively(mut driver: StepDriver, file: &Path) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", STEP_HELP);

    loop {
        print!("(step) ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" | "n" | "next" => match driver.advance() {
                Some(record) => print!("{}", format_record(&record)),
                None => println!("program finished; use reset to start over"),
            },
            "c" | "continue" => {
                for record in driver.steps() {
                    print!("{}", format_record(&record));
                }
            }
            "p" | "print" => match driver.evaluate_expression(argument) {
                Ok(value) => println!("{}", value.inspect()),
                Err(e) => println!("{}", e),
            },
            "watch" if !argument.is_empty() => {
                let mut watch = driver.options().watch.clone();
                watch.push(argument.to_string());
                driver.configure(OptionsPatch::watch(watch))?;
                println!("watching {:?}; restarting", driver.options().watch);
            }
            "unwatch" => {
                driver.configure(OptionsPatch::watch(Vec::<String>::new()))?;
                println!("watch list cleared; restarting");
            }
            "reset" => match read_source(file).await {
                Ok(source) => match driver.reset(&source, None) {
                    Ok(()) => println!("reloaded {}", file.display()),
                    Err(e) => println!("{}", e),
                },
                Err(e) => println!("{:#}", e),
            },
            "q" | "quit" | "exit" => break,
            _ => println!("{}", STEP_HELP),
        }
    }

    Ok(())
}

/* ===================== Formatting ===================== */

/// Human-readable rendering of one record, newline-terminated
pub fn format_record(record: &StepRecord) -> String {
    let mut out = format!(
        "[{}] {} {}:{}",
        record.index,
        record.kind.as_str(),
        record.line,
        record.column
    );
    if !record.code.is_empty() {
        out.push(' ');
        out.push_str(&record.code);
    }
    out.push('\n');

    for line in &record.output {
        out.push_str(&format!("  > {}\n", line.text));
    }
    for result in &record.watch {
        match result {
            WatchResult::Value { expression, value } => {
                out.push_str(&format!("  {} = {}\n", expression, value.inspect()));
            }
            WatchResult::Error { expression, error } => {
                out.push_str(&format!("  {} !! {}\n", expression, describe(error)));
            }
        }
    }
    if let Some(error) = &record.error {
        out.push_str(&format!("  error: {}\n", describe(error)));
    }
    out
}

fn describe(payload: &Val) -> String {
    RuntimeFault {
        payload: payload_json(payload),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::parse_from([
            "stepwise", "run", "demo.js", "-w", "x", "--watch", "y * 2", "--json",
        ]);

        let Commands::Run { file, watch, json } = cli.command else {
            unreachable!()
        };
        assert_eq!(file, PathBuf::from("demo.js"));
        assert_eq!(watch, vec!["x", "y * 2"]);
        assert!(json);
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["stepwise", "config", "--config", "custom.toml"]);

        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Config));
    }

    #[test]
    fn test_format_record() {
        let options = crate::config::RuntimeOptions::with_watch(["x", "nope"]);
        let mut driver = StepDriver::new("let x = 1; report(x);", options).unwrap();
        driver.advance();
        driver.advance();
        let record = driver.advance().unwrap();

        assert_eq!(
            format_record(&record),
            "[2] statement 1:12 report(x);\n  > 1\n  x = 1\n  nope !! ReferenceError: nope is not defined\n"
        );
    }

    #[test]
    fn test_format_error_record() {
        let mut driver = StepDriver::new("throw new Error('boom');", Default::default()).unwrap();
        let last = driver.steps().last().unwrap();

        assert_eq!(
            format_record(&last),
            "[1] error 1:25\n  error: Error: boom\n"
        );
    }
}
