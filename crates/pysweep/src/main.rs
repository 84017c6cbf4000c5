use std::env;
use std::process::ExitCode;

use anstream::eprintln;
use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;

use crate::commands::ExitStatus;

mod commands;
mod logging;
mod printer;

/// Remove `__pycache__` directories beneath the current working directory.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Do not print any output.
    #[arg(long, short, conflicts_with = "verbose")]
    quiet: bool,

    /// Use verbose output.
    ///
    /// Repeat for more verbosity (`-vv` shows a hierarchical span tree).
    #[arg(long, short, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Disable colors.
    #[arg(long, hide = true, conflicts_with = "color")]
    no_color: bool,

    /// Control colors in output.
    #[arg(long, value_enum, default_value = "auto", conflicts_with = "no_color")]
    color: ColorChoice,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum ColorChoice {
    /// Enables colored output only when the output is going to a terminal or TTY with support.
    Auto,

    /// Enables colored output regardless of the detected environment.
    Always,

    /// Disables colored output.
    Never,
}

impl From<ColorChoice> for anstream::ColorChoice {
    fn from(value: ColorChoice) -> Self {
        match value {
            ColorChoice::Auto => Self::Auto,
            ColorChoice::Always => Self::Always,
            ColorChoice::Never => Self::Never,
        }
    }
}

fn run() -> Result<ExitStatus> {
    let cli = Cli::parse();

    // Configure the `tracing` crate, which controls internal logging.
    logging::setup_logging(match cli.verbose {
        0 => logging::Level::Default,
        1 => logging::Level::Verbose,
        _ => logging::Level::ExtraVerbose,
    })?;

    // Configure the `Printer`, which controls user-facing output in the CLI.
    let printer = if cli.quiet {
        printer::Printer::Quiet
    } else if cli.verbose > 0 {
        printer::Printer::Verbose
    } else {
        printer::Printer::Default
    };

    if cli.no_color {
        anstream::ColorChoice::write_global(anstream::ColorChoice::Never);
    } else {
        anstream::ColorChoice::write_global(cli.color.into());
    }

    // The sweep is always rooted at the current working directory.
    let root = env::current_dir()?;

    commands::clean(&root, printer)
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code.into(),
        Err(err) => {
            let mut causes = err.chain();
            eprintln!("{}: {}", "error".red().bold(), causes.next().unwrap());
            for err in causes {
                eprintln!("  {}: {}", "Caused by".red().bold(), err);
            }
            ExitStatus::Error.into()
        }
    }
}
