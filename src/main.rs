use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use covtree::cli::{self, CommandResult};
use covtree::config::{Config, DEFAULT_CONFIG_FILE};
use covtree::{browser, locate::GoList};

/// Go test runner with a browsable, folder-by-folder HTML coverage report.
#[derive(Parser)]
#[command(name = "covtree", version, about)]
struct Cli {
    /// Path to the project config file (default: ./covtree.json)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log debug output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured test command and summarise the results.
    Test,

    /// Run the tests with coverage and write the HTML report.
    Report {
        /// Build the report from an existing cover profile instead of
        /// running the tests.
        #[arg(long)]
        profile: Option<PathBuf>,

        /// Do not open the report in a browser.
        #[arg(long)]
        no_open: bool,
    },

    /// Run a script from the config file.
    Run {
        /// Script name.
        script: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<bool> {
    let config = Config::load(&args.config).context("Failed to load config")?;
    let working_dir = std::env::current_dir().context("Failed to read current directory")?;

    let result = match args.command {
        Commands::Test => cli::cmd_test(&config)?,
        Commands::Run { script } => cli::cmd_run(&config, &script)?,
        Commands::Report { profile, no_open } => {
            let lister = GoList::new(&working_dir);
            let (result, outcome) =
                cli::cmd_report(&config, &working_dir, profile.as_deref(), &lister)?;
            print!("{}", result.output);
            if !no_open && outcome.index.is_file() {
                browser::open(&format!("file://{}", outcome.index.display()));
            }
            return Ok(result.success);
        }
    };

    let CommandResult { output, success } = result;
    print!("{output}");
    Ok(success)
}
