use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use itdgen::config::Config;
use itdgen::error::Error;
use itdgen::{commands, diagnostics, logging, watch};

#[derive(Parser)]
#[command(name = "itdgen", about = "Generate inter-type declarations for annotated Java types")]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Project root containing `.itdgen.toml`.
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify every artifact matches what generation would produce
    Check,
    /// Print the dependency edges of one type's metadata
    Deps {
        /// Fully-qualified type name, e.g. `com.foo.Foo`
        java_type: String,
        /// Logical path of the type, e.g. `SRC_MAIN_JAVA` or `core:SRC_TEST_JAVA`
        #[arg(long)]
        path: Option<String>,
    },
    /// Write every artifact and the .itdgen.lock manifest
    Generate,
    /// Generate, then regenerate affected artifacts as sources change
    Watch,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match Config::load(&cli.root) {
        Ok(config) => config,
        Err(e) => {
            diagnostics::print_error(&e);
            return ExitCode::from(2);
        },
    };
    logging::init(&config);

    return match run(&cli.root, &config, cli.command) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2)
        },
    };
}

/// Dispatch one subcommand.
///
/// # Errors
///
/// Whatever the command returns.
fn run(root: &Path, config: &Config, command: Commands) -> Result<ExitCode, Error> {
    return match command {
        Commands::Check => commands::check(root, config),
        Commands::Deps { java_type, path } => {
            commands::deps(root, config, &java_type, path.as_deref())?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Generate => commands::generate(root, config),
        Commands::Watch => watch::run(root, config),
    };
}
