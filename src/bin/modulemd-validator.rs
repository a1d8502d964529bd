//! Validates modulemd YAML files against the document schemas, printing the
//! YAML text and error for every rejected subdocument.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use modulemd::ModuleIndex;

#[derive(ClapParser)]
#[command(name = "modulemd-validator", about = "Validate modulemd YAML documents")]
struct Args {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,

    /// Reject unknown mapping keys instead of skipping them.
    #[arg(long)]
    strict: bool,

    /// Files to validate.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
            .init();
    }

    let mut had_failures = false;

    for path in &args.files {
        let mut file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(error) => {
                eprintln!("{}: failed to open file: {error}", path.display());
                had_failures = true;
                continue;
            }
        };

        let mut index = ModuleIndex::new();
        match index.update_from_stream(&mut file, args.strict) {
            Ok(outcome) => {
                for failure in &outcome.failures {
                    eprintln!("{}: rejected subdocument:", path.display());
                    eprintln!("{}", failure.yaml_text);
                    eprintln!("error: {}", failure.error);
                }
                if !outcome.ok {
                    had_failures = true;
                } else {
                    println!("{}: ok", path.display());
                }
            }
            Err(error) => {
                eprintln!("{}: {error}", path.display());
                had_failures = true;
            }
        }
    }

    if had_failures {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
