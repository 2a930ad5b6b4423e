//! conf-migrate - Main Entry Point
//!
//! Thin CLI wrapper around the `conf_migrate` library: resolves where the
//! previous product version comes from, then migrates the given file in
//! place.

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use conf_migrate::{MigrationOutcome, Migrator, ProductVersion};

/// Bring an INI-style configuration file up to date with the current release
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file to migrate
    file: Option<PathBuf>,

    /// Previous product version as a literal string (e.g. "10.5.31")
    #[arg(
        short = 's',
        long = "old-version",
        value_name = "VERSION",
        conflicts_with = "version_file"
    )]
    old_version: Option<String>,

    /// Read the previous product version from the first line of this file
    #[arg(short = 'f', long = "version-file", value_name = "FILE")]
    version_file: Option<PathBuf>,

    /// Print the migration rule catalog as JSON and exit
    #[arg(long)]
    dump_json: bool,
}

fn print_help_and_exit() -> ! {
    let mut cmd = Args::command();
    cmd.print_help().ok();
    println!(); // Add a newline after help
    std::process::exit(2);
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Check if no arguments were provided (except the program name)
    if std::env::args().len() == 1 {
        print_help_and_exit();
    }

    let args = Args::parse();
    let catalog = conf_migrate::builtin::catalog();

    if args.dump_json {
        println!("{}", serde_json::to_string(&conf_migrate::export::dump(&catalog))?);
        return Ok(());
    }

    let Some(file) = args.file else {
        print_help_and_exit();
    };

    let previous_version = match (&args.old_version, &args.version_file) {
        (Some(version), _) => version.parse()?,
        (None, Some(path)) => ProductVersion::from_release_file(path)?,
        (None, None) => ProductVersion::no_version(),
    };

    println!("previous version = {previous_version}");

    let migrator = Migrator::new(catalog);
    match migrator.migrate_file(&previous_version, &file)? {
        MigrationOutcome::Updated => println!("configuration file updated"),
        MigrationOutcome::Unchanged => println!("configuration file unchanged"),
    }
    Ok(())
}
