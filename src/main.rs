use clap::{Arg, ArgAction, Command};
use snapkeep::{dump_config, load_config, BackupOutcome, CancelToken, Engine, SnapkeepError};
use std::fs;
use std::path::Path;
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let result = run();
    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(error) => {
            eprintln!("Error: {error}");
            process::exit(error.exit_code());
        }
    }
}

fn run() -> Result<i32, SnapkeepError> {
    let matches = Command::new("snapkeep")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Timestamped file versioning with daily backups, snapshots, and retention pruning")
        .long_about(
            "snapkeep keeps a versioned copy of every save of a tracked file.\n\
             Example: snapkeep save notes.txt → <root>/2025-06-03/notes (2025-06-03-14-52-31).txt",
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress all output except errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dump-config")
                .long("dump-config")
                .help("Display current configuration settings and exit")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("save")
                .about("Record a save of FILE: preserve the original once, then add a versioned copy")
                .arg(Arg::new("file").required(true).value_name("FILE")),
        )
        .subcommand(
            Command::new("snapshot")
                .about("Take an explicit snapshot of FILE, kept outside the retention window")
                .arg(Arg::new("file").required(true).value_name("FILE")),
        )
        .subcommand(
            Command::new("list")
                .about("List the stored versions of FILE, newest first")
                .arg(Arg::new("file").required(true).value_name("FILE")),
        )
        .subcommand(Command::new("prune").about("Delete daily directories past the retention window"))
        .get_matches();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let quiet = matches.get_flag("quiet");

    let config = load_config()?;

    if matches.get_flag("dump-config") {
        dump_config(&config)?;
        return Ok(0);
    }

    let cancel = CancelToken::new();
    setup_signal_handler(cancel.clone());

    let mut engine = Engine::new(config, cancel);

    match matches.subcommand() {
        Some(("save", sub)) => {
            let file = sub.get_one::<String>("file").expect("required arg");
            cmd_save(&mut engine, Path::new(file), quiet)
        }
        Some(("snapshot", sub)) => {
            let file = sub.get_one::<String>("file").expect("required arg");
            cmd_snapshot(&mut engine, Path::new(file), quiet)
        }
        Some(("list", sub)) => {
            let file = sub.get_one::<String>("file").expect("required arg");
            cmd_list(&engine, Path::new(file), quiet)
        }
        Some(("prune", _)) => cmd_prune(&engine, quiet),
        _ => Err(SnapkeepError::config(
            "No command specified. Use --help for usage information.",
        )),
    }
}

/// Play the modify → pre-save → post-save event sequence for one file.
fn cmd_save(engine: &mut Engine, file: &Path, quiet: bool) -> Result<i32, SnapkeepError> {
    let size = fs::metadata(file)?.len();
    engine.note_modified(file);

    let presave = engine.backup_on_presave(file, size)?;
    if let BackupOutcome::Created(path) = &presave {
        if !quiet {
            println!("Preserved original: {}", path.display());
        }
    }

    let postsave = engine.backup_on_postsave(file, size)?;
    match postsave {
        BackupOutcome::Created(path) => {
            if !quiet {
                println!("Created backup: {}", path.display());
            }
        }
        _ if matches!(&presave, BackupOutcome::Created(_)) => {}
        _ => {
            if !quiet {
                println!("Nothing to back up: {} (not eligible)", file.display());
            }
        }
    }

    Ok(0)
}

fn cmd_snapshot(engine: &mut Engine, file: &Path, quiet: bool) -> Result<i32, SnapkeepError> {
    let size = fs::metadata(file)?.len();

    match engine.create_snapshot(file, size)? {
        BackupOutcome::Created(path) => {
            if !quiet {
                println!("Created snapshot: {}", path.display());
            }
        }
        _ => {
            if !quiet {
                println!("Snapshot skipped: {} (not eligible)", file.display());
            }
        }
    }

    Ok(0)
}

fn cmd_list(engine: &Engine, file: &Path, quiet: bool) -> Result<i32, SnapkeepError> {
    let Some(file_name) = file.file_name().and_then(|n| n.to_str()) else {
        return Err(SnapkeepError::config(format!(
            "Not a usable file name: {}",
            file.display()
        )));
    };

    let records = engine.list_versions(file_name)?;

    if records.is_empty() {
        if !quiet {
            println!("Sorry, no backups found for {file_name}.");
        }
        return Ok(0);
    }

    for record in &records {
        println!("{}", record.created);
        println!("  Size: {}", record.size);
        println!("  Filename: {}", record.file_name);
        println!("  Type: {}", record.kind);
        println!("  Path: {}", record.path.display());
    }

    Ok(0)
}

fn cmd_prune(engine: &Engine, quiet: bool) -> Result<i32, SnapkeepError> {
    let pruned = engine.prune_now()?;
    if !quiet {
        println!("{pruned} snapshot directories pruned.");
    }
    Ok(0)
}

fn setup_signal_handler(cancel: CancelToken) {
    if let Err(error) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user, finishing up...");
        cancel.cancel();
    }) {
        eprintln!("Warning: could not install Ctrl-C handler: {error}");
    }
}
