use clap::{Parser, Subcommand};
use plastic_shell::commands::*;
use plastic_shell::core::{
    error::{PlasticError, Result},
    print_error,
};
use std::env;

#[derive(Parser)]
#[command(name = "plastic-shell")]
#[command(about = "Drive a Plastic SCM workspace through a persistent 'cm shell'")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Print data as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the client, workspace and connection summary
    Connect,
    /// Show the status of the workspace or of the given files
    Status {
        files: Vec<String>,
    },
    /// Check out files for edition
    Checkout {
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Mark private files for add, with their parent directories
    Add {
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Remove files from source control and from disk
    Delete {
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Revert pending changes
    Revert {
        /// Revert every unchanged checked-out file of the workspace
        #[arg(long, conflicts_with_all = ["all", "keep_changes"])]
        unchanged: bool,
        /// Revert every pending change of the workspace
        #[arg(long, conflicts_with = "keep_changes")]
        all: bool,
        /// Undo the checkout but keep the local changes
        #[arg(long)]
        keep_changes: bool,
        files: Vec<String>,
    },
    /// Check in files, or every pending change
    Checkin {
        /// Checkin comment
        #[arg(short, long)]
        message: String,
        files: Vec<String>,
    },
    /// Show the revision history of a file
    History {
        file: String,
    },
    /// List pending changelists and their shelves
    Changelists,
    /// Update the workspace to the head of its branch
    Sync {
        files: Vec<String>,
    },
    /// Switch the workspace to another branch
    Switch {
        branch: String,
    },
    /// List branches
    Branches {
        /// Only those created in the last N days
        #[arg(long)]
        days: Option<i64>,
    },
    /// List changesets, most recent first
    Changesets {
        /// Only those created in the last N days
        #[arg(long)]
        days: Option<i64>,
    },
    /// List smart locks
    Locks,
    /// Release smart locks by item id
    Unlock {
        #[arg(required = true)]
        ids: Vec<i32>,
        /// Remove the locks instead of releasing them
        #[arg(long)]
        remove: bool,
    },
    /// Send a raw command to the shell
    Run {
        verb: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn report(result: Result<()>) {
    if let Err(e) = result {
        match e {
            PlasticError::WorkspaceNotFound { .. } => print_error("Not in a Plastic SCM workspace"),
            e => print_error(&e.to_string()),
        }
        std::process::exit(1);
    }
}

fn main() {
    let cli = Cli::parse();

    // Configure logging based on --debug flag
    if cli.debug {
        env::set_var("RUST_LOG", "debug");
    } else if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", "warn");
    }
    env_logger::init();

    let json = cli.json;
    let result = match cli.command {
        Commands::Connect => execute_connect(),
        Commands::Status { files } => execute_status(files, json),
        Commands::Checkout { files } => execute_checkout(files),
        Commands::Add { files } => execute_add(files),
        Commands::Delete { files } => execute_delete(files),
        Commands::Revert {
            unchanged,
            all,
            keep_changes,
            files,
        } => {
            let mode = if unchanged {
                RevertMode::Unchanged
            } else if all {
                RevertMode::All
            } else {
                RevertMode::Files { keep_changes }
            };
            execute_revert(mode, files)
        }
        Commands::Checkin { message, files } => execute_checkin(message, files),
        Commands::History { file } => execute_history(file, json),
        Commands::Changelists => execute_changelists(json),
        Commands::Sync { files } => execute_sync(files),
        Commands::Switch { branch } => execute_switch(branch),
        Commands::Branches { days } => execute_branches(days, json),
        Commands::Changesets { days } => execute_changesets(days, json),
        Commands::Locks => execute_locks(json),
        Commands::Unlock { ids, remove } => execute_unlock(ids, remove, Vec::new()),
        Commands::Run { verb, args } => execute_run(verb, args),
    };
    report(result);
}
