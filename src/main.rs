use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
mod prompt;
use passforge::{HasherParams, PasswordManager, Storage, default_storage};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, clap::Args)]
struct Argon2Args {
    /// Argon2 memory cost in KiB (default: 65536)
    #[arg(long = "argon-mem")]
    mem_cost_kib: Option<u32>,

    /// Argon2 time cost / iterations (default: 3)
    #[arg(long = "argon-time")]
    time_cost: Option<u32>,

    /// Argon2 parallelism (default: 1)
    #[arg(long = "argon-parallelism")]
    parallelism: Option<u32>,
}

impl Argon2Args {
    fn to_params(&self) -> Result<HasherParams> {
        let default = HasherParams::default();

        HasherParams::new(
            self.mem_cost_kib.unwrap_or(default.mem_cost_kib()),
            self.time_cost.unwrap_or(default.time_cost()),
            self.parallelism.unwrap_or(default.parallelism()),
        )
    }
}

fn resolve_storage(path: Option<PathBuf>) -> Result<Storage> {
    match path {
        Some(p) => Ok(Storage::new(p)),
        None => default_storage(),
    }
}

#[derive(Debug, Parser)]
#[command(name = "passforge")]
#[command(
    version,
    about = "Deterministic, offline password derivation engine written in Rust."
)]
struct Cli {
    /// Path to the encrypted profile file
    #[arg(long, global = true, value_name = "PATH", env = "PASSFORGE_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Creates the encrypted profile
    Init {
        #[command(flatten)]
        argon2: Argon2Args,
    },

    /// Registers a service label
    #[command(arg_required_else_help = true)]
    Add { service: String },

    /// Deregisters a service label
    #[command(arg_required_else_help = true)]
    Remove { service: String },

    /// Lists registered service labels
    Services,

    /// Derives the password for a registered service
    #[command(arg_required_else_help = true)]
    Generate {
        service: String,

        /// Copy to the clipboard instead of printing
        #[arg(short, long, default_value_t = false)]
        copy: bool,

        /// Seconds before the clipboard is cleared again
        #[arg(long, default_value_t = 30, requires = "copy")]
        clear_after: u64,
    },

    /// Prints the numeric mnemonic seed for the master password
    Seed,

    /// Shows information about the profile
    Info,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    let storage = resolve_storage(args.store.clone())?;

    if let Commands::Init { .. } = args.command {
        if storage.exists() {
            bail!("profile already exists at {}", storage.path().display());
        }
    } else if !storage.exists() {
        bail!("profile does not exist (run 'passforge init' first)");
    }

    let app_password = prompt::read_app_password()?;

    match args.command {
        Commands::Init { argon2 } => {
            let params = argon2.to_params()?;
            PasswordManager::open_with_params(&app_password, storage, params)?;
            println!("profile initialized");
        }
        Commands::Add { service } => {
            let mut pm = PasswordManager::open(&app_password, storage)?;
            pm.add_service(&service)?;
            println!("service '{service}' registered");
        }
        Commands::Remove { service } => {
            let mut pm = PasswordManager::open(&app_password, storage)?;
            pm.remove_service(&service)?;
            println!("service '{service}' removed");
        }
        Commands::Services => {
            let pm = PasswordManager::open(&app_password, storage)?;
            for service in pm.services()? {
                println!("{service}");
            }
        }
        Commands::Generate {
            service,
            copy,
            clear_after,
        } => {
            let mut pm = PasswordManager::open(&app_password, storage)?;
            let master = prompt::read_master_password()?;
            let password = pm.generate(&master, &service)?;

            if copy {
                copy_and_clear(&password, clear_after)?;
            } else {
                println!("{password}");
            }
        }
        Commands::Seed => {
            let pm = PasswordManager::open(&app_password, storage)?;
            let master = prompt::read_master_password()?;
            println!("{}", pm.mnemonic_seed(&master)?);
        }
        Commands::Info => {
            let pm = PasswordManager::open(&app_password, storage.clone())?;
            println!("profile:  {}", storage.path().display());
            println!("created:  {}", pm.created());
            println!("services: {}", pm.services()?.len());
        }
    }

    Ok(())
}

/// Puts the password on the clipboard for a limited time.
///
/// Ctrl-C clears it early; otherwise it is wiped after the timeout.
fn copy_and_clear(password: &str, clear_after: u64) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(password.to_string())?;
    println!("password copied to clipboard; clearing in {clear_after}s (Ctrl-C clears now)");

    ctrlc::set_handler(|| {
        if let Ok(mut clipboard) = arboard::Clipboard::new() {
            let _ = clipboard.clear();
        }
        std::process::exit(130);
    })?;

    std::thread::sleep(Duration::from_secs(clear_after));
    clipboard.clear()?;
    Ok(())
}
