//! Scheduled, encrypted database backups.
//!
//! `--backup` dumps every configured server, seals each dump with
//! AES-256-GCM, removes the plaintext and posts the results to a webhook.
//! `--decrypt --file <path>` restores one encrypted backup.
//!
//! # Security Guarantees
//! - The encryption secret and database passwords are never logged
//! - Plaintext dumps never outlive a backup run
//! - Nothing is written when decryption fails authentication

use clap::CommandFactory;
use dbbackup::{Cli, Mode, run_backup, run_decrypt};
use dbbackup_core::{
    Result, Settings,
    logging::{init_backup_logging, init_logging},
};
use tracing::{error, info};

/// Exit status when neither mode flag is given.
const USAGE_EXIT_CODE: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_normalized(std::env::args_os());

    let mode = cli.mode();
    if mode == Mode::Usage {
        eprintln!("{}", Cli::command().render_usage());
        eprintln!("Specify --backup or --decrypt --file <FILE>. Use --help for details.");
        std::process::exit(USAGE_EXIT_CODE);
    }

    // A missing .env file is fine; the variables may come from the process
    let dotenv = dotenvy::dotenv();

    let settings = Settings::from_env()?;

    match mode {
        Mode::Backup => {
            let paths = settings.backup_paths()?;
            let log_file =
                init_backup_logging(cli.global.verbose, cli.global.quiet, &paths.log_dir)?;
            if let Ok(path) = dotenv {
                info!("Loaded environment from {}", path.display());
            }
            info!("Logging to {}", log_file.display());

            let results = run_backup(&settings, &paths).await.map_err(|e| {
                error!("Backup run aborted: {}", e);
                e
            })?;

            let failed = results.iter().filter(|r| !r.success).count();
            println!(
                "Backup completed: {} succeeded, {} failed",
                results.len().saturating_sub(failed),
                failed
            );
            Ok(())
        }
        Mode::Decrypt(file) => {
            init_logging(cli.global.verbose, cli.global.quiet)?;

            let output = run_decrypt(&settings, &file).await.map_err(|e| {
                error!("Decryption failed: {}", e);
                e
            })?;

            println!("Decrypted file saved as: {}", output.display());
            Ok(())
        }
        Mode::Usage => Ok(()),
    }
}
