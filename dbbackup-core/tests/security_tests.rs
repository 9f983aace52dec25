//! Security tests for credential protection.
//!
//! Database passwords and the encryption secret must never appear in debug
//! output, error messages or backup results.

#![allow(clippy::unwrap_used)]

use dbbackup_core::backup::{dump_arguments, redact_arguments};
use dbbackup_core::{BackupOrchestrator, CommandDumpTool, ServerConfig, Settings, derive_key};

const SENSITIVE_PASSWORD: &str = "super_secret_password_123";
const SENSITIVE_SECRET: &str = "encryption_secret_value_456";

fn server() -> ServerConfig {
    ServerConfig::new(
        "main",
        "backup_user",
        SENSITIVE_PASSWORD,
        "db.internal",
        3306,
        "app",
    )
}

#[test]
fn test_server_debug_hides_password() {
    let debug = format!("{:?}", server());
    assert!(
        !debug.contains(SENSITIVE_PASSWORD),
        "Password leaked in debug output: {}",
        debug
    );
}

#[test]
fn test_settings_debug_hides_secret() {
    let settings = Settings::from_lookup(|name: &str| match name {
        "KEY" => Some(SENSITIVE_SECRET.to_string()),
        _ => None,
    })
    .unwrap();

    let debug = format!("{:?} {:?}", settings, settings.key());
    assert!(
        !debug.contains(SENSITIVE_SECRET),
        "Secret leaked in debug output: {}",
        debug
    );
}

#[test]
fn test_logged_arguments_hide_password() {
    let args = dump_arguments(&server());
    assert!(args.iter().any(|a| a.contains(SENSITIVE_PASSWORD)));

    let logged = redact_arguments(&args).join(" ");
    assert!(
        !logged.contains(SENSITIVE_PASSWORD),
        "Password leaked in logged arguments: {}",
        logged
    );
}

#[tokio::test]
async fn test_failed_backup_result_hides_password() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = BackupOrchestrator::new(
        CommandDumpTool::new("dbbackup-test-missing-dump-tool"),
        derive_key(SENSITIVE_SECRET),
        dir.path(),
    );

    let result = orchestrator.run_server(&server()).await;
    assert!(!result.success);
    assert!(
        !result.message.contains(SENSITIVE_PASSWORD),
        "Password leaked in result: {}",
        result.message
    );
    assert!(!result.message.contains(SENSITIVE_SECRET));
}
