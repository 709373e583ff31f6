use clap::Parser;
use dashboard_backup::utils::{logger, validation::Validate};
use dashboard_backup::{export_with, BackupError, CliConfig};
use std::io::{self, Write};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting dashboard-backup");

    let settings = match config.into_settings().and_then(|s| s.validate().map(|_| s)) {
        Ok(settings) => settings,
        Err(e) => fail(e),
    };

    tracing::info!("Server: {}", settings.endpoint);
    tracing::info!("Output directory: {}", settings.output_dir.display());
    if let Some(timeout) = settings.request_timeout {
        tracing::debug!("Request timeout: {:?}", timeout);
    }

    match export_with(&settings).await {
        Ok(count) => {
            let summary = writeln!(
                io::stdout(),
                "Exported {} dashboards to {}",
                count,
                settings.output_dir.display()
            );
            if let Err(e) = summary {
                fail(BackupError::ProgressOutput(e));
            }
        }
        Err(e) => fail(e),
    }
}

fn fail(e: BackupError) -> ! {
    tracing::error!("Backup failed: {} (Category: {:?})", e, e.category());
    tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    std::process::exit(e.exit_code());
}
