//! CipherDiary: Encrypted on-chain mood diary
//!
//! Main entry point for the terminal application.

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cipher_diary::adapters::sanitize::SanitizingMakeWriter;
use cipher_diary::adapters::{LocalWallet, SqliteLedger, TfheCoprocessor};
use cipher_diary::application::DiaryService;
use cipher_diary::config::{AppConfig, LogMode};
use cipher_diary::ports::Wallet;
use cipher_diary::tui::App;

fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    // Writing logs to the terminal corrupts the TUI (alternate screen).
    // auto: log to a file on an interactive TTY, to stdout otherwise.
    let use_file = match config.log_mode {
        LogMode::File => true,
        LogMode::Stdout => false,
        LogMode::Auto => std::io::stdout().is_terminal(),
    };

    let (writer, _guard) = if use_file {
        if let Some(parent) = config.log_file.parent() {
            // Best-effort: a missing directory surfaces as the open error below.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting CipherDiary...");
    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }

    // Composition root: devnet co-processor, ledger and wallet.
    let fhe = Arc::new(match config.gateway_seed {
        Some(seed) => TfheCoprocessor::with_gateway_seed(seed),
        None => TfheCoprocessor::new(),
    });

    let ledger = if config.is_in_memory() {
        SqliteLedger::in_memory(config.contract_address, fhe.gateway_key())?
    } else {
        tracing::info!(
            "Persistent ledger at {}: entries from earlier runs are listed but their ciphertexts are not held by this co-processor",
            config.ledger_path
        );
        SqliteLedger::new(&config.ledger_path, config.contract_address, fhe.gateway_key())?
    };
    let ledger = Arc::new(ledger.with_block_time(config.block_time));

    let wallet = Arc::new(LocalWallet::new(config.account));
    let signer = Arc::new(ledger.signer(Arc::clone(&wallet)));
    let service = Arc::new(DiaryService::new(
        Arc::clone(&ledger),
        signer,
        fhe,
        Arc::clone(&wallet) as Arc<dyn Wallet>,
    ));

    let mut app = App::with_dependencies(service);
    app.run()?;

    tracing::info!("CipherDiary shutdown complete.");
    Ok(())
}
