use anyhow::Result;
use clap::Parser;
use log::{error, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tftpc::{config, tftp};

#[derive(Parser)]
#[command(name = "tftpc")]
#[command(about = "Stop-and-wait TFTP client", long_about = None)]
struct Cli {
    #[command(flatten)]
    transfer: tftp::client::TransferArgs,

    /// Configuration file (defaults to .tftpc.toml in the working directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Sets the returned flag on Ctrl+C; the running transfer checks it between attempts.
fn install_interrupt_handler() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    let spawned = thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Ctrl+C handler unavailable: {}", e);
                    return;
                }
            };
            if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
                warn!("Interrupted, aborting transfer");
                flag.store(true, Ordering::SeqCst);
            }
        });
    if let Err(e) = spawned {
        warn!("Ctrl+C handler unavailable: {}", e);
    }

    cancel
}

fn main() -> Result<()> {
    // Initialize logger, default info level, display file line number and time
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            let level_style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "[{} {level_style}{}{level_style:#} {}:{}] {level_style}{}{level_style:#}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();

    let app_config = match config::AppConfig::discover(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration file: {}", e);
            std::process::exit(2);
        }
    };

    let cancel = install_interrupt_handler();
    if let Err(e) = tftp::client::run_with_config(
        cli.transfer,
        app_config.as_ref().and_then(|c| c.client.as_ref()),
        cancel,
    ) {
        error!("Transfer failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
