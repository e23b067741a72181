mod config;
mod metrics;
mod providers;
mod session;
mod types;
mod web;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::Settings;
use metrics::compute_summary;
use session::{
    ChannelEvent, MonitorPayload, SessionChannel, SessionState, SessionUpdate, StrategySession,
};
use types::{LoopFormData, SlippageTolerance};
use web::start_gateway;

#[derive(Parser)]
#[command(name = "yield-loop-console")]
#[command(version = "0.1.0")]
#[command(about = "Console and API gateway for an ETH yield-loop strategy platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview strategy metrics for a parameter set without connecting
    Preview {
        #[command(flatten)]
        form: FormArgs,
    },
    /// Run a strategy session against the platform endpoint
    Session {
        #[command(flatten)]
        form: FormArgs,

        /// Strategy identifier to select
        #[arg(short, long)]
        strategy: Option<String>,

        /// Confirm the deposit without prompting
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Serve the REST API gateway for browser front ends
    Serve {
        /// Listen port (overrides the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct FormArgs {
    /// Collateral to deposit, in ETH
    #[arg(long, default_value = "0")]
    collateral: f64,

    /// Leverage multiplier (1.0 to 3.0)
    #[arg(long, default_value = "3.0")]
    leverage: f64,

    /// Minimum collateral ratio to maintain
    #[arg(long, default_value = "1.5")]
    min_ratio: f64,

    /// Target base APY in percent
    #[arg(long, default_value = "10.0")]
    target_apy: f64,

    /// Rebalance threshold in percent
    #[arg(long, default_value = "5.0")]
    rebalance: f64,

    /// Slippage tolerance in percent (0.1, 0.5, or 1.0)
    #[arg(long, default_value = "0.5")]
    slippage: f64,
}

impl FormArgs {
    fn into_form(self) -> Result<LoopFormData> {
        let slippage_tolerance = SlippageTolerance::from_f64(self.slippage)
            .ok_or_else(|| anyhow!("Slippage must be one of 0.1, 0.5, or 1.0"))?;

        let form = LoopFormData {
            collateral_amount: Decimal::try_from(self.collateral)?,
            max_leverage: Decimal::try_from(self.leverage)?,
            min_collateral_ratio: Decimal::try_from(self.min_ratio)?,
            target_apy: Decimal::try_from(self.target_apy)?,
            rebalance_threshold: Decimal::try_from(self.rebalance)?,
            slippage_tolerance,
        };

        if let Err(errors) = form.validate() {
            return Err(anyhow!("Invalid parameters: {}", errors.join("; ")));
        }

        Ok(form)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Yield Loop Console v0.1.0");

    let settings = Settings::load(&cli.config)?;
    if let Err(errors) = settings.validate() {
        for e in &errors {
            error!("Config: {}", e);
        }
        return Err(anyhow!("Invalid configuration"));
    }

    match cli.command {
        Commands::Preview { form } => {
            run_preview(form, &settings)?;
        }
        Commands::Session {
            form,
            strategy,
            yes,
        } => {
            run_session(form, strategy, yes, &settings).await?;
        }
        Commands::Serve { port } => {
            let mut settings = settings;
            if let Some(port) = port {
                settings.server.port = port;
            }
            start_gateway(&settings).await?;
        }
    }

    Ok(())
}

fn run_preview(args: FormArgs, settings: &Settings) -> Result<()> {
    let form = args.into_form()?;
    let summary = compute_summary(&form, settings.session.reference_eth_price);
    println!("\n{}", summary);
    Ok(())
}

async fn run_session(
    args: FormArgs,
    strategy: Option<String>,
    auto_confirm: bool,
    settings: &Settings,
) -> Result<()> {
    let form = args.into_form()?;
    let strategy_id = strategy.unwrap_or_else(|| settings.session.default_strategy.clone());

    println!("\n{}", compute_summary(&form, settings.session.reference_eth_price));

    info!("Connecting to {}", settings.session.ws_url);
    let (channel, mut events) = SessionChannel::open(&settings.session.ws_url).await?;

    let mut session = StrategySession::new();
    session.select_strategy(&channel, &strategy_id, &form)?;
    info!("Selected strategy '{}', waiting for initialization", strategy_id);

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(ChannelEvent::Frame(message)) => {
                        match session.handle_message(message) {
                            Some(SessionUpdate::Transitioned { from, to }) => {
                                info!("Session: {} -> {}", from, to);
                                match to {
                                    SessionState::AwaitingFunding => {
                                        if !confirm_funding(&mut session, &channel, auto_confirm).await? {
                                            break;
                                        }
                                    }
                                    SessionState::Active => {
                                        info!("Strategy active; streaming monitor updates (Ctrl+C to stop)");
                                    }
                                    _ => {}
                                }
                            }
                            Some(SessionUpdate::Monitor(payload)) => {
                                render_monitor(&payload);
                            }
                            Some(SessionUpdate::Failed { error, reverted_to }) => {
                                match reverted_to {
                                    Some(SessionState::AwaitingFunding) => {
                                        warn!("Deployment failed: {}", error.message);
                                        if auto_confirm {
                                            // Do not retry automatically; a second
                                            // unattended attempt would just fail again.
                                            break;
                                        }
                                        if !confirm_funding(&mut session, &channel, false).await? {
                                            break;
                                        }
                                    }
                                    Some(state) => {
                                        warn!("Platform error: {} (back to {})", error.message, state);
                                    }
                                    None => {
                                        warn!("Platform error: {}", error.message);
                                    }
                                }
                            }
                            None => {}
                        }
                    }
                    Some(ChannelEvent::Error(e)) => {
                        error!("Channel error: {}", e);
                    }
                    Some(ChannelEvent::Disconnected) | None => {
                        warn!("Connection closed by the platform");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }

    channel.close();
    info!("Final session state: {}", session.state());

    Ok(())
}

/// Shows the funding details and either confirms immediately (--yes) or
/// prompts on stdin. Returns false when the user declines.
async fn confirm_funding(
    session: &mut StrategySession,
    channel: &SessionChannel,
    auto_confirm: bool,
) -> Result<bool> {
    use std::io::Write;

    println!("\n=== Funding Required ===");
    if let Some(vault_id) = session.vault_id() {
        println!("Vault:           {}", vault_id);
    }
    if let Some(address) = session.deposit_address() {
        println!("Deposit address: {}", address);
    }

    if !auto_confirm {
        print!("Press Enter to confirm the deposit (n to abort): ");
        std::io::stdout().flush()?;
        let line = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await??;
        if line.trim().eq_ignore_ascii_case("n") {
            info!("Deposit declined, closing session");
            return Ok(false);
        }
    }

    session.confirm_deposit(channel)?;
    info!("Deposit confirmed, deploying vault contract");
    Ok(true)
}

fn render_monitor(payload: &MonitorPayload) {
    match payload {
        MonitorPayload::Metrics(update) => {
            info!("[{}] metrics: {}", update.vault_id, update.metrics);
        }
        MonitorPayload::Alert(alert) => {
            warn!(
                "[{}] risk {}: {}",
                alert.vault_id,
                alert.risk_level,
                alert.alert.as_deref().unwrap_or("(no detail)")
            );
        }
        MonitorPayload::Other(value) => {
            debug!("Unrecognized monitor payload: {}", value);
        }
    }
}
