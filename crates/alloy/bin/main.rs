#[macro_use]
extern crate tracing;

use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_provider::ProviderBuilder;
use alloy_signer_local::PrivateKeySigner;
use clap::{Parser, Subcommand};
use eyre::{eyre, Result, WrapErr};
use std::sync::Arc;
use waveportal::{Portal, WalletProvider, WaveRecord};
use waveportal_alloy::{AlloyLedger, LocalKeyWallet};

/// Wave at a WavePortal contract from the comfort of your command line.
#[derive(Parser)]
#[command(name = "wave", version, about)]
struct Wave {
    /// The RPC endpoint to talk to.
    #[arg(
        short = 'r',
        long,
        value_name = "URL",
        env = "ETH_RPC_URL",
        default_value = "http://127.0.0.1:8545",
        global = true
    )]
    rpc_url: String,

    /// Address of the deployed WavePortal contract.
    #[arg(short = 'a', long, value_name = "ADDRESS", env = "WAVE_PORTAL_ADDRESS", global = true)]
    address: Option<Address>,

    /// Private key used to sign wave transactions.
    #[arg(long, value_name = "KEY", env = "ETH_PRIVATE_KEY", hide_env_values = true, global = true)]
    private_key: Option<String>,

    #[command(subcommand)]
    cmd: WaveSubcommand,
}

#[derive(Subcommand)]
enum WaveSubcommand {
    /// Print the total number of recorded waves.
    Count,
    /// Fetch and print every recorded wave.
    History {
        /// Print the history as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Submit a wave and wait for its confirmation.
    Send {
        /// Message to carry with the wave. May be empty.
        #[arg(default_value = "")]
        message: String,
    },
    /// Follow the live wave feed until interrupted.
    Watch {
        /// Print new waves as JSON lines.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    subscriber();
    let args = Wave::parse();
    run(args)
}

/// Initializes a tracing subscriber for the CLI.
fn subscriber() {
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn run(args: Wave) -> Result<()> {
    let address = args.address.ok_or_else(|| {
        eyre!("missing WavePortal contract address; pass --address or set WAVE_PORTAL_ADDRESS")
    })?;

    match &args.cmd {
        WaveSubcommand::Count => {
            let portal = read_only_portal(&args.rpc_url, address).await?;
            println!("{}", portal.refresh_total().await?);
        }
        WaveSubcommand::History { json } => {
            let portal = read_only_portal(&args.rpc_url, address).await?;
            portal.reconciler().load_history().await?;
            let waves = portal.waves();
            if *json {
                println!("{}", serde_json::to_string_pretty(&waves)?);
            } else {
                for record in &waves {
                    print_record(record);
                }
            }
        }
        WaveSubcommand::Send { message } => send_wave(&args, address, message).await?,
        WaveSubcommand::Watch { json } => watch_waves(&args.rpc_url, address, *json).await?,
    }
    Ok(())
}

async fn send_wave(args: &Wave, address: Address, message: &str) -> Result<()> {
    let key = args.private_key.as_deref().ok_or_else(|| {
        eyre!("sending a wave needs a signer; pass --private-key or set ETH_PRIVATE_KEY")
    })?;
    let signer: PrivateKeySigner = key.trim().parse().wrap_err("invalid private key")?;
    let wallet = LocalKeyWallet::new(&signer);

    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect(&args.rpc_url)
        .await?;
    let ledger = AlloyLedger::new(address, provider);
    let portal = Portal::new(Arc::new(ledger), Some(Arc::new(wallet) as Arc<dyn WalletProvider>));

    let identity = portal.connect().await?;
    println!("waving as {identity}");

    // Print the lifecycle as it is published, the way a frontend would
    // render it.
    let mut action = portal.action_watch();
    let progress = tokio::spawn(async move {
        while action.changed().await.is_ok() {
            let state = action.borrow_and_update().clone();
            let done = state.is_terminal();
            println!("{state}");
            if done {
                break;
            }
        }
    });

    let waved = portal.wave(message).await;
    let _ = progress.await;
    let tx_hash = waved?;
    println!("{} wave(s) on the portal; yours is {tx_hash}", portal.total());
    Ok(())
}

async fn watch_waves(rpc_url: &str, address: Address, json: bool) -> Result<()> {
    let portal = read_only_portal(rpc_url, address).await?;
    let reconciler = portal.reconciler();
    let known = reconciler.load_history().await?;
    info!(known, "wave history loaded");

    let mut waves = reconciler.waves_watch();
    let mut feed = reconciler.feed_watch();
    let mut seen = waves.borrow_and_update().len();
    let mut subscription = reconciler.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = feed.changed() => {
                changed?;
                let status = feed.borrow_and_update().clone();
                if let Some(err) = status.error() {
                    subscription.unsubscribe().await;
                    return Err(err.into());
                }
                info!(%status, "feed status changed");
            }
            changed = waves.changed() => {
                changed?;
                let snapshot = waves.borrow_and_update().clone();
                for record in &snapshot.records()[seen..] {
                    if json {
                        println!("{}", serde_json::to_string(record)?);
                    } else {
                        print_record(record);
                    }
                }
                seen = snapshot.len();
            }
        }
    }

    subscription.unsubscribe().await;
    Ok(())
}

async fn read_only_portal(rpc_url: &str, address: Address) -> Result<Portal> {
    let provider = ProviderBuilder::new().connect(rpc_url).await?;
    let ledger = AlloyLedger::new(address, provider);
    Ok(Portal::new(Arc::new(ledger), None))
}

fn print_record(record: &WaveRecord) {
    println!(
        "{} {} {}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.waver,
        record.message
    );
}
