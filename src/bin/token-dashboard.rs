//! Command-line front end for the token dashboard.

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use serde_json::json;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use tokio::sync::oneshot;

use token_dashboard::{
    config::{settings::DEFAULT_SETTINGS_PATH, Cluster, Settings},
    dashboard::Dashboard,
    metadata::{publish_token_metadata, MetadataDraft, PinataClient},
    rpc::{watch_balance, RpcLedgerFactory},
    state::{JsonFileStore, SelectionStore},
    transactions::TokenCreationRequest,
    wallet::{DemoPlaintextKeystore, KeypairSigner, WalletSigner},
};

#[derive(Parser)]
#[command(name = "token-dashboard", version, about = "Solana token dashboard")]
struct Cli {
    #[arg(long, env = "DASHBOARD_SETTINGS", default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    /// Solana CLI keypair used for signing.
    #[arg(long, env = "DASHBOARD_KEYPAIR")]
    keypair: Option<PathBuf>,

    /// Sign with the plaintext demo wallet (see `keygen-demo`).
    #[arg(long)]
    demo_wallet: bool,

    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change the selected cluster.
    Cluster {
        #[command(subcommand)]
        action: Option<ClusterCmd>,
    },
    /// Show or change the inspected wallet address.
    Wallet {
        #[command(subcommand)]
        action: Option<WalletCmd>,
    },
    Tokens,
    Nfts,
    Balance {
        /// Keep printing balance changes until interrupted.
        #[arg(long)]
        watch: bool,
    },
    CreateToken(CreateTokenArgs),
    TransferToken {
        mint: String,
        recipient: String,
        amount: String,
    },
    SendSol {
        recipient: String,
        amount: String,
    },
    Airdrop {
        #[arg(long)]
        sol: Option<f64>,
    },
    Burn {
        mint: String,
        amount: String,
    },
    CloseAccount {
        mint: String,
    },
    /// Generate the plaintext demo wallet. Never use with real funds.
    KeygenDemo,
    ExportDemoKey,
}

#[derive(Subcommand)]
enum ClusterCmd {
    Set { cluster: Cluster },
}

#[derive(Subcommand)]
enum WalletCmd {
    Set { address: String },
    Clear,
}

#[derive(Parser)]
struct CreateTokenArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    symbol: String,

    #[arg(long, default_value = "")]
    description: String,

    /// Whole tokens minted to the signer.
    #[arg(long)]
    supply: u64,

    #[arg(long, default_value_t = 9)]
    decimals: u8,

    /// Use an existing metadata URI instead of uploading.
    #[arg(long)]
    uri: Option<String>,

    #[arg(long)]
    image: Option<PathBuf>,

    /// Revoke mint authority after the initial mint.
    #[arg(long)]
    revoke_mint: bool,

    #[arg(long)]
    retain_freeze: bool,

    #[arg(long, env = "PINATA_JWT", hide_env_values = true)]
    pinata_jwt: Option<String>,

    #[arg(long, env = "PINATA_GATEWAY")]
    pinata_gateway: Option<String>,
}

/* --------------------------------------------------------------------- */
/*  Output                                                               */
/* --------------------------------------------------------------------- */
fn emit<T: Serialize>(as_json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

fn load_signer(
    cli: &Cli,
    settings: &Settings,
    store: &Arc<JsonFileStore>,
) -> Result<Option<Arc<dyn WalletSigner>>> {
    if cli.demo_wallet {
        let signer = DemoPlaintextKeystore::new(store.clone())
            .signer()?
            .ok_or_else(|| anyhow!("no demo wallet; run `keygen-demo` first"))?;
        return Ok(Some(Arc::new(signer)));
    }
    let path = cli
        .keypair
        .clone()
        .or_else(|| settings.keypair_path.as_ref().map(PathBuf::from));
    match path {
        Some(path) => Ok(Some(Arc::new(KeypairSigner::from_file(path)?))),
        None => Ok(None),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let settings = Settings::load_or_default(&cli.settings)?;
    let store = Arc::new(JsonFileStore::open(settings.state_path())?);
    let signer = load_signer(&cli, &settings, &store)?;
    let selection = SelectionStore::open(store.clone())?;
    let dash = Dashboard::new(
        settings.clone(),
        selection,
        Box::new(RpcLedgerFactory::new(settings.clone())),
        signer,
    );
    let cluster = dash.selection().cluster;
    info!("[CLI] cluster {cluster}, state at {}", store.path().display());

    match cli.command {
        Commands::Cluster { action } => {
            if let Some(ClusterCmd::Set { cluster }) = action {
                dash.set_cluster(cluster).await?;
            }
            let sel = dash.selection();
            emit(cli.json, &sel, || sel.cluster.to_string())?;
        }
        Commands::Wallet { action } => {
            match action {
                Some(WalletCmd::Set { address }) => dash.set_wallet(&address).await?,
                Some(WalletCmd::Clear) => dash.set_wallet("").await?,
                None => {}
            }
            let sel = dash.selection();
            let signer = dash.signer().map(|s| s.pubkey().to_string());
            emit(cli.json, &json!({ "wallet": sel.wallet, "signer": signer }), || {
                match (sel.wallet.is_empty(), &signer) {
                    (false, _) => sel.wallet.clone(),
                    (true, Some(signer)) => format!("{signer} (signer)"),
                    (true, None) => "no wallet selected".into(),
                }
            })?;
        }
        Commands::Tokens => {
            let (tokens, _) = dash.refresh_holdings().await;
            if let Some(err) = &tokens.error {
                return Err(anyhow!(err.clone()));
            }
            emit(cli.json, &tokens, || {
                if tokens.items.is_empty() {
                    return "no tokens".into();
                }
                tokens
                    .items
                    .iter()
                    .map(|t| {
                        format!(
                            "{:<24} {:>8} {:>20}  {}",
                            t.name,
                            t.symbol.as_deref().unwrap_or("-"),
                            t.amount,
                            t.mint
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        Commands::Nfts => {
            let (_, nfts) = dash.refresh_holdings().await;
            if let Some(err) = &nfts.error {
                return Err(anyhow!(err.clone()));
            }
            emit(cli.json, &nfts, || {
                if nfts.items.is_empty() {
                    return "no NFTs".into();
                }
                nfts.items
                    .iter()
                    .map(|n| format!("{:<32} {:>10}  {}", n.name, n.symbol, n.uri))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        Commands::Balance { watch } => {
            let lamports = dash.balance().await?;
            emit(cli.json, &json!({ "lamports": lamports }), || format!("{} SOL", sol(lamports)))?;
            if watch {
                let address = dash.inspected_address()?;
                let ws_url = settings.ws_url(cluster)?;
                let (stop, cancel) = oneshot::channel();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        let _ = stop.send(());
                    }
                });
                let as_json = cli.json;
                watch_balance(&ws_url, &address, cancel, move |lamports| {
                    if as_json {
                        println!("{}", json!({ "lamports": lamports }));
                    } else {
                        println!("{} SOL", sol(lamports));
                    }
                })
                .await?;
            }
        }
        Commands::CreateToken(args) => {
            let uri = match args.uri {
                Some(uri) => uri,
                None => {
                    let jwt = args
                        .pinata_jwt
                        .or_else(|| settings.pinata_jwt.clone())
                        .unwrap_or_default();
                    let gateway = args
                        .pinata_gateway
                        .or_else(|| settings.pinata_gateway.clone())
                        .ok_or_else(|| anyhow!("pinata gateway is not configured"))?;
                    let pinata = PinataClient::new(jwt, gateway)?;
                    let draft = MetadataDraft {
                        name: args.name.clone(),
                        symbol: args.symbol.clone(),
                        description: args.description.clone(),
                    };
                    publish_token_metadata(&pinata, &draft, args.image.as_deref()).await?
                }
            };
            let req = TokenCreationRequest {
                name: args.name,
                symbol: args.symbol,
                uri,
                description: args.description,
                initial_supply: args.supply,
                decimals: args.decimals,
                retain_mint_authority: !args.revoke_mint,
                retain_freeze_authority: args.retain_freeze,
            };
            let created = dash.create_token(&req).await?;
            emit(cli.json, &created, || {
                format!(
                    "Token created with mint address {}\n{}",
                    created.mint,
                    cluster.explorer_tx_url(&created.signature)
                )
            })?;
        }
        Commands::TransferToken {
            mint,
            recipient,
            amount,
        } => {
            let receipt = dash.transfer_token(&mint, &recipient, &amount).await?;
            emit(cli.json, &receipt, || cluster.explorer_tx_url(&receipt.signature))?;
        }
        Commands::SendSol { recipient, amount } => {
            let receipt = dash.send_sol(&recipient, &amount).await?;
            emit(cli.json, &receipt, || cluster.explorer_tx_url(&receipt.signature))?;
        }
        Commands::Airdrop { sol: amount } => {
            let signature = dash.airdrop(amount).await?.to_string();
            let granted = amount.unwrap_or(settings.airdrop_sol);
            emit(cli.json, &json!({ "signature": signature, "sol": granted }), || {
                format!("Airdrop successful! {granted} SOL added to your wallet.")
            })?;
        }
        Commands::Burn { mint, amount } => {
            let done = dash.burn_tokens(&mint, &amount).await?;
            emit(cli.json, &done, || cluster.explorer_tx_url(&done.signature))?;
        }
        Commands::CloseAccount { mint } => {
            let done = dash.close_token_account(&mint).await?;
            emit(cli.json, &done, || cluster.explorer_tx_url(&done.signature))?;
        }
        Commands::KeygenDemo => {
            let keystore = DemoPlaintextKeystore::new(store.clone());
            let keypair = keystore.create()?;
            info!("[CLI] demo wallet written to {}", store.path().display());
            let pubkey = solana_sdk::signer::Signer::pubkey(&keypair).to_string();
            emit(cli.json, &json!({ "pubkey": pubkey }), || pubkey.clone())?;
        }
        Commands::ExportDemoKey => {
            let secret = DemoPlaintextKeystore::new(store.clone())
                .export_base58()?
                .ok_or_else(|| anyhow!("no demo wallet; run `keygen-demo` first"))?;
            emit(cli.json, &json!({ "secret_key": secret }), || secret.clone())?;
        }
    }
    Ok(())
}
