use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use idspace_core::config::Config;
use idspace_core::core_identity::{
    BootstrapOptions, FileIdentityStorage, IdentityCore, IdentityServices, IdentityStorage,
    MemoryContentStore, MemoryPinningService, WalletSigner,
};
use idspace_core::core_space::{MemoryThreadBackend, OpenOptions, Space, SpaceServices};
use idspace_core::core_store::{MemoryLogDatabase, MemoryRootIndex};
use idspace_core::logging::{init_logging_with_config, LogConfig};
use idspace_core::metrics::init_metrics;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "idspace")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Directory holding persisted identity records
    #[arg(long)]
    storage_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authorize with a wallet key and publish the identity
    Login {
        #[arg(long)]
        address: String,
        /// 32-byte hex wallet secret
        #[arg(long)]
        wallet_key: String,
    },
    /// Show whether an identity is persisted for an address
    Status {
        #[arg(long)]
        address: String,
    },
    /// Remove the persisted identity for an address
    Logout {
        #[arg(long)]
        address: String,
    },
    /// Open a space, deriving its keyring on first use
    OpenSpace {
        #[arg(long)]
        address: String,
        #[arg(long)]
        wallet_key: String,
        #[arg(long)]
        space: String,
    },
    /// List spaces with a derived keyring
    Spaces {
        #[arg(long)]
        address: String,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(shellexpand::tilde(path).into_owned())
            .with_context(|| format!("loading config from {}", path))?,
        None => Config::from_env()?,
    };

    if let Some(dir) = &args.storage_dir {
        config.identity.storage_dir = PathBuf::from(shellexpand::tilde(dir).into_owned());
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    config.validate()?;
    Ok(config)
}

fn identity_services(config: &Config) -> Result<IdentityServices> {
    let storage = FileIdentityStorage::new(config.identity.storage_dir.clone())
        .context("opening identity storage")?;
    Ok(
        IdentityServices::new(Arc::new(storage), Arc::new(MemoryContentStore::new()))
            .with_config(&config.identity)
            .with_pinning_config(Arc::new(MemoryPinningService::new()), &config.pinning),
    )
}

async fn login(config: &Config, address: &str, wallet_key: &str) -> Result<IdentityCore> {
    let wallet = WalletSigner::from_hex(address, wallet_key)?;
    let opts = BootstrapOptions {
        consent_callback: Some(Box::new(|fresh| debug!(fresh, "Identity consent"))),
    };
    let identity = IdentityCore::get_id_from_eth_address(
        address,
        Arc::new(wallet),
        identity_services(config)?,
        opts,
    )
    .await?;
    Ok(identity)
}

/// Restore the persisted identity for `address`, if any
async fn restore(config: &Config, address: &str) -> Result<Option<IdentityCore>> {
    let services = identity_services(config)?;
    let key = services.storage_key(address);
    let Some(serialized) = services.storage.load(&key)? else {
        return Ok(None);
    };
    Ok(Some(IdentityCore::restore(&serialized, services, None).await?))
}

fn print_json(value: serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging_with_config(LogConfig::from_config(&config.logging)?)?;
    init_metrics();

    info!("idspace CLI started");

    match args.command {
        Command::Login {
            address,
            wallet_key,
        } => {
            let identity = login(&config, &address, &wallet_key).await?;
            print_json(json!({
                "address": identity.management_address(),
                "did": identity.did().map(|d| d.as_str()),
                "fingerprint": identity.fingerprint(),
            }))?;
        }
        Command::Status { address } => {
            let services = identity_services(&config)?;
            let logged_in = IdentityCore::is_logged_in(&services, &address)?;
            let identity = restore(&config, &address).await?;
            print_json(json!({
                "address": address.to_lowercase(),
                "loggedIn": logged_in,
                "did": identity.as_ref().and_then(|i| i.did()).map(|d| d.as_str()),
            }))?;
        }
        Command::Logout { address } => {
            let identity = restore(&config, &address).await?;
            if let Some(identity) = &identity {
                identity.logout()?;
            }
            print_json(json!({
                "address": address.to_lowercase(),
                "loggedOut": identity.is_some(),
            }))?;
        }
        Command::OpenSpace {
            address,
            wallet_key,
            space,
        } => {
            let identity = Arc::new(login(&config, &address, &wallet_key).await?);
            let services = SpaceServices::new(
                Arc::new(MemoryLogDatabase::new()),
                Arc::new(MemoryRootIndex::new()),
                Arc::new(MemoryThreadBackend::new()),
            )
            .with_config(&config.space);

            let consent = Arc::new(AtomicBool::new(false));
            let flag = consent.clone();
            let opts = OpenOptions {
                consent_callback: Some(Box::new(move |fresh, _name| {
                    flag.store(fresh, Ordering::SeqCst)
                })),
                ..Default::default()
            };

            let opened = Space::new(&space, identity, services);
            opened.open(opts).await?;
            opened.wait_for_sync().await?;
            print_json(json!({
                "space": opened.name(),
                "did": opened.did(),
                "address": opened.address(),
                "consent": consent.load(Ordering::SeqCst),
            }))?;
        }
        Command::Spaces { address } => {
            let spaces = match restore(&config, &address).await? {
                Some(identity) => identity.space_names()?,
                None => Vec::new(),
            };
            print_json(json!({
                "address": address.to_lowercase(),
                "spaces": spaces,
            }))?;
        }
    }

    info!("idspace CLI finished");

    Ok(())
}
