use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use coldvault::client::{DEFAULT_SERVER_URL, HttpApi, InventoryApi};
use coldvault::glacier::{GlacierClient, ProviderConfig, VaultConfig, create_glacier_client};
use coldvault::store::LocalStore;
use coldvault::view::inventory::CHECK_INTERVAL;
use coldvault::view::{InventoryView, Phase, PollOutcome, UploadView, ViewError, WatchExit};
use coldvault::{AppState, build_router};

#[derive(Parser, Debug)]
#[command(name = "coldvault", version, about = "Upload archives to S3 Glacier and track the vault inventory")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service in front of the vault
    Serve(ServeArgs),

    /// Upload a file as a new archive
    Upload {
        /// File to upload
        file: Option<PathBuf>,

        #[command(flatten)]
        server: ServerArg,
    },

    /// Show the vault inventory, optionally starting a new inventory job
    Inventory {
        /// Start a new inventory-retrieval job
        #[arg(long)]
        refresh: bool,

        /// Keep polling a pending job until it completes
        #[arg(long)]
        watch: bool,

        #[command(flatten)]
        server: ServerArg,
    },
}

#[derive(clap::Args, Debug)]
struct ServerArg {
    /// Base URL of a running `coldvault serve`
    #[arg(long = "server", env = "COLDVAULT_SERVER", default_value = DEFAULT_SERVER_URL)]
    url: String,
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "COLDVAULT_BIND", default_value = "127.0.0.1:3000")]
    bind: String,

    /// Glacier vault name
    #[arg(long, env = "AWS_GLACIER_VAULT_NAME")]
    vault: String,

    /// Account owning the vault (`-` for the caller's account)
    #[arg(long, env = "AWS_ACCOUNT_ID")]
    account_id: Option<String>,

    /// AWS region override
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Custom endpoint (e.g. LocalStack)
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Largest accepted upload in MiB
    #[arg(long, env = "COLDVAULT_MAX_UPLOAD_MB", default_value_t = 1024)]
    max_upload_mb: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Command::Serve(_) => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Upload { file, server } => upload(file, &server.url).await,
        Command::Inventory {
            refresh,
            watch,
            server,
        } => inventory(refresh, watch, &server.url).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    info!(
        "Starting coldvault v{} on {}",
        env!("CARGO_PKG_VERSION"),
        args.bind
    );

    let vault = VaultConfig::new(args.vault, args.account_id)?;
    let (client, region) = create_glacier_client(ProviderConfig {
        endpoint_url: args.endpoint_url,
        default_region: args.region,
        anonymous: false,
    })
    .await?;
    let service = GlacierClient::from_client(client, vault, region);
    info!(
        "Using vault {} (account {}) in {}",
        service.vault().vault_name,
        service.vault().account_id,
        service.region()
    );

    let state = AppState::new(Arc::new(service))
        .with_max_upload_bytes(args.max_upload_mb.saturating_mul(1024 * 1024));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    info!("coldvault listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

async fn upload(file: Option<PathBuf>, server: &str) -> Result<()> {
    let api: Arc<dyn InventoryApi> = Arc::new(HttpApi::new(server));
    let mut view = UploadView::new(api);
    view.select_file(file);

    match view.upload().await {
        Ok(result) => {
            println!("{}", "Upload Successful!".green().bold());
            println!("Archive ID: {}", result.archive_id);
            println!("Location:   {}", result.location);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn inventory(refresh: bool, watch: bool, server: &str) -> Result<()> {
    let api: Arc<dyn InventoryApi> = Arc::new(HttpApi::new(server));
    let store = LocalStore::open_default()?;
    let mut view = InventoryView::load(api, store, Utc::now());

    let mut failed = false;
    if refresh {
        match view.initiate(Utc::now()).await {
            Ok(_) => {}
            Err(e @ ViewError::AlreadyPending(_)) => {
                eprintln!("{} {}", "Note:".yellow().bold(), e);
            }
            Err(_) => failed = true,
        }
    }

    // --watch checks immediately on its first tick
    if !watch && view.sync(Utc::now()).await == PollOutcome::Failed {
        eprintln!(
            "{} Could not check the pending job; showing its last known status",
            "Warning:".yellow().bold()
        );
    }

    print!("{view}");

    if watch && view.phase() == Phase::Pending {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            on_interrupt.cancel();
        });

        println!();
        println!(
            "Checking every {}s, press Ctrl-C to stop (the job keeps running)",
            CHECK_INTERVAL.as_secs()
        );

        let exit = view
            .watch(CHECK_INTERVAL, cancel, |view, outcome| match outcome {
                PollOutcome::StillPending { status } => {
                    println!("{} Status: {}", Utc::now().format("%H:%M:%S"), status);
                }
                PollOutcome::Completed { .. } => {
                    println!();
                    print!("{view}");
                }
                PollOutcome::Failed => {
                    eprintln!(
                        "{} Status check failed, retrying in {}s",
                        "Warning:".yellow().bold(),
                        CHECK_INTERVAL.as_secs()
                    );
                }
                PollOutcome::NoJob | PollOutcome::Unchanged => {}
            })
            .await;

        if exit == WatchExit::Cancelled {
            println!("Stopped watching; run `coldvault inventory --watch` to resume");
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
