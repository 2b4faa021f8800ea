use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, Level};

use parley_core::{UserId, Utterance};
use parley_grid::RpcServer;
use parley_skill::{ControlClient, ControlService, SkillRegistry, TcpConnector};
use parley_storage::{LastResponseStore, MemoryLastResponseStore};

mod config;

use config::{DaemonConfig, StoreBackend};

#[derive(Parser)]
#[command(name = "parleyd")]
#[command(about = "Parley dispatch daemon - routes utterances to skill services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Host to bind (or reach, for client commands)
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Control port
    #[arg(short, long, default_value = "4000")]
    port: u16,

    /// Data directory
    #[arg(short, long)]
    data_dir: Option<String>,

    /// Last-response store
    #[arg(long, value_enum, default_value = "memory")]
    store: StoreBackend,

    /// Seconds to wait when connecting to a skill
    #[arg(long, default_value = "5")]
    connect_timeout: u64,

    /// Seconds to wait for a skill to answer
    #[arg(long, default_value = "30")]
    call_timeout: u64,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dispatch daemon
    Start,
    /// Dispatch an utterance through a running daemon
    Send {
        /// User id; omit for an unauthenticated user
        #[arg(short, long)]
        user: Option<u64>,
        /// Command token (repeatable)
        #[arg(short, long = "command")]
        commands: Vec<String>,
        /// Object token (repeatable)
        #[arg(short, long = "object")]
        objects: Vec<String>,
        /// Raw sentence passed along to the skill
        #[arg(long, default_value = "")]
        sentence: String,
        /// Tell the skill context was already added this turn
        #[arg(long)]
        context_added: bool,
    },
    /// List routes registered in a running daemon
    Routes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    let config = DaemonConfig::new(
        cli.host,
        cli.port,
        cli.data_dir,
        cli.store,
        cli.connect_timeout,
        cli.call_timeout,
    );

    match cli.command {
        Some(Commands::Start) | None => {
            run_daemon(config).await?;
        }
        Some(Commands::Send {
            user,
            commands,
            objects,
            sentence,
            context_added,
        }) => {
            let mut utterance = Utterance::new(user.map(UserId::new)).with_sentence(&sentence);
            utterance.input.commands = commands;
            utterance.input.objects = objects;

            let client = ControlClient::connect(&config.control_addr(), config.call_timeout).await?;
            let reply = client.dispatch(utterance, context_added).await?;
            println!("[{} via {}] {}", reply.skill, reply.route, reply.response.text);
        }
        Some(Commands::Routes) => {
            let client = ControlClient::connect(&config.control_addr(), config.call_timeout).await?;
            for route in client.routes().await? {
                println!("{}", route);
            }
        }
    }

    Ok(())
}

fn open_store(config: &DaemonConfig) -> Result<Arc<dyn LastResponseStore>, Box<dyn std::error::Error>> {
    match config.store {
        StoreBackend::Memory => Ok(Arc::new(MemoryLastResponseStore::new())),
        #[cfg(feature = "rocksdb")]
        StoreBackend::Rocks => {
            let path = config.store_path();
            std::fs::create_dir_all(&config.data_dir)?;
            info!("Opening last-response store at {}", path.display());
            Ok(Arc::new(parley_storage::RocksLastResponseStore::open(path)?))
        }
        #[cfg(not(feature = "rocksdb"))]
        StoreBackend::Rocks => Err("parleyd was built without the rocksdb feature".into()),
    }
}

async fn run_daemon(config: DaemonConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Parley dispatch daemon");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));

    let last_responses = open_store(&config)?;
    let registry = Arc::new(SkillRegistry::new());
    let connector = Arc::new(TcpConnector::new(config.connect_timeout, config.call_timeout));
    let control = Arc::new(ControlService::new(
        Arc::clone(&registry),
        connector,
        last_responses,
    ));

    let server = RpcServer::bind(config.control_addr().as_str()).await?;
    info!("   Control port: {}", server.local_addr()?);
    info!("   Store: {:?}", config.store);
    let accept_loop = server.spawn(control);

    let status_registry = Arc::clone(&registry);
    let status = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            info!("Status: {} routes registered", status_registry.len());
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    status.abort();
    accept_loop.abort();
    if let Err(e) = accept_loop.await {
        if !e.is_cancelled() {
            error!("Control loop ended abnormally: {}", e);
        }
    }
    info!("Daemon stopped");

    Ok(())
}
