use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use federated_directory::auth::MessageAuthenticator;
use federated_directory::checkout::manager::CheckoutManager;
use federated_directory::directory::core::{
    DirectoryConfig, DirectoryServerCore, LoggingPolicyNotifier,
};
use federated_directory::directory::handlers::{
    handle_checkout, handle_dataset_checkouts, handle_handshake, handle_list_datasets,
    handle_list_nodes,
};
use federated_directory::directory::transport::{UdpMessageTransport, serve_envelopes};
use federated_directory::gossip::observer::GossipObserver;
use federated_directory::lookup::service::DatasetLookupService;
use federated_directory::membership::manager::MembershipManager;
use federated_directory::store::sqlite::DirectoryDb;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} --bind <addr:port> [--name <name>] [--db <path>] [--http-port <port>] [--multiple-checkouts]",
            args[0]
        );
        eprintln!("Example: {} --bind 127.0.0.1:5000", args[0]);
        eprintln!(
            "Example: {} --bind 127.0.0.1:5000 --name directory-1 --db ./directory.db --multiple-checkouts",
            args[0]
        );
        std::process::exit(1);
    }

    let mut bind_addr: Option<SocketAddr> = None;
    let mut name = "directory-server".to_string();
    let mut db_path = PathBuf::from("directory.db");
    let mut http_port: Option<u16> = None;
    let mut allow_multiple_checkouts = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--name" => {
                name = args[i + 1].clone();
                i += 2;
            }
            "--db" => {
                db_path = PathBuf::from(&args[i + 1]);
                i += 2;
            }
            "--http-port" => {
                http_port = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--multiple-checkouts" => {
                allow_multiple_checkouts = true;
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    let bind_addr = bind_addr.expect("--bind is required");
    let http_port = http_port.unwrap_or(bind_addr.port() + 1000);
    let http_addr = SocketAddr::new(bind_addr.ip(), http_port);

    tracing::info!("Starting directory server '{}' on {}", name, bind_addr);

    // 1. Persistent store:
    let db = Arc::new(DirectoryDb::open(&db_path)?);

    // 2. Cache-backed services:
    let membership = Arc::new(MembershipManager::new(db.clone()));
    let lookup = Arc::new(DatasetLookupService::new(db.clone()));
    let checkouts = Arc::new(CheckoutManager::new(db.clone(), allow_multiple_checkouts));
    let gossip_obs = Arc::new(GossipObserver::new());

    // 3. Identity and coordinator:
    let authenticator = Arc::new(MessageAuthenticator::generate());
    let config = DirectoryConfig {
        name,
        hostname: bind_addr.ip().to_string(),
        gossip_port: bind_addr.port(),
        https_addr: http_addr.to_string(),
    };
    let core = Arc::new(DirectoryServerCore::new(
        config,
        authenticator,
        membership,
        lookup,
        checkouts,
        gossip_obs,
        Arc::new(LoggingPolicyNotifier),
        Arc::new(UdpMessageTransport),
    )?);

    // 4. Gossip/direct-message endpoint:
    let socket = tokio::net::UdpSocket::bind(bind_addr).await?;
    let listener_core = core.clone();
    tokio::spawn(async move {
        serve_envelopes(socket, listener_core).await;
    });

    // 5. Stats reporter:
    let stats_core = core.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
        loop {
            interval.tick().await;
            let nodes = stats_core.membership().network_nodes();
            let datasets = stats_core.lookup().dataset_identifiers();
            tracing::info!(
                "Directory stats: {} registered nodes, {} dataset identifiers",
                nodes.len(),
                datasets.len()
            );
            for node in nodes.values() {
                tracing::info!(
                    "  - {} gossip={} https={}",
                    node.name,
                    node.gossip_addr,
                    node.https_addr
                );
            }
        }
    });

    // 6. HTTP operator API:
    let app = Router::new()
        .route("/handshake", post(handle_handshake))
        .route("/network/nodes", get(handle_list_nodes))
        .route("/network/datasets", get(handle_list_datasets))
        .route("/dataset/checkout", post(handle_checkout))
        .route("/dataset/:id/checkouts", get(handle_dataset_checkouts))
        .layer(Extension(core));

    tracing::info!("HTTP operator API listening on {}", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
