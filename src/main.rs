use memo_cluster::node::config::{NodeConfig, Role};
use memo_cluster::node::handlers::router;
use memo_cluster::node::service::MemoNode;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        // .with_max_level(tracing::Level::DEBUG)
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 5 {
        eprintln!(
            "Usage: {} --config <config.json> --role <primary|replica> [--port <port>]",
            args[0]
        );
        eprintln!("Example: {} --config node1.json --role primary", args[0]);
        eprintln!(
            "Example: {} --config node2.json --role replica --port 8081",
            args[0]
        );

        std::process::exit(1);
    }

    let mut config_path: Option<String> = None;
    let mut role: Option<Role> = None;
    let mut port: Option<u16> = None;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--config", Some(value)) => {
                config_path = Some(value.clone());
                i += 2;
            }
            ("--role", Some(value)) => {
                role = Some(value.parse()?);
                i += 2;
            }
            ("--port", Some(value)) => {
                port = Some(value.parse()?);
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let config_path = config_path.ok_or_else(|| anyhow::anyhow!("--config is required"))?;
    let role = role.ok_or_else(|| anyhow::anyhow!("--role is required"))?;

    let mut config = NodeConfig::load(&config_path)?;
    if let Some(port) = port {
        config.service_port = port;
    }

    tracing::info!("Starting {} node", role);
    tracing::info!("Service port: {}", config.service_port);
    tracing::info!("Sync method: {}", config.sync);
    tracing::info!("Primary: {}", config.primary_addr()?);
    for replica in config.replica_addrs() {
        tracing::info!("  - replica {}", replica);
    }
    tracing::info!(
        "Capabilities: full_replace={} propagate={}",
        config.capabilities.full_replace,
        config.capabilities.propagate
    );

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.service_port));
    let node = Arc::new(MemoNode::new(role, config)?);
    let app = router(node);

    tracing::info!("HTTP server listening on {}", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
