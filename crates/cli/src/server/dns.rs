use bgp_dns_infrastructure::dns::DnsResponder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Binds the responder socket and serves it on a background task.
///
/// Binding happens before returning so an unusable address fails startup.
pub fn start_dns_server(
    bind_addr: SocketAddr,
    responder: Arc<DnsResponder>,
    shutdown: CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    info!(bind_address = %bind_addr, "Starting DNS server");

    let socket = DnsResponder::bind(bind_addr)?;

    Ok(tokio::spawn(async move {
        if let Err(e) = responder.serve(socket, shutdown).await {
            error!(error = %e, "DNS server stopped with an error");
        }
    }))
}
