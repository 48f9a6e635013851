mod bootstrap;
mod di;
mod server;

use bgp_dns_domain::CliOverrides;
use bgp_dns_jobs::{BgpTableWatchJob, DomainListWatchJob, JobRunner};
use clap::Parser;
use di::{BgpServices, DnsServices, RouteServices};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "bgp-dns")]
#[command(version, about = "Announces the addresses of tracked DNS names as BGP host routes")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// UDP address of the DNS responder, overrides dns.listen
    #[arg(long)]
    dns_listen: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        dns_listen: cli.dns_listen,
        log_level: cli.log_level,
    };
    let config = bootstrap::load_config(cli.config.as_deref(), overrides)?;
    bootstrap::init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting bgp-dns");

    let shutdown = CancellationToken::new();

    let bgp = BgpServices::start(&config).await?;
    let routes = RouteServices::start(&config, bgp.speaker.clone(), &shutdown).await?;
    let dns = DnsServices::start(&config, routes.refcount.clone(), &shutdown)?;

    let mut jobs = JobRunner::new().with_bgp_table_watch(
        BgpTableWatchJob::new(
            bgp.speaker.clone(),
            routes.kernel.clone(),
            config.kernel.inject_communities.clone(),
            config.kernel.metric,
        )
        .with_cancellation(shutdown.child_token()),
    );
    if !config.dns.list.files.is_empty() {
        jobs = jobs.with_domain_list_watch(
            DomainListWatchJob::new(dns.cache.clone(), config.dns.list.files.clone())
                .with_interval(config.dns.list.poll_interval)
                .with_cancellation(shutdown.child_token()),
        );
    }
    let jobs = jobs.start().await;

    let dns_server =
        server::start_dns_server(config.dns.listen, dns.responder.clone(), shutdown.child_token())?;

    wait_for_signal().await?;
    info!("Shutting down");

    shutdown.cancel();
    if let Err(e) = dns_server.await {
        error!(error = %e, "DNS server task panicked");
    }
    jobs.join().await;
    dns.handle.join().await;
    for handle in routes.handles {
        handle.join().await;
    }
    bgp.stop().await;

    info!("bgp-dns stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
