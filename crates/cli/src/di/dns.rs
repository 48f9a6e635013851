use super::MAILBOX_CAPACITY;
use bgp_dns_application::services::{CacheMailbox, DnsCacheEngine, RefCountMailbox};
use bgp_dns_application::{spawn, ActorHandle};
use bgp_dns_domain::Config;
use bgp_dns_infrastructure::dns::transport::UdpTransport;
use bgp_dns_infrastructure::dns::{DnsResponder, ResolverPool};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct DnsServices {
    pub cache: CacheMailbox,
    pub responder: Arc<DnsResponder>,
    pub handle: ActorHandle,
}

impl DnsServices {
    pub fn start(
        config: &Config,
        routes: RefCountMailbox,
        shutdown: &CancellationToken,
    ) -> anyhow::Result<Self> {
        let transport = Arc::new(UdpTransport::new());
        let timeout = Duration::from_millis(config.dns.query_timeout);

        let primary = Arc::new(ResolverPool::from_config(
            "primary",
            &config.dns.resolvers,
            transport.clone(),
            timeout,
        )?);
        let proxy = Arc::new(ResolverPool::from_config(
            "default",
            config.dns.proxy_resolvers(),
            transport,
            timeout,
        )?);

        info!(
            primary = primary.servers().len(),
            proxy = proxy.servers().len(),
            timeout_ms = config.dns.query_timeout,
            "Resolver pools ready"
        );

        let (cache, handle) = spawn(
            "dns-cache",
            DnsCacheEngine::new(primary, routes, &config.dns.cache),
            MAILBOX_CAPACITY,
            shutdown.child_token(),
        );
        let responder = Arc::new(DnsResponder::new(cache.clone(), proxy));

        Ok(Self {
            cache,
            responder,
            handle,
        })
    }
}
