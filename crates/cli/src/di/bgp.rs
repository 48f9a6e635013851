use bgp_dns_application::ports::{BgpGlobal, BgpSpeaker};
use bgp_dns_domain::Config;
use bgp_dns_infrastructure::bgp::LoopbackRib;
use std::sync::Arc;
use tracing::{info, warn};

pub struct BgpServices {
    pub speaker: Arc<dyn BgpSpeaker>,
}

impl BgpServices {
    /// Starts the speaker and registers every configured neighbor.
    pub async fn start(config: &Config) -> anyhow::Result<Self> {
        let speaker: Arc<dyn BgpSpeaker> = Arc::new(LoopbackRib::new());

        speaker.start(&BgpGlobal::from(&config.bgp)).await?;
        speaker.set_log_level(&config.bgp.log_level)?;

        for peer in &config.bgp.peers {
            speaker.add_peer(peer).await?;
        }

        info!(
            asn = config.bgp.asn,
            router_id = %config.bgp.router_id,
            peers = config.bgp.peers.len(),
            "BGP speaker ready"
        );
        if !config.bgp.peers.is_empty() {
            warn!(
                peers = config.bgp.peers.len(),
                "Configured neighbors get no sessions from the loopback speaker"
            );
        }

        Ok(Self { speaker })
    }

    pub async fn stop(&self) {
        if let Err(e) = self.speaker.stop().await {
            warn!(error = %e, "BGP speaker did not stop cleanly");
        }
    }
}
