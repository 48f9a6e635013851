use crate::Community;
use serde::{Deserialize, Serialize};

/// Kernel route injection of BGP-learned prefixes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KernelConfig {
    /// Inject matching routes into the main routing table (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// A learned path is injected when it carries any of these communities.
    /// An empty list injects nothing.
    #[serde(default)]
    pub inject_communities: Vec<Community>,

    /// Metric (priority) stamped on every injected route (default: 100)
    #[serde(default = "default_metric")]
    pub metric: u32,

    /// Routing protocol tag of injected routes (default: 186, RTPROT_BGP)
    #[serde(default = "default_protocol")]
    pub protocol: u8,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            inject_communities: Vec::new(),
            metric: default_metric(),
            protocol: default_protocol(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_metric() -> u32 {
    100
}

fn default_protocol() -> u8 {
    186
}
