use bgp_dns_domain::{CliOverrides, Config};
use tracing::info;

pub fn load_config(
    config_path: Option<&str>,
    cli_overrides: CliOverrides,
) -> anyhow::Result<Config> {
    let config = Config::load(config_path, cli_overrides)?;
    config.validate()?;

    info!(
        config_file = config_path.unwrap_or("default"),
        dns_listen = %config.dns.listen,
        resolvers = config.dns.resolvers.len(),
        asn = config.bgp.asn,
        router_id = %config.bgp.router_id,
        peers = config.bgp.peers.len(),
        "Configuration loaded"
    );

    Ok(config)
}
