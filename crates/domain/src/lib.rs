//! bgp-dns domain layer
pub mod bgp_path;
pub mod community;
pub mod config;
pub mod dns_answer;
pub mod domain_list;
pub mod errors;
pub mod fqdn;
pub mod kernel_route;

pub use bgp_path::{AddressFamily, BgpPath, PathOrigin, PrefixLookup};
pub use community::Community;
pub use config::{CliOverrides, Config, ConfigError};
pub use dns_answer::{AnswerStatus, UpstreamAnswer};
pub use domain_list::{parse_domain_list, read_domain_list};
pub use errors::DomainError;
pub use fqdn::Fqdn;
pub use kernel_route::{RouteKey, RouteSpec};
