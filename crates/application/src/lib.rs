//! bgp-dns application layer: the actor primitive, the ports to the outside
//! world and the services that turn DNS answers into routes.
pub mod actor;
pub mod ports;
pub mod services;

pub use actor::{spawn, ActorHandle, Handler, Mailbox};
