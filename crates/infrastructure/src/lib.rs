pub mod bgp;
pub mod dns;
pub mod kernel;
