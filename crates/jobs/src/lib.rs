pub mod bgp_table_watch;
pub mod domain_list_watch;
pub mod runner;

pub use bgp_table_watch::BgpTableWatchJob;
pub use domain_list_watch::{DomainListWatchJob, FileStamps};
pub use runner::{JobRunner, RunningJobs};
