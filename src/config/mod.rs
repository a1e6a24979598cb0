pub mod cluster;
pub mod settings;

pub use cluster::Cluster;
pub use settings::{Settings, StaleFetchPolicy};
