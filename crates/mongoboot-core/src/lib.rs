pub mod config;
pub mod error;

pub use config::{CertsConfig, ClusterConnectionMode, ClusterType, MongoConfig};
pub use error::{BootstrapError, BootstrapResult};
