pub mod driver;
pub mod registry;
pub mod settings;
pub mod static_tls;
pub mod tls;

pub use registry::{ClientRegistry, ClientRole};
pub use settings::{build_client_settings, ClientSettings, ConstructionPath};
pub use tls::{build_tls_context, TlsContext, TlsTransport};
