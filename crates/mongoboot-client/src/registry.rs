use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use mongoboot_core::{BootstrapResult, MongoConfig};
use mongodb::Client;
use once_cell::sync::Lazy;
use tokio::sync::{Mutex, OnceCell};

use crate::driver;
use crate::settings::{build_client_settings, ConstructionPath};

static GLOBAL: Lazy<ClientRegistry> = Lazy::new(ClientRegistry::new);

/// Key under which a shared client is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientRole(String);

impl ClientRole {
    pub const DEFAULT: &'static str = "mongo-client";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientRole {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for ClientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared clients by role. Each role is populated at most once; later callers
/// get the existing client.
pub struct ClientRegistry {
    slots: Mutex<HashMap<ClientRole, Arc<OnceCell<Client>>>>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static ClientRegistry {
        &GLOBAL
    }

    async fn slot(&self, role: &ClientRole) -> Arc<OnceCell<Client>> {
        self.slots
            .lock()
            .await
            .entry(role.clone())
            .or_default()
            .clone()
    }

    pub async fn get(&self, role: &ClientRole) -> Option<Client> {
        let slot = self.slots.lock().await.get(role).cloned()?;
        slot.get().cloned()
    }

    /// Returns false, leaving the existing client in place, if the role is
    /// already taken or being initialized.
    pub async fn register(&self, role: ClientRole, client: Client) -> bool {
        let registered = self.slot(&role).await.set(client).is_ok();
        if !registered {
            tracing::debug!(%role, "Client already registered, keeping existing instance");
        }
        registered
    }

    /// Return the registered client, or run `init` and register its result.
    /// Concurrent callers for the same role wait for the first `init` instead
    /// of constructing a second client; other roles are not blocked. A failed
    /// `init` registers nothing.
    pub async fn get_or_try_init<F, Fut>(&self, role: ClientRole, init: F) -> BootstrapResult<Client>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = BootstrapResult<Client>>,
    {
        let slot = self.slot(&role).await;
        let client = slot.get_or_try_init(init).await?;
        Ok(client.clone())
    }

    /// Build settings from `config` and register the resulting client under
    /// `role`, unless one is already registered.
    pub async fn bootstrap(&self, role: ClientRole, config: &MongoConfig) -> BootstrapResult<Client> {
        let label = role.clone();
        self.get_or_try_init(role, || async move {
            let path = ConstructionPath::select(config);
            match path {
                ConstructionPath::StaticTls => {
                    tracing::info!(role = %label, "MongoDB starting in static SSL/TLS mode")
                }
                ConstructionPath::DynamicTls => {
                    tracing::info!(role = %label, "MongoDB starting in dynamic SSL/TLS mode")
                }
                ConstructionPath::Default => {
                    tracing::info!(role = %label, "MongoDB starting in default mode")
                }
            }
            let settings = build_client_settings(config)?;
            driver::connect(&settings).await
        })
        .await
    }

    pub async fn remove(&self, role: &ClientRole) -> Option<Client> {
        let slot = self.slots.lock().await.remove(role)?;
        slot.get().cloned()
    }

    /// Number of roles with a registered client.
    pub async fn len(&self) -> usize {
        self.slots
            .lock()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
