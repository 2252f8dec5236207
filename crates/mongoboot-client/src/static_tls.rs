//! Process-wide TLS properties used by the static TLS mode.
//!
//! The static mode does not hand a TLS context to the client. It installs the
//! store locations and passwords into this table, and the driver hand-off
//! resolves them from here when the client is created. The table is shared by
//! the whole process: two differently configured static-TLS clients cannot
//! coexist, and callers must initialize static TLS at most once.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use mongoboot_core::{BootstrapResult, MongoConfig};
use once_cell::sync::Lazy;

use crate::tls::store;

pub const TRUST_STORE: &str = "tls.trust-store";
pub const TRUST_STORE_PASSWORD: &str = "tls.trust-store-password";
pub const KEY_STORE: &str = "tls.key-store";
pub const KEY_STORE_PASSWORD: &str = "tls.key-store-password";

#[derive(Default)]
struct PropertyTable {
    values: HashMap<&'static str, String>,
    installs: u64,
}

static PROPERTIES: Lazy<RwLock<PropertyTable>> =
    Lazy::new(|| RwLock::new(PropertyTable::default()));

/// The four values installed by [`install`].
#[derive(Clone, PartialEq, Eq)]
pub struct StaticTlsProperties {
    trust_store: PathBuf,
    trust_store_password: String,
    key_store: PathBuf,
    key_store_password: String,
}

impl StaticTlsProperties {
    pub fn new(
        trust_store: impl Into<PathBuf>,
        key_store: impl Into<PathBuf>,
        password: impl Into<String>,
    ) -> Self {
        let password = password.into();
        Self {
            trust_store: trust_store.into(),
            trust_store_password: password.clone(),
            key_store: key_store.into(),
            key_store_password: password,
        }
    }

    /// Resolve both stores below `<resource-root>/certs` and check they exist.
    pub fn from_config(config: &MongoConfig) -> BootstrapResult<Self> {
        let certs = config.require_certs()?;
        let certs_dir = config.certs_dir();
        let trust_store = store::store_path(&certs_dir, certs.trust_store_file_name());
        let key_store = store::store_path(&certs_dir, certs.key_store_file_name());
        store::ensure_exists(&trust_store)?;
        store::ensure_exists(&key_store)?;
        Ok(Self::new(trust_store, key_store, certs.store_password()))
    }

    pub fn trust_store(&self) -> &Path {
        &self.trust_store
    }

    pub fn trust_store_password(&self) -> &str {
        &self.trust_store_password
    }

    pub fn key_store(&self) -> &Path {
        &self.key_store
    }

    pub fn key_store_password(&self) -> &str {
        &self.key_store_password
    }

    fn entries(&self) -> [(&'static str, String); 4] {
        [
            (TRUST_STORE, self.trust_store.display().to_string()),
            (TRUST_STORE_PASSWORD, self.trust_store_password.clone()),
            (KEY_STORE, self.key_store.display().to_string()),
            (KEY_STORE_PASSWORD, self.key_store_password.clone()),
        ]
    }
}

impl fmt::Debug for StaticTlsProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTlsProperties")
            .field("trust_store", &self.trust_store)
            .field("key_store", &self.key_store)
            .finish_non_exhaustive()
    }
}

/// Write all four properties. Installing the same values again leaves the
/// table content unchanged.
pub fn install(properties: &StaticTlsProperties) {
    let mut table = PROPERTIES.write().unwrap_or_else(PoisonError::into_inner);
    for (key, value) in properties.entries() {
        table.values.insert(key, value);
    }
    table.installs += 1;
    tracing::info!(
        trust_store = %properties.trust_store.display(),
        key_store = %properties.key_store.display(),
        installs = table.installs,
        "Installed process-wide TLS properties"
    );
}

/// The installed properties, if all four are present.
pub fn current() -> Option<StaticTlsProperties> {
    let table = PROPERTIES.read().unwrap_or_else(PoisonError::into_inner);
    Some(StaticTlsProperties {
        trust_store: PathBuf::from(table.values.get(TRUST_STORE)?),
        trust_store_password: table.values.get(TRUST_STORE_PASSWORD)?.clone(),
        key_store: PathBuf::from(table.values.get(KEY_STORE)?),
        key_store_password: table.values.get(KEY_STORE_PASSWORD)?.clone(),
    })
}

pub fn property(key: &str) -> Option<String> {
    PROPERTIES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .values
        .get(key)
        .cloned()
}

/// How many times [`install`] has run in this process.
pub fn install_count() -> u64 {
    PROPERTIES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .installs
}

pub fn clear() {
    let mut table = PROPERTIES.write().unwrap_or_else(PoisonError::into_inner);
    table.values.clear();
}
