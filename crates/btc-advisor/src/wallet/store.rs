//! Wallet Persistence
//!
//! The wallet is one JSON document under a fixed storage key.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::error::{AdvisorError, Result};
use crate::model::WalletState;

/// Fixed name the wallet document is stored under
pub const WALLET_STORAGE_KEY: &str = "btc_wallet";

/// Durable storage for the wallet document
pub trait WalletStore: Send + Sync {
    /// Load the wallet, `None` if nothing has been stored yet
    fn load(&self) -> Result<Option<WalletState>>;

    /// Replace the stored wallet as a whole
    fn save(&self, wallet: &WalletState) -> Result<()>;
}

/// In-memory store holding the serialized document (for development/testing)
#[derive(Default)]
pub struct MemoryWalletStore {
    document: RwLock<Option<String>>,
}

impl MemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored JSON, if any
    pub fn document(&self) -> Option<String> {
        self.document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl WalletStore for MemoryWalletStore {
    fn load(&self) -> Result<Option<WalletState>> {
        self.document()
            .map(|doc| serde_json::from_str(&doc).map_err(AdvisorError::from))
            .transpose()
    }

    fn save(&self, wallet: &WalletState) -> Result<()> {
        let doc = serde_json::to_string(wallet)?;
        *self.document.write().unwrap_or_else(PoisonError::into_inner) = Some(doc);
        Ok(())
    }
}

/// JSON file store with write-then-rename replacement
pub struct FileWalletStore {
    path: PathBuf,
}

impl FileWalletStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/btc_wallet.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{WALLET_STORAGE_KEY}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl WalletStore for FileWalletStore {
    fn load(&self) -> Result<Option<WalletState>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, wallet: &WalletState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path();
        fs::write(&tmp, serde_json::to_vec_pretty(wallet)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
