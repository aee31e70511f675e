use std::path::Path;
use std::sync::Arc;
use ag_core::{ArticleStore, CredentialStore, Error, Result};

pub mod backends;

pub use backends::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    SQLite,
}

impl std::str::FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" => Ok(StorageKind::Memory),
            "sqlite" => Ok(StorageKind::SQLite),
            _ => Err(Error::Configuration(format!(
                "Unknown storage backend: {}. Available backends: memory (default), sqlite",
                s
            ))),
        }
    }
}

/// One backend seen through both persistence seams.
#[derive(Clone)]
pub struct Storage {
    pub articles: Arc<dyn ArticleStore>,
    pub credentials: Arc<dyn CredentialStore>,
}

impl Storage {
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: ArticleStore + CredentialStore + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            articles: backend.clone(),
            credentials: backend,
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

pub async fn create_storage(kind: StorageKind, path: Option<&Path>) -> Result<Storage> {
    match kind {
        StorageKind::Memory => Ok(Storage::from_backend(InMemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        StorageKind::SQLite => {
            let backend = match path {
                Some(path) => SQLiteStorage::new_with_path(path).await?,
                None => SQLiteStorage::new().await?,
            };
            Ok(Storage::from_backend(backend))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageKind::SQLite => {
            let _ = path;
            Err(Error::Configuration(
                "SQLite storage requires the `sqlite` feature".to_string(),
            ))
        }
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, Storage, StorageKind};
}
