//! Per-data-source store registry with lazy, single-flight initialisation.
//! Used by: state, executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::query::request::DataSource;
use crate::store::sqlite::Store;

struct Slot {
    path: String,
    store: OnceCell<Arc<Store>>,
}

impl Slot {
    fn lazy(path: &str) -> Self {
        Self {
            path: path.to_owned(),
            store: OnceCell::new(),
        }
    }
}

/// Independent stores for the primary and secondary sources. Each store is
/// opened by the first request that needs it; concurrent first requests wait
/// on the same initialisation instead of opening duplicates. A failed open
/// leaves the slot empty so a later request can retry.
pub struct DataSources {
    primary: Slot,
    secondary: Slot,
    busy_timeout: Duration,
}

impl DataSources {
    pub fn new(config: &Config) -> Self {
        Self {
            primary: Slot::lazy(&config.primary_db),
            secondary: Slot::lazy(&config.secondary_db),
            busy_timeout: config.query_timeout,
        }
    }

    #[cfg(test)]
    pub fn preloaded(primary: Store, secondary: Store) -> Self {
        let ready = |store: Store| Slot {
            path: String::from(":memory:"),
            store: OnceCell::new_with(Some(Arc::new(store))),
        };
        Self {
            primary: ready(primary),
            secondary: ready(secondary),
            busy_timeout: Duration::from_secs(1),
        }
    }

    fn slot(&self, source: DataSource) -> &Slot {
        match source {
            DataSource::Primary => &self.primary,
            DataSource::Secondary => &self.secondary,
        }
    }

    pub fn path(&self, source: DataSource) -> &str {
        &self.slot(source).path
    }

    pub fn is_connected(&self, source: DataSource) -> bool {
        self.slot(source).store.initialized()
    }

    pub async fn get(&self, source: DataSource) -> Result<Arc<Store>> {
        let slot = self.slot(source);
        let busy_timeout = self.busy_timeout;
        let store = slot
            .store
            .get_or_try_init(|| async {
                tracing::info!(%source, path = %slot.path, "connecting to data source");
                let path = slot.path.clone();
                let opened = tokio::task::spawn_blocking(move || Store::open(&path, busy_timeout))
                    .await
                    .map_err(|e| Error::Internal(e.to_string()))?;
                match opened {
                    Ok(store) => Ok(Arc::new(store)),
                    Err(e) => {
                        tracing::error!(%source, path = %slot.path, error = %e, "data source unavailable");
                        Err(Error::StoreUnavailable(format!("{source}: {e}")))
                    }
                }
            })
            .await?;
        Ok(Arc::clone(store))
    }
}
