use crate::adapter::PluginAdapter;
use crate::config::AdapterConfig;
use crate::errors::PluginError;
use crate::plugin::{LedgerPlugin, Plugin, PluginHandle};
use crate::PLUGIN_VERSION;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

static REGISTRY: Lazy<PluginRegistry> = Lazy::new(PluginRegistry::new);

/// Adapts `plugin` with the process-wide registry and the default
/// [`AdapterConfig`]. See [`PluginRegistry::adapt`].
pub fn adapt(plugin: impl Into<PluginHandle>) -> Result<Arc<dyn Plugin>, PluginError> {
    REGISTRY.adapt(plugin)
}

// The registry keeps a strong reference to each ledger through its adapter, so
// the address cannot be reused by another plugin while the entry exists.
fn identity(ledger: &Arc<dyn LedgerPlugin>) -> usize {
    Arc::as_ptr(ledger) as *const () as usize
}

/// Remembers the adapter created for each v1 plugin so that adapting the same
/// plugin again returns the same adapter.
///
/// Entries are only removed by [`release`](PluginRegistry::release).
pub struct PluginRegistry {
    config: AdapterConfig,
    adapters: Mutex<HashMap<usize, Arc<PluginAdapter>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry::with_config(AdapterConfig::default())
    }

    pub fn with_config(config: AdapterConfig) -> Self {
        PluginRegistry {
            config,
            adapters: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a v2 plugin unchanged, or the adapter for a v1 plugin.
    pub fn adapt(&self, plugin: impl Into<PluginHandle>) -> Result<Arc<dyn Plugin>, PluginError> {
        match plugin.into() {
            PluginHandle::V2(plugin) => {
                let version = plugin.version();
                if version != PLUGIN_VERSION {
                    return Err(PluginError::InvalidArgument(format!(
                        "expected a version {} plugin, got version {}",
                        PLUGIN_VERSION, version
                    )));
                }
                Ok(plugin)
            }
            PluginHandle::V1(ledger) => {
                let mut adapters = self.adapters.lock();
                let adapter = adapters
                    .entry(identity(&ledger))
                    .or_insert_with(|| {
                        debug!("Adapting ledger plugin for {}", ledger.get_account());
                        PluginAdapter::new(Arc::clone(&ledger), self.config.clone())
                    })
                    .clone();
                Ok(adapter as Arc<dyn Plugin>)
            }
        }
    }

    /// Forgets the adapter of `ledger`. The next [`adapt`](PluginRegistry::adapt)
    /// creates a new one.
    pub fn release(&self, ledger: &Arc<dyn LedgerPlugin>) -> Option<Arc<PluginAdapter>> {
        self.adapters.lock().remove(&identity(ledger))
    }

    pub fn len(&self) -> usize {
        self.adapters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.lock().is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        PluginRegistry::new()
    }
}
