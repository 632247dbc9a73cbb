//! Shared access to a single view collection.

use eyre::Result;
use log::debug;
use once_cell::sync::OnceCell;

use crate::{Config, Error, ViewCollection};

static GLOBAL: TemplateManager = TemplateManager::new();

/// Hands out one memoized [`ViewCollection`].
///
/// The first call to [`TemplateManager::create`] configures the collection.
/// It is never replaced afterwards: later calls return the original instance
/// and their configuration is ignored.
///
/// A process-wide manager is available through [`TemplateManager::global`],
/// but managers can also be constructed and passed around explicitly.
#[derive(Debug, Default)]
pub struct TemplateManager {
    collection: OnceCell<ViewCollection>,
}

impl TemplateManager {
    /// Constructor for an uninitialized manager.
    pub const fn new() -> Self {
        Self {
            collection: OnceCell::new(),
        }
    }

    /// The process-wide manager.
    pub fn global() -> &'static TemplateManager {
        &GLOBAL
    }

    /// Returns the shared collection, creating it from the given
    /// configuration on the first call only.
    pub fn create(&self, config: Config) -> &ViewCollection {
        let mut created = false;
        let collection = self.collection.get_or_init(|| {
            created = true;
            ViewCollection::new(config.clone())
        });
        if !created && collection.config().root() != config.root() {
            debug!(
                "Template manager already initialized for {}, ignoring {}",
                collection.config().root(),
                config.root()
            );
        }
        collection
    }

    /// Whether [`TemplateManager::create`] has been called.
    pub fn is_initialized(&self) -> bool {
        self.collection.get().is_some()
    }

    /// Returns the shared collection for rendering views.
    ///
    /// Fails with [`Error::NotInitialized`] if the manager has not been
    /// created yet.
    pub fn views(&self) -> Result<&ViewCollection> {
        self.collection
            .get()
            .ok_or_else(|| Error::NotInitialized.into())
    }

    /// Returns the shared collection for rendering components. Identical to
    /// [`TemplateManager::views`].
    pub fn components(&self) -> Result<&ViewCollection> {
        self.views()
    }
}
