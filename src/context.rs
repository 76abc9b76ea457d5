//! Application context: the store handle and error channel, passed down.

use crate::bindings::{CollectionBinding, DocumentBinding};
use crate::channel::{ErrorChannel, ListenerConfig, PermissionErrorListener};
use crate::mutations::Mutations;
use crate::store::RemoteStore;
use std::sync::Arc;

/// Shared handles every binding needs. Cheap to clone.
#[derive(Clone)]
pub struct LiveContext {
    store: Arc<dyn RemoteStore>,
    errors: ErrorChannel,
}

impl LiveContext {
    /// Context with a fresh error channel.
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self::with_channel(store, ErrorChannel::new())
    }

    pub fn with_channel(store: Arc<dyn RemoteStore>, errors: ErrorChannel) -> Self {
        Self { store, errors }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn errors(&self) -> &ErrorChannel {
        &self.errors
    }

    /// An unbound collection binding.
    pub fn collection(&self) -> CollectionBinding {
        CollectionBinding::new(Arc::clone(&self.store), self.errors.clone())
    }

    /// An unbound document binding.
    pub fn document(&self) -> DocumentBinding {
        DocumentBinding::new(Arc::clone(&self.store), self.errors.clone())
    }

    pub fn mutations(&self) -> Mutations {
        Mutations::new(Arc::clone(&self.store), self.errors.clone())
    }

    /// Attach the root listener that surfaces permission errors.
    pub fn attach_listener(&self, config: ListenerConfig) -> PermissionErrorListener {
        PermissionErrorListener::attach(&self.errors, config)
    }
}
