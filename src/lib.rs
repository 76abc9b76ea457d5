//! # docbind
//!
//! Live query bindings over a realtime document store.
//!
//! ## Core Concepts
//!
//! - **Bindings**: turn a store listener into `{ data, loading }` state,
//!   re-subscribing only when what they watch actually changes
//! - **Error channel**: a pub/sub bus carrying structured permission errors
//!   from bindings and writes to whoever presents them
//! - **Store**: the [`RemoteStore`] contract plus an in-process
//!   [`MemoryStore`] with security rules and export/import
//! - **Catalog**: typed models for the travel site's collections
//! - **Booking**: inquiry form validation and the WhatsApp hand-off
//!
//! ## Example
//!
//! ```ignore
//! use docbind::{catalog, LiveContext, ListenerConfig, MemoryStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::default());
//! let context = LiveContext::new(store.clone());
//! let _root = context.attach_listener(ListenerConfig::default());
//!
//! let mut testimonials = context.collection();
//! testimonials.bind(
//!     Some(catalog::TESTIMONIALS),
//!     Some(catalog::approved_testimonials()),
//! );
//!
//! store.flush();
//! let shown: Vec<catalog::Testimonial> =
//!     testimonials.decoded()?.data.unwrap_or_default();
//! ```

pub mod bindings;
pub mod booking;
pub mod catalog;
pub mod channel;
pub mod context;
pub mod error;
pub mod mutations;
pub mod store;
pub mod types;

// Re-exports
pub use bindings::{
    CollectionBinding, DocumentBinding, DocumentTarget, LiveState, StateWatcher,
    DEFAULT_WATCH_BUFFER,
};
pub use channel::{
    ChannelEvent, ChannelSubscription, ErrorChannel, ErrorSurface, ListenerConfig,
    PermissionErrorListener, PERMISSION_ERROR,
};
pub use context::LiveContext;
pub use booking::{BookingConfig, BookingForm, BookingInquiry, Captcha};
pub use error::{BindError, FieldError, PermissionError, Result, ValidationErrors};
pub use mutations::{to_fields, Mutations};
pub use store::{
    AccessRules, Delivery, DocumentSnapshot, ErrorCallback, ListenerRegistration, MemoryStore,
    MemoryStoreConfig, QuerySnapshot, RemoteStore, SetOptions, SnapshotCallback,
};
pub use types::*;
