//! Live query bindings.
//!
//! A binding turns a realtime store listener into plain state: `data` plus
//! a `loading` flag. Each binding owns at most one listener at a time.
//! Re-binding with a structurally equal descriptor is a no-op; a changed
//! descriptor tears the old listener down before the new one is installed.
//!
//! Failures never surface as panics or `Err` from a bind call. They are
//! published on the [`ErrorChannel`](crate::channel::ErrorChannel) and the
//! binding settles on `data = None, loading = false` until its descriptor
//! changes.
//!
//! # Example
//!
//! ```ignore
//! let mut packages = CollectionBinding::new(store.clone(), channel.clone());
//! packages.bind(Some("holidayPackages"), None);
//!
//! let watcher = packages.watch();
//! while let Ok(state) = watcher.recv() {
//!     if state.loading {
//!         continue; // skeleton
//!     }
//!     let packages: Vec<HolidayPackage> = state.decode_all()?.data.unwrap_or_default();
//!     // ... render ...
//! }
//! ```

mod collection;
mod document;
mod state;

pub use collection::CollectionBinding;
pub use document::{DocumentBinding, DocumentTarget};
pub use state::{LiveState, StateWatcher, DEFAULT_WATCH_BUFFER};
