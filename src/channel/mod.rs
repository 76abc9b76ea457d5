//! Process-wide error channel.
//!
//! Bindings detect failures; presentation decides how to show them. The
//! channel sits between the two as a pure fan-out of structured events:
//! no filtering, batching or persistence. Handlers run synchronously, in
//! registration order, on the publishing thread.
//!
//! The channel is an ordinary value: construct one at the application root
//! and pass it down (see [`LiveContext`](crate::context::LiveContext)).
//! Tests build as many isolated channels as they like.
//!
//! # Example
//!
//! ```ignore
//! let channel = ErrorChannel::new();
//! let listener = PermissionErrorListener::attach(&channel, ListenerConfig::default());
//!
//! // ... bindings publish on `channel` ...
//!
//! listener.check()?; // raises the oldest unseen denial in overlay mode
//! ```

mod bus;
mod listener;

pub use bus::{ChannelEvent, ChannelSubscription, ErrorChannel, PERMISSION_ERROR};
pub use listener::{ErrorSurface, ListenerConfig, PermissionErrorListener};
