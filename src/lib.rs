//! # Event Registry
//!
//! Synchronous publish/subscribe over per-object event channels.
//!
//! ## Core Concepts
//!
//! - **Targets**: [`Subscribable`] values own a map of named or numbered channels
//! - **Registry**: hands out never-reused subscription ids and resolves them
//! - **Dispatch**: runs live listeners in subscription order on the caller's thread
//! - **Conveniences**: [`Emitter`] for host types, [`Event`] for a single channel
//!
//! ## Example
//!
//! ```
//! use event_registry::{Emitter, Listener, Registry};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! let button = Emitter::new(Arc::new(Registry::new()));
//!
//! let greet = Listener::new(|_target, args, _meta| {
//!     println!("clicked at {}", args["x"]);
//!     Ok(())
//! });
//! button.on("click", greet.clone(), Value::Null);
//! button.once("click", greet.clone(), Value::Null);
//!
//! assert_eq!(button.emit("click", &json!({"x": 10})).unwrap(), 2);
//! assert_eq!(button.emit("click", &json!({"x": 11})).unwrap(), 1);
//! assert!(button.off("click", &greet));
//! ```

pub mod emitter;
pub mod error;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use emitter::{Emitter, Event, EVENT_CHANNEL};
pub use error::{EventError, ListenerError, ListenerFailure, ListenerResult, Result};
pub use subscriptions::{
    ErrorPolicy, Listener, Registry, RegistryConfig, Selector, Subscribable, SubscriptionInfo,
};
pub use types::{Channel, SubscriptionId};
