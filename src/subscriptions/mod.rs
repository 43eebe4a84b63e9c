//! Subscription registry and dispatcher.
//!
//! This module provides synchronous, in-process event channels:
//! - Any [`Subscribable`] owns a lazily created map of channels
//! - A [`Registry`] hands out subscription ids and dispatches to listeners
//!
//! Subscriptions support:
//! - Per-subscription metadata passed back to the listener
//! - One-shot listeners, removed right before their first invocation
//! - Removal by id alone, or by target + channel + listener/id
//!
//! # Example
//!
//! ```
//! use event_registry::{Listener, Registry, Subscribable};
//! use serde_json::{json, Value};
//!
//! let registry = Registry::new();
//! let session = Subscribable::new();
//!
//! let id = registry.subscribe(
//!     &session,
//!     "login",
//!     Listener::new(|_target, args, meta| {
//!         println!("{} logged in as {}", args["user"], meta["role"]);
//!         Ok(())
//!     }),
//!     json!({"role": "admin"}),
//! );
//!
//! registry.dispatch(&session, "login", &json!({"user": "a"})).unwrap();
//! assert!(registry.unsubscribe_by_id(id));
//! assert_eq!(registry.dispatch(&session, "login", &Value::Null).unwrap(), 0);
//! ```

mod registry;
mod slots;
mod target;
mod types;

pub use registry::Registry;
pub use target::Subscribable;
pub use types::{ErrorPolicy, Listener, RegistryConfig, Selector, SubscriptionInfo};
