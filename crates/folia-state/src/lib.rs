//! # folia-state
//!
//! Path-addressed reactive state store for the Folia UI runtime.
//!
//! Application state lives in a single nested `serde_json::Value` owned by a
//! [`PathStore`]. Reads (`get`) are dependency-tracked; writes (`set`) run a
//! middleware pipeline, commit synchronously, and notify subscribers through
//! a batched, hierarchical subscription graph:
//!
//! 1. **Tracking**: while a reactive function runs, every `get` records its
//!    path into the active [`DependencyTracker`] frame — only the paths read
//!    on the branch that actually executed are recorded.
//! 2. **Subscriptions**: the [`SubscriptionGraph`] matches a written path
//!    against exact, ancestor, and descendant subscribers, firing each
//!    callback at most once per change.
//! 3. **Scheduling**: the [`UpdateScheduler`] coalesces writes made within
//!    one synchronous tick (or an [`PathStore::execute_batch`] scope) and
//!    flushes them as a single pass; re-entrant writes are queued for a
//!    follow-up pass instead of recursing.
//!
//! Stores are explicit instances with an explicit lifecycle
//! ([`PathStore::create`] / [`PathStore::teardown`]); nothing here is a
//! process-wide singleton, so independent apps can run side by side.

pub mod context;
pub mod middleware;
pub mod path;
pub mod scheduler;
pub mod store;
pub mod subscriptions;
pub mod tracker;

pub use context::Context;
pub use middleware::{Middleware, MiddlewareError, WriteContext, WriteOutcome};
pub use scheduler::{PendingWrite, SchedulerConfig, UpdateScheduler};
pub use store::{NotifyPolicy, PathStore, StoreConfig, Unsubscribe};
pub use subscriptions::{Notification, SubscriberFn, SubscriptionGraph, SubscriptionId};
pub use tracker::DependencyTracker;
