#![forbid(unsafe_code)]

//! Reactive inputs for the refresh coordinator.
//!
//! - [`Observable`]: a shared, version-tracked value with change
//!   notification via subscriber callbacks.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`ModelSource`]: a lazily evaluated read of a model collection.
//! - [`RefreshScope`]: turns observable changes into
//!   coalesced refresh requests.
//!
//! # Architecture
//!
//! `Observable<T>` uses `Rc<RefCell<..>>` for single-threaded shared
//! ownership. Subscribers are stored as `Weak` function pointers and cleaned
//! up lazily during notification. The whole layer lives on the UI thread;
//! none of these types are `Send`.

pub mod observable;
pub mod source;

pub use observable::{Observable, Subscription};
pub use source::{ModelSource, RefreshScope};
