#![forbid(unsafe_code)]

//! Model sources and refresh scopes.
//!
//! A [`ModelSource<T>`] is how the registry reads the caller's models: a
//! closure pulled once at the start of every refresh cycle. Sources built
//! from an [`Observable`] read its value at pull time, so the snapshot
//! always reflects the newest data.
//!
//! Two shapes cover the common case of one shared collection feeding several
//! sections:
//!
//! - [`ModelSource::filtered`]: the rows of one section, picked from a list.
//! - [`ModelSource::grouped`]: rows for a wildcard binding, grouped by the
//!   section identity each row reports.
//!
//! A [`RefreshScope`] connects observables to a [`RefreshTrigger`]: any
//! change to a watched observable requests a refresh.
//!
//! # Invariants
//!
//! 1. `ModelSource::get()` evaluates the closure on every call; nothing is
//!    cached between cycles.
//! 2. `filtered` and `grouped` keep source order within each section.
//! 3. Dropping or clearing a `RefreshScope` disconnects every watch it holds.
//! 4. Many changes between two cycles collapse into one pending request.
//!
//! # Failure Modes
//!
//! - Source closure panic: propagates to the refresh cycle that pulled it.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use rowkit_core::Identity;

use super::observable::{Observable, Subscription};
use crate::trigger::RefreshTrigger;

/// Where the registry pulls a model collection from.
pub struct ModelSource<T> {
    pull: Rc<dyn Fn() -> T>,
}

impl<T> Clone for ModelSource<T> {
    fn clone(&self) -> Self {
        Self {
            pull: Rc::clone(&self.pull),
        }
    }
}

impl<T> fmt::Debug for ModelSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSource").finish_non_exhaustive()
    }
}

impl<T: 'static> ModelSource<T> {
    /// A source pulling from `pull`.
    pub fn new(pull: impl Fn() -> T + 'static) -> Self {
        Self { pull: Rc::new(pull) }
    }

    /// A source that always yields a clone of `value`.
    pub fn constant(value: T) -> Self
    where
        T: Clone,
    {
        Self::new(move || value.clone())
    }

    /// Pull the current models.
    #[must_use]
    pub fn get(&self) -> T {
        (self.pull)()
    }
}

impl<T: Clone + PartialEq + 'static> ModelSource<T> {
    /// The observable's value at pull time.
    pub fn from_observable(source: &Observable<T>) -> Self {
        let source = source.clone();
        Self::new(move || source.get())
    }
}

impl<T: Clone + PartialEq + 'static> From<&Observable<T>> for ModelSource<T> {
    fn from(source: &Observable<T>) -> Self {
        Self::from_observable(source)
    }
}

impl<R: Clone + PartialEq + 'static> ModelSource<Vec<R>> {
    /// Rows of `source` for which `keep` holds, in list order.
    pub fn filtered(source: &Observable<Vec<R>>, keep: impl Fn(&R) -> bool + 'static) -> Self {
        let source = source.clone();
        Self::new(move || source.with(|rows| rows.iter().filter(|r| keep(r)).cloned().collect()))
    }
}

impl<R: Clone + PartialEq + 'static> ModelSource<Vec<(Identity, Vec<R>)>> {
    /// Rows of `source` grouped by the section identity `section_of` returns.
    ///
    /// Groups appear in order of first occurrence; rows keep list order.
    pub fn grouped(
        source: &Observable<Vec<R>>,
        section_of: impl Fn(&R) -> Identity + 'static,
    ) -> Self {
        let source = source.clone();
        Self::new(move || {
            source.with(|rows| {
                let mut slots: AHashMap<Identity, usize> = AHashMap::new();
                let mut groups: Vec<(Identity, Vec<R>)> = Vec::new();
                for row in rows {
                    let section = section_of(row);
                    let slot = *slots.entry(section.clone()).or_insert_with(|| {
                        groups.push((section, Vec::new()));
                        groups.len() - 1
                    });
                    groups[slot].1.push(row.clone());
                }
                groups
            })
        })
    }
}

// ---------------------------------------------------------------------------
// RefreshScope
// ---------------------------------------------------------------------------

/// Holds the subscriptions that turn observable changes into refresh requests.
///
/// When the scope is dropped, every watch it holds is released.
pub struct RefreshScope {
    trigger: RefreshTrigger,
    subscriptions: Vec<Subscription>,
}

impl RefreshScope {
    /// An empty scope feeding `trigger`.
    #[must_use]
    pub fn new(trigger: RefreshTrigger) -> Self {
        Self {
            trigger,
            subscriptions: Vec::new(),
        }
    }

    /// Request a refresh whenever `source` changes.
    pub fn watch<T: Clone + PartialEq + 'static>(&mut self, source: &Observable<T>) -> &mut Self {
        let trigger = self.trigger.clone();
        let sub = source.subscribe(move |_| trigger.request());
        self.subscriptions.push(sub);
        self
    }

    /// Number of held subscriptions.
    #[must_use]
    pub fn watch_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Release every subscription (the scope stays usable).
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

impl fmt::Debug for RefreshScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshScope")
            .field("watch_count", &self.subscriptions.len())
            .field("pending", &self.trigger.is_pending())
            .finish()
    }
}
