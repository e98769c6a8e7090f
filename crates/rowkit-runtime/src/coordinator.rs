#![forbid(unsafe_code)]

//! The refresh coordinator.
//!
//! A [`Coordinator`] owns the registry, the currently displayed snapshot, and
//! the view surface. Each refresh cycle walks through the phases
//!
//! ```text
//! Idle → Refreshing → Diffing → Applying → Idle
//! ```
//!
//! pulling models from every bound source, diffing the result against the
//! current snapshot, and handing the change-set to the surface as one batch.
//!
//! # Lifecycle
//!
//! 1. Build a [`Registry`] and hand it to [`Coordinator::new`].
//! 2. Optionally supply an initial snapshot with
//!    [`with_initial_snapshot`](Coordinator::with_initial_snapshot).
//! 3. Call [`finish`](Coordinator::finish). The registry is frozen, the
//!    initial snapshot is shown with `reload_data`, and any refresh requested
//!    during setup runs.
//! 4. Call [`refresh`](Coordinator::refresh) after changing data, or watch
//!    observables with [`refresh_on`](Coordinator::refresh_on) and call
//!    [`pump`](Coordinator::pump) from the host loop.
//!
//! # Invariants
//!
//! 1. At most one cycle runs at a time. Requests made while a cycle is in
//!    flight coalesce into a single follow-up cycle.
//! 2. Back-to-back cycles are bounded by `max_coalesced_cycles`; a request
//!    still pending at the bound stays pending for the next call.
//! 3. The current snapshot is replaced only after the surface has received
//!    the whole batch.
//! 4. Handlers only ever observe the latest applied snapshot.
//!
//! # Failure Modes
//!
//! - `refresh()` before `finish()`: deferred, runs at `finish()`.
//! - `cell()` for a missing row or an unregistered renderer: panic.
//! - Surface or hook panic: propagates; the coordinator is left mid-cycle
//!   and should be discarded.

use std::fmt;
use std::time::Duration;

use rowkit_core::{
    ChangeSet, ChangeSummary, DiffOptions, Identifiable, Identity, IndexPath, RendererId,
    Snapshot, Supplementary, diff_with,
};
use web_time::Instant;

use crate::config::ReconcileConfig;
use crate::events::{EventSink, RowEmitter, RowEvent};
use crate::reactive::{Observable, RefreshScope};
use crate::registry::{Registry, RowBinding};
use crate::surface::{ApplyContext, ViewSurface};
use crate::trigger::{Phase, RefreshTrigger};

type ApplyHook<S, R> = Box<dyn FnMut(&ChangeSet, &Snapshot<S, R>)>;

/// Result of a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The coordinator is not finished; the request stays queued.
    Deferred,
    /// Nothing was pending.
    Idle,
    /// `cycles` cycles ran; `summary` describes the last one.
    Applied { cycles: u32, summary: ChangeSummary },
}

impl RefreshOutcome {
    /// Whether at least one cycle ran.
    #[must_use]
    pub const fn applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Result of [`Coordinator::pump`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpReport {
    pub refresh: RefreshOutcome,
    /// Handlers run while draining the event queue.
    pub handled_events: usize,
}

/// Running counters for a coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Cycles run, including ones with an empty change-set.
    pub cycles: u64,
    /// Refresh requests received, including coalesced ones.
    pub requests: u64,
    /// Requests made before `finish()`.
    pub deferred: u64,
    /// Cycles cut short by `max_coalesced_cycles`.
    pub bound_hits: u64,
    pub last_duration: Option<Duration>,
    pub last_summary: Option<ChangeSummary>,
}

impl CycleStats {
    /// Requests that were served by a cycle started for another request.
    #[must_use]
    pub fn coalesced(&self) -> u64 {
        self.requests.saturating_sub(self.cycles)
    }
}

/// A bound row ready to configure a view.
///
/// `emitter` is the row view's channel back to its handlers.
pub struct CellRef<'a, R, E> {
    pub path: IndexPath,
    pub id: &'a Identity,
    pub model: &'a R,
    pub renderer: RendererId,
    pub emitter: RowEmitter<E>,
}

impl<R: fmt::Debug, E> fmt::Debug for CellRef<'_, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellRef")
            .field("path", &self.path)
            .field("id", self.id)
            .field("model", self.model)
            .field("renderer", &self.renderer)
            .finish()
    }
}

/// Owns the displayed snapshot and keeps a [`ViewSurface`] in sync with the
/// registry's model sources.
pub struct Coordinator<S, R, V, E = ()> {
    registry: Registry<S, R, E>,
    surface: V,
    config: ReconcileConfig,
    options: DiffOptions<S, R>,
    current: Snapshot<S, R>,
    initial: Option<Snapshot<S, R>>,
    finished: bool,
    trigger: RefreshTrigger,
    scope: RefreshScope,
    events: EventSink<E>,
    will_apply: Vec<ApplyHook<S, R>>,
    did_apply: Vec<ApplyHook<S, R>>,
    stats: CycleStats,
}

impl<S, R, V, E> Coordinator<S, R, V, E>
where
    S: Identifiable + PartialEq + 'static,
    R: Identifiable + PartialEq + 'static,
    V: ViewSurface<S, R>,
{
    /// A coordinator comparing models with `PartialEq`.
    #[must_use]
    pub fn new(registry: Registry<S, R, E>, surface: V) -> Self {
        Self::with_options(registry, surface, DiffOptions::structural())
    }
}

impl<S, R, V, E> Coordinator<S, R, V, E>
where
    S: Identifiable + 'static,
    R: Identifiable + 'static,
    V: ViewSurface<S, R>,
{
    /// A coordinator with caller-supplied content equality.
    ///
    /// `DiffOptions::default()` treats every surviving row and section as
    /// changed, which is correct but reloads everything each cycle.
    #[must_use]
    pub fn with_options(registry: Registry<S, R, E>, surface: V, options: DiffOptions<S, R>) -> Self {
        let trigger = RefreshTrigger::new();
        Self {
            registry,
            surface,
            config: ReconcileConfig::default(),
            options,
            current: Snapshot::empty(),
            initial: None,
            finished: false,
            scope: RefreshScope::new(trigger.clone()),
            trigger,
            events: EventSink::new(),
            will_apply: Vec::new(),
            did_apply: Vec::new(),
            stats: CycleStats::default(),
        }
    }

    /// Replace the configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails [`ReconcileConfig::validate`], or if called
    /// after `finish()`.
    #[must_use]
    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        assert!(!self.finished, "rowkit: config must be set before finish()");
        if let Err(err) = config.validate() {
            panic!("rowkit: {err}");
        }
        self.config = config;
        self
    }

    /// Snapshot shown by `finish()` instead of the empty one.
    ///
    /// # Panics
    ///
    /// Panics if called after `finish()`.
    #[must_use]
    pub fn with_initial_snapshot(mut self, snapshot: Snapshot<S, R>) -> Self {
        assert!(!self.finished, "rowkit: initial snapshot must be set before finish()");
        self.initial = Some(snapshot);
        self
    }

    /// Setup access to the registry.
    ///
    /// Registry mutators panic once the coordinator is finished.
    pub fn registry_mut(&mut self) -> &mut Registry<S, R, E> {
        &mut self.registry
    }

    #[must_use]
    pub fn registry(&self) -> &Registry<S, R, E> {
        &self.registry
    }

    /// Run `hook` before each non-empty batch reaches the surface. It receives
    /// the change-set and the target snapshot.
    pub fn on_will_apply(&mut self, hook: impl FnMut(&ChangeSet, &Snapshot<S, R>) + 'static) {
        self.will_apply.push(Box::new(hook));
    }

    /// Run `hook` after each non-empty batch was applied. It receives the
    /// change-set and the now-current snapshot.
    pub fn on_did_apply(&mut self, hook: impl FnMut(&ChangeSet, &Snapshot<S, R>) + 'static) {
        self.did_apply.push(Box::new(hook));
    }

    /// Freeze the registry, show the initial snapshot, and run any refresh
    /// requested during setup.
    ///
    /// # Panics
    ///
    /// Panics if called twice, or if the registry fails its freeze checks.
    pub fn finish(&mut self) -> RefreshOutcome {
        assert!(!self.finished, "rowkit: finish() called twice");
        self.registry.freeze(self.config.empty_sections);
        self.current = self.initial.take().unwrap_or_default();
        self.finished = true;
        tracing::debug!(
            sections = self.current.len(),
            rows = self.current.total_rows(),
            config = %self.config,
            "rowkit coordinator finished"
        );
        self.surface.reload_data(&self.current);
        self.run_pending()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Request a refresh and, once finished, run it now.
    pub fn refresh(&mut self) -> RefreshOutcome {
        self.trigger.request();
        if !self.finished {
            self.stats.deferred += 1;
            tracing::debug!("refresh deferred until finish()");
            return RefreshOutcome::Deferred;
        }
        self.run_pending()
    }

    /// Run a refresh if one is pending.
    pub fn process_pending(&mut self) -> RefreshOutcome {
        if !self.finished {
            return if self.trigger.is_pending() {
                RefreshOutcome::Deferred
            } else {
                RefreshOutcome::Idle
            };
        }
        self.run_pending()
    }

    /// One host-loop turn: run pending refreshes, then dispatch queued events.
    pub fn pump(&mut self) -> PumpReport {
        let refresh = self.process_pending();
        let handled_events = self.dispatch_events();
        PumpReport {
            refresh,
            handled_events,
        }
    }

    /// Request a refresh whenever `source` changes. The request runs on the
    /// next `pump()` / `process_pending()` / `refresh()`.
    pub fn refresh_on<T: Clone + PartialEq + 'static>(&mut self, source: &Observable<T>) {
        self.scope.watch(source);
    }

    /// Drop every watch added with `refresh_on`.
    pub fn unwatch_all(&mut self) {
        self.scope.clear();
    }

    /// Observables currently watched.
    #[must_use]
    pub fn watch_count(&self) -> usize {
        self.scope.watch_count()
    }

    /// Handle for requesting refreshes from outside the coordinator.
    #[must_use]
    pub fn trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    /// Sink row views report events through.
    #[must_use]
    pub fn events(&self) -> EventSink<E> {
        self.events.clone()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.trigger.phase()
    }

    #[must_use]
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> CycleStats {
        CycleStats {
            requests: self.trigger.request_count(),
            ..self.stats
        }
    }

    #[must_use]
    pub fn surface(&self) -> &V {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut V {
        &mut self.surface
    }

    // -----------------------------------------------------------------------
    // Data-source queries
    // -----------------------------------------------------------------------

    /// The latest applied snapshot.
    #[must_use]
    pub fn snapshot(&self) -> &Snapshot<S, R> {
        &self.current
    }

    #[must_use]
    pub fn number_of_sections(&self) -> usize {
        self.current.len()
    }

    /// Rows in `section`, 0 when out of range.
    #[must_use]
    pub fn number_of_rows(&self, section: usize) -> usize {
        self.current.row_count(section)
    }

    #[must_use]
    pub fn header(&self, section: usize) -> Option<&Supplementary> {
        self.current.section(section).and_then(|s| s.header())
    }

    #[must_use]
    pub fn footer(&self, section: usize) -> Option<&Supplementary> {
        self.current.section(section).and_then(|s| s.footer())
    }

    /// The row at `path` together with its renderer and event emitter.
    ///
    /// # Panics
    ///
    /// Panics if no row exists at `path`, if the row's section has no
    /// binding, or if the row's renderer is not registered with that
    /// binding. All three mean the registry and the surface are out of sync.
    #[must_use]
    pub fn cell(&self, path: IndexPath) -> CellRef<'_, R, E> {
        let Some(section) = self.current.section(path.section) else {
            panic!("rowkit: no section at {path} ({} sections)", self.current.len());
        };
        let Some(row) = section.row(path.row) else {
            panic!(
                "rowkit: no row at {path} (section `{}` has {} rows)",
                section.id(),
                section.len()
            );
        };
        let Some(binding) = self.registry.row_binding(section.id()) else {
            panic!("rowkit: section `{}` has no row binding", section.id());
        };
        assert!(
            binding.is_registered(row.renderer()),
            "rowkit: renderer `{}` is not registered for section `{}`",
            row.renderer(),
            section.id()
        );
        CellRef {
            path,
            id: row.id(),
            model: row.model(),
            renderer: row.renderer(),
            emitter: self.events.for_row(row.id().clone()),
        }
    }

    // -----------------------------------------------------------------------
    // Event dispatch
    // -----------------------------------------------------------------------

    /// Deliver a tap on `path` to its handler. Returns whether one ran.
    pub fn tap(&self, path: IndexPath) -> bool {
        self.route(path, |binding, renderer, model| {
            binding.dispatch_tap(renderer, path, model)
        })
    }

    /// Deliver a custom event from `path` to its handler. Returns whether one
    /// ran.
    pub fn emit(&self, path: IndexPath, event: &E) -> bool {
        self.route(path, |binding, renderer, model| {
            binding.dispatch_event(renderer, path, model, event)
        })
    }

    /// Drain the event sink, resolving each event's row by identity against
    /// the current snapshot. Returns the number of handlers run.
    ///
    /// Does nothing while a cycle is in flight.
    pub fn dispatch_events(&self) -> usize {
        if self.phase().is_busy() || self.events.is_empty() {
            return 0;
        }
        let mut handled = 0;
        for queued in self.events.drain() {
            let Some(path) = self.current.row_path(&queued.row) else {
                tracing::debug!(row = %queued.row, "event for row no longer displayed dropped");
                continue;
            };
            let ran = match &queued.event {
                RowEvent::Tap => self.tap(path),
                RowEvent::Custom(event) => self.emit(path, event),
            };
            handled += usize::from(ran);
        }
        handled
    }

    fn route(&self, path: IndexPath, f: impl FnOnce(&RowBinding<R, E>, RendererId, &R) -> bool) -> bool {
        let Some(section) = self.current.section(path.section) else {
            return false;
        };
        let Some(row) = section.row(path.row) else {
            return false;
        };
        match self.registry.row_binding(section.id()) {
            Some(binding) => f(binding, row.renderer(), row.model()),
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Cycles
    // -----------------------------------------------------------------------

    fn run_pending(&mut self) -> RefreshOutcome {
        let max = self.config.max_coalesced_cycles;
        let mut cycles = 0u32;
        let mut summary = None;
        while self.trigger.is_pending() {
            if cycles >= max {
                self.stats.bound_hits += 1;
                tracing::warn!(
                    max_coalesced_cycles = max,
                    "refresh still pending after coalescing bound; leaving it queued"
                );
                break;
            }
            self.trigger.take();
            summary = Some(self.run_cycle());
            cycles += 1;
        }
        match summary {
            Some(summary) => RefreshOutcome::Applied { cycles, summary },
            None => RefreshOutcome::Idle,
        }
    }

    fn run_cycle(&mut self) -> ChangeSummary {
        let started = Instant::now();
        let span = tracing::debug_span!(
            "rowkit.refresh",
            cycle = self.stats.cycles + 1,
            duration_us = tracing::field::Empty
        );
        let _guard = span.enter();

        self.trigger.set_phase(Phase::Refreshing);
        let next = self.registry.build_snapshot(self.config.empty_sections);
        if next.collisions() > 0 {
            tracing::warn!(collisions = next.collisions(), "identity collisions resolved last-write-wins");
        }

        self.trigger.set_phase(Phase::Diffing);
        let changes = diff_with(&self.current, &next, &self.options);
        let summary = changes.summary();

        if changes.is_empty() {
            tracing::debug!("no changes");
            self.current = next;
        } else {
            self.trigger.set_phase(Phase::Applying);
            self.apply(&changes, next);
        }

        self.trigger.set_phase(Phase::Idle);
        let elapsed = started.elapsed();
        span.record("duration_us", elapsed.as_micros() as u64);
        self.stats.cycles += 1;
        self.stats.last_duration = Some(elapsed);
        self.stats.last_summary = Some(summary);
        summary
    }

    fn apply(&mut self, changes: &ChangeSet, next: Snapshot<S, R>) {
        for hook in &mut self.will_apply {
            hook(changes, &next);
        }

        let ops = changes.ops();
        if self.config.trace_change_sets {
            let names: Vec<&str> = ops.iter().map(|op| op.name()).collect();
            tracing::debug!(summary = %changes.summary(), ops = ?names, "applying change-set");
        }

        {
            let ctx = ApplyContext {
                previous: &self.current,
                target: &next,
                animation: self.config.animation,
            };
            self.surface.begin_updates();
            for op in &ops {
                self.surface.apply(op, &ctx);
            }
            self.surface.end_updates(&ctx);
        }

        self.current = next;
        for hook in &mut self.did_apply {
            hook(changes, &self.current);
        }
    }
}

impl<S, R, V: fmt::Debug, E> fmt::Debug for Coordinator<S, R, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("phase", &self.trigger.phase())
            .field("finished", &self.finished)
            .field("sections", &self.current.len())
            .field("rows", &self.current.total_rows())
            .field("watches", &self.scope.watch_count())
            .field("surface", &self.surface)
            .field("stats", &self.stats)
            .finish()
    }
}
