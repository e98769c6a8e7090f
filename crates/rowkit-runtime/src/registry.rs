#![forbid(unsafe_code)]

//! Binding registry: which models fill which section, which renderer draws
//! each row, and which handlers receive its events.
//!
//! A [`Registry`] is assembled during setup and frozen by
//! `Coordinator::finish`. Each refresh it turns the caller's model sources
//! into a [`Snapshot`] via [`Registry::build_snapshot`].
//!
//! # Precedence
//!
//! A section can be bound specifically ([`Registry::bind`]) or through the
//! wildcard ([`Registry::bind_all`]). Specific bindings always win: rows,
//! renderers, and handlers for a specifically bound section come from its own
//! [`RowBinding`], and any rows the wildcard source supplies for that section
//! are ignored.
//!
//! # Invariants
//!
//! 1. Every model source is pulled at most once per snapshot build.
//! 2. The section list source fixes section order; the registry only reorders
//!    under [`EmptySectionPolicy::HideAndSort`].
//! 3. A frozen registry is never mutated.
//!
//! # Failure Modes
//!
//! - Mutating a frozen registry: panic (configuration error).
//! - `HideAndSort` without a comparator: panic at freeze.
//! - Wildcard rows for an unknown or specifically bound section: ignored,
//!   logged at debug level.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use rowkit_core::{Identifiable, Identity, IndexPath, RendererId, Row, Section, Snapshot, Supplementary};
use smallvec::SmallVec;

use crate::config::EmptySectionPolicy;
use crate::reactive::ModelSource;

type Selector<R> = Rc<dyn Fn(&R) -> RendererId>;
type TapHandler<R> = Rc<dyn Fn(IndexPath, &R)>;
type EventHandler<R, E> = Rc<dyn Fn(IndexPath, &R, &E)>;
type Supplier<S> = Rc<dyn Fn(&S) -> Option<Supplementary>>;
type Comparator<S> = Rc<dyn Fn(&S, &S) -> Ordering>;

/// Which sections a binding applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SectionKey {
    /// Every section without a specific binding.
    All,
    Section(Identity),
}

impl SectionKey {
    /// Key for one section.
    #[must_use]
    pub fn section(id: impl Into<Identity>) -> Self {
        Self::Section(id.into())
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Section(id) => write!(f, "{id}"),
        }
    }
}

enum RendererChoice<R> {
    Fixed(RendererId),
    Select(Selector<R>),
}

/// Renderer choice and event handlers for the rows of a section.
pub struct RowBinding<R, E = ()> {
    renderer: RendererChoice<R>,
    renderers: SmallVec<[RendererId; 4]>,
    taps: AHashMap<RendererId, TapHandler<R>>,
    events: AHashMap<RendererId, EventHandler<R, E>>,
}

impl<R, E> RowBinding<R, E> {
    /// Every row is drawn by `renderer`.
    #[must_use]
    pub fn new(renderer: RendererId) -> Self {
        let mut renderers = SmallVec::new();
        renderers.push(renderer);
        Self {
            renderer: RendererChoice::Fixed(renderer),
            renderers,
            taps: AHashMap::new(),
            events: AHashMap::new(),
        }
    }

    /// The renderer is chosen per model by `selector`.
    ///
    /// Every renderer the selector can return must be added with
    /// [`register`](Self::register); dequeuing a row whose renderer was never
    /// registered is a fatal configuration error.
    #[must_use]
    pub fn select(selector: impl Fn(&R) -> RendererId + 'static) -> Self {
        Self {
            renderer: RendererChoice::Select(Rc::new(selector)),
            renderers: SmallVec::new(),
            taps: AHashMap::new(),
            events: AHashMap::new(),
        }
    }

    /// Register a renderer this binding may produce.
    #[must_use]
    pub fn register(mut self, renderer: RendererId) -> Self {
        if !self.renderers.contains(&renderer) {
            self.renderers.push(renderer);
        }
        self
    }

    /// Handle taps on rows drawn by `renderer`. Replaces any previous handler.
    #[must_use]
    pub fn on_tap(mut self, renderer: RendererId, handler: impl Fn(IndexPath, &R) + 'static) -> Self {
        self.taps.insert(renderer, Rc::new(handler));
        self
    }

    /// Handle custom events from rows drawn by `renderer`. Replaces any
    /// previous handler.
    #[must_use]
    pub fn on_event(
        mut self,
        renderer: RendererId,
        handler: impl Fn(IndexPath, &R, &E) + 'static,
    ) -> Self {
        self.events.insert(renderer, Rc::new(handler));
        self
    }

    /// The renderer responsible for `model`.
    #[must_use]
    pub fn renderer_for(&self, model: &R) -> RendererId {
        match &self.renderer {
            RendererChoice::Fixed(renderer) => *renderer,
            RendererChoice::Select(selector) => selector(model),
        }
    }

    #[must_use]
    pub fn is_registered(&self, renderer: RendererId) -> bool {
        self.renderers.contains(&renderer)
    }

    /// Registered renderers in registration order.
    #[must_use]
    pub fn renderers(&self) -> &[RendererId] {
        &self.renderers
    }

    /// Invoke the tap handler for `renderer`. Returns whether one ran.
    pub fn dispatch_tap(&self, renderer: RendererId, path: IndexPath, model: &R) -> bool {
        match self.taps.get(&renderer) {
            Some(handler) => {
                handler(path, model);
                true
            }
            None => false,
        }
    }

    /// Invoke the custom-event handler for `renderer`. Returns whether one ran.
    pub fn dispatch_event(&self, renderer: RendererId, path: IndexPath, model: &R, event: &E) -> bool {
        match self.events.get(&renderer) {
            Some(handler) => {
                handler(path, model, event);
                true
            }
            None => false,
        }
    }
}

impl<R, E> fmt::Debug for RowBinding<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let choice = match &self.renderer {
            RendererChoice::Fixed(renderer) => renderer.name(),
            RendererChoice::Select(_) => "<selector>",
        };
        f.debug_struct("RowBinding")
            .field("renderer", &choice)
            .field("renderers", &self.renderers)
            .field("tap_handlers", &self.taps.len())
            .field("event_handlers", &self.events.len())
            .finish()
    }
}

struct SectionBinding<R, E> {
    source: ModelSource<Vec<R>>,
    rows: RowBinding<R, E>,
}

struct WildcardBinding<R, E> {
    source: ModelSource<Vec<(Identity, Vec<R>)>>,
    rows: RowBinding<R, E>,
}

/// Setup-time record of sections, row sources, renderers, and handlers.
pub struct Registry<S, R, E = ()> {
    sections: ModelSource<Vec<S>>,
    specific: AHashMap<Identity, SectionBinding<R, E>>,
    wildcard: Option<WildcardBinding<R, E>>,
    headers: Option<Supplier<S>>,
    footers: Option<Supplier<S>>,
    comparator: Option<Comparator<S>>,
    frozen: bool,
}

impl<S: Identifiable + 'static, R: Identifiable + 'static, E> Registry<S, R, E> {
    /// A registry whose sections come from `sections`, in that order.
    #[must_use]
    pub fn new(sections: ModelSource<Vec<S>>) -> Self {
        Self {
            sections,
            specific: AHashMap::new(),
            wildcard: None,
            headers: None,
            footers: None,
            comparator: None,
            frozen: false,
        }
    }

    /// Bind the rows of one section.
    ///
    /// `SectionKey::All` is rejected here; use [`bind_all`](Self::bind_all),
    /// whose source supplies rows per section identity.
    ///
    /// # Panics
    ///
    /// Panics if the registry is frozen or `section` is `SectionKey::All`.
    pub fn bind(&mut self, section: SectionKey, source: ModelSource<Vec<R>>, rows: RowBinding<R, E>) -> &mut Self {
        self.assert_mutable("bind");
        let SectionKey::Section(id) = section else {
            panic!("rowkit: bind(SectionKey::All, ..) is not supported; use bind_all");
        };
        if self.specific.insert(id.clone(), SectionBinding { source, rows }).is_some() {
            tracing::debug!(section = %id, "section rebound; previous binding replaced");
        }
        self
    }

    /// Bind rows for every section without a specific binding.
    ///
    /// # Panics
    ///
    /// Panics if the registry is frozen.
    pub fn bind_all(
        &mut self,
        source: ModelSource<Vec<(Identity, Vec<R>)>>,
        rows: RowBinding<R, E>,
    ) -> &mut Self {
        self.assert_mutable("bind_all");
        self.wildcard = Some(WildcardBinding { source, rows });
        self
    }

    /// Header provider for every section.
    ///
    /// # Panics
    ///
    /// Panics if the registry is frozen.
    pub fn headers(&mut self, provider: impl Fn(&S) -> Option<Supplementary> + 'static) -> &mut Self {
        self.assert_mutable("headers");
        self.headers = Some(Rc::new(provider));
        self
    }

    /// Footer provider for every section.
    ///
    /// # Panics
    ///
    /// Panics if the registry is frozen.
    pub fn footers(&mut self, provider: impl Fn(&S) -> Option<Supplementary> + 'static) -> &mut Self {
        self.assert_mutable("footers");
        self.footers = Some(Rc::new(provider));
        self
    }

    /// Section comparator used by [`EmptySectionPolicy::HideAndSort`].
    ///
    /// # Panics
    ///
    /// Panics if the registry is frozen.
    pub fn sort_sections_by(&mut self, compare: impl Fn(&S, &S) -> Ordering + 'static) -> &mut Self {
        self.assert_mutable("sort_sections_by");
        self.comparator = Some(Rc::new(compare));
        self
    }

    /// Check the registry against `policy` and make it read-only.
    ///
    /// # Panics
    ///
    /// Panics if `policy` sorts sections and no comparator was set.
    pub fn freeze(&mut self, policy: EmptySectionPolicy) {
        assert!(
            !policy.sorts() || self.comparator.is_some(),
            "rowkit: EmptySectionPolicy::HideAndSort requires sort_sections_by"
        );
        self.frozen = true;
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether `section` has a specific binding.
    #[must_use]
    pub fn is_bound(&self, section: &Identity) -> bool {
        self.specific.contains_key(section)
    }

    /// The row binding responsible for `section`: its specific binding, or
    /// the wildcard.
    #[must_use]
    pub fn row_binding(&self, section: &Identity) -> Option<&RowBinding<R, E>> {
        self.specific
            .get(section)
            .map(|b| &b.rows)
            .or_else(|| self.wildcard.as_ref().map(|w| &w.rows))
    }

    /// Pull every source once and assemble the next snapshot.
    #[must_use]
    pub fn build_snapshot(&self, policy: EmptySectionPolicy) -> Snapshot<S, R> {
        let mut wildcard_rows: AHashMap<Identity, Vec<R>> = AHashMap::new();
        if let Some(wildcard) = &self.wildcard {
            for (id, rows) in wildcard.source.get() {
                if self.specific.contains_key(&id) {
                    tracing::debug!(section = %id, "wildcard rows ignored for specifically bound section");
                    continue;
                }
                if wildcard_rows.insert(id.clone(), rows).is_some() {
                    tracing::debug!(section = %id, "wildcard source repeated a section; later rows win");
                }
            }
        }

        // Repeated section identities: the later model wins at its own
        // position, and its row source is pulled once.
        let models = self.sections.get();
        let mut last: AHashMap<Identity, usize> = AHashMap::with_capacity(models.len());
        for (index, model) in models.iter().enumerate() {
            let id = model.identity();
            if last.insert(id.clone(), index).is_some() {
                tracing::warn!(section = %id, "section source repeated a section; later model wins");
            }
        }

        let mut sections: Vec<Section<S, R>> = Vec::with_capacity(last.len());
        for (index, model) in models.into_iter().enumerate() {
            let id = model.identity();
            if last.get(&id) != Some(&index) {
                continue;
            }
            let (models, binding) = match self.specific.get(&id) {
                Some(bound) => (bound.source.get(), Some(&bound.rows)),
                None => (
                    wildcard_rows.remove(&id).unwrap_or_default(),
                    self.wildcard.as_ref().map(|w| &w.rows),
                ),
            };
            let rows = match binding {
                Some(binding) => models
                    .into_iter()
                    .map(|row| {
                        let renderer = binding.renderer_for(&row);
                        Row::new(row.identity(), row, renderer)
                    })
                    .collect(),
                None => Vec::new(),
            };

            let mut section = Section::new(id, model).with_rows(rows);
            if let Some(header) = self.headers.as_ref().and_then(|f| f(section.model())) {
                section = section.with_header(header);
            }
            if let Some(footer) = self.footers.as_ref().and_then(|f| f(section.model())) {
                section = section.with_footer(footer);
            }
            sections.push(section);
        }

        for id in wildcard_rows.keys() {
            tracing::debug!(section = %id, "wildcard rows ignored for unknown section");
        }

        if policy.hides_empty() {
            sections.retain(|s| !s.is_empty());
        }
        if policy.sorts() {
            if let Some(compare) = &self.comparator {
                sections.sort_by(|a, b| compare(a.model(), b.model()));
            }
        }

        Snapshot::from_sections(sections)
    }

    fn assert_mutable(&self, op: &str) {
        assert!(
            !self.frozen,
            "rowkit: registry is frozen after finish(); {op} must be called during setup"
        );
    }
}

impl<S, R, E> fmt::Debug for Registry<S, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("specific", &self.specific.len())
            .field("wildcard", &self.wildcard.is_some())
            .field("headers", &self.headers.is_some())
            .field("footers", &self.footers.is_some())
            .field("comparator", &self.comparator.is_some())
            .field("frozen", &self.frozen)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    use crate::reactive::Observable;

    const CELL: RendererId = RendererId::new("cell");
    const AD: RendererId = RendererId::new("ad");

    fn ids(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| (*s).to_string()).collect()
    }

    fn layout(snap: &Snapshot<String, String>) -> String {
        snap.structure()
            .iter()
            .map(|(s, rows)| {
                let rows: Vec<&str> = rows.iter().map(Identity::as_str).collect();
                format!("{s}[{}]", rows.join(","))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn specific_binding_beats_wildcard() {
        let mut registry: Registry<String, String> =
            Registry::new(ModelSource::constant(ids(&["news", "ads"])));
        registry.bind(
            SectionKey::section("news"),
            ModelSource::constant(ids(&["n1", "n2"])),
            RowBinding::new(CELL),
        );
        registry.bind_all(
            ModelSource::constant(vec![
                (Identity::new("news"), ids(&["w1"])),
                (Identity::new("ads"), ids(&["a1"])),
            ]),
            RowBinding::new(AD),
        );

        let snap = registry.build_snapshot(EmptySectionPolicy::Show);
        assert_eq!(layout(&snap), "news[n1,n2] ads[a1]");
        assert_eq!(snap.row(IndexPath::new(0, 0)).unwrap().renderer(), CELL);
        assert_eq!(snap.row(IndexPath::new(1, 0)).unwrap().renderer(), AD);
        assert_eq!(
            registry.row_binding(&Identity::new("news")).unwrap().renderers(),
            &[CELL]
        );
    }

    #[test]
    fn selector_chooses_renderer_per_model() {
        let binding: RowBinding<String> =
            RowBinding::select(|m: &String| if m.starts_with("ad") { AD } else { CELL })
                .register(CELL)
                .register(AD);
        assert_eq!(binding.renderer_for(&"ad-1".to_string()), AD);
        assert_eq!(binding.renderer_for(&"post".to_string()), CELL);
        assert!(binding.is_registered(AD));
    }

    #[test]
    fn sources_are_pulled_once_per_build() {
        let pulls = Rc::new(Cell::new(0));
        let p = Rc::clone(&pulls);
        let mut registry: Registry<String, String> =
            Registry::new(ModelSource::constant(ids(&["a", "b"])));
        registry.bind_all(
            ModelSource::new(move || {
                p.set(p.get() + 1);
                vec![(Identity::new("a"), ids(&["x"])), (Identity::new("b"), ids(&["y"]))]
            }),
            RowBinding::new(CELL),
        );
        let _ = registry.build_snapshot(EmptySectionPolicy::Show);
        assert_eq!(pulls.get(), 1);
    }

    #[test]
    fn repeated_section_pulls_its_rows_once() {
        let pulls = Rc::new(Cell::new(0));
        let p = Rc::clone(&pulls);
        let mut registry: Registry<String, String> =
            Registry::new(ModelSource::constant(ids(&["s", "a", "s"])));
        registry.bind(
            SectionKey::section("s"),
            ModelSource::new(move || {
                p.set(p.get() + 1);
                ids(&["r1"])
            }),
            RowBinding::new(CELL),
        );
        registry.bind(SectionKey::section("a"), ModelSource::constant(ids(&["r2"])), RowBinding::new(CELL));

        let snap = registry.build_snapshot(EmptySectionPolicy::Show);
        assert_eq!(pulls.get(), 1);
        assert_eq!(layout(&snap), "a[r2] s[r1]");
        assert_eq!(snap.collisions(), 0);
    }

    #[test]
    fn observable_sources_track_changes() {
        let rows = Observable::new(ids(&["r1"]));
        let mut registry: Registry<String, String> =
            Registry::new(ModelSource::constant(ids(&["s"])));
        registry.bind(SectionKey::section("s"), ModelSource::from_observable(&rows), RowBinding::new(CELL));
        assert_eq!(layout(&registry.build_snapshot(EmptySectionPolicy::Show)), "s[r1]");
        rows.set(ids(&["r2", "r1"]));
        assert_eq!(layout(&registry.build_snapshot(EmptySectionPolicy::Show)), "s[r2,r1]");
    }

    #[test]
    fn empty_section_policies() {
        let mut registry: Registry<String, String> =
            Registry::new(ModelSource::constant(ids(&["c", "empty", "a"])));
        registry.bind_all(
            ModelSource::constant(vec![
                (Identity::new("c"), ids(&["c1"])),
                (Identity::new("a"), ids(&["a1"])),
            ]),
            RowBinding::new(CELL),
        );
        registry.sort_sections_by(|x: &String, y: &String| x.cmp(y));

        assert_eq!(
            layout(&registry.build_snapshot(EmptySectionPolicy::Show)),
            "c[c1] empty[] a[a1]"
        );
        assert_eq!(
            layout(&registry.build_snapshot(EmptySectionPolicy::Hide)),
            "c[c1] a[a1]"
        );
        assert_eq!(
            layout(&registry.build_snapshot(EmptySectionPolicy::HideAndSort)),
            "a[a1] c[c1]"
        );
    }

    #[test]
    fn headers_and_footers_from_providers() {
        let mut registry: Registry<String, String> =
            Registry::new(ModelSource::constant(ids(&["inbox", "archive"])));
        registry
            .headers(|s: &String| Some(Supplementary::title(s.to_uppercase())))
            .footers(|s: &String| (s == "archive").then(|| Supplementary::title("old")));
        let snap = registry.build_snapshot(EmptySectionPolicy::Show);
        assert_eq!(snap.sections()[0].header().and_then(Supplementary::text), Some("INBOX"));
        assert!(snap.sections()[0].footer().is_none());
        assert_eq!(snap.sections()[1].footer().and_then(Supplementary::text), Some("old"));
    }

    #[test]
    fn handlers_keyed_by_renderer() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s1 = Rc::clone(&seen);
        let s2 = Rc::clone(&seen);
        let binding: RowBinding<String, u8> = RowBinding::new(CELL)
            .on_tap(CELL, move |path, m| s1.borrow_mut().push(format!("tap {path} {m}")))
            .on_event(CELL, move |_, m, e| s2.borrow_mut().push(format!("event {m} {e}")));

        let model = "r".to_string();
        assert!(binding.dispatch_tap(CELL, IndexPath::new(0, 1), &model));
        assert!(binding.dispatch_event(CELL, IndexPath::new(0, 1), &model, &9));
        assert!(!binding.dispatch_tap(AD, IndexPath::new(0, 1), &model));
        assert_eq!(*seen.borrow(), vec!["tap [0, 1] r", "event r 9"]);
    }

    #[test]
    #[should_panic(expected = "requires sort_sections_by")]
    fn hide_and_sort_without_comparator_panics() {
        let mut registry: Registry<String, String> = Registry::new(ModelSource::constant(Vec::new()));
        registry.freeze(EmptySectionPolicy::HideAndSort);
    }

    #[test]
    #[should_panic(expected = "registry is frozen")]
    fn frozen_registry_rejects_bind() {
        let mut registry: Registry<String, String> = Registry::new(ModelSource::constant(Vec::new()));
        registry.freeze(EmptySectionPolicy::Show);
        registry.bind(SectionKey::section("s"), ModelSource::constant(Vec::new()), RowBinding::new(CELL));
    }
}
