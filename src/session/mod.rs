// Map session: owns layer state, viewport, time window and type selection


use crate::config::MapConfig;
use crate::entity::Entity;
use crate::geometry::Position;
use crate::layers::{LayerSet, MapSurface, MemorySurface, ReconcileSummary};
use crate::transform::{EntityTransformer, FeatureCollection};
use crate::view::{GeolocationError, Geolocator, ViewController, ViewState};
use crate::window::{self, TimeWindow};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{info, warn};

/// Which entity types the user wants to see.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TypeSelection {
    #[default]
    All,
    Only(String),
}

impl TypeSelection {
    /// `"all"` (any case) or an empty string selects every type.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("all") {
            TypeSelection::All
        } else {
            TypeSelection::Only(text.to_string())
        }
    }

    /// Types to fetch and show: every known type, or the chosen one when
    /// it is known.
    pub fn active_types(&self, known: &BTreeSet<String>) -> BTreeSet<String> {
        match self {
            TypeSelection::All => known.clone(),
            TypeSelection::Only(t) if known.contains(t) => BTreeSet::from([t.clone()]),
            TypeSelection::Only(_) => BTreeSet::new(),
        }
    }
}

impl fmt::Display for TypeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSelection::All => write!(f, "all"),
            TypeSelection::Only(t) => write!(f, "{}", t),
        }
    }
}

/// Observable state of the data pipeline for the UI.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    /// No cycle has completed yet
    Loading,
    /// Last cycle applied; `features` is the count after time filtering
    Ready { features: usize },
    /// Last fetch failed; the previously rendered data stays on the map
    FetchFailed { message: String },
    /// The broker advertises no entity types
    NoTypes,
}

/// Whether the type catalogue has been loaded from the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Catalogue {
    Unknown,
    Loaded,
    Failed,
}

/// One map view and everything it keeps across fetch cycles.
///
/// The session is the only writer of its layer set and viewport; every
/// mutation happens synchronously inside one of its methods.
pub struct MapSession<S: MapSurface = MemorySurface> {
    surface: S,
    layers: LayerSet,
    view: ViewController,
    transformer: EntityTransformer,
    window: Option<TimeWindow>,
    known_types: BTreeSet<String>,
    catalogue: Catalogue,
    selection: TypeSelection,
    last: FeatureCollection,
    status: SessionStatus,
}

impl<S: MapSurface> MapSession<S> {
    pub fn new(config: &MapConfig, mut surface: S) -> Self {
        let view = ViewController::new(config.view.clone(), &mut surface);
        Self {
            surface,
            layers: LayerSet::new(),
            view,
            transformer: EntityTransformer::new(config.transform.rules()),
            window: None,
            known_types: BTreeSet::new(),
            catalogue: Catalogue::Unknown,
            selection: TypeSelection::All,
            last: FeatureCollection::default(),
            status: SessionStatus::Loading,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct access for user interaction on the surface (layer toggles).
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn layers(&self) -> &LayerSet {
        &self.layers
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn view_state(&self) -> ViewState {
        self.view.state()
    }

    pub fn known_types(&self) -> &BTreeSet<String> {
        &self.known_types
    }

    pub fn selection(&self) -> &TypeSelection {
        &self.selection
    }

    pub fn time_window(&self) -> Option<&TimeWindow> {
        self.window.as_ref()
    }

    /// Last unfiltered collection.
    pub fn features(&self) -> &FeatureCollection {
        &self.last
    }

    pub fn active_types(&self) -> BTreeSet<String> {
        self.selection.active_types(&self.known_types)
    }

    /// True until a catalogue fetch has succeeded, and again after one
    /// fails.
    pub fn needs_catalogue(&self) -> bool {
        self.catalogue != Catalogue::Loaded
    }

    /// Replace the type catalogue. Returns the resulting active types.
    pub fn set_known_types<I>(&mut self, types: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = String>,
    {
        self.known_types = types.into_iter().filter(|t| !t.is_empty()).collect();
        let recovering = self.catalogue == Catalogue::Failed;
        self.catalogue = Catalogue::Loaded;
        if self.known_types.is_empty() {
            warn!("Broker advertises no entity types");
            self.status = SessionStatus::NoTypes;
        } else if self.status == SessionStatus::NoTypes
            || (recovering && matches!(self.status, SessionStatus::FetchFailed { .. }))
        {
            self.status = SessionStatus::Loading;
        }

        let active = self.active_types();
        self.layers.apply_selection(&mut self.surface, &active);
        info!(
            known = self.known_types.len(),
            active = active.len(),
            "Updated type catalogue"
        );
        active
    }

    /// Change the type selection. Returns the resulting active types.
    pub fn set_selection(&mut self, selection: TypeSelection) -> BTreeSet<String> {
        self.selection = selection;
        let active = self.active_types();
        self.layers.apply_selection(&mut self.surface, &active);
        info!(selection = %self.selection, active = active.len(), "Changed type selection");
        active
    }

    /// Apply one completed fetch: transform, filter, reconcile, then let the
    /// view react.
    pub fn apply_entities(&mut self, entities: &[Entity]) -> ReconcileSummary {
        self.last = self.transformer.transform(entities);
        let (summary, visible) = self.render();
        if !self.known_types.is_empty() {
            self.status = SessionStatus::Ready { features: visible };
        } else if self.catalogue == Catalogue::Loaded {
            self.status = SessionStatus::NoTypes;
        }
        info!(
            features = self.last.len(),
            visible,
            created = summary.created.len(),
            removed = summary.removed.len(),
            "Applied fetch cycle"
        );
        summary
    }

    /// Record a failed fetch. Nothing already rendered is touched.
    pub fn apply_fetch_error(&mut self, error: impl fmt::Display) {
        let message = error.to_string();
        warn!(error = %message, "Fetch cycle failed");
        self.status = SessionStatus::FetchFailed { message };
    }

    /// Record a failed catalogue fetch. The known types are kept and the
    /// failure stays visible until a catalogue fetch succeeds or a cycle
    /// renders data.
    pub fn apply_catalogue_error(&mut self, error: impl fmt::Display) {
        let message = error.to_string();
        warn!(error = %message, "Type catalogue fetch failed");
        self.catalogue = Catalogue::Failed;
        self.status = SessionStatus::FetchFailed { message };
    }

    /// Narrow the display to `window` without fetching again.
    pub fn set_time_window(&mut self, window: TimeWindow) -> ReconcileSummary {
        self.window = Some(window);
        self.refilter()
    }

    pub fn clear_time_window(&mut self) -> ReconcileSummary {
        self.window = None;
        self.refilter()
    }

    /// Span of observation timestamps in the last collection.
    pub fn observed_range(&self) -> Option<TimeWindow> {
        window::observed_range(&self.last)
    }

    pub async fn establish_initial_view<G>(&mut self, geolocator: &G) -> ViewState
    where
        G: Geolocator + ?Sized,
    {
        self.view
            .establish_initial_view(geolocator, &self.layers, &mut self.surface)
            .await
    }

    pub fn on_location(&mut self, fix: Result<Position, GeolocationError>) -> ViewState {
        self.view.on_location(fix, &self.layers, &mut self.surface)
    }

    pub fn recenter(&mut self) -> bool {
        self.view.recenter(&self.layers, &mut self.surface)
    }

    fn refilter(&mut self) -> ReconcileSummary {
        let (summary, visible) = self.render();
        if let SessionStatus::Ready { features } = &mut self.status {
            *features = visible;
        }
        summary
    }

    /// Filter the last collection and reconcile it. Returns the summary and
    /// the number of features that passed the window.
    fn render(&mut self) -> (ReconcileSummary, usize) {
        let visible = window::filter(&self.last, self.window.as_ref());
        let summary = self
            .layers
            .reconcile(&mut self.surface, &self.known_types, &visible);
        self.view.on_cycle(&self.layers, &mut self.surface);
        (summary, visible.len())
    }
}
