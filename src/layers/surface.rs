use crate::geometry::{Bounds, Position};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Opaque handle for one rendering layer on the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LayerId(pub u64);

/// Marker appearance: a short type glyph on a coloured pin.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MarkerIcon {
    pub glyph: String,
    /// Outline colour (type colour)
    pub stroke: String,
    /// Body colour (status / value rule, else type colour)
    pub fill: String,
}

/// One drawable shape owned by a layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    Marker {
        feature_id: String,
        at: Position,
        icon: Arc<MarkerIcon>,
        popup: String,
    },
    Polyline {
        feature_id: String,
        path: Vec<Position>,
        color: String,
        popup: String,
    },
}

impl Shape {
    pub fn positions(&self) -> &[Position] {
        match self {
            Shape::Marker { at, .. } => std::slice::from_ref(at),
            Shape::Polyline { path, .. } => path,
        }
    }
}

/// Capabilities the reconciler and view controller need from a map widget.
///
/// Implementations own the actual drawing; attachment state is the widget's
/// own (a user toggling an overlay in the layer control detaches it there).
pub trait MapSurface {
    fn attach_layer(&mut self, layer: LayerId);
    fn detach_layer(&mut self, layer: LayerId);
    fn is_attached(&self, layer: LayerId) -> bool;

    /// Register a layer with the type-visibility control under `name`.
    fn register_overlay(&mut self, layer: LayerId, name: &str);
    fn unregister_overlay(&mut self, layer: LayerId);

    fn clear_shapes(&mut self, layer: LayerId);
    fn add_shape(&mut self, layer: LayerId, shape: &Shape);

    fn set_view(&mut self, center: Position, zoom: u8);
    fn fit_bounds(&mut self, bounds: Bounds);
    fn show_user_location(&mut self, at: Position);
}

/// Viewport changes recorded by [`MemorySurface`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ViewChange {
    SetView { center: Position, zoom: u8 },
    FitBounds(Bounds),
}

/// Headless surface that keeps everything in memory.
///
/// Used by the poller binary and by tests; `toggle_overlay` stands in for a
/// user clicking a type in the layer control.
#[derive(Debug, Default)]
pub struct MemorySurface {
    attached: BTreeSet<LayerId>,
    overlays: BTreeMap<LayerId, String>,
    shapes: BTreeMap<LayerId, Vec<Shape>>,
    view_changes: Vec<ViewChange>,
    user_location: Option<Position>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// User toggle from the layer control.
    pub fn toggle_overlay(&mut self, layer: LayerId, visible: bool) {
        if !self.overlays.contains_key(&layer) {
            return;
        }
        if visible {
            self.attached.insert(layer);
        } else {
            self.attached.remove(&layer);
        }
    }

    pub fn overlay_names(&self) -> Vec<&str> {
        self.overlays.values().map(String::as_str).collect()
    }

    pub fn overlay_id(&self, name: &str) -> Option<LayerId> {
        self.overlays
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
    }

    pub fn shapes(&self, layer: LayerId) -> &[Shape] {
        self.shapes.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn attached_layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.attached.iter().copied()
    }

    pub fn view_changes(&self) -> &[ViewChange] {
        &self.view_changes
    }

    pub fn fit_count(&self) -> usize {
        self.view_changes
            .iter()
            .filter(|c| matches!(c, ViewChange::FitBounds(_)))
            .count()
    }

    pub fn user_location(&self) -> Option<Position> {
        self.user_location
    }
}

impl MapSurface for MemorySurface {
    fn attach_layer(&mut self, layer: LayerId) {
        self.attached.insert(layer);
    }

    fn detach_layer(&mut self, layer: LayerId) {
        self.attached.remove(&layer);
    }

    fn is_attached(&self, layer: LayerId) -> bool {
        self.attached.contains(&layer)
    }

    fn register_overlay(&mut self, layer: LayerId, name: &str) {
        self.overlays.insert(layer, name.to_string());
    }

    fn unregister_overlay(&mut self, layer: LayerId) {
        self.overlays.remove(&layer);
        self.shapes.remove(&layer);
    }

    fn clear_shapes(&mut self, layer: LayerId) {
        if let Some(shapes) = self.shapes.get_mut(&layer) {
            shapes.clear();
        }
    }

    fn add_shape(&mut self, layer: LayerId, shape: &Shape) {
        self.shapes.entry(layer).or_default().push(shape.clone());
    }

    fn set_view(&mut self, center: Position, zoom: u8) {
        debug!(lat = center.lat, lon = center.lon, zoom, "Set view");
        self.view_changes.push(ViewChange::SetView { center, zoom });
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        debug!(?bounds, "Fit bounds");
        self.view_changes.push(ViewChange::FitBounds(bounds));
    }

    fn show_user_location(&mut self, at: Position) {
        self.user_location = Some(at);
    }
}
