use super::style::{glyph, marker_fill, popup_html, type_color};
use super::surface::{LayerId, MapSurface, MarkerIcon, Shape};
use crate::geometry::{self, Bounds, Geometry};
use crate::transform::{Feature, FeatureCollection};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Rendering state for one entity type.
#[derive(Clone, Debug)]
pub struct LayerState {
    pub id: LayerId,
    pub entity_type: String,
    /// Stable colour derived from the type name
    pub color: String,
    /// Shapes currently rendered for this type
    pub shapes: Vec<Shape>,
    /// Detached because the type selection excludes it (not by the user)
    hidden_by_selection: bool,
}

impl LayerState {
    /// Bounds over the shapes' valid vertices.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_positions(
            self.shapes
                .iter()
                .flat_map(|s| s.positions())
                .filter(|p| geometry::is_valid_position(p)),
        )
    }
}

/// What one reconciliation pass changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconcileSummary {
    pub created: Vec<String>,
    pub removed: Vec<String>,
    pub rendered: usize,
}

/// Per-type layer map, carried across fetch cycles by its owner.
///
/// All mutation happens inside [`LayerSet::reconcile`] and
/// [`LayerSet::apply_selection`]; nothing else writes layer state.
#[derive(Debug, Default)]
pub struct LayerSet {
    layers: BTreeMap<String, LayerState>,
    icons: HashMap<MarkerIcon, Arc<MarkerIcon>>,
    selection: Option<BTreeSet<String>>,
    next_id: u64,
}

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, entity_type: &str) -> Option<&LayerState> {
        self.layers.get(entity_type)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerState> {
        self.layers.values()
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Number of distinct marker icons built so far.
    pub fn icon_count(&self) -> usize {
        self.icons.len()
    }

    /// Bring layers in line with one cycle's features.
    ///
    /// Layers whose type has no features this cycle and has left
    /// `known_types` are removed. Types with features but no layer get one,
    /// attached unless the current selection excludes them. Every remaining
    /// layer is cleared and refilled from its partition. Attachment of
    /// existing layers is left alone so user-hidden types stay hidden.
    pub fn reconcile<S>(
        &mut self,
        surface: &mut S,
        known_types: &BTreeSet<String>,
        features: &FeatureCollection,
    ) -> ReconcileSummary
    where
        S: MapSurface + ?Sized,
    {
        let partition = partition_by_type(features);
        let mut summary = ReconcileSummary::default();

        let stale: Vec<String> = self
            .layers
            .keys()
            .filter(|t| !partition.contains_key(t.as_str()) && !known_types.contains(*t))
            .cloned()
            .collect();
        for entity_type in stale {
            if let Some(layer) = self.layers.remove(&entity_type) {
                surface.detach_layer(layer.id);
                surface.unregister_overlay(layer.id);
                info!(entity_type = %entity_type, "Removed layer for vanished type");
                summary.removed.push(entity_type);
            }
        }

        for entity_type in partition.keys() {
            if self.layers.contains_key(*entity_type) {
                continue;
            }
            let layer = self.create_layer(surface, entity_type);
            self.layers.insert(entity_type.to_string(), layer);
            summary.created.push(entity_type.to_string());
        }

        for (entity_type, layer) in self.layers.iter_mut() {
            surface.clear_shapes(layer.id);
            layer.shapes.clear();

            let Some(type_features) = partition.get(entity_type.as_str()) else {
                continue;
            };
            for feature in type_features {
                let shape = render_feature(&mut self.icons, &layer.color, feature);
                surface.add_shape(layer.id, &shape);
                layer.shapes.push(shape);
            }
            summary.rendered += layer.shapes.len();
            debug!(
                entity_type = %entity_type,
                shapes = layer.shapes.len(),
                "Rendered layer"
            );
        }

        summary
    }

    /// Show only the layers of `active` types.
    ///
    /// Layers outside the selection are detached; layers a previous
    /// selection detached are re-attached once selected again. Layers the
    /// user hid through the layer control are not touched.
    pub fn apply_selection<S>(&mut self, surface: &mut S, active: &BTreeSet<String>)
    where
        S: MapSurface + ?Sized,
    {
        for (entity_type, layer) in self.layers.iter_mut() {
            if active.contains(entity_type) {
                if layer.hidden_by_selection {
                    surface.attach_layer(layer.id);
                    layer.hidden_by_selection = false;
                }
            } else if surface.is_attached(layer.id) {
                surface.detach_layer(layer.id);
                layer.hidden_by_selection = true;
            }
        }
        self.selection = Some(active.clone());
    }

    /// Union of bounds over layers currently attached to the surface.
    pub fn attached_bounds<S>(&self, surface: &S) -> Option<Bounds>
    where
        S: MapSurface + ?Sized,
    {
        self.layers
            .values()
            .filter(|l| surface.is_attached(l.id))
            .filter_map(LayerState::bounds)
            .filter(Bounds::is_valid)
            .reduce(Bounds::union)
    }

    fn create_layer<S>(&mut self, surface: &mut S, entity_type: &str) -> LayerState
    where
        S: MapSurface + ?Sized,
    {
        self.next_id += 1;
        let id = LayerId(self.next_id);
        let color = type_color(entity_type);

        surface.register_overlay(id, entity_type);
        let selected = self
            .selection
            .as_ref()
            .map_or(true, |active| active.contains(entity_type));
        if selected {
            surface.attach_layer(id);
        }

        info!(entity_type = %entity_type, layer = id.0, color = %color, "Created layer");

        LayerState {
            id,
            entity_type: entity_type.to_string(),
            color,
            shapes: Vec::new(),
            hidden_by_selection: !selected,
        }
    }
}

fn partition_by_type(features: &FeatureCollection) -> BTreeMap<&str, Vec<&Feature>> {
    let mut partition: BTreeMap<&str, Vec<&Feature>> = BTreeMap::new();
    for feature in features {
        partition
            .entry(feature.entity_type.as_str())
            .or_default()
            .push(feature);
    }
    partition
}

fn render_feature(
    icons: &mut HashMap<MarkerIcon, Arc<MarkerIcon>>,
    type_color: &str,
    feature: &Feature,
) -> Shape {
    let popup = popup_html(feature);
    match &feature.geometry {
        Geometry::Point(at) => {
            let key = MarkerIcon {
                glyph: glyph(&feature.entity_type),
                stroke: type_color.to_string(),
                fill: marker_fill(feature, type_color),
            };
            let icon = icons
                .entry(key.clone())
                .or_insert_with(|| Arc::new(key))
                .clone();
            Shape::Marker {
                feature_id: feature.id.clone(),
                at: *at,
                icon,
                popup,
            }
        }
        Geometry::LineString(path) => Shape::Polyline {
            feature_id: feature.id.clone(),
            path: path.clone(),
            color: type_color.to_string(),
            popup,
        },
    }
}
