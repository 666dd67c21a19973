// Per-type rendering layers and the surface they draw on

mod reconciler;
mod style;
mod surface;


pub use reconciler::{LayerSet, LayerState, ReconcileSummary};
pub use style::{
    escape_html, glyph, marker_fill, popup_html, status_color, temperature_color, type_color,
    TEMPERATURE_TYPES,
};
pub use surface::{LayerId, MapSurface, MarkerIcon, MemorySurface, Shape, ViewChange};
