// Entity record model and Property shape checks
pub mod entity;

// Geometry model, validation and bounds
pub mod geometry;

// Entity → feature normalization
pub mod transform;

// Observation time window
pub mod window;

// Per-type map layers and rendering
pub mod layers;

// Viewport control
pub mod view;

// Pipeline hub tying layers, view and filters together
pub mod session;

// Configuration
pub mod config;

pub use config::{load_config, resolve_config, MapConfig};
pub use entity::{Entity, MalformedEntity};
pub use geometry::{Bounds, Geometry, Position};
pub use layers::{LayerSet, MapSurface, MemorySurface};
pub use session::{MapSession, SessionStatus, TypeSelection};
pub use transform::{transform, EntityTransformer, Feature, FeatureCollection};
pub use view::{GeolocationError, Geolocator, ViewController, ViewState};
pub use window::TimeWindow;
