// Viewport control: initial location fix, one-shot data fit, manual recenter

mod geolocation;


pub use geolocation::{locate, FixedLocation, GeolocationError, Geolocator, NoGeolocation};

use crate::config::ViewConfig;
use crate::geometry::{self, Position};
use crate::layers::{LayerSet, MapSurface};
use serde::Serialize;
use tracing::{debug, info};

/// Where the viewport stands in its automatic lifecycle.
///
/// `Fitted` is terminal for automatic fitting. Manual recenters are
/// available from every state and never change it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ViewState {
    /// Waiting for the initial location attempt to resolve
    Idle,
    /// Centred on the device location; data never moves the view
    Located,
    /// No location; the first cycle with bounds fits the view
    Unlocated,
    /// Automatic fit done
    Fitted,
}

#[derive(Debug)]
pub struct ViewController {
    state: ViewState,
    config: ViewConfig,
}

impl ViewController {
    /// Create the controller and apply the default viewport.
    pub fn new<S>(config: ViewConfig, surface: &mut S) -> Self
    where
        S: MapSurface + ?Sized,
    {
        surface.set_view(config.center(), config.default_zoom);
        Self {
            state: ViewState::Idle,
            config,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Resolve the initial location fix (bounded by the configured timeout)
    /// and apply it.
    pub async fn establish_initial_view<G, S>(
        &mut self,
        geolocator: &G,
        layers: &LayerSet,
        surface: &mut S,
    ) -> ViewState
    where
        G: Geolocator + ?Sized,
        S: MapSurface + ?Sized,
    {
        let fix = locate(geolocator, self.config.geolocation_timeout()).await;
        self.on_location(fix, layers, surface)
    }

    /// Apply the outcome of the initial location attempt.
    ///
    /// Only the first outcome counts; later ones are ignored. A failure
    /// leaves the view waiting for data, and fits at once when attached
    /// layers already have bounds.
    pub fn on_location<S>(
        &mut self,
        fix: Result<Position, GeolocationError>,
        layers: &LayerSet,
        surface: &mut S,
    ) -> ViewState
    where
        S: MapSurface + ?Sized,
    {
        if self.state != ViewState::Idle {
            debug!(state = ?self.state, "Location outcome after initial view, ignoring");
            return self.state;
        }

        match fix {
            Ok(position) if geometry::is_valid_position(&position) => {
                surface.set_view(position, self.config.default_zoom);
                surface.show_user_location(position);
                info!(lat = position.lat, lon = position.lon, "Centred on device location");
                self.state = ViewState::Located;
            }
            Ok(position) => {
                info!(lat = position.lat, lon = position.lon, "Discarding unusable location fix");
                self.become_unlocated(layers, surface);
            }
            Err(e) => {
                info!(reason = %e, "No device location, fitting to data");
                self.become_unlocated(layers, surface);
            }
        }
        self.state
    }

    /// Called after every reconciliation pass.
    ///
    /// Returns true when this call performed the one automatic fit.
    pub fn on_cycle<S>(&mut self, layers: &LayerSet, surface: &mut S) -> bool
    where
        S: MapSurface + ?Sized,
    {
        if self.state != ViewState::Unlocated {
            return false;
        }
        if self.fit(layers, surface) {
            info!("Fitted view to data");
            self.state = ViewState::Fitted;
            return true;
        }
        false
    }

    /// Fit the viewport to the union of attached layer bounds, padded.
    ///
    /// Returns false, without touching the viewport, when there are no
    /// valid bounds.
    pub fn fit<S>(&self, layers: &LayerSet, surface: &mut S) -> bool
    where
        S: MapSurface + ?Sized,
    {
        match layers.attached_bounds(surface) {
            Some(bounds) => {
                surface.fit_bounds(bounds.pad(self.config.fit_padding));
                true
            }
            None => {
                debug!("No bounds to fit");
                false
            }
        }
    }

    /// Explicit user recenter: fit now, whatever the state.
    pub fn recenter<S>(&self, layers: &LayerSet, surface: &mut S) -> bool
    where
        S: MapSurface + ?Sized,
    {
        self.fit(layers, surface)
    }

    fn become_unlocated<S>(&mut self, layers: &LayerSet, surface: &mut S)
    where
        S: MapSurface + ?Sized,
    {
        self.state = ViewState::Unlocated;
        self.on_cycle(layers, surface);
    }
}
