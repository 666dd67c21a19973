use crate::geometry::Position;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Why no location fix is available. Expected, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationError {
    Unavailable,
    Denied,
    Timeout,
}

impl fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeolocationError::Unavailable => write!(f, "location unavailable"),
            GeolocationError::Denied => write!(f, "location permission denied"),
            GeolocationError::Timeout => write!(f, "location request timed out"),
        }
    }
}

impl std::error::Error for GeolocationError {}

/// Source of a one-off device location fix.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> Result<Position, GeolocationError>;
}

/// Always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Position);

#[async_trait]
impl Geolocator for FixedLocation {
    async fn locate(&self) -> Result<Position, GeolocationError> {
        Ok(self.0)
    }
}

/// No location source on this host.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait]
impl Geolocator for NoGeolocation {
    async fn locate(&self) -> Result<Position, GeolocationError> {
        Err(GeolocationError::Unavailable)
    }
}

/// Ask `geolocator` for a fix, giving up after `limit`.
pub async fn locate<G>(geolocator: &G, limit: Duration) -> Result<Position, GeolocationError>
where
    G: Geolocator + ?Sized,
{
    match tokio::time::timeout(limit, geolocator.locate()).await {
        Ok(fix) => fix,
        Err(_) => Err(GeolocationError::Timeout),
    }
}
