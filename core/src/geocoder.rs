use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
	pub latitude: f64,
	pub longitude: f64,
}

impl Coordinate {
	pub fn new(latitude: f64, longitude: f64) -> Self {
		Self {
			latitude,
			longitude,
		}
	}
}

/// Human readable description of a place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placemark {
	pub name: Option<String>,
	pub locality: Option<String>,
}

/// Reverse geocoding. Implementations swallow their own failures: `None` just means the place
/// has no name we know of.
#[async_trait]
pub trait Geocoder: Send + Sync {
	async fn resolve(&self, coordinate: Coordinate) -> Option<Placemark>;
}

/// Never names anything; locations are recorded as bare coordinates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGeocoder;

#[async_trait]
impl Geocoder for NoopGeocoder {
	async fn resolve(&self, _coordinate: Coordinate) -> Option<Placemark> {
		None
	}
}
