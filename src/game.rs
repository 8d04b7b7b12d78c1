use crate::data::model::Record;

/// Mean Earth radius used for great-circle distances.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// "Guess where this earthquake happened": a hidden target location and the
/// player's current latitude/longitude guess.
#[derive(Debug, Clone, PartialEq)]
pub struct GuessGame {
    pub target_title: String,
    target: (f64, f64),
    guess: (f64, f64),
}

impl GuessGame {
    pub fn new(target: &Record) -> Self {
        Self {
            target_title: target.title.clone(),
            target: (target.latitude, target.longitude),
            guess: (0.0, 0.0),
        }
    }

    pub fn target(&self) -> (f64, f64) {
        self.target
    }

    pub fn guess(&self) -> (f64, f64) {
        self.guess
    }

    /// Move the guess, clamped to valid coordinates.
    pub fn set_guess(&mut self, latitude: f64, longitude: f64) {
        self.guess = (latitude.clamp(-90.0, 90.0), longitude.clamp(-180.0, 180.0));
    }

    /// Straight-line distance in degrees on the lat/lon plane.
    pub fn distance_degrees(&self) -> f64 {
        let (dlat, dlon) = (self.guess.0 - self.target.0, self.guess.1 - self.target.1);
        (dlat * dlat + dlon * dlon).sqrt()
    }

    /// Haversine distance in kilometres.
    pub fn distance_km(&self) -> f64 {
        let (lat1, lon1) = (self.guess.0.to_radians(), self.guess.1.to_radians());
        let (lat2, lon2) = (self.target.0.to_radians(), self.target.1.to_radians());
        let a = ((lat2 - lat1) / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * ((lon2 - lon1) / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}
