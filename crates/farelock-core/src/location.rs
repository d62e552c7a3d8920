//! # Locations
//!
//! Pickup and destination records. The core never interprets them: they are
//! stored and echoed back verbatim. Coordinates are fixed-point micro-degrees
//! so that location-bearing events stay float-free under canonicalization.

use serde::{Deserialize, Serialize};

/// An opaque geographic point with a free-text label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in millionths of a degree.
    pub latitude_e6: i64,
    /// Longitude in millionths of a degree.
    pub longitude_e6: i64,
    /// Human-readable label (address, landmark). Not validated.
    pub label: String,
}

impl Location {
    /// Build a location from micro-degree coordinates and a label.
    pub fn new(latitude_e6: i64, longitude_e6: i64, label: impl Into<String>) -> Self {
        Self {
            latitude_e6,
            longitude_e6,
            label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_coordinates_pass_through() {
        let loc = Location::new(999_000_000, -999_000_000, "");
        let json = serde_json::to_string(&loc).unwrap();
        let back: Location = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loc);
    }
}
