//! # Rating Ledger
//!
//! One record per ride, created lazily on the first submission. Each
//! direction (rider rates driver, driver rates rider) may be written once.
//! Rider→driver scores are forwarded to the driver registry by the engine;
//! driver→rider scores stay on the ride and are never aggregated.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use farelock_core::RideId;

/// Lowest accepted score.
pub const MIN_RATING: u8 = 1;
/// Highest accepted score.
pub const MAX_RATING: u8 = 5;

/// A score in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self, RatingError> {
        if (MIN_RATING..=MAX_RATING).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RatingError::InvalidRating(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> u8 {
        r.0
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who is rating whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatingDirection {
    RiderToDriver,
    DriverToRider,
}

impl std::fmt::Display for RatingDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::RiderToDriver => "rider-to-driver",
            Self::DriverToRider => "driver-to-rider",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    #[error("rating must be between {MIN_RATING} and {MAX_RATING}, got {0}")]
    InvalidRating(u8),

    #[error("{ride_id} already has a {direction} rating")]
    AlreadyRated {
        ride_id: RideId,
        direction: RatingDirection,
    },
}

/// The two ratings of one ride.
///
/// A score is present exactly when its direction has been rated, so the
/// "rated" flags are derived rather than stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingRecord {
    rider_rating: Option<Rating>,
    driver_rating: Option<Rating>,
}

impl RatingRecord {
    /// Whether the rider has rated the driver.
    pub fn rider_rated_driver(&self) -> bool {
        self.rider_rating.is_some()
    }

    /// Whether the driver has rated the rider.
    pub fn driver_rated_rider(&self) -> bool {
        self.driver_rating.is_some()
    }

    pub fn get(&self, direction: RatingDirection) -> Option<Rating> {
        match direction {
            RatingDirection::RiderToDriver => self.rider_rating,
            RatingDirection::DriverToRider => self.driver_rating,
        }
    }

    fn slot(&mut self, direction: RatingDirection) -> &mut Option<Rating> {
        match direction {
            RatingDirection::RiderToDriver => &mut self.rider_rating,
            RatingDirection::DriverToRider => &mut self.driver_rating,
        }
    }

    /// Flat read model: two flags and two scores, zero when unrated.
    pub fn snapshot(&self) -> RideRatingSnapshot {
        RideRatingSnapshot {
            rider_rated_driver: self.rider_rated_driver(),
            driver_rated_rider: self.driver_rated_rider(),
            rider_rating: self.rider_rating.map_or(0, |r| r.value()),
            driver_rating: self.driver_rating.map_or(0, |r| r.value()),
        }
    }
}

/// Serializable four-field view of a ride's ratings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideRatingSnapshot {
    pub rider_rated_driver: bool,
    pub driver_rated_rider: bool,
    /// Score the rider gave the driver.
    pub rider_rating: u8,
    /// Score the driver gave the rider.
    pub driver_rating: u8,
}

/// Per-ride rating records.
#[derive(Debug, Clone, Default)]
pub struct RatingLedger {
    records: HashMap<RideId, RatingRecord>,
}

impl RatingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a score for one direction. Fails if that direction was
    /// already rated; the record is untouched in that case.
    pub fn submit(
        &mut self,
        ride_id: RideId,
        direction: RatingDirection,
        rating: Rating,
    ) -> Result<(), RatingError> {
        if self.get(ride_id).get(direction).is_some() {
            return Err(RatingError::AlreadyRated { ride_id, direction });
        }
        *self.records.entry(ride_id).or_default().slot(direction) = Some(rating);
        Ok(())
    }

    /// The record for a ride, empty if nothing was submitted.
    pub fn get(&self, ride_id: RideId) -> RatingRecord {
        self.records.get(&ride_id).copied().unwrap_or_default()
    }

    /// Number of rides with at least one rating.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ride(n: u64) -> RideId {
        RideId::new(n).unwrap()
    }

    #[test]
    fn rating_range() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        for v in MIN_RATING..=MAX_RATING {
            assert_eq!(Rating::new(v).unwrap().value(), v);
        }
        assert_eq!(
            Rating::new(9).unwrap_err().to_string(),
            "rating must be between 1 and 5, got 9"
        );
    }

    #[test]
    fn empty_record_before_any_submission() {
        let ledger = RatingLedger::new();
        assert_eq!(ledger.get(ride(3)).snapshot(), RideRatingSnapshot::default());
        assert!(ledger.is_empty());
    }

    #[test]
    fn each_direction_is_write_once() {
        let mut ledger = RatingLedger::new();
        let four = Rating::new(4).unwrap();
        ledger.submit(ride(1), RatingDirection::RiderToDriver, four).unwrap();
        let err = ledger
            .submit(ride(1), RatingDirection::RiderToDriver, Rating::new(1).unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            RatingError::AlreadyRated {
                ride_id: ride(1),
                direction: RatingDirection::RiderToDriver,
            }
        );
        assert_eq!(ledger.get(ride(1)).get(RatingDirection::RiderToDriver), Some(four));

        ledger
            .submit(ride(1), RatingDirection::DriverToRider, Rating::new(2).unwrap())
            .unwrap();
        let snap = ledger.get(ride(1)).snapshot();
        assert_eq!(
            snap,
            RideRatingSnapshot {
                rider_rated_driver: true,
                driver_rated_rider: true,
                rider_rating: 4,
                driver_rating: 2,
            }
        );
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn rating_deserialization_validates() {
        assert!(serde_json::from_str::<Rating>("5").is_ok());
        assert!(serde_json::from_str::<Rating>("0").is_err());
    }
}
