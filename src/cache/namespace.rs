//! Namespace Module
//!
//! Logical data sources the cache serves, and the default TTL each one gets.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::canonical_key;
use crate::error::{CacheError, Result};

// == Namespace ==
/// A logical data category, used as the key prefix of its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Review records for a location
    Reviews,
    /// Place details and nearby searches
    Place,
    /// Route calculations between points
    Directions,
    /// Geocoding results
    Geocode,
    /// Marketplace listing pages
    Listings,
}

impl Namespace {
    pub const ALL: [Namespace; 5] = [
        Namespace::Reviews,
        Namespace::Place,
        Namespace::Directions,
        Namespace::Geocode,
        Namespace::Listings,
    ];

    /// Prefix used when building keys for this namespace.
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Reviews => "reviews",
            Namespace::Place => "place",
            Namespace::Directions => "directions",
            Namespace::Geocode => "geocode",
            Namespace::Listings => "listings",
        }
    }

    /// Prefix shared by every key in this namespace, e.g. `"directions:"`.
    pub fn key_prefix(&self) -> String {
        format!("{}:", self.as_str())
    }

    /// Canonical key for `params` in this namespace.
    pub fn key<P>(&self, params: &P) -> Result<String>
    where
        P: Serialize + ?Sized,
    {
        canonical_key(self.as_str(), params)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        Namespace::ALL
            .into_iter()
            .find(|ns| ns.as_str() == s)
            .ok_or_else(|| CacheError::InvalidRequest(format!("Unknown namespace: {}", s)))
    }
}

// == TTL Policy ==
/// Default TTL per namespace, reflecting how quickly each kind of data goes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub reviews: Duration,
    pub place: Duration,
    pub directions: Duration,
    pub geocode: Duration,
    pub listings: Duration,
}

impl TtlPolicy {
    /// Returns the TTL configured for `namespace`.
    pub fn ttl_for(&self, namespace: Namespace) -> Duration {
        match namespace {
            Namespace::Reviews => self.reviews,
            Namespace::Place => self.place,
            Namespace::Directions => self.directions,
            Namespace::Geocode => self.geocode,
            Namespace::Listings => self.listings,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            reviews: Duration::from_secs(60 * 60),
            place: Duration::from_secs(24 * 60 * 60),
            directions: Duration::from_secs(15 * 60),
            geocode: Duration::from_secs(7 * 24 * 60 * 60),
            listings: Duration::from_secs(5 * 60),
        }
    }
}
