//! Position fix and provider identity types.

use std::fmt;

/// Identifies the external tracking provider a fix came from.
///
/// One [`crate::state::Tracker`] slot exists per pilot per provider; the
/// fetch orchestrator dispatches on this id to pick the matching fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    /// Satellite-relayed tracker with several minutes of inherent latency.
    Flymaster,
    /// Flight-tracking web service returning delta-encoded polylines.
    Skylines,
}

impl ProviderId {
    /// All supported providers, in dispatch order.
    pub const ALL: [ProviderId; 2] = [ProviderId::Flymaster, ProviderId::Skylines];
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flymaster => write!(f, "flymaster"),
            Self::Skylines => write!(f, "skylines"),
        }
    }
}

/// One GPS sample, immutable once created.
///
/// Produced by a provider parser; latitude/longitude are degrees,
/// altitudes are meters, the timestamp is epoch milliseconds. Parsers
/// reject non-finite coordinates before a fix reaches a track.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    /// Provider that produced the sample.
    pub provider: ProviderId,

    /// Latitude in degrees (-90 to 90).
    pub lat: f64,

    /// Longitude in degrees (-180 to 180).
    pub lon: f64,

    /// Altitude MSL in meters.
    pub alt: f64,

    /// Ground elevation in meters, when the provider reports it.
    pub gnd_alt: Option<f64>,

    /// Ground speed in km/h, when the provider reports it.
    pub speed: Option<f64>,

    /// Sample time as epoch milliseconds.
    pub timestamp_ms: i64,
}

impl Fix {
    /// Sample time as epoch seconds (truncated).
    pub fn timestamp_sec(&self) -> i64 {
        self.timestamp_ms / 1000
    }

    /// True when both coordinates are finite numbers.
    pub fn has_valid_coordinates(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}
