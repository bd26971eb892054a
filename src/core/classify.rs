//! Magnitude → color tier classification.
//!
//! The list and the map use different cut points, so each context gets its
//! own scale behind the shared [`MagnitudeClassifier`] interface instead of
//! one global table.

use serde::{Deserialize, Serialize};

/// A discrete visual-severity bucket. Rank 0 is the coolest tier of a scale.
pub trait ColorTier: Copy + Eq + Ord + std::fmt::Debug {
    fn rank(&self) -> u8;
    fn color(&self) -> &'static str;
    fn label(&self) -> &'static str;
}

pub trait MagnitudeClassifier {
    type Tier: ColorTier;

    fn classify(&self, magnitude: f64) -> Self::Tier;
}

/// Negative and NaN magnitudes fall into the lowest tier.
fn clamp_magnitude(magnitude: f64) -> f64 {
    if magnitude.is_nan() || magnitude < 0.0 {
        0.0
    } else {
        magnitude
    }
}

// ---------------------------------------------------------------------------
// List badges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTier {
    Low,
    Noticeable,
    Moderate,
    Strong,
}

impl ColorTier for BadgeTier {
    fn rank(&self) -> u8 {
        *self as u8
    }

    fn color(&self) -> &'static str {
        match self {
            Self::Low => "#27ae60",
            Self::Noticeable => "#ccac00",
            Self::Moderate => "#ff8c00",
            Self::Strong => "#ff0000",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Noticeable => "noticeable",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
        }
    }
}

/// Badge scale used by the recent-events list (inclusive lower bounds).
#[derive(Debug, Clone, Copy, Default)]
pub struct BadgeScale;

impl MagnitudeClassifier for BadgeScale {
    type Tier = BadgeTier;

    fn classify(&self, magnitude: f64) -> BadgeTier {
        let magnitude = clamp_magnitude(magnitude);
        if magnitude >= 5.0 {
            BadgeTier::Strong
        } else if magnitude >= 4.0 {
            BadgeTier::Moderate
        } else if magnitude >= 3.0 {
            BadgeTier::Noticeable
        } else {
            BadgeTier::Low
        }
    }
}

// ---------------------------------------------------------------------------
// Map markers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerTier {
    Micro,
    Minor,
    Light,
    Moderate,
    Strong,
    Major,
    Severe,
    Great,
}

impl ColorTier for MarkerTier {
    fn rank(&self) -> u8 {
        *self as u8
    }

    fn color(&self) -> &'static str {
        match self {
            Self::Micro => "#000000",
            Self::Minor => "#00ff22",
            Self::Light => "#a6ff00",
            Self::Moderate => "#ffff66",
            Self::Strong => "#ffa500",
            Self::Major => "#ff6600",
            Self::Severe => "#ff0000",
            Self::Great => "#8b0000",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Micro => "micro",
            Self::Minor => "minor",
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
            Self::Major => "major",
            Self::Severe => "severe",
            Self::Great => "great",
        }
    }
}

/// Marker scale used by the map (exclusive lower bounds).
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerScale;

const MARKER_THRESHOLDS: &[(f64, MarkerTier)] = &[
    (7.0, MarkerTier::Great),
    (6.0, MarkerTier::Severe),
    (5.0, MarkerTier::Major),
    (4.0, MarkerTier::Strong),
    (3.0, MarkerTier::Moderate),
    (2.0, MarkerTier::Light),
    (1.0, MarkerTier::Minor),
];

impl MagnitudeClassifier for MarkerScale {
    type Tier = MarkerTier;

    fn classify(&self, magnitude: f64) -> MarkerTier {
        let magnitude = clamp_magnitude(magnitude);
        MARKER_THRESHOLDS
            .iter()
            .find(|(threshold, _)| magnitude > *threshold)
            .map(|(_, tier)| *tier)
            .unwrap_or(MarkerTier::Micro)
    }
}
