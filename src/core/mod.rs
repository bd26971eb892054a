//! Pure data layer: record shapes, field mapping, validation and tiers.
//!
//! Nothing in here performs I/O or holds state.

pub mod adapter;
pub mod classify;
pub mod collection;
pub mod normalize;
pub mod record;

pub use adapter::{adapt, SourceSchema};
pub use classify::{BadgeScale, BadgeTier, ColorTier, MagnitudeClassifier, MarkerScale, MarkerTier};
pub use collection::Collection;
pub use normalize::{normalize, InvalidRecord};
pub use record::{EarthquakeRecord, NaturalKey, NormalizedRecord};
