//! Degrade policies applied when an upstream fetch fails
//!
//! Facilities fall back to an empty layer and advice falls back to a random
//! fixed tip, so every failure still ends in something displayable.

use rand::RngExt;
use tracing::warn;

use crate::Result;
use crate::models::Facility;

/// Tips shown when advice cannot be generated
pub const FALLBACK_TIPS: [&str; 3] = [
    "娘さんの靴下、脱げてないか見てあげてね。",
    "パパ、たまには深呼吸してリラックス！",
    "目的地まであと少し。娘さんと楽しんで！",
];

/// Facilities for this cycle, or none when the fetch failed
pub fn facilities_or_empty(result: Result<Vec<Facility>>) -> Vec<Facility> {
    result.unwrap_or_else(|e| {
        warn!("Facility search failed, showing an empty layer: {}", e);
        Vec::new()
    })
}

/// Generated advice, or a uniformly random fallback tip when any step failed
pub fn advice_or_fallback(result: Result<String>) -> String {
    result.unwrap_or_else(|e| {
        warn!("Advice unavailable, using a fallback tip: {}", e);
        fallback_tip(&mut rand::rng()).to_string()
    })
}

/// Uniform pick from [`FALLBACK_TIPS`]
pub fn fallback_tip<R: RngExt>(rng: &mut R) -> &'static str {
    FALLBACK_TIPS[rng.random_range(0..FALLBACK_TIPS.len())]
}
