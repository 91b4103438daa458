//! Rating aggregation across a user's authored skills.

use serde::{Deserialize, Serialize};

/// A skill's average rating together with how many ratings produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatedSkill {
    pub rating: f64,
    pub rating_count: u64,
}

/// Average rating weighted by each skill's rating count.
///
/// `Σ rating·count / Σ count`; `0.0` when there are no ratings at all.
pub fn weighted_average_rating(skills: &[RatedSkill]) -> f64 {
    let (weighted_sum, total) = skills
        .iter()
        .filter(|s| s.rating_count > 0 && s.rating.is_finite())
        .fold((0.0_f64, 0_u64), |(sum, count), s| {
            (sum + s.rating * s.rating_count as f64, count + s.rating_count)
        });

    if total == 0 {
        return 0.0;
    }
    weighted_sum / total as f64
}
