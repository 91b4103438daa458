//! Profile summary: achievements plus weighted rating for one user.

use async_trait::async_trait;
use serde::Serialize;

use crate::achievements::{AchievementResult, ProfileCounters, compute_achievements};
use crate::error::Result;
use crate::rating::{RatedSkill, weighted_average_rating};

/// Source of the raw numbers behind a profile.
#[async_trait]
pub trait ProfileStats: Send + Sync {
    /// Counters for `user_id`; unknown users yield all zeros.
    async fn counters(&self, user_id: &str) -> Result<ProfileCounters>;

    /// Rating and rating count of every skill authored by `user_id`.
    async fn authored_ratings(&self, user_id: &str) -> Result<Vec<RatedSkill>>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub counters: ProfileCounters,
    pub achievements: Vec<AchievementResult>,
    pub unlocked_count: usize,
    pub average_rating: f64,
}

/// Build a summary from already-collected inputs.
pub fn summarize(counters: ProfileCounters, rated_skills: &[RatedSkill]) -> ProfileSummary {
    let achievements = compute_achievements(&counters);
    let unlocked_count = achievements.iter().filter(|a| a.unlocked).count();
    ProfileSummary {
        counters,
        achievements,
        unlocked_count,
        average_rating: weighted_average_rating(rated_skills),
    }
}

/// Fetch inputs from `stats` and summarize them.
pub async fn load_profile<S>(stats: &S, user_id: &str) -> Result<ProfileSummary>
where
    S: ProfileStats + ?Sized,
{
    let counters = stats.counters(user_id).await?;
    let ratings = stats.authored_ratings(user_id).await?;
    Ok(summarize(counters, &ratings))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl ProfileStats for Fixed {
        async fn counters(&self, user_id: &str) -> Result<ProfileCounters> {
            if user_id == "alice" {
                Ok(ProfileCounters {
                    installed_count: 3,
                    usage_count: 20,
                    created_count: 1,
                    total_installs: 40,
                    review_count: 0,
                })
            } else {
                Ok(ProfileCounters::default())
            }
        }

        async fn authored_ratings(&self, user_id: &str) -> Result<Vec<RatedSkill>> {
            if user_id == "alice" {
                Ok(vec![
                    RatedSkill {
                        rating: 5.0,
                        rating_count: 10,
                    },
                    RatedSkill {
                        rating: 1.0,
                        rating_count: 1,
                    },
                ])
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[tokio::test]
    async fn loads_and_summarizes() {
        let summary = load_profile(&Fixed, "alice").await.unwrap();
        assert_eq!(summary.achievements.len(), 12);
        // first-install, skill-collector, first-run, regular, power-user, first-skill
        assert_eq!(summary.unlocked_count, 6);
        assert!((summary.average_rating - 51.0 / 11.0).abs() < 1e-9);

        let crowd = summary
            .achievements
            .iter()
            .find(|a| a.id == "crowd-favorite")
            .unwrap();
        assert_eq!(crowd.progress, 40.0);
    }

    #[tokio::test]
    async fn unknown_user_is_all_zero() {
        let summary = load_profile(&Fixed, "nobody").await.unwrap();
        assert_eq!(summary.unlocked_count, 0);
        assert_eq!(summary.average_rating, 0.0);
    }
}
