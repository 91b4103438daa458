//! Achievement aggregation.
//!
//! A fixed, ordered catalog of thresholds over five per-user counters.
//! Results are recomputed on every read and never stored. Display strings
//! live in [`label`] and are not consulted by the computation.

use serde::{Deserialize, Serialize};

/// The counter an achievement is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Skills the user currently has installed.
    InstalledCount,
    /// Sum of usage counters across the user's installed skills.
    UsageCount,
    /// Published skills authored by the user.
    CreatedCount,
    /// Sum of install counts across the user's authored skills.
    TotalInstalls,
    /// Reviews written by the user.
    ReviewCount,
}

impl Metric {
    /// Read this metric from a set of counters.
    pub fn value(self, counters: &ProfileCounters) -> u64 {
        match self {
            Self::InstalledCount => counters.installed_count,
            Self::UsageCount => counters.usage_count,
            Self::CreatedCount => counters.created_count,
            Self::TotalInstalls => counters.total_installs,
            Self::ReviewCount => counters.review_count,
        }
    }
}

/// Grouping used to order achievements for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementFamily {
    Installation,
    Usage,
    Creation,
    Community,
}

/// A static catalog entry: one metric, one threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AchievementDefinition {
    pub id: &'static str,
    pub family: AchievementFamily,
    pub metric: Metric,
    pub threshold: u64,
}

const fn def(
    id: &'static str,
    family: AchievementFamily,
    metric: Metric,
    threshold: u64,
) -> AchievementDefinition {
    AchievementDefinition {
        id,
        family,
        metric,
        threshold,
    }
}

/// The full catalog, in display order.
pub static ACHIEVEMENTS: [AchievementDefinition; 12] = [
    def("first-install", AchievementFamily::Installation, Metric::InstalledCount, 1),
    def("skill-collector", AchievementFamily::Installation, Metric::InstalledCount, 3),
    def("skill-hoarder", AchievementFamily::Installation, Metric::InstalledCount, 10),
    def("first-run", AchievementFamily::Usage, Metric::UsageCount, 1),
    def("regular", AchievementFamily::Usage, Metric::UsageCount, 5),
    def("power-user", AchievementFamily::Usage, Metric::UsageCount, 20),
    def("first-skill", AchievementFamily::Creation, Metric::CreatedCount, 1),
    def("prolific-creator", AchievementFamily::Creation, Metric::CreatedCount, 3),
    def("crowd-favorite", AchievementFamily::Creation, Metric::TotalInstalls, 100),
    def("first-review", AchievementFamily::Community, Metric::ReviewCount, 1),
    def("critic", AchievementFamily::Community, Metric::ReviewCount, 5),
    def("top-reviewer", AchievementFamily::Community, Metric::ReviewCount, 10),
];

/// Raw per-user counters collected by the profile statistics collaborator.
///
/// Missing fields deserialize to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileCounters {
    pub installed_count: u64,
    pub usage_count: u64,
    pub created_count: u64,
    pub total_installs: u64,
    pub review_count: u64,
}

/// Derived state of one achievement for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementResult {
    pub id: &'static str,
    pub family: AchievementFamily,
    pub metric: Metric,
    pub threshold: u64,
    pub current: u64,
    pub unlocked: bool,
    /// Percentage in `[0, 100]`; exactly `100.0` iff `unlocked`.
    pub progress: f64,
}

/// Evaluate a single definition against `counters`.
pub fn evaluate(definition: &AchievementDefinition, counters: &ProfileCounters) -> AchievementResult {
    let current = definition.metric.value(counters);
    let unlocked = current >= definition.threshold;
    let progress = if unlocked {
        100.0
    } else {
        // current < threshold here, so threshold > 0.
        (100.0 * current as f64 / definition.threshold as f64).clamp(0.0, 100.0)
    };

    AchievementResult {
        id: definition.id,
        family: definition.family,
        metric: definition.metric,
        threshold: definition.threshold,
        current,
        unlocked,
        progress,
    }
}

/// Evaluate the whole catalog, preserving catalog order.
pub fn compute_achievements(counters: &ProfileCounters) -> Vec<AchievementResult> {
    ACHIEVEMENTS
        .iter()
        .map(|definition| evaluate(definition, counters))
        .collect()
}

// ── presentation ─────────────────────────────────────────────────────

/// Display metadata for an achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AchievementLabel {
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

/// Display metadata for a catalog id, if known.
pub fn label(id: &str) -> Option<AchievementLabel> {
    let (title, description, icon) = match id {
        "first-install" => ("First Install", "Install 1 skill", "download"),
        "skill-collector" => ("Skill Collector", "Install 3 skills", "package"),
        "skill-hoarder" => ("Skill Hoarder", "Install 10 skills", "archive"),
        "first-run" => ("First Run", "Use a skill once", "play"),
        "regular" => ("Regular", "Use skills 5 times", "repeat"),
        "power-user" => ("Power User", "Use skills 20 times", "zap"),
        "first-skill" => ("First Skill", "Publish 1 skill", "sparkles"),
        "prolific-creator" => ("Prolific Creator", "Publish 3 skills", "layers"),
        "crowd-favorite" => ("Crowd Favorite", "Reach 100 installs on your skills", "trophy"),
        "first-review" => ("First Review", "Write 1 review", "message-square"),
        "critic" => ("Critic", "Write 5 reviews", "star"),
        "top-reviewer" => ("Top Reviewer", "Write 10 reviews", "award"),
        _ => return None,
    };
    Some(AchievementLabel {
        title,
        description,
        icon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result<'a>(results: &'a [AchievementResult], id: &str) -> &'a AchievementResult {
        results.iter().find(|r| r.id == id).unwrap()
    }

    #[test]
    fn catalog_shape() {
        assert_eq!(ACHIEVEMENTS.len(), 12);
        let thresholds: Vec<(Metric, u64)> =
            ACHIEVEMENTS.iter().map(|d| (d.metric, d.threshold)).collect();
        assert_eq!(
            thresholds,
            vec![
                (Metric::InstalledCount, 1),
                (Metric::InstalledCount, 3),
                (Metric::InstalledCount, 10),
                (Metric::UsageCount, 1),
                (Metric::UsageCount, 5),
                (Metric::UsageCount, 20),
                (Metric::CreatedCount, 1),
                (Metric::CreatedCount, 3),
                (Metric::TotalInstalls, 100),
                (Metric::ReviewCount, 1),
                (Metric::ReviewCount, 5),
                (Metric::ReviewCount, 10),
            ]
        );
    }

    #[test]
    fn ids_are_unique_and_labelled() {
        let mut ids: Vec<&str> = ACHIEVEMENTS.iter().map(|d| d.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), ACHIEVEMENTS.len());
        for d in &ACHIEVEMENTS {
            assert!(label(d.id).is_some(), "missing label for {}", d.id);
        }
        assert!(label("nope").is_none());
    }

    #[test]
    fn zero_counters_lock_everything() {
        let results = compute_achievements(&ProfileCounters::default());
        assert_eq!(results.len(), 12);
        for r in &results {
            assert!(!r.unlocked);
            assert_eq!(r.progress, 0.0);
        }
    }

    #[test]
    fn install_thresholds() {
        let counters = ProfileCounters {
            installed_count: 3,
            ..Default::default()
        };
        let results = compute_achievements(&counters);

        let three = result(&results, "skill-collector");
        assert!(three.unlocked);
        assert_eq!(three.progress, 100.0);

        let ten = result(&results, "skill-hoarder");
        assert!(!ten.unlocked);
        assert_eq!(ten.progress, 30.0);
        assert_eq!(ten.current, 3);
    }

    #[test]
    fn progress_is_capped_when_exceeded() {
        let counters = ProfileCounters {
            total_installs: 1_000,
            ..Default::default()
        };
        let crowd_favorite = ACHIEVEMENTS
            .iter()
            .find(|d| d.id == "crowd-favorite")
            .unwrap();
        let r = evaluate(crowd_favorite, &counters);
        assert!(r.unlocked);
        assert_eq!(r.progress, 100.0);
    }

    #[test]
    fn unlocked_iff_full_progress() {
        for value in 0..=120 {
            let counters = ProfileCounters {
                installed_count: value,
                usage_count: value,
                created_count: value,
                total_installs: value,
                review_count: value,
            };
            for r in compute_achievements(&counters) {
                assert!((0.0..=100.0).contains(&r.progress));
                assert_eq!(r.unlocked, r.progress >= 100.0, "{} at {value}", r.id);
            }
        }
    }

    #[test]
    fn each_metric_reads_its_own_counter() {
        let counters = ProfileCounters {
            installed_count: 1,
            usage_count: 2,
            created_count: 3,
            total_installs: 4,
            review_count: 5,
        };
        assert_eq!(Metric::InstalledCount.value(&counters), 1);
        assert_eq!(Metric::UsageCount.value(&counters), 2);
        assert_eq!(Metric::CreatedCount.value(&counters), 3);
        assert_eq!(Metric::TotalInstalls.value(&counters), 4);
        assert_eq!(Metric::ReviewCount.value(&counters), 5);
    }

    #[test]
    fn missing_counters_deserialize_to_zero() {
        let counters: ProfileCounters = serde_json::from_str(r#"{"review_count": 5}"#).unwrap();
        assert_eq!(counters.review_count, 5);
        assert_eq!(counters.installed_count, 0);

        let results = compute_achievements(&counters);
        assert!(result(&results, "critic").unlocked);
        assert_eq!(result(&results, "top-reviewer").progress, 50.0);
        assert_eq!(result(&results, "first-install").progress, 0.0);
    }
}
