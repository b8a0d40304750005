use serde::{Deserialize, Serialize};

use crate::structs::ProfileData;

/// Highest regular level. Posting at this level prestiges the user.
pub const MAX_LEVEL: u32 = 30;

/// Leveling state of a user, as last reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    pub level: u32,
    /// Prestige tier. Increments each time the user posts past the max level.
    pub prestige: u32,
    pub posts_toward_next_level: u32,
    pub posts_required_for_next_level: u32,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            level: 1,
            prestige: 0,
            posts_toward_next_level: 0,
            posts_required_for_next_level: 1,
        }
    }
}

impl From<&ProfileData> for UserProgress {
    fn from(profile: &ProfileData) -> Self {
        Self {
            level: profile.level,
            prestige: profile.prestige,
            posts_toward_next_level: profile.posts_toward_next_level,
            posts_required_for_next_level: profile.posts_required_for_next_level,
        }
    }
}

impl UserProgress {
    /// Fraction of the way to the next level, in `[0, 1]`.
    ///
    /// Returns 0 when the server reports zero required posts, and clamps
    /// to 1 when it reports more posts than required.
    pub fn progress_fraction(&self) -> f64 {
        if self.posts_required_for_next_level == 0 {
            return 0.0;
        }

        let fraction =
            f64::from(self.posts_toward_next_level) / f64::from(self.posts_required_for_next_level);
        fraction.clamp(0.0, 1.0)
    }

    /// Label shown under the XP bar.
    pub fn progress_label(&self) -> String {
        format!(
            "{}/{} posts to next level",
            self.posts_toward_next_level, self.posts_required_for_next_level
        )
    }

    /// Badge for the current prestige tier, if it has one.
    pub fn prestige_badge(&self) -> Option<&'static str> {
        match self.prestige {
            1 => Some("🐠"),
            2 => Some("🐡"),
            3 => Some("🦈"),
            _ => None,
        }
    }

    /// What the server's leveling rules will report after one more catch is posted.
    ///
    /// This is a projection for hints only. The store is never updated from it.
    pub fn projected_after_post(&self) -> Self {
        if self.level >= MAX_LEVEL {
            return Self {
                level: 1,
                prestige: self.prestige.saturating_add(1),
                posts_toward_next_level: 0,
                posts_required_for_next_level: posts_required_for_level(1),
            };
        }

        let required = posts_required_for_level(self.level);
        let toward = self.posts_toward_next_level.saturating_add(1);

        if toward >= required {
            let level = self.level + 1;
            Self {
                level,
                prestige: self.prestige,
                posts_toward_next_level: 0,
                posts_required_for_next_level: posts_required_for_level(level),
            }
        } else {
            Self {
                posts_toward_next_level: toward,
                posts_required_for_next_level: required,
                ..*self
            }
        }
    }

    /// Whether posting one more catch raises the level or the prestige tier.
    pub fn levels_up_on_next_post(&self) -> bool {
        let next = self.projected_after_post();
        next.prestige > self.prestige || next.level > self.level
    }
}

/// Number of posts needed to leave `level`.
pub fn posts_required_for_level(level: u32) -> u32 {
    match level {
        0..=1 => 1,
        2..=9 => 2,
        10..=19 => 3,
        20..=29 => 4,
        // The next post at max level prestiges.
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::{posts_required_for_level, UserProgress, MAX_LEVEL};

    fn progress(level: u32, prestige: u32, toward: u32, required: u32) -> UserProgress {
        UserProgress {
            level,
            prestige,
            posts_toward_next_level: toward,
            posts_required_for_next_level: required,
        }
    }

    #[test]
    fn default_is_level_one() {
        assert_eq!(UserProgress::default(), progress(1, 0, 0, 1));
    }

    #[test]
    fn fraction_guards_zero_denominator() {
        let fraction = progress(4, 0, 3, 0).progress_fraction();
        assert_eq!(fraction, 0.0);
        assert!(fraction.is_finite());
    }

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(progress(4, 0, 1, 2).progress_fraction(), 0.5);
        assert_eq!(progress(4, 0, 7, 2).progress_fraction(), 1.0);
    }

    #[test]
    fn labels_and_badges() {
        assert_eq!(progress(3, 0, 1, 2).progress_label(), "1/2 posts to next level");
        assert_eq!(progress(3, 0, 1, 2).prestige_badge(), None);
        assert_eq!(progress(3, 2, 1, 2).prestige_badge(), Some("🐡"));
        assert_eq!(progress(3, 9, 1, 2).prestige_badge(), None);
    }

    #[test]
    fn required_posts_by_level() {
        assert_eq!(posts_required_for_level(1), 1);
        assert_eq!(posts_required_for_level(9), 2);
        assert_eq!(posts_required_for_level(10), 3);
        assert_eq!(posts_required_for_level(29), 4);
        assert_eq!(posts_required_for_level(MAX_LEVEL), 1);
    }

    #[test]
    fn projection_accumulates_then_levels() {
        let start = progress(5, 0, 0, 2);
        let once = start.projected_after_post();
        assert_eq!(once, progress(5, 0, 1, 2));
        assert!(!start.levels_up_on_next_post());

        assert!(once.levels_up_on_next_post());
        assert_eq!(once.projected_after_post(), progress(6, 0, 0, 2));

        assert_eq!(progress(9, 0, 1, 2).projected_after_post(), progress(10, 0, 0, 3));
    }

    #[test]
    fn projection_prestiges_at_max_level() {
        let maxed = progress(MAX_LEVEL, 1, 0, 1);
        assert!(maxed.levels_up_on_next_post());
        assert_eq!(maxed.projected_after_post(), progress(1, 2, 0, 1));
    }

    #[test]
    fn projection_saturates_on_extreme_counters() {
        assert_eq!(
            progress(5, 0, u32::MAX, 2).projected_after_post(),
            progress(6, 0, 0, 2)
        );
        assert_eq!(
            progress(MAX_LEVEL, u32::MAX, 0, 1).projected_after_post(),
            progress(1, u32::MAX, 0, 1)
        );
    }
}
