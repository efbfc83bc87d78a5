use serde::Serialize;

use crate::model::config::ProgressionConfig;
use crate::model::task::{Complexity, Task};

/// Where a cumulative XP total lands on the level curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Level {
    pub level: u32,
    /// XP earned past the start of the current level
    pub xp_into_level: u64,
    /// XP the current level costs in total
    pub xp_required: u64,
}

impl Level {
    /// Percent of the way to the next level (0..=100)
    pub fn percent(&self) -> u8 {
        if self.xp_required == 0 {
            return 0;
        }
        ((self.xp_into_level * 100) / self.xp_required).min(100) as u8
    }
}

/// Level for an XP total using the default curve (1000, ×1.5)
pub fn compute_level(total_xp: u64) -> Level {
    compute_level_with(total_xp, &ProgressionConfig::default())
}

/// Level for an XP total on a configured curve. Integer arithmetic only, so
/// the result never depends on float rounding.
pub fn compute_level_with(total_xp: u64, curve: &ProgressionConfig) -> Level {
    let den = curve.growth_den.max(1);
    let mut level = 1u32;
    let mut required = curve.base_xp.max(1);
    let mut remaining = total_xp;

    while remaining >= required {
        remaining -= required;
        level += 1;
        // Growth below 1 would shrink the requirement; hold it steady instead.
        required = (required.saturating_mul(curve.growth_num) / den).max(required);
    }

    Level {
        level,
        xp_into_level: remaining,
        xp_required: required,
    }
}

/// Sum of XP over completed tasks; a task without a value counts as 10
pub fn total_xp<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> u64 {
    tasks
        .into_iter()
        .filter(|t| t.completed)
        .map(|t| u64::from(t.effective_xp()))
        .sum()
}

/// Letter tier for a level: a new letter every ten levels, S from 50
pub fn rank(level: u32) -> Complexity {
    match level {
        50.. => Complexity::S,
        40.. => Complexity::A,
        30.. => Complexity::B,
        20.. => Complexity::C,
        10.. => Complexity::D,
        _ => Complexity::E,
    }
}

/// Display title shown next to the level
pub fn title(level: u32) -> &'static str {
    if level < 10 { "INITIATE" } else { "HUNTER" }
}

/// The new level, if `after` crossed into a higher level than `before`
pub fn level_up(before: &Level, after: &Level) -> Option<u32> {
    (after.level > before.level).then_some(after.level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::Category;

    #[test]
    fn zero_xp_is_level_one() {
        assert_eq!(
            compute_level(0),
            Level {
                level: 1,
                xp_into_level: 0,
                xp_required: 1000
            }
        );
    }

    #[test]
    fn thresholds_follow_the_curve() {
        assert_eq!(compute_level(999).level, 1);

        let l2 = compute_level(1000);
        assert_eq!((l2.level, l2.xp_into_level, l2.xp_required), (2, 0, 1500));

        let l3 = compute_level(2500);
        assert_eq!((l3.level, l3.xp_into_level, l3.xp_required), (3, 0, 2250));

        // 1000 + 1500 + 2250 + 3375
        let l5 = compute_level(8125);
        assert_eq!((l5.level, l5.xp_into_level, l5.xp_required), (5, 0, 5062));
    }

    #[test]
    fn level_is_monotonic() {
        let mut last = 1;
        for xp in (0..50_000).step_by(37) {
            let l = compute_level(xp).level;
            assert!(l >= last);
            last = l;
        }
    }

    #[test]
    fn flat_curve_does_not_loop_forever() {
        let curve = ProgressionConfig {
            base_xp: 100,
            growth_num: 1,
            growth_den: 2,
        };
        let l = compute_level_with(1000, &curve);
        assert_eq!(l.level, 11);
        assert_eq!(l.xp_required, 100);
    }

    #[test]
    fn total_xp_counts_completed_with_default() {
        let mut a = Task::new("a".into(), "a".into(), Category::Home);
        a.completed = true;
        a.xp_value = 50;
        let mut b = Task::new("b".into(), "b".into(), Category::Home);
        b.completed = true;
        b.xp_value = 0;
        let c = Task::new("c".into(), "c".into(), Category::Home);
        assert_eq!(total_xp(&[a, b, c]), 60);
    }

    #[test]
    fn ranks_and_level_up() {
        assert_eq!(rank(1), Complexity::E);
        assert_eq!(rank(10), Complexity::D);
        assert_eq!(rank(49), Complexity::A);
        assert_eq!(rank(72), Complexity::S);
        assert_eq!(title(9), "INITIATE");

        let before = compute_level(900);
        let after = compute_level(1100);
        assert_eq!(level_up(&before, &after), Some(2));
        assert_eq!(level_up(&after, &after), None);
        assert_eq!(after.percent(), 6);
    }
}
