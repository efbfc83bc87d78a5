use chrono::{Datelike, Duration, NaiveDate};

use crate::model::category::Category;
use crate::model::task::{Habit, Task, Weekday, new_id};

const STREAK_CAP: u32 = 365;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum HabitError {
    #[error("task is not a habit: {0}")]
    NotAHabit(String),
    #[error("habit needs at least one scheduled day")]
    NoDays,
}

/// Build a new habit task scheduled on `days` (every day when empty)
pub fn new_habit(title: &str, days: &[Weekday], user_id: &str) -> Task {
    let frequency = if days.is_empty() {
        Weekday::ALL.to_vec()
    } else {
        let mut d = days.to_vec();
        d.sort();
        d.dedup();
        d
    };
    let mut task = Task::new(new_id("habit"), title.trim().to_uppercase(), Category::Habit);
    task.user_id = user_id.to_string();
    task.habit = Some(Habit::new(frequency));
    task
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Flip the mark for `date` and refresh both streak counters.
/// Returns the new mark.
pub fn toggle_day(task: &mut Task, date: NaiveDate, today: NaiveDate) -> Result<bool, HabitError> {
    let habit = task
        .habit
        .as_mut()
        .ok_or_else(|| HabitError::NotAHabit(task.id.clone()))?;
    let key = date_key(date);
    let marked = !habit.habit_history.get(&key).copied().unwrap_or(false);
    habit.habit_history.insert(key, marked);
    habit.streak_current = current_streak(habit, today);
    habit.streak_best = habit.streak_best.max(habit.streak_current);
    task.touch();
    Ok(marked)
}

/// Consecutive marked days ending today. An unmarked today does not break
/// the run: counting then starts at yesterday.
pub fn current_streak(habit: &Habit, today: NaiveDate) -> u32 {
    let is_marked = |d: NaiveDate| habit.habit_history.get(&date_key(d)).copied() == Some(true);
    let mut day = if is_marked(today) {
        today
    } else {
        today - Duration::days(1)
    };
    let mut streak = 0;
    while streak < STREAK_CAP && is_marked(day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

/// Whether the habit is scheduled on the given day
pub fn is_scheduled(habit: &Habit, day: Weekday) -> bool {
    habit.habit_frequency.is_empty() || habit.habit_frequency.contains(&day)
}

/// Whether the habit is due on `date` and not yet marked
pub fn is_due(habit: &Habit, date: NaiveDate) -> bool {
    is_scheduled(habit, Weekday::from_chrono(date.weekday()))
        && habit.habit_history.get(&date_key(date)).copied() != Some(true)
}

/// Monday-to-Sunday dates of the week `offset` weeks from the one holding
/// `today`
pub fn week_dates(today: NaiveDate, offset: i64) -> [NaiveDate; 7] {
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64)
        + Duration::weeks(offset);
    std::array::from_fn(|i| monday + Duration::days(i as i64))
}

/// Marked days over days tracked since each habit was created, as a percent
pub fn completion_rate<'a>(habits: impl IntoIterator<Item = &'a Task>, today: NaiveDate) -> u8 {
    let mut opportunities: i64 = 0;
    let mut completed: i64 = 0;
    for task in habits {
        let Some(habit) = &task.habit else { continue };
        let created = task.created_at.date_naive();
        let days = (today - created).num_days() + 1;
        opportunities += days.max(1);
        completed += habit.habit_history.values().filter(|v| **v).count() as i64;
    }
    if opportunities == 0 {
        return 0;
    }
    ((200 * completed + opportunities) / (2 * opportunities)).min(100) as u8
}

/// Marks per weekday (Mon first), scaled so the busiest day is 100
pub fn consistency_by_weekday<'a>(habits: impl IntoIterator<Item = &'a Task>) -> [u8; 7] {
    let mut counts = [0u32; 7];
    for habit in habits.into_iter().filter_map(|t| t.habit.as_ref()) {
        for (key, done) in &habit.habit_history {
            if !done {
                continue;
            }
            if let Ok(date) = NaiveDate::parse_from_str(key, "%Y-%m-%d") {
                counts[date.weekday().num_days_from_monday() as usize] += 1;
            }
        }
    }
    let max = counts.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return [0; 7];
    }
    counts.map(|c| ((200 * c + max) / (2 * max)) as u8)
}

/// Longest running streak across habits
pub fn top_streak<'a>(habits: impl IntoIterator<Item = &'a Task>) -> u32 {
    habits
        .into_iter()
        .filter_map(|t| t.habit.as_ref())
        .map(|h| h.streak_current)
        .max()
        .unwrap_or(0)
}

/// Parse a comma-separated day list (`mon,wed,fri`); `daily` means all
pub fn parse_days(spec: &str) -> Result<Vec<Weekday>, HabitError> {
    if spec.trim().eq_ignore_ascii_case("daily") {
        return Ok(Weekday::ALL.to_vec());
    }
    let days: Vec<Weekday> = spec
        .split(',')
        .filter_map(Weekday::parse)
        .collect();
    if days.is_empty() {
        return Err(HabitError::NoDays);
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn habit_task() -> Task {
        let mut t = new_habit("read", &[], "u1");
        t.created_at = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        t
    }

    #[test]
    fn new_habit_defaults_to_every_day() {
        let t = habit_task();
        assert_eq!(t.title, "READ");
        assert_eq!(t.category, Category::Habit);
        assert_eq!(t.habit.as_ref().unwrap().habit_frequency.len(), 7);
    }

    #[test]
    fn unmarked_today_keeps_yesterdays_streak() {
        let today = d(2025, 3, 10);
        let mut t = habit_task();
        toggle_day(&mut t, d(2025, 3, 8), today).unwrap();
        toggle_day(&mut t, d(2025, 3, 9), today).unwrap();
        assert_eq!(t.habit.as_ref().unwrap().streak_current, 2);

        toggle_day(&mut t, today, today).unwrap();
        let h = t.habit.as_ref().unwrap();
        assert_eq!(h.streak_current, 3);
        assert_eq!(h.streak_best, 3);
    }

    #[test]
    fn gap_breaks_streak_but_best_remains() {
        let today = d(2025, 3, 10);
        let mut t = habit_task();
        for day in 7..=9 {
            toggle_day(&mut t, d(2025, 3, day), today).unwrap();
        }
        // unmark the middle day
        assert!(!toggle_day(&mut t, d(2025, 3, 8), today).unwrap());
        let h = t.habit.as_ref().unwrap();
        assert_eq!(h.streak_current, 1);
        assert_eq!(h.streak_best, 3);
    }

    #[test]
    fn streak_is_capped() {
        let today = d(2025, 12, 31);
        let mut habit = Habit::new(Weekday::ALL.to_vec());
        for i in 0..400 {
            habit
                .habit_history
                .insert(date_key(today - Duration::days(i)), true);
        }
        assert_eq!(current_streak(&habit, today), STREAK_CAP);
    }

    #[test]
    fn toggling_a_plain_task_fails() {
        let mut t = Task::new("t".into(), "x".into(), Category::Home);
        assert_eq!(
            toggle_day(&mut t, d(2025, 1, 1), d(2025, 1, 1)),
            Err(HabitError::NotAHabit("t".into()))
        );
    }

    #[test]
    fn week_dates_start_on_monday() {
        // 2025-03-12 is a Wednesday
        let week = week_dates(d(2025, 3, 12), 0);
        assert_eq!(week[0], d(2025, 3, 10));
        assert_eq!(week[6], d(2025, 3, 16));
        assert_eq!(week_dates(d(2025, 3, 16), 1)[0], d(2025, 3, 17));
        assert_eq!(week_dates(d(2025, 3, 10), -1)[0], d(2025, 3, 3));
    }

    #[test]
    fn due_respects_schedule_and_marks() {
        let mut habit = Habit::new(vec![Weekday::Mon, Weekday::Wed]);
        assert!(is_due(&habit, d(2025, 3, 10)));
        assert!(!is_due(&habit, d(2025, 3, 11)));
        habit.habit_history.insert("2025-03-10".into(), true);
        assert!(!is_due(&habit, d(2025, 3, 10)));
    }

    #[test]
    fn analytics() {
        let today = d(2025, 3, 10);
        let mut t = habit_task();
        // Monday and Tuesday twice, Wednesday once
        for day in [3, 4, 5, 10, 11] {
            toggle_day(&mut t, d(2025, 3, day), today).unwrap();
        }
        // 5 marks over 10 days since creation
        assert_eq!(completion_rate([&t], today), 50);
        assert_eq!(consistency_by_weekday([&t]), [100, 100, 50, 0, 0, 0, 0]);
        assert_eq!(top_streak([&t]), 1);
        assert_eq!(completion_rate(std::iter::empty(), today), 0);
    }

    #[test]
    fn parse_day_lists() {
        assert_eq!(parse_days("daily").unwrap().len(), 7);
        assert_eq!(
            parse_days("mon, fri").unwrap(),
            vec![Weekday::Mon, Weekday::Fri]
        );
        assert_eq!(parse_days("xyz"), Err(HabitError::NoDays));
    }
}
