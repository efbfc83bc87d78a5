use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::category::Category;

/// XP credited for a completed task that carries no explicit value
pub const DEFAULT_TASK_XP: u32 = 10;

/// Prefix for ids minted while the record store was unreachable
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Difficulty rank of a task, ordered E (easiest) through S
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Complexity {
    #[default]
    E,
    D,
    C,
    B,
    A,
    S,
}

impl Complexity {
    pub fn parse(s: &str) -> Option<Complexity> {
        match s.trim().to_ascii_uppercase().as_str() {
            "E" => Some(Complexity::E),
            "D" => Some(Complexity::D),
            "C" => Some(Complexity::C),
            "B" => Some(Complexity::B),
            "A" => Some(Complexity::A),
            "S" => Some(Complexity::S),
            _ => None,
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Complexity::E => "E",
            Complexity::D => "D",
            Complexity::C => "C",
            Complexity::B => "B",
            Complexity::A => "A",
            Complexity::S => "S",
        };
        f.write_str(s)
    }
}

/// Day-of-week tag used in habit schedules (`MON` .. `SUN`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn parse(s: &str) -> Option<Weekday> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MON" => Some(Weekday::Mon),
            "TUE" => Some(Weekday::Tue),
            "WED" => Some(Weekday::Wed),
            "THU" => Some(Weekday::Thu),
            "FRI" => Some(Weekday::Fri),
            "SAT" => Some(Weekday::Sat),
            "SUN" => Some(Weekday::Sun),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Mon => "MON",
            Weekday::Tue => "TUE",
            Weekday::Wed => "WED",
            Weekday::Thu => "THU",
            Weekday::Fri => "FRI",
            Weekday::Sat => "SAT",
            Weekday::Sun => "SUN",
        }
    }

    /// Monday-based index (Mon = 0)
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_chrono(day: chrono::Weekday) -> Weekday {
        Weekday::ALL[day.num_days_from_monday() as usize]
    }
}

/// Habit bookkeeping carried by tasks in the HABIT category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub habit_frequency: Vec<Weekday>,
    /// ISO date (`YYYY-MM-DD`) → marked done
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub habit_history: BTreeMap<String, bool>,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub streak_current: u32,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub streak_best: u32,
}

impl Habit {
    pub fn new(frequency: Vec<Weekday>) -> Self {
        Habit {
            habit_frequency: frequency,
            habit_history: BTreeMap::new(),
            streak_current: 0,
            streak_best: 0,
        }
    }
}

/// A second-level work item ("sub-directive") under a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_label: Option<String>,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub is_blocker: bool,
    /// Outgoing links to other task or subtask ids
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub connections: IndexSet<String>,
}

impl Subtask {
    pub fn new(id: String, title: String) -> Self {
        Subtask {
            id,
            title,
            completed: false,
            xp: None,
            description: None,
            link_url: None,
            link_label: None,
            is_blocker: false,
            connections: IndexSet::new(),
        }
    }
}

/// A task ("directive"): a standalone quest, a roadmap node, a habit, or a
/// step inside a project phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub user_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_label: Option<String>,
    #[serde(rename = "temple_id")]
    pub category: Category,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub complexity: Complexity,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub xp_value: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub completed: bool,
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub subtasks: Vec<Subtask>,
    /// Outgoing links to other task or subtask ids
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub connections: IndexSet<String>,
    /// Canvas placement on the roadmap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_key: Option<String>,
    #[serde(flatten)]
    pub habit: Option<Habit>,
    /// Bumped on every local mutation; merges never go backwards
    #[serde(default, deserialize_with = "crate::model::null_as_default")]
    pub revision: u64,
}

impl Task {
    pub fn new(id: String, title: String, category: Category) -> Self {
        Task {
            id,
            created_at: Utc::now(),
            user_id: String::new(),
            title,
            description: None,
            link_url: None,
            link_label: None,
            category,
            complexity: Complexity::default(),
            xp_value: DEFAULT_TASK_XP,
            due_date: None,
            completed: false,
            subtasks: Vec::new(),
            connections: IndexSet::new(),
            x: None,
            y: None,
            icon_key: None,
            habit: None,
            revision: 0,
        }
    }

    /// Whether this record only exists in the local cache
    pub fn is_local(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }

    /// XP this task is worth when completed
    pub fn effective_xp(&self) -> u32 {
        if self.xp_value == 0 {
            DEFAULT_TASK_XP
        } else {
            self.xp_value
        }
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = Some(x);
        self.y = Some(y);
    }

    /// Record a local mutation
    pub fn touch(&mut self) {
        self.revision += 1;
    }

    pub fn find_subtask(&self, id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == id)
    }
}

/// Mint a fresh id with the given prefix (`task-…`, `phase-…`)
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Mint an id for a record that could not reach the record store
pub fn new_local_id() -> String {
    format!("{}{}", LOCAL_ID_PREFIX, uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complexity_orders_e_through_s() {
        assert!(Complexity::E < Complexity::D);
        assert!(Complexity::A < Complexity::S);
        assert_eq!(Complexity::parse("b"), Some(Complexity::B));
        assert_eq!(Complexity::parse("Z"), None);
    }

    #[test]
    fn task_uses_store_column_names() {
        let mut task = Task::new("t1".into(), "Run".into(), Category::Fitness);
        task.set_position(10.0, 20.0);
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["temple_id"], "FITNESS");
        assert_eq!(json["xp_value"], 10);
        assert_eq!(json["x"], 10.0);
        assert!(json.get("habit_frequency").is_none());
    }

    #[test]
    fn habit_fields_flatten_into_the_task_record() {
        let mut task = Task::new("h1".into(), "Read".into(), Category::Habit);
        task.habit = Some(Habit::new(vec![Weekday::Mon, Weekday::Fri]));
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains(r#""habit_frequency":["MON","FRI"]"#));

        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back.habit, task.habit);
    }

    #[test]
    fn minimal_store_row_deserializes() {
        let row = r#"{"id":"42","created_at":"2025-01-01T00:00:00Z","title":"Ship","temple_id":"BUSINESS"}"#;
        let task: Task = serde_json::from_str(row).unwrap();
        assert_eq!(task.category, Category::Business);
        assert!(task.habit.is_none());
        assert!(task.connections.is_empty());
        assert_eq!(task.effective_xp(), DEFAULT_TASK_XP);
    }

    #[test]
    fn null_columns_read_as_defaults() {
        let row = r#"{"id":"7","created_at":"2025-01-01T00:00:00Z","user_id":null,
            "title":"Ship","description":null,"temple_id":"HOME","complexity":null,
            "xp_value":null,"completed":null,"subtasks":null,"connections":null,
            "x":null,"y":null,"due_date":null,"habit_frequency":null,
            "habit_history":null,"streak_current":null,"streak_best":null}"#;
        let task: Task = serde_json::from_str(row).unwrap();
        assert_eq!(task.user_id, "");
        assert_eq!(task.complexity, Complexity::E);
        assert!(!task.completed);
        assert!(task.subtasks.is_empty());
        assert!(task.connections.is_empty());
        assert!(task.habit.is_none());
        assert_eq!(task.effective_xp(), DEFAULT_TASK_XP);

        let habit_row = r#"{"id":"8","created_at":"2025-01-01T00:00:00Z","title":"Read",
            "temple_id":"HABIT","habit_frequency":["MON"],"habit_history":null,
            "streak_current":null,"streak_best":3,
            "subtasks":[{"id":"s1","title":"Page","completed":null,"connections":null}]}"#;
        let task: Task = serde_json::from_str(habit_row).unwrap();
        let habit = task.habit.unwrap();
        assert!(habit.habit_history.is_empty());
        assert_eq!(habit.streak_current, 0);
        assert_eq!(habit.streak_best, 3);
        assert!(!task.subtasks[0].completed);
    }

    #[test]
    fn local_ids_are_recognised() {
        assert!(Task::new(new_local_id(), "x".into(), Category::Home).is_local());
        assert!(!Task::new(new_id("task"), "x".into(), Category::Home).is_local());
    }
}
