pub mod habit_ops;
pub mod history;
pub mod merge;
pub mod mission_ops;
pub mod progression;
pub mod search;
pub mod tree_ops;
