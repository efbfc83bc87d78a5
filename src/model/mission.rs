use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// A long-term vision that groups projects.
///
/// Only `project_ids` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub vision: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub kpis: Vec<String>,
    #[serde(rename = "projects", default)]
    pub project_ids: IndexSet<String>,
    #[serde(default)]
    pub user_id: String,
}
