use std::ops::Range;

use regex::Regex;

use crate::model::project::Project;
use crate::model::task::{Subtask, Task};

/// Which field of a task or subtask matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Id,
    Title,
    Description,
    Link,
}

impl MatchField {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchField::Id => "id",
            MatchField::Title => "title",
            MatchField::Description => "description",
            MatchField::Link => "link",
        }
    }
}

/// Where a hit lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Quests and habits
    Standalone,
    Project { project_id: String, phase_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub scope: Scope,
    pub task_id: String,
    /// Set when the hit is inside a subtask
    pub subtask_id: Option<String>,
    pub field: MatchField,
    pub spans: Vec<Range<usize>>,
}

/// Collect all non-overlapping match byte-ranges for a regex in the given text.
fn find_matches(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}

/// Search standalone tasks, then every project's steps
pub fn search_all(tasks: &[Task], projects: &[Project], re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for task in tasks {
        search_task(re, task, &Scope::Standalone, &mut hits);
    }
    for project in projects {
        hits.extend(search_project(project, re));
    }
    hits
}

pub fn search_project(project: &Project, re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for phase in &project.phases {
        let scope = Scope::Project {
            project_id: project.id.clone(),
            phase_id: phase.id.clone(),
        };
        for task in &phase.tasks {
            search_task(re, task, &scope, &mut hits);
        }
    }
    hits
}

fn search_task(re: &Regex, task: &Task, scope: &Scope, hits: &mut Vec<SearchHit>) {
    let mut push = |field, text: &str, subtask_id: Option<&str>| {
        let spans = find_matches(re, text);
        if !spans.is_empty() {
            hits.push(SearchHit {
                scope: scope.clone(),
                task_id: task.id.clone(),
                subtask_id: subtask_id.map(str::to_string),
                field,
                spans,
            });
        }
    };

    push(MatchField::Id, &task.id, None);
    push(MatchField::Title, &task.title, None);
    if let Some(desc) = &task.description {
        push(MatchField::Description, desc, None);
    }
    if let Some(link) = task.link_label.as_ref().or(task.link_url.as_ref()) {
        push(MatchField::Link, link, None);
    }

    for sub in &task.subtasks {
        search_subtask(sub, &mut push);
    }
}

fn search_subtask(sub: &Subtask, push: &mut impl FnMut(MatchField, &str, Option<&str>)) {
    push(MatchField::Title, &sub.title, Some(&sub.id));
    if let Some(desc) = &sub.description {
        push(MatchField::Description, desc, Some(&sub.id));
    }
}

/// Distinct task ids in hit order
pub fn matched_task_ids(hits: &[SearchHit]) -> Vec<&str> {
    let mut seen = Vec::new();
    for hit in hits {
        if !seen.contains(&hit.task_id.as_str()) {
            seen.push(hit.task_id.as_str());
        }
    }
    seen
}
