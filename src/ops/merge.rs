use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::model::task::Task;

/// Combine remote and locally cached task records into one list.
///
/// Records are keyed by id. On collision the remote copy wins unless the
/// local copy carries a strictly higher revision (an edit that has not
/// reached the store yet). The result is ordered newest first by
/// `created_at`; ties keep their first-seen order.
pub fn merge_records(remote: Vec<Task>, local: Vec<Task>) -> Vec<Task> {
    let mut by_id: IndexMap<String, Task> = IndexMap::with_capacity(remote.len() + local.len());

    for task in remote {
        by_id.insert(task.id.clone(), task);
    }
    for task in local {
        match by_id.entry(task.id.clone()) {
            Entry::Occupied(mut slot) => {
                if task.revision > slot.get().revision {
                    slot.insert(task);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(task);
            }
        }
    }

    let mut merged: Vec<Task> = by_id.into_values().collect();
    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    merged
}
