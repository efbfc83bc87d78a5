use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::model::task::Task;

use super::remote::RemoteStore;

/// A row-level change seen on the remote
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Inserted(Task),
    Updated(Task),
    Deleted(String),
}

/// Events that turn `old` into `new`, keyed by task id
pub fn diff_snapshots(old: &[Task], new: &[Task]) -> Vec<ChangeEvent> {
    let before: HashMap<&str, &Task> = old.iter().map(|t| (t.id.as_str(), t)).collect();
    let after: HashMap<&str, &Task> = new.iter().map(|t| (t.id.as_str(), t)).collect();

    let mut events = Vec::new();
    for task in new {
        match before.get(task.id.as_str()) {
            None => events.push(ChangeEvent::Inserted(task.clone())),
            Some(prev) if *prev != task => events.push(ChangeEvent::Updated(task.clone())),
            Some(_) => {}
        }
    }
    for task in old {
        if !after.contains_key(task.id.as_str()) {
            events.push(ChangeEvent::Deleted(task.id.clone()));
        }
    }
    events
}

/// Apply a remote change to an in-memory list. Returns whether anything
/// changed. Updates never replace a copy with a higher local revision.
pub fn apply_change(tasks: &mut Vec<Task>, event: ChangeEvent) -> bool {
    match event {
        ChangeEvent::Inserted(task) => {
            if tasks.iter().any(|t| t.id == task.id) {
                return false;
            }
            tasks.insert(0, task);
            true
        }
        ChangeEvent::Updated(task) => match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) if slot.revision > task.revision => false,
            Some(slot) => {
                let changed = *slot != task;
                *slot = task;
                changed
            }
            None => {
                tasks.insert(0, task);
                true
            }
        },
        ChangeEvent::Deleted(id) => {
            let before = tasks.len();
            tasks.retain(|t| t.id != id);
            tasks.len() != before
        }
    }
}

/// Handle to a running feed. Dropping it stops the poller.
pub struct Subscription {
    rx: mpsc::Receiver<ChangeEvent>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Drain pending events without blocking.
    pub fn poll(&self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.rx.try_recv() {
            events.push(evt);
        }
        events
    }

    /// Block until at least one event arrives or `timeout` passes.
    pub fn wait(&self, timeout: Duration) -> Vec<ChangeEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(first) => {
                let mut events = vec![first];
                events.extend(self.poll());
                events
            }
            Err(_) => Vec::new(),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

const STOP_CHECK: Duration = Duration::from_millis(20);

/// Polls the remote for a user's tasks and reports differences between
/// consecutive snapshots.
pub struct RemoteFeed;

impl RemoteFeed {
    /// Start polling on a background thread. `baseline` is the snapshot the
    /// caller already has; only changes relative to it are reported.
    pub fn spawn<R>(
        remote: Arc<R>,
        user_id: String,
        baseline: Vec<Task>,
        interval: Duration,
    ) -> std::io::Result<Subscription>
    where
        R: RemoteStore + ?Sized + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let handle = std::thread::Builder::new()
            .name("nova-feed".to_string())
            .spawn(move || {
                let mut snapshot = baseline;
                while !thread_stop.load(Ordering::Relaxed) {
                    match runtime.block_on(remote.fetch_tasks(&user_id)) {
                        Ok(latest) => {
                            for event in diff_snapshots(&snapshot, &latest) {
                                if tx.send(event).is_err() {
                                    return;
                                }
                            }
                            snapshot = latest;
                        }
                        Err(e) => tracing::debug!(error = %e, "feed poll failed"),
                    }

                    let next = Instant::now() + interval;
                    while Instant::now() < next {
                        if thread_stop.load(Ordering::Relaxed) {
                            return;
                        }
                        std::thread::sleep(STOP_CHECK.min(interval));
                    }
                }
            })?;

        Ok(Subscription {
            rx,
            stop,
            handle: Some(handle),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::Category;
    use crate::store::remote::MemoryRemote;
    use pretty_assertions::assert_eq;

    fn task(id: &str, title: &str) -> Task {
        let mut t = Task::new(id.into(), title.into(), Category::Home);
        t.user_id = "u1".into();
        t
    }

    #[test]
    fn diff_reports_each_kind() {
        let old = vec![task("a", "A"), task("b", "B")];
        let mut changed = old[1].clone();
        changed.title = "B2".into();
        let new = vec![task("c", "C"), changed.clone()];
        let events = diff_snapshots(&old, &new);
        assert_eq!(events.len(), 3);
        assert!(events.contains(&ChangeEvent::Deleted("a".into())));
        assert!(events.contains(&ChangeEvent::Updated(changed)));
        assert!(events.iter().any(|e| matches!(e, ChangeEvent::Inserted(t) if t.id == "c")));
    }

    #[test]
    fn identical_snapshots_are_quiet() {
        let tasks = vec![task("a", "A")];
        assert!(diff_snapshots(&tasks, &tasks.clone()).is_empty());
    }

    #[test]
    fn apply_respects_local_revision() {
        let mut local = task("a", "Local edit");
        local.revision = 3;
        let mut tasks = vec![local];

        let mut stale = task("a", "Stale");
        stale.revision = 2;
        assert!(!apply_change(&mut tasks, ChangeEvent::Updated(stale)));
        assert_eq!(tasks[0].title, "Local edit");

        let mut fresh = task("a", "Fresh");
        fresh.revision = 3;
        assert!(apply_change(&mut tasks, ChangeEvent::Updated(fresh)));
        assert_eq!(tasks[0].title, "Fresh");

        assert!(!apply_change(&mut tasks, ChangeEvent::Inserted(task("a", "Dup"))));
        assert!(apply_change(&mut tasks, ChangeEvent::Inserted(task("b", "B"))));
        assert_eq!(tasks[0].id, "b");
        assert!(apply_change(&mut tasks, ChangeEvent::Deleted("a".into())));
        assert!(!apply_change(&mut tasks, ChangeEvent::Deleted("a".into())));
    }

    #[test]
    fn feed_reports_remote_changes() {
        let remote = Arc::new(MemoryRemote::with_tasks(vec![task("a", "A")]));
        let baseline = remote.tasks();
        let sub = RemoteFeed::spawn(
            remote.clone(),
            "u1".into(),
            baseline,
            Duration::from_millis(10),
        )
        .unwrap();

        remote.edit(|tasks| tasks.push(task("b", "B")));
        let mut seen = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.is_empty() && Instant::now() < deadline {
            seen = sub.wait(Duration::from_millis(50));
        }
        assert!(matches!(&seen[0], ChangeEvent::Inserted(t) if t.id == "b"));
        drop(sub);
    }
}
