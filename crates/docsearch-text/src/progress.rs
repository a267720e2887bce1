//! Progress reporting with fan-out to any number of observers.

use std::sync::Arc;

use parking_lot::Mutex;

/// Receiver of progress for a long running operation. Cancellation is
/// cooperative: the operation polls [`ProgressMonitor::is_canceled`].
pub trait ProgressMonitor: Send + Sync {
    fn begin_task(&self, name: &str, total_work: u64);
    fn worked(&self, work: u64);
    fn sub_task(&self, name: &str);
    fn set_canceled(&self, canceled: bool);
    fn is_canceled(&self) -> bool;
    fn done(&self);
}

/// A monitor that ignores everything and is never canceled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMonitor;

impl ProgressMonitor for NullMonitor {
    fn begin_task(&self, _name: &str, _total_work: u64) {}
    fn worked(&self, _work: u64) {}
    fn sub_task(&self, _name: &str) {}
    fn set_canceled(&self, _canceled: bool) {}
    fn is_canceled(&self) -> bool { false }
    fn done(&self) {}
}

/// Cumulative progress of the current (or last) task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub task: Option<String>,
    pub total_work: u64,
    pub worked: u64,
    pub sub_task: Option<String>,
    pub canceled: bool,
    pub done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorId(u64);

#[derive(Default)]
struct Inner {
    state: ProgressState,
    monitors: Vec<(MonitorId, Arc<dyn ProgressMonitor>)>,
    next_id: u64,
}

/// Forwards progress to every attached monitor. A monitor attached after
/// work started first receives the progress so far.
///
/// Monitors are called with the distributor's lock held and must not call
/// back into it.
#[derive(Default)]
pub struct ProgressDistributor {
    inner: Mutex<Inner>,
}

impl ProgressDistributor {
    pub fn new() -> Self { Self::default() }

    pub fn add_monitor(&self, monitor: Arc<dyn ProgressMonitor>) -> MonitorId {
        let mut inner = self.inner.lock();
        let state = &inner.state;
        if let Some(task) = &state.task {
            monitor.begin_task(task, state.total_work);
            if state.worked > 0 {
                monitor.worked(state.worked);
            }
            if let Some(sub) = &state.sub_task {
                monitor.sub_task(sub);
            }
        }
        if state.canceled {
            monitor.set_canceled(true);
        }
        if state.done {
            monitor.done();
        }
        let id = MonitorId(inner.next_id);
        inner.next_id += 1;
        inner.monitors.push((id, monitor));
        id
    }

    pub fn remove_monitor(&self, id: MonitorId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.monitors.len();
        inner.monitors.retain(|(m, _)| *m != id);
        inner.monitors.len() != before
    }

    pub fn snapshot(&self) -> ProgressState {
        self.inner.lock().state.clone()
    }
}

impl ProgressMonitor for ProgressDistributor {
    /// Starts a new task. A pending cancellation request is kept so that
    /// canceling before the start still stops the task.
    fn begin_task(&self, name: &str, total_work: u64) {
        let mut inner = self.inner.lock();
        let canceled = inner.state.canceled;
        inner.state = ProgressState { task: Some(name.to_string()), total_work, canceled, ..ProgressState::default() };
        inner.monitors.iter().for_each(|(_, m)| m.begin_task(name, total_work));
    }

    fn worked(&self, work: u64) {
        let mut inner = self.inner.lock();
        inner.state.worked = inner.state.worked.saturating_add(work);
        inner.monitors.iter().for_each(|(_, m)| m.worked(work));
    }

    fn sub_task(&self, name: &str) {
        let mut inner = self.inner.lock();
        inner.state.sub_task = Some(name.to_string());
        inner.monitors.iter().for_each(|(_, m)| m.sub_task(name));
    }

    fn set_canceled(&self, canceled: bool) {
        let mut inner = self.inner.lock();
        inner.state.canceled = canceled;
        inner.monitors.iter().for_each(|(_, m)| m.set_canceled(canceled));
    }

    /// Canceled when requested here or by any attached monitor.
    fn is_canceled(&self) -> bool {
        let inner = self.inner.lock();
        inner.state.canceled || inner.monitors.iter().any(|(_, m)| m.is_canceled())
    }

    fn done(&self) {
        let mut inner = self.inner.lock();
        inner.state.done = true;
        inner.monitors.iter().for_each(|(_, m)| m.done());
    }
}
