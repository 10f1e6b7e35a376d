/// Handle of a scheduled task, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

#[derive(Debug, Clone)]
struct Scheduled<T> {
    id: TaskId,
    t_due: f64,
    task: T,
}

/// Scheduler holds fire-once tasks that become due at a given race time. Tasks never fire by
/// themselves, the owner polls take_due every frame and cancels what is still pending when it
/// goes away.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    next_id: u64,
    pending: Vec<Scheduled<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Scheduler {
            next_id: 0,
            pending: vec![],
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Scheduler<T> {
        Scheduler::default()
    }

    pub fn schedule(&mut self, t_due: f64, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.pending.push(Scheduled { id, t_due, task });
        id
    }

    /// cancel removes a pending task. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let len_before = self.pending.len();
        self.pending.retain(|s| s.id != id);
        self.pending.len() != len_before
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.pending.iter().any(|s| s.id == id)
    }

    /// take_due removes and returns all tasks due at `t_now`, ordered by due time.
    pub fn take_due(&mut self, t_now: f64) -> Vec<T> {
        let (mut due, pending): (Vec<Scheduled<T>>, Vec<Scheduled<T>>) =
            self.pending.drain(..).partition(|s| s.t_due <= t_now);
        self.pending = pending;

        due.sort_by(|a, b| {
            a.t_due
                .partial_cmp(&b.t_due)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        due.into_iter().map(|s| s.task).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
