//! Deterministic timer queue.
//!
//! Every timer-driven transition in the engine (QTE countdown, battle turn
//! delays, typewriter pacing, quiz countdown) is a task in a [`TimerQueue`]
//! fired by an explicit `pop_due` pump, never by a wall-clock callback.
//! Production pumps with [`crate::clock::SystemClock`]; tests pump with a
//! stepped clock and observe exactly the same transitions.

use chrono::{DateTime, Duration, Utc};

/// Token identifying a scheduled task, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId(u64);

#[derive(Debug)]
struct Entry<T> {
    id: TaskId,
    due: DateTime<Utc>,
    every: Option<Duration>,
    task: T,
}

/// Ordered queue of cancelable delayed tasks.
#[derive(Debug)]
pub struct TimerQueue<T> {
    entries: Vec<Entry<T>>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a one-shot task at an absolute time.
    pub fn schedule_at(&mut self, due: DateTime<Utc>, task: T) -> TaskId {
        self.push(due, None, task)
    }

    /// Schedules a one-shot task `delay` after `now`.
    pub fn schedule_in(&mut self, now: DateTime<Utc>, delay: Duration, task: T) -> TaskId {
        self.push(now + delay, None, task)
    }

    /// Schedules a repeating task first firing `every` after `now`.
    pub fn schedule_repeating(&mut self, now: DateTime<Utc>, every: Duration, task: T) -> TaskId
    where
        T: Clone,
    {
        self.push(now + every, Some(every), task)
    }

    fn push(&mut self, due: DateTime<Utc>, every: Option<Duration>, task: T) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.entries.push(Entry {
            id,
            due,
            every,
            task,
        });
        id
    }

    /// Cancels a pending task. Returns `true` if it was still pending.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Drops every pending task.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Pops the next task due at or before `now`, earliest due first;
    /// insertion order breaks ties. Repeating tasks are re-armed and yield a
    /// clone. Returns `None` when nothing is due.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<T>
    where
        T: Clone,
    {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= now)
            .min_by_key(|(index, entry)| (entry.due, *index))
            .map(|(index, _)| index)?;

        if let Some(every) = self.entries[index].every {
            self.entries[index].due += every;
            Some(self.entries[index].task.clone())
        } else {
            Some(self.entries.swap_remove(index).task)
        }
    }

    /// Earliest pending due time, if any.
    #[must_use]
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.entries.iter().map(|entry| entry.due).min()
    }

    /// `true` when no tasks are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_pop_due_fires_in_due_order() {
        // Arrange
        let mut queue = TimerQueue::new();
        queue.schedule_in(t0(), Duration::milliseconds(800), "late");
        queue.schedule_in(t0(), Duration::milliseconds(300), "early");

        // Act + Assert
        let now = t0() + Duration::seconds(1);
        assert_eq!(queue.pop_due(now), Some("early"));
        assert_eq!(queue.pop_due(now), Some("late"));
        assert_eq!(queue.pop_due(now), None);
    }

    #[test]
    fn test_nothing_fires_before_its_due_time() {
        let mut queue = TimerQueue::new();
        queue.schedule_in(t0(), Duration::milliseconds(500), "task");
        assert_eq!(queue.pop_due(t0() + Duration::milliseconds(499)), None);
        assert_eq!(
            queue.pop_due(t0() + Duration::milliseconds(500)),
            Some("task")
        );
    }

    #[test]
    fn test_cancel_suppresses_a_pending_task() {
        // Arrange
        let mut queue = TimerQueue::new();
        let id = queue.schedule_in(t0(), Duration::milliseconds(100), "task");

        // Act
        assert!(queue.cancel(id));

        // Assert
        assert_eq!(queue.pop_due(t0() + Duration::seconds(1)), None);
        assert!(!queue.cancel(id));
    }

    #[test]
    fn test_repeating_task_rearms_each_pop() {
        // Arrange
        let mut queue = TimerQueue::new();
        queue.schedule_repeating(t0(), Duration::seconds(1), "tick");

        // Act + Assert
        assert_eq!(queue.pop_due(t0() + Duration::seconds(1)), Some("tick"));
        assert_eq!(queue.pop_due(t0() + Duration::seconds(1)), None);
        assert_eq!(queue.pop_due(t0() + Duration::seconds(2)), Some("tick"));
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut queue = TimerQueue::new();
        queue.schedule_in(t0(), Duration::milliseconds(1), "a");
        queue.schedule_repeating(t0(), Duration::seconds(1), "b");
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.next_due(), None);
    }
}
