//! FIFO task queue shared by the dispatcher (producer) and the simulation
//! (consumer).

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::error::FleetResult;
use crate::model::GoalAssignment;

/// Pending goal assignments, oldest first.
///
/// Implementations must allow `push` from many callers concurrently with a
/// `drain`, and every pushed entry must come out of exactly one `drain`.
pub trait TaskQueue: Send + Sync {
    fn push(&self, assignment: GoalAssignment) -> FleetResult<()>;

    /// Removes and returns every queued entry in FIFO order.
    fn drain(&self) -> FleetResult<Vec<GoalAssignment>>;

    /// Puts previously drained entries back ahead of anything pushed since,
    /// keeping their original order.
    fn restore(&self, entries: Vec<GoalAssignment>) -> FleetResult<()>;

    fn len(&self) -> FleetResult<usize>;
}

#[derive(Default)]
pub struct MemoryTaskQueue {
    entries: Mutex<VecDeque<GoalAssignment>>,
}

impl MemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskQueue for MemoryTaskQueue {
    fn push(&self, assignment: GoalAssignment) -> FleetResult<()> {
        self.entries.lock().push_back(assignment);
        Ok(())
    }

    fn drain(&self) -> FleetResult<Vec<GoalAssignment>> {
        let drained = std::mem::take(&mut *self.entries.lock());
        Ok(drained.into())
    }

    fn restore(&self, entries: Vec<GoalAssignment>) -> FleetResult<()> {
        let mut queue = self.entries.lock();
        for entry in entries.into_iter().rev() {
            queue.push_front(entry);
        }
        Ok(())
    }

    fn len(&self) -> FleetResult<usize> {
        Ok(self.entries.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;
    use std::sync::Arc;

    fn goal(agent: &str, x: f64) -> GoalAssignment {
        GoalAssignment::new(agent, Position::new(x, 0.0))
    }

    #[test]
    fn drain_is_fifo_and_empties_queue() {
        let queue = MemoryTaskQueue::new();
        queue.push(goal("BOT_1", 1.0)).unwrap();
        queue.push(goal("BOT_2", 2.0)).unwrap();
        queue.push(goal("BOT_1", 3.0)).unwrap();

        let drained = queue.drain().unwrap();
        assert_eq!(drained, vec![goal("BOT_1", 1.0), goal("BOT_2", 2.0), goal("BOT_1", 3.0)]);
        assert_eq!(queue.len().unwrap(), 0);
        assert!(queue.drain().unwrap().is_empty());
    }

    #[test]
    fn restore_goes_ahead_of_newer_pushes() {
        let queue = MemoryTaskQueue::new();
        queue.push(goal("BOT_1", 1.0)).unwrap();
        queue.push(goal("BOT_2", 2.0)).unwrap();
        let drained = queue.drain().unwrap();

        queue.push(goal("BOT_3", 3.0)).unwrap();
        queue.restore(drained).unwrap();

        assert_eq!(
            queue.drain().unwrap(),
            vec![goal("BOT_1", 1.0), goal("BOT_2", 2.0), goal("BOT_3", 3.0)]
        );
    }

    #[test]
    fn concurrent_pushes_are_drained_exactly_once() {
        let queue = Arc::new(MemoryTaskQueue::new());
        let producers: Vec<_> = (0..8)
            .map(|t| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        queue.push(goal(&format!("BOT_{t}"), i as f64)).unwrap();
                    }
                })
            })
            .collect();

        let mut seen = Vec::new();
        for producer in producers {
            seen.extend(queue.drain().unwrap());
            producer.join().unwrap();
        }
        seen.extend(queue.drain().unwrap());
        assert_eq!(seen.len(), 8 * 250);
    }
}
