//! Deferred-event scheduler.
//!
//! Actions can be scheduled to fire once a given amount of logical time
//! has elapsed. Entries live in a time-ordered priority queue keyed by
//! `(due_ms, sequence)`, so events due at the same instant fire in the
//! order they were scheduled. Repetition is expressed by re-scheduling
//! from within a fired action. Because the scheduler is owned by the
//! overlay, pending events persist correctly across saves.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use log::info;
use reverie_data::ActionDef;
use serde::{Deserialize, Serialize};

/// The event scheduler.
///
/// Uses a reversed binary heap as a priority queue for upcoming events;
/// cancelled entries are dropped from the side table and skipped when
/// their heap entry surfaces.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Scheduler {
    heap: BinaryHeap<Reverse<(u64, u64)>>, /* (due_ms, id) */
    events: BTreeMap<u64, ScheduledEvent>,
    next_id: u64,
}

impl PartialEq for Scheduler {
    fn eq(&self, other: &Self) -> bool {
        self.next_id == other.next_id
            && self.events == other.events
            && self.heap.clone().into_sorted_vec() == other.heap.clone().into_sorted_vec()
    }
}

impl Scheduler {
    /// Schedule actions to fire a given delay past `now_ms`. Returns the
    /// entry id usable with [`Scheduler::cancel`].
    pub fn schedule_in(&mut self, now_ms: u64, delay_ms: u64, actions: Vec<ActionDef>, note: Option<String>) -> u64 {
        self.schedule_on(now_ms.saturating_add(delay_ms), actions, note)
    }

    /// Schedule actions to fire at an absolute logical time.
    pub fn schedule_on(&mut self, due_ms: u64, actions: Vec<ActionDef>, note: Option<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let log_msg = note.as_deref().unwrap_or("<no note provided>");
        info!("scheduling event #{id} (due = {due_ms}ms): \"{log_msg}\"");
        self.heap.push(Reverse((due_ms, id)));
        self.events.insert(id, ScheduledEvent { id, due_ms, actions, note });
        id
    }

    /// Remove a pending entry. Returns false if it already fired or never
    /// existed.
    pub fn cancel(&mut self, id: u64) -> bool {
        let removed = self.events.remove(&id).is_some();
        if removed {
            info!("cancelled scheduled event #{id}");
        }
        removed
    }

    /// Pop the next due event, if any. Cancelled entries are skipped.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<ScheduledEvent> {
        while let Some(Reverse((due_ms, id))) = self.heap.peek().copied() {
            if now_ms < due_ms {
                return None;
            }
            self.heap.pop();
            if let Some(event) = self.events.remove(&id) {
                return Some(event);
            }
            // cancelled entry: keep draining
        }
        None
    }

    /// Number of pending (not yet fired or cancelled) entries.
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Iterate pending entries in id order, for diagnostics.
    pub fn iter_pending(&self) -> impl Iterator<Item = &ScheduledEvent> {
        self.events.values()
    }
}

/// A list of actions due at a particular logical time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEvent {
    pub id: u64,
    pub due_ms: u64,
    pub actions: Vec<ActionDef>,
    pub note: Option<String>,
}
