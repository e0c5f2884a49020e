//! Typed engine-to-host events.
//!
//! The engine owns an explicit [`EventBus`] with deterministic dispatch
//! order: events are queued as they happen and drained by the host after
//! each turn or frame. No listener registration, no implicit globals.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Structured notifications surfaced to the host shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    GameMessage { text: String },
    GameFps { fps: f64 },
    GameEnded { ending: String, score: u32, moves: u64 },
    ScoreChanged { score: u32, delta: i32 },
    AchievementUnlocked { id: String, name: String, points: u32 },
    RoomChanged { from: Option<String>, to: String },
    ExitRoom { room: String },
    EnterRoom { room: String },
    InventoryChanged,
    DialogueStarted { npc: String },
    DialogueEnded { npc: String },
    RelationshipChanged { npc: String, value: i32 },
    NpcMoved { npc: String, from: String, to: String },
    PlayerDied,
}

/// FIFO queue of pending host events.
#[derive(Debug, Default)]
pub struct EventBus {
    queue: VecDeque<EngineEvent>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    pub fn publish(&mut self, event: EngineEvent) {
        self.queue.push_back(event);
    }

    /// Remove and return all pending events, oldest first.
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        self.queue.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_drain_in_publication_order() {
        let mut bus = EventBus::new();
        bus.publish(EngineEvent::InventoryChanged);
        bus.publish(EngineEvent::ScoreChanged { score: 5, delta: 5 });
        let drained = bus.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0], EngineEvent::InventoryChanged);
        assert!(bus.is_empty());
    }
}
