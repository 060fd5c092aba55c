//! Game events and their synchronous delivery.
//!
//! Observers are called in registration order, immediately, on the thread
//! that emitted the event. Nothing is buffered, so the order in which a test
//! sees events is the order in which the engine produced them.

use crate::grid::BoardId;

/// Something the surrounding application may want to react to.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    /// A board became solved.
    BoardCompleted { board: BoardId },
    /// A solved board stopped being solved.
    BoardReverted { board: BoardId },
    /// The session's completed-board counter changed.
    CompletedBoardsChanged { completed: usize },
    /// Pieces on a completed board were locked.
    PiecesLocked { board: BoardId, pieces: usize },
    /// A stage's boards were built.
    StageLoaded { stage: u32, total_stages: u32 },
    /// A stage reached its required completed-board count.
    StageCleared { stage: u32, stars: u32 },
    /// The last stage cleared before the timer ran out.
    LevelWon { stars: u32 },
    /// The timer ran out first.
    LevelLost,
    TimerPaused,
    TimerResumed,
}

/// Identifies an observer so it can be removed again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&GameEvent)>;

/// An ordered list of observers.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<(SubscriptionId, Observer)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer; later registrations are called later.
    pub fn subscribe(&mut self, observer: impl FnMut(&GameEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Removes an observer; returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    pub fn emit(&mut self, event: &GameEvent) {
        for (_, observer) in &mut self.observers {
            observer(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}
