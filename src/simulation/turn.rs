//! Turn driver - emits the fixed phase sequence to subscribers
//!
//! A turn always runs to completion. Subscribers that want another turn ask
//! for it through `TurnControl`; the request is queued and runs after the
//! current turn, never inside it.

use crate::core::types::{Turn, TurnPhase};

/// Receives every phase of every turn
pub trait PhaseSubscriber {
    fn on_phase(&mut self, turn: Turn, phase: TurnPhase, control: &mut TurnControl);
}

/// Handle given to subscribers while a turn resolves
#[derive(Debug, Default)]
pub struct TurnControl {
    requested: u32,
}

impl TurnControl {
    /// Run one more turn once the current one completes
    pub fn queue_turn(&mut self) {
        self.requested = self.requested.saturating_add(1);
    }

    pub fn requested(&self) -> u32 {
        self.requested
    }
}

#[derive(Debug, Clone)]
pub struct TurnDriver {
    turn: Turn,
    max_queued_turns: u32,
}

impl TurnDriver {
    pub fn new(max_queued_turns: u32) -> Self {
        Self { turn: 0, max_queued_turns }
    }

    /// Last turn that ran, 0 before the first
    pub fn current_turn(&self) -> Turn {
        self.turn
    }

    /// Run one turn and then any turns queued while it ran
    ///
    /// At most `max_queued_turns` extra turns run per call; further requests
    /// are dropped. Returns the number of turns run.
    pub fn advance(&mut self, subscribers: &mut [&mut dyn PhaseSubscriber]) -> u32 {
        let mut pending: u32 = 1;
        let mut accepted_total: u32 = 0;
        let mut ran: u32 = 0;

        while pending > 0 {
            pending -= 1;
            self.turn += 1;

            let mut control = TurnControl::default();
            for phase in TurnPhase::SEQUENCE {
                for subscriber in subscribers.iter_mut() {
                    subscriber.on_phase(self.turn, phase, &mut control);
                }
            }
            ran += 1;

            let room = self.max_queued_turns.saturating_sub(accepted_total);
            let accepted = control.requested.min(room);
            if accepted < control.requested {
                tracing::warn!(
                    turn = self.turn,
                    dropped = control.requested - accepted,
                    limit = self.max_queued_turns,
                    "queued turn requests dropped"
                );
            }
            accepted_total += accepted;
            pending += accepted;
        }

        tracing::debug!(turn = self.turn, ran, "turns advanced");
        ran
    }
}
