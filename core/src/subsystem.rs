//! Stage trait.
//!
//! RULE: Every production stage implements SimSubsystem.
//! The engine calls update() on each registered stage
//! in registration order, every unpaused frame.
//! Execution order is fixed and documented in engine.rs.

use crate::{
    error::SimResult,
    event::SimEvent,
    rng::SubsystemRng,
    state::GameState,
    types::Millis,
};

/// The contract every stage must fulfill.
pub trait SimSubsystem: Send {
    /// Unique stable name, recorded as the event source.
    fn name(&self) -> &'static str;

    /// Called once per frame by the engine.
    ///
    /// - `state`: the aggregate root, mutated in place
    /// - `now`:   the frame's timestamp (frozen while paused)
    /// - `rng`:   this stage's deterministic RNG for this frame
    ///
    /// Returns the events this stage produced.
    fn update(
        &mut self,
        state: &mut GameState,
        now: Millis,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>>;
}
