//! Frame and phase state machines
//!
//! Frames: `Pending -> Generating -> {Completed | Failed}`, one shot, no cycles.
//! Phases: `Ideation -> Selection -> Generating -> Review`, never regress.

use crate::error::StateError;
use crate::types::{FrameState, Phase};

/// Validates a frame state transition.
pub fn validate_frame_transition(from: FrameState, to: FrameState) -> Result<(), StateError> {
    if allowed_frame_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateError::IllegalFrameTransition { from, to })
    }
}

pub fn allowed_frame_transitions(from: FrameState) -> Vec<FrameState> {
    use FrameState::*;
    match from {
        Pending => vec![Generating],
        Generating => vec![Completed, Failed],
        Completed => vec![],
        Failed => vec![],
    }
}

/// Validates a phase transition.
pub fn validate_phase_transition(from: Phase, to: Phase) -> Result<(), StateError> {
    if allowed_phase_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateError::IllegalPhaseTransition { from, to })
    }
}

pub fn allowed_phase_transitions(from: Phase) -> Vec<Phase> {
    use Phase::*;
    match from {
        Ideation => vec![Selection],
        Selection => vec![Generating],
        Generating => vec![Review],
        Review => vec![],
    }
}
