use proptest::prelude::*;
use reel_core::state_machine::{
    allowed_frame_transitions, allowed_phase_transitions, validate_frame_transition,
    validate_phase_transition,
};
use reel_core::{FrameState, Phase};

fn frame_state() -> impl Strategy<Value = FrameState> {
    prop_oneof![
        Just(FrameState::Pending),
        Just(FrameState::Generating),
        Just(FrameState::Completed),
        Just(FrameState::Failed),
    ]
}

fn phase() -> impl Strategy<Value = Phase> {
    prop_oneof![
        Just(Phase::Ideation),
        Just(Phase::Selection),
        Just(Phase::Generating),
        Just(Phase::Review),
    ]
}

#[test]
fn test_pending_transitions() {
    assert!(validate_frame_transition(FrameState::Pending, FrameState::Generating).is_ok());

    // No skipping straight to a terminal state
    assert!(validate_frame_transition(FrameState::Pending, FrameState::Completed).is_err());
    assert!(validate_frame_transition(FrameState::Pending, FrameState::Failed).is_err());
}

#[test]
fn test_terminal_states_are_final() {
    assert!(allowed_frame_transitions(FrameState::Completed).is_empty());
    assert!(allowed_frame_transitions(FrameState::Failed).is_empty());
    assert!(validate_frame_transition(FrameState::Failed, FrameState::Generating).is_err());
}

#[test]
fn test_phase_never_regresses() {
    assert!(validate_phase_transition(Phase::Review, Phase::Ideation).is_err());
    assert!(validate_phase_transition(Phase::Generating, Phase::Selection).is_err());
    assert!(validate_phase_transition(Phase::Selection, Phase::Review).is_err());
}

proptest! {
    #[test]
    fn prop_frame_transitions_match_allowed(from in frame_state(), to in frame_state()) {
        let res = validate_frame_transition(from, to);
        prop_assert_eq!(res.is_ok(), allowed_frame_transitions(from).contains(&to));
    }

    #[test]
    fn prop_frame_transitions_move_forward(from in frame_state(), to in frame_state()) {
        if validate_frame_transition(from, to).is_ok() {
            prop_assert!(!from.is_terminal());
            prop_assert_ne!(from, to);
        }
    }

    #[test]
    fn prop_phase_advances_one_step(from in phase(), to in phase()) {
        let ok = validate_phase_transition(from, to).is_ok();
        prop_assert_eq!(ok, allowed_phase_transitions(from).contains(&to));
        prop_assert_eq!(ok, to.step() == from.step() + 1);
    }
}
