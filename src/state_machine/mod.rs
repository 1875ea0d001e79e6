// Activation lifecycle state machine
//
// Tracks which branch of the activation flow the process took and rejects steps taken
// out of order, such as processing a background payload before its deferral is held.

pub mod activation_state_machine;
pub mod events;
pub mod states;

pub use activation_state_machine::{ActivationStateMachine, StateTransition};
pub use events::ActivationEvent;
pub use states::ActivationState;
