// Commitment Lifecycle Module - per-commitment state machine
//
// One automaton per commitment, fed in turn order. Legality and authorization
// are decided by `advance`; the commitment records the outcome.

pub mod state_machine;
pub mod types;

pub use state_machine::{advance, replay, AuthorizationPolicy, Transition};
pub use types::{Commitment, CommitmentState, OpenQuestion};
