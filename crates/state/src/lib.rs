//! Types making up the settlement core's persistent state.

pub mod account_idx;
pub mod batch;
pub mod bucket;
pub mod errors;
pub mod l1_queue;
pub mod nullifier;
pub mod rollup_state;
pub mod state_queue;
pub mod tokens;

pub mod prelude;
