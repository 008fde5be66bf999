//! Settlement state transitions: L1 intake, batch forging, withdrawals,
//! token listing and governance.

pub mod context;
pub mod errors;
pub mod forge;
pub mod governance;
pub mod instant_withdraw;
pub mod l1_user_tx;
pub mod public_input;
pub mod token_listing;
pub mod withdraw;
