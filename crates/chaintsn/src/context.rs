//! Interfaces to the context a call executes in and the collaborators it
//! talks to.

use alloy_primitives::U256;
#[cfg(test)]
use mockall::automock;
use settle_primitives::buf::Buf20;
use settle_state::tokens::TokenTable;

use crate::errors::ProviderResult;

/// Who is calling and at which block.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CallContext {
    pub caller: Buf20,
    pub block: u64,
}

impl CallContext {
    pub fn new(caller: Buf20, block: u64) -> Self {
        Self { caller, block }
    }
}

/// Decides who may forge at a given block.
#[cfg_attr(test, automock)]
pub trait ForgeAuthorizer {
    fn can_forge(&self, forger: &Buf20, block: u64) -> bool;
}

/// USD valuation of tokens.
#[cfg_attr(test, automock)]
pub trait ExchangeRateSource {
    /// Returns the USD rate, 10 decimal fixed point, and the token's
    /// decimals, or `None` if the token is unknown.
    fn token_rate(&self, token_id: u32) -> Option<(u64, u8)>;
}

impl ExchangeRateSource for TokenTable {
    fn token_rate(&self, token_id: u32) -> Option<(u64, u8)> {
        let entry = self.get(token_id)?;
        Some((self.exchange_rate(&entry.address), entry.decimals))
    }
}

/// Custody of the deposited funds.
#[cfg_attr(test, automock)]
pub trait TokenVault {
    /// Takes `amount` of `token` from `from` into custody.
    fn pull(&mut self, from: &Buf20, token: &Buf20, amount: U256) -> ProviderResult<()>;

    /// Releases `amount` of `token` from custody to `to`.
    fn push(&mut self, to: &Buf20, token: &Buf20, amount: U256) -> ProviderResult<()>;

    /// Moves `amount` of `token` between two accounts outside custody.
    fn transfer(&mut self, from: &Buf20, to: &Buf20, token: &Buf20, amount: U256)
        -> ProviderResult<()>;
}

/// Holds withdrawals that were not released instantly.
#[cfg_attr(test, automock)]
pub trait WithdrawalEscrow {
    fn deposit(&mut self, recipient: &Buf20, token: &Buf20, amount: U256) -> ProviderResult<()>;

    fn set_withdrawal_delay(&mut self, delay: u64) -> ProviderResult<()>;
}
