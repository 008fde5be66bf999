//! In-memory stand-ins for the collaborators the state transitions call out
//! to.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::U256;
use settle_chaintsn::{
    context::{ForgeAuthorizer, TokenVault, WithdrawalEscrow},
    errors::{ProviderError, ProviderResult},
};
use settle_crypto::groth16::{Groth16Proof, ProofVerifier};
use settle_primitives::buf::Buf20;

/// Lets either everyone or a fixed set of addresses forge.
#[derive(Clone, Debug, Default)]
pub struct StubAuthorizer {
    forgers: Option<BTreeSet<Buf20>>,
}

impl StubAuthorizer {
    pub fn anyone() -> Self {
        Self { forgers: None }
    }

    pub fn only(forger: Buf20) -> Self {
        Self {
            forgers: Some(BTreeSet::from([forger])),
        }
    }
}

impl ForgeAuthorizer for StubAuthorizer {
    fn can_forge(&self, forger: &Buf20, _block: u64) -> bool {
        self.forgers.as_ref().map_or(true, |f| f.contains(forger))
    }
}

/// Rejects every proof.
#[derive(Copy, Clone, Debug, Default)]
pub struct RejectingVerifier;

impl ProofVerifier for RejectingVerifier {
    fn verify_proof(&self, _proof: &Groth16Proof, _public_input: &U256) -> bool {
        false
    }
}

/// Token balances of users and the rollup's custody.
#[derive(Clone, Debug, Default)]
pub struct InMemoryVault {
    balances: BTreeMap<(Buf20, Buf20), U256>,
    custody: BTreeMap<Buf20, U256>,
}

impl InMemoryVault {
    pub fn credit(&mut self, owner: Buf20, token: Buf20, amount: U256) {
        *self.balances.entry((owner, token)).or_default() += amount;
    }

    pub fn balance_of(&self, owner: &Buf20, token: &Buf20) -> U256 {
        self.balances
            .get(&(*owner, *token))
            .copied()
            .unwrap_or_default()
    }

    pub fn custody(&self, token: &Buf20) -> U256 {
        self.custody.get(token).copied().unwrap_or_default()
    }
}

impl TokenVault for InMemoryVault {
    fn pull(&mut self, from: &Buf20, token: &Buf20, amount: U256) -> ProviderResult<()> {
        let bal = self.balances.entry((*from, *token)).or_default();
        if *bal < amount {
            return Err(ProviderError::InsufficientBalance);
        }
        *bal -= amount;
        *self.custody.entry(*token).or_default() += amount;
        Ok(())
    }

    fn push(&mut self, to: &Buf20, token: &Buf20, amount: U256) -> ProviderResult<()> {
        let held = self.custody.entry(*token).or_default();
        if *held < amount {
            return Err(ProviderError::InsufficientBalance);
        }
        *held -= amount;
        *self.balances.entry((*to, *token)).or_default() += amount;
        Ok(())
    }

    fn transfer(
        &mut self,
        from: &Buf20,
        to: &Buf20,
        token: &Buf20,
        amount: U256,
    ) -> ProviderResult<()> {
        let bal = self.balances.entry((*from, *token)).or_default();
        if *bal < amount {
            return Err(ProviderError::InsufficientBalance);
        }
        *bal -= amount;
        *self.balances.entry((*to, *token)).or_default() += amount;
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EscrowDeposit {
    pub recipient: Buf20,
    pub token: Buf20,
    pub amount: U256,
}

/// Records delayed withdrawals instead of holding them.
#[derive(Clone, Debug, Default)]
pub struct InMemoryEscrow {
    pub deposits: Vec<EscrowDeposit>,
    pub delay: u64,
}

impl WithdrawalEscrow for InMemoryEscrow {
    fn deposit(&mut self, recipient: &Buf20, token: &Buf20, amount: U256) -> ProviderResult<()> {
        self.deposits.push(EscrowDeposit {
            recipient: *recipient,
            token: *token,
            amount,
        });
        Ok(())
    }

    fn set_withdrawal_delay(&mut self, delay: u64) -> ProviderResult<()> {
        self.delay = delay;
        Ok(())
    }
}
