//! Registered tokens and their governance-set USD exchange rates.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use settle_primitives::{buf::Buf20, constants::ETHER_DECIMALS};

use crate::errors::StateError;

/// Highest token id the 32-bit token field can carry.
const MAX_TOKENS: usize = u32::MAX as usize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct TokenEntry {
    pub address: Buf20,
    pub decimals: u8,
}

/// Token list indexed by token id, id 0 being the native asset.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct TokenTable {
    tokens: Vec<TokenEntry>,

    /// USD price per whole token, 10 decimal fixed point.  Keyed by address
    /// so rates can be set before a token is registered.
    exchange_rates: BTreeMap<Buf20, u64>,
}

impl Default for TokenTable {
    fn default() -> Self {
        Self {
            tokens: vec![TokenEntry {
                address: Buf20::zero(),
                decimals: ETHER_DECIMALS,
            }],
            exchange_rates: BTreeMap::new(),
        }
    }
}

impl TokenTable {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, token_id: u32) -> Option<&TokenEntry> {
        self.tokens.get(token_id as usize)
    }

    pub fn is_registered(&self, token_id: u32) -> bool {
        (token_id as usize) < self.tokens.len()
    }

    pub fn id_of(&self, address: &Buf20) -> Option<u32> {
        self.tokens
            .iter()
            .position(|t| &t.address == address)
            .map(|i| i as u32)
    }

    /// Checks a token could be registered, returning the id it would get.
    pub fn check_register(&self, entry: &TokenEntry) -> Result<u32, StateError> {
        if self.id_of(&entry.address).is_some() {
            return Err(StateError::TokenAlreadyRegistered(entry.address));
        }
        if self.tokens.len() >= MAX_TOKENS {
            return Err(StateError::TooManyTokens);
        }
        Ok(self.tokens.len() as u32)
    }

    /// Registers a token, returning its id.
    pub fn register(&mut self, entry: TokenEntry) -> Result<u32, StateError> {
        self.check_register(&entry)?;
        self.tokens.push(entry);
        Ok(self.tokens.len() as u32 - 1)
    }

    pub fn exchange_rate(&self, address: &Buf20) -> u64 {
        self.exchange_rates.get(address).copied().unwrap_or(0)
    }

    pub fn set_exchange_rate(&mut self, address: Buf20, rate: u64) {
        self.exchange_rates.insert(address, rate);
    }
}
