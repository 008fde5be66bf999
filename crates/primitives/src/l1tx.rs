//! Bit-exact codecs for the L1 transaction records that end up in the proof's
//! public input.
//!
//! These are packed by hand rather than derived, the off-chain prover depends
//! on the exact field order and widths.

use alloy_primitives::U256;
use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{
    buf::{Buf20, Buf32},
    constants::{L1_COORDINATOR_TOTALBYTES, L1_USER_TOTALBYTES, MAX_ACCOUNT_IDX},
    errors::ParseError,
    float16::Float16,
};

const IDX_BYTES: usize = 6;

/// An L1 request, as submitted by a user or expanded from a coordinator tx.
///
/// Layout (big endian): `[fromEthAddr:160][fromBjjCompressed:256][fromIdx:48]
/// [loadAmountF:16][amountF:16][tokenID:32][toIdx:48]`.
#[derive(
    Clone,
    Debug,
    Eq,
    PartialEq,
    Arbitrary,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct L1Tx {
    pub from_eth_addr: Buf20,
    pub from_bjj_compressed: Buf32,
    pub from_idx: u64,
    pub load_amount_f: Float16,
    pub amount_f: Float16,
    pub token_id: u32,
    pub to_idx: u64,
}

impl L1Tx {
    /// Decoded deposit amount.
    pub fn load_amount(&self) -> U256 {
        self.load_amount_f.to_fix()
    }

    /// Decoded transfer amount.
    pub fn amount(&self) -> U256 {
        self.amount_f.to_fix()
    }

    /// If the tx creates a new account for its sender.
    pub fn is_create_account(&self) -> bool {
        self.from_idx == 0
    }

    pub fn encode(&self) -> Result<[u8; L1_USER_TOTALBYTES], ParseError> {
        let mut out = [0u8; L1_USER_TOTALBYTES];
        let mut off = 0;

        put(&mut out, &mut off, self.from_eth_addr.as_slice());
        put(&mut out, &mut off, self.from_bjj_compressed.as_slice());
        put(&mut out, &mut off, &encode_idx(self.from_idx)?);
        put(&mut out, &mut off, &self.load_amount_f.raw().to_be_bytes());
        put(&mut out, &mut off, &self.amount_f.raw().to_be_bytes());
        put(&mut out, &mut off, &self.token_id.to_be_bytes());
        put(&mut out, &mut off, &encode_idx(self.to_idx)?);

        debug_assert_eq!(off, L1_USER_TOTALBYTES);
        Ok(out)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, ParseError> {
        if buf.len() != L1_USER_TOTALBYTES {
            return Err(ParseError::InvalidLength {
                expected: L1_USER_TOTALBYTES,
                got: buf.len(),
            });
        }

        let mut r = Reader::new(buf);
        Ok(Self {
            from_eth_addr: Buf20::from(r.array::<20>()),
            from_bjj_compressed: Buf32::from(r.array::<32>()),
            from_idx: r.idx(),
            load_amount_f: Float16::from_raw(u16::from_be_bytes(r.array::<2>())),
            amount_f: Float16::from_raw(u16::from_be_bytes(r.array::<2>())),
            token_id: u32::from_be_bytes(r.array::<4>()),
            to_idx: r.idx(),
        })
    }
}

/// Decodes a concatenation of L1 records, as stored in a queue slot.
pub fn decode_l1_txs(buf: &[u8]) -> Result<Vec<L1Tx>, ParseError> {
    check_aligned(buf, L1_USER_TOTALBYTES)?;
    buf.chunks_exact(L1_USER_TOTALBYTES)
        .map(L1Tx::decode)
        .collect()
}

/// Account creation tx injected by the coordinator.
///
/// Layout: `[v:8][r:256][s:256][bjj:256][tokenID:32]`.  A zero `v` means the
/// record carries no authorization signature.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct L1CoordinatorTx {
    pub v: u8,
    pub r: Buf32,
    pub s: Buf32,
    pub bjj_compressed: Buf32,
    pub token_id: u32,
}

impl L1CoordinatorTx {
    pub fn is_signed(&self) -> bool {
        self.v != 0
    }

    pub fn encode(&self) -> [u8; L1_COORDINATOR_TOTALBYTES] {
        let mut out = [0u8; L1_COORDINATOR_TOTALBYTES];
        let mut off = 0;
        put(&mut out, &mut off, &[self.v]);
        put(&mut out, &mut off, self.r.as_slice());
        put(&mut out, &mut off, self.s.as_slice());
        put(&mut out, &mut off, self.bjj_compressed.as_slice());
        put(&mut out, &mut off, &self.token_id.to_be_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, ParseError> {
        if buf.len() != L1_COORDINATOR_TOTALBYTES {
            return Err(ParseError::InvalidLength {
                expected: L1_COORDINATOR_TOTALBYTES,
                got: buf.len(),
            });
        }

        let mut r = Reader::new(buf);
        Ok(Self {
            v: r.array::<1>()[0],
            r: Buf32::from(r.array::<32>()),
            s: Buf32::from(r.array::<32>()),
            bjj_compressed: Buf32::from(r.array::<32>()),
            token_id: u32::from_be_bytes(r.array::<4>()),
        })
    }

    /// Expands into the full L1 record that enters the public input, with the
    /// sender resolved by the caller.
    pub fn to_l1_tx(&self, from_eth_addr: Buf20) -> L1Tx {
        L1Tx {
            from_eth_addr,
            from_bjj_compressed: self.bjj_compressed,
            from_idx: 0,
            load_amount_f: Float16::ZERO,
            amount_f: Float16::ZERO,
            token_id: self.token_id,
            to_idx: 0,
        }
    }
}

/// Decodes the coordinator tx blob passed to forge.
pub fn decode_coordinator_txs(buf: &[u8]) -> Result<Vec<L1CoordinatorTx>, ParseError> {
    check_aligned(buf, L1_COORDINATOR_TOTALBYTES)?;
    buf.chunks_exact(L1_COORDINATOR_TOTALBYTES)
        .map(L1CoordinatorTx::decode)
        .collect()
}

fn check_aligned(buf: &[u8], record: usize) -> Result<(), ParseError> {
    if buf.len() % record != 0 {
        return Err(ParseError::NotRecordAligned {
            len: buf.len(),
            record,
        });
    }
    Ok(())
}

fn encode_idx(idx: u64) -> Result<[u8; IDX_BYTES], ParseError> {
    if idx > MAX_ACCOUNT_IDX {
        return Err(ParseError::IdxOverflow(idx));
    }
    let mut out = [0u8; IDX_BYTES];
    out.copy_from_slice(&idx.to_be_bytes()[8 - IDX_BYTES..]);
    Ok(out)
}

fn put(out: &mut [u8], off: &mut usize, bytes: &[u8]) {
    out[*off..*off + bytes.len()].copy_from_slice(bytes);
    *off += bytes.len();
}

/// Cursor over a buffer whose length was already checked by the caller.
struct Reader<'a> {
    buf: &'a [u8],
    off: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, off: 0 }
    }

    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.off..self.off + N]);
        self.off += N;
        out
    }

    fn idx(&mut self) -> u64 {
        let mut be = [0u8; 8];
        be[8 - IDX_BYTES..].copy_from_slice(&self.array::<IDX_BYTES>());
        u64::from_be_bytes(be)
    }
}
