pub use crate::{
    buf::{Buf20, Buf32},
    float16::Float16,
    l1tx::{L1CoordinatorTx, L1Tx},
    params::{RollupParams, VerifierParams},
};
