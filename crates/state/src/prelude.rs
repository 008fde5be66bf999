pub use crate::{
    batch::BatchRecord,
    bucket::{Bucket, BucketSet},
    l1_queue::{L1TxQueue, QueuePosition},
    nullifier::{ExitAccumulator, ExitNullifiers},
    rollup_state::{GenesisStateConfig, RollupState},
    state_queue::StateQueue,
};
