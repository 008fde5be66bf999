//! Reusable utils for binaries and tests built on the settlement core, such
//! as initializing the tracing framework.

pub mod logging;
