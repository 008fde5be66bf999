//! Collection of generic internal data types that are used widely across the
//! settlement core.

pub mod buf;
pub mod constants;
pub mod errors;
pub mod float16;
pub mod hash;
pub mod l1tx;
pub mod params;

pub mod prelude;
