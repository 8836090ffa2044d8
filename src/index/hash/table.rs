mod base;
mod operations;
mod resize;

pub use base::{DefaultKeyOps, KeyOps, LinearProbeHashTable};
