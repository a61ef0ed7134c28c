// cliprate/src/commands/mod.rs

pub mod check;
pub mod export;
pub mod sample;
pub mod stats;
