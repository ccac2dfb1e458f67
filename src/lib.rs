pub mod blocks;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod reimburse;
pub mod staking;

#[cfg(test)]
mod testutil;
