//! Confirmation-time estimates. Pure and deterministic: no network access.

use crate::chains::{ChainConfig, ChainType};
use crate::types::{FeeCandidate, RawUnits};

/// Typical inclusion time on a rollup sequencer.
pub const ROLLUP_CONFIRMATION_SECS: u64 = 2;

/// Slot-level confirmation on account-model chains.
pub const ACCOUNT_MODEL_CONFIRMATION_SECS: u64 = 1;

/// Ledger close time on XRP / Stellar style networks.
pub const LEDGER_CONFIRMATION_SECS: u64 = 5;

const UTXO_FAST_BLOCKS: u64 = 1;
const UTXO_MEDIUM_BLOCKS: u64 = 3;
const UTXO_SLOW_BLOCKS: u64 = 6;

/// Blocks an EVM transfer priced at the current gas price waits on average.
const EVM_BLOCKS: u64 = 2;

/// Expected seconds until the chosen candidate's transaction confirms.
pub fn calc_speed(chain: &ChainConfig, candidate: &FeeCandidate) -> u64 {
    let block_time = chain.aux.block_time_secs;
    match chain.chain_type {
        ChainType::Utxo => utxo_blocks(chain, &candidate.raw_units) * block_time,
        ChainType::Evm => EVM_BLOCKS * block_time,
        ChainType::Rollup => ROLLUP_CONFIRMATION_SECS,
        ChainType::AccountModel => ACCOUNT_MODEL_CONFIRMATION_SECS,
        ChainType::Ledger => LEDGER_CONFIRMATION_SECS,
    }
}

fn utxo_blocks(chain: &ChainConfig, raw_units: &RawUnits) -> u64 {
    match raw_units {
        RawUnits::FeeRate(rate) if *rate >= chain.aux.fast_fee_rate => UTXO_FAST_BLOCKS,
        RawUnits::FeeRate(rate) if *rate >= chain.aux.mid_fee_rate => UTXO_MEDIUM_BLOCKS,
        RawUnits::FeeRate(_) => UTXO_SLOW_BLOCKS,
        // Synthesized fees carry no rate; assume the middle tier.
        _ => UTXO_MEDIUM_BLOCKS,
    }
}
