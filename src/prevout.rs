//! Previous-output metadata, coinbase maturity, and finality
//!
//! The engine does not own a chain database. Callers resolve each spent
//! outpoint to a `PrevoutMetadata` record (typically held in a
//! `PrevoutCache` side table) and hand it in; only the coinbase flag and
//! height feed consensus, the remaining flags are advisory bookkeeping for
//! the caller's own spend tracking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{COINBASE_MATURITY, LOCKTIME_THRESHOLD, SEQUENCE_FINAL};
use crate::error::{Result, ScriptError};
use crate::forks::ForkRules;
use crate::interpreter;
use crate::types::{OutPoint, Transaction, TransactionOutput};

/// What the caller knows about one spendable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrevoutMetadata {
    /// The output being spent: locking script and value.
    pub output: TransactionOutput,
    /// Created by a coinbase transaction (maturity applies).
    pub coinbase: bool,
    /// Height of the block that confirmed the creating transaction.
    pub height: u64,
    /// Median time past of that block.
    pub median_time_past: u32,
    /// Already spent by a confirmed transaction.
    pub spent: bool,
    /// Spent by a candidate (unconfirmed) transaction.
    pub candidate: bool,
    /// The creating transaction is confirmed.
    pub confirmed: bool,
}

/// Caller-owned side table keyed by outpoint.
pub type PrevoutCache = HashMap<OutPoint, PrevoutMetadata>;

/// Coinbase maturity check.
///
/// Non-coinbase outputs and null outpoints (the spending transaction's own
/// coinbase input) are always mature. The depth subtraction floors at zero
/// so a stale cached height above the spending height can never wrap into
/// an accepted spend.
pub fn is_mature(
    outpoint: &OutPoint,
    metadata: &PrevoutMetadata,
    spending_height: u64,
) -> bool {
    if !metadata.coinbase || outpoint.is_null() {
        return true;
    }
    spending_height.saturating_sub(metadata.height) >= COINBASE_MATURITY
}

/// Locktime finality at a given height and time.
///
/// Under BIP113 the caller passes the chain's median time past as `time`;
/// before activation, the block timestamp.
pub fn is_final(transaction: &Transaction, height: u64, time: u32) -> bool {
    if transaction.lock_time == 0 {
        return true;
    }

    let bound = if transaction.lock_time < LOCKTIME_THRESHOLD {
        height
    } else {
        u64::from(time)
    };
    if u64::from(transaction.lock_time) < bound {
        return true;
    }

    // A locked transaction is still final when every input opted out.
    transaction
        .inputs
        .iter()
        .all(|input| input.sequence == SEQUENCE_FINAL)
}

pub fn check_finality(transaction: &Transaction, height: u64, time: u32) -> Result<()> {
    if !is_final(transaction, height, time) {
        return Err(ScriptError::NonFinal);
    }
    Ok(())
}

/// Full validation of one input: maturity of the spent output, then script
/// verification against its locking script and value.
pub fn verify_spend(
    transaction: &Transaction,
    input_index: usize,
    metadata: &PrevoutMetadata,
    spending_height: u64,
    forks: ForkRules,
) -> Result<()> {
    if input_index >= transaction.inputs.len() {
        return Err(ScriptError::InvalidStackOperation);
    }
    let input = &transaction.inputs[input_index];

    if !is_mature(&input.prevout, metadata, spending_height) {
        return Err(ScriptError::ImmatureSpend);
    }

    interpreter::verify_input(
        transaction,
        input_index,
        &metadata.output.script_pubkey,
        metadata.output.value,
        forks,
    )
}
