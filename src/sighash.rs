//! Signature hash computation
//!
//! Two algorithms, selected by script version. Legacy hashing serializes a
//! pruned copy of the transaction; its quirks (SINGLE past the outputs
//! yielding a constant digest, sequence zeroing) are consensus and are
//! reproduced exactly. Version-0 witness hashing (BIP143) commits to the
//! spent value and uses precomputed midstate digests with fixed field
//! order. Taproot outputs are recognized but their sighash is not
//! implemented here.

use crate::crypto::hash256;
use crate::error::{Result, ScriptError};
use crate::types::{ByteString, Hash, ScriptVersion, Transaction};

pub const SIGHASH_ALL: u8 = 0x01;
pub const SIGHASH_NONE: u8 = 0x02;
pub const SIGHASH_SINGLE: u8 = 0x03;
pub const SIGHASH_ANYONE_CAN_PAY: u8 = 0x80;

const BASE_MASK: u8 = 0x1f;

/// Digest standing in for a legacy SINGLE sighash with no matching output.
/// Signing this constant is the historical exploit; validation must accept
/// it to stay consensus-compatible.
const ONE_HASH: Hash = {
    let mut hash = [0u8; 32];
    hash[0] = 0x01;
    hash
};

const NULL_HASH: Hash = [0u8; 32];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SighashBase {
    All,
    None,
    Single,
}

/// Decomposed sighash byte: a base mode plus the anyone-can-pay flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SighashType {
    pub base: SighashBase,
    pub anyone_can_pay: bool,
}

impl SighashType {
    /// Any byte decomposes; unrecognized base values fall back to ALL,
    /// matching historical validation.
    pub fn from_byte(byte: u8) -> Self {
        let base = match byte & BASE_MASK {
            SIGHASH_NONE => SighashBase::None,
            SIGHASH_SINGLE => SighashBase::Single,
            _ => SighashBase::All,
        };
        SighashType {
            base,
            anyone_can_pay: byte & SIGHASH_ANYONE_CAN_PAY != 0,
        }
    }

    /// Strict-encoding check: base must be one of the three defined modes.
    pub fn is_defined(byte: u8) -> bool {
        matches!(
            byte & !SIGHASH_ANYONE_CAN_PAY,
            SIGHASH_ALL | SIGHASH_NONE | SIGHASH_SINGLE
        )
    }
}

/// Signature hash for one input, dispatched on script version.
pub fn compute_sighash(
    transaction: &Transaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    sighash_byte: u8,
    version: ScriptVersion,
) -> Result<Hash> {
    if input_index >= transaction.inputs.len() {
        return Err(ScriptError::InvalidStackOperation);
    }
    match version {
        ScriptVersion::Legacy => Ok(legacy_sighash(
            transaction,
            input_index,
            script_code,
            sighash_byte,
        )),
        ScriptVersion::WitnessV0 => Ok(version_0_sighash(
            transaction,
            input_index,
            script_code,
            value,
            sighash_byte,
        )),
        ScriptVersion::Taproot => Err(ScriptError::SighashUnavailable),
    }
}

/// Pre-witness signature hash: double SHA-256 over a pruned serialization
/// of the transaction with the signing input's script replaced by the
/// subscript, followed by the sighash byte widened to four bytes.
pub fn legacy_sighash(
    transaction: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_byte: u8,
) -> Hash {
    let sighash = SighashType::from_byte(sighash_byte);

    if sighash.base == SighashBase::Single && input_index >= transaction.outputs.len() {
        return ONE_HASH;
    }

    let mut preimage = Vec::with_capacity(256);
    write_u32(&mut preimage, transaction.version);

    // Inputs.
    if sighash.anyone_can_pay {
        write_varint(&mut preimage, 1);
        write_input(
            &mut preimage,
            transaction,
            input_index,
            Some(script_code),
            None,
        );
    } else {
        write_varint(&mut preimage, transaction.inputs.len() as u64);
        for index in 0..transaction.inputs.len() {
            let script = if index == input_index {
                Some(script_code)
            } else {
                None
            };
            // NONE and SINGLE release the other inputs' sequences so they
            // can be renegotiated without invalidating this signature.
            let sequence = if index != input_index
                && sighash.base != SighashBase::All
            {
                Some(0)
            } else {
                None
            };
            write_input(&mut preimage, transaction, index, script, sequence);
        }
    }

    // Outputs.
    match sighash.base {
        SighashBase::None => write_varint(&mut preimage, 0),
        SighashBase::Single => {
            write_varint(&mut preimage, input_index as u64 + 1);
            // Earlier outputs are blanked: maximal value, empty script.
            for _ in 0..input_index {
                write_u64(&mut preimage, u64::MAX);
                write_varint(&mut preimage, 0);
            }
            let paired = &transaction.outputs[input_index];
            write_u64(&mut preimage, paired.value);
            write_varint(&mut preimage, paired.script_pubkey.len() as u64);
            preimage.extend_from_slice(&paired.script_pubkey);
        }
        SighashBase::All => {
            write_varint(&mut preimage, transaction.outputs.len() as u64);
            for output in &transaction.outputs {
                write_u64(&mut preimage, output.value);
                write_varint(&mut preimage, output.script_pubkey.len() as u64);
                preimage.extend_from_slice(&output.script_pubkey);
            }
        }
    }

    write_u32(&mut preimage, transaction.lock_time);
    write_u32(&mut preimage, u32::from(sighash_byte));
    hash256(&preimage)
}

/// Double SHA-256 over every input outpoint, the BIP143 `hashPrevouts`
/// midstate before the anyone-can-pay exemption.
pub fn points_hash(transaction: &Transaction) -> Hash {
    let mut data = Vec::with_capacity(36 * transaction.inputs.len());
    for input in &transaction.inputs {
        data.extend_from_slice(&input.prevout.hash);
        write_u32(&mut data, input.prevout.index);
    }
    hash256(&data)
}

/// Double SHA-256 over every input sequence, the BIP143 `hashSequence`
/// midstate used only for base-ALL signatures.
pub fn sequences_hash(transaction: &Transaction) -> Hash {
    let mut data = Vec::with_capacity(4 * transaction.inputs.len());
    for input in &transaction.inputs {
        write_u32(&mut data, input.sequence);
    }
    hash256(&data)
}

/// Double SHA-256 over every output, the BIP143 `hashOutputs` midstate
/// used for base-ALL signatures.
pub fn outputs_hash(transaction: &Transaction) -> Hash {
    let mut data = Vec::new();
    for output in &transaction.outputs {
        write_u64(&mut data, output.value);
        write_varint(&mut data, output.script_pubkey.len() as u64);
        data.extend_from_slice(&output.script_pubkey);
    }
    hash256(&data)
}

/// The three transaction-wide midstates a version-0 signature hash draws
/// on. They depend only on the transaction, so compute them once and share
/// them across every input and every signature check of that transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionDigests {
    pub points: Hash,
    pub sequences: Hash,
    pub outputs: Hash,
}

impl TransactionDigests {
    pub fn new(transaction: &Transaction) -> Self {
        TransactionDigests {
            points: points_hash(transaction),
            sequences: sequences_hash(transaction),
            outputs: outputs_hash(transaction),
        }
    }
}

/// BIP143 version-0 witness signature hash. Fixed field order; absent
/// commitments are the zero digest, never omitted.
pub fn version_0_sighash(
    transaction: &Transaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    sighash_byte: u8,
) -> Hash {
    let digests = TransactionDigests::new(transaction);
    version_0_sighash_with(
        transaction,
        input_index,
        script_code,
        value,
        sighash_byte,
        &digests,
    )
}

/// Version-0 signature hash from precomputed transaction midstates.
pub fn version_0_sighash_with(
    transaction: &Transaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    sighash_byte: u8,
    digests: &TransactionDigests,
) -> Hash {
    let sighash = SighashType::from_byte(sighash_byte);
    let input = &transaction.inputs[input_index];

    let hash_prevouts = if sighash.anyone_can_pay {
        NULL_HASH
    } else {
        digests.points
    };

    let hash_sequences =
        if sighash.anyone_can_pay || sighash.base != SighashBase::All {
            NULL_HASH
        } else {
            digests.sequences
        };

    let hash_outputs = match sighash.base {
        SighashBase::All => digests.outputs,
        SighashBase::Single if input_index < transaction.outputs.len() => {
            let paired = &transaction.outputs[input_index];
            let mut data = Vec::with_capacity(9 + paired.script_pubkey.len());
            write_u64(&mut data, paired.value);
            write_varint(&mut data, paired.script_pubkey.len() as u64);
            data.extend_from_slice(&paired.script_pubkey);
            hash256(&data)
        }
        _ => NULL_HASH,
    };

    let mut preimage = Vec::with_capacity(156 + script_code.len());
    write_u32(&mut preimage, transaction.version);
    preimage.extend_from_slice(&hash_prevouts);
    preimage.extend_from_slice(&hash_sequences);
    preimage.extend_from_slice(&input.prevout.hash);
    write_u32(&mut preimage, input.prevout.index);
    write_varint(&mut preimage, script_code.len() as u64);
    preimage.extend_from_slice(script_code);
    write_u64(&mut preimage, value);
    write_u32(&mut preimage, input.sequence);
    preimage.extend_from_slice(&hash_outputs);
    write_u32(&mut preimage, transaction.lock_time);
    write_u32(&mut preimage, u32::from(sighash_byte));
    hash256(&preimage)
}

fn write_input(
    preimage: &mut ByteString,
    transaction: &Transaction,
    index: usize,
    script: Option<&[u8]>,
    sequence_override: Option<u32>,
) {
    let input = &transaction.inputs[index];
    preimage.extend_from_slice(&input.prevout.hash);
    write_u32(preimage, input.prevout.index);
    match script {
        Some(script) => {
            write_varint(preimage, script.len() as u64);
            preimage.extend_from_slice(script);
        }
        None => write_varint(preimage, 0),
    }
    write_u32(preimage, sequence_override.unwrap_or(input.sequence));
}

fn write_u32(buffer: &mut ByteString, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn write_u64(buffer: &mut ByteString, value: u64) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

/// Variable-length integer: the standard 1/3/5/9-byte wire form.
pub fn write_varint(buffer: &mut ByteString, value: u64) {
    if value < 0xfd {
        buffer.push(value as u8);
    } else if value <= 0xffff {
        buffer.push(0xfd);
        buffer.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        buffer.push(0xfe);
        buffer.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        buffer.push(0xff);
        buffer.extend_from_slice(&value.to_le_bytes());
    }
}
