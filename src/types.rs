//! Core transaction types consumed by the script engine
//!
//! These are the read-only views the interpreter needs: parsed transactions
//! with inputs, outputs, and witness stacks. Wire (de)serialization of these
//! containers belongs to the network layer, not here.

use serde::{Deserialize, Serialize};

use crate::constants::NULL_OUTPUT_INDEX;

/// 256-bit hash
pub type Hash = [u8; 32];

/// Byte string type; stack values are opaque byte strings interpreted
/// contextually as numbers, booleans, or raw data
pub type ByteString = Vec<u8>;

/// Witness stack: the segregated data carrying signatures/scripts outside
/// the legacy transaction body
pub type Witness = Vec<ByteString>;

/// Reference to a previous transaction output: (tx hash, output index)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: u32,
}

impl OutPoint {
    /// The null outpoint marks the coinbase input of a transaction.
    pub fn null() -> Self {
        OutPoint {
            hash: [0u8; 32],
            index: NULL_OUTPUT_INDEX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.index == NULL_OUTPUT_INDEX && self.hash == [0u8; 32]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub script_sig: ByteString,
    pub sequence: u32,
    /// Empty for non-witness inputs.
    #[serde(default)]
    pub witness: Witness,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: u64,
    pub script_pubkey: ByteString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// A coinbase transaction has exactly one input with a null prevout.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prevout.is_null()
    }
}

/// Script version for the input being verified, resolved once at program
/// construction and selecting both the sighash algorithm and the opcode
/// behavior variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptVersion {
    /// Legacy and P2SH scripts
    Legacy,
    /// Witness v0 (P2WPKH/P2WSH, BIP141/BIP143)
    WitnessV0,
    /// Witness v1 taproot; recognized but not executed by this engine
    Taproot,
}
