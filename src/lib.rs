//! # txscript
//!
//! Transaction script execution engine: the stack machine interpreting
//! locking and unlocking scripts, the consensus number encoding used by
//! arithmetic opcodes, the signature-hash algorithms binding signatures to
//! transaction data, rule-fork activation flags gating opcode behavior, and
//! coinbase-maturity validation of spends.
//!
//! All evaluation is pure and synchronous: no I/O, no storage, no interior
//! locking. Callers resolve spent outputs themselves and parallelize
//! across inputs; the only shared state is the read-only secp256k1
//! verification context.
//!
//! ## Usage
//!
//! ```rust
//! use txscript::forks::ForkRules;
//! use txscript::interpreter::verify_input;
//! use txscript::types::{OutPoint, Transaction, TransactionInput, TransactionOutput};
//!
//! let tx = Transaction {
//!     version: 2,
//!     inputs: vec![TransactionInput {
//!         prevout: OutPoint { hash: [0x11; 32], index: 0 },
//!         script_sig: vec![],
//!         sequence: 0xffff_fffe,
//!         witness: vec![],
//!     }],
//!     outputs: vec![TransactionOutput { value: 1000, script_pubkey: vec![0x51] }],
//!     lock_time: 0,
//! };
//!
//! // Spend an anyone-can-spend output under the full rule set.
//! verify_input(&tx, 0, &[0x51], 1000, ForkRules::ALL_RULES).unwrap();
//! ```

pub mod constants;
pub mod crypto;
pub mod error;
pub mod forks;
pub mod interpreter;
pub mod number;
pub mod opcodes;
pub mod prevout;
pub mod program;
pub mod script;
pub mod sighash;
pub mod types;

pub use crypto::initialize;
pub use error::{Result, ScriptError};
pub use forks::ForkRules;
pub use interpreter::verify_input;
pub use number::ScriptNum;
pub use prevout::{is_final, is_mature, verify_spend, PrevoutCache, PrevoutMetadata};
pub use program::Program;
pub use sighash::{compute_sighash, SighashType};
pub use types::{
    OutPoint, ScriptVersion, Transaction, TransactionInput, TransactionOutput,
};
