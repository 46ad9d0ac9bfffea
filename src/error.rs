//! Error types for script validation
//!
//! Every failure on attacker-controlled input is returned as a typed value;
//! the engine never panics on malformed scripts or signatures. Callers treat
//! any of these uniformly as "this input is invalid" but may log the kind.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptError {
    // Malformed script.
    #[error("push opcode exceeds remaining script bytes")]
    MalformedPush,

    #[error("script exceeds maximum size")]
    ScriptSize,

    #[error("invalid opcode for context")]
    BadOpcode,

    // Disabled or reserved opcodes.
    #[error("disabled opcode present in script")]
    DisabledOpcode,

    #[error("reserved opcode executed")]
    ReservedOpcode,

    // Stack violations.
    #[error("stack operation on too few elements")]
    InvalidStackOperation,

    #[error("alternate stack operation on empty stack")]
    InvalidAltStackOperation,

    #[error("stack element count exceeds maximum")]
    StackSize,

    #[error("pushed element exceeds maximum size")]
    PushSize,

    #[error("executed operation count exceeds maximum")]
    OpCount,

    #[error("ELSE or ENDIF without matching IF, or unclosed IF")]
    UnbalancedConditional,

    // Numeric failures.
    #[error("number encoding is not minimal")]
    MinimalData,

    #[error("number exceeds maximum encoded width")]
    NumberOverflow,

    // Verify-family and terminal failures.
    #[error("VERIFY failed")]
    Verify,

    #[error("EQUALVERIFY failed")]
    EqualVerify,

    #[error("CHECKSIGVERIFY failed")]
    CheckSigVerify,

    #[error("CHECKMULTISIGVERIFY failed")]
    CheckMultisigVerify,

    #[error("NUMEQUALVERIFY failed")]
    NumEqualVerify,

    #[error("OP_RETURN executed")]
    OpReturn,

    #[error("script completed with a false stack top")]
    EvalFalse,

    // Signature and key encoding (policy/consensus gates).
    #[error("signature is not strict DER")]
    SigDer,

    #[error("signature uses high S value")]
    SigHighS,

    #[error("malformed sighash flags")]
    SigHashType,

    #[error("public key is not validly encoded")]
    PubKeyType,

    #[error("CHECKMULTISIG dummy element not null")]
    NullDummy,

    #[error("failed signature was not null")]
    NullFail,

    #[error("unlocking script is not push-only")]
    SigPushOnly,

    #[error("multisig signature count out of range")]
    SigCount,

    #[error("multisig public key count out of range")]
    PubKeyCount,

    // Locktime opcodes.
    #[error("locktime operand is negative")]
    NegativeLocktime,

    #[error("locktime requirement not satisfied")]
    UnsatisfiedLocktime,

    // Witness dispatch.
    #[error("stack not clean after evaluation")]
    CleanStack,

    #[error("witness program hash mismatch")]
    WitnessProgramMismatch,

    #[error("witness program has wrong length")]
    WitnessProgramWrongLength,

    #[error("witness v0 spend carries a non-empty unlocking script")]
    WitnessMalleated,

    #[error("witness present for a non-witness output")]
    WitnessUnexpected,

    #[error("unknown witness version discouraged by policy")]
    DiscourageUpgradableWitness,

    #[error("no sighash algorithm for this script version")]
    SighashUnavailable,

    // Maturity and finality (distinct from script evaluation).
    #[error("coinbase output spent before maturity")]
    ImmatureSpend,

    #[error("transaction is not final at this height/time")]
    NonFinal,
}

pub type Result<T> = std::result::Result<T, ScriptError>;
