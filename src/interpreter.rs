//! Opcode execution and input verification
//!
//! `run` executes one script against a `Program`; `verify_input` is the
//! public entry that chains the unlocking script, locking script, and the
//! P2SH / witness-v0 dispatch on top of it. Version-gated opcodes consult
//! the program's fork rules and fall back to their pre-fork semantics when
//! the relevant bit is unset.

use crate::constants::{
    LOCKTIME_THRESHOLD, MAX_LOCKTIME_NUMBER_SIZE, MAX_MULTISIG_KEYS,
    MAX_NUMBER_SIZE, MAX_SCRIPT_ELEMENT_SIZE, SEQUENCE_DISABLE_FLAG,
    SEQUENCE_FINAL, SEQUENCE_LOCKTIME_MASK, SEQUENCE_TYPE_FLAG,
    WITNESS_V0_KEYHASH_SIZE, WITNESS_V0_SCRIPTHASH_SIZE,
};
use crate::crypto;
use crate::error::{Result, ScriptError};
use crate::forks::ForkRules;
use crate::number::ScriptNum;
use crate::opcodes::*;
use crate::program::{stack_true, Program};
use crate::script::{self, Operation};
use crate::sighash;
use crate::types::{ByteString, ScriptVersion, Transaction};

/// Execute every operation of the program's script.
///
/// Returns Ok when the script ran to completion with balanced
/// conditionals; the caller judges the resulting stack.
pub fn run(program: &mut Program) -> Result<()> {
    let ops = program.operations().to_vec();

    for (index, op) in ops.iter().enumerate() {
        if op.data.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptError::PushSize);
        }
        if is_disabled(op.code) {
            return Err(ScriptError::DisabledOpcode);
        }
        if is_invalid_unexecuted(op.code) {
            return Err(ScriptError::BadOpcode);
        }

        let executing = program.is_executing();
        if !executing && !is_conditional(op.code) {
            continue;
        }

        // Only executed non-push operations tick toward the ceiling; a
        // conditional op inside a skipped branch is processed for balance
        // but not counted.
        if executing && is_counted(op.code) {
            program.count_operation()?;
        }

        execute(program, op, index, executing)?;
        program.check_stack_size()?;
    }

    if !program.is_balanced() {
        return Err(ScriptError::UnbalancedConditional);
    }
    Ok(())
}

fn execute(
    program: &mut Program,
    op: &Operation,
    index: usize,
    executing: bool,
) -> Result<()> {
    // Conditional flow runs even in skipped branches to keep nesting
    // balanced; a nested IF in a skipped branch opens an unexecuted scope
    // without touching the stack.
    if is_conditional(op.code) {
        match op.code {
            OP_IF | OP_NOTIF => {
                if executing {
                    let value = program.pop_bool()?;
                    program.begin_if(value != (op.code == OP_NOTIF));
                } else {
                    program.begin_if(false);
                }
            }
            OP_ELSE => program.else_if()?,
            _ => program.end_if()?,
        }
        return Ok(());
    }

    if op.is_push() {
        if program.require_minimal() && !op.is_minimal_push() {
            return Err(ScriptError::MinimalData);
        }
        program.push(op.data.clone());
        return Ok(());
    }

    match op.code {
        OP_1NEGATE => program.push_number(ScriptNum::new(-1)),
        OP_1..=OP_16 => {
            program.push_number(ScriptNum::new(i64::from(op.code - OP_N_BASE)))
        }

        OP_NOP | OP_NOP1 | OP_NOP4..=OP_NOP10 => {}

        OP_VER | OP_RESERVED | OP_RESERVED1 | OP_RESERVED2 => {
            return Err(ScriptError::ReservedOpcode)
        }

        OP_VERIFY => {
            if !program.pop_bool()? {
                return Err(ScriptError::Verify);
            }
        }
        OP_RETURN => return Err(ScriptError::OpReturn),

        OP_TOALTSTACK => {
            let element = program.pop()?;
            program.push_alternate(element);
        }
        OP_FROMALTSTACK => {
            let element = program.pop_alternate()?;
            program.push(element);
        }

        OP_2DROP => {
            program.pop()?;
            program.pop()?;
        }
        OP_2DUP => {
            program.require_depth(2)?;
            let a = program.peek(1)?.clone();
            let b = program.peek(0)?.clone();
            program.push(a);
            program.push(b);
        }
        OP_3DUP => {
            program.require_depth(3)?;
            let a = program.peek(2)?.clone();
            let b = program.peek(1)?.clone();
            let c = program.peek(0)?.clone();
            program.push(a);
            program.push(b);
            program.push(c);
        }
        OP_2OVER => {
            program.require_depth(4)?;
            let a = program.peek(3)?.clone();
            let b = program.peek(2)?.clone();
            program.push(a);
            program.push(b);
        }
        OP_2ROT => {
            let a = program.remove(5)?;
            let b = program.remove(4)?;
            program.push(a);
            program.push(b);
        }
        OP_2SWAP => {
            let a = program.remove(3)?;
            let b = program.remove(2)?;
            program.push(a);
            program.push(b);
        }
        OP_IFDUP => {
            let top = program.peek(0)?.clone();
            if stack_true(&top) {
                program.push(top);
            }
        }
        OP_DEPTH => {
            program.push_number(ScriptNum::new(program.stack_size() as i64))
        }
        OP_DROP => {
            program.pop()?;
        }
        OP_DUP => {
            let top = program.peek(0)?.clone();
            program.push(top);
        }
        OP_NIP => {
            program.remove(1)?;
        }
        OP_OVER => {
            let second = program.peek(1)?.clone();
            program.push(second);
        }
        OP_PICK | OP_ROLL => {
            let depth = program.pop_number(MAX_NUMBER_SIZE)?.to_i64();
            if depth < 0 || depth as usize >= program.stack_size() {
                return Err(ScriptError::InvalidStackOperation);
            }
            let element = if op.code == OP_PICK {
                program.peek(depth as usize)?.clone()
            } else {
                program.remove(depth as usize)?
            };
            program.push(element);
        }
        OP_ROT => {
            let third = program.remove(2)?;
            program.push(third);
        }
        OP_SWAP => {
            let second = program.remove(1)?;
            program.push(second);
        }
        OP_TUCK => {
            let top = program.pop()?;
            let second = program.pop()?;
            program.push(top.clone());
            program.push(second);
            program.push(top);
        }

        OP_SIZE => {
            let size = program.peek(0)?.len();
            program.push_number(ScriptNum::new(size as i64));
        }

        OP_EQUAL | OP_EQUALVERIFY => {
            let a = program.pop()?;
            let b = program.pop()?;
            let equal = a == b;
            if op.code == OP_EQUALVERIFY {
                if !equal {
                    return Err(ScriptError::EqualVerify);
                }
            } else {
                program.push_bool(equal);
            }
        }

        OP_1ADD | OP_1SUB | OP_NEGATE | OP_ABS | OP_NOT | OP_0NOTEQUAL => {
            let operand = program.pop_number(MAX_NUMBER_SIZE)?.to_i64();
            let result = match op.code {
                OP_1ADD => operand + 1,
                OP_1SUB => operand - 1,
                OP_NEGATE => -operand,
                OP_ABS => operand.abs(),
                OP_NOT => i64::from(operand == 0),
                _ => i64::from(operand != 0),
            };
            program.push_number(ScriptNum::new(result));
        }

        OP_ADD | OP_SUB | OP_BOOLAND | OP_BOOLOR | OP_NUMEQUAL
        | OP_NUMEQUALVERIFY | OP_NUMNOTEQUAL | OP_LESSTHAN | OP_GREATERTHAN
        | OP_LESSTHANOREQUAL | OP_GREATERTHANOREQUAL | OP_MIN | OP_MAX => {
            let right = program.pop_number(MAX_NUMBER_SIZE)?.to_i64();
            let left = program.pop_number(MAX_NUMBER_SIZE)?.to_i64();
            let result = match op.code {
                OP_ADD => left + right,
                OP_SUB => left - right,
                OP_BOOLAND => i64::from(left != 0 && right != 0),
                OP_BOOLOR => i64::from(left != 0 || right != 0),
                OP_NUMEQUAL => i64::from(left == right),
                OP_NUMEQUALVERIFY => {
                    if left != right {
                        return Err(ScriptError::NumEqualVerify);
                    }
                    return Ok(());
                }
                OP_NUMNOTEQUAL => i64::from(left != right),
                OP_LESSTHAN => i64::from(left < right),
                OP_GREATERTHAN => i64::from(left > right),
                OP_LESSTHANOREQUAL => i64::from(left <= right),
                OP_GREATERTHANOREQUAL => i64::from(left >= right),
                OP_MIN => left.min(right),
                _ => left.max(right),
            };
            program.push_number(ScriptNum::new(result));
        }

        OP_WITHIN => {
            let upper = program.pop_number(MAX_NUMBER_SIZE)?.to_i64();
            let lower = program.pop_number(MAX_NUMBER_SIZE)?.to_i64();
            let value = program.pop_number(MAX_NUMBER_SIZE)?.to_i64();
            program.push_bool(lower <= value && value < upper);
        }

        OP_RIPEMD160 => {
            let data = program.pop()?;
            program.push(crypto::ripemd160(&data).to_vec());
        }
        OP_SHA1 => {
            let data = program.pop()?;
            program.push(crypto::sha1(&data).to_vec());
        }
        OP_SHA256 => {
            let data = program.pop()?;
            program.push(crypto::sha256(&data).to_vec());
        }
        OP_HASH160 => {
            let data = program.pop()?;
            program.push(crypto::hash160(&data).to_vec());
        }
        OP_HASH256 => {
            let data = program.pop()?;
            program.push(crypto::hash256(&data).to_vec());
        }

        OP_CODESEPARATOR => program.jump = index + 1,

        OP_CHECKSIG | OP_CHECKSIGVERIFY => {
            let key = program.pop()?;
            let endorsement = program.pop()?;
            let code = script_code(program, &[endorsement.as_slice()]);
            let valid = check_signature(program, &endorsement, &key, &code)?;
            if op.code == OP_CHECKSIGVERIFY {
                if !valid {
                    return Err(ScriptError::CheckSigVerify);
                }
            } else {
                if !valid
                    && program.forks().is_enabled(ForkRules::BIP147)
                    && !endorsement.is_empty()
                {
                    return Err(ScriptError::NullFail);
                }
                program.push_bool(valid);
            }
        }

        OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
            let valid = check_multisig(program)?;
            if op.code == OP_CHECKMULTISIGVERIFY {
                if !valid {
                    return Err(ScriptError::CheckMultisigVerify);
                }
            } else {
                program.push_bool(valid);
            }
        }

        OP_CHECKLOCKTIMEVERIFY => check_locktime(program)?,
        OP_CHECKSEQUENCEVERIFY => check_sequence(program)?,

        _ => return Err(ScriptError::BadOpcode),
    }

    Ok(())
}

/// The serialized script a signature commits to: operations from the last
/// executed CODESEPARATOR, with legacy runs additionally stripping the
/// endorsements and remaining CODESEPARATOR ops.
fn script_code(program: &Program, endorsements: &[&[u8]]) -> ByteString {
    match program.version() {
        ScriptVersion::Legacy => {
            script::to_bytes(&script::strip_for_signing(program.subscript(), endorsements))
        }
        _ => script::to_bytes(program.subscript()),
    }
}

/// Shared signature path for CHECKSIG and each CHECKMULTISIG candidate.
/// Encoding violations are hard errors under the relevant rules; a parse
/// failure outside strict mode is a clean false. `code` is the serialized
/// script the signature commits to, already stripped for legacy runs.
fn check_signature(
    program: &Program,
    endorsement: &[u8],
    key: &[u8],
    code: &[u8],
) -> Result<bool> {
    if endorsement.is_empty() {
        return Ok(false);
    }

    let forks = program.forks();
    let strict = forks.is_enabled(ForkRules::BIP66);
    let (der, sighash_byte) = endorsement.split_at(endorsement.len() - 1);
    let sighash_byte = sighash_byte[0];

    if strict && !sighash::SighashType::is_defined(sighash_byte) {
        return Err(ScriptError::SigHashType);
    }
    if strict && !crypto::is_strict_public_key(key) {
        return Err(ScriptError::PubKeyType);
    }

    let signature = match crypto::parse_signature(der, strict) {
        Ok(signature) => signature,
        Err(error) if strict => return Err(error),
        Err(_) => return Ok(false),
    };

    if forks.is_enabled(ForkRules::BIP62) && !crypto::is_low_s(&signature) {
        return Err(ScriptError::SigHighS);
    }

    let digest = match program.version() {
        ScriptVersion::Legacy => sighash::legacy_sighash(
            program.transaction(),
            program.input_index(),
            code,
            sighash_byte,
        ),
        ScriptVersion::WitnessV0 => sighash::version_0_sighash_with(
            program.transaction(),
            program.input_index(),
            code,
            program.value(),
            sighash_byte,
            program.transaction_digests(),
        ),
        ScriptVersion::Taproot => return Err(ScriptError::SighashUnavailable),
    };

    Ok(crypto::verify_signature(&signature, key, &digest))
}

fn check_multisig(program: &mut Program) -> Result<bool> {
    let key_count = program.pop_number(MAX_NUMBER_SIZE)?.to_i64();
    if key_count < 0 || key_count as usize > MAX_MULTISIG_KEYS {
        return Err(ScriptError::PubKeyCount);
    }
    let key_count = key_count as usize;
    program.count_multisig_keys(key_count)?;

    let mut keys = Vec::with_capacity(key_count);
    for _ in 0..key_count {
        keys.push(program.pop()?);
    }

    let signature_count = program.pop_number(MAX_NUMBER_SIZE)?.to_i64();
    if signature_count < 0 || signature_count as usize > key_count {
        return Err(ScriptError::SigCount);
    }
    let signature_count = signature_count as usize;

    let mut endorsements = Vec::with_capacity(signature_count);
    for _ in 0..signature_count {
        endorsements.push(program.pop()?);
    }

    // The historical off-by-one: one extra element is consumed and, under
    // BIP147, must be empty.
    let dummy = program.pop()?;
    if program.forks().is_enabled(ForkRules::BIP147) && !dummy.is_empty() {
        return Err(ScriptError::NullDummy);
    }

    // Every endorsement is stripped from the legacy script code, matching
    // how the signatures were produced.
    let endorsement_refs: Vec<&[u8]> =
        endorsements.iter().map(|endorsement| endorsement.as_slice()).collect();
    let code = script_code(program, &endorsement_refs);

    // Signatures must appear in key order; each key is tried at most once.
    let mut key_iter = keys.iter();
    let mut matched = 0usize;
    for endorsement in &endorsements {
        let mut found = false;
        for key in key_iter.by_ref() {
            if check_signature(program, endorsement, key, &code)? {
                found = true;
                break;
            }
        }
        if !found {
            break;
        }
        matched += 1;
    }

    let valid = matched == signature_count;
    if !valid
        && program.forks().is_enabled(ForkRules::BIP147)
        && endorsements.iter().any(|endorsement| !endorsement.is_empty())
    {
        return Err(ScriptError::NullFail);
    }
    Ok(valid)
}

/// BIP65 CHECKLOCKTIMEVERIFY. The operand stays on the stack; failure is a
/// script failure, success a no-op.
fn check_locktime(program: &mut Program) -> Result<()> {
    if !program.forks().is_enabled(ForkRules::BIP65) {
        return Ok(());
    }

    let operand = ScriptNum::decode(
        program.peek(0)?,
        MAX_LOCKTIME_NUMBER_SIZE,
        program.require_minimal(),
    )?
    .to_i64();
    if operand < 0 {
        return Err(ScriptError::NegativeLocktime);
    }

    let transaction = program.transaction();
    let lock_time = i64::from(transaction.lock_time);
    let threshold = i64::from(LOCKTIME_THRESHOLD);

    // Height locks and time locks live in disjoint ranges and never
    // satisfy one another.
    if (operand < threshold) != (lock_time < threshold) {
        return Err(ScriptError::UnsatisfiedLocktime);
    }
    if operand > lock_time {
        return Err(ScriptError::UnsatisfiedLocktime);
    }

    // A final input opts the transaction out of locktime entirely.
    if transaction.inputs[program.input_index()].sequence == SEQUENCE_FINAL {
        return Err(ScriptError::UnsatisfiedLocktime);
    }
    Ok(())
}

/// BIP112 CHECKSEQUENCEVERIFY against the input's BIP68 relative locktime.
fn check_sequence(program: &mut Program) -> Result<()> {
    if !program.forks().is_enabled(ForkRules::BIP112) {
        return Ok(());
    }

    let operand = ScriptNum::decode(
        program.peek(0)?,
        MAX_LOCKTIME_NUMBER_SIZE,
        program.require_minimal(),
    )?
    .to_i64();
    if operand < 0 {
        return Err(ScriptError::NegativeLocktime);
    }
    let operand = operand as u32;

    // Operand bit 31 set makes the opcode a no-op, reserving the space for
    // future extension.
    if operand & SEQUENCE_DISABLE_FLAG != 0 {
        return Ok(());
    }

    let transaction = program.transaction();
    if transaction.version < 2 {
        return Err(ScriptError::UnsatisfiedLocktime);
    }

    let sequence = transaction.inputs[program.input_index()].sequence;
    if sequence & SEQUENCE_DISABLE_FLAG != 0 {
        return Err(ScriptError::UnsatisfiedLocktime);
    }
    if operand & SEQUENCE_TYPE_FLAG != sequence & SEQUENCE_TYPE_FLAG {
        return Err(ScriptError::UnsatisfiedLocktime);
    }

    let mask = SEQUENCE_TYPE_FLAG | SEQUENCE_LOCKTIME_MASK;
    if operand & mask > sequence & mask {
        return Err(ScriptError::UnsatisfiedLocktime);
    }
    Ok(())
}

/// Verify one transaction input against the output script it spends.
///
/// Dispatches legacy, P2SH (BIP16), and witness v0 (BIP141) evaluation;
/// unknown witness versions pass unless the caller set the discourage
/// policy bit.
pub fn verify_input(
    transaction: &Transaction,
    input_index: usize,
    prevout_script: &[u8],
    prevout_value: u64,
    forks: ForkRules,
) -> Result<()> {
    if input_index >= transaction.inputs.len() {
        return Err(ScriptError::InvalidStackOperation);
    }
    let input = &transaction.inputs[input_index];

    // Native witness outputs.
    if forks.is_enabled(ForkRules::BIP141) {
        if let Some((version, witness_program)) = script::witness_program(prevout_script) {
            if !input.script_sig.is_empty() {
                return Err(ScriptError::WitnessMalleated);
            }
            return verify_witness(
                transaction,
                input_index,
                version,
                witness_program,
                prevout_value,
                forks,
            );
        }
    }

    let mut sig_run = Program::new(&input.script_sig, transaction, input_index, forks)?;
    run(&mut sig_run)?;

    let p2sh = forks.is_enabled(ForkRules::BIP16) && script::is_p2sh(prevout_script);
    if p2sh && !script::is_push_only(sig_run.operations()) {
        return Err(ScriptError::SigPushOnly);
    }

    let mut lock_run = Program::continuation(prevout_script, &sig_run)?;
    run(&mut lock_run)?;
    if !lock_run.is_stack_true() {
        return Err(ScriptError::EvalFalse);
    }

    if p2sh {
        // Re-run from a copy of the unlocking stack; the top element is the
        // serialized redeem script.
        let mut stack = sig_run.stack.clone();
        let redeem = stack.pop().ok_or(ScriptError::InvalidStackOperation)?;

        if forks.is_enabled(ForkRules::BIP141) {
            if let Some((version, witness_program)) = script::witness_program(&redeem) {
                // Witness-over-P2SH: the unlocking script must be exactly
                // the redeem script push, or the spend is malleable.
                let ops = sig_run.operations();
                if ops.len() != 1 || ops[0].data != redeem {
                    return Err(ScriptError::WitnessMalleated);
                }
                return verify_witness(
                    transaction,
                    input_index,
                    version,
                    witness_program,
                    prevout_value,
                    forks,
                );
            }
        }

        let mut embedded = Program::continuation_move(&redeem, &sig_run, stack)?;
        run(&mut embedded)?;
        if !embedded.is_stack_true() {
            return Err(ScriptError::EvalFalse);
        }
        if forks.is_enabled(ForkRules::BIP141) && !embedded.is_stack_clean() {
            return Err(ScriptError::CleanStack);
        }
    }

    // Under the witness rule, a witness with no witness program to consume
    // it is malleable; before it, witness data is simply not looked at.
    if forks.is_enabled(ForkRules::BIP141) && !input.witness.is_empty() {
        return Err(ScriptError::WitnessUnexpected);
    }
    Ok(())
}

fn verify_witness(
    transaction: &Transaction,
    input_index: usize,
    version: u8,
    witness_program: &[u8],
    prevout_value: u64,
    forks: ForkRules,
) -> Result<()> {
    if version != 0 {
        // Reserved versions (including v1 taproot, which this engine
        // recognizes but does not evaluate) validate as anyone-can-spend.
        if forks.is_enabled(ForkRules::DISCOURAGE_UPGRADABLE_WITNESS) {
            return Err(ScriptError::DiscourageUpgradableWitness);
        }
        return Ok(());
    }

    let witness = &transaction.inputs[input_index].witness;

    let (script, stack) = match witness_program.len() {
        WITNESS_V0_KEYHASH_SIZE => {
            // P2WPKH: exactly signature and key, run against the implied
            // pay-to-key-hash script.
            if witness.len() != 2 {
                return Err(ScriptError::WitnessProgramMismatch);
            }
            let mut implied = Vec::with_capacity(25);
            implied.push(OP_DUP);
            implied.push(OP_HASH160);
            implied.push(WITNESS_V0_KEYHASH_SIZE as u8);
            implied.extend_from_slice(witness_program);
            implied.push(OP_EQUALVERIFY);
            implied.push(OP_CHECKSIG);
            (implied, witness.clone())
        }
        WITNESS_V0_SCRIPTHASH_SIZE => {
            // P2WSH: last witness element is the script, committed by its
            // single SHA-256.
            let Some((script, stack)) = witness.split_last() else {
                return Err(ScriptError::WitnessProgramMismatch);
            };
            if &crypto::sha256(script)[..] != witness_program {
                return Err(ScriptError::WitnessProgramMismatch);
            }
            (script.clone(), stack.to_vec())
        }
        _ => return Err(ScriptError::WitnessProgramWrongLength),
    };

    for element in &stack {
        Program::check_element_size(element.len())?;
    }

    let mut witness_run = Program::witness(
        &script,
        transaction,
        input_index,
        forks,
        prevout_value,
        stack,
    )?;
    run(&mut witness_run)?;

    if !witness_run.is_stack_true() {
        return Err(ScriptError::EvalFalse);
    }
    if !witness_run.is_stack_clean() {
        return Err(ScriptError::CleanStack);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutPoint, TransactionInput, TransactionOutput};

    fn spend_transaction() -> Transaction {
        Transaction {
            version: 2,
            inputs: vec![TransactionInput {
                prevout: OutPoint {
                    hash: [0x11; 32],
                    index: 0,
                },
                script_sig: vec![],
                sequence: 0xffff_fffe,
                witness: vec![],
            }],
            outputs: vec![TransactionOutput {
                value: 40_000,
                script_pubkey: vec![OP_1],
            }],
            lock_time: 0,
        }
    }

    fn eval(script: &[u8], forks: ForkRules) -> Result<bool> {
        let tx = spend_transaction();
        let mut program = Program::new(script, &tx, 0, forks)?;
        run(&mut program)?;
        Ok(program.is_stack_true())
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval(&[OP_2, OP_3, OP_ADD, OP_5, OP_NUMEQUAL], ForkRules::NO_RULES), Ok(true));
        assert_eq!(eval(&[OP_2, OP_3, OP_SUB], ForkRules::NO_RULES), Ok(false));
        assert_eq!(eval(&[OP_1NEGATE, OP_ABS, OP_1, OP_NUMEQUAL], ForkRules::NO_RULES), Ok(true));
        assert_eq!(
            eval(&[OP_2, OP_1, OP_3, OP_WITHIN], ForkRules::NO_RULES),
            Ok(true)
        );
        assert_eq!(
            eval(&[OP_3, OP_1, OP_3, OP_WITHIN], ForkRules::NO_RULES),
            Ok(false)
        );
    }

    #[test]
    fn equal_of_two_empty_pushes() {
        assert_eq!(eval(&[OP_0, OP_0, OP_EQUAL], ForkRules::NO_RULES), Ok(true));
    }

    #[test]
    fn conditionals_select_branch() {
        let script = [OP_1, OP_IF, OP_2, OP_ELSE, OP_3, OP_ENDIF];
        let tx = spend_transaction();
        let mut program = Program::new(&script, &tx, 0, ForkRules::NO_RULES).unwrap();
        run(&mut program).unwrap();
        assert_eq!(program.stack, vec![vec![2]]);

        let script = [OP_0, OP_NOTIF, OP_2, OP_ELSE, OP_3, OP_ENDIF];
        let mut program = Program::new(&script, &tx, 0, ForkRules::NO_RULES).unwrap();
        run(&mut program).unwrap();
        assert_eq!(program.stack, vec![vec![2]]);
    }

    #[test]
    fn unbalanced_conditional_fails() {
        assert_eq!(
            eval(&[OP_1, OP_IF, OP_1], ForkRules::NO_RULES),
            Err(ScriptError::UnbalancedConditional)
        );
        assert_eq!(
            eval(&[OP_ENDIF], ForkRules::NO_RULES),
            Err(ScriptError::UnbalancedConditional)
        );
    }

    #[test]
    fn disabled_opcode_fails_even_unreached() {
        let script = [OP_0, OP_IF, OP_CAT, OP_ENDIF, OP_1];
        assert_eq!(
            eval(&script, ForkRules::NO_RULES),
            Err(ScriptError::DisabledOpcode)
        );
    }

    #[test]
    fn verif_fails_even_unreached() {
        let script = [OP_0, OP_IF, OP_VERIF, OP_ENDIF, OP_1];
        assert_eq!(eval(&script, ForkRules::NO_RULES), Err(ScriptError::BadOpcode));
    }

    #[test]
    fn reserved_fails_only_when_executed() {
        let skipped = [OP_0, OP_IF, OP_RESERVED, OP_ENDIF, OP_1];
        assert_eq!(eval(&skipped, ForkRules::NO_RULES), Ok(true));
        assert_eq!(
            eval(&[OP_RESERVED], ForkRules::NO_RULES),
            Err(ScriptError::ReservedOpcode)
        );
    }

    #[test]
    fn op_return_terminates() {
        assert_eq!(
            eval(&[OP_1, OP_RETURN], ForkRules::NO_RULES),
            Err(ScriptError::OpReturn)
        );
    }

    #[test]
    fn stack_shuffles() {
        let tx = spend_transaction();
        let script = [OP_1, OP_2, OP_3, OP_ROT];
        let mut program = Program::new(&script, &tx, 0, ForkRules::NO_RULES).unwrap();
        run(&mut program).unwrap();
        assert_eq!(program.stack, vec![vec![2], vec![3], vec![1]]);

        let script = [OP_1, OP_2, OP_TUCK];
        let mut program = Program::new(&script, &tx, 0, ForkRules::NO_RULES).unwrap();
        run(&mut program).unwrap();
        assert_eq!(program.stack, vec![vec![2], vec![1], vec![2]]);

        let script = [OP_1, OP_2, OP_3, OP_2, OP_PICK];
        let mut program = Program::new(&script, &tx, 0, ForkRules::NO_RULES).unwrap();
        run(&mut program).unwrap();
        assert_eq!(program.stack, vec![vec![1], vec![2], vec![3], vec![1]]);
    }

    #[test]
    fn alt_stack_round_trip() {
        let script = [OP_5, OP_TOALTSTACK, OP_1, OP_FROMALTSTACK, OP_ADD];
        let tx = spend_transaction();
        let mut program = Program::new(&script, &tx, 0, ForkRules::NO_RULES).unwrap();
        run(&mut program).unwrap();
        assert_eq!(program.stack, vec![vec![6]]);
    }

    #[test]
    fn executed_op_ceiling_boundary() {
        // 201 executed non-push operations pass, one more fails.
        let mut script = vec![OP_1];
        script.extend(std::iter::repeat(OP_DUP).take(200));
        script.push(OP_NOP);
        assert_eq!(eval(&script, ForkRules::NO_RULES), Ok(true));

        script.push(OP_NOP);
        assert_eq!(eval(&script, ForkRules::NO_RULES), Err(ScriptError::OpCount));
    }

    #[test]
    fn skipped_branch_ops_do_not_count() {
        // 250 NOPs inside a never-taken branch stay under the ceiling
        // because skipped operations are not counted.
        let mut script = vec![OP_0, OP_IF];
        script.extend(std::iter::repeat(OP_NOP).take(250));
        script.extend_from_slice(&[OP_ENDIF, OP_1]);
        assert_eq!(eval(&script, ForkRules::NO_RULES), Ok(true));
    }

    #[test]
    fn cltv_is_nop_without_bip65() {
        let script = [OP_16, OP_CHECKLOCKTIMEVERIFY, OP_DROP, OP_1];
        assert_eq!(eval(&script, ForkRules::NO_RULES), Ok(true));
    }

    #[test]
    fn cltv_enforced_under_bip65() {
        // lock_time 0, operand 16: unsatisfied.
        let script = [OP_16, OP_CHECKLOCKTIMEVERIFY];
        assert_eq!(
            eval(&script, ForkRules::BIP65),
            Err(ScriptError::UnsatisfiedLocktime)
        );
    }

    #[test]
    fn cltv_type_mismatch_fails() {
        let mut tx = spend_transaction();
        tx.lock_time = 600_000_000;
        // Height-range operand against a time-range locktime.
        let script = [OP_16, OP_CHECKLOCKTIMEVERIFY];
        let mut program = Program::new(&script, &tx, 0, ForkRules::BIP65).unwrap();
        assert_eq!(run(&mut program), Err(ScriptError::UnsatisfiedLocktime));
    }

    #[test]
    fn cltv_satisfied_leaves_operand() {
        let mut tx = spend_transaction();
        tx.lock_time = 20;
        let script = [OP_16, OP_CHECKLOCKTIMEVERIFY];
        let mut program = Program::new(&script, &tx, 0, ForkRules::BIP65).unwrap();
        run(&mut program).unwrap();
        assert_eq!(program.stack, vec![vec![16]]);
    }

    #[test]
    fn cltv_rejects_final_sequence() {
        let mut tx = spend_transaction();
        tx.lock_time = 20;
        tx.inputs[0].sequence = SEQUENCE_FINAL;
        let script = [OP_16, OP_CHECKLOCKTIMEVERIFY];
        let mut program = Program::new(&script, &tx, 0, ForkRules::BIP65).unwrap();
        assert_eq!(run(&mut program), Err(ScriptError::UnsatisfiedLocktime));
    }

    #[test]
    fn csv_disable_bit_is_nop() {
        // Operand 0x80000080: bit 31 set, five bytes so the value stays
        // positive through the sign-magnitude encoding.
        let script = [
            0x05, 0x80, 0x00, 0x00, 0x80, 0x00,
            OP_CHECKSEQUENCEVERIFY, OP_DROP, OP_1,
        ];
        assert_eq!(eval(&script, ForkRules::BIP112), Ok(true));
    }

    #[test]
    fn csv_requires_version_2() {
        let mut tx = spend_transaction();
        tx.version = 1;
        tx.inputs[0].sequence = 16;
        let script = [OP_16, OP_CHECKSEQUENCEVERIFY];
        let mut program = Program::new(&script, &tx, 0, ForkRules::BIP112).unwrap();
        assert_eq!(run(&mut program), Err(ScriptError::UnsatisfiedLocktime));
    }

    #[test]
    fn csv_masked_compare() {
        let mut tx = spend_transaction();
        tx.inputs[0].sequence = 16;
        let script = [OP_16, OP_CHECKSEQUENCEVERIFY, OP_DROP, OP_1];
        let mut program = Program::new(&script, &tx, 0, ForkRules::BIP112).unwrap();
        run(&mut program).unwrap();
        assert!(program.is_stack_true());

        tx.inputs[0].sequence = 15;
        let mut program = Program::new(&script, &tx, 0, ForkRules::BIP112).unwrap();
        assert_eq!(run(&mut program), Err(ScriptError::UnsatisfiedLocktime));
    }

    #[test]
    fn checksig_empty_signature_is_clean_false() {
        let script = [OP_0, 0x21, // empty sig, then a 33-byte key
            0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            OP_CHECKSIG, OP_NOT];
        assert_eq!(eval(&script, ForkRules::NO_RULES), Ok(true));
    }

    #[test]
    fn checkmultisig_consumes_dummy() {
        // 0-of-0 multisig: dummy, 0 sigs, 0 keys.
        let script = [OP_0, OP_0, OP_0, OP_CHECKMULTISIG];
        assert_eq!(eval(&script, ForkRules::NO_RULES), Ok(true));
    }

    #[test]
    fn checkmultisig_nonnull_dummy_fails_only_under_bip147() {
        let script = [OP_1, OP_0, OP_0, OP_CHECKMULTISIG];
        assert_eq!(eval(&script, ForkRules::NO_RULES), Ok(true));
        assert_eq!(
            eval(&script, ForkRules::BIP147),
            Err(ScriptError::NullDummy)
        );
    }

    #[test]
    fn checkmultisig_key_count_limit() {
        let mut script = vec![OP_0, OP_0];
        script.push(0x01);
        script.push(21);
        script.push(OP_CHECKMULTISIG);
        assert_eq!(
            eval(&script, ForkRules::NO_RULES),
            Err(ScriptError::PubKeyCount)
        );
    }

    #[test]
    fn minimal_push_enforced_under_bip62() {
        // 0x01 0x05 is a non-minimal encoding of OP_5.
        let script = [0x01, 0x05];
        assert_eq!(eval(&script, ForkRules::NO_RULES), Ok(true));
        assert_eq!(
            eval(&script, ForkRules::BIP62),
            Err(ScriptError::MinimalData)
        );
    }

    #[test]
    fn codeseparator_moves_jump() {
        let script = [OP_1, OP_CODESEPARATOR, OP_1, OP_EQUAL];
        let tx = spend_transaction();
        let mut program = Program::new(&script, &tx, 0, ForkRules::NO_RULES).unwrap();
        run(&mut program).unwrap();
        assert_eq!(program.subscript().len(), 2);
    }

    #[test]
    fn verify_input_p2pkh_shape_fails_cleanly_without_signature() {
        // A bare OP_1 prevout accepts any empty unlocking script.
        let tx = spend_transaction();
        assert_eq!(verify_input(&tx, 0, &[OP_1], 0, ForkRules::NO_RULES), Ok(()));
        assert_eq!(
            verify_input(&tx, 0, &[OP_0], 0, ForkRules::NO_RULES),
            Err(ScriptError::EvalFalse)
        );
    }

    #[test]
    fn verify_input_p2sh_runs_redeem_script() {
        // Redeem script OP_1; scriptSig pushes it; prevout is its P2SH.
        let redeem = vec![OP_1];
        let mut prevout = vec![OP_HASH160, 0x14];
        prevout.extend_from_slice(&crypto::hash160(&redeem));
        prevout.push(OP_EQUAL);

        let mut tx = spend_transaction();
        tx.inputs[0].script_sig = vec![0x01, OP_1];

        assert_eq!(verify_input(&tx, 0, &prevout, 0, ForkRules::BIP16), Ok(()));

        // Without BIP16 the same spend only runs the pattern match.
        assert_eq!(verify_input(&tx, 0, &prevout, 0, ForkRules::NO_RULES), Ok(()));
    }

    #[test]
    fn verify_input_p2sh_requires_push_only() {
        let redeem = vec![OP_1];
        let mut prevout = vec![OP_HASH160, 0x14];
        prevout.extend_from_slice(&crypto::hash160(&redeem));
        prevout.push(OP_EQUAL);

        let mut tx = spend_transaction();
        // OP_NOP then the push: evaluates identically but is not push-only.
        tx.inputs[0].script_sig = vec![OP_NOP, 0x01, OP_1];
        assert_eq!(
            verify_input(&tx, 0, &prevout, 0, ForkRules::BIP16),
            Err(ScriptError::SigPushOnly)
        );
    }

    #[test]
    fn verify_input_rejects_false_redeem_result() {
        let redeem = vec![OP_0];
        let mut prevout = vec![OP_HASH160, 0x14];
        prevout.extend_from_slice(&crypto::hash160(&redeem));
        prevout.push(OP_EQUAL);

        let mut tx = spend_transaction();
        tx.inputs[0].script_sig = vec![0x01, OP_0];
        assert_eq!(
            verify_input(&tx, 0, &prevout, 0, ForkRules::BIP16),
            Err(ScriptError::EvalFalse)
        );
    }

    #[test]
    fn unknown_witness_version_passes_unless_discouraged() {
        let mut prevout = vec![OP_1, 0x20];
        prevout.extend_from_slice(&[0xaa; 32]);

        let tx = spend_transaction();
        assert_eq!(
            verify_input(&tx, 0, &prevout, 0, ForkRules::BIP141),
            Ok(())
        );
        assert_eq!(
            verify_input(
                &tx,
                0,
                &prevout,
                0,
                ForkRules::BIP141 | ForkRules::DISCOURAGE_UPGRADABLE_WITNESS
            ),
            Err(ScriptError::DiscourageUpgradableWitness)
        );
    }

    #[test]
    fn native_witness_spend_rejects_script_sig() {
        let mut prevout = vec![OP_0, 0x14];
        prevout.extend_from_slice(&[0xbb; 20]);

        let mut tx = spend_transaction();
        tx.inputs[0].script_sig = vec![OP_1];
        assert_eq!(
            verify_input(&tx, 0, &prevout, 0, ForkRules::BIP141),
            Err(ScriptError::WitnessMalleated)
        );
    }

    #[test]
    fn p2wsh_script_hash_must_match() {
        let witness_script = vec![OP_1];
        let mut prevout = vec![OP_0, 0x20];
        prevout.extend_from_slice(&crypto::sha256(&witness_script));

        let mut tx = spend_transaction();
        tx.inputs[0].witness = vec![witness_script];
        assert_eq!(verify_input(&tx, 0, &prevout, 0, ForkRules::BIP141), Ok(()));

        tx.inputs[0].witness = vec![vec![OP_2]];
        assert_eq!(
            verify_input(&tx, 0, &prevout, 0, ForkRules::BIP141),
            Err(ScriptError::WitnessProgramMismatch)
        );
    }

    #[test]
    fn p2wsh_requires_clean_stack() {
        let witness_script = vec![OP_1];
        let mut prevout = vec![OP_0, 0x20];
        prevout.extend_from_slice(&crypto::sha256(&witness_script));

        let mut tx = spend_transaction();
        tx.inputs[0].witness = vec![vec![0x01], witness_script];
        assert_eq!(
            verify_input(&tx, 0, &prevout, 0, ForkRules::BIP141),
            Err(ScriptError::CleanStack)
        );
    }

    #[test]
    fn p2wpkh_requires_two_witness_elements() {
        let mut prevout = vec![OP_0, 0x14];
        prevout.extend_from_slice(&[0xcc; 20]);

        let mut tx = spend_transaction();
        tx.inputs[0].witness = vec![vec![0x01]];
        assert_eq!(
            verify_input(&tx, 0, &prevout, 0, ForkRules::BIP141),
            Err(ScriptError::WitnessProgramMismatch)
        );
    }

    #[test]
    fn stray_witness_fails_only_under_the_witness_rule() {
        let mut tx = spend_transaction();
        tx.inputs[0].witness = vec![vec![0x01]];
        // Pre-BIP141 validation never inspects witness data.
        assert_eq!(verify_input(&tx, 0, &[OP_1], 0, ForkRules::NO_RULES), Ok(()));
        assert_eq!(
            verify_input(&tx, 0, &[OP_1], 0, ForkRules::BIP141),
            Err(ScriptError::WitnessUnexpected)
        );
    }
}
