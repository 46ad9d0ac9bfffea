//! End-to-end spends: sign with the engine's own sighash, then verify
//!
//! Each test builds a spendable output, produces a real ECDSA signature
//! over `compute_sighash`, assembles the unlocking data, and runs
//! `verify_input` under the relevant rules.

use secp256k1::{Message, Secp256k1, SecretKey};
use txscript::crypto::{hash160, sha256};
use txscript::forks::ForkRules;
use txscript::interpreter::verify_input;
use txscript::opcodes::*;
use txscript::sighash::{compute_sighash, SIGHASH_ALL};
use txscript::types::{
    OutPoint, ScriptVersion, Transaction, TransactionInput, TransactionOutput,
};
use txscript::ScriptError;

fn keypair(seed: u8) -> (SecretKey, Vec<u8>) {
    let secp = Secp256k1::new();
    let secret = SecretKey::from_slice(&[seed; 32]).unwrap();
    let public = secret.public_key(&secp).serialize().to_vec();
    (secret, public)
}

fn spending_transaction() -> Transaction {
    Transaction {
        version: 2,
        inputs: vec![TransactionInput {
            prevout: OutPoint {
                hash: [0x33; 32],
                index: 1,
            },
            script_sig: vec![],
            sequence: 0xffff_fffe,
            witness: vec![],
        }],
        outputs: vec![TransactionOutput {
            value: 90_000,
            script_pubkey: vec![OP_1],
        }],
        lock_time: 0,
    }
}

fn sign(
    secret: &SecretKey,
    transaction: &Transaction,
    script_code: &[u8],
    value: u64,
    version: ScriptVersion,
) -> Vec<u8> {
    let digest =
        compute_sighash(transaction, 0, script_code, value, SIGHASH_ALL, version)
            .unwrap();
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(&digest).unwrap();
    let mut endorsement = secp
        .sign_ecdsa(&message, secret)
        .serialize_der()
        .to_vec();
    endorsement.push(SIGHASH_ALL);
    endorsement
}

fn push(script: &mut Vec<u8>, data: &[u8]) {
    assert!(data.len() <= 0x4b);
    script.push(data.len() as u8);
    script.extend_from_slice(data);
}

fn p2pkh_script(key_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = vec![OP_DUP, OP_HASH160, 0x14];
    script.extend_from_slice(key_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

#[test]
fn p2pkh_spend_verifies() {
    let (secret, public) = keypair(0x01);
    let prevout_script = p2pkh_script(&hash160(&public));

    let mut tx = spending_transaction();
    let endorsement = sign(&secret, &tx, &prevout_script, 0, ScriptVersion::Legacy);
    let mut script_sig = Vec::new();
    push(&mut script_sig, &endorsement);
    push(&mut script_sig, &public);
    tx.inputs[0].script_sig = script_sig;

    assert_eq!(
        verify_input(&tx, 0, &prevout_script, 100_000, ForkRules::NO_RULES),
        Ok(())
    );
    // Strict rules accept the same spend: the signature is fresh DER.
    assert_eq!(
        verify_input(
            &tx,
            0,
            &prevout_script,
            100_000,
            ForkRules::BIP16 | ForkRules::BIP66 | ForkRules::BIP147
        ),
        Ok(())
    );
}

#[test]
fn p2pkh_wrong_key_fails() {
    let (secret, _) = keypair(0x01);
    let (_, other_public) = keypair(0x02);
    let prevout_script = p2pkh_script(&hash160(&other_public));

    let mut tx = spending_transaction();
    let endorsement = sign(&secret, &tx, &prevout_script, 0, ScriptVersion::Legacy);
    let mut script_sig = Vec::new();
    push(&mut script_sig, &endorsement);
    push(&mut script_sig, &other_public);
    tx.inputs[0].script_sig = script_sig;

    // The hash check passes (right key pushed) but the signature is from
    // the wrong secret; CHECKSIG leaves false.
    assert_eq!(
        verify_input(&tx, 0, &prevout_script, 100_000, ForkRules::NO_RULES),
        Err(ScriptError::EvalFalse)
    );
}

#[test]
fn signature_does_not_survive_output_tampering() {
    let (secret, public) = keypair(0x03);
    let prevout_script = p2pkh_script(&hash160(&public));

    let mut tx = spending_transaction();
    let endorsement = sign(&secret, &tx, &prevout_script, 0, ScriptVersion::Legacy);
    let mut script_sig = Vec::new();
    push(&mut script_sig, &endorsement);
    push(&mut script_sig, &public);
    tx.inputs[0].script_sig = script_sig;
    tx.outputs[0].value += 1;

    assert_eq!(
        verify_input(&tx, 0, &prevout_script, 100_000, ForkRules::NO_RULES),
        Err(ScriptError::EvalFalse)
    );
}

#[test]
fn multisig_two_of_three_in_key_order() {
    let (secret_a, public_a) = keypair(0x11);
    let (secret_b, public_b) = keypair(0x12);
    let (_, public_c) = keypair(0x13);

    let mut redeem = vec![OP_2];
    push(&mut redeem, &public_a);
    push(&mut redeem, &public_b);
    push(&mut redeem, &public_c);
    redeem.push(OP_3);
    redeem.push(OP_CHECKMULTISIG);

    let mut tx = spending_transaction();
    let sig_a = sign(&secret_a, &tx, &redeem, 0, ScriptVersion::Legacy);
    let sig_b = sign(&secret_b, &tx, &redeem, 0, ScriptVersion::Legacy);

    let mut script_sig = vec![OP_0]; // dummy
    push(&mut script_sig, &sig_a);
    push(&mut script_sig, &sig_b);
    tx.inputs[0].script_sig = script_sig;

    assert_eq!(
        verify_input(&tx, 0, &redeem, 100_000, ForkRules::BIP147),
        Ok(())
    );

    // Out of key order the same signatures fail.
    let mut reversed = vec![OP_0];
    push(&mut reversed, &sig_b);
    push(&mut reversed, &sig_a);
    let mut tx_reversed = spending_transaction();
    tx_reversed.inputs[0].script_sig = reversed;
    assert_eq!(
        verify_input(&tx_reversed, 0, &redeem, 100_000, ForkRules::NO_RULES),
        Err(ScriptError::EvalFalse)
    );
}

#[test]
fn p2wpkh_spend_verifies_and_commits_to_value() {
    let (secret, public) = keypair(0x21);
    let key_hash = hash160(&public);

    let mut prevout_script = vec![OP_0, 0x14];
    prevout_script.extend_from_slice(&key_hash);

    // BIP143 signs the implied pay-to-key-hash script.
    let script_code = p2pkh_script(&key_hash);

    let mut tx = spending_transaction();
    let endorsement =
        sign(&secret, &tx, &script_code, 100_000, ScriptVersion::WitnessV0);
    tx.inputs[0].witness = vec![endorsement, public];

    let forks = ForkRules::BIP9_BIT1_GROUP;
    assert_eq!(verify_input(&tx, 0, &prevout_script, 100_000, forks), Ok(()));

    // The signature committed to the spent value; a different value makes
    // it a failing non-null signature, which BIP147 escalates.
    assert_eq!(
        verify_input(&tx, 0, &prevout_script, 99_999, forks),
        Err(ScriptError::NullFail)
    );
}

#[test]
fn p2wsh_spend_verifies() {
    let (secret, public) = keypair(0x22);

    let mut witness_script = Vec::new();
    push(&mut witness_script, &public);
    witness_script.push(OP_CHECKSIG);

    let mut prevout_script = vec![OP_0, 0x20];
    prevout_script.extend_from_slice(&sha256(&witness_script));

    let mut tx = spending_transaction();
    let endorsement =
        sign(&secret, &tx, &witness_script, 100_000, ScriptVersion::WitnessV0);
    tx.inputs[0].witness = vec![endorsement, witness_script];

    assert_eq!(
        verify_input(&tx, 0, &prevout_script, 100_000, ForkRules::BIP9_BIT1_GROUP),
        Ok(())
    );
}

#[test]
fn p2sh_wrapped_witness_spend_verifies() {
    let (secret, public) = keypair(0x23);
    let key_hash = hash160(&public);

    // Redeem script is the v0 witness program.
    let mut redeem = vec![OP_0, 0x14];
    redeem.extend_from_slice(&key_hash);

    let mut prevout_script = vec![OP_HASH160, 0x14];
    prevout_script.extend_from_slice(&hash160(&redeem));
    prevout_script.push(OP_EQUAL);

    let script_code = p2pkh_script(&key_hash);
    let mut tx = spending_transaction();
    let endorsement =
        sign(&secret, &tx, &script_code, 100_000, ScriptVersion::WitnessV0);
    tx.inputs[0].witness = vec![endorsement, public];
    let mut script_sig = Vec::new();
    push(&mut script_sig, &redeem);
    tx.inputs[0].script_sig = script_sig;

    let forks = ForkRules::BIP16 | ForkRules::BIP9_BIT1_GROUP;
    assert_eq!(verify_input(&tx, 0, &prevout_script, 100_000, forks), Ok(()));

    // Any extra data in the unlocking script is malleation.
    let mut padded = vec![OP_0];
    push(&mut padded, &redeem);
    let mut tx_padded = spending_transaction();
    tx_padded.inputs[0].witness = tx.inputs[0].witness.clone();
    tx_padded.inputs[0].script_sig = padded;
    assert_eq!(
        verify_input(&tx_padded, 0, &prevout_script, 100_000, forks),
        Err(ScriptError::WitnessMalleated)
    );
}

#[test]
fn codeseparator_scopes_the_signed_subscript() {
    let (secret, public) = keypair(0x24);

    // <key> CHECKSIG after a CODESEPARATOR: the signature commits only to
    // the trailing portion.
    let mut tail = Vec::new();
    push(&mut tail, &public);
    tail.push(OP_CHECKSIG);

    let mut prevout_script = vec![OP_NOP, OP_CODESEPARATOR];
    prevout_script.extend_from_slice(&tail);

    let mut tx = spending_transaction();
    let endorsement = sign(&secret, &tx, &tail, 0, ScriptVersion::Legacy);
    let mut script_sig = Vec::new();
    push(&mut script_sig, &endorsement);
    tx.inputs[0].script_sig = script_sig;

    assert_eq!(
        verify_input(&tx, 0, &prevout_script, 100_000, ForkRules::NO_RULES),
        Ok(())
    );
}
