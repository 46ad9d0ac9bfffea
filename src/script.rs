//! Parsed script operations and pattern recognition
//!
//! The interpreter never walks raw bytes: a script is parsed up front into
//! an ordered sequence of (opcode, push-data) operations, with every push
//! length prefix bounds-checked against the remaining bytes. Malformed
//! pushes fail here, before any opcode executes.

use crate::constants::MAX_SCRIPT_SIZE;
use crate::error::{Result, ScriptError};
use crate::opcodes::*;
use crate::types::ByteString;

/// One parsed script operation. `data` is empty for non-push opcodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub code: u8,
    pub data: ByteString,
}

impl Operation {
    pub fn opcode(code: u8) -> Self {
        Operation {
            code,
            data: ByteString::new(),
        }
    }

    pub fn push(data: ByteString) -> Self {
        let code = match data.len() {
            0 => OP_0,
            len if len <= 0x4b => len as u8,
            len if len <= 0xff => OP_PUSHDATA1,
            len if len <= 0xffff => OP_PUSHDATA2,
            _ => OP_PUSHDATA4,
        };
        Operation { code, data }
    }

    pub fn is_push(&self) -> bool {
        is_push(self.code)
    }

    /// BIP62: a push must use the shortest form able to carry its data.
    pub fn is_minimal_push(&self) -> bool {
        if !self.is_push() {
            return true;
        }
        match self.data.len() {
            0 => self.code == OP_0,
            1 => {
                let byte = self.data[0];
                // Single bytes 1-16 belong in OP_N, 0x81 in OP_1NEGATE;
                // those are not push opcodes so a direct push of them is
                // non-minimal.
                if (1..=16).contains(&byte) || byte == 0x81 {
                    false
                } else {
                    self.code == 0x01
                }
            }
            len if len <= 0x4b => self.code as usize == len,
            len if len <= 0xff => self.code == OP_PUSHDATA1,
            len if len <= 0xffff => self.code == OP_PUSHDATA2,
            _ => self.code == OP_PUSHDATA4,
        }
    }

    /// Serialized byte length of this operation.
    pub fn serialized_size(&self) -> usize {
        match self.code {
            OP_PUSHDATA1 => 2 + self.data.len(),
            OP_PUSHDATA2 => 3 + self.data.len(),
            OP_PUSHDATA4 => 5 + self.data.len(),
            _ => 1 + self.data.len(),
        }
    }
}

/// Parse raw script bytes into an operation sequence.
///
/// Fails with `ScriptSize` for over-long scripts and `MalformedPush` when a
/// push length prefix runs past the end of the script.
pub fn parse(bytes: &[u8]) -> Result<Vec<Operation>> {
    if bytes.len() > MAX_SCRIPT_SIZE {
        return Err(ScriptError::ScriptSize);
    }

    let mut ops = Vec::new();
    let mut cursor = 0usize;

    while cursor < bytes.len() {
        let code = bytes[cursor];
        cursor += 1;

        let size = match code {
            0x01..=0x4b => code as usize,
            OP_PUSHDATA1 => {
                let prefix = read_le(bytes, cursor, 1)?;
                cursor += 1;
                prefix
            }
            OP_PUSHDATA2 => {
                let prefix = read_le(bytes, cursor, 2)?;
                cursor += 2;
                prefix
            }
            OP_PUSHDATA4 => {
                let prefix = read_le(bytes, cursor, 4)?;
                cursor += 4;
                prefix
            }
            _ => 0,
        };

        if size > bytes.len() - cursor {
            return Err(ScriptError::MalformedPush);
        }

        let data = bytes[cursor..cursor + size].to_vec();
        cursor += size;
        ops.push(Operation { code, data });
    }

    Ok(ops)
}

fn read_le(bytes: &[u8], at: usize, width: usize) -> Result<usize> {
    if at + width > bytes.len() {
        return Err(ScriptError::MalformedPush);
    }
    let mut value = 0usize;
    for i in 0..width {
        value |= (bytes[at + i] as usize) << (8 * i);
    }
    Ok(value)
}

/// Serialize operations back to script bytes (round trip of `parse`).
pub fn to_bytes(ops: &[Operation]) -> ByteString {
    let mut bytes = ByteString::with_capacity(serialized_size(ops));
    for op in ops {
        bytes.push(op.code);
        match op.code {
            OP_PUSHDATA1 => bytes.push(op.data.len() as u8),
            OP_PUSHDATA2 => bytes.extend_from_slice(&(op.data.len() as u16).to_le_bytes()),
            OP_PUSHDATA4 => bytes.extend_from_slice(&(op.data.len() as u32).to_le_bytes()),
            _ => {}
        }
        bytes.extend_from_slice(&op.data);
    }
    bytes
}

pub fn serialized_size(ops: &[Operation]) -> usize {
    ops.iter().map(Operation::serialized_size).sum()
}

/// True when every operation is a push (required of unlocking scripts
/// under BIP16 and of all scripts under BIP62 push-only policy).
pub fn is_push_only(ops: &[Operation]) -> bool {
    ops.iter().all(Operation::is_push)
}

/// Recognize the P2SH output pattern: HASH160 <20 bytes> EQUAL.
pub fn is_p2sh(script_pubkey: &[u8]) -> bool {
    script_pubkey.len() == 23
        && script_pubkey[0] == OP_HASH160
        && script_pubkey[1] == 0x14
        && script_pubkey[22] == OP_EQUAL
}

/// Recognize a witness program: a version opcode (OP_0 or OP_1..OP_16)
/// followed by a single direct push of 2..=40 bytes.
pub fn witness_program(script_pubkey: &[u8]) -> Option<(u8, &[u8])> {
    if script_pubkey.len() < 4 || script_pubkey.len() > 42 {
        return None;
    }
    let version = match script_pubkey[0] {
        OP_0 => 0,
        code => small_number(code)?,
    };
    let push = script_pubkey[1] as usize;
    if !(0x02..=0x28).contains(&script_pubkey[1]) || push != script_pubkey.len() - 2 {
        return None;
    }
    Some((version, &script_pubkey[2..]))
}

/// Build the legacy signing subscript: operations from the most recent
/// executed CODESEPARATOR onward, with every CODESEPARATOR and every push
/// of a supplied endorsement removed. Multisig compatibility depends on
/// this exact stripping rule.
pub fn strip_for_signing(ops: &[Operation], endorsements: &[&[u8]]) -> Vec<Operation> {
    ops.iter()
        .filter(|op| {
            op.code != OP_CODESEPARATOR
                && !(op.is_push()
                    && !op.data.is_empty()
                    && endorsements.iter().any(|sig| op.data == *sig))
        })
        .cloned()
        .collect()
}
