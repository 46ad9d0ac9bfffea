//! Script machine state
//!
//! A `Program` is one script run: the parsed operations plus the primary
//! stack, alternate stack, conditional-execution stack, executed-operation
//! counter, and the validation context (transaction, input index, fork
//! rules, input value, script version). The interpreter drives it; the
//! sighash module reads its context back out when an opcode needs a digest.

use std::cell::OnceCell;

use smallvec::SmallVec;

use crate::constants::{MAX_SCRIPT_ELEMENT_SIZE, MAX_SCRIPT_OPS, MAX_STACK_SIZE};
use crate::error::{Result, ScriptError};
use crate::forks::ForkRules;
use crate::number::ScriptNum;
use crate::script::{self, Operation};
use crate::sighash::TransactionDigests;
use crate::types::{ByteString, ScriptVersion, Transaction};

/// One unclosed IF/NOTIF: whether the current branch executes, and whether
/// any branch of this conditional has executed yet (ELSE opens a branch
/// only while no earlier branch was taken).
#[derive(Debug, Clone, Copy)]
struct Condition {
    executing: bool,
    ever_true: bool,
}

pub struct Program<'a> {
    ops: Vec<Operation>,
    pub(crate) stack: Vec<ByteString>,
    pub(crate) alternate: Vec<ByteString>,
    condition: SmallVec<[Condition; 16]>,
    op_count: usize,
    /// Operation index one past the last executed CODESEPARATOR.
    pub(crate) jump: usize,
    transaction: &'a Transaction,
    input_index: usize,
    forks: ForkRules,
    value: u64,
    version: ScriptVersion,
    /// BIP143 transaction midstates, filled on first signature check and
    /// carried through continuation runs.
    digests: OnceCell<TransactionDigests>,
}

impl<'a> Program<'a> {
    /// Fresh run with an empty stack (the unlocking script).
    pub fn new(
        script: &[u8],
        transaction: &'a Transaction,
        input_index: usize,
        forks: ForkRules,
    ) -> Result<Self> {
        Ok(Program {
            ops: script::parse(script)?,
            stack: Vec::new(),
            alternate: Vec::new(),
            condition: SmallVec::new(),
            op_count: 0,
            jump: 0,
            transaction,
            input_index,
            forks,
            value: 0,
            version: ScriptVersion::Legacy,
            digests: OnceCell::new(),
        })
    }

    /// Next run over a new script, copying the prior run's stack. Used for
    /// the locking script and for the P2SH embedded script, where the
    /// unlocking stack must survive for later reuse.
    pub fn continuation(script: &[u8], prior: &Program<'a>) -> Result<Self> {
        Ok(Program {
            ops: script::parse(script)?,
            stack: prior.stack.clone(),
            alternate: Vec::new(),
            condition: SmallVec::new(),
            op_count: 0,
            jump: 0,
            transaction: prior.transaction,
            input_index: prior.input_index,
            forks: prior.forks,
            value: prior.value,
            version: prior.version,
            digests: prior.digests.clone(),
        })
    }

    /// Next run taking ownership of an explicit stack. Used for the P2SH
    /// embedded script, where the redeem script has already been popped off
    /// a copy of the unlocking stack.
    pub fn continuation_move(
        script: &[u8],
        prior: &Program<'a>,
        stack: Vec<ByteString>,
    ) -> Result<Self> {
        Ok(Program {
            ops: script::parse(script)?,
            stack,
            alternate: Vec::new(),
            condition: SmallVec::new(),
            op_count: 0,
            jump: 0,
            transaction: prior.transaction,
            input_index: prior.input_index,
            forks: prior.forks,
            value: prior.value,
            version: prior.version,
            digests: prior.digests.clone(),
        })
    }

    /// Witness run: the stack moves in from the witness and the script
    /// version switches the sighash algorithm and minimality rules.
    pub fn witness(
        script: &[u8],
        transaction: &'a Transaction,
        input_index: usize,
        forks: ForkRules,
        value: u64,
        stack: Vec<ByteString>,
    ) -> Result<Self> {
        Ok(Program {
            ops: script::parse(script)?,
            stack,
            alternate: Vec::new(),
            condition: SmallVec::new(),
            op_count: 0,
            jump: 0,
            transaction,
            input_index,
            forks,
            value,
            version: ScriptVersion::WitnessV0,
            digests: OnceCell::new(),
        })
    }

    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    pub fn transaction(&self) -> &'a Transaction {
        self.transaction
    }

    pub fn input_index(&self) -> usize {
        self.input_index
    }

    pub fn forks(&self) -> ForkRules {
        self.forks
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn version(&self) -> ScriptVersion {
        self.version
    }

    /// Shared BIP143 midstates, computed on first use.
    pub fn transaction_digests(&self) -> &TransactionDigests {
        self.digests
            .get_or_init(|| TransactionDigests::new(self.transaction))
    }

    /// Minimal-encoding enforcement: always on under witness v0, opt-in
    /// via BIP62 for legacy scripts.
    pub fn require_minimal(&self) -> bool {
        self.version == ScriptVersion::WitnessV0
            || self.forks.is_enabled(ForkRules::BIP62)
    }

    /// Serialized operations from the last executed CODESEPARATOR onward,
    /// the base of the legacy signing subscript.
    pub fn subscript(&self) -> &[Operation] {
        &self.ops[self.jump..]
    }

    // Stack access.

    pub fn push(&mut self, element: ByteString) {
        self.stack.push(element);
    }

    pub fn push_bool(&mut self, value: bool) {
        self.stack.push(if value { vec![1] } else { vec![] });
    }

    pub fn push_number(&mut self, number: ScriptNum) {
        self.stack.push(number.encode());
    }

    pub fn pop(&mut self) -> Result<ByteString> {
        self.stack.pop().ok_or(ScriptError::InvalidStackOperation)
    }

    pub fn pop_bool(&mut self) -> Result<bool> {
        Ok(stack_true(&self.pop()?))
    }

    /// Pop an arithmetic operand, width-limited and minimality-checked per
    /// the active rules.
    pub fn pop_number(&mut self, max_size: usize) -> Result<ScriptNum> {
        let element = self.pop()?;
        ScriptNum::decode(&element, max_size, self.require_minimal())
    }

    /// Element `depth` entries below the top (0 is the top).
    pub fn peek(&self, depth: usize) -> Result<&ByteString> {
        if depth >= self.stack.len() {
            return Err(ScriptError::InvalidStackOperation);
        }
        Ok(&self.stack[self.stack.len() - 1 - depth])
    }

    /// Remove the element `depth` entries below the top.
    pub fn remove(&mut self, depth: usize) -> Result<ByteString> {
        if depth >= self.stack.len() {
            return Err(ScriptError::InvalidStackOperation);
        }
        let at = self.stack.len() - 1 - depth;
        Ok(self.stack.remove(at))
    }

    pub fn require_depth(&self, depth: usize) -> Result<()> {
        if self.stack.len() < depth {
            return Err(ScriptError::InvalidStackOperation);
        }
        Ok(())
    }

    pub fn stack_size(&self) -> usize {
        self.stack.len()
    }

    pub fn push_alternate(&mut self, element: ByteString) {
        self.alternate.push(element);
    }

    pub fn pop_alternate(&mut self) -> Result<ByteString> {
        self.alternate
            .pop()
            .ok_or(ScriptError::InvalidAltStackOperation)
    }

    /// Combined primary and alternate depth against the 1000-element cap,
    /// checked after every executed operation.
    pub fn check_stack_size(&self) -> Result<()> {
        if self.stack.len() + self.alternate.len() > MAX_STACK_SIZE {
            return Err(ScriptError::StackSize);
        }
        Ok(())
    }

    /// Push-size cap applied to every pushed element.
    pub fn check_element_size(size: usize) -> Result<()> {
        if size > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptError::PushSize);
        }
        Ok(())
    }

    // Conditional execution.

    pub fn begin_if(&mut self, value: bool) {
        self.condition.push(Condition {
            executing: value,
            ever_true: value,
        });
    }

    pub fn else_if(&mut self) -> Result<()> {
        match self.condition.last_mut() {
            Some(top) => {
                top.executing = !top.ever_true;
                top.ever_true = true;
                Ok(())
            }
            None => Err(ScriptError::UnbalancedConditional),
        }
    }

    pub fn end_if(&mut self) -> Result<()> {
        if self.condition.pop().is_none() {
            return Err(ScriptError::UnbalancedConditional);
        }
        Ok(())
    }

    /// True when every enclosing conditional branch is taken.
    pub fn is_executing(&self) -> bool {
        self.condition.iter().all(|condition| condition.executing)
    }

    /// A script must close every conditional it opens.
    pub fn is_balanced(&self) -> bool {
        self.condition.is_empty()
    }

    // Operation counting.

    /// Count one executed non-push operation against the ceiling.
    pub fn count_operation(&mut self) -> Result<()> {
        self.op_count += 1;
        if self.op_count > MAX_SCRIPT_OPS {
            return Err(ScriptError::OpCount);
        }
        Ok(())
    }

    /// CHECKMULTISIG adds its public key count on top of its own tick.
    pub fn count_multisig_keys(&mut self, keys: usize) -> Result<()> {
        self.op_count += keys;
        if self.op_count > MAX_SCRIPT_OPS {
            return Err(ScriptError::OpCount);
        }
        Ok(())
    }

    // Results.

    /// Script success: non-empty stack with a true top element.
    pub fn is_stack_true(&self) -> bool {
        match self.stack.last() {
            Some(top) => stack_true(top),
            None => false,
        }
    }

    /// Clean-stack requirement (P2SH policy, witness consensus): exactly
    /// one element remains.
    pub fn is_stack_clean(&self) -> bool {
        self.stack.len() == 1
    }
}

/// Stack truthiness: false is the empty string, any length of zero bytes,
/// or zeros capped by a bare sign byte (negative zero).
pub fn stack_true(element: &[u8]) -> bool {
    for (i, &byte) in element.iter().enumerate() {
        if byte != 0 {
            return !(i == element.len() - 1 && byte == 0x80);
        }
    }
    false
}
