//! Script engine consensus constants

/// Maximum serialized script length in bytes
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Maximum combined primary + alternate stack depth during execution
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum number of executed non-push operations per script
pub const MAX_SCRIPT_OPS: usize = 201;

/// Maximum size of a stack element (BIP141: witness elements up to 520 bytes)
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum number of public keys in a CHECKMULTISIG
pub const MAX_MULTISIG_KEYS: usize = 20;

/// Maximum byte width of a number operand for arithmetic opcodes
pub const MAX_NUMBER_SIZE: usize = 4;

/// Maximum byte width of a CHECKLOCKTIMEVERIFY/CHECKSEQUENCEVERIFY operand
///
/// Locktimes are unsigned 32-bit values, so five bytes are needed to carry
/// the full range through the sign-magnitude stack encoding.
pub const MAX_LOCKTIME_NUMBER_SIZE: usize = 5;

/// Coinbase maturity requirement: 100 blocks
///
/// Coinbase outputs cannot be spent until 100 blocks deep. This helps
/// secure the network against deep reorgs invalidating spends.
pub const COINBASE_MATURITY: u64 = 100;

/// Lock time threshold: values below this are block heights, values at or
/// above are Unix timestamps
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Sequence number marking an input final (locktime ignored)
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// BIP68: sequence bit 31 disables relative locktime
pub const SEQUENCE_DISABLE_FLAG: u32 = 0x8000_0000;

/// BIP68: sequence bit 22 selects time-based (vs block-based) locktime
pub const SEQUENCE_TYPE_FLAG: u32 = 0x0040_0000;

/// BIP68: sequence bits 0-15 carry the relative locktime value
pub const SEQUENCE_LOCKTIME_MASK: u32 = 0x0000_ffff;

/// Output index of a null (coinbase) outpoint
pub const NULL_OUTPUT_INDEX: u32 = 0xffff_ffff;

/// Witness program length for P2WPKH (v0, 20 bytes)
pub const WITNESS_V0_KEYHASH_SIZE: usize = 20;

/// Witness program length for P2WSH (v0, 32 bytes)
pub const WITNESS_V0_SCRIPTHASH_SIZE: usize = 32;
