//! Soft/hard-fork rule activation flags
//!
//! A single bitmask threaded through every opcode implementation with
//! version-gated behavior. The flags are supplied by the chain layer per
//! block-height/context and are never mutated by the interpreter. Named
//! groups exist for rules that activate together (BIP34-style version
//! supermajority, BIP9 bit 0 and bit 1 deployments).

use serde::{Deserialize, Serialize};

/// Immutable rule set for one validation call.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub struct ForkRules(pub u32);

impl ForkRules {
    /// Original rule set (no soft forks active).
    pub const NO_RULES: ForkRules = ForkRules(0);

    /// Testnet/regtest minimum-difficulty block exception.
    pub const EASY_BLOCKS: ForkRules = ForkRules(1 << 0);

    /// Pay-to-script-hash evaluation (BIP16).
    pub const BIP16: ForkRules = ForkRules(1 << 1);

    /// Disallow duplicate unspent transaction ids (BIP30).
    pub const BIP30: ForkRules = ForkRules(1 << 2);

    /// Coinbase must include block height (BIP34).
    pub const BIP34: ForkRules = ForkRules(1 << 3);

    /// Strict DER signature encoding (BIP66).
    pub const BIP66: ForkRules = ForkRules(1 << 4);

    /// OP_CHECKLOCKTIMEVERIFY (BIP65).
    pub const BIP65: ForkRules = ForkRules(1 << 5);

    /// Buried deployments hardening (BIP90).
    pub const BIP90: ForkRules = ForkRules(1 << 6);

    /// Minimal-encoding and push-only policy rules (BIP62).
    pub const BIP62: ForkRules = ForkRules(1 << 7);

    /// Sequence-number relative locktime (BIP68).
    pub const BIP68: ForkRules = ForkRules(1 << 8);

    /// OP_CHECKSEQUENCEVERIFY (BIP112).
    pub const BIP112: ForkRules = ForkRules(1 << 9);

    /// Median-time-past locktime evaluation (BIP113).
    pub const BIP113: ForkRules = ForkRules(1 << 10);

    /// Segregated witness (BIP141).
    pub const BIP141: ForkRules = ForkRules(1 << 11);

    /// Version-0 witness signature hashing (BIP143).
    pub const BIP143: ForkRules = ForkRules(1 << 12);

    /// CHECKMULTISIG dummy element must be null (BIP147).
    pub const BIP147: ForkRules = ForkRules(1 << 13);

    /// Taproot outputs (BIP341).
    pub const BIP341: ForkRules = ForkRules(1 << 14);

    /// Tapscript leaf execution (BIP342).
    pub const BIP342: ForkRules = ForkRules(1 << 15);

    /// Policy: reject spends of unknown witness versions instead of
    /// treating them as anyone-can-spend.
    pub const DISCOURAGE_UPGRADABLE_WITNESS: ForkRules = ForkRules(1 << 16);

    /// Difficulty retargeting enabled (disabled on regtest).
    pub const RETARGET: ForkRules = ForkRules(1 << 30);

    /// Scripts verified elsewhere (checkpointed sync).
    pub const UNVERIFIED: ForkRules = ForkRules(1 << 31);

    /// Rules activated by BIP34-style block-version supermajority.
    pub const BIP34_ACTIVATIONS: ForkRules =
        ForkRules(Self::BIP34.0 | Self::BIP65.0 | Self::BIP66.0);

    /// BIP9 bit 0 deployment group (csv).
    pub const BIP9_BIT0_GROUP: ForkRules =
        ForkRules(Self::BIP68.0 | Self::BIP112.0 | Self::BIP113.0);

    /// BIP9 bit 1 deployment group (segwit).
    pub const BIP9_BIT1_GROUP: ForkRules =
        ForkRules(Self::BIP141.0 | Self::BIP143.0 | Self::BIP147.0);

    /// Taproot deployment group.
    pub const BIP9_BIT2_GROUP: ForkRules =
        ForkRules(Self::BIP341.0 | Self::BIP342.0);

    /// Every consensus rule (excludes policy and sync bits).
    pub const ALL_RULES: ForkRules = ForkRules(
        Self::BIP16.0
            | Self::BIP30.0
            | Self::BIP62.0
            | Self::BIP90.0
            | Self::BIP34_ACTIVATIONS.0
            | Self::BIP9_BIT0_GROUP.0
            | Self::BIP9_BIT1_GROUP.0
            | Self::BIP9_BIT2_GROUP.0,
    );

    /// Membership test for a rule or a whole group.
    #[inline]
    pub fn is_enabled(self, rule: ForkRules) -> bool {
        self.0 & rule.0 == rule.0
    }

    #[inline]
    pub fn union(self, other: ForkRules) -> ForkRules {
        ForkRules(self.0 | other.0)
    }
}

impl std::ops::BitOr for ForkRules {
    type Output = ForkRules;

    fn bitor(self, rhs: ForkRules) -> ForkRules {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for ForkRules {
    fn bitor_assign(&mut self, rhs: ForkRules) {
        self.0 |= rhs.0;
    }
}

/// Rule set active at a mainnet block height.
///
/// Heights are the historical activation points; BIP9 groups switch on as
/// units, matching how the deployments locked in.
pub fn height_to_rules(height: u64) -> ForkRules {
    let mut rules = ForkRules::NO_RULES | ForkRules::RETARGET;

    if height >= 173_805 {
        rules |= ForkRules::BIP16;
    }
    if height >= 227_931 {
        rules |= ForkRules::BIP34;
    }
    if height >= 363_725 {
        rules |= ForkRules::BIP66;
    }
    if height >= 388_381 {
        rules |= ForkRules::BIP65;
    }
    if height >= 419_328 {
        rules |= ForkRules::BIP9_BIT0_GROUP;
    }
    if height >= 481_824 {
        rules |= ForkRules::BIP9_BIT1_GROUP;
    }
    if height >= 709_632 {
        rules |= ForkRules::BIP9_BIT2_GROUP;
    }

    rules
}
