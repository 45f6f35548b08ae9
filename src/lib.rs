#![warn(
    unused_extern_crates,
    missing_debug_implementations,
    rust_2018_idioms,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::fallible_impl_from,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap,
    clippy::dbg_macro
)]
#![cfg_attr(not(test), warn(clippy::unwrap_used))]
#![forbid(unsafe_code)]

pub mod action_log;
pub mod bank;
pub mod block;
pub mod coin;
pub mod config;
pub mod hash;
pub mod keys;
pub mod mintette;
pub mod owners;
pub mod rpc;
pub mod signature;
pub mod store;
pub mod transaction;

#[cfg(test)]
mod test_harness;

pub use action_log::{check_action_log, ActionLog, LogEntry};
pub use bank::{Bank, BankError, NewPeriodData};
pub use block::{check_lblock, mk_genesis_hblock, mk_hblock, HBlock, LBlock};
pub use coin::{Coin, Currency};
pub use config::Config;
pub use hash::{emission_hash, Hash};
pub use keys::{Address, KeyPair, PublicKey};
pub use mintette::{Mintette, MintetteError, PeriodResult};
pub use owners::{is_majority, owners};
pub use signature::{verify_sig, InvalidSignature, Signature};
pub use store::Store;
pub use transaction::{AddrId, CheckConfirmation, CommitAcknowledgment, Transaction, TxStrategy};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Position of a mintette in the bank's roster.
pub type MintetteId = usize;

pub type PeriodId = u64;

/// Unspent outputs, keyed by addrid, valued by the address they pay to.
pub type Utxo = BTreeMap<AddrId, Address>;

/// Bank-signed list of mintette keys, aligned with the roster.
pub type Dpk = Vec<(PublicKey, Signature)>;

/// Network location of a mintette, as kept in the bank's roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintetteInfo {
    pub host: String,
    pub port: u16,
}

impl MintetteInfo {
    pub fn new(host: impl Into<String>, port: u16) -> MintetteInfo {
        MintetteInfo {
            host: host.into(),
            port,
        }
    }
}

/// Network location of an explorer following the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerInfo {
    pub host: String,
    pub port: u16,
}

impl ExplorerInfo {
    pub fn new(host: impl Into<String>, port: u16) -> ExplorerInfo {
        ExplorerInfo {
            host: host.into(),
            port,
        }
    }
}

/// Coins minted by the emission transaction of every period.
pub const PERIOD_REWARD: u64 = 1000;

/// Share of the emission kept by the bank: numerator and denominator.
pub const BANK_REWARD_SHARE: (u64, u64) = (1, 10);

/// A mintette is evicted after this many consecutive missing or invalid
/// period results.
pub const EVICTION_THRESHOLD: u32 = 3;
