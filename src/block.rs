use crate::{
    action_log::{slice_commits, LogEntry},
    coin::Coin,
    hash::Hash,
    keys::{Address, KeyPair, PublicKey},
    signature::{verify_sig, InvalidSignature, Signature},
    transaction::{Transaction, TxStrategy},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mintette-local block: one sealed epoch of committed transactions, signed
/// by the mintette that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LBlock {
    pub prev_hblock_hash: Hash,
    pub transactions: Vec<Transaction>,
    /// Head of the action log at the moment of sealing, before the
    /// `CloseEpoch` entry was appended.
    pub log_head: Hash,
    pub signature: Signature,
}

impl LBlock {
    pub fn seal(
        keypair: &KeyPair,
        prev_hblock_hash: Hash,
        transactions: Vec<Transaction>,
        log_head: Hash,
    ) -> LBlock {
        let signature = keypair.sign(&(prev_hblock_hash, merkle_root(&transactions), log_head));

        LBlock {
            prev_hblock_hash,
            transactions,
            log_head,
            signature,
        }
    }

    pub fn hash(&self) -> Hash {
        Hash::of(&(
            self.prev_hblock_hash,
            merkle_root(&self.transactions),
            self.log_head,
        ))
    }

    pub fn verify(&self, key: PublicKey) -> Result<(), InvalidSignature> {
        verify_sig(
            key,
            &(
                self.prev_hblock_hash,
                merkle_root(&self.transactions),
                self.log_head,
            ),
            &self.signature,
        )
    }
}

/// Bank-signed period-final block; the canonical chain is a list of these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HBlock {
    pub prev_hash: Hash,
    pub merkle_root: Hash,
    pub transactions: Vec<Transaction>,
    pub signature: Signature,
    /// The address-strategy map carried along for the period this block
    /// opens.
    pub addresses: BTreeMap<Address, TxStrategy>,
}

impl HBlock {
    /// Block identity: digest of the signed body. The signature itself does
    /// not contribute, so the id is fixed before signing.
    pub fn hash(&self) -> Hash {
        Hash::of(&(self.prev_hash, self.merkle_root))
    }

    pub fn verify(&self, bank_key: PublicKey) -> Result<(), InvalidSignature> {
        if self.merkle_root != merkle_root(&self.transactions) {
            return Err(InvalidSignature);
        }

        verify_sig(
            bank_key,
            &(self.prev_hash, self.merkle_root),
            &self.signature,
        )
    }
}

/// Build the period-final block over `transactions`, linking it to the
/// previous block.
pub fn mk_hblock(
    transactions: Vec<Transaction>,
    prev_hash: Hash,
    addresses: BTreeMap<Address, TxStrategy>,
    bank: &KeyPair,
) -> HBlock {
    let merkle_root = merkle_root(&transactions);
    let signature = bank.sign(&(prev_hash, merkle_root));

    HBlock {
        prev_hash,
        merkle_root,
        transactions,
        signature,
        addresses,
    }
}

/// The period-0 block: no prior block, no emission id, a single inputless
/// transaction distributing the initial coins.
pub fn mk_genesis_hblock(bank: &KeyPair, outputs: Vec<(Address, Coin)>) -> HBlock {
    let genesis_tx = Transaction {
        inputs: Vec::new(),
        outputs,
    };

    mk_hblock(vec![genesis_tx], Hash::zero(), BTreeMap::new(), bank)
}

/// Cross-validate one LBlock against the epoch slice of the action log that
/// produced it.
pub fn check_lblock(
    key: PublicKey,
    expected_prev_hblock_hash: Hash,
    epoch_slice: &[(LogEntry, Hash)],
    blk: &LBlock,
) -> bool {
    if blk.prev_hblock_hash != expected_prev_hblock_hash {
        return false;
    }
    if blk.verify(key).is_err() {
        return false;
    }

    // The slice must record exactly the block's transactions, in order, and
    // end with the seal of this very block chained from the block's log head.
    let commits = slice_commits(epoch_slice);
    if commits.len() != blk.transactions.len()
        || commits
            .iter()
            .zip(blk.transactions.iter())
            .any(|(logged, sealed)| *logged != sealed)
    {
        return false;
    }

    match epoch_slice.last() {
        Some((LogEntry::CloseEpoch { lblock_hash }, prev)) => {
            *lblock_hash == blk.hash() && *prev == blk.log_head
        }
        _ => false,
    }
}

/// Merkle root over the transaction hashes: pairwise folds, odd leaf
/// promoted, zero for an empty list.
pub fn merkle_root(transactions: &[Transaction]) -> Hash {
    let mut layer: Vec<Hash> = transactions.iter().map(Transaction::hash).collect();

    if layer.is_empty() {
        return Hash::zero();
    }

    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| {
                if pair.len() == 2 {
                    Hash::combine(&pair[0], &pair[1])
                } else {
                    pair[0]
                }
            })
            .collect();
    }

    layer[0]
}
