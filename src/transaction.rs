use crate::{
    coin::{totals, Coin},
    hash::{emission_hash, Hash},
    keys::{Address, PublicKey},
    signature::{verify_sig, InvalidSignature, Signature},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unique identifier of one transaction output: the producing transaction,
/// the output position and the output value.
///
/// The derived ordering is the canonical one; batch operations process
/// addrids in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AddrId {
    pub tx_hash: Hash,
    pub index: u32,
    pub value: Coin,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<AddrId>,
    pub outputs: Vec<(Address, Coin)>,
}

impl Transaction {
    pub fn hash(&self) -> Hash {
        Hash::of(self)
    }

    /// The addrids this transaction produces, paired with the addresses they
    /// pay to.
    pub fn output_addr_ids(&self) -> impl Iterator<Item = (AddrId, Address)> + '_ {
        let tx_hash = self.hash();

        self.outputs
            .iter()
            .enumerate()
            .map(move |(index, (address, value))| {
                (
                    AddrId {
                        tx_hash,
                        index: index as u32,
                        value: *value,
                    },
                    *address,
                )
            })
    }

    /// The value invariant: per currency, inputs and outputs sum to the same
    /// amount. Emission transactions are exempt; they are only ever built by
    /// the bank and never pass through `check_tx`.
    pub fn valid_sum(&self) -> bool {
        if self.inputs.is_empty() || self.outputs.is_empty() {
            return false;
        }

        let inputs = totals(self.inputs.iter().map(|addr_id| &addr_id.value));
        let outputs = totals(self.outputs.iter().map(|(_, value)| value));

        match (inputs, outputs) {
            (Some(inputs), Some(outputs)) => inputs == outputs,
            _ => false,
        }
    }

    /// Whether this is the bank-minted emission transaction of `period_id`.
    pub fn is_emission_for(&self, period_id: u64) -> bool {
        match self.inputs.as_slice() {
            [input] => input.tx_hash == emission_hash(period_id) && input.index == 0,
            _ => false,
        }
    }
}

/// Spend policy of an address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStrategy {
    /// A single signature by the owner's key suffices.
    Default,
    /// `m` distinct signatures out of the listed parties.
    MOfN {
        m: usize,
        parties: BTreeSet<PublicKey>,
    },
}

impl Default for TxStrategy {
    fn default() -> Self {
        TxStrategy::Default
    }
}

impl TxStrategy {
    /// Whether `sigs` authorizes spending an output owned by `owner` in `tx`.
    pub fn authorizes(
        &self,
        owner: &Address,
        tx: &Transaction,
        sigs: &[(Address, Signature)],
    ) -> bool {
        match self {
            TxStrategy::Default => sigs.iter().any(|(address, signature)| {
                address == owner && verify_sig(address.key(), tx, signature).is_ok()
            }),
            TxStrategy::MOfN { m, parties } => {
                let valid: BTreeSet<PublicKey> = sigs
                    .iter()
                    .filter(|(address, signature)| {
                        parties.contains(&address.key())
                            && verify_sig(address.key(), tx, signature).is_ok()
                    })
                    .map(|(address, _)| address.key())
                    .collect();

                valid.len() >= *m
            }
        }
    }
}

/// Confirmations gathered by a client before committing: one per
/// `(owner mintette, spent addrid)` pair. A mintette owning several inputs
/// of the same transaction contributes one confirmation per input.
pub type CheckConfirmations =
    std::collections::BTreeMap<(crate::MintetteId, AddrId), CheckConfirmation>;

/// A mintette's signed statement that it tentatively accepted the spend of
/// one addrid by a transaction. The signature covers the transaction hash,
/// the addrid and the head of the mintette's action log at the time of the
/// check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConfirmation {
    pub addr_id: AddrId,
    pub log_head: Hash,
    pub period_id: u64,
    pub mintette_sig: Signature,
}

impl CheckConfirmation {
    pub fn verify(&self, key: PublicKey, tx_hash: Hash) -> Result<(), InvalidSignature> {
        verify_sig(
            key,
            &(tx_hash, self.addr_id, self.log_head),
            &self.mintette_sig,
        )
    }
}

/// A mintette's signed statement that it committed a transaction, together
/// with the bank's signature over the mintette's key (its DPK entry).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAcknowledgment {
    pub mintette_key: PublicKey,
    pub mintette_sig: Signature,
    pub bank_sig: Signature,
}
