use crate::{
    action_log::{ActionLog, LogEntry},
    bank::NewPeriodData,
    block::LBlock,
    hash::Hash,
    keys::{Address, KeyPair, PublicKey},
    owners::owners,
    signature::{verify_sig, Signature},
    transaction::{
        AddrId, CheckConfirmation, CheckConfirmations, CommitAcknowledgment, Transaction,
        TxStrategy,
    },
    Config, Dpk, MintetteId, MintetteInfo, PeriodId, Utxo,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::mem;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MintetteError {
    #[error("addrid is not an input of the transaction")]
    InvalidTxInput,
    #[error("addrid is not an unspent output of this mintette")]
    NotUnspent,
    #[error("addrid is already spent within this period")]
    DoubleSpend,
    #[error("transaction inputs and outputs do not balance")]
    InvalidSum,
    #[error("signatures do not satisfy the owner's spend strategy")]
    UnauthorizedSpend,
    #[error("signature is invalid")]
    BadSignature,
    #[error("confirmations do not cover all owners of the transaction")]
    NotAllOwnersConfirmed,
    #[error("commit of a transaction that was never checked here")]
    CommitWithoutCheck,
    #[error("operation addresses period {requested}, current period is {current}")]
    WrongPeriod {
        requested: PeriodId,
        current: PeriodId,
    },
    #[error("mintette is not accepting transactions")]
    NotActive,
    #[error("internal error: {0}")]
    Internal(String),
}

/// What a mintette hands to the bank when its period is finished.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodResult {
    pub period_id: PeriodId,
    /// Sealed blocks of the period, most recent first.
    pub lblocks: Vec<LBlock>,
    pub action_log: ActionLog,
}

/// `check_tx` and `commit_tx` are accepted only while running; `finish_period`
/// seals the period and `start_period` is the only operation valid once
/// sealed. A fresh mintette starts sealed, waiting for its first period
/// announcement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Phase {
    Running,
    Sealed,
}

/// The whole transactional state of one mintette. All mutating operations
/// are total functions: they either return the typed error and leave the
/// state untouched, or apply their full effect.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Mintette {
    phase: Phase,
    period_id: PeriodId,
    mintette_id: Option<MintetteId>,
    /// The id this node held in the previous period; ids may be reassigned
    /// across periods.
    previous_mintette_id: Option<MintetteId>,
    utxo: Utxo,
    /// Addrids tentatively spent in the current period, mapped to the
    /// spending transaction.
    pset: BTreeMap<AddrId, Transaction>,
    /// Acknowledgments of transactions committed this period; repeat commits
    /// are answered from here.
    committed: BTreeMap<Hash, CommitAcknowledgment>,
    /// Commit-ordered transactions of the epoch being built.
    epoch_txs: Vec<Transaction>,
    /// Blocks sealed in the current period, most recent first.
    lblocks: Vec<LBlock>,
    action_log: ActionLog,
    archived_logs: BTreeMap<PeriodId, ActionLog>,
    archived_blocks: BTreeMap<PeriodId, Vec<LBlock>>,
    /// Head of the archived log of the last finished period; origin of the
    /// next period's log.
    prior_log_head: Hash,
    mintettes: Vec<MintetteInfo>,
    dpk: Dpk,
    addresses: BTreeMap<Address, TxStrategy>,
    last_hblock_hash: Hash,
    /// The bank's key, known from node configuration. Period announcements
    /// are authenticated against it.
    bank_key: PublicKey,
    owner_fanout: usize,
    log_retention_periods: u64,
}

impl Mintette {
    pub fn new(config: &Config, bank_key: PublicKey) -> Mintette {
        Mintette {
            bank_key,
            phase: Phase::Sealed,
            period_id: 0,
            mintette_id: None,
            previous_mintette_id: None,
            utxo: BTreeMap::new(),
            pset: BTreeMap::new(),
            committed: BTreeMap::new(),
            epoch_txs: Vec::new(),
            lblocks: Vec::new(),
            action_log: ActionLog::new(),
            archived_logs: BTreeMap::new(),
            archived_blocks: BTreeMap::new(),
            prior_log_head: Hash::zero(),
            mintettes: Vec::new(),
            dpk: Vec::new(),
            addresses: BTreeMap::new(),
            last_hblock_hash: Hash::zero(),
            owner_fanout: config.owner_fanout,
            log_retention_periods: config.log_retention_periods,
        }
    }

    /// Tentatively accept the spend of `addr_id` by `tx`, checking the five
    /// acceptance conditions in order. On success the addrid joins the pset
    /// and a query entry is chained onto the action log.
    pub fn check_not_double_spent(
        &mut self,
        sk: &KeyPair,
        tx: &Transaction,
        addr_id: AddrId,
        sigs: &[(Address, Signature)],
    ) -> Result<CheckConfirmation, MintetteError> {
        if self.phase != Phase::Running {
            return Err(MintetteError::NotActive);
        }

        if !tx.inputs.contains(&addr_id) {
            return Err(MintetteError::InvalidTxInput);
        }

        let owner = *self
            .utxo
            .get(&addr_id)
            .ok_or(MintetteError::NotUnspent)?;

        if self.pset.contains_key(&addr_id) {
            return Err(MintetteError::DoubleSpend);
        }

        if !tx.valid_sum() {
            return Err(MintetteError::InvalidSum);
        }

        let strategy = self
            .addresses
            .get(&owner)
            .cloned()
            .unwrap_or_default();
        if !strategy.authorizes(&owner, tx, sigs) {
            return Err(MintetteError::UnauthorizedSpend);
        }

        let log_head = self.action_log.head();
        let confirmation = CheckConfirmation {
            addr_id,
            log_head,
            period_id: self.period_id,
            mintette_sig: sk.sign(&(tx.hash(), addr_id, log_head)),
        };

        self.pset.insert(addr_id, tx.clone());
        self.action_log.append(LogEntry::Query {
            tx: tx.clone(),
            addr_id,
            confirmation: confirmation.clone(),
        });

        debug!(tx = %tx.hash(), "checked spend");

        Ok(confirmation)
    }

    /// Check every addrid of the batch independently; one entry failing does
    /// not roll back another. Entries are processed in addrid order, which
    /// fixes the order of log appends among the successes.
    pub fn check_tx_batch(
        &mut self,
        sk: &KeyPair,
        tx: &Transaction,
        sigs: &BTreeMap<AddrId, Vec<(Address, Signature)>>,
    ) -> BTreeMap<AddrId, Result<CheckConfirmation, MintetteError>> {
        sigs.iter()
            .map(|(addr_id, sigs)| {
                let result = self.check_not_double_spent(sk, tx, *addr_id, sigs);
                (*addr_id, result)
            })
            .collect()
    }

    /// Commit a transaction for which the client gathered confirmations from
    /// every owner of every input. Idempotent: committing the same
    /// transaction again within the period returns the recorded
    /// acknowledgment.
    pub fn commit_tx(
        &mut self,
        sk: &KeyPair,
        tx: &Transaction,
        confirmations: &CheckConfirmations,
    ) -> Result<CommitAcknowledgment, MintetteError> {
        if self.phase != Phase::Running {
            return Err(MintetteError::NotActive);
        }

        let tx_hash = tx.hash();

        for input in &tx.inputs {
            for owner_id in owners(self.mintettes.len(), &input.tx_hash, self.owner_fanout) {
                let confirmation = confirmations
                    .get(&(owner_id, *input))
                    .ok_or(MintetteError::NotAllOwnersConfirmed)?;
                let (owner_key, _) = self
                    .dpk
                    .get(owner_id)
                    .ok_or(MintetteError::NotAllOwnersConfirmed)?;

                if confirmation.addr_id != *input
                    || confirmation.verify(*owner_key, tx_hash).is_err()
                {
                    return Err(MintetteError::NotAllOwnersConfirmed);
                }
            }
        }

        // The inputs this mintette is responsible for must have passed a
        // check for this very transaction.
        for input in &tx.inputs {
            if self.utxo.contains_key(input) && self.pset.get(input) != Some(tx) {
                return Err(MintetteError::CommitWithoutCheck);
            }
        }

        if let Some(ack) = self.committed.get(&tx_hash) {
            return Ok(ack.clone());
        }

        let bank_sig = self
            .dpk
            .iter()
            .find(|(key, _)| *key == sk.public())
            .map(|(_, bank_sig)| *bank_sig)
            .ok_or(MintetteError::NotActive)?;

        for input in &tx.inputs {
            self.utxo.remove(input);
            self.pset.remove(input);
        }

        if let Some(my_id) = self.mintette_id {
            let owner_ids = owners(self.mintettes.len(), &tx_hash, self.owner_fanout);
            if owner_ids.contains(&my_id) {
                for (addr_id, address) in tx.output_addr_ids() {
                    self.utxo.insert(addr_id, address);
                }
            }
        }

        let ack = CommitAcknowledgment {
            mintette_key: sk.public(),
            mintette_sig: sk.sign(&tx_hash),
            bank_sig,
        };

        self.committed.insert(tx_hash, ack.clone());
        self.epoch_txs.push(tx.clone());
        self.action_log.append(LogEntry::Commit {
            tx: tx.clone(),
            confirmations: confirmations.clone(),
        });

        debug!(tx = %tx_hash, "committed transaction");

        Ok(ack)
    }

    /// Seal the period: pending transactions become the period's final
    /// LBlock, the log is closed and archived, and the mintette stops
    /// accepting transactions until the next period announcement. Does not
    /// advance the period id; `start_period` does.
    pub fn finish_period(
        &mut self,
        sk: &KeyPair,
        period_id: PeriodId,
    ) -> Result<PeriodResult, MintetteError> {
        if self.phase != Phase::Running {
            return Err(MintetteError::NotActive);
        }
        if period_id != self.period_id {
            return Err(MintetteError::WrongPeriod {
                requested: period_id,
                current: self.period_id,
            });
        }

        let transactions = mem::take(&mut self.epoch_txs);
        let log_head = self.action_log.head();
        let blk = LBlock::seal(sk, self.last_hblock_hash, transactions, log_head);
        self.action_log.append(LogEntry::CloseEpoch {
            lblock_hash: blk.hash(),
        });
        self.lblocks.insert(0, blk);

        self.archived_logs.insert(period_id, self.action_log.clone());
        self.archived_blocks
            .insert(period_id, self.lblocks.clone());
        self.prior_log_head = self.action_log.head();

        let result = PeriodResult {
            period_id,
            lblocks: mem::take(&mut self.lblocks),
            action_log: self.action_log.clone(),
        };

        self.pset.clear();
        self.committed.clear();
        self.phase = Phase::Sealed;

        info!(period = period_id, "period finished");

        Ok(result)
    }

    /// Adopt the new period announced by the bank. Valid only while sealed.
    /// The block and the delegation keys must carry the bank's signature.
    pub fn start_period(&mut self, npd: NewPeriodData) -> Result<(), MintetteError> {
        if self.phase != Phase::Sealed {
            return Err(MintetteError::NotActive);
        }

        if npd.hblock.verify(self.bank_key).is_err() {
            return Err(MintetteError::BadSignature);
        }
        for (key, bank_sig) in &npd.dpk {
            if verify_sig(self.bank_key, key, bank_sig).is_err() {
                return Err(MintetteError::BadSignature);
            }
        }

        self.previous_mintette_id = self.mintette_id;

        match npd.payload {
            Some((id, utxo)) => {
                self.mintette_id = Some(id);
                self.utxo = utxo;
            }
            None => {
                // Ownership assignments did not change; advance the retained
                // utxo by the transactions of the new block. Outputs first,
                // so a spend of an output created in the same block leaves
                // no trace.
                if let Some(my_id) = self.mintette_id {
                    for tx in &npd.hblock.transactions {
                        let owner_ids =
                            owners(npd.mintettes.len(), &tx.hash(), self.owner_fanout);
                        if owner_ids.contains(&my_id) {
                            for (addr_id, address) in tx.output_addr_ids() {
                                self.utxo.insert(addr_id, address);
                            }
                        }
                    }
                }
                for tx in &npd.hblock.transactions {
                    for input in &tx.inputs {
                        self.utxo.remove(input);
                    }
                }
            }
        }

        self.mintettes = npd.mintettes;
        self.dpk = npd.dpk;
        self.addresses = npd.addresses;
        self.pset.clear();
        self.committed.clear();
        self.epoch_txs.clear();
        self.lblocks.clear();
        self.action_log = ActionLog::with_origin(self.prior_log_head);
        self.last_hblock_hash = npd.hblock.hash();
        self.period_id = npd.period_id;
        self.phase = Phase::Running;

        self.purge_archives();

        info!(period = self.period_id, id = ?self.mintette_id, "period started");

        Ok(())
    }

    /// The current period, or `None` for a node that never joined one. A
    /// store failure surfaces as an error at the RPC boundary, so the two
    /// cases stay distinguishable.
    pub fn period(&self) -> Option<PeriodId> {
        self.mintette_id.map(|_| self.period_id)
    }

    pub fn id(&self) -> Option<MintetteId> {
        self.mintette_id
    }

    pub fn previous_id(&self) -> Option<MintetteId> {
        self.previous_mintette_id
    }

    pub fn utxo(&self) -> &Utxo {
        &self.utxo
    }

    pub fn pset(&self) -> &BTreeMap<AddrId, Transaction> {
        &self.pset
    }

    /// Sealed blocks of `period_id`, if still retained.
    pub fn blocks(&self, period_id: PeriodId) -> Option<&[LBlock]> {
        if period_id == self.period_id && self.phase == Phase::Running {
            return Some(&self.lblocks);
        }

        self.archived_blocks.get(&period_id).map(Vec::as_slice)
    }

    /// Action log of `period_id`, if still retained.
    pub fn logs(&self, period_id: PeriodId) -> Option<&ActionLog> {
        if period_id == self.period_id && self.phase == Phase::Running {
            return Some(&self.action_log);
        }

        self.archived_logs.get(&period_id)
    }

    fn purge_archives(&mut self) {
        let cutoff = self
            .period_id
            .saturating_sub(self.log_retention_periods);

        self.archived_logs = mem::take(&mut self.archived_logs)
            .into_iter()
            .filter(|(period, _)| *period >= cutoff)
            .collect();
        self.archived_blocks = mem::take(&mut self.archived_blocks)
            .into_iter()
            .filter(|(period, _)| *period >= cutoff)
            .collect();
    }
}
