use crate::{
    hash::Hash,
    transaction::{AddrId, CheckConfirmation, CheckConfirmations, Transaction},
};
use serde::{Deserialize, Serialize};

/// One record of a mintette's action log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEntry {
    /// A successful `check_tx`: the addrid was tentatively spent.
    Query {
        tx: Transaction,
        addr_id: AddrId,
        confirmation: CheckConfirmation,
    },
    /// A successful `commit_tx` with the owner confirmations that justified
    /// it.
    Commit {
        tx: Transaction,
        confirmations: CheckConfirmations,
    },
    /// An epoch was sealed into the LBlock with this hash.
    CloseEpoch { lblock_hash: Hash },
}

/// Hash-chained, append-only log of everything a mintette did within one
/// period.
///
/// Every stored entry carries the head it chained from; the head after an
/// entry is the digest of the `(entry, prev)` pair. The first entry of a
/// node's life chains from [`Hash::zero`]; the first entry of a later period
/// chains from the archived head of the period before it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLog {
    origin: Hash,
    entries: Vec<(LogEntry, Hash)>,
}

impl ActionLog {
    pub fn new() -> ActionLog {
        Self::with_origin(Hash::zero())
    }

    pub fn with_origin(origin: Hash) -> ActionLog {
        ActionLog {
            origin,
            entries: Vec::new(),
        }
    }

    pub fn origin(&self) -> Hash {
        self.origin
    }

    /// The current chain head: the digest of the newest entry, or the origin
    /// for an empty log.
    pub fn head(&self) -> Hash {
        match self.entries.last() {
            None => self.origin,
            Some(pair) => Hash::of(pair),
        }
    }

    /// Append an entry, chaining it to the current head. Returns the new
    /// head.
    pub fn append(&mut self, entry: LogEntry) -> Hash {
        let prev = self.head();
        self.entries.push((entry, prev));

        self.head()
    }

    pub fn entries(&self) -> &[(LogEntry, Hash)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walk the chain and verify that every stored `prev` matches the
    /// recomputed head of the entry before it.
    pub fn verify_chain(&self) -> bool {
        let mut head = self.origin;

        for pair in &self.entries {
            let (_, prev) = pair;
            if *prev != head {
                return false;
            }
            head = Hash::of(pair);
        }

        true
    }

    /// Split the period log into epoch slices, oldest first, each ending with
    /// its `CloseEpoch` entry. `None` if the log has entries trailing the
    /// last seal, or no seal at all.
    pub fn epoch_slices(&self) -> Option<Vec<&[(LogEntry, Hash)]>> {
        let mut slices = Vec::new();
        let mut start = 0;

        for (i, (entry, _)) in self.entries.iter().enumerate() {
            if let LogEntry::CloseEpoch { .. } = entry {
                slices.push(&self.entries[start..=i]);
                start = i + 1;
            }
        }

        if slices.is_empty() || start != self.entries.len() {
            return None;
        }

        Some(slices)
    }
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Transactions committed within one epoch slice, in commit order.
pub fn slice_commits<'a>(slice: &'a [(LogEntry, Hash)]) -> Vec<&'a Transaction> {
    slice
        .iter()
        .filter_map(|(entry, _)| match entry {
            LogEntry::Commit { tx, .. } => Some(tx),
            _ => None,
        })
        .collect()
}

/// A period log is acceptable iff it chains from the head the bank archived
/// for this mintette at the end of the previous period.
pub fn check_action_log(expected_origin: Hash, log: &ActionLog) -> bool {
    log.origin() == expected_origin && log.verify_chain()
}
