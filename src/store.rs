use crate::{
    bank::{Bank, NewPeriodData},
    keys::{Address, KeyPair},
    mintette::{Mintette, PeriodResult},
    signature::Signature,
    transaction::{AddrId, CheckConfirmations, Transaction},
    Config, PeriodId,
};
use anyhow::{anyhow, Context};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{marker::PhantomData, path::Path};

const SNAPSHOT_KEY: &[u8] = b"snapshot";
const WAL_TREE: &str = "wal";

/// Snapshot-plus-log persistence for a node state.
///
/// The state record is written out in full every `snapshot_interval`
/// operations; in between, each mutating operation is appended to the
/// write-ahead log. Recovery loads the snapshot and replays the log through
/// the caller's apply function. Without a path the store is volatile.
pub struct Store<S, E> {
    backend: Backend,
    snapshot_interval: u64,
    appended_since_snapshot: u64,
    _types: PhantomData<(S, E)>,
}

enum Backend {
    Memory {
        snapshot: Option<Vec<u8>>,
        wal: Vec<Vec<u8>>,
    },
    Sled {
        db: sled::Db,
        wal: sled::Tree,
        next_seq: u64,
    },
}

impl<S, E> Store<S, E>
where
    S: Serialize + DeserializeOwned,
    E: Serialize + DeserializeOwned,
{
    /// Volatile store; state dies with the process.
    pub fn in_memory(config: &Config) -> Store<S, E> {
        Store {
            backend: Backend::Memory {
                snapshot: None,
                wal: Vec::new(),
            },
            snapshot_interval: config.snapshot_interval,
            appended_since_snapshot: 0,
            _types: PhantomData,
        }
    }

    pub fn open(path: &Path, config: &Config) -> anyhow::Result<Store<S, E>> {
        let db = sled::open(path)
            .with_context(|| format!("could not open the store at {}", path.display()))?;
        let wal = db.open_tree(WAL_TREE).context("could not open the log")?;
        let next_seq = match wal.last().context("could not read the log")? {
            Some((key, _)) => decode_seq(&key)? + 1,
            None => 0,
        };

        Ok(Store {
            backend: Backend::Sled { db, wal, next_seq },
            snapshot_interval: config.snapshot_interval,
            appended_since_snapshot: 0,
            _types: PhantomData,
        })
    }

    /// Log one operation; rolls the snapshot forward once the log reaches
    /// the configured interval.
    pub fn append(&mut self, state: &S, entry: &E) -> anyhow::Result<()> {
        let bytes = serialize(entry)?;

        match &mut self.backend {
            Backend::Memory { wal, .. } => wal.push(bytes),
            Backend::Sled { wal, next_seq, .. } => {
                wal.insert(next_seq.to_be_bytes(), bytes)
                    .context("could not append to the log")?;
                *next_seq += 1;
            }
        }

        self.appended_since_snapshot += 1;
        if self.appended_since_snapshot >= self.snapshot_interval {
            self.persist(state)?;
        }

        Ok(())
    }

    /// Write a full snapshot and truncate the log.
    pub fn persist(&mut self, state: &S) -> anyhow::Result<()> {
        let bytes = serialize(state)?;

        match &mut self.backend {
            Backend::Memory { snapshot, wal } => {
                *snapshot = Some(bytes);
                wal.clear();
            }
            Backend::Sled { db, wal, next_seq } => {
                db.insert(SNAPSHOT_KEY, bytes)
                    .context("could not write the snapshot")?;
                wal.clear().context("could not truncate the log")?;
                *next_seq = 0;
                db.flush().context("could not flush the store")?;
            }
        }

        self.appended_since_snapshot = 0;

        Ok(())
    }

    /// Rebuild the state: the latest snapshot (or `fresh` if none was ever
    /// taken) with the logged operations replayed over it.
    pub fn recover(&self, fresh: S, mut apply: impl FnMut(&mut S, E)) -> anyhow::Result<S> {
        let (snapshot, wal) = match &self.backend {
            Backend::Memory { snapshot, wal } => (snapshot.clone(), wal.clone()),
            Backend::Sled { db, wal, .. } => {
                let snapshot = db
                    .get(SNAPSHOT_KEY)
                    .context("could not read the snapshot")?
                    .map(|bytes| bytes.to_vec());
                let entries = wal
                    .iter()
                    .map(|item| item.map(|(_, value)| value.to_vec()))
                    .collect::<Result<Vec<_>, _>>()
                    .context("could not read the log")?;

                (snapshot, entries)
            }
        };

        let mut state = match snapshot {
            Some(bytes) => deserialize(&bytes).context("could not decode the snapshot")?,
            None => fresh,
        };

        for bytes in wal {
            let entry = deserialize(&bytes).context("could not decode a log entry")?;
            apply(&mut state, entry);
        }

        Ok(state)
    }
}

impl<S, E> std::fmt::Debug for Store<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            Backend::Memory { .. } => "memory",
            Backend::Sled { .. } => "sled",
        };

        f.debug_struct("Store")
            .field("backend", &backend)
            .field("snapshot_interval", &self.snapshot_interval)
            .finish()
    }
}

/// One logged mintette operation. Replaying these reproduces the state
/// bit for bit: signing is deterministic, and an operation that failed when
/// recorded fails identically on replay.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MintetteOp {
    Check {
        tx: Transaction,
        addr_id: AddrId,
        sigs: Vec<(Address, Signature)>,
    },
    Commit {
        tx: Transaction,
        confirmations: CheckConfirmations,
    },
    FinishPeriod {
        period_id: PeriodId,
    },
    StartPeriod {
        npd: NewPeriodData,
    },
}

pub fn apply_mintette_op(state: &mut Mintette, sk: &KeyPair, op: MintetteOp) {
    match op {
        MintetteOp::Check { tx, addr_id, sigs } => {
            let _ = state.check_not_double_spent(sk, &tx, addr_id, &sigs);
        }
        MintetteOp::Commit { tx, confirmations } => {
            let _ = state.commit_tx(sk, &tx, &confirmations);
        }
        MintetteOp::FinishPeriod { period_id } => {
            let _ = state.finish_period(sk, period_id);
        }
        MintetteOp::StartPeriod { npd } => {
            let _ = state.start_period(npd);
        }
    }
}

/// One logged bank operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BankOp {
    AddMintette {
        info: crate::MintetteInfo,
        key: crate::PublicKey,
    },
    AddExplorer {
        explorer: crate::ExplorerInfo,
    },
    AddAddress {
        address: Address,
        strategy: crate::TxStrategy,
    },
    StartNewPeriod {
        results: Vec<Option<PeriodResult>>,
    },
}

pub fn apply_bank_op(state: &mut Bank, sk: &KeyPair, op: BankOp) {
    match op {
        BankOp::AddMintette { info, key } => state.add_mintette(info, key),
        BankOp::AddExplorer { explorer } => state.add_explorer(explorer),
        BankOp::AddAddress { address, strategy } => state.add_address(address, strategy),
        BankOp::StartNewPeriod { results } => {
            let _ = state.start_new_period(sk, results);
        }
    }
}

fn serialize<T: Serialize>(value: &T) -> anyhow::Result<Vec<u8>> {
    bincode::serialize(value).context("could not serialize")
}

fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> anyhow::Result<T> {
    bincode::deserialize(bytes).context("could not deserialize")
}

fn decode_seq(key: &[u8]) -> anyhow::Result<u64> {
    let mut raw = [0u8; 8];
    if key.len() != 8 {
        return Err(anyhow!("corrupt log key"));
    }
    raw.copy_from_slice(key);

    Ok(u64::from_be_bytes(raw))
}
