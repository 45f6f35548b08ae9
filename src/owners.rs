use crate::{hash::Hash, MintetteId};
use sha2::{Digest, Sha256};

/// Deterministic owner map: the ordered set of mintette ids responsible for a
/// transaction hash.
///
/// Ids are drawn by hashing `tx_hash` together with an incrementing counter
/// and reducing modulo the roster size, skipping repeats, until
/// `min(fanout, n_mintettes)` distinct ids are collected. The same rule runs
/// on the bank and on every mintette; the two sides must agree on the result
/// for commits to gather majorities.
pub fn owners(n_mintettes: usize, tx_hash: &Hash, fanout: usize) -> Vec<MintetteId> {
    if n_mintettes == 0 || fanout == 0 {
        return Vec::new();
    }

    let target = fanout.min(n_mintettes);
    let mut selected = Vec::with_capacity(target);
    let mut counter: u32 = 0;

    while selected.len() < target {
        let mut hasher = Sha256::new();
        hasher.update(tx_hash.as_bytes());
        hasher.update(&counter.to_le_bytes());
        let digest = hasher.finalize();

        let mut raw = [0u8; 8];
        raw.copy_from_slice(&digest[..8]);
        let id = (u64::from_be_bytes(raw) % n_mintettes as u64) as MintetteId;

        if !selected.contains(&id) {
            selected.push(id);
        }
        counter += 1;
    }

    selected
}

/// Strictly more than half of the owner set.
pub fn is_majority(owner_count: usize, committed: usize) -> bool {
    committed * 2 > owner_count
}
