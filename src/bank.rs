use crate::{
    action_log::check_action_log,
    block::{check_lblock, mk_genesis_hblock, mk_hblock, HBlock},
    coin::{Coin, Currency},
    hash::{emission_hash, Hash},
    keys::{Address, KeyPair, PublicKey},
    mintette::PeriodResult,
    owners::{is_majority, owners},
    signature::Signature,
    transaction::{AddrId, Transaction, TxStrategy},
    Config, Dpk, ExplorerInfo, MintetteId, MintetteInfo, PeriodId, Utxo, BANK_REWARD_SHARE,
    EVICTION_THRESHOLD, PERIOD_REWARD,
};
use num_rational::Ratio;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BankError {
    #[error("number of period results does not match the roster")]
    InconsistentResponse,
    #[error("no mintette with id {0}")]
    UnknownMintette(MintetteId),
    #[error("no explorer with id {0}")]
    UnknownExplorer(usize),
    #[error("period result rejected: {0}")]
    BadPeriodResult(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Everything a mintette needs to enter the next period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPeriodData {
    pub period_id: PeriodId,
    pub mintettes: Vec<MintetteInfo>,
    pub hblock: HBlock,
    /// Present when the mintette's ownership assignments changed: its new id
    /// and the restricted slice of the global utxo it is now responsible
    /// for.
    pub payload: Option<(MintetteId, Utxo)>,
    pub addresses: BTreeMap<Address, TxStrategy>,
    pub dpk: Dpk,
}

/// The bank's whole state: roster, canonical chain and global utxo.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bank {
    mintettes: Vec<MintetteInfo>,
    dpk: Dpk,
    /// Mintettes admitted during the running period; they join the roster at
    /// the next boundary.
    pending_mintettes: Vec<(MintetteInfo, PublicKey)>,
    /// Consecutive missing or invalid period results, per roster slot.
    failure_counts: Vec<u32>,
    /// Expected origin of each mintette's next period log.
    log_heads: Vec<Hash>,
    addresses: BTreeMap<Address, TxStrategy>,
    pending_addresses: BTreeMap<Address, TxStrategy>,
    /// Canonical chain, most recent first. The last element is the genesis
    /// block.
    blocks: Vec<HBlock>,
    utxo: Utxo,
    /// Emission hashes of finished periods, most recent first.
    emission_hashes: Vec<Hash>,
    period_id: PeriodId,
    explorers: Vec<ExplorerInfo>,
    owner_fanout: usize,
}

impl Bank {
    /// Set up a bank whose genesis block distributes `genesis_outputs`.
    pub fn new(bank: &KeyPair, genesis_outputs: Vec<(Address, Coin)>, config: &Config) -> Bank {
        let genesis = mk_genesis_hblock(bank, genesis_outputs);
        let utxo = genesis
            .transactions
            .iter()
            .flat_map(Transaction::output_addr_ids)
            .collect();

        Bank {
            mintettes: Vec::new(),
            dpk: Vec::new(),
            pending_mintettes: Vec::new(),
            failure_counts: Vec::new(),
            log_heads: Vec::new(),
            addresses: BTreeMap::new(),
            pending_addresses: BTreeMap::new(),
            blocks: vec![genesis],
            utxo,
            emission_hashes: Vec::new(),
            period_id: 0,
            explorers: Vec::new(),
            owner_fanout: config.owner_fanout,
        }
    }

    /// Queue a mintette for admission at the next period boundary.
    pub fn add_mintette(&mut self, info: MintetteInfo, key: PublicKey) {
        self.pending_mintettes.push((info, key));
    }

    pub fn add_explorer(&mut self, explorer: ExplorerInfo) {
        self.explorers.push(explorer);
    }

    /// Queue an address strategy; it goes live at the next period boundary.
    pub fn add_address(&mut self, address: Address, strategy: TxStrategy) {
        self.pending_addresses.insert(address, strategy);
    }

    pub fn mintettes(&self) -> &[MintetteInfo] {
        &self.mintettes
    }

    pub fn mintette_info(&self, id: MintetteId) -> Result<&MintetteInfo, BankError> {
        self.mintettes.get(id).ok_or(BankError::UnknownMintette(id))
    }

    pub fn explorer_info(&self, id: usize) -> Result<&ExplorerInfo, BankError> {
        self.explorers.get(id).ok_or(BankError::UnknownExplorer(id))
    }

    pub fn dpk(&self) -> &Dpk {
        &self.dpk
    }

    pub fn period_id(&self) -> PeriodId {
        self.period_id
    }

    pub fn utxo(&self) -> &Utxo {
        &self.utxo
    }

    /// Emission hashes of finished periods, most recent first.
    pub fn emission_hashes(&self) -> &[Hash] {
        &self.emission_hashes
    }

    /// Number of blocks in the canonical chain, genesis included.
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// The block finalizing period `period_id`; the genesis block has id 0.
    pub fn hblock(&self, period_id: PeriodId) -> Option<&HBlock> {
        let height = self.blocks.len() as u64;
        if period_id >= height {
            return None;
        }

        self.blocks.get((height - 1 - period_id) as usize)
    }

    pub fn last_hblock(&self) -> &HBlock {
        // The chain always holds at least the genesis block.
        &self.blocks[0]
    }

    /// Close the running period over the collected mintette results and open
    /// the next one. Returns one `NewPeriodData` per member of the updated
    /// roster, in roster order.
    pub fn start_new_period(
        &mut self,
        sk: &KeyPair,
        results: Vec<Option<PeriodResult>>,
    ) -> Result<Vec<NewPeriodData>, BankError> {
        if results.len() != self.mintettes.len() {
            return Err(BankError::InconsistentResponse);
        }

        let validated: Vec<Option<PeriodResult>> = results
            .into_iter()
            .enumerate()
            .map(|(id, result)| {
                result.and_then(|result| match self.check_result(id, &result) {
                    Ok(()) => Some(result),
                    Err(reason) => {
                        warn!(mintette = id, %reason, "dropping period result");
                        None
                    }
                })
            })
            .collect();

        let accepted: Vec<MintetteId> = validated
            .iter()
            .enumerate()
            .filter_map(|(id, result)| result.as_ref().map(|_| id))
            .collect();

        let emission_id = emission_hash(self.period_id);
        let emission_tx = self.allocate_coins(sk, emission_id, &accepted);
        let survivors = self.merge_transactions(&validated);

        let mut transactions = Vec::with_capacity(1 + survivors.len());
        transactions.push(emission_tx);
        transactions.extend(survivors);

        // Pending addresses go live together with the new block.
        let mut addresses = self.addresses.clone();
        addresses.append(&mut self.pending_addresses);

        let new_block = mk_hblock(
            transactions,
            self.last_hblock().hash(),
            addresses.clone(),
            sk,
        );

        let update_ids = self.update_mintettes(sk, &validated);

        // Outputs first: a transaction may spend an output created earlier in
        // the very same block, and its input must not survive the update.
        for tx in &new_block.transactions {
            for (addr_id, address) in tx.output_addr_ids() {
                self.utxo.insert(addr_id, address);
            }
        }
        for tx in &new_block.transactions {
            for input in &tx.inputs {
                self.utxo.remove(input);
            }
        }

        self.addresses = addresses;
        self.period_id += 1;
        self.blocks.insert(0, new_block.clone());
        self.emission_hashes.insert(0, emission_id);

        let payloads = self.form_payload(&update_ids);

        info!(
            period = self.period_id,
            accepted = accepted.len(),
            mintettes = self.mintettes.len(),
            "started new period"
        );

        Ok((0..self.mintettes.len())
            .map(|id| NewPeriodData {
                period_id: self.period_id,
                mintettes: self.mintettes.clone(),
                hblock: new_block.clone(),
                payload: payloads.get(&id).map(|utxo| (id, utxo.clone())),
                addresses: self.addresses.clone(),
                dpk: self.dpk.clone(),
            })
            .collect())
    }

    /// A period result is accepted iff it addresses the closing period, its
    /// log chains from the head archived for this mintette, and the log
    /// segments into epoch slices each sealing one of the reported LBlocks.
    fn check_result(&self, id: MintetteId, result: &PeriodResult) -> Result<(), BankError> {
        if result.period_id != self.period_id {
            return Err(BankError::BadPeriodResult(format!(
                "expected period {}, got {}",
                self.period_id, result.period_id
            )));
        }

        if !check_action_log(self.log_heads[id], &result.action_log) {
            return Err(BankError::BadPeriodResult(
                "action log does not chain from the archived head".to_string(),
            ));
        }

        let slices = result
            .action_log
            .epoch_slices()
            .ok_or_else(|| BankError::BadPeriodResult("unsealed action log".to_string()))?;

        if slices.len() != result.lblocks.len() {
            return Err(BankError::BadPeriodResult(format!(
                "{} epoch slices for {} lblocks",
                slices.len(),
                result.lblocks.len()
            )));
        }

        let (key, _) = self.dpk[id];
        let prev_hblock_hash = self.last_hblock().hash();

        // LBlocks arrive most recent first; slices are oldest first.
        for (slice, blk) in slices.iter().zip(result.lblocks.iter().rev()) {
            if !check_lblock(key, prev_hblock_hash, slice, blk) {
                return Err(BankError::BadPeriodResult(
                    "lblock fails cross-validation".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// The emission transaction: mints the period reward, paying the bank
    /// its share and splitting the remainder equally among the accepted
    /// mintettes, in global id order.
    fn allocate_coins(
        &self,
        sk: &KeyPair,
        emission_id: Hash,
        accepted: &[MintetteId],
    ) -> Transaction {
        let total = Ratio::from_integer(PERIOD_REWARD);
        let (share_num, share_den) = BANK_REWARD_SHARE;

        let bank_reward = if accepted.is_empty() {
            total
        } else {
            total * Ratio::new(share_num, share_den)
        };
        let mut outputs = vec![(
            sk.address(),
            Coin::new(Currency::DEFAULT, bank_reward),
        )];

        if !accepted.is_empty() {
            let mintette_share = (total - bank_reward) / Ratio::from_integer(accepted.len() as u64);
            for id in accepted {
                let (key, _) = self.dpk[*id];
                outputs.push((
                    Address::from(key),
                    Coin::new(Currency::DEFAULT, mintette_share),
                ));
            }
        }

        Transaction {
            inputs: vec![AddrId {
                tx_hash: emission_id,
                index: 0,
                value: Coin::new(Currency::DEFAULT, total),
            }],
            outputs,
        }
    }

    /// Merge the accepted results into the set of transactions committed by
    /// a strict majority of their owners, in canonical (hash) order.
    fn merge_transactions(&self, validated: &[Option<PeriodResult>]) -> Vec<Transaction> {
        let mut tx_map: BTreeMap<Hash, (Transaction, BTreeSet<MintetteId>)> = BTreeMap::new();

        for (id, result) in validated.iter().enumerate() {
            let result = match result {
                Some(result) => result,
                None => continue,
            };
            for blk in &result.lblocks {
                for tx in &blk.transactions {
                    tx_map
                        .entry(tx.hash())
                        .or_insert_with(|| (tx.clone(), BTreeSet::new()))
                        .1
                        .insert(id);
                }
            }
        }

        tx_map
            .into_iter()
            .filter_map(|(tx_hash, (tx, committers))| {
                let owner_ids = owners(self.mintettes.len(), &tx_hash, self.owner_fanout);
                let committed = owner_ids
                    .iter()
                    .filter(|id| committers.contains(id))
                    .count();

                if is_majority(owner_ids.len(), committed) {
                    Some(tx)
                } else {
                    warn!(tx = %tx_hash, committed, owners = owner_ids.len(), "dropping minority transaction");
                    None
                }
            })
            .collect()
    }

    /// Penalize mintettes whose results did not validate, evict repeat
    /// offenders, admit the pending queue. Returns the ids whose ownership
    /// assignments changed; empty when the roster kept its exact shape.
    fn update_mintettes(
        &mut self,
        sk: &KeyPair,
        validated: &[Option<PeriodResult>],
    ) -> Vec<MintetteId> {
        let old_len = self.mintettes.len();

        let mut kept: Vec<(MintetteInfo, (PublicKey, Signature), u32, Hash)> = Vec::new();
        let mut evicted = 0usize;

        for (id, result) in validated.iter().enumerate() {
            let failures = match result {
                Some(_) => 0,
                None => self.failure_counts[id] + 1,
            };

            if failures >= EVICTION_THRESHOLD {
                warn!(mintette = id, "evicting mintette");
                evicted += 1;
                continue;
            }

            let log_head = match result {
                Some(result) => result.action_log.head(),
                None => self.log_heads[id],
            };

            kept.push((
                self.mintettes[id].clone(),
                self.dpk[id],
                failures,
                log_head,
            ));
        }

        let admitted = self.pending_mintettes.split_off(0);
        let admissions = admitted.len();
        for (info, key) in admitted {
            kept.push((info, (key, sk.sign(&key)), 0, Hash::zero()));
        }

        self.mintettes = kept.iter().map(|(info, ..)| info.clone()).collect();
        self.dpk = kept.iter().map(|(_, entry, ..)| *entry).collect();
        self.failure_counts = kept.iter().map(|(_, _, failures, _)| *failures).collect();
        self.log_heads = kept.iter().map(|(.., log_head)| *log_head).collect();

        // Any change of the roster shape reassigns ownership everywhere: ids
        // shift on eviction and the owner map depends on the roster size.
        if evicted > 0 || admissions > 0 || self.mintettes.len() != old_len {
            (0..self.mintettes.len()).collect()
        } else {
            Vec::new()
        }
    }

    /// Restricted utxo slices for the mintettes whose assignments changed.
    fn form_payload(&self, update_ids: &[MintetteId]) -> BTreeMap<MintetteId, Utxo> {
        update_ids
            .iter()
            .map(|id| {
                let slice: Utxo = self
                    .utxo
                    .iter()
                    .filter(|(addr_id, _)| {
                        owners(self.mintettes.len(), &addr_id.tx_hash, self.owner_fanout)
                            .contains(id)
                    })
                    .map(|(addr_id, address)| (*addr_id, *address))
                    .collect();

                (*id, slice)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        keys::KeyPair,
        test_harness::{transfer, Cluster},
        MintetteInfo,
    };
    use num_traits::Zero;

    fn utxo_total(utxo: &Utxo) -> Ratio<u64> {
        utxo.keys()
            .map(|addr_id| addr_id.value.amount())
            .fold(Ratio::zero(), |total, value| total + value)
    }

    #[test]
    fn result_count_must_match_the_roster() {
        let user = KeyPair::new_random();
        let mut cluster = Cluster::start(2, vec![(user.address(), Coin::from_integer(10))]);

        let result = cluster
            .bank
            .start_new_period(&cluster.bank_keypair, vec![None]);

        assert_eq!(result.unwrap_err(), BankError::InconsistentResponse);
    }

    #[test]
    fn stale_period_result_is_dropped() {
        let user = KeyPair::new_random();
        let mut cluster = Cluster::start(1, vec![(user.address(), Coin::from_integer(10))]);

        let mut result = cluster.mintettes[0]
            .finish_period(&cluster.keypairs[0], 1)
            .unwrap();
        result.period_id = 7;

        let npds = cluster
            .bank
            .start_new_period(&cluster.bank_keypair, vec![Some(result)])
            .unwrap();

        // The dropped mintette earns nothing: the emission pays the bank
        // only.
        let emission = &npds[0].hblock.transactions[0];
        assert!(emission.is_emission_for(1));
        assert_eq!(emission.outputs.len(), 1);
        assert_eq!(emission.outputs[0].0, cluster.bank_keypair.address());
    }

    #[test]
    fn tampered_action_log_is_dropped() {
        let user = KeyPair::new_random();
        let mut cluster = Cluster::start(1, vec![(user.address(), Coin::from_integer(10))]);

        let mut result = cluster.mintettes[0]
            .finish_period(&cluster.keypairs[0], 1)
            .unwrap();
        result.action_log = crate::ActionLog::with_origin(Hash::of(&"elsewhere"));

        let npds = cluster
            .bank
            .start_new_period(&cluster.bank_keypair, vec![Some(result)])
            .unwrap();

        let emission = &npds[0].hblock.transactions[0];
        assert_eq!(emission.outputs.len(), 1);
    }

    #[test]
    fn accepted_mintettes_share_the_emission() {
        let user = KeyPair::new_random();
        let mut cluster = Cluster::start(3, vec![(user.address(), Coin::from_integer(10))]);

        let npds = cluster.rollover();

        let emission = &npds[0].hblock.transactions[0];
        assert_eq!(emission.outputs.len(), 4);

        let bank_reward = emission.outputs[0].1.amount();
        assert_eq!(bank_reward, Ratio::new(PERIOD_REWARD, 10));

        let share = emission.outputs[1].1.amount();
        assert_eq!(share * Ratio::from_integer(3) + bank_reward, Ratio::from_integer(PERIOD_REWARD));
    }

    #[test]
    fn utxo_value_grows_by_exactly_the_emission() {
        let user = KeyPair::new_random();
        let mut cluster = Cluster::start(2, vec![(user.address(), Coin::from_integer(10))]);

        let before = utxo_total(cluster.bank.utxo());
        cluster.rollover();
        let after = utxo_total(cluster.bank.utxo());

        assert_eq!(after - before, Ratio::from_integer(PERIOD_REWARD));
    }

    #[test]
    fn majority_commit_is_included() {
        let user = KeyPair::new_random();
        let mut cluster = Cluster::start(3, vec![(user.address(), Coin::from_integer(10))]);
        let addr_id = cluster.genesis_addr_id(0);
        let tx = transfer(addr_id, user.address());

        let confirmations = cluster.check_everywhere(&tx, &user).unwrap();
        for id in [0usize, 1] {
            cluster.mintettes[id]
                .commit_tx(&cluster.keypairs[id], &tx, &confirmations)
                .unwrap();
        }

        let npds = cluster.rollover();

        assert!(npds[0].hblock.transactions.contains(&tx));
        assert!(cluster.bank.utxo().keys().any(|a| a.tx_hash == tx.hash()));
    }

    #[test]
    fn minority_commit_is_excluded() {
        let user = KeyPair::new_random();
        let mut cluster = Cluster::start(3, vec![(user.address(), Coin::from_integer(10))]);
        let addr_id = cluster.genesis_addr_id(0);
        let tx = transfer(addr_id, user.address());

        let confirmations = cluster.check_everywhere(&tx, &user).unwrap();
        cluster.mintettes[0]
            .commit_tx(&cluster.keypairs[0], &tx, &confirmations)
            .unwrap();

        let npds = cluster.rollover();

        assert!(!npds[0].hblock.transactions.contains(&tx));
        // The genesis output is still unspent globally.
        assert!(cluster.bank.utxo().contains_key(&addr_id));
    }

    #[test]
    fn chained_spends_within_one_period_settle_cleanly() {
        let user = KeyPair::new_random();
        let relay = KeyPair::new_random();
        let mut cluster = Cluster::start(1, vec![(user.address(), Coin::from_integer(10))]);
        let genesis_addr_id = cluster.genesis_addr_id(0);

        let first = transfer(genesis_addr_id, relay.address());
        let confirmations = cluster.check_everywhere(&first, &user).unwrap();
        cluster.commit_everywhere(&first, &confirmations).unwrap();

        // The relay can spend the fresh output in the very same period; the
        // committing mintette already holds it.
        let (intermediate, _) = first.output_addr_ids().next().unwrap();
        let second = transfer(intermediate, user.address());
        let confirmations = cluster.check_everywhere(&second, &relay).unwrap();
        cluster.commit_everywhere(&second, &confirmations).unwrap();

        cluster.rollover();

        let (settled, _) = second.output_addr_ids().next().unwrap();
        assert!(cluster.bank.utxo().contains_key(&settled));
        assert!(!cluster.bank.utxo().contains_key(&intermediate));
        assert!(!cluster.bank.utxo().contains_key(&genesis_addr_id));
    }

    #[test]
    fn silent_mintette_is_evicted_after_the_threshold() {
        let user = KeyPair::new_random();
        let mut cluster = Cluster::start(3, vec![(user.address(), Coin::from_integer(10))]);

        for round in 0..EVICTION_THRESHOLD {
            let period_id = cluster.bank.period_id();
            let results = vec![
                cluster.mintettes[0]
                    .finish_period(&cluster.keypairs[0], period_id)
                    .ok(),
                None,
                cluster.mintettes[2]
                    .finish_period(&cluster.keypairs[2], period_id)
                    .ok(),
            ];

            let npds = cluster
                .bank
                .start_new_period(&cluster.bank_keypair, results)
                .unwrap();

            if round + 1 < EVICTION_THRESHOLD {
                assert_eq!(cluster.bank.mintettes().len(), 3);
                cluster.mintettes[0].start_period(npds[0].clone()).unwrap();
                cluster.mintettes[2].start_period(npds[2].clone()).unwrap();
            } else {
                // The roster shrank and everyone got reassigned slices.
                assert_eq!(cluster.bank.mintettes().len(), 2);
                assert_eq!(npds.len(), 2);
                assert!(npds.iter().all(|npd| npd.payload.is_some()));

                for (npd, id) in npds.iter().zip([0usize, 2]) {
                    cluster.mintettes[id].start_period(npd.clone()).unwrap();
                }
            }
        }

        // Every addrid of the global utxo is covered by the surviving
        // mintettes' slices.
        let n = cluster.bank.mintettes().len();
        for addr_id in cluster.bank.utxo().keys() {
            let owner_ids = owners(n, &addr_id.tx_hash, cluster.config.owner_fanout);
            assert!(owner_ids.iter().all(|id| *id < n));
            assert!(!owner_ids.is_empty());
        }
    }

    #[test]
    fn admission_slices_the_utxo_for_the_newcomer() {
        let user = KeyPair::new_random();
        let mut cluster = Cluster::start(2, vec![(user.address(), Coin::from_integer(10))]);

        let newcomer = KeyPair::new_random();
        cluster
            .bank
            .add_mintette(MintetteInfo::new("localhost", 9100), newcomer.public());

        let period_id = cluster.bank.period_id();
        let results = cluster
            .mintettes
            .iter_mut()
            .zip(&cluster.keypairs)
            .map(|(mintette, keypair)| mintette.finish_period(keypair, period_id).ok())
            .collect();

        let npds = cluster
            .bank
            .start_new_period(&cluster.bank_keypair, results)
            .unwrap();

        assert_eq!(npds.len(), 3);
        let (id, slice) = npds[2].payload.as_ref().unwrap();
        assert_eq!(*id, 2);

        // The slice is exactly the ownership-filtered view of the global
        // utxo.
        let expected: Utxo = cluster
            .bank
            .utxo()
            .iter()
            .filter(|(addr_id, _)| {
                owners(3, &addr_id.tx_hash, cluster.config.owner_fanout).contains(&2)
            })
            .map(|(addr_id, address)| (*addr_id, *address))
            .collect();
        assert_eq!(*slice, expected);
    }

    #[test]
    fn pending_addresses_go_live_at_the_boundary() {
        let user = KeyPair::new_random();
        let mut cluster = Cluster::start(1, vec![(user.address(), Coin::from_integer(10))]);

        let shared = KeyPair::new_random().address();
        let strategy = TxStrategy::MOfN {
            m: 1,
            parties: vec![user.public()].into_iter().collect(),
        };
        cluster.bank.add_address(shared, strategy.clone());

        let npds = cluster.rollover();

        assert_eq!(npds[0].addresses.get(&shared), Some(&strategy));
        assert_eq!(npds[0].hblock.addresses.get(&shared), Some(&strategy));
    }

    #[test]
    fn chain_is_indexed_by_period() {
        let user = KeyPair::new_random();
        let mut cluster = Cluster::start(1, vec![(user.address(), Coin::from_integer(10))]);

        assert_eq!(cluster.bank.height(), 2);
        cluster.rollover();
        assert_eq!(cluster.bank.height(), 3);

        let genesis = cluster.bank.hblock(0).unwrap();
        assert_eq!(genesis.prev_hash, Hash::zero());

        let first = cluster.bank.hblock(1).unwrap();
        assert_eq!(first.prev_hash, genesis.hash());

        let second = cluster.bank.hblock(2).unwrap();
        assert_eq!(second.prev_hash, first.hash());
        assert_eq!(cluster.bank.last_hblock().hash(), second.hash());
        assert!(cluster.bank.hblock(3).is_none());

        assert!(second.verify(cluster.bank_keypair.public()).is_ok());
    }

    #[test]
    fn unknown_lookups_are_typed_errors() {
        let user = KeyPair::new_random();
        let cluster = Cluster::start(1, vec![(user.address(), Coin::from_integer(10))]);

        assert_eq!(
            cluster.bank.mintette_info(5).unwrap_err(),
            BankError::UnknownMintette(5)
        );
        assert_eq!(
            cluster.bank.explorer_info(0).unwrap_err(),
            BankError::UnknownExplorer(0)
        );
    }
}
