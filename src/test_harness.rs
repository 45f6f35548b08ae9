//! Helpers to stand up a bank with a set of mintettes and drive whole
//! periods without any transport in between.

use crate::{
    bank::{Bank, NewPeriodData},
    coin::Coin,
    keys::{Address, KeyPair},
    mintette::Mintette,
    owners::owners,
    transaction::{AddrId, CheckConfirmations, CommitAcknowledgment, Transaction},
    Config, MintetteError, MintetteId, MintetteInfo,
};

pub struct Cluster {
    pub config: Config,
    pub bank_keypair: KeyPair,
    pub bank: Bank,
    pub keypairs: Vec<KeyPair>,
    pub mintettes: Vec<Mintette>,
}

impl Cluster {
    /// A bank plus `n` mintettes, with the genesis block paying
    /// `genesis_outputs`. The first period is already started, so the
    /// mintettes hold their genesis utxo slices and accept transactions.
    pub fn start(n: usize, genesis_outputs: Vec<(Address, Coin)>) -> Cluster {
        let config = Config::default();
        let bank_keypair = KeyPair::new_random();
        let mut bank = Bank::new(&bank_keypair, genesis_outputs, &config);

        let keypairs: Vec<KeyPair> = (0..n).map(|_| KeyPair::new_random()).collect();
        let mut mintettes: Vec<Mintette> = (0..n)
            .map(|_| Mintette::new(&config, bank_keypair.public()))
            .collect();

        for (i, keypair) in keypairs.iter().enumerate() {
            bank.add_mintette(
                MintetteInfo::new("localhost", 9000 + i as u16),
                keypair.public(),
            );
        }

        let npds = bank
            .start_new_period(&bank_keypair, Vec::new())
            .expect("admission period");
        for (mintette, npd) in mintettes.iter_mut().zip(npds) {
            mintette.start_period(npd).expect("start first period");
        }

        Cluster {
            config,
            bank_keypair,
            bank,
            keypairs,
            mintettes,
        }
    }

    pub fn owners_of(&self, tx_hash: &crate::Hash) -> Vec<MintetteId> {
        owners(
            self.bank.mintettes().len(),
            tx_hash,
            self.config.owner_fanout,
        )
    }

    /// Ask the owners of every input to check the spend, exactly as a client
    /// would. Returns the gathered confirmations, or the first failure.
    pub fn check_everywhere(
        &mut self,
        tx: &Transaction,
        user: &KeyPair,
    ) -> Result<CheckConfirmations, MintetteError> {
        let sigs = vec![(user.address(), user.sign(tx))];
        let mut confirmations = CheckConfirmations::new();

        for input in tx.inputs.clone() {
            for owner_id in self.owners_of(&input.tx_hash) {
                let confirmation = self.mintettes[owner_id].check_not_double_spent(
                    &self.keypairs[owner_id],
                    tx,
                    input,
                    &sigs,
                )?;
                confirmations.insert((owner_id, input), confirmation);
            }
        }

        Ok(confirmations)
    }

    /// Commit `tx` at the owners of the transaction and of its inputs.
    pub fn commit_everywhere(
        &mut self,
        tx: &Transaction,
        confirmations: &CheckConfirmations,
    ) -> Result<Vec<CommitAcknowledgment>, MintetteError> {
        let mut ids: Vec<MintetteId> = self.owners_of(&tx.hash());
        for input in &tx.inputs {
            for id in self.owners_of(&input.tx_hash) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids.sort_unstable();

        ids.into_iter()
            .map(|id| self.mintettes[id].commit_tx(&self.keypairs[id], tx, confirmations))
            .collect()
    }

    /// Close the running period on every mintette, feed the results to the
    /// bank and start the next period. Only valid while the roster keeps its
    /// shape; tests that evict mintettes drive the boundary by hand.
    pub fn rollover(&mut self) -> Vec<NewPeriodData> {
        let period_id = self.bank.period_id();

        let results = self
            .mintettes
            .iter_mut()
            .zip(&self.keypairs)
            .map(|(mintette, keypair)| mintette.finish_period(keypair, period_id).ok())
            .collect();

        let npds = self
            .bank
            .start_new_period(&self.bank_keypair, results)
            .expect("period finalization");

        for (mintette, npd) in self.mintettes.iter_mut().zip(npds.iter()) {
            mintette
                .start_period(npd.clone())
                .expect("start next period");
        }

        npds
    }

    /// The addrid of output `index` of the genesis transaction.
    pub fn genesis_addr_id(&self, index: usize) -> AddrId {
        let genesis = self.bank.hblock(0).expect("genesis block");
        genesis.transactions[0]
            .output_addr_ids()
            .nth(index)
            .expect("genesis output")
            .0
    }
}

/// A transaction moving `addr_id` in full to `to`.
pub fn transfer(addr_id: AddrId, to: Address) -> Transaction {
    Transaction {
        inputs: vec![addr_id],
        outputs: vec![(to, addr_id.value)],
    }
}
