use crate::{
    action_log::ActionLog,
    bank::{Bank, NewPeriodData},
    block::{HBlock, LBlock},
    keys::{Address, KeyPair},
    mintette::{Mintette, PeriodResult},
    signature::Signature,
    transaction::{
        AddrId, CheckConfirmation, CheckConfirmations, CommitAcknowledgment, Transaction,
    },
    MintetteInfo, PeriodId, Utxo,
};
use futures::{
    future::{select, Either},
    pin_mut, Future,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    panic::{catch_unwind, AssertUnwindSafe},
};
use tracing::warn;

/// Stable numeric method ids. Compatibility is by id; new methods append.
pub mod method {
    pub const PERIOD_FINISHED: u32 = 0;
    pub const ANNOUNCE_NEW_PERIOD: u32 = 1;
    pub const CHECK_TX: u32 = 2;
    pub const CHECK_TX_BATCH: u32 = 3;
    pub const COMMIT_TX: u32 = 4;
    pub const GET_MINTETTE_PERIOD: u32 = 5;
    pub const GET_UTXO: u32 = 6;
    pub const GET_BLOCKS: u32 = 7;
    pub const GET_LOGS: u32 = 8;
    pub const GET_MINTETTES: u32 = 9;
    pub const GET_BLOCKCHAIN_HEIGHT: u32 = 10;
    pub const GET_HBLOCK: u32 = 11;
}

/// The textual error channel of the wire protocol.
pub type RpcResult<T> = Result<T, String>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MintetteRequest {
    PeriodFinished {
        period_id: PeriodId,
    },
    AnnounceNewPeriod {
        npd: NewPeriodData,
    },
    CheckTx {
        tx: Transaction,
        addr_id: AddrId,
        sigs: Vec<(Address, Signature)>,
    },
    CheckTxBatch {
        tx: Transaction,
        sigs: BTreeMap<AddrId, Vec<(Address, Signature)>>,
    },
    CommitTx {
        tx: Transaction,
        confirmations: CheckConfirmations,
    },
    GetMintettePeriod,
    GetUtxo,
    GetBlocks {
        period_id: PeriodId,
    },
    GetLogs {
        period_id: PeriodId,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MintetteResponse {
    PeriodFinished(RpcResult<PeriodResult>),
    AnnounceNewPeriod(RpcResult<()>),
    CheckTx(RpcResult<CheckConfirmation>),
    CheckTxBatch(RpcResult<BTreeMap<AddrId, RpcResult<CheckConfirmation>>>),
    CommitTx(RpcResult<CommitAcknowledgment>),
    MintettePeriod(RpcResult<Option<PeriodId>>),
    Utxo(RpcResult<Utxo>),
    Blocks(RpcResult<Vec<LBlock>>),
    Logs(RpcResult<ActionLog>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BankRequest {
    GetMintettes,
    GetBlockchainHeight,
    GetHBlock { period_id: PeriodId },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BankResponse {
    Mintettes(RpcResult<Vec<MintetteInfo>>),
    BlockchainHeight(RpcResult<u64>),
    HBlock(RpcResult<HBlock>),
}

impl MintetteRequest {
    pub fn method_id(&self) -> u32 {
        match self {
            MintetteRequest::PeriodFinished { .. } => method::PERIOD_FINISHED,
            MintetteRequest::AnnounceNewPeriod { .. } => method::ANNOUNCE_NEW_PERIOD,
            MintetteRequest::CheckTx { .. } => method::CHECK_TX,
            MintetteRequest::CheckTxBatch { .. } => method::CHECK_TX_BATCH,
            MintetteRequest::CommitTx { .. } => method::COMMIT_TX,
            MintetteRequest::GetMintettePeriod => method::GET_MINTETTE_PERIOD,
            MintetteRequest::GetUtxo => method::GET_UTXO,
            MintetteRequest::GetBlocks { .. } => method::GET_BLOCKS,
            MintetteRequest::GetLogs { .. } => method::GET_LOGS,
        }
    }
}

impl BankRequest {
    pub fn method_id(&self) -> u32 {
        match self {
            BankRequest::GetMintettes => method::GET_MINTETTES,
            BankRequest::GetBlockchainHeight => method::GET_BLOCKCHAIN_HEIGHT,
            BankRequest::GetHBlock { .. } => method::GET_HBLOCK,
        }
    }
}

/// All messages exchanged between clients, mintettes and the bank.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Message {
    MintetteRequest(MintetteRequest),
    MintetteResponse(MintetteResponse),
    BankRequest(BankRequest),
    BankResponse(BankResponse),
}

#[derive(Debug, thiserror::Error)]
#[error("expected {expected}, got {received:?}")]
pub struct UnexpectedMessage {
    expected: &'static str,
    received: Message,
}

impl UnexpectedMessage {
    fn new(expected: &'static str, received: Message) -> Self {
        Self { expected, received }
    }
}

#[async_trait::async_trait]
pub trait SendMessage {
    async fn send_message(&mut self, message: Message) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
pub trait ReceiveMessage {
    async fn receive_message(&mut self) -> anyhow::Result<Message>;
}

/// Run a mintette request against the state. The handler operates on a
/// scratch copy which replaces the state only after it returns, so a
/// panicking handler surfaces as the textual `Internal` error and cannot
/// poison the state.
pub fn dispatch_mintette(
    state: &mut Mintette,
    sk: &KeyPair,
    request: MintetteRequest,
) -> MintetteResponse {
    let mut scratch = state.clone();
    let error_response = internal_mintette_error(&request);

    let outcome = catch_unwind(AssertUnwindSafe(move || {
        let response = handle_mintette(&mut scratch, sk, request);
        (scratch, response)
    }));

    match outcome {
        Ok((scratch, response)) => {
            *state = scratch;
            response
        }
        Err(_) => {
            warn!("mintette handler panicked");
            error_response
        }
    }
}

fn handle_mintette(state: &mut Mintette, sk: &KeyPair, request: MintetteRequest) -> MintetteResponse {
    match request {
        MintetteRequest::PeriodFinished { period_id } => MintetteResponse::PeriodFinished(
            state
                .finish_period(sk, period_id)
                .map_err(|error| error.to_string()),
        ),
        MintetteRequest::AnnounceNewPeriod { npd } => MintetteResponse::AnnounceNewPeriod(
            state.start_period(npd).map_err(|error| error.to_string()),
        ),
        MintetteRequest::CheckTx { tx, addr_id, sigs } => MintetteResponse::CheckTx(
            state
                .check_not_double_spent(sk, &tx, addr_id, &sigs)
                .map_err(|error| error.to_string()),
        ),
        MintetteRequest::CheckTxBatch { tx, sigs } => {
            let results = state
                .check_tx_batch(sk, &tx, &sigs)
                .into_iter()
                .map(|(addr_id, result)| (addr_id, result.map_err(|error| error.to_string())))
                .collect();

            MintetteResponse::CheckTxBatch(Ok(results))
        }
        MintetteRequest::CommitTx { tx, confirmations } => MintetteResponse::CommitTx(
            state
                .commit_tx(sk, &tx, &confirmations)
                .map_err(|error| error.to_string()),
        ),
        MintetteRequest::GetMintettePeriod => MintetteResponse::MintettePeriod(Ok(state.period())),
        MintetteRequest::GetUtxo => MintetteResponse::Utxo(Ok(state.utxo().clone())),
        MintetteRequest::GetBlocks { period_id } => MintetteResponse::Blocks(
            state
                .blocks(period_id)
                .map(<[LBlock]>::to_vec)
                .ok_or_else(|| format!("no blocks for period {}", period_id)),
        ),
        MintetteRequest::GetLogs { period_id } => MintetteResponse::Logs(
            state
                .logs(period_id)
                .cloned()
                .ok_or_else(|| format!("no logs for period {}", period_id)),
        ),
    }
}

fn internal_mintette_error(request: &MintetteRequest) -> MintetteResponse {
    let error = crate::MintetteError::Internal("handler panicked".to_string()).to_string();

    match request {
        MintetteRequest::PeriodFinished { .. } => MintetteResponse::PeriodFinished(Err(error)),
        MintetteRequest::AnnounceNewPeriod { .. } => {
            MintetteResponse::AnnounceNewPeriod(Err(error))
        }
        MintetteRequest::CheckTx { .. } => MintetteResponse::CheckTx(Err(error)),
        MintetteRequest::CheckTxBatch { .. } => MintetteResponse::CheckTxBatch(Err(error)),
        MintetteRequest::CommitTx { .. } => MintetteResponse::CommitTx(Err(error)),
        MintetteRequest::GetMintettePeriod => MintetteResponse::MintettePeriod(Err(error)),
        MintetteRequest::GetUtxo => MintetteResponse::Utxo(Err(error)),
        MintetteRequest::GetBlocks { .. } => MintetteResponse::Blocks(Err(error)),
        MintetteRequest::GetLogs { .. } => MintetteResponse::Logs(Err(error)),
    }
}

/// Run a bank request against the state. Same scratch-copy discipline as
/// [`dispatch_mintette`].
pub fn dispatch_bank(state: &mut Bank, request: BankRequest) -> BankResponse {
    let mut scratch = state.clone();
    let error_response = internal_bank_error(&request);

    let outcome = catch_unwind(AssertUnwindSafe(move || {
        let response = handle_bank(&mut scratch, request);
        (scratch, response)
    }));

    match outcome {
        Ok((scratch, response)) => {
            *state = scratch;
            response
        }
        Err(_) => {
            warn!("bank handler panicked");
            error_response
        }
    }
}

fn handle_bank(state: &mut Bank, request: BankRequest) -> BankResponse {
    match request {
        BankRequest::GetMintettes => BankResponse::Mintettes(Ok(state.mintettes().to_vec())),
        BankRequest::GetBlockchainHeight => BankResponse::BlockchainHeight(Ok(state.height())),
        BankRequest::GetHBlock { period_id } => BankResponse::HBlock(
            state
                .hblock(period_id)
                .cloned()
                .ok_or_else(|| format!("no block for period {}", period_id)),
        ),
    }
}

fn internal_bank_error(request: &BankRequest) -> BankResponse {
    let error = crate::BankError::Internal("handler panicked".to_string()).to_string();

    match request {
        BankRequest::GetMintettes => BankResponse::Mintettes(Err(error)),
        BankRequest::GetBlockchainHeight => BankResponse::BlockchainHeight(Err(error)),
        BankRequest::GetHBlock { .. } => BankResponse::HBlock(Err(error)),
    }
}

/// Answer mintette requests on `transport` until the peer goes away.
pub async fn serve_mintette<T>(
    transport: &mut T,
    state: &mut Mintette,
    sk: &KeyPair,
) -> anyhow::Result<()>
where
    T: SendMessage + ReceiveMessage,
{
    while let Ok(message) = transport.receive_message().await {
        let response = match message {
            Message::MintetteRequest(request) => dispatch_mintette(state, sk, request),
            other => anyhow::bail!(UnexpectedMessage::new("a mintette request", other)),
        };

        transport
            .send_message(Message::MintetteResponse(response))
            .await?;
    }

    Ok(())
}

/// Answer bank requests on `transport` until the peer goes away.
pub async fn serve_bank<T>(transport: &mut T, state: &mut Bank) -> anyhow::Result<()>
where
    T: SendMessage + ReceiveMessage,
{
    while let Ok(message) = transport.receive_message().await {
        let response = match message {
            Message::BankRequest(request) => dispatch_bank(state, request),
            other => anyhow::bail!(UnexpectedMessage::new("a bank request", other)),
        };

        transport
            .send_message(Message::BankResponse(response))
            .await?;
    }

    Ok(())
}

/// Send one mintette request and wait for the matching response.
pub async fn call_mintette<T>(
    transport: &mut T,
    request: MintetteRequest,
) -> anyhow::Result<MintetteResponse>
where
    T: SendMessage + ReceiveMessage,
{
    transport
        .send_message(Message::MintetteRequest(request))
        .await?;

    match transport.receive_message().await? {
        Message::MintetteResponse(response) => Ok(response),
        other => Err(UnexpectedMessage::new("a mintette response", other).into()),
    }
}

/// Poll every mintette for its period result, one timeout per mintette. A
/// missing, late or malformed reply becomes `None`; the bank's validation
/// decides what that costs the mintette.
pub async fn collect_period_results<T, F, Fut>(
    transports: &mut [T],
    period_id: PeriodId,
    timeout: F,
) -> Vec<Option<PeriodResult>>
where
    T: SendMessage + ReceiveMessage,
    F: Fn() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut results = Vec::with_capacity(transports.len());

    for (id, transport) in transports.iter_mut().enumerate() {
        let call = call_mintette(transport, MintetteRequest::PeriodFinished { period_id });
        let deadline = timeout();
        pin_mut!(call);
        pin_mut!(deadline);

        let result = match select(call, deadline).await {
            Either::Left((Ok(MintetteResponse::PeriodFinished(Ok(result))), _)) => Some(result),
            Either::Left(_) => None,
            Either::Right(((), _)) => {
                warn!(mintette = id, "period result timed out");
                None
            }
        };

        results.push(result);
    }

    results
}
