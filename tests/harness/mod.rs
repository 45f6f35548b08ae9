pub mod transport;

use rscoin::{
    rpc::{self, Message, MintetteRequest, MintetteResponse, ReceiveMessage, SendMessage},
    transaction::CheckConfirmations,
    AddrId, Address, CheckConfirmation, CommitAcknowledgment, KeyPair, Mintette, NewPeriodData,
    Signature, Transaction, Utxo,
};
use transport::{make_transports, Transport};

/// Move a mintette behind a transport: the returned client talks to a served
/// instance running in the background until the client is dropped.
pub fn spawn_mintette(mut state: Mintette, sk: KeyPair) -> Transport {
    let (client, mut server) = make_transports();

    tokio::spawn(async move {
        let _ = rpc::serve_mintette(&mut server, &mut state, &sk).await;
    });

    client
}

pub async fn announce<T>(transport: &mut T, npd: NewPeriodData) -> Result<(), String>
where
    T: SendMessage + ReceiveMessage,
{
    match call(transport, MintetteRequest::AnnounceNewPeriod { npd }).await {
        MintetteResponse::AnnounceNewPeriod(result) => result,
        other => panic!("unexpected response: {:?}", other),
    }
}

pub async fn check_tx<T>(
    transport: &mut T,
    tx: Transaction,
    addr_id: AddrId,
    sigs: Vec<(Address, Signature)>,
) -> Result<CheckConfirmation, String>
where
    T: SendMessage + ReceiveMessage,
{
    match call(transport, MintetteRequest::CheckTx { tx, addr_id, sigs }).await {
        MintetteResponse::CheckTx(result) => result,
        other => panic!("unexpected response: {:?}", other),
    }
}

pub async fn commit_tx<T>(
    transport: &mut T,
    tx: Transaction,
    confirmations: CheckConfirmations,
) -> Result<CommitAcknowledgment, String>
where
    T: SendMessage + ReceiveMessage,
{
    match call(
        transport,
        MintetteRequest::CommitTx { tx, confirmations },
    )
    .await
    {
        MintetteResponse::CommitTx(result) => result,
        other => panic!("unexpected response: {:?}", other),
    }
}

pub async fn get_utxo<T>(transport: &mut T) -> Result<Utxo, String>
where
    T: SendMessage + ReceiveMessage,
{
    match call(transport, MintetteRequest::GetUtxo).await {
        MintetteResponse::Utxo(result) => result,
        other => panic!("unexpected response: {:?}", other),
    }
}

async fn call<T>(transport: &mut T, request: MintetteRequest) -> MintetteResponse
where
    T: SendMessage + ReceiveMessage,
{
    transport
        .send_message(Message::MintetteRequest(request))
        .await
        .expect("send request");

    match transport.receive_message().await.expect("receive response") {
        Message::MintetteResponse(response) => response,
        other => panic!("unexpected message: {:?}", other),
    }
}
