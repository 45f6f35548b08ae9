use futures::{
    channel::mpsc::{Receiver, Sender},
    SinkExt, StreamExt,
};
use rscoin::rpc::{Message, ReceiveMessage, SendMessage};

pub struct Transport {
    // Carrying encoded bytes instead of `Message` exercises the canonical
    // wire codec on every exchange.
    sender: Sender<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
}

/// Create two `Transport`s which mimic a connection between a client and a
/// node, allowing them to send and receive `rscoin::rpc::Message`s to and
/// from each other.
pub fn make_transports() -> (Transport, Transport) {
    let (client_sender, server_receiver) = futures::channel::mpsc::channel(5);
    let (server_sender, client_receiver) = futures::channel::mpsc::channel(5);

    let client_transport = Transport {
        sender: client_sender,
        receiver: client_receiver,
    };

    let server_transport = Transport {
        sender: server_sender,
        receiver: server_receiver,
    };

    (client_transport, server_transport)
}

#[async_trait::async_trait]
impl SendMessage for Transport {
    async fn send_message(&mut self, message: Message) -> anyhow::Result<()> {
        let bytes = bincode::serialize(&message)?;
        self.sender
            .send(bytes)
            .await
            .map_err(|_| anyhow::anyhow!("failed to send message"))
    }
}

#[async_trait::async_trait]
impl ReceiveMessage for Transport {
    async fn receive_message(&mut self) -> anyhow::Result<Message> {
        let bytes = self
            .receiver
            .next()
            .await
            .ok_or_else(|| anyhow::anyhow!("failed to receive message"))?;
        let message = bincode::deserialize(&bytes)?;

        Ok(message)
    }
}
