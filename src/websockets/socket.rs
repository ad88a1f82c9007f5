use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::StreamExt;
use tokio::sync::mpsc;

use super::session::ClientSession;

/// Simple WebSocket abstraction - all we care about is send/receive
#[async_trait]
pub trait SocketWrapper: Send {
    /// Send a text message to the client
    async fn send_message(&mut self, message: String) -> Result<(), SocketError>;

    /// Receive the next message from the client (None if connection closed)
    async fn receive_message(&mut self) -> Result<Option<String>, SocketError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), SocketError>;
}

#[derive(Debug)]
pub enum SocketError {
    SendFailed(String),
    ReceiveFailed(String),
}

/// Direct implementation on axum's WebSocket
#[async_trait]
impl SocketWrapper for WebSocket {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
        self.send(Message::Text(message))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
        match self.next().await {
            Some(Ok(Message::Text(text))) => Ok(Some(text)),
            Some(Ok(Message::Close(_))) => Ok(None),
            Some(Ok(_)) => Ok(None), // Ignore binary/ping/pong
            Some(Err(e)) => Err(SocketError::ReceiveFailed(e.to_string())),
            None => Ok(None), // Connection closed
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

/// Connection pairs a socket with its ClientSession and pumps both directions
/// until disconnect. The outbound receiver is the channel the registry sends
/// room broadcasts into.
pub struct Connection {
    session: ClientSession,
    socket: Box<dyn SocketWrapper>,
    outbound_receiver: mpsc::UnboundedReceiver<String>,
}

impl Connection {
    pub fn new(
        session: ClientSession,
        socket: Box<dyn SocketWrapper>,
        outbound_receiver: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        Self {
            session,
            socket,
            outbound_receiver,
        }
    }

    /// Run the connection - handles both sending and receiving until
    /// disconnect. The registry is told about the disconnect on every exit
    /// path, including transport errors.
    pub async fn run(mut self) -> Result<(), SocketError> {
        let result = loop {
            tokio::select! {
                // Outbound messages (from the registry to the client)
                msg = self.outbound_receiver.recv() => {
                    match msg {
                        Some(message) => {
                            if let Err(e) = self.socket.send_message(message).await {
                                break Err(e);
                            }
                        }
                        None => break Ok(()), // Channel closed, disconnect
                    }
                }

                // Inbound messages (from the client to the registry)
                msg = self.socket.receive_message() => {
                    match msg {
                        Ok(Some(message)) => self.session.handle_text(&message),
                        Ok(None) => break Ok(()), // Client disconnected
                        Err(e) => break Err(e),
                    }
                }
            }
        };

        self.session.handle_disconnect();
        let _ = self.socket.close().await;
        result
    }
}
