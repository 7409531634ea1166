//! Attestation exchange transport.

use async_trait::async_trait;
use istio_attestor_core::{AttestationRequest, AttestationResponse, AttestorError, Result};
use tokio::sync::mpsc;

/// One attestation exchange as seen by the attestor.
///
/// The hosting framework provides an implementation per exchange; the
/// attestor receives exactly one request and sends at most one response.
#[async_trait]
pub trait AttestStream: Send {
    async fn recv(&mut self) -> Result<AttestationRequest>;

    async fn send(&mut self, response: AttestationResponse) -> Result<()>;
}

/// Create an in-memory exchange: the attestor side and the host side.
#[must_use]
pub fn channel() -> (ChannelStream, ChannelPeer) {
    let (request_tx, request_rx) = mpsc::channel(1);
    let (response_tx, response_rx) = mpsc::channel(1);
    (
        ChannelStream {
            requests: request_rx,
            responses: response_tx,
        },
        ChannelPeer {
            requests: request_tx,
            responses: response_rx,
        },
    )
}

/// Attestor side of an in-memory exchange
#[derive(Debug)]
pub struct ChannelStream {
    requests: mpsc::Receiver<AttestationRequest>,
    responses: mpsc::Sender<AttestationResponse>,
}

#[async_trait]
impl AttestStream for ChannelStream {
    async fn recv(&mut self) -> Result<AttestationRequest> {
        self.requests
            .recv()
            .await
            .ok_or_else(|| AttestorError::Stream("request channel closed".into()))
    }

    async fn send(&mut self, response: AttestationResponse) -> Result<()> {
        self.responses
            .send(response)
            .await
            .map_err(|_| AttestorError::Stream("response channel closed".into()))
    }
}

/// Host side of an in-memory exchange
#[derive(Debug)]
pub struct ChannelPeer {
    requests: mpsc::Sender<AttestationRequest>,
    responses: mpsc::Receiver<AttestationResponse>,
}

impl ChannelPeer {
    /// Deliver the attestation request
    pub async fn send(&self, request: AttestationRequest) -> Result<()> {
        self.requests
            .send(request)
            .await
            .map_err(|_| AttestorError::Stream("request channel closed".into()))
    }

    /// Wait for the response; `None` if the exchange ended without one
    pub async fn recv(&mut self) -> Option<AttestationResponse> {
        self.responses.recv().await
    }
}
