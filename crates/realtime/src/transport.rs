//! Media and peer transport seams.
//!
//! The host application supplies the platform pieces (microphone capture,
//! WebRTC peer connection, remote audio playback) behind these traits. The
//! session only sees PCM frames for metering and a text data channel for
//! provider events.

use crate::{
    error::{MediaError, TransportError},
    protocol::ClientEvent,
};
use async_trait::async_trait;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

/// Capture constraints requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    pub sample_rate: u32,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            sample_rate: 24_000,
        }
    }
}

/// A live microphone capture.
#[async_trait]
pub trait Microphone: Send {
    /// Enables or disables the outgoing audio track without ending capture.
    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// PCM16 frames of the current capture, for metering. Yields `None`
    /// once taken until the next restart. The stream ends when capture ends.
    fn take_frames(&mut self) -> Option<mpsc::Receiver<Vec<i16>>>;

    /// Starts a new capture after the previous one ended.
    async fn restart(&mut self) -> Result<(), MediaError>;

    fn stop(&mut self);
}

#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn open_microphone(
        &self,
        constraints: &AudioConstraints,
    ) -> Result<Box<dyn Microphone>, MediaError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Open,
    Message(String),
    Closed,
}

/// The bidirectional provider event channel.
pub struct DataChannel {
    pub outbound: mpsc::Sender<String>,
    pub inbound: mpsc::Receiver<ChannelEvent>,
}

/// A peer connection carrying local audio out, remote audio in and the
/// event data channel.
#[async_trait]
pub trait PeerConnection: Send {
    async fn create_data_channel(&mut self, label: &str) -> Result<DataChannel, TransportError>;

    /// Creates and applies the local SDP offer.
    async fn create_offer(&mut self) -> Result<String, TransportError>;

    async fn apply_answer(&mut self, sdp: String) -> Result<(), TransportError>;

    /// Closes the connection and releases the remote audio sink.
    async fn close(&mut self);
}

#[async_trait]
pub trait PeerFactory: Send + Sync {
    /// Creates a peer connection sending the microphone's audio track.
    async fn create(
        &self,
        microphone: &mut dyn Microphone,
    ) -> Result<Box<dyn PeerConnection>, TransportError>;
}

/// Resources held by one session, acquired incrementally during negotiation.
#[derive(Default)]
pub struct SessionTransport {
    pub microphone: Option<Box<dyn Microphone>>,
    pub peer: Option<Box<dyn PeerConnection>>,
    pub outbound: Option<mpsc::Sender<String>>,
    pub inbound: Option<mpsc::Receiver<ChannelEvent>>,
    pub meter: Option<JoinHandle<()>>,
}

impl SessionTransport {
    pub fn attach_channel(&mut self, channel: DataChannel) {
        self.outbound = Some(channel.outbound);
        self.inbound = Some(channel.inbound);
    }

    pub async fn send(&mut self, event: &ClientEvent) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::ChannelClosed)?;
        outbound
            .send(event.to_json()?)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    /// Next data channel event. `Closed` once the channel is gone.
    pub async fn next_event(&mut self) -> ChannelEvent {
        match self.inbound.as_mut() {
            Some(inbound) => inbound.recv().await.unwrap_or(ChannelEvent::Closed),
            None => ChannelEvent::Closed,
        }
    }

    /// Releases everything in reverse acquisition order. Safe to call twice.
    pub async fn release(&mut self) {
        let outbound = self.outbound.take();
        let inbound = self.inbound.take();
        if outbound.is_some() || inbound.is_some() {
            drop(outbound);
            drop(inbound);
            debug!("Data channel released");
        }
        if let Some(mut peer) = self.peer.take() {
            peer.close().await;
            debug!("Peer connection closed");
        }
        if let Some(mut microphone) = self.microphone.take() {
            microphone.stop();
            debug!("Microphone released");
        }
        if let Some(meter) = self.meter.take() {
            meter.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    struct LoggedMic(Log);

    #[async_trait]
    impl Microphone for LoggedMic {
        fn set_enabled(&mut self, _enabled: bool) {}
        fn is_enabled(&self) -> bool {
            true
        }
        fn take_frames(&mut self) -> Option<mpsc::Receiver<Vec<i16>>> {
            None
        }
        async fn restart(&mut self) -> Result<(), MediaError> {
            Ok(())
        }
        fn stop(&mut self) {
            self.0.lock().unwrap().push("microphone");
        }
    }

    struct LoggedPeer(Log);

    #[async_trait]
    impl PeerConnection for LoggedPeer {
        async fn create_data_channel(&mut self, _label: &str) -> Result<DataChannel, TransportError> {
            Err(TransportError::ChannelClosed)
        }
        async fn create_offer(&mut self) -> Result<String, TransportError> {
            Ok(String::new())
        }
        async fn apply_answer(&mut self, _sdp: String) -> Result<(), TransportError> {
            Ok(())
        }
        async fn close(&mut self) {
            self.0.lock().unwrap().push("peer");
        }
    }

    #[tokio::test]
    async fn test_release_order_and_idempotence() {
        let log: Log = Arc::default();
        let (outbound, mut remote_rx) = mpsc::channel(4);
        let (_remote_tx, inbound) = mpsc::channel(4);

        let mut transport = SessionTransport {
            microphone: Some(Box::new(LoggedMic(log.clone()))),
            peer: Some(Box::new(LoggedPeer(log.clone()))),
            ..Default::default()
        };
        transport.attach_channel(DataChannel { outbound, inbound });

        transport.release().await;
        transport.release().await;

        assert_eq!(*log.lock().unwrap(), vec!["peer", "microphone"]);
        assert!(remote_rx.recv().await.is_none());
        assert_eq!(transport.next_event().await, ChannelEvent::Closed);
        assert!(matches!(
            transport.send(&ClientEvent::ResponseCreate).await,
            Err(TransportError::ChannelClosed)
        ));
    }
}
