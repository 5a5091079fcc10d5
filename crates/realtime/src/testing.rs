//! In-memory media, peer and signaling fakes for driving a full `VoiceAgent`.

use crate::{
    agent::VoiceAgent,
    credentials::{BusinessSummary, CredentialSource, SessionGrant},
    dispatcher::ToolBackend,
    error::{CredentialError, MediaError, SignalingError, TransportError},
    negotiator::{NegotiationSettings, Negotiator},
    presenter::SessionSnapshot,
    session::SessionInfo,
    signaling::Signaling,
    status::ConversationStatus,
    transport::{
        AudioConstraints, ChannelEvent, DataChannel, MediaDevices, Microphone, PeerConnection,
        PeerFactory,
    },
};
use async_trait::async_trait;
use receptionist_core::{BusinessCatalog, SessionConfig, select_voice};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::{Notify, mpsc};

const WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub(crate) struct HarnessOptions {
    pub fail_credentials: bool,
    pub deny_microphone: bool,
    pub hang_signaling: bool,
    pub reject_signaling: bool,
    pub timeout: Duration,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            fail_credentials: false,
            deny_microphone: false,
            hang_signaling: false,
            reject_signaling: false,
            timeout: WAIT,
        }
    }
}

#[derive(Default)]
struct RecorderState {
    credential_requests: usize,
    microphone_requests: usize,
    peers_created: usize,
    restarts: usize,
    released: Vec<&'static str>,
    microphone_enabled: bool,
    frames: Option<mpsc::Sender<Vec<i16>>>,
}

/// Shared view into what the fakes have been asked to do.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    state: Arc<Mutex<RecorderState>>,
    signaling: Arc<Notify>,
}

impl Recorder {
    fn with<R>(&self, f: impl FnOnce(&mut RecorderState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn credential_requests(&self) -> usize {
        self.with(|s| s.credential_requests)
    }

    pub fn microphone_requests(&self) -> usize {
        self.with(|s| s.microphone_requests)
    }

    pub fn peers_created(&self) -> usize {
        self.with(|s| s.peers_created)
    }

    pub fn restarts(&self) -> usize {
        self.with(|s| s.restarts)
    }

    pub fn released(&self) -> Vec<&'static str> {
        self.with(|s| s.released.clone())
    }

    pub fn microphone_enabled(&self) -> bool {
        self.with(|s| s.microphone_enabled)
    }

    /// Ends the current capture as if the platform stopped the track.
    pub fn end_capture(&self) {
        self.with(|s| s.frames = None);
    }

    pub async fn send_frame(&self, frame: Vec<i16>) {
        let frames = self.with(|s| s.frames.clone()).expect("capture is running");
        frames.send(frame).await.unwrap();
    }

    pub async fn signaling_started(&self) {
        tokio::time::timeout(WAIT, self.signaling.notified())
            .await
            .expect("signaling never started");
    }

    pub async fn wait_for_restarts(&self, count: usize) {
        tokio::time::timeout(WAIT, async {
            while self.restarts() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("microphone was not restarted");
    }

    fn new_capture(&self) -> mpsc::Receiver<Vec<i16>> {
        let (tx, rx) = mpsc::channel(16);
        self.with(|s| s.frames = Some(tx));
        rx
    }
}

struct FakeCredentials {
    recorder: Recorder,
    catalog: BusinessCatalog,
    fail: bool,
}

#[async_trait]
impl CredentialSource for FakeCredentials {
    async fn request(&self, persona: &str) -> Result<SessionGrant, CredentialError> {
        self.recorder.with(|s| s.credential_requests += 1);
        if self.fail {
            return Err(CredentialError::Rejected {
                status: 502,
                body: "Failed to create realtime session".to_string(),
            });
        }
        let business = self.catalog.get(persona).ok_or_else(|| CredentialError::Rejected {
            status: 404,
            body: format!("Unknown persona {persona}"),
        })?;
        Ok(SessionGrant {
            client_secret: SecretString::from("ek_test".to_string()),
            expires_at: None,
            session_config: SessionConfig::for_business(&business, select_voice(persona, &business)),
            business: Some(BusinessSummary {
                id: business.id.clone(),
                name: business.name.clone(),
                agent_name: business.persona.name.clone(),
                greeting: business.persona.greeting.clone(),
            }),
        })
    }
}

struct FakeMedia {
    recorder: Recorder,
    deny: bool,
}

#[async_trait]
impl MediaDevices for FakeMedia {
    async fn open_microphone(
        &self,
        _constraints: &AudioConstraints,
    ) -> Result<Box<dyn Microphone>, MediaError> {
        self.recorder.with(|s| s.microphone_requests += 1);
        if self.deny {
            return Err(MediaError::Denied);
        }
        self.recorder.with(|s| s.microphone_enabled = true);
        Ok(Box::new(FakeMicrophone {
            frames: Some(self.recorder.new_capture()),
            recorder: self.recorder.clone(),
        }))
    }
}

struct FakeMicrophone {
    recorder: Recorder,
    frames: Option<mpsc::Receiver<Vec<i16>>>,
}

#[async_trait]
impl Microphone for FakeMicrophone {
    fn set_enabled(&mut self, enabled: bool) {
        self.recorder.with(|s| s.microphone_enabled = enabled);
    }

    fn is_enabled(&self) -> bool {
        self.recorder.microphone_enabled()
    }

    fn take_frames(&mut self) -> Option<mpsc::Receiver<Vec<i16>>> {
        self.frames.take()
    }

    async fn restart(&mut self) -> Result<(), MediaError> {
        self.frames = Some(self.recorder.new_capture());
        self.recorder.with(|s| s.restarts += 1);
        Ok(())
    }

    fn stop(&mut self) {
        self.recorder.with(|s| {
            s.frames = None;
            s.released.push("microphone");
        });
    }
}

struct FakePeers {
    recorder: Recorder,
    remotes: mpsc::UnboundedSender<Remote>,
}

#[async_trait]
impl PeerFactory for FakePeers {
    async fn create(
        &self,
        _microphone: &mut dyn Microphone,
    ) -> Result<Box<dyn PeerConnection>, TransportError> {
        self.recorder.with(|s| s.peers_created += 1);
        Ok(Box::new(FakePeer {
            recorder: self.recorder.clone(),
            remotes: self.remotes.clone(),
        }))
    }
}

struct FakePeer {
    recorder: Recorder,
    remotes: mpsc::UnboundedSender<Remote>,
}

#[async_trait]
impl PeerConnection for FakePeer {
    async fn create_data_channel(&mut self, label: &str) -> Result<DataChannel, TransportError> {
        assert_eq!(label, "oai-events");
        let (outbound, from_client) = mpsc::channel(64);
        let (to_client, inbound) = mpsc::channel(64);
        self.remotes
            .send(Remote {
                to_client,
                from_client: Arc::new(tokio::sync::Mutex::new(from_client)),
            })
            .map_err(|_| TransportError::Peer("harness dropped".to_string()))?;
        Ok(DataChannel { outbound, inbound })
    }

    async fn create_offer(&mut self) -> Result<String, TransportError> {
        Ok("v=0 offer".to_string())
    }

    async fn apply_answer(&mut self, sdp: String) -> Result<(), TransportError> {
        assert_eq!(sdp, "v=0 answer");
        Ok(())
    }

    async fn close(&mut self) {
        self.recorder.with(|s| s.released.push("peer"));
    }
}

struct FakeSignaling {
    recorder: Recorder,
    hang: bool,
    reject: bool,
}

#[async_trait]
impl Signaling for FakeSignaling {
    async fn exchange(
        &self,
        _credential: &SecretString,
        offer_sdp: String,
    ) -> Result<String, SignalingError> {
        assert_eq!(offer_sdp, "v=0 offer");
        self.recorder.signaling.notify_one();
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.reject {
            return Err(SignalingError::Rejected {
                status: 401,
                body: "Invalid ephemeral key".to_string(),
            });
        }
        Ok("v=0 answer".to_string())
    }
}

/// The provider's end of the event data channel.
#[derive(Clone)]
pub(crate) struct Remote {
    to_client: mpsc::Sender<ChannelEvent>,
    from_client: Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>,
}

impl Remote {
    pub async fn open(&self) {
        self.to_client.send(ChannelEvent::Open).await.unwrap();
    }

    pub async fn server(&self, event: Value) {
        self.to_client
            .send(ChannelEvent::Message(event.to_string()))
            .await
            .unwrap();
    }

    pub async fn client_event(&self) -> Value {
        let raw = tokio::time::timeout(WAIT, self.from_client.lock().await.recv())
            .await
            .expect("no client event")
            .expect("data channel closed");
        serde_json::from_str(&raw).unwrap()
    }

    pub async fn assert_no_client_event(&self) {
        let next = tokio::time::timeout(
            Duration::from_millis(100),
            self.from_client.lock().await.recv(),
        )
        .await;
        assert!(next.is_err(), "unexpected client event {next:?}");
    }

    pub async fn is_closed(&self) -> bool {
        tokio::time::timeout(WAIT, self.from_client.lock().await.recv())
            .await
            .expect("data channel still open")
            .is_none()
    }
}

pub(crate) struct Harness {
    pub agent: Arc<VoiceAgent>,
    pub recorder: Recorder,
    remotes: mpsc::UnboundedReceiver<Remote>,
    current: Option<Remote>,
}

impl Harness {
    pub fn new(options: HarnessOptions, tools: Arc<dyn ToolBackend>) -> Self {
        let recorder = Recorder::default();
        let (remotes_tx, remotes) = mpsc::unbounded_channel();
        let negotiator = Negotiator::new(
            Arc::new(FakeCredentials {
                recorder: recorder.clone(),
                catalog: BusinessCatalog::demo(),
                fail: options.fail_credentials,
            }),
            Arc::new(FakeMedia {
                recorder: recorder.clone(),
                deny: options.deny_microphone,
            }),
            Arc::new(FakePeers {
                recorder: recorder.clone(),
                remotes: remotes_tx,
            }),
            Arc::new(FakeSignaling {
                recorder: recorder.clone(),
                hang: options.hang_signaling,
                reject: options.reject_signaling,
            }),
            NegotiationSettings {
                data_channel_label: "oai-events".to_string(),
                timeout: options.timeout,
                constraints: AudioConstraints::default(),
            },
        );
        Self {
            agent: Arc::new(VoiceAgent::new(negotiator, tools)),
            recorder,
            remotes,
            current: None,
        }
    }

    pub async fn next_remote(&mut self) -> Remote {
        tokio::time::timeout(WAIT, self.remotes.recv())
            .await
            .expect("no data channel created")
            .expect("peer factory dropped")
    }

    /// Starts a call and plays the provider side up to `session.updated`.
    pub async fn connect(&mut self, persona: &str) -> SessionInfo {
        let agent = Arc::clone(&self.agent);
        let persona = persona.to_string();
        let start = tokio::spawn(async move { agent.start_call(&persona).await });

        let remote = self.next_remote().await;
        remote.open().await;
        assert_eq!(remote.client_event().await["type"], "session.update");
        remote.server(json!({"type": "session.created"})).await;
        let info = start.await.unwrap().unwrap();
        remote.server(json!({"type": "session.updated"})).await;
        self.current = Some(remote);
        info
    }

    pub fn remote(&self) -> Remote {
        self.current.clone().expect("no connected call")
    }

    pub fn take_remote(&mut self) -> Remote {
        self.current.take().expect("no connected call")
    }

    pub async fn wait_for(&self, mut predicate: impl FnMut(&SessionSnapshot) -> bool) -> SessionSnapshot {
        let mut snapshots = self.agent.subscribe().snapshot;
        tokio::time::timeout(WAIT, snapshots.wait_for(|s| predicate(s)))
            .await
            .expect("snapshot condition not reached")
            .expect("presenter dropped")
            .clone()
    }

    pub async fn wait_for_status(&self, status: ConversationStatus) -> SessionSnapshot {
        self.wait_for(|s| s.status == status).await
    }
}
