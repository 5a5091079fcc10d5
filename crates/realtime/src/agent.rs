//! Per-caller voice agent.
//!
//! `VoiceAgent` is the surface a UI talks to. It owns at most one running
//! session; starting a new call tears the previous one down first.

use crate::{
    config::RealtimeConfig,
    credentials::HttpCredentialSource,
    dispatcher::{HttpToolBackend, ToolBackend},
    error::SessionError,
    negotiator::{NegotiationSettings, Negotiator},
    presenter::{Presenter, SessionSnapshot, SessionSubscription},
    session::{Session, SessionCommand, SessionInfo},
    signaling::HttpSignaling,
    status::ConversationStatus,
    transport::{MediaDevices, PeerFactory},
};
use std::sync::Arc;
use tokio::{
    sync::{Mutex, mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

const COMMAND_CAPACITY: usize = 16;

struct ActiveSession {
    info: SessionInfo,
    cancel: CancellationToken,
    commands: mpsc::Sender<SessionCommand>,
    handle: JoinHandle<()>,
}

impl ActiveSession {
    async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(session_id = %self.info.session_id, error = %e, "Session task did not finish cleanly");
        }
    }
}

pub struct VoiceAgent {
    negotiator: Arc<Negotiator>,
    tools: Arc<dyn ToolBackend>,
    presenter: Arc<Presenter>,
    active: Mutex<Option<ActiveSession>>,
}

impl VoiceAgent {
    pub fn new(negotiator: Negotiator, tools: Arc<dyn ToolBackend>) -> Self {
        Self {
            negotiator: Arc::new(negotiator),
            tools,
            presenter: Arc::new(Presenter::new()),
            active: Mutex::new(None),
        }
    }

    /// Wires the HTTP collaborators from `config` around the host's media engine.
    pub fn from_config(
        config: &RealtimeConfig,
        media: Arc<dyn MediaDevices>,
        peers: Arc<dyn PeerFactory>,
    ) -> Self {
        let negotiator = Negotiator::new(
            Arc::new(HttpCredentialSource::new(config.backend_url.clone())),
            media,
            peers,
            Arc::new(HttpSignaling::new(
                config.provider_url.clone(),
                config.model.clone(),
            )),
            NegotiationSettings::from(config),
        );
        Self::new(
            negotiator,
            Arc::new(HttpToolBackend::new(config.backend_url.clone())),
        )
    }

    pub fn subscribe(&self) -> SessionSubscription {
        self.presenter.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.presenter.snapshot()
    }

    pub fn status(&self) -> ConversationStatus {
        self.presenter.snapshot().status
    }

    pub fn audio_level(&self) -> f32 {
        self.presenter.level()
    }

    /// Starts a call for `persona` and waits until the provider has
    /// acknowledged the session.
    #[instrument(skip(self))]
    pub async fn start_call(&self, persona: &str) -> Result<SessionInfo, SessionError> {
        let (info, ready) = {
            let mut active = self.active.lock().await;
            if let Some(previous) = active.take() {
                debug!(session_id = %previous.info.session_id, "Replacing active session");
                previous.shutdown().await;
            }

            let info = SessionInfo::new(persona);
            self.presenter.begin(info.session_id, persona);

            let cancel = CancellationToken::new();
            let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
            let (ready_tx, ready_rx) = oneshot::channel();
            let session = Session::new(
                info.clone(),
                Arc::clone(&self.negotiator),
                Arc::clone(&self.tools),
                Arc::clone(&self.presenter),
                cancel.clone(),
                commands_rx,
                ready_tx,
            );
            let handle = tokio::spawn(session.run());
            *active = Some(ActiveSession {
                info: info.clone(),
                cancel,
                commands: commands_tx,
                handle,
            });
            (info, ready_rx)
        };

        match ready.await {
            Ok(Ok(())) => {
                info!(session_id = %info.session_id, "Call started");
                Ok(info)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SessionError::Cancelled),
        }
    }

    /// Ends the current call, if any, and waits for its resources to be
    /// released.
    pub async fn end_call(&self) {
        let previous = self.active.lock().await.take();
        if let Some(previous) = previous {
            info!(session_id = %previous.info.session_id, "Ending call");
            previous.shutdown().await;
        }
    }

    pub async fn set_muted(&self, muted: bool) -> Result<(), SessionError> {
        self.command(SessionCommand::SetMuted(muted)).await
    }

    /// Flips the mute state. Returns the new state.
    pub async fn toggle_mute(&self) -> Result<bool, SessionError> {
        let muted = !self.presenter.snapshot().muted;
        self.set_muted(muted).await?;
        Ok(muted)
    }

    /// Sends typed text as a user message and asks for a response.
    pub async fn send_text(&self, text: &str) -> Result<(), SessionError> {
        if !self.status().is_live() {
            return Err(SessionError::NoActiveSession);
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command(SessionCommand::SendText(text.to_string(), reply_tx))
            .await?;
        reply_rx.await.unwrap_or(Err(SessionError::TransportClosed))
    }

    /// Stops agent audio output, cancelling the response being generated if
    /// there is one. Returns `false` when the call is not live yet.
    pub async fn interrupt(&self) -> Result<bool, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command(SessionCommand::Interrupt(reply_tx)).await?;
        reply_rx.await.map_err(|_| SessionError::NoActiveSession)
    }

    async fn command(&self, command: SessionCommand) -> Result<(), SessionError> {
        let commands = {
            let active = self.active.lock().await;
            match active.as_ref() {
                Some(session) if !session.handle.is_finished() => session.commands.clone(),
                _ => return Err(SessionError::NoActiveSession),
            }
        };
        commands
            .send(command)
            .await
            .map_err(|_| SessionError::NoActiveSession)
    }
}

impl Drop for VoiceAgent {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.cancel.cancel();
        }
    }
}
