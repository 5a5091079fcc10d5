//! One voice session, from negotiation to teardown.
//!
//! A session runs as a single task that owns the interpreter, the transport
//! and the dispatcher; it is the only writer of the conversation status.
//! Deliberate ends, failures and remote hang-ups all leave through the same
//! release path.

use crate::{
    dispatcher::{ToolBackend, ToolDispatcher, ToolResult},
    error::{MediaError, SessionError, SignalingError, TransportError},
    interpreter::{Effect, Interpreter},
    level::spawn_meter,
    listening::{ListeningAction, ListeningPolicy},
    negotiator::Negotiator,
    presenter::Presenter,
    protocol::ClientEvent,
    status::StatusInput,
    transport::{ChannelEvent, SessionTransport},
};
use chrono::{DateTime, Utc};
use receptionist_core::SessionConfig;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub persona_id: String,
    pub created_at: DateTime<Utc>,
}

impl SessionInfo {
    pub fn new(persona_id: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            persona_id: persona_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Requests from the agent to its running session.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    SetMuted(bool),
    SendText(String, oneshot::Sender<Result<(), SessionError>>),
    /// Replies whether a response was actually interrupted.
    Interrupt(oneshot::Sender<bool>),
}

pub(crate) struct Session {
    info: SessionInfo,
    negotiator: Arc<Negotiator>,
    presenter: Arc<Presenter>,
    cancel: CancellationToken,
    commands: mpsc::Receiver<SessionCommand>,
    ready: Option<oneshot::Sender<Result<(), SessionError>>>,
    interpreter: Interpreter,
    transport: SessionTransport,
    dispatcher: ToolDispatcher,
    listening: ListeningPolicy,
    capture_ended_tx: mpsc::Sender<()>,
    capture_ended_rx: mpsc::Receiver<()>,
    muted: bool,
}

impl Session {
    pub(crate) fn new(
        info: SessionInfo,
        negotiator: Arc<Negotiator>,
        tools: Arc<dyn ToolBackend>,
        presenter: Arc<Presenter>,
        cancel: CancellationToken,
        commands: mpsc::Receiver<SessionCommand>,
        ready: oneshot::Sender<Result<(), SessionError>>,
    ) -> Self {
        let (capture_ended_tx, capture_ended_rx) = mpsc::channel(1);
        let dispatcher = ToolDispatcher::new(tools, info.persona_id.clone());
        Self {
            info,
            negotiator,
            presenter,
            cancel,
            commands,
            ready: Some(ready),
            interpreter: Interpreter::new(),
            transport: SessionTransport::default(),
            dispatcher,
            listening: ListeningPolicy::new(),
            capture_ended_tx,
            capture_ended_rx,
            muted: false,
        }
    }

    #[instrument(skip_all, fields(session_id = %self.info.session_id, persona = %self.info.persona_id))]
    pub(crate) async fn run(mut self) {
        self.advance(StatusInput::StartRequested);
        info!("Session starting");

        let outcome = self.drive().await;

        self.listening.stop();
        self.dispatcher.abort_all();
        self.transport.release().await;

        match outcome {
            Ok(()) | Err(SessionError::Cancelled) => {
                self.advance(StatusInput::EndRequested);
                self.resolve_ready(Err(SessionError::Cancelled));
                info!("Session ended");
            }
            Err(e) if e.is_disconnect() => {
                warn!(error = %e, "Session disconnected");
                self.advance(StatusInput::TransportClosed);
                self.presenter.error(e.to_string());
                self.resolve_ready(Err(e));
            }
            Err(e) => {
                error!(error = %e, "Session failed");
                self.advance(StatusInput::Failed);
                self.presenter.error(e.to_string());
                self.resolve_ready(Err(e));
            }
        }
    }

    /// Runs until the session ends. `Ok` means it was ended on request.
    async fn drive(&mut self) -> Result<(), SessionError> {
        let cancel = self.cancel.clone();
        let negotiated = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            result = self.negotiator.negotiate(&self.info.persona_id, &mut self.transport) => result?,
        };
        self.start_meter();

        let timeout = self.negotiator.settings().timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            result = tokio::time::timeout(timeout, self.handshake(&negotiated.session_config)) => {
                result.map_err(|_| SignalingError::Timeout {
                    stage: "session acknowledgment",
                    after: timeout,
                })??
            }
        }
        info!(
            business = ?negotiated.business.as_ref().map(|b| &b.name),
            "Session connected"
        );
        self.resolve_ready(Ok(()));

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                command = self.commands.recv() => match command {
                    Some(command) => self.command(command).await?,
                    None => return Ok(()),
                },
                Some(result) = self.dispatcher.next_result(), if self.dispatcher.has_in_flight() => {
                    self.deliver(result).await?
                }
                event = self.transport.next_event() => match event {
                    ChannelEvent::Message(raw) => {
                        let effects = self.interpreter.handle_raw(&raw);
                        self.apply(effects).await?;
                    }
                    ChannelEvent::Open => {}
                    ChannelEvent::Closed => return Err(SessionError::TransportClosed),
                },
                Some(()) = self.capture_ended_rx.recv() => self.capture_ended().await?,
            }
        }
    }

    /// Sends the session configuration once the channel opens and waits for
    /// the provider to acknowledge the session.
    async fn handshake(&mut self, config: &SessionConfig) -> Result<(), SessionError> {
        let mut configured = false;
        loop {
            match self.transport.next_event().await {
                ChannelEvent::Open if !configured => {
                    self.transport
                        .send(&ClientEvent::SessionUpdate {
                            session: config.clone(),
                        })
                        .await?;
                    configured = true;
                    debug!("Session configuration sent");
                }
                ChannelEvent::Open => {}
                ChannelEvent::Message(raw) => {
                    let effects = self.interpreter.handle_raw(&raw);
                    self.apply(effects).await?;
                    if self.interpreter.status().is_live() {
                        return Ok(());
                    }
                }
                ChannelEvent::Closed => return Err(SessionError::TransportClosed),
            }
        }
    }

    async fn apply(&mut self, effects: Vec<Effect>) -> Result<(), SessionError> {
        for effect in effects {
            match effect {
                Effect::StatusChanged(status) => {
                    self.presenter.status(status);
                    if self.listening.status_changed(status) == ListeningAction::Restart {
                        self.restart_microphone().await?;
                    }
                }
                Effect::TranscriptUpdated(entry) => self.presenter.transcript(entry),
                Effect::Dispatch(invocation) => {
                    self.dispatcher.dispatch(invocation);
                }
                Effect::Fatal(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn deliver(&mut self, result: ToolResult) -> Result<(), SessionError> {
        let output = serde_json::to_string(&result.payload).map_err(TransportError::from)?;
        self.transport
            .send(&ClientEvent::function_output(&result.call_id, output))
            .await?;
        self.transport.send(&ClientEvent::ResponseCreate).await?;
        debug!(call_id = %result.call_id, tool = %result.name, "Tool result delivered");
        self.presenter
            .tool_completed(&result.call_id, &result.name, !result.is_error());
        Ok(())
    }

    async fn command(&mut self, command: SessionCommand) -> Result<(), SessionError> {
        match command {
            SessionCommand::SetMuted(muted) => {
                if let Some(microphone) = self.transport.microphone.as_mut() {
                    microphone.set_enabled(!muted);
                }
                self.muted = muted;
                self.presenter.muted(muted);
                debug!(muted, "Microphone toggled");
            }
            SessionCommand::SendText(text, reply) => {
                if !self.interpreter.status().is_live() {
                    let _ = reply.send(Err(SessionError::NoActiveSession));
                    return Ok(());
                }
                // On a send failure the reply is dropped and the session ends.
                self.transport.send(&ClientEvent::user_text(text.as_str())).await?;
                self.transport.send(&ClientEvent::ResponseCreate).await?;
                if let Some(entry) = self.interpreter.record_user_text(&text) {
                    self.presenter.transcript(entry);
                }
                let _ = reply.send(Ok(()));
            }
            SessionCommand::Interrupt(reply) => {
                let status = self.interpreter.status();
                if !status.is_live() {
                    let _ = reply.send(false);
                    return Ok(());
                }
                // Playback can outlast `response.done`.
                if status.response_in_progress() {
                    self.transport.send(&ClientEvent::ResponseCancel).await?;
                }
                self.transport.send(&ClientEvent::OutputAudioBufferClear).await?;
                info!(%status, "Agent output interrupted");
                let _ = reply.send(true);
            }
        }
        Ok(())
    }

    async fn capture_ended(&mut self) -> Result<(), SessionError> {
        match self.listening.capture_ended(self.interpreter.status()) {
            ListeningAction::Restart => self.restart_microphone().await,
            ListeningAction::Defer => {
                debug!(status = %self.interpreter.status(), "Deferring microphone restart");
                Ok(())
            }
            ListeningAction::Ignore => Ok(()),
        }
    }

    async fn restart_microphone(&mut self) -> Result<(), SessionError> {
        let microphone = self
            .transport
            .microphone
            .as_mut()
            .ok_or_else(|| MediaError::Unavailable("microphone was released".to_string()))?;
        microphone.restart().await?;
        microphone.set_enabled(!self.muted);
        info!("Microphone capture restarted");
        self.start_meter();
        Ok(())
    }

    fn start_meter(&mut self) {
        let Some(frames) = self
            .transport
            .microphone
            .as_mut()
            .and_then(|microphone| microphone.take_frames())
        else {
            return;
        };
        if let Some(previous) = self.transport.meter.take() {
            previous.abort();
        }
        self.transport.meter = Some(spawn_meter(
            frames,
            self.presenter.level_sender(),
            self.capture_ended_tx.clone(),
        ));
    }

    fn advance(&mut self, input: StatusInput) {
        if let Some(status) = self.interpreter.apply(input) {
            self.presenter.status(status);
        }
    }

    fn resolve_ready(&mut self, result: Result<(), SessionError>) {
        if let Some(ready) = self.ready.take() {
            let _ = ready.send(result);
        }
    }
}
