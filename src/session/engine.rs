//! The session engine: one task per session owning all mutable state.
//!
//! Callers hold a `Session` handle and talk to the engine over an mpsc
//! request channel with oneshot replies, so state transitions are never
//! re-entrant. The engine consumes chunks from the channel pump, re-runs
//! the normalizer over its append-only buffer, and resolves the single
//! in-flight command on prompt detection, timeout, or channel fault.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::channel::{spawn_pump, ChannelHandle, ChunkEvent, ShellConnector};
use crate::config::Settings;
use crate::domain::{
    AuthMethod, CloseReason, CommandOutcome, OsFamily, SessionEvent, SessionId, SessionPhase,
    SessionProfile,
};
use crate::error::SessionError;
use crate::events::EventBus;
use crate::intel::derive_context;
use crate::ledger::LedgerWriter;
use crate::normalize::{
    clean_output, is_sudo_prompt, mask_secret, strip_ansi, suppress_echo, PromptMatcher,
};

/// Bytes kept around between commands for unsolicited output
const IDLE_BUFFER_LIMIT: usize = 8 * 1024;

const PROBE_COMMAND: &str = "uname -s";

/// Supplies secrets for sudo password prompts. Implemented by the UI;
/// returning `None` means the user cancelled.
pub trait CredentialPrompt: Send + Sync {
    fn request_secret(&self, prompt: &str) -> Option<String>;
}

/// Shared dependencies injected into every session at construction time
#[derive(Clone)]
pub struct SessionContext {
    pub settings: Settings,
    pub connector: Arc<dyn ShellConnector>,
    pub credentials: Arc<dyn CredentialPrompt>,
    pub ledger: LedgerWriter,
    pub events: EventBus,
}

enum EngineRequest {
    Send {
        command: String,
        reply: oneshot::Sender<Result<CommandOutcome, SessionError>>,
    },
    Interrupt,
    History(oneshot::Sender<Vec<String>>),
    Close(oneshot::Sender<()>),
}

/// Handle to one open session. Cloneable; all clones drive the same
/// engine task.
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    profile: SessionProfile,
    os: OsFamily,
    req_tx: mpsc::UnboundedSender<EngineRequest>,
}

impl Session {
    /// Connect, wait for the login prompt, probe the remote OS, and start
    /// the engine task. A failed probe leaves the OS unknown; only channel
    /// faults abort the open.
    pub async fn open(
        ctx: &SessionContext,
        profile: SessionProfile,
        auth: AuthMethod,
    ) -> Result<Session, SessionError> {
        let channel = ctx.connector.connect(&profile, &auth).await?;
        let (channel, data_rx) = spawn_pump(channel, ctx.settings.poll_interval());
        let (req_tx, req_rx) = mpsc::unbounded_channel();

        let matcher = match &ctx.settings.prompt_pattern {
            Some(pattern) => PromptMatcher::from_pattern(pattern),
            None => PromptMatcher::for_user_host(&profile.username, &profile.hostname),
        }
        .map_err(|e| {
            warn!("Prompt pattern rejected: {e}");
            SessionError::Closed
        })?;

        let id = SessionId::new_v4();
        let mut engine = Engine {
            id,
            profile: profile.clone(),
            settings: ctx.settings.clone(),
            matcher,
            os: OsFamily::Unknown,
            phase: SessionPhase::Connecting,
            channel,
            data_rx,
            req_rx,
            pending: None,
            secret_rx: None,
            raw: String::new(),
            last_output: String::new(),
            history: Vec::new(),
            secrets: Vec::new(),
            credentials: Arc::clone(&ctx.credentials),
            ledger: ctx.ledger.clone(),
            events: ctx.events.clone(),
        };

        engine.establish().await?;
        let os = engine.os;
        info!("Session {id} open to {profile} (os: {os})");
        ctx.events.publish(SessionEvent::Opened {
            id,
            profile: profile.clone(),
            os,
        });

        tokio::spawn(engine.run());

        Ok(Session {
            id,
            profile,
            os,
            req_tx,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn profile(&self) -> &SessionProfile {
        &self.profile
    }

    pub fn os(&self) -> OsFamily {
        self.os
    }

    /// Run one command and wait for its normalized output. Fails fast
    /// with `Busy` while another command is in flight and `Closed` once
    /// the session has ended; a timeout is a successful result with
    /// `timed_out` set.
    pub async fn send(&self, command: &str) -> Result<CommandOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.req_tx
            .send(EngineRequest::Send {
                command: command.to_string(),
                reply,
            })
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Send an out-of-band interrupt (Ctrl-C) without entering the
    /// command protocol
    pub fn interrupt(&self) {
        let _ = self.req_tx.send(EngineRequest::Interrupt);
    }

    /// Commands sent on this session, oldest first
    pub async fn history(&self) -> Vec<String> {
        let (tx, rx) = oneshot::channel();
        if self.req_tx.send(EngineRequest::History(tx)).is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Close the session, cancelling any in-flight work. Idempotent.
    pub async fn close(&self) {
        let (tx, rx) = oneshot::channel();
        if self.req_tx.send(EngineRequest::Close(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

/// A command in flight; at most one per session
struct PendingCommand {
    text: String,
    deadline: Instant,
    reply: oneshot::Sender<Result<CommandOutcome, SessionError>>,
    /// The sudo prompt is acted on once per command
    sudo_handled: bool,
}

struct Engine {
    id: SessionId,
    profile: SessionProfile,
    settings: Settings,
    matcher: PromptMatcher,
    os: OsFamily,
    phase: SessionPhase,
    channel: ChannelHandle,
    data_rx: mpsc::Receiver<ChunkEvent>,
    req_rx: mpsc::UnboundedReceiver<EngineRequest>,
    pending: Option<PendingCommand>,
    /// In-flight credential request for the sudo sub-state. Kept out of
    /// the run loop so close and timeout stay responsive while the
    /// provider blocks.
    secret_rx: Option<oneshot::Receiver<Option<String>>>,
    /// Append-only raw bytes for the current command; normalizer passes
    /// re-scan it idempotently on every chunk
    raw: String,
    /// Previous command's normalized output, feeding context derivation
    last_output: String,
    history: Vec<String>,
    /// Secrets to mask in any delivered output
    secrets: Vec<String>,
    credentials: Arc<dyn CredentialPrompt>,
    ledger: LedgerWriter,
    events: EventBus,
}

impl Engine {
    /// Connecting phase: drain to the first login prompt, then probe the
    /// remote OS family with a one-shot diagnostic command.
    async fn establish(&mut self) -> Result<(), SessionError> {
        self.collect_until_prompt(self.settings.probe_timeout()).await?;
        self.raw.clear();

        if !self.channel.write(format!("{PROBE_COMMAND}\n").into_bytes()) {
            return Err(SessionError::Closed);
        }
        let completed = self
            .collect_until_prompt(self.settings.probe_timeout())
            .await?;
        if !completed {
            debug!("OS probe saw no prompt; classifying whatever arrived");
        }
        // A shell that rejects uname (Cisco, Windows) identifies itself
        // by the rejection text, so the reply is classified either way
        let reply = clean_output(&self.raw, PROBE_COMMAND, &self.matcher);
        self.os = OsFamily::from_probe(&reply);
        self.raw.clear();
        self.phase = SessionPhase::Ready;
        Ok(())
    }

    /// Accumulate chunks until the prompt shows at the buffer tail.
    /// Ok(false) on deadline expiry, Err on channel fault.
    async fn collect_until_prompt(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<bool, SessionError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.matcher.matches_tail(&strip_ansi(&self.raw)) {
                return Ok(true);
            }
            let event = tokio::select! {
                event = self.data_rx.recv() => event,
                _ = tokio::time::sleep_until(deadline) => return Ok(false),
            };
            match event {
                Some(ChunkEvent::Data(bytes)) => {
                    self.raw.push_str(&String::from_utf8_lossy(&bytes));
                }
                Some(ChunkEvent::Closed) | None => return Err(SessionError::Closed),
            }
        }
    }

    async fn run(mut self) {
        loop {
            let deadline = self.pending.as_ref().map(|p| p.deadline);
            tokio::select! {
                req = self.req_rx.recv() => match req {
                    Some(EngineRequest::Close(ack)) => {
                        self.shutdown(CloseReason::Requested);
                        let _ = ack.send(());
                        return;
                    }
                    None => {
                        self.shutdown(CloseReason::Requested);
                        return;
                    }
                    Some(EngineRequest::Send { command, reply }) => {
                        self.handle_send(command, reply);
                    }
                    Some(EngineRequest::Interrupt) => {
                        debug!("Session {}: interrupt", self.id);
                        self.channel.write(vec![0x03]);
                    }
                    Some(EngineRequest::History(ack)) => {
                        let _ = ack.send(self.history.clone());
                    }
                },
                event = self.data_rx.recv() => match event {
                    Some(ChunkEvent::Data(bytes)) => self.ingest(&bytes),
                    Some(ChunkEvent::Closed) | None => {
                        self.shutdown(CloseReason::ChannelFault);
                        return;
                    }
                },
                secret = wait_for_secret(&mut self.secret_rx), if self.secret_rx.is_some() => {
                    self.secret_rx = None;
                    self.apply_secret(secret);
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() => {
                    self.resolve_timeout();
                },
            }
        }
    }

    fn handle_send(
        &mut self,
        command: String,
        reply: oneshot::Sender<Result<CommandOutcome, SessionError>>,
    ) {
        if self.phase == SessionPhase::Closed {
            let _ = reply.send(Err(SessionError::Closed));
            return;
        }
        if self.pending.is_some() {
            let _ = reply.send(Err(SessionError::Busy));
            return;
        }
        if !self.channel.write(format!("{command}\n").into_bytes()) {
            let _ = reply.send(Err(SessionError::Closed));
            return;
        }

        self.raw.clear();
        self.history.push(command.clone());
        self.pending = Some(PendingCommand {
            text: command,
            deadline: Instant::now() + self.settings.command_timeout(),
            reply,
            sudo_handled: false,
        });
        self.phase = SessionPhase::AwaitingOutput;
    }

    fn ingest(&mut self, bytes: &[u8]) {
        self.raw.push_str(&String::from_utf8_lossy(bytes));

        if self.pending.is_none() {
            // Unsolicited output (broadcast messages etc.); keep a bounded tail
            if self.raw.len() > IDLE_BUFFER_LIMIT {
                let cut = self.raw.len() - IDLE_BUFFER_LIMIT;
                let boundary = self
                    .raw
                    .char_indices()
                    .map(|(i, _)| i)
                    .find(|&i| i >= cut)
                    .unwrap_or(0);
                self.raw.drain(..boundary);
            }
            return;
        }

        let stripped = strip_ansi(&self.raw);

        // The sudo password prompt outranks normal prompt detection
        let needs_sudo = self
            .pending
            .as_ref()
            .map(|p| !p.sudo_handled && is_sudo_prompt(&stripped))
            .unwrap_or(false);
        if needs_sudo {
            self.enter_sudo();
            return;
        }

        if self.matcher.matches_tail(&stripped) {
            self.resolve_complete();
        }
    }

    /// Sudo sub-state: suspend output delivery and request a credential
    /// out-of-band. The provider runs on the blocking pool and reports
    /// back over a oneshot the run loop polls, so close and timeout
    /// requests are still serviced while the provider waits on a user.
    fn enter_sudo(&mut self) {
        self.phase = SessionPhase::SudoPassword;
        if let Some(p) = self.pending.as_mut() {
            p.sudo_handled = true;
        }

        let credentials = Arc::clone(&self.credentials);
        let prompt = format!("[sudo] password for {}", self.profile.username);
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let secret = tokio::task::spawn_blocking(move || credentials.request_secret(&prompt))
                .await
                .unwrap_or(None);
            let _ = tx.send(secret);
        });
        self.secret_rx = Some(rx);
    }

    /// Resolution of the sudo credential request: feed the secret to the
    /// channel or abort the in-flight command. A late answer after the
    /// command already resolved is discarded.
    fn apply_secret(&mut self, secret: Option<String>) {
        if self.phase != SessionPhase::SudoPassword || self.pending.is_none() {
            debug!("Session {}: discarding stale sudo credential", self.id);
            return;
        }
        match secret {
            Some(secret) => {
                self.secrets.push(secret.clone());
                if !self.channel.write(format!("{secret}\n").into_bytes()) {
                    self.shutdown(CloseReason::ChannelFault);
                    return;
                }
                self.phase = SessionPhase::AwaitingOutput;
            }
            None => {
                debug!("Session {}: sudo credential cancelled", self.id);
                // Abort the command so the shell returns to its prompt
                self.channel.write(vec![0x03]);
                if let Some(p) = self.pending.take() {
                    let _ = p.reply.send(Err(SessionError::CredentialCancelled));
                }
                self.raw.clear();
                self.phase = SessionPhase::Ready;
            }
        }
    }

    fn resolve_complete(&mut self) {
        let Some(p) = self.pending.take() else {
            return;
        };
        let output = self.masked(&clean_output(&self.raw, &p.text, &self.matcher));

        // Learn from the completion: bucket by the OS family plus what the
        // screen showed when the command was typed
        let context = derive_context(
            self.os,
            &self.last_output,
            self.settings.context_snippet_chars,
        );
        self.ledger.record(&p.text, &context);

        self.events.publish(SessionEvent::CommandCompleted {
            id: self.id,
            command: p.text.clone(),
            timed_out: false,
        });

        self.last_output = output.clone();
        self.raw.clear();
        self.phase = SessionPhase::Ready;
        let _ = p.reply.send(Ok(CommandOutcome::complete(output)));
    }

    /// No prompt within the command timeout: hand back the partial
    /// output as data and stay usable. Timed-out commands are not
    /// recorded in the ledger.
    fn resolve_timeout(&mut self) {
        let Some(p) = self.pending.take() else {
            return;
        };
        warn!("Session {}: command timed out: {}", self.id, p.text);

        let stripped = strip_ansi(&self.raw);
        let partial = self.masked(suppress_echo(&stripped, &p.text).trim());

        self.events.publish(SessionEvent::CommandCompleted {
            id: self.id,
            command: p.text.clone(),
            timed_out: true,
        });

        self.last_output = partial.clone();
        self.raw.clear();
        self.phase = SessionPhase::Ready;
        let _ = p.reply.send(Ok(CommandOutcome::timed_out(partial)));
    }

    fn shutdown(&mut self, reason: CloseReason) {
        if self.phase == SessionPhase::Closed {
            return;
        }
        info!("Session {} closed ({reason:?})", self.id);
        self.phase = SessionPhase::Closed;
        if let Some(p) = self.pending.take() {
            let _ = p.reply.send(Err(SessionError::Closed));
        }
        self.events.publish(SessionEvent::Closed {
            id: self.id,
            reason,
        });
        // Dropping the channel handle stops the pump and closes the
        // underlying channel; that happens when the engine is dropped.
    }

    fn masked(&self, text: &str) -> String {
        let mut out = text.to_string();
        for secret in &self.secrets {
            out = mask_secret(&out, secret);
        }
        out
    }
}

/// Await the in-flight credential request, if any. Only polled when a
/// receiver is present; a dropped provider reads as a cancellation.
async fn wait_for_secret(rx: &mut Option<oneshot::Receiver<Option<String>>>) -> Option<String> {
    match rx.as_mut() {
        Some(rx) => rx.await.unwrap_or(None),
        None => std::future::pending().await,
    }
}
