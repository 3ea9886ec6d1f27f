//! The engine: builder, handle, and the state its tasks share.
//!
//! Ties all the layers together: transport → codec → peers / router →
//! outbound queue → transport. Three tasks run per engine:
//!
//! - reader: byte source → decoder → peer table or envelope assembly
//! - writer: outbound queue → byte sink
//! - announcer: periodic NAME announcement and peer-table rollover
//!
//! The host talks to the engine through [`Engine`] and listens on the
//! [`EventReceiver`] returned by [`EngineBuilder::start`].

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serimesh_peers::{PeerTable, random_name};
use serimesh_protocol::{
    Envelope, EnvelopeAssembler, Field, FieldKind, FrameDecoder, FrameEncoder,
    ProtocolError,
};
use serimesh_transport::{ByteSink, ByteSource, LinkId, TransportError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::check_name;
use crate::router::{RouteDecision, route};
use crate::tasks::{announce_loop, read_loop, write_loop};
use crate::{
    EngineConfig, EngineEvent, EventReceiver, EventSender, OutboundQueue,
    OverflowPolicy, SerimeshError,
};

// ---------------------------------------------------------------------------
// Stop signalling
// ---------------------------------------------------------------------------

/// How [`Engine::stop`] treats items still in the outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopMode {
    /// Write everything already queued, then close the sink.
    #[default]
    Flush,
    /// Abandon queued items and any write in progress.
    Immediate,
}

/// Lifecycle state broadcast to every task over a `watch` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunState {
    Running,
    Stopping(StopMode),
}

impl RunState {
    pub(crate) fn is_running(self) -> bool {
        self == RunState::Running
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// State shared by the handle and the engine tasks.
///
/// Locks are std mutexes held only for short synchronous sections, never
/// across an `.await`. The peer table lock serializes `observe` (reader)
/// against `end_cycle` (announcer).
pub(crate) struct Shared {
    pub(crate) config: EngineConfig,
    pub(crate) encoder: FrameEncoder,
    pub(crate) queue: OutboundQueue,
    identity: Mutex<String>,
    peers: Mutex<PeerTable>,
    events: EventSender,
    state: watch::Sender<RunState>,
    failure: Mutex<Option<TransportError>>,
}

impl Shared {
    pub(crate) fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state.borrow().is_running()
    }

    pub(crate) fn name(&self) -> String {
        lock(&self.identity).clone()
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }

    /// Queues `{NAME=<self>}`.
    pub(crate) fn announce(&self) {
        let name = self.name();
        let bytes = self.encoder.encode_announcement(&name);
        match self.queue.enqueue(bytes.into()) {
            Ok(()) => tracing::trace!(node = %name, "announcement queued"),
            Err(e) => tracing::warn!(node = %name, error = %e, "announcement dropped"),
        }
    }

    fn set_identity(&self, name: String) {
        *lock(&self.identity) = name.clone();
        self.emit(EngineEvent::IdentityChanged { name });
    }

    /// Applies one decoded field.
    pub(crate) fn handle_field(
        &self,
        field: Field,
        assembler: &mut EnvelopeAssembler,
    ) {
        if field.kind == FieldKind::Name {
            let mut peers = lock(&self.peers);
            let cycle = peers.cycle();
            peers.observe(&field.text(), cycle);
            return;
        }
        if let Some(envelope) = assembler.push(field) {
            self.dispatch(envelope);
        }
    }

    fn dispatch(&self, envelope: Envelope) {
        let me = self.name();
        match route(envelope, &me) {
            RouteDecision::Deliver { sender, payload } => {
                tracing::info!(%sender, node = %me, "message received");
                self.emit(EngineEvent::MessageReceived { sender, payload });
            }
            RouteDecision::Relay(envelope) => {
                let bytes = self.encoder.encode_envelope(&envelope);
                match self.queue.enqueue(bytes.into()) {
                    Ok(()) => {
                        let sender = envelope.sender_text().into_owned();
                        let recipient = envelope.recipient_text().into_owned();
                        tracing::debug!(%sender, %recipient, "message relayed");
                        self.emit(EngineEvent::MessageRelayed {
                            sender,
                            recipient,
                            payload: envelope.payload_text().into_owned(),
                        });
                    }
                    Err(e) => {
                        let recipient = envelope.recipient_text();
                        tracing::warn!(%recipient, error = %e, "relay dropped");
                        self.emit(EngineEvent::status(format!(
                            "Relay to {recipient} dropped: {e}"
                        )));
                    }
                }
            }
        }
    }

    /// One announcement cycle: announce, roll the peer table, publish the
    /// visible set, and regenerate identity if someone else holds our name.
    pub(crate) fn run_cycle(&self) {
        self.announce();

        let visible = lock(&self.peers).end_cycle();
        let me = self.name();
        let collision = visible.contains(&me);
        tracing::debug!(node = %me, peers = visible.len(), "cycle ended");
        self.emit(EngineEvent::PeersUpdated {
            peers: visible.clone(),
        });

        if collision {
            let fresh = random_name(&visible);
            tracing::warn!(old = %me, new = %fresh, "name collision, regenerating identity");
            self.set_identity(fresh.clone());
            self.emit(EngineEvent::status(format!(
                "Name {me} is already in use, now {fresh}"
            )));
            self.announce();
        }
    }

    /// Records a link failure and tells every task to stop.
    pub(crate) fn fail(&self, err: TransportError) {
        tracing::warn!(error = %err, "link failed");
        self.emit(EngineEvent::status(format!("Link lost: {err}")));
        lock(&self.failure).get_or_insert(err);
        self.state.send_if_modified(|state| {
            if state.is_running() {
                *state = RunState::Stopping(StopMode::Immediate);
                true
            } else {
                false
            }
        });
    }

    /// Moves to `Stopping(mode)`. A flush already in progress can still be
    /// turned into an immediate stop, never the other way round.
    fn request_stop(&self, mode: StopMode) {
        self.state.send_if_modified(|state| {
            let next = match (*state, mode) {
                (RunState::Running, _) => RunState::Stopping(mode),
                (RunState::Stopping(StopMode::Flush), StopMode::Immediate) => {
                    RunState::Stopping(StopMode::Immediate)
                }
                _ => return false,
            };
            *state = next;
            true
        });
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting an [`Engine`].
///
/// # Example
///
/// ```rust,no_run
/// use serimesh::prelude::*;
///
/// # async fn run() -> Result<(), SerimeshError> {
/// let stream = tokio::net::TcpStream::connect("127.0.0.1:7000").await
///     .map_err(TransportError::ReadFailed)?;
/// let (source, sink) = serimesh::transport::split(stream);
///
/// let (engine, mut events) = Engine::builder()
///     .node_name("Goat")
///     .start(source, sink)?;
///
/// while let Some(event) = events.recv().await {
///     println!("{event:?}");
/// }
/// engine.stop(StopMode::Flush).await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole config.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the initial node name.
    pub fn node_name(mut self, name: impl Into<String>) -> Self {
        self.config.node_name = Some(name.into());
        self
    }

    /// Sets the announcement period in seconds.
    pub fn announce_interval_secs(mut self, secs: u64) -> Self {
        self.config.announce_interval_secs = secs;
        self
    }

    /// Sets the outbound queue bound and overflow policy.
    pub fn outbound(mut self, capacity: usize, policy: OverflowPolicy) -> Self {
        self.config.outbound_capacity = capacity;
        self.config.overflow = policy;
        self
    }

    /// Starts the engine on a byte source and sink.
    ///
    /// Announces immediately, then spawns the reader, writer and
    /// announcer tasks. Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns [`SerimeshError::Protocol`] if the frame config or node
    /// name is unusable.
    pub fn start<R, W>(
        self,
        source: R,
        sink: W,
    ) -> Result<(Engine, EventReceiver), SerimeshError>
    where
        R: ByteSource,
        W: ByteSink,
    {
        let config = self.config.validated();
        config.validate()?;

        let decoder = FrameDecoder::new(config.frame.clone())?;
        let encoder = FrameEncoder::new(&config.frame)?;
        let name = config
            .node_name
            .clone()
            .unwrap_or_else(|| random_name(&BTreeSet::new()));
        let queue =
            OutboundQueue::new(config.outbound_capacity, config.overflow);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(RunState::Running);
        let link = source.id();

        let shared = Arc::new(Shared {
            config,
            encoder,
            queue,
            identity: Mutex::new(name.clone()),
            peers: Mutex::new(PeerTable::new()),
            events: events_tx,
            state: state_tx,
            failure: Mutex::new(None),
        });

        tracing::info!(node = %name, %link, "engine starting");
        shared.emit(EngineEvent::IdentityChanged { name: name.clone() });
        shared.announce();
        shared.emit(EngineEvent::status(format!(
            "Connected on {link} as {name}"
        )));

        let tasks = vec![
            tokio::spawn(read_loop(source, Arc::clone(&shared), decoder)),
            tokio::spawn(write_loop(sink, Arc::clone(&shared))),
            tokio::spawn(announce_loop(Arc::clone(&shared))),
        ];

        Ok((
            Engine {
                shared,
                link,
                tasks,
            },
            events_rx,
        ))
    }
}

// ---------------------------------------------------------------------------
// Engine handle
// ---------------------------------------------------------------------------

/// Handle to a running engine.
///
/// Dropping the handle stops the engine without flushing, including when
/// a [`stop`](Engine::stop) with [`StopMode::Flush`] is abandoned midway.
pub struct Engine {
    shared: Arc<Shared>,
    link: LinkId,
    tasks: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Creates a new builder.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Starts an engine from a config. Shorthand for
    /// `Engine::builder().config(config).start(source, sink)`.
    pub fn start<R, W>(
        config: EngineConfig,
        source: R,
        sink: W,
    ) -> Result<(Engine, EventReceiver), SerimeshError>
    where
        R: ByteSource,
        W: ByteSink,
    {
        EngineBuilder::new().config(config).start(source, sink)
    }

    /// This node's current name.
    pub fn name(&self) -> String {
        self.shared.name()
    }

    /// Peers heard in the current or previous cycle.
    pub fn peers(&self) -> BTreeSet<String> {
        lock(&self.shared.peers).visible()
    }

    /// Number of items waiting to be written.
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// The link this engine runs on.
    pub fn link(&self) -> LinkId {
        self.link
    }

    /// Whether the engine is still accepting work.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// The config the engine was started with, after clamping.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Queues `{FROM=<self>}{TO=<recipient>}{TEXT=<text>}` and emits
    /// [`EngineEvent::MessageSent`].
    ///
    /// # Errors
    /// - [`SerimeshError::Stopped`] once the engine has stopped.
    /// - [`SerimeshError::Protocol`] if `recipient` or `text` is empty or
    ///   contains a frame delimiter.
    /// - [`SerimeshError::Queue`] if the queue is full and its policy is
    ///   [`OverflowPolicy::Reject`].
    pub fn send_text(
        &self,
        recipient: &str,
        text: &str,
    ) -> Result<(), SerimeshError> {
        if !self.is_running() {
            return Err(SerimeshError::Stopped);
        }
        if recipient.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "You must select a node".into(),
            )
            .into());
        }
        if text.is_empty() {
            return Err(
                ProtocolError::InvalidMessage("No text entered".into()).into()
            );
        }
        let frame = &self.shared.config.frame;
        frame.check_value("recipient", recipient)?;
        frame.check_value("text", text)?;

        let envelope = Envelope::new(self.name(), recipient, text);
        let bytes = self.shared.encoder.encode_envelope(&envelope);
        self.shared.queue.enqueue(bytes.into())?;

        tracing::debug!(%recipient, "message queued");
        self.shared.emit(EngineEvent::MessageSent {
            recipient: recipient.to_string(),
            payload: text.to_string(),
        });
        Ok(())
    }

    /// Changes this node's name and announces it right away.
    ///
    /// # Errors
    /// - [`SerimeshError::Stopped`] once the engine has stopped.
    /// - [`SerimeshError::Protocol`] if `name` is empty or contains a frame
    ///   delimiter.
    pub fn set_name(&self, name: &str) -> Result<(), SerimeshError> {
        if !self.is_running() {
            return Err(SerimeshError::Stopped);
        }
        check_name(&self.shared.config.frame, name)?;

        tracing::info!(node = %name, "renamed");
        self.shared.set_identity(name.to_string());
        self.shared.announce();
        Ok(())
    }

    /// Resolves once the engine has stopped, by request or after the link
    /// failed.
    pub async fn closed(&self) {
        let mut state = self.shared.subscribe();
        let _ = state.wait_for(|s| !s.is_running()).await;
    }

    /// Stops every task and waits for them to finish.
    ///
    /// A blocked byte read is abandoned immediately. With
    /// [`StopMode::Flush`] the writer first writes everything already
    /// queued.
    ///
    /// # Errors
    /// - [`SerimeshError::Transport`] if the link failed while the engine
    ///   was running.
    /// - [`SerimeshError::TaskFailed`] if a task panicked.
    pub async fn stop(mut self, mode: StopMode) -> Result<(), SerimeshError> {
        self.shared.request_stop(mode);

        let mut result = Ok(());
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "engine task failed");
                if result.is_ok() {
                    result = Err(SerimeshError::TaskFailed(e.to_string()));
                }
            }
        }

        tracing::info!(link = %self.link, ?mode, "engine stopped");
        self.shared.emit(EngineEvent::status("Disconnected"));

        if let Some(err) = lock(&self.shared.failure).take() {
            return Err(err.into());
        }
        result
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shared.request_stop(StopMode::Immediate);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("name", &self.name())
            .field("link", &self.link)
            .field("running", &self.is_running())
            .finish()
    }
}
