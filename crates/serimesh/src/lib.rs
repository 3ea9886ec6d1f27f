//! # Serimesh
//!
//! Mesh messaging for nodes that share a serial line.
//!
//! Every node periodically announces its name as `{NAME=<name>}` and keeps
//! track of which other names it has heard recently. A message travels as
//! three consecutive frames, `{FROM=<sender>}{TO=<recipient>}{TEXT=<text>}`.
//! A node that receives a message addressed to itself delivers it;
//! anything else is put back on the line for the next hop.
//!
//! The host (a UI, a bridge, a test) supplies a byte source and a byte
//! sink, starts an [`Engine`], and reacts to the [`EngineEvent`]s it emits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serimesh::prelude::*;
//!
//! # async fn run(stream: tokio::io::DuplexStream) -> Result<(), SerimeshError> {
//! let (source, sink) = serimesh::transport::split(stream);
//! let (engine, mut events) = Engine::builder().start(source, sink)?;
//!
//! engine.send_text("Bear", "hello")?;
//! while let Some(event) = events.recv().await {
//!     if let EngineEvent::MessageReceived { sender, payload } = event {
//!         println!("{sender}: {payload}");
//!     }
//! }
//! engine.stop(StopMode::Flush).await
//! # }
//! ```

mod config;
mod engine;
mod error;
mod events;
mod queue;
mod router;
mod tasks;

pub use config::{EngineConfig, OverflowPolicy};
pub use engine::{Engine, EngineBuilder, StopMode};
pub use error::{QueueError, SerimeshError};
pub use events::{EngineEvent, EventReceiver, EventSender};
pub use queue::{OutboundItem, OutboundQueue};
pub use router::{RouteDecision, route};

pub use serimesh_peers as peers;
pub use serimesh_protocol as protocol;
pub use serimesh_tick as tick;
pub use serimesh_transport as transport;

pub mod prelude {
    //! Re-exports everything a host needs to run an engine.

    pub use crate::{
        Engine, EngineBuilder, EngineConfig, EngineEvent, EventReceiver,
        OverflowPolicy, SerimeshError, StopMode,
    };
    pub use serimesh_protocol::{Envelope, FrameConfig, ProtocolError};
    pub use serimesh_transport::{ByteSink, ByteSource, LinkId, TransportError};
}
