//! Wire protocol for serimesh.
//!
//! This crate defines what nodes on a shared serial line say to each other:
//!
//! - **Types** ([`Field`], [`FieldKind`], [`Envelope`]): the units that
//!   travel on the wire.
//! - **Codec** ([`FrameDecoder`], [`FrameEncoder`]): how those units are
//!   recovered from, and turned into, raw bytes.
//! - **Assembly** ([`EnvelopeAssembler`]): how consecutive fields become
//!   one message.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Wire format
//!
//! ```text
//! announcement:  {NAME=<name>}
//! message:       {FROM=<sender>}{TO=<recipient>}{TEXT=<payload>}
//! ```
//!
//! There are no length prefixes, checksums or escapes. Frames with an
//! unknown tag are ignored by receivers.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (Field, Envelope) → Engine (peers, routing)
//! ```

mod assembler;
mod codec;
mod error;
mod frame;
mod types;

pub use assembler::EnvelopeAssembler;
pub use codec::{FrameDecoder, FrameEncoder};
pub use error::ProtocolError;
pub use frame::FrameConfig;
pub use types::{Envelope, Field, FieldKind};
