//! The three engine tasks.
//!
//! Each task watches the engine's [`RunState`] and leaves its loop as soon
//! as the state says so. A read or write in progress is raced against the
//! stop signal in a `select!`, so a blocked transport never delays a stop.

use std::sync::Arc;
use std::time::Duration;

use serimesh_protocol::{EnvelopeAssembler, FrameDecoder};
use serimesh_tick::CycleScheduler;
use serimesh_transport::{ByteSink, ByteSource, TransportError};
use tokio::sync::watch;

use crate::OutboundItem;
use crate::engine::{RunState, Shared, StopMode};

/// Resolves once the engine leaves [`RunState::Running`].
async fn stopping(state: &mut watch::Receiver<RunState>) {
    let _ = state.wait_for(|s| !s.is_running()).await;
}

/// Resolves once the engine is told to stop without flushing.
async fn stopping_now(state: &mut watch::Receiver<RunState>) {
    let _ = state
        .wait_for(|s| *s == RunState::Stopping(StopMode::Immediate))
        .await;
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

enum Read {
    Byte(u8),
    Eof,
    Idle,
}

async fn read_next<S: ByteSource>(
    source: &mut S,
    timeout: Option<Duration>,
) -> Result<Read, TransportError> {
    let byte = match timeout {
        Some(limit) => {
            match tokio::time::timeout(limit, source.read_byte()).await {
                Ok(result) => result?,
                Err(_) => return Ok(Read::Idle),
            }
        }
        None => source.read_byte().await?,
    };
    Ok(byte.map_or(Read::Eof, Read::Byte))
}

/// Feeds every inbound byte to the decoder and dispatches the fields.
pub(crate) async fn read_loop<S: ByteSource>(
    mut source: S,
    shared: Arc<Shared>,
    mut decoder: FrameDecoder,
) {
    let mut state = shared.subscribe();
    let mut assembler = EnvelopeAssembler::new();
    let timeout = shared.config.read_timeout();
    let link = source.id();
    tracing::debug!(%link, "reader started");

    loop {
        let read = tokio::select! {
            biased;
            _ = stopping(&mut state) => break,
            read = read_next(&mut source, timeout) => read,
        };

        match read {
            Ok(Read::Byte(byte)) => {
                if let Some(field) = decoder.feed(byte) {
                    shared.handle_field(field, &mut assembler);
                }
            }
            Ok(Read::Idle) => tracing::trace!(%link, "read idle"),
            Ok(Read::Eof) => {
                shared.fail(TransportError::Closed("end of stream".into()));
                break;
            }
            Err(e) => {
                shared.fail(e);
                break;
            }
        }
    }

    tracing::debug!(
        %link,
        dropped_frames = decoder.dropped(),
        partial_frame = decoder.buffered(),
        partial_envelope = assembler.is_pending(),
        "reader stopped"
    );
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

async fn write_batch<W: ByteSink>(
    sink: &mut W,
    batch: &[OutboundItem],
) -> Result<(), TransportError> {
    for item in batch {
        sink.write_bytes(item.as_bytes()).await?;
    }
    Ok(())
}

/// Drains the outbound queue to the sink, one whole item at a time.
pub(crate) async fn write_loop<W: ByteSink>(mut sink: W, shared: Arc<Shared>) {
    let mut state = shared.subscribe();
    let link = sink.id();
    tracing::debug!(%link, "writer started");

    loop {
        let current = *state.borrow_and_update();
        match current {
            RunState::Running => {}
            RunState::Stopping(StopMode::Immediate) => {
                tracing::debug!(
                    %link,
                    abandoned = shared.queue.len(),
                    "writer stopping without flush"
                );
                break;
            }
            RunState::Stopping(StopMode::Flush) => {
                let rest = shared.queue.drain_all();
                tracing::debug!(%link, items = rest.len(), "flushing outbound queue");
                let flushed = tokio::select! {
                    biased;
                    _ = stopping_now(&mut state) => Ok(()),
                    result = write_batch(&mut sink, &rest) => result,
                };
                if let Err(e) = flushed {
                    shared.fail(e);
                }
                break;
            }
        }

        let batch = shared.queue.drain_all();
        if batch.is_empty() {
            tokio::select! {
                _ = shared.queue.wait() => {}
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            continue;
        }

        let written = tokio::select! {
            biased;
            _ = stopping_now(&mut state) => continue,
            result = write_batch(&mut sink, &batch) => result,
        };
        if let Err(e) = written {
            shared.fail(e);
            break;
        }
        tracing::trace!(%link, items = batch.len(), "batch written");
    }

    if let Err(e) = sink.close().await {
        tracing::debug!(%link, error = %e, "sink close failed");
    }
    tracing::debug!(%link, "writer stopped");
}

// ---------------------------------------------------------------------------
// Announcer
// ---------------------------------------------------------------------------

/// Runs one announcement cycle per interval until stopped.
pub(crate) async fn announce_loop(shared: Arc<Shared>) {
    let mut state = shared.subscribe();
    let mut scheduler = CycleScheduler::new(shared.config.cycle_config());
    tracing::debug!(
        interval_ms = scheduler.interval().as_millis() as u64,
        "announcer started"
    );

    loop {
        tokio::select! {
            biased;
            _ = stopping(&mut state) => break,
            info = scheduler.wait_for_cycle() => {
                tracing::trace!(
                    cycle = info.cycle,
                    skipped = info.cycles_skipped,
                    "announce cycle"
                );
                shared.run_cycle();
            }
        }
    }

    tracing::debug!(cycles = scheduler.cycle_count(), "announcer stopped");
}
