//! Polling state machine
//!
//! A caller's budget is sliced into quanta. Every iteration checks for
//! cancellation, asks the resource manager for the reader's state bounded
//! by one quantum, and either acts on what it saw or sleeps one quantum.

use std::any::type_name;
use std::sync::Arc;
use std::time::Duration;

use pcsckit_core::{Code, ScardError};
use pcsckit_types::{ReaderState, ReaderStateFlags};
use tracing::{debug, error, trace};

use crate::cancel::CancelToken;
use crate::error::{ReaderError, Result};
use crate::picc::Picc;
use crate::reader::CardReader;
use crate::unit::{Connection, Unit};

/// Number of quanta that fit in `timeout`
pub(crate) fn iterations(timeout: Duration, quantum: Duration) -> u128 {
    timeout.as_nanos() / quantum.as_nanos().max(1)
}

/// What one bounded wait saw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observed {
    /// The wait timed out without a change
    Nothing,
    State(ReaderStateFlags),
    /// The wait was aborted through [`crate::Session::cancel`]
    Cancelled,
}

impl Observed {
    fn has(self, flags: ReaderStateFlags) -> bool {
        matches!(self, Self::State(state) if state.contains(flags))
    }
}

async fn observe(reader: &CardReader, quantum: Duration) -> Result<Observed> {
    let context = reader.session().context();
    let name = reader.name().clone();

    let observed = reader
        .session()
        .executor()
        .run(move |t| {
            let mut states = [ReaderState::new(name)];
            match t.get_status_change(context, Some(quantum), &mut states) {
                Ok(()) => Ok(Observed::State(states[0].event_state)),
                Err(e) if e.code() == Code::Timeout => Ok(Observed::Nothing),
                Err(e) if e.code() == Code::Cancelled => Ok(Observed::Cancelled),
                Err(e) => Err(e),
            }
        })
        .await?;

    if observed.has(ReaderStateFlags::UNKNOWN) {
        return Err(ScardError::new(Code::UnknownReader).into());
    }
    Ok(observed)
}

fn fatal(reader: &CardReader, error: ReaderError) -> ReaderError {
    error!("Polling {} failed: {}", reader.name(), error);
    error
}

pub(crate) async fn poll_card<P: Picc>(
    reader: &CardReader,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<Option<P>> {
    let config = reader.session().config();
    let quantum = config.poll_quantum();
    let mut remaining = iterations(timeout, quantum);

    debug!("Polling {} for {} (timeout {:?})", reader.name(), type_name::<P>(), timeout);

    while remaining > 0 {
        if cancel.is_cancelled() {
            debug!("Polling {} cancelled", reader.name());
            return Ok(None);
        }
        remaining -= 1;

        let observed = observe(reader, quantum).await.map_err(|e| fatal(reader, e))?;
        if observed == Observed::Cancelled {
            debug!("Status wait on {} cancelled", reader.name());
            return Ok(None);
        }
        if !observed.has(ReaderStateFlags::PRESENT) {
            trace!("No card on {}, waiting", reader.name());
            tokio::time::sleep(quantum).await;
            continue;
        }

        let unit = match connect(reader).await {
            Ok(unit) => unit,
            Err(ReaderError::Hardware(e)) if e.code() == Code::ProtoMismatch => {
                debug!("Card on {} speaks no usable protocol, waiting", reader.name());
                tokio::time::sleep(quantum).await;
                continue;
            }
            Err(e) => return Err(fatal(reader, e)),
        };

        match P::adopt(unit).await {
            Ok(picc) => {
                let unit = picc.unit();
                unit.announce();
                debug!("Card found on {}; ATR: [{}]", reader.name(), hex::encode_upper(unit.atr()));
                return Ok(Some(picc));
            }
            Err(unit) => {
                debug!("Card on {} declined by {}", reader.name(), type_name::<P>());
                unit.close().await;
                tokio::time::sleep(quantum).await;
            }
        }
    }

    debug!("No card found on {}", reader.name());
    Ok(None)
}

async fn connect(reader: &CardReader) -> Result<Unit> {
    let session = reader.session();
    let config = session.config();

    Unit::connect(
        Arc::clone(session.executor()),
        reader.name().clone(),
        Connection {
            context: session.context(),
            share_mode: config.share_mode(),
            preferred_protocols: config.preferred_protocols(),
        },
        reader.driver().instantiate(),
    )
    .await
}

pub(crate) async fn wait_for_removal(
    reader: &CardReader,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<bool> {
    let quantum = reader.session().config().poll_quantum();
    let mut remaining = iterations(timeout, quantum);

    debug!("Waiting for card removal from {} (timeout {:?})", reader.name(), timeout);

    while remaining > 0 {
        if cancel.is_cancelled() {
            debug!("Waiting on {} cancelled", reader.name());
            return Ok(false);
        }
        remaining -= 1;

        let observed = observe(reader, quantum).await.map_err(|e| fatal(reader, e))?;
        if observed == Observed::Cancelled {
            debug!("Status wait on {} cancelled", reader.name());
            return Ok(false);
        }
        if observed.has(ReaderStateFlags::EMPTY) {
            debug!("Card removed from {}", reader.name());
            return Ok(true);
        }

        trace!("Card still on {}, waiting", reader.name());
        tokio::time::sleep(quantum).await;
    }

    debug!("Card still on {} after {:?}", reader.name(), timeout);
    Ok(false)
}
