//! The timeout envelope: a single deadline bounding the whole
//! connect-plus-handshake operation across every hop of a chain.

use crate::error::Error;
use std::future::Future;
use std::time::{Duration, Instant};

/// An absolute point in time by which the entire chained connect must
/// finish, derived once from the caller's `timeout` and re-expressed as a
/// remaining [`Duration`] before each hop.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline: hops block until the underlying I/O itself gives up or
    /// succeeds.
    pub fn none() -> Deadline {
        Deadline(None)
    }

    pub fn after(duration: Duration) -> Deadline {
        Deadline(Some(Instant::now() + duration))
    }

    pub fn from_option(duration: Option<Duration>) -> Deadline {
        match duration {
            Some(d) => Deadline::after(d),
            None => Deadline::none(),
        }
    }

    /// The duration remaining before this deadline, or `None` if there is
    /// no deadline. A deadline already in the past yields `Duration::ZERO`
    /// rather than underflowing, so the next `tokio::time::timeout` call
    /// fires (and fails) immediately instead of panicking.
    fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Runs `fut` to completion, racing it against whatever of this
    /// deadline remains. `hop` is attached to the resulting
    /// [`Error::Timeout`] if the deadline wins.
    pub async fn guard<F, T>(&self, hop: usize, fut: F) -> Result<T, Error>
    where
        F: Future<Output = T>,
    {
        match self.remaining() {
            None => Ok(fut.await),
            Some(remaining) => tokio::time::timeout(remaining, fut)
                .await
                .map_err(|_| Error::Timeout { hop }),
        }
    }
}
