//! Synchronous hand-off from the listener thread to the simulation thread.
//!
//! The listener calls [`RendezvousExecutor::execute`], which parks the command
//! in a single-slot channel and blocks on a one-shot reply channel. The
//! simulation thread owns the matching [`RendezvousInbox`] and drains it once
//! per tick, never blocking.
//!
//! Every job carries a claim word. The drainer claims a job before applying
//! it and a waiter that times out marks it abandoned; whichever side gets
//! there first wins. An abandoned job is discarded unapplied, so a command
//! that reported a timeout never reaches the simulation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use bevy::log::debug;
use bevy::prelude::Resource;
use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, bounded};
use thiserror::Error;

/// Rendezvous failures. Both end the current connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RendezvousError {
    #[error("simulation thread did not answer within {0:?}")]
    Timeout(Duration),
    #[error("simulation thread is gone")]
    Disconnected,
}

const PENDING: u8 = 0;
const CLAIMED: u8 = 1;
const ABANDONED: u8 = 2;

struct Job<C, R> {
    command: C,
    reply: Sender<R>,
    claim: Arc<AtomicU8>,
}

impl<C, R> Job<C, R> {
    fn try_claim(&self) -> bool {
        self.claim
            .compare_exchange(PENDING, CLAIMED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Create a connected executor/inbox pair.
#[must_use]
pub fn channel<C, R>(timeout: Duration) -> (RendezvousExecutor<C, R>, RendezvousInbox<C, R>) {
    let (jobs_tx, jobs_rx) = bounded(1);
    (
        RendezvousExecutor {
            jobs: jobs_tx,
            timeout,
        },
        RendezvousInbox { jobs: jobs_rx },
    )
}

// ---------------------------------------------------------------------------
// RendezvousExecutor
// ---------------------------------------------------------------------------

/// Listener-side handle.
pub struct RendezvousExecutor<C, R> {
    jobs: Sender<Job<C, R>>,
    timeout: Duration,
}

impl<C, R> RendezvousExecutor<C, R> {
    /// Run `command` on the simulation thread and wait for its result.
    ///
    /// The deadline covers both queueing and execution. On
    /// [`RendezvousError::Timeout`] the command is guaranteed never to be
    /// applied. If the simulation thread claimed the command just before the
    /// deadline, this waits for that in-flight result instead.
    pub fn execute(&self, command: C) -> Result<R, RendezvousError> {
        let deadline = Instant::now() + self.timeout;
        let (reply_tx, reply_rx) = bounded(1);
        let claim = Arc::new(AtomicU8::new(PENDING));
        let job = Job {
            command,
            reply: reply_tx,
            claim: Arc::clone(&claim),
        };

        self.jobs.send_deadline(job, deadline).map_err(|e| match e {
            SendTimeoutError::Timeout(_) => RendezvousError::Timeout(self.timeout),
            SendTimeoutError::Disconnected(_) => RendezvousError::Disconnected,
        })?;

        match reply_rx.recv_deadline(deadline) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Disconnected) => Err(RendezvousError::Disconnected),
            Err(RecvTimeoutError::Timeout) => {
                let abandoned = claim
                    .compare_exchange(PENDING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();
                if abandoned {
                    Err(RendezvousError::Timeout(self.timeout))
                } else {
                    // Already being applied; the reply follows within one drain.
                    reply_rx.recv().map_err(|_| RendezvousError::Disconnected)
                }
            }
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<C, R> Clone for RendezvousExecutor<C, R> {
    fn clone(&self) -> Self {
        Self {
            jobs: self.jobs.clone(),
            timeout: self.timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// RendezvousInbox
// ---------------------------------------------------------------------------

/// Simulation-side handle.
pub struct RendezvousInbox<C, R> {
    jobs: Receiver<Job<C, R>>,
}

impl<C: Send + 'static, R: Send + 'static> Resource for RendezvousInbox<C, R> {}

impl<C, R> RendezvousInbox<C, R> {
    /// Apply up to `max` queued commands with `apply`, replying to each.
    /// Returns the number of commands applied.
    ///
    /// Jobs whose waiter already timed out are discarded without calling
    /// `apply` and do not count toward `max`.
    pub fn drain(&self, max: usize, mut apply: impl FnMut(C) -> R) -> usize {
        let mut applied = 0;
        while applied < max {
            let Ok(job) = self.jobs.try_recv() else {
                break;
            };
            if !job.try_claim() {
                debug!("rendezvous job discarded: waiter timed out");
                continue;
            }
            let result = apply(job.command);
            if job.reply.send(result).is_err() {
                debug!("rendezvous reply dropped: waiter is gone");
            }
            applied += 1;
        }
        applied
    }

    /// Number of commands waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.jobs.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
