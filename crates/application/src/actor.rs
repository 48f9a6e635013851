//! Single-worker actor loop.
//!
//! Every stateful service (the DNS cache, the route reference counter, the
//! kernel reconciler) owns its state exclusively and is driven through a
//! [`Mailbox`]. Messages run strictly one at a time in submission order, so
//! handlers never need locks around their own state.
//!
//! A handler may also expose a deadline; the worker waits on the mailbox and
//! the deadline at the same point and calls [`Handler::on_deadline`] when the
//! deadline passes first.

use async_trait::async_trait;
use bgp_dns_domain::DomainError;
use std::future;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[async_trait]
pub trait Handler: Send + 'static {
    type Message: Send + 'static;

    async fn handle(&mut self, message: Self::Message) -> Result<(), DomainError>;

    /// Next instant the worker should wake up without a message.
    fn next_deadline(&self) -> Option<Instant> {
        None
    }

    async fn on_deadline(&mut self) {}

    /// Runs once on the worker after the loop exits.
    async fn on_stop(&mut self) {}
}

struct Envelope<M> {
    message: M,
    reply: Option<oneshot::Sender<Result<(), DomainError>>>,
}

/// Submission side of an actor. Cheap to clone.
pub struct Mailbox<M> {
    name: &'static str,
    tx: mpsc::Sender<Envelope<M>>,
}

impl<M> Clone for Mailbox<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

impl<M: Send + 'static> Mailbox<M> {
    /// Enqueues `message`. With `want_result` the call waits until the worker
    /// has run it and returns the handler's result; otherwise it returns as
    /// soon as the message is queued.
    pub async fn submit(&self, message: M, want_result: bool) -> Result<(), DomainError> {
        if want_result {
            self.ask(message).await
        } else {
            self.tell(message).await
        }
    }

    /// Fire and forget.
    pub async fn tell(&self, message: M) -> Result<(), DomainError> {
        self.tx
            .send(Envelope {
                message,
                reply: None,
            })
            .await
            .map_err(|_| self.stopped())
    }

    /// Request and wait for the handler's result.
    pub async fn ask(&self, message: M) -> Result<(), DomainError> {
        let (reply, result) = oneshot::channel();
        self.tx
            .send(Envelope {
                message,
                reply: Some(reply),
            })
            .await
            .map_err(|_| self.stopped())?;

        // A dropped reply means the worker stopped before reaching the message.
        result.await.map_err(|_| self.stopped())?
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub(crate) fn stopped(&self) -> DomainError {
        error!(actor = self.name, "Message submitted to a stopped actor");
        DomainError::ActorStopped(self.name)
    }
}

/// Owner side of a running actor.
pub struct ActorHandle {
    name: &'static str,
    join: JoinHandle<()>,
}

impl ActorHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Waits for the worker to exit. Cancel the actor's token first.
    pub async fn join(self) {
        if let Err(e) = self.join.await {
            error!(actor = self.name, error = %e, "Actor worker panicked");
        }
    }
}

/// Starts `handler` on its own task.
///
/// The worker exits when `shutdown` is cancelled or every mailbox is dropped.
/// Messages still queued at that point are abandoned; their waiters receive
/// [`DomainError::ActorStopped`].
pub fn spawn<H: Handler>(
    name: &'static str,
    handler: H,
    capacity: usize,
    shutdown: CancellationToken,
) -> (Mailbox<H::Message>, ActorHandle) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let join = tokio::spawn(run(name, handler, rx, shutdown));

    (Mailbox { name, tx }, ActorHandle { name, join })
}

async fn run<H: Handler>(
    name: &'static str,
    mut handler: H,
    mut rx: mpsc::Receiver<Envelope<H::Message>>,
    shutdown: CancellationToken,
) {
    debug!(actor = name, "Actor started");

    loop {
        let deadline = handler.next_deadline();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                debug!(actor = name, "Actor cancelled");
                break;
            }

            envelope = rx.recv() => {
                let Some(Envelope { message, reply }) = envelope else {
                    debug!(actor = name, "All mailboxes dropped");
                    break;
                };

                let result = handler.handle(message).await;
                match reply {
                    Some(reply) => {
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            warn!(actor = name, error = %e, "Message failed");
                        }
                    }
                }
            }

            _ = sleep_until(deadline) => {
                handler.on_deadline().await;
            }
        }
    }

    rx.close();
    let abandoned = std::iter::from_fn(|| rx.try_recv().ok()).count();
    if abandoned > 0 {
        warn!(actor = name, abandoned, "Pending messages dropped on shutdown");
    }

    handler.on_stop().await;
    info!(actor = name, "Actor stopped");
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}
