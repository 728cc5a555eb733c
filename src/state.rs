// ABOUTME: Shared pipeline state: one mutex-guarded queue/demand struct plus independent slots
// ABOUTME: Subscriber, error, and upstream-subscription slots each get their own lock
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! The pipeline's shared state: one mutex-guarded queue/demand struct, plus
//! the subscriber, error, and upstream-subscription slots each under their
//! own lock (so callbacks can be invoked without holding the queue lock).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::byte_source::ByteSubscription;
use crate::error::TransformError;
use crate::executor::TransformExecutor;
use crate::handler::{EventStreamResponseHandler, EventSubscriber};
use crate::ledger::DemandLedger;

/// Lock a mutex, recovering the guard on poison instead of panicking.
///
/// A panic inside one subscriber callback (already caught separately via
/// `catch_unwind` at the call site) must not permanently wedge every other
/// holder of the same lock.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) enum Item<Ev> {
    Event(Ev),
    EndOfStream,
}

pub(crate) struct Inner<Ev> {
    pub(crate) queue: VecDeque<Item<Ev>>,
    pub(crate) ledger: DemandLedger,
    pub(crate) done: bool,
    /// Set by downstream `cancel()`. Distinct from `done`: cancellation
    /// silences further delivery and requesting exactly like the terminal
    /// state does, but — unlike `done` — never triggers `on_error`,
    /// `on_complete`, or completion-future resolution (§7: "cancellation is
    /// not an error").
    pub(crate) cancelled: bool,
}

impl<Ev> Default for Inner<Ev> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            ledger: DemandLedger::default(),
            done: false,
            cancelled: false,
        }
    }
}

pub(crate) struct Shared<I, Ev, Er>
where
    Er: std::error::Error + Send + Sync + 'static,
{
    pub(crate) inner: Mutex<Inner<Ev>>,
    pub(crate) subscriber: Mutex<Option<Box<dyn EventSubscriber<Ev, Er>>>>,
    pub(crate) error: Mutex<Option<Arc<TransformError<Er>>>>,
    pub(crate) upstream: Mutex<Option<Arc<dyn ByteSubscription>>>,
    pub(crate) handler: Mutex<Box<dyn EventStreamResponseHandler<I, Ev, Er>>>,
    pub(crate) executor: Arc<dyn TransformExecutor>,
    pub(crate) completion: Mutex<Option<oneshot::Sender<()>>>,
}

impl<I, Ev, Er> Shared<I, Ev, Er>
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    pub(crate) fn new(
        handler: Box<dyn EventStreamResponseHandler<I, Ev, Er>>,
        executor: Arc<dyn TransformExecutor>,
        completion: oneshot::Sender<()>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            subscriber: Mutex::new(None),
            error: Mutex::new(None),
            upstream: Mutex::new(None),
            handler: Mutex::new(handler),
            executor,
            completion: Mutex::new(Some(completion)),
        }
    }

    /// Reset per-attempt state when a new upstream byte stream is attached,
    /// so a retry of the enclosing request starts clean. Outstanding
    /// subscriber demand is deliberately preserved.
    pub(crate) fn reset(&self) {
        let mut inner = lock(&self.inner);
        inner.done = false;
        inner.queue.clear();
        inner.ledger.release_requesting_lease();
        inner.ledger.release_delivery_lease();
        drop(inner);
        *lock(&self.error) = None;
        *lock(&self.upstream) = None;
    }

    pub(crate) fn notify_error(&self, err: &Arc<TransformError<Er>>) {
        lock(&self.handler).exception_occurred(Arc::clone(err));
    }

    pub(crate) fn notify_complete(&self) {
        lock(&self.handler).complete();
        if let Some(sender) = lock(&self.completion).take() {
            let _ = sender.send(());
        }
    }
}
