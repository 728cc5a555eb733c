// ABOUTME: Downstream contract: the event publisher and the subscription handed to its subscriber
// ABOUTME: Enforces the single-subscriber invariant and routes request/cancel into shared state
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Downstream contract: the event publisher and the subscription handed back
//! to whoever attaches to it.

use std::sync::Arc;

use crate::drain::kick_drain;
use crate::byte_consumer::maybe_request_chunk;
use crate::handler::EventSubscriber;
use crate::state::{lock, Shared};

/// Controls flow from an [`EventPublisher`] without exposing the full pipeline type.
trait PipelineControl<Ev>: Send + Sync {
    fn request(&self, n: u64);
    fn cancel(&self);
}

struct ControlHandle<I, Ev, Er>
where
    Er: std::error::Error + Send + Sync + 'static,
{
    shared: Arc<Shared<I, Ev, Er>>,
}

impl<I, Ev, Er> PipelineControl<Ev> for ControlHandle<I, Ev, Er>
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        request(&self.shared, n);
    }

    fn cancel(&self) {
        cancel(&self.shared);
    }
}

/// Signals downstream demand for, or cancellation of, the event stream.
pub struct EventSubscription<Ev> {
    control: Arc<dyn PipelineControl<Ev>>,
}

impl<Ev> EventSubscription<Ev> {
    /// Request up to `n` more events be delivered to `on_next`. A call with
    /// `n == 0` is a no-op. Ignored once the pipeline has reached a terminal
    /// state.
    pub fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.control.request(n);
    }

    /// Cancel the upstream byte subscription. Idempotent.
    pub fn cancel(&self) {
        self.control.cancel();
    }
}

/// Why [`EventPublisher::subscribe`] was rejected.
#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    /// A subscriber is already, or was already, attached.
    #[error("an event subscriber is already attached")]
    AlreadySubscribed,
}

/// The single-subscriber publisher exposed to the caller's response handler.
pub struct EventPublisher<I, Ev, Er>
where
    Er: std::error::Error + Send + Sync + 'static,
{
    shared: Arc<Shared<I, Ev, Er>>,
}

impl<I, Ev, Er> EventPublisher<I, Ev, Er>
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    pub(crate) fn new(shared: Arc<Shared<I, Ev, Er>>) -> Self {
        Self { shared }
    }

    /// Attach the single subscriber for this stream.
    ///
    /// # Errors
    /// Returns [`SubscribeError::AlreadySubscribed`] if a subscriber has
    /// already attached.
    pub fn subscribe(
        &self,
        mut subscriber: Box<dyn EventSubscriber<Ev, Er>>,
    ) -> Result<(), SubscribeError> {
        let mut slot = lock(&self.shared.subscriber);
        if slot.is_some() {
            return Err(SubscribeError::AlreadySubscribed);
        }
        let control = Arc::new(ControlHandle {
            shared: Arc::clone(&self.shared),
        });
        subscriber.on_subscribe(EventSubscription { control });
        *slot = Some(subscriber);
        Ok(())
    }
}

fn request<I, Ev, Er>(shared: &Arc<Shared<I, Ev, Er>>, n: u64)
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    let (non_empty, done) = {
        let mut inner = lock(&shared.inner);
        if inner.done || inner.cancelled {
            (false, true)
        } else {
            inner.ledger.add_demand(n);
            (!inner.queue.is_empty(), false)
        }
    };
    if done {
        return;
    }
    if non_empty {
        kick_drain(shared);
    } else {
        maybe_request_chunk(shared);
    }
}

fn cancel<I, Ev, Er>(shared: &Arc<Shared<I, Ev, Er>>)
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    lock(&shared.inner).cancelled = true;
    if let Some(upstream) = lock(&shared.upstream).clone() {
        upstream.cancel();
    }
}
