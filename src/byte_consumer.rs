// ABOUTME: Upstream ByteSubscriber implementation feeding the frame decoder and dispatcher
// ABOUTME: Manages the single outstanding byte-chunk request to the upstream publisher
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Upstream [`ByteSubscriber`] implementation: decode, dispatch, and manage
//! the single outstanding byte-chunk request.

use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::byte_source::{ByteSubscriber, ByteSubscription};
use crate::decoder::FrameDecoder;
use crate::dispatcher::Dispatcher;
use crate::drain::kick_drain;
use crate::error::TransformError;
use crate::state::{lock, Shared};

pub(crate) struct ByteConsumer<I, Ev, Er>
where
    Er: std::error::Error + Send + Sync + 'static,
{
    shared: Arc<Shared<I, Ev, Er>>,
    decoder: Mutex<Box<dyn FrameDecoder>>,
    dispatcher: Arc<Dispatcher<I, Ev, Er>>,
}

impl<I, Ev, Er> ByteConsumer<I, Ev, Er>
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    pub(crate) fn new(
        shared: Arc<Shared<I, Ev, Er>>,
        dispatcher: Arc<Dispatcher<I, Ev, Er>>,
        decoder: Box<dyn FrameDecoder>,
    ) -> Self {
        Self {
            shared,
            decoder: Mutex::new(decoder),
            dispatcher,
        }
    }
}

impl<I, Ev, Er> ByteSubscriber for ByteConsumer<I, Ev, Er>
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    fn on_subscribe(&mut self, subscription: Arc<dyn ByteSubscription>) {
        *lock(&self.shared.upstream) = Some(subscription);
        maybe_request_chunk(&self.shared);
    }

    fn on_next(&mut self, bytes: Bytes) {
        let inner = lock(&self.shared.inner);
        if inner.done || inner.cancelled {
            tracing::trace!("discarding bytes received after terminal state or cancellation");
            return;
        }
        drop(inner);

        let decoded = { lock(&self.decoder).decode(bytes) };
        let messages = match decoded {
            Ok(messages) => messages,
            Err(err) => {
                crate::terminal::error(&self.shared, TransformError::Decode(err));
                return;
            }
        };

        for message in messages {
            self.dispatcher.dispatch(&self.shared, message);
        }

        let should_kick = {
            let mut inner = lock(&self.shared.inner);
            inner.ledger.release_requesting_lease();
            !inner.queue.is_empty()
        };
        if should_kick {
            kick_drain(&self.shared);
        } else {
            maybe_request_chunk(&self.shared);
        }
    }

    fn on_error(&mut self, error: Box<dyn std::error::Error + Send + Sync>) {
        tracing::debug!(
            error = %error,
            "upstream byte publisher reported an error; ignored, the enclosing request layer drives completion"
        );
    }

    fn on_complete(&mut self) {
        tracing::trace!(
            "upstream byte publisher completed; ignored, the enclosing request layer drives completion"
        );
    }
}

/// Request one more byte chunk upstream, if demand allows it and no request
/// is already outstanding.
///
/// Checks that an upstream subscription actually exists *before* taking the
/// requesting lease: a downstream `request(n)` can race ahead of `on_stream`
/// (e.g. called synchronously from within `on_event_stream`, before the byte
/// publisher has attached), and taking the lease without ever sending a
/// request would leave it stuck forever — `on_subscribe` only re-derives
/// demand by calling this function again, it does not unconditionally clear
/// the lease itself.
pub(crate) fn maybe_request_chunk<I, Ev, Er>(shared: &Arc<Shared<I, Ev, Er>>)
where
    Er: std::error::Error + Send + Sync + 'static,
{
    let Some(upstream) = lock(&shared.upstream).clone() else {
        return;
    };
    let should_request = {
        let mut inner = lock(&shared.inner);
        !inner.done
            && !inner.cancelled
            && inner.ledger.demand() > 0
            && inner.ledger.try_take_requesting_lease()
    };
    if should_request {
        upstream.request(1);
    }
}
