// ABOUTME: Upstream contract traits: a byte publisher feeding the decoder
// ABOUTME: Defines the subscription handle used to request or cancel chunk delivery
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Upstream contract: a byte publisher feeding the decoder.

use std::sync::Arc;

use bytes::Bytes;

/// Controls the flow of bytes from a [`BytePublisher`].
pub trait ByteSubscription: Send + Sync {
    /// Request up to `n` more chunks be delivered to `on_next`.
    fn request(&self, n: u64);
    /// Stop delivery; no further callbacks are expected after this returns.
    fn cancel(&self);
}

/// Receives byte chunks from a [`BytePublisher`].
///
/// `on_complete` is intentionally not load-bearing for this crate: frame
/// completeness is inferred from the enclosing request layer explicitly
/// calling [`crate::EventStreamResponseTransformer::complete`], not from the
/// upstream byte publisher's own completion signal.
pub trait ByteSubscriber: Send {
    /// Called once, synchronously, by `BytePublisher::subscribe`.
    fn on_subscribe(&mut self, subscription: Arc<dyn ByteSubscription>);
    /// Called with the next chunk of bytes.
    fn on_next(&mut self, bytes: Bytes);
    /// Called if the upstream publisher fails.
    fn on_error(&mut self, error: Box<dyn std::error::Error + Send + Sync>);
    /// Called when the upstream publisher has no more bytes.
    fn on_complete(&mut self);
}

/// Supplies the raw bytes of an event-stream response.
pub trait BytePublisher: Send {
    /// Attach `subscriber`. Implementations must call
    /// `subscriber.on_subscribe` synchronously before returning.
    fn subscribe(&mut self, subscriber: Box<dyn ByteSubscriber>);
}
