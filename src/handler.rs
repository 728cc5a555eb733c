// ABOUTME: Caller-supplied collaborator traits for the downstream side of the pipeline
// ABOUTME: EventStreamResponseHandler and EventSubscriber are implemented by the embedding SDK
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Caller-supplied collaborator traits for the downstream side of the pipeline.

use std::sync::Arc;

use crate::error::TransformError;
use crate::publisher::{EventPublisher, EventSubscription};

/// Receives decoded events from an [`EventPublisher`].
///
/// Exactly one subscriber may ever attach to a given publisher (see
/// [`EventPublisher::subscribe`]); `on_error` and `on_complete` are delivered
/// at most once total, and never both.
pub trait EventSubscriber<Ev, Er>: Send
where
    Er: std::error::Error + Send + Sync + 'static,
{
    /// Called once, synchronously, from within `subscribe`.
    fn on_subscribe(&mut self, subscription: EventSubscription<Ev>);
    /// Called with the next event, once demand allows it.
    fn on_next(&mut self, event: Ev);
    /// Called at most once, if the pipeline enters the error terminal state.
    fn on_error(&mut self, error: Arc<TransformError<Er>>);
    /// Called at most once, if the pipeline drains to completion without error.
    fn on_complete(&mut self);
}

/// The caller-supplied hooks an [`crate::transformer::EventStreamResponseTransformer`]
/// drives over the life of one request attempt.
pub trait EventStreamResponseHandler<I, Ev, Er>: Send
where
    Er: std::error::Error + Send + Sync + 'static,
{
    /// Called once, as soon as the in-band initial-response frame decodes.
    fn response_received(&mut self, initial: I);
    /// Called once, at construction time, with the publisher events will flow through.
    fn on_event_stream(&mut self, publisher: EventPublisher<I, Ev, Er>);
    /// Called once, if the pipeline drains to completion without error.
    fn complete(&mut self);
    /// Called once, if the pipeline enters the error terminal state.
    fn exception_occurred(&mut self, error: Arc<TransformError<Er>>);
}
