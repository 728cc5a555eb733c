// ABOUTME: Top-level object wiring the decoder, dispatcher, drain engine, and terminal coordinator
// ABOUTME: One instance per request attempt; on_stream may be re-attached to support retries
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! The top-level object wiring the decoder, dispatcher, drain engine, and
//! terminal coordinator together for one request attempt.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::byte_consumer::ByteConsumer;
use crate::byte_source::BytePublisher;
use crate::decoder::FrameDecoder;
use crate::dispatcher::Dispatcher;
use crate::error::TransformError;
use crate::executor::TransformExecutor;
use crate::handler::EventStreamResponseHandler;
use crate::publisher::EventPublisher;
use crate::state::Shared;
use crate::unmarshall::Unmarshall;

/// Decodes a binary event-stream response, dispatches messages to the
/// caller's response handler and event subscriber, and coordinates
/// backpressure between the upstream byte publisher and the downstream
/// event subscriber.
///
/// Built via [`crate::builder::TransformerBuilder`]. One instance is
/// constructed per logical request; [`Self::on_stream`] may be called more
/// than once over the instance's life to support retries of the enclosing
/// request.
pub struct EventStreamResponseTransformer<I, Ev, Er>
where
    Er: std::error::Error + Send + Sync + 'static,
{
    shared: Arc<Shared<I, Ev, Er>>,
    dispatcher: Arc<Dispatcher<I, Ev, Er>>,
    decoder_factory: Arc<dyn Fn() -> Box<dyn FrameDecoder> + Send + Sync>,
}

impl<I, Ev, Er> EventStreamResponseTransformer<I, Ev, Er>
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        handler: Box<dyn EventStreamResponseHandler<I, Ev, Er>>,
        initial_unmarshaller: Box<dyn Unmarshall<I>>,
        event_unmarshaller: Box<dyn Unmarshall<Ev>>,
        exception_unmarshaller: Box<dyn Unmarshall<Er>>,
        executor: Arc<dyn TransformExecutor>,
        completion: oneshot::Sender<()>,
        decoder_factory: Arc<dyn Fn() -> Box<dyn FrameDecoder> + Send + Sync>,
    ) -> Self {
        let shared = Arc::new(Shared::new(handler, executor, completion));
        let dispatcher = Arc::new(Dispatcher {
            initial: initial_unmarshaller,
            event: event_unmarshaller,
            exception: exception_unmarshaller,
        });

        let publisher = EventPublisher::new(Arc::clone(&shared));
        crate::state::lock(&shared.handler).on_event_stream(publisher);

        Self {
            shared,
            dispatcher,
            decoder_factory,
        }
    }

    /// No-op entry point of the request layer's async-response-transformer
    /// contract. The real initial response arrives in-band as the first
    /// decoded frame (see [`Self::on_stream`]), not through this callback.
    pub fn response_received<W>(&self, _wire_response: W) {}

    /// Attach a freshly-available upstream byte publisher, resetting any
    /// per-attempt state left over from a prior attempt.
    pub fn on_stream(&self, mut byte_publisher: Box<dyn BytePublisher>) {
        self.shared.reset();
        let consumer = ByteConsumer::new(
            Arc::clone(&self.shared),
            Arc::clone(&self.dispatcher),
            (self.decoder_factory)(),
        );
        byte_publisher.subscribe(Box::new(consumer));
    }

    /// Report a transport-level failure that occurred before, or independent
    /// of, any in-band error frame (e.g. the enclosing HTTP request itself
    /// failed).
    pub fn exception_occurred(&self, error: Er) {
        crate::terminal::error(&self.shared, TransformError::Protocol(error));
    }

    /// Signal that the enclosing request layer considers the exchange
    /// finished, so any remaining buffered events can drain and the
    /// completion hooks can fire.
    ///
    /// # Errors
    /// Returns the terminal error, if the pipeline already failed.
    pub fn complete(&self) -> Result<(), Arc<TransformError<Er>>> {
        crate::terminal::complete_request(&self.shared)
    }
}
