// ABOUTME: Builder validating an EventStreamResponseTransformer's required collaborators
// ABOUTME: Fails fast with a named-collaborator error instead of building a half-wired transformer
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Validates and assembles an [`EventStreamResponseTransformer`]'s collaborators.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::decoder::FrameDecoder;
use crate::error::BuildError;
use crate::executor::TransformExecutor;
use crate::handler::EventStreamResponseHandler;
use crate::transformer::EventStreamResponseTransformer;
use crate::unmarshall::Unmarshall;

/// Builds an [`EventStreamResponseTransformer`] from its required collaborators.
pub struct TransformerBuilder<I, Ev, Er>
where
    Er: std::error::Error + Send + Sync + 'static,
{
    handler: Option<Box<dyn EventStreamResponseHandler<I, Ev, Er>>>,
    initial_unmarshaller: Option<Box<dyn Unmarshall<I>>>,
    event_unmarshaller: Option<Box<dyn Unmarshall<Ev>>>,
    exception_unmarshaller: Option<Box<dyn Unmarshall<Er>>>,
    executor: Option<Arc<dyn TransformExecutor>>,
    completion: Option<oneshot::Sender<()>>,
    decoder_factory: Option<Arc<dyn Fn() -> Box<dyn FrameDecoder> + Send + Sync>>,
}

impl<I, Ev, Er> Default for TransformerBuilder<I, Ev, Er>
where
    Er: std::error::Error + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            handler: None,
            initial_unmarshaller: None,
            event_unmarshaller: None,
            exception_unmarshaller: None,
            executor: None,
            completion: None,
            decoder_factory: None,
        }
    }
}

impl<I, Ev, Er> TransformerBuilder<I, Ev, Er>
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    /// Start a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response handler driven over the life of the request.
    #[must_use]
    pub fn response_handler(
        mut self,
        handler: impl EventStreamResponseHandler<I, Ev, Er> + 'static,
    ) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Set the unmarshaller used for the in-band initial-response frame.
    #[must_use]
    pub fn initial_response_unmarshaller(mut self, unmarshaller: impl Unmarshall<I> + 'static) -> Self {
        self.initial_unmarshaller = Some(Box::new(unmarshaller));
        self
    }

    /// Set the unmarshaller used for regular event frames.
    #[must_use]
    pub fn event_unmarshaller(mut self, unmarshaller: impl Unmarshall<Ev> + 'static) -> Self {
        self.event_unmarshaller = Some(Box::new(unmarshaller));
        self
    }

    /// Set the unmarshaller used for in-band error/exception frames.
    #[must_use]
    pub fn exception_unmarshaller(mut self, unmarshaller: impl Unmarshall<Er> + 'static) -> Self {
        self.exception_unmarshaller = Some(Box::new(unmarshaller));
        self
    }

    /// Set the executor used to run drain-engine continuations.
    #[must_use]
    pub fn executor(mut self, executor: impl TransformExecutor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Set the sender resolved once the pipeline reaches completion without error.
    #[must_use]
    pub fn completion(mut self, completion: oneshot::Sender<()>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Set the factory used to build a fresh [`FrameDecoder`] for each
    /// upstream attach (including retries).
    #[must_use]
    pub fn frame_decoder_factory(
        mut self,
        factory: impl Fn() -> Box<dyn FrameDecoder> + Send + Sync + 'static,
    ) -> Self {
        self.decoder_factory = Some(Arc::new(factory));
        self
    }

    /// Validate that every required collaborator was supplied and construct
    /// the transformer.
    ///
    /// # Errors
    /// Returns [`BuildError::MissingCollaborator`] naming the first missing
    /// collaborator found.
    pub fn build(self) -> Result<EventStreamResponseTransformer<I, Ev, Er>, BuildError> {
        let handler = self
            .handler
            .ok_or(BuildError::MissingCollaborator("response_handler"))?;
        let initial_unmarshaller = self
            .initial_unmarshaller
            .ok_or(BuildError::MissingCollaborator("initial_response_unmarshaller"))?;
        let event_unmarshaller = self
            .event_unmarshaller
            .ok_or(BuildError::MissingCollaborator("event_unmarshaller"))?;
        let exception_unmarshaller = self
            .exception_unmarshaller
            .ok_or(BuildError::MissingCollaborator("exception_unmarshaller"))?;
        let executor = self
            .executor
            .ok_or(BuildError::MissingCollaborator("executor"))?;
        let completion = self
            .completion
            .ok_or(BuildError::MissingCollaborator("completion"))?;
        let decoder_factory = self
            .decoder_factory
            .ok_or(BuildError::MissingCollaborator("frame_decoder_factory"))?;

        Ok(EventStreamResponseTransformer::new(
            handler,
            initial_unmarshaller,
            event_unmarshaller,
            exception_unmarshaller,
            executor,
            completion,
            decoder_factory,
        ))
    }
}
