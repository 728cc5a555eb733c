// ABOUTME: Routes one decoded message to the initial-response, event, or error path
// ABOUTME: Unmarshalls message payload+headers through the caller-supplied decoders
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Routes one decoded message to the initial-response, event, or error path.

use std::sync::Arc;

use crate::error::{DecodeError, MessageRole, TransformError};
use crate::message::{MessageKind, SyntheticResponse, WireMessage};
use crate::state::{lock, Item, Shared};
use crate::unmarshall::Unmarshall;

pub(crate) struct Dispatcher<I, Ev, Er> {
    pub(crate) initial: Box<dyn Unmarshall<I>>,
    pub(crate) event: Box<dyn Unmarshall<Ev>>,
    pub(crate) exception: Box<dyn Unmarshall<Er>>,
}

impl<I, Ev, Er> Dispatcher<I, Ev, Er>
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    pub(crate) fn dispatch(&self, shared: &Arc<Shared<I, Ev, Er>>, message: WireMessage) {
        match message.classify() {
            MessageKind::InitialResponse => self.dispatch_initial(shared, &message),
            MessageKind::Event => self.dispatch_event(shared, &message),
            MessageKind::Error => self.dispatch_error(shared, &message),
            MessageKind::Ignored => {
                tracing::trace!(
                    message_type = message.message_type(),
                    "ignoring message with unrecognised :message-type"
                );
            }
        }
    }

    fn dispatch_initial(&self, shared: &Arc<Shared<I, Ev, Er>>, message: &WireMessage) {
        let response = SyntheticResponse::from(message);
        match self.initial.unmarshall(&response) {
            Ok(initial) => {
                tracing::debug!("initial response decoded");
                lock(&shared.handler).response_received(initial);
            }
            Err(source) => {
                crate::terminal::error(
                    shared,
                    TransformError::Decode(DecodeError::new(MessageRole::InitialResponse, source)),
                );
            }
        }
    }

    fn dispatch_event(&self, shared: &Arc<Shared<I, Ev, Er>>, message: &WireMessage) {
        let response = SyntheticResponse::from(message);
        match self.event.unmarshall(&response) {
            Ok(event) => {
                lock(&shared.inner).queue.push_back(Item::Event(event));
            }
            Err(source) => {
                crate::terminal::error(
                    shared,
                    TransformError::Decode(DecodeError::new(MessageRole::Event, source)),
                );
            }
        }
    }

    fn dispatch_error(&self, shared: &Arc<Shared<I, Ev, Er>>, message: &WireMessage) {
        let response = SyntheticResponse::from(message);
        match self.exception.unmarshall(&response) {
            Ok(domain_error) => {
                crate::terminal::error(shared, TransformError::Protocol(domain_error));
            }
            Err(source) => {
                crate::terminal::error(
                    shared,
                    TransformError::Decode(DecodeError::new(MessageRole::Exception, source)),
                );
            }
        }
    }
}
