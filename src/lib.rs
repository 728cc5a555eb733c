// ABOUTME: Incremental decoder/dispatcher for a binary event-stream wire format
// ABOUTME: Coordinates demand between an upstream byte publisher and a downstream event subscriber
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Incremental decoding and backpressure-aware dispatch of binary event-stream
//! responses.
//!
//! This crate decodes a framed binary wire format (headers + payload per
//! message) into typed values via caller-supplied [`unmarshall::Unmarshall`]
//! implementations, dispatching each message to an initial-response, event,
//! or error role, while coordinating independent demand signals between an
//! upstream byte publisher and a downstream event subscriber.
//!
//! Construct a pipeline with [`builder::TransformerBuilder`]:
//!
//! ```ignore
//! let transformer = TransformerBuilder::new()
//!     .response_handler(my_handler)
//!     .initial_response_unmarshaller(my_initial_unmarshaller)
//!     .event_unmarshaller(my_event_unmarshaller)
//!     .exception_unmarshaller(my_exception_unmarshaller)
//!     .executor(TokioExecutor::current())
//!     .completion(completion_tx)
//!     .frame_decoder_factory(|| Box::new(MyFrameDecoder::new()))
//!     .build()?;
//! ```

mod builder;
mod byte_consumer;
mod byte_source;
mod decoder;
mod dispatcher;
mod drain;
mod error;
mod executor;
mod handler;
mod ledger;
mod message;
mod publisher;
mod state;
mod terminal;
mod transformer;
mod unmarshall;

pub use builder::TransformerBuilder;
pub use byte_source::{BytePublisher, ByteSubscriber, ByteSubscription};
pub use decoder::FrameDecoder;
pub use error::{BuildError, DecodeError, MessageRole, TransformError};
pub use executor::{TokioExecutor, TransformExecutor};
pub use handler::{EventStreamResponseHandler, EventSubscriber};
pub use message::{HeaderValue, SyntheticResponse, WireMessage};
pub use publisher::{EventPublisher, EventSubscription, SubscribeError};
pub use transformer::EventStreamResponseTransformer;
pub use unmarshall::Unmarshall;
