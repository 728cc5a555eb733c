// ABOUTME: Error types for decoding and dispatch failures
// ABOUTME: Unifies decode errors and the caller's domain exception type for the error slot
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Error types for decoding and dispatch.

use std::fmt;

/// Which role a message was being decoded into when a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    /// The in-band initial-response frame.
    InitialResponse,
    /// A regular event frame.
    Event,
    /// An error/exception frame.
    Exception,
    /// The wire-level frame decoder itself, before any role could be determined.
    Frame,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InitialResponse => "initial-response",
            Self::Event => "event",
            Self::Exception => "exception",
            Self::Frame => "frame",
        };
        f.write_str(label)
    }
}

/// A failure decoding a single message, tagged with which role was being decoded.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode {role} message")]
pub struct DecodeError {
    role: MessageRole,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl DecodeError {
    /// Wrap an underlying error with the role that was being decoded.
    pub fn new(role: MessageRole, source: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self { role, source }
    }

    /// The role being decoded when this error occurred.
    #[must_use]
    pub const fn role(&self) -> MessageRole {
        self.role
    }
}

/// The terminal error surfaced to a downstream subscriber and to `complete_request`.
///
/// Generic over the domain error type produced by the caller's exception
/// unmarshaller (`Er`).
#[derive(Debug, thiserror::Error)]
pub enum TransformError<Er>
where
    Er: std::error::Error + Send + Sync + 'static,
{
    /// A message failed to decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// An in-band error frame decoded successfully into a domain error.
    #[error(transparent)]
    Protocol(Er),
}

/// A required collaborator was missing when `TransformerBuilder::build` was called.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Named collaborator was never supplied to the builder.
    #[error("missing required collaborator: {0}")]
    MissingCollaborator(&'static str),
}
