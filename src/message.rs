// ABOUTME: Decoded wire messages and the synthetic response built from them
// ABOUTME: Classifies a message by its :message-type/:event-type headers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Decoded wire messages and the synthetic response built from them.

use bytes::Bytes;

/// A single header value as carried on the wire.
///
/// Only string-valued headers are retained past decoding; every other header
/// type is recorded as `Other` and dropped once a [`SyntheticResponse`] is
/// built, per the decision to never stringify or surface non-string headers.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// A UTF-8 string header value.
    String(String),
    /// Any non-string header value (boolean, integer, timestamp, byte array, uuid).
    Other,
}

/// A message produced by a [`crate::decoder::FrameDecoder`].
#[derive(Debug, Clone)]
pub struct WireMessage {
    headers: Vec<(String, HeaderValue)>,
    payload: Bytes,
}

impl WireMessage {
    /// Build a message from its headers and payload.
    #[must_use]
    pub fn new(headers: Vec<(String, HeaderValue)>, payload: Bytes) -> Self {
        Self { headers, payload }
    }

    /// Look up a string-valued header by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|(n, v)| {
            (n == name).then_some(v).and_then(|v| match v {
                HeaderValue::String(s) => Some(s.as_str()),
                HeaderValue::Other => None,
            })
        })
    }

    /// The `:message-type` header, if present and string-valued.
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.header(":message-type")
    }

    /// The `:event-type` header, if present and string-valued.
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        self.header(":event-type")
    }

    /// The raw message payload.
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Iterate over the string-valued headers only.
    pub fn string_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().filter_map(|(n, v)| match v {
            HeaderValue::String(s) => Some((n.as_str(), s.as_str())),
            HeaderValue::Other => None,
        })
    }

    pub(crate) fn classify(&self) -> MessageKind {
        match self.message_type() {
            Some("event") => {
                if self.event_type() == Some("initial-response") {
                    MessageKind::InitialResponse
                } else {
                    MessageKind::Event
                }
            }
            Some("error" | "exception") => MessageKind::Error,
            _ => MessageKind::Ignored,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageKind {
    InitialResponse,
    Event,
    Error,
    Ignored,
}

/// The payload and string headers of one message, handed to an [`crate::unmarshall::Unmarshall`]
/// implementation. Non-string headers have already been dropped.
#[derive(Debug, Clone)]
pub struct SyntheticResponse {
    /// The message payload.
    pub body: Bytes,
    /// The message's string-valued headers.
    pub headers: Vec<(String, String)>,
}

impl From<&WireMessage> for SyntheticResponse {
    fn from(message: &WireMessage) -> Self {
        Self {
            body: message.payload.clone(),
            headers: message
                .string_headers()
                .map(|(n, v)| (n.to_owned(), v.to_owned()))
                .collect(),
        }
    }
}
