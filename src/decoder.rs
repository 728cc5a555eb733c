// ABOUTME: Seam for the wire-level frame codec, pluggable per wire protocol
// ABOUTME: Implementations buffer partial frames across chunk boundaries
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Seam for the wire-level frame codec.

use bytes::Bytes;

use crate::error::DecodeError;
use crate::message::WireMessage;

/// Incrementally decodes a binary event-stream into whole messages.
///
/// Implementations own any partial-frame state needed to handle a message
/// split across two chunks; a fresh decoder is built per upstream attach (see
/// [`crate::builder::TransformerBuilder::frame_decoder_factory`]), so retries
/// of the enclosing request start from a clean decoder.
pub trait FrameDecoder: Send {
    /// Feed one chunk of upstream bytes, returning every whole message it
    /// completed. A chunk may complete zero, one, or several messages.
    ///
    /// # Errors
    /// Returns an error if the bytes are not valid framing for this codec.
    fn decode(&mut self, bytes: Bytes) -> Result<Vec<WireMessage>, DecodeError>;
}
