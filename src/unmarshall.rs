// ABOUTME: Seam for turning a synthetic response into a caller-defined typed value
// ABOUTME: One implementation each for the initial-response, event, and exception roles
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Seam for turning a synthetic response into a typed value.

use crate::message::SyntheticResponse;

/// Converts the payload and headers of one message into `T`.
///
/// Implementations are expected to be cheap to call repeatedly and to hold no
/// per-message mutable state; the crate calls through a shared reference from
/// multiple messages over the lifetime of a stream.
pub trait Unmarshall<T>: Send + Sync {
    /// Parse `response` into a `T`.
    ///
    /// # Errors
    /// Returns any error produced while parsing the payload or headers.
    fn unmarshall(
        &self,
        response: &SyntheticResponse,
    ) -> Result<T, Box<dyn std::error::Error + Send + Sync>>;
}
