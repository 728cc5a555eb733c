// ABOUTME: Abstracts running drain-engine continuations away from a hard tokio::spawn dependency
// ABOUTME: Ships a TokioExecutor backed by a runtime handle as the default implementation
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Abstracts "run this work concurrently" away from a hard dependency on `tokio::spawn`.

use futures_util::future::BoxFuture;

/// Runs drain-engine continuations. Exists so the crate does not hard-code
/// `tokio::spawn`, mirroring how the rest of the ambient stack is threaded in
/// as `Arc<dyn Trait>` collaborators rather than called directly.
pub trait TransformExecutor: Send + Sync {
    /// Schedule `task` to run, without blocking the caller.
    fn execute(&self, task: BoxFuture<'static, ()>);
}

/// A [`TransformExecutor`] backed by a `tokio` runtime handle.
#[derive(Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    /// Build an executor bound to the handle of the currently-running runtime.
    ///
    /// # Panics
    /// Panics if called outside of a `tokio` runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }

    /// Build an executor bound to an explicit runtime handle.
    #[must_use]
    pub const fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl TransformExecutor for TokioExecutor {
    fn execute(&self, task: BoxFuture<'static, ()>) {
        self.handle.spawn(task);
    }
}
