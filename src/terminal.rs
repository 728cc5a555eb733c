// ABOUTME: Terminal coordinator enforcing an at-most-once transition into error or completion
// ABOUTME: Owns the done flag, the error slot, and resolution of the completion future
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! The terminal coordinator: an at-most-once transition into the error or
//! completed state, serialised against concurrent callers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::TransformError;
use crate::state::{lock, Item, Shared};

/// Enter the error terminal state, if not already terminal. Delivers
/// `on_error` to the downstream subscriber (if one is attached) and
/// `exception_occurred` to the response handler, exactly once.
pub(crate) fn error<I, Ev, Er>(shared: &Arc<Shared<I, Ev, Er>>, err: TransformError<Er>)
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    let err = Arc::new(err);
    let became_terminal = {
        let mut inner = lock(&shared.inner);
        if inner.done {
            false
        } else {
            inner.done = true;
            let mut slot = lock(&shared.error);
            if slot.is_none() {
                *slot = Some(Arc::clone(&err));
            }
            true
        }
    };
    if !became_terminal {
        return;
    }

    tracing::warn!(error = %err, "event-stream pipeline entering error terminal state");

    // A cancelled subscriber receives no further signals (§7), even though
    // the error is still recorded for `complete_request`'s synchronous
    // rethrow to the enclosing request layer.
    if !lock(&shared.inner).cancelled {
        let mut subscriber = lock(&shared.subscriber);
        if let Some(subscriber) = subscriber.as_mut() {
            let err = Arc::clone(&err);
            let result = catch_unwind(AssertUnwindSafe(|| subscriber.on_error(err)));
            if let Err(panic) = result {
                tracing::error!(?panic, "downstream subscriber panicked in on_error; swallowed");
            }
        }
    }

    shared.notify_error(&err);
}

/// Push an end-of-stream sentinel and kick the drain engine, so any
/// remaining buffered events are delivered before completion fires.
///
/// Called by the enclosing request layer once it considers the exchange
/// finished; idempotent once the pipeline is already terminal.
///
/// # Errors
/// Returns the stored terminal error, if the pipeline already failed.
pub(crate) fn complete_request<I, Ev, Er>(
    shared: &Arc<Shared<I, Ev, Er>>,
) -> Result<(), Arc<TransformError<Er>>>
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    if let Some(err) = lock(&shared.error).clone() {
        return Err(err);
    }

    {
        let mut inner = lock(&shared.inner);
        if inner.done {
            return Ok(());
        }
        inner.queue.push_back(Item::EndOfStream);
    }
    crate::drain::kick_drain(shared);
    Ok(())
}

/// The drain engine reached the `EndOfStream` sentinel without error.
/// Delivers `on_complete` to the subscriber and `complete` to the response
/// handler, exactly once, and resolves the completion future.
pub(crate) fn on_event_complete<I, Ev, Er>(shared: &Arc<Shared<I, Ev, Er>>)
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    let became_terminal = {
        let mut inner = lock(&shared.inner);
        if inner.done {
            false
        } else {
            inner.done = true;
            true
        }
    };
    if !became_terminal {
        return;
    }

    tracing::info!("event-stream pipeline completed");

    {
        let mut subscriber = lock(&shared.subscriber);
        if let Some(subscriber) = subscriber.as_mut() {
            let result = catch_unwind(AssertUnwindSafe(|| subscriber.on_complete()));
            if let Err(panic) = result {
                tracing::error!(?panic, "downstream subscriber panicked in on_complete; swallowed");
            }
        }
    }

    shared.notify_complete();
}
