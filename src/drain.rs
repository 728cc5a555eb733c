// ABOUTME: Drain engine delivering queued events to the downstream subscriber
// ABOUTME: Iterative, batch-yielding loop under a single-owner delivery lease
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! The drain engine: delivers queued events to the downstream subscriber one
//! at a time, under a single-owner delivery lease.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::byte_consumer::maybe_request_chunk;
use crate::state::{lock, Item, Shared};

/// Cap on events delivered per scheduled turn, so one very demanding
/// subscriber can't monopolize the executor; the drain reschedules itself
/// as a fresh task once the cap is hit, rather than recursing.
const DRAIN_BATCH_SIZE: usize = 64;

/// Acquire the delivery lease and schedule a drain turn, if not already running.
pub(crate) fn kick_drain<I, Ev, Er>(shared: &Arc<Shared<I, Ev, Er>>)
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    let took_lease = lock(&shared.inner).ledger.try_take_delivery_lease();
    if took_lease {
        schedule(shared);
    }
}

fn schedule<I, Ev, Er>(shared: &Arc<Shared<I, Ev, Er>>)
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    let shared = Arc::clone(shared);
    shared.executor.execute(Box::pin(async move {
        drain_turn(&shared);
    }));
}

enum Action<Ev> {
    Complete,
    Deliver(Ev),
    Idle { should_request: bool },
}

/// Runs one scheduled turn of the drain loop: an iterative loop under the
/// delivery lease, bounded to `DRAIN_BATCH_SIZE` deliveries so it yields the
/// executor back instead of running unbounded.
fn drain_turn<I, Ev, Er>(shared: &Arc<Shared<I, Ev, Er>>)
where
    I: Send + 'static,
    Ev: Send + 'static,
    Er: std::error::Error + Send + Sync + 'static,
{
    for _ in 0..DRAIN_BATCH_SIZE {
        let action = next_action(shared);
        match action {
            Action::Complete => {
                crate::terminal::on_event_complete(shared);
                return;
            }
            Action::Deliver(event) => deliver(shared, event),
            Action::Idle { should_request } => {
                if should_request {
                    maybe_request_chunk(shared);
                }
                return;
            }
        }
    }
    // Batch exhausted with more work pending: release nothing, just hand the
    // lease's remaining work to a fresh task.
    schedule(shared);
}

fn next_action<I, Ev, Er>(shared: &Arc<Shared<I, Ev, Er>>) -> Action<Ev>
where
    Er: std::error::Error + Send + Sync + 'static,
{
    let mut inner = lock(&shared.inner);
    if inner.done || inner.cancelled {
        return Action::Idle {
            should_request: false,
        };
    }
    match inner.queue.front() {
        Some(Item::EndOfStream) => {
            inner.queue.pop_front();
            Action::Complete
        }
        Some(Item::Event(_)) if inner.ledger.demand() > 0 => {
            let Some(Item::Event(event)) = inner.queue.pop_front() else {
                unreachable!("front was just checked to be Item::Event");
            };
            inner.ledger.take_one_demand();
            Action::Deliver(event)
        }
        front => {
            // Either the queue is empty, or it holds an event with no demand
            // to cover it yet; either way this turn is done. Release the
            // delivery lease so a later `request(n)` can re-kick the drain.
            //
            // Only check demand here, without taking the requesting lease:
            // `maybe_request_chunk` (called by the caller when
            // `should_request` is true) is the single place that actually
            // takes the lease and sends the request, and it needs to find
            // the lease still free to do so.
            inner.ledger.release_delivery_lease();
            let queue_empty = front.is_none();
            let should_request = queue_empty && inner.ledger.demand() > 0;
            Action::Idle { should_request }
        }
    }
}

fn deliver<I, Ev, Er>(shared: &Arc<Shared<I, Ev, Er>>, event: Ev)
where
    Er: std::error::Error + Send + Sync + 'static,
{
    let mut subscriber = lock(&shared.subscriber);
    if let Some(subscriber) = subscriber.as_mut() {
        let result = catch_unwind(AssertUnwindSafe(|| subscriber.on_next(event)));
        if let Err(panic) = result {
            tracing::error!(?panic, "downstream subscriber panicked in on_next; swallowed");
        }
    }
}
