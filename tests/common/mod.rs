//! Fake collaborators shared by the boundary-scenario and property tests.
//!
//! None of these types are part of the public API; they stand in for the
//! externally-owned pieces the crate declares out of scope (§1 of the
//! design notes): the wire codec, the unmarshallers, the upstream byte
//! publisher, and the executor.

use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use futures_util::FutureExt;

use eventstream_transform::{
    BuildError, ByteSubscriber, ByteSubscription, BytePublisher, DecodeError, EventPublisher,
    EventStreamResponseHandler, EventStreamResponseTransformer, EventSubscriber, EventSubscription,
    FrameDecoder, MessageRole, TransformError, TransformExecutor, TransformerBuilder, Unmarshall,
    HeaderValue, SyntheticResponse, WireMessage,
};

/// Runs drain-engine tasks inline, synchronously, on whichever thread kicks
/// them. None of this crate's internal futures ever suspend, so polling once
/// with `now_or_never` always drives a task to completion; this keeps tests
/// deterministic without needing a `tokio` runtime at all.
#[derive(Clone, Default)]
pub struct InlineExecutor;

impl TransformExecutor for InlineExecutor {
    fn execute(&self, task: futures_util::future::BoxFuture<'static, ()>) {
        task.now_or_never();
    }
}

/// A domain error type standing in for a caller's own `Er`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestError(pub String);

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "test error: {}", self.0)
    }
}

impl Error for TestError {}

/// Decodes a `SyntheticResponse`'s body as UTF-8 text. Used for both the
/// initial-response and the event role in these tests, since both are
/// modelled as plain strings.
pub struct StringUnmarshall;

impl Unmarshall<String> for StringUnmarshall {
    fn unmarshall(
        &self,
        response: &SyntheticResponse,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        String::from_utf8(response.body.to_vec()).map_err(|e| Box::new(e) as _)
    }
}

/// Decodes a `SyntheticResponse`'s body into a [`TestError`].
pub struct TestErrorUnmarshall;

impl Unmarshall<TestError> for TestErrorUnmarshall {
    fn unmarshall(
        &self,
        response: &SyntheticResponse,
    ) -> Result<TestError, Box<dyn Error + Send + Sync>> {
        String::from_utf8(response.body.to_vec())
            .map(TestError)
            .map_err(|e| Box::new(e) as _)
    }
}

/// An `Unmarshall` that always fails, used to exercise the decode-error path.
pub struct FailingUnmarshall;

impl<T> Unmarshall<T> for FailingUnmarshall {
    fn unmarshall(&self, _response: &SyntheticResponse) -> Result<T, Box<dyn Error + Send + Sync>> {
        Err(Box::new(TestError("unmarshall always fails".to_owned())))
    }
}

/// Encode one test-wire-format message: three newline-terminated header
/// lines (`message-type`, `event-type`, `payload-len`) followed by the raw
/// payload bytes and a trailing newline. `event_type` is the empty string
/// when absent.
#[must_use]
pub fn encode(message_type: &str, event_type: &str, payload: &str) -> Bytes {
    let mut out = BytesMut::new();
    out.extend_from_slice(message_type.as_bytes());
    out.extend_from_slice(b"\n");
    out.extend_from_slice(event_type.as_bytes());
    out.extend_from_slice(b"\n");
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.extend_from_slice(b"\n");
    out.extend_from_slice(payload.as_bytes());
    out.extend_from_slice(b"\n");
    out.freeze()
}

/// Concatenate several encoded messages into bytes that can then be split at
/// arbitrary chunk boundaries, to exercise partial-frame buffering.
#[must_use]
pub fn encode_all(messages: &[(&str, &str, &str)]) -> Bytes {
    let mut out = BytesMut::new();
    for (message_type, event_type, payload) in messages {
        out.extend_from_slice(&encode(message_type, event_type, payload));
    }
    out.freeze()
}

/// A toy incremental frame decoder for the encoding above. Buffers bytes
/// across calls so a message split mid-header or mid-payload is only
/// produced once the full record has arrived.
#[derive(Default)]
pub struct TestDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder for TestDecoder {
    fn decode(&mut self, bytes: Bytes) -> Result<Vec<WireMessage>, DecodeError> {
        self.buf.extend_from_slice(&bytes);
        let mut messages = Vec::new();
        while let Some((message, consumed)) = Self::try_parse(&self.buf)? {
            messages.push(message);
            self.buf.drain(..consumed);
        }
        Ok(messages)
    }
}

impl TestDecoder {
    #[allow(clippy::type_complexity)]
    fn try_parse(buf: &[u8]) -> Result<Option<(WireMessage, usize)>, DecodeError> {
        let Some(first_nl) = buf.iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let Some(second_nl_rel) = buf[first_nl + 1..].iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let second_nl = first_nl + 1 + second_nl_rel;
        let Some(third_nl_rel) = buf[second_nl + 1..].iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let third_nl = second_nl + 1 + third_nl_rel;

        let message_type = std::str::from_utf8(&buf[..first_nl])
            .map_err(|e| DecodeError::new(MessageRole::Frame, Box::new(e)))?
            .to_owned();
        let event_type = std::str::from_utf8(&buf[first_nl + 1..second_nl])
            .map_err(|e| DecodeError::new(MessageRole::Frame, Box::new(e)))?
            .to_owned();
        let payload_len: usize = std::str::from_utf8(&buf[second_nl + 1..third_nl])
            .map_err(|e| DecodeError::new(MessageRole::Frame, Box::new(e)))?
            .parse()
            .map_err(|e: std::num::ParseIntError| {
                DecodeError::new(MessageRole::Frame, Box::new(e))
            })?;

        let payload_start = third_nl + 1;
        let payload_end = payload_start + payload_len;
        if buf.len() < payload_end + 1 {
            return Ok(None);
        }

        let mut headers = vec![(
            ":message-type".to_owned(),
            HeaderValue::String(message_type),
        )];
        if !event_type.is_empty() {
            headers.push((":event-type".to_owned(), HeaderValue::String(event_type)));
        }
        let payload = Bytes::copy_from_slice(&buf[payload_start..payload_end]);
        Ok(Some((
            WireMessage::new(headers, payload),
            payload_end + 1,
        )))
    }
}

struct TestUpstreamState {
    subscriber: Mutex<Option<Box<dyn ByteSubscriber>>>,
    request_count: Mutex<u64>,
    cancelled: Mutex<bool>,
    /// Tracks P5 ("at most one outstanding upstream `request(1)` at a
    /// time") directly: set on `request`, cleared when the corresponding
    /// chunk is handed back via `deliver`. `request` panics if a request
    /// comes in while one is already outstanding, so a P5 violation fails
    /// the test at the point it happens rather than needing a separate
    /// assertion pass.
    outstanding: Mutex<bool>,
}

/// A [`BytePublisher`] whose bytes are pushed by the test itself via the
/// [`TestUpstreamHandle`] returned from [`TestUpstream::handle`], rather than
/// in automatic response to `request`. This lets a test drive "bytes arrive
/// before demand" and "demand arrives before bytes" independently.
pub struct TestUpstream(Arc<TestUpstreamState>);

impl TestUpstream {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(TestUpstreamState {
            subscriber: Mutex::new(None),
            request_count: Mutex::new(0),
            cancelled: Mutex::new(false),
            outstanding: Mutex::new(false),
        }))
    }

    #[must_use]
    pub fn handle(&self) -> TestUpstreamHandle {
        TestUpstreamHandle(Arc::clone(&self.0))
    }
}

impl Default for TestUpstream {
    fn default() -> Self {
        Self::new()
    }
}

impl BytePublisher for TestUpstream {
    fn subscribe(&mut self, subscriber: Box<dyn ByteSubscriber>) {
        *self.0.subscriber.lock().unwrap() = Some(subscriber);
        let subscription: Arc<dyn ByteSubscription> = Arc::new(TestSubscription(Arc::clone(&self.0)));
        let mut guard = self.0.subscriber.lock().unwrap();
        if let Some(subscriber) = guard.as_mut() {
            subscriber.on_subscribe(subscription);
        }
    }
}

struct TestSubscription(Arc<TestUpstreamState>);

impl ByteSubscription for TestSubscription {
    fn request(&self, n: u64) {
        let mut outstanding = self.0.outstanding.lock().unwrap();
        assert!(
            !*outstanding,
            "P5 violated: a byte-chunk request was issued while one was already outstanding"
        );
        *outstanding = true;
        *self.0.request_count.lock().unwrap() += n;
    }

    fn cancel(&self) {
        *self.0.cancelled.lock().unwrap() = true;
    }
}

/// The test-side handle used to push bytes and observe upstream demand.
#[derive(Clone)]
pub struct TestUpstreamHandle(Arc<TestUpstreamState>);

impl TestUpstreamHandle {
    /// Simulate the upstream transport delivering one chunk, fulfilling
    /// whatever request is currently outstanding.
    pub fn deliver(&self, bytes: &Bytes) {
        *self.0.outstanding.lock().unwrap() = false;
        if let Some(subscriber) = self.0.subscriber.lock().unwrap().as_mut() {
            subscriber.on_next(bytes.clone());
        }
    }

    /// How many times `request` was called on the byte subscription.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        *self.0.request_count.lock().unwrap()
    }

    /// Whether `cancel` was ever called on the byte subscription.
    #[must_use]
    pub fn cancelled(&self) -> bool {
        *self.0.cancelled.lock().unwrap()
    }
}

/// A downstream [`EventSubscriber`] recording everything it observes, with
/// an optional hook run from inside `on_next` (used to cancel mid-delivery,
/// or to panic, from within the callback itself).
pub struct TestSubscriber {
    events: Arc<Mutex<Vec<String>>>,
    errors: Arc<Mutex<Vec<Arc<TransformError<TestError>>>>>,
    completed: Arc<Mutex<bool>>,
    subscription: Arc<Mutex<Option<EventSubscription<String>>>>,
    on_next_hook: Option<Box<dyn FnMut(&str, &EventSubscription<String>) + Send>>,
}

impl TestSubscriber {
    #[must_use]
    pub fn new() -> (Self, TestSubscriberObserver) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(Mutex::new(false));
        let subscription = Arc::new(Mutex::new(None));
        let observer = TestSubscriberObserver {
            events: Arc::clone(&events),
            errors: Arc::clone(&errors),
            completed: Arc::clone(&completed),
            subscription: Arc::clone(&subscription),
        };
        (
            Self {
                events,
                errors,
                completed,
                subscription,
                on_next_hook: None,
            },
            observer,
        )
    }

    /// Install a hook invoked from inside `on_next`, after the event is
    /// recorded, with the event and the live subscription.
    #[must_use]
    pub fn with_on_next_hook(
        mut self,
        hook: impl FnMut(&str, &EventSubscription<String>) + Send + 'static,
    ) -> Self {
        self.on_next_hook = Some(Box::new(hook));
        self
    }
}

impl EventSubscriber<String, TestError> for TestSubscriber {
    fn on_subscribe(&mut self, subscription: EventSubscription<String>) {
        *self.subscription.lock().unwrap() = Some(subscription);
    }

    fn on_next(&mut self, event: String) {
        self.events.lock().unwrap().push(event.clone());
        if let Some(hook) = self.on_next_hook.as_mut() {
            let subscription = self.subscription.lock().unwrap();
            if let Some(subscription) = subscription.as_ref() {
                hook(&event, subscription);
            }
        }
    }

    fn on_error(&mut self, error: Arc<TransformError<TestError>>) {
        self.errors.lock().unwrap().push(error);
    }

    fn on_complete(&mut self) {
        *self.completed.lock().unwrap() = true;
    }
}

/// Read-only window onto a [`TestSubscriber`]'s observed history, kept
/// separate from the subscriber itself so it can be inspected by the test
/// after the subscriber has been moved into the publisher.
#[derive(Clone)]
pub struct TestSubscriberObserver {
    events: Arc<Mutex<Vec<String>>>,
    errors: Arc<Mutex<Vec<Arc<TransformError<TestError>>>>>,
    completed: Arc<Mutex<bool>>,
    subscription: Arc<Mutex<Option<EventSubscription<String>>>>,
}

impl TestSubscriberObserver {
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }

    /// The first error observed, if any.
    #[must_use]
    pub fn take_first_error(&self) -> Option<Arc<TransformError<TestError>>> {
        self.errors.lock().unwrap().first().cloned()
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        *self.completed.lock().unwrap()
    }

    pub fn request(&self, n: u64) {
        if let Some(subscription) = self.subscription.lock().unwrap().as_ref() {
            subscription.request(n);
        }
    }

    pub fn cancel(&self) {
        if let Some(subscription) = self.subscription.lock().unwrap().as_ref() {
            subscription.cancel();
        }
    }
}

/// A response handler recording the initial response and completion/error
/// signals, and handing the constructed publisher back to the test via
/// [`TestHandler::publisher`] so the test controls exactly when and how the
/// downstream subscriber attaches.
pub struct TestHandler {
    initial: Arc<Mutex<Vec<String>>>,
    completed: Arc<Mutex<bool>>,
    exception: Arc<Mutex<Option<Arc<TransformError<TestError>>>>>,
    publisher: Arc<Mutex<Option<EventPublisher<String, String, TestError>>>>,
}

impl TestHandler {
    #[must_use]
    pub fn new() -> (Self, TestHandlerObserver) {
        let initial = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(Mutex::new(false));
        let exception = Arc::new(Mutex::new(None));
        let publisher = Arc::new(Mutex::new(None));
        let observer = TestHandlerObserver {
            initial: Arc::clone(&initial),
            completed: Arc::clone(&completed),
            exception: Arc::clone(&exception),
            publisher: Arc::clone(&publisher),
        };
        (
            Self {
                initial,
                completed,
                exception,
                publisher,
            },
            observer,
        )
    }
}

impl EventStreamResponseHandler<String, String, TestError> for TestHandler {
    fn response_received(&mut self, initial: String) {
        self.initial.lock().unwrap().push(initial);
    }

    fn on_event_stream(&mut self, publisher: EventPublisher<String, String, TestError>) {
        *self.publisher.lock().unwrap() = Some(publisher);
    }

    fn complete(&mut self) {
        *self.completed.lock().unwrap() = true;
    }

    fn exception_occurred(&mut self, error: Arc<TransformError<TestError>>) {
        *self.exception.lock().unwrap() = Some(error);
    }
}

/// Read-only window onto a [`TestHandler`], plus the one place a test can
/// take the constructed [`EventPublisher`] out to subscribe to it.
#[derive(Clone)]
pub struct TestHandlerObserver {
    initial: Arc<Mutex<Vec<String>>>,
    completed: Arc<Mutex<bool>>,
    exception: Arc<Mutex<Option<Arc<TransformError<TestError>>>>>,
    publisher: Arc<Mutex<Option<EventPublisher<String, String, TestError>>>>,
}

impl TestHandlerObserver {
    #[must_use]
    pub fn initial_responses(&self) -> Vec<String> {
        self.initial.lock().unwrap().clone()
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        *self.completed.lock().unwrap()
    }

    #[must_use]
    pub fn exception(&self) -> Option<Arc<TransformError<TestError>>> {
        self.exception.lock().unwrap().clone()
    }

    /// Take the publisher constructed at build time. Panics if called twice,
    /// or before the transformer has been built.
    pub fn take_publisher(&self) -> EventPublisher<String, String, TestError> {
        self.publisher
            .lock()
            .unwrap()
            .take()
            .expect("publisher not yet constructed")
    }
}

/// Assemble a transformer wired to fresh fakes, plus handles for driving and
/// observing it. The completion future is a bare `tokio::sync::oneshot`
/// receiver; since none of the pipeline's internal work suspends, polling it
/// with `now_or_never` after a synchronous call sequence reliably reflects
/// whether completion has fired yet.
pub fn build_pipeline() -> Result<
    (
        EventStreamResponseTransformer<String, String, TestError>,
        TestHandlerObserver,
        tokio::sync::oneshot::Receiver<()>,
    ),
    BuildError,
> {
    let (handler, handler_observer) = TestHandler::new();
    let (completion_tx, completion_rx) = tokio::sync::oneshot::channel();
    let transformer = TransformerBuilder::new()
        .response_handler(handler)
        .initial_response_unmarshaller(StringUnmarshall)
        .event_unmarshaller(StringUnmarshall)
        .exception_unmarshaller(TestErrorUnmarshall)
        .executor(InlineExecutor)
        .completion(completion_tx)
        .frame_decoder_factory(|| Box::new(TestDecoder::default()))
        .build()?;
    Ok((transformer, handler_observer, completion_rx))
}

/// Whether a completion future has resolved, without blocking.
#[must_use]
pub fn is_complete(rx: &mut tokio::sync::oneshot::Receiver<()>) -> bool {
    rx.try_recv().is_ok()
}

/// Like [`build_pipeline`], but with an event unmarshaller that always
/// fails, to exercise the decode-error path (as opposed to an in-band
/// `error`/`exception` frame).
pub fn build_pipeline_with_failing_event_unmarshaller() -> Result<
    (
        EventStreamResponseTransformer<String, String, TestError>,
        TestHandlerObserver,
        tokio::sync::oneshot::Receiver<()>,
    ),
    BuildError,
> {
    let (handler, handler_observer) = TestHandler::new();
    let (completion_tx, completion_rx) = tokio::sync::oneshot::channel();
    let transformer = TransformerBuilder::new()
        .response_handler(handler)
        .initial_response_unmarshaller(StringUnmarshall)
        .event_unmarshaller(FailingUnmarshall)
        .exception_unmarshaller(TestErrorUnmarshall)
        .executor(InlineExecutor)
        .completion(completion_tx)
        .frame_decoder_factory(|| Box::new(TestDecoder::default()))
        .build()?;
    Ok((transformer, handler_observer, completion_rx))
}
