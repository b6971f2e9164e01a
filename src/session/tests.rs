//! Unit tests for session wiring.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use rstest::rstest;
use tracing_test::traced_test;

use super::*;

/// Transport whose connection is already gone.
struct DeadTransport;

#[async_trait]
impl Transport for DeadTransport {
    fn send(&self, _message: Message) -> WriteCompletion {
        Box::pin(async { Err(TransportError::Closed) })
    }

    async fn close(&self, _timeout: Duration) -> Result<(), TransportError> { Ok(()) }

    fn is_active(&self) -> bool { false }
}

fn dead_session(handler: Arc<dyn SessionHandler>) -> Session {
    Session::new(SessionConfig::default(), Arc::new(DeadTransport), handler)
}

/// Transport that accepts every write and ignores close requests.
struct LingeringTransport;

#[async_trait]
impl Transport for LingeringTransport {
    fn send(&self, _message: Message) -> WriteCompletion { Box::pin(async { Ok(()) }) }

    async fn close(&self, _timeout: Duration) -> Result<(), TransportError> { Ok(()) }

    fn is_active(&self) -> bool { true }
}

#[derive(Default)]
struct ReadyCounter(AtomicUsize);

#[async_trait]
impl SessionHandler for ReadyCounter {
    async fn on_session_ready(&self, _session: &Session) { self.0.fetch_add(1, Ordering::SeqCst); }
}

fn lingering_session(handler: Arc<ReadyCounter>) -> Session {
    Session::new(SessionConfig::default(), Arc::new(LingeringTransport), handler)
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn identify_over_a_dead_transport_closes_the_session() {
    let session = dead_session(Arc::new(DefaultSessionHandler));

    let result = session.identify(Admin::identify("box")).await;

    assert!(matches!(
        result,
        Err(SessionError::Transport(TransportError::Closed))
    ));
    assert_eq!(session.state(), SessionState::Closed);
    assert!(logs_contain("identify failed"));
    assert!(logs_contain("closing session"));
}

#[rstest]
#[tokio::test]
async fn requests_on_a_dead_transport_fail_with_the_write_error() {
    let session = dead_session(Arc::new(DefaultSessionHandler));

    let promise = session
        .send_request(Sms::new("1", "2", "hello"), Duration::ZERO)
        .await;

    assert!(promise.wait(None).await);
    assert!(matches!(promise.cause(), Some(RequestError::Write(_))));
}

#[test]
fn transport_events_do_not_keep_the_session_alive() {
    let handler = Arc::new(DefaultSessionHandler);
    let session = dead_session(handler.clone());
    let events = session.transport_events();

    drop(session);

    assert_eq!(Arc::strong_count(&handler), 1);
    drop(events);
}

#[test]
fn debug_output_names_the_state() {
    let session = dead_session(Arc::new(DefaultSessionHandler));
    let rendered = format!("{session:?}");
    assert!(rendered.contains("state: Open"), "{rendered}");
}

#[rstest]
#[traced_test]
#[tokio::test]
async fn events_after_drop_are_ignored() {
    let session = dead_session(Arc::new(DefaultSessionHandler));
    let events = session.transport_events();
    drop(session);

    events.on_transport_closed().await;
    events
        .on_inbound_message(Message::from(HeartBeat::new(1)))
        .await;

    assert!(!logs_contain("connection lost"));
}

#[rstest]
#[tokio::test]
async fn closed_session_is_not_reported_ready() {
    let handler = Arc::new(ReadyCounter::default());
    let session = lingering_session(handler.clone());
    session.close().await;

    session
        .identify(Admin::identify("box"))
        .await
        .expect("write accepted");

    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(handler.0.load(Ordering::SeqCst), 0);
}

#[rstest]
#[tokio::test]
async fn repeated_identify_reports_ready_once() {
    let handler = Arc::new(ReadyCounter::default());
    let session = lingering_session(handler.clone());

    for _ in 0..2 {
        session
            .identify(Admin::identify("box"))
            .await
            .expect("write accepted");
    }

    assert!(session.is_identified());
    assert_eq!(handler.0.load(Ordering::SeqCst), 1);
}
