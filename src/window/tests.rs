//! Unit tests for admission, correlation and resolution in [`Window`].

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use rstest::{fixture, rstest};
use tokio::{sync::mpsc, time};

use super::*;

type TestWindow = Window<u32, &'static str, &'static str>;
type TestPromise = RequestPromise<u32, &'static str, &'static str>;

const NO_WAIT: Duration = Duration::ZERO;

#[fixture]
fn window() -> TestWindow { Window::new(2) }

struct ChannelListener(mpsc::UnboundedSender<TestPromise>);

#[async_trait]
impl ExpiryListener<u32, &'static str, &'static str> for ChannelListener {
    async fn on_expired(&self, promise: TestPromise) { let _ = self.0.send(promise); }
}

fn listening_window(max_size: usize) -> (TestWindow, mpsc::UnboundedReceiver<TestPromise>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Window::with_listener(max_size, Arc::new(ChannelListener(tx))), rx)
}

#[rstest]
#[tokio::test]
async fn capacity_one_scenario() {
    let window: TestWindow = Window::new(1);

    let a = window.offer(1, "a", NO_WAIT, None).await;
    assert!(!a.is_done());
    assert_eq!(window.size(), 1);

    let b = window.offer(2, "b", NO_WAIT, None).await;
    assert!(matches!(b.cause(), Some(RequestError::AdmissionTimeout)));
    assert_eq!(window.size(), 1);
    assert_eq!(window.free_size(), 0);

    let completed = window.complete(&1, "resp-a").expect("a is in flight");
    assert_eq!(completed.response(), Some(&"resp-a"));
    assert_eq!(a.response(), Some(&"resp-a"));
    assert_eq!(window.free_size(), 1);

    let b = window.offer(2, "b", NO_WAIT, None).await;
    assert!(!b.is_done());
    assert_eq!(window.size(), 1);
}

#[rstest]
#[tokio::test]
async fn duplicate_key_leaves_occupancy_unchanged(window: TestWindow) {
    let first = window.offer(7, "first", NO_WAIT, None).await;
    let second = window.offer(7, "second", NO_WAIT, None).await;

    assert!(matches!(second.cause(), Some(RequestError::DuplicateKey)));
    assert!(!first.is_done());
    assert_eq!(window.size(), 1);
    assert_eq!(window.free_size(), 1);
    assert_eq!(window.get(&7).map(|p| *p.request()), Some("first"));
}

#[rstest]
fn absent_keys_are_not_found(window: TestWindow) {
    assert!(window.complete(&1, "late").is_none());
    assert!(window.fail(&1, RequestError::ConnectionClosed).is_none());
    assert!(window.cancel(&1).is_none());
    assert_eq!(window.free_size(), 2);
}

#[rstest]
#[tokio::test]
async fn debug_reports_occupancy(window: TestWindow) {
    let _pending = window.offer(1, "a", NO_WAIT, None).await;
    let rendered = format!("{window:?}");
    assert!(rendered.starts_with("Window { size: 1, max_size: 2"), "{rendered}");
}

#[rstest]
#[tokio::test]
async fn each_entry_resolves_once(window: TestWindow) {
    let promise = window.offer(1, "req", NO_WAIT, None).await;

    assert!(window.fail(&1, RequestError::ConnectionClosed).is_some());
    assert!(window.complete(&1, "late").is_none());
    assert!(window.cancel(&1).is_none());
    assert!(matches!(promise.cause(), Some(RequestError::ConnectionClosed)));
    assert_eq!(window.free_size(), 2);
}

#[rstest]
#[tokio::test]
async fn blocked_offer_is_admitted_when_a_slot_frees() {
    let window: TestWindow = Window::new(1);
    let _first = window.offer(1, "a", NO_WAIT, None).await;

    let pending = {
        let window = window.clone();
        tokio::spawn(async move { window.offer(2, "b", Duration::from_secs(5), None).await })
    };
    while window.pending_offer_count() == 0 {
        tokio::task::yield_now().await;
    }
    window.complete(&1, "ok");

    let second = pending.await.expect("join");
    assert!(!second.is_done());
    assert!(window.contains_key(&2));
    assert_eq!(window.pending_offer_count(), 0);
}

#[tokio::test]
async fn admission_timeout_elapses() {
    time::pause();
    let window: TestWindow = Window::new(1);
    let _first = window.offer(1, "a", NO_WAIT, None).await;

    let start = time::Instant::now();
    let second = window.offer(2, "b", Duration::from_millis(250), None).await;
    assert!(matches!(second.cause(), Some(RequestError::AdmissionTimeout)));
    assert!(start.elapsed() >= Duration::from_millis(250));
    assert_eq!(window.size(), 1);
}

#[tokio::test]
async fn unanswered_request_expires_at_its_deadline() {
    time::pause();
    let (window, mut expired) = listening_window(1);
    let start = time::Instant::now();
    let promise = window.offer(1, "req", NO_WAIT, Some(Duration::from_millis(500))).await;

    assert!(promise.wait(None).await);
    assert!(matches!(promise.cause(), Some(RequestError::Expired)));
    assert!(start.elapsed() >= Duration::from_millis(500));
    assert_eq!(window.size(), 0);
    assert_eq!(window.free_size(), 1);

    let notified = expired.recv().await.expect("listener notified");
    assert_eq!(*notified.key(), 1);
}

#[tokio::test]
async fn deadline_is_a_no_op_after_completion() {
    time::pause();
    let (window, mut expired) = listening_window(1);
    let promise = window.offer(1, "req", NO_WAIT, Some(Duration::from_millis(100))).await;
    window.complete(&1, "resp");

    let replacement = window.offer(1, "again", NO_WAIT, None).await;
    time::sleep(Duration::from_millis(300)).await;

    assert_eq!(promise.response(), Some(&"resp"));
    assert!(!replacement.is_done());
    assert!(window.contains_key(&1));
    assert!(expired.try_recv().is_err());
}

#[rstest]
#[tokio::test]
async fn wait_times_out_and_marks_the_caller(window: TestWindow) {
    time::pause();
    let promise = window.offer(1, "req", NO_WAIT, None).await;
    assert_eq!(promise.caller_hint(), CallerHint::NotWaiting);

    assert!(!promise.wait(Some(Duration::from_millis(10))).await);
    assert_eq!(promise.caller_hint(), CallerHint::GaveUp);
    assert!(window.contains_key(&1));
}

#[rstest]
#[tokio::test]
async fn waiting_caller_is_woken_by_completion(window: TestWindow) {
    let promise = window.offer(1, "req", NO_WAIT, None).await;
    let waiter = {
        let promise = promise.clone();
        tokio::spawn(async move { promise.wait(None).await })
    };
    while promise.caller_hint() != CallerHint::Waiting {
        tokio::task::yield_now().await;
    }
    window.complete(&1, "resp");
    assert!(waiter.await.expect("join"));
}

#[rstest]
#[tokio::test]
async fn promise_cancel_goes_through_the_window(window: TestWindow) {
    let promise = window.offer(1, "req", NO_WAIT, None).await;
    assert!(promise.cancel());
    assert!(promise.is_cancelled());
    assert!(!window.contains_key(&1));
    assert_eq!(window.free_size(), 2);
    assert!(!promise.cancel());
}

#[rstest]
#[tokio::test]
async fn stale_cancel_does_not_touch_a_reoffered_key(window: TestWindow) {
    let stale = window.offer(1, "first", NO_WAIT, None).await;
    window.complete(&1, "done");
    let fresh = window.offer(1, "second", NO_WAIT, None).await;

    assert!(!stale.cancel());
    assert!(!fresh.is_done());
    assert!(window.contains_key(&1));
}

#[tokio::test]
async fn fail_all_resolves_in_offer_order() {
    let window: TestWindow = Window::new(4);
    for key in [30, 10, 20] {
        window.offer(key, "req", NO_WAIT, None).await;
    }

    let failed = window.fail_all(&RequestError::ConnectionClosed);
    let keys: Vec<u32> = failed.iter().map(|p| *p.key()).collect();
    assert_eq!(keys, vec![30, 10, 20]);
    assert!(failed
        .iter()
        .all(|p| matches!(p.cause(), Some(RequestError::ConnectionClosed))));
    assert_eq!(window.size(), 0);
    assert_eq!(window.free_size(), 4);
}

#[tokio::test]
async fn destroy_interrupts_blocked_and_future_offers() {
    let window: TestWindow = Window::new(1);
    let in_flight = window.offer(1, "a", NO_WAIT, None).await;
    let blocked = {
        let window = window.clone();
        tokio::spawn(async move { window.offer(2, "b", Duration::from_secs(60), None).await })
    };
    while window.pending_offer_count() == 0 {
        tokio::task::yield_now().await;
    }

    let cancelled = window.destroy();
    assert_eq!(cancelled.len(), 1);
    assert!(in_flight.is_cancelled());

    let blocked = blocked.await.expect("join");
    assert!(matches!(blocked.cause(), Some(RequestError::Interrupted)));
    let late = window.offer(3, "c", Duration::from_secs(1), None).await;
    assert!(matches!(late.cause(), Some(RequestError::Interrupted)));
    assert!(window.is_destroyed());
    assert_eq!(window.size(), 0);
    assert_eq!(window.free_size(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_resolutions_release_every_slot() {
    let window: Window<u32, u32, u32> = Window::new(8);
    let mut tasks = Vec::new();
    for key in 0..200u32 {
        let window = window.clone();
        tasks.push(tokio::spawn(async move {
            let promise = window.offer(key, key, Duration::from_secs(5), None).await;
            let racers = [
                tokio::spawn({
                    let window = window.clone();
                    async move { window.complete(&key, key).is_some() }
                }),
                tokio::spawn({
                    let window = window.clone();
                    async move { window.fail(&key, RequestError::ConnectionClosed).is_some() }
                }),
                tokio::spawn({
                    let window = window.clone();
                    async move { window.cancel(&key).is_some() }
                }),
            ];
            let mut winners = 0;
            for racer in racers {
                if racer.await.expect("join") {
                    winners += 1;
                }
            }
            assert_eq!(winners, 1, "exactly one resolution per entry");
            assert!(promise.is_done());
        }));
    }
    for task in tasks {
        task.await.expect("join");
    }
    assert_eq!(window.size(), 0);
    assert_eq!(window.free_size(), 8);
}
