//! Shared utilities for integration tests.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use bearerbox::{SessionConfig, Sms, message::Message};
use rstest::fixture;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Client id the test configuration identifies with.
pub const TEST_CLIENT_ID: &str = "test-box";

/// Session configuration admitting two requests at once.
#[fixture]
pub fn config() -> SessionConfig { SessionConfig::default().client_id(TEST_CLIENT_ID).window_size(2) }

/// A plain mobile-terminated sms.
#[must_use]
pub fn sms(text: &str) -> Sms { Sms::new("1234", "306900000000", text) }

/// Unwrap an sms from an outbound message.
pub fn expect_sms(message: Option<Message>) -> TestResult<Sms> {
    match message {
        Some(Message::Sms(sms)) => Ok(*sms),
        other => Err(format!("expected an sms, got {other:?}").into()),
    }
}
