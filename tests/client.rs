//! Connector tests against a gateway stub on a local TCP listener.

use std::time::Duration;

use bearerbox::{
    Client,
    ClientError,
    SessionConfig,
    message::{Ack, AckType, Admin, Message},
};
use bearerbox_testing::{Gateway, HandlerEvent, RecordingHandler};
use rstest::rstest;
use tokio::net::TcpListener;

mod common;
use common::{TEST_CLIENT_ID, TestResult, config, sms};

#[rstest]
#[tokio::test]
async fn identify_then_send_over_tcp(config: SessionConfig) -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let gateway = tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let mut gateway = Gateway::new(stream);
        let identify = gateway.recv().await?;
        let Message::Sms(sent) = gateway.recv().await? else {
            return Err("expected an sms".into());
        };
        let id = sent.id.ok_or("request without id")?;
        gateway.send(Ack::new(id, AckType::Success)).await?;
        TestResult::<Message>::Ok(identify)
    });

    let (handler, mut events) = RecordingHandler::new();
    let session = Client::new(config.host("127.0.0.1").port(addr.port()))
        .identify(handler)
        .await?;
    assert!(session.is_identified());
    assert_eq!(session.peer_addr(), Some(addr));
    assert!(matches!(events.next().await, Some(HandlerEvent::SessionReady)));

    let ack = session
        .send_request_and_wait(sms("hello"), Duration::from_secs(5))
        .await?;
    assert_eq!(ack.response, AckType::Success);
    assert_eq!(
        gateway.await??,
        Message::from(Admin::identify(TEST_CLIENT_ID))
    );

    session.destroy().await;
    Ok(())
}

#[rstest]
#[tokio::test]
async fn refused_connection_is_an_io_error(config: SessionConfig) -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let (handler, _events) = RecordingHandler::new();
    let result = Client::new(config.host("127.0.0.1").port(port))
        .connect(handler)
        .await;

    assert!(matches!(result, Err(ClientError::Io(_))));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn unresolvable_host_is_an_io_error(config: SessionConfig) {
    let (handler, _events) = RecordingHandler::new();
    let result = Client::new(config.host("gateway.invalid"))
        .connect(handler)
        .await;

    assert!(matches!(
        result,
        Err(ClientError::Io(_) | ClientError::ConnectTimeout(_))
    ));
}
