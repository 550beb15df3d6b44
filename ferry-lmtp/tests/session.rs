#![allow(clippy::expect_used, clippy::unwrap_used)]

mod support;

use ferry_lmtp::{ClientError, LmtpAddress, LmtpClient};
use pretty_assertions::assert_eq;
use support::mock_server::{LmtpCommand, MockLmtpServer};

async fn open(server: &MockLmtpServer) -> LmtpClient {
    let address: LmtpAddress = server.addr().parse().unwrap();
    let mut client = LmtpClient::connect(&address).await.unwrap();
    assert!(client.read_greeting().await.unwrap().is_success());
    client
}

#[tokio::test]
async fn full_transaction_collects_one_reply_per_recipient() {
    let server = MockLmtpServer::builder()
        .with_delivery_response_for("bob", 452, "4.2.2 Mailbox full")
        .build()
        .await
        .unwrap();

    let mut client = open(&server).await;

    let lhlo = client.lhlo("relay.test").await.unwrap();
    assert_eq!(lhlo.lines, vec!["mock.lmtp", "8BITMIME", "ENHANCEDSTATUSCODES"]);

    assert!(client.mail_from("sender@example.com").await.unwrap().is_success());
    assert!(client.rcpt_to("alice").await.unwrap().is_success());
    assert!(client.rcpt_to("bob").await.unwrap().is_success());
    assert!(client.data().await.unwrap().is_intermediate());

    let replies = client
        .send_data(b"Subject: hello\n\n.leading dot\n", 2)
        .await
        .unwrap();
    assert_eq!(replies.len(), 2);
    assert!(replies[0].is_success());
    assert!(replies[1].is_temporary_error());

    client.quit().await.unwrap();

    let commands = server.commands().await;
    assert_eq!(
        commands,
        vec![
            LmtpCommand::Lhlo("relay.test".to_string()),
            LmtpCommand::MailFrom("sender@example.com".to_string()),
            LmtpCommand::RcptTo("alice".to_string()),
            LmtpCommand::RcptTo("bob".to_string()),
            LmtpCommand::Data,
            LmtpCommand::MessageContent(b"Subject: hello\r\n\r\n..leading dot\r\n".to_vec()),
            LmtpCommand::Quit,
        ]
    );

    server.shutdown();
}

#[tokio::test]
async fn null_reverse_path() {
    let server = MockLmtpServer::builder().build().await.unwrap();
    let mut client = open(&server).await;

    client.lhlo("relay.test").await.unwrap();
    client.mail_from("").await.unwrap();

    assert!(
        server
            .commands()
            .await
            .contains(&LmtpCommand::MailFrom(String::new()))
    );

    server.shutdown();
}

#[tokio::test]
async fn dropped_connection_surfaces_as_error() {
    let server = MockLmtpServer::builder()
        .with_network_error_after_commands(1)
        .build()
        .await
        .unwrap();
    let mut client = open(&server).await;

    client.lhlo("relay.test").await.unwrap();
    let err = client.mail_from("sender@example.com").await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectionClosed | ClientError::Io(_)));

    server.shutdown();
}

#[cfg(unix)]
#[tokio::test]
async fn unix_socket_transport() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lmtp.sock");

    let server = MockLmtpServer::builder().build_unix(&path).await.unwrap();
    assert!(server.addr().starts_with("unix:"));

    let mut client = open(&server).await;
    client.lhlo("relay.test").await.unwrap();
    client.mail_from("a@example.com").await.unwrap();
    client.rcpt_to("alice").await.unwrap();
    client.data().await.unwrap();
    let replies = client.send_data(b"Subject: x\r\n\r\nbody", 1).await.unwrap();
    assert!(replies[0].is_success());

    assert_eq!(server.messages().await, vec![b"Subject: x\r\n\r\nbody\r\n".to_vec()]);
    assert_eq!(server.connection_count(), 1);

    server.shutdown();
}
