//! Accept loop over a real socket

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod support;

use std::time::Duration;

use ferry_common::ShutdownCoordinator;
use ferry_endpoint::{EndpointConfig, EndpointError, EndpointServer, TlsConfig};
use pretty_assertions::assert_eq;
use support::{AUTHORIZED, RecordingConfirmer, endpoint};

fn plain_config() -> EndpointConfig {
    EndpointConfig {
        listen_address: "127.0.0.1:0".to_string(),
        basic_auth: Some("sns:s3cret".to_string()),
        tls: None,
        read_timeout_secs: 5,
    }
}

#[tokio::test]
async fn serves_until_shutdown() {
    let server = EndpointServer::bind(&plain_config(), endpoint(&RecordingConfirmer::new()))
        .await
        .unwrap();
    let url = format!("http://{}/", server.local_addr().unwrap());

    let coordinator = ShutdownCoordinator::new();
    let task = tokio::spawn(server.serve(coordinator.signal()));

    let client = reqwest::Client::new();
    let response = client
        .get(&url)
        .header("Authorization", AUTHORIZED)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "200 OK\n");

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);

    coordinator.trigger();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("server should stop once shutdown is requested")
        .unwrap();
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let first = EndpointServer::bind(&plain_config(), endpoint(&RecordingConfirmer::new()))
        .await
        .unwrap();
    let taken = EndpointConfig {
        listen_address: first.local_addr().unwrap().to_string(),
        ..plain_config()
    };

    let err = EndpointServer::bind(&taken, endpoint(&RecordingConfirmer::new()))
        .await
        .err()
        .expect("second bind to the same address should fail");
    assert!(matches!(err, EndpointError::Bind { .. }));
}

#[tokio::test]
async fn missing_certificate_fails_before_binding() {
    let config = EndpointConfig {
        tls: Some(TlsConfig {
            certificate: "/nonexistent/cert.pem".into(),
            key: "/nonexistent/key.pem".into(),
        }),
        ..plain_config()
    };

    let err = EndpointServer::bind(&config, endpoint(&RecordingConfirmer::new()))
        .await
        .err()
        .expect("bind without TLS material should fail");
    assert!(matches!(err, EndpointError::Tls { .. }));
}
