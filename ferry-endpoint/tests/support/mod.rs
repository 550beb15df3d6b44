//! Test doubles for endpoint tests
#![allow(dead_code)] // Not every test binary uses every helper

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, header::AUTHORIZATION},
};
use ferry_delivery::{DeliveryError, NotificationHandler};
use ferry_endpoint::{Credentials, Endpoint, EndpointError, SubscriptionConfirmer};
use parking_lot::Mutex;
use serde_json::Value;
use std::time::Duration;

/// base64("sns:s3cret")
pub const AUTHORIZED: &str = "Basic c25zOnMzY3JldA==";

/// Records every message; fails them all once `fail_with` is set
#[derive(Default)]
pub struct RecordingHandler {
    messages: Mutex<Vec<Value>>,
    failure: Mutex<Option<fn() -> DeliveryError>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_with(&self, failure: fn() -> DeliveryError) {
        *self.failure.lock() = Some(failure);
    }

    pub fn messages(&self) -> Vec<Value> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl NotificationHandler for RecordingHandler {
    async fn handle(&self, message: &Value) -> Result<(), DeliveryError> {
        self.messages.lock().push(message.clone());
        match *self.failure.lock() {
            Some(failure) => Err(failure()),
            None => Ok(()),
        }
    }
}

/// Records confirmation URLs instead of fetching them
#[derive(Default)]
pub struct RecordingConfirmer {
    urls: Mutex<Vec<String>>,
    fail: Mutex<bool>,
}

impl RecordingConfirmer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self) {
        *self.fail.lock() = true;
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl SubscriptionConfirmer for RecordingConfirmer {
    async fn confirm(&self, url: &str) -> Result<(), EndpointError> {
        self.urls.lock().push(url.to_string());
        if *self.fail.lock() {
            return Err(EndpointError::Confirmation(
                "error sending request: connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn endpoint(confirmer: &Arc<RecordingConfirmer>) -> Endpoint {
    Endpoint::new(
        Credentials::new("sns:s3cret").unwrap(),
        Arc::clone(confirmer) as Arc<dyn SubscriptionConfirmer>,
    )
}

pub fn router(endpoint: Endpoint) -> Router {
    endpoint.router(Duration::from_secs(5))
}

pub fn request(method: &str, authorization: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri("/");
    if let Some(authorization) = authorization {
        builder = builder.header(AUTHORIZATION, authorization);
    }
    builder.body(body.into()).unwrap()
}
