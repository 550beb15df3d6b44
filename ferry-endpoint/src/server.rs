//! HTTP(S) server for pushed notifications

use std::{fs::File, io::BufReader, net::SocketAddr, path::Path, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use ferry_common::{ShutdownSignal, incoming, internal, tracing};
use ferry_delivery::NotificationHandler;
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto,
    service::TowerToHyperService,
};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::{
    TlsAcceptor,
    rustls::{
        ServerConfig,
        crypto::aws_lc_rs,
        pki_types::{CertificateDer, PrivateKeyDer},
    },
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::{
    Credentials, EndpointConfig, EndpointError, NotificationEnvelope, SubscriptionConfirmer,
    TlsConfig,
};

/// SNS caps a message at 256 KiB; the envelope adds signing fields around it.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Request handling shared by every connection.
///
/// Credentials and the optional delivery handler are fixed at construction.
/// Without a handler the endpoint still completes subscription handshakes but
/// answers notifications with 400.
pub struct Endpoint {
    credentials: Credentials,
    handler: Option<Arc<dyn NotificationHandler>>,
    confirmer: Arc<dyn SubscriptionConfirmer>,
}

impl Endpoint {
    pub fn new(credentials: Credentials, confirmer: Arc<dyn SubscriptionConfirmer>) -> Self {
        Self {
            credentials,
            handler: None,
            confirmer,
        }
    }

    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn NotificationHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Every path and method lands in one handler.
    ///
    /// A body that takes longer than `read_timeout` to arrive is answered
    /// with 408. Handling the notification once the body is in is not
    /// bounded here; the delivery pipeline bounds its own steps.
    pub fn router(self, read_timeout: Duration) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(Shared {
                endpoint: Arc::new(self),
                read_timeout,
            })
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
    }

    async fn process(
        &self,
        method: &Method,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<(), EndpointError> {
        self.credentials.verify(headers)?;

        if method != Method::POST {
            return Ok(());
        }

        let envelope = NotificationEnvelope::parse(body)?;
        let kind = envelope.kind().to_string();
        incoming!(level = DEBUG, notification_type = %kind, "Notification received");

        self.handle_envelope(envelope).await.inspect_err(|e| {
            tracing::error!(notification_type = %kind, error = %e, "Unable to process notification");
        })
    }

    async fn handle_envelope(&self, envelope: NotificationEnvelope) -> Result<(), EndpointError> {
        match envelope {
            NotificationEnvelope::Notification { message, topic_arn } => {
                let handler = Arc::clone(self.handler.as_ref().ok_or(EndpointError::NoHandler)?);

                // Own task, so a client hanging up cannot cancel a delivery
                // between the LMTP commit and the object delete.
                tokio::spawn(async move { handler.handle(&message).await })
                    .await
                    .map_err(|e| EndpointError::Interrupted(e.to_string()))??;
                tracing::info!(topic_arn = topic_arn.as_deref().unwrap_or_default(), "Notification processed");
            }
            NotificationEnvelope::SubscriptionConfirmation {
                subscribe_url,
                topic_arn,
            } => {
                self.confirmer.confirm(&subscribe_url).await?;
                tracing::info!(%topic_arn, "Subscription confirmed");
            }
            NotificationEnvelope::UnsubscribeConfirmation { topic_arn } => {
                tracing::info!(topic_arn = topic_arn.as_deref().unwrap_or_default(), "Unsubscribed from topic");
            }
            NotificationEnvelope::Unknown(kind) => {
                return Err(EndpointError::UnknownNotificationType(kind));
            }
        }

        Ok(())
    }
}

#[derive(Clone)]
struct Shared {
    endpoint: Arc<Endpoint>,
    read_timeout: Duration,
}

async fn dispatch(State(shared): State<Shared>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let method = parts.method;

    if !matches!(method, Method::GET | Method::HEAD | Method::POST) {
        incoming!(level = DEBUG, %method, "Unsupported method");
        return reply(StatusCode::NOT_IMPLEMENTED);
    }

    let body = match tokio::time::timeout(
        shared.read_timeout,
        axum::body::to_bytes(body, MAX_BODY_BYTES),
    )
    .await
    {
        Ok(Ok(body)) => body,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Unable to read request body");
            return reply(StatusCode::BAD_REQUEST);
        }
        Err(_) => {
            tracing::warn!(timeout = ?shared.read_timeout, "Request body not received in time");
            return reply(StatusCode::REQUEST_TIMEOUT);
        }
    };

    match shared.endpoint.process(&method, &parts.headers, &body).await {
        Ok(()) => reply(StatusCode::OK),
        Err(EndpointError::Authentication) => {
            tracing::warn!(%method, "Rejected request without valid credentials");
            let mut response = reply(StatusCode::UNAUTHORIZED);
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(r#"Basic realm="sns""#),
            );
            response
        }
        Err(e @ EndpointError::Malformed(_)) => {
            tracing::warn!(error = %e, "Rejected malformed notification");
            reply(e.status_code())
        }
        Err(e) => reply(e.status_code()),
    }
}

/// A `text/plain` response whose body is the status line, e.g. `200 OK\n`.
fn reply(status: StatusCode) -> Response {
    let body = format!(
        "{} {}\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    let date = chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();

    (
        status,
        [
            (header::CONTENT_TYPE, "text/plain".to_string()),
            (header::CONTENT_LENGTH, body.len().to_string()),
            (header::DATE, date),
        ],
        body,
    )
        .into_response()
}

fn tls_error(path: &Path, reason: impl ToString) -> EndpointError {
    EndpointError::Tls {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, EndpointError> {
    let file = File::open(path).map_err(|e| tls_error(path, e))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| tls_error(path, e))?;

    if certs.is_empty() {
        return Err(tls_error(path, "No certificates found"));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, EndpointError> {
    let file = File::open(path).map_err(|e| tls_error(path, e))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| tls_error(path, e))?
        .ok_or_else(|| {
            tls_error(
                path,
                "Unable to determine key file format (expected PKCS1, PKCS8, or SEC1)",
            )
        })
}

/// Build the acceptor for `config`, offering HTTP/2 and HTTP/1.1.
///
/// # Errors
///
/// Returns [`EndpointError::Tls`] if either file is unreadable or the pair
/// is rejected.
pub fn load_tls(config: &TlsConfig) -> Result<TlsAcceptor, EndpointError> {
    let certs = load_certs(&config.certificate)?;
    let key = load_key(&config.key)?;

    let mut server = ServerConfig::builder_with_provider(Arc::new(aws_lc_rs::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    server.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(server)))
}

/// Accept loop for the notification endpoint
pub struct EndpointServer {
    listener: TcpListener,
    acceptor: Option<TlsAcceptor>,
    router: Router,
    read_timeout: Duration,
}

impl EndpointServer {
    /// Load TLS material (if configured) and bind the listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS material cannot be loaded or binding to
    /// the configured address fails.
    pub async fn bind(config: &EndpointConfig, endpoint: Endpoint) -> Result<Self, EndpointError> {
        let acceptor = config.tls.as_ref().map(load_tls).transpose()?;

        let listener = TcpListener::bind(&config.listen_address)
            .await
            .map_err(|e| EndpointError::Bind {
                address: config.listen_address.clone(),
                source: e,
            })?;

        tracing::info!(
            address = %config.listen_address,
            tls = acceptor.is_some(),
            handler = endpoint.has_handler(),
            "Notification endpoint bound successfully"
        );

        Ok(Self {
            listener,
            acceptor,
            router: endpoint.router(config.read_timeout()),
            read_timeout: config.read_timeout(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until shutdown. Connections already being served
    /// are left to finish on their own tasks.
    pub async fn serve(self, shutdown: ShutdownSignal) {
        internal!(level = INFO, "Notification endpoint starting");

        loop {
            tokio::select! {
                () = shutdown.wait() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(serve_connection(
                            stream,
                            peer,
                            self.acceptor.clone(),
                            self.router.clone(),
                            self.read_timeout,
                        ));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
        }

        internal!(level = INFO, "Notification endpoint stopped");
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    acceptor: Option<TlsAcceptor>,
    router: Router,
    read_timeout: Duration,
) {
    incoming!(level = DEBUG, %peer, "Connection accepted");

    let service = TowerToHyperService::new(router);
    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(read_timeout);

    let result = match acceptor {
        None => builder.serve_connection(TokioIo::new(stream), service).await,
        Some(acceptor) => {
            match tokio::time::timeout(read_timeout, acceptor.accept(stream)).await {
                Ok(Ok(tls)) => builder.serve_connection(TokioIo::new(tls), service).await,
                Ok(Err(e)) => {
                    tracing::debug!(%peer, error = %e, "TLS handshake failed");
                    return;
                }
                Err(_) => {
                    tracing::debug!(%peer, "TLS handshake timed out");
                    return;
                }
            }
        }
    };

    if let Err(e) = result {
        tracing::debug!(%peer, error = %e, "Connection closed with error");
    }
}
