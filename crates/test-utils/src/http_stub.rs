//! Webhook endpoint stub for notification tests.

use std::io;
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What the stub received.
#[derive(Debug, Clone, Default)]
pub struct CapturedRequest {
    pub method: String,
    /// Path without the query string, e.g. `/v2/applications/1/deployments.json`.
    pub path: String,
    /// Header names are lowercase.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: &'static str,
    stall_body: bool,
    requests: mpsc::Sender<CapturedRequest>,
}

/// Answer the first request with `status` and `body`, then shut down.
///
/// Returns the base URL (`http://127.0.0.1:<port>`) and a handle resolving to
/// the captured request once the response has been written.
pub async fn spawn_http_stub(
    status: u16,
    body: &'static str,
) -> io::Result<(String, JoinHandle<io::Result<CapturedRequest>>)> {
    spawn(status, body, false).await
}

/// Like [`spawn_http_stub`], but the response body never completes: headers
/// go out and the body stays pending until the handle is aborted.
pub async fn spawn_stalled_http_stub(
    status: u16,
) -> io::Result<(String, JoinHandle<io::Result<CapturedRequest>>)> {
    spawn(status, "", true).await
}

async fn spawn(
    status: u16,
    body: &'static str,
    stall_body: bool,
) -> io::Result<(String, JoinHandle<io::Result<CapturedRequest>>)> {
    let status = StatusCode::from_u16(status)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);

    let (tx, mut rx) = mpsc::channel(1);
    let app = Router::new().fallback(capture).with_state(StubState {
        status,
        body,
        stall_body,
        requests: tx,
    });

    let handle = tokio::spawn(async move {
        let captured = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&captured);

        // Graceful shutdown lets the in-flight response finish first.
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                if let Some(request) = rx.recv().await {
                    *slot.lock().unwrap() = Some(request);
                }
            })
            .await?;

        let request = captured.lock().unwrap().take();
        request.ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no request received"))
    });

    Ok((base_url, handle))
}

async fn capture(
    State(stub): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request = CapturedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers: headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        body,
    };
    // Only the first request is recorded.
    let _ = stub.requests.try_send(request);

    let body = if stub.stall_body {
        Body::from_stream(futures::stream::pending::<Result<Bytes, io::Error>>())
    } else {
        Body::from(stub.body)
    };

    let mut response = Response::new(body);
    *response.status_mut() = stub.status;
    response
}
