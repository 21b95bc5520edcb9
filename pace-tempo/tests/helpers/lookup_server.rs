//! In-process stand-in for the remote BPM lookup service
//!
//! Serves `POST /v1/lookup` on an ephemeral port. Each request pops the next
//! scripted reply; once the script is exhausted every record is echoed back
//! with tempo 100.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use pace_tempo::models::LookupRecord;

#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with these records
    Records(Vec<LookupRecord>),
    /// Bare status, with a Location header for 3xx
    Status(u16),
    /// 200 with a body that is not a record array
    Garbage,
}

#[derive(Clone, Default)]
struct ServerState {
    script: Arc<Mutex<VecDeque<Reply>>>,
    received: Arc<Mutex<Vec<Vec<LookupRecord>>>>,
}

pub struct LookupServer {
    addr: SocketAddr,
    state: ServerState,
    handle: tokio::task::JoinHandle<()>,
}

impl LookupServer {
    pub async fn start(script: Vec<Reply>) -> Self {
        let state = ServerState {
            script: Arc::new(Mutex::new(script.into())),
            received: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/v1/lookup", post(lookup))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve lookup stub");
        });

        Self { addr, state, handle }
    }

    pub fn url(&self) -> String {
        format!("http://{}/v1/lookup", self.addr)
    }

    /// Request bodies received so far
    pub fn received(&self) -> Vec<Vec<LookupRecord>> {
        self.state.received.lock().unwrap().clone()
    }
}

impl Drop for LookupServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn lookup(State(state): State<ServerState>, Json(records): Json<Vec<LookupRecord>>) -> Response {
    state.received.lock().unwrap().push(records.clone());
    let reply = state.script.lock().unwrap().pop_front();

    match reply {
        Some(Reply::Records(results)) => Json(results).into_response(),
        Some(Reply::Status(code)) => {
            let status = StatusCode::from_u16(code).expect("valid status code");
            if status.is_redirection() {
                (status, [(header::LOCATION, "/v1/lookup")]).into_response()
            } else {
                status.into_response()
            }
        }
        Some(Reply::Garbage) => (StatusCode::OK, "{\"not\": \"an array\"}").into_response(),
        None => {
            let echoed: Vec<LookupRecord> = records
                .into_iter()
                .map(|r| LookupRecord {
                    tempo: Some(100.0),
                    ..r
                })
                .collect();
            Json(echoed).into_response()
        }
    }
}
