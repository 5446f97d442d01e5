//! In-process stand-in for the QRC cluster REST API.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use flate2::Compression;
use flate2::write::GzEncoder;
use futures::StreamExt;
use ndarray::ArrayD;
use ndarray_npy::WriteNpyExt;
use num_complex::Complex64;
use serde_json::{Value, json};

use qibo_client::{ClientConfig, QIBO_VERSION};

/// One scripted reply of the result endpoint.
#[derive(Clone)]
pub struct ResultReply {
    pub job_status: Option<&'static str>,
    pub http_status: StatusCode,
    pub body: Vec<u8>,
    /// Send the body in this many chunks, pausing before each one.
    pub trickle: Option<(usize, Duration)>,
}

impl ResultReply {
    pub fn pending(job_status: &'static str) -> Self {
        Self {
            job_status: Some(job_status),
            http_status: StatusCode::OK,
            body: b"Job still in progress".to_vec(),
            trickle: None,
        }
    }

    pub fn finished(job_status: &'static str, body: Vec<u8>) -> Self {
        Self {
            job_status: Some(job_status),
            http_status: StatusCode::OK,
            body,
            trickle: None,
        }
    }

    pub fn without_header(body: Vec<u8>) -> Self {
        Self {
            job_status: None,
            http_status: StatusCode::OK,
            body,
            trickle: None,
        }
    }

    pub fn http_error(http_status: StatusCode) -> Self {
        Self {
            job_status: None,
            http_status,
            body: Vec::new(),
            trickle: None,
        }
    }

    /// Stream the body slowly in `chunks` pieces, `pause` apart.
    pub fn trickled(mut self, chunks: usize, pause: Duration) -> Self {
        self.trickle = Some((chunks, pause));
        self
    }

    fn into_body(self) -> Body {
        let Some((chunks, pause)) = self.trickle else {
            return Body::from(self.body);
        };
        let size = self.body.len().div_ceil(chunks).max(1);
        let pieces: Vec<Bytes> = self.body.chunks(size).map(Bytes::copy_from_slice).collect();
        let stream = futures::stream::iter(pieces).then(move |piece| async move {
            tokio::time::sleep(pause).await;
            Ok::<_, std::io::Error>(piece)
        });
        Body::from_stream(stream)
    }
}

/// Shared state of the stub server.
pub struct Stub {
    pub version: Mutex<Value>,
    pub submit_reply: Mutex<Value>,
    pub submitted: Mutex<Vec<Value>>,
    pub info_reply: Mutex<(StatusCode, Value)>,
    pub status_reply: Mutex<(StatusCode, Value)>,
    pub results: Mutex<VecDeque<ResultReply>>,
    pub info_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub result_calls: AtomicUsize,
}

impl Default for Stub {
    fn default() -> Self {
        Self {
            version: Mutex::new(json!({"qibo_version": QIBO_VERSION})),
            submit_reply: Mutex::new(json!({"pid": "abc123", "message": "Job queued"})),
            submitted: Mutex::new(Vec::new()),
            info_reply: Mutex::new((StatusCode::OK, json!({}))),
            status_reply: Mutex::new((StatusCode::OK, json!({"status": "to_do"}))),
            results: Mutex::new(VecDeque::new()),
            info_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            result_calls: AtomicUsize::new(0),
        }
    }
}

impl Stub {
    pub fn set_info(&self, status: StatusCode, body: Value) {
        *self.info_reply.lock().unwrap() = (status, body);
    }

    pub fn set_status(&self, status: StatusCode, body: Value) {
        *self.status_reply.lock().unwrap() = (status, body);
    }

    pub fn set_version(&self, body: Value) {
        *self.version.lock().unwrap() = body;
    }

    pub fn set_submit_reply(&self, body: Value) {
        *self.submit_reply.lock().unwrap() = body;
    }

    pub fn push_result(&self, reply: ResultReply) {
        self.results.lock().unwrap().push_back(reply);
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn result_calls(&self) -> usize {
        self.result_calls.load(Ordering::SeqCst)
    }

    /// Pop the next scripted reply, repeating the last one forever.
    fn next_result(&self) -> ResultReply {
        let mut results = self.results.lock().unwrap();
        if results.len() > 1 {
            results.pop_front().unwrap()
        } else {
            results
                .front()
                .cloned()
                .unwrap_or_else(|| ResultReply::pending("to_do"))
        }
    }
}

async fn version(State(stub): State<Arc<Stub>>) -> Json<Value> {
    Json(stub.version.lock().unwrap().clone())
}

async fn submit(State(stub): State<Arc<Stub>>, Json(body): Json<Value>) -> Json<Value> {
    stub.submitted.lock().unwrap().push(body);
    Json(stub.submit_reply.lock().unwrap().clone())
}

async fn info(State(stub): State<Arc<Stub>>, Path(_pid): Path<String>) -> Response {
    stub.info_calls.fetch_add(1, Ordering::SeqCst);
    let (status, body) = stub.info_reply.lock().unwrap().clone();
    (status, Json(body)).into_response()
}

async fn status(State(stub): State<Arc<Stub>>, Path(_pid): Path<String>) -> Response {
    stub.status_calls.fetch_add(1, Ordering::SeqCst);
    let (status, body) = stub.status_reply.lock().unwrap().clone();
    (status, Json(body)).into_response()
}

async fn result(State(stub): State<Arc<Stub>>, Path(_pid): Path<String>) -> Response {
    stub.result_calls.fetch_add(1, Ordering::SeqCst);
    let reply = stub.next_result();

    let job_status = reply.job_status;
    let mut response = (reply.http_status, reply.into_body()).into_response();
    if let Some(job_status) = job_status {
        response
            .headers_mut()
            .insert("Job-Status", HeaderValue::from_static(job_status));
    }
    response
}

/// Start the stub on a random local port. Returns its state and base URL.
pub async fn start_stub() -> (Arc<Stub>, String) {
    let stub = Arc::new(Stub::default());

    let app = Router::new()
        .route("/qibo_version/", get(version))
        .route("/run_circuit/", post(submit))
        .route("/job/info/{pid}", get(info))
        .route("/job/status/{pid}", get(status))
        .route("/job/result/{pid}/", get(result))
        .with_state(Arc::clone(&stub));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (stub, format!("http://{addr}"))
}

/// Client configuration pointing at the stub, with results under `results_root`.
pub fn config_for(base_url: &str, results_root: &std::path::Path) -> ClientConfig {
    ClientConfig {
        results_root: results_root.to_path_buf(),
        request_timeout_secs: 10,
        ..ClientConfig::with_base_url(base_url)
    }
}

/// Short poll interval for tests.
pub const TEST_INTERVAL: Duration = Duration::from_millis(20);

/// Gzip-compressed tar archive holding `files`.
pub fn build_archive(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data.as_slice()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// `.npy` encoding of a complex state vector.
pub fn npy_bytes(state: &ArrayD<Complex64>) -> Vec<u8> {
    let mut buf = Vec::new();
    state.write_npy(&mut buf).unwrap();
    buf
}

/// Bell state `(|00> + |11>) / sqrt(2)`.
pub fn bell_state() -> ArrayD<Complex64> {
    let amp = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
    let zero = Complex64::new(0.0, 0.0);
    ndarray::arr1(&[amp, zero, zero, amp]).into_dyn()
}

/// Archive as the cluster ships it for a successful job.
pub fn success_archive() -> Vec<u8> {
    build_archive(&[
        ("results.npy", npy_bytes(&bell_state())),
        ("logs/stdout.log", b"done\n".to_vec()),
    ])
}
