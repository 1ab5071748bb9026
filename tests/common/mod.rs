//! In-process stand-in for the Replicate predictions API.
//!
//! Every created prediction walks through the same scripted list of
//! steps: the POST answers with the first one, each GET on its status
//! URL with the next one (the last step repeats forever).

#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    body::Body,
    extract::{connect_info::MockConnectInfo, Path, State},
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

use image_generator::{
    config::Config,
    generator::{client::ReplicateClient, poller::PollConfig},
    SharedState,
};

pub const TOKEN: &str = "r8_test_token";

/// What the fake answers for one step of a prediction.
#[derive(Clone)]
pub enum Step {
    /// The snapshot, with `id` and `urls` filled in.
    Snapshot(Value),
    /// The snapshot, but its status URL points at a closed port.
    Unreachable(Value),
    /// `200 OK` with a body that is not JSON.
    Garbage,
    /// `503` with a Replicate style problem document.
    ServerError,
    /// Never answers.
    Hang,
}

struct FakeState {
    base_url: String,
    script: Vec<Step>,
    cursors: Mutex<HashMap<String, usize>>,
    posts: AtomicUsize,
    gets: AtomicUsize,
    /// Status code and body returned to every POST instead of the script.
    reject_with: Option<(StatusCode, Value)>,
}

pub struct FakeReplicate {
    pub base_url: String,
    state: Arc<FakeState>,
}

impl FakeReplicate {
    pub async fn start(script: Vec<Value>) -> FakeReplicate {
        Self::spawn(script.into_iter().map(Step::Snapshot).collect(), None).await
    }

    pub async fn start_steps(script: Vec<Step>) -> FakeReplicate {
        Self::spawn(script, None).await
    }

    pub async fn rejecting(status: StatusCode, body: Value) -> FakeReplicate {
        Self::spawn(Vec::new(), Some((status, body))).await
    }

    async fn spawn(script: Vec<Step>, reject_with: Option<(StatusCode, Value)>) -> FakeReplicate {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let state = Arc::new(FakeState {
            base_url: base_url.clone(),
            script,
            cursors: Mutex::new(HashMap::new()),
            posts: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            reject_with,
        });

        let router = Router::new()
            .route("/models/:owner/:name/predictions", post(create_prediction))
            .route("/predictions/:id", get(get_prediction))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        FakeReplicate { base_url, state }
    }

    pub fn posts(&self) -> usize {
        self.state.posts.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.state.gets.load(Ordering::SeqCst)
    }

    pub fn client(&self) -> ReplicateClient {
        ReplicateClient::new(
            reqwest::Client::new(),
            self.base_url.clone(),
            "black-forest-labs/flux-dev",
            TOKEN,
        )
    }

    pub fn config(&self, api_token: Option<&str>) -> Config {
        Config {
            address: "127.0.0.1:0".into(),
            api_token: api_token.map(str::to_string),
            api_url: self.base_url.clone(),
            model: "black-forest-labs/flux-dev".into(),
            guidance: 3.5,
            poll: fast_polling(),
        }
    }

    pub fn app(&self, api_token: Option<&str>) -> Router {
        let state: SharedState = Arc::new(image_generator::State::new(self.config(api_token)));
        image_generator::app(state)
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 3000))))
    }
}

pub fn fast_polling() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(10),
        max_interval: Duration::from_millis(10),
        multiplier: 1.0,
        budget: Duration::from_secs(10),
    }
}

/// A snapshot with the given status, output and error.
pub fn snapshot(status: &str, output: Value, error: Value) -> Value {
    json!({
        "status": status,
        "output": output,
        "error": error,
        "version": "dp-4d0bcc010b3049749a251855f12800be",
        "logs": "",
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(|value| value == format!("Token {}", TOKEN))
        .unwrap_or(false)
}

fn unauthenticated() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "title": "Unauthenticated",
            "detail": "You did not pass a valid authentication token",
            "status": 401
        })),
    )
        .into_response()
}

async fn render(state: &FakeState, id: &str, step: usize, input: Value) -> Response {
    let (mut body, base_url) = match &state.script[step.min(state.script.len() - 1)] {
        Step::Snapshot(body) => (body.clone(), state.base_url.as_str()),
        Step::Unreachable(body) => (body.clone(), "http://127.0.0.1:9"),
        Step::Garbage => return (StatusCode::OK, "<html>upstream hiccup</html>").into_response(),
        Step::ServerError => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "title": "Service unavailable", "detail": "Please retry shortly", "status": 503 })),
            )
                .into_response()
        }
        Step::Hang => return std::future::pending::<Response>().await,
    };

    body["id"] = json!(id);
    body["input"] = input;
    body["urls"] = json!({
        "get": format!("{}/predictions/{}", base_url, id),
        "cancel": format!("{}/predictions/{}/cancel", base_url, id),
    });

    (StatusCode::CREATED, Json(body)).into_response()
}

async fn create_prediction(
    State(state): State<Arc<FakeState>>,
    Path((owner, name)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let count = state.posts.fetch_add(1, Ordering::SeqCst) + 1;

    if !authorized(&headers) {
        return unauthenticated();
    }

    if let Some((status, body)) = &state.reject_with {
        return (*status, Json(body.clone())).into_response();
    }

    assert_eq!(format!("{}/{}", owner, name), "black-forest-labs/flux-dev");
    assert!(body["input"]["prompt"].is_string());
    assert!(body["input"]["guidance"].is_number());

    let id = format!("pred-{}", count);
    state.cursors.lock().await.insert(id.clone(), 0);

    render(&state, &id, 0, body["input"].clone()).await
}

async fn get_prediction(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.gets.fetch_add(1, Ordering::SeqCst);

    if !authorized(&headers) {
        return unauthenticated();
    }

    let step = {
        let mut cursors = state.cursors.lock().await;
        let Some(step) = cursors.get_mut(&id) else {
            return (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response();
        };

        *step += 1;
        *step
    };

    render(&state, &id, step, json!({})).await
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn get_page(app: Router, uri: &str) -> (StatusCode, String) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}
