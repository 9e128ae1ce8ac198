//! Scripted stand-in for a hosted backend project.
//!
//! Every request is recorded. Responses are scripted per method and path;
//! unscripted routes answer 404 with a JSON error body.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex, MutexGuard};

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use serde_json::Value;

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }
}

#[derive(Debug, Clone)]
struct Scripted {
    status: u16,
    body: String,
}

#[derive(Debug, Default)]
struct FakeState {
    requests: Mutex<Vec<Recorded>>,
    responses: Mutex<HashMap<(String, String), Scripted>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().expect("fake backend lock")
}

/// Running fake backend bound to an ephemeral local port.
pub struct FakeSupabase {
    state: web::Data<FakeState>,
    base_url: String,
    handle: ServerHandle,
}

impl FakeSupabase {
    /// Bind and start serving. Call from inside an Actix runtime.
    pub fn start() -> Self {
        let state = web::Data::new(FakeState::default());
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        let data = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .default_service(web::to(handle))
        })
        .listen(listener)
        .expect("listen on fake backend")
        .disable_signals()
        .workers(1)
        .run();
        let server_handle = server.handle();
        actix_web::rt::spawn(server);
        Self {
            state,
            base_url: format!("http://{addr}"),
            handle: server_handle,
        }
    }

    /// Project URL clients should use.
    pub fn url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Answer `method path` with `status` and `body` from now on.
    pub fn respond(&self, method: &str, path: &str, status: u16, body: impl Into<String>) {
        lock(&self.state.responses).insert(
            (method.to_owned(), path.to_owned()),
            Scripted {
                status,
                body: body.into(),
            },
        );
    }

    /// Answer `method path` with a JSON body.
    pub fn respond_json(&self, method: &str, path: &str, status: u16, body: &Value) {
        self.respond(method, path, status, body.to_string());
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<Recorded> {
        lock(&self.state.requests).clone()
    }

    /// Requests received for `method path`.
    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == method && request.path == path)
            .collect()
    }

    /// The single request received for `method path`.
    pub fn only_request_to(&self, method: &str, path: &str) -> Recorded {
        let mut matching = self.requests_to(method, path);
        assert_eq!(matching.len(), 1, "expected one {method} {path}");
        matching.remove(0)
    }

    /// Stop accepting connections.
    pub async fn stop(self) {
        self.handle.stop(true).await;
    }
}

async fn handle(request: HttpRequest, body: web::Bytes, state: web::Data<FakeState>) -> HttpResponse {
    let recorded = Recorded {
        method: request.method().as_str().to_owned(),
        path: request.path().to_owned(),
        query: request.query_string().to_owned(),
        headers: request
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_ascii_lowercase(), value.to_owned()))
            })
            .collect(),
        body: body.to_vec(),
    };
    let key = (recorded.method.clone(), recorded.path.clone());
    lock(&state.requests).push(recorded);
    let scripted = lock(&state.responses).get(&key).cloned();
    match scripted {
        Some(Scripted { status: code, body: text }) => {
            let status = StatusCode::from_u16(code).expect("valid scripted status");
            let mut builder = HttpResponse::build(status);
            if text.trim_start().starts_with(['{', '[']) {
                builder.content_type("application/json");
            }
            builder.body(text)
        }
        None => HttpResponse::NotFound()
            .content_type("application/json")
            .body(r#"{"message":"no route scripted"}"#),
    }
}
