//! Scripted in-memory transport and sleeper for driving the crate without
//! an array.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use arraymgmt::{
    ArrayError, Auth, Body, ClientConfig, EndpointIdentity, Method, Request,
    Response, Result, RetryPolicy, SessionManager, Sleeper, Transport,
};
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

pub const SESSION_PATH: &str = "/ConfigurationManager/v1/objects/sessions";

#[derive(Debug, Clone)]
pub enum Reply {
    Ok(Response),
    TimeOut,
}

/// Request as seen by the fake array.
#[derive(Debug, Clone)]
pub struct Sent {
    pub method: Method,
    /// Path plus `?query` when present.
    pub target: String,
    /// `none`, `basic:<user>` or `session:<token>`.
    pub auth: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct FakeState {
    // The last queued reply of a route is sticky.
    routes: HashMap<(String, String), VecDeque<Reply>>,
    sent: Vec<Sent>,
}

#[derive(Default)]
pub struct FakeTransport {
    state: Mutex<FakeState>,
}

impl FakeTransport {
    pub fn new() -> FakeTransport {
        FakeTransport::default()
    }

    pub fn on(&self, method: Method, target: &str, reply: Reply) {
        self.state
            .lock()
            .routes
            .entry((method.to_string(), target.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn on_json(&self, method: Method, target: &str, status: u16, body: Value) {
        self.on(method, target, Reply::Ok(Response::new(status, Body::Json(body))));
    }

    pub fn on_login(&self, session_id: u64, token: &str) {
        self.on_json(
            Method::Post,
            SESSION_PATH,
            200,
            json!({"token": token, "sessionId": session_id}),
        );
    }

    pub fn on_busy(&self, method: Method, target: &str, message: &str) {
        self.on_json(
            method,
            target,
            503,
            json!({
                "errorSource": target,
                "message": message,
                "cause": "The storage system is busy.",
                "solution": "Wait a while, and then retry.",
            }),
        );
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.state.lock().sent.clone()
    }

    pub fn count(&self, method: Method, target: &str) -> usize {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|s| s.method == method && s.target == target)
            .count()
    }

    pub fn logins(&self) -> usize {
        self.count(Method::Post, SESSION_PATH)
    }

    /// Mutating requests, in order.
    pub fn mutations(&self) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| s.method != Method::Get && !s.target.starts_with(SESSION_PATH))
            .collect()
    }
}

impl Transport for FakeTransport {
    fn send(&self, req: &Request) -> Result<Response> {
        let target = match req.url.query() {
            Some(q) => format!("{}?{}", req.url.path(), q),
            None => req.url.path().to_string(),
        };
        let auth = match req.auth {
            Auth::None => "none".to_string(),
            Auth::Basic { user, .. } => format!("basic:{}", user),
            Auth::Session(token) => format!("session:{}", token.expose_secret()),
        };
        let mut state = self.state.lock();
        state.sent.push(Sent {
            method: req.method,
            target: target.clone(),
            auth,
            body: req.body.cloned(),
        });
        let queue = state
            .routes
            .get_mut(&(req.method.to_string(), target.clone()));
        let reply = match queue {
            Some(q) if q.len() > 1 => q.pop_front(),
            Some(q) => q.front().cloned(),
            None => None,
        };
        match reply {
            Some(Reply::Ok(r)) => Ok(r),
            Some(Reply::TimeOut) => Err(ArrayError::TimeOut(format!(
                "{} {} timed out",
                req.method, target
            ))),
            None if req.method == Method::Delete && target.starts_with(SESSION_PATH) => {
                Ok(Response::new(200, Body::Empty))
            }
            None => Ok(Response::new(
                404,
                Body::Json(json!({"message": format!("no route for {} {}", req.method, target)})),
            )),
        }
    }
}

/// Records every requested sleep instead of blocking.
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> RecordingSleeper {
        RecordingSleeper::default()
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}

pub fn config(max_retries: u32) -> ClientConfig {
    ClientConfig::default().with_retry(RetryPolicy {
        interval: Duration::from_secs(300),
        max_retries,
    })
}

pub fn manager(transport: FakeTransport) -> (SessionManager<FakeTransport>, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let manager = SessionManager::with_transport(transport, config(5)).with_sleeper(sleeper.clone());
    (manager, sleeper)
}

pub fn endpoint(address: &str) -> EndpointIdentity {
    EndpointIdentity::new(address, "maintenance", SecretString::from("raid-maint")).unwrap()
}
