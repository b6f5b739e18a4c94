// Copyright (C) 2017-2018 Red Hat, Inc.
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::config::ClientConfig;
use super::error::*;
use super::misc::mask_token;
use super::transport::{Auth, HttpTransport, Method, Request, Response, Transport};

pub(crate) const SESSION_PATH: &str = "/ConfigurationManager/v1/objects/sessions";
const DEFAULT_SCHEME: &str = "https";

/// One manageable array: where it lives and whom we log in as.
///
/// Used as the key of the [`SessionStore`][1]. Two identities are equal
/// when the address, user and password are all equal.
///
/// [1]: struct.SessionStore.html
pub struct EndpointIdentity {
    base_url: Url,
    user: String,
    password: SecretString,
}

impl EndpointIdentity {
    /// `address` is `host`, `host:port` or a full `https://host:port` URL.
    ///
    /// # Errors
    ///
    ///  * [`ArrayError::InvalidArgument`][1]: empty user or an address
    ///    without a host.
    ///
    /// [1]: enum.ArrayError.html#variant.InvalidArgument
    pub fn new(
        address: &str,
        user: &str,
        password: SecretString,
    ) -> Result<EndpointIdentity> {
        let address = address.trim();
        let with_scheme = if address.contains("://") {
            address.to_string()
        } else {
            format!("{}://{}", DEFAULT_SCHEME, address)
        };
        let mut base_url = Url::parse(&with_scheme).map_err(|e| {
            ArrayError::InvalidArgument(format!(
                "Invalid array address '{}': {}",
                address, e
            ))
        })?;
        if base_url.host_str().map_or(true, str::is_empty) {
            return Err(ArrayError::InvalidArgument(format!(
                "Invalid array address '{}': no host",
                address
            )));
        }
        base_url.set_path("/");
        base_url.set_query(None);
        if user.is_empty() {
            return Err(ArrayError::InvalidArgument(
                "User name should not be empty".to_string(),
            ));
        }
        Ok(EndpointIdentity {
            base_url,
            user: user.to_string(),
            password,
        })
    }

    /// `host[:port]` of the array.
    pub fn address(&self) -> String {
        match self.base_url.port() {
            Some(p) => format!("{}:{}", self.base_url.host_str().unwrap_or_default(), p),
            None => self.base_url.host_str().unwrap_or_default().to_string(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Absolute URL of `path`, which may carry a query string.
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    pub(crate) fn basic_auth(&self) -> Auth<'_> {
        Auth::Basic {
            user: &self.user,
            password: &self.password,
        }
    }
}

impl Clone for EndpointIdentity {
    fn clone(&self) -> Self {
        EndpointIdentity {
            base_url: self.base_url.clone(),
            user: self.user.clone(),
            password: SecretString::from(self.password.expose_secret()),
        }
    }
}

impl PartialEq for EndpointIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.base_url == other.base_url
            && self.user == other.user
            && self.password.expose_secret() == other.password.expose_secret()
    }
}

impl Eq for EndpointIdentity {}

impl Hash for EndpointIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base_url.hash(state);
        self.user.hash(state);
        self.password.expose_secret().hash(state);
    }
}

impl fmt::Debug for EndpointIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EndpointIdentity")
            .field("address", &self.address())
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Server side authentication session.
///
/// Only the [`SessionStore`][1] owns sessions, everyone else holds an
/// `Arc` handed out by [`SessionManager::acquire()`][2].
///
/// [1]: struct.SessionStore.html
/// [2]: struct.SessionManager.html#method.acquire
pub struct Session {
    token: SecretString,
    session_id: String,
    issued_at: SystemTime,
    endpoint: EndpointIdentity,
}

impl Session {
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn issued_at(&self) -> SystemTime {
        self.issued_at
    }

    pub fn endpoint(&self) -> &EndpointIdentity {
        &self.endpoint
    }

    pub(crate) fn auth(&self) -> Auth<'_> {
        Auth::Session(&self.token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &mask_token(&self.session_id, 0))
            .field("issued_at", &self.issued_at)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SessionReply {
    token: String,
    #[serde(deserialize_with = "id_to_string")]
    session_id: String,
}

// The array reports `sessionId` as a number, some proxies as a string.
fn id_to_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> ::std::result::Result<String, D::Error> {
    let v: Value = Deserialize::deserialize(deserializer)?;
    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "invalid sessionId {}",
            other
        ))),
    }
}

/// Blocks the caller between retries.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`][1] backed by `std::thread::sleep()`.
///
/// [1]: trait.Sleeper.html
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Cache of live sessions keyed by endpoint identity.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<EndpointIdentity, Arc<Session>>>,
    login_locks: Mutex<HashMap<EndpointIdentity, Arc<Mutex<()>>>>,
}

impl SessionStore {
    pub fn new() -> SessionStore {
        SessionStore::default()
    }

    pub fn get(&self, id: &EndpointIdentity) -> Option<Arc<Session>> {
        self.sessions.lock().get(id).map(Arc::clone)
    }

    /// Identities with a login lock, live or not.
    pub fn lock_count(&self) -> usize {
        self.login_locks.lock().len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    fn insert(&self, session: Arc<Session>) -> Option<Arc<Session>> {
        self.sessions
            .lock()
            .insert(session.endpoint.clone(), session)
    }

    fn remove(&self, id: &EndpointIdentity) -> Option<Arc<Session>> {
        self.sessions.lock().remove(id)
    }

    fn drain(&self) -> Vec<Arc<Session>> {
        self.sessions.lock().drain().map(|(_, s)| s).collect()
    }

    // Serializes logins per identity; other identities are not blocked.
    fn login_lock(&self, id: &EndpointIdentity) -> Arc<Mutex<()>> {
        Arc::clone(
            self.login_locks
                .lock()
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

/// Issues, caches, renews and discards array sessions for one automation
/// run.
///
/// Dropping the manager discards every cached session on the array, so
/// keep it alive for as long as [`Client`][1]s built on it are in use.
///
/// [1]: struct.Client.html
pub struct SessionManager<T: Transport = HttpTransport> {
    transport: T,
    store: SessionStore,
    config: ClientConfig,
    sleeper: Box<dyn Sleeper>,
}

impl SessionManager<HttpTransport> {
    /// Session manager over HTTPS.
    pub fn new(config: ClientConfig) -> Result<SessionManager<HttpTransport>> {
        let transport = HttpTransport::new(&config)?;
        Ok(SessionManager::with_transport(transport, config))
    }
}

impl<T: Transport> SessionManager<T> {
    pub fn with_transport(transport: T, config: ClientConfig) -> SessionManager<T> {
        SessionManager {
            transport,
            store: SessionStore::new(),
            config,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    /// Replace the sleeper used for 503 backoff and job polling.
    pub fn with_sleeper<S: Sleeper + 'static>(mut self, sleeper: S) -> SessionManager<T> {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Cached session of `id`, logging in first if there is none.
    ///
    /// # Errors
    ///
    ///  * [`ArrayError::AuthFailed`][1]: the array rejected the login.
    ///  * [`ArrayError::RequestFailed`][2]: the array kept replying 503
    ///    beyond the retry budget.
    ///  * [`ArrayError::TimeOut`][3]: the login request timed out.
    ///
    /// [1]: enum.ArrayError.html#variant.AuthFailed
    /// [2]: enum.ArrayError.html#variant.RequestFailed
    /// [3]: enum.ArrayError.html#variant.TimeOut
    pub fn acquire(&self, id: &EndpointIdentity) -> Result<Arc<Session>> {
        if let Some(s) = self.store.get(id) {
            return Ok(s);
        }
        let lock = self.store.login_lock(id);
        let _guard = lock.lock();
        // Another thread might have logged in while we waited.
        if let Some(s) = self.store.get(id) {
            return Ok(s);
        }
        let session = Arc::new(self.login(id)?);
        self.store.insert(Arc::clone(&session));
        Ok(session)
    }

    /// Replace `stale`, a session of `id` the array rejected with HTTP 401,
    /// by a fresh login.
    ///
    /// When another caller already renewed it, the cached session is
    /// returned as is and nothing is deleted on the array.
    pub fn renew(&self, id: &EndpointIdentity, stale: &Arc<Session>) -> Result<Arc<Session>> {
        let lock = self.store.login_lock(id);
        let _guard = lock.lock();
        match self.store.get(id) {
            Some(cached) if !Arc::ptr_eq(&cached, stale) => {
                debug!(address = %id.address(), "session already renewed");
                return Ok(cached);
            }
            Some(_) => {
                debug!(address = %id.address(), "renewing session");
                if let Some(old) = self.store.remove(id) {
                    self.logout(&old);
                }
            }
            None => (),
        }
        let session = Arc::new(self.login(id)?);
        self.store.insert(Arc::clone(&session));
        Ok(session)
    }

    /// Best-effort deletion of the session of `id` on the array. Failures
    /// are logged, the session expires on the array eventually.
    pub fn release(&self, id: &EndpointIdentity) {
        if let Some(session) = self.store.remove(id) {
            self.logout(&session);
        }
    }

    /// Release every cached session. Runs on drop as well.
    pub fn shutdown(&self) {
        self.store.login_locks.lock().clear();
        let sessions = self.store.drain();
        if sessions.is_empty() {
            return;
        }
        info!(count = sessions.len(), "discarding array sessions");
        for session in sessions {
            self.logout(&session);
        }
    }

    pub(crate) fn sleep(&self, duration: Duration) {
        self.sleeper.sleep(duration);
    }

    /// Send `req`, retrying HTTP 503 with the configured fixed backoff.
    /// Any other reply is returned untouched.
    pub(crate) fn send_with_retry(&self, req: &Request) -> Result<Response> {
        let policy = self.config.retry;
        let mut retries: u32 = 0;
        loop {
            let reply = self.transport.send(req)?;
            if reply.status != HTTP_SERVICE_UNAVAILABLE {
                return Ok(reply);
            }
            let failure = HttpFailure::new(reply.status, &reply.body.to_text());
            if retries >= policy.max_retries {
                return Err(ArrayError::RequestFailed {
                    status: reply.status,
                    message: format!(
                        "Service still unavailable after {} retries: {}",
                        retries, failure.message
                    ),
                });
            }
            retries += 1;
            warn!(
                method = %req.method,
                url = %req.url,
                retry = retries,
                max_retries = policy.max_retries,
                interval_secs = policy.interval.as_secs(),
                reason = %failure.message,
                "array is busy, retrying"
            );
            self.sleeper.sleep(policy.interval);
        }
    }

    fn login(&self, id: &EndpointIdentity) -> Result<Session> {
        let address = id.address();
        let url = id.url(SESSION_PATH)?;
        let req = Request {
            method: Method::Post,
            url: &url,
            auth: id.basic_auth(),
            body: None,
        };
        info!(address = %address, user = id.user(), "logging in");
        let reply = self
            .send_with_retry(&req)
            .map_err(|e| e.context(&format!("Login to {} failed", address)))?;
        if !reply.is_success() {
            return Err(ArrayError::AuthFailed(format!(
                "Login to {} as {} failed with HTTP {}: {}",
                address,
                id.user(),
                reply.status,
                reply.body.to_text()
            )));
        }
        let data: SessionReply = serde_json::from_value(reply.json()?.clone())
            .map_err(|e| ArrayError::from(e).context(&format!("Login to {}", address)))?;
        info!(
            address = %address,
            session_id = %mask_token(&data.session_id, self.config.token_reveal),
            token = %mask_token(&data.token, self.config.token_reveal),
            "logged in"
        );
        Ok(Session {
            token: SecretString::from(data.token),
            session_id: data.session_id,
            issued_at: SystemTime::now(),
            endpoint: id.clone(),
        })
    }

    fn logout(&self, session: &Session) {
        let address = session.endpoint.address();
        let masked = mask_token(&session.session_id, self.config.token_reveal);
        let path = format!("{}/{}", SESSION_PATH, session.session_id);
        let url = match session.endpoint.url(&path) {
            Ok(u) => u,
            Err(e) => {
                warn!(address = %address, session_id = %masked, error = %e, "cannot discard session");
                return;
            }
        };
        let req = Request {
            method: Method::Delete,
            url: &url,
            auth: session.auth(),
            body: None,
        };
        match self.transport.send(&req).and_then(Response::error_for_status) {
            Ok(_) => info!(address = %address, session_id = %masked, "session discarded"),
            Err(e) => warn!(
                address = %address,
                session_id = %masked,
                error = %e,
                "failed to discard session, leaving it to expire"
            ),
        }
    }
}

impl<T: Transport> Drop for SessionManager<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
