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

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::error::*;
use super::session::{EndpointIdentity, Session, SessionManager};
use super::transport::{HttpTransport, Method, Request, Response, Transport};

const JOB_PATH: &str = "/ConfigurationManager/v1/objects/jobs";
const JOB_RETRY_INTERVAL: u64 = 1;
const JOB_MAX_POLLS: u32 = 3600;

const JOB_STATUS_COMPLETED: &str = "Completed";
const JOB_STATE_FAILED: &str = "Failed";

/// Asynchronous job created by a mutating request.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: u64,
    /// `Initializing`, `Running` or `Completed`.
    pub status: String,
    /// `Succeeded` or `Failed` once completed.
    #[serde(default)]
    pub state: Option<String>,
    /// REST paths of the objects the job created or touched.
    #[serde(default)]
    pub affected_resources: Vec<String>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl Job {
    fn is_completed(&self) -> bool {
        self.status == JOB_STATUS_COMPLETED
    }

    fn into_result(self) -> Result<Job> {
        if self.state.as_deref() != Some(JOB_STATE_FAILED) {
            return Ok(self);
        }
        let detail = match self.error {
            Some(ref e) => ApiErrorBody::parse(&e.to_string())
                .map(|b| format!("{}", b))
                .unwrap_or_else(|| e.to_string()),
            None => "no error detail".to_string(),
        };
        Err(ArrayError::JobFailed(format!(
            "Job {} failed: {}",
            self.job_id, detail
        )))
    }
}

/// Authenticated connection to one array.
///
/// Borrows the [`SessionManager`][1] of the run; the session is acquired
/// lazily on the first request and shared with every other client of the
/// same endpoint.
///
/// [1]: struct.SessionManager.html
pub struct Client<'a, T: Transport = HttpTransport> {
    manager: &'a SessionManager<T>,
    endpoint: EndpointIdentity,
}

impl<'a, T: Transport> Client<'a, T> {
    pub fn new(manager: &'a SessionManager<T>, endpoint: EndpointIdentity) -> Client<'a, T> {
        Client { manager, endpoint }
    }

    pub fn endpoint(&self) -> &EndpointIdentity {
        &self.endpoint
    }

    /// Session currently used by this client, logging in if needed.
    pub fn session(&self) -> Result<Arc<Session>> {
        self.manager.acquire(&self.endpoint)
    }

    /// Send an authenticated request to the array.
    ///
    /// HTTP 503 is retried following the configured retry policy. On HTTP
    /// 401 the session is renewed once and the request sent again.
    ///
    /// # Errors
    ///
    /// Non-2xx replies are returned as errors carrying the array's
    /// structured message when the body has one.
    pub fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response> {
        let ctx = format!("{} {} on {}", method, path, self.endpoint.address());
        let url = self.endpoint.url(path)?;
        let session = self.manager.acquire(&self.endpoint)?;
        let mut reply = self.send(method, &url, &session, body).map_err(|e| e.context(&ctx))?;
        if reply.status == HTTP_UNAUTHORIZED {
            warn!(method = %method, path, "session rejected by array, renewing");
            let session = self.manager.renew(&self.endpoint, &session)?;
            reply = self.send(method, &url, &session, body).map_err(|e| e.context(&ctx))?;
        }
        reply.error_for_status().map_err(|e| e.context(&ctx))
    }

    /// `GET` returning the JSON body.
    pub fn get(&self, path: &str) -> Result<Value> {
        Ok(self.request(Method::Get, path, None)?.json()?.clone())
    }

    /// `POST` and wait for the resulting job, if any.
    pub fn post(&self, path: &str, body: &Value) -> Result<Option<Job>> {
        self.mutate(Method::Post, path, Some(body))
    }

    /// `PATCH` and wait for the resulting job, if any.
    pub fn patch(&self, path: &str, body: &Value) -> Result<Option<Job>> {
        self.mutate(Method::Patch, path, Some(body))
    }

    /// `DELETE` and wait for the resulting job, if any.
    pub fn delete(&self, path: &str) -> Result<Option<Job>> {
        self.mutate(Method::Delete, path, None)
    }

    fn mutate(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Option<Job>> {
        let reply = self.request(method, path, body)?;
        let val = reply.json()?;
        if val.get("jobId").is_none() {
            return Ok(None);
        }
        let job: Job = serde_json::from_value(val.clone())?;
        let job = if job.is_completed() {
            job
        } else {
            self.wait_job(job.job_id)?
        };
        job.into_result()
            .map(Some)
            .map_err(|e| e.context(&format!("{} {}", method, path)))
    }

    fn wait_job(&self, job_id: u64) -> Result<Job> {
        let path = format!("{}/{}", JOB_PATH, job_id);
        for _ in 0..JOB_MAX_POLLS {
            let j: Job = serde_json::from_value(self.get(&path)?)?;
            if j.is_completed() {
                return Ok(j);
            }
            debug!(job_id, status = %j.status, "job in progress");
            self.manager.sleep(Duration::from_secs(JOB_RETRY_INTERVAL));
        }
        Err(ArrayError::TimeOut(format!(
            "Job {} did not complete after {} polls",
            job_id, JOB_MAX_POLLS
        )))
    }

    fn send(
        &self,
        method: Method,
        url: &Url,
        session: &Session,
        body: Option<&Value>,
    ) -> Result<Response> {
        let req = Request {
            method,
            url,
            auth: session.auth(),
            body,
        };
        self.manager.send_with_retry(&req)
    }
}
