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

use std::env;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use super::error::*;

const DEFAULT_RETRY_INTERVAL_SECS: u64 = 300;
const DEFAULT_RETRY_COUNT: u32 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TOKEN_REVEAL: usize = 12;

static RETRY_INTERVAL_VAR_NAME: &str = "ARRAYMGMT_RETRY_INTERVAL";
static RETRY_COUNT_VAR_NAME: &str = "ARRAYMGMT_RETRY_COUNT";
static VERIFY_TLS_VAR_NAME: &str = "ARRAYMGMT_VERIFY_TLS";
static TIMEOUT_VAR_NAME: &str = "ARRAYMGMT_TIMEOUT";

/// How HTTP 503 replies are retried.
///
/// `max_retries` counts retries after the first attempt: with the default
/// of 5 a request is sent at most 6 times, sleeping `interval` before each
/// retry.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    #[serde(rename = "retry_interval", deserialize_with = "secs_to_duration")]
    pub interval: Duration,
    #[serde(rename = "retry_count")]
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
            max_retries: DEFAULT_RETRY_COUNT,
        }
    }
}

/// Process-wide client settings. Configured once per run and shared by
/// every session and request.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    #[serde(flatten)]
    pub retry: RetryPolicy,
    /// Verify the array's TLS certificate. Arrays ship self-signed
    /// certificates, so this is off unless asked for.
    pub verify_tls: bool,
    #[serde(deserialize_with = "secs_to_duration")]
    pub timeout: Duration,
    /// Trailing token characters left readable in log lines.
    pub token_reveal: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            retry: RetryPolicy::default(),
            verify_tls: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token_reveal: DEFAULT_TOKEN_REVEAL,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `ARRAYMGMT_RETRY_INTERVAL` (seconds),
    /// `ARRAYMGMT_RETRY_COUNT`, `ARRAYMGMT_VERIFY_TLS` and
    /// `ARRAYMGMT_TIMEOUT` (seconds).
    ///
    /// # Errors
    ///
    ///  * [`ArrayError::InvalidArgument`][1]: a variable is set but does not
    ///    parse.
    ///
    /// [1]: enum.ArrayError.html#variant.InvalidArgument
    pub fn from_env() -> Result<ClientConfig> {
        let mut cfg = ClientConfig::default();
        if let Some(v) = env_var(RETRY_INTERVAL_VAR_NAME) {
            cfg.retry.interval = Duration::from_secs(parse_var(RETRY_INTERVAL_VAR_NAME, &v)?);
        }
        if let Some(v) = env_var(RETRY_COUNT_VAR_NAME) {
            cfg.retry.max_retries = parse_var(RETRY_COUNT_VAR_NAME, &v)?;
        }
        if let Some(v) = env_var(VERIFY_TLS_VAR_NAME) {
            cfg.verify_tls = parse_bool(VERIFY_TLS_VAR_NAME, &v)?;
        }
        if let Some(v) = env_var(TIMEOUT_VAR_NAME) {
            cfg.timeout = Duration::from_secs(parse_var(TIMEOUT_VAR_NAME, &v)?);
        }
        Ok(cfg)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> ClientConfig {
        self.retry = retry;
        self
    }
}

fn env_var(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        ArrayError::InvalidArgument(format!(
            "Invalid value '{}' for {}: {}",
            value, name, e
        ))
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ArrayError::InvalidArgument(format!(
            "Invalid value '{}' for {}, expecting a boolean",
            value, name
        ))),
    }
}

fn secs_to_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> ::std::result::Result<Duration, D::Error> {
    let secs: u64 = Deserialize::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}
