//! Scripted transport for unit tests.

use crate::error::{PortfolioError, Result};
use crate::fetcher::{HttpResponse, Transport};
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// One canned reply.
#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Reply(HttpResponse),
    NetworkFailure,
}

impl Scripted {
    pub(crate) fn status(status: u16, body: &str) -> Self {
        Self::Reply(HttpResponse {
            status,
            body: body.to_string(),
        })
    }

    pub(crate) fn json(value: serde_json::Value) -> Self {
        Self::Reply(HttpResponse {
            status: 200,
            body: value.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub at: Instant,
}

/// Replays a fixed sequence of replies, one per request, and records every
/// request it sees. An exhausted script answers with a network failure.
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls().len()
    }

    /// Time elapsed between consecutive requests
    pub(crate) fn gaps(&self) -> Vec<Duration> {
        self.calls()
            .windows(2)
            .map(|w| w[1].at.duration_since(w[0].at))
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(&'a str, &'a str)],
    ) -> BoxFuture<'a, Result<HttpResponse>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Call {
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                at: Instant::now(),
            });
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());

        Box::pin(async move {
            match next {
                Some(Scripted::Reply(response)) => Ok(response),
                Some(Scripted::NetworkFailure) => {
                    Err(PortfolioError::Network("connection reset".into()))
                }
                None => Err(PortfolioError::Network("script exhausted".into())),
            }
        })
    }
}
