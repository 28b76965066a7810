//! Test doubles for the retrieval and generation collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;

use flowfusion_core::error::{FlowError, Result};
use flowfusion_core::traits::{Generator, Retriever};

fn owned<I, S>(passages: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    passages.into_iter().map(Into::into).collect()
}

/// Returns the same passages for every query and records what it was asked.
pub struct StaticRetriever {
    passages: Vec<String>,
    queries: Mutex<Vec<(String, usize)>>,
}

impl StaticRetriever {
    pub fn new<I, S>(passages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            passages: owned(passages),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Every `(text, top_k)` pair received, in call order.
    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

impl Retriever for StaticRetriever {
    fn query(&self, text: &str, top_k: usize) -> BoxFuture<'_, Result<Vec<String>>> {
        self.queries.lock().unwrap().push((text.to_string(), top_k));
        let passages = self.passages.iter().take(top_k).cloned().collect();
        Box::pin(async move { Ok(passages) })
    }
}

/// Fails every query with `FlowError::Retrieval`.
pub struct FailingRetriever {
    message: String,
    calls: AtomicUsize,
}

impl FailingRetriever {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Retriever for FailingRetriever {
    fn query(&self, _text: &str, _top_k: usize) -> BoxFuture<'_, Result<Vec<String>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let message = self.message.clone();
        Box::pin(async move { Err(FlowError::Retrieval(message)) })
    }
}

/// Sleeps before answering. Pair with a paused clock.
pub struct DelayedRetriever {
    delay: Duration,
    passages: Vec<String>,
}

impl DelayedRetriever {
    pub fn new<I, S>(delay: Duration, passages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            delay,
            passages: owned(passages),
        }
    }
}

impl Retriever for DelayedRetriever {
    fn query(&self, _text: &str, top_k: usize) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(self.passages.iter().take(top_k).cloned().collect())
        })
    }
}

/// Answers with a fixed reply and records every `(system, user)` prompt pair.
pub struct RecordingGenerator {
    reply: String,
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Generator for RecordingGenerator {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> BoxFuture<'_, Result<String>> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));
        let reply = self.reply.clone();
        Box::pin(async move { Ok(reply) })
    }
}

/// Fails every completion with `FlowError::LlmRequest`.
pub struct FailingGenerator {
    message: String,
}

impl FailingGenerator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Generator for FailingGenerator {
    fn complete(&self, _system: &str, _user: &str) -> BoxFuture<'_, Result<String>> {
        let message = self.message.clone();
        Box::pin(async move { Err(FlowError::LlmRequest(message)) })
    }
}

/// Sleeps before answering.
pub struct DelayedGenerator {
    delay: Duration,
    reply: String,
}

impl DelayedGenerator {
    pub fn new(delay: Duration, reply: impl Into<String>) -> Self {
        Self {
            delay,
            reply: reply.into(),
        }
    }
}

impl Generator for DelayedGenerator {
    fn complete(&self, _system: &str, _user: &str) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(self.reply.clone())
        })
    }
}

/// Reports no credential. Counts calls so tests can assert it was never invoked.
#[derive(Default)]
pub struct NotConfiguredGenerator {
    calls: AtomicUsize,
}

impl NotConfiguredGenerator {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Generator for NotConfiguredGenerator {
    fn complete(&self, _system: &str, _user: &str) -> BoxFuture<'_, Result<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err(FlowError::Config("no credential".into())) })
    }

    fn is_configured(&self) -> bool {
        false
    }
}
