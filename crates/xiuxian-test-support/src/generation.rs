//! Scripted `GenerationClient` implementations.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Semaphore, watch};
use xiuxian_core::error::GenerationError;
use xiuxian_core::generation::{GenerationClient, GenerationRequest};

#[derive(Debug)]
enum Script {
    Queue(VecDeque<Result<String, GenerationError>>),
    Always(Result<String, GenerationError>),
}

/// Replays canned responses and records every request it receives.
///
/// A queue that runs dry answers with `GenerationError::Upstream`.
#[derive(Debug)]
pub struct ScriptedGenerationClient {
    script: Mutex<Script>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerationClient {
    /// Answers calls with `responses`, in order.
    #[must_use]
    pub fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
        Self::from_script(Script::Queue(responses.into()))
    }

    /// Answers every call with `response`.
    #[must_use]
    pub fn always(response: Result<String, GenerationError>) -> Self {
        Self::from_script(Script::Always(response))
    }

    fn from_script(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Every request received, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_response(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        match &mut *self.script.lock().unwrap_or_else(PoisonError::into_inner) {
            Script::Queue(queue) => queue
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Upstream("script exhausted".into()))),
            Script::Always(response) => response.clone(),
        }
    }
}

#[async_trait]
impl GenerationClient for ScriptedGenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.next_response(request)
    }
}

/// A scripted client whose calls block until the test opens the gate.
///
/// Lets a test act on the controller while a generation call is in flight.
#[derive(Debug)]
pub struct GatedGenerationClient {
    inner: ScriptedGenerationClient,
    gate: Semaphore,
    entered: watch::Sender<usize>,
}

impl GatedGenerationClient {
    /// Answers calls with `responses` once each is let through.
    #[must_use]
    pub fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            inner: ScriptedGenerationClient::new(responses),
            gate: Semaphore::new(0),
            entered: watch::Sender::new(0),
        }
    }

    /// Lets `calls` more calls through.
    pub fn open(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    /// Resolves once `calls` calls in total have reached the gate.
    pub async fn wait_for_calls(&self, calls: usize) {
        let mut entered = self.entered.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = entered.wait_for(|count| *count >= calls).await;
    }

    /// Every request received, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.inner.requests()
    }
}

#[async_trait]
impl GenerationClient for GatedGenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.entered.send_modify(|count| *count += 1);
        self.gate
            .acquire()
            .await
            .map_err(|err| GenerationError::Upstream(err.to_string()))?
            .forget();
        self.inner.next_response(request)
    }
}
