//! In-memory transport for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::gateway::classifier::RawFailure;
use crate::gateway::transport::{AuthScope, Transport, TransportResponse};

type Scripted = Result<TransportResponse, RawFailure>;

/// Replays scripted outcomes per path. The last outcome for a path repeats.
/// Unscripted paths answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: AtomicU32,
    log: Mutex<Vec<(String, AuthScope)>>,
}

pub fn ok(body: &str) -> Scripted {
    status(200, body)
}

pub fn status(code: u16, body: &str) -> Scripted {
    Ok(TransportResponse {
        status: code,
        retry_after: None,
        body: body.to_string(),
    })
}

pub fn approved_body(id: &str) -> String {
    format!(
        r#"{{"data":{{"id":"{}","status":"APPROVED","amount_in_cents":50000,"currency":"COP",
            "reference":"order-1","created_at":"2024-03-01T15:04:05Z",
            "payment_method":{{"type":"CARD","extra":{{"brand":"VISA"}},"installments":1}}}}}}"#,
        id
    )
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, path: &str, outcomes: Vec<Scripted>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), outcomes.into_iter().collect());
        self
    }

    pub fn delay(self, path: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(path.to_string(), delay);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, AuthScope)> {
        self.log.lock().unwrap().clone()
    }

    fn next(&self, path: &str) -> Scripted {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(path) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| status(404, "")),
            None => status(404, ""),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, segments: &[&str], auth: AuthScope) -> Result<TransportResponse, RawFailure> {
        let path = segments.join("/");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push((path.clone(), auth));

        let delay = self.delays.lock().unwrap().get(&path).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.next(&path)
    }
}
