#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::{Value, json};

use chemfetch::app::{Phase, ProgressEvent, ProgressSink};
use chemfetch::config::{Config, ConfigLoader, RetryPolicy, Settings};
use chemfetch::error::ChemFetchError;
use chemfetch::remote::{RawResponse, RemoteClient, Transport};

pub const BASE_URL: &str = "http://pubchem.test/rest/pug";

#[derive(Clone)]
pub enum Scripted {
    Respond(RawResponse),
    Delayed(Duration, RawResponse),
    Unreachable(String),
}

struct Route {
    fragment: String,
    script: VecDeque<Scripted>,
}

/// Serves scripted responses for any URL containing a registered fragment.
/// The last scripted response of a route repeats once the others are used.
#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, fragment: &str, script: Vec<Scripted>) -> Self {
        self.routes.lock().unwrap().push(Route {
            fragment: fragment.to_string(),
            script: script.into(),
        });
        self
    }

    pub fn respond(self, fragment: &str, response: RawResponse) -> Self {
        self.route(fragment, vec![Scripted::Respond(response)])
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of requests observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls_matching(&self, fragment: &str) -> usize {
        self.calls()
            .iter()
            .filter(|url| url.contains(fragment))
            .count()
    }

    fn next(&self, url: &str) -> Scripted {
        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes
            .iter_mut()
            .find(|route| url.contains(&route.fragment))
        else {
            return Scripted::Respond(fault(404, "PUGREST.NotFound", "No route in stub"));
        };
        if route.script.len() > 1 {
            route.script.pop_front().unwrap()
        } else {
            route.script.front().cloned().unwrap()
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, url: &Url) -> Result<RawResponse, ChemFetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        let outcome = match self.next(url.as_str()) {
            Scripted::Respond(response) => Ok(response),
            Scripted::Delayed(delay, response) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Scripted::Unreachable(message) => Err(ChemFetchError::Transport(message)),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// Defaults pointed at the stub, with millisecond-scale polling and retries.
pub fn test_settings() -> Settings {
    let mut settings = ConfigLoader::resolve_config(Config {
        base_url: Some(BASE_URL.to_string()),
        properties: Some(vec![
            "MolecularFormula".to_string(),
            "MolecularWeight".to_string(),
        ]),
        ..Config::default()
    })
    .unwrap();
    settings.poll.interval = Duration::from_millis(1);
    settings.poll.deadline = Duration::from_secs(5);
    settings.request_timeout = Duration::from_secs(5);
    settings.retry = RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
    };
    settings
}

pub fn client(transport: StubTransport, settings: &Settings) -> RemoteClient<StubTransport> {
    RemoteClient::new(transport, settings).unwrap()
}

pub fn json_response(status: u16, body: Value) -> RawResponse {
    RawResponse::new(status, body.to_string().into_bytes())
}

pub fn ok(body: Value) -> RawResponse {
    json_response(200, body)
}

pub fn cids(ids: &[u64]) -> RawResponse {
    ok(json!({"IdentifierList": {"CID": ids}}))
}

pub fn waiting(list_key: &str) -> RawResponse {
    json_response(
        202,
        json!({"Waiting": {"ListKey": list_key, "Message": "Your request is running"}}),
    )
}

pub fn fault(status: u16, code: &str, message: &str) -> RawResponse {
    json_response(
        status,
        json!({"Fault": {"Code": code, "Message": message}}),
    )
}

pub fn smiles(cid: u64, smiles: &str) -> RawResponse {
    ok(json!({"PropertyTable": {"Properties": [{"CID": cid, "CanonicalSMILES": smiles}]}}))
}

pub fn properties(cid: u64, formula: &str, weight: &str) -> RawResponse {
    ok(json!({"PropertyTable": {"Properties": [{
        "CID": cid,
        "MolecularFormula": formula,
        "MolecularWeight": weight
    }]}}))
}

pub fn smiles_path(cid: u64) -> String {
    format!("/compound/cid/{cid}/property/CanonicalSMILES/JSON")
}

pub fn properties_path(cid: u64) -> String {
    format!("/compound/cid/{cid}/property/MolecularFormula,MolecularWeight/JSON")
}

pub const SUBMIT_PATH: &str = "/compound/similarity/smiles/";

pub fn poll_path(list_key: &str) -> String {
    format!("/compound/listkey/{list_key}/cids/JSON")
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn phases(&self) -> Vec<Phase> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.phase)
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}
