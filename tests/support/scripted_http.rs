#![allow(dead_code)]

use std::cell::RefCell;

use avion_import::http::{HttpClient, HttpRequest, HttpResponse};
use serde_json::Value;

/// Answers requests from a fixed table keyed by method and URL, and keeps
/// every request it saw. Unknown routes fail like an unreachable host.
#[derive(Default)]
pub struct ScriptedHttp {
    routes: Vec<(String, String, Result<HttpResponse, String>)>,
    sent: RefCell<Vec<HttpRequest>>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(self, method: &str, url: &str, status: u16, body: Value) -> Self {
        self.raw(method, url, status, &body.to_string())
    }

    pub fn raw(mut self, method: &str, url: &str, status: u16, body: &str) -> Self {
        self.routes.push((
            method.to_string(),
            url.to_string(),
            Ok(HttpResponse::new(status, body)),
        ));
        self
    }

    pub fn unreachable(mut self, method: &str, url: &str, reason: &str) -> Self {
        self.routes
            .push((method.to_string(), url.to_string(), Err(reason.to_string())));
        self
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.borrow().clone()
    }

    pub fn sent_to(&self, url: &str) -> Vec<HttpRequest> {
        self.sent
            .borrow()
            .iter()
            .filter(|request| request.url == url)
            .cloned()
            .collect()
    }
}

impl HttpClient for ScriptedHttp {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let method = request.method();
        let url = request.url.clone();
        self.sent.borrow_mut().push(request);
        self.routes
            .iter()
            .find(|(m, u, _)| m == method && *u == url)
            .map(|(_, _, result)| result.clone())
            .unwrap_or_else(|| Err(format!("no route for {method} {url}")))
    }
}
