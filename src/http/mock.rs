//! Scripted in-memory transport
//!
//! Replies are registered per method and URL. Several replies for the
//! same route are served in order and the last one repeats. Requests
//! with no scripted route fail as connection errors, the same shape a
//! missing host produces.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use super::request::{HttpRequest, HttpResponse, Method};
use super::transport::{Transport, TransportError};

#[derive(Debug, Clone)]
enum Reply {
    Response(HttpResponse),
    Failure(TransportError),
}

#[derive(Debug)]
struct Route {
    method: Method,
    url: String,
    replies: VecDeque<Reply>,
}

/// Transport that answers from a fixed script and records what it was sent
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to `method url` with a raw body
    pub fn on(self, method: Method, url: &str, status: u16, body: &str) -> Self {
        self.push(method, url, Reply::Response(HttpResponse::new(status, body)))
    }

    /// Reply to `method url` with a JSON body
    pub fn on_json(self, method: Method, url: &str, status: u16, body: Value) -> Self {
        self.push(
            method,
            url,
            Reply::Response(HttpResponse::new(status, body.to_string())),
        )
    }

    /// Fail `method url` at the transport level
    pub fn on_failure(self, method: Method, url: &str, error: TransportError) -> Self {
        self.push(method, url, Reply::Failure(error))
    }

    /// Every request sent so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.sent).clone()
    }

    fn push(self, method: Method, url: &str, reply: Reply) -> Self {
        {
            let mut routes = lock(&self.routes);
            match routes.iter_mut().find(|r| r.method == method && r.url == url) {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    method,
                    url: url.to_string(),
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    fn next_reply(&self, request: &HttpRequest) -> Option<Reply> {
        let mut routes = lock(&self.routes);
        let route = routes
            .iter_mut()
            .find(|r| r.method == request.method && r.url == request.url)?;
        if route.replies.len() > 1 {
            route.replies.pop_front()
        } else {
            route.replies.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        lock(&self.sent).push(request.clone());

        match self.next_reply(request) {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Failure(error)) => Err(error),
            None => Err(TransportError::Connect(format!(
                "no scripted reply for {} {}",
                request.method, request.url
            ))),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::RequestBody;

    fn get(url: &str) -> HttpRequest {
        HttpRequest {
            method: Method::Get,
            url: url.to_string(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    #[tokio::test]
    async fn test_replies_in_order_then_repeat_last() {
        let transport = ScriptedTransport::new()
            .on(Method::Get, "http://t/a", 500, "boom")
            .on(Method::Get, "http://t/a", 200, "ok");

        assert_eq!(transport.send(&get("http://t/a")).await.unwrap().status, 500);
        assert_eq!(transport.send(&get("http://t/a")).await.unwrap().status, 200);
        assert_eq!(transport.send(&get("http://t/a")).await.unwrap().status, 200);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_unscripted_route_is_connect_error() {
        let transport = ScriptedTransport::new();
        let err = transport.send(&get("http://t/missing")).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }

    #[tokio::test]
    async fn test_method_is_part_of_route() {
        let transport = ScriptedTransport::new().on(Method::Post, "http://t/a", 201, "");
        assert!(transport.send(&get("http://t/a")).await.is_err());
    }
}
