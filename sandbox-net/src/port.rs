//! Port registry and virtual HTTP dispatch (`spec.md` §4.8 "Port
//! registry"), independent of namespaces.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// A virtual HTTP request delivered to a registered handler.
#[derive(Clone, Debug, Default)]
pub struct Request
{
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A virtual HTTP response, populated by a handler.
#[derive(Clone, Debug, Default)]
pub struct Response
{
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A registered port handler: synchronous, or completing lazily via a
/// done-promise (`spec.md` §4.8: "a function (virtual-request,
/// virtual-response) → (sync or lazily completing via a done-promise)").
/// Represented as a plain closure returning the finished response, since
/// this workspace has no async runtime (SPEC_FULL.md §10); "lazily
/// completing" handlers simply block the calling thread until their
/// closure returns, matching the cooperative single-threaded model of
/// `spec.md` §5.
pub type Handler = dyn Fn(Request) -> Response + Send + Sync;

/// Maps listening ports to handlers (`spec.md` §4.8). Guarded by a mutex
/// so `listen`/`close`/`get` are race-free with concurrent dispatch, as
/// required by `spec.md` §5 "Shared resources".
#[derive(Clone, Default)]
pub struct PortRegistry
{
    handlers: Arc<Mutex<HashMap<u16, Arc<Handler>>>>,
}

impl PortRegistry
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Insert a handler for `port`, replacing any existing one
    /// (`spec.md` §4.8).
    pub fn listen(&self, port: u16, handler: Arc<Handler>)
    {
        self.handlers.lock().unwrap().insert(port, handler);
    }

    pub fn close(&self, port: u16)
    {
        self.handlers.lock().unwrap().remove(&port);
    }

    pub fn is_listening(&self, port: u16) -> bool
    {
        self.handlers.lock().unwrap().contains_key(&port)
    }

    /// Dispatch `request` to the handler listening on `port`, if any.
    /// `spec.md` §4.8: "invoke the handler synchronously, await its
    /// done-promise if any, then deliver the populated response."
    pub fn dispatch(&self, port: u16, request: Request) -> Option<Response>
    {
        let handler = self.handlers.lock().unwrap().get(&port).cloned()?;
        Some(handler(request))
    }
}

/// A virtual HTTP client: routes `localhost`/`127.0.0.1` requests to the
/// [`PortRegistry`], falling through to an external fetcher for anything
/// else (`spec.md` §4.8).
pub struct VirtualHttpClient
{
    registry: PortRegistry,
    external_fetch: Option<Arc<dyn Fn(&str, Request) -> Response + Send + Sync>>,
}

impl VirtualHttpClient
{
    pub fn new(registry: PortRegistry) -> Self
    {
        Self { registry, external_fetch: None }
    }

    /// Install the fallback used for hosts the port registry doesn't
    /// cover (`spec.md` §4.8 "fall through to an external fetch via the
    /// host"). Left unset by default: an unset fallback makes a fetch to
    /// a real host an explicit opt-in rather than a silent network call,
    /// matching `spec.md` §1's sandboxing intent.
    pub fn with_external_fetch(mut self, fetch: Arc<dyn Fn(&str, Request) -> Response + Send + Sync>) -> Self
    {
        self.external_fetch = Some(fetch);
        self
    }

    pub fn request(&self, host: &str, port: u16, req: Request) -> Response
    {
        let is_local = host == "localhost" || host == "127.0.0.1";
        if is_local {
            if let Some(response) = self.registry.dispatch(port, req.clone()) {
                return response;
            }
        }
        match &self.external_fetch {
            Some(fetch) => fetch(host, req),
            None => Response { status: 502, headers: Vec::new(), body: b"no route to host".to_vec() },
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn listen_then_dispatch_invokes_handler()
    {
        let registry = PortRegistry::new();
        registry.listen(8080, Arc::new(|req| Response { status: 200, headers: Vec::new(), body: format!("got {}", req.path).into_bytes() }));
        let response = registry.dispatch(8080, Request { method: "GET".to_string(), path: "/x".to_string(), ..Default::default() }).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"got /x");
    }

    #[test]
    fn close_removes_the_handler()
    {
        let registry = PortRegistry::new();
        registry.listen(80, Arc::new(|_| Response::default()));
        registry.close(80);
        assert!(!registry.is_listening(80));
    }

    #[test]
    fn listen_replaces_existing_handler()
    {
        let registry = PortRegistry::new();
        registry.listen(80, Arc::new(|_| Response { status: 1, ..Default::default() }));
        registry.listen(80, Arc::new(|_| Response { status: 2, ..Default::default() }));
        let response = registry.dispatch(80, Request::default()).unwrap();
        assert_eq!(response.status, 2);
    }

    #[test]
    fn localhost_request_to_unregistered_port_falls_through_to_external_fetch()
    {
        let registry = PortRegistry::new();
        let client = VirtualHttpClient::new(registry).with_external_fetch(Arc::new(|host, _| Response { status: 200, headers: Vec::new(), body: host.as_bytes().to_vec() }));
        let response = client.request("localhost", 9999, Request::default());
        assert_eq!(response.body, b"localhost");
    }

    #[test]
    fn request_to_registered_localhost_port_never_reaches_external_fetch()
    {
        let registry = PortRegistry::new();
        registry.listen(80, Arc::new(|_| Response { status: 200, ..Default::default() }));
        let client = VirtualHttpClient::new(registry).with_external_fetch(Arc::new(|_, _| panic!("should not be called")));
        let response = client.request("localhost", 80, Request::default());
        assert_eq!(response.status, 200);
    }
}
