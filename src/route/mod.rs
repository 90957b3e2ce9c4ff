//! Route registry (spec §4.2, C2) — grounded in
//! `route_registry/router_registry.py`'s literal/dynamic split.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use crate::cache::LruCache;
use crate::engine::{Handler, WsHandler};
use crate::http::response::HandlerOutput;
use crate::middleware::RateLimiter;
use crate::worker::Lane;

/// Per-route decorator configuration, composed at registration time (§9):
/// which lane the handler runs on, an optional private rate limiter, and an
/// optional private result cache. Each registered route gets its own
/// instances — a rate limit or cache on one route never leaks into another.
#[derive(Clone, Default)]
pub struct RouteOptions {
    pub lane: Lane,
    pub rate_limit: Option<(usize, Duration)>,
    pub cache_capacity: Option<usize>,
}

#[derive(Clone)]
pub struct HttpRoute {
    pub handler: Handler,
    pub methods: Vec<String>,
    pub protected: bool,
    pub lane: Lane,
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub cache: Option<Arc<LruCache<HandlerOutput>>>,
}

impl HttpRoute {
    fn new(handler: Handler, methods: Vec<String>, protected: bool, options: RouteOptions) -> Self {
        Self {
            handler,
            methods,
            protected,
            lane: options.lane,
            rate_limiter: options
                .rate_limit
                .map(|(max_calls, interval)| Arc::new(RateLimiter::new(max_calls, interval))),
            cache: options.cache_capacity.map(|cap| Arc::new(LruCache::new(cap))),
        }
    }
}

struct DynamicRoute {
    regex: Regex,
    original: String,
    route: HttpRoute,
}

/// Static and parameterised HTTP routes, plus WebSocket routes, populated
/// once at startup and treated as immutable during serving (§5).
#[derive(Clone, Default)]
pub struct RouteRegistry {
    literal: HashMap<String, HttpRoute>,
    dynamic: Vec<Arc<DynamicRoute>>,
    websockets: HashMap<String, WsHandler>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// A literal path was registered twice — a programmer error (§4.2).
    DuplicateLiteral(String),
}

impl std::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterError::DuplicateLiteral(path) => {
                write!(f, "route '{path}' is already registered")
            }
        }
    }
}

impl std::error::Error for RegisterError {}

pub struct Resolved<'a> {
    pub route: &'a HttpRoute,
    pub params: HashMap<String, String>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate `<name>` placeholders into `(?P<name>[^/]+)`, anchored at
    /// both ends, per §4.2.
    fn pattern_to_regex(path: &str) -> Regex {
        let mut out = String::from("^");
        let mut chars = path.char_indices().peekable();
        let bytes = path.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'<' {
                if let Some(end) = path[i..].find('>') {
                    let name = &path[i + 1..i + end];
                    out.push_str(&format!("(?P<{name}>[^/]+)"));
                    i += end + 1;
                    continue;
                }
            }
            let ch = path[i..].chars().next().unwrap();
            out.push(ch);
            i += ch.len_utf8();
        }
        let _ = &mut chars;
        out.push('$');
        Regex::new(&out).expect("generated route regex is always valid")
    }

    fn is_dynamic(path: &str) -> bool {
        path.contains('<') && path.contains('>')
    }

    pub fn register_http(
        &mut self,
        path: &str,
        handler: Handler,
        methods: Vec<String>,
        protected: bool,
        options: RouteOptions,
    ) -> Result<(), RegisterError> {
        let route = HttpRoute::new(handler, methods, protected, options);
        if Self::is_dynamic(path) {
            let regex = Self::pattern_to_regex(path);
            self.dynamic.push(Arc::new(DynamicRoute {
                regex,
                original: path.to_string(),
                route,
            }));
            Ok(())
        } else {
            if self.literal.contains_key(path) {
                return Err(RegisterError::DuplicateLiteral(path.to_string()));
            }
            self.literal.insert(path.to_string(), route);
            Ok(())
        }
    }

    /// Register a WebSocket route. Unlike `register_http`, the handler is
    /// handed ownership of the live, already-upgraded connection (§3, §4.5)
    /// rather than a map of path parameters — it runs its own protocol until
    /// it decides to return.
    pub fn register_websocket(&mut self, path: &str, handler: WsHandler) {
        self.websockets.insert(path.to_string(), handler);
    }

    /// Literal lookup first (O(1)), then a linear scan of dynamic patterns
    /// in insertion order; literal always wins over any dynamic match (§4.2).
    pub fn resolve_http(&self, path: &str) -> Option<Resolved<'_>> {
        if let Some(route) = self.literal.get(path) {
            return Some(Resolved {
                route,
                params: HashMap::new(),
            });
        }
        for dynamic in &self.dynamic {
            if let Some(caps) = dynamic.regex.captures(path) {
                let params = dynamic
                    .regex
                    .capture_names()
                    .flatten()
                    .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
                    .collect();
                return Some(Resolved {
                    route: &dynamic.route,
                    params,
                });
            }
        }
        None
    }

    /// Exposed for diagnostics only: original `<name>` pattern of a dynamic
    /// route, in registration order.
    pub fn dynamic_patterns(&self) -> impl Iterator<Item = &str> {
        self.dynamic.iter().map(|d| d.original.as_str())
    }

    pub fn resolve_websocket(&self, path: &str) -> Option<&WsHandler> {
        self.websockets.get(path)
    }
}
