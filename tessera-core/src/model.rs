use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration derived from one discovery snapshot.
///
/// Keys are `backend-{service}` and `frontend-{service}`; maps are ordered so
/// the rendered output is stable between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedConfiguration {
    #[serde(default)]
    pub backends: BTreeMap<String, Backend>,
    #[serde(default)]
    pub frontends: BTreeMap<String, Frontend>,
}

/// Server pool for one service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Backend {
    /// `server-{name}{id}` → server.
    #[serde(default)]
    pub servers: BTreeMap<String, Server>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer: Option<LoadBalancer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_breaker: Option<CircuitBreaker>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_conn: Option<MaxConn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// `{protocol}://{host}:{port}`
    pub url: String,
    pub weight: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    /// Balancing method: "wrr" or "drr".
    pub method: String,

    /// Legacy stickiness flag.
    #[serde(default)]
    pub sticky: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stickiness: Option<Stickiness>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stickiness {
    pub cookie_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    /// 0 means "the server's own port".
    pub port: i64,
    pub interval: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreaker {
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxConn {
    pub amount: i64,
    pub extractor_func: String,
}

/// Routing side for one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frontend {
    /// Name of the backend requests are forwarded to.
    pub backend: String,

    /// `route-frontend-{service}` → route.
    #[serde(default)]
    pub routes: BTreeMap<String, Route>,

    #[serde(default = "default_pass_host_header")]
    pub pass_host_header: bool,

    #[serde(default)]
    pub pass_tls_cert: bool,

    /// Higher is matched first.
    #[serde(default)]
    pub priority: i64,

    #[serde(default)]
    pub entry_points: Vec<String>,

    /// `user:hash` entries.
    #[serde(default)]
    pub basic_auth: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub rule: String,
}

fn default_pass_host_header() -> bool {
    true
}

impl DerivedConfiguration {
    pub fn backend_name(service: &str) -> String {
        format!("backend-{service}")
    }

    pub fn frontend_name(service: &str) -> String {
        format!("frontend-{service}")
    }

    pub fn route_name(service: &str) -> String {
        format!("route-frontend-{service}")
    }

    /// Backend for a service, by service name.
    pub fn backend(&self, service: &str) -> Option<&Backend> {
        self.backends.get(&Self::backend_name(service))
    }

    /// Frontend for a service, by service name.
    pub fn frontend(&self, service: &str) -> Option<&Frontend> {
        self.frontends.get(&Self::frontend_name(service))
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty() && self.frontends.is_empty()
    }
}

impl Frontend {
    /// The rule of the first route, which is the only one the assembler emits.
    pub fn rule(&self) -> Option<&str> {
        self.routes.values().next().map(|r| r.rule.as_str())
    }
}
