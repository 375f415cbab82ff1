//! Typed, defaulted label lookups.
//!
//! Every lookup funnels through [`raw_label`], which collapses "absent",
//! "present but null" and "present but empty" into `None`. Parsing failures
//! fall back to the caller's default; nothing here returns an error.

use crate::instance::ServiceInstance;

// ── Label keys ────────────────────────────────────────────────

pub const ENABLE: &str = "traefik.enable";
pub const PORT: &str = "traefik.port";
pub const PROTOCOL: &str = "traefik.protocol";
pub const WEIGHT: &str = "traefik.weight";

pub const FRONTEND_RULE: &str = "traefik.frontend.rule";
pub const FRONTEND_PRIORITY: &str = "traefik.frontend.priority";
pub const FRONTEND_ENTRY_POINTS: &str = "traefik.frontend.entryPoints";
pub const FRONTEND_AUTH_BASIC: &str = "traefik.frontend.auth.basic";
pub const FRONTEND_PASS_HOST_HEADER: &str = "traefik.frontend.passHostHeader";
pub const FRONTEND_PASS_TLS_CERT: &str = "traefik.frontend.passTLSCert";

pub const BACKEND_LB_METHOD: &str = "traefik.backend.loadbalancer.method";
/// Deprecated in favour of [`BACKEND_LB_STICKINESS`].
pub const BACKEND_LB_STICKY: &str = "traefik.backend.loadbalancer.sticky";
pub const BACKEND_LB_STICKINESS: &str = "traefik.backend.loadbalancer.stickiness";
pub const BACKEND_LB_STICKINESS_COOKIE_NAME: &str =
    "traefik.backend.loadbalancer.stickiness.cookieName";

pub const BACKEND_HEALTH_CHECK_PATH: &str = "traefik.backend.healthcheck.path";
pub const BACKEND_HEALTH_CHECK_PORT: &str = "traefik.backend.healthcheck.port";
pub const BACKEND_HEALTH_CHECK_INTERVAL: &str = "traefik.backend.healthcheck.interval";

pub const BACKEND_CIRCUIT_BREAKER_EXPRESSION: &str = "traefik.backend.circuitbreaker.expression";

pub const BACKEND_MAX_CONN_AMOUNT: &str = "traefik.backend.maxconn.amount";
pub const BACKEND_MAX_CONN_EXTRACTOR_FUNC: &str = "traefik.backend.maxconn.extractorfunc";

// ── Defaults ──────────────────────────────────────────────────

pub const DEFAULT_PROTOCOL: &str = "http";
pub const DEFAULT_WEIGHT: i64 = 0;
pub const DEFAULT_PASS_HOST_HEADER: bool = true;
pub const DEFAULT_PASS_TLS_CERT: bool = false;
pub const DEFAULT_FRONTEND_PRIORITY: i64 = 0;
pub const DEFAULT_LB_METHOD: &str = "wrr";
pub const DEFAULT_STICKINESS_COOKIE_NAME: &str = "";
pub const DEFAULT_HEALTH_CHECK_PORT: i64 = 0;
pub const DEFAULT_CIRCUIT_BREAKER_EXPRESSION: &str = "NetworkErrorRatio() > 1";
pub const DEFAULT_MAX_CONN_AMOUNT: i64 = i64::MAX;
pub const DEFAULT_MAX_CONN_EXTRACTOR_FUNC: &str = "request.host";

// ── Parsing ───────────────────────────────────────────────────

/// A type a non-empty label value can be parsed into.
///
/// `None` means "unparseable", which callers turn into their default.
pub trait FromLabel: Sized {
    fn from_label(raw: &str) -> Option<Self>;
}

impl FromLabel for String {
    fn from_label(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl FromLabel for bool {
    fn from_label(raw: &str) -> Option<Self> {
        parse_bool(raw)
    }
}

impl FromLabel for i32 {
    fn from_label(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl FromLabel for i64 {
    fn from_label(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl FromLabel for Vec<String> {
    fn from_label(raw: &str) -> Option<Self> {
        let items = split_and_trim(raw, ',');
        if items.is_empty() { None } else { Some(items) }
    }
}

/// Lets a lookup default to "nothing" (`None`) rather than a concrete value.
impl<T: FromLabel> FromLabel for Option<T> {
    fn from_label(raw: &str) -> Option<Self> {
        T::from_label(raw).map(Some)
    }
}

/// Boolean tokens accepted in labels: `1 t T TRUE true True` and
/// `0 f F FALSE false False`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Split on `sep`, trim each piece and drop the empty ones.
pub fn split_and_trim(raw: &str, sep: char) -> Vec<String> {
    raw.split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Lookups ───────────────────────────────────────────────────

/// The label value, or `None` when it is absent, null or empty.
pub fn raw_label<'a>(instance: &'a ServiceInstance, key: &str) -> Option<&'a str> {
    instance
        .labels
        .get(key)
        .and_then(|v| v.as_deref())
        .filter(|v| !v.is_empty())
}

/// Resolve `key` on one instance, falling back to `default`.
pub fn resolve<T: FromLabel>(instance: &ServiceInstance, key: &str, default: T) -> T {
    raw_label(instance, key)
        .and_then(T::from_label)
        .unwrap_or(default)
}

/// Resolve `key` on the first instance of a group only.
///
/// Backend-wide settings are defined once per service; when instances
/// disagree the first discovered one wins. An empty group yields `default`.
pub fn resolve_first<T: FromLabel>(group: &[ServiceInstance], key: &str, default: T) -> T {
    match group.first() {
        Some(first) => resolve(first, key, default),
        None => default,
    }
}

/// Whether the instance should be exposed at all.
pub fn is_enabled(instance: &ServiceInstance, exposed_by_default: bool) -> bool {
    resolve(instance, ENABLE, exposed_by_default)
}
