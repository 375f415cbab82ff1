//! Named accessor table handed to the renderer.
//!
//! Built once per [`ProviderConfig`], immutable thereafter. Each entry binds
//! one label key and its default to a typed lookup, so a template can ask
//! for `get_load_balancer_method` without knowing label names.

use crate::config::ProviderConfig;
use crate::dedup::dedupe_by_name;
use crate::error::DeriveError;
use crate::instance::ServiceInstance;
use crate::label::{self, FromLabel, raw_label, resolve, resolve_first};
use crate::notice::NoticeSink;
use crate::presence;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Stable accessor names.
pub mod names {
    pub const FILTER_FRONTENDS: &str = "filter_frontends";
    pub const IS_ENABLED: &str = "is_enabled";
    pub const GET_FRONTEND_RULE: &str = "get_frontend_rule";
    pub const GET_BASIC_AUTH: &str = "get_basic_auth";
    pub const HAS_LOAD_BALANCER_LABEL: &str = "has_load_balancer_label";
    pub const GET_LOAD_BALANCER_METHOD: &str = "get_load_balancer_method";
    pub const GET_STICKY: &str = "get_sticky";
    pub const HAS_STICKINESS_LABEL: &str = "has_stickiness_label";
    pub const GET_STICKINESS_COOKIE_NAME: &str = "get_stickiness_cookie_name";
    pub const GET_PROTOCOL: &str = "get_protocol";
    pub const GET_HOST: &str = "get_host";
    pub const GET_PORT: &str = "get_port";
    pub const GET_WEIGHT: &str = "get_weight";
    pub const GET_PASS_HOST_HEADER: &str = "get_pass_host_header";
    pub const GET_PASS_TLS_CERT: &str = "get_pass_tls_cert";
    pub const GET_PRIORITY: &str = "get_priority";
    pub const GET_ENTRY_POINTS: &str = "get_entry_points";
    pub const HAS_HEALTH_CHECK_LABELS: &str = "has_health_check_labels";
    pub const GET_HEALTH_CHECK_PATH: &str = "get_health_check_path";
    pub const GET_HEALTH_CHECK_PORT: &str = "get_health_check_port";
    pub const GET_HEALTH_CHECK_INTERVAL: &str = "get_health_check_interval";
    pub const HAS_CIRCUIT_BREAKER_LABEL: &str = "has_circuit_breaker_label";
    pub const GET_CIRCUIT_BREAKER_EXPRESSION: &str = "get_circuit_breaker_expression";
    pub const HAS_MAX_CONN_LABELS: &str = "has_max_conn_labels";
    pub const GET_MAX_CONN_AMOUNT: &str = "get_max_conn_amount";
    pub const GET_MAX_CONN_EXTRACTOR_FUNC: &str = "get_max_conn_extractor_func";
}

/// Value produced by an accessor.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Str(String),
    /// `None` is "nil": the label was not set.
    List(Option<Vec<String>>),
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<Option<Vec<String>>> for FieldValue {
    fn from(v: Option<Vec<String>>) -> Self {
        FieldValue::List(v)
    }
}

impl TryFrom<FieldValue> for bool {
    type Error = FieldValue;
    fn try_from(v: FieldValue) -> Result<Self, Self::Error> {
        match v {
            FieldValue::Bool(b) => Ok(b),
            other => Err(other),
        }
    }
}

impl TryFrom<FieldValue> for i64 {
    type Error = FieldValue;
    fn try_from(v: FieldValue) -> Result<Self, Self::Error> {
        match v {
            FieldValue::Int(n) => Ok(n),
            other => Err(other),
        }
    }
}

impl TryFrom<FieldValue> for String {
    type Error = FieldValue;
    fn try_from(v: FieldValue) -> Result<Self, Self::Error> {
        match v {
            FieldValue::Str(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl TryFrom<FieldValue> for Option<Vec<String>> {
    type Error = FieldValue;
    fn try_from(v: FieldValue) -> Result<Self, Self::Error> {
        match v {
            FieldValue::List(l) => Ok(l),
            other => Err(other),
        }
    }
}

type InstanceFn = Box<dyn Fn(&ServiceInstance) -> Result<FieldValue, DeriveError> + Send + Sync>;
type GroupFn = Box<dyn Fn(&[ServiceInstance]) -> FieldValue + Send + Sync>;
type FilterFn = fn(&[ServiceInstance]) -> Vec<&ServiceInstance>;

/// One entry of the table, by the shape of argument it takes.
pub enum Accessor {
    /// Evaluated against a single instance. Only host/port lookups can fail.
    Instance(InstanceFn),
    /// Evaluated against a whole service group (first instance wins).
    Group(GroupFn),
    /// Narrows a group to a subsequence of its instances.
    Filter(FilterFn),
}

impl Accessor {
    pub fn kind(&self) -> &'static str {
        match self {
            Accessor::Instance(_) => "instance",
            Accessor::Group(_) => "group",
            Accessor::Filter(_) => "filter",
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Accessor::{}", self.kind())
    }
}

/// Name → accessor table.
pub struct FuncTable {
    funcs: HashMap<&'static str, Accessor>,
}

impl FuncTable {
    pub fn new(settings: &ProviderConfig, notices: Arc<dyn NoticeSink>) -> Self {
        let mut funcs: HashMap<&'static str, Accessor> = HashMap::new();

        funcs.insert(names::FILTER_FRONTENDS, Accessor::Filter(filter_frontends));
        funcs.insert(names::IS_ENABLED, {
            let exposed_by_default = settings.exposed_by_default;
            Accessor::Instance(Box::new(move |i: &ServiceInstance| {
                Ok(FieldValue::Bool(label::is_enabled(i, exposed_by_default)))
            }))
        });

        // Frontend
        funcs.insert(names::GET_FRONTEND_RULE, {
            let domain = settings.domain.clone();
            Accessor::Instance(Box::new(move |i: &ServiceInstance| {
                Ok(FieldValue::Str(frontend_rule(i, &domain)))
            }))
        });
        funcs.insert(
            names::GET_BASIC_AUTH,
            instance_value::<Option<Vec<String>>>(label::FRONTEND_AUTH_BASIC, None),
        );
        funcs.insert(
            names::GET_PASS_HOST_HEADER,
            instance_value(label::FRONTEND_PASS_HOST_HEADER, label::DEFAULT_PASS_HOST_HEADER),
        );
        funcs.insert(
            names::GET_PASS_TLS_CERT,
            instance_value(label::FRONTEND_PASS_TLS_CERT, label::DEFAULT_PASS_TLS_CERT),
        );
        funcs.insert(
            names::GET_PRIORITY,
            instance_value(label::FRONTEND_PRIORITY, label::DEFAULT_FRONTEND_PRIORITY),
        );
        funcs.insert(
            names::GET_ENTRY_POINTS,
            instance_value::<Option<Vec<String>>>(label::FRONTEND_ENTRY_POINTS, None),
        );

        // Servers
        funcs.insert(
            names::GET_PROTOCOL,
            instance_value(label::PROTOCOL, label::DEFAULT_PROTOCOL.to_string()),
        );
        funcs.insert(
            names::GET_HOST,
            Accessor::Instance(Box::new(|i: &ServiceInstance| host(i).map(FieldValue::Str))),
        );
        funcs.insert(
            names::GET_PORT,
            Accessor::Instance(Box::new(|i: &ServiceInstance| port(i).map(FieldValue::Str))),
        );
        funcs.insert(names::GET_WEIGHT, instance_value(label::WEIGHT, label::DEFAULT_WEIGHT));

        // Load balancer
        funcs.insert(
            names::HAS_LOAD_BALANCER_LABEL,
            predicate(presence::has_load_balancer_block),
        );
        funcs.insert(
            names::GET_LOAD_BALANCER_METHOD,
            first_value(label::BACKEND_LB_METHOD, label::DEFAULT_LB_METHOD.to_string()),
        );
        funcs.insert(names::GET_STICKY, {
            let notices = Arc::clone(&notices);
            Accessor::Group(Box::new(move |g: &[ServiceInstance]| {
                if presence::has_first(g, label::BACKEND_LB_STICKY) {
                    let service = g.first().map(|i| i.name.as_str()).unwrap_or_default();
                    notices.deprecated_label(
                        service,
                        label::BACKEND_LB_STICKY,
                        label::BACKEND_LB_STICKINESS,
                    );
                }
                FieldValue::Bool(resolve_first(g, label::BACKEND_LB_STICKY, false))
            }))
        });
        funcs.insert(
            names::HAS_STICKINESS_LABEL,
            first_value(label::BACKEND_LB_STICKINESS, false),
        );
        funcs.insert(
            names::GET_STICKINESS_COOKIE_NAME,
            first_value(
                label::BACKEND_LB_STICKINESS_COOKIE_NAME,
                label::DEFAULT_STICKINESS_COOKIE_NAME.to_string(),
            ),
        );

        // Health check
        funcs.insert(
            names::HAS_HEALTH_CHECK_LABELS,
            predicate(presence::has_health_check_block),
        );
        funcs.insert(
            names::GET_HEALTH_CHECK_PATH,
            first_value(label::BACKEND_HEALTH_CHECK_PATH, String::new()),
        );
        funcs.insert(
            names::GET_HEALTH_CHECK_PORT,
            first_value(label::BACKEND_HEALTH_CHECK_PORT, label::DEFAULT_HEALTH_CHECK_PORT),
        );
        funcs.insert(
            names::GET_HEALTH_CHECK_INTERVAL,
            first_value(label::BACKEND_HEALTH_CHECK_INTERVAL, String::new()),
        );

        // Circuit breaker
        funcs.insert(
            names::HAS_CIRCUIT_BREAKER_LABEL,
            predicate(presence::has_circuit_breaker_block),
        );
        funcs.insert(
            names::GET_CIRCUIT_BREAKER_EXPRESSION,
            first_value(
                label::BACKEND_CIRCUIT_BREAKER_EXPRESSION,
                label::DEFAULT_CIRCUIT_BREAKER_EXPRESSION.to_string(),
            ),
        );

        // Max connections
        funcs.insert(names::HAS_MAX_CONN_LABELS, predicate(presence::has_max_conn_block));
        funcs.insert(
            names::GET_MAX_CONN_AMOUNT,
            first_value(label::BACKEND_MAX_CONN_AMOUNT, label::DEFAULT_MAX_CONN_AMOUNT),
        );
        funcs.insert(
            names::GET_MAX_CONN_EXTRACTOR_FUNC,
            first_value(
                label::BACKEND_MAX_CONN_EXTRACTOR_FUNC,
                label::DEFAULT_MAX_CONN_EXTRACTOR_FUNC.to_string(),
            ),
        );

        tracing::debug!(accessors = funcs.len(), "Accessor table built");
        Self { funcs }
    }

    pub fn get(&self, name: &str) -> Option<&Accessor> {
        self.funcs.get(name)
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.funcs.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    pub fn call_instance(
        &self,
        name: &str,
        instance: &ServiceInstance,
    ) -> Result<FieldValue, DeriveError> {
        match self.lookup(name)? {
            Accessor::Instance(f) => f(instance),
            _ => Err(kind_error(name, "an instance")),
        }
    }

    pub fn call_group(
        &self,
        name: &str,
        group: &[ServiceInstance],
    ) -> Result<FieldValue, DeriveError> {
        match self.lookup(name)? {
            Accessor::Group(f) => Ok(f(group)),
            _ => Err(kind_error(name, "a group")),
        }
    }

    pub fn call_filter<'a>(
        &self,
        name: &str,
        group: &'a [ServiceInstance],
    ) -> Result<Vec<&'a ServiceInstance>, DeriveError> {
        match self.lookup(name)? {
            Accessor::Filter(f) => Ok(f(group)),
            _ => Err(kind_error(name, "a filter")),
        }
    }

    /// [`call_instance`](Self::call_instance), converted to `T`.
    pub fn instance<T>(&self, name: &str, instance: &ServiceInstance) -> Result<T, DeriveError>
    where
        T: TryFrom<FieldValue>,
    {
        let value = self.call_instance(name, instance)?;
        T::try_from(value).map_err(|_| type_error::<T>(name))
    }

    /// [`call_group`](Self::call_group), converted to `T`.
    pub fn group<T>(&self, name: &str, group: &[ServiceInstance]) -> Result<T, DeriveError>
    where
        T: TryFrom<FieldValue>,
    {
        let value = self.call_group(name, group)?;
        T::try_from(value).map_err(|_| type_error::<T>(name))
    }

    fn lookup(&self, name: &str) -> Result<&Accessor, DeriveError> {
        self.funcs
            .get(name)
            .ok_or_else(|| DeriveError::UnknownAccessor(name.to_string()))
    }
}

impl fmt::Debug for FuncTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncTable")
            .field("names", &self.names())
            .finish()
    }
}

// ── Accessor builders ─────────────────────────────────────────

fn instance_value<T>(key: &'static str, default: T) -> Accessor
where
    T: FromLabel + Into<FieldValue> + Clone + Send + Sync + 'static,
{
    Accessor::Instance(Box::new(move |i: &ServiceInstance| {
        let value: FieldValue = resolve(i, key, default.clone()).into();
        Ok(value)
    }))
}

fn first_value<T>(key: &'static str, default: T) -> Accessor
where
    T: FromLabel + Into<FieldValue> + Clone + Send + Sync + 'static,
{
    Accessor::Group(Box::new(move |g: &[ServiceInstance]| -> FieldValue {
        resolve_first(g, key, default.clone()).into()
    }))
}

fn predicate(f: fn(&[ServiceInstance]) -> bool) -> Accessor {
    Accessor::Group(Box::new(move |g: &[ServiceInstance]| FieldValue::Bool(f(g))))
}

fn kind_error(name: &str, expected: &'static str) -> DeriveError {
    DeriveError::AccessorKind {
        name: name.to_string(),
        expected,
    }
}

fn type_error<T>(name: &str) -> DeriveError {
    DeriveError::FieldType {
        name: name.to_string(),
        expected: std::any::type_name::<T>(),
    }
}

// ── Derivations ───────────────────────────────────────────────

fn filter_frontends(group: &[ServiceInstance]) -> Vec<&ServiceInstance> {
    dedupe_by_name(group)
}

/// Explicit rule label, or `Host:{name}.{domain}` with the name lowercased
/// and underscores turned into hyphens.
pub fn frontend_rule(instance: &ServiceInstance, domain: &str) -> String {
    if let Some(rule) = raw_label(instance, label::FRONTEND_RULE) {
        return rule.to_string();
    }
    format!(
        "Host:{}.{}",
        instance.name.replace('_', "-").to_lowercase(),
        domain
    )
}

pub fn host(instance: &ServiceInstance) -> Result<String, DeriveError> {
    instance
        .address
        .as_deref()
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DeriveError::MissingAddress {
            service: instance.name.clone(),
            instance: instance.id.clone(),
        })
}

/// Explicit port label, else the host port of the first binding.
pub fn port(instance: &ServiceInstance) -> Result<String, DeriveError> {
    if let Some(port) = raw_label(instance, label::PORT) {
        return Ok(port.to_string());
    }
    instance
        .first_binding()
        .map(|b| b.host_port.to_string())
        .ok_or_else(|| DeriveError::MissingPort {
            service: instance.name.clone(),
            instance: instance.id.clone(),
        })
}
