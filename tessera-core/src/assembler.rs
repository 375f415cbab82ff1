use crate::config::ProviderConfig;
use crate::error::DeriveError;
use crate::funcs::{FuncTable, names};
use crate::instance::{ServiceGroups, ServiceInstance};
use crate::model::{
    Backend, CircuitBreaker, DerivedConfiguration, Frontend, HealthCheck, LoadBalancer, MaxConn,
    Route, Server, Stickiness,
};
use crate::notice::{NoticeSink, TracingNotices};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one assembly pass.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub configuration: DerivedConfiguration,
    /// Instances left out because they could not be routed, by service name.
    pub failures: BTreeMap<String, Vec<DeriveError>>,
}

impl Assembly {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Services that failed without producing any backend.
    pub fn excluded_services(&self) -> Vec<&str> {
        self.failures
            .keys()
            .filter(|service| self.configuration.backend(service).is_none())
            .map(String::as_str)
            .collect()
    }
}

/// Turns a discovery snapshot into [`DerivedConfiguration`].
///
/// Holds only the accessor table; every call to [`assemble`](Self::assemble)
/// is independent.
#[derive(Debug)]
pub struct Assembler {
    funcs: FuncTable,
}

impl Assembler {
    pub fn new(settings: &ProviderConfig) -> Self {
        Self::with_notices(settings, Arc::new(TracingNotices))
    }

    pub fn with_notices(settings: &ProviderConfig, notices: Arc<dyn NoticeSink>) -> Self {
        Self {
            funcs: FuncTable::new(settings, notices),
        }
    }

    /// The accessor table, for renderers that evaluate fields themselves.
    pub fn funcs(&self) -> &FuncTable {
        &self.funcs
    }

    pub fn assemble(&self, services: &ServiceGroups) -> Assembly {
        let mut assembly = Assembly::default();

        for (service, instances) in services {
            let mut errors = Vec::new();
            match self.enabled_instances(instances) {
                Ok(enabled) if enabled.is_empty() => {
                    debug!(service = %service, "No enabled instances, skipping service");
                }
                Ok(enabled) => match self.derive_service(service, &enabled, &mut errors) {
                    Ok(Some((frontend, backend))) => {
                        let cfg = &mut assembly.configuration;
                        cfg.backends
                            .insert(DerivedConfiguration::backend_name(service), backend);
                        if let Some(frontend) = frontend {
                            cfg.frontends
                                .insert(DerivedConfiguration::frontend_name(service), frontend);
                        }
                    }
                    Ok(None) => {
                        warn!(service = %service, "Service excluded, no routable instance");
                    }
                    Err(e) => {
                        warn!(service = %service, code = e.code(), error = %e, "Service excluded");
                        errors.push(e);
                    }
                },
                Err(e) => errors.push(e),
            }
            if !errors.is_empty() {
                assembly.failures.insert(service.clone(), errors);
            }
        }

        info!(
            backends = assembly.configuration.backends.len(),
            frontends = assembly.configuration.frontends.len(),
            failed = assembly.failures.len(),
            "Configuration assembled"
        );
        assembly
    }

    fn enabled_instances<'a>(
        &self,
        instances: &'a [ServiceInstance],
    ) -> Result<Cow<'a, [ServiceInstance]>, DeriveError> {
        let mut keep = Vec::with_capacity(instances.len());
        for instance in instances {
            keep.push(self.funcs.instance::<bool>(names::IS_ENABLED, instance)?);
        }
        Ok(retain(instances, &keep))
    }

    /// `None` when no instance of the group is routable. Unroutable
    /// instances are pushed onto `errors` and left out of everything else.
    fn derive_service(
        &self,
        service: &str,
        instances: &[ServiceInstance],
        errors: &mut Vec<DeriveError>,
    ) -> Result<Option<(Option<Frontend>, Backend)>, DeriveError> {
        let mut servers = BTreeMap::new();
        let mut keep = Vec::with_capacity(instances.len());
        for (index, instance) in instances.iter().enumerate() {
            match self.derive_server(instance) {
                Ok(server) => {
                    insert_server(&mut servers, server_name(instance, index), index, server);
                    keep.push(true);
                }
                Err(e) => {
                    warn!(
                        service = %service,
                        instance = %instance.id,
                        code = e.code(),
                        error = %e,
                        "Instance excluded"
                    );
                    errors.push(e);
                    keep.push(false);
                }
            }
        }
        if servers.is_empty() {
            return Ok(None);
        }

        let routable = retain(instances, &keep);
        let backend = self.derive_backend(&routable, servers)?;

        let frontend = match self
            .funcs
            .call_filter(names::FILTER_FRONTENDS, &routable)?
            .first()
        {
            Some(first) => Some(self.derive_frontend(service, first)?),
            None => None,
        };

        Ok(Some((frontend, backend)))
    }

    fn derive_backend(
        &self,
        instances: &[ServiceInstance],
        servers: BTreeMap<String, Server>,
    ) -> Result<Backend, DeriveError> {
        let f = &self.funcs;

        let load_balancer = if f.group(names::HAS_LOAD_BALANCER_LABEL, instances)? {
            let stickiness = if f.group(names::HAS_STICKINESS_LABEL, instances)? {
                Some(Stickiness {
                    cookie_name: f.group(names::GET_STICKINESS_COOKIE_NAME, instances)?,
                })
            } else {
                None
            };
            Some(LoadBalancer {
                method: f.group(names::GET_LOAD_BALANCER_METHOD, instances)?,
                sticky: f.group(names::GET_STICKY, instances)?,
                stickiness,
            })
        } else {
            None
        };

        let health_check = if f.group(names::HAS_HEALTH_CHECK_LABELS, instances)? {
            Some(HealthCheck {
                path: f.group(names::GET_HEALTH_CHECK_PATH, instances)?,
                port: f.group(names::GET_HEALTH_CHECK_PORT, instances)?,
                interval: f.group(names::GET_HEALTH_CHECK_INTERVAL, instances)?,
            })
        } else {
            None
        };

        let circuit_breaker = if f.group(names::HAS_CIRCUIT_BREAKER_LABEL, instances)? {
            Some(CircuitBreaker {
                expression: f.group(names::GET_CIRCUIT_BREAKER_EXPRESSION, instances)?,
            })
        } else {
            None
        };

        let max_conn = if f.group(names::HAS_MAX_CONN_LABELS, instances)? {
            Some(MaxConn {
                amount: f.group(names::GET_MAX_CONN_AMOUNT, instances)?,
                extractor_func: f.group(names::GET_MAX_CONN_EXTRACTOR_FUNC, instances)?,
            })
        } else {
            None
        };

        Ok(Backend {
            servers,
            load_balancer,
            health_check,
            circuit_breaker,
            max_conn,
        })
    }

    fn derive_server(&self, instance: &ServiceInstance) -> Result<Server, DeriveError> {
        let f = &self.funcs;
        let protocol: String = f.instance(names::GET_PROTOCOL, instance)?;
        let host: String = f.instance(names::GET_HOST, instance)?;
        let port: String = f.instance(names::GET_PORT, instance)?;
        Ok(Server {
            url: format!("{protocol}://{host}:{port}"),
            weight: f.instance(names::GET_WEIGHT, instance)?,
        })
    }

    fn derive_frontend(
        &self,
        service: &str,
        instance: &ServiceInstance,
    ) -> Result<Frontend, DeriveError> {
        let f = &self.funcs;
        let rule: String = f.instance(names::GET_FRONTEND_RULE, instance)?;
        let entry_points: Option<Vec<String>> = f.instance(names::GET_ENTRY_POINTS, instance)?;
        let basic_auth: Option<Vec<String>> = f.instance(names::GET_BASIC_AUTH, instance)?;

        let mut routes = BTreeMap::new();
        routes.insert(DerivedConfiguration::route_name(service), Route { rule });

        Ok(Frontend {
            backend: DerivedConfiguration::backend_name(service),
            routes,
            pass_host_header: f.instance(names::GET_PASS_HOST_HEADER, instance)?,
            pass_tls_cert: f.instance(names::GET_PASS_TLS_CERT, instance)?,
            priority: f.instance(names::GET_PRIORITY, instance)?,
            entry_points: entry_points.unwrap_or_default(),
            basic_auth: basic_auth.unwrap_or_default(),
        })
    }
}

/// Borrows `instances` when every flag is set, otherwise clones the kept ones.
fn retain<'a>(instances: &'a [ServiceInstance], keep: &[bool]) -> Cow<'a, [ServiceInstance]> {
    if keep.iter().all(|k| *k) {
        Cow::Borrowed(instances)
    } else {
        Cow::Owned(
            instances
                .iter()
                .zip(keep)
                .filter(|(_, k)| **k)
                .map(|(instance, _)| instance.clone())
                .collect(),
        )
    }
}

/// Insert under `key`; a taken key becomes the first free `{key}-{n}`, n from `index`.
fn insert_server(
    servers: &mut BTreeMap<String, Server>,
    key: String,
    index: usize,
    server: Server,
) {
    if !servers.contains_key(&key) {
        servers.insert(key, server);
        return;
    }
    let mut n = index;
    let mut unique = format!("{key}-{n}");
    while servers.contains_key(&unique) {
        n += 1;
        unique = format!("{key}-{n}");
    }
    warn!(server = %key, renamed = %unique, "Duplicate server key");
    servers.insert(unique, server);
}

/// `server-{name}{id}`, or `server-{name}-{index}` when discovery gave no id.
fn server_name(instance: &ServiceInstance, index: usize) -> String {
    if instance.id.is_empty() {
        format!("server-{}-{}", instance.name, index)
    } else {
        format!("server-{}{}", instance.name, instance.id)
    }
}
