use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One discovered running unit of a service (a task/container).
///
/// Produced by the discovery side and consumed read-only here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Logical service name, shared by every instance of the service.
    pub name: String,

    /// Task or container identifier. Empty when discovery did not supply one.
    #[serde(default)]
    pub id: String,

    /// Container labels. A `null` value is kept as `None` and treated like an
    /// absent label.
    #[serde(default)]
    pub labels: HashMap<String, Option<String>>,

    /// Private network address of the host running the instance.
    #[serde(default)]
    pub address: Option<String>,

    /// Port bindings in the order the orchestrator reported them.
    #[serde(default)]
    pub port_bindings: Vec<PortBinding>,
}

/// A container port published on a host port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub container_port: u16,
    pub host_port: u16,
}

/// Service name → instances in discovery order.
pub type ServiceGroups = BTreeMap<String, Vec<ServiceInstance>>;

impl ServiceInstance {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder helper: set a label value.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), Some(value.into()));
        self
    }

    /// Builder helper: set a label that is present without a value.
    pub fn with_null_label(mut self, key: impl Into<String>) -> Self {
        self.labels.insert(key.into(), None);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_port_binding(mut self, container_port: u16, host_port: u16) -> Self {
        self.port_bindings.push(PortBinding {
            container_port,
            host_port,
        });
        self
    }

    /// The first published binding, if any.
    pub fn first_binding(&self) -> Option<&PortBinding> {
        self.port_bindings.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_instance_deserializes() {
        let json = r#"{"name": "web"}"#;
        let inst: ServiceInstance = serde_json::from_str(json).unwrap();
        assert_eq!(inst.name, "web");
        assert!(inst.id.is_empty());
        assert!(inst.labels.is_empty());
        assert!(inst.address.is_none());
        assert!(inst.port_bindings.is_empty());
    }

    #[test]
    fn null_label_is_kept_as_none() {
        let json = serde_json::json!({
            "name": "web",
            "labels": { "traefik.port": null, "traefik.protocol": "https" }
        });
        let inst: ServiceInstance = serde_json::from_value(json).unwrap();
        assert_eq!(inst.labels.get("traefik.port"), Some(&None));
        assert_eq!(
            inst.labels.get("traefik.protocol"),
            Some(&Some("https".to_string()))
        );
    }

    #[test]
    fn port_bindings_keep_order() {
        let inst = ServiceInstance::new("web")
            .with_port_binding(80, 32768)
            .with_port_binding(443, 32769);
        assert_eq!(inst.first_binding().unwrap().host_port, 32768);
        assert_eq!(inst.port_bindings[1].container_port, 443);
    }

    #[test]
    fn groups_deserialize_from_yaml() {
        let yaml = r#"
web:
  - name: web
    id: a1
    address: 10.0.0.5
    port_bindings:
      - container_port: 80
        host_port: 32768
"#;
        let groups: ServiceGroups = serde_yaml::from_str(yaml).unwrap();
        let web = &groups["web"];
        assert_eq!(web.len(), 1);
        assert_eq!(web[0].address.as_deref(), Some("10.0.0.5"));
        assert_eq!(web[0].port_bindings[0].host_port, 32768);
    }
}
