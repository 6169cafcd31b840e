use serde::{Deserialize, Serialize};

pub mod accessor;
pub mod error;
pub mod ingress_reconciler;
pub mod kube_ports;
pub mod owner;
pub mod semantic;
pub mod virtualservice;

pub use accessor::{ClusterWriter, EventSink, ObservedState, Reconciled, ResourceAccessor};
pub use error::Error;
pub use owner::Owner;

pub const LABEL_EXPOSE: &str = "networking.example.io/expose";
pub const ACTION_RECONCILE: &str = "Reconcile";

/// Event reasons recorded against the owner.
pub mod reasons {
    pub const CREATED: &str = "Created";
    pub const CREATION_FAILED: &str = "CreationFailed";
    pub const UPDATED: &str = "Updated";
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct IngressConfig {
    pub enabled: bool,
    pub domain: String,
    pub gateways: Vec<String>,
    pub expose_label: String,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            domain: "example.com".to_string(),
            gateways: vec!["istio-system/ingressgateway".to_string()],
            expose_label: LABEL_EXPOSE.to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Config {
    pub controller_name: String,
    pub ingress: IngressConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            controller_name: "istio-accessor".to_string(),
            ingress: IngressConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_fills_defaults() {
        let config: Config = serde_yaml::from_str("ingress:\n  domain: mesh.internal\n").unwrap();
        assert_eq!(config.controller_name, "istio-accessor");
        assert!(config.ingress.enabled);
        assert_eq!(config.ingress.domain, "mesh.internal");
        assert_eq!(config.ingress.expose_label, LABEL_EXPOSE);
    }

    #[test]
    fn config_rejects_unknown_fields() {
        assert!(serde_yaml::from_str::<Config>("ingres:\n  enabled: false\n").is_err());
    }
}
