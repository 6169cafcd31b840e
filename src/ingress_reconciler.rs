// Reconciles Services labelled for exposure into an Istio VirtualService.
// The VirtualService is named after the Service, controlled by it, and routes
//   <name>.<namespace>.<domain>  ->  <name>.<namespace>.svc.cluster.local:<first port>
// through the configured gateways.
// Unlabelled Services are left alone; cleaning up a VirtualService after the
// label is removed is left to garbage collection of the owner.

use crate::accessor::{ClusterWriter, EventSink, ObservedState, Reconciled, ResourceAccessor};
use crate::owner::Owner;
use crate::virtualservice::{
    Destination, HttpRoute, HttpRouteDestination, PortSelector, VirtualService, VirtualServiceSpec,
};
use crate::{Error, IngressConfig};
use k8s_openapi::api::core::v1::Service;
use kube::runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct Data<R, W> {
    pub accessor: ResourceAccessor<R, W>,
    pub recorder: Box<dyn EventSink>,
    pub config: IngressConfig,
}

pub async fn reconcile<R, W>(svc: Arc<Service>, ctx: Arc<Data<R, W>>) -> Result<Action, Error>
where
    R: ObservedState<VirtualService>,
    W: ClusterWriter<VirtualService>,
{
    if svc.metadata.deletion_timestamp.is_some() {
        return Ok(Action::await_change());
    }

    let owner = Owner::from_resource(svc.as_ref())?;
    let Some(desired) = desired_virtual_service(&svc, &owner, &ctx.config) else {
        return Ok(Action::await_change());
    };

    match ctx
        .accessor
        .reconcile(&owner, &desired, ctx.recorder.as_ref())
        .await?
    {
        Reconciled::Created(vs) | Reconciled::Updated(vs) => {
            info!(
                "VirtualService {:?} now routes {:?}",
                vs.metadata.name, vs.spec.hosts
            );
        }
        Reconciled::Unchanged(_) => {}
    }

    Ok(Action::await_change())
}

/// Retry interval while a foreign VirtualService holds the Service's name.
pub const CONFLICT_REQUEUE: Duration = Duration::from_secs(300);

// A foreign VirtualService isn't owned by the Service, so its deletion never
// triggers the controller. Poll slowly instead of waiting for a change.
pub fn error_policy<R, W>(_object: Arc<Service>, error: &Error, _ctx: Arc<Data<R, W>>) -> Action {
    match error {
        Error::NotOwned { .. } => Action::requeue(CONFLICT_REQUEUE),
        _ => Action::requeue(Duration::from_secs(1)),
    }
}

/// The VirtualService a Service should have, or None if it isn't exposed.
pub fn desired_virtual_service(
    svc: &Service,
    owner: &Owner,
    config: &IngressConfig,
) -> Option<VirtualService> {
    let exposed = svc
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(&config.expose_label))
        .is_some_and(|v| v == "true");
    if !exposed {
        return None;
    }

    let ns = owner.namespace.as_deref()?;
    let port = svc
        .spec
        .as_ref()
        .and_then(|s| s.ports.as_ref())
        .and_then(|ports| ports.first())
        .and_then(|p| u32::try_from(p.port).ok())
        .map(|number| PortSelector { number });

    let mut vs = VirtualService::new(
        &owner.name,
        VirtualServiceSpec {
            hosts: vec![format!("{}.{}.{}", owner.name, ns, config.domain)],
            gateways: config.gateways.clone(),
            http: vec![HttpRoute {
                route: vec![HttpRouteDestination {
                    destination: Destination {
                        host: format!("{}.{}.svc.cluster.local", owner.name, ns),
                        subset: None,
                        port,
                    },
                    weight: None,
                }],
                ..HttpRoute::default()
            }],
        },
    );
    vs.metadata.namespace = Some(ns.to_string());
    vs.metadata.owner_references = Some(vec![owner.controller_ref()]);
    Some(vs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ServicePort, ServiceSpec};
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn service(labels: &[(&str, &str)], port: Option<i32>) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some("reviews".to_string()),
                namespace: Some("bookinfo".to_string()),
                uid: Some("uid-1".to_string()),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<BTreeMap<_, _>>(),
                ),
                ..ObjectMeta::default()
            },
            spec: Some(ServiceSpec {
                ports: port.map(|port| {
                    vec![ServicePort {
                        port,
                        ..ServicePort::default()
                    }]
                }),
                ..ServiceSpec::default()
            }),
            ..Service::default()
        }
    }

    #[test]
    fn unlabelled_service_has_no_virtual_service() {
        let config = IngressConfig::default();
        for svc in [
            service(&[], Some(80)),
            service(&[(crate::LABEL_EXPOSE, "false")], Some(80)),
        ] {
            let owner = Owner::from_resource(&svc).unwrap();
            assert!(desired_virtual_service(&svc, &owner, &config).is_none());
        }
    }

    #[test]
    fn exposed_service_routes_to_first_port() {
        let config = IngressConfig {
            domain: "mesh.internal".to_string(),
            ..IngressConfig::default()
        };
        let svc = service(&[(crate::LABEL_EXPOSE, "true")], Some(9080));
        let owner = Owner::from_resource(&svc).unwrap();

        let vs = desired_virtual_service(&svc, &owner, &config).unwrap();
        assert_eq!(vs.metadata.name.as_deref(), Some("reviews"));
        assert_eq!(vs.metadata.namespace.as_deref(), Some("bookinfo"));
        assert!(owner.controls(&vs));
        assert_eq!(vs.spec.hosts, vec!["reviews.bookinfo.mesh.internal"]);
        assert_eq!(vs.spec.gateways, config.gateways);

        let dest = &vs.spec.http[0].route[0].destination;
        assert_eq!(dest.host, "reviews.bookinfo.svc.cluster.local");
        assert_eq!(dest.port, Some(PortSelector { number: 9080 }));
    }

    #[test]
    fn portless_service_omits_port() {
        let svc = service(&[(crate::LABEL_EXPOSE, "true")], None);
        let owner = Owner::from_resource(&svc).unwrap();
        let vs = desired_virtual_service(&svc, &owner, &IngressConfig::default()).unwrap();
        assert_eq!(vs.spec.http[0].route[0].destination.port, None);
    }
}
