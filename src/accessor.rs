// Converges a single owned child resource to its desired state.
//
// The accessor reads the observed child through a watch-fed cache, then
// creates, updates or leaves it alone. It never touches a child controlled by
// someone else, and never mutates a cached snapshot: updates go out on a copy
// whose spec alone has been replaced.
//
// There is no retry here. A failed attempt is returned to the caller, whose
// work queue re-invokes reconcile later.

use crate::owner::Owner;
use crate::{reasons, semantic, Error};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::core::object::HasSpec;
use kube::runtime::events::EventType;
use kube::Resource;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read path: the locally cached view of a child kind.
#[async_trait]
pub trait ObservedState<K>: Send + Sync {
    /// `Ok(None)` means the child does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Arc<K>>, Error>;
}

/// Write path against the authoritative store.
#[async_trait]
pub trait ClusterWriter<K>: Send + Sync {
    async fn create(&self, child: &K) -> Result<K, Error>;
    async fn update(&self, child: &K) -> Result<K, Error>;
}

/// Best-effort event recording. Failures are never surfaced.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, subject: &ObjectReference, type_: EventType, reason: &str, message: String);
}

#[derive(Debug)]
pub enum Reconciled<K> {
    Created(K),
    Updated(K),
    Unchanged(Arc<K>),
}

impl<K> Reconciled<K> {
    pub fn resource(&self) -> &K {
        match self {
            Reconciled::Created(k) | Reconciled::Updated(k) => k,
            Reconciled::Unchanged(k) => k.as_ref(),
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Reconciled::Unchanged(_))
    }
}

pub struct ResourceAccessor<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> ResourceAccessor<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub async fn reconcile<K>(
        &self,
        owner: &Owner,
        desired: &K,
        recorder: &dyn EventSink,
    ) -> Result<Reconciled<K>, Error>
    where
        K: Resource<DynamicType = ()> + HasSpec + Clone + Send + Sync,
        K::Spec: Serialize + Clone,
        R: ObservedState<K>,
        W: ClusterWriter<K>,
    {
        let kind = K::kind(&());
        let meta = desired.meta();
        let ns = meta.namespace.as_deref().ok_or(Error::MissingObjectKey("namespace"))?;
        let name = meta.name.as_deref().ok_or(Error::MissingObjectKey("name"))?;

        let Some(observed) = self.reader.get(ns, name).await? else {
            return match self.writer.create(desired).await {
                Ok(created) => {
                    info!("created {} {}/{} for {}", kind, ns, name, owner);
                    recorder
                        .emit(
                            &owner.object_ref(),
                            EventType::Normal,
                            reasons::CREATED,
                            format!("Created {} {:?}", kind, name),
                        )
                        .await;
                    Ok(Reconciled::Created(created))
                }
                Err(e) => {
                    warn!("failed to create {} {}/{}: {}", kind, ns, name, e);
                    recorder
                        .emit(
                            &owner.object_ref(),
                            EventType::Warning,
                            reasons::CREATION_FAILED,
                            format!("Failed to create {} {:?}/{:?}: {}", kind, ns, name, e),
                        )
                        .await;
                    Err(e)
                }
            };
        };

        if !owner.controls(observed.as_ref()) {
            return Err(Error::NotOwned {
                owner: owner.to_string(),
                kind: kind.into_owned(),
                namespace: ns.to_string(),
                name: name.to_string(),
            });
        }

        if semantic::equal(observed.spec(), desired.spec())? {
            debug!("{} {}/{} is up to date", kind, ns, name);
            return Ok(Reconciled::Unchanged(observed));
        }

        // The snapshot is shared with every other reader of the cache.
        let mut existing = (*observed).clone();
        *existing.spec_mut() = desired.spec().clone();
        let updated = self.writer.update(&existing).await.map_err(|e| {
            warn!("failed to update {} {}/{}: {}", kind, ns, name, e);
            e
        })?;

        info!("updated {} {}/{} for {}", kind, ns, name, owner);
        recorder
            .emit(
                &owner.object_ref(),
                EventType::Normal,
                reasons::UPDATED,
                format!("Updated {} {:?}/{:?}", kind, ns, name),
            )
            .await;
        Ok(Reconciled::Updated(updated))
    }
}
