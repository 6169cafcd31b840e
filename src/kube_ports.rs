// kube-backed implementations of the accessor ports.

use crate::accessor::{ClusterWriter, EventSink, ObservedState};
use crate::Error;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::NamespaceResourceScope;
use kube::api::PostParams;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::warn;

/// Reads children from a reflector store fed by a watch.
pub struct CachedReader<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    store: Store<K>,
}

impl<K> CachedReader<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    pub fn new(store: Store<K>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<K> ObservedState<K> for CachedReader<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Arc<K>>, Error> {
        // Blocks until the initial list has landed; errors once the watch side is gone.
        self.store
            .wait_until_ready()
            .await
            .map_err(|_| Error::CacheUnavailable {
                kind: K::kind(&()).into_owned(),
            })?;
        Ok(self.store.get(&ObjectRef::new(name).within(namespace)))
    }
}

/// Writes children straight to the API server.
#[derive(Clone)]
pub struct ApiWriter {
    client: Client,
}

impl ApiWriter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, child: &K) -> Result<Api<K>, Error>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        let ns = child
            .meta()
            .namespace
            .as_deref()
            .ok_or(Error::MissingObjectKey("namespace"))?;
        Ok(Api::namespaced(self.client.clone(), ns))
    }
}

#[async_trait]
impl<K> ClusterWriter<K> for ApiWriter
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync,
{
    async fn create(&self, child: &K) -> Result<K, Error> {
        Ok(self.api(child)?.create(&PostParams::default(), child).await?)
    }

    async fn update(&self, child: &K) -> Result<K, Error> {
        let name = child
            .meta()
            .name
            .as_deref()
            .ok_or(Error::MissingObjectKey("name"))?;
        Ok(self
            .api(child)?
            .replace(name, &PostParams::default(), child)
            .await?)
    }
}

/// Publishes events through `kube::runtime::events::Recorder`.
pub struct RecorderSink {
    recorder: Recorder,
}

impl RecorderSink {
    /// `controller_name` is reported as the event's reporting component.
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventSink for RecorderSink {
    async fn emit(&self, subject: &ObjectReference, type_: EventType, reason: &str, message: String) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note: Some(message),
            action: crate::ACTION_RECONCILE.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, subject).await {
            warn!("failed to publish {} event for {:?}: {}", reason, subject.name, e);
        }
    }
}
