use futures::StreamExt;
use istio_accessor::ingress_reconciler;
use istio_accessor::kube_ports::{ApiWriter, CachedReader, RecorderSink};
use istio_accessor::virtualservice::VirtualService;
use istio_accessor::{Config, ResourceAccessor};
use k8s_openapi::api::core::v1::Service;
use kube::runtime::{reflector, watcher, Controller, WatchStreamExt};
use kube::Client;
use std::fs::File;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider already installed");
    }

    let config: Config = if let Ok(config_filename) = std::env::var("CONFIG") {
        serde_yaml::from_reader(File::open(config_filename)?)?
    } else {
        Config::default()
    };

    if !config.ingress.enabled {
        info!("ingress reconciler disabled, nothing to do");
        return Ok(());
    }

    let client = Client::try_default().await?;
    let services = kube::Api::<Service>::all(client.clone());
    let virtual_services = kube::Api::<VirtualService>::all(client.clone());

    // Lister for the accessor: a watch-fed cache of every VirtualService.
    // Separate from the watch `Controller::owns` opens below, so the API
    // server streams every VirtualService to this process twice.
    let (store, writer) = reflector::store();
    let cache = reflector(writer, watcher(virtual_services.clone(), watcher::Config::default()))
        .default_backoff()
        .touched_objects()
        .for_each(|res| async move {
            if let Err(e) = res {
                warn!("VirtualService watch error: {}", e);
            }
        });
    tokio::spawn(cache);

    info!("waiting for VirtualService cache to sync");
    store.wait_until_ready().await?;

    let data = Arc::new(ingress_reconciler::Data {
        accessor: ResourceAccessor::new(CachedReader::new(store), ApiWriter::new(client.clone())),
        recorder: Box::new(RecorderSink::new(client.clone(), &config.controller_name)),
        config: config.ingress,
    });

    Controller::new(services, watcher::Config::default())
        .owns(virtual_services, watcher::Config::default())
        .shutdown_on_signal()
        .run(ingress_reconciler::reconcile, ingress_reconciler::error_policy, data)
        .for_each(|res| async move {
            match res {
                Ok(o) => info!("reconciled {}", o.0.name),
                Err(e) => warn!("reconciliation error: {:?}", e),
            }
        })
        .await;

    Ok(())
}
