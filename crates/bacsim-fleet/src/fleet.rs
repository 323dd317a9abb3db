use crate::config::FleetConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{BindFailure, FleetError};
use crate::multiplexer::{Destination, Multiplexer};
use crate::peers::{PeerInfo, PeerTable};
use crate::pending::{PendingTable, Response};
use crate::registry::DeviceRegistry;
use crate::scheduler::{DiscoveryScheduler, Emitter};
use crate::snapshot::DeviceSummary;
use crate::value::PropertyValue;
use bacsim_core::services::{ReadPropertyRequest, WhoIsRequest, WritePropertyRequest};
use bacsim_core::types::{ObjectId, PropertyId};
use bacsim_core::{encode, Apdu, EncodeError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// A running fleet of simulated devices.
///
/// Owns the registry, the endpoints and every background task. Dropping the
/// fleet cancels its tasks; [`Fleet::shutdown`] also waits for them.
#[derive(Debug)]
pub struct Fleet {
    registry: Arc<DeviceRegistry>,
    mux: Arc<Multiplexer>,
    scheduler: DiscoveryScheduler,
    peers: Arc<PeerTable>,
    pending: Arc<PendingTable>,
    bind_failures: Vec<BindFailure>,
    request_timeout: Duration,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Fleet {
    /// Validates `config`, binds endpoints and starts receiving, dispatching
    /// and announcing.
    pub async fn start(config: FleetConfig) -> Result<Self, FleetError> {
        let plans = config.plan()?;
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        let (mux, report) = Multiplexer::bind(
            &plans,
            &config.addressing,
            config.broadcast,
            config.broadcast_port,
            config.queue_depth,
            cancel.clone(),
            &tracker,
        )
        .await?;
        let mux = Arc::new(mux);
        let registry = Arc::new(DeviceRegistry::build(&config, &report.bound));
        let peers = Arc::new(PeerTable::new());
        let pending = Arc::new(PendingTable::new());

        let emitter = Emitter::new(mux.clone(), registry.clone(), cancel.clone());
        let scheduler = DiscoveryScheduler::new(emitter, config.discovery.clone(), tracker.clone());
        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            mux.clone(),
            scheduler.clone(),
            peers.clone(),
            pending.clone(),
            config.who_is_jitter(),
        ));
        dispatcher.spawn(
            mux.take_inbound()?,
            config.queue_depth,
            &tracker,
            cancel.clone(),
        );
        scheduler.start(&registry.device_ids());

        log::info!(
            "fleet started: {} devices, {} endpoints failed to bind",
            registry.len(),
            report.failures.len()
        );
        Ok(Self {
            registry,
            mux,
            scheduler,
            peers,
            pending,
            bind_failures: report.failures,
            request_timeout: config.request_timeout,
            cancel,
            tracker,
        })
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn device_ids(&self) -> Vec<u32> {
        self.registry.device_ids()
    }

    pub async fn list_devices(&self) -> Vec<DeviceSummary> {
        self.registry.list_devices().await
    }

    /// Endpoints that could not be bound at startup.
    pub fn bind_failures(&self) -> &[BindFailure] {
        &self.bind_failures
    }

    pub fn local_addr(&self, device_id: u32) -> Option<SocketAddr> {
        self.mux.local_addr(device_id)
    }

    pub fn broadcast_addr(&self, device_id: u32) -> Option<SocketAddr> {
        self.mux.broadcast_addr(device_id)
    }

    /// Devices heard announcing themselves.
    /// Confirmed requests this fleet is still waiting on.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    pub async fn peers(&self) -> Vec<PeerInfo> {
        self.peers.all().await
    }

    /// Sends an I-Am from `device_id` right away.
    pub async fn announce(&self, device_id: u32) -> Result<(), FleetError> {
        self.scheduler.emitter().i_am(device_id).await
    }

    /// Broadcasts a Who-Is from `from_device` and collects the I-Am replies
    /// heard within `window`.
    pub async fn who_is(
        &self,
        from_device: u32,
        range: Option<(u32, u32)>,
        window: Duration,
    ) -> Result<Vec<PeerInfo>, FleetError> {
        let request = match range {
            Some((low, high)) => WhoIsRequest::range(low, high),
            None => WhoIsRequest::global(),
        };
        let since = Instant::now();
        self.scheduler.emitter().who_is(from_device, request).await?;
        tokio::select! {
            _ = self.cancel.cancelled() => return Err(FleetError::Cancelled),
            _ = tokio::time::sleep(window) => {}
        }
        Ok(self
            .peers
            .seen_since(since)
            .await
            .into_iter()
            .filter(|p| request.matches(p.device_id))
            .collect())
    }

    /// ReadProperty issued by `from_device` toward `target`.
    pub async fn read_remote_property(
        &self,
        from_device: u32,
        target: SocketAddr,
        object_id: ObjectId,
        property_id: PropertyId,
        array_index: Option<u32>,
    ) -> Result<PropertyValue, FleetError> {
        let response = self
            .confirmed(from_device, target, |invoke_id| {
                encode(&Apdu::ReadProperty(ReadPropertyRequest {
                    object_id,
                    property_id,
                    array_index,
                    invoke_id,
                }))
            })
            .await?;
        match response {
            Response::ReadPropertyAck(value) => Ok(value),
            other => Err(remote_failure(other)),
        }
    }

    /// WriteProperty issued by `from_device` toward `target`.
    pub async fn write_remote_property(
        &self,
        from_device: u32,
        target: SocketAddr,
        object_id: ObjectId,
        property_id: PropertyId,
        value: &PropertyValue,
        priority: Option<u8>,
    ) -> Result<(), FleetError> {
        let response = self
            .confirmed(from_device, target, |invoke_id| {
                encode(&Apdu::WriteProperty(WritePropertyRequest {
                    object_id,
                    property_id,
                    array_index: None,
                    values: value.to_data_values(),
                    priority,
                    invoke_id,
                }))
            })
            .await?;
        match response {
            Response::SimpleAck { .. } => Ok(()),
            other => Err(remote_failure(other)),
        }
    }

    async fn confirmed(
        &self,
        from_device: u32,
        target: SocketAddr,
        build: impl FnOnce(u8) -> Result<Vec<u8>, EncodeError>,
    ) -> Result<Response, FleetError> {
        self.registry.get(from_device)?;
        let request = self.pending.register(target)?;
        // Any early return drops `request`, which evicts its entry.
        let bytes = build(request.invoke_id)?;
        self.mux
            .send(from_device, Destination::Unicast(target), &bytes, true)
            .await?;
        tokio::select! {
            _ = self.cancel.cancelled() => Err(FleetError::Cancelled),
            response = self.pending.wait(request, self.request_timeout) => response,
        }
    }

    /// Cancels every task and waits for them to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        self.pending.clear();
        log::info!("fleet stopped");
    }
}

impl Drop for Fleet {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn remote_failure(response: Response) -> FleetError {
    match response {
        Response::Error { class, code } => FleetError::RemoteError { class, code },
        Response::Reject { reason } => FleetError::RemoteReject { reason },
        Response::Abort { reason } => FleetError::RemoteAbort { reason },
        Response::ReadPropertyAck(_) | Response::SimpleAck { .. } => FleetError::UnexpectedResponse,
    }
}
