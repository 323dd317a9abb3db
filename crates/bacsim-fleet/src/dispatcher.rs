//! Per-device request handling.
//!
//! A router task drains the multiplexer's inbound stream into one bounded
//! queue per device. Each device's worker answers its queue strictly in
//! arrival order; workers of different devices run concurrently.

use crate::error::FleetError;
use crate::multiplexer::{Inbound, Multiplexer};
use crate::peers::PeerTable;
use crate::pending::{PendingTable, Response};
use crate::registry::DeviceRegistry;
use crate::scheduler::DiscoveryScheduler;
use crate::value::PropertyValue;
use bacsim_core::apdu::{AbortPdu, BacnetError, SimpleAck};
use bacsim_core::services::{
    ReadPropertyAck, ReadPropertyRequest, WritePropertyRequest, SERVICE_READ_PROPERTY,
    SERVICE_WRITE_PROPERTY,
};
use bacsim_core::types::{AbortReason, ErrorClass, ErrorCode, ObjectId};
use bacsim_core::{decode, encode, Apdu, DecodeErrorKind, EncodeError, FrameError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<DeviceRegistry>,
    mux: Arc<Multiplexer>,
    scheduler: DiscoveryScheduler,
    peers: Arc<PeerTable>,
    pending: Arc<PendingTable>,
    who_is_jitter: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        mux: Arc<Multiplexer>,
        scheduler: DiscoveryScheduler,
        peers: Arc<PeerTable>,
        pending: Arc<PendingTable>,
        who_is_jitter: Duration,
    ) -> Self {
        Self {
            registry,
            mux,
            scheduler,
            peers,
            pending,
            who_is_jitter,
        }
    }

    /// Starts the router and one worker per registered device.
    pub fn spawn(
        self: Arc<Self>,
        mut inbound: mpsc::Receiver<Inbound>,
        queue_depth: usize,
        tracker: &TaskTracker,
        cancel: CancellationToken,
    ) {
        let mut queues = HashMap::new();
        for device_id in self.registry.device_ids() {
            let (tx, rx) = mpsc::channel(queue_depth.max(1));
            queues.insert(device_id, tx);
            tracker.spawn(worker(self.clone(), device_id, rx, cancel.clone()));
        }

        tracker.spawn(async move {
            loop {
                let item = tokio::select! {
                    _ = cancel.cancelled() => break,
                    item = inbound.recv() => match item {
                        Some(item) => item,
                        None => break,
                    },
                };
                let Some(queue) = queues.get(&item.device_id) else {
                    log::debug!("no worker for device {}", item.device_id);
                    continue;
                };
                match queue.try_send(item) {
                    Ok(()) => {}
                    Err(TrySendError::Full(item)) => log::warn!(
                        "device {}: queue full, dropping APDU from {}",
                        item.device_id,
                        item.source
                    ),
                    Err(TrySendError::Closed(_)) => {}
                }
            }
        });
    }

    /// Handles one inbound APDU for `inbound.device_id`.
    pub async fn handle(&self, inbound: &Inbound) -> Result<(), FleetError> {
        let apdu = match decode(&inbound.apdu) {
            Ok(apdu) => apdu,
            Err(err) => return self.answer_undecodable(inbound, err).await,
        };
        let device_id = inbound.device_id;
        match apdu {
            Apdu::WhoIs(req) => {
                if req.matches(device_id) {
                    log::debug!("device {device_id}: Who-Is from {}", inbound.source);
                    self.scheduler.schedule_i_am(device_id, self.who_is_jitter);
                }
                Ok(())
            }
            Apdu::IAm(i_am) => {
                self.peers.record(&i_am, inbound.source).await;
                Ok(())
            }
            Apdu::ReadProperty(req) => self.read_property(inbound, &req).await,
            Apdu::WriteProperty(req) => self.write_property(inbound, req).await,
            Apdu::ReadPropertyAck(ack) => {
                let value = PropertyValue::from_values(&ack.values);
                self.complete(inbound, ack.invoke_id, Response::ReadPropertyAck(value));
                Ok(())
            }
            Apdu::SimpleAck(ack) => {
                let response = Response::SimpleAck {
                    service_choice: ack.service_choice,
                };
                self.complete(inbound, ack.invoke_id, response);
                Ok(())
            }
            Apdu::Error(err) => {
                let response = Response::Error {
                    class: err.error_class,
                    code: err.error_code,
                };
                self.complete(inbound, err.invoke_id, response);
                Ok(())
            }
            Apdu::Reject(reject) => {
                let response = Response::Reject {
                    reason: reject.reason,
                };
                self.complete(inbound, reject.invoke_id, response);
                Ok(())
            }
            Apdu::Abort(abort) => {
                let response = Response::Abort {
                    reason: abort.reason,
                };
                self.complete(inbound, abort.invoke_id, response);
                Ok(())
            }
        }
    }

    async fn read_property(
        &self,
        inbound: &Inbound,
        req: &ReadPropertyRequest,
    ) -> Result<(), FleetError> {
        let device_id = inbound.device_id;
        let result = self
            .registry
            .read_property(device_id, req.object_id, req.property_id, req.array_index)
            .await;
        let value = match result {
            Ok(value) => value,
            Err(e) => {
                log::debug!("device {device_id}: read {} {}: {e}", req.object_id, req.property_id);
                let (class, code) = e.bacnet_error();
                let reply = BacnetError::new(req.invoke_id, SERVICE_READ_PROPERTY, class, code);
                return self.reply(inbound, &Apdu::Error(reply)).await;
            }
        };

        let object_id = if req.object_id == ObjectId::device(ObjectId::WILDCARD_INSTANCE) {
            ObjectId::device(device_id)
        } else {
            req.object_id
        };
        let ack = Apdu::ReadPropertyAck(ReadPropertyAck {
            invoke_id: req.invoke_id,
            object_id,
            property_id: req.property_id,
            array_index: req.array_index,
            values: value.to_data_values(),
        });
        match encode(&ack) {
            Ok(bytes) => self.send_reply(inbound, &bytes).await,
            Err(EncodeError::BufferTooSmall) => {
                let abort =
                    AbortPdu::from_server(req.invoke_id, AbortReason::SegmentationNotSupported);
                self.reply(inbound, &Apdu::Abort(abort)).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_property(
        &self,
        inbound: &Inbound,
        req: WritePropertyRequest<'_>,
    ) -> Result<(), FleetError> {
        let device_id = inbound.device_id;
        let value = PropertyValue::from_values(&req.values);
        let result = self
            .registry
            .write_property(
                device_id,
                req.object_id,
                req.property_id,
                req.array_index,
                value,
                req.priority,
            )
            .await;
        let reply = match result {
            Ok(()) => {
                log::debug!("device {device_id}: wrote {} {}", req.object_id, req.property_id);
                Apdu::SimpleAck(SimpleAck {
                    invoke_id: req.invoke_id,
                    service_choice: SERVICE_WRITE_PROPERTY,
                })
            }
            Err(e) => {
                log::debug!("device {device_id}: write {} {}: {e}", req.object_id, req.property_id);
                let (class, code) = e.bacnet_error();
                Apdu::Error(BacnetError::new(
                    req.invoke_id,
                    SERVICE_WRITE_PROPERTY,
                    class,
                    code,
                ))
            }
        };
        self.reply(inbound, &reply).await
    }

    /// Confirmed requests whose header was readable still get an answer.
    async fn answer_undecodable(&self, inbound: &Inbound, err: FrameError) -> Result<(), FleetError> {
        let Some(ctx) = err.request else {
            log::debug!(
                "device {}: dropped APDU from {}: {err}",
                inbound.device_id,
                inbound.source
            );
            return Ok(());
        };
        let reply = if ctx.segmented {
            Apdu::Abort(AbortPdu::from_server(
                ctx.invoke_id,
                AbortReason::SegmentationNotSupported,
            ))
        } else {
            let code = match err.kind() {
                DecodeErrorKind::UnsupportedService => ErrorCode::ServiceRequestDenied,
                DecodeErrorKind::TruncatedBuffer => ErrorCode::MissingRequiredParameter,
                DecodeErrorKind::Malformed => ErrorCode::InvalidTag,
            };
            Apdu::Error(BacnetError::new(
                ctx.invoke_id,
                ctx.service_choice,
                ErrorClass::Services,
                code,
            ))
        };
        log::debug!(
            "device {}: answering bad request from {}: {err}",
            inbound.device_id,
            inbound.source
        );
        self.reply(inbound, &reply).await
    }

    fn complete(&self, inbound: &Inbound, invoke_id: u8, response: Response) {
        if !self.pending.complete(inbound.source, invoke_id, response) {
            log::debug!(
                "device {}: unmatched response invoke-id {invoke_id} from {}",
                inbound.device_id,
                inbound.source
            );
        }
    }

    async fn reply(&self, inbound: &Inbound, apdu: &Apdu<'_>) -> Result<(), FleetError> {
        let bytes = encode(apdu)?;
        self.send_reply(inbound, &bytes).await
    }

    async fn send_reply(&self, inbound: &Inbound, bytes: &[u8]) -> Result<(), FleetError> {
        self.mux
            .send(inbound.device_id, inbound.reply_destination(), bytes, false)
            .await
    }
}

async fn worker(
    dispatcher: Arc<Dispatcher>,
    device_id: u32,
    mut queue: mpsc::Receiver<Inbound>,
    cancel: CancellationToken,
) {
    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => break,
            item = queue.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };
        if let Err(e) = dispatcher.handle(&item).await {
            log::debug!("device {device_id}: error handling APDU from {}: {e}", item.source);
        }
    }
}
