//! Outbound discovery traffic: I-Am announcements and Who-Is probes.
//!
//! Every emission is a task on the fleet's [`TaskTracker`] that sleeps on
//! the fleet's cancellation token, so shutdown stops pending announcements
//! as well as periodic ones.

use crate::config::DiscoveryConfig;
use crate::error::FleetError;
use crate::multiplexer::{Destination, Multiplexer};
use crate::registry::DeviceRegistry;
use bacsim_core::services::{IAmRequest, WhoIsRequest};
use bacsim_core::types::Segmentation;
use bacsim_core::{encode, Apdu, MAX_APDU_LEN};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Uniform random delay in `0..=max`.
pub fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    rand::thread_rng().gen_range(Duration::ZERO..=max)
}

/// Sends discovery APDUs on behalf of a device.
#[derive(Debug, Clone)]
pub struct Emitter {
    mux: Arc<Multiplexer>,
    registry: Arc<DeviceRegistry>,
    cancel: CancellationToken,
}

impl Emitter {
    pub fn new(
        mux: Arc<Multiplexer>,
        registry: Arc<DeviceRegistry>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            mux,
            registry,
            cancel,
        }
    }

    /// Sleeps for `delay`; false when cancelled first.
    async fn sleep(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    pub async fn i_am(&self, device_id: u32) -> Result<(), FleetError> {
        let device = self.registry.get(device_id)?;
        let apdu = encode(&Apdu::IAm(IAmRequest {
            device_id: device.object_id(),
            max_apdu: MAX_APDU_LEN as u32,
            segmentation: Segmentation::NoSegmentation.to_u32(),
            vendor_id: u32::from(device.vendor_id()),
        }))?;
        self.mux
            .send(device_id, Destination::Broadcast, &apdu, false)
            .await?;
        log::debug!("device {device_id}: I-Am sent");
        Ok(())
    }

    pub async fn who_is(&self, device_id: u32, request: WhoIsRequest) -> Result<(), FleetError> {
        let apdu = encode(&Apdu::WhoIs(request))?;
        self.mux
            .send(device_id, Destination::Broadcast, &apdu, false)
            .await?;
        log::debug!("device {device_id}: Who-Is sent");
        Ok(())
    }

    async fn i_am_logged(&self, device_id: u32) {
        match self.i_am(device_id).await {
            Ok(()) | Err(FleetError::Cancelled) => {}
            Err(e) => log::warn!("device {device_id}: I-Am failed: {e}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryScheduler {
    emitter: Emitter,
    settings: DiscoveryConfig,
    tracker: TaskTracker,
}

impl DiscoveryScheduler {
    pub fn new(emitter: Emitter, settings: DiscoveryConfig, tracker: TaskTracker) -> Self {
        Self {
            emitter,
            settings,
            tracker,
        }
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Starts startup announcements, periodic re-announcements and startup
    /// Who-Is for every device.
    pub fn start(&self, devices: &[u32]) {
        for &device_id in devices {
            if self.settings.announce || self.settings.interval.is_some() {
                self.tracker.spawn(announce(
                    self.emitter.clone(),
                    device_id,
                    self.settings.clone(),
                ));
            }
            if let Some(delay) = self.settings.startup_who_is {
                let emitter = self.emitter.clone();
                self.tracker.spawn(async move {
                    if !emitter.sleep(delay).await {
                        return;
                    }
                    match emitter.who_is(device_id, WhoIsRequest::global()).await {
                        Ok(()) | Err(FleetError::Cancelled) => {}
                        Err(e) => log::warn!("device {device_id}: Who-Is failed: {e}"),
                    }
                });
            }
        }
    }

    /// One I-Am from `device_id` after a random delay in `0..=max_delay`.
    pub fn schedule_i_am(&self, device_id: u32, max_delay: Duration) {
        let emitter = self.emitter.clone();
        let delay = jitter(max_delay);
        self.tracker.spawn(async move {
            if emitter.sleep(delay).await {
                emitter.i_am_logged(device_id).await;
            }
        });
    }
}

async fn announce(emitter: Emitter, device_id: u32, settings: DiscoveryConfig) {
    if settings.announce {
        let delay = settings.startup_delay + jitter(settings.max_jitter);
        if !emitter.sleep(delay).await {
            return;
        }
        emitter.i_am_logged(device_id).await;
    }
    let Some(period) = settings.interval else {
        return;
    };
    loop {
        if !emitter.sleep(period + jitter(settings.max_jitter)).await {
            return;
        }
        emitter.i_am_logged(device_id).await;
    }
}
