use bacsim_core::services::IAmRequest;
use bacsim_core::types::Segmentation;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::RwLock;

/// A device heard announcing itself with I-Am.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub device_id: u32,
    pub address: SocketAddr,
    pub max_apdu: u32,
    pub segmentation: Option<Segmentation>,
    pub vendor_id: u32,
    pub last_seen: Instant,
}

#[derive(Debug, Default)]
pub struct PeerTable {
    peers: RwLock<HashMap<u32, PeerInfo>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, i_am: &IAmRequest, address: SocketAddr) {
        let info = PeerInfo {
            device_id: i_am.device_id.instance(),
            address,
            max_apdu: i_am.max_apdu,
            segmentation: i_am.segmentation(),
            vendor_id: i_am.vendor_id,
            last_seen: Instant::now(),
        };
        let previous = self.peers.write().await.insert(info.device_id, info);
        if previous.is_none() {
            log::debug!("new peer device {} at {address}", i_am.device_id.instance());
        }
    }

    pub async fn get(&self, device_id: u32) -> Option<PeerInfo> {
        self.peers.read().await.get(&device_id).cloned()
    }

    /// Peers heard at or after `since`, ordered by instance.
    pub async fn seen_since(&self, since: Instant) -> Vec<PeerInfo> {
        let mut out: Vec<PeerInfo> = self
            .peers
            .read()
            .await
            .values()
            .filter(|p| p.last_seen >= since)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.device_id);
        out
    }

    pub async fn all(&self) -> Vec<PeerInfo> {
        let mut out: Vec<PeerInfo> = self.peers.read().await.values().cloned().collect();
        out.sort_by_key(|p| p.device_id);
        out
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }
}
