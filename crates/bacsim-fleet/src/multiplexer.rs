//! Socket ownership and inbound demultiplexing.
//!
//! In dedicated mode every device owns one endpoint. In shared mode a single
//! endpoint serves the whole fleet and devices are told apart by their
//! virtual address (DNET/DADR) on the configured virtual network.

use crate::config::{Addressing, DevicePlan};
use crate::error::{BindFailure, FleetError};
use bacsim_core::apdu::ApduType;
use bacsim_core::encoding::{reader::Reader, writer::Writer};
use bacsim_core::npdu::{Npdu, NpduAddress, GLOBAL_NETWORK};
use bacsim_datalink::{
    subnet_broadcast, BacnetIpTransport, BvlcFunction, DataLinkAddress, DataLinkError,
};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

const MAX_NPDU_LEN: usize = 1600;

/// Where an outbound APDU goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Unicast(SocketAddr),
    /// Unicast to a device behind a router; the NPDU carries `route` as
    /// DNET/DADR.
    Routed {
        addr: SocketAddr,
        route: NpduAddress,
    },
    /// The sending device's broadcast address.
    Broadcast,
}

/// One APDU addressed to one local device.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub source: SocketAddr,
    /// SNET/SADR of a routed request.
    pub source_route: Option<NpduAddress>,
    pub device_id: u32,
    pub apdu: Arc<[u8]>,
}

impl Inbound {
    /// Destination that reaches the originator of this APDU.
    pub fn reply_destination(&self) -> Destination {
        match self.source_route {
            Some(route) => Destination::Routed {
                addr: self.source,
                route,
            },
            None => Destination::Unicast(self.source),
        }
    }
}

#[derive(Debug)]
struct Endpoint {
    transport: BacnetIpTransport,
    local: SocketAddr,
    broadcast: SocketAddr,
    devices: Vec<u32>,
    /// Source addresses under which our own datagrams come back.
    own_addrs: Vec<SocketAddr>,
}

impl Endpoint {
    fn is_own(&self, peer: SocketAddr) -> bool {
        self.own_addrs.contains(&peer)
    }
}

#[derive(Debug, Default, Clone)]
struct RouteTable {
    endpoints: Vec<Arc<Endpoint>>,
    by_device: HashMap<u32, usize>,
}

impl RouteTable {
    fn with_endpoint(&self, endpoint: Arc<Endpoint>) -> Self {
        let mut next = self.clone();
        let index = next.endpoints.len();
        for device in &endpoint.devices {
            next.by_device.insert(*device, index);
        }
        next.endpoints.push(endpoint);
        next
    }

    fn endpoint_for(&self, device_id: u32) -> Option<&Arc<Endpoint>> {
        self.by_device
            .get(&device_id)
            .and_then(|i| self.endpoints.get(*i))
    }
}

/// Result of binding the planned endpoints.
#[derive(Debug)]
pub struct BindReport {
    /// Devices that got an endpoint, with the address actually bound.
    pub bound: Vec<(DevicePlan, SocketAddr)>,
    pub failures: Vec<BindFailure>,
}

/// Owns every endpoint of the fleet.
#[derive(Debug)]
pub struct Multiplexer {
    routes: RwLock<Arc<RouteTable>>,
    virtual_network: Option<u16>,
    inbound: Mutex<Option<mpsc::Receiver<Inbound>>>,
    cancel: CancellationToken,
}

impl Multiplexer {
    /// Binds one endpoint per device (or one shared endpoint) and starts a
    /// receive task per endpoint on `tracker`.
    ///
    /// A failed bind is logged and reported; only when nothing could be
    /// bound does this return an error.
    pub async fn bind(
        plans: &[DevicePlan],
        addressing: &Addressing,
        broadcast_override: Option<SocketAddr>,
        broadcast_port: Option<u16>,
        inbound_capacity: usize,
        cancel: CancellationToken,
        tracker: &TaskTracker,
    ) -> Result<(Self, BindReport), FleetError> {
        let groups: Vec<(SocketAddr, Vec<&DevicePlan>)> = match addressing {
            Addressing::PerDevice { .. } => plans.iter().map(|p| (p.bind, vec![p])).collect(),
            Addressing::Shared { bind, .. } => vec![(*bind, plans.iter().collect())],
        };
        let attempted = groups.len();
        let virtual_network = addressing.virtual_network();
        let (tx, rx) = mpsc::channel(inbound_capacity.max(1));

        let mux = Self {
            routes: RwLock::new(Arc::new(RouteTable::default())),
            virtual_network,
            inbound: Mutex::new(Some(rx)),
            cancel: cancel.clone(),
        };
        let mut report = BindReport {
            bound: Vec::with_capacity(plans.len()),
            failures: Vec::new(),
        };

        for (addr, members) in groups {
            let devices: Vec<u32> = members.iter().map(|p| p.instance).collect();
            let endpoint =
                match open_endpoint(
                    addr,
                    devices.clone(),
                    addressing.prefix_len(),
                    broadcast_override,
                    broadcast_port,
                )
                .await
                {
                    Ok(endpoint) => Arc::new(endpoint),
                    Err(error) => {
                        log::warn!("bind {addr} failed, skipping devices {devices:?}: {error}");
                        report.failures.push(BindFailure {
                            devices,
                            addr,
                            error,
                        });
                        continue;
                    }
                };
            log::info!(
                "endpoint {} (broadcast {}) serving devices {:?}",
                endpoint.local,
                endpoint.broadcast,
                endpoint.devices
            );
            for plan in members {
                report.bound.push((plan.clone(), endpoint.local));
            }
            mux.publish(endpoint.clone());
            tracker.spawn(receive_loop(
                endpoint,
                virtual_network,
                tx.clone(),
                cancel.clone(),
            ));
        }

        if report.bound.is_empty() {
            return Err(FleetError::AllBindsFailed(attempted));
        }
        Ok((mux, report))
    }

    fn publish(&self, endpoint: Arc<Endpoint>) {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        let next = routes.with_endpoint(endpoint);
        *routes = Arc::new(next);
    }

    fn routes(&self) -> Arc<RouteTable> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The inbound stream. It can be taken once and ends at shutdown.
    pub fn take_inbound(&self) -> Result<mpsc::Receiver<Inbound>, FleetError> {
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(FleetError::InboundTaken)
    }

    pub fn virtual_network(&self) -> Option<u16> {
        self.virtual_network
    }

    pub fn local_addr(&self, device_id: u32) -> Option<SocketAddr> {
        self.routes().endpoint_for(device_id).map(|e| e.local)
    }

    pub fn broadcast_addr(&self, device_id: u32) -> Option<SocketAddr> {
        self.routes().endpoint_for(device_id).map(|e| e.broadcast)
    }

    /// Wraps `apdu` in an NPDU and sends it from `device_id`'s endpoint.
    pub async fn send(
        &self,
        device_id: u32,
        destination: Destination,
        apdu: &[u8],
        expecting_reply: bool,
    ) -> Result<(), FleetError> {
        let routes = self.routes();
        let endpoint = routes
            .endpoint_for(device_id)
            .ok_or(FleetError::NoRoute(device_id))?;

        let mut npdu = Npdu::for_apdu(expecting_reply);
        if let Some(network) = self.virtual_network {
            npdu.source = Some(NpduAddress::virtual_device(network, device_id));
        }
        let (target, broadcast) = match destination {
            Destination::Unicast(addr) => (addr, false),
            Destination::Routed { addr, route } => {
                npdu.destination = Some(route);
                npdu.hop_count = Some(255);
                (addr, false)
            }
            Destination::Broadcast => (endpoint.broadcast, true),
        };

        let mut buf = [0u8; MAX_NPDU_LEN];
        let mut w = Writer::new(&mut buf);
        npdu.encode(&mut w)?;
        w.write_all(apdu)?;
        let frame = w.as_written();

        let transport = &endpoint.transport;
        let sent = async {
            if broadcast {
                transport
                    .send_broadcast(DataLinkAddress::Ip(target), frame)
                    .await
            } else {
                transport.send(DataLinkAddress::Ip(target), frame).await
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FleetError::Cancelled),
            result = sent => result.map_err(FleetError::from),
        }
    }
}

async fn open_endpoint(
    addr: SocketAddr,
    devices: Vec<u32>,
    prefix_len: u8,
    broadcast_override: Option<SocketAddr>,
    broadcast_port: Option<u16>,
) -> Result<Endpoint, DataLinkError> {
    let transport = BacnetIpTransport::bind(addr).await?;
    let local = transport.local_addr()?;
    let port = broadcast_port.unwrap_or(local.port());
    let broadcast = match (broadcast_override, local.ip()) {
        (Some(addr), _) => addr,
        (None, IpAddr::V4(ip)) => SocketAddr::new(IpAddr::V4(subnet_broadcast(ip, prefix_len)?), port),
        (None, IpAddr::V6(_)) => SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), port),
    };
    let own_addrs = own_addresses(local, broadcast);
    Ok(Endpoint {
        transport,
        local,
        broadcast,
        devices,
        own_addrs,
    })
}

/// A socket bound to the unspecified address sees its own broadcasts come
/// back from the outbound interface address, which the OS picks by route.
fn own_addresses(local: SocketAddr, broadcast: SocketAddr) -> Vec<SocketAddr> {
    let mut addrs = vec![local];
    if !local.ip().is_unspecified() {
        return addrs;
    }
    let probe = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).and_then(|s| {
        s.set_broadcast(true)?;
        s.connect(broadcast)?;
        s.local_addr()
    });
    match probe {
        Ok(route) => addrs.push(SocketAddr::new(route.ip(), local.port())),
        Err(e) => log::debug!("cannot resolve outbound address for {local}: {e}"),
    }
    addrs
}

async fn receive_loop(
    endpoint: Arc<Endpoint>,
    virtual_network: Option<u16>,
    tx: mpsc::Sender<Inbound>,
    cancel: CancellationToken,
) {
    let mut buf = [0u8; MAX_NPDU_LEN];
    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            r = endpoint.transport.recv(&mut buf) => r,
        };
        let received = match received {
            Ok(r) => r,
            Err(e) if e.is_per_frame() => {
                log::debug!("endpoint {}: dropped frame: {e}", endpoint.local);
                continue;
            }
            Err(e) => {
                log::warn!("endpoint {}: receive failed: {e}", endpoint.local);
                continue;
            }
        };
        if endpoint.is_own(received.peer) {
            log::trace!("endpoint {}: dropped own datagram", endpoint.local);
            continue;
        }

        let mut r = Reader::new(&buf[..received.len]);
        let npdu = match Npdu::decode(&mut r) {
            Ok(npdu) => npdu,
            Err(e) => {
                log::debug!("endpoint {}: bad NPDU from {}: {e}", endpoint.local, received.peer);
                continue;
            }
        };
        if npdu.is_network_message() {
            log::trace!("endpoint {}: ignored network message", endpoint.local);
            continue;
        }
        let apdu: Arc<[u8]> = Arc::from(r.read_rest());
        let Some(&first) = apdu.first() else {
            continue;
        };
        let broadcast = received.function != BvlcFunction::OriginalUnicastNpdu;
        let targets = resolve_targets(
            &endpoint.devices,
            virtual_network,
            npdu.destination,
            ApduType::of_first_octet(first),
            broadcast,
        );
        if targets.is_empty() {
            log::debug!(
                "endpoint {}: no local device for APDU from {}",
                endpoint.local,
                received.peer
            );
            continue;
        }

        let source = received.source.as_socket_addr();
        for device_id in targets {
            let item = Inbound {
                source,
                source_route: npdu.source,
                device_id,
                apdu: apdu.clone(),
            };
            tokio::select! {
                _ = cancel.cancelled() => return,
                sent = tx.send(item) => if sent.is_err() {
                    return;
                },
            }
        }
    }
}

/// Local devices an APDU is meant for.
fn resolve_targets(
    devices: &[u32],
    virtual_network: Option<u16>,
    destination: Option<NpduAddress>,
    apdu_type: Option<ApduType>,
    broadcast: bool,
) -> Vec<u32> {
    match (virtual_network, destination) {
        (_, Some(dest)) if dest.network == GLOBAL_NETWORK => devices.to_vec(),
        (None, Some(_)) => Vec::new(),
        (None, None) => devices.to_vec(),
        (Some(network), Some(dest)) => {
            if dest.network != network {
                return Vec::new();
            }
            if dest.is_broadcast() {
                return devices.to_vec();
            }
            match dest.virtual_instance() {
                Some(id) if devices.contains(&id) => vec![id],
                _ => Vec::new(),
            }
        }
        (Some(_), None) => {
            if broadcast || devices.len() == 1 {
                return devices.to_vec();
            }
            match apdu_type {
                Some(ApduType::UnconfirmedRequest) => devices.to_vec(),
                // Responses complete fleet-wide pending entries; any device
                // will do.
                Some(t) if t.is_response() => devices.iter().take(1).copied().collect(),
                _ => Vec::new(),
            }
        }
    }
}
