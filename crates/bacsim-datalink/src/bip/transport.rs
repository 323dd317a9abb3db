use crate::bip::bvlc::{BvlcFrame, BvlcFunction, BvlcHeader, BVLC_HEADER_LEN};
use crate::{DataLinkAddress, DataLinkError};
use bacsim_core::encoding::writer::Writer;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;

const MAX_BIP_FRAME_LEN: usize = 1600;

/// One datagram's NPDU as handed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    pub len: usize,
    /// Originator: the UDP peer, or the forwarded origin of a Forwarded-NPDU.
    pub source: DataLinkAddress,
    /// The UDP peer that actually sent the datagram.
    pub peer: SocketAddr,
    pub function: BvlcFunction,
}

/// BACnet/IP endpoint. Cloning shares the socket.
#[derive(Debug, Clone)]
pub struct BacnetIpTransport {
    socket: Arc<UdpSocket>,
}

impl BacnetIpTransport {
    pub async fn bind(bind_addr: SocketAddr) -> Result<Self, DataLinkError> {
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|source| DataLinkError::Bind {
                addr: bind_addr,
                source,
            })?;
        socket.set_broadcast(true)?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DataLinkError> {
        self.socket.local_addr().map_err(DataLinkError::Io)
    }

    /// Sends `npdu` as Original-Unicast-NPDU, or as Original-Broadcast-NPDU
    /// when `address` is the limited broadcast address.
    pub async fn send(&self, address: DataLinkAddress, npdu: &[u8]) -> Result<(), DataLinkError> {
        let addr = address.as_socket_addr();
        let is_broadcast = matches!(addr.ip(), IpAddr::V4(v4) if v4.is_broadcast());
        let function = if is_broadcast {
            BvlcFunction::OriginalBroadcastNpdu
        } else {
            BvlcFunction::OriginalUnicastNpdu
        };
        self.send_frame(function, addr, npdu).await
    }

    /// Sends `npdu` as Original-Broadcast-NPDU to a directed broadcast
    /// address.
    pub async fn send_broadcast(
        &self,
        address: DataLinkAddress,
        npdu: &[u8],
    ) -> Result<(), DataLinkError> {
        self.send_frame(
            BvlcFunction::OriginalBroadcastNpdu,
            address.as_socket_addr(),
            npdu,
        )
        .await
    }

    async fn send_frame(
        &self,
        function: BvlcFunction,
        target: SocketAddr,
        payload: &[u8],
    ) -> Result<(), DataLinkError> {
        let mut frame = [0u8; MAX_BIP_FRAME_LEN];
        let total_len = BVLC_HEADER_LEN
            .checked_add(payload.len())
            .ok_or(DataLinkError::FrameTooLarge)?;
        if total_len > frame.len() {
            return Err(DataLinkError::FrameTooLarge);
        }

        let mut w = Writer::new(&mut frame);
        BvlcHeader {
            function,
            length: total_len as u16,
        }
        .encode(&mut w)
        .map_err(|_| DataLinkError::InvalidFrame)?;
        w.write_all(payload)
            .map_err(|_| DataLinkError::FrameTooLarge)?;

        self.socket.send_to(w.as_written(), target).await?;
        Ok(())
    }

    /// Receives the next datagram and copies its NPDU into `buf`.
    ///
    /// Malformed datagrams and BVLC functions that do not carry an NPDU
    /// are reported as per-frame errors; see
    /// [`DataLinkError::is_per_frame`].
    pub async fn recv(&self, buf: &mut [u8]) -> Result<Received, DataLinkError> {
        let mut frame = [0u8; MAX_BIP_FRAME_LEN];
        let (n, peer) = self.socket.recv_from(&mut frame).await?;
        let parsed = BvlcFrame::decode(&frame[..n]).map_err(|_| DataLinkError::InvalidFrame)?;

        match parsed.function {
            f if f.carries_npdu() => {}
            BvlcFunction::Unknown(v) => return Err(DataLinkError::UnsupportedBvlcFunction(v)),
            _ => return Err(DataLinkError::InvalidFrame),
        }
        if parsed.payload.len() > buf.len() {
            return Err(DataLinkError::FrameTooLarge);
        }
        buf[..parsed.payload.len()].copy_from_slice(parsed.payload);
        let source = match parsed.forwarded_from {
            Some(origin) => SocketAddr::V4(origin),
            None => peer,
        };
        Ok(Received {
            len: parsed.payload.len(),
            source: DataLinkAddress::Ip(source),
            peer,
            function: parsed.function,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::BacnetIpTransport;
    use crate::bip::bvlc::{BvlcFunction, BvlcHeader, BVLC_TYPE_BIP};
    use crate::{DataLinkAddress, DataLinkError};
    use bacsim_core::encoding::writer::Writer;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tokio::net::UdpSocket;

    fn localhost() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn unicast_frames_are_wrapped_and_unwrapped() {
        let a = BacnetIpTransport::bind(localhost()).await.unwrap();
        let b = BacnetIpTransport::bind(localhost()).await.unwrap();
        let b_addr = b.local_addr().unwrap();

        a.send(DataLinkAddress::Ip(b_addr), &[0x01, 0x00, 0x10, 0x08])
            .await
            .unwrap();

        let mut out = [0u8; 16];
        let got = b.recv(&mut out).await.unwrap();
        assert_eq!(&out[..got.len], &[0x01, 0x00, 0x10, 0x08]);
        assert_eq!(got.function, BvlcFunction::OriginalUnicastNpdu);
        assert_eq!(got.source, DataLinkAddress::Ip(a.local_addr().unwrap()));
    }

    #[tokio::test]
    async fn explicit_broadcast_uses_broadcast_function() {
        let a = BacnetIpTransport::bind(localhost()).await.unwrap();
        let listener = UdpSocket::bind(localhost()).await.unwrap();
        a.send_broadcast(
            DataLinkAddress::Ip(listener.local_addr().unwrap()),
            &[0x01, 0x00],
        )
        .await
        .unwrap();

        let mut raw = [0u8; 16];
        let (n, _) = listener.recv_from(&mut raw).await.unwrap();
        assert_eq!(&raw[..n], &[BVLC_TYPE_BIP, 0x0B, 0x00, 0x06, 0x01, 0x00]);
    }

    #[tokio::test]
    async fn recv_forwarded_npdu_returns_forwarded_origin() {
        let transport = BacnetIpTransport::bind(localhost()).await.unwrap();
        let target = transport.local_addr().unwrap();
        let sender = UdpSocket::bind(localhost()).await.unwrap();

        let mut frame = [0u8; 64];
        let mut w = Writer::new(&mut frame);
        BvlcHeader {
            function: BvlcFunction::ForwardedNpdu,
            length: 4 + 6 + 3,
        }
        .encode(&mut w)
        .unwrap();
        w.write_all(&[10, 1, 2, 3]).unwrap();
        w.write_be_u16(47808).unwrap();
        w.write_all(&[1, 2, 3]).unwrap();

        sender.send_to(w.as_written(), target).await.unwrap();

        let mut out = [0u8; 16];
        let got = transport.recv(&mut out).await.unwrap();
        assert_eq!(got.len, 3);
        assert_eq!(&out[..3], &[1, 2, 3]);
        assert_eq!(
            got.source,
            DataLinkAddress::Ip(SocketAddr::new(
                IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)),
                47808
            ))
        );
        assert_eq!(got.peer, sender.local_addr().unwrap());
    }

    #[tokio::test]
    async fn unknown_bvlc_function_errors() {
        let transport = BacnetIpTransport::bind(localhost()).await.unwrap();
        let target = transport.local_addr().unwrap();
        let sender = UdpSocket::bind(localhost()).await.unwrap();

        let frame = [BVLC_TYPE_BIP, 0x99, 0x00, 0x04];
        sender.send_to(&frame, target).await.unwrap();

        let mut out = [0u8; 16];
        let err = transport.recv(&mut out).await.unwrap_err();
        assert!(matches!(err, DataLinkError::UnsupportedBvlcFunction(0x99)));
        assert!(err.is_per_frame());
    }

    #[tokio::test]
    async fn bind_conflict_names_the_address() {
        let taken = UdpSocket::bind(localhost()).await.unwrap();
        let addr = taken.local_addr().unwrap();
        let err = BacnetIpTransport::bind(addr).await.unwrap_err();
        assert!(matches!(err, DataLinkError::Bind { addr: a, .. } if a == addr));
    }
}
