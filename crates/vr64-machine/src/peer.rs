use std::io;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};

pub const DEFAULT_NETPLAY_PORT: u16 = 45000;

/// Register set from received peer input.
pub const PEER_REGISTER: usize = 6;

const RECV_BUFFER: usize = 1024;

/// A remote input source polled once per iteration.
///
/// Implementations never block and never fail; transport errors are the implementation's
/// problem.
pub trait PeerInput: Send {
    /// Next received payload, if one is waiting.
    fn poll(&mut self) -> Option<Vec<u8>>;

    fn send(&mut self, payload: &[u8]);
}

/// Folds a payload into a register value: its big-endian integer value modulo `0xFFFF`.
pub fn payload_value(payload: &[u8]) -> u32 {
    payload
        .iter()
        .fold(0u32, |acc, &b| (acc * 256 + b as u32) % 0xFFFF)
}

/// Non-blocking UDP peer.
///
/// In host mode the remote address is learned from the first datagram received.
#[derive(Debug)]
pub struct UdpPeer {
    socket: UdpSocket,
    remote: Option<SocketAddr>,
}

impl UdpPeer {
    pub fn host(port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))?;
        socket.set_nonblocking(true)?;
        tracing::info!(addr = %socket.local_addr()?, "netplay host listening");
        Ok(Self {
            socket,
            remote: None,
        })
    }

    pub fn connect(remote: impl ToSocketAddrs) -> io::Result<Self> {
        let remote = remote
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no address for peer"))?;
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_nonblocking(true)?;
        tracing::info!(%remote, "netplay client ready");
        Ok(Self {
            socket,
            remote: Some(remote),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn remote(&self) -> Option<SocketAddr> {
        self.remote
    }
}

impl PeerInput for UdpPeer {
    fn poll(&mut self) -> Option<Vec<u8>> {
        let mut buf = [0u8; RECV_BUFFER];
        match self.socket.recv_from(&mut buf) {
            Ok((0, _)) => None,
            Ok((len, from)) => {
                self.remote.get_or_insert(from);
                Some(buf[..len].to_vec())
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => None,
            Err(err) => {
                tracing::debug!(%err, "netplay receive failed");
                None
            }
        }
    }

    fn send(&mut self, payload: &[u8]) {
        let Some(remote) = self.remote else {
            return;
        };
        if let Err(err) = self.socket.send_to(payload, remote) {
            tracing::debug!(%err, %remote, "netplay send failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn payload_value_is_big_endian_mod_ffff() {
        assert_eq!(payload_value(&[]), 0);
        assert_eq!(payload_value(&[0x12, 0x34]), 0x1234);
        assert_eq!(payload_value(&[0xFF, 0xFF]), 0);
        assert_eq!(payload_value(b"Up"), u32::from_be_bytes([0, 0, b'U', b'p']) % 0xFFFF);
        let long = [0xABu8; 9];
        let expected = long.iter().fold(0u128, |acc, &b| acc * 256 + b as u128) % 0xFFFF;
        assert_eq!(payload_value(&long) as u128, expected);
    }

    fn poll_until(peer: &mut UdpPeer) -> Option<Vec<u8>> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Some(payload) = peer.poll() {
                return Some(payload);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn host_learns_client_address() {
        let mut host = UdpPeer::host(0).unwrap();
        let port = host.local_addr().unwrap().port();
        let mut client = UdpPeer::connect((Ipv4Addr::LOCALHOST, port)).unwrap();

        assert_eq!(host.poll(), None);
        client.send(b"Start");
        assert_eq!(poll_until(&mut host).as_deref(), Some(&b"Start"[..]));
        assert!(host.remote().is_some());

        host.send(b"A");
        assert_eq!(poll_until(&mut client).as_deref(), Some(&b"A"[..]));
    }
}
