//! Identity of the scanned host, used in the run footer and log file name.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Hostname and primary IPv4 address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub hostname: String,
    pub ip: IpAddr,
}

impl HostIdentity {
    pub fn new(hostname: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            hostname: hostname.into(),
            ip,
        }
    }

    /// Detect the identity of this machine.
    ///
    /// The address is the first non-loopback IPv4 address of any interface,
    /// so hosts without a default route still get their own address. Falls
    /// back to `localhost` and the loopback address when detection fails.
    pub fn detect() -> Self {
        let hostname = hostname::get()
            .ok()
            .map(|h| h.to_string_lossy().into_owned())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| {
                log::debug!("Could not determine hostname");
                "localhost".to_string()
            });
        let ip = first_usable_ipv4(interface_ipv4_addrs())
            .or_else(outbound_ipv4)
            .unwrap_or_else(|| {
                log::debug!("Could not determine a non-loopback IPv4 address");
                IpAddr::V4(Ipv4Addr::LOCALHOST)
            });
        Self { hostname, ip }
    }
}

impl fmt::Display for HostIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.hostname, self.ip)
    }
}

/// First address that is neither loopback nor unspecified, in interface order.
fn first_usable_ipv4(addrs: impl IntoIterator<Item = Ipv4Addr>) -> Option<IpAddr> {
    addrs
        .into_iter()
        .find(|ip| !ip.is_loopback() && !ip.is_unspecified())
        .map(IpAddr::V4)
}

/// IPv4 addresses of all interfaces, as reported by `getifaddrs(3)`.
#[cfg(unix)]
fn interface_ipv4_addrs() -> Vec<Ipv4Addr> {
    let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
    // SAFETY: on success `head` owns a list that is released below.
    if unsafe { libc::getifaddrs(&mut head) } != 0 {
        log::debug!("getifaddrs failed: {}", std::io::Error::last_os_error());
        return Vec::new();
    }

    let mut addrs = Vec::new();
    let mut cursor = head;
    while !cursor.is_null() {
        // SAFETY: `cursor` is a node of the list returned by getifaddrs.
        let entry = unsafe { &*cursor };
        if !entry.ifa_addr.is_null() {
            // SAFETY: `ifa_addr` is non-null and points to a sockaddr.
            let family = i32::from(unsafe { (*entry.ifa_addr).sa_family });
            if family == libc::AF_INET {
                // SAFETY: AF_INET addresses are laid out as sockaddr_in.
                let sin = unsafe { &*(entry.ifa_addr as *const libc::sockaddr_in) };
                addrs.push(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)));
            }
        }
        cursor = entry.ifa_next;
    }

    // SAFETY: `head` came from a successful getifaddrs call.
    unsafe { libc::freeifaddrs(head) };
    addrs
}

#[cfg(not(unix))]
fn interface_ipv4_addrs() -> Vec<Ipv4Addr> {
    Vec::new()
}

/// Local address the kernel would use to reach a public IPv4 address.
///
/// Connecting a UDP socket sends no packets.
fn outbound_ipv4() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9)).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_loopback() && !ip.is_unspecified()).then_some(ip)
}
