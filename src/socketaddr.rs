// Copyright 2019 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr, SocketAddrV4, SocketAddrV6};

/// A peer address, wrapping [`std::net::SocketAddr`] with the comparison
/// rule this engine's transaction matching depends on.
///
/// `std::net::SocketAddrV6`'s derived `PartialEq` compares `flowinfo` and
/// `scope_id` along with the address and port. Two packets from the same
/// peer can legitimately arrive with different `flowinfo` values (it's
/// traffic-class/flow-label metadata, not part of the peer's identity), so
/// comparing it would make deduplication and retransmission matching miss
/// packets that are really from the same transaction. `RemoteAddr` compares
/// only the port and the 128-bit address for IPv6, and the full socket
/// address for IPv4 (which has no such extra fields to begin with).
#[derive(Copy, Clone, Debug)]
pub struct RemoteAddr(pub SocketAddr);

impl RemoteAddr {
    /// Wraps `addr`.
    pub fn new(addr: SocketAddr) -> RemoteAddr {
        RemoteAddr(addr)
    }

    /// Returns the wrapped [`std::net::SocketAddr`].
    pub fn socket_addr(&self) -> SocketAddr {
        self.0
    }

    /// Returns the port number for this address.
    pub fn port(&self) -> u16 {
        self.0.port()
    }

    /// Determines if this address is a multicast (or IPv4 broadcast)
    /// address.
    pub fn is_multicast(&self) -> bool {
        match self.0.ip() {
            IpAddr::V4(addr) => addr.is_multicast() || addr.is_broadcast(),
            IpAddr::V6(addr) => addr.is_multicast(),
        }
    }

    fn v4(&self) -> Option<SocketAddrV4> {
        match self.0 {
            SocketAddr::V4(addr) => Some(addr),
            SocketAddr::V6(_) => None,
        }
    }

    fn v6(&self) -> Option<SocketAddrV6> {
        match self.0 {
            SocketAddr::V4(_) => None,
            SocketAddr::V6(addr) => Some(addr),
        }
    }
}

impl From<SocketAddr> for RemoteAddr {
    fn from(addr: SocketAddr) -> Self {
        RemoteAddr(addr)
    }
}

impl core::fmt::Display for RemoteAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl PartialEq for RemoteAddr {
    fn eq(&self, other: &Self) -> bool {
        match (self.v4(), other.v4()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => {
                let (a, b) = (self.v6().unwrap(), other.v6().unwrap());
                a.port() == b.port() && a.ip() == b.ip()
            }
            _ => false,
        }
    }
}

impl Eq for RemoteAddr {}

impl Hash for RemoteAddr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.v4() {
            Some(addr) => {
                0u8.hash(state);
                addr.hash(state);
            }
            None => {
                let addr = self.v6().unwrap();
                1u8.hash(state);
                addr.port().hash(state);
                addr.ip().hash(state);
            }
        }
    }
}
