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

//! Transaction identification: matching an inbound ACK/RST/response back to
//! the outbound message it belongs to.
//!
//! Grounded on `examples/original_source/net.c`'s `coap_transaction_id`: the
//! peer address is hashed (the full socket address for IPv4, just the port
//! and 128-bit address for IPv6, so that `flowinfo`/`scope_id` never affect
//! matching), the token is hashed in after it, and the resulting digest is
//! folded down to 16 bits by XORing its two halves together.

use crate::socketaddr::RemoteAddr;
use std::net::SocketAddr;

/// A transaction id: the result of hashing a peer address and token
/// together, used to match retransmission-queue entries against inbound
/// ACKs/RSTs/responses without storing the full address+token pair in the
/// hot path.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TransactionId(pub u16);

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// A minimal FNV-1a hasher that can be fed multiple byte spans in sequence.
///
/// `examples/original_source/net.c` treats `coap_hash` as an injected
/// collaborator (its own definition lives outside `net.c`); FNV-1a is this
/// crate's concrete choice: deterministic, allocation-free, and good enough
/// avalanche behavior for a 16-bit transaction key.
pub(crate) struct CoapHasher(u32);

impl CoapHasher {
    pub(crate) fn new() -> CoapHasher {
        CoapHasher(FNV_OFFSET_BASIS)
    }

    pub(crate) fn update(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u32;
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    pub(crate) fn finish(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

/// Hashes `peer` and `token` together into a 4-byte digest, matching the
/// address-then-token hashing order of `coap_transaction_id`.
pub(crate) fn coap_hash(peer: &RemoteAddr, token: &[u8]) -> [u8; 4] {
    let mut hasher = CoapHasher::new();

    match peer.socket_addr() {
        SocketAddr::V4(addr) => {
            hasher.update(&addr.ip().octets());
            hasher.update(&addr.port().to_be_bytes());
        }
        SocketAddr::V6(addr) => {
            hasher.update(&addr.port().to_be_bytes());
            hasher.update(&addr.ip().octets());
        }
    }

    hasher.update(token);
    hasher.finish()
}

/// Computes the transaction id for a message exchanged with `peer` carrying
/// `token`.
///
/// Called once at enqueue time for every outbound message, and once per
/// inbound message during dispatch, regardless of whether the send actually
/// succeeds -- the id is a pure function of address and token, not of
/// delivery outcome.
pub fn transaction_id(peer: &RemoteAddr, token: &[u8]) -> TransactionId {
    let h = coap_hash(peer, token);
    let id = ((u16::from(h[0]) << 8) | u16::from(h[1])) ^ ((u16::from(h[2]) << 8) | u16::from(h[3]));
    TransactionId(id)
}
