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

//! Datagram admission: reading one inbound packet and queuing it for
//! dispatch.
//!
//! Grounded on `examples/original_source/net.c`'s `coap_read`: validate
//! size and version, decode, compute the transaction id from peer and
//! token, and insert into the receive queue in arrival order.

use crate::context::Context;
use crate::message::codec;
use crate::message::COAP_VERSION;
use crate::queue::QueueNode;
use crate::socketaddr::RemoteAddr;
use crate::trans_params::TransParams;
use crate::transaction::transaction_id;
use crate::Error;
use std::io::ErrorKind;

/// Size of the stack buffer used to receive one datagram.
///
/// Matches `TransParams::MAX_OUTBOUND_PACKET_LENGTH`'s default; kept as a
/// plain constant here rather than `P::MAX_OUTBOUND_PACKET_LENGTH` since a
/// generic associated const can't be used as a fixed-size array length on
/// stable Rust.
const MAX_DATAGRAM_SIZE: usize = 1152;

impl<P: TransParams> Context<P> {
    /// Reads at most one inbound datagram and queues it for dispatch.
    ///
    /// Returns `Ok(true)` if a (well-formed) datagram was read and queued,
    /// `Ok(false)` if no datagram was available (the socket is
    /// non-blocking; this is the normal "nothing to do right now" result
    /// for an external event loop polling this context), or an error for
    /// any other I/O failure. A datagram that fails to parse, or that
    /// carries an unrecognized protocol version, is logged and dropped --
    /// matching the original's `coap_read`, which discards and returns
    /// without treating either condition as a fatal I/O error.
    pub fn read(&mut self) -> Result<bool, Error> {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let (len, src) = match self.socket().recv_from(&mut buf) {
            Ok(result) => result,
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(false),
            Err(e) => return Err(Error::from(e)),
        };

        let pdu = match codec::decode(&buf[..len]) {
            Ok(pdu) => pdu,
            Err(e) => {
                log::debug!("read: discarded unparseable frame: {:?}", e);
                return Ok(false);
            }
        };

        if pdu.version != COAP_VERSION {
            log::debug!("read: discarded frame with unknown version {}", pdu.version);
            return Ok(false);
        }

        let remote = RemoteAddr::new(src);
        let id = transaction_id(&remote, pdu.token().as_bytes());
        let now = self.now();

        log::debug!("read: queued {} bytes from {} (tid {:?})", len, remote, id);

        self.recv_queue.insert(QueueNode::new(pdu, remote, id, now));

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MsgCode, MsgType, Pdu};
    use crate::trans_params::StandardCoapConstants;
    use std::time::Duration;

    type TestContext = Context<StandardCoapConstants>;

    #[test]
    fn read_returns_false_when_nothing_is_pending() {
        let mut ctx = TestContext::new("127.0.0.1:0").unwrap();
        assert_eq!(ctx.read().unwrap(), Ok(false).unwrap());
    }

    #[test]
    fn read_admits_a_well_formed_datagram_into_the_receive_queue() {
        let mut server = TestContext::new("127.0.0.1:0").unwrap();
        let client = TestContext::new("127.0.0.1:0").unwrap();
        let server_addr = server.socket().local_addr().unwrap();

        let mut pdu = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        pdu.set_uri_path("time");
        let mut buf = [0u8; 256];
        let len = codec::encode(&pdu, &mut buf).unwrap();
        client.socket().send_to(&buf[..len], server_addr).unwrap();

        let mut read_one = false;
        for _ in 0..200 {
            if server.read().unwrap() {
                read_one = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(read_one, "datagram never arrived");
        assert_eq!(server.recv_queue.pop_next().unwrap().pdu.uri_path(), "time");
    }

    #[test]
    fn read_discards_an_unparseable_frame_without_erroring() {
        let mut server = TestContext::new("127.0.0.1:0").unwrap();
        let client = TestContext::new("127.0.0.1:0").unwrap();
        let server_addr = server.socket().local_addr().unwrap();

        // Too short to even hold a four-byte header.
        client.socket().send_to(&[0xFFu8], server_addr).unwrap();

        let mut saw_the_datagram = false;
        for _ in 0..200 {
            match server.read() {
                Ok(true) => panic!("a malformed frame must not be admitted"),
                Ok(false) => {
                    // Either nothing has arrived yet, or it arrived and was
                    // discarded -- both return `Ok(false)`, so give the
                    // datagram a little longer to show up before concluding
                    // it was discarded.
                    saw_the_datagram = true;
                }
                Err(e) => panic!("unexpected I/O error: {:?}", e),
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(saw_the_datagram);
        assert!(server.recv_queue.is_empty());
    }
}
