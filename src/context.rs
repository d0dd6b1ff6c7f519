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

//! The engine's top-level handle: a bound socket, its send/receive queues,
//! the resource registry, and the set of options this endpoint knows how to
//! handle.
//!
//! Grounded on `examples/original_source/net.c`'s `coap_context_t` /
//! `coap_new_context` / `coap_free_context`.

use crate::clock::{SystemClock, Ticks};
use crate::message::{MsgId, Pdu};
use crate::option::{OptionFilter, OptionNumber};
use crate::queue::Queue;
use crate::registry::{Resource, ResourceRegistry, Responder};
use crate::socketaddr::RemoteAddr;
use crate::trans_params::{StandardCoapConstants, TransParams};
use crate::transaction::TransactionId;
use crate::Error;
use std::net::{ToSocketAddrs, UdpSocket};

/// Called once per inbound response whose request is no longer (or never
/// was) in the send queue -- matching
/// `examples/original_source/net.c`'s `context->response_handler`.
pub trait ResponseHandler: Send {
    /// Handles one inbound response.
    ///
    /// `request` is the matching outbound request's PDU if it was still in
    /// the send queue (`None` if it had already been acknowledged and
    /// removed, e.g. for a separate response arriving after its empty ACK).
    fn handle_response(
        &mut self,
        remote: RemoteAddr,
        request: Option<&Pdu>,
        response: &Pdu,
        id: TransactionId,
    );
}

impl<F> ResponseHandler for F
where
    F: FnMut(RemoteAddr, Option<&Pdu>, &Pdu, TransactionId) + Send,
{
    fn handle_response(
        &mut self,
        remote: RemoteAddr,
        request: Option<&Pdu>,
        response: &Pdu,
        id: TransactionId,
    ) {
        self(remote, request, response, id)
    }
}

/// The message-processing engine's state: one per bound UDP socket.
///
/// `Context` is intentionally `!Sync`: it owns a plain
/// `std::net::UdpSocket` and non-atomic queues, matching the teacher
/// crate's single-owner model for its endpoint types. Callers needing
/// multi-threaded access must synchronize externally.
pub struct Context<P: TransParams = StandardCoapConstants> {
    socket: UdpSocket,
    clock: SystemClock,
    pub(crate) send_queue: Queue,
    pub(crate) recv_queue: Queue,
    pub(crate) registry: ResourceRegistry,
    pub(crate) known_options: OptionFilter,
    pub(crate) response_handler: Option<Box<dyn ResponseHandler>>,
    pub(crate) trans_params: P,
}

/// The option numbers this engine always recognizes, registered by
/// [`Context::new`] exactly as `examples/original_source/net.c`'s
/// `coap_init` registers them via `coap_register_option`.
const DEFAULT_KNOWN_OPTIONS: &[OptionNumber] = &[
    OptionNumber::CONTENT_FORMAT,
    OptionNumber::PROXY_URI,
    OptionNumber::URI_HOST,
    OptionNumber::URI_PORT,
    OptionNumber::URI_PATH,
    OptionNumber::TOKEN,
    OptionNumber::URI_QUERY,
];

impl<P: TransParams> Context<P> {
    /// Binds a new context to `bind_addr` using the default transmission
    /// parameters `P`.
    pub fn new<A: ToSocketAddrs>(bind_addr: A) -> Result<Context<P>, Error> {
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;

        let mut known_options = OptionFilter::new();
        for &number in DEFAULT_KNOWN_OPTIONS {
            known_options.insert(number);
        }

        Ok(Context {
            socket,
            clock: SystemClock::new(),
            send_queue: Queue::new(),
            recv_queue: Queue::new(),
            registry: ResourceRegistry::new(),
            known_options,
            response_handler: None,
            trans_params: P::default(),
        })
    }

    /// Returns the current time, in [`Ticks`].
    pub(crate) fn now(&self) -> Ticks {
        self.clock.now()
    }

    /// Returns this context's transmission parameters.
    pub fn trans_params(&self) -> &P {
        &self.trans_params
    }

    /// Registers `resource`, replacing any resource previously registered
    /// at the same path.
    pub fn register_resource(&mut self, resource: Resource) {
        self.registry.register(resource);
    }

    /// Marks `number` as a known/handled option, so that an inbound message
    /// carrying it as critical is not rejected with a 4.02.
    pub fn register_option(&mut self, number: OptionNumber) {
        self.known_options.insert(number);
    }

    /// Installs the handler invoked for inbound responses
    /// (`examples/original_source/net.c`'s `context->response_handler`).
    pub fn set_response_handler(&mut self, handler: impl ResponseHandler + 'static) {
        self.response_handler = Some(Box::new(handler));
    }

    /// Returns true if both the send and receive queues are empty -- the
    /// signal an external event loop uses to know it can idle indefinitely
    /// rather than waking for a scheduled retransmission.
    pub fn can_exit(&self) -> bool {
        self.send_queue.is_empty() && self.recv_queue.is_empty()
    }

    pub(crate) fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    pub(crate) fn socket_mut(&mut self) -> &mut UdpSocket {
        &mut self.socket
    }
}

/// Lets a [`crate::registry::MethodHandler`] reach back into the `Context`
/// that dispatched it, without depending on its `TransParams` type
/// parameter. Delegates to the inherent [`Context::send_empty_ack`] defined
/// in `sender`; inherent methods take priority over trait methods of the
/// same name, so this does not recurse.
impl<P: TransParams> Responder for Context<P> {
    fn send_empty_ack(&mut self, remote: RemoteAddr, msg_id: MsgId) -> Result<(), Error> {
        Context::send_empty_ack(self, remote, msg_id)
    }
}
