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

//! Routes receive-queue entries to ACK/RST matching, resource handlers, or
//! the response callback.
//!
//! Grounded on `examples/original_source/net.c`'s `coap_dispatch` /
//! `handle_request` / `handle_response`. This is the one place in the
//! engine where all the other collaborators -- the queues, the criticality
//! screener, the response builders, and the resource registry -- meet.

use crate::context::Context;
use crate::message::{MsgCode, MsgType, Pdu};
use crate::option::OptionFilter;
use crate::queue::QueueNode;
use crate::registry::{hash_request_uri, ResourceRegistry};
use crate::response::wellknown_response;
use crate::socketaddr::RemoteAddr;
use crate::trans_params::TransParams;
use crate::transaction::TransactionId;

impl<P: TransParams> Context<P> {
    /// Drains the receive queue, dispatching each entry in arrival order.
    ///
    /// Matches `spec.md` §8 invariant 9: the receive queue is always empty
    /// once this returns.
    pub fn dispatch(&mut self) {
        while let Some(node) = self.recv_queue.pop_next() {
            self.dispatch_one(node);
        }
    }

    fn dispatch_one(&mut self, node: QueueNode) {
        let QueueNode { pdu, remote, id, .. } = node;

        if pdu.version != crate::message::COAP_VERSION {
            log::debug!("dispatch: dropped pdu with unexpected version {}", pdu.version);
            return;
        }

        match pdu.msg_type {
            MsgType::Ack => self.handle_ack(pdu, remote, id),
            MsgType::Rst => self.handle_rst(remote, id),
            MsgType::Non | MsgType::Con => self.handle_non_or_con(pdu, remote, id),
        }
    }

    fn handle_ack(&mut self, pdu: Pdu, remote: RemoteAddr, id: TransactionId) {
        match self.send_queue.remove_by_id(id) {
            Some(sent) if pdu.is_empty() => {
                log::debug!("dispatch: transaction {:?} acked, awaiting separate response", id);
                let _ = sent;
            }
            Some(sent) => self.deliver_response(remote, Some(&sent.pdu), &pdu, id),
            None => log::debug!("dispatch: discarded unmatched ack for transaction {:?}", id),
        }
    }

    fn handle_rst(&mut self, _remote: RemoteAddr, id: TransactionId) {
        // The original notes an intent to tear down subscriptions on RST
        // but never implements it; this crate leaves that as the same open
        // hook (see `DESIGN.md`).
        if self.send_queue.remove_by_id(id).is_some() {
            log::debug!("dispatch: transaction {:?} reset by peer", id);
        } else {
            log::debug!("dispatch: discarded unmatched reset for transaction {:?}", id);
        }
    }

    fn handle_non_or_con(&mut self, pdu: Pdu, remote: RemoteAddr, id: TransactionId) {
        if let Some(unknown) = pdu.option_iter().first_unhandled_critical_option(&self.known_options) {
            log::debug!(
                "dispatch: unknown critical option {} in transaction {:?}",
                unknown,
                id
            );
            if pdu.msg_type.is_con() {
                if let Err(e) = self.send_error(&pdu, remote, MsgCode::ClientErrorBadOption, &OptionFilter::new()) {
                    log::warn!("dispatch: failed to send 4.02 for transaction {:?}: {:?}", id, e);
                }
            }
            return;
        }

        if pdu.is_request() {
            self.handle_request(pdu, remote, id);
            return;
        }

        // A response arriving as CON or NON rather than piggybacked on an
        // ACK is a separate response (spec.md §8 scenario 6): ack it now if
        // confirmable, then try to match it to the request it answers.
        if pdu.msg_type.is_con() {
            if let Err(e) = self.send_empty_ack(remote, pdu.msg_id) {
                log::warn!("dispatch: failed to ack separate response for transaction {:?}: {:?}", id, e);
            }
        }

        let sent = self.send_queue.remove_by_id(id);
        self.deliver_response(remote, sent.as_ref().map(|n| &n.pdu), &pdu, id);
    }

    fn handle_request(&mut self, request: Pdu, remote: RemoteAddr, id: TransactionId) {
        let key = hash_request_uri(&request);
        let code = request.code;

        let mut resource_found = false;
        let handler = match self.registry.resource_mut_by_key(key) {
            Some(resource) => {
                resource_found = true;
                resource.take_handler(code)
            }
            None => None,
        };

        if let Some(handler) = handler {
            let response = handler.handle(self, remote, &request);
            if let Some(resource) = self.registry.resource_mut_by_key(key) {
                resource.put_handler(code, handler);
            }
            if let Some(response) = response {
                if let Err(e) = self.send_to(&response, remote) {
                    log::warn!("dispatch: failed to send response for transaction {:?}: {:?}", id, e);
                }
            }
            return;
        }

        if ResourceRegistry::is_well_known_core(key) && code == MsgCode::MethodGet {
            let response = wellknown_response(&self.registry, &request);
            if let Err(e) = self.send_to(&response, remote) {
                log::warn!("dispatch: failed to send wellknown response: {:?}", e);
            }
            return;
        }

        let error_code = if !resource_found && code == MsgCode::MethodGet {
            MsgCode::ClientErrorNotFound
        } else {
            MsgCode::ClientErrorMethodNotAllowed
        };

        if let Err(e) = self.send_error(&request, remote, error_code, &OptionFilter::new()) {
            log::warn!("dispatch: failed to send error response for transaction {:?}: {:?}", id, e);
        }
    }

    fn deliver_response(&mut self, remote: RemoteAddr, request: Option<&Pdu>, response: &Pdu, id: TransactionId) {
        if let Some(handler) = self.response_handler.as_mut() {
            handler.handle_response(remote, request, response, id);
        } else {
            log::debug!(
                "dispatch: no response handler installed, discarding response for transaction {:?}",
                id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MsgToken;
    use crate::registry::{Resource, Responder};
    use crate::trans_params::StandardCoapConstants;
    use std::sync::mpsc;
    use std::time::Duration;

    type TestContext = Context<StandardCoapConstants>;

    fn new_ctx() -> TestContext {
        TestContext::new("127.0.0.1:0").unwrap()
    }

    fn node_from(ctx: &TestContext, pdu: Pdu, remote: RemoteAddr) -> QueueNode {
        let id = crate::transaction::transaction_id(&remote, pdu.token().as_bytes());
        QueueNode::new(pdu, remote, id, ctx.now())
    }

    fn recv_datagram(ctx: &mut TestContext) -> Pdu {
        for _ in 0..200 {
            if ctx.read().unwrap() {
                return ctx.recv_queue.pop_next().unwrap().pdu;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("no datagram arrived");
    }

    #[test]
    fn unmatched_ack_is_dropped_without_invoking_handler() {
        let mut ctx = new_ctx();
        let (tx, rx) = mpsc::channel();
        ctx.set_response_handler(move |_, _: Option<&Pdu>, _: &Pdu, _| tx.send(()).unwrap());

        let remote = RemoteAddr::new("192.0.2.1:5683".parse().unwrap());
        let mut ack = Pdu::new(MsgType::Ack, MsgCode::SuccessContent, 42);
        ack.set_token(MsgToken::from(7u16));
        let node = node_from(&ctx, ack, remote);
        ctx.recv_queue.insert(node);

        ctx.dispatch();

        assert!(ctx.recv_queue.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn ack_with_payload_matches_send_queue_and_invokes_handler() {
        let mut ctx = new_ctx();
        let (tx, rx) = mpsc::channel();
        ctx.set_response_handler(move |_, request: Option<&Pdu>, _: &Pdu, _| {
            tx.send(request.is_some()).unwrap()
        });

        let remote = RemoteAddr::new("192.0.2.1:5683".parse().unwrap());
        let mut request = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        request.set_token(MsgToken::from(9u16));
        let id = crate::transaction::transaction_id(&remote, request.token().as_bytes());
        ctx.send_queue
            .insert(QueueNode::new(request, remote, id, ctx.now()));

        let mut response = Pdu::new(MsgType::Ack, MsgCode::SuccessContent, 1);
        response.set_token(MsgToken::from(9u16));
        let node = node_from(&ctx, response, remote);
        ctx.recv_queue.insert(node);

        ctx.dispatch();

        assert!(ctx.send_queue.is_empty());
        assert_eq!(rx.try_recv(), Ok(true));
    }

    #[test]
    fn empty_ack_stops_retransmission_without_invoking_handler() {
        let mut ctx = new_ctx();
        let (tx, rx) = mpsc::channel();
        ctx.set_response_handler(move |_, _: Option<&Pdu>, _: &Pdu, _| tx.send(()).unwrap());

        let remote = RemoteAddr::new("192.0.2.1:5683".parse().unwrap());
        let request = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        let id = crate::transaction::transaction_id(&remote, request.token().as_bytes());
        ctx.send_queue
            .insert(QueueNode::new(request, remote, id, ctx.now()));

        let empty_ack = Pdu::new(MsgType::Ack, MsgCode::Empty, 1);
        let node = node_from(&ctx, empty_ack, remote);
        ctx.recv_queue.insert(node);

        ctx.dispatch();

        assert!(ctx.send_queue.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unknown_critical_option_on_con_elicits_bad_option() {
        let mut server = new_ctx();
        let mut client = new_ctx();
        let client_addr = RemoteAddr::new(client.socket().local_addr().unwrap());

        let mut request = Pdu::new(MsgType::Con, MsgCode::MethodGet, 0x1234);
        request.set_token(MsgToken::from(0xABu16));
        request.add_option(crate::option::OptionNumber(99), vec![]);
        let node = node_from(&server, request, client_addr);
        server.recv_queue.insert(node);

        server.dispatch();

        let response = recv_datagram(&mut client);
        assert_eq!(response.code, MsgCode::ClientErrorBadOption);
        assert_eq!(response.msg_type, MsgType::Ack);
        assert_eq!(response.token(), MsgToken::from(0xABu16));
    }

    #[test]
    fn get_unknown_resource_yields_not_found() {
        let mut server = new_ctx();
        let mut client = new_ctx();
        let client_addr = RemoteAddr::new(client.socket().local_addr().unwrap());

        let mut request = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        request.set_uri_path("nope");
        let node = node_from(&server, request, client_addr);
        server.recv_queue.insert(node);

        server.dispatch();

        let response = recv_datagram(&mut client);
        assert_eq!(response.code, MsgCode::ClientErrorNotFound);
    }

    #[test]
    fn get_wellknown_core_lists_registered_resources() {
        let mut server = new_ctx();
        server.register_resource(Resource::new("sensors/temp"));
        let mut client = new_ctx();
        let client_addr = RemoteAddr::new(client.socket().local_addr().unwrap());

        let mut request = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        request.set_uri_path("well-known/core");
        let node = node_from(&server, request, client_addr);
        server.recv_queue.insert(node);

        server.dispatch();

        let response = recv_datagram(&mut client);
        assert_eq!(response.code, MsgCode::SuccessContent);
        assert!(String::from_utf8(response.payload).unwrap().contains("sensors/temp"));
    }

    #[test]
    fn registered_handler_sends_piggybacked_response() {
        let mut server = new_ctx();
        let mut resource = Resource::new("sensors/temp");
        resource.set_handler(MsgCode::MethodGet, |_: &mut dyn Responder, _, request: &Pdu| {
            let mut response = Pdu::new(MsgType::Ack, MsgCode::SuccessContent, request.msg_id);
            response.set_token(request.token());
            response.payload = b"21.0".to_vec();
            Some(response)
        });
        server.register_resource(resource);

        let mut client = new_ctx();
        let client_addr = RemoteAddr::new(client.socket().local_addr().unwrap());

        let mut request = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        request.set_uri_path("sensors/temp");
        request.set_token(MsgToken::from(1u16));
        let node = node_from(&server, request, client_addr);
        server.recv_queue.insert(node);

        server.dispatch();

        let response = recv_datagram(&mut client);
        assert_eq!(response.code, MsgCode::SuccessContent);
        assert_eq!(response.payload, b"21.0");
    }

    #[test]
    fn separate_response_is_acked_and_matched_to_original_request() {
        let mut server = new_ctx();
        let mut resource = Resource::new("sensors/temp");
        resource.set_handler(MsgCode::MethodGet, |responder: &mut dyn Responder, remote, request: &Pdu| {
            responder.send_empty_ack(remote, request.msg_id).unwrap();
            None
        });
        server.register_resource(resource);

        let mut client = new_ctx();
        let client_addr = RemoteAddr::new(client.socket().local_addr().unwrap());

        let mut request = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        request.set_uri_path("sensors/temp");
        request.set_token(MsgToken::from(2u16));
        let node = node_from(&server, request, client_addr);
        server.recv_queue.insert(node);

        server.dispatch();

        // The handler's empty ack arrived at the client; drain it.
        let ack = recv_datagram(&mut client);
        assert!(ack.is_empty());

        // The separate response travels server->client as its own CON.
        let server_addr = RemoteAddr::new(server.socket().local_addr().unwrap());
        let mut separate_response = Pdu::new(MsgType::Con, MsgCode::SuccessContent, 99);
        separate_response.set_token(MsgToken::from(2u16));
        separate_response.payload = b"21.0".to_vec();
        server.send_to(&separate_response, client_addr).unwrap();

        // Deliver it into the client's dispatcher as if it had arrived over
        // the wire, and confirm the client matches it to the original
        // request (tracked in its own send queue, keyed by the id the
        // client would have computed when it originally sent it) and acks
        // it.
        let (tx, rx) = mpsc::channel();
        client.set_response_handler(move |_, request: Option<&Pdu>, _: &Pdu, _| {
            tx.send(request.is_some()).unwrap()
        });
        let original_request = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        let client_side_id =
            crate::transaction::transaction_id(&server_addr, separate_response.token().as_bytes());
        client
            .send_queue
            .insert(QueueNode::new(original_request, server_addr, client_side_id, client.now()));
        let response_node = node_from(&client, separate_response, server_addr);
        client.recv_queue.insert(response_node);
        client.dispatch();

        assert_eq!(rx.try_recv(), Ok(true));
        assert!(client.send_queue.is_empty());
    }
}
