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

//! Outbound sending, confirmable-message enqueueing, and retransmission.
//!
//! Grounded on `examples/original_source/net.c`'s `coap_send_impl`,
//! `coap_send_confirmed`, and `coap_retransmit`. The original computes a
//! node's transaction id from whatever `sendto` happens to return, which
//! means a failed first send produces an invalid id for a node already
//! sitting in the queue -- this crate always computes the id from the peer
//! address and token before attempting to send, so the id is stable
//! regardless of whether that first send succeeds (see `DESIGN.md`).

use crate::clock::ticks_from_duration;
use crate::context::Context;
use crate::message::codec;
use crate::message::{MsgCode, MsgType, Pdu};
use crate::option::{OptionFilter, OptionNumber};
use crate::queue::QueueNode;
use crate::response::new_error_response;
use crate::socketaddr::RemoteAddr;
use crate::trans_params::TransParams;
use crate::transaction::{transaction_id, TransactionId};
use crate::Error;

impl<P: TransParams> Context<P> {
    /// Encodes and sends `pdu` to `remote` without any retransmission
    /// bookkeeping. Used both for one-shot (NON) sends and as the low-level
    /// primitive confirmable sends and retransmissions build on.
    pub fn send_to(&mut self, pdu: &Pdu, remote: RemoteAddr) -> Result<(), Error> {
        let mut buf = [0u8; 1152];
        let len = codec::encode(pdu, &mut buf)?;
        self.socket_mut().send_to(&buf[..len], remote.socket_addr())?;
        Ok(())
    }

    /// Sends `pdu` as a non-confirmable message. Returns the transaction id
    /// that an inbound response (if any) would carry, for a caller that
    /// wants to match one up itself; this engine doesn't track NON sends in
    /// the send queue since there is nothing to retransmit.
    pub fn send_non(&mut self, mut pdu: Pdu, remote: RemoteAddr) -> Result<TransactionId, Error> {
        pdu.msg_type = MsgType::Non;
        let id = transaction_id(&remote, pdu.token().as_bytes());
        self.send_to(&pdu, remote)?;
        Ok(id)
    }

    /// Sends `pdu` as a confirmable message and enqueues it for
    /// retransmission until acknowledged, reset, or exhausted.
    ///
    /// The returned id is computed from `remote` and `pdu`'s token alone
    /// and is valid even if the initial transmission fails with an I/O
    /// error -- the node stays in the send queue either way, so a
    /// subsequent retransmission attempt can still succeed.
    pub fn send_confirmed(&mut self, mut pdu: Pdu, remote: RemoteAddr) -> Result<TransactionId, Error> {
        pdu.msg_type = MsgType::Con;
        let id = transaction_id(&remote, pdu.token().as_bytes());

        let send_result = self.send_to(&pdu, remote);

        let now = self.now();
        let first_delay = ticks_from_duration(self.trans_params().calc_retransmit_duration(1));

        self.send_queue
            .insert(QueueNode::new(pdu, remote, id, now + first_delay));

        send_result?;
        Ok(id)
    }

    /// Sends an empty ACK for `msg_id` to `remote`, for a handler using the
    /// "separate response" pattern (acknowledge now, respond later with its
    /// own confirmable message).
    pub fn send_empty_ack(&mut self, remote: RemoteAddr, msg_id: crate::message::MsgId) -> Result<(), Error> {
        let ack = Pdu::new(MsgType::Ack, MsgCode::Empty, msg_id);
        self.send_to(&ack, remote)
    }

    /// Builds and sends a protocol-level error response (e.g. 4.02, 4.04,
    /// 4.05) to `request`, copying across the options named by
    /// `copy_options` (the token is always included regardless).
    pub fn send_error(
        &mut self,
        request: &Pdu,
        remote: RemoteAddr,
        code: MsgCode,
        copy_options: &OptionFilter,
    ) -> Result<(), Error> {
        let mut copy_options = *copy_options;
        copy_options.insert(OptionNumber::TOKEN);
        let response = new_error_response(request, code, &copy_options);
        self.send_to(&response, remote)
    }

    /// Retransmits `node` if it has not yet exhausted
    /// `TransParams::coap_max_retransmit`, re-enqueueing it with the next
    /// back-off delay; otherwise drops it silently (retransmission
    /// exhaustion is not surfaced as an error -- see `DESIGN.md`).
    pub(crate) fn retransmit(&mut self, mut node: QueueNode) {
        if node.retransmit_count >= self.trans_params().coap_max_retransmit() {
            log::debug!("retransmit: giving up on transaction {:?}", node.id);
            return;
        }

        node.retransmit_count += 1;
        log::debug!(
            "retransmit: attempt #{} of transaction {:?}",
            node.retransmit_count,
            node.id
        );

        let _ = self.send_to(&node.pdu, node.remote);

        let delay = ticks_from_duration(
            self.trans_params()
                .calc_retransmit_duration(node.retransmit_count + 1),
        );
        node.scheduled = self.now() + delay;
        self.send_queue.insert(node);
    }
}
