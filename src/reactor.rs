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

//! Hooks for an external event loop: poll the socket readiness source,
//! call [`Context::read`] and [`Context::dispatch`], and arm a timer
//! against the head of the send queue to drive retransmission.
//!
//! Grounded on `spec.md` §4.I / §5: this engine never blocks on a timer or
//! spawns anything itself, it only exposes enough queue introspection for a
//! caller's own reactor (an epoll/kqueue loop, an async runtime, a bare
//! superloop) to know when to wake it up.

use crate::clock::Ticks;
use crate::context::Context;
use crate::trans_params::TransParams;

impl<P: TransParams> Context<P> {
    /// Returns the tick at which the next retransmission is due, if the
    /// send queue is non-empty.
    ///
    /// A caller drives this engine by arming a timer for
    /// `next_retransmission_deadline() - now()` (clamped to zero if already
    /// past) and calling [`Self::service_send_queue`] when it fires.
    pub fn next_retransmission_deadline(&self) -> Option<Ticks> {
        self.send_queue.peek_next().map(|node| node.scheduled)
    }

    /// Retransmits every send-queue entry whose deadline has passed.
    ///
    /// Entries that have exhausted `TransParams::coap_max_retransmit` are
    /// dropped by [`Context::retransmit`] rather than rescheduled, so this
    /// always terminates even if called well past several entries'
    /// deadlines.
    pub fn service_send_queue(&mut self) {
        let now = self.now();
        while let Some(due) = self.send_queue.peek_next().map(|node| node.scheduled) {
            if due > now {
                break;
            }
            let node = self.send_queue.pop_next().expect("peeked entry must be present");
            self.retransmit(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::message::{MsgCode, MsgType, Pdu};
    use crate::queue::QueueNode;
    use crate::socketaddr::RemoteAddr;
    use crate::trans_params::StandardCoapConstants;
    use crate::transaction::transaction_id;

    type TestContext = Context<StandardCoapConstants>;

    #[test]
    fn next_deadline_is_none_for_empty_queue() {
        let ctx = TestContext::new("127.0.0.1:0").unwrap();
        assert_eq!(ctx.next_retransmission_deadline(), None);
    }

    #[test]
    fn service_send_queue_retransmits_due_entries_and_reschedules_them() {
        let mut ctx = TestContext::new("127.0.0.1:0").unwrap();
        let remote = RemoteAddr::new("127.0.0.1:4321".parse().unwrap());
        let pdu = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        let id = transaction_id(&remote, pdu.token().as_bytes());
        let now = ctx.now();

        ctx.send_queue.insert(QueueNode::new(pdu, remote, id, now));
        assert_eq!(ctx.next_retransmission_deadline(), Some(now));

        ctx.service_send_queue();

        // The single due entry was retransmitted and rescheduled further
        // out, not dropped (it has not yet hit `coap_max_retransmit`).
        assert_eq!(ctx.send_queue.len(), 1);
        let rescheduled = ctx.send_queue.peek_next().unwrap();
        assert_eq!(rescheduled.retransmit_count, 1);
        assert!(rescheduled.scheduled > now);
    }

    #[test]
    fn service_send_queue_drops_entries_past_max_retransmit() {
        let mut ctx = TestContext::new("127.0.0.1:0").unwrap();
        let remote = RemoteAddr::new("127.0.0.1:4321".parse().unwrap());
        let pdu = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        let id = transaction_id(&remote, pdu.token().as_bytes());
        let now = ctx.now();

        let mut node = QueueNode::new(pdu, remote, id, now);
        node.retransmit_count = 4;
        ctx.send_queue.insert(node);

        ctx.service_send_queue();

        assert!(ctx.send_queue.is_empty());
    }
}
