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

//! The time-ordered queues backing the send (retransmission) and receive
//! (deduplication) paths.
//!
//! Grounded on `examples/original_source/net.c`'s `coap_insert_node` /
//! `coap_remove_from_queue` / `coap_find_transaction` / `coap_delete_all`:
//! the original keeps a singly-linked list ordered by `_order_timestamp` and
//! scans it linearly for insertion and removal. This crate keeps the same
//! linear-scan behavior (these queues are expected to be small -- bounded
//! by `COAP_NSTART` and in-flight peer count, not by request volume) but
//! backs it with a `Vec` instead of hand-rolled links, since there is no
//! reason to take on `unsafe` for a list this size in safe Rust.

use crate::clock::Ticks;
use crate::message::Pdu;
use crate::socketaddr::RemoteAddr;
use crate::transaction::TransactionId;

/// One entry in a [`Queue`]: an owned PDU plus the scheduling and
/// retransmission bookkeeping needed to drive it through the send or
/// receive path.
#[derive(Debug, Clone)]
pub struct QueueNode {
    /// The message this node carries.
    pub pdu: Pdu,

    /// The peer this message was received from, or is being sent to.
    pub remote: RemoteAddr,

    /// This node's transaction id, computed once at enqueue time from
    /// `remote` and the PDU's token -- regardless of whether the initial
    /// send succeeds, so that a later retransmission or duplicate-detection
    /// lookup always finds a consistent value.
    pub id: TransactionId,

    /// The tick at which this node is next due to be sent (send queue) or
    /// was received (receive queue).
    pub scheduled: Ticks,

    /// Number of retransmissions already attempted for this node. The delay
    /// until the next one is recomputed from this count each time (see
    /// `sender::Context::retransmit`), rather than cached here, since it
    /// depends on the jitter drawn at retransmission time, not at enqueue
    /// time.
    pub retransmit_count: u32,
}

impl QueueNode {
    /// Creates a new node.
    pub fn new(pdu: Pdu, remote: RemoteAddr, id: TransactionId, scheduled: Ticks) -> QueueNode {
        QueueNode {
            pdu,
            remote,
            id,
            scheduled,
            retransmit_count: 0,
        }
    }
}

/// A queue of [`QueueNode`]s kept in ascending order of `scheduled`.
///
/// Used both as the send queue (entries due for transmission/retransmission)
/// and the receive queue (entries awaiting dispatch), matching
/// `spec.md`'s data model.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    nodes: Vec<QueueNode>,
}

impl Queue {
    /// Creates an empty queue.
    pub fn new() -> Queue {
        Queue { nodes: Vec::new() }
    }

    /// Returns true if the queue holds no entries.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of entries in the queue.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Inserts `node` in ascending order of `scheduled`.
    ///
    /// Entries scheduled at the same tick keep FIFO order relative to each
    /// other, matching the original's scan-until-`order()`-says-stop
    /// insertion.
    pub fn insert(&mut self, node: QueueNode) {
        let pos = self
            .nodes
            .iter()
            .position(|existing| existing.scheduled > node.scheduled)
            .unwrap_or(self.nodes.len());
        self.nodes.insert(pos, node);
    }

    /// Returns a reference to the head of the queue (the soonest-scheduled
    /// entry), without removing it.
    pub fn peek_next(&self) -> Option<&QueueNode> {
        self.nodes.first()
    }

    /// Removes and returns the head of the queue.
    pub fn pop_next(&mut self) -> Option<QueueNode> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(self.nodes.remove(0))
        }
    }

    /// Finds the first entry with the given transaction id, without
    /// removing it.
    pub fn find(&self, id: TransactionId) -> Option<&QueueNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Removes and returns the first entry with the given transaction id.
    pub fn remove_by_id(&mut self, id: TransactionId) -> Option<QueueNode> {
        let pos = self.nodes.iter().position(|node| node.id == id)?;
        Some(self.nodes.remove(pos))
    }

    /// Removes every entry from the queue.
    pub fn delete_all(&mut self) {
        self.nodes.clear();
    }

    /// Iterates over the queue's entries in schedule order.
    pub fn iter(&self) -> impl Iterator<Item = &QueueNode> {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MsgCode, MsgType};

    fn node_at(scheduled: Ticks, id: u16) -> QueueNode {
        QueueNode::new(
            Pdu::new(MsgType::Con, MsgCode::MethodGet, id),
            RemoteAddr::new("192.0.2.1:5683".parse().unwrap()),
            TransactionId(id),
            scheduled,
        )
    }

    #[test]
    fn insert_keeps_ascending_order() {
        let mut q = Queue::new();
        q.insert(node_at(30, 3));
        q.insert(node_at(10, 1));
        q.insert(node_at(20, 2));

        let scheduled: Vec<Ticks> = q.iter().map(|n| n.scheduled).collect();
        assert_eq!(scheduled, vec![10, 20, 30]);
    }

    #[test]
    fn equal_schedule_preserves_fifo_order() {
        let mut q = Queue::new();
        q.insert(node_at(10, 1));
        q.insert(node_at(10, 2));

        let ids: Vec<u16> = q.iter().map(|n| n.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn pop_next_returns_head_in_order() {
        let mut q = Queue::new();
        q.insert(node_at(20, 2));
        q.insert(node_at(10, 1));

        assert_eq!(q.pop_next().unwrap().id, TransactionId(1));
        assert_eq!(q.pop_next().unwrap().id, TransactionId(2));
        assert!(q.pop_next().is_none());
    }

    #[test]
    fn remove_by_id_removes_only_matching_node() {
        let mut q = Queue::new();
        q.insert(node_at(10, 1));
        q.insert(node_at(20, 2));

        let removed = q.remove_by_id(TransactionId(1)).unwrap();
        assert_eq!(removed.id, TransactionId(1));
        assert_eq!(q.len(), 1);
        assert!(q.find(TransactionId(1)).is_none());
        assert!(q.find(TransactionId(2)).is_some());
    }

    #[test]
    fn delete_all_empties_the_queue() {
        let mut q = Queue::new();
        q.insert(node_at(10, 1));
        q.insert(node_at(20, 2));
        q.delete_all();
        assert!(q.is_empty());
    }
}
