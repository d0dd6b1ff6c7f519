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

//! A synchronous, reactor-driven message-processing engine for the
//! Constrained Application Protocol (CoAP).
//!
//! This crate implements the transport-reliability layer that sits between
//! a UDP socket and a set of application resource handlers: admission of
//! raw datagrams into typed [`message::Pdu`]s with critical-option
//! screening, a time-ordered send queue that doubles as the retransmission
//! timer wheel, transaction matching of acknowledgements and resets, and a
//! dispatcher that routes requests to registered resources and responses
//! to an installed callback.
//!
//! Unlike an async runtime-backed endpoint, [`Context`] never blocks
//! internally and never spawns anything. It is driven entirely by an
//! external event loop: poll the socket for readiness, call
//! [`Context::read`], call [`Context::dispatch`], and arm a timer against
//! [`Context::next_retransmission_deadline`] to call
//! [`Context::service_send_queue`] when it fires.
//!
//! ```no_run
//! use coap_engine::{Context, MsgCode};
//! use coap_engine::registry::Resource;
//!
//! # fn main() -> Result<(), coap_engine::Error> {
//! let mut ctx: Context = Context::new("[::]:5683")?;
//!
//! let mut time = Resource::new("time");
//! time.set_handler(MsgCode::MethodGet, |_, _, request: &coap_engine::message::Pdu| {
//!     let mut response = coap_engine::message::Pdu::new(
//!         coap_engine::message::MsgType::Ack,
//!         MsgCode::SuccessContent,
//!         request.msg_id,
//!     );
//!     response.set_token(request.token());
//!     response.payload = b"now".to_vec();
//!     Some(response)
//! });
//! ctx.register_resource(time);
//!
//! loop {
//!     while ctx.read()? {}
//!     ctx.dispatch();
//!     if ctx.can_exit() {
//!         break;
//!     }
//! #   break;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module layout
//!
//! | Module | Responsibility |
//! |---|---|
//! | [`transaction`] | Derives the 16-bit transaction id from a peer address and token. |
//! | [`queue`] | The time-ordered queue backing both the send and receive paths. |
//! | [`context`] | [`Context`]: socket, queues, registry, known-option filter, response callback. |
//! | [`reader`] | Admits one inbound datagram into the receive queue. |
//! | [`sender`] | Outbound sends, confirmable enqueueing, and retransmission. |
//! | [`option`] | Option numbers, the critical-option filter, and option iteration. |
//! | [`response`] | Builders for protocol-level error and `.well-known/core` responses. |
//! | [`dispatch`] | Routes receive-queue entries to ACK/RST matching, resources, or the response callback. |
//! | [`reactor`] | Queue-introspection hooks for an external event loop. |
//! | [`registry`] | Resource registration and lookup by request URI. |
//! | [`message`] | The [`message::Pdu`] type and its wire codec. |
//! | [`trans_params`] | Transmission-parameter constants (timeouts, retry limits, back-off). |
//! | [`clock`] | The monotonic tick source used for scheduling. |
//! | [`socketaddr`] | [`socketaddr::RemoteAddr`], the peer-address comparison rule. |
//! | [`content_format`] | `Content-Format` option value constants. |
//! | [`link_format`] | CoRE link-format serialization of the resource registry. |
//! | [`error`] | The crate's [`Error`] type. |

pub mod clock;
pub mod consts;
pub mod content_format;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod link_format;
pub mod message;
pub mod option;
pub mod queue;
pub mod reactor;
pub mod reader;
pub mod registry;
pub mod response;
pub mod sender;
pub mod socketaddr;
pub mod trans_params;
pub mod transaction;
mod util;

pub use content_format::ContentFormat;
pub use context::Context;
pub use error::Error;
pub use message::{MsgCode, MsgType};
pub use socketaddr::RemoteAddr;
pub use trans_params::{StandardCoapConstants, TransParams};
pub use transaction::TransactionId;
