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

//! Resource registration and lookup by request URI.
//!
//! Grounded on `examples/original_source/net.c`'s `handle_request`: a
//! resource is found by hashing the request's `Uri-Path` options
//! (`coap_hash_request_uri`) and looking the hash up in a table
//! (`coap_get_resource_from_key`); the matching method handler is then
//! selected from a fixed-size array indexed by `code - 1`
//! (`resource->handler[node->pdu->hdr->code - 1]`). General URI parsing
//! beyond this hash-key lookup is out of scope for this crate.

use crate::message::{MsgCode, MsgId, Pdu};
use crate::socketaddr::RemoteAddr;
use crate::transaction::CoapHasher;
use crate::Error;
use std::collections::HashMap;

/// A 4-byte hash key identifying a registered resource by path.
pub type ResourceKey = [u8; 4];

/// The well-known discovery path, per RFC 6690.
pub const WELL_KNOWN_CORE_PATH: &str = "well-known/core";

/// Hashes a `/`-joined path (no leading slash) into a [`ResourceKey`].
///
/// Grounded on `coap_hash_path`: this crate reuses the same FNV-1a
/// primitive as [`crate::transaction::coap_hash`] rather than introducing a
/// second hash function for what is, in both implementations, the same
/// "compress arbitrary bytes into a small fixed key" problem.
pub fn hash_path(path: &str) -> ResourceKey {
    hash_bytes(path.as_bytes())
}

fn hash_bytes(bytes: &[u8]) -> ResourceKey {
    let mut hasher = CoapHasher::new();
    hasher.update(bytes);
    hasher.finish()
}

/// Hashes the request URI of `request` (its `Uri-Path` options joined by
/// `/`) into a [`ResourceKey`].
pub fn hash_request_uri(request: &Pdu) -> ResourceKey {
    hash_bytes(request.uri_path().as_bytes())
}

/// Narrow interface a [`MethodHandler`] uses to talk back to the engine
/// without depending on [`crate::Context`]'s `TransParams` type parameter
/// (which would make `MethodHandler` impossible to use as a trait object,
/// since associated constants are not object-safe).
pub trait Responder {
    /// Sends an empty ACK for `msg_id` to `remote` immediately, for
    /// handlers implementing the "separate response" pattern: acknowledge
    /// now, answer with a confirmable response later.
    fn send_empty_ack(&mut self, remote: RemoteAddr, msg_id: MsgId) -> Result<(), Error>;
}

/// A handler for one method on one resource.
///
/// Returning `Some(response)` causes the engine to send `response`
/// immediately following the handler call (mirroring
/// `examples/original_source/net.c`'s `h(context, resource, ...)` followed
/// by `coap_send`). Returning `None` means the handler has already sent (or
/// will send later, e.g. after calling [`Responder::send_empty_ack`]) its
/// own response and the engine should not send anything further.
pub trait MethodHandler: Send {
    /// Handles one request.
    fn handle(&self, responder: &mut dyn Responder, remote: RemoteAddr, request: &Pdu) -> Option<Pdu>;
}

impl<F> MethodHandler for F
where
    F: Fn(&mut dyn Responder, RemoteAddr, &Pdu) -> Option<Pdu> + Send,
{
    fn handle(&self, responder: &mut dyn Responder, remote: RemoteAddr, request: &Pdu) -> Option<Pdu> {
        self(responder, remote, request)
    }
}

/// A registered resource: a path, plus up to one handler per method code.
pub struct Resource {
    /// The resource's path, used for registration lookups and for
    /// `.well-known/core` link-format serialization.
    pub path: String,

    handlers: [Option<Box<dyn MethodHandler>>; 8],
}

impl Resource {
    /// Creates a new resource with no handlers registered.
    pub fn new(path: impl Into<String>) -> Resource {
        Resource {
            path: path.into(),
            handlers: [None, None, None, None, None, None, None, None],
        }
    }

    /// Registers `handler` for `code`. `code` must be a method code
    /// (`MsgCode::is_method()`); other codes are silently ignored, matching
    /// the original's `code - 1` array indexing, which is only ever
    /// performed for request codes.
    pub fn set_handler(&mut self, code: MsgCode, handler: impl MethodHandler + 'static) {
        if let Some(slot) = self.handler_slot(code) {
            self.handlers[slot] = Some(Box::new(handler));
        }
    }

    /// Returns the handler registered for `code`, if any.
    pub fn handler(&self, code: MsgCode) -> Option<&dyn MethodHandler> {
        self.handler_slot(code)
            .and_then(|slot| self.handlers[slot].as_deref())
    }

    /// Removes and returns the handler registered for `code`, leaving its
    /// slot empty.
    ///
    /// The dispatcher uses this to get an owned `Box<dyn MethodHandler>` out
    /// of the registry before invoking it, since the handler needs a `&mut
    /// Context` (for [`Responder`]) at the same time the registry lookup
    /// would otherwise still be borrowing it. [`Self::put_handler`] restores
    /// it afterwards.
    pub(crate) fn take_handler(&mut self, code: MsgCode) -> Option<Box<dyn MethodHandler>> {
        self.handler_slot(code).and_then(|slot| self.handlers[slot].take())
    }

    /// Restores a handler previously removed by [`Self::take_handler`].
    pub(crate) fn put_handler(&mut self, code: MsgCode, handler: Box<dyn MethodHandler>) {
        if let Some(slot) = self.handler_slot(code) {
            self.handlers[slot] = Some(handler);
        }
    }

    fn handler_slot(&self, code: MsgCode) -> Option<usize> {
        let code = code as u8;
        if code == 0 || (code as usize) > self.handlers.len() {
            None
        } else {
            Some((code - 1) as usize)
        }
    }
}

/// The set of resources this endpoint knows how to serve, keyed by a hash
/// of their registration path.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: HashMap<ResourceKey, Resource>,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> ResourceRegistry {
        ResourceRegistry {
            resources: HashMap::new(),
        }
    }

    /// Registers `resource` under its own path, replacing any resource
    /// previously registered at the same path.
    pub fn register(&mut self, resource: Resource) {
        let key = hash_bytes(resource.path.as_bytes());
        self.resources.insert(key, resource);
    }

    /// Looks up the resource matching `request`'s URI path.
    pub fn get_for_request(&self, request: &Pdu) -> Option<&Resource> {
        self.resources.get(&hash_request_uri(request))
    }

    /// Looks up a resource by its registration key, mutably.
    pub(crate) fn resource_mut_by_key(&mut self, key: ResourceKey) -> Option<&mut Resource> {
        self.resources.get_mut(&key)
    }

    /// Returns true if `key` identifies the well-known discovery resource.
    pub fn is_well_known_core(key: ResourceKey) -> bool {
        key == hash_bytes(WELL_KNOWN_CORE_PATH.as_bytes())
    }

    /// Iterates over all registered resources, for link-format
    /// serialization.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }
}
