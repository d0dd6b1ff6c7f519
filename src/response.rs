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

//! Builders for the protocol-level responses this engine generates on its
//! own behalf (as opposed to responses built by resource handlers).
//!
//! Grounded on `examples/original_source/net.c`'s `coap_new_error_response`
//! and `wellknown_response`.

use crate::link_format::print_wellknown;
use crate::message::{MsgCode, MsgType, Pdu};
use crate::option::{OptionFilter, OptionNumber};
use crate::registry::ResourceRegistry;
use crate::ContentFormat;

/// The human-readable phrase copied into an error response's payload,
/// mirroring `examples/original_source/net.c`'s `coap_response_phrase` table
/// (gated there on `COAP_ERROR_PHRASE_LENGTH > 0`).
fn reason_phrase(code: MsgCode) -> Option<&'static str> {
    use MsgCode::*;
    match code {
        ClientErrorBadRequest => Some("Bad Request"),
        ClientErrorUnauthorized => Some("Unauthorized"),
        ClientErrorBadOption => Some("Bad Option"),
        ClientErrorForbidden => Some("Forbidden"),
        ClientErrorNotFound => Some("Not Found"),
        ClientErrorMethodNotAllowed => Some("Method Not Allowed"),
        ClientErrorNotAcceptable => Some("Not Acceptable"),
        ClientErrorRequestEntityIncomplete => Some("Request Entity Incomplete"),
        ClientErrorPreconditionFailed => Some("Precondition Failed"),
        ClientErrorRequestEntityTooLarge => Some("Request Entity Too Large"),
        ClientErrorUnsupportedMediaType => Some("Unsupported Media Type"),
        ClientErrorTooManyRequests => Some("Too Many Requests"),
        ServerErrorInternalServerError => Some("Internal Server Error"),
        ServerErrorNotImplemented => Some("Not Implemented"),
        ServerErrorBadGateway => Some("Bad Gateway"),
        ServerErrorServiceUnavailable => Some("Service Unavailable"),
        ServerErrorGatewayTimeout => Some("Gateway Timeout"),
        ServerErrorProxyingNotSupported => Some("Proxying Not Supported"),
        _ => None,
    }
}

/// Builds a protocol-level error response (4.02, 4.04, 4.05, ...) for
/// `request`.
///
/// An ACK is used if `request` was confirmable, a NON otherwise -- matching
/// the original's rule that an error response can't be a bare ACK for a
/// non-confirmable request. The request's token is always copied across;
/// `copy_options` additionally carries over any options the caller wants
/// echoed (e.g. the unknown critical options that triggered a 4.02). A
/// human-readable reason phrase is copied in as the payload, tagged with a
/// `Content-Format: text/plain` option, for any `code` this module has a
/// phrase for.
pub fn new_error_response(request: &Pdu, code: MsgCode, copy_options: &OptionFilter) -> Pdu {
    let msg_type = if request.msg_type.is_con() {
        MsgType::Ack
    } else {
        MsgType::Non
    };

    let mut response = Pdu::new(msg_type, code, request.msg_id);
    response.set_token(request.token());

    for opt in &request.options {
        if opt.number != OptionNumber::TOKEN
            && opt.number != OptionNumber::CONTENT_FORMAT
            && copy_options.contains(opt.number)
        {
            response.add_option(opt.number, opt.value.clone());
        }
    }

    if let Some(phrase) = reason_phrase(code) {
        response.add_option(
            OptionNumber::CONTENT_FORMAT,
            vec![ContentFormat::TEXT_PLAIN_UTF8.0 as u8],
        );
        response.payload = phrase.as_bytes().to_vec();
    }

    response
}

/// Builds the default `2.05 Content` response to a `GET /.well-known/core`
/// request, enumerating every resource in `registry`.
pub fn wellknown_response(registry: &ResourceRegistry, request: &Pdu) -> Pdu {
    let mut response = Pdu::new(MsgType::Ack, MsgCode::SuccessContent, request.msg_id);
    response.set_token(request.token());
    response.add_option(
        OptionNumber::CONTENT_FORMAT,
        vec![ContentFormat::APPLICATION_LINK_FORMAT.0 as u8],
    );
    response.payload = print_wellknown(registry).into_bytes();
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MsgToken;
    use crate::registry::Resource;

    #[test]
    fn error_response_mirrors_confirmability() {
        let mut con_request = Pdu::new(MsgType::Con, crate::message::MsgCode::MethodGet, 7);
        con_request.set_token(MsgToken::from(0x42u16));
        let response = new_error_response(&con_request, MsgCode::ClientErrorNotFound, &OptionFilter::new());
        assert_eq!(response.msg_type, MsgType::Ack);
        assert_eq!(response.msg_id, 7);
        assert_eq!(response.token(), con_request.token());

        let non_request = Pdu::new(MsgType::Non, crate::message::MsgCode::MethodGet, 8);
        let response = new_error_response(&non_request, MsgCode::ClientErrorNotFound, &OptionFilter::new());
        assert_eq!(response.msg_type, MsgType::Non);
    }

    #[test]
    fn error_response_carries_a_reason_phrase_and_content_format() {
        let request = Pdu::new(MsgType::Con, crate::message::MsgCode::MethodGet, 1);
        let response = new_error_response(&request, MsgCode::ClientErrorNotFound, &OptionFilter::new());

        assert_eq!(response.payload, b"Not Found");
        assert_eq!(
            response.option_value(OptionNumber::CONTENT_FORMAT),
            Some([ContentFormat::TEXT_PLAIN_UTF8.0 as u8].as_slice())
        );
    }

    #[test]
    fn error_response_omits_content_format_for_an_undocumented_code() {
        let request = Pdu::new(MsgType::Con, crate::message::MsgCode::MethodGet, 1);
        let response = new_error_response(&request, MsgCode::ServerErrorInternalServerError, &OptionFilter::new());
        assert_eq!(reason_phrase(MsgCode::ServerErrorInternalServerError), Some("Internal Server Error"));
        assert!(!response.payload.is_empty());

        let response = new_error_response(&request, MsgCode::Empty, &OptionFilter::new());
        assert!(response.payload.is_empty());
        assert_eq!(response.option_value(OptionNumber::CONTENT_FORMAT), None);
    }

    #[test]
    fn wellknown_response_lists_registered_paths() {
        let mut registry = ResourceRegistry::new();
        registry.register(Resource::new("sensors/temp"));

        let request = Pdu::new(MsgType::Con, crate::message::MsgCode::MethodGet, 1);
        let response = wellknown_response(&registry, &request);

        let body = String::from_utf8(response.payload).unwrap();
        assert!(body.contains("</sensors/temp>"));
    }
}
