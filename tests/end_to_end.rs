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

//! End-to-end scenarios driving two real [`Context`]s against each other
//! over loopback UDP, the way an external event loop would: poll `read`,
//! call `dispatch`, and (for retransmission) call `service_send_queue`.

use coap_engine::message::{MsgToken, MsgType, Pdu};
use coap_engine::option::OptionNumber;
use coap_engine::registry::{Resource, Responder};
use coap_engine::trans_params::TransParams;
use coap_engine::{Context, MsgCode, RemoteAddr};
use std::sync::mpsc;
use std::time::Duration;

fn wait_for_dispatch<P: TransParams>(ctx: &mut Context<P>) {
    for _ in 0..400 {
        if ctx.read().expect("socket i/o failed") {
            ctx.dispatch();
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("timed out waiting for a datagram");
}

#[test]
fn happy_path_con_ack() {
    let mut server: Context = Context::new("127.0.0.1:19101").unwrap();
    let mut time = Resource::new("time");
    time.set_handler(MsgCode::MethodGet, |_: &mut dyn Responder, _, request: &Pdu| {
        let mut response = Pdu::new(MsgType::Ack, MsgCode::SuccessContent, request.msg_id);
        response.set_token(request.token());
        response.payload = b"2026-07-28T00:00:00Z".to_vec();
        Some(response)
    });
    server.register_resource(time);

    let mut client: Context = Context::new("127.0.0.1:19102").unwrap();
    let server_addr = RemoteAddr::new("127.0.0.1:19101".parse().unwrap());

    let (tx, rx) = mpsc::channel();
    client.set_response_handler(move |_, request: Option<&Pdu>, response: &Pdu, _| {
        tx.send((request.is_some(), response.payload.clone())).unwrap()
    });

    let mut request = Pdu::new(MsgType::Con, MsgCode::MethodGet, 0x1234);
    request.set_token(MsgToken::from(0xABu16));
    request.set_uri_path("time");
    client.send_confirmed(request, server_addr).unwrap();

    wait_for_dispatch(&mut server);
    wait_for_dispatch(&mut client);

    let (had_request, payload) = rx.try_recv().unwrap();
    assert!(had_request);
    assert_eq!(payload, b"2026-07-28T00:00:00Z");
    assert!(client.can_exit());
}

#[test]
fn retransmission_gives_up_after_max_retransmit() {
    #[derive(Debug, Default, Copy, Clone)]
    struct FastRetryParams;
    impl TransParams for FastRetryParams {
        const COAP_ACK_TIMEOUT: Duration = Duration::from_millis(20);
        const COAP_MAX_RETRANSMIT: u32 = 2;
    }

    // Nothing is listening on this address, so every retransmission is sent
    // but never acknowledged.
    let mut client: Context<FastRetryParams> = Context::new("127.0.0.1:19103").unwrap();
    let unreachable = RemoteAddr::new("127.0.0.1:19104".parse().unwrap());

    let request = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
    client.send_confirmed(request, unreachable).unwrap();
    assert!(!client.can_exit());

    for _ in 0..200 {
        client.service_send_queue();
        if client.can_exit() {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    assert!(client.can_exit(), "node should be dropped after exhausting retransmits");
}

#[test]
fn unknown_critical_option_on_con_elicits_bad_option() {
    let mut server: Context = Context::new("127.0.0.1:19105").unwrap();
    let mut client: Context = Context::new("127.0.0.1:19106").unwrap();
    let server_addr = RemoteAddr::new("127.0.0.1:19105".parse().unwrap());

    let (tx, rx) = mpsc::channel();
    client.set_response_handler(move |_, _: Option<&Pdu>, response: &Pdu, _| {
        tx.send((response.code, response.token())).unwrap()
    });

    let mut request = Pdu::new(MsgType::Con, MsgCode::MethodGet, 7);
    request.set_token(MsgToken::from(0x55u16));
    request.add_option(OptionNumber(99), vec![]);
    client.send_confirmed(request, server_addr).unwrap();

    wait_for_dispatch(&mut server);
    wait_for_dispatch(&mut client);

    let (code, token) = rx.try_recv().unwrap();
    assert_eq!(code, MsgCode::ClientErrorBadOption);
    assert_eq!(token, MsgToken::from(0x55u16));
    assert!(client.can_exit());
}

#[test]
fn unknown_resource_get_yields_not_found() {
    let mut server: Context = Context::new("127.0.0.1:19107").unwrap();
    let mut client: Context = Context::new("127.0.0.1:19108").unwrap();
    let server_addr = RemoteAddr::new("127.0.0.1:19107".parse().unwrap());

    let (tx, rx) = mpsc::channel();
    client.set_response_handler(move |_, _: Option<&Pdu>, response: &Pdu, _| {
        tx.send(response.code).unwrap()
    });

    let mut request = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
    request.set_uri_path("nope");
    client.send_confirmed(request, server_addr).unwrap();

    wait_for_dispatch(&mut server);
    wait_for_dispatch(&mut client);

    assert_eq!(rx.try_recv().unwrap(), MsgCode::ClientErrorNotFound);
}

#[test]
fn well_known_core_lists_registered_resources() {
    let mut server: Context = Context::new("127.0.0.1:19109").unwrap();
    server.register_resource(Resource::new("sensors/temp"));
    server.register_resource(Resource::new("sensors/humidity"));

    let mut client: Context = Context::new("127.0.0.1:19110").unwrap();
    let server_addr = RemoteAddr::new("127.0.0.1:19109".parse().unwrap());

    let (tx, rx) = mpsc::channel();
    client.set_response_handler(move |_, _: Option<&Pdu>, response: &Pdu, _| {
        tx.send((response.code, response.content_format(), response.payload.clone()))
            .unwrap()
    });

    let mut request = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
    request.set_uri_path("well-known/core");
    client.send_confirmed(request, server_addr).unwrap();

    wait_for_dispatch(&mut server);
    wait_for_dispatch(&mut client);

    let (code, content_format, payload) = rx.try_recv().unwrap();
    assert_eq!(code, MsgCode::SuccessContent);
    assert_eq!(content_format, Some(coap_engine::ContentFormat::APPLICATION_LINK_FORMAT));
    let body = String::from_utf8(payload).unwrap();
    assert!(body.contains("</sensors/temp>"));
    assert!(body.contains("</sensors/humidity>"));
}

#[test]
fn separate_response_is_matched_to_the_original_request() {
    let mut server: Context = Context::new("127.0.0.1:19111").unwrap();
    let mut sensor = Resource::new("sensors/slow");
    sensor.set_handler(MsgCode::MethodGet, |responder: &mut dyn Responder, remote, request: &Pdu| {
        responder.send_empty_ack(remote, request.msg_id).unwrap();
        None
    });
    server.register_resource(sensor);

    let mut client: Context = Context::new("127.0.0.1:19112").unwrap();
    let server_addr = RemoteAddr::new("127.0.0.1:19111".parse().unwrap());
    let client_addr = RemoteAddr::new("127.0.0.1:19112".parse().unwrap());

    let (tx, rx) = mpsc::channel();
    client.set_response_handler(move |_, request: Option<&Pdu>, response: &Pdu, _| {
        tx.send((request.is_some(), response.payload.clone())).unwrap()
    });

    let mut request = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
    request.set_uri_path("sensors/slow");
    request.set_token(MsgToken::from(0x77u16));
    client.send_confirmed(request, server_addr).unwrap();

    // The handler acknowledges immediately and answers later.
    wait_for_dispatch(&mut server);
    wait_for_dispatch(&mut client);
    assert!(rx.try_recv().is_err(), "no response delivered yet, only an empty ack");
    assert!(
        !client.can_exit(),
        "empty ack must not cancel the outstanding transaction"
    );

    // Some time later, the application answers with its own confirmable
    // message carrying the same token.
    let mut answer = Pdu::new(MsgType::Con, MsgCode::SuccessContent, 2);
    answer.set_token(MsgToken::from(0x77u16));
    answer.payload = b"42".to_vec();
    server.send_confirmed(answer, client_addr).unwrap();

    wait_for_dispatch(&mut client);

    let (had_request, payload) = rx.try_recv().unwrap();
    assert!(had_request);
    assert_eq!(payload, b"42");
    assert!(client.can_exit());

    // The client must have acked the separate response in turn.
    wait_for_dispatch(&mut server);
    assert!(server.can_exit());
}
