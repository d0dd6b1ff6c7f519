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

use super::*;
use crate::option::{OptionIter, OptionNumber, RawOption};
use crate::util::try_decode_u32;
use crate::ContentFormat;

/// The only wire-format version this engine speaks.
pub const COAP_VERSION: u8 = 1;

/// An owned, fully decoded CoAP message.
///
/// Unlike the teacher crate's zero-copy `MessageRead`/`MessageWrite` pair,
/// which exists to let an async endpoint parse messages directly out of a
/// borrowed socket buffer, this engine is synchronous and single-threaded:
/// a `Pdu` is decoded once by [`crate::message::codec`], queued, and owned
/// until it is consumed, so there is no benefit to deferring the copy.
#[derive(Debug, Clone)]
pub struct Pdu {
    /// Protocol version. Always [`COAP_VERSION`] for messages this engine
    /// produces; messages decoded with a different version are rejected by
    /// the codec before a `Pdu` is ever built.
    pub version: u8,

    /// CON/NON/ACK/RST.
    pub msg_type: MsgType,

    /// The message code: either a method (on a request) or a response code.
    pub code: MsgCode,

    /// The 16-bit message id used for deduplication and ACK/RST matching.
    pub msg_id: MsgId,

    /// Options, sorted in ascending order by option number, as required by
    /// the wire format's delta encoding.
    pub options: Vec<RawOption>,

    /// The message payload, with the 0xFF payload marker already stripped.
    pub payload: Vec<u8>,
}

impl Default for Pdu {
    fn default() -> Self {
        Pdu::new(MsgType::default(), MsgCode::default(), 0)
    }
}

impl Pdu {
    /// Constructs an empty PDU of the given type and code.
    pub fn new(msg_type: MsgType, code: MsgCode, msg_id: MsgId) -> Pdu {
        Pdu {
            version: COAP_VERSION,
            msg_type,
            code,
            msg_id,
            options: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// Inserts an option, maintaining ascending order by option number.
    ///
    /// This does not enforce repeatability rules (`OptionNumber::is_repeatable`);
    /// callers constructing a PDU are expected to know whether they're
    /// allowed to call this more than once for a given option number.
    pub fn add_option(&mut self, number: OptionNumber, value: Vec<u8>) {
        let pos = self
            .options
            .iter()
            .position(|opt| opt.number > number)
            .unwrap_or(self.options.len());
        self.options.insert(pos, RawOption::new(number, value));
    }

    /// Returns an iterator over this PDU's options in ascending order.
    pub fn option_iter(&self) -> OptionIter<'_> {
        OptionIter::new(&self.options)
    }

    /// Returns the value bytes of the first option with the given number,
    /// if present.
    pub fn option_value(&self, number: OptionNumber) -> Option<&[u8]> {
        self.options
            .iter()
            .find(|opt| opt.number == number)
            .map(|opt| opt.value.as_slice())
    }

    /// Returns this message's token, decoded out of the `OptionNumber::TOKEN`
    /// option (see `spec.md`'s data model: in this draft-era wire format the
    /// token rides as an ordinary option, not a header field).
    pub fn token(&self) -> MsgToken {
        self.option_value(OptionNumber::TOKEN)
            .map(MsgToken::new)
            .unwrap_or(MsgToken::EMPTY)
    }

    /// Sets this message's token, replacing any existing `Token` option.
    pub fn set_token(&mut self, token: MsgToken) {
        self.options.retain(|opt| opt.number != OptionNumber::TOKEN);
        if !token.is_empty() {
            self.add_option(OptionNumber::TOKEN, token.as_bytes().to_vec());
        }
    }

    /// Returns the `/`-joined request-URI path assembled from this PDU's
    /// `Uri-Path` options, without a leading slash (e.g. `"well-known/core"`).
    pub fn uri_path(&self) -> String {
        self.options
            .iter()
            .filter(|opt| opt.number == OptionNumber::URI_PATH)
            .map(|opt| String::from_utf8_lossy(&opt.value).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Appends a `Uri-Path` option for each `/`-separated segment of `path`.
    pub fn set_uri_path(&mut self, path: &str) {
        self.options.retain(|opt| opt.number != OptionNumber::URI_PATH);
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            self.add_option(OptionNumber::URI_PATH, segment.as_bytes().to_vec());
        }
    }

    /// Returns the decoded `Content-Format` option, if present and well-formed.
    pub fn content_format(&self) -> Option<ContentFormat> {
        self.option_value(OptionNumber::CONTENT_FORMAT)
            .and_then(try_decode_u32)
            .map(|v| ContentFormat(v as u16))
    }

    /// Returns true if this message is a request (its code is a method code).
    pub fn is_request(&self) -> bool {
        self.code.is_method()
    }

    /// Returns true if this message carries no code (an empty ACK or RST).
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips() {
        let mut pdu = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        pdu.set_token(MsgToken::from(0x1234u16));
        assert_eq!(pdu.token(), MsgToken::from(0x1234u16));
    }

    #[test]
    fn options_stay_sorted() {
        let mut pdu = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        pdu.add_option(OptionNumber::CONTENT_FORMAT, vec![0]);
        pdu.add_option(OptionNumber::URI_PATH, b"a".to_vec());
        pdu.add_option(OptionNumber::TOKEN, vec![1]);

        let numbers: Vec<u16> = pdu.options.iter().map(|o| o.number.0).collect();
        let mut sorted = numbers.clone();
        sorted.sort_unstable();
        assert_eq!(numbers, sorted);
    }

    #[test]
    fn uri_path_joins_segments() {
        let mut pdu = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        pdu.set_uri_path("well-known/core");
        assert_eq!(pdu.uri_path(), "well-known/core");
    }
}
