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

//! Encoding and decoding of [`Pdu`]s to and from the wire format admitted by
//! [`crate::Context::read`].
//!
//! This is the draft-era header this engine targets (see
//! `examples/original_source/net.c`, whose `coap_hdr_t` predates RFC 7252's
//! `TKL` field):
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |Ver| T |OptCnt |     Code      |          Message ID          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Options follow the header back-to-back, each with a one-byte
//! delta/length nibble pair (extended per-nibble exactly as RFC 7252 later
//! standardized: a nibble value of 13 means "add one extended byte", 14
//! means "add two extended bytes, offset by 269", 15 is reserved). `OptCnt`
//! itself uses the same extension trick when there are 15 or more options:
//! a literal count of 15 is followed by one extra byte holding `count - 15`.
//! A payload, if present, follows the options after a single `0xFF` marker
//! byte.

use super::*;
use crate::option::{OptionNumber, RawOption};
use crate::Error;

const PAYLOAD_MARKER: u8 = 0xFF;

/// The widest token this crate's [`crate::message::MsgToken`] can hold. A
/// `Token` option longer than this is rejected rather than silently
/// truncated: truncating here would let an inbound message decode
/// successfully under a token value that does not match the bytes the peer
/// actually sent, which is worse than just refusing the datagram.
const MAX_TOKEN_LENGTH: usize = 8;

/// Encodes `pdu` into `dst`, returning the number of bytes written.
///
/// Returns `Error::OutOfSpace` if `dst` is not large enough.
pub fn encode(pdu: &Pdu, dst: &mut [u8]) -> Result<usize, Error> {
    let mut pos = 0usize;

    let mut put = |byte: u8, pos: &mut usize| -> Result<(), Error> {
        *dst.get_mut(*pos).ok_or(Error::OutOfSpace)? = byte;
        *pos += 1;
        Ok(())
    };

    let option_count = pdu.options.len();
    let (optcnt_nibble, optcnt_ext) = if option_count < 15 {
        (option_count as u8, None)
    } else {
        (15, Some((option_count - 15) as u8))
    };

    put((pdu.version << 6) | ((pdu.msg_type as u8) << 4) | optcnt_nibble, &mut pos)?;
    if let Some(ext) = optcnt_ext {
        put(ext, &mut pos)?;
    }
    put(pdu.code as u8, &mut pos)?;
    put((pdu.msg_id >> 8) as u8, &mut pos)?;
    put(pdu.msg_id as u8, &mut pos)?;

    let mut prev_number = 0u16;
    for opt in &pdu.options {
        let delta = opt
            .number
            .0
            .checked_sub(prev_number)
            .ok_or(Error::InvalidArgument)?;
        prev_number = opt.number.0;

        let (delta_nibble, delta_ext) = encode_nibble_field(delta);
        let (len_nibble, len_ext) = encode_nibble_field(opt.value.len() as u16);

        put((delta_nibble << 4) | len_nibble, &mut pos)?;
        if let Some(bytes) = delta_ext {
            for b in bytes {
                put(b, &mut pos)?;
            }
        }
        if let Some(bytes) = len_ext {
            for b in bytes {
                put(b, &mut pos)?;
            }
        }
        for &b in &opt.value {
            put(b, &mut pos)?;
        }
    }

    if !pdu.payload.is_empty() {
        put(PAYLOAD_MARKER, &mut pos)?;
        for &b in &pdu.payload {
            put(b, &mut pos)?;
        }
    }

    Ok(pos)
}

/// Encodes a 13-bit-extensible delta/length field into its nibble value
/// plus optional extension bytes, per the RFC 7252 option-header trick.
fn encode_nibble_field(value: u16) -> (u8, Option<Vec<u8>>) {
    if value < 13 {
        (value as u8, None)
    } else if value < 269 {
        (13, Some(vec![(value - 13) as u8]))
    } else {
        let ext = value - 269;
        (14, Some(vec![(ext >> 8) as u8, ext as u8]))
    }
}

/// Decodes a `Pdu` out of `src`.
///
/// Returns `Error::ParseFailure` if `src` does not contain a
/// well-formed message.
pub fn decode(src: &[u8]) -> Result<Pdu, Error> {
    if src.len() < 4 {
        return Err(Error::ParseFailure);
    }

    let version = src[0] >> 6;
    let msg_type = MsgType::try_from((src[0] >> 4) & 0x3).ok_or(Error::ParseFailure)?;
    let optcnt_nibble = src[0] & 0x0F;

    let mut pos = 1usize;
    let option_count = if optcnt_nibble < 15 {
        optcnt_nibble as usize
    } else {
        let ext = *src.get(pos).ok_or(Error::ParseFailure)?;
        pos += 1;
        15 + ext as usize
    };

    let code_byte = *src.get(pos).ok_or(Error::ParseFailure)?;
    let code = MsgCode::try_from(code_byte).ok_or(Error::UnknownMessageCode)?;
    pos += 1;

    let msg_id_hi = *src.get(pos).ok_or(Error::ParseFailure)? as u16;
    let msg_id_lo = *src.get(pos + 1).ok_or(Error::ParseFailure)? as u16;
    let msg_id = (msg_id_hi << 8) | msg_id_lo;
    pos += 2;

    let mut options = Vec::with_capacity(option_count);
    let mut prev_number = 0u16;

    for _ in 0..option_count {
        let header_byte = *src.get(pos).ok_or(Error::ParseFailure)?;
        pos += 1;

        let delta = decode_nibble_field(header_byte >> 4, src, &mut pos)?;
        let length = decode_nibble_field(header_byte & 0x0F, src, &mut pos)?;

        let number = OptionNumber(
            prev_number
                .checked_add(delta)
                .ok_or(Error::ParseFailure)?,
        );
        prev_number = number.0;

        let length = length as usize;
        if number == OptionNumber::TOKEN && length > MAX_TOKEN_LENGTH {
            return Err(Error::ParseFailure);
        }
        let value = src
            .get(pos..pos + length)
            .ok_or(Error::ParseFailure)?
            .to_vec();
        pos += length;

        options.push(RawOption::new(number, value));
    }

    let payload = match src.get(pos) {
        Some(&PAYLOAD_MARKER) => src[pos + 1..].to_vec(),
        Some(_) => return Err(Error::ParseFailure),
        None => Vec::new(),
    };

    Ok(Pdu {
        version,
        msg_type,
        code,
        msg_id,
        options,
        payload,
    })
}

/// Inverse of [`encode_nibble_field`]: reads the extension bytes (if any)
/// that follow a delta/length nibble, advancing `pos` past them.
fn decode_nibble_field(nibble: u8, src: &[u8], pos: &mut usize) -> Result<u16, Error> {
    match nibble {
        15 => Err(Error::ParseFailure),
        14 => {
            let hi = *src.get(*pos).ok_or(Error::ParseFailure)? as u16;
            let lo = *src.get(*pos + 1).ok_or(Error::ParseFailure)? as u16;
            *pos += 2;
            Ok(((hi << 8) | lo) + 269)
        }
        13 => {
            let ext = *src.get(*pos).ok_or(Error::ParseFailure)? as u16;
            *pos += 1;
            Ok(ext + 13)
        }
        n => Ok(n as u16),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MsgToken;

    #[test]
    fn round_trip_simple_request() {
        let mut pdu = Pdu::new(MsgType::Con, MsgCode::MethodGet, 0x1234);
        pdu.set_token(MsgToken::from(0xABu16));
        pdu.set_uri_path("well-known/core");

        let mut buf = [0u8; 128];
        let len = encode(&pdu, &mut buf).unwrap();
        let decoded = decode(&buf[..len]).unwrap();

        assert_eq!(decoded.version, pdu.version);
        assert_eq!(decoded.msg_type, pdu.msg_type);
        assert_eq!(decoded.code, pdu.code);
        assert_eq!(decoded.msg_id, pdu.msg_id);
        assert_eq!(decoded.token(), pdu.token());
        assert_eq!(decoded.uri_path(), pdu.uri_path());
    }

    #[test]
    fn round_trip_with_payload() {
        let mut pdu = Pdu::new(MsgType::Non, MsgCode::SuccessContent, 7);
        pdu.payload = b"hello, world".to_vec();

        let mut buf = [0u8; 64];
        let len = encode(&pdu, &mut buf).unwrap();
        let decoded = decode(&buf[..len]).unwrap();

        assert_eq!(decoded.payload, pdu.payload);
    }

    #[test]
    fn round_trip_many_options_uses_extended_optcnt() {
        let mut pdu = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        for i in 0..20u16 {
            pdu.add_option(OptionNumber(300 + i), vec![i as u8]);
        }

        let mut buf = [0u8; 256];
        let len = encode(&pdu, &mut buf).unwrap();
        let decoded = decode(&buf[..len]).unwrap();

        assert_eq!(decoded.options.len(), 20);
        assert_eq!(decoded.options, pdu.options);
    }

    #[test]
    fn decode_rejects_truncated_input() {
        assert_eq!(decode(&[0u8; 2]), Err(Error::ParseFailure));
    }

    #[test]
    fn decode_rejects_oversized_token_option_instead_of_panicking() {
        let mut pdu = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        pdu.add_option(OptionNumber::TOKEN, vec![0u8; 64]);

        let mut buf = [0u8; 128];
        let len = encode(&pdu, &mut buf).unwrap();

        assert_eq!(decode(&buf[..len]), Err(Error::ParseFailure));
    }

    #[test]
    fn encode_rejects_out_of_space() {
        let pdu = Pdu::new(MsgType::Con, MsgCode::MethodGet, 1);
        let mut buf = [0u8; 2];
        assert_eq!(encode(&pdu, &mut buf), Err(Error::OutOfSpace));
    }
}
