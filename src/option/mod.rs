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

//! Types related to interpreting and handling CoAP options.
//!

use super::*;

/// The maximum size of a CoAP option allowed by this library.
pub const MAX_OPTION_VALUE_SIZE: usize = 1034;

mod num;
pub use num::*;

mod filter;
pub use filter::*;

mod iter;
pub use iter::*;

/// A single decoded option: its number plus the raw value bytes.
///
/// This is the owned, already-delta-decoded representation this crate passes
/// around internally; `message::codec` is the only place that deals with the
/// wire's delta/length nibble encoding.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RawOption {
    /// The option number.
    pub number: OptionNumber,

    /// The raw value bytes of this option.
    pub value: Vec<u8>,
}

impl RawOption {
    /// Constructs a new option from a number and a value.
    pub fn new(number: OptionNumber, value: Vec<u8>) -> RawOption {
        RawOption { number, value }
    }
}

impl core::fmt::Display for RawOption {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.number.fmt_with_value(f, &self.value)
    }
}
