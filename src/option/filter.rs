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

/// Number of option numbers trackable by an [`OptionFilter`].
///
/// 512 is comfortably above [`OptionNumber::NO_RESPONSE`] (258), the highest
/// option number this crate names.
pub const OPTION_FILTER_BITS: usize = 512;

/// A fixed-size bitset over option numbers `0..OPTION_FILTER_BITS`.
///
/// Used both to record the set of option numbers a [`crate::Context`] knows
/// how to handle (`known_options`), and as the "unknown critical options"
/// output of the request screener (`spec.md` §4.F's admission check).
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct OptionFilter([u64; OPTION_FILTER_BITS / 64]);

impl OptionFilter {
    /// Returns a filter with no bits set.
    pub const fn new() -> OptionFilter {
        OptionFilter([0; OPTION_FILTER_BITS / 64])
    }

    /// Returns true if `number` is outside the range this filter can track.
    fn out_of_range(number: OptionNumber) -> bool {
        number.0 as usize >= OPTION_FILTER_BITS
    }

    /// Sets the bit for `number`. Numbers beyond [`OPTION_FILTER_BITS`] are
    /// silently ignored: this crate never registers an option number that
    /// high, so overflow here would indicate a bug in a caller, not a
    /// condition worth panicking over.
    pub fn insert(&mut self, number: OptionNumber) {
        if Self::out_of_range(number) {
            return;
        }
        let i = number.0 as usize;
        self.0[i / 64] |= 1u64 << (i % 64);
    }

    /// Returns true if the bit for `number` is set.
    pub fn contains(&self, number: OptionNumber) -> bool {
        if Self::out_of_range(number) {
            return false;
        }
        let i = number.0 as usize;
        self.0[i / 64] & (1u64 << (i % 64)) != 0
    }

    /// Returns true if no bits are set.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&word| word == 0)
    }

    /// Iterates over the option numbers whose bit is set, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = OptionNumber> + '_ {
        self.0.iter().enumerate().flat_map(|(word_idx, &word)| {
            (0..64).filter_map(move |bit| {
                if word & (1u64 << bit) != 0 {
                    Some(OptionNumber((word_idx * 64 + bit) as u16))
                } else {
                    None
                }
            })
        })
    }
}

impl Default for OptionFilter {
    fn default() -> Self {
        OptionFilter::new()
    }
}

impl core::fmt::Debug for OptionFilter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_contains() {
        let mut filter = OptionFilter::new();
        assert!(filter.is_empty());

        filter.insert(OptionNumber::URI_PATH);
        filter.insert(OptionNumber::TOKEN);

        assert!(filter.contains(OptionNumber::URI_PATH));
        assert!(filter.contains(OptionNumber::TOKEN));
        assert!(!filter.contains(OptionNumber::CONTENT_FORMAT));
        assert!(!filter.is_empty());
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut filter = OptionFilter::new();
        filter.insert(OptionNumber(OPTION_FILTER_BITS as u16 + 10));
        assert!(filter.is_empty());
        assert!(!filter.contains(OptionNumber(OPTION_FILTER_BITS as u16 + 10)));
    }

    #[test]
    fn iter_yields_ascending() {
        let mut filter = OptionFilter::new();
        filter.insert(OptionNumber::NO_RESPONSE);
        filter.insert(OptionNumber::IF_MATCH);
        filter.insert(OptionNumber::URI_PATH);

        let numbers: Vec<u16> = filter.iter().map(|n| n.0).collect();
        assert_eq!(numbers, vec![1, 11, 258]);
    }
}
