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

/// Iterates over the options of a decoded [`crate::message::Pdu`] in
/// ascending option-number order.
///
/// This is a thin wrapper around a slice iterator: unlike the teacher
/// crate's `option::iter`, which decodes options lazily out of a wire
/// buffer, this engine always holds options already decoded into
/// [`RawOption`]s, so there is no lazy state to drive here. The type exists
/// to give the admission screener (`spec.md` §4.F) a named collaborator to
/// iterate over, rather than reaching into `Pdu` internals directly.
#[derive(Clone)]
pub struct OptionIter<'a> {
    inner: core::slice::Iter<'a, RawOption>,
}

impl<'a> OptionIter<'a> {
    /// Creates an iterator over `options`, which must already be sorted in
    /// ascending order by option number.
    pub fn new(options: &'a [RawOption]) -> OptionIter<'a> {
        OptionIter {
            inner: options.iter(),
        }
    }

    /// Scans the options for any critical option number not present in
    /// `known`, returning the first one found.
    ///
    /// Matches `spec.md` §4.F: admission fails closed on the first unknown
    /// critical option, it does not collect all of them.
    pub fn first_unhandled_critical_option(self, known: &OptionFilter) -> Option<OptionNumber> {
        self.map(|opt| opt.number)
            .find(|&number| number.is_critical() && !known.contains(number))
    }
}

impl<'a> Iterator for OptionIter<'a> {
    type Item = &'a RawOption;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_unknown_critical_option() {
        let options = vec![
            RawOption::new(OptionNumber::TOKEN, vec![1, 2, 3]),
            RawOption::new(OptionNumber::URI_PATH, b"foo".to_vec()),
            RawOption::new(OptionNumber(65001), vec![]),
        ];
        let mut known = OptionFilter::new();
        known.insert(OptionNumber::TOKEN);
        known.insert(OptionNumber::URI_PATH);

        let found = OptionIter::new(&options).first_unhandled_critical_option(&known);
        assert_eq!(found, Some(OptionNumber(65001)));
    }

    #[test]
    fn no_unknown_critical_option() {
        let options = vec![RawOption::new(OptionNumber::URI_PATH, b"foo".to_vec())];
        let mut known = OptionFilter::new();
        known.insert(OptionNumber::URI_PATH);

        assert_eq!(
            OptionIter::new(&options).first_unhandled_critical_option(&known),
            None
        );
    }
}
