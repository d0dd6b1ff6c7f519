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

//! CoRE link-format (RFC 6690) serialization of the registered resource
//! set, for `GET /.well-known/core`.
//!
//! This is a much narrower problem than the teacher crate's `link_format`
//! module, which parses and builds arbitrary link-format documents with
//! attributes for a generic URI type. This engine only ever needs to
//! *produce* a flat list of registered paths, grounded on
//! `examples/original_source/net.c`'s call into the same-named
//! `print_wellknown` collaborator.

use crate::registry::ResourceRegistry;

/// Serializes every path in `registry` as a comma-separated CoRE
/// link-format document: `</a>,</b>`.
///
/// Resource ordering is not significant to link-format consumers, but is
/// sorted here for deterministic output (and deterministic tests).
pub fn print_wellknown(registry: &ResourceRegistry) -> String {
    let mut paths: Vec<&str> = registry.iter().map(|r| r.path.as_str()).collect();
    paths.sort_unstable();

    paths
        .into_iter()
        .map(|path| format!("</{}>", path))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Resource;

    #[test]
    fn empty_registry_yields_empty_document() {
        let registry = ResourceRegistry::new();
        assert_eq!(print_wellknown(&registry), "");
    }

    #[test]
    fn lists_every_resource_sorted() {
        let mut registry = ResourceRegistry::new();
        registry.register(Resource::new("b"));
        registry.register(Resource::new("a"));
        assert_eq!(print_wellknown(&registry), "</a>,</b>");
    }
}
