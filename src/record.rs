/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use std::collections::BTreeMap;
use url::Url;

///
/// [`ServiceRecord`] is one discovered endpoint: the location URI a client
/// can connect to, plus the attribute multimap describing what is reachable
/// there (`node`, `cluster`, module identities, `source-ip` restrictions).
///
/// Attribute order is insertion order per key; key lookup is by exact name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServiceRecord {
    location: Url,
    attributes: BTreeMap<String, Vec<String>>,
}

impl ServiceRecord {
    pub fn new(location: Url) -> Self {
        Self {
            location,
            attributes: BTreeMap::new(),
        }
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn add_attribute(&mut self, attribute: &str, value: &str) {
        self.attributes
            .entry(attribute.to_string())
            .or_default()
            .push(value.to_string());
    }

    pub fn with_attribute(mut self, attribute: &str, value: &str) -> Self {
        self.add_attribute(attribute, value);
        self
    }

    /// First value recorded for the attribute, if any.
    pub fn first_attribute(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value recorded for the attribute, in insertion order. Missing
    /// attributes yield an empty slice.
    pub fn attribute_values(&self, attribute: &str) -> &[String] {
        self.attributes
            .get(attribute)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
