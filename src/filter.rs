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

//! Filter expressions over service-record attributes, plus the extractors the
//! discovery engine uses to specialize a query to one node or one module.

use crate::locator::ModuleIdentifier;
use crate::record::ServiceRecord;
use std::fmt;

/// Wire attribute naming the node a record belongs to.
pub const FILTER_ATTR_NODE: &str = "node";
/// Wire attribute naming a cluster a record's node is a member of.
pub const FILTER_ATTR_CLUSTER: &str = "cluster";
/// Wire attribute carrying an `app/module` deployment identity.
pub const FILTER_ATTR_EJB_MODULE: &str = "ejb-module";
/// Wire attribute carrying an `app/module/distinct` deployment identity.
pub const FILTER_ATTR_EJB_MODULE_DISTINCT: &str = "ejb-module-distinct";
/// Wire attribute restricting a record to clients in a source CIDR range.
pub const FILTER_ATTR_SOURCE_IP: &str = "source-ip";

/// Abstract type of the EJB service.
pub const EJB_ABSTRACT_TYPE: &str = "ejb";
/// Abstract type authority of the EJB service.
pub const EJB_ABSTRACT_TYPE_AUTHORITY: &str = "jboss";

/// Abstract service type a discovery query targets. Queries that do not imply
/// the EJB service type are completed immediately without probing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServiceType {
    abstract_type: String,
    abstract_type_authority: Option<String>,
}

impl ServiceType {
    pub fn of(abstract_type: &str, abstract_type_authority: &str) -> Self {
        Self {
            abstract_type: abstract_type.to_string(),
            abstract_type_authority: Some(abstract_type_authority.to_string()),
        }
    }

    pub fn of_type(abstract_type: &str) -> Self {
        Self {
            abstract_type: abstract_type.to_string(),
            abstract_type_authority: None,
        }
    }

    /// The JBoss EJB service type, `ejb.jboss`.
    pub fn ejb() -> Self {
        ServiceType::of(EJB_ABSTRACT_TYPE, EJB_ABSTRACT_TYPE_AUTHORITY)
    }

    pub fn abstract_type(&self) -> &str {
        &self.abstract_type
    }

    pub fn abstract_type_authority(&self) -> Option<&str> {
        self.abstract_type_authority.as_deref()
    }

    /// `self` implies `other` when it is at least as specific: equal abstract
    /// types, and either `other` names no authority or the authorities match.
    pub fn implies(&self, other: &ServiceType) -> bool {
        self.abstract_type == other.abstract_type
            && match other.abstract_type_authority.as_deref() {
                None => true,
                Some(authority) => self.abstract_type_authority.as_deref() == Some(authority),
            }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.abstract_type_authority.as_deref() {
            Some(authority) => write!(f, "{}.{}", self.abstract_type, authority),
            None => f.write_str(&self.abstract_type),
        }
    }
}

///
/// Boolean filter expression over named record attributes.
///
/// A filter either requires an attribute to carry a given value, requires an
/// attribute to be present at all, or requires every child filter to hold.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FilterSpec {
    /// The attribute carries the given value.
    Equal { attribute: String, value: String },
    /// Every child filter matches. An empty conjunction matches everything.
    All(Vec<FilterSpec>),
    /// The attribute is present with at least one value.
    HasAttribute { attribute: String },
}

impl FilterSpec {
    pub fn equal(attribute: &str, value: &str) -> Self {
        FilterSpec::Equal {
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }

    pub fn all(children: Vec<FilterSpec>) -> Self {
        FilterSpec::All(children)
    }

    pub fn has_attribute(attribute: &str) -> Self {
        FilterSpec::HasAttribute {
            attribute: attribute.to_string(),
        }
    }

    /// Whether the record's attribute multimap satisfies this filter.
    pub fn matches(&self, record: &ServiceRecord) -> bool {
        match self {
            FilterSpec::Equal { attribute, value } => record
                .attribute_values(attribute)
                .iter()
                .any(|candidate| candidate == value),
            FilterSpec::All(children) => children.iter().all(|child| child.matches(record)),
            FilterSpec::HasAttribute { attribute } => {
                !record.attribute_values(attribute).is_empty()
            }
        }
    }

    /// First module identity implied by an equality on `ejb-module` or
    /// `ejb-module-distinct`, recursing into conjunctions.
    pub fn module_identifier(&self) -> Option<ModuleIdentifier> {
        match self {
            FilterSpec::Equal { attribute, value } => {
                module_identifier_for_attribute(attribute, value)
            }
            FilterSpec::All(children) => children.iter().find_map(FilterSpec::module_identifier),
            FilterSpec::HasAttribute { .. } => None,
        }
    }

    /// First node name required by an equality on `node`, recursing into
    /// conjunctions.
    pub fn node_name(&self) -> Option<&str> {
        match self {
            FilterSpec::Equal { attribute, value } if attribute == FILTER_ATTR_NODE => Some(value),
            FilterSpec::All(children) => children.iter().find_map(FilterSpec::node_name),
            _ => None,
        }
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSpec::Equal { attribute, value } => write!(f, "({attribute}={value})"),
            FilterSpec::All(children) => {
                f.write_str("(&")?;
                for child in children {
                    fmt::Display::fmt(child, f)?;
                }
                f.write_str(")")
            }
            FilterSpec::HasAttribute { attribute } => write!(f, "({attribute}=*)"),
        }
    }
}

fn module_identifier_for_attribute(attribute: &str, value: &str) -> Option<ModuleIdentifier> {
    let segments: Vec<&str> = value.split('/').collect();
    match attribute {
        FILTER_ATTR_EJB_MODULE => match segments.as_slice() {
            [app, module] => Some(ModuleIdentifier::new(app, module, "")),
            [module] => Some(ModuleIdentifier::new("", module, "")),
            _ => None,
        },
        FILTER_ATTR_EJB_MODULE_DISTINCT => match segments.as_slice() {
            [app, module, distinct] => Some(ModuleIdentifier::new(app, module, distinct)),
            [module, distinct] => Some(ModuleIdentifier::new("", module, distinct)),
            _ => None,
        },
        _ => None,
    }
}
