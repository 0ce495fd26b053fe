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

use std::fmt;
use url::Url;

/// URI rendered for [`Affinity::Local`]; invocations pinned to the local
/// process carry this destination instead of a network location.
const LOCAL_URI: &str = "local:-";

///
/// [`Locator`] is the immutable identity of an invocation target: the
/// application/module/distinct-name tuple naming the deployment, the bean
/// name within it, an optional session id for stateful targets, and the
/// strong [`Affinity`] baked into the proxy.
///
/// # Examples
///
/// ```
/// use ejb_resolver::{Affinity, Locator};
///
/// let locator = Locator::new("shop", "checkout", "", "CartBean")
///     .with_affinity(Affinity::Cluster("web".to_string()));
///
/// assert_eq!(locator.module().module(), "checkout");
/// assert!(!locator.is_stateful());
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Locator {
    module: ModuleIdentifier,
    bean_name: String,
    session_id: Option<String>,
    affinity: Affinity,
}

impl Locator {
    pub fn new(app_name: &str, module_name: &str, distinct_name: &str, bean_name: &str) -> Self {
        Self {
            module: ModuleIdentifier::new(app_name, module_name, distinct_name),
            bean_name: bean_name.to_string(),
            session_id: None,
            affinity: Affinity::None,
        }
    }

    pub fn with_affinity(mut self, affinity: Affinity) -> Self {
        self.affinity = affinity;
        self
    }

    pub fn with_session_id(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    pub fn module(&self) -> &ModuleIdentifier {
        &self.module
    }

    pub fn app_name(&self) -> &str {
        self.module.app()
    }

    pub fn module_name(&self) -> &str {
        self.module.module()
    }

    pub fn distinct_name(&self) -> &str {
        self.module.distinct()
    }

    pub fn bean_name(&self) -> &str {
        &self.bean_name
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// A locator is stateful when it carries a session id.
    pub fn is_stateful(&self) -> bool {
        self.session_id.is_some()
    }

    pub fn affinity(&self) -> &Affinity {
        &self.affinity
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.module, self.bean_name, self.affinity)
    }
}

/// Application/module/distinct-name deployment identity. The application and
/// distinct segments may be empty; the module segment never is for a valid
/// identity.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ModuleIdentifier {
    app: String,
    module: String,
    distinct: String,
}

impl ModuleIdentifier {
    pub fn new(app: &str, module: &str, distinct: &str) -> Self {
        Self {
            app: app.to_string(),
            module: module.to_string(),
            distinct: distinct.to_string(),
        }
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn distinct(&self) -> &str {
        &self.distinct
    }

    /// Wire form used for the `ejb-module` attribute: `app/module`, or just
    /// `module` when there is no application segment.
    pub fn module_value(&self) -> String {
        if self.app.is_empty() {
            self.module.clone()
        } else {
            format!("{}/{}", self.app, self.module)
        }
    }

    /// Wire form used for the `ejb-module-distinct` attribute, or `None` when
    /// the identity has no distinct segment.
    pub fn distinct_value(&self) -> Option<String> {
        if self.distinct.is_empty() {
            None
        } else if self.app.is_empty() {
            Some(format!("{}/{}", self.module, self.distinct))
        } else {
            Some(format!("{}/{}/{}", self.app, self.module, self.distinct))
        }
    }
}

impl fmt::Display for ModuleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.distinct_value() {
            Some(value) => f.write_str(&value),
            None => f.write_str(&self.module_value()),
        }
    }
}

///
/// [`Affinity`] binds an invocation to a specific destination URI, a named
/// node, or a named cluster. The strong affinity travels with the
/// [`Locator`]; the weak affinity is a hint recorded on the invocation
/// context by prior invocations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Affinity {
    /// No placement constraint.
    None,
    /// Pinned to one concrete destination URI.
    Uri(Url),
    /// Pinned to a named node, wherever it is currently reachable.
    Node(String),
    /// Bound to a named cluster; any member may serve the invocation.
    Cluster(String),
    /// Pinned to the local process.
    Local,
}

impl Affinity {
    /// The destination URI implied by this affinity, for the variants that
    /// imply one directly.
    pub fn uri(&self) -> Option<Url> {
        match self {
            Affinity::Uri(uri) => Some(uri.clone()),
            Affinity::Local => Url::parse(LOCAL_URI).ok(),
            _ => None,
        }
    }

    pub fn for_uri(uri: Url) -> Self {
        Affinity::Uri(uri)
    }
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Affinity::None => f.write_str("none"),
            Affinity::Uri(uri) => write!(f, "uri:{uri}"),
            Affinity::Node(node) => write!(f, "node:{node}"),
            Affinity::Cluster(cluster) => write!(f, "cluster:{cluster}"),
            Affinity::Local => f.write_str("local"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Affinity, Locator, ModuleIdentifier};

    #[test]
    fn module_value_forms() {
        assert_eq!(
            ModuleIdentifier::new("app", "mod", "").module_value(),
            "app/mod"
        );
        assert_eq!(ModuleIdentifier::new("", "mod", "").module_value(), "mod");
        assert_eq!(ModuleIdentifier::new("", "mod", "").distinct_value(), None);
        assert_eq!(
            ModuleIdentifier::new("app", "mod", "d").distinct_value(),
            Some("app/mod/d".to_string())
        );
        assert_eq!(
            ModuleIdentifier::new("", "mod", "d").distinct_value(),
            Some("mod/d".to_string())
        );
    }

    #[test]
    fn local_affinity_has_a_uri() {
        let uri = Affinity::Local.uri().expect("local uri");
        assert_eq!(uri.scheme(), "local");
        assert_eq!(Affinity::Node("n1".to_string()).uri(), None);
    }

    #[test]
    fn stateful_locator_tracks_session() {
        let locator = Locator::new("a", "m", "", "Bean").with_session_id("s-1");
        assert!(locator.is_stateful());
        assert_eq!(locator.session_id(), Some("s-1"));
    }
}
