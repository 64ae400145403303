//! # Identity
//!
//! The acting principal of a write and the context the write happens in.
//!
//! A [`Principal`] presents a username, the roles it holds and the channels
//! it may access. Administrators are identified either explicitly or by
//! holding the [`ADMIN_ROLE`]; an administrator is *not* implicitly
//! authorized for every write, it only qualifies for the narrow
//! unknown-type deletion bypass the engine can be configured with.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Role name that marks a principal as a store administrator.
pub const ADMIN_ROLE: &str = "_admin";

/// The identity performing a write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Username, `None` for anonymous access.
    #[serde(default)]
    pub name: Option<String>,
    /// Roles held by the principal.
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Channels the principal has been granted access to.
    #[serde(default)]
    pub channels: BTreeSet<String>,
    /// Explicit administrator flag.
    #[serde(default)]
    pub admin: bool,
}

impl Principal {
    /// An anonymous principal with no roles or channels.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A named principal with no roles or channels.
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// An administrator principal.
    pub fn administrator(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            admin: true,
            ..Self::default()
        }
    }

    /// Add a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Add several roles.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Add a channel.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channels.insert(channel.into());
        self
    }

    /// Add several channels.
    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels.extend(channels.into_iter().map(Into::into));
        self
    }

    /// Whether the principal is a store administrator.
    pub fn is_admin(&self) -> bool {
        self.admin || self.roles.contains(ADMIN_ROLE)
    }

    /// Whether the principal presented no identity at all.
    pub fn is_anonymous(&self) -> bool {
        self.name.is_none() && !self.is_admin()
    }

    /// Whether the principal holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Whether the principal may access `channel`.
    pub fn has_channel(&self, channel: &str) -> bool {
        self.channels.contains(channel)
    }

    /// Whether the principal is the user `username`.
    pub fn is_user(&self, username: &str) -> bool {
        self.name.as_deref() == Some(username)
    }
}

/// Everything about a write that is not the documents themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteContext {
    /// The acting principal.
    #[serde(default)]
    pub principal: Principal,
    /// Identifier of the store (database) the write targets.
    #[serde(default)]
    pub database: Option<String>,
}

impl WriteContext {
    /// Context for `principal` with no database identifier.
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            database: None,
        }
    }

    /// Set the database identifier.
    pub fn in_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}
