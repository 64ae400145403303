//! # Authorization
//!
//! A write is classified as an [`Operation`] and checked against up to
//! three independent grant axes: channels, roles and usernames. Each axis is
//! a [`GrantSet`] with per-operation lists plus a `write` list that applies
//! to every operation. Any axis that intersects the principal grants access.
//!
//! Authorization runs before structural validation. A denied write never
//! reports validation errors.

use std::fmt;

use docguard_core::{Document, Principal};
use serde::Serialize;
use tracing::debug;

use crate::error::SchemaError;
use crate::resolvable::{ResolveContext, Resolvable};

/// What a write does to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// No live prior revision exists.
    Add,
    /// A live prior revision is being overwritten.
    Replace,
    /// The new revision is a deletion tombstone.
    Remove,
}

impl Operation {
    /// Classify a write. `old_doc` must already exclude deleted revisions.
    pub fn classify(new_doc: &Document, old_doc: Option<&Document>) -> Self {
        if new_doc.is_deleted() {
            Self::Remove
        } else if old_doc.is_none() {
            Self::Add
        } else {
            Self::Replace
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Replace => "replace",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grants for one axis, per operation.
///
/// `view` only has meaning for channels, where it widens the set of
/// channels a document is assigned to without granting write access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantSet {
    pub view: Vec<String>,
    pub add: Vec<String>,
    pub replace: Vec<String>,
    pub remove: Vec<String>,
    pub write: Vec<String>,
}

fn push_unique(out: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
}

impl GrantSet {
    /// A grant set whose `write` list covers every operation.
    pub fn write<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            write: entries.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Entries that authorize `operation`: its own list followed by `write`.
    pub fn for_operation(&self, operation: Operation) -> Vec<String> {
        let specific = match operation {
            Operation::Add => &self.add,
            Operation::Replace => &self.replace,
            Operation::Remove => &self.remove,
        };
        let mut out = Vec::new();
        push_unique(&mut out, specific);
        push_unique(&mut out, &self.write);
        out
    }

    /// Every entry of every list, first occurrence order.
    pub fn all(&self) -> Vec<String> {
        let mut out = Vec::new();
        for list in [&self.view, &self.add, &self.replace, &self.remove, &self.write] {
            push_unique(&mut out, list);
        }
        out
    }
}

/// Which axis a denial is reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    MissingChannelAccess,
    MissingRole,
    WrongUser,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingChannelAccess => "missing channel access",
            Self::MissingRole => "missing role",
            Self::WrongUser => "wrong user",
        })
    }
}

/// A failed access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denial {
    pub reason: DenialReason,
    /// The principal presented no identity.
    pub anonymous: bool,
}

/// The grant axes of a document definition.
#[derive(Debug, Clone, Default)]
pub struct Authorization {
    pub channels: Option<Resolvable<GrantSet>>,
    pub roles: Option<Resolvable<GrantSet>>,
    pub users: Option<Resolvable<GrantSet>>,
    /// Authorize every identified principal.
    pub grant_all_members_write_access: Resolvable<bool>,
}

/// Grants resolved for one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub operation: Operation,
    /// Channels that authorize the operation. `None` if the axis is unset.
    pub channels: Option<Vec<String>>,
    pub roles: Option<Vec<String>>,
    pub users: Option<Vec<String>>,
    pub all_members: bool,
    /// Every channel the document is assigned to.
    pub assigned_channels: Vec<String>,
}

impl Authorization {
    /// Resolve every axis for `operation`.
    pub fn resolve(
        &self,
        operation: Operation,
        ctx: &ResolveContext<'_>,
    ) -> Result<AccessGrant, SchemaError> {
        let channels = self.channels.as_ref().map(|s| s.resolve(ctx)).transpose()?;
        let roles = self.roles.as_ref().map(|s| s.resolve(ctx)).transpose()?;
        let users = self.users.as_ref().map(|s| s.resolve(ctx)).transpose()?;

        Ok(AccessGrant {
            operation,
            assigned_channels: channels.as_ref().map(GrantSet::all).unwrap_or_default(),
            channels: channels.map(|g| g.for_operation(operation)),
            roles: roles.map(|g| g.for_operation(operation)),
            users: users.map(|g| g.for_operation(operation)),
            all_members: self.grant_all_members_write_access.resolve(ctx)?,
        })
    }
}

impl AccessGrant {
    /// Whether `principal` may perform the write.
    pub fn check(&self, principal: &Principal) -> Result<(), Denial> {
        let anonymous = principal.is_anonymous();

        if self.all_members && !anonymous {
            debug!(operation = %self.operation, "granted to all members");
            return Ok(());
        }

        let channel_hit = self
            .channels
            .as_ref()
            .is_some_and(|c| c.iter().any(|ch| principal.has_channel(ch)));
        let role_hit = self
            .roles
            .as_ref()
            .is_some_and(|r| r.iter().any(|role| principal.has_role(role)));
        let user_hit = self
            .users
            .as_ref()
            .is_some_and(|u| u.iter().any(|name| principal.is_user(name)));

        if channel_hit || role_hit || user_hit {
            debug!(
                operation = %self.operation,
                channel_hit,
                role_hit,
                user_hit,
                "access granted"
            );
            return Ok(());
        }

        let reason = if self.channels.is_some() {
            DenialReason::MissingChannelAccess
        } else if self.roles.is_some() {
            DenialReason::MissingRole
        } else if self.users.is_some() {
            DenialReason::WrongUser
        } else {
            DenialReason::MissingChannelAccess
        };
        debug!(operation = %self.operation, %reason, anonymous, "access denied");
        Err(Denial { reason, anonymous })
    }
}
