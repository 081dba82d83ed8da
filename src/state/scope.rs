//! State scopes - visibility tiers for persisted attributes
//!
//! - `Session` - lives in the conversation session, gone when it ends
//! - `User` - persisted per end-user across sessions
//! - `Application` - persisted once for the whole skill
//!
//! The tiers are independent: an attribute saved in `User` scope is not
//! implicitly part of `Session` unless it declares both.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Session,
    User,
    Application,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Session, Scope::User, Scope::Application];

    /// Store key prefix for partitioned scopes
    pub fn prefix(&self) -> &'static str {
        match self {
            Scope::Session => "",
            Scope::User => "user:",
            Scope::Application => "app:",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Scope::Session => 0b001,
            Scope::User => 0b010,
            Scope::Application => 0b100,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::Session => "session",
            Scope::User => "user",
            Scope::Application => "application",
        };
        f.write_str(name)
    }
}

/// A set of scopes, stored as a bitmask.
///
/// Built with const helpers so attribute tables can be declared statically:
///
/// ```
/// use skill_state::{Scope, ScopeSet};
///
/// const BOTH: ScopeSet = ScopeSet::of(Scope::Session).with(Scope::User);
/// assert!(BOTH.contains(Scope::User));
/// assert!(!BOTH.contains(Scope::Application));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScopeSet(u8);

impl ScopeSet {
    pub const EMPTY: ScopeSet = ScopeSet(0);
    pub const ALL: ScopeSet = ScopeSet(0b111);

    pub const fn of(scope: Scope) -> Self {
        ScopeSet(scope.bit())
    }

    pub const fn with(self, scope: Scope) -> Self {
        ScopeSet(self.0 | scope.bit())
    }

    pub const fn contains(&self, scope: Scope) -> bool {
        self.0 & scope.bit() != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
        Scope::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

impl From<Scope> for ScopeSet {
    fn from(scope: Scope) -> Self {
        ScopeSet::of(scope)
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        iter.into_iter().fold(ScopeSet::EMPTY, ScopeSet::with)
    }
}

impl fmt::Debug for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Scope requested for an encode/decode pass.
///
/// `Any` is the wildcard: no scope restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeFilter {
    Any,
    Only(Scope),
}

impl From<Scope> for ScopeFilter {
    fn from(scope: Scope) -> Self {
        ScopeFilter::Only(scope)
    }
}
