//! Resource identities
//!
//! A resource is an exclusively-ownable unit (a drivetrain, an arm, a
//! claw). Resources carry no data beyond their identity; the scheduler
//! issues them through [`crate::Scheduler::register_resource`] and keeps
//! their names and enabled state in its own registry.

use alloc::collections::BTreeSet;
use core::fmt;

/// Opaque identity of an exclusively-ownable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Resource(u32);

impl Resource {
    pub(crate) const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Raw identifier, stable for the life of the scheduler that issued it.
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

/// Ordered set of resources required by a command.
pub type ResourceSet = BTreeSet<Resource>;

/// Registry entry kept by the scheduler for every registered resource.
#[derive(Debug, Clone)]
pub(crate) struct ResourceEntry {
    pub name: alloc::string::String,
    pub enabled: bool,
}
