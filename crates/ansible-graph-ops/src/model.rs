//! Resolved inventory and playbook objects consumed by the scrapers.
//!
//! Any loader can feed the scrapers by implementing these traits; the YAML
//! loaders in this crate are one such implementation. Every accessor
//! returns already-resolved data: variable maps are owned copies the scraper
//! is free to modify.

use ansible_graph_core::AttrMap;

/// A loaded inventory.
pub trait Inventory {
    /// Host handle type.
    type Host<'a>: Host
    where
        Self: 'a;

    /// All hosts of the inventory.
    fn hosts(&self) -> Vec<Self::Host<'_>>;
}

/// A resolved inventory host.
pub trait Host {
    /// Group handle type.
    type Group: Group;

    /// Inventory hostname.
    fn name(&self) -> &str;

    /// Resolved host variables, normally including `group_names`.
    fn vars(&self) -> AttrMap;

    /// Direct groups of the host; may include the universal group.
    fn groups(&self) -> Vec<Self::Group>;
}

/// A resolved inventory group.
pub trait Group: Sized {
    /// Group name.
    fn name(&self) -> &str;

    /// Variable precedence priority.
    fn priority(&self) -> i64;

    /// Group-scoped variables.
    fn vars(&self) -> AttrMap;

    /// Direct child groups.
    fn child_groups(&self) -> Vec<Self>;
}

/// A loaded playbook.
pub trait Playbook {
    /// Play type.
    type Play: Play;

    /// Plays in playbook order.
    fn plays(&self) -> &[Self::Play];
}

/// A resolved play.
pub trait Play {
    /// Task type.
    type Task: Task;

    /// Play name.
    fn name(&self) -> &str;

    /// Play variables.
    fn vars(&self) -> AttrMap;

    /// Tasks grouped by the block they were declared in.
    fn task_blocks(&self) -> &[Vec<Self::Task>];
}

/// A resolved task.
pub trait Task {
    /// Task name.
    fn name(&self) -> &str;

    /// Task variables, including those inherited from enclosing blocks.
    fn vars(&self) -> AttrMap;
}
