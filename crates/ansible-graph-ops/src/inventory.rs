//! YAML inventory loader.
//!
//! Reads the Ansible YAML inventory layout:
//!
//! ```yaml
//! all:
//!   vars: { ntp: pool.ntp.org }
//!   children:
//!     webservers:
//!       vars: { ansible_group_priority: 10, port: 80 }
//!       hosts:
//!         web1: { ip: 10.0.0.1 }
//!         web[2:3]:
//! ```
//!
//! Groups live in an arena and refer to each other by index, so any child
//! relation (cycles included) can be represented. Hosts and groups are handed
//! to the scrapers through the lightweight [`HostRef`] and [`GroupRef`]
//! handles.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ansible_graph_core::AttrMap;
use serde_json::{json, Value};
use serde_yaml::{Mapping, Value as Yaml};
use tracing::{debug, warn};

use crate::error::{OpsError, OpsResult};
use crate::model::{Group, Host, Inventory};
use crate::requests::SourceKind;
use crate::schema::GROUP_NAMES;

const ALL: &str = "all";
const UNGROUPED: &str = "ungrouped";
const PRIORITY_VAR: &str = "ansible_group_priority";
const DEFAULT_PRIORITY: i64 = 1;

#[derive(Debug, Clone)]
struct GroupData {
    name: String,
    priority: i64,
    vars: AttrMap,
    children: Vec<usize>,
    parents: Vec<usize>,
}

#[derive(Debug, Clone)]
struct HostData {
    name: String,
    vars: AttrMap,
    /// Direct groups in declaration order, never `all`.
    groups: Vec<usize>,
}

/// An inventory parsed from a YAML (or JSON) file.
#[derive(Debug, Clone)]
pub struct YamlInventory {
    path: PathBuf,
    groups: Vec<GroupData>,
    group_index: HashMap<String, usize>,
    hosts: Vec<HostData>,
    host_index: HashMap<String, usize>,
}

impl YamlInventory {
    /// Read and parse an inventory file.
    pub fn load(path: impl AsRef<Path>) -> OpsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| OpsError::source_load(SourceKind::Inventory, path, e))?;
        Self::parse(&text, path)
    }

    /// Parse inventory text; `path` is only used for reporting.
    pub fn parse(text: &str, path: impl AsRef<Path>) -> OpsResult<Self> {
        let path = path.as_ref();
        let fail = |message: String| OpsError::source_load(SourceKind::Inventory, path, message);

        let mut root: Yaml = serde_yaml::from_str(text).map_err(|e| fail(e.to_string()))?;
        root.apply_merge().map_err(|e| fail(e.to_string()))?;

        let mut inventory = Self {
            path: path.to_path_buf(),
            groups: Vec::new(),
            group_index: HashMap::new(),
            hosts: Vec::new(),
            host_index: HashMap::new(),
        };
        let all = inventory.ensure_group(ALL);
        inventory.ensure_group(UNGROUPED);

        match &root {
            Yaml::Null => {}
            Yaml::Mapping(mapping) => {
                for (key, value) in mapping {
                    let name = key_to_string(key).map_err(&fail)?;
                    inventory.parse_group(&name, value).map_err(&fail)?;
                }
            }
            _ => return Err(fail("inventory root must be a mapping of groups".to_string())),
        }

        inventory.reconcile(all);
        debug!(
            path = %path.display(),
            hosts = inventory.hosts.len(),
            groups = inventory.groups.len(),
            "inventory parsed"
        );
        Ok(inventory)
    }

    /// Path the inventory was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of distinct hosts.
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Look up a host by name.
    pub fn host(&self, name: &str) -> Option<HostRef<'_>> {
        self.host_index.get(name).map(|&index| HostRef {
            inventory: self,
            index,
        })
    }

    /// Look up a group by name.
    pub fn group(&self, name: &str) -> Option<GroupRef<'_>> {
        self.group_index.get(name).map(|&index| GroupRef {
            inventory: self,
            index,
        })
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    fn ensure_group(&mut self, name: &str) -> usize {
        if let Some(&index) = self.group_index.get(name) {
            return index;
        }
        let index = self.groups.len();
        self.groups.push(GroupData {
            name: name.to_string(),
            priority: DEFAULT_PRIORITY,
            vars: AttrMap::new(),
            children: Vec::new(),
            parents: Vec::new(),
        });
        self.group_index.insert(name.to_string(), index);
        index
    }

    fn ensure_host(&mut self, name: &str) -> usize {
        if let Some(&index) = self.host_index.get(name) {
            return index;
        }
        let index = self.hosts.len();
        self.hosts.push(HostData {
            name: name.to_string(),
            vars: AttrMap::new(),
            groups: Vec::new(),
        });
        self.host_index.insert(name.to_string(), index);
        index
    }

    fn parse_group(&mut self, name: &str, value: &Yaml) -> Result<usize, String> {
        let group = self.ensure_group(name);

        let mapping = match value {
            Yaml::Null => return Ok(group),
            Yaml::Mapping(mapping) => mapping,
            _ => return Err(format!("group '{name}' must be a mapping")),
        };

        for (key, section) in mapping {
            match key.as_str() {
                Some("vars") => {
                    let vars = to_attr_map(section).map_err(|e| format!("group '{name}' vars: {e}"))?;
                    self.merge_group_vars(group, vars);
                }
                Some("hosts") => self.parse_hosts(group, section)?,
                Some("children") => match section {
                    Yaml::Null => {}
                    Yaml::Mapping(children) => {
                        for (child_key, child_value) in children {
                            let child_name = key_to_string(child_key)?;
                            let child = self.parse_group(&child_name, child_value)?;
                            self.add_child(group, child);
                        }
                    }
                    _ => return Err(format!("group '{name}' children must be a mapping")),
                },
                _ => warn!(group = name, key = ?key, "ignoring unknown group key"),
            }
        }

        Ok(group)
    }

    fn merge_group_vars(&mut self, group: usize, mut vars: AttrMap) {
        if let Some(priority) = vars.remove(PRIORITY_VAR) {
            match parse_priority(&priority) {
                Some(priority) => self.groups[group].priority = priority,
                None => warn!(
                    group = self.groups[group].name.as_str(),
                    value = %priority,
                    "ignoring non-integer group priority"
                ),
            }
        }
        self.groups[group].vars.extend(vars);
    }

    fn parse_hosts(&mut self, group: usize, section: &Yaml) -> Result<(), String> {
        let hosts = match section {
            Yaml::Null => return Ok(()),
            Yaml::Mapping(hosts) => hosts,
            _ => {
                return Err(format!(
                    "hosts of group '{}' must be a mapping",
                    self.groups[group].name
                ))
            }
        };

        for (key, vars) in hosts {
            let pattern = key_to_string(key)?;
            let vars = to_attr_map(vars).map_err(|e| format!("host '{pattern}' vars: {e}"))?;
            let (pattern, port) = split_port(&pattern);

            for name in expand_hostname_range(pattern)? {
                let host = self.ensure_host(&name);
                let data = &mut self.hosts[host];
                if let Some(port) = port {
                    data.vars.insert("ansible_port".to_string(), json!(port));
                }
                data.vars.extend(vars.clone());
                if !data.groups.contains(&group) {
                    data.groups.push(group);
                }
            }
        }
        Ok(())
    }

    fn add_child(&mut self, parent: usize, child: usize) {
        if !self.groups[parent].children.contains(&child) {
            self.groups[parent].children.push(child);
        }
        if !self.groups[child].parents.contains(&parent) {
            self.groups[child].parents.push(parent);
        }
    }

    /// Attach orphan groups to `all` and ungrouped hosts to `ungrouped`.
    fn reconcile(&mut self, all: usize) {
        for group in 0..self.groups.len() {
            if group != all && self.groups[group].parents.is_empty() {
                self.add_child(all, group);
            }
        }

        let ungrouped = self.ensure_group(UNGROUPED);
        for host in &mut self.hosts {
            host.groups.retain(|&g| g != all);
            if host.groups.is_empty() {
                host.groups.push(ungrouped);
            }
        }
    }
}

// =============================================================================
// Collaborator handles
// =============================================================================

/// Borrowed handle to a group of a [`YamlInventory`].
#[derive(Debug, Clone, Copy)]
pub struct GroupRef<'a> {
    inventory: &'a YamlInventory,
    index: usize,
}

impl GroupRef<'_> {
    fn data(&self) -> &GroupData {
        &self.inventory.groups[self.index]
    }
}

impl Group for GroupRef<'_> {
    fn name(&self) -> &str {
        &self.data().name
    }

    fn priority(&self) -> i64 {
        self.data().priority
    }

    fn vars(&self) -> AttrMap {
        self.data().vars.clone()
    }

    fn child_groups(&self) -> Vec<Self> {
        self.data()
            .children
            .iter()
            .map(|&index| GroupRef {
                inventory: self.inventory,
                index,
            })
            .collect()
    }
}

/// Borrowed handle to a host of a [`YamlInventory`].
#[derive(Debug, Clone, Copy)]
pub struct HostRef<'a> {
    inventory: &'a YamlInventory,
    index: usize,
}

impl HostRef<'_> {
    fn data(&self) -> &HostData {
        &self.inventory.hosts[self.index]
    }
}

impl<'a> Host for HostRef<'a> {
    type Group = GroupRef<'a>;

    fn name(&self) -> &str {
        &self.data().name
    }

    /// Host variables plus `inventory_hostname`, `inventory_hostname_short`
    /// and `group_names`.
    fn vars(&self) -> AttrMap {
        let data = self.data();
        let mut vars = data.vars.clone();

        let short = data.name.split('.').next().unwrap_or(&data.name);
        vars.insert("inventory_hostname".to_string(), json!(data.name));
        vars.insert("inventory_hostname_short".to_string(), json!(short));

        let mut names: Vec<&str> = data
            .groups
            .iter()
            .map(|&g| self.inventory.groups[g].name.as_str())
            .collect();
        names.sort_unstable();
        vars.insert(GROUP_NAMES.to_string(), json!(names));

        vars
    }

    fn groups(&self) -> Vec<GroupRef<'a>> {
        let inventory = self.inventory;
        let all = inventory.group_index.get(ALL).copied();
        all.into_iter()
            .chain(inventory.hosts[self.index].groups.iter().copied())
            .map(|index| GroupRef { inventory, index })
            .collect()
    }
}

impl Inventory for YamlInventory {
    type Host<'a> = HostRef<'a>;

    fn hosts(&self) -> Vec<HostRef<'_>> {
        (0..self.hosts.len())
            .map(|index| HostRef {
                inventory: self,
                index,
            })
            .collect()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn key_to_string(key: &Yaml) -> Result<String, String> {
    match key {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        other => Err(format!("unsupported mapping key: {other:?}")),
    }
}

/// Convert a YAML mapping (or null) into an attribute map.
pub(crate) fn to_attr_map(value: &Yaml) -> Result<AttrMap, String> {
    match value {
        Yaml::Null => Ok(AttrMap::new()),
        Yaml::Mapping(mapping) => mapping_to_attrs(mapping),
        _ => Err("expected a mapping".to_string()),
    }
}

pub(crate) fn mapping_to_attrs(mapping: &Mapping) -> Result<AttrMap, String> {
    let mut attrs = AttrMap::new();
    for (key, value) in mapping {
        let key = key_to_string(key)?;
        let value = serde_json::to_value(value).map_err(|e| format!("variable '{key}': {e}"))?;
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn parse_priority(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Split a trailing `:port` off a host pattern. IPv6 addresses are left alone.
///
/// Colons inside `[start:end]` ranges do not count as address separators.
fn split_port(pattern: &str) -> (&str, Option<u16>) {
    let Some((host, port)) = pattern.rsplit_once(':') else {
        return (pattern, None);
    };

    let mut depth = 0usize;
    let bare_colon = host.chars().any(|c| match c {
        '[' => {
            depth += 1;
            false
        }
        ']' => {
            depth = depth.saturating_sub(1);
            false
        }
        ':' => depth == 0,
        _ => false,
    });

    match port.parse::<u16>() {
        Ok(port) if !bare_colon => (host, Some(port)),
        _ => (pattern, None),
    }
}

/// Upper bound on the hosts a single pattern may expand to.
const MAX_RANGE_HOSTS: usize = 10_000;

/// Expand `prefix[start:end(:stride)]suffix` host patterns.
///
/// Numeric bounds keep the zero padding of `start`; single letters expand
/// alphabetically. Several ranges in one pattern are expanded left to right.
fn expand_hostname_range(pattern: &str) -> Result<Vec<String>, String> {
    let (Some(open), Some(close)) = (pattern.find('['), pattern.find(']')) else {
        return Ok(vec![pattern.to_string()]);
    };
    if close < open {
        return Err(format!("invalid host range in '{pattern}'"));
    }

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let range: Vec<&str> = pattern[open + 1..close].split(':').collect();
    let invalid = || format!("invalid host range in '{pattern}'");
    let too_many = || format!("host range in '{pattern}' expands to more than {MAX_RANGE_HOSTS} hosts");

    let (start, end, stride) = match range.as_slice() {
        [start, end] => (*start, *end, 1),
        [start, end, stride] => (*start, *end, stride.parse::<usize>().map_err(|_| invalid())?),
        _ => return Err(invalid()),
    };
    if stride == 0 {
        return Err(invalid());
    }

    let items: Vec<String> = if let (Ok(first), Ok(last)) = (start.parse::<u64>(), end.parse::<u64>()) {
        if first > last {
            return Err(invalid());
        }
        let count = (last - first) / stride as u64 + 1;
        if count > MAX_RANGE_HOSTS as u64 {
            return Err(too_many());
        }
        let width = if start.len() > 1 && start.starts_with('0') {
            start.len()
        } else {
            0
        };
        (first..=last)
            .step_by(stride)
            .map(|n| format!("{n:0width$}"))
            .collect()
    } else {
        let mut chars = (start.chars(), end.chars());
        match (chars.0.next(), chars.0.next(), chars.1.next(), chars.1.next()) {
            (Some(first), None, Some(last), None) if first.is_ascii_alphabetic() && last.is_ascii_alphabetic() && first <= last => {
                (first..=last).step_by(stride).map(String::from).collect()
            }
            _ => return Err(invalid()),
        }
    };

    let mut hosts = Vec::new();
    for item in items {
        hosts.extend(expand_hostname_range(&format!("{prefix}{item}{suffix}"))?);
        if hosts.len() > MAX_RANGE_HOSTS {
            return Err(too_many());
        }
    }
    Ok(hosts)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
all:
  vars:
    ntp: pool.ntp.org
  hosts:
    bastion:
  children:
    webservers:
      vars:
        ansible_group_priority: 10
        port: 80
      hosts:
        web1:
          ip: 10.0.0.1
        web2:
      children:
        edge:
          hosts:
            web2:
              cdn: true
dbservers:
  hosts:
    db1.example.com:5433:
"#;

    fn load() -> YamlInventory {
        YamlInventory::parse(SAMPLE, "hosts.yml").unwrap()
    }

    fn group_names<'a>(groups: impl IntoIterator<Item = GroupRef<'a>>) -> Vec<String> {
        groups.into_iter().map(|g| g.name().to_string()).collect()
    }

    #[test]
    fn test_hosts_and_groups() {
        let inventory = load();
        assert_eq!(inventory.host_count(), 4);

        let web1 = inventory.host("web1").unwrap();
        assert_eq!(group_names(web1.groups()), vec!["all", "webservers"]);
        let vars = web1.vars();
        assert_eq!(vars["ip"], json!("10.0.0.1"));
        assert_eq!(vars["inventory_hostname"], json!("web1"));
        assert_eq!(vars[GROUP_NAMES], json!(["webservers"]));
    }

    #[test]
    fn test_host_in_several_groups_merges_vars() {
        let inventory = load();
        let web2 = inventory.host("web2").unwrap();
        assert_eq!(group_names(web2.groups()), vec!["all", "webservers", "edge"]);
        assert_eq!(web2.vars()[GROUP_NAMES], json!(["edge", "webservers"]));
        assert_eq!(web2.vars()["cdn"], json!(true));
    }

    #[test]
    fn test_group_priority_and_vars() {
        let inventory = load();
        let web = inventory.group("webservers").unwrap();
        assert_eq!(web.priority(), 10);
        assert_eq!(web.vars().get(PRIORITY_VAR), None);
        assert_eq!(web.vars()["port"], json!(80));
        assert_eq!(group_names(web.child_groups()), vec!["edge"]);
        assert_eq!(inventory.group("edge").unwrap().priority(), DEFAULT_PRIORITY);
    }

    #[test]
    fn test_top_level_groups_become_children_of_all() {
        let inventory = load();
        let all = inventory.group(ALL).unwrap();
        let children = group_names(all.child_groups());
        assert!(children.contains(&"dbservers".to_string()));
        assert!(children.contains(&"webservers".to_string()));
        assert!(children.contains(&UNGROUPED.to_string()));
        assert!(!children.contains(&"edge".to_string()));
    }

    #[test]
    fn test_ungrouped_hosts() {
        let inventory = load();
        let bastion = inventory.host("bastion").unwrap();
        assert_eq!(group_names(bastion.groups()), vec!["all", "ungrouped"]);
        assert_eq!(bastion.vars()[GROUP_NAMES], json!(["ungrouped"]));
    }

    #[test]
    fn test_host_port_and_short_name() {
        let inventory = load();
        let db = inventory.host("db1.example.com").unwrap();
        let vars = db.vars();
        assert_eq!(vars["ansible_port"], json!(5433));
        assert_eq!(vars["inventory_hostname_short"], json!("db1"));
    }

    #[test]
    fn test_empty_inventory() {
        let inventory = YamlInventory::parse("", "empty.yml").unwrap();
        assert_eq!(inventory.host_count(), 0);
        assert!(inventory.group(ALL).is_some());
    }

    #[test]
    fn test_json_inventory() {
        let text = r#"{"all": {"children": {"web": {"hosts": {"w1": {"k": [1, 2]}}}}}}"#;
        let inventory = YamlInventory::parse(text, "hosts.json").unwrap();
        assert_eq!(inventory.host("w1").unwrap().vars()["k"], json!([1, 2]));
    }

    #[test]
    fn test_malformed_inventory_is_source_error() {
        let err = YamlInventory::parse("all: [unclosed", "bad.yml").unwrap_err();
        assert!(matches!(
            err,
            OpsError::SourceLoad {
                kind: SourceKind::Inventory,
                ..
            }
        ));

        let err = YamlInventory::parse("- a\n- b\n", "list.yml").unwrap_err();
        assert!(err.to_string().contains("list.yml"));
    }

    #[test]
    fn test_cyclic_children_parse() {
        let text = "a:\n  children:\n    b:\n      children:\n        a:\n";
        let inventory = YamlInventory::parse(text, "cycle.yml").unwrap();
        let a = inventory.group("a").unwrap();
        let b = inventory.group("b").unwrap();
        assert_eq!(group_names(a.child_groups()), vec!["b"]);
        assert_eq!(group_names(b.child_groups()), vec!["a"]);
    }

    #[test]
    fn test_expand_hostname_range() {
        assert_eq!(
            expand_hostname_range("web[01:03].lan").unwrap(),
            vec!["web01.lan", "web02.lan", "web03.lan"]
        );
        assert_eq!(expand_hostname_range("n[1:5:2]").unwrap(), vec!["n1", "n3", "n5"]);
        assert_eq!(expand_hostname_range("db-[a:c]").unwrap(), vec!["db-a", "db-b", "db-c"]);
        assert_eq!(expand_hostname_range("plain").unwrap(), vec!["plain"]);
        assert!(expand_hostname_range("bad[3:1]").is_err());
    }

    #[test]
    fn test_split_port() {
        assert_eq!(split_port("db:5432"), ("db", Some(5432)));
        assert_eq!(split_port("db"), ("db", None));
        assert_eq!(split_port("fe80::1"), ("fe80::1", None));
        assert_eq!(split_port("web[01:02]:2222"), ("web[01:02]", Some(2222)));
        assert_eq!(split_port("web[01:02]"), ("web[01:02]", None));
        assert_eq!(split_port("n[1:9:2]"), ("n[1:9:2]", None));
    }

    #[test]
    fn test_host_range_with_port() {
        let inventory = YamlInventory::parse("web:\n  hosts:\n    web[01:02]:2222:\n", "hosts.yml").unwrap();
        assert_eq!(inventory.host_count(), 2);
        for name in ["web01", "web02"] {
            assert_eq!(inventory.host(name).unwrap().vars()["ansible_port"], json!(2222));
        }
        assert!(inventory.host("web01:2222").is_none());
    }

    #[test]
    fn test_oversized_host_range_is_source_error() {
        assert!(expand_hostname_range("h[0:99999999999]").is_err());
        assert!(expand_hostname_range("h[0:200][0:200]").is_err());
        assert_eq!(expand_hostname_range("h[1:10000]").unwrap().len(), MAX_RANGE_HOSTS);

        let err = YamlInventory::parse("web:\n  hosts:\n    h[0:99999999999]:\n", "huge.yml").unwrap_err();
        assert!(matches!(
            err,
            OpsError::SourceLoad {
                kind: SourceKind::Inventory,
                ..
            }
        ));
        assert!(err.to_string().contains("more than"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = YamlInventory::load("/nonexistent/inventory.yml").unwrap_err();
        assert!(matches!(err, OpsError::SourceLoad { .. }));
    }
}
