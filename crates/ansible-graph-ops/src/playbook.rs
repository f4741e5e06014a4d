//! YAML playbook loader.
//!
//! A playbook is a list of plays. Each play contributes task blocks in the
//! order Ansible runs them: `pre_tasks`, the tasks of every role, `tasks`,
//! then `post_tasks`. Handlers are not tasks and are left out.

use std::path::{Path, PathBuf};

use ansible_graph_core::AttrMap;
use serde_yaml::{Mapping, Value as Yaml};
use tracing::{debug, warn};

use crate::error::{OpsError, OpsResult};
use crate::inventory::{mapping_to_attrs, to_attr_map};
use crate::model::{Play, Playbook, Task};
use crate::requests::SourceKind;

/// Keys that configure a task rather than naming its action.
const TASK_KEYWORDS: &[&str] = &[
    "name",
    "action",
    "local_action",
    "args",
    "any_errors_fatal",
    "async",
    "become",
    "become_exe",
    "become_flags",
    "become_method",
    "become_user",
    "changed_when",
    "check_mode",
    "collections",
    "connection",
    "debugger",
    "delay",
    "delegate_facts",
    "delegate_to",
    "diff",
    "environment",
    "failed_when",
    "ignore_errors",
    "ignore_unreachable",
    "listen",
    "loop",
    "loop_control",
    "module_defaults",
    "no_log",
    "notify",
    "poll",
    "port",
    "register",
    "remote_user",
    "retries",
    "run_once",
    "tags",
    "throttle",
    "timeout",
    "until",
    "vars",
    "when",
];

const PLAYBOOK_IMPORTS: &[&str] = &[
    "import_playbook",
    "ansible.builtin.import_playbook",
    "include",
];

/// Role entry keys that are not role parameters.
const ROLE_KEYWORDS: &[&str] = &["role", "name", "tags", "when", "become", "become_user", "vars"];

/// A task with its inherited variables.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskData {
    name: String,
    vars: AttrMap,
}

impl Task for TaskData {
    fn name(&self) -> &str {
        &self.name
    }

    fn vars(&self) -> AttrMap {
        self.vars.clone()
    }
}

/// A play with its task blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayData {
    name: String,
    vars: AttrMap,
    blocks: Vec<Vec<TaskData>>,
}

impl Play for PlayData {
    type Task = TaskData;

    fn name(&self) -> &str {
        &self.name
    }

    fn vars(&self) -> AttrMap {
        self.vars.clone()
    }

    fn task_blocks(&self) -> &[Vec<TaskData>] {
        &self.blocks
    }
}

/// A playbook parsed from a YAML file.
#[derive(Debug, Clone)]
pub struct YamlPlaybook {
    path: PathBuf,
    plays: Vec<PlayData>,
}

impl Playbook for YamlPlaybook {
    type Play = PlayData;

    fn plays(&self) -> &[PlayData] {
        &self.plays
    }
}

impl YamlPlaybook {
    /// Read and parse a playbook file.
    ///
    /// Roles are looked up next to the playbook first, then under
    /// `<base_dir>/roles`.
    pub fn load(path: impl AsRef<Path>, base_dir: impl AsRef<Path>) -> OpsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| OpsError::source_load(SourceKind::Playbook, path, e))?;
        Self::parse(&text, path, base_dir)
    }

    /// Parse playbook text; `path` locates roles relative to the playbook.
    pub fn parse(text: &str, path: impl AsRef<Path>, base_dir: impl AsRef<Path>) -> OpsResult<Self> {
        let path = path.as_ref();
        let fail = |message: String| OpsError::source_load(SourceKind::Playbook, path, message);

        let mut root: Yaml = serde_yaml::from_str(text).map_err(|e| fail(e.to_string()))?;
        root.apply_merge().map_err(|e| fail(e.to_string()))?;

        let role_dirs = role_search_path(path, base_dir.as_ref());
        let entries = match &root {
            Yaml::Null => Vec::new(),
            Yaml::Sequence(entries) => entries.iter().collect(),
            _ => return Err(fail("playbook must be a list of plays".to_string())),
        };

        let mut plays = Vec::new();
        for (index, entry) in entries.into_iter().enumerate() {
            let mapping = entry
                .as_mapping()
                .ok_or_else(|| fail(format!("play #{} must be a mapping", index + 1)))?;

            if let Some(import) = PLAYBOOK_IMPORTS.iter().find(|k| mapping.contains_key(**k)) {
                warn!(
                    path = %path.display(),
                    import = ?mapping.get(*import),
                    "skipping playbook import"
                );
                continue;
            }

            plays.push(parse_play(mapping, &role_dirs).map_err(|e| fail(format!("play #{}: {e}", index + 1)))?);
        }

        debug!(path = %path.display(), plays = plays.len(), "playbook parsed");
        Ok(Self {
            path: path.to_path_buf(),
            plays,
        })
    }

    /// Path the playbook was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn role_search_path(playbook: &Path, base_dir: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(parent) = playbook.parent() {
        dirs.push(parent.join("roles"));
    }
    let base_roles = base_dir.join("roles");
    if !dirs.contains(&base_roles) {
        dirs.push(base_roles);
    }
    dirs
}

fn parse_play(mapping: &Mapping, role_dirs: &[PathBuf]) -> Result<PlayData, String> {
    let name = match (mapping.get("name").and_then(scalar_string), mapping.get("hosts")) {
        (Some(name), _) => name,
        (None, Some(hosts)) => host_pattern(hosts)?,
        (None, None) => return Err("play has neither a name nor hosts".to_string()),
    };

    let vars = mapping
        .get("vars")
        .map(to_attr_map)
        .transpose()
        .map_err(|e| format!("vars: {e}"))?
        .unwrap_or_default();

    let mut blocks = Vec::new();
    let mut push_block = |block: Vec<TaskData>| {
        if !block.is_empty() {
            blocks.push(block);
        }
    };

    if let Some(section) = mapping.get("pre_tasks") {
        push_block(task_section(section, &AttrMap::new(), None)?);
    }
    if let Some(roles) = mapping.get("roles") {
        let roles = match roles {
            Yaml::Null => &[][..],
            Yaml::Sequence(roles) => roles.as_slice(),
            _ => return Err("roles must be a list".to_string()),
        };
        for role in roles {
            push_block(role_tasks(role, role_dirs)?);
        }
    }
    if let Some(section) = mapping.get("tasks") {
        push_block(task_section(section, &AttrMap::new(), None)?);
    }
    if let Some(section) = mapping.get("post_tasks") {
        push_block(task_section(section, &AttrMap::new(), None)?);
    }

    Ok(PlayData { name, vars, blocks })
}

fn host_pattern(hosts: &Yaml) -> Result<String, String> {
    match hosts {
        Yaml::Sequence(items) => {
            let names = items
                .iter()
                .map(|h| scalar_string(h).ok_or_else(|| "hosts entries must be strings".to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(names.join(","))
        }
        other => scalar_string(other).ok_or_else(|| "hosts must be a string or a list".to_string()),
    }
}

fn role_tasks(entry: &Yaml, role_dirs: &[PathBuf]) -> Result<Vec<TaskData>, String> {
    let (role, params) = match entry {
        Yaml::Mapping(mapping) => {
            let role = mapping
                .get("role")
                .or_else(|| mapping.get("name"))
                .and_then(scalar_string)
                .ok_or_else(|| "role entry without a role name".to_string())?;

            let mut params = mapping.get("vars").map(to_attr_map).transpose()?.unwrap_or_default();
            let extra: Mapping = mapping
                .iter()
                .filter(|(k, _)| !k.as_str().is_some_and(|k| ROLE_KEYWORDS.contains(&k)))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            params.extend(mapping_to_attrs(&extra)?);
            (role, params)
        }
        other => (
            scalar_string(other).ok_or_else(|| "role entry must be a name or a mapping".to_string())?,
            AttrMap::new(),
        ),
    };

    let role_dir = role_dirs
        .iter()
        .map(|dir| dir.join(&role))
        .find(|dir| dir.is_dir())
        .ok_or_else(|| format!("role '{role}' not found in {role_dirs:?}"))?;

    let Some(main) = ["main.yml", "main.yaml"]
        .iter()
        .map(|file| role_dir.join("tasks").join(file))
        .find(|file| file.is_file())
    else {
        debug!(role = role.as_str(), "role has no tasks");
        return Ok(Vec::new());
    };

    let text = std::fs::read_to_string(&main).map_err(|e| format!("{}: {e}", main.display()))?;
    let mut tasks: Yaml = serde_yaml::from_str(&text).map_err(|e| format!("{}: {e}", main.display()))?;
    tasks.apply_merge().map_err(|e| format!("{}: {e}", main.display()))?;
    task_section(&tasks, &params, Some(&role)).map_err(|e| format!("role '{role}': {e}"))
}

/// Flatten a task list, expanding `block`/`rescue`/`always` recursively.
fn task_section(section: &Yaml, inherited: &AttrMap, role: Option<&str>) -> Result<Vec<TaskData>, String> {
    let entries = match section {
        Yaml::Null => return Ok(Vec::new()),
        Yaml::Sequence(entries) => entries,
        _ => return Err("task list must be a sequence".to_string()),
    };

    let mut tasks = Vec::new();
    for entry in entries {
        let mapping = entry
            .as_mapping()
            .ok_or_else(|| "task entries must be mappings".to_string())?;

        let mut vars = inherited.clone();
        if let Some(own) = mapping.get("vars") {
            vars.extend(to_attr_map(own)?);
        }

        if mapping.contains_key("block") {
            for key in ["block", "rescue", "always"] {
                if let Some(inner) = mapping.get(key) {
                    tasks.extend(task_section(inner, &vars, role)?);
                }
            }
            continue;
        }

        let name = task_name(mapping).ok_or_else(|| "task has neither a name nor an action".to_string())?;
        let name = match role {
            Some(role) => format!("{role} : {name}"),
            None => name,
        };
        tasks.push(TaskData { name, vars });
    }
    Ok(tasks)
}

/// Task name, falling back to the action module.
fn task_name(task: &Mapping) -> Option<String> {
    if let Some(name) = task.get("name").and_then(scalar_string) {
        return Some(name);
    }

    for key in ["action", "local_action"] {
        match task.get(key) {
            Some(Yaml::String(action)) => {
                return action.split_whitespace().next().map(str::to_string);
            }
            Some(Yaml::Mapping(action)) => {
                return action.get("module").and_then(scalar_string);
            }
            _ => {}
        }
    }

    task.keys()
        .filter_map(Yaml::as_str)
        .find(|k| !TASK_KEYWORDS.contains(k) && !k.starts_with("with_"))
        .map(str::to_string)
}

fn scalar_string(value: &Yaml) -> Option<String> {
    match value {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
