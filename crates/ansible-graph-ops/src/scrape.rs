//! Scrapers that turn resolved inventories and playbooks into graph elements.
//!
//! Every write goes through the store's upsert operations, so running a
//! scraper twice over the same input leaves the graph unchanged apart from
//! attribute values, which follow the latest scrape.

use std::collections::HashSet;

use ansible_graph_core::{attrs, GraphResult, GraphStore, VertexId};
use serde_json::json;
use tracing::debug;

use crate::model::{Group, Host, Inventory, Play, Playbook, Task};
use crate::schema::{EdgeLabel, VertexLabel, GROUP_NAMES, KEY_ATTRIBUTE};

/// Link `node` to each of `groups`, then link every group to its children.
///
/// The first level uses `edge_label`; deeper levels use `HAS-CHILD-GROUP`
/// from the parent group vertex. Groups named `universal_group` are skipped
/// together with their subtree. The hierarchy is walked depth-first with an
/// explicit stack. A group seen a second time in the same walk still gets
/// its vertex and incoming edge but its children are not expanded again,
/// which bounds the walk on cyclic child-group chains.
pub fn link_node_to_groups<G: Group>(
    store: &mut GraphStore,
    node: VertexId,
    groups: Vec<G>,
    edge_label: EdgeLabel,
    universal_group: &str,
) -> GraphResult<()> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut stack: Vec<(VertexId, EdgeLabel, G)> = groups
        .into_iter()
        .rev()
        .map(|group| (node, edge_label, group))
        .collect();

    while let Some((parent, label, group)) = stack.pop() {
        let name = group.name().to_string();
        if name == universal_group {
            continue;
        }

        // The group's own priority wins over a variable named `priority`.
        let mut vars = group.vars();
        vars.insert("priority".to_string(), json!(group.priority()));

        let group_node = store.get_or_create_vertex(
            VertexLabel::Group.as_str(),
            attrs([(KEY_ATTRIBUTE, name.as_str())]),
            vars,
        )?;
        store.get_or_create_edge(parent, label.as_str(), group_node)?;

        if !visited.insert(name) {
            debug!(group = group.name(), "group already expanded, not descending");
            continue;
        }

        for child in group.child_groups().into_iter().rev() {
            stack.push((group_node, EdgeLabel::HasChildGroup, child));
        }
    }

    Ok(())
}

/// Scrape hosts into `HOST` vertices linked to their groups.
///
/// Returns the number of hosts scraped.
pub fn scrape_hosts<H, I>(store: &mut GraphStore, hosts: I, universal_group: &str) -> GraphResult<usize>
where
    H: Host,
    I: IntoIterator<Item = H>,
{
    let mut count = 0;

    for host in hosts {
        // group_names is rebuilt from HAS-GROUP edges; storing it would duplicate them
        let mut vars = host.vars();
        if vars.remove(GROUP_NAMES).is_none() {
            debug!(host = host.name(), "host variables carry no group_names");
        }

        let node = store.get_or_create_vertex(
            VertexLabel::Host.as_str(),
            attrs([(KEY_ATTRIBUTE, host.name())]),
            vars,
        )?;

        link_node_to_groups(
            store,
            node,
            host.groups(),
            EdgeLabel::HasGroup,
            universal_group,
        )?;
        count += 1;
    }

    Ok(count)
}

/// Scrape every host of an inventory.
pub fn scrape_inventory<I: Inventory>(
    store: &mut GraphStore,
    inventory: &I,
    universal_group: &str,
) -> GraphResult<usize> {
    scrape_hosts(store, inventory.hosts(), universal_group)
}

/// Scrape the plays of a playbook into `PLAY` vertices owning `TASK` vertices.
///
/// Tasks are keyed by name alone, so equally named tasks from different
/// plays resolve to one vertex carrying the attributes of the last one
/// scraped. Returns the number of plays scraped.
pub fn scrape_playbook<P: Playbook>(store: &mut GraphStore, playbook: &P) -> GraphResult<usize> {
    let mut count = 0;

    for play in playbook.plays() {
        let play_node = store.get_or_create_vertex(
            VertexLabel::Play.as_str(),
            attrs([(KEY_ATTRIBUTE, play.name())]),
            play.vars(),
        )?;

        for task in play.task_blocks().iter().flatten() {
            let task_node = store.get_or_create_vertex(
                VertexLabel::Task.as_str(),
                attrs([(KEY_ATTRIBUTE, task.name())]),
                task.vars(),
            )?;
            store.get_or_create_edge(play_node, EdgeLabel::HasTask.as_str(), task_node)?;
        }

        debug!(play = play.name(), "play scraped");
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::new_graph_store;
    use ansible_graph_core::{AttrMap, NestedValuePolicy};
    use serde_json::{json, Value};
    use std::collections::BTreeMap;
    use std::rc::Rc;

    // In-memory doubles for the collaborator traits. Groups live in a shared
    // table so child links can form arbitrary (even cyclic) shapes.

    #[derive(Default)]
    struct GroupTable {
        groups: BTreeMap<String, (i64, AttrMap, Vec<String>)>,
    }

    #[derive(Clone)]
    struct TestGroup {
        table: Rc<GroupTable>,
        name: String,
    }

    impl Group for TestGroup {
        fn name(&self) -> &str {
            &self.name
        }

        fn priority(&self) -> i64 {
            self.table.groups.get(&self.name).map(|g| g.0).unwrap_or(1)
        }

        fn vars(&self) -> AttrMap {
            self.table
                .groups
                .get(&self.name)
                .map(|g| g.1.clone())
                .unwrap_or_default()
        }

        fn child_groups(&self) -> Vec<Self> {
            self.table
                .groups
                .get(&self.name)
                .map(|g| {
                    g.2.iter()
                        .map(|child| TestGroup {
                            table: self.table.clone(),
                            name: child.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default()
        }
    }

    struct TestHost {
        name: String,
        vars: AttrMap,
        groups: Vec<TestGroup>,
    }

    impl Host for &TestHost {
        type Group = TestGroup;

        fn name(&self) -> &str {
            &self.name
        }

        fn vars(&self) -> AttrMap {
            self.vars.clone()
        }

        fn groups(&self) -> Vec<TestGroup> {
            self.groups.clone()
        }
    }

    struct TestTask(String, AttrMap);

    impl Task for TestTask {
        fn name(&self) -> &str {
            &self.0
        }

        fn vars(&self) -> AttrMap {
            self.1.clone()
        }
    }

    struct TestPlay {
        name: String,
        blocks: Vec<Vec<TestTask>>,
    }

    impl Play for TestPlay {
        type Task = TestTask;

        fn name(&self) -> &str {
            &self.name
        }

        fn vars(&self) -> AttrMap {
            AttrMap::new()
        }

        fn task_blocks(&self) -> &[Vec<TestTask>] {
            &self.blocks
        }
    }

    struct TestPlaybook(Vec<TestPlay>);

    impl Playbook for TestPlaybook {
        type Play = TestPlay;

        fn plays(&self) -> &[TestPlay] {
            &self.0
        }
    }

    fn table(entries: Vec<(&str, i64, Value, Vec<&str>)>) -> Rc<GroupTable> {
        let mut table = GroupTable::default();
        for (name, priority, vars, children) in entries {
            let vars: AttrMap = vars
                .as_object()
                .map(|m| m.clone().into_iter().collect())
                .unwrap_or_default();
            table.groups.insert(
                name.to_string(),
                (priority, vars, children.iter().map(|c| c.to_string()).collect()),
            );
        }
        Rc::new(table)
    }

    fn group(table: &Rc<GroupTable>, name: &str) -> TestGroup {
        TestGroup {
            table: table.clone(),
            name: name.to_string(),
        }
    }

    fn host(name: &str, vars: Value, groups: Vec<TestGroup>) -> TestHost {
        TestHost {
            name: name.to_string(),
            vars: vars
                .as_object()
                .map(|m| m.clone().into_iter().collect())
                .unwrap_or_default(),
            groups,
        }
    }

    fn store() -> GraphStore {
        new_graph_store(NestedValuePolicy::Preserve).unwrap()
    }

    fn id(store: &GraphStore, label: VertexLabel, name: &str) -> VertexId {
        store.find_vertex(label.as_str(), name).unwrap().id
    }

    #[test]
    fn test_web1_scenario() {
        let groups = table(vec![("webservers", 10, json!({"port": 80}), vec![])]);
        let hosts = vec![host(
            "web1",
            json!({"ip": "10.0.0.1", "group_names": ["webservers"]}),
            vec![group(&groups, "webservers")],
        )];

        let mut store = store();
        assert_eq!(scrape_hosts(&mut store, &hosts, "all").unwrap(), 1);

        let web1 = store.find_vertex("HOST", "web1").unwrap();
        assert_eq!(web1.attr("ip"), Some(&json!("10.0.0.1")));
        assert_eq!(web1.attrs.len(), 2);

        let webservers = store.find_vertex("GROUP", "webservers").unwrap();
        assert_eq!(webservers.attr("priority"), Some(&json!(10)));
        assert_eq!(webservers.attr("port"), Some(&json!(80)));

        assert!(store.has_edge(web1.id, "HAS-GROUP", webservers.id));
        assert_eq!(store.vertex_count(), 2);
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn test_hierarchy_fidelity() {
        let groups = table(vec![("g1", 1, json!({}), vec!["g2"]), ("g2", 1, json!({}), vec![])]);
        let hosts = vec![host("h", json!({}), vec![group(&groups, "g1")])];

        let mut store = store();
        scrape_hosts(&mut store, &hosts, "all").unwrap();

        let h = id(&store, VertexLabel::Host, "h");
        let g1 = id(&store, VertexLabel::Group, "g1");
        let g2 = id(&store, VertexLabel::Group, "g2");
        assert!(store.has_edge(h, "HAS-GROUP", g1));
        assert!(store.has_edge(g1, "HAS-CHILD-GROUP", g2));
        assert!(!store.has_edge(h, "HAS-GROUP", g2));
        assert!(!store.has_edge(g1, "HAS-GROUP", g2));
    }

    #[test]
    fn test_universal_group_is_never_linked() {
        let groups = table(vec![
            ("all", 0, json!({"ntp": "pool"}), vec!["web"]),
            ("web", 1, json!({}), vec!["all"]),
        ]);
        let hosts = vec![host(
            "h",
            json!({}),
            vec![group(&groups, "all"), group(&groups, "web")],
        )];

        let mut store = store();
        scrape_hosts(&mut store, &hosts, "all").unwrap();

        assert!(store.find_vertex("GROUP", "all").is_none());
        assert_eq!(store.vertices_with_label("GROUP").count(), 1);
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn test_custom_universal_group_name() {
        let groups = table(vec![("everything", 1, json!({}), vec![]), ("web", 1, json!({}), vec![])]);
        let hosts = vec![host(
            "h",
            json!({}),
            vec![group(&groups, "everything"), group(&groups, "web")],
        )];

        let mut store = store();
        scrape_hosts(&mut store, &hosts, "everything").unwrap();
        assert!(store.find_vertex("GROUP", "everything").is_none());
        assert!(store.find_vertex("GROUP", "web").is_some());
    }

    #[test]
    fn test_group_names_stripped_and_absence_tolerated() {
        let hosts = vec![
            host("a", json!({"group_names": ["x"], "k": 1}), vec![]),
            host("b", json!({"k": 2}), vec![]),
        ];

        let mut store = store();
        scrape_hosts(&mut store, &hosts, "all").unwrap();

        for vertex in store.vertices_with_label("HOST") {
            assert!(vertex.attr("group_names").is_none());
        }
        assert_eq!(store.vertex_count(), 2);
    }

    #[test]
    fn test_duplicate_host_names_last_write_wins() {
        let hosts = vec![
            host("web1", json!({"ip": "10.0.0.1", "os": "debian"}), vec![]),
            host("web1", json!({"ip": "10.0.0.9"}), vec![]),
        ];

        let mut store = store();
        scrape_hosts(&mut store, &hosts, "all").unwrap();

        let vertices: Vec<_> = store.vertices_with_label("HOST").collect();
        assert_eq!(vertices.len(), 1);
        assert_eq!(vertices[0].attr("ip"), Some(&json!("10.0.0.9")));
    }

    #[test]
    fn test_rescrape_is_idempotent() {
        let groups = table(vec![
            ("web", 1, json!({}), vec!["edge"]),
            ("edge", 2, json!({"cdn": true}), vec![]),
        ]);
        let hosts = vec![
            host("a", json!({}), vec![group(&groups, "web")]),
            host("b", json!({}), vec![group(&groups, "web"), group(&groups, "edge")]),
        ];

        let mut store = store();
        scrape_hosts(&mut store, &hosts, "all").unwrap();
        let counts = (store.vertex_count(), store.edge_count());
        scrape_hosts(&mut store, &hosts, "all").unwrap();
        assert_eq!((store.vertex_count(), store.edge_count()), counts);
    }

    #[test]
    fn test_cyclic_child_groups_terminate() {
        let groups = table(vec![
            ("a", 1, json!({}), vec!["b"]),
            ("b", 1, json!({}), vec!["c"]),
            ("c", 1, json!({}), vec!["a"]),
        ]);
        let hosts = vec![host("h", json!({}), vec![group(&groups, "a")])];

        let mut store = store();
        scrape_hosts(&mut store, &hosts, "all").unwrap();

        let a = id(&store, VertexLabel::Group, "a");
        let c = id(&store, VertexLabel::Group, "c");
        assert_eq!(store.vertices_with_label("GROUP").count(), 3);
        assert!(store.has_edge(c, "HAS-CHILD-GROUP", a));
        assert_eq!(store.edge_count(), 4);
    }

    #[test]
    fn test_self_referencing_group() {
        let groups = table(vec![("loop", 1, json!({}), vec!["loop"])]);
        let hosts = vec![host("h", json!({}), vec![group(&groups, "loop")])];

        let mut store = store();
        scrape_hosts(&mut store, &hosts, "all").unwrap();

        let looped = id(&store, VertexLabel::Group, "loop");
        assert!(store.has_edge(looped, "HAS-CHILD-GROUP", looped));
    }

    #[test]
    fn test_diamond_hierarchy_links_both_parents() {
        let groups = table(vec![
            ("top", 1, json!({}), vec!["left", "right"]),
            ("left", 1, json!({}), vec!["leaf"]),
            ("right", 1, json!({}), vec!["leaf"]),
            ("leaf", 1, json!({}), vec![]),
        ]);
        let hosts = vec![host("h", json!({}), vec![group(&groups, "top")])];

        let mut store = store();
        scrape_hosts(&mut store, &hosts, "all").unwrap();

        let leaf = id(&store, VertexLabel::Group, "leaf");
        assert_eq!(store.in_edges(leaf).len(), 2);
        assert_eq!(store.vertices_with_label("GROUP").count(), 4);
    }

    #[test]
    fn test_group_priority_overrides_priority_variable() {
        let groups = table(vec![("g", 7, json!({"priority": "high"}), vec![])]);
        let hosts = vec![host("h", json!({}), vec![group(&groups, "g")])];

        let mut store = store();
        scrape_hosts(&mut store, &hosts, "all").unwrap();
        let g = store.find_vertex("GROUP", "g").unwrap();
        assert_eq!(g.attr("priority"), Some(&json!(7)));
    }

    #[test]
    fn test_deploy_playbook_scenario() {
        let playbook = TestPlaybook(vec![TestPlay {
            name: "deploy".to_string(),
            blocks: vec![vec![
                TestTask("install".to_string(), AttrMap::new()),
                TestTask("configure".to_string(), AttrMap::new()),
            ]],
        }]);

        let mut store = store();
        assert_eq!(scrape_playbook(&mut store, &playbook).unwrap(), 1);

        let deploy = id(&store, VertexLabel::Play, "deploy");
        let install = id(&store, VertexLabel::Task, "install");
        let configure = id(&store, VertexLabel::Task, "configure");
        assert!(store.has_edge(deploy, "HAS-TASK", install));
        assert!(store.has_edge(deploy, "HAS-TASK", configure));
        assert_eq!(store.out_edges(deploy).len(), 2);
    }

    #[test]
    fn test_same_task_name_across_plays_collapses() {
        let mut first = AttrMap::new();
        first.insert("retries".to_string(), json!(1));
        let mut second = AttrMap::new();
        second.insert("retries".to_string(), json!(5));

        let playbook = TestPlaybook(vec![
            TestPlay {
                name: "web".to_string(),
                blocks: vec![vec![TestTask("restart".to_string(), first)]],
            },
            TestPlay {
                name: "db".to_string(),
                blocks: vec![vec![TestTask("restart".to_string(), second)]],
            },
        ]);

        let mut store = store();
        scrape_playbook(&mut store, &playbook).unwrap();

        let restart = store.find_vertex("TASK", "restart").unwrap();
        assert_eq!(restart.attr("retries"), Some(&json!(5)));
        assert_eq!(store.in_edges(restart.id).len(), 2);
        assert_eq!(store.vertices_with_label("TASK").count(), 1);
    }
}
