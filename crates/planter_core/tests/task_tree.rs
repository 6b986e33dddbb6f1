use planter_core::{
    build_hierarchy, build_tree, flatten_tree, separate_by_origin, Task, TaskNode, TaskOrigin,
};
use uuid::Uuid;

fn id(value: u128) -> Uuid {
    Uuid::from_u128(value)
}

fn task(task_id: u128, parent: Option<u128>, root: u128, position: Option<f64>) -> Task {
    Task {
        id: id(task_id),
        title: format!("task-{task_id}"),
        parent_task_id: parent.map(id),
        root_id: id(root),
        position,
        origin: TaskOrigin::Instance,
        start_date: None,
        due_date: None,
    }
}

fn ids(nodes: &[TaskNode]) -> Vec<Uuid> {
    nodes.iter().map(|node| node.task.id).collect()
}

#[test]
fn empty_input_yields_empty_output() {
    assert!(build_tree(&[], id(1)).is_empty());
    assert!(build_hierarchy(&[]).is_empty());
    let forests = separate_by_origin(&[]);
    assert!(forests.instance_tasks.is_empty());
    assert!(forests.template_tasks.is_empty());
}

#[test]
fn build_tree_nests_descendants_and_excludes_root() {
    let tasks = vec![
        task(1, None, 1, Some(10_000.0)),
        task(2, Some(1), 1, Some(20_000.0)),
        task(3, Some(1), 1, Some(10_000.0)),
        task(4, Some(3), 1, None),
    ];

    let tree = build_tree(&tasks, id(1));
    assert_eq!(ids(&tree), vec![id(3), id(2)]);
    assert_eq!(ids(&tree[0].children), vec![id(4)]);
    assert!(tree[1].children.is_empty());
}

#[test]
fn build_tree_excludes_unreachable_tasks() {
    let tasks = vec![
        task(1, None, 1, Some(10_000.0)),
        task(2, Some(1), 1, Some(10_000.0)),
        task(10, None, 10, Some(20_000.0)),
        task(11, Some(10), 10, Some(10_000.0)),
        task(12, Some(99), 1, Some(10_000.0)),
    ];

    let tree = build_tree(&tasks, id(1));
    assert_eq!(ids(&tree), vec![id(2)]);

    let subtree = build_tree(&tasks, id(2));
    assert!(subtree.is_empty());
}

#[test]
fn siblings_sort_by_position_with_missing_as_zero_and_stable_ties() {
    let tasks = vec![
        task(1, None, 1, None),
        task(2, Some(1), 1, Some(5.0)),
        task(3, Some(1), 1, None),
        task(4, Some(1), 1, Some(0.0)),
        task(5, Some(1), 1, Some(-1.0)),
        task(6, Some(1), 1, Some(5.0)),
    ];

    let tree = build_tree(&tasks, id(1));
    assert_eq!(ids(&tree), vec![id(5), id(3), id(4), id(2), id(6)]);
}

#[test]
fn build_hierarchy_promotes_orphans_to_roots() {
    let tasks = vec![
        task(1, None, 1, Some(20_000.0)),
        task(2, Some(1), 1, Some(10_000.0)),
        task(3, Some(404), 1, Some(10_000.0)),
        task(4, None, 4, Some(30_000.0)),
    ];

    let forest = build_hierarchy(&tasks);
    assert_eq!(ids(&forest), vec![id(3), id(1), id(4)]);
    assert_eq!(ids(&forest[1].children), vec![id(2)]);
    assert!(forest[0].children.is_empty());
}

#[test]
fn build_hierarchy_sorts_every_level() {
    let tasks = vec![
        task(1, None, 1, Some(10_000.0)),
        task(2, Some(1), 1, Some(20_000.0)),
        task(3, Some(1), 1, Some(10_000.0)),
        task(4, Some(2), 1, Some(30_000.0)),
        task(5, Some(2), 1, Some(15_000.0)),
    ];

    let forest = build_hierarchy(&tasks);
    assert_eq!(forest.len(), 1);
    assert_eq!(ids(&forest[0].children), vec![id(3), id(2)]);
    assert_eq!(ids(&forest[0].children[1].children), vec![id(5), id(4)]);
    assert_eq!(forest[0].descendant_count(), 4);
}

#[test]
fn separate_by_origin_never_nests_across_origins() {
    let mut template_root = task(10, None, 10, Some(10_000.0));
    template_root.origin = TaskOrigin::Template;
    let mut template_child = task(11, Some(10), 10, Some(10_000.0));
    template_child.origin = TaskOrigin::Template;
    let mut stray = task(12, Some(1), 1, Some(20_000.0));
    stray.origin = TaskOrigin::Template;

    let tasks = vec![
        task(1, None, 1, Some(10_000.0)),
        task(2, Some(1), 1, Some(10_000.0)),
        template_root,
        template_child,
        stray,
    ];

    let forests = separate_by_origin(&tasks);
    assert_eq!(ids(&forests.instance_tasks), vec![id(1)]);
    assert_eq!(ids(&forests.instance_tasks[0].children), vec![id(2)]);

    assert_eq!(ids(&forests.template_tasks), vec![id(10), id(12)]);
    assert_eq!(ids(&forests.template_tasks[0].children), vec![id(11)]);
    assert!(forests.template_tasks[1].children.is_empty());
}

#[test]
fn flatten_tree_returns_preorder_records() {
    let tasks = vec![
        task(1, None, 1, Some(10_000.0)),
        task(2, Some(1), 1, Some(20_000.0)),
        task(3, Some(1), 1, Some(10_000.0)),
        task(4, Some(3), 1, Some(10_000.0)),
    ];

    let flat = flatten_tree(&build_hierarchy(&tasks));
    let flat_ids: Vec<Uuid> = flat.iter().map(|task| task.id).collect();
    assert_eq!(flat_ids, vec![id(1), id(3), id(4), id(2)]);
    assert_eq!(flat[2], tasks[3]);
}

#[test]
fn task_node_serializes_task_fields_inline() {
    let tasks = vec![task(1, None, 1, Some(10_000.0)), task(2, Some(1), 1, None)];
    let forest = build_hierarchy(&tasks);

    let json = serde_json::to_value(&forest[0]).unwrap();
    assert_eq!(json["id"], id(1).to_string());
    assert_eq!(json["origin"], "instance");
    assert_eq!(json["children"][0]["id"], id(2).to_string());
    assert_eq!(json["children"][0]["parent_task_id"], id(1).to_string());
    assert!(json["children"][0]["children"].as_array().unwrap().is_empty());
}
