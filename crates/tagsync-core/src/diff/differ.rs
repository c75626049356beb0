//! Structural diff between two trees

use std::collections::BTreeMap;

use tagsync_tree::{ConfigNode, OrderPolicy, Placement, TagPath, content_eq, tree_eq};
use tracing::{debug, trace};

use super::{ChangeRecord, DiffOptions, Operation};

/// Change set that turns `destination` into `source`.
///
/// Both trees are compared from their roots; the roots' own names are not
/// part of any path. The result is deterministic for equal inputs and
/// neither tree is modified.
///
/// Ordering: a parent's Add precedes its children's, a child's Remove
/// precedes its parent's. When a node changes to a kind that cannot hold
/// children, the Removes of its children precede its Modify; otherwise
/// the Modify precedes any child changes. Moves sit where their Add would
/// have been, and Removes that would empty out a Move's origin wait until
/// after that Move.
pub fn diff(source: &ConfigNode, destination: &ConfigNode, options: &DiffOptions) -> Vec<ChangeRecord> {
    let mut records = Vec::new();
    compare(source, destination, &TagPath::root(), options.order, &mut records);

    if options.detect_moves {
        records = detect_moves(records, source, destination, options.order);
    }

    debug!(
        changes = records.len(),
        moves = records.iter().filter(|r| r.operation == Operation::Move).count(),
        "Computed change set"
    );
    records
}

fn compare(
    source: &ConfigNode,
    destination: &ConfigNode,
    path: &TagPath,
    order: OrderPolicy,
    out: &mut Vec<ChangeRecord>,
) {
    if content_eq(source, destination, order) {
        compare_children(source, destination, path, order, out);
        return;
    }

    trace!(path = %path, "Node content differs");
    let record = ChangeRecord::modify(path.clone(), destination.shallow(), source.shallow());
    if source.kind().can_hold_children() {
        out.push(record);
        compare_children(source, destination, path, order, out);
    } else {
        compare_children(source, destination, path, order, out);
        out.push(record);
    }
}

fn compare_children(
    source: &ConfigNode,
    destination: &ConfigNode,
    path: &TagPath,
    order: OrderPolicy,
    out: &mut Vec<ChangeRecord>,
) {
    let mut previous = None;
    for child in source.children() {
        let child_path = path.child(child.name());
        match destination.child(child.name()) {
            Some(existing) => compare(child, existing, &child_path, order, out),
            None => push_added(child, child_path, Placement::following(previous), out),
        }
        previous = Some(child.name());
    }
    for child in destination
        .children()
        .filter(|c| source.child(c.name()).is_none())
    {
        push_removed(child, path.child(child.name()), out);
    }
}

fn push_added(node: &ConfigNode, path: TagPath, placement: Placement, out: &mut Vec<ChangeRecord>) {
    out.push(ChangeRecord::add(path.clone(), node.shallow()).with_placement(placement));
    for child in node.children() {
        push_added(child, path.child(child.name()), Placement::Last, out);
    }
}

fn push_removed(node: &ConfigNode, path: TagPath, out: &mut Vec<ChangeRecord>) {
    for child in node.children() {
        push_removed(child, path.child(child.name()), out);
    }
    out.push(ChangeRecord::remove(path, node.shallow()));
}

fn overlaps(a: &TagPath, b: &TagPath) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// Collapse Add/Remove subtree pairs with equal content into Moves.
fn detect_moves(
    records: Vec<ChangeRecord>,
    source: &ConfigNode,
    destination: &ConfigNode,
    order: OrderPolicy,
) -> Vec<ChangeRecord> {
    let candidates: Vec<(&TagPath, &ConfigNode, usize)> = records
        .iter()
        .filter(|r| r.operation == Operation::Remove)
        .filter_map(|r| {
            destination
                .get(&r.path)
                .map(|node| (&r.path, node, node.node_count()))
        })
        .collect();
    if candidates.is_empty() {
        return records;
    }

    let mut origins: Vec<TagPath> = Vec::new();
    let mut moves: BTreeMap<TagPath, ChangeRecord> = BTreeMap::new();

    for add in records.iter().filter(|r| r.operation == Operation::Add) {
        if moves.keys().any(|target| target.is_ancestor_of(&add.path)) {
            continue;
        }
        let Some(subtree) = source.get(&add.path) else {
            continue;
        };
        let size = subtree.node_count();

        let best = candidates
            .iter()
            .filter(|(origin, _, _)| !origins.iter().any(|taken| overlaps(taken, origin)))
            .filter(|(_, node, count)| {
                *count == size && node.kind() == subtree.kind() && tree_eq(subtree, node, order)
            })
            .max_by(|(a, _, _), (b, _, _)| {
                add.path
                    .common_suffix_len(a)
                    .cmp(&add.path.common_suffix_len(b))
                    .then_with(|| b.to_string().cmp(&a.to_string()))
            });

        if let Some((origin, node, _)) = best {
            trace!(from = %origin, to = %add.path, "Matched moved subtree");
            origins.push((*origin).clone());
            moves.insert(
                add.path.clone(),
                ChangeRecord::relocate(
                    (*origin).clone(),
                    add.path.clone(),
                    (*node).clone(),
                    subtree.clone(),
                )
                .with_placement(add.placement.clone()),
            );
        }
    }

    if moves.is_empty() {
        return records;
    }

    let targets: Vec<TagPath> = moves.keys().cloned().collect();
    let mut collapsed = Vec::with_capacity(records.len());
    for record in records {
        match record.operation {
            Operation::Add => {
                if let Some(moved) = moves.remove(&record.path) {
                    collapsed.push(moved);
                } else if !targets.iter().any(|t| t.is_ancestor_of(&record.path)) {
                    collapsed.push(record);
                }
            }
            Operation::Remove if origins.iter().any(|o| record.path.starts_with(o)) => {}
            _ => collapsed.push(record),
        }
    }
    defer_teardown(collapsed)
}

/// Hold back Removes and emptying Modifies above a Move origin until that
/// Move has taken the subtree out.
fn defer_teardown(records: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
    let anchors: Vec<Option<usize>> = records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            if !record.is_teardown() {
                return None;
            }
            records
                .iter()
                .enumerate()
                .skip(i + 1)
                .filter(|(_, m)| {
                    m.operation == Operation::Move
                        && m.origin.as_ref().is_some_and(|o| record.path.is_ancestor_of(o))
                })
                .map(|(j, _)| j)
                .last()
        })
        .collect();

    let mut deferred: BTreeMap<usize, Vec<ChangeRecord>> = BTreeMap::new();
    let mut ordered = Vec::with_capacity(records.len());
    for (i, record) in records.into_iter().enumerate() {
        if let Some(anchor) = anchors[i] {
            deferred.entry(anchor).or_default().push(record);
            continue;
        }
        ordered.push(record);
        if let Some(batch) = deferred.remove(&i) {
            ordered.extend(batch);
        }
    }
    ordered
}
