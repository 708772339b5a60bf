//! Pure aggregation over a snapshot of members and positions.
//!
//! Nothing here performs I/O or logs. Dangling references (a position or
//! parent that does not resolve) drop out of the projections instead of
//! failing.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use super::model::{
    Descendant, GenerationSummary, Member, MemberBrief, MemberGroup, MemberTreeNode, Position,
};

/// Maximum distance from a tree root that descendant discovery follows.
pub const MAX_TREE_DEPTH: u32 = 10;

/// Distinct generations ascending, with the latest as current.
pub fn summarize_generations<I>(values: I) -> GenerationSummary
where
    I: IntoIterator<Item = i32>,
{
    let generations: Vec<i32> = values.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    GenerationSummary {
        current_generation: generations.last().copied(),
        generations,
    }
}

pub fn discover_generations(members: &[Member]) -> GenerationSummary {
    summarize_generations(members.iter().filter(|m| m.is_active()).map(|m| m.generation))
}

/// Groups the active members of `generation` by position, ordered by the
/// English position level. Member order inside a group follows `members`.
pub fn group_by_position(members: &[Member], positions: &[Position], generation: i32) -> Vec<MemberGroup> {
    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, Vec<MemberBrief>> = HashMap::new();

    for member in members.iter().filter(|m| m.is_active() && m.generation == generation) {
        let bucket = grouped.entry(member.position.as_str()).or_insert_with(|| {
            order.push(member.position.as_str());
            Vec::new()
        });
        bucket.push(MemberBrief::from(member));
    }

    let by_id: HashMap<&str, &Position> = positions.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut groups: Vec<MemberGroup> = order
        .into_iter()
        .filter_map(|position_id| {
            let position = by_id.get(position_id)?;
            Some(MemberGroup {
                position: (*position).clone(),
                members: grouped.remove(position_id).unwrap_or_default(),
            })
        })
        .collect();

    groups.sort_by(|a, b| {
        a.position
            .en
            .level
            .cmp(&b.position.en.level)
            .then_with(|| a.position.id.cmp(&b.position.id))
    });
    groups
}

/// Rebuilds the member forest.
///
/// With no `root_id` the roots are the active members without a parent;
/// otherwise they are the active children of `root_id`, which must itself be
/// an active member. Each root carries every active member reachable through
/// child links within [`MAX_TREE_DEPTH`] hops. Deleted members are neither
/// emitted nor walked through.
pub fn build_member_tree(members: &[Member], positions: &[Position], root_id: Option<&str>) -> Vec<MemberTreeNode> {
    let active: Vec<&Member> = members.iter().filter(|m| m.is_active()).collect();

    if let Some(root_id) = root_id {
        if !active.iter().any(|m| m.id == root_id) {
            return Vec::new();
        }
    }

    let mut children: HashMap<&str, Vec<&Member>> = HashMap::new();
    for &member in &active {
        if let Some(parent) = member.parent.as_deref() {
            children.entry(parent).or_default().push(member);
        }
    }

    let position_titles: HashMap<&str, &str> = positions
        .iter()
        .map(|p| (p.id.as_str(), p.en.title.as_str()))
        .collect();

    let mut roots: Vec<&Member> = active
        .iter()
        .copied()
        .filter(|m| m.parent.as_deref() == root_id)
        .collect();
    roots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    roots
        .into_iter()
        .map(|root| MemberTreeNode {
            id: root.id.clone(),
            name: root.en.name.clone(),
            position: position_titles.get(root.position.as_str()).map(|t| t.to_string()),
            generation: root.generation,
            created_at: root.created_at,
            updated_at: root.updated_at,
            descendants: collect_descendants(root, &children),
        })
        .collect()
}

fn collect_descendants(root: &Member, children: &HashMap<&str, Vec<&Member>>) -> Vec<Descendant> {
    let mut visited: HashSet<&str> = HashSet::from([root.id.as_str()]);
    let mut queue: VecDeque<(&str, u32)> = VecDeque::from([(root.id.as_str(), 0)]);
    let mut found: Vec<(&Member, u32)> = Vec::new();

    while let Some((id, depth)) = queue.pop_front() {
        if depth >= MAX_TREE_DEPTH {
            continue;
        }
        for &child in children.get(id).into_iter().flatten() {
            if visited.insert(child.id.as_str()) {
                found.push((child, depth + 1));
                queue.push_back((child.id.as_str(), depth + 1));
            }
        }
    }

    found.sort_by(|(a, la), (b, lb)| {
        la.cmp(lb)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    found
        .into_iter()
        .map(|(member, level)| Descendant {
            member: member.clone(),
            level,
        })
        .collect()
}
