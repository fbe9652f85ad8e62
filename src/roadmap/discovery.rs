use super::model::{DiscoveredSet, Link, UnlockedMap};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Unlocked,
    Silhouette,
    Hidden,
}

pub fn is_unlocked(unlocked: &UnlockedMap, id: &str, start_id: &str) -> bool {
    id == start_id || unlocked.get(id).copied().unwrap_or(false)
}

pub fn resolve_discovered(unlocked: &UnlockedMap, links: &[Link], start_id: &str) -> DiscoveredSet {
    let mut discovered = unlocked
        .iter()
        .filter(|(_, is_open)| **is_open)
        .map(|(id, _)| id.clone())
        .collect::<DiscoveredSet>();
    discovered.insert(start_id.to_owned());

    for link in links {
        if is_unlocked(unlocked, &link.source, start_id)
            || is_unlocked(unlocked, &link.target, start_id)
        {
            discovered.insert(link.source.clone());
            discovered.insert(link.target.clone());
        }
    }

    discovered
}

pub fn visibility(
    unlocked: &UnlockedMap,
    discovered: &DiscoveredSet,
    id: &str,
    start_id: &str,
) -> Visibility {
    if is_unlocked(unlocked, id, start_id) {
        Visibility::Unlocked
    } else if discovered.contains(id) {
        Visibility::Silhouette
    } else {
        Visibility::Hidden
    }
}
