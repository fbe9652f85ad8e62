mod badges;
mod rules;
mod store;
mod streak;

pub use badges::{Achievements, BadgeDefinition};
pub use rules::{apply_percents, graph_links, node_percent, resolve_unlocked};
pub use store::{CtfDefinition, EarnedBadge, LocalBackend, Progress, RoadmapDefinition};
pub use streak::StreakRecord;
