mod discovery;
mod forest;
mod model;
mod notify;
mod progression;
mod search;
mod state;

pub use discovery::{Visibility, is_unlocked, resolve_discovered, visibility};
pub use forest::{Forest, ForestEntry, OrphanRef, build_forest};
pub use model::{
    Badge, Ctf, DiscoveredSet, Exercise, Link, LinkKey, Node, NodeType, Snapshot, Streak,
    UnlockedMap,
};
pub use notify::{NotificationItem, NotificationQueue, ShownAck};
pub use progression::{
    AbilityScore, LevelTable, MAX_LEVEL_COUNT, Progression, ability_scores, earned_xp,
    percent_label,
};
pub use search::search_nodes;
pub use state::{
    AppState, DerivedView, Event, MainProgress, Mutation, PendingToggle, Rules, reduce,
};
