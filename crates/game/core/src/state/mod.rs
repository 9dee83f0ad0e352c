//! Entity state owned by the ability core.
//!
//! [`World`] is the authoritative store: attributes, tags, blackboards,
//! active effects and response-chain listeners all hang off generational
//! [`EntityHandle`]s. Every other module reads and writes entities through
//! it, and [`dirty`] diffs what changed once per tick.
mod attributes;
mod blackboard;
pub mod dirty;
mod ids;
mod tags;
mod world;

pub use attributes::{AttributeSet, AttributeValue};
pub use blackboard::{Blackboard, BlackboardValue};
pub use dirty::{ChangeReport, DirtyFlags, EntitySnapshot, collect_changes, mark_clean};
pub use ids::{
    AttributeId, BlackboardKey, BuiltinId, DenseId, EffectInstanceId, EntityHandle, EventTag,
    ParamKey, PlayerId, PresetType, ProgramId, RootId, TagId, TemplateId, Vec2,
};
pub use tags::{Propagation, TagContainer, TagCount, TagRule, TagRuleTable, TagSense};
pub use world::{AttributeStore, EntityRecord, TagStore, World};
