//! Shared fixtures for unit tests.

use crate::env::{QueryReport, QueryShape, SpatialQuery, TargetList, push_match};
use crate::state::{EntityHandle, Vec2, World};

/// Brute-force spatial capability over a position snapshot.
#[derive(Clone, Debug, Default)]
pub struct Positions {
    entries: Vec<(EntityHandle, Vec2)>,
}

impl Positions {
    pub fn capture(world: &World) -> Self {
        let entries = world
            .handles()
            .filter_map(|handle| world.position(handle).map(|position| (handle, position)))
            .collect();
        Self { entries }
    }
}

impl SpatialQuery for Positions {
    fn position(&self, entity: EntityHandle) -> Option<Vec2> {
        self.entries
            .iter()
            .find(|(handle, _)| *handle == entity)
            .map(|(_, position)| *position)
    }

    fn query(&self, shape: &QueryShape, out: &mut TargetList) -> QueryReport {
        out.clear();
        let mut report = QueryReport::default();
        for (handle, position) in &self.entries {
            if shape.contains(*position) {
                push_match(out, *handle, &mut report);
            }
        }
        report
    }
}

/// World with `count` entities spaced one unit apart along +x.
pub fn row_world(count: usize) -> (World, Vec<EntityHandle>) {
    let mut world = World::new();
    let handles = (0..count)
        .map(|i| world.spawn_at(Vec2::new(i as f32, 0.0)))
        .collect();
    (world, handles)
}
