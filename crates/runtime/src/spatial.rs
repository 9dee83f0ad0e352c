//! Uniform-grid spatial index.
//!
//! [`SpatialGrid`] snapshots entity positions once per tick and answers the
//! core's [`SpatialQuery`] capability from that snapshot. Queries only visit
//! cells that overlap the shape's reach and always report matches in
//! ascending handle order, so results do not depend on bucket layout.

use std::cell::RefCell;

use ability_core::env::{QueryReport, QueryShape, SpatialQuery, TargetList, push_match};
use ability_core::state::{EntityHandle, Vec2, World};

#[derive(Clone, Copy, Debug, PartialEq)]
struct Entry {
    handle: EntityHandle,
    position: Vec2,
}

#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    /// Live entities in ascending handle order.
    entries: Vec<Entry>,
    /// `(cell key, entry index)`, sorted.
    cells: Vec<(u64, u32)>,
    /// Entry index per world slot, `u32::MAX` when absent.
    by_slot: Vec<u32>,
    scratch: RefCell<Vec<u32>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        Self {
            cell_size,
            entries: Vec::new(),
            cells: Vec::new(),
            by_slot: Vec::new(),
            scratch: RefCell::new(Vec::new()),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces the snapshot with the world's current positions.
    ///
    /// Buffers keep their capacity, so a stable population rebuilds without
    /// allocating.
    pub fn rebuild(&mut self, world: &World) {
        self.entries.clear();
        self.cells.clear();
        self.by_slot.clear();
        self.by_slot.resize(world.slot_count(), u32::MAX);

        for handle in world.handles() {
            let Some(position) = world.position(handle) else {
                continue;
            };
            let index = self.entries.len() as u32;
            self.entries.push(Entry { handle, position });
            self.by_slot[handle.index() as usize] = index;
            let (cx, cy) = self.cell_of(position);
            self.cells.push((cell_key(cx, cy), index));
        }
        self.cells.sort_unstable();

        let mut scratch = self.scratch.borrow_mut();
        scratch.clear();
        scratch.reserve(self.entries.len());
    }

    fn cell_of(&self, point: Vec2) -> (i32, i32) {
        (
            (point.x / self.cell_size).floor() as i32,
            (point.y / self.cell_size).floor() as i32,
        )
    }

    fn scan_all(&self, shape: &QueryShape, out: &mut TargetList, report: &mut QueryReport) {
        for entry in &self.entries {
            if shape.contains(entry.position) {
                push_match(out, entry.handle, report);
            }
        }
    }
}

impl SpatialQuery for SpatialGrid {
    fn position(&self, entity: EntityHandle) -> Option<Vec2> {
        let index = *self.by_slot.get(entity.index() as usize)?;
        let entry = self.entries.get(index as usize)?;
        (entry.handle == entity).then_some(entry.position)
    }

    fn query(&self, shape: &QueryShape, out: &mut TargetList) -> QueryReport {
        out.clear();
        let mut report = QueryReport::default();
        let origin = shape.origin();
        let reach = shape.reach();
        if !reach.is_finite() {
            self.scan_all(shape, out, &mut report);
            return report;
        }

        let (x0, y0) = self.cell_of(Vec2::new(origin.x - reach, origin.y - reach));
        let (x1, y1) = self.cell_of(Vec2::new(origin.x + reach, origin.y + reach));
        let span = (x1 as i64 - x0 as i64 + 1) * (y1 as i64 - y0 as i64 + 1);
        // Past this many cells a linear scan touches less memory.
        if span > self.entries.len() as i64 {
            self.scan_all(shape, out, &mut report);
            return report;
        }

        let mut scratch = self.scratch.borrow_mut();
        scratch.clear();
        for cx in x0..=x1 {
            let lo = cell_key(cx, y0);
            let hi = cell_key(cx, y1);
            let start = self.cells.partition_point(|&(key, _)| key < lo);
            for &(key, index) in &self.cells[start..] {
                if key > hi {
                    break;
                }
                if shape.contains(self.entries[index as usize].position) {
                    scratch.push(index);
                }
            }
        }
        // Entry indices follow handle order.
        scratch.sort_unstable();
        for &index in scratch.iter() {
            push_match(out, self.entries[index as usize].handle, &mut report);
        }
        report
    }
}

/// Order-preserving key: column-major, rows ascending within a column.
fn cell_key(cx: i32, cy: i32) -> u64 {
    let x = (cx as i64 - i32::MIN as i64) as u64;
    let y = (cy as i64 - i32::MIN as i64) as u64;
    (x << 32) | y
}

#[cfg(test)]
mod tests {
    use super::*;
    use ability_core::config::CoreConfig;

    fn scattered_world() -> (World, Vec<EntityHandle>) {
        let mut world = World::new();
        let mut handles = Vec::new();
        for y in -5..5 {
            for x in -5..5 {
                handles.push(world.spawn_at(Vec2::new(x as f32 * 1.5, y as f32 * 1.5)));
            }
        }
        (world, handles)
    }

    /// Reference answer by brute force over the world.
    fn brute_force(world: &World, shape: &QueryShape) -> Vec<EntityHandle> {
        world
            .handles()
            .filter(|&handle| world.position(handle).is_some_and(|p| shape.contains(p)))
            .collect()
    }

    #[test]
    fn every_shape_matches_a_brute_force_scan() {
        let (world, _) = scattered_world();
        let mut grid = SpatialGrid::new(2.0);
        grid.rebuild(&world);
        let shapes = [
            QueryShape::Radius {
                origin: Vec2::new(0.5, -0.5),
                radius: 3.0,
            },
            QueryShape::Cone {
                origin: Vec2::ZERO,
                direction: 1.0,
                half_angle: 0.6,
                radius: 6.0,
            },
            QueryShape::Rect {
                center: Vec2::new(-2.0, 1.0),
                half_extents: Vec2::new(2.5, 1.0),
            },
            QueryShape::Line {
                origin: Vec2::new(-6.0, 0.0),
                direction: 0.0,
                length: 10.0,
                half_width: 0.8,
            },
            QueryShape::HexRange {
                origin: Vec2::ZERO,
                cell_size: 1.5,
                radius: 2,
            },
            QueryShape::HexRing {
                origin: Vec2::ZERO,
                cell_size: 1.5,
                radius: 2,
            },
        ];

        for shape in shapes {
            let mut out = TargetList::new();
            let report = grid.query(&shape, &mut out);
            let expected = brute_force(&world, &shape);
            let kept = expected.len().min(CoreConfig::TARGET_LIST_CAPACITY);
            assert_eq!(out.as_slice(), &expected[..kept], "{shape:?}");
            assert_eq!(report.found as usize, kept);
            assert_eq!(report.dropped as usize, expected.len() - kept);
        }
    }

    #[test]
    fn overflow_keeps_the_lowest_handles() {
        let (world, handles) = scattered_world();
        let mut grid = SpatialGrid::new(1.0);
        grid.rebuild(&world);
        let mut out = TargetList::new();

        let report = grid.query(
            &QueryShape::Radius {
                origin: Vec2::ZERO,
                radius: 100.0,
            },
            &mut out,
        );

        assert_eq!(report.found as usize, CoreConfig::TARGET_LIST_CAPACITY);
        assert_eq!(
            report.dropped as usize,
            handles.len() - CoreConfig::TARGET_LIST_CAPACITY
        );
        assert_eq!(out.as_slice(), &handles[..CoreConfig::TARGET_LIST_CAPACITY]);
    }

    #[test]
    fn stale_handles_have_no_position() {
        let mut world = World::new();
        let gone = world.spawn_at(Vec2::new(1.0, 1.0));
        world.despawn(gone);
        let reused = world.spawn_at(Vec2::new(2.0, 2.0));
        let mut grid = SpatialGrid::new(4.0);
        grid.rebuild(&world);

        assert_eq!(grid.position(gone), None);
        assert_eq!(grid.position(reused), Some(Vec2::new(2.0, 2.0)));
    }

    #[test]
    fn snapshot_ignores_moves_until_rebuilt() {
        let mut world = World::new();
        let mover = world.spawn_at(Vec2::ZERO);
        let mut grid = SpatialGrid::new(4.0);
        grid.rebuild(&world);

        world.set_position(mover, Vec2::new(40.0, 0.0));
        assert_eq!(grid.position(mover), Some(Vec2::ZERO));

        grid.rebuild(&world);
        assert_eq!(grid.position(mover), Some(Vec2::new(40.0, 0.0)));
    }
}
