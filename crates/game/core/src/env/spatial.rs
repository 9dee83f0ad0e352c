use arrayvec::ArrayVec;

use crate::config::CoreConfig;
use crate::state::{EntityHandle, Vec2};

/// Entity buffer filled by spatial queries and held in target registers.
pub type TargetList = ArrayVec<EntityHandle, { CoreConfig::TARGET_LIST_CAPACITY }>;

/// Area a spatial query covers. Angles are radians, 0 = +x, counter-clockwise.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueryShape {
    Radius {
        origin: Vec2,
        radius: f32,
    },
    Cone {
        origin: Vec2,
        direction: f32,
        half_angle: f32,
        radius: f32,
    },
    /// Axis-aligned rectangle.
    Rect {
        center: Vec2,
        half_extents: Vec2,
    },
    Line {
        origin: Vec2,
        direction: f32,
        length: f32,
        half_width: f32,
    },
    /// Every hex cell within `radius` steps of the origin's cell.
    HexRange {
        origin: Vec2,
        cell_size: f32,
        radius: u32,
    },
    /// Hex cells exactly `radius` steps from the origin's cell.
    HexRing {
        origin: Vec2,
        cell_size: f32,
        radius: u32,
    },
}

impl QueryShape {
    pub fn origin(&self) -> Vec2 {
        match *self {
            QueryShape::Radius { origin, .. }
            | QueryShape::Cone { origin, .. }
            | QueryShape::Line { origin, .. }
            | QueryShape::HexRange { origin, .. }
            | QueryShape::HexRing { origin, .. } => origin,
            QueryShape::Rect { center, .. } => center,
        }
    }

    /// Distance from [`origin`](Self::origin) beyond which nothing matches.
    pub fn reach(&self) -> f32 {
        match *self {
            QueryShape::Radius { radius, .. } | QueryShape::Cone { radius, .. } => radius,
            QueryShape::Rect { half_extents, .. } => {
                (half_extents.x * half_extents.x + half_extents.y * half_extents.y).sqrt()
            }
            QueryShape::Line {
                length, half_width, ..
            } => (length * length + half_width * half_width).sqrt(),
            QueryShape::HexRange {
                cell_size, radius, ..
            }
            | QueryShape::HexRing {
                cell_size, radius, ..
            } => cell_size * 2.0 * (radius as f32 + 1.0),
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        match *self {
            QueryShape::Radius { origin, radius } => {
                point.distance_squared(origin) <= radius * radius
            }
            QueryShape::Cone {
                origin,
                direction,
                half_angle,
                radius,
            } => {
                let offset = point.sub(origin);
                let distance_squared = offset.dot(offset);
                if distance_squared > radius * radius {
                    return false;
                }
                if distance_squared == 0.0 {
                    return true;
                }
                let cos = offset.dot(Vec2::from_angle(direction)) / distance_squared.sqrt();
                cos >= half_angle.cos()
            }
            QueryShape::Rect {
                center,
                half_extents,
            } => {
                (point.x - center.x).abs() <= half_extents.x
                    && (point.y - center.y).abs() <= half_extents.y
            }
            QueryShape::Line {
                origin,
                direction,
                length,
                half_width,
            } => {
                let axis = Vec2::from_angle(direction);
                let offset = point.sub(origin);
                let along = offset.dot(axis);
                let across = offset.dot(Vec2::new(-axis.y, axis.x));
                (0.0..=length).contains(&along) && across.abs() <= half_width
            }
            QueryShape::HexRange {
                origin,
                cell_size,
                radius,
            } => hex_distance(hex_cell(origin, cell_size), hex_cell(point, cell_size)) <= radius,
            QueryShape::HexRing {
                origin,
                cell_size,
                radius,
            } => hex_distance(hex_cell(origin, cell_size), hex_cell(point, cell_size)) == radius,
        }
    }
}

/// Axial coordinates of the pointy-top hex cell containing `point`.
pub fn hex_cell(point: Vec2, cell_size: f32) -> (i32, i32) {
    let size = if cell_size > 0.0 { cell_size } else { 1.0 };
    let q = (3f32.sqrt() / 3.0 * point.x - point.y / 3.0) / size;
    let r = (2.0 / 3.0 * point.y) / size;
    let s = -q - r;

    let (mut rq, mut rr, rs) = (q.round(), r.round(), s.round());
    let (dq, dr, ds) = ((rq - q).abs(), (rr - r).abs(), (rs - s).abs());
    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    (rq as i32, rr as i32)
}

pub fn hex_distance(a: (i32, i32), b: (i32, i32)) -> u32 {
    let dq = a.0 - b.0;
    let dr = a.1 - b.1;
    let ds = -dq - dr;
    dq.unsigned_abs().max(dr.unsigned_abs()).max(ds.unsigned_abs())
}

/// Result counts of one query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryReport {
    /// Matches written to the output buffer.
    pub found: u32,
    /// Matches that did not fit.
    pub dropped: u32,
}

/// Spatial capability implemented outside the core.
pub trait SpatialQuery {
    fn position(&self, entity: EntityHandle) -> Option<Vec2>;

    /// Clears `out` and fills it with matches in ascending handle order.
    fn query(&self, shape: &QueryShape, out: &mut TargetList) -> QueryReport;
}

/// Pushes `entity`, counting it as dropped when `out` is full.
pub fn push_match(out: &mut TargetList, entity: EntityHandle, report: &mut QueryReport) {
    if out.try_push(entity).is_ok() {
        report.found += 1;
    } else {
        report.dropped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::FRAC_PI_4;

    #[test]
    fn cone_respects_half_angle() {
        let cone = QueryShape::Cone {
            origin: Vec2::ZERO,
            direction: 0.0,
            half_angle: FRAC_PI_4,
            radius: 10.0,
        };
        assert!(cone.contains(Vec2::new(5.0, 1.0)));
        assert!(!cone.contains(Vec2::new(1.0, 5.0)));
        assert!(!cone.contains(Vec2::new(-5.0, 0.0)));
        assert!(!cone.contains(Vec2::new(11.0, 0.0)));
    }

    #[test]
    fn line_is_one_sided() {
        let line = QueryShape::Line {
            origin: Vec2::ZERO,
            direction: 0.0,
            length: 6.0,
            half_width: 0.5,
        };
        assert!(line.contains(Vec2::new(3.0, 0.4)));
        assert!(!line.contains(Vec2::new(-1.0, 0.0)));
        assert!(!line.contains(Vec2::new(3.0, 0.6)));
    }

    #[test]
    fn hex_ring_excludes_interior() {
        assert_eq!(hex_distance((0, 0), (2, -1)), 2);
        let ring = QueryShape::HexRing {
            origin: Vec2::ZERO,
            cell_size: 1.0,
            radius: 1,
        };
        let range = QueryShape::HexRange {
            origin: Vec2::ZERO,
            cell_size: 1.0,
            radius: 1,
        };
        assert!(!ring.contains(Vec2::ZERO));
        assert!(range.contains(Vec2::ZERO));
        // One cell to the east of a unit pointy-top hex.
        let east = Vec2::new(3f32.sqrt(), 0.0);
        assert!(ring.contains(east));
        assert!(range.contains(east));
    }

    #[test]
    fn overflow_is_reported() {
        let mut out = TargetList::new();
        let mut report = QueryReport::default();
        for i in 0..CoreConfig::TARGET_LIST_CAPACITY as u32 + 3 {
            push_match(&mut out, EntityHandle::new(i, 0), &mut report);
        }
        assert_eq!(report.found as usize, CoreConfig::TARGET_LIST_CAPACITY);
        assert_eq!(report.dropped, 3);
    }
}
