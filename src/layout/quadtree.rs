use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

#[derive(Clone, Copy, Debug)]
pub(super) struct Bounds {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl Bounds {
    fn enclosing(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);

        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }

        if !min.x.is_finite() || !min.y.is_finite() || !max.x.is_finite() || !max.y.is_finite() {
            return None;
        }

        let span = (max - min).max(vec2(1.0, 1.0));
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: (span.x.max(span.y) * 0.5) + 1.0,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        let offset = point - self.center;
        offset.x.abs() <= self.half_extent && offset.y.abs() <= self.half_extent
    }

    pub(super) fn side_length(self) -> f32 {
        self.half_extent * 2.0
    }

    pub(super) fn gap_sq(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let gap_x = ((self.center.x - other.center.x).abs() - reach).max(0.0);
        let gap_y = ((self.center.y - other.center.y).abs() - reach).max(0.0);
        (gap_x * gap_x) + (gap_y * gap_y)
    }

    fn quadrant(self, index: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let x = if index & 1 == 0 { -quarter } else { quarter };
        let y = if index & 2 == 0 { -quarter } else { quarter };
        Self {
            center: self.center + vec2(x, y),
            half_extent: quarter,
        }
    }

    fn quadrant_of(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }
}

pub(super) struct Quad {
    pub(super) bounds: Bounds,
    pub(super) centroid: Vec2,
    pub(super) mass: f32,
    pub(super) members: Vec<usize>,
    pub(super) children: [Option<Box<Quad>>; 4],
}

impl Quad {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let bounds = Bounds::enclosing(positions)?;
        Some(Self::subdivide(
            bounds,
            (0..positions.len()).collect(),
            positions,
            0,
        ))
    }

    fn subdivide(bounds: Bounds, members: Vec<usize>, positions: &[Vec2], depth: usize) -> Self {
        let mass = members.len() as f32;
        let centroid = if members.is_empty() {
            bounds.center
        } else {
            members
                .iter()
                .fold(Vec2::ZERO, |sum, &index| sum + positions[index])
                / mass
        };

        let mut quad = Self {
            bounds,
            centroid,
            mass,
            members,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || quad.members.len() <= LEAF_CAPACITY {
            return quad;
        }

        let mut buckets: [Vec<usize>; 4] = std::array::from_fn(|_| Vec::new());
        for &index in &quad.members {
            buckets[bounds.quadrant_of(positions[index])].push(index);
        }

        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return quad;
        }

        for (slot, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                quad.children[slot] = Some(Box::new(Self::subdivide(
                    bounds.quadrant(slot),
                    bucket,
                    positions,
                    depth + 1,
                )));
            }
        }
        quad.members.clear();
        quad
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &Quad> {
        self.children.iter().filter_map(|child| child.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_splits_crowded_regions() {
        let positions = (0..40)
            .map(|index| vec2((index % 8) as f32 * 10.0, (index / 8) as f32 * 10.0))
            .collect::<Vec<_>>();
        let quad = Quad::build(&positions).unwrap();

        assert!(!quad.is_leaf());
        assert_eq!(quad.mass, 40.0);

        let mut stack = vec![&quad];
        let mut leaf_members = 0;
        while let Some(current) = stack.pop() {
            if current.is_leaf() {
                leaf_members += current.members.len();
            }
            stack.extend(current.children());
        }
        assert_eq!(leaf_members, 40);
    }

    #[test]
    fn non_finite_positions_yield_no_tree() {
        assert!(Quad::build(&[vec2(f32::NAN, 0.0)]).is_none());
        assert!(Quad::build(&[]).is_none());
    }

    #[test]
    fn bounds_gap_is_zero_when_overlapping() {
        let a = Bounds {
            center: Vec2::ZERO,
            half_extent: 5.0,
        };
        let b = Bounds {
            center: vec2(8.0, 0.0),
            half_extent: 5.0,
        };
        assert_eq!(a.gap_sq(b), 0.0);
        assert!(a.contains(vec2(5.0, -5.0)));
    }
}
