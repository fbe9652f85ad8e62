use eframe::egui::{Vec2, vec2};

use super::quadtree::Quad;

#[derive(Clone, Copy, Debug)]
pub(super) struct ChargeParams {
    pub(super) strength: f32,
    pub(super) softening: f32,
    pub(super) theta: f32,
}

#[derive(Clone, Copy, Debug)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) reach_sq: f32,
}

#[derive(Clone, Copy, Debug)]
pub(super) struct Spring {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) strength: f32,
    pub(super) bias: f32,
}

fn separation(from: usize, to: usize, delta: Vec2) -> (Vec2, f32) {
    let distance = delta.length();
    if distance > 0.0001 {
        return (delta / distance, distance);
    }
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
    (vec2(angle.cos(), angle.sin()), distance)
}

pub(super) fn apply_springs(
    springs: &[Spring],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    rest_length: f32,
    alpha: f32,
) {
    for spring in springs {
        let (source, target) = (spring.source, spring.target);
        let delta =
            (positions[target] + velocities[target]) - (positions[source] + velocities[source]);
        let (direction, distance) = separation(source, target, delta);
        let stretch = (distance - rest_length) * alpha * spring.strength;
        let pull = direction * stretch;

        velocities[target] -= pull * spring.bias;
        velocities[source] += pull * (1.0 - spring.bias);
    }
}

pub(super) fn accumulate_charge(
    quad: &Quad,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    if quad.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if quad.is_leaf() {
        for &other in &quad.members {
            if other == index {
                continue;
            }
            let (direction, distance) = separation(index, other, point - positions[other]);
            *velocity += direction
                * (params.strength * distance / (distance * distance + params.softening));
        }
        return;
    }

    let delta = point - quad.centroid;
    let distance_sq = delta.length_sq().max(0.0001);
    let distance = distance_sq.sqrt();
    let far_enough = !quad.bounds.contains(point)
        && (quad.bounds.side_length() / distance) < params.theta
        && quad.mass > 1.0;

    if far_enough {
        let scaled = params.strength * quad.mass * distance / (distance_sq + params.softening);
        *velocity += (delta / distance) * scaled;
        return;
    }

    for child in quad.children() {
        accumulate_charge(child, index, positions, params, velocity);
    }
}

fn push_apart(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    strength: f32,
    velocities: &mut [Vec2],
) {
    let (direction, distance) = separation(from, to, positions[from] - positions[to]);
    let min_distance = radii[from] + radii[to];
    if distance >= min_distance {
        return;
    }

    let overlap = (min_distance - distance) * strength;
    let weight_from = radii[to] * radii[to];
    let weight_to = radii[from] * radii[from];
    let total = (weight_from + weight_to).max(0.0001);
    velocities[from] += direction * overlap * (weight_from / total);
    velocities[to] -= direction * overlap * (weight_to / total);
}

pub(super) fn accumulate_collisions(
    quad_a: &Quad,
    quad_b: &Quad,
    same_quad: bool,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    velocities: &mut [Vec2],
) {
    if quad_a.bounds.gap_sq(quad_b.bounds) > params.reach_sq {
        return;
    }

    if quad_a.is_leaf() && quad_b.is_leaf() {
        if same_quad {
            for (offset, &from) in quad_a.members.iter().enumerate() {
                for &to in &quad_a.members[offset + 1..] {
                    push_apart(from, to, positions, radii, params.strength, velocities);
                }
            }
        } else {
            for &from in &quad_a.members {
                for &to in &quad_b.members {
                    push_apart(from, to, positions, radii, params.strength, velocities);
                }
            }
        }
        return;
    }

    if same_quad {
        let children = quad_a.children().collect::<Vec<_>>();
        for (offset, child_a) in children.iter().enumerate() {
            accumulate_collisions(child_a, child_a, true, positions, radii, params, velocities);
            for child_b in &children[offset + 1..] {
                accumulate_collisions(
                    child_a, child_b, false, positions, radii, params, velocities,
                );
            }
        }
        return;
    }

    let split_a = if quad_a.is_leaf() {
        false
    } else if quad_b.is_leaf() {
        true
    } else {
        quad_a.bounds.half_extent >= quad_b.bounds.half_extent
    };

    if split_a {
        for child in quad_a.children() {
            accumulate_collisions(child, quad_b, false, positions, radii, params, velocities);
        }
    } else {
        for child in quad_b.children() {
            accumulate_collisions(quad_a, child, false, positions, radii, params, velocities);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spring_pulls_stretched_pair_together() {
        let positions = [vec2(0.0, 0.0), vec2(300.0, 0.0)];
        let mut velocities = [Vec2::ZERO; 2];
        let springs = [Spring {
            source: 0,
            target: 1,
            strength: 1.0,
            bias: 0.5,
        }];

        apply_springs(&springs, &positions, &mut velocities, 150.0, 1.0);

        assert!(velocities[0].x > 0.0);
        assert!(velocities[1].x < 0.0);
    }

    #[test]
    fn negative_charge_repels() {
        let positions = [vec2(-10.0, 0.0), vec2(10.0, 0.0)];
        let quad = Quad::build(&positions).unwrap();
        let mut velocity = Vec2::ZERO;
        accumulate_charge(
            &quad,
            0,
            &positions,
            ChargeParams {
                strength: 700.0,
                softening: 1.0,
                theta: 0.9,
            },
            &mut velocity,
        );
        assert!(velocity.x < 0.0);
    }

    #[test]
    fn overlapping_pairs_are_pushed_apart() {
        let positions = [vec2(0.0, 0.0), vec2(5.0, 0.0), vec2(900.0, 0.0)];
        let radii = [25.0, 25.0, 25.0];
        let mut velocities = [Vec2::ZERO; 3];
        let quad = Quad::build(&positions).unwrap();

        accumulate_collisions(
            &quad,
            &quad,
            true,
            &positions,
            &radii,
            CollisionParams {
                strength: 0.7,
                reach_sq: 50.0 * 50.0,
            },
            &mut velocities,
        );

        assert!(velocities[0].x < 0.0);
        assert!(velocities[1].x > 0.0);
        assert_eq!(velocities[2], Vec2::ZERO);
    }
}
