use std::collections::{HashMap, HashSet};

use eframe::egui::{Vec2, vec2};
use tracing::{debug, warn};

use crate::config::ForceConfig;
use crate::roadmap::{Link, LinkKey, Node};

use super::forces::{
    ChargeParams, CollisionParams, Spring, accumulate_charge, accumulate_collisions, apply_springs,
};
use super::quadtree::Quad;

pub const ALPHA_MIN: f32 = 0.001;
const ALPHA_TICKS: f32 = 300.0;
const INITIAL_RADIUS: f32 = 10.0;
const CHARGE_SOFTENING: f32 = 1.0;
const BARNES_HUT_THETA: f32 = 0.9;

fn alpha_decay() -> f32 {
    1.0 - ALPHA_MIN.powf(1.0 / ALPHA_TICKS)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub fixed: Option<Vec2>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimNode {
    pub index: usize,
    pub body: Body,
    pub node: Node,
}

impl SimNode {
    pub fn id(&self) -> &str {
        &self.node.id
    }
}

pub fn merge_preserving_physics(current: &SimNode, incoming: &Node) -> SimNode {
    SimNode {
        index: current.index,
        body: current.body,
        node: incoming.clone(),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimLink {
    pub key: LinkKey,
    pub source: usize,
    pub target: usize,
}

fn phyllotaxis(index: usize) -> Vec2 {
    let radius = INITIAL_RADIUS * (0.5 + index as f32).sqrt();
    let angle = index as f32 * std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    vec2(radius * angle.cos(), radius * angle.sin())
}

#[derive(Default)]
struct Scratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    radii: Vec<f32>,
}

pub struct Simulation {
    nodes: Vec<SimNode>,
    index_by_id: HashMap<String, usize>,
    links: Vec<SimLink>,
    springs: Vec<Spring>,
    forces: ForceConfig,
    alpha: f32,
    scratch: Scratch,
}

impl Simulation {
    pub fn new(nodes: &[Node], links: &[Link], forces: ForceConfig) -> Self {
        let mut sim_nodes = Vec::with_capacity(nodes.len());
        let mut index_by_id = HashMap::with_capacity(nodes.len());

        for node in nodes {
            if index_by_id.contains_key(&node.id) {
                warn!(node = %node.id, "duplicate node id in layout input; keeping the first");
                continue;
            }
            let index = sim_nodes.len();
            index_by_id.insert(node.id.clone(), index);
            sim_nodes.push(SimNode {
                index,
                body: Body {
                    position: phyllotaxis(index),
                    velocity: Vec2::ZERO,
                    fixed: None,
                },
                node: node.clone(),
            });
        }

        let mut simulation = Self {
            nodes: sim_nodes,
            index_by_id,
            links: Vec::new(),
            springs: Vec::new(),
            forces,
            alpha: 1.0,
            scratch: Scratch::default(),
        };
        simulation.set_links(links);
        simulation
    }

    pub fn set_links(&mut self, links: &[Link]) -> usize {
        let mut seen = HashSet::with_capacity(links.len());
        let mut resolved = Vec::with_capacity(links.len());
        let mut skipped = 0usize;

        for link in links {
            let endpoints = (
                self.index_by_id.get(&link.source).copied(),
                self.index_by_id.get(&link.target).copied(),
            );
            let (Some(source), Some(target)) = endpoints else {
                skipped += 1;
                continue;
            };
            if source == target || !seen.insert(link.key()) {
                continue;
            }
            resolved.push(SimLink {
                key: link.key(),
                source,
                target,
            });
        }

        if skipped > 0 {
            debug!(skipped, "links referencing nodes outside the layout were ignored");
        }

        let mut degree = vec![0u32; self.nodes.len()];
        for link in &resolved {
            degree[link.source] += 1;
            degree[link.target] += 1;
        }

        self.springs = resolved
            .iter()
            .map(|link| {
                let source_degree = degree[link.source] as f32;
                let target_degree = degree[link.target] as f32;
                Spring {
                    source: link.source,
                    target: link.target,
                    strength: 1.0 / source_degree.min(target_degree),
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect();
        self.links = resolved;
        skipped
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&SimNode> {
        self.index_of(id).map(|index| &self.nodes[index])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn links(&self) -> &[SimLink] {
        &self.links
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < ALPHA_MIN
    }

    pub fn reheat(&mut self, alpha: f32) {
        self.alpha = self.alpha.max(alpha);
    }

    pub(super) fn replace(&mut self, node: SimNode) {
        let index = node.index;
        if let Some(slot) = self.nodes.get_mut(index) {
            *slot = node;
        }
    }

    pub fn pin(&mut self, id: &str, position: Vec2) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let body = &mut self.nodes[index].body;
        body.fixed = Some(position);
        body.position = position;
        body.velocity = Vec2::ZERO;
        true
    }

    pub fn release(&mut self, id: &str) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.nodes[index].body.fixed.take().is_some()
    }

    fn collision_radius(&self, node: &Node) -> f32 {
        if node.kind.is_major() {
            self.forces.major_collision_radius
        } else {
            self.forces.minor_collision_radius
        }
    }

    pub fn tick(&mut self) -> bool {
        if self.is_settled() || self.nodes.is_empty() {
            return false;
        }

        self.alpha += (0.0 - self.alpha) * alpha_decay();
        let alpha = self.alpha;
        let node_count = self.nodes.len();

        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.positions.clear();
        scratch.velocities.clear();
        scratch.radii.clear();
        let mut max_radius = 0.0_f32;
        for sim_node in &self.nodes {
            let radius = self.collision_radius(&sim_node.node);
            scratch.positions.push(sim_node.body.position);
            scratch.velocities.push(sim_node.body.velocity);
            scratch.radii.push(radius);
            max_radius = max_radius.max(radius);
        }

        apply_springs(
            &self.springs,
            &scratch.positions,
            &mut scratch.velocities,
            self.forces.link_distance,
            alpha,
        );

        if let Some(quad) = Quad::build(&scratch.positions) {
            let charge = ChargeParams {
                strength: self.forces.charge_strength * alpha,
                softening: CHARGE_SOFTENING,
                theta: BARNES_HUT_THETA,
            };
            for index in 0..node_count {
                let mut velocity = scratch.velocities[index];
                accumulate_charge(&quad, index, &scratch.positions, charge, &mut velocity);
                scratch.velocities[index] = velocity;
            }

            let reach = max_radius * 2.0;
            if reach > 0.0 {
                accumulate_collisions(
                    &quad,
                    &quad,
                    true,
                    &scratch.positions,
                    &scratch.radii,
                    CollisionParams {
                        strength: self.forces.collision_strength,
                        reach_sq: reach * reach,
                    },
                    &mut scratch.velocities,
                );
            }
        }

        let centroid = scratch
            .positions
            .iter()
            .fold(Vec2::ZERO, |sum, position| sum + *position)
            / node_count as f32;

        let keep = 1.0 - self.forces.velocity_decay;
        for (index, sim_node) in self.nodes.iter_mut().enumerate() {
            let body = &mut sim_node.body;
            match body.fixed {
                Some(fixed) => {
                    body.position = fixed;
                    body.velocity = Vec2::ZERO;
                }
                None => {
                    body.velocity = scratch.velocities[index] * keep;
                    body.position += body.velocity - centroid;
                }
            }
        }

        self.scratch = scratch;
        true
    }
}
