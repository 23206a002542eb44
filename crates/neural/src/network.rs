//! Node, connection and packet model.
//!
//! [`Network::generate`] is a pure function of its three structural
//! parameters and the camera aspect. Per-frame state (activity, opacity, packet progress) lives on
//! the same structs and is advanced by the generator.

use crate::fade::step_opacity;
use crate::noise::pseudo_noise;
use glam::Vec2;
use std::collections::HashSet;
use std::f32::consts::TAU;

/// Horizontal and vertical stretch of the unit ring on a wide viewport.
pub const SPREAD: Vec2 = Vec2::new(1.5, 0.9);
/// Share of the camera half-width the ring may span on narrow viewports.
const ASPECT_FILL: f32 = 0.85;
/// Maximum angular jitter, as a fraction of the spacing between nodes.
const ANGLE_JITTER: f32 = 0.35;
const RADIUS_MIN: f32 = 0.55;
const RADIUS_JITTER: f32 = 0.35;
/// Perpendicular midpoint offset, as a fraction of the connection length.
const CURVATURE: f32 = 0.15;
/// Segments used to estimate the Bezier arc length.
const LENGTH_SAMPLES: usize = 16;
/// Base packet speed in world units per second.
const PACKET_SPEED: f32 = 0.4;
const PACKET_SPEED_VARIATION: f32 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkNode {
    pub id: usize,
    pub position: Vec2,
    /// Ids of every node this one shares a connection with.
    pub connections: Vec<usize>,
    pub activity: f32,
    pub opacity: f32,
    pub target_opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConnection {
    pub id: usize,
    pub from: usize,
    pub to: usize,
    /// Start, curved midpoint, end. The curve passes through all three.
    pub path: [Vec2; 3],
    /// Arc length in world units.
    pub length: f32,
}

impl NetworkConnection {
    fn new(id: usize, from: usize, to: usize, start: Vec2, end: Vec2) -> Self {
        let chord = end - start;
        let normal = chord.perp().normalize_or_zero();
        let mid = (start + end) * 0.5 + normal * pseudo_noise(id, 3.0) * CURVATURE * chord.length();
        let mut connection = Self {
            id,
            from,
            to,
            path: [start, mid, end],
            length: 0.0,
        };
        connection.length = connection.sampled_length();
        connection
    }

    /// Quadratic Bezier control point that puts `path[1]` at `t = 0.5`.
    pub fn control_point(&self) -> Vec2 {
        let [start, mid, end] = self.path;
        mid * 2.0 - (start + end) * 0.5
    }

    pub fn point_at(&self, t: f32) -> Vec2 {
        let t = t.clamp(0.0, 1.0);
        let [start, _, end] = self.path;
        let control = self.control_point();
        let u = 1.0 - t;
        start * (u * u) + control * (2.0 * u * t) + end * (t * t)
    }

    fn sampled_length(&self) -> f32 {
        let mut prev = self.path[0];
        let mut total = 0.0;
        for i in 1..=LENGTH_SAMPLES {
            let p = self.point_at(i as f32 / LENGTH_SAMPLES as f32);
            total += prev.distance(p);
            prev = p;
        }
        total
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataPacket {
    pub connection: usize,
    pub progress: f32,
    /// World units per second at a data flow speed of 1.
    pub speed: f32,
    pub activity: f32,
    pub opacity: f32,
    pub target_opacity: f32,
}

/// Ring stretch for a camera spanning `[-aspect, aspect]` horizontally.
pub fn spread_for(aspect: f32) -> Vec2 {
    let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
    Vec2::new(SPREAD.x.min(ASPECT_FILL * aspect), SPREAD.y)
}

/// Neighbours each node links to at `density`.
pub fn neighbour_count(density: f32) -> usize {
    2 + (density * 2.0).round().max(0.0) as usize
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Network {
    pub nodes: Vec<NetworkNode>,
    pub connections: Vec<NetworkConnection>,
    pub packets: Vec<DataPacket>,
}

impl Network {
    /// Lays out `node_count` nodes to fit a camera of `aspect`, links each to
    /// its nearest neighbours and seeds `packet_count` packets. New elements
    /// start at `opacity`.
    pub fn generate(
        node_count: usize,
        density: f32,
        packet_count: usize,
        opacity: f32,
        aspect: f32,
    ) -> Self {
        let nodes = layout_nodes(node_count, opacity, spread_for(aspect));
        let mut network = Self {
            nodes,
            connections: Vec::new(),
            packets: Vec::new(),
        };
        network.connect(neighbour_count(density));
        network.seed_packets(packet_count, opacity);
        network
    }

    fn connect(&mut self, k: usize) {
        let mut seen = HashSet::new();
        let n = self.nodes.len();
        for i in 0..n {
            let origin = self.nodes[i].position;
            let mut others: Vec<(usize, f32)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (j, origin.distance_squared(self.nodes[j].position)))
                .collect();
            others.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            for &(j, _) in others.iter().take(k) {
                let pair = (i.min(j), i.max(j));
                if !seen.insert(pair) {
                    continue;
                }
                let id = self.connections.len();
                let (from, to) = pair;
                let connection = NetworkConnection::new(
                    id,
                    from,
                    to,
                    self.nodes[from].position,
                    self.nodes[to].position,
                );
                self.connections.push(connection);
                self.nodes[from].connections.push(to);
                self.nodes[to].connections.push(from);
            }
        }
    }

    fn seed_packets(&mut self, count: usize, opacity: f32) {
        let total = self.connections.len();
        if total == 0 {
            return;
        }
        self.packets = (0..count)
            .map(|i| DataPacket {
                connection: i % total,
                progress: i as f32 / count as f32,
                speed: PACKET_SPEED * (1.0 + PACKET_SPEED_VARIATION * (i as f32 * 1.7).sin()),
                activity: 0.0,
                opacity,
                target_opacity: opacity,
            })
            .collect();
    }

    /// Moves packets along their connections. A packet that reaches the end
    /// restarts at progress 0 on the next connection id.
    pub fn advance_packets(&mut self, dt_s: f32, flow: f32) {
        let total = self.connections.len();
        if total == 0 {
            return;
        }
        for packet in &mut self.packets {
            let length = self.connections[packet.connection].length.max(f32::EPSILON);
            packet.progress += packet.speed * flow * dt_s / length;
            if packet.progress >= 1.0 {
                packet.progress = 0.0;
                packet.connection = (packet.connection + 1) % total;
            }
            packet.progress = packet.progress.clamp(0.0, 1.0);
        }
    }

    /// Sets node and packet activity for `elapsed_s` seconds of animation.
    pub fn pulse(&mut self, elapsed_s: f32) {
        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.activity = 0.5 + 0.5 * (elapsed_s * 1.3 + i as f32 * 0.7).sin();
        }
        for (i, packet) in self.packets.iter_mut().enumerate() {
            packet.activity = 0.5 + 0.5 * (elapsed_s * 3.0 + i as f32 * 1.1).sin();
        }
    }

    pub fn set_target_opacity(&mut self, target: f32) {
        for node in &mut self.nodes {
            node.target_opacity = target;
        }
        for packet in &mut self.packets {
            packet.target_opacity = target;
        }
    }

    /// Steps every opacity toward its target. Returns true once all have
    /// arrived.
    pub fn step_fades(&mut self, dt_s: f32) -> bool {
        let mut settled = true;
        for node in &mut self.nodes {
            node.opacity = step_opacity(node.opacity, node.target_opacity, dt_s);
            settled &= node.opacity == node.target_opacity;
        }
        for packet in &mut self.packets {
            packet.opacity = step_opacity(packet.opacity, packet.target_opacity, dt_s);
            settled &= packet.opacity == packet.target_opacity;
        }
        settled
    }

    /// Forces every opacity to its target.
    pub fn settle(&mut self) {
        for node in &mut self.nodes {
            node.opacity = node.target_opacity;
        }
        for packet in &mut self.packets {
            packet.opacity = packet.target_opacity;
        }
    }

    /// Carries opacities and packet progress over from `previous`, matching
    /// nodes and packets by index.
    pub fn inherit_state(&mut self, previous: &Network) {
        for (node, old) in self.nodes.iter_mut().zip(&previous.nodes) {
            node.activity = old.activity;
            node.opacity = old.opacity;
            node.target_opacity = old.target_opacity;
        }
        let total = self.connections.len().max(1);
        for (packet, old) in self.packets.iter_mut().zip(&previous.packets) {
            packet.connection = old.connection % total;
            packet.progress = old.progress;
            packet.activity = old.activity;
            packet.opacity = old.opacity;
            packet.target_opacity = old.target_opacity;
        }
    }

    /// World position of a packet on its connection.
    pub fn packet_position(&self, packet: &DataPacket) -> Vec2 {
        self.connections
            .get(packet.connection)
            .map(|c| c.point_at(packet.progress))
            .unwrap_or(Vec2::ZERO)
    }
}

fn layout_nodes(count: usize, opacity: f32, spread: Vec2) -> Vec<NetworkNode> {
    let spacing = TAU / count.max(1) as f32;
    (0..count)
        .map(|i| {
            let angle = i as f32 * spacing + pseudo_noise(i, 1.0) * ANGLE_JITTER * spacing;
            let radius = RADIUS_MIN + RADIUS_JITTER * (pseudo_noise(i, 2.0) * 0.5 + 0.5);
            NetworkNode {
                id: i,
                position: Vec2::new(angle.cos(), angle.sin()) * radius * spread,
                connections: Vec::new(),
                activity: 0.0,
                opacity,
                target_opacity: opacity,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WIDE: f32 = 16.0 / 9.0;

    fn bits(network: &Network) -> Vec<u32> {
        network
            .nodes
            .iter()
            .flat_map(|n| [n.position.x.to_bits(), n.position.y.to_bits()])
            .collect()
    }

    #[test]
    fn nodes_stay_inside_the_spread() {
        let network = Network::generate(45, 0.5, 10, 1.0, WIDE);
        for node in &network.nodes {
            let p = node.position / SPREAD;
            let r = p.length();
            assert!(r >= RADIUS_MIN - 1e-4 && r <= RADIUS_MIN + RADIUS_JITTER + 1e-4, "{r}");
        }
    }

    #[test]
    fn nodes_fit_the_camera_at_square_and_wide_aspects() {
        for aspect in [1.0, 4.0 / 3.0, WIDE] {
            let network = Network::generate(45, 0.8, 10, 1.0, aspect);
            for node in &network.nodes {
                assert!(node.position.x.abs() <= aspect, "x {} at {aspect}", node.position.x);
                assert!(node.position.y.abs() <= 1.0, "y {} at {aspect}", node.position.y);
            }
        }
        assert_eq!(spread_for(WIDE), SPREAD);
        assert_eq!(spread_for(f32::NAN), spread_for(1.0));
    }

    #[test]
    fn inherit_state_keeps_fades_and_progress() {
        let mut wide = Network::generate(20, 0.5, 12, 1.0, WIDE);
        wide.set_target_opacity(0.0);
        wide.step_fades(0.2);
        wide.advance_packets(0.3, 1.0);
        let mut square = Network::generate(20, 0.5, 12, 1.0, 1.0);
        square.inherit_state(&wide);
        for (a, b) in square.nodes.iter().zip(&wide.nodes) {
            assert_eq!((a.opacity, a.target_opacity), (b.opacity, b.target_opacity));
        }
        for (a, b) in square.packets.iter().zip(&wide.packets) {
            assert_eq!(a.progress, b.progress);
            assert!(a.connection < square.connections.len());
        }
    }

    #[test]
    fn curve_passes_through_midpoint() {
        let network = Network::generate(20, 0.5, 10, 1.0, WIDE);
        for c in &network.connections {
            assert!(c.point_at(0.5).distance(c.path[1]) < 1e-4);
            assert!(c.point_at(0.0).distance(c.path[0]) < 1e-5);
            assert!(c.point_at(1.0).distance(c.path[2]) < 1e-5);
            assert!(c.length >= c.path[0].distance(c.path[2]) - 1e-4);
        }
    }

    #[test]
    fn packets_start_spread_over_connections() {
        let network = Network::generate(25, 0.5, 30, 1.0, WIDE);
        let total = network.connections.len();
        for (i, p) in network.packets.iter().enumerate() {
            assert_eq!(p.connection, i % total);
            assert!((p.progress - i as f32 / 30.0).abs() < 1e-6);
            assert!(p.speed >= PACKET_SPEED * 0.7 - 1e-6 && p.speed <= PACKET_SPEED * 1.3 + 1e-6);
        }
    }

    #[test]
    fn packets_visit_connections_round_robin() {
        let mut network = Network::generate(15, 0.2, 10, 1.0, WIDE);
        let total = network.connections.len();
        let mut visits: Vec<Vec<usize>> =
            network.packets.iter().map(|p| vec![p.connection]).collect();
        for _ in 0..20_000 {
            network.advance_packets(0.05, 2.0);
            for (i, p) in network.packets.iter().enumerate() {
                assert!((0.0..=1.0).contains(&p.progress));
                let last = *visits[i].last().unwrap_or(&p.connection);
                if p.connection != last {
                    assert_eq!(p.connection, (last + 1) % total);
                    visits[i].push(p.connection);
                }
            }
        }
        for (i, seen) in visits.iter().enumerate() {
            let distinct: HashSet<usize> = seen.iter().copied().collect();
            assert_eq!(distinct.len(), total, "packet {i} missed a connection");
        }
    }

    #[test]
    fn fades_settle() {
        let mut network = Network::generate(15, 0.5, 10, 1.0, WIDE);
        network.set_target_opacity(0.0);
        let mut frames = 0;
        while !network.step_fades(0.016) {
            frames += 1;
            assert!(frames < 100);
        }
        assert!(network.nodes.iter().all(|n| n.opacity == 0.0));
        assert!(network.packets.iter().all(|p| p.opacity == 0.0));
    }

    #[test]
    fn pulse_is_bounded() {
        let mut network = Network::generate(30, 0.5, 20, 1.0, WIDE);
        network.pulse(12.34);
        assert!(network.nodes.iter().all(|n| (0.0..=1.0).contains(&n.activity)));
        assert!(network.packets.iter().all(|p| (0.0..=1.0).contains(&p.activity)));
    }

    proptest! {
        #[test]
        fn generation_is_deterministic(
            nodes in 15usize..=45,
            density in 0.2f32..=0.8,
            packets in 10usize..=50,
        ) {
            let a = Network::generate(nodes, density, packets, 1.0, WIDE);
            let b = Network::generate(nodes, density, packets, 1.0, WIDE);
            prop_assert_eq!(bits(&a), bits(&b));
            let topology = |n: &Network| n.connections.iter().map(|c| (c.from, c.to)).collect::<Vec<_>>();
            prop_assert_eq!(topology(&a), topology(&b));
            let seeds = |n: &Network| n.packets.iter().map(|p| (p.connection, p.progress.to_bits())).collect::<Vec<_>>();
            prop_assert_eq!(seeds(&a), seeds(&b));
        }

        #[test]
        fn every_node_reaches_its_neighbour_count(
            nodes in 15usize..=45,
            density in 0.2f32..=0.8,
        ) {
            let network = Network::generate(nodes, density, 10, 1.0, WIDE);
            let k = neighbour_count(density);
            let mut pairs = HashSet::new();
            for c in &network.connections {
                prop_assert!(c.from < c.to);
                prop_assert!(pairs.insert((c.from, c.to)));
            }
            for node in &network.nodes {
                prop_assert!(node.connections.len() >= k);
            }
        }
    }
}
