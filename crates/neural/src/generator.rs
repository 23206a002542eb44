use crate::fade::TRANSITION_WINDOW_MS;
use crate::network::Network;
use backdrop_core::config::{defaults, NeuralConfig};
use backdrop_core::material::Material;
use backdrop_core::params::apply_patch;
use backdrop_core::primitive::{LineBuffer, PointBuffer};
use backdrop_core::{
    BackgroundKind, ConfigChange, Generator, Part, Primitive, PrimitiveRef, RenderError,
    SceneEvent, BACKGROUND_SLOT,
};
use serde_json::Value;

/// Line segments drawn per connection curve.
pub const CURVE_SEGMENTS: usize = 8;
const CONNECTION_ALPHA: f32 = 0.35;
const NODE_SIZE: f32 = 0.035;
const GLOW_SIZE: f32 = 0.09;
const GLOW_ALPHA: f32 = 0.3;
const PACKET_SIZE: f32 = 0.022;

const PART_BACKGROUND: usize = 0;
const PART_LINES: usize = 1;
const PART_GLOW: usize = 2;
const PART_NODES: usize = 3;
const PART_PACKETS: usize = 4;

const DEFAULT_ASPECT: f32 = 16.0 / 9.0;

/// Where a structural reconfiguration stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    Idle,
    /// The current network is fading to 0 before being replaced.
    FadingOut,
    /// A regenerated network is fading in from 0.
    FadingIn,
}

#[derive(Debug)]
enum Transition {
    Idle,
    FadingOut { elapsed_ms: f64, pending: NeuralConfig },
    FadingIn { elapsed_ms: f64 },
}

pub struct NeuralGenerator {
    config: NeuralConfig,
    network: Network,
    transition: Transition,
    /// Seconds of animation, drives the activity pulse.
    elapsed: f64,
    /// Camera aspect the layout was fitted to.
    aspect: f32,
    visible: bool,
    primitive: Option<PrimitiveRef>,
    retired: Vec<PrimitiveRef>,
    events: Vec<SceneEvent>,
}

fn structure_of(config: &NeuralConfig) -> (usize, u32, usize) {
    (
        config.node_count,
        config.connection_density.to_bits(),
        config.packet_count,
    )
}

fn generate(config: &NeuralConfig, opacity: f32, aspect: f32) -> Network {
    Network::generate(
        config.node_count,
        config.connection_density,
        config.packet_count,
        opacity,
        aspect,
    )
}

impl NeuralGenerator {
    pub fn new(config: NeuralConfig) -> Result<Self, RenderError> {
        config.validate()?;
        let network = generate(&config, 1.0, DEFAULT_ASPECT);
        Ok(Self {
            config,
            network,
            transition: Transition::Idle,
            elapsed: 0.0,
            aspect: DEFAULT_ASPECT,
            visible: true,
            primitive: None,
            retired: Vec::new(),
            events: Vec::new(),
        })
    }

    pub fn from_json(patch: &Value) -> Result<Self, RenderError> {
        Self::new(apply_patch(&defaults::neural(), patch)?)
    }

    pub fn neural_config(&self) -> &NeuralConfig {
        &self.config
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn transition(&self) -> TransitionPhase {
        match self.transition {
            Transition::Idle => TransitionPhase::Idle,
            Transition::FadingOut { .. } => TransitionPhase::FadingOut,
            Transition::FadingIn { .. } => TransitionPhase::FadingIn,
        }
    }

    fn build(&self) -> PrimitiveRef {
        let lines = self.network.connections.len() * CURVE_SEGMENTS * 2;
        let nodes = self.network.nodes.len();
        let mut parts = vec![
            Part::Quad(Material::Solid(self.config.colors[4])),
            Part::Lines(LineBuffer::with_len(lines)),
            Part::Points(PointBuffer::with_len(nodes)),
            Part::Points(PointBuffer::with_len(nodes)),
            Part::Points(PointBuffer::with_len(self.network.packets.len())),
        ];
        self.write_parts(&mut parts);
        let mut primitive = Primitive::new(BACKGROUND_SLOT, parts);
        primitive.visible = self.visible;
        PrimitiveRef::new(primitive)
    }

    /// Rewrites every buffer from the network and config. Buffer lengths are
    /// fixed by `build`.
    fn write_parts(&self, parts: &mut [Part]) {
        let [node_color, connection_color, packet_color, glow_color, background] =
            self.config.colors;
        let size = self.config.node_size;
        let nodes = &self.network.nodes;

        if let Some(Part::Quad(Material::Solid(c))) = parts.get_mut(PART_BACKGROUND) {
            *c = background;
        }
        if let Some(Part::Lines(lines)) = parts.get_mut(PART_LINES) {
            let mut v = 0;
            for connection in &self.network.connections {
                let alpha = CONNECTION_ALPHA
                    * nodes[connection.from].opacity.min(nodes[connection.to].opacity);
                let color = connection_color.with_alpha_scaled(alpha);
                for s in 0..CURVE_SEGMENTS {
                    let a = connection.point_at(s as f32 / CURVE_SEGMENTS as f32);
                    let b = connection.point_at((s + 1) as f32 / CURVE_SEGMENTS as f32);
                    if v + 1 >= lines.len() {
                        break;
                    }
                    lines.positions[v] = a;
                    lines.positions[v + 1] = b;
                    lines.colors[v] = color;
                    lines.colors[v + 1] = color;
                    v += 2;
                }
            }
        }
        if let Some(Part::Points(glow)) = parts.get_mut(PART_GLOW) {
            for (i, node) in nodes.iter().enumerate().take(glow.len()) {
                glow.positions[i] = node.position;
                glow.sizes[i] = GLOW_SIZE * size * (1.0 + 0.5 * node.activity);
                glow.colors[i] = glow_color.with_alpha_scaled(GLOW_ALPHA * node.activity * node.opacity);
            }
        }
        if let Some(Part::Points(points)) = parts.get_mut(PART_NODES) {
            for (i, node) in nodes.iter().enumerate().take(points.len()) {
                points.positions[i] = node.position;
                points.sizes[i] = NODE_SIZE * size * (0.8 + 0.4 * node.activity);
                points.colors[i] = node_color.with_alpha_scaled(node.opacity);
            }
        }
        if let Some(Part::Points(points)) = parts.get_mut(PART_PACKETS) {
            for (i, packet) in self.network.packets.iter().enumerate().take(points.len()) {
                points.positions[i] = self.network.packet_position(packet);
                points.sizes[i] = PACKET_SIZE * size * (0.8 + 0.4 * packet.activity);
                points.colors[i] =
                    packet_color.with_alpha_scaled(packet.opacity * (0.6 + 0.4 * packet.activity));
            }
        }
    }

    fn refresh(&self) {
        if let Some(p) = &self.primitive {
            let mut primitive = p.borrow_mut();
            self.write_parts(&mut primitive.parts);
            primitive.touch();
        }
    }

    /// Replaces the network and primitive; the new set starts transparent.
    fn rebuild(&mut self, config: NeuralConfig) {
        self.config = NeuralConfig {
            node_count: config.node_count,
            connection_density: config.connection_density,
            packet_count: config.packet_count,
            ..self.config.clone()
        };
        self.network = generate(&self.config, 0.0, self.aspect);
        self.network.set_target_opacity(1.0);
        self.network.pulse(self.elapsed as f32);
        if let Some(old) = self.primitive.take() {
            let replacement = self.build();
            self.events.push(SceneEvent::Detach(old.id()));
            self.events.push(SceneEvent::Attach(replacement.clone()));
            self.retired.push(old);
            self.primitive = Some(replacement);
        }
        tracing::debug!(
            nodes = self.network.nodes.len(),
            connections = self.network.connections.len(),
            packets = self.network.packets.len(),
            "neural network regenerated"
        );
    }

    /// Re-fits node positions to the current aspect, keeping fades and
    /// packet progress. A changed connection count swaps the primitive.
    fn relayout(&mut self) {
        let mut network = generate(&self.config, 1.0, self.aspect);
        network.inherit_state(&self.network);
        let same_shape = network.connections.len() == self.network.connections.len();
        self.network = network;
        let Some(old) = self.primitive.take() else {
            return;
        };
        if same_shape {
            self.primitive = Some(old);
            self.refresh();
        } else {
            let replacement = self.build();
            self.events.push(SceneEvent::Detach(old.id()));
            self.events.push(SceneEvent::Attach(replacement.clone()));
            self.retired.push(old);
            self.primitive = Some(replacement);
        }
        tracing::debug!(aspect = self.aspect, "neural layout refitted");
    }

    fn step_transition(&mut self, delta_ms: f64) {
        let dt_s = (delta_ms / 1000.0) as f32;
        let transition = std::mem::replace(&mut self.transition, Transition::Idle);
        self.transition = match transition {
            Transition::Idle => {
                self.network.step_fades(dt_s);
                Transition::Idle
            }
            Transition::FadingOut { elapsed_ms, pending } => {
                let elapsed_ms = elapsed_ms + delta_ms;
                let mut done = self.network.step_fades(dt_s);
                if !done && elapsed_ms >= TRANSITION_WINDOW_MS {
                    self.network.settle();
                    done = true;
                }
                if done {
                    // The outgoing primitive's last frame is fully transparent.
                    self.refresh();
                    self.rebuild(pending);
                    Transition::FadingIn { elapsed_ms: 0.0 }
                } else {
                    Transition::FadingOut { elapsed_ms, pending }
                }
            }
            Transition::FadingIn { elapsed_ms } => {
                let elapsed_ms = elapsed_ms + delta_ms;
                let mut done = self.network.step_fades(dt_s);
                if !done && elapsed_ms >= TRANSITION_WINDOW_MS {
                    self.network.settle();
                    done = true;
                }
                if done {
                    Transition::Idle
                } else {
                    Transition::FadingIn { elapsed_ms }
                }
            }
        };
    }

    /// Disposes replaced primitives once their detach has been handed out.
    fn release_retired(&mut self) {
        if !self.events.is_empty() {
            return;
        }
        for p in self.retired.drain(..) {
            p.borrow_mut().dispose();
        }
    }
}

impl Generator for NeuralGenerator {
    fn kind(&self) -> BackgroundKind {
        BackgroundKind::Neural
    }

    fn create(&mut self) -> PrimitiveRef {
        if let Some(p) = &self.primitive {
            return p.clone();
        }
        let handle = self.build();
        self.primitive = Some(handle.clone());
        handle
    }

    fn update(&mut self, delta_ms: f64) {
        self.release_retired();
        if self.primitive.is_none() || !delta_ms.is_finite() || delta_ms < 0.0 {
            return;
        }
        self.elapsed += delta_ms / 1000.0;
        self.step_transition(delta_ms);
        self.network
            .advance_packets((delta_ms / 1000.0) as f32, self.config.data_flow_speed);
        self.network.pulse(self.elapsed as f32);
        self.refresh();
    }

    fn update_config(&mut self, patch: &Value) -> Result<ConfigChange, RenderError> {
        let next = apply_patch(&self.config, patch)?;
        next.validate()?;
        let target = match &self.transition {
            Transition::FadingOut { pending, .. } => structure_of(pending),
            _ => structure_of(&self.config),
        };
        let structural = structure_of(&next) != target;
        let tweaks_unchanged = next.node_size == self.config.node_size
            && next.data_flow_speed == self.config.data_flow_speed
            && next.colors == self.config.colors;
        if !structural && tweaks_unchanged {
            return Ok(ConfigChange::Unchanged);
        }

        self.config.node_size = next.node_size;
        self.config.data_flow_speed = next.data_flow_speed;
        self.config.colors = next.colors;
        if !structural {
            self.refresh();
            return Ok(ConfigChange::InPlace);
        }

        if self.primitive.is_none() {
            // Nothing on screen yet, so there is nothing to fade.
            self.config = next;
            self.network = generate(&self.config, 1.0, self.aspect);
            return Ok(ConfigChange::Structural);
        }
        let elapsed_ms = match self.transition {
            Transition::FadingOut { elapsed_ms, .. } => elapsed_ms,
            _ => 0.0,
        };
        self.network.set_target_opacity(0.0);
        self.transition = Transition::FadingOut {
            elapsed_ms,
            pending: next,
        };
        self.refresh();
        Ok(ConfigChange::Structural)
    }

    fn config(&self) -> Value {
        let config = match &self.transition {
            Transition::FadingOut { pending, .. } => NeuralConfig {
                node_count: pending.node_count,
                connection_density: pending.connection_density,
                packet_count: pending.packet_count,
                ..self.config.clone()
            },
            _ => self.config.clone(),
        };
        serde_json::to_value(&config).unwrap_or(Value::Null)
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if let Some(p) = &self.primitive {
            p.borrow_mut().visible = visible;
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let aspect = width as f32 / height as f32;
        if aspect == self.aspect {
            return;
        }
        self.aspect = aspect;
        self.relayout();
    }

    fn dispose(&mut self) {
        self.events.clear();
        self.transition = Transition::Idle;
        self.release_retired();
        if let Some(p) = self.primitive.take() {
            p.borrow_mut().dispose();
        }
    }

    fn primitive(&self) -> Option<PrimitiveRef> {
        self.primitive.clone()
    }

    fn drain_scene_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }
}
