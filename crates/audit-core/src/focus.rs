//! Graph focus coordination
//!
//! Decides where the camera rig should go when the operator (or an
//! analysis) focuses a node, and drives an [`Animator`] there. The
//! coordinator never touches a rendering surface itself:
//! - at most one transition runs at a time (per rig part)
//! - a new focus interrupts whatever is running
//! - `focus(None)` returns to the default pose and resumes auto-rotation

use crate::config::FocusConfig;
use audit_model::NodeRef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Point in scene space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3 {
    /// X
    pub x: f64,
    /// Y
    pub y: f64,
    /// Z
    pub z: f64,
}

impl Vec3 {
    /// Origin
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    /// Create point
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// All components finite
    #[inline]
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

/// Easing curve for rig transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Easing {
    /// Constant speed
    Linear,
    /// Cubic ease-in/ease-out (focus transitions)
    InOutCubic,
    /// Quadratic ease-out (return to default pose)
    OutQuad,
}

impl Easing {
    /// Progress at normalised time `t` (clamped to [0, 1])
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

/// Which part of the camera rig a transition moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RigPart {
    /// Camera position
    Camera,
    /// Orbit controls look-at anchor
    OrbitAnchor,
}

/// A running transition
pub trait AnimationHandle: Send + Sync {
    /// Stop the transition where it is
    fn cancel(&mut self);

    /// Whether the transition has completed or been cancelled
    fn is_finished(&self) -> bool;
}

/// Rendering-side animation driver
pub trait Animator: Send + Sync {
    /// Start moving `part` toward `target`
    fn animate_to(
        &self,
        part: RigPart,
        target: Vec3,
        duration: Duration,
        easing: Easing,
    ) -> Box<dyn AnimationHandle>;

    /// Toggle idle auto-rotation of the orbit controls
    fn set_auto_rotate(&self, enabled: bool);
}

/// Known node positions
///
/// External layout data; the coordinator only looks positions up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeRegistry {
    positions: IndexMap<NodeRef, Vec3>,
}

impl NodeRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or move a node
    #[must_use]
    pub fn with_node(mut self, node: NodeRef, position: Vec3) -> Self {
        self.positions.insert(node, position);
        self
    }

    /// Position of a node, if known
    #[inline]
    #[must_use]
    pub fn position(&self, node: &NodeRef) -> Option<Vec3> {
        self.positions.get(node).copied()
    }

    /// Nodes in registration order
    pub fn nodes(&self) -> impl Iterator<Item = (&NodeRef, Vec3)> {
        self.positions.iter().map(|(k, v)| (k, *v))
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl FromIterator<(NodeRef, Vec3)> for NodeRegistry {
    fn from_iter<I: IntoIterator<Item = (NodeRef, Vec3)>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

/// What a `focus` call did
#[derive(Debug, Clone, PartialEq)]
pub enum FocusChange {
    /// Same target as before, nothing started
    Unchanged,
    /// Transition toward a known node started
    Focused {
        /// New target
        target: NodeRef,
        /// Node position the anchor moves to
        position: Vec3,
    },
    /// Target recorded but position unknown; rig returned to default pose
    UnknownPosition {
        /// New target
        target: NodeRef,
    },
    /// Target cleared; rig returned to default pose
    Reset,
}

/// Maps focus requests onto camera rig transitions
pub struct GraphFocusCoordinator {
    animator: Arc<dyn Animator>,
    registry: NodeRegistry,
    config: FocusConfig,
    target: Option<NodeRef>,
    running: Vec<Box<dyn AnimationHandle>>,
    auto_rotate: bool,
}

impl std::fmt::Debug for GraphFocusCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphFocusCoordinator")
            .field("target", &self.target)
            .field("running", &self.running.len())
            .field("auto_rotate", &self.auto_rotate)
            .finish_non_exhaustive()
    }
}

impl GraphFocusCoordinator {
    /// Create coordinator in the default pose with auto-rotation on
    #[must_use]
    pub fn new(animator: Arc<dyn Animator>, registry: NodeRegistry, config: FocusConfig) -> Self {
        animator.set_auto_rotate(true);
        Self {
            animator,
            registry,
            config,
            target: None,
            running: Vec::new(),
            auto_rotate: true,
        }
    }

    /// Focus a node, or return to the default pose with `None`
    pub fn focus(&mut self, node: Option<NodeRef>) -> FocusChange {
        let Some(node) = node else {
            self.target = None;
            self.return_to_default();
            tracing::debug!("focus reset to default pose");
            return FocusChange::Reset;
        };

        if self.target.as_ref() == Some(&node) {
            return FocusChange::Unchanged;
        }

        self.target = Some(node.clone());
        match self.registry.position(&node) {
            Some(position) => {
                self.interrupt();
                let duration = Duration::from_millis(self.config.transition_ms);
                let camera = position + self.config.camera_offset;
                self.start(RigPart::Camera, camera, duration, Easing::InOutCubic);
                self.start(RigPart::OrbitAnchor, position, duration, Easing::InOutCubic);
                self.set_auto_rotate(false);
                tracing::debug!(node = %node, ?position, "focus transition started");
                FocusChange::Focused {
                    target: node,
                    position,
                }
            }
            None => {
                self.return_to_default();
                tracing::debug!(node = %node, "focus target has no known position");
                FocusChange::UnknownPosition { target: node }
            }
        }
    }

    /// Logical focus target
    #[inline]
    #[must_use]
    pub fn target(&self) -> Option<&NodeRef> {
        self.target.as_ref()
    }

    /// Whether idle auto-rotation is on
    #[inline]
    #[must_use]
    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    /// Whether any transition is still running
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.running.iter().any(|h| !h.is_finished())
    }

    /// Node layout in use
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    fn return_to_default(&mut self) {
        self.interrupt();
        let duration = Duration::from_millis(self.config.reset_ms);
        self.start(RigPart::Camera, self.config.default_camera, duration, Easing::OutQuad);
        self.start(RigPart::OrbitAnchor, self.config.default_anchor, duration, Easing::OutQuad);
        self.set_auto_rotate(true);
    }

    fn interrupt(&mut self) {
        for mut handle in self.running.drain(..) {
            if !handle.is_finished() {
                handle.cancel();
            }
        }
    }

    fn start(&mut self, part: RigPart, target: Vec3, duration: Duration, easing: Easing) {
        let handle = self.animator.animate_to(part, target, duration, easing);
        self.running.push(handle);
    }

    fn set_auto_rotate(&mut self, enabled: bool) {
        self.auto_rotate = enabled;
        self.animator.set_auto_rotate(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Default)]
    struct Flag(Arc<AtomicBool>);

    impl AnimationHandle for Flag {
        fn cancel(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }

        fn is_finished(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(RigPart, Vec3, Easing)>>,
        flags: Mutex<Vec<Arc<AtomicBool>>>,
        auto_rotate: Mutex<Option<bool>>,
    }

    impl Animator for Recorder {
        fn animate_to(
            &self,
            part: RigPart,
            target: Vec3,
            _duration: Duration,
            easing: Easing,
        ) -> Box<dyn AnimationHandle> {
            self.calls.lock().push((part, target, easing));
            let flag = Arc::new(AtomicBool::new(false));
            self.flags.lock().push(Arc::clone(&flag));
            Box::new(Flag(flag))
        }

        fn set_auto_rotate(&self, enabled: bool) {
            *self.auto_rotate.lock() = Some(enabled);
        }
    }

    fn setup() -> (Arc<Recorder>, GraphFocusCoordinator) {
        let recorder = Arc::new(Recorder::default());
        let registry = NodeRegistry::new()
            .with_node(NodeRef::taxpayer("GSTIN_B"), Vec3::new(0.0, 2.0, 0.0))
            .with_node(NodeRef::invoice("INV-BD-1"), Vec3::new(0.0, -1.0, 1.0));
        let coord = GraphFocusCoordinator::new(
            Arc::clone(&recorder) as Arc<dyn Animator>,
            registry,
            FocusConfig::default(),
        );
        (recorder, coord)
    }

    #[test]
    fn easing_endpoints() {
        for easing in [Easing::Linear, Easing::InOutCubic, Easing::OutQuad] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
            assert_eq!(easing.apply(2.0), 1.0);
        }
        assert_eq!(Easing::InOutCubic.apply(0.5), 0.5);
        assert!(Easing::OutQuad.apply(0.5) > 0.5);
    }

    #[test]
    fn focus_known_node_moves_camera_with_offset() {
        let (recorder, mut coord) = setup();

        let change = coord.focus(Some(NodeRef::taxpayer("GSTIN_B")));
        assert!(matches!(change, FocusChange::Focused { .. }));
        assert!(!coord.auto_rotate());
        assert_eq!(*recorder.auto_rotate.lock(), Some(false));

        let calls = recorder.calls.lock();
        assert_eq!(
            calls[0],
            (RigPart::Camera, Vec3::new(0.0, 4.0, 4.0), Easing::InOutCubic)
        );
        assert_eq!(
            calls[1],
            (RigPart::OrbitAnchor, Vec3::new(0.0, 2.0, 0.0), Easing::InOutCubic)
        );
    }

    #[test]
    fn same_target_is_noop() {
        let (recorder, mut coord) = setup();
        coord.focus(Some(NodeRef::taxpayer("GSTIN_B")));
        let before = recorder.calls.lock().len();

        assert_eq!(
            coord.focus(Some(NodeRef::taxpayer("GSTIN_B"))),
            FocusChange::Unchanged
        );
        assert_eq!(recorder.calls.lock().len(), before);
    }

    #[test]
    fn new_target_interrupts_running_transition() {
        let (recorder, mut coord) = setup();
        coord.focus(Some(NodeRef::taxpayer("GSTIN_B")));
        coord.focus(Some(NodeRef::invoice("INV-BD-1")));

        let flags = recorder.flags.lock();
        assert!(flags[0].load(Ordering::SeqCst));
        assert!(flags[1].load(Ordering::SeqCst));
        assert!(!flags[2].load(Ordering::SeqCst));
        assert!(coord.is_animating());
    }

    #[test]
    fn reset_restores_default_pose() {
        let (recorder, mut coord) = setup();
        coord.focus(Some(NodeRef::taxpayer("GSTIN_B")));

        assert_eq!(coord.focus(None), FocusChange::Reset);
        assert!(coord.target().is_none());
        assert!(coord.auto_rotate());

        let calls = recorder.calls.lock();
        let last_two = &calls[calls.len() - 2..];
        assert_eq!(
            last_two[0],
            (RigPart::Camera, Vec3::new(0.0, 0.0, 15.0), Easing::OutQuad)
        );
        assert_eq!(last_two[1], (RigPart::OrbitAnchor, Vec3::ZERO, Easing::OutQuad));
    }

    #[test]
    fn unknown_node_is_recorded_but_positioned_as_reset() {
        let (recorder, mut coord) = setup();
        coord.focus(Some(NodeRef::taxpayer("GSTIN_B")));

        let change = coord.focus(Some(NodeRef::taxpayer("GSTIN_ZZ")));
        assert_eq!(
            change,
            FocusChange::UnknownPosition {
                target: NodeRef::taxpayer("GSTIN_ZZ")
            }
        );
        assert_eq!(coord.target(), Some(&NodeRef::taxpayer("GSTIN_ZZ")));
        assert!(coord.auto_rotate());

        let calls = recorder.calls.lock();
        assert_eq!(calls.last().unwrap().1, Vec3::ZERO);
    }

    #[test]
    fn vec3_deserialises_from_array() {
        let v: Vec3 = serde_json::from_str("[1.0, 2.5, -3.0]").unwrap();
        assert_eq!(v, Vec3::new(1.0, 2.5, -3.0));
    }
}
