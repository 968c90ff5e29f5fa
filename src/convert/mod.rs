//! Joint conversion pipeline
//!
//! Turns raw camera skeleton samples into avatar joint rotations:
//! collision correction, axis scaling, per-bone rotation computation against
//! the bind pose, optional orientation filtering, cone constraint
//! enforcement, and retarget-map extraction.

pub mod avatar;
pub mod collision;
pub mod constraint;
pub mod filter;
pub mod math;

pub use avatar::{AvatarJointTransform, AvatarPose};
pub use constraint::{ConstraintSet, JointConstraint, MAX_CONSTRAINTS};
pub use filter::FilterState;

use glam::{Quat, Vec3};

use crate::error::ConvertError;
use crate::skeleton::topology::{IntJoint, Topology, INT_JOINT_COUNT};
use crate::skeleton::{RawJoint, SkeletonFrame, TrackingState};

/// Per-joint mutable state, double-buffered across frames.
#[derive(Debug, Clone, Copy)]
pub struct JointState {
    pub(crate) local: Quat,
    pub(crate) world: Quat,
    pub(crate) local_bone: Vec3,
    pub(crate) bone_length: f32,
    pub(crate) tracking: TrackingState,
    pub(crate) filter: FilterState,
}

impl Default for JointState {
    fn default() -> Self {
        Self {
            local: Quat::IDENTITY,
            world: Quat::IDENTITY,
            local_bone: Vec3::ZERO,
            bone_length: 0.0,
            tracking: TrackingState::NotTracked,
            filter: FilterState::default(),
        }
    }
}

/// Default joint scale: pass-through X/Y, mirror Z (camera space → app
/// space handedness).
pub const DEFAULT_JOINT_SCALE: Vec3 = Vec3::new(1.0, 1.0, -1.0);

/// The per-frame skeleton → avatar converter.
///
/// Owns all mutable state exclusively; one instance is driven by one calling
/// thread, one `convert` call per input frame.
pub struct JointConverter {
    topology: Topology,
    bind: [Quat; INT_JOINT_COUNT],
    joint_scale: Vec3,
    constraints: ConstraintSet,
    /// Latest frame's joint state (read by getters).
    states: [JointState; INT_JOINT_COUNT],
    /// Previous frame's joint state; swapped in at the end of each convert.
    scratch: [JointState; INT_JOINT_COUNT],
    corrected: SkeletonFrame,
    root_position: Vec3,
    pose: AvatarPose,
}

impl JointConverter {
    /// Build a converter around an explicit topology.
    pub fn new(topology: Topology) -> Result<Self, ConvertError> {
        topology.validate()?;
        Ok(Self {
            topology,
            bind: [Quat::IDENTITY; INT_JOINT_COUNT],
            joint_scale: DEFAULT_JOINT_SCALE,
            constraints: ConstraintSet::new(),
            states: [JointState::default(); INT_JOINT_COUNT],
            scratch: [JointState::default(); INT_JOINT_COUNT],
            corrected: SkeletonFrame::new(),
            root_position: Vec3::ZERO,
            pose: AvatarPose::default(),
        })
    }

    /// Converter over the standard topology.
    pub fn standard() -> Self {
        // The built-in table always validates
        Self::new(Topology::standard()).expect("standard topology is valid")
    }

    /// Set one joint's bind-pose calibration rotation.
    pub fn set_bind_pose(&mut self, joint: IntJoint, rotation: Quat) {
        self.bind[joint.index()] = rotation.normalize();
    }

    /// Current bind-pose calibration rotation of a joint.
    pub fn bind_pose(&self, joint: IntJoint) -> Quat {
        self.bind[joint.index()]
    }

    /// Set the global joint scale applied to every raw position.
    pub fn set_joint_scale(&mut self, scale: Vec3) {
        self.joint_scale = scale;
    }

    pub fn joint_scale(&self) -> Vec3 {
        self.joint_scale
    }

    /// Add a cone constraint (axis in the joint's parent-local space, cone
    /// half-angle in degrees).
    pub fn add_constraint(
        &mut self,
        joint: IntJoint,
        axis: Vec3,
        half_angle_deg: f32,
    ) -> Result<(), ConvertError> {
        self.constraints.add(joint, axis, half_angle_deg)
    }

    /// Add the default biomechanical constraint set.
    pub fn add_default_constraints(&mut self) -> Result<(), ConvertError> {
        self.constraints.add_defaults(&self.topology)
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn constraint(&self, index: usize) -> Result<&JointConstraint, ConvertError> {
        self.constraints.get(index)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Latest local rotation of an intermediate joint.
    pub fn local_rotation(&self, joint: IntJoint) -> Quat {
        self.states[joint.index()].local
    }

    /// Latest world rotation of an intermediate joint.
    pub fn world_rotation(&self, joint: IntJoint) -> Quat {
        self.states[joint.index()].world
    }

    /// Latest converted avatar pose.
    pub fn avatar_pose(&self) -> &AvatarPose {
        &self.pose
    }

    /// Constraint-corrected skeleton with the Z flip applied on egress
    /// (coordinate convention adapter for the consuming renderer).
    pub fn corrected_skeleton(&self) -> SkeletonFrame {
        let mut out = self.corrected.clone();
        out.scale(Vec3::new(1.0, 1.0, -1.0));
        out
    }

    /// Process one raw skeleton frame to completion.
    ///
    /// `filtering` selects the orientation filter per call; filter state is
    /// only advanced while it is enabled.
    pub fn convert(&mut self, frame: &SkeletonFrame, filtering: bool) -> &AvatarPose {
        // Working copy: the caller's sample is never aliased or mutated
        let mut working = frame.clone();
        collision::resolve(&mut working);
        working.scale(self.joint_scale);

        let mut next = [JointState::default(); INT_JOINT_COUNT];
        self.compute_rotations(&working, &mut next);

        if filtering {
            self.apply_filter(&mut next);
        } else {
            for idx in 0..INT_JOINT_COUNT {
                next[idx].filter = self.states[idx].filter;
            }
        }

        self.corrected = self
            .constraints
            .apply(&self.topology, &self.bind, &mut next, &working);

        if working.state(RawJoint::HipCenter) != TrackingState::NotTracked {
            self.root_position = working.position(RawJoint::HipCenter);
        }

        self.pose = avatar::extract(&next, self.root_position, &self.corrected);

        // Swap, don't copy: the previous frame's filter state stayed intact
        // through the whole computation above and is replaced only now
        self.scratch = next;
        std::mem::swap(&mut self.states, &mut self.scratch);

        &self.pose
    }

    /// Derive local/world rotations for all joints from the working frame.
    fn compute_rotations(&self, frame: &SkeletonFrame, next: &mut [JointState; INT_JOINT_COUNT]) {
        // Root: hip line projected onto the horizontal plane, mapped from
        // the canonical +X axis. Keeps the root reference stable under
        // forward-facing drift.
        let mut hip_line = frame.position(RawJoint::HipRight) - frame.position(RawJoint::HipLeft);
        hip_line.y = 0.0;
        let base_rot = math::shortest_arc(Vec3::X, hip_line);
        let base = &mut next[IntJoint::Base.index()];
        base.local = base_rot;
        base.world = base_rot;
        base.tracking = frame.worst_state(RawJoint::HipLeft, RawJoint::HipRight);

        // Table order guarantees parents are computed first
        for joint in IntJoint::ALL {
            let desc = self.topology.descriptor(joint);
            let (Some(start), Some(parent)) = (desc.start, desc.parent) else {
                continue;
            };
            let idx = joint.index();

            let tracking = frame.worst_state(start, desc.end);
            next[idx].tracking = tracking;

            let frame_rot = next[parent.index()].world * self.bind[idx];
            if tracking == TrackingState::NotTracked {
                next[idx].local = Quat::IDENTITY;
                next[idx].world = frame_rot.normalize();
                continue;
            }

            let bone_ws = (frame.position(desc.end) - frame.position(start)).normalize_or_zero();
            let local_dir = frame_rot.inverse() * bone_ws;
            next[idx].local = math::shortest_arc(desc.bind_dir, local_dir);
            next[idx].world = (frame_rot * next[idx].local).normalize();
        }
    }

    /// Replace each local rotation with its filtered prediction and re-derive
    /// world rotations from the filtered parents.
    ///
    /// The bind-pose term is deliberately absent from this composition: the
    /// filter operates in an already bind-pose-relative frame.
    fn apply_filter(&self, next: &mut [JointState; INT_JOINT_COUNT]) {
        for joint in IntJoint::ALL {
            let idx = joint.index();
            let (predicted, filter) = self.states[idx].filter.step(next[idx].local);
            next[idx].local = predicted;
            next[idx].filter = filter;
            next[idx].world = match self.topology.parent(joint) {
                Some(p) => (next[p.index()].world * predicted).normalize(),
                None => predicted,
            };
        }
    }
}

impl Default for JointConverter {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use math::angle_between;

    /// Bone lengths (meters) indexed by intermediate joint.
    fn bone_length(joint: IntJoint) -> f32 {
        match joint {
            IntJoint::Base => 0.0,
            IntJoint::Spine | IntJoint::Chest => 0.25,
            IntJoint::Neck | IntJoint::Head => 0.15,
            IntJoint::CollarLeft | IntJoint::CollarRight => 0.2,
            IntJoint::UpperArmLeft | IntJoint::UpperArmRight => 0.3,
            IntJoint::ForearmLeft | IntJoint::ForearmRight => 0.27,
            IntJoint::HandLeft | IntJoint::HandRight => 0.09,
            IntJoint::HipLeft | IntJoint::HipRight => 0.12,
            IntJoint::ThighLeft | IntJoint::ThighRight => 0.42,
            IntJoint::ShinLeft | IntJoint::ShinRight => 0.4,
            IntJoint::FootLeft | IntJoint::FootRight => 0.2,
        }
    }

    /// App-space joint positions for an exact bind pose (T-pose) skeleton.
    fn bind_pose_positions(topo: &Topology) -> [Vec3; crate::skeleton::RAW_JOINT_COUNT] {
        let mut pos = [Vec3::ZERO; crate::skeleton::RAW_JOINT_COUNT];
        let mut set = [false; crate::skeleton::RAW_JOINT_COUNT];
        pos[RawJoint::HipCenter.index()] = Vec3::new(0.0, 0.9, 0.0);
        set[RawJoint::HipCenter.index()] = true;

        for joint in IntJoint::ALL {
            let desc = topo.descriptor(joint);
            let Some(start) = desc.start else { continue };
            if set[desc.end.index()] {
                continue;
            }
            pos[desc.end.index()] = pos[start.index()] + desc.bind_dir * bone_length(joint);
            set[desc.end.index()] = true;
        }
        pos
    }

    /// The bind pose as a camera-space frame (inverse of the default scale).
    fn bind_pose_frame(topo: &Topology) -> SkeletonFrame {
        let pos = bind_pose_positions(topo);
        let mut frame = SkeletonFrame::new();
        for joint in RawJoint::ALL {
            let p = pos[joint.index()];
            frame.set_joint(joint, Vec3::new(p.x, p.y, -p.z), TrackingState::Tracked);
        }
        frame
    }

    #[test]
    fn test_bind_pose_yields_identity_rotations() {
        let topo = Topology::standard();
        let frame = bind_pose_frame(&topo);
        let mut conv = JointConverter::standard();
        conv.convert(&frame, false);

        for joint in IntJoint::ALL {
            let angle = angle_between(conv.local_rotation(joint), Quat::IDENTITY);
            assert!(angle < 0.01, "{} local off identity by {angle}", joint.name());
        }
    }

    #[test]
    fn test_t_pose_violates_no_default_constraint() {
        let topo = Topology::standard();
        let frame = bind_pose_frame(&topo);
        let mut conv = JointConverter::standard();
        conv.add_default_constraints().unwrap();
        conv.convert(&frame, false);

        let violated = conv.constraints().iter().filter(|c| c.violation > 1.0).count();
        assert_eq!(violated, 0, "T-pose must sit inside every default cone");

        // End-to-end: every retargeted avatar rotation is identity and the
        // root lands on the hip center
        for (joint, xf) in conv.avatar_pose().iter() {
            let angle = angle_between(xf.rotation, Quat::IDENTITY);
            assert!(angle < 0.02, "{joint:?} rotation off identity by {angle}");
        }
        let root = conv.avatar_pose().root_position();
        assert!((root - Vec3::new(0.0, 0.9, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_fully_untracked_frame_collapses_to_identity() {
        let mut conv = JointConverter::standard();
        conv.add_default_constraints().unwrap();
        conv.convert(&SkeletonFrame::new(), false);

        for joint in IntJoint::ALL {
            assert!(angle_between(conv.local_rotation(joint), Quat::IDENTITY) < 1e-5);
            assert!(angle_between(conv.world_rotation(joint), Quat::IDENTITY) < 1e-5);
        }
        for c in conv.constraints().iter() {
            assert!(c.violation <= 1.0, "{:?} violated on empty input", c.joint);
        }
    }

    #[test]
    fn test_out_of_cone_bone_is_clamped_to_surface() {
        let topo = Topology::standard();
        let mut pos = bind_pose_positions(&topo);

        // Bend the head sideways far past the neck's 45° cone
        let sc = pos[RawJoint::ShoulderCenter.index()];
        pos[RawJoint::Head.index()] =
            sc + Vec3::new(0.3, 0.01, 0.0).normalize() * bone_length(IntJoint::Neck);

        let mut frame = SkeletonFrame::new();
        for joint in RawJoint::ALL {
            let p = pos[joint.index()];
            frame.set_joint(joint, Vec3::new(p.x, p.y, -p.z), TrackingState::Tracked);
        }

        let mut conv = JointConverter::standard();
        conv.add_default_constraints().unwrap();
        conv.convert(&frame, false);

        let neck = conv
            .constraints()
            .iter()
            .find(|c| c.joint == IntJoint::Neck)
            .unwrap();
        assert!(neck.violation > 1.0, "violation {}", neck.violation);

        // The enforced bone direction must land exactly on the cone surface
        let bone_ws = conv.world_rotation(IntJoint::Neck) * topo.descriptor(IntJoint::Neck).bind_dir;
        let axis_ws = conv.world_rotation(IntJoint::Chest) * neck.axis;
        let angle = axis_ws.dot(bone_ws).clamp(-1.0, 1.0).acos().to_degrees();
        assert!((angle - neck.half_angle).abs() < 0.5, "clamped to {angle}°");
    }

    #[test]
    fn test_within_cone_enforcement_is_idempotent() {
        let topo = Topology::standard();
        let frame = bind_pose_frame(&topo);

        let mut constrained = JointConverter::standard();
        constrained.add_default_constraints().unwrap();
        constrained.convert(&frame, false);

        let mut free = JointConverter::standard();
        free.convert(&frame, false);

        for joint in IntJoint::ALL {
            let diff = angle_between(
                constrained.local_rotation(joint),
                free.local_rotation(joint),
            );
            assert!(diff < 1e-4, "{} changed by in-cone enforcement", joint.name());
        }
    }

    #[test]
    fn test_corrected_skeleton_flips_z_on_egress() {
        let topo = Topology::standard();
        let frame = bind_pose_frame(&topo);
        let mut conv = JointConverter::standard();
        conv.convert(&frame, false);

        // Feet point +Z internally, so the egress frame reports them at -Z
        let foot = conv.corrected_skeleton().position(RawJoint::FootLeft);
        assert!(foot.z < -0.15, "egress foot z {}", foot.z);
    }

    #[test]
    fn test_filtering_converges_on_static_pose() {
        let topo = Topology::standard();
        let frame = bind_pose_frame(&topo);
        let mut conv = JointConverter::standard();
        for _ in 0..10 {
            conv.convert(&frame, true);
        }
        for joint in IntJoint::ALL {
            let angle = angle_between(conv.local_rotation(joint), Quat::IDENTITY);
            assert!(angle < 0.02, "{} filtered to {angle}", joint.name());
        }
    }

    #[test]
    fn test_filter_state_not_advanced_when_disabled() {
        let topo = Topology::standard();
        let frame = bind_pose_frame(&topo);
        let mut conv = JointConverter::standard();
        conv.convert(&frame, false);
        conv.convert(&frame, false);
        assert_eq!(conv.states[IntJoint::Neck.index()].filter.started, 0);

        conv.convert(&frame, true);
        assert_eq!(conv.states[IntJoint::Neck.index()].filter.started, 1);
    }

    #[test]
    fn test_root_position_holds_last_known_when_untracked() {
        let topo = Topology::standard();
        let frame = bind_pose_frame(&topo);
        let mut conv = JointConverter::standard();
        conv.convert(&frame, false);
        let root = conv.avatar_pose().root_position();
        assert!((root - Vec3::new(0.0, 0.9, 0.0)).length() < 1e-4);

        conv.convert(&SkeletonFrame::new(), false);
        assert_eq!(conv.avatar_pose().root_position(), root);
    }

    #[test]
    fn test_calibrated_bind_pose_recovers_identity_local() {
        let topo = Topology::standard();
        let mut pos = bind_pose_positions(&topo);

        // A user whose rest pose holds the left forearm rotated 0.5 rad about
        // Z: place the wrist along the calibrated bind direction
        let calibration = Quat::from_rotation_z(0.5);
        pos[RawJoint::WristLeft.index()] = pos[RawJoint::ElbowLeft.index()]
            + calibration * Vec3::new(-1.0, 0.0, 0.0) * bone_length(IntJoint::ForearmLeft);

        let mut frame = SkeletonFrame::new();
        for joint in RawJoint::ALL {
            let p = pos[joint.index()];
            frame.set_joint(joint, Vec3::new(p.x, p.y, -p.z), TrackingState::Tracked);
        }

        // Without calibration the forearm reads as bent by the full 0.5 rad
        let mut plain = JointConverter::standard();
        plain.convert(&frame, false);
        let uncalibrated = angle_between(plain.local_rotation(IntJoint::ForearmLeft), Quat::IDENTITY);
        assert!(uncalibrated > 0.4, "expected a bent forearm, got {uncalibrated}");

        // With the calibration installed the same frame is the rest pose
        let mut conv = JointConverter::standard();
        conv.set_bind_pose(IntJoint::ForearmLeft, calibration);
        assert!(angle_between(conv.bind_pose(IntJoint::ForearmLeft), calibration) < 1e-6);
        conv.convert(&frame, false);
        let angle = angle_between(conv.local_rotation(IntJoint::ForearmLeft), Quat::IDENTITY);
        assert!(angle < 0.01, "calibrated forearm local off identity by {angle}");
    }

    #[test]
    fn test_tilted_bind_direction_recovers_identity_local() {
        // Calibrate the left foot's rest bone direction to point forward-down
        let mut topo = Topology::standard();
        topo.set_bind_direction(IntJoint::FootLeft, Vec3::new(0.0, -0.5, 1.0));
        let frame = bind_pose_frame(&topo);

        let mut conv = JointConverter::new(topo).unwrap();
        conv.convert(&frame, false);
        let angle = angle_between(conv.local_rotation(IntJoint::FootLeft), Quat::IDENTITY);
        assert!(angle < 0.01, "calibrated foot local off identity by {angle}");

        // The stock table reads the same frame as a tilted foot
        let mut plain = JointConverter::standard();
        plain.convert(&frame, false);
        let stock = angle_between(plain.local_rotation(IntJoint::FootLeft), Quat::IDENTITY);
        assert!(stock > 0.4, "expected a tilted foot, got {stock}");
    }

    #[test]
    fn test_custom_scale_is_applied() {
        let topo = Topology::standard();
        let frame = bind_pose_frame(&topo);
        let mut conv = JointConverter::standard();
        conv.set_joint_scale(Vec3::new(2.0, 2.0, -2.0));
        conv.convert(&frame, false);
        let root = conv.avatar_pose().root_position();
        assert!((root - Vec3::new(0.0, 1.8, 0.0)).length() < 1e-4);
    }
}
