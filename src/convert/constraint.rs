//! Cone constraint engine.
//!
//! Each constraint binds one intermediate joint's bone direction to a cone
//! around a reference axis given in the joint's parent space, approximating
//! the joint's physiological range of motion. Violation detection is a
//! separate pass from enforcement so callers can inspect how far out of
//! bounds a bone is before any correction lands.

use glam::{Quat, Vec3};

use super::math::shortest_arc;
use super::JointState;
use crate::error::ConvertError;
use crate::skeleton::topology::{IntJoint, Topology, INT_JOINT_COUNT};
use crate::skeleton::{SkeletonFrame, TrackingState};

/// Hard cap on configured constraints; exceeding it is a setup error.
pub const MAX_CONSTRAINTS: usize = 100;

/// A bone squared-length below this is too short to carry a direction.
const DEGENERATE_BONE_SQ: f32 = 0.001;

/// One cone constraint with its per-frame violation value.
#[derive(Debug, Clone, Copy)]
pub struct JointConstraint {
    pub joint: IntJoint,
    /// Cone axis in the joint's parent-local space (unit).
    pub axis: Vec3,
    /// Cone half-angle in degrees.
    pub half_angle: f32,
    /// `<= 1.0` inside the cone, `> 1.0` outside. Recomputed every frame.
    pub violation: f32,
}

/// Normalized violation of a cone: 0 on the axis, 1 exactly on the surface.
pub(crate) fn cone_violation(axis_ws: Vec3, bone_ws: Vec3, half_angle_deg: f32) -> f32 {
    let denom = 1.0 - half_angle_deg.to_radians().cos();
    if denom <= f32::EPSILON {
        return 0.0;
    }
    (1.0 - axis_ws.dot(bone_ws)) / denom
}

/// Rotate `axis_ws` by the cone half-angle toward `bone_ws`, landing exactly
/// on the cone surface on the bone's side.
pub(crate) fn clamp_to_cone(axis_ws: Vec3, bone_ws: Vec3, half_angle_deg: f32) -> Vec3 {
    let rot_axis = axis_ws.cross(bone_ws);
    let rot_axis = if rot_axis.length() > 1e-6 {
        rot_axis.normalize()
    } else {
        // Bone anti-parallel to the axis: every meridian is equally wrong
        axis_ws.any_orthonormal_vector()
    };
    Quat::from_axis_angle(rot_axis, half_angle_deg.to_radians()) * axis_ws
}

/// The configured constraint set plus the enforcement passes.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    constraints: Vec<JointConstraint>,
}

/// Default biomechanical cone set: (joint, half-angle degrees). Axes are the
/// topology bind directions, so a neutral pose sits at zero violation.
const DEFAULT_CONSTRAINTS: [(IntJoint, f32); 16] = [
    (IntJoint::Spine, 30.0),
    (IntJoint::Chest, 30.0),
    (IntJoint::Neck, 45.0),
    (IntJoint::Head, 45.0),
    (IntJoint::UpperArmLeft, 120.0),
    (IntJoint::ForearmLeft, 155.0),
    (IntJoint::HandLeft, 40.0),
    (IntJoint::UpperArmRight, 120.0),
    (IntJoint::ForearmRight, 155.0),
    (IntJoint::HandRight, 40.0),
    (IntJoint::ThighLeft, 120.0),
    (IntJoint::ShinLeft, 160.0),
    (IntJoint::ThighRight, 120.0),
    (IntJoint::ShinRight, 160.0),
    (IntJoint::FootLeft, 45.0),
    (IntJoint::FootRight, 45.0),
];

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one cone constraint. Fails past [`MAX_CONSTRAINTS`].
    pub fn add(&mut self, joint: IntJoint, axis: Vec3, half_angle_deg: f32) -> Result<(), ConvertError> {
        if self.constraints.len() >= MAX_CONSTRAINTS {
            return Err(ConvertError::TooManyConstraints(MAX_CONSTRAINTS));
        }
        self.constraints.push(JointConstraint {
            joint,
            axis: axis.normalize_or_zero(),
            half_angle: half_angle_deg,
            violation: 0.0,
        });
        Ok(())
    }

    /// Add the default biomechanical set for the given topology.
    pub fn add_defaults(&mut self, topo: &Topology) -> Result<(), ConvertError> {
        for (joint, half_angle) in DEFAULT_CONSTRAINTS {
            self.add(joint, topo.descriptor(joint).bind_dir, half_angle)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JointConstraint> {
        self.constraints.iter()
    }

    pub fn get(&self, index: usize) -> Result<&JointConstraint, ConvertError> {
        self.constraints
            .get(index)
            .ok_or(ConvertError::ConstraintIndex(index))
    }

    /// Run all four passes: violation detection, bone measurement,
    /// enforcement, and top-down world/position reconstruction.
    ///
    /// Returns the constraint-corrected skeleton: positions consistent with
    /// the enforced rotations, independent of raw positions downstream of any
    /// constrained joint.
    pub fn apply(
        &mut self,
        topo: &Topology,
        bind: &[Quat; INT_JOINT_COUNT],
        states: &mut [JointState; INT_JOINT_COUNT],
        frame: &SkeletonFrame,
    ) -> SkeletonFrame {
        self.compute_violations(topo, states, frame);
        measure_bones(topo, states, frame);
        self.enforce(topo, bind, states, frame);
        reconstruct(topo, bind, states, frame)
    }

    /// Pass 1: world-space violation per constraint.
    fn compute_violations(
        &mut self,
        topo: &Topology,
        states: &[JointState; INT_JOINT_COUNT],
        frame: &SkeletonFrame,
    ) {
        for c in &mut self.constraints {
            let desc = topo.descriptor(c.joint);
            let (Some(start), Some(parent)) = (desc.start, desc.parent) else {
                c.violation = 0.0;
                continue;
            };
            let axis_ws = states[parent.index()].world * c.axis;
            let bone = frame.position(desc.end) - frame.position(start);
            let bone_ws = bone.normalize_or_zero();
            c.violation = if bone_ws == Vec3::ZERO {
                0.0
            } else {
                cone_violation(axis_ws, bone_ws, c.half_angle)
            };
        }
    }

    /// Pass 3: clamp out-of-cone bones onto the cone surface.
    fn enforce(
        &self,
        topo: &Topology,
        bind: &[Quat; INT_JOINT_COUNT],
        states: &mut [JointState; INT_JOINT_COUNT],
        frame: &SkeletonFrame,
    ) {
        for c in &self.constraints {
            if c.violation <= 1.0 {
                continue;
            }
            let desc = topo.descriptor(c.joint);
            let (Some(start), Some(parent)) = (desc.start, desc.parent) else {
                continue;
            };
            let idx = c.joint.index();

            if states[idx].tracking == TrackingState::NotTracked
                || states[idx].local_bone.length_squared() < DEGENERATE_BONE_SQ
            {
                // A direction that doesn't exist can't be constrained
                states[idx].local = Quat::IDENTITY;
                continue;
            }

            let parent_world = states[parent.index()].world;
            let axis_ws = parent_world * c.axis;
            let bone_ws = (frame.position(desc.end) - frame.position(start)).normalize_or_zero();
            let clamped_ws = clamp_to_cone(axis_ws, bone_ws, c.half_angle);

            let local_dir = (parent_world * bind[idx]).inverse() * clamped_ws;
            states[idx].local = shortest_arc(desc.bind_dir, local_dir);
        }
    }
}

/// Pass 2: per-joint bone length and parent-local bone vector.
fn measure_bones(
    topo: &Topology,
    states: &mut [JointState; INT_JOINT_COUNT],
    frame: &SkeletonFrame,
) {
    for joint in IntJoint::ALL {
        let desc = topo.descriptor(joint);
        let idx = joint.index();
        let Some(start) = desc.start else {
            states[idx].bone_length = 0.0;
            states[idx].local_bone = Vec3::ZERO;
            continue;
        };
        let bone = frame.position(desc.end) - frame.position(start);
        states[idx].bone_length = bone.length();
        let parent_world = desc
            .parent
            .map(|p| states[p.index()].world)
            .unwrap_or(Quat::IDENTITY);
        states[idx].local_bone = parent_world.inverse() * bone;
    }
}

/// Pass 4: recompute world rotations top-down and rebuild joint positions
/// from bone lengths and bind directions.
fn reconstruct(
    topo: &Topology,
    bind: &[Quat; INT_JOINT_COUNT],
    states: &mut [JointState; INT_JOINT_COUNT],
    frame: &SkeletonFrame,
) -> SkeletonFrame {
    let mut corrected = frame.clone();

    // Table order puts parents before children, so one forward walk suffices
    for joint in IntJoint::ALL {
        let idx = joint.index();
        let desc = topo.descriptor(joint);
        states[idx].world = match desc.parent {
            Some(p) => (states[p.index()].world * bind[idx] * states[idx].local).normalize(),
            None => states[idx].local,
        };

        if let Some(start) = desc.start {
            let offset = states[idx].world * desc.bind_dir * states[idx].bone_length;
            let start_pos = corrected.position(start);
            corrected.set_position(desc.end, start_pos + offset);
        }
    }

    corrected
}
