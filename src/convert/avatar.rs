//! Avatar rotation extraction.
//!
//! Converts the intermediate skeleton's world rotations into avatar-local
//! rotations via the retarget map, sets the root position, and applies a
//! wrist-twist heuristic. Avatar joints outside the map keep identity.

use glam::{Quat, Vec3};

use crate::skeleton::retarget::{AvatarJoint, AVATAR_JOINT_COUNT, RETARGET_MAP};
use crate::skeleton::topology::INT_JOINT_COUNT;
use crate::skeleton::{RawJoint, SkeletonFrame};

use super::JointState;

/// Position, rotation, and scale of one avatar joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvatarJointTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for AvatarJointTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// One converted frame's full avatar joint set.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarPose {
    joints: [AvatarJointTransform; AVATAR_JOINT_COUNT],
}

impl Default for AvatarPose {
    fn default() -> Self {
        Self {
            joints: [AvatarJointTransform::default(); AVATAR_JOINT_COUNT],
        }
    }
}

impl AvatarPose {
    #[inline]
    pub fn joint(&self, joint: AvatarJoint) -> &AvatarJointTransform {
        &self.joints[joint.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (AvatarJoint, &AvatarJointTransform)> {
        AvatarJoint::ALL.iter().map(move |j| (*j, &self.joints[j.index()]))
    }

    /// Root (hips) world position.
    pub fn root_position(&self) -> Vec3 {
        self.joints[AvatarJoint::Hips.index()].position
    }
}

/// Build the avatar pose from final intermediate world rotations.
///
/// `root_position` is the hip-center position (or the converter's fallback
/// when hip-center is untracked); `corrected` is the constraint-corrected
/// skeleton used by the wrist heuristic.
pub fn extract(
    states: &[JointState; INT_JOINT_COUNT],
    root_position: Vec3,
    corrected: &SkeletonFrame,
) -> AvatarPose {
    let mut pose = AvatarPose::default();

    // Copy world rotations into the mapped avatar joints
    for entry in &RETARGET_MAP {
        pose.joints[entry.avatar_joint.index()].rotation = states[entry.int_joint.index()].world;
    }

    modify_wrists(&mut pose, corrected);

    // World → local, walking the map in reverse so every child is converted
    // while its parent still holds a world rotation
    for entry in RETARGET_MAP.iter().skip(1).rev() {
        let world = pose.joints[entry.avatar_joint.index()].rotation;
        let parent_world = pose.joints[entry.avatar_parent.index()].rotation;
        pose.joints[entry.avatar_joint.index()].rotation =
            (parent_world.inverse() * world).normalize();
    }

    pose.joints[AvatarJoint::Hips.index()].position = root_position;
    pose
}

/// Forearm-twist compensation angle.
///
/// The camera cannot observe forearm roll, so a raised straight arm renders
/// with the palm facing whichever way the wrist happened to track. Blend a
/// twist from how high the upper arm points and how straight the elbow is,
/// so the hand faces forward during arm-raising gestures. An explicit
/// approximation, not an inverse-kinematics solution.
pub(crate) fn wrist_twist(upper_dir: Vec3, fore_dir: Vec3) -> f32 {
    let upper = upper_dir.normalize_or_zero();
    let fore = fore_dir.normalize_or_zero();
    if upper == Vec3::ZERO || fore == Vec3::ZERO {
        return 0.0;
    }
    let raise = upper.y.clamp(-1.0, 1.0).asin().max(0.0);
    let bend = upper.dot(fore).clamp(-1.0, 1.0).acos();
    raise * (1.0 - bend / std::f32::consts::PI)
}

/// Twist each hand's world rotation about its forearm axis.
fn modify_wrists(pose: &mut AvatarPose, corrected: &SkeletonFrame) {
    let sides = [
        (
            RawJoint::ShoulderLeft,
            RawJoint::ElbowLeft,
            RawJoint::WristLeft,
            AvatarJoint::LeftHand,
            1.0,
        ),
        (
            RawJoint::ShoulderRight,
            RawJoint::ElbowRight,
            RawJoint::WristRight,
            AvatarJoint::RightHand,
            -1.0,
        ),
    ];

    for (shoulder, elbow, wrist, hand, sign) in sides {
        let upper_dir = corrected.position(elbow) - corrected.position(shoulder);
        let fore_dir = corrected.position(wrist) - corrected.position(elbow);
        let twist = wrist_twist(upper_dir, fore_dir);
        if twist <= f32::EPSILON {
            continue;
        }
        let axis = fore_dir.normalize_or_zero();
        if axis == Vec3::ZERO {
            continue;
        }
        let hand_rot = &mut pose.joints[hand.index()].rotation;
        *hand_rot = (Quat::from_axis_angle(axis, sign * twist) * *hand_rot).normalize();
    }
}
