//! Avatar joint hierarchy and the intermediate→avatar retargeting map.
//!
//! The avatar skeleton is a VRM-humanoid-style hierarchy, larger than the
//! intermediate skeleton; joints not covered by the map keep identity
//! rotation. The map is used only for the final rotation hand-off.

use serde::{Deserialize, Serialize};

use super::topology::IntJoint;

/// Number of joints in the target avatar hierarchy.
pub const AVATAR_JOINT_COUNT: usize = 22;

/// Target avatar joints (VRM humanoid naming).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(usize)]
pub enum AvatarJoint {
    Hips,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,
    LeftShoulder,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightShoulder,
    RightUpperArm,
    RightLowerArm,
    RightHand,
    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    LeftToes,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
    RightToes,
}

impl AvatarJoint {
    pub const ALL: [AvatarJoint; AVATAR_JOINT_COUNT] = [
        AvatarJoint::Hips,
        AvatarJoint::Spine,
        AvatarJoint::Chest,
        AvatarJoint::UpperChest,
        AvatarJoint::Neck,
        AvatarJoint::Head,
        AvatarJoint::LeftShoulder,
        AvatarJoint::LeftUpperArm,
        AvatarJoint::LeftLowerArm,
        AvatarJoint::LeftHand,
        AvatarJoint::RightShoulder,
        AvatarJoint::RightUpperArm,
        AvatarJoint::RightLowerArm,
        AvatarJoint::RightHand,
        AvatarJoint::LeftUpperLeg,
        AvatarJoint::LeftLowerLeg,
        AvatarJoint::LeftFoot,
        AvatarJoint::LeftToes,
        AvatarJoint::RightUpperLeg,
        AvatarJoint::RightLowerLeg,
        AvatarJoint::RightFoot,
        AvatarJoint::RightToes,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name (lowerCamel, matching the VRM humanoid bone names).
    pub fn name(self) -> &'static str {
        match self {
            AvatarJoint::Hips => "hips",
            AvatarJoint::Spine => "spine",
            AvatarJoint::Chest => "chest",
            AvatarJoint::UpperChest => "upperChest",
            AvatarJoint::Neck => "neck",
            AvatarJoint::Head => "head",
            AvatarJoint::LeftShoulder => "leftShoulder",
            AvatarJoint::LeftUpperArm => "leftUpperArm",
            AvatarJoint::LeftLowerArm => "leftLowerArm",
            AvatarJoint::LeftHand => "leftHand",
            AvatarJoint::RightShoulder => "rightShoulder",
            AvatarJoint::RightUpperArm => "rightUpperArm",
            AvatarJoint::RightLowerArm => "rightLowerArm",
            AvatarJoint::RightHand => "rightHand",
            AvatarJoint::LeftUpperLeg => "leftUpperLeg",
            AvatarJoint::LeftLowerLeg => "leftLowerLeg",
            AvatarJoint::LeftFoot => "leftFoot",
            AvatarJoint::LeftToes => "leftToes",
            AvatarJoint::RightUpperLeg => "rightUpperLeg",
            AvatarJoint::RightLowerLeg => "rightLowerLeg",
            AvatarJoint::RightFoot => "rightFoot",
            AvatarJoint::RightToes => "rightToes",
        }
    }
}

/// One entry of the retarget map.
#[derive(Debug, Clone, Copy)]
pub struct RetargetEntry {
    pub int_joint: IntJoint,
    pub avatar_joint: AvatarJoint,
    /// Nearest retargeted ancestor in the avatar hierarchy; used for the
    /// world→local conversion.
    pub avatar_parent: AvatarJoint,
}

const fn entry(
    int_joint: IntJoint,
    avatar_joint: AvatarJoint,
    avatar_parent: AvatarJoint,
) -> RetargetEntry {
    RetargetEntry {
        int_joint,
        avatar_joint,
        avatar_parent,
    }
}

/// The 14-entry retarget map.
///
/// Entry 0 is the root (its "parent" is itself and is never consulted).
/// Children always appear after their ancestors, so the world→local pass can
/// walk the map in reverse and still find each entry's parent holding a
/// world rotation.
pub const RETARGET_MAP: [RetargetEntry; 14] = [
    entry(IntJoint::Base, AvatarJoint::Hips, AvatarJoint::Hips),
    entry(IntJoint::Spine, AvatarJoint::Spine, AvatarJoint::Hips),
    entry(IntJoint::Chest, AvatarJoint::Chest, AvatarJoint::Spine),
    entry(IntJoint::Neck, AvatarJoint::Neck, AvatarJoint::Chest),
    entry(IntJoint::UpperArmLeft, AvatarJoint::LeftUpperArm, AvatarJoint::Chest),
    entry(IntJoint::ForearmLeft, AvatarJoint::LeftLowerArm, AvatarJoint::LeftUpperArm),
    entry(IntJoint::HandLeft, AvatarJoint::LeftHand, AvatarJoint::LeftLowerArm),
    entry(IntJoint::UpperArmRight, AvatarJoint::RightUpperArm, AvatarJoint::Chest),
    entry(IntJoint::ForearmRight, AvatarJoint::RightLowerArm, AvatarJoint::RightUpperArm),
    entry(IntJoint::HandRight, AvatarJoint::RightHand, AvatarJoint::RightLowerArm),
    entry(IntJoint::ThighLeft, AvatarJoint::LeftUpperLeg, AvatarJoint::Hips),
    entry(IntJoint::ShinLeft, AvatarJoint::LeftLowerLeg, AvatarJoint::LeftUpperLeg),
    entry(IntJoint::ThighRight, AvatarJoint::RightUpperLeg, AvatarJoint::Hips),
    entry(IntJoint::ShinRight, AvatarJoint::RightLowerLeg, AvatarJoint::RightUpperLeg),
];
