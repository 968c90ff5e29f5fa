//! Intermediate joint topology
//!
//! A fixed 21-joint hierarchy distinct from both the raw camera skeleton and
//! the target avatar skeleton. Each joint carries a bind-pose bone direction,
//! references to the two raw joints that define its bone, and a parent link
//! encoded as an index into the same flat table (arena + index, no pointer
//! tree — the per-joint state is double-buffered elsewhere and a flat table
//! keeps that cheap).
//!
//! The table is instance-owned and constructed explicitly: two converters can
//! carry differently calibrated topologies without sharing state.

use glam::Vec3;

use super::RawJoint;
use crate::error::ConvertError;

/// Number of joints in the intermediate skeleton.
pub const INT_JOINT_COUNT: usize = 21;

/// The 21 joints of the intermediate skeleton.
///
/// `Base` is the tree root; its rotation is derived from the hip line rather
/// than from a bone. `Head` reuses the shoulder-center→head endpoints under
/// `Neck` so it can carry its own bind-pose offset and constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum IntJoint {
    Base,
    Spine,
    Chest,
    Neck,
    Head,
    CollarLeft,
    UpperArmLeft,
    ForearmLeft,
    HandLeft,
    CollarRight,
    UpperArmRight,
    ForearmRight,
    HandRight,
    HipLeft,
    ThighLeft,
    ShinLeft,
    FootLeft,
    HipRight,
    ThighRight,
    ShinRight,
    FootRight,
}

impl IntJoint {
    pub const ALL: [IntJoint; INT_JOINT_COUNT] = [
        IntJoint::Base,
        IntJoint::Spine,
        IntJoint::Chest,
        IntJoint::Neck,
        IntJoint::Head,
        IntJoint::CollarLeft,
        IntJoint::UpperArmLeft,
        IntJoint::ForearmLeft,
        IntJoint::HandLeft,
        IntJoint::CollarRight,
        IntJoint::UpperArmRight,
        IntJoint::ForearmRight,
        IntJoint::HandRight,
        IntJoint::HipLeft,
        IntJoint::ThighLeft,
        IntJoint::ShinLeft,
        IntJoint::FootLeft,
        IntJoint::HipRight,
        IntJoint::ThighRight,
        IntJoint::ShinRight,
        IntJoint::FootRight,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Parse a config-facing joint name (matches the enum variant in
    /// lowerCamelCase, e.g. `"forearmLeft"`).
    pub fn from_name(name: &str) -> Option<IntJoint> {
        Self::ALL
            .iter()
            .copied()
            .find(|j| j.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            IntJoint::Base => "base",
            IntJoint::Spine => "spine",
            IntJoint::Chest => "chest",
            IntJoint::Neck => "neck",
            IntJoint::Head => "head",
            IntJoint::CollarLeft => "collarLeft",
            IntJoint::UpperArmLeft => "upperArmLeft",
            IntJoint::ForearmLeft => "forearmLeft",
            IntJoint::HandLeft => "handLeft",
            IntJoint::CollarRight => "collarRight",
            IntJoint::UpperArmRight => "upperArmRight",
            IntJoint::ForearmRight => "forearmRight",
            IntJoint::HandRight => "handRight",
            IntJoint::HipLeft => "hipLeft",
            IntJoint::ThighLeft => "thighLeft",
            IntJoint::ShinLeft => "shinLeft",
            IntJoint::FootLeft => "footLeft",
            IntJoint::HipRight => "hipRight",
            IntJoint::ThighRight => "thighRight",
            IntJoint::ShinRight => "shinRight",
            IntJoint::FootRight => "footRight",
        }
    }
}

/// Static description of one intermediate joint.
#[derive(Debug, Clone, Copy)]
pub struct JointDescriptor {
    /// Bind-pose bone direction in the joint's parent-local space (unit).
    pub bind_dir: Vec3,
    /// Raw joint at the bone's proximal end (`None` for the root placeholder).
    pub start: Option<RawJoint>,
    /// Raw joint at the bone's distal end.
    pub end: RawJoint,
    /// Parent joint, `None` only for `Base`.
    pub parent: Option<IntJoint>,
}

/// Joint definition table: (joint, bind direction, start, end, parent).
///
/// Convention after the default `(1, 1, -1)` joint scale: +X to the user's
/// right, +Y up, +Z forward. Left-side chains therefore bind along -X.
const JOINT_DEFS: [(IntJoint, Vec3, Option<RawJoint>, RawJoint, Option<IntJoint>); INT_JOINT_COUNT] = [
    (IntJoint::Base, Vec3::new(1.0, 0.0, 0.0), None, RawJoint::HipCenter, None),
    (IntJoint::Spine, Vec3::new(0.0, 1.0, 0.0), Some(RawJoint::HipCenter), RawJoint::Spine, Some(IntJoint::Base)),
    (IntJoint::Chest, Vec3::new(0.0, 1.0, 0.0), Some(RawJoint::Spine), RawJoint::ShoulderCenter, Some(IntJoint::Spine)),
    (IntJoint::Neck, Vec3::new(0.0, 1.0, 0.0), Some(RawJoint::ShoulderCenter), RawJoint::Head, Some(IntJoint::Chest)),
    (IntJoint::Head, Vec3::new(0.0, 1.0, 0.0), Some(RawJoint::ShoulderCenter), RawJoint::Head, Some(IntJoint::Neck)),
    (IntJoint::CollarLeft, Vec3::new(-1.0, 0.0, 0.0), Some(RawJoint::ShoulderCenter), RawJoint::ShoulderLeft, Some(IntJoint::Chest)),
    (IntJoint::UpperArmLeft, Vec3::new(-1.0, 0.0, 0.0), Some(RawJoint::ShoulderLeft), RawJoint::ElbowLeft, Some(IntJoint::CollarLeft)),
    (IntJoint::ForearmLeft, Vec3::new(-1.0, 0.0, 0.0), Some(RawJoint::ElbowLeft), RawJoint::WristLeft, Some(IntJoint::UpperArmLeft)),
    (IntJoint::HandLeft, Vec3::new(-1.0, 0.0, 0.0), Some(RawJoint::WristLeft), RawJoint::HandLeft, Some(IntJoint::ForearmLeft)),
    (IntJoint::CollarRight, Vec3::new(1.0, 0.0, 0.0), Some(RawJoint::ShoulderCenter), RawJoint::ShoulderRight, Some(IntJoint::Chest)),
    (IntJoint::UpperArmRight, Vec3::new(1.0, 0.0, 0.0), Some(RawJoint::ShoulderRight), RawJoint::ElbowRight, Some(IntJoint::CollarRight)),
    (IntJoint::ForearmRight, Vec3::new(1.0, 0.0, 0.0), Some(RawJoint::ElbowRight), RawJoint::WristRight, Some(IntJoint::UpperArmRight)),
    (IntJoint::HandRight, Vec3::new(1.0, 0.0, 0.0), Some(RawJoint::WristRight), RawJoint::HandRight, Some(IntJoint::ForearmRight)),
    (IntJoint::HipLeft, Vec3::new(-1.0, 0.0, 0.0), Some(RawJoint::HipCenter), RawJoint::HipLeft, Some(IntJoint::Base)),
    (IntJoint::ThighLeft, Vec3::new(0.0, -1.0, 0.0), Some(RawJoint::HipLeft), RawJoint::KneeLeft, Some(IntJoint::HipLeft)),
    (IntJoint::ShinLeft, Vec3::new(0.0, -1.0, 0.0), Some(RawJoint::KneeLeft), RawJoint::AnkleLeft, Some(IntJoint::ThighLeft)),
    (IntJoint::FootLeft, Vec3::new(0.0, 0.0, 1.0), Some(RawJoint::AnkleLeft), RawJoint::FootLeft, Some(IntJoint::ShinLeft)),
    (IntJoint::HipRight, Vec3::new(1.0, 0.0, 0.0), Some(RawJoint::HipCenter), RawJoint::HipRight, Some(IntJoint::Base)),
    (IntJoint::ThighRight, Vec3::new(0.0, -1.0, 0.0), Some(RawJoint::HipRight), RawJoint::KneeRight, Some(IntJoint::HipRight)),
    (IntJoint::ShinRight, Vec3::new(0.0, -1.0, 0.0), Some(RawJoint::KneeRight), RawJoint::AnkleRight, Some(IntJoint::ThighRight)),
    (IntJoint::FootRight, Vec3::new(0.0, 0.0, 1.0), Some(RawJoint::AnkleRight), RawJoint::FootRight, Some(IntJoint::ShinRight)),
];

/// Instance-owned intermediate joint descriptor table.
#[derive(Debug, Clone)]
pub struct Topology {
    joints: [JointDescriptor; INT_JOINT_COUNT],
}

impl Default for Topology {
    fn default() -> Self {
        Self::standard()
    }
}

impl Topology {
    /// The standard 21-joint table.
    pub fn standard() -> Self {
        let mut joints = [JointDescriptor {
            bind_dir: Vec3::X,
            start: None,
            end: RawJoint::HipCenter,
            parent: None,
        }; INT_JOINT_COUNT];

        for (joint, bind_dir, start, end, parent) in JOINT_DEFS {
            joints[joint.index()] = JointDescriptor {
                bind_dir,
                start,
                end,
                parent,
            };
        }

        Self { joints }
    }

    #[inline]
    pub fn descriptor(&self, joint: IntJoint) -> &JointDescriptor {
        &self.joints[joint.index()]
    }

    #[inline]
    pub fn parent(&self, joint: IntJoint) -> Option<IntJoint> {
        self.joints[joint.index()].parent
    }

    /// Replace a joint's bind-pose bone direction (calibration hook).
    pub fn set_bind_direction(&mut self, joint: IntJoint, dir: Vec3) {
        self.joints[joint.index()].bind_dir = dir.normalize_or_zero();
    }

    /// Verify the tree invariant: every joint reaches `Base` by parent links
    /// within `INT_JOINT_COUNT` steps and `Base` is the only root.
    pub fn validate(&self) -> Result<(), ConvertError> {
        for joint in IntJoint::ALL {
            let mut current = joint;
            let mut steps = 0;
            while let Some(parent) = self.parent(current) {
                current = parent;
                steps += 1;
                if steps > INT_JOINT_COUNT {
                    return Err(ConvertError::TopologyCycle(joint.name()));
                }
            }
            if current != IntJoint::Base {
                return Err(ConvertError::TopologyOrphan(joint.name()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_topology_is_a_tree() {
        let topo = Topology::standard();
        topo.validate().expect("standard topology must validate");
    }

    #[test]
    fn test_only_base_lacks_a_start_joint() {
        let topo = Topology::standard();
        for joint in IntJoint::ALL {
            let desc = topo.descriptor(joint);
            if joint == IntJoint::Base {
                assert!(desc.start.is_none());
                assert!(desc.parent.is_none());
            } else {
                assert!(desc.start.is_some(), "{} must have a start joint", joint.name());
                assert!(desc.parent.is_some(), "{} must have a parent", joint.name());
            }
        }
    }

    #[test]
    fn test_bind_directions_are_unit() {
        let topo = Topology::standard();
        for joint in IntJoint::ALL {
            let len = topo.descriptor(joint).bind_dir.length();
            assert!((len - 1.0).abs() < 1e-6, "{} bind dir not unit", joint.name());
        }
    }

    #[test]
    fn test_cycle_detection() {
        let mut topo = Topology::standard();
        // Point spine's ancestor chain back at itself
        topo.joints[IntJoint::Base.index()].parent = Some(IntJoint::Spine);
        assert!(topo.validate().is_err());
    }

    #[test]
    fn test_joint_name_round_trip() {
        for joint in IntJoint::ALL {
            assert_eq!(IntJoint::from_name(joint.name()), Some(joint));
        }
        assert_eq!(IntJoint::from_name("ForearmLeft"), Some(IntJoint::ForearmLeft));
        assert_eq!(IntJoint::from_name("nosuch"), None);
    }
}
