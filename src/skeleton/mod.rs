//! Skeleton data model
//!
//! Raw camera-space skeleton samples, the intermediate joint topology used as
//! a stable rotation-computation space, and the avatar retargeting map.

pub mod retarget;
pub mod topology;

pub use retarget::{AvatarJoint, RetargetEntry, RETARGET_MAP};
pub use topology::{IntJoint, JointDescriptor, Topology};

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Number of joints in a raw camera skeleton sample.
pub const RAW_JOINT_COUNT: usize = 20;

/// Per-joint tracking confidence from the body-tracking source.
///
/// Ordered so that the worst state of two joints is their minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    /// The joint was not observed this frame
    NotTracked,
    /// Position estimated, not directly observed
    Inferred,
    /// Position directly observed
    Tracked,
}

impl Default for TrackingState {
    fn default() -> Self {
        Self::NotTracked
    }
}

/// The 20 named joints of a raw camera skeleton sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(usize)]
pub enum RawJoint {
    HipCenter,
    Spine,
    ShoulderCenter,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
}

impl RawJoint {
    pub const ALL: [RawJoint; RAW_JOINT_COUNT] = [
        RawJoint::HipCenter,
        RawJoint::Spine,
        RawJoint::ShoulderCenter,
        RawJoint::Head,
        RawJoint::ShoulderLeft,
        RawJoint::ElbowLeft,
        RawJoint::WristLeft,
        RawJoint::HandLeft,
        RawJoint::ShoulderRight,
        RawJoint::ElbowRight,
        RawJoint::WristRight,
        RawJoint::HandRight,
        RawJoint::HipLeft,
        RawJoint::KneeLeft,
        RawJoint::AnkleLeft,
        RawJoint::FootLeft,
        RawJoint::HipRight,
        RawJoint::KneeRight,
        RawJoint::AnkleRight,
        RawJoint::FootRight,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name (lowerCamel).
    pub fn name(self) -> &'static str {
        match self {
            RawJoint::HipCenter => "hipCenter",
            RawJoint::Spine => "spine",
            RawJoint::ShoulderCenter => "shoulderCenter",
            RawJoint::Head => "head",
            RawJoint::ShoulderLeft => "shoulderLeft",
            RawJoint::ElbowLeft => "elbowLeft",
            RawJoint::WristLeft => "wristLeft",
            RawJoint::HandLeft => "handLeft",
            RawJoint::ShoulderRight => "shoulderRight",
            RawJoint::ElbowRight => "elbowRight",
            RawJoint::WristRight => "wristRight",
            RawJoint::HandRight => "handRight",
            RawJoint::HipLeft => "hipLeft",
            RawJoint::KneeLeft => "kneeLeft",
            RawJoint::AnkleLeft => "ankleLeft",
            RawJoint::FootLeft => "footLeft",
            RawJoint::HipRight => "hipRight",
            RawJoint::KneeRight => "kneeRight",
            RawJoint::AnkleRight => "ankleRight",
            RawJoint::FootRight => "footRight",
        }
    }

    /// Look up a joint by its wire name (lowerCamel).
    pub fn from_name(name: &str) -> Option<RawJoint> {
        RawJoint::ALL.into_iter().find(|j| j.name() == name)
    }
}

/// One frame of raw joint positions with per-joint tracking state.
///
/// Created fresh each input frame; the converter copies it and never aliases
/// the caller's data.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonFrame {
    positions: [Vec3; RAW_JOINT_COUNT],
    states: [TrackingState; RAW_JOINT_COUNT],
}

impl Default for SkeletonFrame {
    fn default() -> Self {
        Self {
            positions: [Vec3::ZERO; RAW_JOINT_COUNT],
            states: [TrackingState::NotTracked; RAW_JOINT_COUNT],
        }
    }
}

impl SkeletonFrame {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn position(&self, joint: RawJoint) -> Vec3 {
        self.positions[joint.index()]
    }

    #[inline]
    pub fn state(&self, joint: RawJoint) -> TrackingState {
        self.states[joint.index()]
    }

    #[inline]
    pub fn set_joint(&mut self, joint: RawJoint, position: Vec3, state: TrackingState) {
        self.positions[joint.index()] = position;
        self.states[joint.index()] = state;
    }

    #[inline]
    pub fn set_position(&mut self, joint: RawJoint, position: Vec3) {
        self.positions[joint.index()] = position;
    }

    /// The worse of two joints' tracking states (NotTracked dominates).
    pub fn worst_state(&self, a: RawJoint, b: RawJoint) -> TrackingState {
        self.state(a).min(self.state(b))
    }

    /// Multiply every joint position component-wise by `scale`.
    pub fn scale(&mut self, scale: Vec3) {
        for pos in &mut self.positions {
            *pos *= scale;
        }
    }

    /// True if every joint is `NotTracked`.
    pub fn is_empty(&self) -> bool {
        self.states.iter().all(|s| *s == TrackingState::NotTracked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_state_ordering() {
        // Worst-of semantics rely on the enum ordering
        assert!(TrackingState::NotTracked < TrackingState::Inferred);
        assert!(TrackingState::Inferred < TrackingState::Tracked);
        assert_eq!(
            TrackingState::Tracked.min(TrackingState::Inferred),
            TrackingState::Inferred
        );
    }

    #[test]
    fn test_worst_state() {
        let mut frame = SkeletonFrame::new();
        frame.set_joint(RawJoint::ElbowLeft, Vec3::ZERO, TrackingState::Tracked);
        frame.set_joint(RawJoint::WristLeft, Vec3::ZERO, TrackingState::Inferred);
        assert_eq!(
            frame.worst_state(RawJoint::ElbowLeft, RawJoint::WristLeft),
            TrackingState::Inferred
        );
    }

    #[test]
    fn test_scale_mirrors_z() {
        let mut frame = SkeletonFrame::new();
        frame.set_joint(
            RawJoint::Head,
            Vec3::new(0.1, 1.6, 2.0),
            TrackingState::Tracked,
        );
        frame.scale(Vec3::new(1.0, 1.0, -1.0));
        assert_eq!(frame.position(RawJoint::Head), Vec3::new(0.1, 1.6, -2.0));
    }

    #[test]
    fn test_joint_from_name_round_trip() {
        for joint in RawJoint::ALL {
            let name = serde_json::to_string(&joint).unwrap();
            let name = name.trim_matches('"');
            assert_eq!(RawJoint::from_name(name), Some(joint));
        }
        assert_eq!(RawJoint::from_name("tail"), None);
    }

    #[test]
    fn test_joint_name_serde() {
        let j: RawJoint = serde_json::from_str("\"shoulderCenter\"").unwrap();
        assert_eq!(j, RawJoint::ShoulderCenter);
        assert_eq!(serde_json::to_string(&RawJoint::HipLeft).unwrap(), "\"hipLeft\"");
    }
}
