//! Torso collision resolution.
//!
//! Keeps the wrist and hand joints out of a virtual cylinder wrapped around
//! the torso, so a converted avatar's hands don't sink into its chest. The
//! cylinder is widened 50% over the measured shoulder span to account for
//! bulky avatars.

use glam::Vec3;

use super::math::point_segment_distance;
use crate::skeleton::{RawJoint, SkeletonFrame, TrackingState};

/// Joints subject to torso push-out.
const COLLIDING_JOINTS: [RawJoint; 4] = [
    RawJoint::WristLeft,
    RawJoint::HandLeft,
    RawJoint::WristRight,
    RawJoint::HandRight,
];

/// Push wrist/hand joints out of the torso cylinder, in place.
///
/// No-op unless both shoulder-center and hip-center are at least inferred.
/// A degenerate torso segment skips correction for the frame.
pub fn resolve(frame: &mut SkeletonFrame) {
    if frame.state(RawJoint::ShoulderCenter) == TrackingState::NotTracked
        || frame.state(RawJoint::HipCenter) == TrackingState::NotTracked
    {
        return;
    }

    let shoulder_center = frame.position(RawJoint::ShoulderCenter);
    let hip_center = frame.position(RawJoint::HipCenter);

    let left_span = frame.position(RawJoint::ShoulderLeft).distance(shoulder_center);
    let right_span = frame.position(RawJoint::ShoulderRight).distance(shoulder_center);
    let radius = 0.5 * (left_span + right_span) * 1.5;

    // Extend past the shoulders and well below the hips so arms resting at
    // the sides still collide with the lower torso.
    let axis = (hip_center - shoulder_center).normalize_or_zero();
    let top = shoulder_center - axis * (0.5 * radius);
    let bottom = hip_center + axis * (6.0 * radius);

    for joint in COLLIDING_JOINTS {
        let pos = frame.position(joint);
        let Some((dist, normal)) = point_segment_distance(pos, top, bottom) else {
            continue;
        };
        if dist < radius {
            frame.set_position(joint, pos + normal * ((radius - dist) * 1.01));
        }
    }
}
