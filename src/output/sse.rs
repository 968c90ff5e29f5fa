//! Server-Sent Events for real-time pose updates

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::convert::AvatarPose;
use crate::skeleton::{RawJoint, SkeletonFrame};
use crate::AppState;

/// Create an SSE stream of converted avatar poses
pub fn create_pose_stream(
    app_state: Arc<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = app_state.subscribe_poses();

    // Convert broadcast receiver to a stream
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(pose) => Some(Ok(pose_to_event(&pose))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Create an SSE stream of corrected diagnostic skeletons
pub fn create_skeleton_stream(
    app_state: Arc<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = app_state.subscribe_skeletons();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(frame) => Some(Ok(skeleton_to_event(&frame))),
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Serialize a pose as the wire JSON object
pub fn pose_to_json(pose: &AvatarPose) -> serde_json::Value {
    let mut joints = serde_json::Map::new();
    for (joint, xf) in pose.iter() {
        joints.insert(
            joint.name().to_string(),
            serde_json::json!({
                "position": [xf.position.x, xf.position.y, xf.position.z],
                "rotation": [xf.rotation.x, xf.rotation.y, xf.rotation.z, xf.rotation.w],
                "scale": [xf.scale.x, xf.scale.y, xf.scale.z],
            }),
        );
    }
    serde_json::Value::Object(joints)
}

/// Serialize a skeleton frame as the wire JSON object
pub fn skeleton_to_json(frame: &SkeletonFrame) -> serde_json::Value {
    let mut joints = serde_json::Map::new();
    for joint in RawJoint::ALL {
        let pos = frame.position(joint);
        joints.insert(
            joint.name().to_string(),
            serde_json::json!({
                "position": [pos.x, pos.y, pos.z],
                "state": frame.state(joint),
            }),
        );
    }
    serde_json::Value::Object(joints)
}

fn pose_to_event(pose: &AvatarPose) -> Event {
    Event::default()
        .event("pose")
        .data(pose_to_json(pose).to_string())
}

fn skeleton_to_event(frame: &SkeletonFrame) -> Event {
    Event::default()
        .event("skeleton")
        .data(skeleton_to_json(frame).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{AvatarJoint, TrackingState};
    use glam::Vec3;

    #[test]
    fn test_pose_json_shape() {
        let pose = AvatarPose::default();
        let value = pose_to_json(&pose);

        let hips = &value["hips"];
        assert_eq!(hips["position"][1], 0.0);
        assert_eq!(hips["rotation"][3], 1.0);
        assert_eq!(hips["scale"][0], 1.0);
        assert_eq!(value.as_object().unwrap().len(), AvatarJoint::ALL.len());
    }

    #[test]
    fn test_skeleton_json_shape() {
        let mut frame = SkeletonFrame::new();
        frame.set_joint(
            RawJoint::Head,
            Vec3::new(0.1, 1.6, -2.0),
            TrackingState::Tracked,
        );
        let value = skeleton_to_json(&frame);

        assert_eq!(value["head"]["state"], "tracked");
        assert_eq!(value["head"]["position"][2], -2.0);
        assert_eq!(value["footLeft"]["state"], "not_tracked");
    }
}
