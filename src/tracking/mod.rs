//! Skeleton frame receiver
//!
//! Receives JSON-over-UDP skeleton packets from the body-tracking source.
//! Each packet carries up to 20 named joints with positions in camera space;
//! joints missing from a packet are treated as not tracked.

use serde::Deserialize;
use std::collections::HashMap;
use std::net::UdpSocket;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use glam::Vec3;

use crate::config::TrackingConfig;
use crate::error::{SkeletarError, TrackingError};
use crate::skeleton::{RawJoint, SkeletonFrame, TrackingState};

/// One joint sample on the wire
#[derive(Debug, Clone, Deserialize)]
pub struct JointSample {
    /// Position [x, y, z] in camera space (meters)
    pub position: [f32; 3],
    /// Tracking confidence; defaults to tracked when omitted
    #[serde(default = "default_state")]
    pub state: TrackingState,
}

fn default_state() -> TrackingState {
    TrackingState::Tracked
}

/// A single JSON packet from the body-tracking source
#[derive(Debug, Clone, Deserialize)]
pub struct FramePacket {
    /// Whether a body was detected this frame
    pub tracked: bool,
    /// Joint name → sample; unknown names are ignored
    #[serde(default)]
    pub joints: HashMap<String, JointSample>,
}

impl FramePacket {
    /// Build a skeleton frame from the packet.
    ///
    /// Joints absent from the packet (or with unknown names) come out as
    /// `NotTracked` at the origin. An untracked packet yields an empty frame.
    pub fn to_frame(&self) -> SkeletonFrame {
        let mut frame = SkeletonFrame::new();
        if !self.tracked {
            return frame;
        }
        for (name, sample) in &self.joints {
            let Some(joint) = RawJoint::from_name(name) else {
                tracing::debug!("Ignoring unknown joint name: {}", name);
                continue;
            };
            frame.set_joint(joint, Vec3::from_array(sample.position), sample.state);
        }
        frame
    }
}

/// Aggregated receiver state
#[derive(Debug, Clone, Default)]
pub struct FrameData {
    /// Most recently parsed frame
    pub frame: Option<SkeletonFrame>,
    /// Whether any data has been received
    pub has_data: bool,
}

/// Skeleton JSON-over-UDP receiver
pub struct FrameReceiver {
    config: TrackingConfig,
    socket: Option<UdpSocket>,
    data: Arc<RwLock<FrameData>>,
}

impl FrameReceiver {
    /// Create a new receiver (does not bind yet)
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            config: config.clone(),
            socket: None,
            data: Arc::new(RwLock::new(FrameData::default())),
        }
    }

    /// Bind the UDP socket and start receiving
    pub fn start(&mut self) -> Result<(), SkeletarError> {
        let addr = format!("{}:{}", self.config.listen_address, self.config.port);

        let socket = UdpSocket::bind(&addr).map_err(|e| {
            TrackingError::Receiver(format!("Failed to bind to {}: {}", addr, e))
        })?;

        socket.set_nonblocking(true).map_err(|e| {
            TrackingError::Receiver(format!("Failed to set non-blocking: {}", e))
        })?;

        socket
            .set_read_timeout(Some(Duration::from_millis(100)))
            .ok();

        tracing::info!("Skeleton receiver listening on {}", addr);
        self.socket = Some(socket);

        Ok(())
    }

    /// Process incoming JSON packets (non-blocking)
    pub async fn process(&self) -> Result<Option<SkeletonFrame>, SkeletarError> {
        let socket = match &self.socket {
            Some(s) => s,
            None => return Ok(None),
        };

        let mut buf = [0u8; 65536];
        let mut latest = None;

        // Drain the socket so a slow consumer doesn't fall behind the source
        loop {
            match socket.recv(&mut buf) {
                Ok(size) if size > 0 => {
                    let packet: FramePacket =
                        serde_json::from_slice(&buf[..size]).map_err(|e| {
                            TrackingError::Parse(format!("JSON parse error: {}", e))
                        })?;
                    latest = Some(packet.to_frame());
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    return Err(
                        TrackingError::Receiver(format!("Receive error: {}", e)).into(),
                    );
                }
            }
        }

        if let Some(frame) = &latest {
            let mut data = self.data.write().await;
            data.frame = Some(frame.clone());
            data.has_data = true;
        }

        Ok(latest)
    }

    /// Get the most recent frame
    pub async fn get_data(&self) -> FrameData {
        self.data.read().await.clone()
    }

    /// Check if any data has been received
    pub async fn has_data(&self) -> bool {
        self.data.read().await.has_data
    }

    /// Stop the receiver
    pub fn stop(&mut self) {
        self.socket = None;
        tracing::info!("Skeleton receiver stopped");
    }
}
