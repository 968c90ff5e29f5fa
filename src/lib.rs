//! Skeletar - Skeleton to Avatar Joint Conversion Service
//!
//! A headless Rust service that turns raw depth-camera skeleton frames into
//! avatar joint rotations:
//! - Receives 20-joint skeleton frames over UDP (JSON)
//! - Corrects torso collisions, filters orientation noise, and enforces
//!   biomechanical cone constraints
//! - Retargets onto a humanoid avatar hierarchy and serves poses over
//!   HTTP/SSE

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod skeleton;
pub mod tracking;

pub use config::Config;
pub use error::{Result, SkeletarError};

use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use convert::AvatarPose;
use skeleton::SkeletonFrame;

/// Application state shared across all components
#[derive(Debug)]
pub struct AppState {
    /// Current configuration
    pub config: RwLock<Config>,
    /// Most recent converted pose
    pub pose: RwLock<AvatarPose>,
    /// Most recent constraint-corrected skeleton
    pub skeleton: RwLock<SkeletonFrame>,
    /// Channel for converted avatar poses
    pub pose_tx: broadcast::Sender<AvatarPose>,
    /// Channel for constraint-corrected diagnostic skeletons
    pub skeleton_tx: broadcast::Sender<SkeletonFrame>,
    /// Shutdown signal
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Create a new application state with the given configuration
    pub fn new(config: Config) -> Arc<Self> {
        let (pose_tx, _) = broadcast::channel(64);
        let (skeleton_tx, _) = broadcast::channel(64);
        let (shutdown_tx, _) = broadcast::channel(1);

        Arc::new(Self {
            config: RwLock::new(config),
            pose: RwLock::new(AvatarPose::default()),
            skeleton: RwLock::new(SkeletonFrame::new()),
            pose_tx,
            skeleton_tx,
            shutdown_tx,
        })
    }

    /// Store and broadcast a converted pose
    pub async fn publish_pose(&self, pose: AvatarPose) {
        *self.pose.write().await = pose.clone();
        let _ = self.pose_tx.send(pose);
    }

    /// Store and broadcast a corrected diagnostic skeleton
    pub async fn publish_skeleton(&self, frame: SkeletonFrame) {
        *self.skeleton.write().await = frame.clone();
        let _ = self.skeleton_tx.send(frame);
    }

    /// Get the most recent pose
    pub async fn get_pose(&self) -> AvatarPose {
        self.pose.read().await.clone()
    }

    /// Get the most recent corrected skeleton
    pub async fn get_skeleton(&self) -> SkeletonFrame {
        self.skeleton.read().await.clone()
    }

    /// Subscribe to converted poses
    pub fn subscribe_poses(&self) -> broadcast::Receiver<AvatarPose> {
        self.pose_tx.subscribe()
    }

    /// Subscribe to corrected skeletons
    pub fn subscribe_skeletons(&self) -> broadcast::Receiver<SkeletonFrame> {
        self.skeleton_tx.subscribe()
    }

    /// Subscribe to shutdown signal
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
