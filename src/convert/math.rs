//! Quaternion and segment geometry helpers for the conversion pipeline.
//!
//! Hand-written rather than `Quat::from_rotation_arc` because tracking noise
//! makes near-parallel inputs routine: the degenerate cases here must fall
//! back to identity, not to an arbitrary 180° flip.

use glam::{Quat, Vec3};

/// Below this rotation angle (radians) or cross-product length the shortest
/// arc is numerically unstable and collapses to identity.
const DEGENERATE_EPS: f32 = 1e-3;

/// Minimal-angle rotation taking `from` onto `to`.
///
/// Returns identity when the vectors are near-parallel (or anti-parallel,
/// where the axis is undefined).
pub fn shortest_arc(from: Vec3, to: Vec3) -> Quat {
    let from = from.normalize_or_zero();
    let to = to.normalize_or_zero();
    if from == Vec3::ZERO || to == Vec3::ZERO {
        return Quat::IDENTITY;
    }

    let angle = from.dot(to).clamp(-1.0, 1.0).acos();
    let axis = from.cross(to);
    if angle < DEGENERATE_EPS || axis.length() < DEGENERATE_EPS {
        return Quat::IDENTITY;
    }

    Quat::from_axis_angle(axis.normalize(), angle)
}

/// Flip `q` into the same 4-sphere hemisphere as `reference`.
///
/// Applied before any slerp or delta so the double-cover of unit quaternions
/// (`q` and `-q` encode the same rotation) cannot produce a 720° artifact.
#[inline]
pub fn ensure_neighborhood(reference: Quat, q: Quat) -> Quat {
    if reference.dot(q) < 0.0 {
        -q
    } else {
        q
    }
}

/// The rotation delta carrying `from` onto `to`, neighborhood-corrected.
pub fn rotation_between(from: Quat, to: Quat) -> Quat {
    let to = ensure_neighborhood(from, to);
    (to * from.inverse()).normalize()
}

/// Rotation angle of `q` in radians, in `[0, π]`.
#[inline]
pub fn rotation_angle(q: Quat) -> f32 {
    2.0 * q.w.abs().clamp(0.0, 1.0).acos()
}

/// Angular distance between two rotations, double-cover aware.
pub fn angle_between(a: Quat, b: Quat) -> f32 {
    rotation_angle(rotation_between(a, b))
}

/// Slerp with the neighborhood rule applied to `b` first.
pub fn slerp(a: Quat, b: Quat, t: f32) -> Quat {
    a.slerp(ensure_neighborhood(a, b), t).normalize()
}

/// Distance from `point` to the segment `a..b`, with the outward normal from
/// the closest point.
///
/// Returns `None` when the segment is degenerate (shorter than 1e-4); callers
/// skip correction for that joint on that frame rather than reuse stale
/// values.
pub fn point_segment_distance(point: Vec3, a: Vec3, b: Vec3) -> Option<(f32, Vec3)> {
    let seg = b - a;
    let seg_len = seg.length();
    if seg_len < 1e-4 {
        return None;
    }

    let t = ((point - a).dot(seg) / (seg_len * seg_len)).clamp(0.0, 1.0);
    let closest = a + seg * t;
    let diff = point - closest;
    let dist = diff.length();

    let normal = if dist > 1e-6 {
        diff / dist
    } else {
        // Point on the axis: any perpendicular push direction is as good as
        // another.
        (seg / seg_len).any_orthonormal_vector()
    };

    Some((dist, normal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_shortest_arc_quarter_turn() {
        let q = shortest_arc(Vec3::X, Vec3::Y);
        let rotated = q * Vec3::X;
        assert!((rotated - Vec3::Y).length() < 1e-5, "got {rotated}");
        assert!((rotation_angle(q) - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_shortest_arc_parallel_is_identity() {
        let q = shortest_arc(Vec3::new(0.3, 0.4, 0.5), Vec3::new(0.3, 0.4, 0.5));
        assert_eq!(q, Quat::IDENTITY);
    }

    #[test]
    fn test_shortest_arc_antiparallel_is_identity() {
        // Axis is undefined at 180°; falls back to identity
        let q = shortest_arc(Vec3::X, -Vec3::X);
        assert_eq!(q, Quat::IDENTITY);
    }

    #[test]
    fn test_rotation_between_double_cover() {
        // q and -q are the same rotation; the delta must be identity, not a
        // 360° artifact
        let q = Quat::from_axis_angle(Vec3::new(0.1, 0.9, 0.2).normalize(), 1.3);
        let delta = rotation_between(q, -q);
        assert!(rotation_angle(delta) < 1e-5, "angle {}", rotation_angle(delta));
    }

    #[test]
    fn test_rotation_between_composes() {
        let a = Quat::from_rotation_y(0.4);
        let b = Quat::from_rotation_y(1.1);
        let delta = rotation_between(a, b);
        assert!(angle_between(delta * a, b) < 1e-5);
    }

    #[test]
    fn test_angle_between_symmetric() {
        let a = Quat::from_rotation_x(0.3);
        let b = Quat::from_rotation_x(-0.2);
        assert!((angle_between(a, b) - 0.5).abs() < 1e-5);
        assert!((angle_between(b, a) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_point_segment_distance_interior() {
        let (dist, normal) =
            point_segment_distance(Vec3::new(0.2, 0.5, 0.0), Vec3::ZERO, Vec3::Y).unwrap();
        assert!((dist - 0.2).abs() < 1e-6);
        assert!((normal - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_point_segment_distance_past_endpoint() {
        let (dist, _) =
            point_segment_distance(Vec3::new(0.0, 2.0, 0.0), Vec3::ZERO, Vec3::Y).unwrap();
        assert!((dist - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_point_segment_degenerate_is_none() {
        assert!(point_segment_distance(Vec3::X, Vec3::ZERO, Vec3::ZERO).is_none());
    }

    #[test]
    fn test_slerp_respects_neighborhood() {
        let a = Quat::from_rotation_z(0.2);
        let b = -Quat::from_rotation_z(0.4);
        let mid = slerp(a, b, 0.5);
        assert!((rotation_angle(rotation_between(a, mid)) - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_rotation_angle_full_range() {
        assert!(rotation_angle(Quat::IDENTITY) < 1e-6);
        let half = Quat::from_rotation_x(PI);
        assert!((rotation_angle(half) - PI).abs() < 1e-5);
    }
}
