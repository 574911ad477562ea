//! AABB-vs-triangle separating-axis collision with minimum-translation
//! resolution.
//!
//! Thirteen axes per triangle: the three box face normals, the triangle
//! normal, and the nine edge/face-normal cross products. The smallest
//! overlap across all axes is the penetration depth; its axis, pointed from
//! the triangle toward the box center, is the MTV. Near-zero cross products
//! are skipped as non-separating.

use glam::Vec3;

use crate::chunk::ChunkCoord;
use crate::constants::movement::RESOLVE_ITERATIONS;

use super::TriSoup;

const DEGENERATE_AXIS_SQ: f32 = 1e-8;
/// MTV directions steeper than this count as standing ground
const GROUND_NORMAL_Y: f32 = 0.5;

/// Push an AABB out of the terrain around it, killing the velocity
/// component that points into each contact. Returns whether any contact
/// qualified as ground.
///
/// Scans the 27 chunks around the entity; sub-stepping upstream keeps
/// per-step motion small enough that one ring suffices.
pub fn resolve_terrain(pos: &mut Vec3, vel: &mut Vec3, half: Vec3, soup: &TriSoup) -> bool {
    let mut grounded = false;

    for _ in 0..RESOLVE_ITERATIONS {
        let center_chunk = ChunkCoord::from_world_pos(*pos);
        let mut moved = false;

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(triangles) = soup.triangles(center_chunk.offset(dx, dy, dz))
                    else {
                        continue;
                    };
                    for tri in triangles.chunks_exact(3) {
                        let Some(mtv) = aabb_triangle_mtv(*pos, half, tri[0], tri[1], tri[2])
                        else {
                            continue;
                        };
                        *pos += mtv;
                        moved = true;

                        let dir = mtv.normalize_or_zero();
                        let into = vel.dot(dir);
                        if into < 0.0 {
                            *vel -= dir * into;
                        }
                        if dir.y > GROUND_NORMAL_Y {
                            grounded = true;
                        }
                    }
                }
            }
        }

        if !moved {
            break;
        }
    }

    grounded
}

/// SAT test for one triangle. Returns the minimum translation vector when
/// the shapes overlap.
pub fn aabb_triangle_mtv(center: Vec3, half: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<Vec3> {
    let ab = b - a;
    let bc = c - b;
    let ca = a - c;
    let tri_normal = ab.cross(c - a);

    let mut depth = f32::INFINITY;
    let mut mtv_axis = Vec3::Y;

    const FACE_AXES: [Vec3; 3] = [Vec3::X, Vec3::Y, Vec3::Z];

    for axis in FACE_AXES {
        axis_overlap(axis, center, half, a, b, c, &mut depth, &mut mtv_axis)?;
    }
    axis_overlap(tri_normal, center, half, a, b, c, &mut depth, &mut mtv_axis)?;
    for edge in [ab, bc, ca] {
        for axis in FACE_AXES {
            axis_overlap(
                edge.cross(axis),
                center,
                half,
                a,
                b,
                c,
                &mut depth,
                &mut mtv_axis,
            )?;
        }
    }

    // Point the push from the triangle toward the box center.
    if mtv_axis.dot(a - center) > 0.0 {
        mtv_axis = -mtv_axis;
    }
    Some(mtv_axis * depth)
}

/// Project both shapes onto `axis`. `None` means separated (test over);
/// otherwise the running minimum overlap is updated.
#[allow(clippy::too_many_arguments)]
fn axis_overlap(
    axis: Vec3,
    center: Vec3,
    half: Vec3,
    a: Vec3,
    b: Vec3,
    c: Vec3,
    depth: &mut f32,
    mtv_axis: &mut Vec3,
) -> Option<()> {
    let len_sq = axis.length_squared();
    if len_sq < DEGENERATE_AXIS_SQ {
        // Degenerate cross product: cannot separate, skip.
        return Some(());
    }
    let n = axis / len_sq.sqrt();

    let pa = n.dot(a - center);
    let pb = n.dot(b - center);
    let pc = n.dot(c - center);
    let tri_min = pa.min(pb).min(pc);
    let tri_max = pa.max(pb).max(pc);

    let r = n.x.abs() * half.x + n.y.abs() * half.y + n.z.abs() * half.z;
    if tri_min > r || tri_max < -r {
        return None;
    }

    let overlap = (r - tri_min).min(tri_max + r);
    if overlap < *depth {
        *depth = overlap;
        *mtv_axis = n;
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkMesh, Vertex};

    /// Soup with one big horizontal quad at the given height
    fn floor_soup(height: f32) -> TriSoup {
        let mut soup = TriSoup::new();
        let v = |x: f32, z: f32| Vertex {
            position: Vec3::new(x, height, z),
            normal: Vec3::Y,
        };
        let mesh = ChunkMesh {
            coord: ChunkCoord::new(0, 0, 0),
            vertices: vec![v(0.0, 0.0), v(30.0, 0.0), v(30.0, 30.0), v(0.0, 30.0)],
            indices: vec![0, 2, 1, 0, 3, 2],
        };
        soup.insert_mesh(&mesh);
        soup
    }

    #[test]
    fn separated_shapes_have_no_mtv() {
        let mtv = aabb_triangle_mtv(
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::splat(0.5),
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        assert!(mtv.is_none());
    }

    #[test]
    fn overlap_pushes_toward_box_center() {
        let mtv = aabb_triangle_mtv(
            Vec3::new(0.0, 0.3, 0.0),
            Vec3::splat(0.5),
            Vec3::new(-5.0, 0.0, -5.0),
            Vec3::new(5.0, 0.0, -5.0),
            Vec3::new(0.0, 0.0, 5.0),
        )
        .expect("box straddles the triangle");
        assert!(mtv.y > 0.0, "push should be upward, got {mtv:?}");
        assert!((mtv.y - 0.2).abs() < 1e-4, "depth should be 0.2, got {mtv:?}");
        assert!(mtv.x.abs() < 1e-5 && mtv.z.abs() < 1e-5);
    }

    #[test]
    fn resolve_lands_box_on_floor_and_grounds_it() {
        let soup = floor_soup(10.0);
        let mut pos = Vec3::new(15.0, 10.2, 15.0);
        let mut vel = Vec3::new(2.0, -5.0, 0.0);
        let half = Vec3::splat(0.5);

        let grounded = resolve_terrain(&mut pos, &mut vel, half, &soup);
        assert!(grounded);
        assert!((pos.y - 10.5).abs() < 1e-3, "rests with half extent above floor");
        assert!(vel.y.abs() < 1e-4, "downward velocity killed");
        assert!((vel.x - 2.0).abs() < 1e-4, "tangent velocity preserved");
    }

    #[test]
    fn resolve_without_overlap_is_a_no_op() {
        let soup = floor_soup(10.0);
        let mut pos = Vec3::new(15.0, 20.0, 15.0);
        let mut vel = Vec3::new(0.0, -1.0, 0.0);
        let grounded = resolve_terrain(&mut pos, &mut vel, Vec3::splat(0.5), &soup);
        assert!(!grounded);
        assert_eq!(pos, Vec3::new(15.0, 20.0, 15.0));
        assert_eq!(vel, Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn upward_velocity_survives_a_floor_contact() {
        let soup = floor_soup(10.0);
        let mut pos = Vec3::new(15.0, 10.3, 15.0);
        let mut vel = Vec3::new(0.0, 3.0, 0.0);
        resolve_terrain(&mut pos, &mut vel, Vec3::splat(0.5), &soup);
        assert!((vel.y - 3.0).abs() < 1e-4, "outgoing velocity untouched");
    }
}
