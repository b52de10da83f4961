use glam::Vec3;
use tracing::debug;

use crate::mapping::{MultiMapping, MultiMappingBuilder, SingleMapping};
use crate::mesh::PolyMesh;
use crate::poly_weights::interp_weights_poly;
use crate::topology::MeshTopology;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiTarget {
    Corner,
    Vertex,
}

/// Lifts a vertex mapping to corners: each destination corner takes the corner
/// of its mapped source vertex whose face tangent agrees best with its own.
pub fn lift_single_mapping(
    src: &PolyMesh,
    src_topology: &MeshTopology,
    vertex_map: &SingleMapping,
    dst: &PolyMesh,
) -> SingleMapping {
    let mut mapping = SingleMapping::unmapped(dst.corner_count());
    for face in 0..dst.face_count() {
        for corner in dst.face_corners(face) {
            let vertex = dst.corner_vertex(corner) as usize;
            let Some(src_vertex) = vertex_map.get(vertex) else {
                continue;
            };
            let tangent = dst.corner_tangent(face, corner);
            mapping.set(
                corner,
                best_tangent_corner(src, src_topology, src_vertex as usize, tangent),
            );
        }
    }
    debug!(
        "corner lift: {} destination corners, {} unmapped",
        mapping.len(),
        mapping.unmapped_count()
    );
    mapping
}

/// Corner around `vertex` with the largest tangent dot product against `tangent`.
/// Ties keep the corner seen first in ascending corner order.
pub fn best_tangent_corner(
    mesh: &PolyMesh,
    topology: &MeshTopology,
    vertex: usize,
    tangent: Vec3,
) -> Option<u32> {
    let mut best: Option<(u32, f32)> = None;
    for &corner in topology.vertex_corners(vertex) {
        let face = topology.corner_face(corner as usize);
        let dot = mesh.corner_tangent(face, corner as usize).dot(tangent);
        match best {
            Some((_, best_dot)) if dot <= best_dot => {}
            _ => best = Some((corner, dot)),
        }
    }
    best.map(|(corner, _)| corner)
}

/// Expands a face mapping into weighted source corners or vertices.
pub fn lift_to_multi_mapping(
    src: &PolyMesh,
    face_map: &SingleMapping,
    dst: &PolyMesh,
    dst_topology: &MeshTopology,
    target: MultiTarget,
) -> MultiMapping {
    let mapping = match target {
        MultiTarget::Corner => lift_faces_to_corners(src, face_map, dst),
        MultiTarget::Vertex => lift_faces_to_vertices(src, face_map, dst, dst_topology),
    };
    debug!(
        "{:?} multi-lift: {} destination elements, {} unmapped, {} weighted entries",
        target,
        mapping.len(),
        mapping.unmapped_count(),
        mapping.sources().len()
    );
    mapping
}

fn lift_faces_to_corners(
    src: &PolyMesh,
    face_map: &SingleMapping,
    dst: &PolyMesh,
) -> MultiMapping {
    let mut builder =
        MultiMappingBuilder::with_capacity(dst.corner_count(), dst.corner_count() * 4);
    let mut sources: Vec<u32> = Vec::new();
    let mut positions: Vec<Vec3> = Vec::new();
    for face in 0..dst.face_count() {
        let Some(src_face) = face_map.get(face) else {
            for _ in dst.face_corners(face) {
                builder.push_unmapped();
            }
            continue;
        };
        let src_face = src_face as usize;
        sources.clear();
        sources.extend(src.face_corners(src_face).map(|corner| corner as u32));
        positions.clear();
        positions.extend(src.face_positions(src_face));

        for corner in dst.face_corners(face) {
            let weights = interp_weights_poly(&positions, dst.corner_position(corner));
            builder.push(&sources, &weights);
        }
    }
    builder.finish()
}

// Vertices of every mapped neighbour face are pooled without deduplication and
// weighted jointly against the destination vertex.
fn lift_faces_to_vertices(
    src: &PolyMesh,
    face_map: &SingleMapping,
    dst: &PolyMesh,
    dst_topology: &MeshTopology,
) -> MultiMapping {
    let mut builder =
        MultiMappingBuilder::with_capacity(dst.vertex_count(), dst.corner_count() * 4);
    let mut sources: Vec<u32> = Vec::new();
    let mut positions: Vec<Vec3> = Vec::new();
    for vertex in 0..dst.vertex_count() {
        sources.clear();
        positions.clear();
        for face in dst_topology.vertex_faces(vertex) {
            let Some(src_face) = face_map.get(face) else {
                continue;
            };
            let src_face = src_face as usize;
            sources.extend_from_slice(src.face_vertices(src_face));
            positions.extend(src.face_positions(src_face));
        }
        if sources.is_empty() {
            builder.push_unmapped();
            continue;
        }
        let weights = interp_weights_poly(&positions, dst.position(vertex));
        builder.push(&sources, &weights);
    }
    builder.finish()
}
