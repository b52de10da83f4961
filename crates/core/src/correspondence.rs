use tracing::debug;

use crate::mapping::SingleMapping;
use crate::mesh::PolyMesh;
use crate::spatial::SpatialIndex;

/// Nearest source vertex for every destination vertex.
pub fn build_vertex_map(source: &SpatialIndex, dst: &PolyMesh) -> SingleMapping {
    let mapping: SingleMapping = (0..dst.vertex_count())
        .map(|vertex| source.nearest_vertex(dst.position(vertex)))
        .collect();
    debug!(
        "vertex map: {} destination vertices, {} unmapped",
        mapping.len(),
        mapping.unmapped_count()
    );
    mapping
}

/// Source face closest to the mean center of every destination face.
pub fn build_face_map(source: &SpatialIndex, dst: &PolyMesh) -> SingleMapping {
    let mapping: SingleMapping = (0..dst.face_count())
        .map(|face| {
            source
                .nearest_point_on_face(dst.face_center_mean(face))
                .map(|hit| hit.face)
        })
        .collect();
    debug!(
        "face map: {} destination faces, {} unmapped",
        mapping.len(),
        mapping.unmapped_count()
    );
    mapping
}
