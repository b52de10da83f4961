use crate::mesh::PolyMesh;

/// Adjacency derived from a mesh for one transfer call: the owning face of every
/// corner, and the corners around every vertex in ascending corner order.
#[derive(Debug, Clone, Default)]
pub struct MeshTopology {
    corner_faces: Vec<u32>,
    vertex_offsets: Vec<u32>,
    vertex_corners: Vec<u32>,
}

impl MeshTopology {
    pub fn build(mesh: &PolyMesh) -> Self {
        let mut corner_faces = vec![0u32; mesh.corner_count()];
        for face in 0..mesh.face_count() {
            for corner in mesh.face_corners(face) {
                corner_faces[corner] = face as u32;
            }
        }

        let mut vertex_offsets = vec![0u32; mesh.vertex_count() + 1];
        for &vertex in mesh.corner_verts() {
            vertex_offsets[vertex as usize + 1] += 1;
        }
        for i in 0..mesh.vertex_count() {
            vertex_offsets[i + 1] += vertex_offsets[i];
        }

        let mut fill: Vec<u32> = vertex_offsets[..mesh.vertex_count()].to_vec();
        let mut vertex_corners = vec![0u32; mesh.corner_count()];
        for (corner, &vertex) in mesh.corner_verts().iter().enumerate() {
            let slot = &mut fill[vertex as usize];
            vertex_corners[*slot as usize] = corner as u32;
            *slot += 1;
        }

        Self {
            corner_faces,
            vertex_offsets,
            vertex_corners,
        }
    }

    pub fn corner_face(&self, corner: usize) -> usize {
        self.corner_faces[corner] as usize
    }

    pub fn vertex_corners(&self, vertex: usize) -> &[u32] {
        let start = self.vertex_offsets[vertex] as usize;
        let end = self.vertex_offsets[vertex + 1] as usize;
        &self.vertex_corners[start..end]
    }

    /// Faces around a vertex, one entry per incident corner. Faces never revisit
    /// a vertex, so no face appears twice.
    pub fn vertex_faces(&self, vertex: usize) -> impl Iterator<Item = usize> + '_ {
        self.vertex_corners(vertex)
            .iter()
            .map(|&corner| self.corner_face(corner as usize))
    }
}
