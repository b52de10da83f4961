use std::fmt;
use std::ops::Range;

use glam::Vec3;

use crate::attributes::{ElementKind, Layer, LayerError, LayerStorage, LayerTable, LayerType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshError {
    FaceTooSmall { face: usize, corners: usize },
    VertexOutOfRange { face: usize, vertex: u32 },
    RepeatedVertex { face: usize, vertex: u32 },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::FaceTooSmall { face, corners } => {
                write!(f, "face {face} has {corners} corners, at least 3 required")
            }
            MeshError::VertexOutOfRange { face, vertex } => {
                write!(f, "face {face} references missing vertex {vertex}")
            }
            MeshError::RepeatedVertex { face, vertex } => {
                write!(f, "face {face} uses vertex {vertex} more than once")
            }
        }
    }
}

impl std::error::Error for MeshError {}

/// Polygon mesh with flat corner storage: the corners of face `f` are
/// `face_offsets[f]..face_offsets[f + 1]`, each holding its vertex index.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyMesh {
    pub positions: Vec<[f32; 3]>,
    face_offsets: Vec<u32>,
    corner_verts: Vec<u32>,
    vertex_layers: LayerTable,
    corner_layers: LayerTable,
}

impl Default for PolyMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl PolyMesh {
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            face_offsets: vec![0],
            corner_verts: Vec::new(),
            vertex_layers: LayerTable::default(),
            corner_layers: LayerTable::default(),
        }
    }

    pub fn from_polygons<F>(positions: Vec<[f32; 3]>, faces: F) -> Result<Self, MeshError>
    where
        F: IntoIterator,
        F::Item: AsRef<[u32]>,
    {
        let mut mesh = Self {
            positions,
            ..Self::new()
        };
        for (face, verts) in faces.into_iter().enumerate() {
            let verts = verts.as_ref();
            if verts.len() < 3 {
                return Err(MeshError::FaceTooSmall {
                    face,
                    corners: verts.len(),
                });
            }
            if let Some(&vertex) = verts
                .iter()
                .find(|&&vertex| vertex as usize >= mesh.positions.len())
            {
                return Err(MeshError::VertexOutOfRange { face, vertex });
            }
            // each face visits a vertex at most once
            for (i, &vertex) in verts.iter().enumerate().skip(1) {
                if verts[..i].contains(&vertex) {
                    return Err(MeshError::RepeatedVertex { face, vertex });
                }
            }
            mesh.corner_verts.extend_from_slice(verts);
            mesh.face_offsets.push(mesh.corner_verts.len() as u32);
        }
        Ok(mesh)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.face_offsets.len().saturating_sub(1)
    }

    pub fn corner_count(&self) -> usize {
        self.corner_verts.len()
    }

    pub fn element_count(&self, kind: ElementKind) -> usize {
        match kind {
            ElementKind::Vertex => self.vertex_count(),
            ElementKind::Corner => self.corner_count(),
        }
    }

    pub fn face_corners(&self, face: usize) -> Range<usize> {
        self.face_offsets[face] as usize..self.face_offsets[face + 1] as usize
    }

    pub fn face_vertices(&self, face: usize) -> &[u32] {
        &self.corner_verts[self.face_corners(face)]
    }

    pub fn corner_verts(&self) -> &[u32] {
        &self.corner_verts
    }

    pub fn corner_vertex(&self, corner: usize) -> u32 {
        self.corner_verts[corner]
    }

    pub fn position(&self, vertex: usize) -> Vec3 {
        Vec3::from(self.positions[vertex])
    }

    pub fn corner_position(&self, corner: usize) -> Vec3 {
        self.position(self.corner_verts[corner] as usize)
    }

    pub fn face_positions(&self, face: usize) -> impl Iterator<Item = Vec3> + '_ {
        self.face_vertices(face)
            .iter()
            .map(|&vertex| self.position(vertex as usize))
    }

    pub fn face_center_mean(&self, face: usize) -> Vec3 {
        let verts = self.face_vertices(face);
        let sum: Vec3 = self.face_positions(face).sum();
        sum / verts.len() as f32
    }

    /// Newell normal; zero for degenerate faces.
    pub fn face_normal(&self, face: usize) -> Vec3 {
        let verts = self.face_vertices(face);
        let mut normal = Vec3::ZERO;
        for (i, &vertex) in verts.iter().enumerate() {
            let a = self.position(vertex as usize);
            let b = self.position(verts[(i + 1) % verts.len()] as usize);
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
        }
        normal.normalize_or_zero()
    }

    /// In-surface direction of a corner: the bisector of its two boundary edges,
    /// pointing into the face.
    pub fn corner_tangent(&self, face: usize, corner: usize) -> Vec3 {
        let range = self.face_corners(face);
        let len = range.len();
        let local = corner - range.start;
        let prev = range.start + (local + len - 1) % len;
        let next = range.start + (local + 1) % len;

        let co = self.corner_position(corner);
        let v_prev = (self.corner_position(prev) - co).normalize_or_zero();
        let v_next = (co - self.corner_position(next)).normalize_or_zero();
        let dir = v_prev + v_next;
        let face_normal = self.face_normal(face);

        let tangent = if v_prev.abs_diff_eq(v_next, f32::EPSILON * 10.0) {
            dir.cross(face_normal)
        } else {
            let mut normal = v_prev.cross(v_next);
            // concave corner
            if normal.dot(face_normal) < 0.0 {
                normal = -normal;
            }
            dir.cross(normal)
        };
        tangent.normalize_or_zero()
    }

    pub fn layers(&self, kind: ElementKind) -> &LayerTable {
        match kind {
            ElementKind::Vertex => &self.vertex_layers,
            ElementKind::Corner => &self.corner_layers,
        }
    }

    pub fn layers_mut(&mut self, kind: ElementKind) -> &mut LayerTable {
        match kind {
            ElementKind::Vertex => &mut self.vertex_layers,
            ElementKind::Corner => &mut self.corner_layers,
        }
    }

    pub fn layer(&self, layer_type: LayerType, n: usize) -> Option<&Layer> {
        self.layers(layer_type.element_kind()).layer_n(layer_type, n)
    }

    /// Adds a sub-layer and returns its index among layers of the same type.
    pub fn add_layer(
        &mut self,
        kind: ElementKind,
        name: impl Into<String>,
        storage: LayerStorage,
    ) -> Result<usize, LayerError> {
        let layer_type = storage.layer_type();
        if layer_type.element_kind() != kind {
            return Err(LayerError::InvalidKind { kind, layer_type });
        }
        let expected = self.element_count(kind);
        if storage.len() != expected {
            return Err(LayerError::InvalidLength {
                expected,
                actual: storage.len(),
            });
        }
        Ok(self.layers_mut(kind).push(name.into(), storage))
    }
}

pub fn make_box(size: [f32; 3]) -> PolyMesh {
    let hx = size[0] * 0.5;
    let hy = size[1] * 0.5;
    let hz = size[2] * 0.5;

    let positions = vec![
        [-hx, -hy, -hz],
        [hx, -hy, -hz],
        [hx, hy, -hz],
        [-hx, hy, -hz],
        [-hx, -hy, hz],
        [hx, -hy, hz],
        [hx, hy, hz],
        [-hx, hy, hz],
    ];

    let faces: [[u32; 4]; 6] = [
        [0, 3, 2, 1], // -Z
        [4, 5, 6, 7], // +Z
        [0, 1, 5, 4], // -Y
        [2, 3, 7, 6], // +Y
        [1, 2, 6, 5], // +X
        [3, 0, 4, 7], // -X
    ];

    build_unchecked(positions, faces.iter())
}

/// Quad grid in the XZ plane, centered on the origin, facing +Y.
pub fn make_grid(size: [f32; 2], divisions: [u32; 2]) -> PolyMesh {
    let width = size[0].max(0.0);
    let depth = size[1].max(0.0);
    let div_x = divisions[0].max(1);
    let div_z = divisions[1].max(1);

    let step_x = width / div_x as f32;
    let step_z = depth / div_z as f32;
    let origin_x = -width * 0.5;
    let origin_z = -depth * 0.5;

    let mut positions = Vec::new();
    for z in 0..=div_z {
        for x in 0..=div_x {
            positions.push([
                origin_x + x as f32 * step_x,
                0.0,
                origin_z + z as f32 * step_z,
            ]);
        }
    }

    let mut faces = Vec::new();
    let stride = div_x + 1;
    for z in 0..div_z {
        for x in 0..div_x {
            let i0 = z * stride + x;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;
            faces.push([i0, i2, i3, i1]);
        }
    }

    build_unchecked(positions, faces.iter())
}

// Generated faces are always in range, so construction cannot fail.
fn build_unchecked<F>(positions: Vec<[f32; 3]>, faces: F) -> PolyMesh
where
    F: IntoIterator,
    F::Item: AsRef<[u32]>,
{
    let mut mesh = PolyMesh {
        positions,
        ..PolyMesh::new()
    };
    for verts in faces {
        mesh.corner_verts.extend_from_slice(verts.as_ref());
        mesh.face_offsets.push(mesh.corner_verts.len() as u32);
    }
    mesh
}
