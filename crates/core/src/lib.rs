mod attributes;
mod correspondence;
mod layer_copy;
mod lift;
mod mapping;
mod mesh;
mod poly_weights;
mod spatial;
mod topology;
mod transfer;

pub use attributes::{
    DeformWeight, ElementKind, Layer, LayerError, LayerStorage, LayerTable, LayerType,
};
pub use correspondence::{build_face_map, build_vertex_map};
pub use layer_copy::{
    copy_aligned, copy_interpolated, copy_mapped, CopyError, CopyStats, LayerGroup,
};
pub use lift::{best_tangent_corner, lift_single_mapping, lift_to_multi_mapping, MultiTarget};
pub use mapping::{MultiMapping, MultiMappingBuilder, SingleMapping};
pub use mesh::{make_box, make_grid, MeshError, PolyMesh};
pub use poly_weights::{interp_weights_poly, interp_weights_poly_into};
pub use spatial::{FaceHit, SpatialIndex};
pub use topology::MeshTopology;
pub use transfer::{
    transfer, transfer_all, Granularity, TransferError, TransferMode, TransferOutcome,
    TransferReport, TransferRequest, TransferSettings,
};
