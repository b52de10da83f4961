use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::attributes::{ElementKind, LayerType};
use crate::correspondence::{build_face_map, build_vertex_map};
use crate::layer_copy::{
    copy_aligned, copy_interpolated, copy_mapped, CopyError, CopyStats, LayerGroup,
};
use crate::lift::{lift_single_mapping, lift_to_multi_mapping, MultiTarget};
use crate::mesh::PolyMesh;
use crate::spatial::SpatialIndex;
use crate::topology::MeshTopology;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// Element `i` to element `i`; both meshes must have equal element counts.
    Aligned,
    /// Nearest source vertex, lifted to corners by tangent agreement.
    Topology,
    /// Nearest source face, blended with polygon weights.
    Interpolated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Vertex,
    Corner,
}

impl Granularity {
    pub fn for_layer_type(layer_type: LayerType) -> Self {
        match layer_type.element_kind() {
            ElementKind::Vertex => Granularity::Vertex,
            ElementKind::Corner => Granularity::Corner,
        }
    }

    pub fn element_kind(self) -> ElementKind {
        match self {
            Granularity::Vertex => ElementKind::Vertex,
            Granularity::Corner => ElementKind::Corner,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    pub mode: TransferMode,
    pub granularity: Granularity,
    pub layer_type: LayerType,
    pub group: LayerGroup,
}

impl TransferRequest {
    /// Request at the natural granularity of `layer_type`.
    pub fn new(mode: TransferMode, layer_type: LayerType, group: LayerGroup) -> Self {
        Self {
            mode,
            granularity: Granularity::for_layer_type(layer_type),
            layer_type,
            group,
        }
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    /// Search radius for nearest-element queries; unbounded when unset.
    pub max_distance: Option<f32>,
}

impl TransferSettings {
    pub fn with_max_distance(max_distance: f32) -> Self {
        Self {
            max_distance: Some(max_distance),
        }
    }

    pub fn validate(&self) -> Result<(), TransferError> {
        if let Some(distance) = self.max_distance {
            if !distance.is_finite() || distance < 0.0 {
                return Err(TransferError::InvalidSettings(format!(
                    "max_distance must be finite and non-negative, got {distance}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransferError {
    InvalidSettings(String),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::InvalidSettings(message) => write!(f, "invalid settings: {message}"),
        }
    }
}

impl std::error::Error for TransferError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Applied,
    /// The layer group was left untouched; other work may continue.
    Skipped(CopyError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    pub request: TransferRequest,
    pub outcome: TransferOutcome,
    /// Destination elements at the request's granularity.
    pub elements: usize,
    /// Destination elements without a source correspondence.
    pub unmapped: usize,
    /// Destination elements that received values.
    pub written: usize,
}

impl TransferReport {
    pub fn is_applied(&self) -> bool {
        self.outcome == TransferOutcome::Applied
    }
}

/// Transfers one layer group from `src` to `dst`.
///
/// Panics when the request's granularity does not match the element kind
/// that stores `request.layer_type`.
pub fn transfer(
    src: &PolyMesh,
    dst: &mut PolyMesh,
    request: &TransferRequest,
    settings: &TransferSettings,
) -> Result<TransferReport, TransferError> {
    settings.validate()?;
    let mut context = TransferContext::new(src, settings);
    Ok(context.run(dst, request))
}

/// Runs several requests in order, sharing the source search structures.
/// A skipped request is recorded in its report and the rest still run.
pub fn transfer_all(
    src: &PolyMesh,
    dst: &mut PolyMesh,
    requests: &[TransferRequest],
    settings: &TransferSettings,
) -> Result<Vec<TransferReport>, TransferError> {
    settings.validate()?;
    let mut context = TransferContext::new(src, settings);
    Ok(requests
        .iter()
        .map(|request| context.run(dst, request))
        .collect())
}

// Search structures built on first use and dropped with the call.
struct TransferContext<'a> {
    src: &'a PolyMesh,
    max_distance: Option<f32>,
    index: Option<SpatialIndex>,
    src_topology: Option<MeshTopology>,
    dst_topology: Option<MeshTopology>,
}

impl<'a> TransferContext<'a> {
    fn new(src: &'a PolyMesh, settings: &TransferSettings) -> Self {
        Self {
            src,
            max_distance: settings.max_distance,
            index: None,
            src_topology: None,
            dst_topology: None,
        }
    }

    fn index(&mut self) -> &SpatialIndex {
        let src = self.src;
        let max_distance = self.max_distance;
        self.index
            .get_or_insert_with(|| SpatialIndex::build(src, max_distance))
    }

    fn src_topology(&mut self) -> &MeshTopology {
        let src = self.src;
        self.src_topology
            .get_or_insert_with(|| MeshTopology::build(src))
    }

    fn dst_topology(&mut self, dst: &PolyMesh) -> &MeshTopology {
        self.dst_topology
            .get_or_insert_with(|| MeshTopology::build(dst))
    }

    fn run(&mut self, dst: &mut PolyMesh, request: &TransferRequest) -> TransferReport {
        let kind = request.granularity.element_kind();
        assert_eq!(
            kind,
            request.layer_type.element_kind(),
            "{:?} layers cannot be transferred at {:?} granularity",
            request.layer_type,
            request.granularity
        );
        debug!(
            "transfer: {:?} {:?} at {:?} granularity, layers {:?}",
            request.mode, request.layer_type, request.granularity, request.group
        );

        let src = self.src;
        let src_count = src.element_count(kind);
        let dst_count = dst.element_count(kind);
        let layer_type = request.layer_type;
        let group = &request.group;

        let (result, unmapped) = match (request.mode, request.granularity) {
            (TransferMode::Aligned, _) => {
                let result = copy_aligned(
                    src.layers(kind),
                    src_count,
                    dst.layers_mut(kind),
                    dst_count,
                    layer_type,
                    group,
                );
                (result, 0)
            }
            (TransferMode::Topology, granularity) => {
                let vertex_map = build_vertex_map(self.index(), dst);
                let mapping = match granularity {
                    Granularity::Vertex => vertex_map,
                    Granularity::Corner => {
                        lift_single_mapping(src, self.src_topology(), &vertex_map, dst)
                    }
                };
                let unmapped = mapping.unmapped_count();
                let result = copy_mapped(
                    src.layers(kind),
                    src_count,
                    dst.layers_mut(kind),
                    dst_count,
                    layer_type,
                    group,
                    &mapping,
                );
                (result, unmapped)
            }
            (TransferMode::Interpolated, granularity) => {
                let face_map = build_face_map(self.index(), dst);
                let target = match granularity {
                    Granularity::Vertex => MultiTarget::Vertex,
                    Granularity::Corner => MultiTarget::Corner,
                };
                let dst_topology = self.dst_topology(dst);
                let mapping = lift_to_multi_mapping(src, &face_map, dst, dst_topology, target);
                let unmapped = mapping.unmapped_count();
                let result = copy_interpolated(
                    src.layers(kind),
                    dst.layers_mut(kind),
                    dst_count,
                    layer_type,
                    group,
                    &mapping,
                );
                (result, unmapped)
            }
        };

        match result {
            Ok(CopyStats { written, .. }) => {
                debug!(
                    "transfer: wrote {} of {} elements, {} without correspondence",
                    written, dst_count, unmapped
                );
                TransferReport {
                    request: *request,
                    outcome: TransferOutcome::Applied,
                    elements: dst_count,
                    unmapped,
                    written,
                }
            }
            Err(err) => {
                warn!(
                    "transfer: {:?} {:?} skipped: {}",
                    request.mode, request.layer_type, err
                );
                TransferReport {
                    request: *request,
                    outcome: TransferOutcome::Skipped(err),
                    elements: dst_count,
                    unmapped,
                    written: 0,
                }
            }
        }
    }
}
