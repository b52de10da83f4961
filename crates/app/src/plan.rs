use std::path::{Path, PathBuf};

use carryover_core::{
    LayerGroup, LayerType, PolyMesh, TransferMode, TransferRequest, TransferSettings,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct TransferPlan {
    pub source: PathBuf,
    pub target: PathBuf,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub max_distance: Option<f32>,
    #[serde(default)]
    pub transfers: Vec<PlanTransfer>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PlanTransfer {
    pub mode: TransferMode,
    pub layer: LayerType,
    /// Every sub-layer of `layer` when unset.
    #[serde(default)]
    pub layers: Option<LayerGroup>,
}

impl TransferPlan {
    pub(crate) fn settings(&self) -> TransferSettings {
        TransferSettings {
            max_distance: self.max_distance,
        }
    }
}

pub(crate) fn load_plan(path: &Path) -> Result<TransferPlan, String> {
    let data = std::fs::read(path).map_err(|err| err.to_string())?;
    let mut plan: TransferPlan = serde_json::from_slice(&data).map_err(|err| err.to_string())?;
    // mesh paths are relative to the plan file
    if let Some(dir) = path.parent() {
        plan.source = dir.join(&plan.source);
        plan.target = dir.join(&plan.target);
        plan.output = plan.output.map(|output| dir.join(output));
    }
    Ok(plan)
}

/// Checks every planned layer group against both meshes and builds the requests.
/// Transfers naming a layer type that neither mesh has are dropped with a warning.
pub(crate) fn resolve_requests(
    transfers: &[PlanTransfer],
    src: &PolyMesh,
    dst: &PolyMesh,
) -> Result<Vec<TransferRequest>, String> {
    let mut requests = Vec::with_capacity(transfers.len());
    for transfer in transfers {
        let layer_type = transfer.layer;
        let kind = layer_type.element_kind();
        let src_layers = src.layers(kind).count(layer_type);
        let dst_layers = dst.layers(kind).count(layer_type);

        let group = match transfer.layers {
            Some(group) => {
                if !group.is_balanced() {
                    return Err(format!(
                        "{layer_type:?}: layer ranges {}..={} and {}..={} differ in length",
                        group.src_start, group.src_end, group.dst_start, group.dst_end
                    ));
                }
                if group.src_end >= src_layers || group.dst_end >= dst_layers {
                    return Err(format!(
                        "{layer_type:?}: layer group {group:?} is out of range (source has {src_layers}, target has {dst_layers})"
                    ));
                }
                group
            }
            None => {
                if src_layers != dst_layers {
                    return Err(format!(
                        "{layer_type:?}: source has {src_layers} layers, target has {dst_layers}"
                    ));
                }
                let Some(group) = LayerGroup::all(src_layers) else {
                    tracing::warn!("plan: no {:?} layers on either mesh; skipping", layer_type);
                    continue;
                };
                group
            }
        };
        requests.push(TransferRequest::new(transfer.mode, layer_type, group));
    }
    Ok(requests)
}
