use carryover_core::{
    make_grid, DeformWeight, ElementKind, LayerGroup, LayerStorage, LayerType, PolyMesh,
    TransferMode, TransferRequest, TransferSettings,
};
use glam::Vec3;

use crate::obj_io::{COLOR_LAYER, UV_LAYER};

pub(crate) struct DemoPlan {
    pub source: PolyMesh,
    pub target: PolyMesh,
    pub requests: Vec<TransferRequest>,
    pub settings: TransferSettings,
}

/// A coarse grid carrying every layer type, transferred onto a finer grid of the same extent.
pub(crate) fn demo_plan() -> Result<DemoPlan, String> {
    let mut source = make_grid([2.0, 2.0], [2, 2]);
    let corner_positions: Vec<Vec3> = (0..source.corner_count())
        .map(|corner| source.corner_position(corner))
        .collect();
    let uvs = corner_positions
        .iter()
        .map(|p| [(p.x + 1.0) * 0.5, (p.z + 1.0) * 0.5])
        .collect();
    let colors = corner_positions
        .iter()
        .map(|p| [(p.x + 1.0) * 0.5, 0.25, (p.z + 1.0) * 0.5, 1.0])
        .collect();
    let offsets = source
        .positions
        .iter()
        .map(|&p| {
            let p = Vec3::from(p);
            (Vec3::Y * (1.0 - p.length_squared() * 0.25)).to_array()
        })
        .collect();
    let weights = source
        .positions
        .iter()
        .map(|p| {
            let left = ((1.0 - p[0]) * 0.5).clamp(0.0, 1.0);
            vec![DeformWeight::new(0, left), DeformWeight::new(1, 1.0 - left)]
        })
        .collect();
    add_layers(&mut source, uvs, colors, offsets, weights)?;

    let mut target = make_grid([2.0, 2.0], [4, 4]);
    let corners = target.corner_count();
    let vertices = target.vertex_count();
    add_layers(
        &mut target,
        vec![[0.0; 2]; corners],
        vec![[0.0; 4]; corners],
        vec![[0.0; 3]; vertices],
        vec![Vec::new(); vertices],
    )?;

    let group = LayerGroup::single(0);
    let requests = vec![
        TransferRequest::new(TransferMode::Interpolated, LayerType::TexCoord, group),
        TransferRequest::new(TransferMode::Interpolated, LayerType::Color, group),
        TransferRequest::new(TransferMode::Interpolated, LayerType::ShapeOffset, group),
        TransferRequest::new(TransferMode::Interpolated, LayerType::WeightGroups, group),
        // element counts differ, so this one is reported as skipped
        TransferRequest::new(TransferMode::Topology, LayerType::ShapeOffset, group),
    ];

    Ok(DemoPlan {
        source,
        target,
        requests,
        settings: TransferSettings::default(),
    })
}

fn add_layers(
    mesh: &mut PolyMesh,
    uvs: Vec<[f32; 2]>,
    colors: Vec<[f32; 4]>,
    offsets: Vec<[f32; 3]>,
    weights: Vec<Vec<DeformWeight>>,
) -> Result<(), String> {
    mesh.add_layer(ElementKind::Corner, UV_LAYER, LayerStorage::TexCoord(uvs))
        .map_err(|err| err.to_string())?;
    mesh.add_layer(ElementKind::Corner, COLOR_LAYER, LayerStorage::Color(colors))
        .map_err(|err| err.to_string())?;
    mesh.add_layer(ElementKind::Vertex, "bulge", LayerStorage::ShapeOffset(offsets))
        .map_err(|err| err.to_string())?;
    mesh.add_layer(ElementKind::Vertex, "deform", LayerStorage::WeightGroups(weights))
        .map_err(|err| err.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carryover_core::{transfer_all, TransferOutcome};

    #[test]
    fn demo_transfers_all_but_topology() {
        let mut demo = demo_plan().expect("demo");
        let reports = transfer_all(
            &demo.source,
            &mut demo.target,
            &demo.requests,
            &demo.settings,
        )
        .expect("transfer");
        assert_eq!(reports.len(), 5);
        for report in &reports[..4] {
            assert_eq!(report.outcome, TransferOutcome::Applied);
            assert_eq!(report.unmapped, 0);
            assert_eq!(report.written, report.elements);
        }
        assert!(!reports[4].is_applied());

        let Some(layer) = demo.target.layer(LayerType::TexCoord, 0) else {
            panic!("missing uv layer");
        };
        let LayerStorage::TexCoord(uvs) = &layer.storage else {
            panic!("expected texture coordinates");
        };
        for (corner, uv) in uvs.iter().enumerate() {
            let p = demo.target.corner_position(corner);
            assert!((uv[0] - (p.x + 1.0) * 0.5).abs() < 1.0e-4);
            assert!((uv[1] - (p.z + 1.0) * 0.5).abs() < 1.0e-4);
        }
    }
}
