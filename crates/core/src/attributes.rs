use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Vertex,
    Corner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    Color,
    TexCoord,
    WeightGroups,
    ShapeOffset,
}

impl LayerType {
    /// Element kind whose table stores sub-layers of this type.
    pub fn element_kind(self) -> ElementKind {
        match self {
            LayerType::Color | LayerType::TexCoord => ElementKind::Corner,
            LayerType::WeightGroups | LayerType::ShapeOffset => ElementKind::Vertex,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeformWeight {
    pub group: u32,
    pub weight: f32,
}

impl DeformWeight {
    pub fn new(group: u32, weight: f32) -> Self {
        Self { group, weight }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerStorage {
    Color(Vec<[f32; 4]>),
    TexCoord(Vec<[f32; 2]>),
    WeightGroups(Vec<Vec<DeformWeight>>),
    ShapeOffset(Vec<[f32; 3]>),
}

impl LayerStorage {
    pub fn len(&self) -> usize {
        match self {
            LayerStorage::Color(values) => values.len(),
            LayerStorage::TexCoord(values) => values.len(),
            LayerStorage::WeightGroups(values) => values.len(),
            LayerStorage::ShapeOffset(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn layer_type(&self) -> LayerType {
        match self {
            LayerStorage::Color(_) => LayerType::Color,
            LayerStorage::TexCoord(_) => LayerType::TexCoord,
            LayerStorage::WeightGroups(_) => LayerType::WeightGroups,
            LayerStorage::ShapeOffset(_) => LayerType::ShapeOffset,
        }
    }

    /// Copies the raw value at `src_index` of `src` into `dst_index`.
    /// Returns false when the storages hold different layer types or an index is out of range.
    pub fn copy_value(&mut self, dst_index: usize, src: &LayerStorage, src_index: usize) -> bool {
        match (self, src) {
            (LayerStorage::Color(out), LayerStorage::Color(values)) => {
                copy_slot(out, dst_index, values, src_index)
            }
            (LayerStorage::TexCoord(out), LayerStorage::TexCoord(values)) => {
                copy_slot(out, dst_index, values, src_index)
            }
            (LayerStorage::WeightGroups(out), LayerStorage::WeightGroups(values)) => {
                match (out.get_mut(dst_index), values.get(src_index)) {
                    (Some(slot), Some(value)) => {
                        slot.clone_from(value);
                        true
                    }
                    _ => false,
                }
            }
            (LayerStorage::ShapeOffset(out), LayerStorage::ShapeOffset(values)) => {
                copy_slot(out, dst_index, values, src_index)
            }
            _ => false,
        }
    }

    /// Blends the values at `sources` with `weights` and stores the result at `dst_index`.
    /// Weight groups are summed per group and never renormalized.
    pub fn interpolate(
        &mut self,
        dst_index: usize,
        src: &LayerStorage,
        sources: &[u32],
        weights: &[f32],
    ) -> bool {
        debug_assert_eq!(sources.len(), weights.len());
        if sources.is_empty() || sources.iter().any(|&idx| idx as usize >= src.len()) {
            return false;
        }
        match (self, src) {
            (LayerStorage::Color(out), LayerStorage::Color(values)) => {
                blend_slot(out, dst_index, values, sources, weights)
            }
            (LayerStorage::TexCoord(out), LayerStorage::TexCoord(values)) => {
                blend_slot(out, dst_index, values, sources, weights)
            }
            (LayerStorage::ShapeOffset(out), LayerStorage::ShapeOffset(values)) => {
                blend_slot(out, dst_index, values, sources, weights)
            }
            (LayerStorage::WeightGroups(out), LayerStorage::WeightGroups(values)) => {
                let Some(slot) = out.get_mut(dst_index) else {
                    return false;
                };
                *slot = blend_weight_groups(values, sources, weights);
                true
            }
            _ => false,
        }
    }
}

fn copy_slot<T: Copy>(out: &mut [T], dst_index: usize, values: &[T], src_index: usize) -> bool {
    match (out.get_mut(dst_index), values.get(src_index)) {
        (Some(slot), Some(value)) => {
            *slot = *value;
            true
        }
        _ => false,
    }
}

fn blend_slot<const N: usize>(
    out: &mut [[f32; N]],
    dst_index: usize,
    values: &[[f32; N]],
    sources: &[u32],
    weights: &[f32],
) -> bool {
    let Some(slot) = out.get_mut(dst_index) else {
        return false;
    };
    let mut acc = [0.0f32; N];
    for (&src_index, &weight) in sources.iter().zip(weights) {
        let value = values[src_index as usize];
        for (channel, component) in acc.iter_mut().zip(value) {
            *channel += component * weight;
        }
    }
    *slot = acc;
    true
}

fn blend_weight_groups(
    values: &[Vec<DeformWeight>],
    sources: &[u32],
    weights: &[f32],
) -> Vec<DeformWeight> {
    let mut blended: Vec<DeformWeight> = Vec::new();
    for (&src_index, &weight) in sources.iter().zip(weights) {
        for entry in &values[src_index as usize] {
            let contribution = entry.weight * weight;
            match blended.iter_mut().find(|item| item.group == entry.group) {
                Some(item) => item.weight += contribution,
                None => blended.push(DeformWeight::new(entry.group, contribution)),
            }
        }
    }
    blended.sort_by_key(|item| item.group);
    blended
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerError {
    InvalidKind {
        kind: ElementKind,
        layer_type: LayerType,
    },
    InvalidLength {
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for LayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerError::InvalidKind { kind, layer_type } => {
                write!(f, "{layer_type:?} layers cannot be stored on {kind:?} elements")
            }
            LayerError::InvalidLength { expected, actual } => {
                write!(f, "layer has {actual} values, expected {expected}")
            }
        }
    }
}

impl std::error::Error for LayerError {}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub storage: LayerStorage,
}

/// Ordered sub-layers of one element kind. Sub-layers are addressed by
/// `(layer type, n)`, the n-th layer of that type in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerTable {
    layers: Vec<Layer>,
}

impl LayerTable {
    pub(crate) fn push(&mut self, name: String, storage: LayerStorage) -> usize {
        let layer_type = storage.layer_type();
        let n = self.count(layer_type);
        self.layers.push(Layer { name, storage });
        n
    }

    pub fn count(&self, layer_type: LayerType) -> usize {
        self.layers
            .iter()
            .filter(|layer| layer.storage.layer_type() == layer_type)
            .count()
    }

    pub fn layer_n(&self, layer_type: LayerType, n: usize) -> Option<&Layer> {
        self.layers
            .iter()
            .filter(|layer| layer.storage.layer_type() == layer_type)
            .nth(n)
    }

    pub fn layer_n_mut(&mut self, layer_type: LayerType, n: usize) -> Option<&mut Layer> {
        self.layers
            .iter_mut()
            .filter(|layer| layer.storage.layer_type() == layer_type)
            .nth(n)
    }

    pub fn named(&self, layer_type: LayerType, name: &str) -> Option<usize> {
        self.layers
            .iter()
            .filter(|layer| layer.storage.layer_type() == layer_type)
            .position(|layer| layer.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_are_addressed_per_type() {
        let mut table = LayerTable::default();
        table.push("uv".to_string(), LayerStorage::TexCoord(vec![[0.0, 0.0]]));
        table.push("col".to_string(), LayerStorage::Color(vec![[1.0; 4]]));
        let n = table.push("uv2".to_string(), LayerStorage::TexCoord(vec![[1.0, 1.0]]));
        assert_eq!(n, 1);
        assert_eq!(table.count(LayerType::TexCoord), 2);
        assert_eq!(table.layer_n(LayerType::TexCoord, 1).expect("uv2").name, "uv2");
        assert_eq!(table.layer_n(LayerType::Color, 0).expect("col").name, "col");
        assert!(table.layer_n(LayerType::Color, 1).is_none());
        assert_eq!(table.named(LayerType::TexCoord, "uv2"), Some(1));
    }

    #[test]
    fn copy_value_rejects_mismatched_types() {
        let mut dst = LayerStorage::TexCoord(vec![[0.0, 0.0]]);
        let src = LayerStorage::Color(vec![[1.0; 4]]);
        assert!(!dst.copy_value(0, &src, 0));
        assert_eq!(dst, LayerStorage::TexCoord(vec![[0.0, 0.0]]));
    }

    #[test]
    fn color_blend_is_linear_per_channel() {
        let src = LayerStorage::Color(vec![[1.0, 0.0, 0.0, 1.0], [0.0, 0.0, 1.0, 0.0]]);
        let mut dst = LayerStorage::Color(vec![[0.0; 4]]);
        assert!(dst.interpolate(0, &src, &[0, 1], &[0.25, 0.75]));
        let LayerStorage::Color(values) = dst else {
            panic!("expected color storage");
        };
        let expected = [0.25, 0.0, 0.75, 0.25];
        for (got, want) in values[0].iter().zip(expected) {
            assert!((got - want).abs() < 1.0e-6);
        }
    }

    #[test]
    fn weight_groups_are_summed_without_renormalizing() {
        let src = LayerStorage::WeightGroups(vec![
            vec![DeformWeight::new(2, 0.5)],
            vec![DeformWeight::new(0, 0.2), DeformWeight::new(2, 0.5)],
        ]);
        let mut dst = LayerStorage::WeightGroups(vec![Vec::new()]);
        assert!(dst.interpolate(0, &src, &[0, 1], &[0.5, 0.5]));
        let LayerStorage::WeightGroups(values) = dst else {
            panic!("expected weight groups");
        };
        let blended = &values[0];
        assert_eq!(blended.len(), 2);
        assert_eq!(blended[0].group, 0);
        assert!((blended[0].weight - 0.1).abs() < 1.0e-6);
        assert_eq!(blended[1].group, 2);
        assert!((blended[1].weight - 0.5).abs() < 1.0e-6);
        let total: f32 = blended.iter().map(|entry| entry.weight).sum();
        assert!((total - 0.6).abs() < 1.0e-6);
    }

    #[test]
    fn interpolate_ignores_out_of_range_sources() {
        let src = LayerStorage::ShapeOffset(vec![[1.0, 2.0, 3.0]]);
        let mut dst = LayerStorage::ShapeOffset(vec![[9.0, 9.0, 9.0]]);
        assert!(!dst.interpolate(0, &src, &[3], &[1.0]));
        assert_eq!(dst, LayerStorage::ShapeOffset(vec![[9.0, 9.0, 9.0]]));
    }

    #[test]
    fn layer_types_map_to_element_kinds() {
        assert_eq!(LayerType::Color.element_kind(), ElementKind::Corner);
        assert_eq!(LayerType::TexCoord.element_kind(), ElementKind::Corner);
        assert_eq!(LayerType::WeightGroups.element_kind(), ElementKind::Vertex);
        assert_eq!(LayerType::ShapeOffset.element_kind(), ElementKind::Vertex);
    }
}
