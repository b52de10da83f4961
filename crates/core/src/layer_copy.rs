use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::attributes::{LayerStorage, LayerTable, LayerType};
use crate::mapping::{MultiMapping, SingleMapping};

/// Inclusive sub-layer ranges paired index by index between two tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerGroup {
    pub src_start: usize,
    pub src_end: usize,
    pub dst_start: usize,
    pub dst_end: usize,
}

impl LayerGroup {
    pub fn new(src_start: usize, src_end: usize, dst_start: usize, dst_end: usize) -> Self {
        Self {
            src_start,
            src_end,
            dst_start,
            dst_end,
        }
    }

    /// Pairs sub-layer `n` on both sides.
    pub fn single(n: usize) -> Self {
        Self::new(n, n, n, n)
    }

    /// Pairs the first `count` sub-layers on both sides.
    pub fn all(count: usize) -> Option<Self> {
        let end = count.checked_sub(1)?;
        Some(Self::new(0, end, 0, end))
    }

    pub fn len(&self) -> usize {
        (self.dst_end + 1).saturating_sub(self.dst_start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_balanced(&self) -> bool {
        self.src_end >= self.src_start
            && self.dst_end >= self.dst_start
            && self.src_end - self.src_start == self.dst_end - self.dst_start
    }

    /// `(source n, destination n)` for every paired sub-layer.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> {
        (self.src_start..=self.src_end).zip(self.dst_start..=self.dst_end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyStats {
    /// Destination elements that received at least one value.
    pub written: usize,
    /// Destination elements left untouched.
    pub skipped: usize,
}

impl CopyStats {
    fn from_touched(touched: &[bool]) -> Self {
        let written = touched.iter().filter(|&&hit| hit).count();
        Self {
            written,
            skipped: touched.len() - written,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyError {
    LengthMismatch { source: usize, destination: usize },
    MappingLength { expected: usize, actual: usize },
}

impl fmt::Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyError::LengthMismatch {
                source,
                destination,
            } => write!(
                f,
                "element counts differ: source has {source}, destination has {destination}"
            ),
            CopyError::MappingLength { expected, actual } => {
                write!(f, "mapping covers {actual} elements, expected {expected}")
            }
        }
    }
}

impl std::error::Error for CopyError {}

/// Copies element `i` of every paired source sub-layer into element `i` of the destination.
pub fn copy_aligned(
    src: &LayerTable,
    src_count: usize,
    dst: &mut LayerTable,
    dst_count: usize,
    layer_type: LayerType,
    group: &LayerGroup,
) -> Result<CopyStats, CopyError> {
    check_counts(src_count, dst_count)?;
    let mut touched = vec![false; dst_count];
    each_layer_pair(src, dst, layer_type, group, |out, values| {
        for (index, hit) in touched.iter_mut().enumerate() {
            if out.copy_value(index, values, index) {
                *hit = true;
            }
        }
    });
    Ok(CopyStats::from_touched(&touched))
}

/// Copies the mapped source element into each destination element.
/// Unmapped destination elements keep their current values.
pub fn copy_mapped(
    src: &LayerTable,
    src_count: usize,
    dst: &mut LayerTable,
    dst_count: usize,
    layer_type: LayerType,
    group: &LayerGroup,
    mapping: &SingleMapping,
) -> Result<CopyStats, CopyError> {
    check_counts(src_count, dst_count)?;
    check_mapping(dst_count, mapping.len())?;
    let mut touched = vec![false; dst_count];
    each_layer_pair(src, dst, layer_type, group, |out, values| {
        for (index, hit) in touched.iter_mut().enumerate() {
            let Some(source) = mapping.get(index) else {
                continue;
            };
            if out.copy_value(index, values, source as usize) {
                *hit = true;
            }
        }
    });
    Ok(CopyStats::from_touched(&touched))
}

/// Blends weighted source elements into each destination element.
/// Destination elements with an empty slice keep their current values.
pub fn copy_interpolated(
    src: &LayerTable,
    dst: &mut LayerTable,
    dst_count: usize,
    layer_type: LayerType,
    group: &LayerGroup,
    mapping: &MultiMapping,
) -> Result<CopyStats, CopyError> {
    check_mapping(dst_count, mapping.len())?;
    let mut touched = vec![false; dst_count];
    each_layer_pair(src, dst, layer_type, group, |out, values| {
        for (index, hit) in touched.iter_mut().enumerate() {
            let (sources, weights) = mapping.get(index);
            if sources.is_empty() {
                continue;
            }
            if out.interpolate(index, values, sources, weights) {
                *hit = true;
            }
        }
    });
    Ok(CopyStats::from_touched(&touched))
}

fn check_counts(src_count: usize, dst_count: usize) -> Result<(), CopyError> {
    if src_count != dst_count {
        return Err(CopyError::LengthMismatch {
            source: src_count,
            destination: dst_count,
        });
    }
    Ok(())
}

fn check_mapping(expected: usize, actual: usize) -> Result<(), CopyError> {
    if expected != actual {
        return Err(CopyError::MappingLength { expected, actual });
    }
    Ok(())
}

fn each_layer_pair(
    src: &LayerTable,
    dst: &mut LayerTable,
    layer_type: LayerType,
    group: &LayerGroup,
    mut apply: impl FnMut(&mut LayerStorage, &LayerStorage),
) {
    for (src_n, dst_n) in group.pairs() {
        let Some(src_layer) = src.layer_n(layer_type, src_n) else {
            warn!("source {:?} layer {} not found; skipping", layer_type, src_n);
            continue;
        };
        let Some(dst_layer) = dst.layer_n_mut(layer_type, dst_n) else {
            warn!("destination {:?} layer {} not found; skipping", layer_type, dst_n);
            continue;
        };
        apply(&mut dst_layer.storage, &src_layer.storage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::DeformWeight;
    use crate::mapping::MultiMappingBuilder;

    fn uv_table(layers: &[&[[f32; 2]]]) -> LayerTable {
        let mut table = LayerTable::default();
        for (n, values) in layers.iter().enumerate() {
            table.push(format!("uv{n}"), LayerStorage::TexCoord(values.to_vec()));
        }
        table
    }

    fn uvs(table: &LayerTable, n: usize) -> Vec<[f32; 2]> {
        match &table.layer_n(LayerType::TexCoord, n).expect("uv layer").storage {
            LayerStorage::TexCoord(values) => values.clone(),
            other => panic!("unexpected storage {other:?}"),
        }
    }

    #[test]
    fn group_pairs_offset_ranges() {
        let group = LayerGroup::new(1, 2, 0, 1);
        assert_eq!(group.pairs().collect::<Vec<_>>(), vec![(1, 0), (2, 1)]);
        assert_eq!(group.len(), 2);
        assert!(group.is_balanced());
        assert!(!LayerGroup::new(0, 2, 0, 1).is_balanced());
        assert_eq!(LayerGroup::all(0), None);
        assert_eq!(LayerGroup::all(3), Some(LayerGroup::new(0, 2, 0, 2)));
    }

    #[test]
    fn aligned_copies_every_paired_layer() {
        let src = uv_table(&[&[[0.1, 0.2], [0.3, 0.4]], &[[1.0, 2.0], [3.0, 4.0]]]);
        let mut dst = uv_table(&[&[[0.0; 2]; 2], &[[0.0; 2]; 2]]);
        let group = LayerGroup::all(2).expect("group");
        let stats =
            copy_aligned(&src, 2, &mut dst, 2, LayerType::TexCoord, &group).expect("aligned copy");
        assert_eq!(stats, CopyStats { written: 2, skipped: 0 });
        assert_eq!(uvs(&dst, 0), uvs(&src, 0));
        assert_eq!(uvs(&dst, 1), uvs(&src, 1));
    }

    #[test]
    fn aligned_respects_sub_layer_offsets() {
        let src = uv_table(&[&[[0.1, 0.2]], &[[5.0, 6.0]]]);
        let mut dst = uv_table(&[&[[0.0; 2]], &[[9.0, 9.0]]]);
        copy_aligned(&src, 1, &mut dst, 1, LayerType::TexCoord, &LayerGroup::new(1, 1, 0, 0))
            .expect("aligned copy");
        assert_eq!(uvs(&dst, 0), vec![[5.0, 6.0]]);
        assert_eq!(uvs(&dst, 1), vec![[9.0, 9.0]]);
    }

    #[test]
    fn aligned_length_mismatch_copies_nothing() {
        let src = uv_table(&[&[[1.0, 1.0]; 3]]);
        let mut dst = uv_table(&[&[[0.0, 0.0]; 2]]);
        let err = copy_aligned(&src, 3, &mut dst, 2, LayerType::TexCoord, &LayerGroup::single(0))
            .unwrap_err();
        assert_eq!(err, CopyError::LengthMismatch { source: 3, destination: 2 });
        assert_eq!(uvs(&dst, 0), vec![[0.0, 0.0]; 2]);
    }

    #[test]
    fn mapped_leaves_unmapped_elements_untouched() {
        let src = uv_table(&[&[[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]]]);
        let mut dst = uv_table(&[&[[7.0, 7.0]; 3]]);
        let mapping = SingleMapping::new(vec![Some(2), None, Some(0)]);
        let stats = copy_mapped(
            &src,
            3,
            &mut dst,
            3,
            LayerType::TexCoord,
            &LayerGroup::single(0),
            &mapping,
        )
        .expect("mapped copy");
        assert_eq!(stats, CopyStats { written: 2, skipped: 1 });
        assert_eq!(uvs(&dst, 0), vec![[0.5, 0.5], [7.0, 7.0], [1.0, 0.0]]);
    }

    #[test]
    fn mapped_rejects_short_mapping() {
        let src = uv_table(&[&[[1.0, 0.0]; 2]]);
        let mut dst = uv_table(&[&[[0.0, 0.0]; 2]]);
        let mapping = SingleMapping::new(vec![Some(0)]);
        let err = copy_mapped(
            &src,
            2,
            &mut dst,
            2,
            LayerType::TexCoord,
            &LayerGroup::single(0),
            &mapping,
        )
        .unwrap_err();
        assert_eq!(err, CopyError::MappingLength { expected: 2, actual: 1 });
    }

    #[test]
    fn missing_layer_is_skipped() {
        let src = uv_table(&[&[[1.0, 1.0]]]);
        let mut dst = uv_table(&[&[[0.0, 0.0]]]);
        let group = LayerGroup::new(0, 1, 0, 1);
        let stats =
            copy_aligned(&src, 1, &mut dst, 1, LayerType::TexCoord, &group).expect("aligned copy");
        assert_eq!(stats.written, 1);
        assert_eq!(uvs(&dst, 0), vec![[1.0, 1.0]]);

        let stats = copy_aligned(&src, 1, &mut dst, 1, LayerType::Color, &LayerGroup::single(0))
            .expect("aligned copy");
        assert_eq!(stats, CopyStats { written: 0, skipped: 1 });
    }

    #[test]
    fn interpolated_blends_weighted_sources() {
        let mut src = LayerTable::default();
        src.push(
            "weights".to_string(),
            LayerStorage::WeightGroups(vec![
                vec![DeformWeight::new(0, 1.0)],
                vec![DeformWeight::new(1, 1.0)],
            ]),
        );
        let mut dst = LayerTable::default();
        dst.push(
            "weights".to_string(),
            LayerStorage::WeightGroups(vec![vec![DeformWeight::new(5, 1.0)]; 2]),
        );

        let mut builder = MultiMappingBuilder::with_capacity(2, 2);
        builder.push(&[0, 1], &[0.25, 0.75]);
        builder.push_unmapped();
        let mapping = builder.finish();

        let stats = copy_interpolated(
            &src,
            &mut dst,
            2,
            LayerType::WeightGroups,
            &LayerGroup::single(0),
            &mapping,
        )
        .expect("interpolated copy");
        assert_eq!(stats, CopyStats { written: 1, skipped: 1 });

        let LayerStorage::WeightGroups(values) =
            &dst.layer_n(LayerType::WeightGroups, 0).expect("weights").storage
        else {
            panic!("expected weight groups");
        };
        assert_eq!(values[0].len(), 2);
        assert_eq!(values[0][0].group, 0);
        assert!((values[0][0].weight - 0.25).abs() < 1.0e-6);
        assert_eq!(values[0][1].group, 1);
        assert!((values[0][1].weight - 0.75).abs() < 1.0e-6);
        assert_eq!(values[1], vec![DeformWeight::new(5, 1.0)]);
    }

    #[test]
    fn group_deserializes_from_json_names() {
        let group: LayerGroup = serde_json::from_str(
            r#"{"src_start": 0, "src_end": 1, "dst_start": 2, "dst_end": 3}"#,
        )
        .expect("group json");
        assert_eq!(group, LayerGroup::new(0, 1, 2, 3));
    }
}
