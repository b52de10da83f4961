/// One source index per destination element, `None` where nothing matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SingleMapping {
    targets: Vec<Option<u32>>,
}

impl SingleMapping {
    pub fn new(targets: Vec<Option<u32>>) -> Self {
        Self { targets }
    }

    pub fn unmapped(len: usize) -> Self {
        Self {
            targets: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.targets.get(index).copied().flatten()
    }

    pub fn set(&mut self, index: usize, source: Option<u32>) {
        self.targets[index] = source;
    }

    pub fn as_slice(&self) -> &[Option<u32>] {
        &self.targets
    }

    pub fn unmapped_count(&self) -> usize {
        self.targets.iter().filter(|target| target.is_none()).count()
    }
}

impl FromIterator<Option<u32>> for SingleMapping {
    fn from_iter<I: IntoIterator<Item = Option<u32>>>(iter: I) -> Self {
        Self {
            targets: iter.into_iter().collect(),
        }
    }
}

/// Weighted sources per destination element, stored as one flat arena.
///
/// Element `i` owns `sources[offsets[i]..offsets[i + 1]]` and the matching
/// `weights` range; an empty range means no correspondence.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiMapping {
    offsets: Vec<u32>,
    sources: Vec<u32>,
    weights: Vec<f32>,
}

impl Default for MultiMapping {
    fn default() -> Self {
        Self {
            offsets: vec![0],
            sources: Vec::new(),
            weights: Vec::new(),
        }
    }
}

impl MultiMapping {
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> (&[u32], &[f32]) {
        let start = self.offsets[index] as usize;
        let end = self.offsets[index + 1] as usize;
        (&self.sources[start..end], &self.weights[start..end])
    }

    pub fn is_mapped(&self, index: usize) -> bool {
        self.offsets[index + 1] > self.offsets[index]
    }

    pub fn unmapped_count(&self) -> usize {
        self.offsets
            .windows(2)
            .filter(|range| range[0] == range[1])
            .count()
    }

    pub fn sources(&self) -> &[u32] {
        &self.sources
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

#[derive(Debug, Default)]
pub struct MultiMappingBuilder {
    mapping: MultiMapping,
}

impl MultiMappingBuilder {
    pub fn with_capacity(elements: usize, entries: usize) -> Self {
        let mut offsets = Vec::with_capacity(elements + 1);
        offsets.push(0);
        Self {
            mapping: MultiMapping {
                offsets,
                sources: Vec::with_capacity(entries),
                weights: Vec::with_capacity(entries),
            },
        }
    }

    pub fn push(&mut self, sources: &[u32], weights: &[f32]) {
        assert_eq!(
            sources.len(),
            weights.len(),
            "multi-mapping sources and weights must have equal length"
        );
        self.mapping.sources.extend_from_slice(sources);
        self.mapping.weights.extend_from_slice(weights);
        self.mapping
            .offsets
            .push(self.mapping.sources.len() as u32);
    }

    pub fn push_unmapped(&mut self) {
        self.push(&[], &[]);
    }

    pub fn finish(self) -> MultiMapping {
        self.mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_mapping_counts_gaps() {
        let mapping: SingleMapping = [Some(3), None, Some(0), None].into_iter().collect();
        assert_eq!(mapping.len(), 4);
        assert_eq!(mapping.get(0), Some(3));
        assert_eq!(mapping.get(1), None);
        assert_eq!(mapping.get(99), None);
        assert_eq!(mapping.unmapped_count(), 2);
    }

    #[test]
    fn builder_keeps_slices_aligned() {
        let mut builder = MultiMappingBuilder::with_capacity(3, 5);
        builder.push(&[4, 5, 6], &[0.2, 0.3, 0.5]);
        builder.push_unmapped();
        builder.push(&[1, 1], &[0.5, 0.5]);
        let mapping = builder.finish();

        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.sources().len(), mapping.weights().len());
        assert_eq!(mapping.get(0), (&[4u32, 5, 6][..], &[0.2f32, 0.3, 0.5][..]));
        assert!(!mapping.is_mapped(1));
        assert_eq!(mapping.get(1).0.len(), 0);
        assert_eq!(mapping.get(2).0, &[1, 1]);
        assert_eq!(mapping.unmapped_count(), 1);
    }

    #[test]
    #[should_panic(expected = "equal length")]
    fn builder_rejects_ragged_entries() {
        let mut builder = MultiMappingBuilder::default();
        builder.push(&[1, 2], &[1.0]);
    }

    #[test]
    fn default_multi_mapping_is_empty() {
        let mapping = MultiMapping::default();
        assert!(mapping.is_empty());
        assert_eq!(mapping.unmapped_count(), 0);
    }
}
