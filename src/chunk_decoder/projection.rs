//! Field projection: the set of protobuf tag paths retained when decoding a
//! transposed chunk.

/// What a path's final tag contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSentinel {
    /// Include only the presence marker for this path (an empty submessage),
    /// not any of its nested fields.
    Exists,
    /// Include this path and everything beneath it.
    AllSubfields,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedPath {
    pub tags: Vec<u64>,
    pub sentinel: PathSentinel,
}

impl ProjectedPath {
    pub fn all_subfields(tags: Vec<u64>) -> Self {
        Self {
            tags,
            sentinel: PathSentinel::AllSubfields,
        }
    }

    pub fn exists(tags: Vec<u64>) -> Self {
        Self {
            tags,
            sentinel: PathSentinel::Exists,
        }
    }

    /// Whether a scalar leaf's full root-to-leaf tag chain is retained by
    /// this path. `Exists` only ever matches the exact chain (the leaf
    /// case degenerates to presence-equals-value); `AllSubfields` matches
    /// the chain itself or anything nested beneath it.
    fn matches_leaf(&self, leaf_tags: &[u64]) -> bool {
        match self.sentinel {
            PathSentinel::Exists => self.tags == leaf_tags,
            PathSentinel::AllSubfields => leaf_tags.starts_with(&self.tags),
        }
    }
}

/// A set of paths to retain. `None` (absent from [`crate::options::ReaderOptions`])
/// means "everything"; an explicit, possibly-empty [`FieldProjection`] means
/// "exactly these paths".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldProjection {
    paths: Vec<ProjectedPath>,
}

impl FieldProjection {
    pub fn new(paths: Vec<ProjectedPath>) -> Self {
        Self { paths }
    }

    /// Whether a scalar leaf column (keyed by its full root-to-leaf tag
    /// chain) should be retained during decode.
    pub fn includes_leaf(&self, leaf_tags: &[u64]) -> bool {
        self.paths.iter().any(|p| p.matches_leaf(leaf_tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_subfields_matches_nested() {
        let proj = FieldProjection::new(vec![ProjectedPath::all_subfields(vec![2])]);
        assert!(proj.includes_leaf(&[2, 3]));
        assert!(proj.includes_leaf(&[2]));
        assert!(!proj.includes_leaf(&[4]));
    }

    #[test]
    fn exists_matches_only_exact_chain() {
        let proj = FieldProjection::new(vec![ProjectedPath::exists(vec![2])]);
        assert!(proj.includes_leaf(&[2]));
        assert!(!proj.includes_leaf(&[2, 3]));
    }

    #[test]
    fn scenario_projection_drops_sibling() {
        // {1: a, 2: {3: b, 4: c}} projected onto {[1], [2,3]}
        let proj = FieldProjection::new(vec![
            ProjectedPath::all_subfields(vec![1]),
            ProjectedPath::all_subfields(vec![2, 3]),
        ]);
        assert!(proj.includes_leaf(&[1]));
        assert!(proj.includes_leaf(&[2, 3]));
        assert!(!proj.includes_leaf(&[2, 4]));
    }
}
