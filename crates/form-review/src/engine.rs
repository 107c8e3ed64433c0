//! Review-cycle orchestration.
//!
//! One `run_review` call performs the full pipeline: validation pass,
//! invalid-set derivation, review-outline build, HTML render. All per-cycle
//! caches live in a `ReviewCycle` created at the start of the run and
//! dropped at the end, so nothing accumulates across cycles.

use std::collections::HashMap;

use tracing::debug;

use crate::config::ReviewOptions;
use crate::error::{Error, Result};
use crate::matcher::InvalidFieldSet;
use crate::paths::PathCache;
use crate::render;
use crate::review::{self, ReviewOutline};
use crate::tree::{FieldTree, NodeId};
use crate::validation::{self, ValidationResult};

/// Per-cycle scratch state: the path-normalization memo and the source-order
/// memo. Explicitly scoped to one cycle; `clear` resets both.
#[derive(Debug, Default)]
pub struct ReviewCycle {
    pub paths: PathCache,
    source_order: HashMap<NodeId, usize>,
    pub generation: u64,
}

impl ReviewCycle {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            ..Default::default()
        }
    }

    /// Position of a node in the original form order (depth-first over the
    /// whole tree), computed once per cycle.
    pub fn source_index(&mut self, tree: &FieldTree, id: NodeId) -> usize {
        if self.source_order.is_empty() {
            for (i, n) in tree.descendants(tree.root()).into_iter().enumerate() {
                self.source_order.insert(n, i);
            }
        }
        self.source_order.get(&id).copied().unwrap_or(usize::MAX)
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.source_order.clear();
    }
}

#[derive(Debug)]
pub struct ReviewReport {
    pub validation: ValidationResult,
    pub invalid_paths: InvalidFieldSet,
    pub outline: ReviewOutline,
    pub html: String,
}

/// Library facade mirroring the callables the engine registers on the host
/// form (`validate`, `validateFields`, `isValid`) plus the full review run.
#[derive(Debug, Default)]
pub struct ReviewEngine {
    pub options: ReviewOptions,
    generation: u64,
    in_flight: bool,
}

impl ReviewEngine {
    pub fn new(options: ReviewOptions) -> Self {
        Self {
            options,
            generation: 0,
            in_flight: false,
        }
    }

    pub fn validate(&self, tree: &mut FieldTree) -> ValidationResult {
        validation::validate(tree, &self.options.validation)
    }

    pub fn is_valid(&self, tree: &mut FieldTree) -> bool {
        let opts = crate::config::ValidateOptions {
            show_errors: false,
            ..self.options.validation.clone()
        };
        validation::validate(tree, &opts).is_valid
    }

    /// Validate only the fields whose normalized path matches one of the
    /// requested paths; everything else is left untouched.
    pub fn validate_fields(&self, tree: &mut FieldTree, fields: &[String]) -> ValidationResult {
        let mut cache = PathCache::new();
        let wanted: Vec<String> = fields.iter().map(|f| cache.normalize(f)).collect();
        let mut full = validation::validate(tree, &self.options.validation);
        full.errors
            .retain(|path, _| wanted.contains(&cache.normalize(path)));
        full.invalid
            .retain(|c| wanted.contains(&cache.normalize(&c.path)));
        full.warnings
            .retain(|path, _| wanted.contains(&cache.normalize(path)));
        full.is_valid = full.errors.is_empty();
        full
    }

    /// Full review pipeline. Re-entrant invocation (a second call before the
    /// first settles) is refused rather than interleaved.
    pub fn run_review(&mut self, tree: &mut FieldTree) -> Result<ReviewReport> {
        if self.in_flight {
            return Err(Error::msg("a review cycle is already in progress"));
        }
        self.in_flight = true;
        self.generation += 1;
        let result = self.run_review_inner(tree);
        self.in_flight = false;
        result
    }

    fn run_review_inner(&mut self, tree: &mut FieldTree) -> Result<ReviewReport> {
        let mut cycle = ReviewCycle::new(self.generation);

        let validation = validation::validate(tree, &self.options.validation);
        let invalid_paths = validation.invalid_paths(&mut cycle.paths);
        debug!(
            generation = cycle.generation,
            invalid = invalid_paths.len(),
            "validation pass complete"
        );

        let outline = review::build_outline(
            tree,
            &invalid_paths,
            self.options.matcher.suffix_fallback,
            &mut cycle,
        );
        let invalid_nodes: std::collections::BTreeSet<NodeId> =
            validation.invalid.iter().map(|c| c.node).collect();
        let html = render::render(
            &outline,
            tree,
            &invalid_paths,
            &invalid_nodes,
            &self.options,
            &mut cycle,
        );
        debug!(
            generation = cycle.generation,
            leaves = outline.leaves.len(),
            cached_paths = cycle.paths.len(),
            "review cycle complete"
        );
        cycle.clear();

        Ok(ReviewReport {
            validation,
            invalid_paths,
            outline,
            html,
        })
    }
}
