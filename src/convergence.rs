//! Weighted alternative selection with decaying weights.
//!
//! Every branching point in the rule tree (identified by its node id) owns a
//! weight per child. Selection is a roulette-wheel draw over those weights;
//! each pick multiplies the chosen weight by the convergence factor, so a
//! path taken at a given decision point becomes progressively less likely on
//! re-entry. Recursive alternatives therefore die out statistically instead
//! of requiring a grammar-specific fixpoint analysis.

use fxhash::FxHashMap;
use rand::Rng;

/// Weight given to every child when a decision point is first visited.
const BASE_WEIGHT: f64 = 1.0;

#[derive(Clone, Debug)]
pub(crate) struct Convergence {
    factor: f64,
    weights: FxHashMap<usize, Vec<f64>>,
}

impl Convergence {
    pub(crate) fn new(factor: f64) -> Self {
        debug_assert!(factor > 0.0 && factor < 1.0);
        Self {
            factor,
            weights: FxHashMap::default(),
        }
    }

    /// An independent clone. Forked branches must never share decay history,
    /// so the weight map is deep-copied.
    pub(crate) fn copy(&self) -> Self {
        self.clone()
    }

    /// Picks one of `children` at the decision point `parent` and decays the
    /// winner's weight. Always returns an index below `children`.
    ///
    /// The draw is scaled against the sum of the recorded weights (the
    /// textbook roulette wheel). A child is selected when the draw falls
    /// strictly inside its cumulative slot, so a fully decayed (zero-width)
    /// child can no longer win.
    pub(crate) fn choose<R: Rng>(&mut self, parent: usize, children: usize, rng: &mut R) -> usize {
        debug_assert!(children > 0);
        let slots = self
            .weights
            .entry(parent)
            .or_insert_with(|| vec![BASE_WEIGHT; children]);
        debug_assert_eq!(slots.len(), children);

        let total: f64 = slots.iter().sum();
        let chosen = if total > 0.0 {
            let draw = rng.random_range(0.0..total);
            let mut acc = 0.0;
            let mut chosen = children - 1;
            for (i, w) in slots.iter().enumerate() {
                acc += w;
                if draw < acc {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            // every weight underflowed to zero; fall back to a uniform pick
            rng.random_range(0..children)
        };

        slots[chosen] *= self.factor;
        chosen
    }
}
