use rand::seq::SliceRandom;

use crate::models::{Condition, ConditionKind};

/// Permutes the condition set in place.
pub trait ConditionShuffler: Send {
    fn shuffle(&mut self, conditions: &mut [Condition]);
}

/// Uniform random permutation.
#[derive(Debug, Default)]
pub struct RandomShuffler;

impl ConditionShuffler for RandomShuffler {
    fn shuffle(&mut self, conditions: &mut [Condition]) {
        conditions.shuffle(&mut rand::thread_rng());
    }
}

/// Orders conditions by the position of their kind in `order`. Kinds not
/// listed keep their relative order at the end.
#[derive(Debug, Clone)]
pub struct FixedOrder {
    order: Vec<ConditionKind>,
}

impl FixedOrder {
    pub fn new(order: impl IntoIterator<Item = ConditionKind>) -> Self {
        Self {
            order: order.into_iter().collect(),
        }
    }
}

impl ConditionShuffler for FixedOrder {
    fn shuffle(&mut self, conditions: &mut [Condition]) {
        conditions.sort_by_key(|c| {
            self.order
                .iter()
                .position(|kind| *kind == c.kind)
                .unwrap_or(self.order.len())
        });
    }
}

/// Produces the block order for one session. Block `i` uses element `i` for
/// the rest of the session.
pub fn assign_conditions(
    set: &[Condition],
    shuffler: &mut dyn ConditionShuffler,
) -> Vec<Condition> {
    let mut ordered = set.to_vec();
    shuffler.shuffle(&mut ordered);
    ordered
}
