use rand::Rng;
use thiserror::Error;

/// Idle counts above this stop increasing the weight.
pub const MAX_WEIGHT_EXPONENT: i64 = 31;

/// Broken weight accounting in [`draw_order`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SamplerError {
    /// A participant ended up with no chance to be drawn.
    #[error("participant at position {position} has zero weight")]
    ZeroWeight {
        /// Position of the participant in the input.
        position: usize,
    },

    /// The running sum does not match the weight of the last participant.
    #[error("remaining weight {remaining} does not match last participant weight {expected}")]
    WeightMismatch {
        /// Running sum left after all draws.
        remaining: u64,
        /// Weight of the participant left in the pool.
        expected: u64,
    },
}

/// Draw weight of a participant idle for `idle_count` rounds: 2^idle, capped.
pub fn idle_weight(idle_count: i64) -> u64 {
    1u64 << idle_count.clamp(0, MAX_WEIGHT_EXPONENT)
}

/// Returns a permutation of the positions of `items`, drawn without
/// replacement with probability proportional to [`idle_weight`].
///
/// Players idle for longer tend to come first. Every item appears exactly
/// once in the result.
pub fn draw_order<T, F, R>(items: &[T], idle_count: F, rng: &mut R) -> Result<Vec<usize>, SamplerError>
where
    F: Fn(&T) -> i64,
    R: Rng + ?Sized,
{
    let mut pool = Vec::with_capacity(items.len());
    let mut total: u64 = 0;
    for (position, item) in items.iter().enumerate() {
        let weight = idle_weight(idle_count(item));
        if weight == 0 {
            return Err(SamplerError::ZeroWeight { position });
        }
        total += weight;
        pool.push((position, weight));
    }

    let mut order = Vec::with_capacity(items.len());
    while pool.len() > 1 {
        let roll = rng.gen_range(0..total);

        let mut picked = pool.len() - 1;
        let mut band_end = 0;
        for (slot, &(_, weight)) in pool.iter().enumerate() {
            band_end += weight;
            if roll < band_end {
                picked = slot;
                break;
            }
        }

        let (position, weight) = pool.swap_remove(picked);
        total -= weight;
        order.push(position);
    }

    if let Some((position, weight)) = pool.pop() {
        if total != weight {
            return Err(SamplerError::WeightMismatch {
                remaining: total,
                expected: weight,
            });
        }
        order.push(position);
    }

    Ok(order)
}
