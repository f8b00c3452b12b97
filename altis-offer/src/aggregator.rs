//! Folding leg probabilities back into one rank per offer.
//!
//! Ranking uses the first-occurrence tie rule: every offer gets `1 +` the position of the first
//! entry equal to its value in the descending-sorted list. Equal values therefore share a rank and
//! the next distinct value skips past them (`[0.5, 0.5, 0.1]` ranks as `[1, 1, 3]`). Downstream
//! consumers depend on this exact behavior.

use tracing::error;

/// Rank given to offers that produced no scorable leg.
pub const FALLBACK_RANK: u32 = 1;

/// Collapse per-leg probabilities into one value per offer.
///
/// `leg_counts[i]` is the number of rows offer `i` contributed to `probabilities`, in order.
/// Round trips sum their two legs; offers without legs yield `None`.
pub fn collapse(probabilities: &[f64], leg_counts: &[usize]) -> Vec<Option<f64>> {
    let mut cursor = 0;
    leg_counts
        .iter()
        .map(|&count| {
            if count == 0 {
                return None;
            }
            let legs = probabilities.get(cursor..cursor + count);
            cursor += count;
            match legs {
                Some(legs) => Some(legs.iter().sum()),
                None => {
                    error!(
                        rows = probabilities.len(),
                        expected = cursor,
                        "Fewer probabilities than leg rows, offer left unscored"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Final ranks for collapsed offer values. Unscored offers get [`FALLBACK_RANK`] and are left
/// out of the comparison.
pub fn rank(collapsed: &[Option<f64>]) -> Vec<u32> {
    let mut sorted: Vec<f64> = collapsed.iter().flatten().copied().collect();
    sorted.sort_by(|a, b| b.total_cmp(a));

    collapsed
        .iter()
        .map(|value| match value {
            None => FALLBACK_RANK,
            Some(p) => sorted
                .iter()
                .position(|s| s == p)
                .map_or(FALLBACK_RANK, |i| i as u32 + 1),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_descending() {
        assert_eq!(rank(&[Some(0.9), Some(0.1), Some(0.5)]), vec![1, 3, 2]);
    }

    #[test]
    fn test_ties_share_first_rank() {
        assert_eq!(rank(&[Some(0.5), Some(0.5)]), vec![1, 1]);
        assert_eq!(rank(&[Some(0.1), Some(0.5), Some(0.5)]), vec![3, 1, 1]);
    }

    #[test]
    fn test_unscored_offers_get_fallback() {
        assert_eq!(rank(&[None, Some(0.2), Some(0.7)]), vec![1, 2, 1]);
        assert_eq!(rank(&[None, None]), vec![1, 1]);
        assert!(rank(&[]).is_empty());
    }

    #[test]
    fn test_collapse_sums_round_trips() {
        let collapsed = collapse(&[0.25, 0.5, 0.125, 0.75], &[2, 1, 0, 1]);
        assert_eq!(collapsed, vec![Some(0.75), Some(0.125), None, Some(0.75)]);
    }

    #[test]
    fn test_collapse_short_input() {
        assert_eq!(collapse(&[0.5], &[1, 2]), vec![Some(0.5), None]);
    }
}
