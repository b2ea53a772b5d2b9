use std::ops::Range;

use anyhow::{ensure, Result};

/// Split `[0, n)` into `k` contiguous, pairwise-disjoint index ranges whose
/// ordered concatenation reproduces the full sequence. Every batch spans
/// `⌊n/k⌋` items except the last, which absorbs the remainder.
pub fn partition_batches(n: usize, k: usize) -> Result<Vec<Range<usize>>> {
    ensure!(k >= 1, "batch count must be at least 1, got {}", k);
    let batch_size = n / k;
    let mut batches = Vec::with_capacity(k);
    for i in 0..k {
        let start = i * batch_size;
        let end = if i == k - 1 { n } else { (i + 1) * batch_size };
        batches.push(start..end);
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_contract(n: usize, k: usize) {
        let batches = partition_batches(n, k).unwrap();
        assert_eq!(batches.len(), k);
        // Contiguous, disjoint, and complete.
        let mut next = 0;
        for batch in &batches {
            assert_eq!(batch.start, next);
            next = batch.end;
        }
        assert_eq!(next, n);
        let total: usize = batches.iter().map(|b| b.len()).sum();
        assert_eq!(total, n);
    }

    #[test]
    fn test_contract_across_sizes() {
        for n in [0, 1, 2, 3, 7, 10, 99, 100, 101] {
            for k in [1, 2, 3, 4, 7, 10] {
                assert_contract(n, k);
            }
        }
    }

    #[test]
    fn test_last_batch_absorbs_remainder() {
        let batches = partition_batches(10, 3).unwrap();
        assert_eq!(batches, vec![0..3, 3..6, 6..10]);
    }

    #[test]
    fn test_more_batches_than_points() {
        let batches = partition_batches(2, 5).unwrap();
        assert_eq!(batches, vec![0..0, 0..0, 0..0, 0..0, 0..2]);
    }

    #[test]
    fn test_zero_batches_rejected() {
        assert!(partition_batches(10, 0).is_err());
    }
}
