use crate::types::ErrorUnit;

/// Unit-cost Levenshtein distance (insert, delete, substitute).
///
/// Rolling two rows of the `(|a|+1) x (|b|+1)` table; the result is
/// identical to the full-table recurrence.
pub fn levenshtein<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, x) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, y) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(x != y);
            let delete = prev[j + 1] + 1;
            let insert = curr[j] + 1;
            curr[j + 1] = substitute.min(delete).min(insert);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Distance and reference size for one hypothesis/reference pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairScore {
    pub distance: usize,
    pub reference_units: usize,
}

pub fn score_pair(hypothesis: &str, reference: &str, unit: ErrorUnit) -> PairScore {
    match unit {
        ErrorUnit::Character => {
            let hyp: Vec<char> = hypothesis.chars().collect();
            let reference: Vec<char> = reference.chars().collect();
            PairScore {
                distance: levenshtein(&hyp, &reference),
                reference_units: reference.len(),
            }
        }
        ErrorUnit::Word => {
            let hyp: Vec<&str> = hypothesis.split_whitespace().collect();
            let reference: Vec<&str> = reference.split_whitespace().collect();
            PairScore {
                distance: levenshtein(&hyp, &reference),
                reference_units: reference.len(),
            }
        }
    }
}
