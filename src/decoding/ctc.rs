use crate::decoding::folding::fold_consecutive;
use crate::error::MetricError;
use crate::pipeline::traits::TokenCodec;
use crate::types::{BatchDim, Hypothesis, TokenBatch, TokenId};

/// Decode every sample of a prediction batch, preserving batch order.
///
/// Each sample is truncated to its valid length, folded, stripped of blanks
/// and handed to the codec. Without `lengths` the padded length is used.
pub fn decode_hypotheses(
    codec: &dyn TokenCodec,
    predictions: &TokenBatch,
    lengths: Option<&[usize]>,
    batch_dim: BatchDim,
    fold: bool,
) -> Result<Vec<Hypothesis>, MetricError> {
    let batch_size = predictions.batch_size(batch_dim);
    let capacity = predictions.max_len(batch_dim);
    if let Some(lengths) = lengths {
        check_lengths("prediction_lengths", lengths, batch_size, capacity)?;
    }

    let blank_id = codec.blank_id();
    (0..batch_size)
        .map(|i| {
            let len = lengths.map_or(capacity, |l| l[i]);
            let ids = predictions.sample_prefix(i, len, batch_dim);
            let token_ids = fold_consecutive(&ids, blank_id, fold);
            let text = codec.ids_to_text(&token_ids)?;
            Ok(Hypothesis { text, token_ids })
        })
        .collect()
}

/// Decode one ground-truth sequence. References are never folded; only a
/// stray blank id is dropped.
pub fn decode_reference(
    codec: &dyn TokenCodec,
    ids: &[TokenId],
    length: usize,
) -> Result<String, MetricError> {
    if length > ids.len() {
        return Err(MetricError::LengthOutOfRange {
            what: "target_length",
            index: 0,
            length,
            capacity: ids.len(),
        });
    }
    let ids = fold_consecutive(&ids[..length], codec.blank_id(), false);
    codec.ids_to_text(&ids)
}

/// Decode a batch-first reference batch.
pub fn decode_references(
    codec: &dyn TokenCodec,
    targets: &TokenBatch,
    lengths: &[usize],
) -> Result<Vec<String>, MetricError> {
    let batch_size = targets.batch_size(BatchDim::First);
    let capacity = targets.max_len(BatchDim::First);
    check_lengths("target_lengths", lengths, batch_size, capacity)?;
    lengths
        .iter()
        .enumerate()
        .map(|(i, &len)| {
            let ids = targets.sample_prefix(i, len, BatchDim::First);
            codec.ids_to_text(&fold_consecutive(&ids, codec.blank_id(), false))
        })
        .collect()
}

pub(crate) fn check_lengths(
    what: &'static str,
    lengths: &[usize],
    batch_size: usize,
    capacity: usize,
) -> Result<(), MetricError> {
    if lengths.len() != batch_size {
        return Err(MetricError::shape_mismatch(what, batch_size, lengths.len()));
    }
    if let Some((index, &length)) = lengths.iter().enumerate().find(|(_, &l)| l > capacity) {
        return Err(MetricError::LengthOutOfRange {
            what,
            index,
            length,
            capacity,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::codec::CharCodec;

    // a=0 b=1 c=2 |=3, blank=4
    fn codec() -> CharCodec {
        CharCodec::from_chars("abc|".chars())
    }

    const BLANK: TokenId = 4;

    #[test]
    fn decodes_in_batch_order() {
        let predictions =
            TokenBatch::from_rows(vec![vec![0, 0, BLANK], vec![1, BLANK, 1], vec![2, 2, 2]])
                .unwrap();
        let hyps =
            decode_hypotheses(&codec(), &predictions, None, BatchDim::First, true).unwrap();
        let texts: Vec<_> = hyps.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, ["a", "bb", "c"]);
        assert_eq!(hyps[1].token_ids, vec![1, 1]);
    }

    #[test]
    fn respects_lengths_and_ignores_padding() {
        // padding positions hold an id that would fail decoding if read
        let predictions = TokenBatch::from_rows(vec![vec![0, 1, 99], vec![2, 99, 99]]).unwrap();
        let hyps = decode_hypotheses(
            &codec(),
            &predictions,
            Some([2, 1].as_slice()),
            BatchDim::First,
            true,
        )
        .unwrap();
        assert_eq!(hyps[0].text, "ab");
        assert_eq!(hyps[1].text, "c");
    }

    #[test]
    fn time_major_batch() {
        // columns are samples: sample0 = [0, 0, 1], sample1 = [2, BLANK, 2]
        let predictions =
            TokenBatch::from_rows(vec![vec![0, 2], vec![0, BLANK], vec![1, 2]]).unwrap();
        let hyps =
            decode_hypotheses(&codec(), &predictions, Some([3, 3].as_slice()), BatchDim::Second, true)
                .unwrap();
        assert_eq!(hyps[0].text, "ab");
        assert_eq!(hyps[1].text, "cc");
    }

    #[test]
    fn without_folding_repeats_survive() {
        let predictions = TokenBatch::from_rows(vec![vec![0, 0, BLANK, 0]]).unwrap();
        let hyps =
            decode_hypotheses(&codec(), &predictions, None, BatchDim::First, false).unwrap();
        assert_eq!(hyps[0].text, "aaa");
    }

    #[test]
    fn length_count_must_match_batch() {
        let predictions = TokenBatch::from_rows(vec![vec![0], vec![1]]).unwrap();
        let err = decode_hypotheses(&codec(), &predictions, Some([1].as_slice()), BatchDim::First, true)
            .unwrap_err();
        assert!(matches!(
            err,
            MetricError::ShapeMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn length_over_capacity_is_rejected() {
        let predictions = TokenBatch::from_rows(vec![vec![0, 1]]).unwrap();
        let err = decode_hypotheses(&codec(), &predictions, Some([3].as_slice()), BatchDim::First, true)
            .unwrap_err();
        assert!(matches!(err, MetricError::LengthOutOfRange { length: 3, .. }));
    }

    #[test]
    fn unknown_id_in_prediction_is_fatal() {
        let predictions = TokenBatch::from_rows(vec![vec![0, 7]]).unwrap();
        let err =
            decode_hypotheses(&codec(), &predictions, None, BatchDim::First, true).unwrap_err();
        assert!(matches!(err, MetricError::UnknownToken { id: 7, .. }));
    }

    #[test]
    fn reference_is_not_folded() {
        assert_eq!(decode_reference(&codec(), &[0, 0, 3, 1, 1], 5).unwrap(), "aa bb");
        assert_eq!(decode_reference(&codec(), &[0, 0, 3, 1, 1], 2).unwrap(), "aa");
        assert_eq!(decode_reference(&codec(), &[], 0).unwrap(), "");
        assert!(decode_reference(&codec(), &[0], 2).is_err());
    }

    #[test]
    fn references_batch() {
        let targets = TokenBatch::from_rows(vec![vec![0, 1, 2], vec![2, 2, 0]]).unwrap();
        let refs = decode_references(&codec(), &targets, &[3, 2]).unwrap();
        assert_eq!(refs, ["abc", "cc"]);
        assert!(decode_references(&codec(), &targets, &[3]).is_err());
        assert!(decode_references(&codec(), &targets, &[3, 4]).is_err());
    }
}
