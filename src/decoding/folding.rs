use crate::types::TokenId;

/// Collapse repeated emissions and strip blanks from a CTC id sequence.
///
/// With `fold_consecutive` an id equal to the previously seen id is skipped.
/// A blank still counts as "previously seen", so `a, blank, a` keeps both `a`s.
/// Without it only blanks are removed.
pub fn fold_consecutive(ids: &[TokenId], blank_id: TokenId, fold_consecutive: bool) -> Vec<TokenId> {
    let mut out = Vec::with_capacity(ids.len());
    let mut previous: Option<TokenId> = None;
    for &id in ids {
        if fold_consecutive && previous == Some(id) {
            continue;
        }
        previous = Some(id);
        if id != blank_id {
            out.push(id);
        }
    }
    out
}
