//! Rank-ordered greedy byte-pair merging.
//!
//! A chunk that is not itself a vocabulary piece starts out split at every byte.
//! Each boundary carries the rank of the piece obtained by joining its span with
//! the next one. The lowest-ranked join is applied (leftmost on ties), the two
//! neighbouring scores are recomputed, and the loop repeats until no adjacent
//! pair forms a known piece. Every surviving span of two or more bytes was
//! produced by a successful join, so only single bytes can ever be missing from
//! the vocabulary at emission time.

use super::codec::CodecError;
use super::pool::{Part, PartPool};
use super::vocab::{Rank, Vocabulary, RESERVED_RANK};

/// Merge score of a boundary whose join is not a vocabulary piece.
const UNRANKED: Rank = RESERVED_RANK;

/// One token produced by the merge engine: its rank and the byte range it
/// covers within the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub rank: Rank,
    pub start: usize,
    pub end: usize,
}

/// Rank of the piece spanning from boundary `i` to boundary `i + skip + 2`.
#[inline]
fn join_rank(piece: &[u8], vocab: &Vocabulary, parts: &[Part], i: usize, skip: usize) -> Rank {
    match parts.get(i + skip + 2) {
        Some(end) => vocab
            .lookup(&piece[parts[i].offset..end.offset])
            .unwrap_or(UNRANKED),
        None => UNRANKED,
    }
}

/// Reduce `parts` to the final boundaries of `piece`.
///
/// `parts` is cleared first; on return it holds `k + 1` boundaries for `k`
/// output spans (a single boundary for an empty piece).
fn merge_boundaries(piece: &[u8], vocab: &Vocabulary, parts: &mut Vec<Part>) {
    parts.clear();
    parts.extend((0..=piece.len()).map(|offset| Part {
        offset,
        rank: UNRANKED,
    }));

    for i in 0..parts.len().saturating_sub(2) {
        let rank = join_rank(piece, vocab, parts, i, 0);
        parts[i].rank = rank;
    }

    while parts.len() > 1 {
        // Strict `<` keeps the leftmost boundary on ties.
        let mut min_rank = UNRANKED;
        let mut min_idx = 0;
        for (i, part) in parts[..parts.len() - 1].iter().enumerate() {
            if part.rank < min_rank {
                min_rank = part.rank;
                min_idx = i;
            }
        }

        if min_rank == UNRANKED {
            break;
        }

        // Scores are computed against the array before `min_idx + 1` is removed,
        // hence `skip = 1`.
        let rank = join_rank(piece, vocab, parts, min_idx, 1);
        parts[min_idx].rank = rank;
        if min_idx > 0 {
            let rank = join_rank(piece, vocab, parts, min_idx - 1, 1);
            parts[min_idx - 1].rank = rank;
        }
        parts.remove(min_idx + 1);
    }
}

/// Emit one [`Span`] per pair of consecutive boundaries.
fn collect_spans(
    piece: &[u8],
    vocab: &Vocabulary,
    parts: &[Part],
) -> Result<Vec<Span>, CodecError> {
    parts
        .windows(2)
        .map(|w| {
            let (start, end) = (w[0].offset, w[1].offset);
            let bytes = &piece[start..end];
            vocab
                .lookup(bytes)
                .map(|rank| Span { rank, start, end })
                .ok_or_else(|| CodecError::UnknownPiece(bytes.to_vec()))
        })
        .collect()
}

/// Merge `piece` using a boundary array borrowed from `pool`.
pub(crate) fn byte_pair_spans(
    piece: &[u8],
    vocab: &Vocabulary,
    pool: &PartPool,
) -> Result<Vec<Span>, CodecError> {
    let mut parts = pool.checkout(piece.len() + 1);
    merge_boundaries(piece, vocab, &mut parts);
    collect_spans(piece, vocab, &parts)
}

/// Merge `piece` into vocabulary spans, allocating fresh scratch space.
///
/// Unlike the codec, this does not short-circuit on a piece that is already in
/// the vocabulary: it always runs the merge loop from single bytes.
pub fn byte_pair_merge(piece: &[u8], vocab: &Vocabulary) -> Result<Vec<Span>, CodecError> {
    let mut parts = Vec::with_capacity(piece.len() + 1);
    merge_boundaries(piece, vocab, &mut parts);
    collect_spans(piece, vocab, &parts)
}

/// Encode `piece` to its ranks.
pub fn byte_pair_encode(piece: &[u8], vocab: &Vocabulary) -> Result<Vec<Rank>, CodecError> {
    Ok(byte_pair_merge(piece, vocab)?
        .into_iter()
        .map(|span| span.rank)
        .collect())
}

/// Split `piece` into the byte slices of its tokens.
pub fn byte_pair_split<'a>(
    piece: &'a [u8],
    vocab: &Vocabulary,
) -> Result<Vec<&'a [u8]>, CodecError> {
    Ok(byte_pair_merge(piece, vocab)?
        .into_iter()
        .map(|span| &piece[span.start..span.end])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn vocab(entries: &[(&str, Rank)]) -> Vocabulary {
        let encoder: FxHashMap<Vec<u8>, Rank> = entries
            .iter()
            .map(|(k, v)| (k.as_bytes().to_vec(), *v))
            .collect();
        Vocabulary::new(encoder).unwrap()
    }

    fn toy() -> Vocabulary {
        vocab(&[("a", 0), ("b", 1), ("c", 2), ("ab", 3), ("abc", 4)])
    }

    fn split(piece: &str, v: &Vocabulary) -> Vec<String> {
        byte_pair_split(piece.as_bytes(), v)
            .unwrap()
            .into_iter()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect()
    }

    #[test]
    fn test_toy_merges_to_single_token() {
        // ("a","b")=3 beats ("b","c")=absent, then ("ab","c")=4.
        assert_eq!(byte_pair_encode(b"abc", &toy()).unwrap(), vec![4]);
    }

    #[test]
    fn test_partial_merge() {
        let v = toy();
        assert_eq!(byte_pair_encode(b"abca", &v).unwrap(), vec![4, 0]);
        assert_eq!(split("cab", &v), vec!["c", "ab"]);
        assert_eq!(byte_pair_encode(b"bc", &v).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_lowest_rank_wins_over_position() {
        // "bc" (rank 3) is preferred over the earlier "ab" (rank 4).
        let v = vocab(&[("a", 0), ("b", 1), ("c", 2), ("bc", 3), ("ab", 4)]);
        assert_eq!(split("abc", &v), vec!["a", "bc"]);
    }

    #[test]
    fn test_tie_breaks_leftmost() {
        // Every adjacent "aa" join has the same rank; the leftmost is taken
        // first, giving "aa" "aa" "a" rather than "a" "aa" "aa".
        let v = vocab(&[("a", 0), ("aa", 1)]);
        assert_eq!(split("aaaaa", &v), vec!["aa", "aa", "a"]);
    }

    #[test]
    fn test_single_byte() {
        let spans = byte_pair_merge(b"b", &toy()).unwrap();
        assert_eq!(
            spans,
            vec![Span {
                rank: 1,
                start: 0,
                end: 1
            }]
        );
    }

    #[test]
    fn test_empty_piece() {
        assert!(byte_pair_merge(b"", &toy()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_byte_is_reported() {
        let err = byte_pair_encode(b"abz", &toy()).unwrap_err();
        match err {
            CodecError::UnknownPiece(piece) => assert_eq!(piece, b"z"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_spans_cover_piece() {
        let v = vocab(&[
            ("h", 0),
            ("e", 1),
            ("l", 2),
            ("o", 3),
            ("ll", 4),
            ("he", 5),
            ("hell", 6),
            ("lo", 7),
        ]);
        let spans = byte_pair_merge(b"hello", &v).unwrap();
        assert_eq!(
            spans.iter().map(|s| s.rank).collect::<Vec<_>>(),
            vec![6, 3]
        );
        assert_eq!(spans.first().map(|s| s.start), Some(0));
        assert_eq!(spans.last().map(|s| s.end), Some(5));
        assert!(spans.windows(2).all(|w| w[0].end == w[1].start));
    }

    #[test]
    fn test_pooled_matches_unpooled() {
        let v = toy();
        let pool = PartPool::new();
        for piece in ["abcabc", "cba", "", "aaaa"] {
            assert_eq!(
                byte_pair_spans(piece.as_bytes(), &v, &pool).unwrap(),
                byte_pair_merge(piece.as_bytes(), &v).unwrap()
            );
        }
        assert_eq!(pool.idle(), 1);
    }
}
