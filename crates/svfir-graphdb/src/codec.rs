//! Canonical text encodings for collection-valued fields.
//!
//! Every collection travels as one string property:
//!
//! | Shape | Example |
//! |---|---|
//! | list / set | `1,2,3` |
//! | map | `1:2,3:4` |
//! | map of sets / lists | `1:{2,3},4:{}` |
//! | nested list | `{1,2},{}` |
//! | pair list with optional second | `(1,7),(2,NULL)` |
//! | text list | JSON array |
//!
//! The empty collection encodes to the empty string. Sets are written in
//! ascending order, lists in their own order.

use std::collections::{BTreeMap, BTreeSet};

use svfir_core::{BlockId, CallGraphNodeId, ChNodeId, IcfgNodeId, StInfoId, StmtId, TypeId, VarId};
use thiserror::Error;

/// Marker for an absent second component in a pair list.
pub const ABSENT: &str = "NULL";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid number '{text}'")]
    InvalidNumber { text: String },

    #[error("malformed collection '{text}': {reason}")]
    Malformed { text: String, reason: &'static str },
}

/// A scalar that can appear inside an encoded collection.
pub trait CodecValue: Sized {
    fn encode_into(&self, out: &mut String);
    fn decode_from(text: &str) -> Result<Self, CodecError>;
}

macro_rules! codec_int {
    ($($ty:ty),*) => {$(
        impl CodecValue for $ty {
            fn encode_into(&self, out: &mut String) {
                out.push_str(&self.to_string());
            }

            fn decode_from(text: &str) -> Result<Self, CodecError> {
                text.trim().parse().map_err(|_| CodecError::InvalidNumber {
                    text: text.to_string(),
                })
            }
        }
    )*};
}

codec_int!(u32, i32, i64, u64);

macro_rules! codec_id {
    ($($ty:ident),*) => {$(
        impl CodecValue for $ty {
            fn encode_into(&self, out: &mut String) {
                self.0.encode_into(out);
            }

            fn decode_from(text: &str) -> Result<Self, CodecError> {
                u32::decode_from(text).map($ty)
            }
        }
    )*};
}

codec_id!(TypeId, StInfoId, VarId, StmtId, IcfgNodeId, CallGraphNodeId, ChNodeId, BlockId);

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn join<I, F>(items: I, mut write: F) -> String
where
    I: IntoIterator,
    F: FnMut(I::Item, &mut String),
{
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write(item, &mut out);
    }
    out
}

/// Encodes an ordered list, or a set when given a set's iterator.
pub fn encode_list<'a, T, I>(items: I) -> String
where
    T: CodecValue + 'a,
    I: IntoIterator<Item = &'a T>,
{
    join(items, |item, out| item.encode_into(out))
}

pub fn encode_map<K: CodecValue, V: CodecValue>(map: &BTreeMap<K, V>) -> String {
    join(map, |(k, v), out| {
        k.encode_into(out);
        out.push(':');
        v.encode_into(out);
    })
}

fn encode_map_with<K, C, F>(map: &BTreeMap<K, C>, inner: F) -> String
where
    K: CodecValue,
    F: Fn(&C) -> String,
{
    join(map, |(k, values), out| {
        k.encode_into(out);
        out.push_str(":{");
        out.push_str(&inner(values));
        out.push('}');
    })
}

pub fn encode_map_of_sets<K: CodecValue, V: CodecValue>(map: &BTreeMap<K, BTreeSet<V>>) -> String {
    encode_map_with(map, |set| encode_list(set))
}

pub fn encode_map_of_lists<K: CodecValue, V: CodecValue>(map: &BTreeMap<K, Vec<V>>) -> String {
    encode_map_with(map, |list| encode_list(list))
}

pub fn encode_nested<T: CodecValue>(lists: &[Vec<T>]) -> String {
    join(lists, |list, out| {
        out.push('{');
        out.push_str(&encode_list(list));
        out.push('}');
    })
}

pub fn encode_pairs<A: CodecValue, B: CodecValue>(pairs: &[(A, Option<B>)]) -> String {
    join(pairs, |(a, b), out| {
        out.push('(');
        a.encode_into(out);
        out.push(',');
        match b {
            Some(b) => b.encode_into(out),
            None => out.push_str(ABSENT),
        }
        out.push(')');
    })
}

/// Text lists may contain any character, so they use JSON.
pub fn encode_text_list(items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    serde_json::to_string(items).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn malformed(text: &str, reason: &'static str) -> CodecError {
    CodecError::Malformed {
        text: text.to_string(),
        reason,
    }
}

/// Splits on commas that are not nested inside `{}` or `()`.
fn split_top(text: &str) -> Result<Vec<&str>, CodecError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '{' | '(' => depth += 1,
            '}' | ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| malformed(text, "unbalanced closing bracket"))?;
            }
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(malformed(text, "unbalanced opening bracket"));
    }
    parts.push(text[start..].trim());
    Ok(parts)
}

fn strip_delimited<'t>(text: &'t str, open: char, close: char) -> Option<&'t str> {
    text.strip_prefix(open)?.strip_suffix(close)
}

pub fn decode_list<T: CodecValue>(text: &str) -> Result<Vec<T>, CodecError> {
    split_top(text)?.into_iter().map(T::decode_from).collect()
}

pub fn decode_set<T: CodecValue + Ord>(text: &str) -> Result<BTreeSet<T>, CodecError> {
    split_top(text)?.into_iter().map(T::decode_from).collect()
}

pub fn decode_map<K, V>(text: &str) -> Result<BTreeMap<K, V>, CodecError>
where
    K: CodecValue + Ord,
    V: CodecValue,
{
    split_top(text)?
        .into_iter()
        .map(|entry| {
            let (k, v) = entry
                .split_once(':')
                .ok_or_else(|| malformed(entry, "map entry without ':'"))?;
            Ok((K::decode_from(k)?, V::decode_from(v)?))
        })
        .collect()
}

/// Decodes a map of sets or lists; the value collection type decides.
pub fn decode_map_of_lists<K, V, C>(text: &str) -> Result<BTreeMap<K, C>, CodecError>
where
    K: CodecValue + Ord,
    V: CodecValue,
    C: FromIterator<V>,
{
    split_top(text)?
        .into_iter()
        .map(|entry| {
            let (k, v) = entry
                .split_once(':')
                .ok_or_else(|| malformed(entry, "map entry without ':'"))?;
            let inner = strip_delimited(v.trim(), '{', '}')
                .ok_or_else(|| malformed(entry, "map value is not braced"))?;
            let values = split_top(inner)?
                .into_iter()
                .map(V::decode_from)
                .collect::<Result<C, _>>()?;
            Ok((K::decode_from(k)?, values))
        })
        .collect()
}

pub fn decode_nested<T: CodecValue>(text: &str) -> Result<Vec<Vec<T>>, CodecError> {
    split_top(text)?
        .into_iter()
        .map(|entry| {
            let inner = strip_delimited(entry, '{', '}')
                .ok_or_else(|| malformed(entry, "nested list is not braced"))?;
            decode_list(inner)
        })
        .collect()
}

pub fn decode_pairs<A: CodecValue, B: CodecValue>(
    text: &str,
) -> Result<Vec<(A, Option<B>)>, CodecError> {
    split_top(text)?
        .into_iter()
        .map(|entry| {
            let inner = strip_delimited(entry, '(', ')')
                .ok_or_else(|| malformed(entry, "pair is not parenthesised"))?;
            let (a, b) = inner
                .split_once(',')
                .ok_or_else(|| malformed(entry, "pair without ','"))?;
            let b = match b.trim() {
                ABSENT => None,
                other => Some(B::decode_from(other)?),
            };
            Ok((A::decode_from(a)?, b))
        })
        .collect()
}

pub fn decode_text_list(text: &str) -> Result<Vec<String>, CodecError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(text).map_err(|_| malformed(text, "text list is not a JSON array"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn list_keeps_order_and_duplicates() {
        let ids = vec![3u32, 1, 3, 2];
        let text = encode_list(&ids);
        assert_eq!(text, "3,1,3,2");
        assert_eq!(decode_list::<u32>(&text).unwrap(), ids);
    }

    #[test]
    fn list_with_sentinel_entries() {
        let ids = vec![-1i64, 4, -1];
        assert_eq!(decode_list::<i64>(&encode_list(&ids)).unwrap(), ids);
    }

    #[test]
    fn empty_collections_encode_to_empty_string() {
        assert_eq!(encode_list::<u32, _>(&Vec::new()), "");
        assert!(decode_list::<u32>("").unwrap().is_empty());
        assert!(decode_set::<u32>("  ").unwrap().is_empty());
        assert!(decode_map::<u32, u32>("").unwrap().is_empty());
        assert!(decode_map_of_lists::<u32, u32, BTreeSet<u32>>("")
            .unwrap()
            .is_empty());
        assert!(decode_pairs::<u32, u32>("").unwrap().is_empty());
        assert!(decode_nested::<u32>("").unwrap().is_empty());
        assert!(decode_text_list("").unwrap().is_empty());
    }

    #[test]
    fn set_collapses_duplicates() {
        let set = decode_set::<VarId>("5,2,5").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(encode_list(&set), "2,5");
    }

    #[test]
    fn map_round_trip() {
        let map: BTreeMap<BlockId, BlockId> =
            [(BlockId(1), BlockId(0)), (BlockId(4), BlockId(2))].into();
        let text = encode_map(&map);
        assert_eq!(text, "1:0,4:2");
        assert_eq!(decode_map::<BlockId, BlockId>(&text).unwrap(), map);

        let single: BTreeMap<i64, i64> = [(-1, -1)].into();
        assert_eq!(decode_map::<i64, i64>(&encode_map(&single)).unwrap(), single);
    }

    #[test]
    fn map_of_sets_round_trip_with_empty_value() {
        let mut map: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
        map.insert(1, [2, 3].into());
        map.insert(4, BTreeSet::new());
        let text = encode_map_of_sets(&map);
        assert_eq!(text, "1:{2,3},4:{}");
        assert_eq!(decode_map_of_lists::<u32, u32, BTreeSet<u32>>(&text).unwrap(), map);
    }

    #[test]
    fn map_of_lists_keeps_value_order() {
        let map: BTreeMap<u32, Vec<u32>> = [(7, vec![9, 8, 9])].into();
        let text = encode_map_of_lists(&map);
        assert_eq!(decode_map_of_lists::<u32, u32, Vec<u32>>(&text).unwrap(), map);
    }

    #[test]
    fn nested_lists_distinguish_empty_inner_list() {
        let lists = vec![vec![VarId(1), VarId(2)], vec![]];
        let text = encode_nested(&lists);
        assert_eq!(text, "{1,2},{}");
        assert_eq!(decode_nested::<VarId>(&text).unwrap(), lists);
        assert_eq!(decode_nested::<VarId>("{}").unwrap(), vec![Vec::<VarId>::new()]);
    }

    #[test]
    fn pairs_round_trip_with_absent_marker() {
        let pairs = vec![(VarId(1), Some(TypeId(7))), (VarId(2), None)];
        let text = encode_pairs(&pairs);
        assert_eq!(text, "(1,7),(2,NULL)");
        assert_eq!(decode_pairs::<VarId, TypeId>(&text).unwrap(), pairs);

        let single = vec![(VarId(9), None::<TypeId>)];
        assert_eq!(decode_pairs::<VarId, TypeId>(&encode_pairs(&single)).unwrap(), single);
    }

    #[test]
    fn text_list_survives_separators() {
        let items = vec!["a,b".to_string(), "x:{y}".to_string(), "q'uote".to_string()];
        assert_eq!(decode_text_list(&encode_text_list(&items)).unwrap(), items);
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(matches!(
            decode_list::<u32>("1,x"),
            Err(CodecError::InvalidNumber { .. })
        ));
        assert!(decode_list::<u32>("1,-2").is_err());
        assert!(decode_map::<u32, u32>("1-2").is_err());
        assert!(decode_map_of_lists::<u32, u32, Vec<u32>>("1:{2").is_err());
        assert!(decode_map_of_lists::<u32, u32, Vec<u32>>("1:2").is_err());
        assert!(decode_pairs::<u32, u32>("(1 2)").is_err());
        assert!(decode_nested::<u32>("1,2").is_err());
        assert!(decode_list::<u32>("1}").is_err());
    }

    proptest! {
        #[test]
        fn list_round_trips(ids in proptest::collection::vec(any::<u32>(), 0..20)) {
            prop_assert_eq!(decode_list::<u32>(&encode_list(&ids)).unwrap(), ids);
        }

        #[test]
        fn map_of_sets_round_trips(
            map in proptest::collection::btree_map(
                any::<u32>(),
                proptest::collection::btree_set(any::<u32>(), 0..5),
                0..8,
            )
        ) {
            let text = encode_map_of_sets(&map);
            prop_assert_eq!(
                decode_map_of_lists::<u32, u32, BTreeSet<u32>>(&text).unwrap(),
                map
            );
        }

        #[test]
        fn pairs_round_trip(
            pairs in proptest::collection::vec((any::<i64>(), proptest::option::of(any::<u32>())), 0..10)
        ) {
            prop_assert_eq!(decode_pairs::<i64, u32>(&encode_pairs(&pairs)).unwrap(), pairs);
        }
    }
}
