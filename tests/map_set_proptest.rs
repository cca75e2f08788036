// HashMap / HashSet property tests against std collections.
//
// Property 1: random insert / remove / entry / get_or_insert_default
// sequences on HashMap<String, i64> agree with std's HashMap, including
// after clone and after a shrink.
//
// Property 2: set algebra agrees with std's HashSet.
use std::collections::HashMap as StdHashMap;
use std::collections::HashSet as StdHashSet;

use closed_hash::HashMap;
use closed_hash::HashSet;
use proptest::prelude::*;

fn sorted<T: Ord + Clone>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut values = values.into_iter().collect::<Vec<_>>();
    values.sort();
    values
}

proptest! {
    #[test]
    fn prop_map_matches_std(ops in proptest::collection::vec((0u8..5, 0u8..40, any::<i64>()), 1..200)) {
        let mut map: HashMap<String, i64> = HashMap::new();
        let mut model: StdHashMap<String, i64> = StdHashMap::new();

        for (op, raw_key, value) in ops {
            let key = format!("key-{raw_key}");
            match op {
                0 => {
                    prop_assert_eq!(map.insert(key.clone(), value), model.insert(key, value));
                }
                1 => {
                    prop_assert_eq!(map.remove(key.as_str()), model.remove(&key));
                }
                2 => {
                    let value = map.entry(key.clone()).or_insert(0);
                    *value = value.wrapping_add(1);
                    let expected = model.entry(key).or_insert(0);
                    *expected = expected.wrapping_add(1);
                }
                3 => {
                    let value = map.get_or_insert_default(key.clone());
                    *value = value.wrapping_sub(1);
                    let expected = model.entry(key).or_default();
                    *expected = expected.wrapping_sub(1);
                }
                4 => {
                    prop_assert_eq!(map.get(key.as_str()), model.get(&key));
                    prop_assert_eq!(map.contains_key(key.as_str()), model.contains_key(&key));
                }
                _ => unreachable!(),
            }
            prop_assert_eq!(map.len(), model.len());
        }

        map.check_invariants();
        prop_assert_eq!(
            sorted(map.iter().map(|(k, v)| (k.clone(), *v))),
            sorted(model.iter().map(|(k, v)| (k.clone(), *v)))
        );

        let cloned = map.clone();
        prop_assert!(cloned == map);

        map.shrink_to_fit();
        map.check_invariants();
        prop_assert!(cloned == map);
        for (k, v) in &model {
            prop_assert_eq!(map[k.as_str()], *v);
        }
    }

    #[test]
    fn prop_set_algebra_matches_std(
        a in proptest::collection::vec(0u16..200, 0..80),
        b in proptest::collection::vec(0u16..200, 0..80),
    ) {
        let left: HashSet<u16> = a.iter().copied().collect();
        let right: HashSet<u16> = b.iter().copied().collect();
        let std_left: StdHashSet<u16> = a.iter().copied().collect();
        let std_right: StdHashSet<u16> = b.iter().copied().collect();

        left.check_invariants();
        prop_assert_eq!(left.len(), std_left.len());
        prop_assert_eq!(
            sorted(left.union(&right).copied()),
            sorted(std_left.union(&std_right).copied())
        );
        prop_assert_eq!(
            sorted(left.intersection(&right).copied()),
            sorted(std_left.intersection(&std_right).copied())
        );
        prop_assert_eq!(
            sorted(left.difference(&right).copied()),
            sorted(std_left.difference(&std_right).copied())
        );
        prop_assert_eq!(
            sorted(left.symmetric_difference(&right).copied()),
            sorted(std_left.symmetric_difference(&std_right).copied())
        );
        prop_assert_eq!(left.is_subset(&right), std_left.is_subset(&std_right));
        prop_assert_eq!(left.is_disjoint(&right), std_left.is_disjoint(&std_right));
    }
}
