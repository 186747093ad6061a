#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Hash-based collections: unspecified iteration order, so every assertion
//! here is order-insensitive

use std::collections::{HashMap, HashSet};

use hiccup_core::{Hiccup, ObjectRef, Record};

fn sorted_strings(objects: &[ObjectRef]) -> Vec<String> {
    let mut out: Vec<String> = objects
        .iter()
        .map(|o| o.downcast_ref::<String>().expect("string item").clone())
        .collect();
    out.sort();
    out
}

#[test]
fn test_hash_map_values_resolve_to_the_originals() {
    // GIVEN a string-keyed hash map held by a record
    let red = ObjectRef::from("#f00");
    let green = ObjectRef::from("#0f0");
    let blue = ObjectRef::from("#00f");
    let mut palette = HashMap::new();
    palette.insert("red".to_string(), red.clone());
    palette.insert("green".to_string(), green.clone());
    palette.insert("blue".to_string(), blue.clone());
    let root = ObjectRef::from(Record::new("Theme").field("palette", ObjectRef::new(palette)));
    let hiccup = Hiccup::new();

    // WHEN querying all entries, then each key
    let all = hiccup.query_all(&root, "palette/*").unwrap();

    // THEN every value comes back once, as the original object
    assert_eq!(sorted_strings(&all), vec!["#00f", "#0f0", "#f00"]);
    for (key, original) in [("red", &red), ("green", &green), ("blue", &blue)] {
        let hit = hiccup.query_one(&root, &format!("palette/{key}")).unwrap();
        assert!(ObjectRef::ptr_eq(&hit, original), "{key}");
    }
    assert!(all.iter().any(|h| ObjectRef::ptr_eq(h, &red)));
}

#[test]
fn test_hash_set_of_strings_yields_fresh_items() {
    let tags: HashSet<String> = ["rust", "xml", "query"].iter().map(|s| s.to_string()).collect();
    let root = ObjectRef::from(Record::new("Post").field("tags", ObjectRef::new(tags)));
    let hiccup = Hiccup::new();

    let first = hiccup.query_all(&root, "tags/primitivish").unwrap();
    let second = hiccup.query_all(&root, "tags/primitivish").unwrap();

    assert_eq!(sorted_strings(&first), vec!["query", "rust", "xml"]);
    // set members are plain values: each projection materialises new objects
    assert!(first.iter().all(|f| f.strong_count() == 1));
    assert!(first
        .iter()
        .all(|f| second.iter().all(|s| !ObjectRef::ptr_eq(f, s))));

    let one = hiccup.query_one(&root, "tags/*[. = 'xml']").unwrap();
    assert_eq!(one.downcast_ref::<String>().unwrap(), "xml");
}

#[test]
fn test_hash_set_of_integers_yields_fresh_items() {
    let ids: HashSet<i64> = [3, 1, 2].into_iter().collect();
    let root = ObjectRef::new(ids);

    let hits = Hiccup::new().query_all(&root, "/listish/primitivish").unwrap();

    let mut values: Vec<i64> = hits
        .iter()
        .map(|h| *h.downcast_ref::<i64>().expect("integer item"))
        .collect();
    values.sort();
    assert_eq!(values, vec![1, 2, 3]);
    assert!(hits.iter().all(|h| h.strong_count() == 1));

    let two = Hiccup::new().query_one(&root, "*[. = 2]").unwrap();
    assert_eq!(two.downcast_ref::<i64>(), Some(&2));
}
