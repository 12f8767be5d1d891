use rstest::*;
use serde_json::json;

use super::*;
use crate::jsonutils::fieldpath;

#[rstest]
#[case::slash("example.com/managed-by", "example.com~1managed-by")]
#[case::tilde("weird~key", "weird~0key")]
#[case::both("a~/b", "a~0~1b")]
#[case::plain("plain", "plain")]
fn test_escape(#[case] raw: &str, #[case] escaped: &str) {
    assert_eq!(escape(raw), escaped);
    assert_eq!(unescape(escaped), raw);
}

#[rstest]
fn test_remove_path() {
    let mut doc = json!({"metadata": {"labels": {"a": "1", "b": "2"}}, "spec": {"items": [1, 2, 3]}});

    remove_path(&mut doc, "/metadata/labels/a");
    assert_eq!(doc["metadata"]["labels"], json!({"b": "2"}));

    remove_path(&mut doc, "/spec/items/1");
    assert_eq!(doc["spec"]["items"], json!([1, 3]));

    // missing paths are a no-op at every level
    let before = doc.clone();
    remove_path(&mut doc, "/metadata/annotations/missing");
    remove_path(&mut doc, "/nope/nope/nope");
    remove_path(&mut doc, "/spec/items/99");
    assert_eq!(doc, before);
}

#[rstest]
fn test_remove_path_escaped_key() {
    let mut doc = json!({"metadata": {"annotations": {"example.com/note": "hi", "other": "x"}}});
    remove_path(&mut doc, "/metadata/annotations/example.com~1note");
    assert_eq!(doc["metadata"]["annotations"], json!({"other": "x"}));
}

#[rstest]
#[case::int_vs_float(json!({"replicas": 1}), json!({"replicas": 1.0}), true)]
#[case::absent_vs_empty_map(json!({"spec": {}}), json!({}), true)]
#[case::absent_vs_empty_list(json!({"items": []}), json!({}), true)]
#[case::null_field(json!({"a": null}), json!({}), true)]
#[case::differing(json!({"a": 1}), json!({"a": 2}), false)]
#[case::extra_key(json!({"a": 1}), json!({"a": 1, "b": 2}), false)]
#[case::nested(json!({"a": {"b": [1, 2]}}), json!({"a": {"b": [1, 2.0]}}), true)]
fn test_semantic_eq(#[case] a: serde_json::Value, #[case] b: serde_json::Value, #[case] expected: bool) {
    assert_eq!(semantic_eq(&a, &b), expected);
    assert_eq!(semantic_eq(&b, &a), expected);
}

#[rstest]
fn test_semantic_eq_idempotent() {
    let x = json!({"spec": {"replicas": 3, "template": {"metadata": {"labels": {"app": "x"}}}}});
    assert!(semantic_eq(&x, &x));
}

#[rstest]
#[case::subset(json!({"app": "x"}), json!({"app": "x", "injected": "y"}), true)]
#[case::missing(json!({"app": "x"}), json!({"injected": "y"}), false)]
#[case::value_mismatch(json!({"app": "x"}), json!({"app": "y", "injected": "y"}), false)]
#[case::null_matches_anything(json!(null), json!({"whatever": 1}), true)]
#[case::numeric(json!({"n": 2}), json!({"n": 2.0, "m": 1}), true)]
fn test_semantic_derivative(#[case] sub: serde_json::Value, #[case] sup: serde_json::Value, #[case] expected: bool) {
    assert_eq!(semantic_derivative(&sub, &sup), expected);
}

#[rstest]
fn test_derivative_is_not_symmetric() {
    let sub = json!({"app": "x"});
    let sup = json!({"app": "x", "injected": "y"});
    assert!(semantic_derivative(&sub, &sup));
    assert!(!semantic_derivative(&sup, &sub));
}

#[rstest]
fn test_fieldpath_round_trip() {
    let trie = json!({"f:metadata": {"f:labels": {"f:app": {}, "f:tier": {}}}, "f:spec": {"f:replicas": {}}});
    let paths = fieldpath::path_set(&trie);
    assert_eq!(paths.len(), 3);
    assert_eq!(fieldpath::trie_from_paths(&paths), trie);
}

#[rstest]
fn test_fieldpath_union() {
    let ours = json!({"f:metadata": {"f:labels": {"f:app": {}}}});
    let theirs = json!({"f:metadata": {"f:labels": {"f:extra": {}}}, "f:spec": {"f:replicas": {}}});
    let merged = fieldpath::union(&ours, &theirs);
    assert_eq!(
        merged,
        json!({
            "f:metadata": {"f:labels": {"f:app": {}, "f:extra": {}}},
            "f:spec": {"f:replicas": {}},
        })
    );
}

#[rstest]
fn test_fieldpath_union_empty() {
    let ours = json!({"f:metadata": {"f:name": {}}});
    assert_eq!(fieldpath::union(&ours, &json!({})), ours);
    assert_eq!(fieldpath::union(&json!({}), &json!({})), json!({}));
}
