use assertables::*;
use rstest::*;
use serde_json::json;

use super::mask::{
    MASK,
    MASK_AFTER,
    MASK_BEFORE,
};
use super::*;

#[rstest]
fn test_compute_patch_metadata_adds() {
    let live = json!({"metadata": {"labels": {}, "annotations": {}}, "spec": {"replicas": 1}});
    let dry = json!({
        "metadata": {"labels": {"labeled": "yes"}, "annotations": {"annotated": "yes"}},
        "spec": {"replicas": 1},
    });

    let patch = compute_patch(&live, &dry);
    assert_len_eq_x!(&patch.0, 2);
    for op in &patch.0 {
        assert_eq!(op.op, OpKind::Add);
        assert_eq!(op.value, Some(json!("yes")));
    }
    let paths: Vec<_> = patch.0.iter().map(|op| op.path.as_str()).collect();
    assert_contains!(&paths, &"/metadata/annotations/annotated");
    assert_contains!(&paths, &"/metadata/labels/labeled");
}

#[rstest]
fn test_compute_patch_drops_metadata_removes() {
    // the live object has controller-injected labels the desired state
    // doesn't know about; they must not show up as removals
    let live = json!({"metadata": {"labels": {"injected-by-controller": "x", "app": "a"}}});
    let dry = json!({"metadata": {"labels": {"app": "b"}}});

    let patch = compute_patch(&live, &dry);
    assert_len_eq_x!(&patch.0, 1);
    assert_eq!(patch.0[0].op, OpKind::Replace);
    assert_eq!(patch.0[0].path, "/metadata/labels/app");
    assert_eq!(patch.0[0].old_value, Some(json!("a")));
    assert_eq!(patch.0[0].value, Some(json!("b")));
}

#[rstest]
fn test_compute_patch_spec_changes_carry_old_values() {
    let live = json!({"metadata": {}, "spec": {"replicas": 1, "paused": true}, "status": {"replicas": 1}});
    let dry = json!({"metadata": {}, "spec": {"replicas": 3}, "status": {}});

    let patch = compute_patch(&live, &dry);
    let replace = patch.0.iter().find(|op| op.path == "/spec/replicas").unwrap();
    assert_eq!(replace.op, OpKind::Replace);
    assert_eq!(replace.old_value, Some(json!(1)));
    assert_eq!(replace.value, Some(json!(3)));

    let remove = patch.0.iter().find(|op| op.path == "/spec/paused").unwrap();
    assert_eq!(remove.op, OpKind::Remove);
    assert_eq!(remove.old_value, Some(json!(true)));

    // status differences are invisible
    assert!(!patch.0.iter().any(|op| op.path.starts_with("/status")));
}

#[rstest]
fn test_compute_patch_empty_when_equal() {
    let doc = json!({"metadata": {"labels": {"a": "b"}}, "spec": {"x": 1}});
    assert!(compute_patch(&doc, &doc).is_empty());
}

#[rstest]
fn test_apply_ignore_paths() {
    let mut live = json!({"spec": {"replicas": 1, "keep": true}});
    let mut dry = json!({"spec": {"replicas": 3, "keep": true}});
    apply_ignore_paths(&["/spec/replicas".to_string(), "/spec/missing".to_string()], &mut live, &mut dry);
    assert!(compute_patch(&live, &dry).is_empty());
}

#[rstest]
fn test_rationalize_patch_collapses_subtree() {
    let live = json!({"data": {"a": "1", "b": "2", "c": "3"}});
    let dry = json!({"data": {"a": "x", "b": "y", "c": "3"}});
    let patch = compute_patch(&live, &dry);
    assert_len_eq_x!(&patch.0, 2);

    let patch = rationalize_patch(patch, &live, &dry);
    assert_len_eq_x!(&patch.0, 1);
    assert_eq!(patch.0[0].op, OpKind::Replace);
    assert_eq!(patch.0[0].path, "/data");
    assert_eq!(patch.0[0].old_value, Some(json!({"a": "1", "b": "2", "c": "3"})));
    assert_eq!(patch.0[0].value, Some(json!({"a": "x", "b": "y", "c": "3"})));
}

#[rstest]
fn test_rationalize_patch_leaves_metadata_and_single_ops() {
    let live = json!({"metadata": {"labels": {"a": "1", "b": "2"}}, "spec": {"replicas": 1}});
    let dry = json!({"metadata": {"labels": {"a": "x", "b": "y"}}, "spec": {"replicas": 2}});
    let patch = compute_patch(&live, &dry);
    let rationalized = rationalize_patch(patch.clone(), &live, &dry);
    assert_eq!(rationalized, patch);
}

#[rstest]
fn test_mask_replace() {
    let live = json!({"metadata": {}, "data": {"foo": "YmFy"}});
    let dry = json!({"metadata": {}, "data": {"foo": "YmF6"}});
    let patch = mask_secret_patch(compute_patch(&live, &dry));

    assert_len_eq_x!(&patch.0, 1);
    assert_eq!(patch.0[0].op, OpKind::Replace);
    assert_eq!(patch.0[0].path, "/data/foo");
    assert_eq!(patch.0[0].old_value, Some(json!(MASK_BEFORE)));
    assert_eq!(patch.0[0].value, Some(json!(MASK_AFTER)));
}

#[rstest]
fn test_mask_add_and_remove() {
    let live = json!({"data": {"old": "c2VjcmV0MQ=="}});
    let dry = json!({"data": {"new": "c2VjcmV0Mg=="}});
    let patch = mask_secret_patch(compute_patch(&live, &dry));

    let add = patch.0.iter().find(|op| op.op == OpKind::Add).unwrap();
    assert_eq!(add.value, Some(json!(MASK)));
    let remove = patch.0.iter().find(|op| op.op == OpKind::Remove).unwrap();
    assert_eq!(remove.old_value, Some(json!(MASK)));
}

#[rstest]
fn test_mask_rationalized_map() {
    let live = json!({"data": {"same": "dg==", "changed": "djE=", "gone": "djI="}});
    let dry = json!({"data": {"same": "dg==", "changed": "djM=", "added": "djQ="}});
    let patch = mask_secret_patch(rationalize_patch(compute_patch(&live, &dry), &live, &dry));

    assert_len_eq_x!(&patch.0, 1);
    let op = &patch.0[0];
    assert_eq!(op.path, "/data");
    assert_eq!(
        op.old_value,
        Some(json!({"same": MASK, "changed": MASK_BEFORE, "gone": MASK}))
    );
    assert_eq!(op.value, Some(json!({"same": MASK, "changed": MASK_AFTER, "added": MASK})));
}

#[rstest]
fn test_mask_never_leaks_values(#[values(false, true)] rationalize: bool) {
    let secrets = ["djE=", "djI=", "djM=", "djQ="];
    let live = json!({"data": {"a": secrets[0], "b": secrets[1]}});
    let dry = json!({"data": {"a": secrets[2], "c": secrets[3]}});

    let mut patch = compute_patch(&live, &dry);
    if rationalize {
        patch = rationalize_patch(patch, &live, &dry);
    }
    let masked = serde_json::to_string(&mask_secret_patch(patch)).unwrap();
    for s in secrets {
        assert_not_contains!(&masked, s);
    }
}

#[rstest]
fn test_ignore_paths_for_unions_matching_rules() {
    let svc_selector =
        crate::selector::Selector::new(crate::selector::SelectorSpec { kind: "Service".into(), ..Default::default() })
            .unwrap();
    let opts = DiffOptions {
        ignore_paths: vec!["/spec/base".into()],
        ignore_rules: vec![
            IgnoreRule { paths: vec!["/metadata/annotations".into()], selector: Some(svc_selector) },
            IgnoreRule { paths: vec!["/spec/everywhere".into()], selector: None },
        ],
        ..Default::default()
    };

    let svc = applier_testutils::test_service("svc");
    let depl = applier_testutils::test_deployment(applier_testutils::TEST_DEPLOYMENT);

    let svc_paths = opts.ignore_paths_for(&svc);
    assert_contains!(&svc_paths, &"/metadata/annotations".to_string());
    assert_contains!(&svc_paths, &"/spec/everywhere".to_string());

    let depl_paths = opts.ignore_paths_for(&depl);
    assert_not_contains!(&depl_paths, &"/metadata/annotations".to_string());
    assert_contains!(&depl_paths, &"/spec/base".to_string());
}
