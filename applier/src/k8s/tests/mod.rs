use applier_testutils::*;
use assertables::*;
use rstest::*;

use super::*;

fn label_selector(labels: &[(&str, &str)], exprs: Vec<metav1::LabelSelectorRequirement>) -> metav1::LabelSelector {
    metav1::LabelSelector {
        match_labels: (!labels.is_empty())
            .then(|| labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()),
        match_expressions: (!exprs.is_empty()).then_some(exprs),
    }
}

fn requirement(key: &str, operator: &str, values: Option<Vec<&str>>) -> metav1::LabelSelectorRequirement {
    metav1::LabelSelectorRequirement {
        key: key.into(),
        operator: operator.into(),
        values: values.map(|vs| vs.iter().map(|v| v.to_string()).collect()),
    }
}

#[fixture]
fn labeled_deployment() -> DynamicObject {
    let mut obj = test_deployment(TEST_DEPLOYMENT);
    obj.labels_mut().insert("app".into(), "nginx".into());
    obj.labels_mut().insert("tier".into(), "frontend".into());
    obj
}

#[rstest]
fn test_matches_full_selector(labeled_deployment: DynamicObject) {
    let sel = label_selector(&[("app", "nginx")], vec![requirement("tier", "In", Some(vec!["frontend", "backend"]))]);
    assert!(labeled_deployment.matches(&sel).unwrap());

    let sel = label_selector(&[("app", "nginx"), ("missing", "x")], vec![]);
    assert!(!labeled_deployment.matches(&sel).unwrap());
}

#[rstest]
#[case::exists(requirement("app", "Exists", None), true)]
#[case::does_not_exist(requirement("app", "DoesNotExist", None), false)]
#[case::not_in(requirement("app", "NotIn", Some(vec!["nginx"])), false)]
#[case::not_in_other(requirement("app", "NotIn", Some(vec!["apache"])), true)]
fn test_matches_expressions(
    labeled_deployment: DynamicObject,
    #[case] expr: metav1::LabelSelectorRequirement,
    #[case] expected: bool,
) {
    let sel = label_selector(&[], vec![expr]);
    assert_eq!(labeled_deployment.matches(&sel).unwrap(), expected);
}

#[rstest]
fn test_matches_malformed_expression(labeled_deployment: DynamicObject) {
    let sel = label_selector(&[], vec![requirement("app", "In", None)]);
    assert_err!(labeled_deployment.matches(&sel));
}

#[rstest]
#[case::in_no_values(requirement("app", "In", None), false)]
#[case::exists_with_values(requirement("app", "Exists", Some(vec!["x"])), false)]
#[case::bogus_operator(requirement("app", "Matches", None), false)]
#[case::ok_in(requirement("app", "In", Some(vec!["x"])), true)]
#[case::ok_exists(requirement("app", "Exists", None), true)]
fn test_validate_label_selector(#[case] expr: metav1::LabelSelectorRequirement, #[case] ok: bool) {
    let sel = label_selector(&[], vec![expr]);
    assert_eq!(validate_label_selector(&sel).is_ok(), ok);
}

#[rstest]
fn test_matches_any_metadata(labeled_deployment: DynamicObject) {
    let mut obj = labeled_deployment;
    obj.annotations_mut().insert("note".into(), "yes".into());

    let sel = [("app".to_string(), "nginx".to_string())].into();
    assert!(matches_any_metadata(&obj, &sel));

    // annotations participate too
    let sel = [("note".to_string(), "yes".to_string())].into();
    assert!(matches_any_metadata(&obj, &sel));

    // value must match, not just the key
    let sel = [("app".to_string(), "apache".to_string())].into();
    assert!(!matches_any_metadata(&obj, &sel));

    assert!(!matches_any_metadata(&obj, &BTreeMap::new()));
}
