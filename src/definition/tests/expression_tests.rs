use super::*;
use serde_json::json;

fn path(raw: &str) -> Expression {
    Expression::Path(raw.to_string())
}

fn literal(value: serde_json::Value) -> Expression {
    Expression::Literal(value)
}

#[test]
fn literal_evaluates_to_itself() {
    let context = json!({});
    assert_eq!(evaluate(&literal(json!(5)), &context).unwrap(), json!(5));
    assert_eq!(
        evaluate(&literal(json!({"a": [1, 2]})), &context).unwrap(),
        json!({"a": [1, 2]})
    );
}

#[test]
fn path_resolves_nested_values() {
    let context = json!({"order": {"total": 100, "lines": [{"sku": "x"}]}});
    assert_eq!(evaluate(&path("order/total"), &context).unwrap(), json!(100));
    assert_eq!(
        evaluate(&path("order/lines"), &context).unwrap(),
        json!([{"sku": "x"}])
    );
    // Missing segments resolve to null instead of failing.
    assert_eq!(evaluate(&path("order/missing"), &context).unwrap(), json!(null));
    assert_eq!(evaluate(&path("ghost/deep/path"), &context).unwrap(), json!(null));
}

#[test]
fn exists_is_false_for_missing_and_null() {
    let context = json!({"order": {"total": 0, "note": null}});
    let check = |raw: &str| evaluate(&Expression::Exists(raw.to_string()), &context).unwrap();
    assert_eq!(check("order/total"), json!(true));
    assert_eq!(check("order/note"), json!(false));
    assert_eq!(check("order/missing"), json!(false));
}

#[test]
fn not_inverts_a_boolean_and_rejects_the_rest() {
    let context = json!({"flag": true});
    let inverted = Expression::Not(Box::new(path("flag")));
    assert_eq!(evaluate(&inverted, &context).unwrap(), json!(false));

    let broken = Expression::Not(Box::new(literal(json!(5))));
    assert!(evaluate(&broken, &context).is_err());
}

#[test]
fn empty_all_is_true_and_empty_any_is_false() {
    let context = json!({});
    assert_eq!(evaluate(&Expression::All(Vec::new()), &context).unwrap(), json!(true));
    assert_eq!(evaluate(&Expression::Any(Vec::new()), &context).unwrap(), json!(false));
}

#[test]
fn eq_treats_null_as_a_regular_value() {
    let context = json!({"order": {"total": 100}});
    let missing_is_null = Expression::Eq(Box::new(path("order/missing")), Box::new(literal(json!(null))));
    assert_eq!(evaluate(&missing_is_null, &context).unwrap(), json!(true));

    let ne = Expression::Ne(Box::new(path("order/total")), Box::new(literal(json!(100))));
    assert_eq!(evaluate(&ne, &context).unwrap(), json!(false));
}

#[test]
fn comparisons_require_numbers_on_both_sides() {
    let context = json!({"order": {"total": 150, "status": "open"}});
    let above = Expression::Gt(Box::new(path("order/total")), Box::new(literal(json!(100))));
    assert_eq!(evaluate(&above, &context).unwrap(), json!(true));
    let below = Expression::Lt(Box::new(path("order/total")), Box::new(literal(json!(100))));
    assert_eq!(evaluate(&below, &context).unwrap(), json!(false));

    let text = Expression::Gt(Box::new(path("order/status")), Box::new(literal(json!(100))));
    let error = evaluate(&text, &context).unwrap_err();
    assert!(error.message.contains("requires numbers"), "{}", error.message);

    // A missing path is null, which is not a number either.
    let missing = Expression::Lt(Box::new(path("ghost")), Box::new(literal(json!(100))));
    assert!(evaluate(&missing, &context).is_err());
}

#[test]
fn evaluate_bool_rejects_non_booleans() {
    let context = json!({});
    assert!(evaluate_bool(&literal(json!(true)), &context).unwrap());
    let error = evaluate_bool(&literal(json!(5)), &context).unwrap_err();
    assert!(error.message.contains("expected a boolean"), "{}", error.message);
}

#[test]
fn combinators_nest() {
    let context = json!({"order": {"total": 150}, "approved": false});
    let expression = Expression::All(vec![
        Expression::Exists("order".to_string()),
        Expression::Any(vec![
            Expression::Gt(Box::new(path("order/total")), Box::new(literal(json!(1000)))),
            Expression::Not(Box::new(path("approved"))),
        ]),
    ]);
    assert!(evaluate_bool(&expression, &context).unwrap());
}

#[test]
fn parses_the_yaml_expression_form() {
    let raw = r#"
all:
  - exists: order
  - gt:
      - path: order/total
      - literal: 100
"#;
    let expression: Expression = serde_yaml::from_str(raw).unwrap();
    assert!(evaluate_bool(&expression, &json!({"order": {"total": 150}})).unwrap());
    assert!(!evaluate_bool(&expression, &json!({"order": {"total": 50}})).unwrap());
}
