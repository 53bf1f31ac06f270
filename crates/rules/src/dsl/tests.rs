use chrono::{Duration, TimeZone, Utc};
use tsqc_core::config::SetPolicy;
use tsqc_core::TimeSeriesFrame;

use super::*;
use crate::error::QcError;
use crate::flagger::{FlagExtra, FlagScale, FlagTable, Flagger, OrdinalFlagger};

fn frame(this: Vec<f64>, other: Vec<f64>) -> TimeSeriesFrame {
    let start = Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap();
    let n = this.len();
    TimeSeriesFrame::with_regular_index(start, Duration::minutes(15), n)
        .unwrap()
        .with_column("x", this)
        .unwrap()
        .with_column("y", other)
        .unwrap()
}

fn check(expr: &str, data: &TimeSeriesFrame, flags: &FlagTable, f: &dyn Flagger) -> Result<Vec<bool>, QcError> {
    let parsed = parse_expression(expr)?;
    let scope = Scope {
        data,
        flags,
        field: "x",
        flagger: f,
        nodata: -9999.0,
    };
    eval_condition(&parsed, expr, &scope)
}

fn setup(this: Vec<f64>, other: Vec<f64>) -> (TimeSeriesFrame, FlagTable, OrdinalFlagger) {
    let f = OrdinalFlagger::new(FlagScale::default(), SetPolicy::Overwrite);
    let data = frame(this, other);
    let flags = FlagTable::untouched(&f, data.index(), ["x", "y"]).unwrap();
    (data, flags, f)
}

// ── Parsing ─────────────────────────────────────────────────────────

#[test]
fn parses_test_call_parameters() {
    let call = parse_test_call("range(min=-5, max=2 * 10, flag=DOUBTFUL)").unwrap();
    assert_eq!(call.name, "range");
    assert_eq!(call.params.keys().collect::<Vec<_>>(), vec!["min", "max", "flag"]);
    assert_eq!(call.params["min"], Expr::Number(-5.0));
    assert_eq!(call.params["flag"], Expr::Ident("DOUBTFUL".into()));
}

#[test]
fn bare_name_is_a_call_without_parameters() {
    let call = parse_test_call("  missing ").unwrap();
    assert_eq!(call.name, "missing");
    assert!(call.params.is_empty());
}

#[test]
fn nested_expression_parameter() {
    let call = parse_test_call("generic(func=this > mean(this) and not isflagged(y))").unwrap();
    assert_eq!(call.params["func"].to_string(), "(this > mean(this)) & (~isflagged(y))");
}

#[test]
fn duration_parameter() {
    let call = parse_test_call("constant(eps=0.1, length=2h30m)").unwrap();
    match &call.params["length"] {
        Expr::Duration { text, value } => {
            assert_eq!(text, "2h30m");
            assert_eq!(*value, Duration::minutes(150));
        }
        other => panic!("expected duration, got {other:?}"),
    }
}

#[test]
fn rejects_malformed_cells() {
    for bad in [
        "range(min=1, min=2)",
        "range(1, 2)",
        "range(min=1",
        "range(min=1) extra",
        "(this)",
        "",
    ] {
        assert!(
            matches!(parse_test_call(bad), Err(QcError::Parse { .. })),
            "expected parse error for {bad:?}"
        );
    }
}

#[test]
fn precedence_and_associativity() {
    let e = parse_expression("1 + 2 * 2 ** 3 ** 2 - -4").unwrap();
    assert_eq!(eval_constant(&e).unwrap(), Value::Scalar(1029.0));

    let e = parse_expression("-2 ** 2").unwrap();
    assert_eq!(eval_constant(&e).unwrap(), Value::Scalar(-4.0));

    let e = parse_expression("(1 + 2) * 3 % 5").unwrap();
    assert_eq!(eval_constant(&e).unwrap(), Value::Scalar(4.0));
}

#[test]
fn chained_comparison_is_rejected() {
    assert!(matches!(
        parse_expression("1 < this < 3"),
        Err(QcError::Parse { .. })
    ));
}

#[test]
fn deep_nesting_is_a_parse_error() {
    let parens = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
    assert!(matches!(
        parse_expression(&parens),
        Err(QcError::Parse { position, .. }) if position == MAX_DEPTH
    ));

    for deep in [
        format!("{}1", "-".repeat(200_000)),
        format!("{}this", "~".repeat(200_000)),
        format!("1{}", " + 1".repeat(200_000)),
        format!("2{}", " ** 2".repeat(200_000)),
        format!("range(min={}0{})", "abs(".repeat(200_000), ")".repeat(200_000)),
    ] {
        assert!(
            matches!(parse_expression(&deep), Err(QcError::Parse { .. })),
            "expected parse error for a {}-byte expression",
            deep.len()
        );
    }
    let call = format!("range(min={}0{})", "(".repeat(200_000), ")".repeat(200_000));
    assert!(matches!(parse_test_call(&call), Err(QcError::Parse { .. })));
}

#[test]
fn moderate_nesting_still_parses() {
    let e = parse_expression(&format!("{}1{}", "(".repeat(100), ")".repeat(100))).unwrap();
    assert_eq!(eval_constant(&e).unwrap(), Value::Scalar(1.0));

    let e = parse_expression(&format!("0{}", " + 1".repeat(100))).unwrap();
    assert_eq!(eval_constant(&e).unwrap(), Value::Scalar(100.0));

    let e = parse_expression(&format!("{}5", "-".repeat(100))).unwrap();
    assert_eq!(eval_constant(&e).unwrap(), Value::Scalar(5.0));
}

#[test]
fn constants_cannot_reference_data() {
    let e = parse_expression("this + 1").unwrap();
    assert!(matches!(eval_constant(&e), Err(QcError::UnknownVariable(name)) if name == "this"));
}

// ── Evaluation ──────────────────────────────────────────────────────

#[test]
fn this_greater_than_zero_flags_positive_samples() {
    let (data, flags, f) = setup(vec![-3.0, 0.0, 2.0, -0.5, 7.0, 0.0], vec![0.0; 6]);
    let mask = check("this > 0", &data, &flags, &f).unwrap();
    assert_eq!(mask, vec![false, false, true, false, true, false]);
}

#[test]
fn aggregates_ignore_missing_samples() {
    let (data, flags, f) = setup(vec![1.0, f64::NAN, 3.0, -9999.0, 8.0], vec![0.0; 5]);
    let mask = check("this > mean(this)", &data, &flags, &f).unwrap();
    assert_eq!(mask, vec![false, false, false, false, true]);

    let mask = check("ismissing(this)", &data, &flags, &f).unwrap();
    assert_eq!(mask, vec![false, true, false, true, false]);

    let mask = check("(this >= min(this)) & (len(this) == 5)", &data, &flags, &f).unwrap();
    assert_eq!(mask, vec![true, false, true, false, true]);
}

#[test]
fn cross_variable_arithmetic() {
    let (data, flags, f) = setup(vec![1.0, 2.0, 3.0], vec![1.0, 5.0, 1.0]);
    let mask = check("abs(this - y) > 1 | y == max(y)", &data, &flags, &f).unwrap();
    assert_eq!(mask, vec![false, true, true]);
}

#[test]
fn scalar_result_is_not_an_array() {
    let (data, flags, f) = setup(vec![1.0, 2.0], vec![0.0; 2]);
    for expr in ["sum(x)", "1 > 0", "True"] {
        assert!(matches!(
            check(expr, &data, &flags, &f),
            Err(QcError::NonArrayResult { expression }) if expression == expr
        ));
    }
}

#[test]
fn numeric_result_is_not_boolean() {
    let (data, flags, f) = setup(vec![1.0, 2.0], vec![0.0; 2]);
    for expr in ["x", "this * 2", "'BAD'"] {
        assert!(matches!(
            check(expr, &data, &flags, &f),
            Err(QcError::NonBooleanResult { .. })
        ));
    }
}

#[test]
fn unknown_identifier() {
    let (data, flags, f) = setup(vec![1.0], vec![0.0]);
    assert!(matches!(
        check("zz > 0", &data, &flags, &f),
        Err(QcError::UnknownVariable(name)) if name == "zz"
    ));
}

#[test]
fn isflagged_reads_other_variables() {
    let (data, mut flags, f) = setup(vec![0.0; 4], vec![0.0; 4]);
    let col = flags.column_mut("y").unwrap();
    f.init_untouched(col).unwrap();
    let s = f.scale().clone();
    f.set_flag(col, &[false, true, false, false], s.bad(), &FlagExtra::default()).unwrap();
    f.set_flag(col, &[false, false, true, false], s.good(), &FlagExtra::default()).unwrap();

    assert_eq!(
        check("isflagged(y)", &data, &flags, &f).unwrap(),
        vec![false, true, false, false]
    );
    assert_eq!(
        check("isflagged(y, GOOD)", &data, &flags, &f).unwrap(),
        vec![false, true, true, false]
    );
    assert_eq!(
        check("isflagged(y, flag=GOOD, comparator='==')", &data, &flags, &f).unwrap(),
        vec![false, false, true, false]
    );
    // x was never touched
    assert_eq!(check("isflagged(this)", &data, &flags, &f).unwrap(), vec![false; 4]);
    assert!(matches!(
        check("isflagged(y, AWFUL)", &data, &flags, &f),
        Err(QcError::UnknownSeverity(_))
    ));
}
