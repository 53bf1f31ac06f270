use chrono::{Duration, TimeZone, Utc};
use tsqc_core::config::{FlaggerKind, SetPolicy};
use tsqc_core::{CoreError, QcSettings};

use super::*;
use crate::error::QcError;

fn ordinal() -> OrdinalFlagger {
    OrdinalFlagger::new(FlagScale::default(), SetPolicy::Overwrite)
}

fn categorical() -> CategoricalFlagger {
    CategoricalFlagger::new(FlagScale::default(), SetPolicy::Overwrite, "abc123")
}

fn index(n: i64) -> Vec<chrono::DateTime<Utc>> {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    (0..n).map(|i| start + Duration::minutes(10 * i)).collect()
}

// ── Scale ───────────────────────────────────────────────────────────

#[test]
fn default_scale_names() {
    let scale = FlagScale::default();
    assert_eq!(scale.name(scale.unflagged()).unwrap(), "UNFLAGGED");
    assert_eq!(scale.name(scale.good()).unwrap(), "GOOD");
    assert_eq!(scale.name(scale.bad()).unwrap(), "BAD");
    assert_eq!(scale.resolve("doubtful").unwrap(), Severity(2));
    assert_eq!(scale.label(None), NIL_LABEL);
}

#[test]
fn scale_rejects_bad_levels() {
    assert!(FlagScale::new(Vec::<String>::new()).is_err());
    assert!(FlagScale::new(["OK", "ok"]).is_err());
    assert!(FlagScale::new(["OK", "NIL"]).is_err());
    let single = FlagScale::new(["OK"]).unwrap();
    assert_eq!(single.good(), single.bad());
}

#[test]
fn unknown_severity_is_rejected() {
    let f = ordinal();
    assert!(matches!(
        f.severity("TERRIBLE"),
        Err(QcError::UnknownSeverity(name)) if name == "TERRIBLE"
    ));

    let mut col = f.empty(3);
    let err = f
        .set_flag(&mut col, &[true, false, true], Severity(9), &FlagExtra::default())
        .unwrap_err();
    assert!(matches!(err, QcError::UnknownSeverity(_)));
}

#[test]
fn comparator_parsing() {
    assert_eq!(">=".parse::<Comparator>().unwrap(), Comparator::Ge);
    assert_eq!(" != ".parse::<Comparator>().unwrap(), Comparator::Ne);
    assert!("=>".parse::<Comparator>().is_err());
}

// ── Ordinal ─────────────────────────────────────────────────────────

#[test]
fn set_then_is_flagged_round_trips_mask() {
    let f = ordinal();
    let bad = f.scale().bad();
    let masks = [
        vec![false; 6],
        vec![true; 6],
        vec![true, false, true, false, false, true],
        vec![false, false, false, false, false, true],
    ];
    for mask in masks {
        let mut col = f.empty(mask.len());
        f.set_flag(&mut col, &mask, bad, &FlagExtra::default()).unwrap();
        assert_eq!(f.is_flagged(&col, Comparator::Eq, bad).unwrap(), mask);
    }
}

#[test]
fn untouched_cells_are_never_flagged() {
    let f = ordinal();
    let col = f.untouched(4);
    let unflagged = f.scale().unflagged();
    for cmp in [Comparator::Eq, Comparator::Ge, Comparator::Le, Comparator::Ne] {
        assert_eq!(f.is_flagged(&col, cmp, unflagged).unwrap(), vec![false; 4]);
    }
}

#[test]
fn default_flagged_means_worse_than_good() {
    let f = ordinal();
    let mut col = f.empty(4);
    let s = f.scale();
    f.set_flag(&mut col, &[false, true, false, false], s.good(), &FlagExtra::default())
        .unwrap();
    f.set_flag(&mut col, &[false, false, true, false], Severity(2), &FlagExtra::default())
        .unwrap();
    f.set_flag(&mut col, &[false, false, false, true], s.bad(), &FlagExtra::default())
        .unwrap();
    assert_eq!(
        f.is_flagged_default(&col).unwrap(),
        vec![false, false, true, true]
    );
}

#[test]
fn init_untouched_keeps_touched_cells() {
    let f = ordinal();
    let mut col = FlagColumn::Ordinal(vec![None, Some(Severity(3)), None]);
    f.init_untouched(&mut col).unwrap();
    assert_eq!(col.currents(), vec![Some(Severity(0)), Some(Severity(3)), Some(Severity(0))]);
}

#[test]
fn escalate_policy_refuses_downgrades_unless_forced() {
    let f = OrdinalFlagger::new(FlagScale::default(), SetPolicy::Escalate);
    let s = f.scale().clone();
    let mut col = f.empty(2);
    f.set_flag(&mut col, &[true, true], s.bad(), &FlagExtra::default()).unwrap();

    f.set_flag(&mut col, &[true, true], s.good(), &FlagExtra::default()).unwrap();
    assert_eq!(col.currents(), vec![Some(s.bad()), Some(s.bad())]);

    let forced = FlagExtra {
        force: true,
        ..FlagExtra::default()
    };
    f.set_flag(&mut col, &[false, true], s.good(), &forced).unwrap();
    assert_eq!(col.currents(), vec![Some(s.bad()), Some(s.good())]);
}

#[test]
fn overwrite_policy_downgrades() {
    let f = ordinal();
    let s = f.scale().clone();
    let mut col = f.empty(1);
    f.set_flag(&mut col, &[true], s.bad(), &FlagExtra::default()).unwrap();
    f.set_flag(&mut col, &[true], s.good(), &FlagExtra::default()).unwrap();
    assert_eq!(col.current(0), Some(s.good()));
}

#[test]
fn ordinal_merge_takes_the_more_severe() {
    let f = ordinal();
    let a = FlagColumn::Ordinal(vec![None, Some(Severity(1)), Some(Severity(3)), None]);
    let b = FlagColumn::Ordinal(vec![Some(Severity(0)), Some(Severity(2)), Some(Severity(1)), None]);
    let merged = f.merge(&a, &b).unwrap();
    assert_eq!(
        merged.currents(),
        vec![Some(Severity(0)), Some(Severity(2)), Some(Severity(3)), None]
    );
}

#[test]
fn layout_mismatch_is_an_error() {
    let f = ordinal();
    let col = categorical().empty(2);
    assert!(matches!(
        f.is_flagged_default(&col),
        Err(QcError::FlagLayoutMismatch {
            expected: "ordinal",
            found: "categorical"
        })
    ));
}

#[test]
fn ordinal_export_renders_labels() {
    let f = ordinal();
    let col = FlagColumn::Ordinal(vec![None, Some(Severity(0)), Some(Severity(3))]);
    match f.export(&col).unwrap() {
        ColumnExport::Ordinal { flag } => assert_eq!(flag, vec!["NIL", "UNFLAGGED", "BAD"]),
        other => panic!("unexpected export {other:?}"),
    }
}

// ── Categorical ─────────────────────────────────────────────────────

#[test]
fn categorical_appends_provenance() {
    let f = categorical();
    let s = f.scale().clone();
    let mut col = f.empty(3);
    let extra = FlagExtra {
        comment: Some("spike".into()),
        cause: Some("mad".into()),
        test: "mad".into(),
        test_seq: 2,
        ..FlagExtra::default()
    };
    f.set_flag(&mut col, &[false, true, false], s.bad(), &extra).unwrap();

    let FlagColumn::Categorical(cells) = &col else {
        panic!("expected categorical column");
    };
    assert_eq!(cells[0].len(), 1);
    assert_eq!(cells[1].len(), 2);
    let latest = cells[1].last().unwrap();
    assert_eq!(latest.severity, s.bad());
    assert_eq!(latest.comment, "spike");
    assert_eq!(latest.cause, "mad");
    assert_eq!(latest.commit, "abc123");
    assert_eq!(latest.test_seq, 2);
    assert_eq!(cells[1][0].severity, s.unflagged());

    assert_eq!(
        f.is_flagged(&col, Comparator::Eq, s.bad()).unwrap(),
        vec![false, true, false]
    );
}

#[test]
fn categorical_merge_concatenates_older_first() {
    let f = categorical();
    let s = f.scale().clone();
    let mut a = f.empty(2);
    f.set_flag(&mut a, &[true, false], s.bad(), &FlagExtra::default()).unwrap();
    let mut b = f.untouched(2);
    f.set_flag(&mut b, &[true, true], s.good(), &FlagExtra::default()).unwrap();

    let merged = f.merge(&a, &b).unwrap();
    let FlagColumn::Categorical(cells) = &merged else {
        panic!("expected categorical column");
    };
    let sev: Vec<Severity> = cells[0].iter().map(|e| e.severity).collect();
    assert_eq!(sev, vec![s.unflagged(), s.bad(), s.good()]);
    assert_eq!(merged.current(1), Some(s.good()));
}

#[test]
fn categorical_export_has_provenance_columns() {
    let f = categorical();
    let mut col = f.untouched(2);
    let extra = FlagExtra {
        comment: Some("manual".into()),
        commit: Some("deadbeef".into()),
        ..FlagExtra::default()
    };
    f.set_flag(&mut col, &[true, false], Severity(2), &extra).unwrap();
    match f.export(&col).unwrap() {
        ColumnExport::Categorical {
            flag,
            comment,
            cause,
            commit,
        } => {
            assert_eq!(flag, vec!["DOUBTFUL", "NIL"]);
            assert_eq!(comment, vec!["manual", ""]);
            assert_eq!(cause, vec!["", ""]);
            assert_eq!(commit, vec!["deadbeef", ""]);
        }
        other => panic!("unexpected export {other:?}"),
    }
}

#[test]
fn settings_choose_the_flagger() {
    let settings = QcSettings {
        flagger: FlaggerKind::Categorical,
        ..QcSettings::default()
    };
    let f = flagger_from_settings(&settings);
    assert_eq!(f.kind(), FlaggerKind::Categorical);
    assert_eq!(f.layout(), "categorical");
    assert_eq!(flagger_from_settings(&QcSettings::default()).kind(), FlaggerKind::Ordinal);
}

// ── Table ───────────────────────────────────────────────────────────

#[test]
fn table_slice_and_write_back_stay_in_range() {
    let f = ordinal();
    let mut table = FlagTable::untouched(&f, &index(6), ["a", "b"]).unwrap();
    let mut chunk = table.slice(2..4);
    let col = chunk.column_mut("a").unwrap();
    f.init_untouched(col).unwrap();
    f.set_flag(col, &[true, true], f.scale().bad(), &FlagExtra::default()).unwrap();
    table.write_back(2..4, &chunk).unwrap();

    let bad = Some(f.scale().bad());
    assert_eq!(
        table.column("a").unwrap().currents(),
        vec![None, None, bad, bad, None, None]
    );
    assert_eq!(table.column("b").unwrap().currents(), vec![None; 6]);
    assert!(table.write_back(0..3, &chunk).is_err());
}

#[test]
fn table_merge_unions_timestamps() {
    let f = ordinal();
    let idx = index(4);
    let mut left = FlagTable::untouched(&f, &idx[..3], ["a"]).unwrap();
    left.insert("a", FlagColumn::Ordinal(vec![Some(Severity(3)), Some(Severity(1)), None]))
        .unwrap();
    let mut right = FlagTable::untouched(&f, &idx[1..], ["a", "b"]).unwrap();
    right
        .insert("a", FlagColumn::Ordinal(vec![Some(Severity(2)), Some(Severity(1)), Some(Severity(3))]))
        .unwrap();

    let merged = left.merge(&right, &f).unwrap();
    assert_eq!(merged.index(), &idx[..]);
    assert_eq!(
        merged.column("a").unwrap().currents(),
        vec![Some(Severity(3)), Some(Severity(2)), Some(Severity(1)), Some(Severity(3))]
    );
    assert_eq!(merged.column("b").unwrap().currents(), vec![None; 4]);
}

#[test]
fn align_to_restricts_and_extends() {
    let f = ordinal();
    let idx = index(5);
    let mut table = FlagTable::untouched(&f, &idx[1..3], ["a"]).unwrap();
    table.insert("a", f.empty(2)).unwrap();

    let aligned = table.align_to(&idx[2..]);
    assert_eq!(
        aligned.column("a").unwrap().currents(),
        vec![Some(Severity(0)), None, None]
    );
}

#[test]
fn table_insert_checks_length() {
    let f = ordinal();
    let mut table = FlagTable::untouched(&f, &index(3), ["a"]).unwrap();
    assert!(table.insert("b", f.empty(2)).is_err());
}

#[test]
fn table_export_serializes_to_json() {
    let f = ordinal();
    let table = FlagTable::untouched(&f, &index(2), ["a"]).unwrap();
    let json = serde_json::to_value(table.export(&f).unwrap()).unwrap();
    assert_eq!(json["columns"]["a"]["flag"], serde_json::json!(["NIL", "NIL"]));
}

#[test]
fn json_state_reloads_with_history() {
    let f = categorical();
    let mut table = FlagTable::untouched(&f, &index(3), ["a"]).unwrap();
    let col = table.column_mut("a").unwrap();
    let extra = FlagExtra {
        comment: Some("spike".into()),
        test: "range".into(),
        test_seq: 1,
        ..FlagExtra::default()
    };
    f.set_flag(col, &[false, true, false], f.scale().bad(), &extra).unwrap();

    let back = FlagTable::from_json_str(&table.to_json_string().unwrap()).unwrap();
    assert_eq!(back, table);
    let FlagColumn::Categorical(cells) = back.column("a").unwrap() else {
        panic!("expected categorical column");
    };
    assert_eq!(cells[1].last().unwrap().comment, "spike");
}

#[test]
fn json_state_is_validated() {
    let f = ordinal();
    let table = FlagTable::untouched(&f, &index(3), ["a"]).unwrap();
    let mut json = serde_json::to_value(&table).unwrap();

    let mut swapped = json.clone();
    swapped["index"].as_array_mut().unwrap().swap(1, 2);
    assert!(matches!(
        FlagTable::from_json_str(&swapped.to_string()),
        Err(QcError::NonMonotonicInput { position: 2 })
    ));

    json["columns"]["a"]["cells"].as_array_mut().unwrap().pop();
    assert!(matches!(
        FlagTable::from_json_str(&json.to_string()),
        Err(QcError::Core(CoreError::LengthMismatch { .. }))
    ));

    assert!(matches!(
        FlagTable::from_json_str("{\"index\": 3}"),
        Err(QcError::Core(CoreError::Json(_)))
    ));
}
