use std::io::Write;

use chrono::{TimeZone, Utc};

use super::*;
use crate::error::QcError;

const CONFIG: &str = r#"
- variable: var1
  start: 2017-01-01T00:00:00Z
  end: 2017-06-30T00:00:00Z
  tests:
    - "range(min=10, max=20)"
    - ~
    - "generic(func=this > mean(this), flag=BAD)"
- variable: var2
  tests:
    - "  "
    - "mad(length=1D, z=3.5)"
- variable: var3
"#;

#[test]
fn parses_rows_and_cells() {
    let table = ConfigTable::from_yaml_str(CONFIG).unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.column_count(), 3);

    let rows = table.rows();
    assert_eq!(rows[0].variable, "var1");
    assert_eq!(rows[0].start, Some(Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap()));
    assert_eq!(rows[0].end, Some(Utc.with_ymd_and_hms(2017, 6, 30, 0, 0, 0).unwrap()));
    assert_eq!(rows[0].cell(0), Some("range(min=10, max=20)"));
    assert_eq!(rows[0].cell(1), None);

    assert_eq!(rows[1].start, None);
    assert_eq!(rows[1].cell(0), None);
    assert_eq!(rows[1].cell(1), Some("mad(length=1D, z=3.5)"));
    assert_eq!(rows[1].cell(2), None);

    assert!(rows[2].tests.is_empty());
}

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    let table = ConfigTable::from_yaml_file(file.path()).unwrap();
    assert_eq!(table.len(), 3);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigTable::from_yaml_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, QcError::Io(_)));
}

#[test]
fn rejects_malformed_yaml() {
    assert!(matches!(
        ConfigTable::from_yaml_str("- variable: [1, 2"),
        Err(QcError::Yaml(_))
    ));
    assert!(matches!(
        ConfigTable::from_yaml_str("- tests: []"),
        Err(QcError::Yaml(_))
    ));
    assert!(matches!(
        ConfigTable::from_yaml_str("- variable: ' '"),
        Err(QcError::InvalidParameter { .. })
    ));
}

#[test]
fn builder_round_trips_through_yaml() {
    let table = ConfigTable::new(vec![
        TestSpec::new("a").test(Some("missing")).test(None),
        TestSpec::new("b")
            .between(Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()), None)
            .test(Some("range(min=0, max=1)")),
    ]);
    let yaml = table.to_yaml_string().unwrap();
    assert_eq!(ConfigTable::from_yaml_str(&yaml).unwrap(), table);
}
