use super::*;

const SAMPLE: &str = "\
ORGANIZATION,ALLOCATION,SEQUENCE
SEDUC,2.045.3390-39,10
SEDUC,2.045.3390-39,2
SEDUC,1.010.4490-52,1
SESAU,2.100.3390-30,7
SEDUC,2.045.3390-39,2
";

fn sample() -> ReferenceTable {
    ReferenceTable::from_reader(SAMPLE.as_bytes()).expect("table")
}

#[test]
fn organizations_are_distinct_and_sorted() {
    assert_eq!(sample().organizations(), vec!["SEDUC", "SESAU"]);
}

#[test]
fn allocations_are_filtered_by_organization() {
    let table = sample();
    assert_eq!(
        table.allocations("SEDUC"),
        vec!["1.010.4490-52", "2.045.3390-39"]
    );
    assert_eq!(table.allocations("SESAU"), vec!["2.100.3390-30"]);
    assert!(table.allocations("SEMAS").is_empty());
    assert!(table.allocations("").is_empty());
}

#[test]
fn sequences_sort_numerically_and_deduplicate() {
    let table = sample();
    assert_eq!(table.sequences("SEDUC", "2.045.3390-39"), vec!["2", "10"]);
    assert!(table.sequences("SESAU", "2.045.3390-39").is_empty());
}

#[test]
fn numeric_sequences_come_before_textual_ones() {
    let mut values = vec!["B", "11", "A", "3"];
    values.sort_by(|a, b| sequence_order(a, b));
    assert_eq!(values, vec!["3", "11", "A", "B"]);
}

#[test]
fn accepts_portuguese_headers_in_any_order() {
    let raw = "SEQUENCIAL;ÓRGÃO;DOTAÇÃO\n4.0;SEINFRA;3.300\n".replace(';', ",");
    let table = ReferenceTable::from_reader(raw.as_bytes()).expect("table");
    assert_eq!(table.organizations(), vec!["SEINFRA"]);
    assert_eq!(table.sequences("SEINFRA", "3.300"), vec!["4"]);
    assert!(table.contains("SEINFRA", "3.300", "4"));
    assert!(table.contains("SEINFRA", "3.300", "4.0"));
}

#[test]
fn strips_byte_order_mark_from_first_header() {
    let raw = "\u{feff}ORGANIZATION,ALLOCATION,SEQUENCE\nSEDUC,1,1\n";
    let table = ReferenceTable::from_reader(raw.as_bytes()).expect("table");
    assert_eq!(table.len(), 1);
}

#[test]
fn missing_column_is_reported() {
    let raw = "ORGANIZATION,SEQUENCE\nSEDUC,1\n";
    let err = ReferenceTable::from_reader(raw.as_bytes()).expect_err("should fail");
    assert!(matches!(
        err,
        ReferenceError::MissingColumn {
            expected: ALLOCATION_COLUMN,
            ..
        }
    ));
}

#[test]
fn blank_rows_are_skipped_but_partial_rows_fail() {
    let raw = "ORGANIZATION,ALLOCATION,SEQUENCE\nSEDUC,1,1\n,,\n";
    assert_eq!(
        ReferenceTable::from_reader(raw.as_bytes())
            .expect("table")
            .len(),
        1
    );

    let raw = "ORGANIZATION,ALLOCATION,SEQUENCE\nSEDUC,,1\n";
    let err = ReferenceTable::from_reader(raw.as_bytes()).expect_err("should fail");
    assert!(matches!(
        err,
        ReferenceError::IncompleteRow {
            line: 2,
            column: ALLOCATION_COLUMN
        }
    ));
}

#[test]
fn header_only_table_is_empty_error() {
    let raw = "ORGANIZATION,ALLOCATION,SEQUENCE\n";
    let err = ReferenceTable::from_reader(raw.as_bytes()).expect_err("should fail");
    assert!(matches!(err, ReferenceError::Empty));
}

#[test]
fn find_returns_the_matching_row() {
    let table = sample();
    let row = table.find("SESAU", "2.100.3390-30", "7").expect("row");
    assert_eq!(row.organization, "SESAU");
    assert!(table.find("SESAU", "2.100.3390-30", "8").is_none());
}

#[test]
fn normalize_sequence_only_touches_integral_floats() {
    assert_eq!(normalize_sequence("12.0"), "12");
    assert_eq!(normalize_sequence(" 12.00 "), "12");
    assert_eq!(normalize_sequence("12.5"), "12.5");
    assert_eq!(normalize_sequence("A.0"), "A.0");
    assert_eq!(normalize_sequence("7"), "7");
}
