use anyhow::Result;
use dsjson::testing::{TempDataset, adsl_fixture, assert_rows_equal, column_values, expected_count};
use dsjson::{
    DataRequest, DatasetError, DatasetReader, Filter, FilterCondition, RecordsOptions, Row, Shape,
};
use serde_json::json;

fn both_formats() -> Result<Vec<TempDataset>> {
    let adsl = adsl_fixture();
    Ok(vec![
        TempDataset::json(&adsl, "adsl")?,
        TempDataset::ndjson(&adsl, "adsl")?,
    ])
}

fn all_fixture_rows() -> Vec<Row> {
    adsl_fixture().row_values().iter().cloned().map(Row::Array).collect()
}

#[test]
fn yields_every_row_in_order() -> Result<()> {
    for buffer in [1u64, 7, 254, 1000] {
        for file in both_formats()? {
            let mut reader = DatasetReader::open(file.path())?;
            let rows = reader
                .read_records(RecordsOptions::new().buffer_length(buffer))
                .collect::<Result<Vec<_>>>()?;
            assert_rows_equal(&rows, &all_fixture_rows());
            assert!(reader.all_rows_read());
        }
    }
    Ok(())
}

#[test]
fn matches_concatenated_windows() -> Result<()> {
    for file in both_formats()? {
        let mut reader = DatasetReader::open(file.path())?;
        let mut windows = Vec::new();
        for start in (0..254).step_by(50) {
            windows.extend(reader.get_data(&DataRequest::new().start(start).length(50))?);
        }
        let scanned = reader
            .read_records(RecordsOptions::default())
            .collect::<Result<Vec<_>>>()?;
        assert_rows_equal(&scanned, &windows);
    }
    Ok(())
}

#[test]
fn starts_after_the_given_position() -> Result<()> {
    for file in both_formats()? {
        let mut reader = DatasetReader::open(file.path())?;
        let rows = reader
            .read_records(RecordsOptions::new().start(250).buffer_length(3))
            .collect::<Result<Vec<_>>>()?;
        assert_rows_equal(&rows, &all_fixture_rows()[250..]);
    }
    Ok(())
}

#[test]
fn unbounded_buffer_after_a_start() -> Result<()> {
    for file in both_formats()? {
        let mut reader = DatasetReader::open(file.path())?;
        let rows = reader
            .read_records(RecordsOptions::new().start(100).buffer_length(u64::MAX))
            .collect::<Result<Vec<_>>>()?;
        assert_rows_equal(&rows, &all_fixture_rows()[100..]);
    }
    Ok(())
}

#[test]
fn reads_lazily_one_buffer_at_a_time() -> Result<()> {
    for file in both_formats()? {
        let mut reader = DatasetReader::open(file.path())?;
        let first = reader
            .read_records(RecordsOptions::new().buffer_length(10))
            .take(3)
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(first.len(), 3);
        assert_eq!(reader.position(), 10);
        assert!(!reader.all_rows_read());
    }
    Ok(())
}

#[test]
fn filtered_scan_in_object_shape() -> Result<()> {
    let adsl = adsl_fixture();
    let expected = expected_count(&adsl, |r| r["RACE"] == json!("ASIAN"));
    assert!(expected > 0);

    for file in both_formats()? {
        let mut reader = DatasetReader::open(file.path())?;
        let rows = reader
            .read_records(
                RecordsOptions::new()
                    .buffer_length(4)
                    .shape(Shape::Object)
                    .columns(["USUBJID", "RACE"])
                    .filter(Filter::new(FilterCondition::new("RACE", "eq", "ASIAN"))),
            )
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(rows.len(), expected);
        assert!(column_values(&rows, "RACE").iter().all(|v| v == &json!("ASIAN")));
        assert!(rows.iter().all(|r| r.len() == 2));
    }
    Ok(())
}

#[test]
fn errors_end_the_iteration() -> Result<()> {
    let file = TempDataset::json(&adsl_fixture(), "adsl")?;
    let mut reader = DatasetReader::open(file.path())?;
    let mut records = reader.read_records(RecordsOptions::new().buffer_length(0));
    let err = records.next().expect("an error item").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DatasetError>(),
        Some(DatasetError::InvalidWindow { .. })
    ));
    assert!(records.next().is_none());
    Ok(())
}
