use anyhow::Result;
use dsjson::testing::{DatasetFixture, TempDataset, adsl_fixture};
use dsjson::{
    DataRequest, DataType, DatasetError, DatasetReader, DocumentFormat, ReaderOptions,
    TextEncoding,
};
use serde_json::{Value, json};
use std::time::{Duration, SystemTime};

fn dataset_error(err: &anyhow::Error) -> Option<&DatasetError> {
    err.downcast_ref::<DatasetError>()
}

#[test]
fn header_metadata_from_array_document() -> Result<()> {
    let file = TempDataset::json(&adsl_fixture(), "adsl")?;
    let mut reader = DatasetReader::open(file.path())?;
    assert_eq!(reader.format(), DocumentFormat::Json);

    let meta = reader.metadata()?;
    assert_eq!(meta.name, "ADSL");
    assert_eq!(meta.records, 254);
    assert_eq!(meta.version, "1.1.0");
    assert_eq!(meta.columns.len(), 10);
    assert_eq!(meta.columns[2].data_type, DataType::Integer);
    assert_eq!(meta.study_oid.as_deref(), Some("CDISCPILOT01"));
    assert_eq!(meta.item_group_oid.as_deref(), Some("IG.ADSL"));
    Ok(())
}

#[test]
fn header_and_footer_attributes_merge() -> Result<()> {
    let plain = TempDataset::json(&adsl_fixture(), "plain")?;
    let split = TempDataset::json(
        &adsl_fixture().in_footer(["records", "columns", "label"]),
        "split",
    )?;
    let footer_only = TempDataset::json(
        &adsl_fixture().in_footer([
            "datasetJSONCreationDateTime",
            "datasetJSONVersion",
            "records",
            "name",
            "label",
            "columns",
        ]),
        "footer",
    )?;

    let expected = DatasetReader::open(plain.path())?.metadata()?.clone();
    assert_eq!(DatasetReader::open(split.path())?.metadata()?, &expected);
    assert_eq!(DatasetReader::open(footer_only.path())?.metadata()?, &expected);
    Ok(())
}

#[test]
fn documents_without_a_row_array() -> Result<()> {
    let mut meta = DatasetFixture::new("DM", "Demographics")
        .column("AGE", "integer")
        .metadata_object();
    let metadata_only = Value::Object(meta.clone()).to_string();
    meta.insert("rows".into(), Value::Null);
    let null_rows = Value::Object(meta).to_string();

    for (name, doc) in [("only", metadata_only), ("null", null_rows)] {
        let file = TempDataset::raw(&format!("{name}.json"), doc)?;
        let mut reader = DatasetReader::open(file.path())?;
        assert_eq!(reader.metadata()?.records, 0);
        assert!(reader.get_data(&DataRequest::new())?.is_empty());
        assert!(reader.all_rows_read());
    }
    Ok(())
}

#[test]
fn missing_attributes_are_all_named() -> Result<()> {
    let fixture = adsl_fixture().without("records").without("label");
    for file in [
        TempDataset::json(&fixture, "adsl")?,
        TempDataset::json(&fixture.clone().in_footer(["columns"]), "adsl")?,
        TempDataset::ndjson(&fixture, "adsl")?,
    ] {
        let err = DatasetReader::open(file.path())?.metadata().unwrap_err();
        assert_eq!(
            dataset_error(&err),
            Some(&DatasetError::MissingMetadata(vec![
                "records".into(),
                "label".into()
            ]))
        );
    }
    Ok(())
}

#[test]
fn ndjson_metadata_comes_from_first_line() -> Result<()> {
    let file = TempDataset::ndjson(&adsl_fixture(), "adsl")?;
    let mut reader = DatasetReader::open(file.path())?;
    assert_eq!(reader.format(), DocumentFormat::Ndjson);
    let meta = reader.metadata()?;
    assert_eq!(meta.records, 254);
    assert_eq!(
        meta.column_names().collect::<Vec<_>>(),
        vec![
            "STUDYID", "USUBJID", "AGE", "SEX", "RACE", "TRT01P", "DCDECOD", "TRTSDT",
            "HEIGHTBL", "SAFFL"
        ]
    );
    Ok(())
}

#[test]
fn explicit_format_overrides_extension() -> Result<()> {
    let text = adsl_fixture().to_ndjson_string();
    let file = TempDataset::raw("adsl.txt", text)?;
    let mut reader =
        DatasetReader::open_with(file.path(), ReaderOptions::new().with_format(DocumentFormat::Ndjson))?;
    assert_eq!(reader.metadata()?.name, "ADSL");
    Ok(())
}

#[test]
fn metadata_reloads_when_the_file_changes() -> Result<()> {
    let small = DatasetFixture::new("DM", "Demographics")
        .column("AGE", "integer")
        .rows((0..3).map(|i| vec![json!(i)]));
    let file = TempDataset::json(&small, "dm")?;
    let mut reader = DatasetReader::open(file.path())?;
    assert_eq!(reader.metadata()?.records, 3);
    assert_eq!(reader.get_data(&dsjson::DataRequest::new().length(2))?.len(), 2);
    assert_eq!(reader.position(), 2);

    let bigger = small.clone().rows((3..10).map(|i| vec![json!(i)]));
    std::fs::write(file.path(), bigger.to_json_string())?;
    std::fs::File::options()
        .write(true)
        .open(file.path())?
        .set_modified(SystemTime::now() + Duration::from_secs(60))?;

    assert_eq!(reader.metadata()?.records, 10);
    assert_eq!(reader.position(), 0);
    Ok(())
}

#[test]
fn construction_errors() -> Result<()> {
    let err = DatasetReader::open("/no/such/dir/adsl.json").unwrap_err();
    assert!(matches!(dataset_error(&err), Some(DatasetError::FileNotFound(_))));

    let err = "utf16".parse::<TextEncoding>().unwrap_err();
    assert_eq!(err, DatasetError::UnsupportedEncoding("utf16".into()));
    assert_eq!("binary".parse::<TextEncoding>()?, TextEncoding::Latin1);
    Ok(())
}
