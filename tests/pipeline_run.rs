use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tabpipe::batch::{load_config, run_all, run_one};
use tabpipe::error::PipelineError;
use tabpipe::io::LoadOptions;
use tabpipe::io::read_table;
use tabpipe::pipeline::{run_dataset, DatasetConfig, RunnerOptions};
use tabpipe::types::Value;

fn tmp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("tabpipe-{tag}-{nanos}"));
    fs::create_dir_all(&dir).unwrap();
    dir
}

const PROPERTIES_CSV: &str = "\
region,city,price
east,Boston,100
west,Denver,200
east,Boston,150
south,Miami,120
";

#[test]
fn single_dataset_end_to_end() {
    let dir = tmp_dir("single");
    let input = dir.join("properties.csv");
    fs::write(&input, PROPERTIES_CSV).unwrap();

    let out_dir = dir.join("out");
    let config: DatasetConfig = serde_json::from_value(serde_json::json!({
        "input_file": input.to_str().unwrap(),
        "output_file": "properties.parquet",
        "output_dir": out_dir.to_str().unwrap(),
        "compression": "snappy",
        "filter_column": "region",
        "filter_values": ["south"],
        "primary_column": "region",
        "sub_columns": ["city"],
        "sort_order": ["West", "East"],
        "show_stats": true
    }))
    .unwrap();

    let mut store = run_dataset(&config, &RunnerOptions::default()).unwrap();

    // south filtered out, remaining rows sorted West-then-East (title-cased).
    assert_eq!(store.table().row_count(), 3);
    let region_idx = store.table().schema.index_of("region").unwrap();
    let regions: Vec<Value> = store
        .table()
        .rows
        .iter()
        .map(|r| r[region_idx].clone())
        .collect();
    assert_eq!(
        regions,
        vec![
            Value::Utf8("West".to_string()),
            Value::Utf8("East".to_string()),
            Value::Utf8("East".to_string()),
        ]
    );

    // Indices were built and are queryable on the returned session.
    let clusters = store.cluster_index("region").unwrap();
    assert_eq!(clusters.len(), 2);
    let east = store
        .get_sub_cluster(
            "region",
            "city",
            &Value::Utf8("East".to_string()),
            &Value::Utf8("Boston".to_string()),
        )
        .unwrap();
    assert_eq!(east.unwrap().row_count(), 2);

    // Output landed in the joined directory and reloads with the same shape.
    let output = out_dir.join("properties.parquet");
    assert!(output.exists());
    let back = read_table(&output, &LoadOptions::default()).unwrap();
    assert_eq!(back.row_count(), 3);
    assert_eq!(back.column_count(), 3);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn batch_isolates_a_failing_dataset() {
    let dir = tmp_dir("batch");
    let input = dir.join("people.csv");
    fs::write(&input, "id,name\n1,Ada\n2,Grace\n").unwrap();

    let config_path = dir.join("datasets_config.json");
    let config = serde_json::json!({
        "a_first": {
            "input_file": input.to_str().unwrap(),
            "output_file": dir.join("a.csv").to_str().unwrap(),
            "show_stats": false
        },
        "b_missing": {
            "input_file": dir.join("nope.csv").to_str().unwrap(),
            "output_file": dir.join("b.csv").to_str().unwrap(),
            "show_stats": false
        },
        "c_last": {
            "input_file": input.to_str().unwrap(),
            "output_file": dir.join("c.json").to_str().unwrap(),
            "show_stats": false
        }
    });
    fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let results = run_all(&config_path, &RunnerOptions::default());

    assert_eq!(results.len(), 3);
    assert!(results["a_first"].is_ok());
    assert!(matches!(
        results["b_missing"],
        Err(PipelineError::FileNotFound { .. })
    ));
    assert!(results["c_last"].is_ok());

    // The failure did not stop later datasets from writing output.
    assert!(dir.join("a.csv").exists());
    assert!(dir.join("c.json").exists());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn bad_output_format_fails_only_its_own_dataset() {
    let dir = tmp_dir("badfmt");
    let input = dir.join("people.csv");
    fs::write(&input, "id\n1\n").unwrap();

    let config_path = dir.join("datasets_config.json");
    let config = serde_json::json!({
        "a_good": {
            "input_file": input.to_str().unwrap(),
            "output_file": dir.join("a.csv").to_str().unwrap(),
            "show_stats": false
        },
        "b_bad": {
            "input_file": input.to_str().unwrap(),
            "output_file": dir.join("b.csv").to_str().unwrap(),
            "output_format": "yaml",
            "show_stats": false
        }
    });
    fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let results = run_all(&config_path, &RunnerOptions::default());
    assert!(results["a_good"].is_ok());
    assert!(matches!(
        results["b_bad"],
        Err(PipelineError::UnsupportedFormat { .. })
    ));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn run_one_surfaces_dataset_not_found_with_known_names() {
    let dir = tmp_dir("notfound");
    let config_path = dir.join("datasets_config.json");
    fs::write(
        &config_path,
        r#"{"known_one": {"input_file": "x.csv", "output_file": "y.csv"}}"#,
    )
    .unwrap();

    let err = run_one("mystery", &config_path, &RunnerOptions::default()).unwrap_err();
    match err {
        PipelineError::DatasetNotFound { name, known } => {
            assert_eq!(name, "mystery");
            assert_eq!(known, vec!["known_one".to_string()]);
        }
        other => panic!("expected DatasetNotFound, got {other:?}"),
    }

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_config_yields_empty_batch_and_config_error() {
    let dir = tmp_dir("noconfig");
    let config_path = dir.join("does_not_exist.json");

    let results = run_all(&config_path, &RunnerOptions::default());
    assert!(results.is_empty());

    let err = load_config(&config_path).unwrap_err();
    assert!(matches!(err, PipelineError::Config { .. }));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn malformed_config_yields_empty_batch() {
    let dir = tmp_dir("badconfig");
    let config_path = dir.join("datasets_config.json");
    fs::write(&config_path, "{not json").unwrap();

    let results = run_all(&config_path, &RunnerOptions::default());
    assert!(results.is_empty());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn explicit_output_format_bypasses_extension_resolution() {
    let dir = tmp_dir("explicit");
    let input = dir.join("people.csv");
    fs::write(&input, "id,name\n1,Ada\n").unwrap();

    let config: DatasetConfig = serde_json::from_value(serde_json::json!({
        "input_file": input.to_str().unwrap(),
        "output_file": dir.join("export.dat").to_str().unwrap(),
        "output_format": "json",
        "show_stats": false
    }))
    .unwrap();

    run_dataset(&config, &RunnerOptions::default()).unwrap();

    let text = fs::read_to_string(dir.join("export.dat")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(parsed.is_array());

    fs::remove_dir_all(&dir).ok();
}
