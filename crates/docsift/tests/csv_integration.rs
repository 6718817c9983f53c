//! CSV extraction through the public dispatcher.

mod helpers;

use docsift::ExtractionOptions;
use docsift::extractors::csv::TRUNCATION_MARKER;
use helpers::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_large_csv_is_truncated() {
    let dir = TempDir::new().unwrap();
    let mut text = String::from("id,value\n");
    for i in 0..3000 {
        text.push_str(&format!("{},{}\n", i, i * 3));
    }
    let path = write_file(dir.path(), "big.csv", text.as_bytes());

    let result = dispatcher().extract(&path, &ExtractionOptions::default()).await;
    assert!(result.success, "{:?}", result.error);
    let content = result.content.unwrap();

    assert!(content.starts_with("--- CSV File Analysis: big.csv ---"));
    assert!(content.ends_with(TRUNCATION_MARKER));
    let data_rows = content
        .lines()
        .skip_while(|l| *l != "id\tvalue")
        .skip(1)
        .take_while(|l| *l != TRUNCATION_MARKER)
        .count();
    assert_eq!(data_rows, 2000);
}

#[tokio::test]
async fn test_row_cap_comes_from_options() {
    let dir = TempDir::new().unwrap();
    let mut text = String::from("a,b\n");
    for i in 0..50 {
        text.push_str(&format!("{},{}\n", i, i));
    }
    let path = write_file(dir.path(), "cap.csv", text.as_bytes());

    let mut options = ExtractionOptions::default();
    options.csv.max_rows = 10;
    let content = dispatcher().extract(&path, &options).await.content.unwrap();
    assert!(content.contains("\n9\t9\n"));
    assert!(!content.contains("\n10\t10\n"));
    assert!(content.ends_with(TRUNCATION_MARKER));
}

#[tokio::test]
async fn test_tab_separated_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "people.tsv", b"name\tcity\nada\tLondon\nalan\tWilmslow\n");

    let content = dispatcher()
        .extract(&path, &ExtractionOptions::default())
        .await
        .content
        .unwrap();
    assert!(content.contains("Detected delimiter: '\t'"));
    assert!(content.contains("Headers: name, city"));
    assert!(content.ends_with("ada\tLondon\nalan\tWilmslow"));
}

#[tokio::test]
async fn test_latin1_csv_is_decoded() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "legacy.csv", b"name,town\nRen\xE9,K\xF6ln\n");

    let content = dispatcher()
        .extract(&path, &ExtractionOptions::default())
        .await
        .content
        .unwrap();
    assert!(content.contains("Ren\u{e9}\tK\u{f6}ln"));
}

#[tokio::test]
async fn test_undecodable_bytes_fall_back_to_lossy() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "data.csv", b"name,val\nab\x81c,1\nd\x9de,2\n");

    let result = dispatcher().extract(&path, &ExtractionOptions::default()).await;
    assert!(result.success, "{:?}", result.error);
    let content = result.content.unwrap();
    assert!(content.contains("ab\u{FFFD}c\t1"));
    assert!(content.contains("d\u{FFFD}e\t2"));
}

#[tokio::test]
async fn test_metadata_only_keeps_analysis_section() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "data.csv", b"name,val\nsecretrow,1\n");
    let options = ExtractionOptions {
        metadata_only: true,
        ..Default::default()
    };

    let result = dispatcher().extract(&path, &options).await;
    assert!(result.success, "{:?}", result.error);
    let content = result.content.unwrap();
    assert!(content.starts_with("--- CSV File Analysis: data.csv ---"));
    assert!(content.ends_with("----------------------------------------"));
    assert!(!content.contains("secretrow"));
}
