//! PDF extraction through the public dispatcher.
//!
//! The dispatcher is built without probing, so these run on the lopdf
//! strategies whether or not a pdfium library is installed.

#![cfg(feature = "pdf")]

mod helpers;

use docsift::ExtractionOptions;
use helpers::*;
use tempfile::TempDir;

const PRICE_LIST: &[(i64, i64, &str)] = &[
    (72, 760, "Price list for the spring season"),
    (72, 700, "Item"),
    (300, 700, "Price"),
    (72, 686, "Widget"),
    (300, 686, "4.50"),
    (72, 672, "Gadget"),
    (300, 672, "12.00"),
    (72, 600, "Prices include tax"),
];

#[tokio::test]
async fn test_text_table_reading_order() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "prices.pdf", &pdf(&[PRICE_LIST]));

    let result = dispatcher().extract(&path, &ExtractionOptions::default()).await;
    assert!(result.success, "{:?}", result.error);
    let content = result.content.unwrap();

    assert!(content.contains("--- Page 1 ---\nPage dimensions: 595.00 x 842.00 points\n[Contains 1 table]"));
    let intro = content.find("Price list for the spring season").unwrap();
    let table = content.find("--- Table ---").unwrap();
    let closing = content.find("Prices include tax").unwrap();
    assert!(intro < table && table < closing);
    assert!(content.contains("Widget"));
    assert!(content.contains("--- End Table ---"));
}

#[tokio::test]
async fn test_table_detection_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "prices.pdf", &pdf(&[PRICE_LIST]));

    let mut options = ExtractionOptions::default();
    options.pdf.extract_tables = false;
    let content = dispatcher().extract(&path, &options).await.content.unwrap();
    assert!(!content.contains("--- Table ---"));
    assert!(!content.contains("[Contains 1 table]"));
    assert!(content.contains("Widget"));
}

#[tokio::test]
async fn test_metadata_only_lists_page_count() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "three.pdf", &pdf(&[&[(72, 700, "a")], &[(72, 700, "b")], &[]]));

    let options = ExtractionOptions {
        metadata_only: true,
        ..Default::default()
    };
    let content = dispatcher().extract(&path, &options).await.content.unwrap();
    assert!(content.starts_with("--- Document Metadata ---\nPDF Document: three.pdf\nNumber of pages: 3\n"));
    assert!(!content.contains("--- Page 1 ---"));
}

#[tokio::test]
async fn test_pages_keep_document_order() {
    let dir = TempDir::new().unwrap();
    let pages: Vec<Vec<(i64, i64, String)>> = (1..=5).map(|n| vec![(72, 700, format!("Body of page {}", n))]).collect();
    let borrowed: Vec<Vec<(i64, i64, &str)>> = pages
        .iter()
        .map(|runs| runs.iter().map(|(x, y, t)| (*x, *y, t.as_str())).collect())
        .collect();
    let refs: Vec<&[(i64, i64, &str)]> = borrowed.iter().map(Vec::as_slice).collect();
    let path = write_file(dir.path(), "five.pdf", &pdf(&refs));

    let content = dispatcher()
        .extract(&path, &ExtractionOptions::default())
        .await
        .content
        .unwrap();
    let mut last = 0;
    for n in 1..=5 {
        let at = content.find(&format!("--- Page {} ---", n)).unwrap();
        assert!(at >= last);
        assert!(content[at..].contains(&format!("Body of page {}", n)));
        last = at;
    }
}

#[tokio::test]
async fn test_corrupt_pdf_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "broken.pdf", b"not a pdf at all");

    let result = dispatcher().extract(&path, &ExtractionOptions::default()).await;
    assert!(!result.success);
    assert!(result.content.is_none());
    assert!(result.error.unwrap().starts_with("all extraction strategies exhausted: pdf-minimal failed"));
}
