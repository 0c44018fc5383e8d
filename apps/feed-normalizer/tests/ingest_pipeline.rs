//! Ingestion Pipeline Integration Tests
//!
//! Runs discovery, normalization and the partitioned sink against real
//! directories and reads the output back.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;

use feed_normalizer::{
    EventKind, FileLineSource, IngestError, IngestOptions, IngestService, LineSourcePort,
    PartitionLayout, PartitionedJsonSink, RecordSinkPort, SourceError, SourceFile, SourceFormat,
    discover_sources,
};

const CSV_DAY_ONE: &str = "\
2020-08-05,2020-08-05 09:30:00.000,T,SYMA,2020-08-05 09:31:00.000,1,NYSE,79.19,989
2020-08-05,2020-08-05 09:30:00.000,Q,SYMA,2020-08-05 09:32:00.000,2,NYSE,78.93,100,79.40,200

2020-08-05,2020-08-05 09:30:00.000,X,SYMA
";

const CSV_DAY_TWO: &str = "\
2020-08-06,2020-08-06 09:30:00.000,T,SYMB,2020-08-06 09:31:00.000,1,NASDAQ,not-a-price,10
";

const JSON_DAY_ONE: &str = r#"{"trade_dt":"2020-08-05","file_tm":"2020-08-05 09:30:00.000","event_type":"Q","symbol":"SYMC","exchange":"NYSE","event_tm":"2020-08-05 09:33:00.000","event_seq_nb":3,"bid_pr":10.5,"bid_size":100,"ask_pr":10.6,"ask_size":300}
{"trade_dt":"2020-08-05","event_type":"T","symbol":"SYMC","price":"10.55","size":50}
{"symbol":"SYMC"}
this is not json
"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let fixture = Self { dir };
        fixture.write("csv/2020-08-05/NYSE/part-0.txt", CSV_DAY_ONE);
        fixture.write("csv/2020-08-06/NASDAQ/part-0.txt", CSV_DAY_TWO);
        fixture.write("csv/.DS_Store", "T,T,T");
        fixture.write("json/2020-08-05/NYSE/part-0.txt", JSON_DAY_ONE);
        fixture
    }

    fn path(&self, relative: &str) -> std::path::PathBuf {
        self.dir.path().join(relative)
    }

    fn write(&self, relative: &str, contents: impl AsRef<[u8]>) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn sources(&self) -> Vec<SourceFile> {
        let mut sources =
            discover_sources(&self.path("csv"), SourceFormat::PositionalCsv).unwrap();
        sources.extend(discover_sources(&self.path("json"), SourceFormat::KeyValueJson).unwrap());
        sources
    }

    fn service(&self, options: IngestOptions) -> IngestService {
        let source: Arc<dyn LineSourcePort> = Arc::new(FileLineSource::new());
        let sink: Arc<dyn RecordSinkPort> = Arc::new(PartitionedJsonSink::new(
            self.path("out"),
            PartitionLayout::default(),
        ));
        IngestService::new(source, sink, options)
    }
}

fn read_partition(root: &Path, key: &str) -> Vec<Value> {
    let path = root
        .join(PartitionLayout::default().directory(key))
        .join("part-00000.jsonl");
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn full_run_partitions_every_line() {
    let fixture = Fixture::new();
    let sources = fixture.sources();
    assert_eq!(sources.len(), 3);

    let report = fixture
        .service(IngestOptions::default())
        .run(&sources)
        .unwrap();

    assert_eq!(report.files, 3);
    assert_eq!(report.lines, 9);
    assert_eq!(report.blank_lines, 1);
    assert_eq!(report.records_of(EventKind::Trade), 3);
    assert_eq!(report.records_of(EventKind::Quote), 2);
    assert_eq!(report.records_of(EventKind::Bad), 3);
    assert_eq!(report.fallbacks.get("unclassified"), Some(&1));
    assert_eq!(report.fallbacks.get("missing_discriminator"), Some(&1));
    assert_eq!(report.fallbacks.get("malformed_document"), Some(&1));
    assert_eq!(report.total_degraded_fields(), 1);

    let out = fixture.path("out");
    let trades = read_partition(&out, "T");
    let quotes = read_partition(&out, "Q");
    let bad = read_partition(&out, "B");

    assert_eq!(trades.len(), 3);
    assert_eq!(quotes.len(), 2);
    assert_eq!(bad.len(), 3);

    for record in trades.iter().chain(&quotes).chain(&bad) {
        assert_eq!(record.as_object().unwrap().len(), 14);
        assert_eq!(record["event_type"], record["partition"]);
    }
    assert!(bad.iter().all(|r| r["symbol"].is_null() && r["trade_dt"].is_null()));

    let symb = trades.iter().find(|r| r["symbol"] == "SYMB").unwrap();
    assert!(symb["price"].is_null());
    assert_eq!(symb["size"], 10);
    assert_eq!(symb["exchange"], "NASDAQ");

    let symc = quotes.iter().find(|r| r["symbol"] == "SYMC").unwrap();
    assert_eq!(symc["event_seq_nb"], 3);
    assert!(symc["price"].is_null());
    assert!(!symc["bid_pr"].is_null());
}

#[test]
fn bounded_pool_produces_same_counts() {
    let fixture = Fixture::new();
    let sources = fixture.sources();

    let parallel = fixture
        .service(IngestOptions::default())
        .run(&sources)
        .unwrap();
    let bounded = fixture
        .service(IngestOptions {
            max_threads: 1,
            min_parallel_files: usize::MAX,
        })
        .run(&sources)
        .unwrap();

    assert_eq!(parallel, bounded);
}

#[test]
fn rerun_replaces_previous_output() {
    let fixture = Fixture::new();
    fixture.write("out/partition=T/stale.jsonl", "{}\n");

    let sources = fixture.sources();
    fixture
        .service(IngestOptions::default())
        .run(&sources)
        .unwrap();

    assert!(!fixture.path("out/partition=T/stale.jsonl").exists());
    assert_eq!(read_partition(&fixture.path("out"), "T").len(), 3);
}

#[test]
fn empty_source_set_leaves_output_untouched() {
    let fixture = Fixture::new();
    fixture.write("out/partition=T/part-00000.jsonl", "{}\n");

    let report = fixture
        .service(IngestOptions::default())
        .run(&[])
        .unwrap();

    assert_eq!(report.total_records(), 0);
    assert!(fixture.path("out/partition=T/part-00000.jsonl").is_file());
}

#[test]
fn failed_run_keeps_previous_output() {
    let fixture = Fixture::new();
    let mut sources = fixture.sources();
    fixture
        .service(IngestOptions::default())
        .run(&sources)
        .unwrap();

    sources.push(SourceFile::new(
        fixture.path("csv/vanished.txt"),
        SourceFormat::PositionalCsv,
    ));
    let err = fixture
        .service(IngestOptions::default())
        .run(&sources)
        .unwrap_err();

    assert!(matches!(err, IngestError::Source(SourceError::NotFound(_))));
    assert_eq!(read_partition(&fixture.path("out"), "T").len(), 3);
    assert_eq!(read_partition(&fixture.path("out"), "B").len(), 3);
    assert!(!fixture.path("out.staging").exists());
}

#[test]
fn invalid_utf8_line_becomes_bad_record() {
    let fixture = Fixture::new();
    let mut contents = b"2020-08-07,2020-08-07 09:30:00.000,T,SYMD,2020-08-07 09:31:00.000,1,NYSE,1.5,10\n".to_vec();
    contents.extend_from_slice(b"\xff\xfe\xfd\n");
    fixture.write("latin1/part-0.txt", contents);

    let report = fixture
        .service(IngestOptions::default())
        .run(&[SourceFile::new(
            fixture.path("latin1/part-0.txt"),
            SourceFormat::PositionalCsv,
        )])
        .unwrap();

    assert_eq!(report.lines, 2);
    assert_eq!(report.records_of(EventKind::Trade), 1);
    assert_eq!(report.records_of(EventKind::Bad), 1);
    assert_eq!(read_partition(&fixture.path("out"), "T")[0]["symbol"], "SYMD");
    assert_eq!(read_partition(&fixture.path("out"), "B").len(), 1);
}

#[test]
fn json_numbers_are_written_exactly() {
    let fixture = Fixture::new();
    fixture.write(
        "exact/part-0.txt",
        concat!(
            r#"{"event_type":"T","symbol":"SYME","price":12345678901.123456789,"size":1}"#,
            "\n",
            r#"{"event_type":"T","symbol":"SYMF","price":1e400,"size":2}"#,
            "\n",
        ),
    );

    let report = fixture
        .service(IngestOptions::default())
        .run(&[SourceFile::new(
            fixture.path("exact/part-0.txt"),
            SourceFormat::KeyValueJson,
        )])
        .unwrap();

    assert_eq!(report.records_of(EventKind::Trade), 2);
    assert_eq!(report.degraded_fields.len(), 1);

    let trades = read_partition(&fixture.path("out"), "T");
    let syme = trades.iter().find(|r| r["symbol"] == "SYME").unwrap();
    assert_eq!(syme["price"], "12345678901.123456789");
    let symf = trades.iter().find(|r| r["symbol"] == "SYMF").unwrap();
    assert!(symf["price"].is_null());
    assert_eq!(symf["size"], 2);
}

#[test]
fn missing_source_root_is_reported() {
    let fixture = Fixture::new();
    let err = discover_sources(&fixture.path("parquet"), SourceFormat::PositionalCsv).unwrap_err();
    assert!(matches!(err, SourceError::MissingRoot(_)));
}
