use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use flate2::read::GzDecoder;
use mltrace_convert::encode::{compress, document_bytes};
use mltrace_convert::pipeline::{ConvertOutcome, ConvertRequest, convert, output_path};
use mltrace_convert::reconstruct::ReconstructPolicy;
use mltrace_core::MltraceError;
use mltrace_core::model::trace::{TraceDocument, TraceEvent};
use mltrace_core::schema::Schema;
use mltrace_core::warn::ConvertWarning;

fn write_input(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    path
}

fn request(input: PathBuf, job_filter: Option<&str>) -> ConvertRequest {
    ConvertRequest {
        input,
        job_filter: job_filter.map(str::to_string),
        policy: ReconstructPolicy::PointToInterval,
        schema: Schema::default(),
        generated_at: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
    }
}

fn convert_csv(content: &str, job_filter: Option<&str>) -> Result<ConvertOutcome, MltraceError> {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "logs.csv", content);
    convert(&request(input, job_filter))
}

/// Span (non-metadata) events grouped per (pid, tid) track, in emission order.
fn tracks(doc: &TraceDocument) -> BTreeMap<(u64, u64), Vec<&TraceEvent>> {
    let mut out: BTreeMap<(u64, u64), Vec<&TraceEvent>> = BTreeMap::new();
    for e in doc.trace_events.iter().filter(|e| e.ph != "M") {
        out.entry((e.pid, e.tid)).or_default().push(e);
    }
    out
}

fn thread_label(doc: &TraceDocument, pid: u64, tid: u64) -> Option<String> {
    doc.trace_events
        .iter()
        .find(|e| e.ph == "M" && e.name == "thread_name" && e.pid == pid && e.tid == tid)
        .and_then(|e| e.args.as_ref())
        .and_then(|a| a["name"].as_str().map(str::to_string))
}

#[test]
fn single_worker_yields_one_span() {
    let outcome = convert_csv(
        "timestamp,job,worker,event\n0,j1,w1,begin\n5,j1,w1,end\n",
        None,
    )
    .unwrap();

    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.tracks, 1);
    assert_eq!(outcome.spans, 1);

    let tracks = tracks(&outcome.document);
    // pid 1 is the root, pid 2 the job: summary lane plus one worker lane.
    let worker = &tracks[&(2, 1)];
    assert_eq!(thread_label(&outcome.document, 2, 1).as_deref(), Some("w1"));
    assert_eq!(
        worker
            .iter()
            .map(|e| (e.ph.as_str(), e.ts))
            .collect::<Vec<_>>(),
        vec![("B", 0), ("E", 5)]
    );
}

#[test]
fn interleaved_workers_get_independent_tracks() {
    let outcome = convert_csv(
        "timestamp,job,worker,event\n\
         0,j1,w1,begin\n\
         2,j1,w2,begin\n\
         5,j1,w1,end\n\
         8,j1,w2,end\n",
        None,
    )
    .unwrap();

    assert_eq!(outcome.tracks, 2);
    let tracks = tracks(&outcome.document);

    let summary = &tracks[&(2, 0)];
    assert_eq!(
        summary
            .iter()
            .map(|e| (e.ph.as_str(), e.ts))
            .collect::<Vec<_>>(),
        vec![("B", 0), ("E", 8)],
        "job aggregate must cover [min(start), max(end)] of both workers"
    );

    assert_eq!(thread_label(&outcome.document, 2, 1).as_deref(), Some("w1"));
    assert_eq!(thread_label(&outcome.document, 2, 2).as_deref(), Some("w2"));
    assert_eq!(
        tracks[&(2, 1)]
            .iter()
            .map(|e| (e.ph.as_str(), e.ts))
            .collect::<Vec<_>>(),
        vec![("B", 0), ("E", 5)]
    );
    assert_eq!(
        tracks[&(2, 2)]
            .iter()
            .map(|e| (e.ph.as_str(), e.ts))
            .collect::<Vec<_>>(),
        vec![("B", 2), ("E", 8)]
    );
}

#[test]
fn bad_timestamp_is_skipped_with_warning() {
    let outcome = convert_csv(
        "timestamp,job,worker,event\n\
         0,j1,w1,begin\n\
         garbage,j1,w1,heartbeat\n\
         5,j1,w1,end\n",
        None,
    )
    .unwrap();

    assert_eq!(outcome.spans, 1);
    assert!(matches!(
        outcome.warnings.as_slice(),
        [ConvertWarning::MalformedTimestamp { row: 1, .. }]
    ));

    let tracks = tracks(&outcome.document);
    assert_eq!(
        tracks[&(2, 1)]
            .iter()
            .map(|e| (e.ph.as_str(), e.ts))
            .collect::<Vec<_>>(),
        vec![("B", 0), ("E", 5)]
    );
}

#[test]
fn dropped_leaf_does_not_count_as_a_track() {
    let outcome = convert_csv(
        "timestamp,job,worker,event\n\
         0,j1,w1,begin\n\
         junk,j1,w2,begin\n\
         5,j1,w1,end\n",
        None,
    )
    .unwrap();

    assert!(outcome.warnings.iter().any(
        |w| matches!(w, ConvertWarning::DroppedGroup { group, .. } if group == "w2")
    ));
    assert_eq!(outcome.tracks, 1);

    let worker_lanes = outcome
        .document
        .trace_events
        .iter()
        .filter(|e| e.ph == "M" && e.name == "thread_name" && e.tid > 0)
        .count();
    assert_eq!(
        worker_lanes, outcome.tracks,
        "reported track count must match the document's worker lanes"
    );
    assert_eq!(thread_label(&outcome.document, 2, 1).as_deref(), Some("w1"));
}

#[test]
fn single_record_yields_one_instant_span() {
    let outcome = convert_csv("timestamp,job,worker,event\n7,j1,w1,step\n", None).unwrap();

    assert_eq!(outcome.tracks, 1);
    assert_eq!(outcome.spans, 1);
    let tracks = tracks(&outcome.document);
    assert_eq!(
        tracks[&(2, 1)]
            .iter()
            .map(|e| (e.ph.as_str(), e.ts))
            .collect::<Vec<_>>(),
        vec![("B", 7), ("E", 7)]
    );
}

#[test]
fn job_filter_narrows_or_fails() {
    let content = "timestamp,job,worker,event\n0,j1,w1,step\n1,j2,w1,step\n";

    let all = convert_csv(content, None).unwrap();
    assert_eq!(all.records_grouped, 2);

    let narrowed = convert_csv(content, Some("j1")).unwrap();
    assert_eq!(narrowed.records_grouped, 1);
    assert_eq!(narrowed.document.other_data.job_filter.as_deref(), Some("j1"));

    match convert_csv(content, Some("j9")) {
        Err(MltraceError::NoMatchingRecords(f)) => assert_eq!(f, "j9"),
        other => panic!("expected NoMatchingRecords, got {other:?}"),
    }
}

#[test]
fn empty_input_aborts() {
    assert!(matches!(
        convert_csv("timestamp,job,worker,event\n", None),
        Err(MltraceError::EmptyInput)
    ));
}

#[test]
fn conversion_is_byte_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        &dir,
        "logs.csv",
        "timestamp,job,worker,event\n0,j2,w2,begin\n1,j1,w1,begin\n4,j1,w1,end\n6,j2,w2,end\n",
    );

    let a = convert(&request(input.clone(), None)).unwrap();
    let b = convert(&request(input, None)).unwrap();
    assert_eq!(
        document_bytes(&a.document).unwrap(),
        document_bytes(&b.document).unwrap()
    );
    assert_eq!(compress(&a.document).unwrap(), compress(&b.document).unwrap());
}

#[test]
fn json_and_csv_inputs_produce_the_same_events() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_input(
        &dir,
        "logs.csv",
        "timestamp,job,worker,event\n0,j1,w1,begin\n5,j1,w1,end\n",
    );
    let jsonl = write_input(
        &dir,
        "logs.jsonl",
        "{\"timestamp\":0,\"job\":\"j1\",\"worker\":\"w1\",\"event\":\"begin\"}\n\
         {\"timestamp\":5,\"job\":\"j1\",\"worker\":\"w1\",\"event\":\"end\"}\n",
    );

    let from_csv = convert(&request(csv, None)).unwrap();
    let from_jsonl = convert(&request(jsonl, None)).unwrap();
    assert_eq!(
        from_csv.document.trace_events,
        from_jsonl.document.trace_events
    );
}

#[test]
fn every_track_is_well_formed_and_contained() {
    let outcome = convert_csv(
        "timestamp,job,worker,event\n\
         0,j1,w1,begin\n\
         1,j1,w1,begin\n\
         2,j1,w1,end\n\
         3,j1,w2,step\n\
         5,j1,w1,end\n\
         6,j2,w1,begin\n\
         9,j2,w1,end\n",
        None,
    )
    .unwrap();

    let tracks = tracks(&outcome.document);
    for ((pid, _), events) in &tracks {
        let mut depth = 0i64;
        let mut last_ts = i64::MIN;
        for e in events {
            assert!(e.ts >= last_ts, "events must be time-ordered per track");
            last_ts = e.ts;
            match e.ph.as_str() {
                "B" => depth += 1,
                "E" => depth -= 1,
                other => panic!("unexpected phase {other}"),
            }
            assert!(depth >= 0, "an end may never precede its begin");
        }
        assert_eq!(depth, 0, "every begin on pid {pid} must be closed");
    }

    // Each process summary lane must contain all of its worker lanes.
    for ((pid, tid), events) in &tracks {
        if *tid == 0 {
            continue;
        }
        let Some(summary) = tracks.get(&(*pid, 0)) else {
            continue;
        };
        let (sum_start, sum_end) = (summary.first().unwrap().ts, summary.last().unwrap().ts);
        for e in events {
            assert!(sum_start <= e.ts && e.ts <= sum_end);
        }
    }
}

#[test]
fn artifact_decompresses_back_to_the_document() {
    let outcome = convert_csv(
        "timestamp,job,worker,event\n0,j1,w1,begin\n5,j1,w1,end\n",
        None,
    )
    .unwrap();

    let gz = compress(&outcome.document).unwrap();
    let mut decoder = GzDecoder::new(gz.as_slice());
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes).unwrap();

    let parsed: TraceDocument = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed, outcome.document);
    assert!(parsed.other_data.source.ends_with("logs.csv"));
}

#[test]
fn output_path_appends_trace_suffix() {
    assert_eq!(
        output_path(std::path::Path::new("/tmp/run.csv")),
        PathBuf::from("/tmp/run.trace.json.gz")
    );
}
