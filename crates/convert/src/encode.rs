use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use mltrace_core::error::{MltraceError, Result};
use mltrace_core::model::span::{Span, SpanNode};
use mltrace_core::model::trace::{DocumentMetadata, TraceDocument, TraceEvent};
use tracing::debug;

/// Serializes the span tree into a Trace Event Format document.
///
/// Every branch node becomes a process: its aggregate span goes on `tid 0`
/// as a summary lane and each leaf child gets its own thread. Pids and tids
/// are assigned in depth-first tree order, so the same tree always encodes to
/// the same bytes.
pub fn encode(tree: &SpanNode, metadata: &DocumentMetadata) -> Result<TraceDocument> {
    // Re-check the reconstruction guarantee; a violation here is a bug in the
    // reconstructor, not bad input.
    if !tree.containment_holds() {
        return Err(MltraceError::Encoding(format!(
            "span tree under {:?} violates parent/child containment",
            tree.name
        )));
    }

    let mut events = Vec::new();
    let mut next_pid = 1;
    encode_branch(tree, tree.name.clone(), true, &mut next_pid, &mut events)?;
    debug!(events = events.len(), "encoded trace document");
    Ok(TraceDocument::new(events, metadata.clone()))
}

/// Pre-compression document bytes; byte-identical for identical input.
pub fn document_bytes(doc: &TraceDocument) -> Result<Vec<u8>> {
    serde_json::to_vec(doc).map_err(|e| MltraceError::Encoding(e.to_string()))
}

/// Gzips the encoded document. The gzip header carries no mtime, keeping the
/// artifact deterministic as well.
pub fn compress(doc: &TraceDocument) -> Result<Vec<u8>> {
    let bytes = document_bytes(doc)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&bytes)
        .map_err(|e| MltraceError::Io(e.to_string()))?;
    encoder.finish().map_err(|e| MltraceError::Io(e.to_string()))
}

fn encode_branch(
    node: &SpanNode,
    label: String,
    is_root: bool,
    next_pid: &mut u64,
    events: &mut Vec<TraceEvent>,
) -> Result<()> {
    let pid = *next_pid;
    *next_pid += 1;

    events.push(TraceEvent::metadata("process_name", &label, pid, 0));
    if !is_root {
        // Summary lane covering the whole branch.
        events.push(TraceEvent::metadata("thread_name", "summary", pid, 0));
        events.push(TraceEvent::begin(node.name.clone(), "summary", node.start_us, pid, 0));
        events.push(TraceEvent::end(node.name.clone(), "summary", node.end_us, pid, 0));
    }

    let mut next_tid = 1;
    for child in &node.children {
        if child.is_leaf() {
            let tid = next_tid;
            next_tid += 1;
            events.push(TraceEvent::metadata("thread_name", &child.name, pid, tid));
            encode_leaf(child, pid, tid, events)?;
        } else {
            let child_label = format!("{label}/{}", child.name);
            encode_branch(child, child_label, false, next_pid, events)?;
        }
    }
    Ok(())
}

/// Emits the leaf's spans as begin/end pairs in non-decreasing timestamp
/// order, closing finished spans before opening disjoint ones so nesting
/// stays well-formed at equal timestamps.
fn encode_leaf(leaf: &SpanNode, pid: u64, tid: u64, events: &mut Vec<TraceEvent>) -> Result<()> {
    let mut spans: Vec<&Span> = leaf.spans.iter().collect();
    spans.sort_by(|a, b| {
        a.start_us
            .cmp(&b.start_us)
            .then(b.end_us.cmp(&a.end_us))
    });

    let mut open: Vec<&Span> = Vec::new();
    for span in spans {
        while let Some(&top) = open.last() {
            let contains = top.start_us <= span.start_us && span.end_us <= top.end_us;
            if contains {
                break;
            }
            if top.end_us <= span.start_us {
                open.pop();
                events.push(TraceEvent::end(top.name.clone(), "span", top.end_us, pid, tid));
            } else {
                return Err(MltraceError::Encoding(format!(
                    "overlapping spans {:?} and {:?} on track {:?} cannot be nested",
                    top.name, span.name, leaf.name
                )));
            }
        }
        events.push(TraceEvent::begin(span.name.clone(), "span", span.start_us, pid, tid));
        open.push(span);
    }
    while let Some(done) = open.pop() {
        events.push(TraceEvent::end(done.name.clone(), "span", done.end_us, pid, tid));
    }
    Ok(())
}
