use mltrace_core::error::{MltraceError, Result};
use mltrace_core::model::group::{Group, GroupKind};
use mltrace_core::model::record::LogRecord;
use mltrace_core::model::span::{Span, SpanNode};
use mltrace_core::time::parse_timestamp_us;
use mltrace_core::warn::ConvertWarning;
use tracing::debug;

const BEGIN_MARKERS: &[&str] = &["begin", "start", "b", "open"];
const END_MARKERS: &[&str] = &["end", "stop", "e", "close", "finish"];

/// How leaf records turn into spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconstructPolicy {
    /// Pair begin/end event markers into intervals; unpaired records become
    /// instant spans, unmatched begins are closed at the leaf's last
    /// timestamp and flagged truncated.
    #[default]
    PointToInterval,
    /// Every record becomes a zero-duration span at its timestamp.
    SinglePoint,
}

/// Rebuilds the span tree from the grouped records.
///
/// Leaves with no parsable timestamps are dropped with a warning; the run
/// only fails if that leaves nothing at all. Branch bounds are min/max
/// aggregates over surviving children, so parent/child containment holds by
/// construction.
pub fn reconstruct(
    root: &Group,
    policy: ReconstructPolicy,
    warnings: &mut Vec<ConvertWarning>,
) -> Result<SpanNode> {
    let node = build_node(root, 0, policy, warnings).ok_or(MltraceError::AllGroupsDropped)?;
    debug!(spans = node.span_count(), "reconstructed span tree");
    Ok(node)
}

fn build_node(
    group: &Group,
    level: usize,
    policy: ReconstructPolicy,
    warnings: &mut Vec<ConvertWarning>,
) -> Option<SpanNode> {
    match &group.kind {
        GroupKind::Branch(children) => {
            let built: Vec<SpanNode> = children
                .iter()
                .filter_map(|c| build_node(c, level + 1, policy, warnings))
                .collect();
            if built.is_empty() {
                return None;
            }
            let start_us = built.iter().map(|c| c.start_us).min().unwrap_or(0);
            let end_us = built.iter().map(|c| c.end_us).max().unwrap_or(0);
            Some(SpanNode {
                name: group.name.clone(),
                level,
                start_us,
                end_us,
                spans: Vec::new(),
                children: built,
            })
        }
        GroupKind::Leaf(records) => build_leaf(group, records, level, policy, warnings),
    }
}

fn build_leaf(
    group: &Group,
    records: &[LogRecord],
    level: usize,
    policy: ReconstructPolicy,
    warnings: &mut Vec<ConvertWarning>,
) -> Option<SpanNode> {
    // Parse timestamps first; a bad value only costs that record.
    let mut timed: Vec<(i64, &LogRecord)> = Vec::with_capacity(records.len());
    for record in records {
        match parse_timestamp_us(&record.timestamp) {
            Ok(us) => timed.push((us, record)),
            Err(e) => warnings.push(ConvertWarning::MalformedTimestamp {
                row: record.row,
                group: group.name.clone(),
                raw: record.timestamp.clone(),
                reason: e.to_string(),
            }),
        }
    }
    if timed.is_empty() {
        warnings.push(ConvertWarning::DroppedGroup {
            group: group.name.clone(),
            reason: "no record had a parsable timestamp".to_string(),
        });
        return None;
    }

    // Stable sort: ties keep original record order.
    timed.sort_by_key(|(us, _)| *us);

    let spans = match policy {
        ReconstructPolicy::PointToInterval => pair_spans(group, &timed, warnings),
        ReconstructPolicy::SinglePoint => timed
            .iter()
            .map(|(us, record)| instant_span(group, record, *us))
            .collect(),
    };

    let start_us = spans.iter().map(|s| s.start_us).min().unwrap_or(0);
    let end_us = spans.iter().map(|s| s.end_us).max().unwrap_or(0);
    Some(SpanNode {
        name: group.name.clone(),
        level,
        start_us,
        end_us,
        spans,
        children: Vec::new(),
    })
}

fn pair_spans(
    group: &Group,
    timed: &[(i64, &LogRecord)],
    warnings: &mut Vec<ConvertWarning>,
) -> Vec<Span> {
    let last_us = timed.last().map(|(us, _)| *us).unwrap_or(0);
    let mut open: Vec<(String, i64)> = Vec::new();
    let mut spans = Vec::new();

    for (us, record) in timed {
        match classify(record.event.as_deref()) {
            EventKind::Begin => open.push((span_name(group, record), *us)),
            EventKind::End => match open.pop() {
                Some((name, start_us)) => spans.push(Span {
                    name,
                    start_us,
                    end_us: *us,
                    truncated: false,
                }),
                None => {
                    let name = span_name(group, record);
                    warnings.push(ConvertWarning::UnmatchedEnd {
                        group: group.name.clone(),
                        name: name.clone(),
                        at_us: *us,
                    });
                    spans.push(Span {
                        name,
                        start_us: *us,
                        end_us: *us,
                        truncated: true,
                    });
                }
            },
            EventKind::Point => spans.push(instant_span(group, record, *us)),
        }
    }

    // Close any still-open span at the last observed timestamp.
    while let Some((name, start_us)) = open.pop() {
        warnings.push(ConvertWarning::TruncatedSpan {
            group: group.name.clone(),
            name: name.clone(),
            start_us,
            closed_at_us: last_us,
        });
        spans.push(Span {
            name,
            start_us,
            end_us: last_us,
            truncated: true,
        });
    }

    spans
}

enum EventKind {
    Begin,
    End,
    Point,
}

fn classify(event: Option<&str>) -> EventKind {
    let Some(event) = event else {
        return EventKind::Point;
    };
    let lowered = event.trim().to_ascii_lowercase();
    if BEGIN_MARKERS.contains(&lowered.as_str()) {
        EventKind::Begin
    } else if END_MARKERS.contains(&lowered.as_str()) {
        EventKind::End
    } else {
        EventKind::Point
    }
}

fn span_name(group: &Group, record: &LogRecord) -> String {
    record
        .name
        .clone()
        .unwrap_or_else(|| group.name.clone())
}

fn instant_span(group: &Group, record: &LogRecord, us: i64) -> Span {
    Span {
        name: span_name(group, record),
        start_us: us,
        end_us: us,
        truncated: false,
    }
}
