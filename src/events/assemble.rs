//! Turns clustered spans into immutable events: overlap resolution,
//! exclusion of externally resolved intervals, provenance and timing.

use crate::config::SearchConfig;
use crate::data::RawSamples;
use crate::events::cluster::EventSpan;
use crate::events::event::{unix_now, Event, EventKind};
use crate::noise::GaussianNoise;
use crate::prelude::{SearchError, SearchResult};

/// Trims adjacent spans that overlap by more than `event_max_overlap`
/// pulses, symmetrically around the overlap midpoint, so the final event
/// list never double-reports the same pulses. Spans must be ordered by
/// start pulse.
pub fn resolve_overlaps(spans: &mut [EventSpan], max_overlap: usize) -> SearchResult<()> {
    for i in 1..spans.len() {
        let left_end = spans[i - 1].end;
        let right_start = spans[i].start;
        if right_start > left_end {
            continue;
        }
        let overlap = left_end - right_start + 1;
        if overlap <= max_overlap {
            continue;
        }
        let trim = (overlap - max_overlap).div_ceil(2);
        let new_left_end = left_end.saturating_sub(trim);
        let new_right_start = right_start + trim;
        if new_left_end < spans[i - 1].start || new_right_start > spans[i].end {
            return Err(SearchError::InvalidInput(format!(
                "overlap trim inverted a span: [{}, {left_end}] vs [{right_start}, {}]",
                spans[i - 1].start,
                spans[i].end
            )));
        }
        spans[i - 1].end = new_left_end;
        spans[i].start = new_right_start;
        spans[i - 1].members.retain(|&m| m <= new_left_end);
        spans[i].members.retain(|&m| m >= new_right_start);
    }
    Ok(())
}

/// Drops spans already covered by externally resolved `(start, end)`
/// intervals, typically events reported from an overlapping previous file.
/// A span is removed when it sits fully inside an interval or shares more
/// than `allow_overlap` pulses with one.
pub fn drop_ignored(
    spans: Vec<EventSpan>,
    ignore: &[(usize, usize)],
    allow_overlap: usize,
) -> Vec<EventSpan> {
    spans
        .into_iter()
        .filter(|span| {
            !ignore.iter().any(|&(from, to)| {
                if span.start >= from && span.end <= to {
                    return true;
                }
                let shared_start = span.start.max(from);
                let shared_end = span.end.min(to);
                shared_end >= shared_start && shared_end - shared_start + 1 > allow_overlap
            })
        })
        .collect()
}

/// Materializes each span into an [`Event`] with provenance and timing taken
/// from the raw-data block.
pub fn assemble(
    spans: Vec<EventSpan>,
    kind: EventKind,
    raw: &RawSamples,
    config: &SearchConfig,
    noise: Option<&GaussianNoise>,
) -> SearchResult<Vec<Event>> {
    let detected_at = unix_now();
    spans
        .into_iter()
        .map(|span| {
            if span.start > span.end {
                return Err(SearchError::InvalidInput(format!(
                    "inverted event span [{}, {}]",
                    span.start, span.end
                )));
            }
            let meta = raw.meta();
            Ok(Event {
                kind,
                start_pulse: span.start,
                end_pulse: span.end,
                found_indices: span.members,
                files: meta.path.iter().cloned().collect(),
                start_time: meta
                    .start_time
                    .map(|t| t + span.start as f64 * meta.ipp),
                detected_at,
                config: config.clone(),
                noise: noise.cloned(),
            })
        })
        .collect()
}
