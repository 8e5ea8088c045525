//! Metric scrubbing for cached responses.
//!
//! Responses carry execution statistics (bytes inspected, jobs completed)
//! that describe the request that produced them. A cache hit replays the
//! body for a different request, so those statistics are reset before the
//! body is served again.
//!
//! The body is checked against the shape of its kind (top-level JSON
//! members, or a full protobuf decode), then only the top-level metrics
//! field is rewritten. Every other byte of a protobuf body and every other
//! member of a JSON document is kept as stored, including fields the
//! message types do not model.

use bytes::Bytes;
use prost::encoding::{decode_key, encode_key, encode_varint, skip_field, DecodeContext, WireType};
use prost::Message;
use serde_json::{Map, Value};

use crate::api::tempopb::{
    QueryInstantResponse, QueryRangeResponse, SearchResponse, SearchTagValuesResponse, SearchTagsResponse,
};
use crate::api::Representation;
use crate::pipeline::classify::ResponseKind;

#[derive(Debug, thiserror::Error)]
pub enum ScrubError {
    #[error("json body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("protobuf body: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("json body is not an object")]
    NotAnObject,

    #[error("unexpected json member {0:?}")]
    UnexpectedMember(String),
}

/// A response message with a top-level metrics field.
pub trait MetricsBearing: Message + Default {
    /// Top-level members a JSON body of this kind may carry.
    const JSON_MEMBERS: &'static [&'static str];
    /// Member name of the metrics object in JSON bodies.
    const METRICS_FIELD: &'static str = "metrics";
    /// Field number of the metrics message in protobuf bodies.
    const METRICS_TAG: u32 = 2;
}

macro_rules! impl_metrics_bearing {
    ($($ty:ty => [$($member:literal),+]),+ $(,)?) => {
        $(
            impl MetricsBearing for $ty {
                const JSON_MEMBERS: &'static [&'static str] = &[$($member),+];
            }
        )+
    };
}

impl_metrics_bearing!(
    SearchResponse => ["traces", "metrics"],
    SearchTagsResponse => ["tagNames", "metrics"],
    SearchTagValuesResponse => ["tagValues", "metrics"],
    QueryRangeResponse => ["series", "metrics", "status", "message"],
    QueryInstantResponse => ["series", "metrics", "status", "message"],
);

/// Check the body shape, then reset its metrics.
pub type ScrubFn = fn(&[u8], Representation) -> Result<Vec<u8>, ScrubError>;

/// Scrubber for a response kind; `None` for kinds that are never rewritten.
pub fn scrubber_for(kind: ResponseKind) -> Option<ScrubFn> {
    match kind {
        ResponseKind::Uncacheable => None,
        ResponseKind::Search => Some(scrub_as::<SearchResponse>),
        ResponseKind::Tags => Some(scrub_as::<SearchTagsResponse>),
        ResponseKind::TagValues => Some(scrub_as::<SearchTagValuesResponse>),
        ResponseKind::QueryRange => Some(scrub_as::<QueryRangeResponse>),
        ResponseKind::QueryInstant => Some(scrub_as::<QueryInstantResponse>),
    }
}

fn scrub_as<T: MetricsBearing>(body: &[u8], representation: Representation) -> Result<Vec<u8>, ScrubError> {
    match representation {
        Representation::Json => {
            let mut document: Value = serde_json::from_slice(body)?;
            let members = document.as_object_mut().ok_or(ScrubError::NotAnObject)?;
            if let Some(name) = members.keys().find(|k| !T::JSON_MEMBERS.contains(&k.as_str())) {
                return Err(ScrubError::UnexpectedMember(name.clone()));
            }
            if let Some(metrics) = members.get_mut(T::METRICS_FIELD).filter(|m| !m.is_null()) {
                *metrics = Value::Object(Map::new());
            }
            Ok(serde_json::to_vec(&document)?)
        }
        Representation::Protobuf => {
            T::decode(body)?;
            Ok(clear_message_field(body, T::METRICS_TAG)?)
        }
    }
}

/// Copy `body` field by field, replacing every occurrence of message field
/// `tag` by a single empty one at the end. Absent stays absent.
fn clear_message_field(body: &[u8], tag: u32) -> Result<Vec<u8>, prost::DecodeError> {
    let mut out = Vec::with_capacity(body.len());
    let mut buf = body;
    let mut present = false;

    while !buf.is_empty() {
        let start = body.len() - buf.len();
        let (field, wire_type) = decode_key(&mut buf)?;
        skip_field(wire_type, field, &mut buf, DecodeContext::default())?;
        let end = body.len() - buf.len();

        if field == tag {
            present = true;
        } else {
            out.extend_from_slice(&body[start..end]);
        }
    }

    if present {
        encode_key(tag, WireType::LengthDelimited, &mut out);
        encode_varint(0, &mut out);
    }
    Ok(out)
}

/// Reset the metrics of `body`.
///
/// On error the caller should keep serving `body` as it is; a stale
/// metrics field is better than a failed query.
pub fn scrub(body: &Bytes, kind: ResponseKind, representation: Representation) -> Result<Bytes, ScrubError> {
    match scrubber_for(kind) {
        Some(scrub_fn) => scrub_fn(body, representation).map(Bytes::from),
        None => Ok(body.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tempopb::{
        InstantSeries, MetadataMetrics, SearchMetrics, Sample, TimeSeries, TraceSearchMetadata,
    };
    use serde::Serialize;
    use serde_json::json;

    fn search_metrics() -> SearchMetrics {
        SearchMetrics {
            inspected_traces: 10,
            inspected_bytes: 4096,
            total_blocks: 2,
            completed_jobs: 1,
            total_jobs: 4,
            total_block_bytes: 8192,
            inspected_spans: 55,
        }
    }

    fn metadata_metrics() -> MetadataMetrics {
        MetadataMetrics {
            inspected_bytes: 100,
            total_jobs: 3,
            completed_jobs: 2,
            total_blocks: 1,
            total_block_bytes: 300,
        }
    }

    /// One populated message per cacheable kind, protobuf encoded.
    fn populated(kind: ResponseKind) -> Vec<u8> {
        match kind {
            ResponseKind::Search => SearchResponse {
                traces: vec![TraceSearchMetadata { trace_id: "t1".into(), ..Default::default() }],
                metrics: Some(search_metrics()),
            }
            .encode_to_vec(),
            ResponseKind::Tags => SearchTagsResponse {
                tag_names: vec!["http.method".into()],
                metrics: Some(metadata_metrics()),
            }
            .encode_to_vec(),
            ResponseKind::TagValues => SearchTagValuesResponse {
                tag_values: vec!["GET".into()],
                metrics: Some(metadata_metrics()),
            }
            .encode_to_vec(),
            ResponseKind::QueryRange => QueryRangeResponse {
                series: vec![TimeSeries {
                    prom_labels: "{}".into(),
                    samples: vec![Sample { timestamp_ms: 1, value: 2.0 }],
                    ..Default::default()
                }],
                metrics: Some(search_metrics()),
                ..Default::default()
            }
            .encode_to_vec(),
            ResponseKind::QueryInstant => QueryInstantResponse {
                series: vec![InstantSeries { value: 3.0, ..Default::default() }],
                metrics: Some(search_metrics()),
                ..Default::default()
            }
            .encode_to_vec(),
            ResponseKind::Uncacheable => unreachable!(),
        }
    }

    /// Same message re-encoded as JSON.
    fn as_json(kind: ResponseKind, proto: &[u8]) -> Vec<u8> {
        fn conv<T: MetricsBearing + Serialize>(proto: &[u8]) -> Vec<u8> {
            serde_json::to_vec(&T::decode(proto).unwrap()).unwrap()
        }
        match kind {
            ResponseKind::Search => conv::<SearchResponse>(proto),
            ResponseKind::Tags => conv::<SearchTagsResponse>(proto),
            ResponseKind::TagValues => conv::<SearchTagValuesResponse>(proto),
            ResponseKind::QueryRange => conv::<QueryRangeResponse>(proto),
            ResponseKind::QueryInstant => conv::<QueryInstantResponse>(proto),
            ResponseKind::Uncacheable => unreachable!(),
        }
    }

    fn cacheable_kinds() -> impl Iterator<Item = ResponseKind> {
        ResponseKind::ALL.into_iter().filter(|k| *k != ResponseKind::Uncacheable)
    }

    #[test]
    fn test_json_metrics_cleared_for_every_kind() {
        for kind in cacheable_kinds() {
            let body = Bytes::from(as_json(kind, &populated(kind)));
            let before: Value = serde_json::from_slice(&body).unwrap();
            assert_ne!(before["metrics"], json!({}), "{kind}");

            let scrubbed = scrub(&body, kind, Representation::Json).unwrap();
            let after: Value = serde_json::from_slice(&scrubbed).unwrap();

            let mut expected = before.clone();
            expected["metrics"] = json!({});
            assert_eq!(after, expected, "{kind}");
        }
    }

    #[test]
    fn test_protobuf_metrics_cleared_for_every_kind() {
        macro_rules! check {
            ($ty:ty, $body:expr, $scrubbed:expr) => {{
                let mut expected = <$ty>::decode(&$body[..]).unwrap();
                assert!(expected.metrics.is_some());
                expected.metrics = Some(Default::default());
                assert_eq!(<$ty>::decode(&$scrubbed[..]).unwrap(), expected);
            }};
        }

        for kind in cacheable_kinds() {
            let body = Bytes::from(populated(kind));
            let scrubbed = scrub(&body, kind, Representation::Protobuf).unwrap();
            match kind {
                ResponseKind::Search => check!(SearchResponse, body, scrubbed),
                ResponseKind::Tags => check!(SearchTagsResponse, body, scrubbed),
                ResponseKind::TagValues => check!(SearchTagValuesResponse, body, scrubbed),
                ResponseKind::QueryRange => check!(QueryRangeResponse, body, scrubbed),
                ResponseKind::QueryInstant => check!(QueryInstantResponse, body, scrubbed),
                ResponseKind::Uncacheable => unreachable!(),
            }
        }
    }

    #[test]
    fn test_scrub_is_idempotent() {
        for kind in cacheable_kinds() {
            for representation in [Representation::Json, Representation::Protobuf] {
                let proto = populated(kind);
                let body = Bytes::from(match representation {
                    Representation::Json => as_json(kind, &proto),
                    Representation::Protobuf => proto,
                });
                let once = scrub(&body, kind, representation).unwrap();
                let twice = scrub(&once, kind, representation).unwrap();
                assert_eq!(once, twice, "{kind} {representation:?}");
            }
        }
    }

    #[test]
    fn test_absent_metrics_stay_absent() {
        let body = Bytes::from_static(br#"{"tagValues":["a","b"]}"#);
        let scrubbed = scrub(&body, ResponseKind::TagValues, Representation::Json).unwrap();
        assert_eq!(scrubbed, body);

        let proto = Bytes::from(
            SearchTagValuesResponse {
                tag_values: vec!["a".into()],
                metrics: None,
            }
            .encode_to_vec(),
        );
        assert_eq!(scrub(&proto, ResponseKind::TagValues, Representation::Protobuf).unwrap(), proto);
    }

    #[test]
    fn test_unknown_metric_fields_dropped() {
        let body = Bytes::from_static(br#"{"metrics":{"rows":5},"traces":[]}"#);
        let scrubbed = scrub(&body, ResponseKind::Search, Representation::Json).unwrap();
        assert_eq!(&scrubbed[..], br#"{"metrics":{},"traces":[]}"#);
    }

    #[test]
    fn test_json_keeps_everything_besides_metrics() {
        // Nested members the message types do not model, in querier order
        let body = Bytes::from_static(
            br#"{"traces":[{"traceID":"2f1a","rootServiceName":"checkout","startTimeUnixNano":"1700000000000000000","durationMs":41,"spanSet":{"spans":[{"spanID":"9c","startTimeUnixNano":"1700000000000000001","durationNanos":"41000000","attributes":[{"key":"http.status_code","value":{"intValue":"500"}}]}],"matched":1},"spanSets":[{"spans":[],"matched":1}],"serviceStats":{"checkout":{"spanCount":3,"errorCount":1}},"rootSpanKind":"server"}],"metrics":{"inspectedTraces":12,"inspectedBytes":"90210","completedJobs":2,"totalJobs":2}}"#,
        );
        let stored: Value = serde_json::from_slice(&body).unwrap();

        let scrubbed = scrub(&body, ResponseKind::Search, Representation::Json).unwrap();
        let served: Value = serde_json::from_slice(&scrubbed).unwrap();

        let mut expected = stored.clone();
        expected["metrics"] = json!({});
        assert_eq!(served, expected);
        assert_eq!(served["traces"][0]["spanSet"]["spans"][0]["spanID"], "9c");
        assert_eq!(served["traces"][0]["rootSpanKind"], "server");

        // Member order and number formatting are untouched
        let text = std::str::from_utf8(&scrubbed).unwrap();
        assert!(text.starts_with(r#"{"traces":[{"traceID":"2f1a","rootServiceName":"checkout""#));
        assert!(text.ends_with(r#""metrics":{}}"#));
    }

    #[test]
    fn test_protobuf_keeps_unmodelled_fields() {
        let tags = SearchTagsResponse {
            tag_names: vec!["http.method".into(), "service.name".into()],
            metrics: None,
        }
        .encode_to_vec();
        let metrics = SearchTagsResponse {
            tag_names: Vec::new(),
            metrics: Some(metadata_metrics()),
        }
        .encode_to_vec();
        // Field 15, varint 42: unknown to the message type
        let unknown = [0x78, 0x2a];

        let body = Bytes::from([tags.as_slice(), &metrics, &unknown].concat());
        let scrubbed = scrub(&body, ResponseKind::Tags, Representation::Protobuf).unwrap();

        let expected = [tags.as_slice(), &unknown, &[0x12, 0x00]].concat();
        assert_eq!(&scrubbed[..], &expected[..]);
    }

    #[test]
    fn test_protobuf_nested_span_sets_survive() {
        let body = SearchResponse {
            traces: vec![TraceSearchMetadata {
                trace_id: "2f1a".into(),
                span_set: Some(crate::api::tempopb::SpanSet {
                    matched: 1,
                    ..Default::default()
                }),
                ..Default::default()
            }],
            metrics: Some(search_metrics()),
        };
        let scrubbed = scrub(&Bytes::from(body.encode_to_vec()), ResponseKind::Search, Representation::Protobuf).unwrap();

        let decoded = SearchResponse::decode(scrubbed).unwrap();
        assert_eq!(decoded.traces, body.traces);
        assert_eq!(decoded.metrics, Some(SearchMetrics::default()));
    }

    #[test]
    fn test_uncacheable_is_untouched() {
        let body = Bytes::from_static(b"not even json");
        let out = scrub(&body, ResponseKind::Uncacheable, Representation::Json).unwrap();
        assert_eq!(out, body);
        assert!(scrubber_for(ResponseKind::Uncacheable).is_none());
    }

    #[test]
    fn test_decode_failures_are_reported() {
        let garbage = Bytes::from_static(b"{not json");
        assert!(matches!(
            scrub(&garbage, ResponseKind::Search, Representation::Json),
            Err(ScrubError::Json(_))
        ));

        let truncated = Bytes::from_static(&[0x0a, 0x10, 0x01]);
        assert!(matches!(
            scrub(&truncated, ResponseKind::Search, Representation::Protobuf),
            Err(ScrubError::Protobuf(_))
        ));

        // A different response shape is rejected rather than rewritten
        let v2_tags = Bytes::from_static(br#"{"scopes":[{"name":"span","tags":["a"]}]}"#);
        assert!(matches!(
            scrub(&v2_tags, ResponseKind::Tags, Representation::Json),
            Err(ScrubError::UnexpectedMember(name)) if name == "scopes"
        ));
        assert!(matches!(
            scrub(&Bytes::from_static(b"[1,2]"), ResponseKind::Tags, Representation::Json),
            Err(ScrubError::NotAnObject)
        ));
    }
}
