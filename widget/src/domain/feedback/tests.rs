//! Tests for feedback drafts, ids and enum parsing.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use mockable::MockClock;
use rstest::rstest;

use super::*;

fn clock_at(now: DateTime<Utc>) -> MockClock {
    let mut clock = MockClock::new();
    clock.expect_utc().return_const(now);
    clock
}

fn draft(feedback_type: FeedbackType) -> NewFeedback {
    NewFeedback {
        title: "Save button".to_owned(),
        description: "Clicking save does nothing at all".to_owned(),
        feedback_type,
        severity: Some(FeedbackSeverity::High),
        ..NewFeedback::default()
    }
}

#[rstest]
#[case(9, Err(DescriptionError::TooShort { actual: 9 }))]
#[case(10, Ok(()))]
#[case(5000, Ok(()))]
#[case(5001, Err(DescriptionError::TooLong { actual: 5001 }))]
fn description_bounds_are_inclusive(
    #[case] length: usize,
    #[case] expected: Result<(), DescriptionError>,
) {
    assert_eq!(validate_description(&"a".repeat(length)), expected);
}

#[rstest]
fn description_length_counts_characters_not_bytes() {
    let text = "é".repeat(DESCRIPTION_MIN_CHARS);
    assert!(text.len() > DESCRIPTION_MIN_CHARS);
    assert!(validate_description(&text).is_ok());
}

#[rstest]
fn tracking_ids_use_unix_millis() {
    let now = Utc
        .with_ymd_and_hms(2026, 5, 4, 3, 2, 1)
        .single()
        .expect("valid timestamp");
    let id = TrackingId::generate(&clock_at(now));
    assert_eq!(id.as_str(), format!("FB-{}", now.timestamp_millis()));
    assert!(
        id.as_str()
            .strip_prefix(TrackingId::PREFIX)
            .is_some_and(|digits| digits.chars().all(|c| c.is_ascii_digit()))
    );
}

#[rstest]
fn severity_is_kept_for_bug_reports() {
    let insert = draft(FeedbackType::BugReport).into_insert(TrackingId::new("FB-1"));
    assert_eq!(insert.severity, Some(FeedbackSeverity::High));
    assert_eq!(insert.status, FeedbackStatus::New);
}

#[rstest]
#[case(FeedbackType::FeatureRequest)]
#[case(FeedbackType::Satisfaction)]
#[case(FeedbackType::Other)]
fn severity_is_dropped_for_other_types(#[case] feedback_type: FeedbackType) {
    let insert = draft(feedback_type).into_insert(TrackingId::new("FB-1"));
    assert_eq!(insert.severity, None);
}

#[rstest]
fn empty_contact_fields_become_absent() {
    let mut feedback = draft(FeedbackType::Other);
    feedback.name = "Ada".to_owned();
    let insert = feedback.into_insert(TrackingId::new("FB-1"));
    assert_eq!(insert.email, None);
    assert_eq!(insert.name.as_deref(), Some("Ada"));
}

#[rstest]
#[case("bug_report", FeedbackType::BugReport)]
#[case("feature_request", FeedbackType::FeatureRequest)]
fn feedback_types_parse_from_column_values(#[case] raw: &str, #[case] expected: FeedbackType) {
    assert_eq!(FeedbackType::from_str(raw), Ok(expected));
    assert_eq!(expected.as_str(), raw);
}

#[rstest]
fn unknown_status_names_the_enum() {
    let err = FeedbackStatus::from_str("closed").expect_err("unknown status");
    assert_eq!(err.to_string(), "invalid feedback status: closed");
}

#[rstest]
fn defaults_match_a_fresh_form() {
    assert_eq!(FeedbackType::default(), FeedbackType::BugReport);
    assert_eq!(FeedbackSeverity::default(), FeedbackSeverity::Low);
    assert_eq!(FeedbackStatus::default(), FeedbackStatus::New);
    assert_eq!(FeedbackStatus::ALL.len(), 7);
    assert_eq!(FeedbackStatus::WontFix.label(), "Won't fix");
}

#[rstest]
fn serialised_enums_use_snake_case() {
    let value = serde_json::to_value(FeedbackStatus::InReview).expect("serialise");
    assert_eq!(value, serde_json::json!("in_review"));
}
