use super::*;

/// Builds a CaseInfo with fixed timestamps for selection tests.
fn info(case_id: &str, case_name: &str, created_at: &str) -> CaseInfo {
    CaseInfo {
        case_id: case_id.to_string(),
        case_name: case_name.to_string(),
        definition_name: "order_case".to_string(),
        created_by: "alice".to_string(),
        created_at: created_at.to_string(),
        updated_at: created_at.to_string(),
        state: "active".to_string(),
    }
}

#[test]
fn test_select_case_prefers_exact_id_over_name_matches() {
    let cases = vec![
        info("case-zzz", "abc-123", "2026-08-02T10:00:00Z"),
        info("abc-123", "Order Case", "2026-08-01T10:00:00Z"),
    ];
    let selected = select_case(cases, "abc-123").unwrap();
    assert_eq!(selected.case_id, "abc-123");
}

#[test]
fn test_select_case_prefers_exact_name_over_partial_matches() {
    let cases = vec![
        info("case-1", "order case extended", "2026-08-02T10:00:00Z"),
        info("case-2", "order case", "2026-08-01T10:00:00Z"),
    ];
    let selected = select_case(cases, "order case").unwrap();
    assert_eq!(selected.case_id, "case-2");
}

#[test]
fn test_select_case_partial_match_takes_the_most_recent() {
    // The input is sorted most-recent-first, the way list_cases returns it.
    let cases = vec![
        info("case-new", "Order March", "2026-08-02T10:00:00Z"),
        info("case-old", "Order February", "2026-08-01T10:00:00Z"),
    ];
    let selected = select_case(cases, "order").unwrap();
    assert_eq!(selected.case_id, "case-new");
}

#[test]
fn test_select_case_matches_partial_ids() {
    let cases = vec![
        info("11f00d22-aaaa", "Order Case", "2026-08-02T10:00:00Z"),
        info("33beef44-bbbb", "Other Case", "2026-08-01T10:00:00Z"),
    ];
    let selected = select_case(cases, "f00d").unwrap();
    assert_eq!(selected.case_id, "11f00d22-aaaa");
}

#[test]
fn test_select_case_is_case_insensitive() {
    let cases = vec![info("case-1", "order case", "2026-08-02T10:00:00Z")];
    let selected = select_case(cases, "ORDER CASE").unwrap();
    assert_eq!(selected.case_id, "case-1");
}

#[test]
fn test_select_case_returns_none_without_a_match() {
    let cases = vec![info("case-1", "Order Case", "2026-08-02T10:00:00Z")];
    assert!(select_case(cases, "nothing-like-this").is_none());
}

#[test]
fn test_case_info_new_starts_active_with_matching_timestamps() {
    let info = CaseInfo::new("case-1", "Order Case", "order_case", "alice");
    assert_eq!(info.state, "active");
    assert_eq!(info.created_at, info.updated_at);
    assert!(chrono::DateTime::parse_from_rfc3339(&info.created_at).is_ok());
}

#[test]
fn test_case_info_update_bumps_state_and_timestamp() {
    let mut info = CaseInfo::new("case-1", "Order Case", "order_case", "alice");
    info.update("completed");
    assert_eq!(info.state, "completed");
    assert!(info.updated_at >= info.created_at);
    assert!(chrono::DateTime::parse_from_rfc3339(&info.updated_at).is_ok());
}

#[test]
fn test_case_info_survives_serialization() {
    let info = CaseInfo::new("case-1", "Order Case", "order_case", "alice");
    let json = serde_json::to_string(&info).unwrap();
    let back: CaseInfo = serde_json::from_str(&json).unwrap();
    assert_eq!(back.case_id, info.case_id);
    assert_eq!(back.case_name, info.case_name);
    assert_eq!(back.definition_name, info.definition_name);
    assert_eq!(back.created_by, info.created_by);
    assert_eq!(back.created_at, info.created_at);
    assert_eq!(back.state, info.state);
}
