//! Tests for flag snapshot construction

use super::*;

#[test]
fn test_snapshot_reflects_enabled_flag() {
    let provider = StaticFlags::new().with("user-metadata", true);

    let snapshot = build_snapshot(&provider);

    assert_eq!(snapshot.get("user", "metadata"), Some(true));
}

#[test]
fn test_unknown_flag_defaults_to_false() {
    let provider = StaticFlags::new();

    let snapshot = build_snapshot(&provider);

    assert_eq!(snapshot.get("user", "metadata"), Some(false));
    assert_eq!(snapshot.get("user", "missing"), None);
}

#[test]
fn test_snapshot_json_shape() {
    let provider = StaticFlags::new().with("user-metadata", true);

    let body = build_snapshot(&provider)
        .to_json_pretty()
        .expect("snapshot should serialize");
    let text = String::from_utf8(body).expect("utf-8");

    assert_eq!(text, "{\n    \"user\": {\n        \"metadata\": true\n    }\n}");
}

#[test]
fn test_snapshot_json_false() {
    let provider = StaticFlags::new().with("user-metadata", false);

    let body = build_snapshot(&provider)
        .to_json_pretty()
        .expect("snapshot should serialize");
    let value: serde_json::Value = serde_json::from_slice(&body).expect("valid JSON");

    assert_eq!(value, serde_json::json!({"user": {"metadata": false}}));
}

#[test]
fn test_snapshot_tracks_provider_changes() {
    let provider = StaticFlags::new().with("user-metadata", false);
    assert_eq!(build_snapshot(&provider).get("user", "metadata"), Some(false));

    provider.set("user-metadata", true);
    assert_eq!(build_snapshot(&provider).get("user", "metadata"), Some(true));
}

#[test]
fn test_every_published_flag_is_present() {
    let provider = StaticFlags::new();
    let snapshot = build_snapshot(&provider);

    for (_, category, key) in PUBLISHED_FLAGS {
        assert!(
            snapshot.get(category, key).is_some(),
            "{}.{} missing from snapshot",
            category,
            key
        );
    }
}
