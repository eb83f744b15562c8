// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_totals() -> anyhow::Result<()> {
    let stdout = r#"{
        "daily": [{ "date": "2026-10-15", "inputTokens": 1200, "outputTokens": 340, "totalTokens": 1540 }],
        "totals": { "inputTokens": 1200, "outputTokens": 340, "cacheReadTokens": 99999, "totalTokens": 1540 }
    }"#;
    let usage = parse_report(stdout)?;
    assert_eq!(usage, UsageData::new(1200, 340, 0));
    assert_eq!(usage.total_tokens, 1540);
    Ok(())
}

#[test]
fn missing_totals_is_zero() -> anyhow::Result<()> {
    assert_eq!(parse_report(r#"{"daily": []}"#)?, UsageData::default());
    assert_eq!(parse_report(r#"{"totals": {}}"#)?, UsageData::default());
    Ok(())
}

#[test]
fn malformed_output_is_parse_error() {
    let result = parse_report("Error: something went wrong");
    assert!(matches!(result, Err(AdapterError::Parse { .. })), "{result:?}");
}
