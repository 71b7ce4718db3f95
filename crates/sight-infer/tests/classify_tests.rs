use sight_infer::{
    classify, encode_predictions, parse_predictions, predictions_json, softmax, ClassificationResult, LabelError,
    LabelTable, PredictionParseError,
};

fn result(class_index: usize, label: &str, confidence: f32) -> ClassificationResult {
    ClassificationResult {
        class_index,
        label: label.to_string(),
        confidence,
    }
}

#[test]
fn test_top_k_ties_go_to_lower_index() {
    let top = classify(&[0.2, 0.2, 0.9], None, 2);
    assert_eq!(top, vec![result(2, "", 0.9), result(0, "", 0.2)]);
}

#[test]
fn test_top_k_never_exceeds_input() {
    let top = classify(&[0.5, 0.1], None, 5);
    assert_eq!(top.len(), 2);
    assert!(classify(&[], None, 5).is_empty());
    assert!(classify(&[0.3], None, 0).is_empty());
}

#[test]
fn test_top_k_does_not_renormalize() {
    let top = classify(&[3.5, -1.0, 7.25], None, 3);
    let values: Vec<f32> = top.iter().map(|r| r.confidence).collect();
    assert_eq!(values, vec![7.25, 3.5, -1.0]);
}

#[test]
fn test_labels_beyond_table_are_empty() {
    let labels = LabelTable::from_content("zero\none").unwrap();
    let top = classify(&[0.1, 0.2, 0.7], Some(&labels), 3);
    assert_eq!(top, vec![result(2, "", 0.7), result(1, "one", 0.2), result(0, "zero", 0.1)]);
}

#[test]
fn test_encoding_round_trips_separators() {
    let predictions = vec![
        result(7, "pipe|semi;slash\\", 0.123_456_79),
        result(0, "", 1e-7),
        result(42, "plain label", 0.5),
    ];
    let encoded = encode_predictions(&predictions);
    assert_eq!(parse_predictions(&encoded).unwrap(), predictions);
}

#[test]
fn test_encoding_has_no_nul_bytes() {
    let predictions = vec![result(1, "nul\0inside", 0.75), result(2, "backslash zero\\0", 0.25)];
    let encoded = encode_predictions(&predictions);
    assert!(!encoded.contains('\0'));
    assert!(std::ffi::CString::new(encoded.clone()).is_ok());
    assert_eq!(parse_predictions(&encoded).unwrap(), predictions);
}

#[test]
fn test_encoding_format() {
    let encoded = encode_predictions(&[result(2, "a|b", 0.9), result(0, "c", 0.25)]);
    assert_eq!(encoded, r"2|a\|b|0.9;0|c|0.25");
    assert_eq!(encode_predictions(&[]), "");
    assert_eq!(parse_predictions("").unwrap(), Vec::new());
}

#[test]
fn test_parse_rejects_malformed_input() {
    assert!(matches!(
        parse_predictions("1|a"),
        Err(PredictionParseError::FieldCount { record: 0, found: 2 })
    ));
    assert!(matches!(
        parse_predictions("1|a|0.5;x|b|0.1"),
        Err(PredictionParseError::Index { record: 1, .. })
    ));
    assert!(matches!(
        parse_predictions("1|a|high"),
        Err(PredictionParseError::Confidence { record: 0, .. })
    ));
    assert!(matches!(parse_predictions("1|a\\"), Err(PredictionParseError::DanglingEscape)));
}

#[test]
fn test_predictions_json_field_names() {
    let json = predictions_json(&[result(3, "tabby cat", 0.5)]).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[0]["class_id"], 3);
    assert_eq!(value[0]["class_name"], "tabby cat");
    assert_eq!(value[0]["confidence"], 0.5);
}

#[test]
fn test_softmax_then_classify() {
    let probs = softmax(&[1.0, 3.0, 2.0]);
    let top = classify(&probs, None, 1);
    assert_eq!(top[0].class_index, 1);
}

#[test]
fn test_label_table_keeps_blank_lines() {
    let labels = LabelTable::from_content("  background \r\n\nperson\r\n").unwrap();
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.get(0), "background");
    assert_eq!(labels.get(1), "");
    assert_eq!(labels.get(2), "person");
    assert_eq!(labels.get(99), "");
}

#[test]
fn test_label_table_errors() {
    assert!(matches!(LabelTable::from_content(" \n\n"), Err(LabelError::Empty)));
    let missing = std::env::temp_dir().join(format!("sight-no-labels-{}.txt", std::process::id()));
    assert!(matches!(LabelTable::from_file(&missing), Err(LabelError::Io(_))));
}

#[test]
fn test_label_table_from_file() {
    let path = std::env::temp_dir().join(format!("sight-labels-{}.txt", std::process::id()));
    std::fs::write(&path, "tench\ngoldfish\ngreat white shark\n").unwrap();
    let labels = LabelTable::from_file(&path).unwrap();
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.get(2), "great white shark");
    std::fs::remove_file(&path).ok();
}
