//! Classification postprocessing and its flat text encoding.
//!
//! Encoded form: records joined by `;`, fields by `|`, each record
//! `index|label|confidence`. Inside labels `\`, `|` and `;` are escaped
//! with a backslash and NUL is written as `\0`, so the text survives C
//! strings. Confidence uses the shortest text that parses back
//! to the same `f32`.

use crate::error::PredictionParseError;
use crate::labels::LabelTable;
use serde::Serialize;
use std::cmp::Ordering;

const RECORD_SEP: char = ';';
const FIELD_SEP: char = '|';
const ESCAPE: char = '\\';
const NUL_ESCAPE: char = '0';

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    #[serde(rename = "class_id")]
    pub class_index: usize,
    #[serde(rename = "class_name")]
    pub label: String,
    pub confidence: f32,
}

/// Descending by value, NaN last.
fn by_confidence(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Top `k` entries of `raw`, highest first, ties to the lower index.
///
/// Values are used as-is; apply [`softmax`] first if the model emits
/// logits. Indices past the end of `labels` get an empty label.
pub fn classify(raw: &[f32], labels: Option<&LabelTable>, k: usize) -> Vec<ClassificationResult> {
    let mut ranked: Vec<(usize, f32)> = raw.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| by_confidence(a.1, b.1).then(a.0.cmp(&b.0)));
    ranked.truncate(k);

    ranked
        .into_iter()
        .map(|(class_index, confidence)| ClassificationResult {
            class_index,
            label: labels.map(|l| l.get(class_index)).unwrap_or("").to_string(),
            confidence,
        })
        .collect()
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn escape_label(label: &str, out: &mut String) {
    for c in label.chars() {
        match c {
            '\0' => {
                out.push(ESCAPE);
                out.push(NUL_ESCAPE);
            }
            ESCAPE | FIELD_SEP | RECORD_SEP => {
                out.push(ESCAPE);
                out.push(c);
            }
            c => out.push(c),
        }
    }
}

pub fn encode_predictions(predictions: &[ClassificationResult]) -> String {
    let mut out = String::new();
    for (i, p) in predictions.iter().enumerate() {
        if i > 0 {
            out.push(RECORD_SEP);
        }
        out.push_str(&p.class_index.to_string());
        out.push(FIELD_SEP);
        escape_label(&p.label, &mut out);
        out.push(FIELD_SEP);
        out.push_str(&p.confidence.to_string());
    }
    out
}

fn split_unescaped(encoded: &str) -> Result<Vec<Vec<String>>, PredictionParseError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = encoded.chars();

    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next().ok_or(PredictionParseError::DanglingEscape)? {
                NUL_ESCAPE => field.push('\0'),
                escaped => field.push(escaped),
            },
            FIELD_SEP => fields.push(std::mem::take(&mut field)),
            RECORD_SEP => {
                fields.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut fields));
            }
            c => field.push(c),
        }
    }
    fields.push(field);
    records.push(fields);
    Ok(records)
}

/// Decode the text produced by [`encode_predictions`].
pub fn parse_predictions(encoded: &str) -> Result<Vec<ClassificationResult>, PredictionParseError> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }

    split_unescaped(encoded)?
        .into_iter()
        .enumerate()
        .map(|(record, fields)| -> Result<ClassificationResult, PredictionParseError> {
            let [index, label, confidence]: [String; 3] =
                fields.try_into().map_err(|f: Vec<String>| PredictionParseError::FieldCount {
                    record,
                    found: f.len(),
                })?;
            Ok(ClassificationResult {
                class_index: index
                    .parse()
                    .map_err(|_| PredictionParseError::Index { record, value: index.clone() })?,
                confidence: confidence
                    .parse()
                    .map_err(|_| PredictionParseError::Confidence { record, value: confidence.clone() })?,
                label,
            })
        })
        .collect()
}

/// JSON array of `{"class_id", "class_name", "confidence"}` objects.
pub fn predictions_json(predictions: &[ClassificationResult]) -> Result<String, serde_json::Error> {
    serde_json::to_string(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_large_logits_stay_finite() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert_eq!(probs, vec![0.5, 0.5]);
    }

    #[test]
    fn test_by_confidence_puts_nan_last() {
        let mut values = vec![f32::NAN, 0.1, 0.9];
        values.sort_by(|a, b| by_confidence(*a, *b));
        assert_eq!(values[0], 0.9);
        assert_eq!(values[1], 0.1);
        assert!(values[2].is_nan());
    }

    #[test]
    fn test_split_handles_escapes() {
        let records = split_unescaped(r"1|a\|b\;c\\|0.5;2||0").unwrap();
        assert_eq!(records, vec![vec!["1", r"a|b;c\", "0.5"], vec!["2", "", "0"]]);
    }

    #[test]
    fn test_nul_is_escaped() {
        let mut out = String::new();
        escape_label("a\0b\\0", &mut out);
        assert_eq!(out, r"a\0b\\0");
        assert!(!out.contains('\0'));
        assert_eq!(split_unescaped(&out).unwrap(), vec![vec!["a\0b\\0".to_string()]]);
    }
}
