use serde_json::{Map, Value};

use crate::models::ChannelJudgment;

const PROBABILITY_KEYS: [&str; 4] = [
    "probability",
    "probabilidade",
    "meme_probability",
    "probabilidade_meme",
];

/// Every probability found anywhere in the tree, in visit order.
pub fn collect_probabilities(judgment: &ChannelJudgment) -> Vec<f64> {
    let mut found = Vec::new();
    visit(judgment.as_value(), &mut found);
    found
}

/// Mean of all probabilities in the tree, `None` if there are none.
pub fn channel_average(judgment: Option<&ChannelJudgment>) -> Option<f64> {
    let values = collect_probabilities(judgment?);
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn visit(node: &Value, found: &mut Vec<f64>) {
    match node {
        Value::Object(map) => {
            if let Some(probability) = probability_field(map) {
                found.push(probability);
            }
            for child in map.values() {
                visit(child, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                visit(item, found);
            }
        }
        _ => {}
    }
}

fn probability_field(map: &Map<String, Value>) -> Option<f64> {
    map.iter()
        .filter(|(key, _)| {
            PROBABILITY_KEYS
                .iter()
                .any(|candidate| key.trim().eq_ignore_ascii_case(candidate))
        })
        .find_map(|(_, value)| numeric(value))
        .map(|p| p.clamp(0.0, 100.0))
}

/// Numbers, or strings like `"85"` / `"85%"`.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
    .filter(|p: &f64| p.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn judgment(value: Value) -> ChannelJudgment {
        ChannelJudgment(value)
    }

    #[test]
    fn test_averages_probabilities_at_any_depth() {
        let tree = judgment(json!({
            "probability": 10,
            "frases": {
                "grupo": {
                    "frase_1": { "probability": 20, "explanation": "irônica" },
                    "frase_2": { "probability": 90, "explanation": "exagero" }
                }
            }
        }));

        assert_eq!(channel_average(Some(&tree)), Some(40.0));
    }

    #[test]
    fn test_no_probabilities_is_undefined_not_zero() {
        let tree = judgment(json!({ "analise_geral": { "explanation": "sem nota" } }));
        assert_eq!(channel_average(Some(&tree)), None);
        assert_eq!(channel_average(None), None);
    }

    #[test]
    fn test_judgments_nested_under_a_judgment_are_still_counted() {
        let tree = judgment(json!({
            "probability": 50,
            "detalhes": [ { "probability": 70 }, { "sub": { "probability": 30 } } ]
        }));

        assert_eq!(collect_probabilities(&tree), vec![50.0, 70.0, 30.0]);
    }

    #[test]
    fn test_tolerates_key_and_value_drift() {
        let tree = judgment(json!({
            "a": { "Probabilidade": "80%" },
            "b": { "meme_probability": 60.5 },
            "c": { "probability": "alta" },
            "d": { "probability": null }
        }));

        assert_eq!(collect_probabilities(&tree), vec![80.0, 60.5]);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let tree = judgment(json!([{ "probability": 150 }, { "probability": -5 }]));
        assert_eq!(collect_probabilities(&tree), vec![100.0, 0.0]);
    }
}
