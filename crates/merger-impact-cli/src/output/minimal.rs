use serde_json::{Map, Value};

/// Print a one-line answer: the risk verdict for scenario and risk runs,
/// `pre -> post (+delta)` for structure runs, the drift for forecasts.
pub fn print_minimal(value: &Value) {
    let result = value.get("result").unwrap_or(value);
    let line = match result {
        Value::Object(map) => headline(map),
        other => format_minimal(other),
    };
    println!("{}", line);
}

fn headline(map: &Map<String, Value>) -> String {
    if let Some(verdict) = map
        .get("risk")
        .or_else(|| map.get("verdict"))
        .and_then(Value::as_str)
    {
        return verdict.to_string();
    }

    if let Some(hhi) = map.get("hhi") {
        let field = |k: &str| hhi.get(k).and_then(Value::as_u64);
        if let (Some(pre), Some(post), Some(delta)) = (field("pre"), field("post"), field("delta")) {
            return format!("{} -> {} (+{})", pre, post, delta);
        }
    }

    if let Some(drift) = map.get("drift").and_then(Value::as_f64) {
        return format!("{:.4}", drift);
    }

    map.iter()
        .find(|(_, val)| !val.is_null())
        .map(|(key, val)| format!("{}: {}", key, format_minimal(val)))
        .unwrap_or_default()
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line(result: Value) -> String {
        match result {
            Value::Object(map) => headline(&map),
            other => format_minimal(&other),
        }
    }

    #[test]
    fn test_scenario_headline_is_verdict() {
        assert_eq!(line(json!({"hhi": {"pre": 1}, "risk": "High"})), "High");
        assert_eq!(line(json!({"verdict": "Low", "index": 0.3})), "Low");
    }

    #[test]
    fn test_structure_headline() {
        let r = json!({"structure": {}, "hhi": {"pre": 2050, "post": 2992, "delta": 942}});
        assert_eq!(line(r), "2050 -> 2992 (+942)");
    }

    #[test]
    fn test_forecast_headline() {
        assert_eq!(line(json!({"merger_date": "2024-06-01", "drift": 0.12345})), "0.1235");
        assert_eq!(
            line(json!({"merger_date": "2024-06-01", "drift": null})),
            "merger_date: 2024-06-01"
        );
    }
}
