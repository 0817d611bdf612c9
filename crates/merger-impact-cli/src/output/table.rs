use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Series columns in display order.
const SERIES_COLUMNS: [&str; 5] = ["labels", "observed", "predicted", "ci_low", "ci_high"];

/// Format output as tables using the tabled crate.
///
/// Nested result objects (hhi, welfare, policy, ...) are flattened into
/// dotted field names; a `series` block gets its own per-date table.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => print_result(result, map),
            _ => print_fields(map),
        },
        Value::Array(arr) => print_rows(arr),
        _ => println!("{}", value),
    }
}

fn print_result(result: &Map<String, Value>, envelope: &Map<String, Value>) {
    let mut summary = Map::new();
    for (key, val) in result {
        if key == "series" {
            continue;
        }
        flatten_into(&mut summary, key, val);
    }
    print_fields(&summary);

    if let Some(Value::Object(series)) = result.get("series") {
        println!();
        print_series(series);
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// `{"hhi": {"pre": 1}}` becomes `hhi.pre = 1`. Arrays stay whole.
fn flatten_into(out: &mut Map<String, Value>, prefix: &str, value: &Value) {
    match value {
        Value::Object(inner) => {
            for (k, v) in inner {
                flatten_into(out, &format!("{}.{}", prefix, k), v);
            }
        }
        _ => {
            out.insert(prefix.to_string(), value.clone());
        }
    }
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_series(series: &Map<String, Value>) {
    let Some(Value::Array(dates)) = series.get("dates") else {
        return;
    };
    let mut header = vec!["date".to_string()];
    let columns: Vec<(&str, &Vec<Value>)> = SERIES_COLUMNS
        .iter()
        .filter_map(|name| match series.get(*name) {
            Some(Value::Array(col)) => Some((*name, col)),
            _ => None,
        })
        .collect();
    header.extend(columns.iter().map(|(name, _)| name.to_string()));

    let mut builder = Builder::default();
    builder.push_record(header);
    for (i, date) in dates.iter().enumerate() {
        let mut row = vec![format_value(date)];
        for (_, col) in &columns {
            row.push(col.get(i).map(format_cell).unwrap_or_default());
        }
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);
        for map in arr.iter().filter_map(Value::as_object) {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

/// Series cell: numbers to 4 dp, missing values blank.
fn format_cell(value: &Value) -> String {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(|f| format!("{:.4}", f))
            .unwrap_or_else(|| n.to_string()),
        Value::Null => String::new(),
        other => format_value(other),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
