use serde_json::{Map, Value};
use std::io;

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// A result carrying a `series` block is written one row per date, which is
/// the shape spreadsheet users want for charting. Other results are written
/// as field/value pairs with nested objects flattened to dotted names.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => match result.get("series") {
                Some(Value::Object(series)) => write_series(&mut wtr, series),
                _ => write_fields(&mut wtr, result),
            },
            _ => write_fields(&mut wtr, map),
        },
        Value::Array(arr) => write_rows(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_series(wtr: &mut StdoutWriter<'_>, series: &Map<String, Value>) {
    let columns = ["dates", "labels", "observed", "predicted", "ci_low", "ci_high"];
    let _ = wtr.write_record(["date", "label", "observed", "predicted", "ci_low", "ci_high"]);
    let len = series
        .get("dates")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    for i in 0..len {
        let row: Vec<String> = columns
            .iter()
            .map(|c| {
                series
                    .get(*c)
                    .and_then(Value::as_array)
                    .and_then(|col| col.get(i))
                    .map(format_csv_value)
                    .unwrap_or_default()
            })
            .collect();
        let _ = wtr.write_record(&row);
    }
}

fn write_fields(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        write_field(wtr, key, val);
    }
}

fn write_field(wtr: &mut StdoutWriter<'_>, key: &str, value: &Value) {
    if let Value::Object(inner) = value {
        for (k, v) in inner {
            write_field(wtr, &format!("{}.{}", key, k), v);
        }
    } else {
        let _ = wtr.write_record([key, &format_csv_value(value)]);
    }
}

fn write_rows(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
        return;
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let _ = wtr.write_record(&headers);
    for map in arr.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&row);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
