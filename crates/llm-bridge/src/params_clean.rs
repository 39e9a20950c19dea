use serde_json::Value;

/// Fields the LLM is trusted to return verbatim; everything else gets
/// stripped of non-alphanumeric noise (quotes, trailing particles, stray
/// punctuation the model sometimes appends to a bare value).
const RESERVED_KEYS: &[&str] = &["date", "date_from", "date_to", "metrics", "market", "tickers", "rank_n"];

fn strip_alnum(value: &Value) -> Value {
    match value {
        Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '-').collect();
            if !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit()) {
                cleaned
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or(Value::String(cleaned))
            } else {
                Value::String(cleaned)
            }
        }
        Value::Array(items) => Value::Array(items.iter().map(strip_alnum).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), strip_alnum(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Applies `strip_alnum` to every field of `data` except the reserved keys,
/// which are passed through untouched (dates, market codes, ticker names
/// and metric identifiers already come back in a trusted shape).
pub fn clean_params(data: &Value) -> Value {
    let Value::Object(map) = data else {
        return data.clone();
    };
    let cleaned = map
        .iter()
        .map(|(k, v)| {
            if RESERVED_KEYS.contains(&k.as_str()) {
                (k.clone(), v.clone())
            } else {
                (k.clone(), strip_alnum(v))
            }
        })
        .collect();
    Value::Object(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_non_alphanumeric_from_non_reserved_fields() {
        let data = json!({"window": "20일", "date": "2025-06-11!"});
        let cleaned = clean_params(&data);
        assert_eq!(cleaned["window"], 20);
        assert_eq!(cleaned["date"], "2025-06-11!");
    }

    #[test]
    fn leaves_non_numeric_strings_as_cleaned_text() {
        let data = json!({"band": "상단!!"});
        let cleaned = clean_params(&data);
        assert_eq!(cleaned["band"], "");
    }
}
