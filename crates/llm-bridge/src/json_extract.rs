/// Extract the first balanced `{...}` object from free-form completion text
/// and parse it as JSON. Completion models routinely wrap their JSON answer
/// in prose or markdown fences; this scans past that instead of assuming
/// the whole response is JSON.
pub fn safe_json(text: &str) -> Option<serde_json::Value> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        let ch = byte as char;
        if in_string {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return serde_json::from_str(&text[start..end]).ok();
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_trailed_by_prose() {
        let text = r#"Sure, here it is: {"task": "simple_lookup", "n": 1} -- let me know if you need more."#;
        let value = safe_json(text).expect("parse");
        assert_eq!(value["task"], "simple_lookup");
    }

    #[test]
    fn returns_none_on_unbalanced_input() {
        assert!(safe_json("no json here").is_none());
        assert!(safe_json("{\"task\": \"unclosed\"").is_none());
    }

    #[test]
    fn handles_nested_objects() {
        let text = r#"{"best": "삼성전자", "meta": {"confidence": 0.9}}"#;
        let value = safe_json(text).unwrap();
        assert_eq!(value["meta"]["confidence"], 0.9);
    }
}
