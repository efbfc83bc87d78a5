use serde::de::DeserializeOwned;

/// Strip markdown code fences the model wraps around JSON.
pub fn clean_json(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Best-effort JSON decode of a model answer. Falls back to the outermost
/// `{…}` or `[…]` span when prose surrounds the payload.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    let cleaned = clean_json(text);
    if let Ok(value) = serde_json::from_str(&cleaned) {
        return Some(value);
    }
    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (cleaned.find(open), cleaned.rfind(close))
            && start < end
            && let Ok(value) = serde_json::from_str(&cleaned[start..=end])
        {
            return Some(value);
        }
    }
    tracing::debug!(len = text.len(), "model answer was not JSON");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fences_are_removed() {
        assert_eq!(clean_json("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(clean_json("  {}  "), "{}");
    }

    #[test]
    fn parses_payload_inside_prose() {
        let v: Vec<String> = parse_json("Here you go:\n[\"a\", \"b\"]\nGood luck.").unwrap();
        assert_eq!(v, vec!["a", "b"]);
        let o: serde_json::Value = parse_json("```json\n{\"type\":\"UNKNOWN\"}\n```").unwrap();
        assert_eq!(o["type"], "UNKNOWN");
    }

    #[test]
    fn garbage_is_none() {
        assert!(parse_json::<Vec<String>>("no json here").is_none());
        assert!(parse_json::<Vec<String>>("").is_none());
    }
}
