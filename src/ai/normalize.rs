//! Reply Normalization
//!
//! The single boundary where raw model text becomes typed domain values.
//! Providers return [`RawModelReply`](super::provider::RawModelReply) text;
//! everything downstream of this module works with `SceneUnderstanding`,
//! `WordInfo`, or `Vec<ConversationTheme>` and never re-parses model output.
//!
//! Handles the usual model output quirks:
//! - Markdown code fence wrapping (```json ... ```)
//! - Trailing commas
//! - JSON embedded in explanatory prose
//! - Wrapper objects around the expected array ({"themes": [...]})
//!
//! Every normalize function is total: unparsable input degrades to a typed
//! fallback instead of an error.

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{ConversationTheme, SceneUnderstanding, WordInfo, fallback_themes};

/// Normalize a scene-understanding reply.
///
/// Unparsable output keeps the raw text as the description so nothing the
/// model said is lost.
pub fn normalize_scene(raw: &str) -> SceneUnderstanding {
    match extract_json(raw).and_then(|v| serde_json::from_value(v).ok()) {
        Some(scene) => scene,
        None => {
            debug!("scene reply was not structured JSON, keeping raw text");
            SceneUnderstanding::from_raw_text(raw.trim())
        }
    }
}

/// Normalize a word-definition reply, filling missing fields from the
/// canned template so the result is always complete.
pub fn normalize_word(raw: &str, word: &str) -> WordInfo {
    let Some(value) = extract_json(raw) else {
        warn!(word, "word info reply unparsable, using fallback definition");
        return WordInfo::fallback(word);
    };

    let template = WordInfo::fallback(word);
    WordInfo {
        word: word.to_string(),
        definition: string_field(&value, &["definition"]).unwrap_or(template.definition),
        example_sentence: string_field(&value, &["example_sentence", "example"])
            .unwrap_or(template.example_sentence),
        pronunciation: string_field(&value, &["pronunciation", "pron"])
            .unwrap_or(template.pronunciation),
        part_of_speech: string_field(&value, &["part_of_speech", "pos"])
            .unwrap_or(template.part_of_speech),
    }
}

/// Normalize a theme-generation reply.
///
/// Accepts either a bare JSON array or a single-key wrapper object around
/// one (models frequently emit `{"themes": [...]}`). Anything else falls
/// back to the scene-keyed canned themes.
pub fn normalize_themes(raw: &str, scene: &str) -> Vec<ConversationTheme> {
    let parsed = extract_json(raw)
        .map(unwrap_single_key_array)
        .and_then(|v| serde_json::from_value::<Vec<ConversationTheme>>(v).ok())
        .filter(|themes| !themes.is_empty());

    match parsed {
        Some(mut themes) => {
            // Reissue ids so they are always 1-based and unique
            for (i, theme) in themes.iter_mut().enumerate() {
                theme.id = i as u32 + 1;
            }
            themes
        }
        None => {
            warn!(scene, "theme reply unparsable, using canned themes");
            fallback_themes(scene)
        }
    }
}

/// Normalize a free-text tutoring reply: strip fences and surrounding
/// whitespace, nothing more.
pub fn normalize_reply(raw: &str) -> String {
    strip_code_fences(raw.trim()).trim().to_string()
}

// =============================================================================
// JSON extraction
// =============================================================================

/// Best-effort JSON extraction from model output. Returns `None` when no
/// parsable JSON value can be found.
pub fn extract_json(raw: &str) -> Option<Value> {
    let cleaned = preprocess(raw);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Some(value);
    }

    let repaired = fix_trailing_commas(&cleaned);
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        debug!("model JSON repaired (trailing commas)");
        return Some(value);
    }

    if let Some(extracted) = extract_json_from_mixed(&cleaned)
        && let Ok(value) = serde_json::from_str::<Value>(&extracted)
    {
        debug!("model JSON extracted from mixed content");
        return Some(value);
    }

    None
}

fn preprocess(raw: &str) -> String {
    let s = raw.trim().trim_start_matches('\u{feff}');
    strip_code_fences(s).trim().to_string()
}

/// Strip a surrounding markdown code fence, with or without a language tag.
fn strip_code_fences(s: &str) -> String {
    let mut result = s.to_string();

    if result.starts_with("```")
        && let Some(first_newline) = result.find('\n')
    {
        result = result[first_newline + 1..].to_string();
    }

    if result.ends_with("```") {
        result = result[..result.len() - 3].trim_end().to_string();
    }

    result
}

/// Drop commas that directly precede a closing bracket or brace.
fn fix_trailing_commas(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let chars: Vec<char> = s.chars().collect();

    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == ']' || chars[j] == '}') {
                i += 1;
                continue;
            }
        }
        result.push(chars[i]);
        i += 1;
    }

    result
}

/// Find the first balanced JSON object or array inside prose.
fn extract_json_from_mixed(s: &str) -> Option<String> {
    let start = s.find(['{', '['])?;
    let open = s[start..].chars().next()?;
    let close = if open == '{' { '}' } else { ']' };

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in s[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            c if !in_string && c == open => depth += 1,
            c if !in_string && c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(s[start..start + i + 1].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// If `value` is an object with exactly one key whose value is an array,
/// unwrap to that array. Leaves everything else untouched.
fn unwrap_single_key_array(value: Value) -> Value {
    if let Value::Object(map) = &value
        && map.len() == 1
        && let Some(inner) = map.values().next()
        && inner.is_array()
    {
        return inner.clone();
    }
    value
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| value.get(k))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_from_plain_json() {
        let raw = r#"{"description": "A sunny kitchen", "objects": ["kettle", "mug"], "scene": "kitchen", "mood": "warm"}"#;
        let scene = normalize_scene(raw);
        assert_eq!(scene.scene, "kitchen");
        assert_eq!(scene.objects, vec!["kettle", "mug"]);
    }

    #[test]
    fn test_scene_fenced_equals_unfenced() {
        let plain = r#"{"description": "A desk", "objects": [], "scene": "office", "mood": "calm"}"#;
        let fenced = format!("```json\n{plain}\n```");
        assert_eq!(normalize_scene(plain), normalize_scene(&fenced));
    }

    #[test]
    fn test_scene_unparsable_keeps_raw_text() {
        let scene = normalize_scene("I see a lovely garden with flowers.");
        assert_eq!(scene.description, "I see a lovely garden with flowers.");
        assert_eq!(scene.scene, "unknown");
    }

    #[test]
    fn test_word_from_json_with_aliases() {
        let raw = r#"{"definition": "A red fruit", "example": "An apple a day.", "pron": "/ˈæp.əl/", "pos": "noun"}"#;
        let info = normalize_word(raw, "apple");
        assert_eq!(info.word, "apple");
        assert_eq!(info.definition, "A red fruit");
        assert_eq!(info.example_sentence, "An apple a day.");
        assert_eq!(info.pronunciation, "/ˈæp.əl/");
    }

    #[test]
    fn test_word_unparsable_falls_back_with_word() {
        let info = normalize_word("not json", "apple");
        assert_eq!(info, WordInfo::fallback("apple"));
        assert!(info.example_sentence.contains("apple"));
    }

    #[test]
    fn test_word_partial_json_fills_missing_fields() {
        let info = normalize_word(r#"{"definition": "A red fruit"}"#, "apple");
        assert_eq!(info.definition, "A red fruit");
        assert_eq!(info.pronunciation, "/apple/");
        assert_eq!(info.part_of_speech, "noun");
    }

    #[test]
    fn test_themes_bare_array() {
        let raw = r#"[{"title": "Cooking Class", "role": "Chef"}, {"title": "Market Visit"}]"#;
        let themes = normalize_themes(raw, "kitchen");
        assert_eq!(themes.len(), 2);
        assert_eq!(themes[0].id, 1);
        assert_eq!(themes[1].id, 2);
        assert_eq!(themes[1].role, "Teacher");
    }

    #[test]
    fn test_themes_single_key_wrapper_unwrapped() {
        let raw = r#"{"themes": [{"title": "Cooking Class", "role": "Chef"}]}"#;
        let themes = normalize_themes(raw, "kitchen");
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].title, "Cooking Class");
    }

    #[test]
    fn test_themes_garbage_uses_scene_keyed_fallback() {
        let themes = normalize_themes("no json here", "kitchen countertop");
        assert_eq!(themes.len(), 4);
        assert_eq!(themes[0].role, "Chef");
    }

    #[test]
    fn test_themes_empty_array_uses_fallback() {
        let themes = normalize_themes("[]", "city street");
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].role, "Teacher");
    }

    #[test]
    fn test_reply_strips_fences_and_whitespace() {
        assert_eq!(normalize_reply("  hello there  "), "hello there");
        assert_eq!(normalize_reply("```\nhello\n```"), "hello");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = r#"{"description": "A desk", "scene": "office", "mood": "calm"}"#;
        let once = normalize_scene(raw);
        let again = normalize_scene(&serde_json::to_string(&once).unwrap());
        assert_eq!(once, again);
    }

    #[test]
    fn test_extract_from_prose() {
        let raw = "Sure! Here is the result:\n{\"description\": \"A cat\"}\nHope that helps.";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["description"], "A cat");
    }

    #[test]
    fn test_trailing_comma_repaired() {
        let value = extract_json(r#"{"objects": ["a", "b",],}"#).unwrap();
        assert_eq!(value["objects"][1], "b");
    }
}
