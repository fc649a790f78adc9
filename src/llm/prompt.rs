pub const CLASSIFY_SYSTEM: &str = r#"You classify user queries. Answer strictly with YES or NO.
Is the user asking about a destination (city/place) or travel-related info about a specific location?
Examples considered YES: weather in Paris, events in Tokyo, tell me about New York.
Examples considered NO: math questions, coding help, generic chit-chat, unrelated tasks.
Answer only YES or NO."#;

pub const EXTRACT_LOCATION_SYSTEM: &str = r#"Extract the location from the user's query. Return only the location name in the format "City, Country" or "City, State, Country".
If no clear location is mentioned, return "Unknown".
Examples:
- "What's the weather in Paris?" -> "Paris, France"
- "Tell me about New York" -> "New York, USA"
- "What's happening in Tokyo tonight?" -> "Tokyo, Japan"
- "How's the weather?" -> "Unknown""#;

pub const CHAT_SYSTEM: &str =
    "You are a concise helpful assistant. Answer the user's question directly.";

pub const REPORT_SYSTEM: &str = r#"You are a travel and destination expert. Create a comprehensive markdown report about a destination using only the provided information.

Format your response as a well-structured markdown document with:
- A title naming the destination
- A short summary
- Weather with current conditions and recommendations
- Local time and timezone
- Recent news highlights
- Upcoming events and activities
- Practical tips based on the weather and local conditions

Rules:
- Every section listed in the information must appear in the report.
- When a section is marked unavailable, say so plainly in that section. Do not invent data for it.
- Keep it informative but conversational."#;

/// User turn for report rendering. `context` is the plain-text report.
pub fn report_request(intent: &str, context: &str) -> String {
    format!(
        r#"Query type: {intent}

Create a destination report using this information:

{context}

Make it useful for someone planning to visit or currently in this location."#
    )
}

/// Interpret a YES/NO classification answer by its first word. `None` when
/// that word is neither.
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    let first_word = answer
        .split(|c: char| !c.is_alphanumeric())
        .find(|word| !word.is_empty())?
        .to_ascii_lowercase();
    match first_word.as_str() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

/// Clean an extracted location. `None` for empty or "Unknown" answers.
pub fn parse_location(answer: &str) -> Option<String> {
    let location = answer
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c.is_whitespace());
    if location.is_empty() || location.eq_ignore_ascii_case("unknown") {
        None
    } else {
        Some(location.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yes_no() {
        assert_eq!(parse_yes_no("YES"), Some(true));
        assert_eq!(parse_yes_no("  yes."), Some(true));
        assert_eq!(parse_yes_no("No"), Some(false));
        assert_eq!(parse_yes_no("**NO**"), Some(false));
        assert_eq!(parse_yes_no("No, it is a math question"), Some(false));
        assert_eq!(parse_yes_no("Maybe"), None);
        assert_eq!(parse_yes_no(""), None);
        assert_eq!(parse_yes_no("Not sure"), None);
        assert_eq!(parse_yes_no("None of the above"), None);
        assert_eq!(parse_yes_no("Nobody can tell"), None);
        assert_eq!(parse_yes_no("Yesterday it was"), None);
    }

    #[test]
    fn test_parse_location() {
        assert_eq!(parse_location("\"Paris, France\""), Some("Paris, France".to_string()));
        assert_eq!(parse_location("Tokyo, Japan."), Some("Tokyo, Japan".to_string()));
        assert_eq!(parse_location("Unknown"), None);
        assert_eq!(parse_location("  "), None);
    }

    #[test]
    fn test_report_request_embeds_context() {
        let text = report_request("DESTINATION_QUERY", "Location: Paris");
        assert!(text.contains("Query type: DESTINATION_QUERY"));
        assert!(text.contains("Location: Paris"));
    }
}
