/// JSON shape the model is asked to reply with.
pub const RESPONSE_SHAPE: &str = r#"{"location": "<place name>", "facts": [{"title": "<short title>", "description": "<two or three sentences>", "imageUrl": "<URL of a representative image>", "url": "<URL of a source page>", "latitude": <decimal degrees>, "longitude": <decimal degrees>}]}"#;

/// Build the generation prompt for a place.
///
/// The same place and count always produce the same prompt.
pub fn build_prompt(place: &str, min_facts: u32) -> String {
    format!(
        "You are a knowledgeable local guide. The user is currently at: {place}.\n\
         List at least {min_facts} interesting facts about this place and its immediate \
         surroundings: history, landmarks, culture, nature and notable events.\n\
         Reply with a single JSON object and nothing else, no text before or after it \
         and no Markdown code fences. Use exactly this shape:\n\
         {RESPONSE_SHAPE}\n\
         Every fact must have string values for title, description and imageUrl. \
         Use an empty string when no image is known. \
         latitude and longitude must be numbers giving the location the fact refers to.",
        place = place.trim(),
        min_facts = min_facts,
    )
}
