// All LLM prompt constants for the Photoshoot Hub feature.

/// Concept prompt. Replace `{theme}` before sending.
pub const PHOTOSHOOT_CONCEPT_PROMPT_TEMPLATE: &str = r#"You are the creative director of a high-fashion male modeling agency. A client has supplied a theme and needs a complete photoshoot concept built around it.

Theme: "{theme}"

Develop each of the following with vivid, specific ideas:
1. Mood & Art Direction: the feeling of the shoot and its visual language.
2. Location & Scenery: where it is shot and what surrounds the model.
3. Styling & Wardrobe: exactly what the model wears, down to garment types and cuts.
4. Props: the objects that belong in the frame."#;

/// Image prompt built from the theme and the generated concept. Fixed sentence form.
pub const IMAGE_PROMPT_TEMPLATE: &str = r#"A high-fashion, award-winning photograph of a male model. The theme is "{theme}". Mood: {mood}. Location: {location}. Styling: {styling}."#;
