/// Wraps a raw description in the marketing photography template sent to the
/// provider.
pub fn enhance_prompt(description: &str, business_name: &str) -> String {
    format!(
        "Create a professional, high-quality marketing image for \"{business_name}\". {description}.\n\
         Style: Modern, clean, commercial photography style. High resolution, good lighting, appealing composition.\n\
         Suitable for social media marketing. No text or logos in the image."
    )
}

pub fn mock_prompt(description: &str) -> String {
    format!("Mock generation for: {description}")
}
