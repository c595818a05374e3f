//! AI collaborator boundary.
//!
//! [`AiAssistant`] is what the editor calls. [`PromptedAssistant`] implements
//! it over any raw [`LanguageModel`] by building prompts and parsing replies,
//! so a provider integration only has to move strings and image bytes.

use std::future::Future;

use serde::de::DeserializeOwned;

use crate::error::AiError;
use crate::media;
use crate::outline::{self, FirstDraft, OutlineItem};

/// Fixed set of rewrite tones offered in the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    Professional,
    Casual,
    Witty,
    Confident,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Professional, Tone::Casual, Tone::Witty, Tone::Confident];

    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Witty => "witty",
            Tone::Confident => "confident",
        }
    }
}

/// Operations the editor asks of the AI service. Each is a single request/response.
pub trait AiAssistant {
    fn improve_text(&self, text: &str) -> impl Future<Output = Result<String, AiError>>;

    fn change_tone(&self, text: &str, tone: Tone) -> impl Future<Output = Result<String, AiError>>;

    fn summarize_selection(&self, text: &str) -> impl Future<Output = Result<String, AiError>>;

    fn generate_outline(&self, topic: &str) -> impl Future<Output = Result<Vec<OutlineItem>, AiError>>;

    fn generate_first_draft(&self, topic: &str) -> impl Future<Output = Result<FirstDraft, AiError>>;

    fn generate_meta_description(
        &self,
        title: &str,
        content_html: &str,
    ) -> impl Future<Output = Result<String, AiError>>;

    fn content_suggestions(
        &self,
        title: &str,
        content_html: &str,
    ) -> impl Future<Output = Result<Vec<String>, AiError>>;

    /// A `data:` URI, or `None` when nothing was generated.
    fn generate_featured_image(&self, prompt: &str) -> impl Future<Output = Result<Option<String>, AiError>>;

    /// Shareable quote-card image for a short selection.
    fn generate_text_image(&self, text: &str) -> impl Future<Output = Result<Option<String>, AiError>>;
}

/// Per-request knobs passed through to the model.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    /// Ask for a JSON response body.
    pub json: bool,
}

impl GenerationOptions {
    fn temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            json: false,
        }
    }

    fn json(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            json: true,
        }
    }
}

/// A raw text and image model.
pub trait LanguageModel {
    fn generate_text(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> impl Future<Output = Result<String, AiError>>;

    /// JPEG bytes of the first generated image, if any.
    fn generate_image(&self, prompt: &str) -> impl Future<Output = Result<Option<Vec<u8>>, AiError>>;
}

/// Pull a JSON value out of a model reply, tolerating a Markdown code fence.
pub fn parse_json_from_text<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        if let Some(inner) = rest.strip_suffix("```") {
            // Drop an info string like `json` on the opening fence.
            let inner = match inner.find('\n') {
                Some(nl) if inner[..nl].chars().all(|c| c.is_ascii_alphanumeric()) => &inner[nl + 1..],
                _ => inner,
            };
            body = inner.trim();
        }
    }
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!(error = %e, len = text.len(), "model returned invalid json");
        AiError::InvalidResponse("Invalid JSON response from AI.".into())
    })
}

/// Tags become spaces, whitespace runs collapse.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Prompt text for each operation.
pub mod prompts {
    use super::Tone;

    pub fn improve(text: &str) -> String {
        format!(
            "You are an expert editor. Review the following text and improve it for clarity, grammar, flow, and impact, while preserving the original meaning. Return only the improved text, with no commentary or quotation marks.\n\nOriginal text: \"{text}\"\n\nImproved text:"
        )
    }

    pub fn change_tone(text: &str, tone: Tone) -> String {
        let tone = tone.as_str();
        format!(
            "You are a master of tone. Rewrite the following text in a {tone} tone. Keep the core message intact. Return only the rewritten text, with no commentary or quotation marks.\n\nOriginal text: \"{text}\"\n\nRewritten text in a {tone} tone:"
        )
    }

    pub fn summarize(text: &str) -> String {
        format!(
            "Summarize the following text into one or two concise sentences. Capture the main point effectively. Return only the summary text, with no commentary.\n\nOriginal text: \"{text}\"\n\nSummary:"
        )
    }

    pub fn outline(topic: &str) -> String {
        format!(
            "Generate a structured blog post outline for the topic: \"{topic}\".\nThe outline should include main sections (as 'h2'), potential sub-sections (as 'h3' or 'h4'), and key bullet points (as 'point') under them.\nReturn the outline as a JSON array of objects. Each object must have a 'type' (string: 'h2', 'h3', 'h4', or 'point') and a 'text' (string) property.\nNested items should be in a 'children' array of similar objects. Ensure the entire response is a single valid JSON array."
        )
    }

    pub fn first_draft(topic: &str) -> String {
        format!(
            "Generate a complete blog post draft based on the topic: \"{topic}\".\nThe response must be a single, valid JSON object with two keys: \"title\" and \"content\".\n- The \"title\" should be a creative and engaging blog post title.\n- The \"content\" should be well-structured HTML for a blog post. It must include an introductory paragraph, at least two main sections using <h2> tags, with each section containing paragraphs (<p>) and potentially sub-headings (<h3>) or unordered lists (<ul><li>...</li></ul>). Conclude with a summary paragraph.\nDo not include <html>, <head>, or <body> tags."
        )
    }

    pub fn meta_description(title: &str, plain_content: &str) -> String {
        format!(
            "Based on the following blog post title and content, generate a concise, SEO-friendly meta description. The description should be a single, compelling sentence or two, around 150-160 characters long.\nTitle: \"{title}\"\nContent: \"{plain_content}\"\nReturn only the meta description text, with no extra formatting or labels."
        )
    }

    pub fn suggestions(title: &str, plain_content: &str) -> String {
        format!(
            "Provide 3 brief content suggestions or continuations based on the blog title/topic: \"{title}\" and optionally the existing content snippet: \"{plain_content}\". Each suggestion should be a single sentence or a short phrase, suitable for direct insertion as a new paragraph or idea. Format as a JSON array of strings.\nSuggestions:"
        )
    }

    pub fn featured_image(theme: &str) -> String {
        format!(
            "Generate a visually appealing, high-quality featured image for a blog post. Theme/content: \"{theme}\". Style: cinematic, detailed, suitable for a blog header. Avoid text unless explicitly part of the theme."
        )
    }

    pub fn text_image(text: &str) -> String {
        format!(
            "Create a visually appealing image with the following text prominently and beautifully displayed on it: \"{text}\". The style should be modern, elegant, and highly shareable, suitable for social media quote cards. No additional text other than the quote itself."
        )
    }
}

/// [`AiAssistant`] over a raw model.
#[derive(Debug, Clone)]
pub struct PromptedAssistant<M> {
    model: M,
}

impl<M: LanguageModel> PromptedAssistant<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    async fn text(&self, prompt: String, options: GenerationOptions) -> Result<String, AiError> {
        let reply = self.model.generate_text(&prompt, options).await?;
        Ok(reply.trim().to_string())
    }

    async fn image(&self, prompt: String) -> Result<Option<String>, AiError> {
        let bytes = self.model.generate_image(&prompt).await?;
        Ok(bytes.map(|b| media::data_uri_with_mime("image/jpeg", &b)))
    }
}

impl<M: LanguageModel> AiAssistant for PromptedAssistant<M> {
    async fn improve_text(&self, text: &str) -> Result<String, AiError> {
        self.text(prompts::improve(text), GenerationOptions::temperature(0.5)).await
    }

    async fn change_tone(&self, text: &str, tone: Tone) -> Result<String, AiError> {
        self.text(prompts::change_tone(text, tone), GenerationOptions::temperature(0.8))
            .await
    }

    async fn summarize_selection(&self, text: &str) -> Result<String, AiError> {
        self.text(prompts::summarize(text), GenerationOptions::default()).await
    }

    async fn generate_outline(&self, topic: &str) -> Result<Vec<OutlineItem>, AiError> {
        let reply = self.text(prompts::outline(topic), GenerationOptions::json(0.5)).await?;
        let value: serde_json::Value = parse_json_from_text(&reply)?;
        outline::parse_outline(&value)
    }

    async fn generate_first_draft(&self, topic: &str) -> Result<FirstDraft, AiError> {
        let reply = self
            .text(prompts::first_draft(topic), GenerationOptions::json(0.7))
            .await?;
        parse_json_from_text(&reply)
    }

    async fn generate_meta_description(&self, title: &str, content_html: &str) -> Result<String, AiError> {
        let plain = strip_html(content_html);
        let prompt = prompts::meta_description(title, truncate_chars(&plain, 1500));
        let reply = self.text(prompt, GenerationOptions::default()).await?;
        Ok(reply.replace('"', "").trim().to_string())
    }

    async fn content_suggestions(&self, title: &str, content_html: &str) -> Result<Vec<String>, AiError> {
        let plain = strip_html(content_html);
        let prompt = prompts::suggestions(title, truncate_chars(&plain, 500));
        let reply = self.text(prompt, GenerationOptions::json(0.7)).await?;
        parse_json_from_text(&reply)
    }

    async fn generate_featured_image(&self, prompt: &str) -> Result<Option<String>, AiError> {
        // Featured images are optional; a failed generation is just "no image".
        match self.image(prompts::featured_image(prompt)).await {
            Ok(image) => Ok(image),
            Err(e) => {
                tracing::warn!(error = %e, "featured image generation failed");
                Ok(None)
            }
        }
    }

    async fn generate_text_image(&self, text: &str) -> Result<Option<String>, AiError> {
        self.image(prompts::text_image(text)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct CannedModel {
        replies: RefCell<VecDeque<Result<String, AiError>>>,
        prompts: RefCell<Vec<(String, GenerationOptions)>>,
        image: Option<Vec<u8>>,
    }

    impl CannedModel {
        fn replying(reply: &str) -> Self {
            let model = Self::default();
            model.replies.borrow_mut().push_back(Ok(reply.to_string()));
            model
        }
    }

    impl LanguageModel for CannedModel {
        async fn generate_text(&self, prompt: &str, options: GenerationOptions) -> Result<String, AiError> {
            self.prompts.borrow_mut().push((prompt.to_string(), options));
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(AiError::Empty))
        }

        async fn generate_image(&self, _prompt: &str) -> Result<Option<Vec<u8>>, AiError> {
            match &self.image {
                Some(bytes) => Ok(Some(bytes.clone())),
                None => Err(AiError::Request("image model offline".into())),
            }
        }
    }

    #[test]
    fn test_parse_json_from_fenced_text() {
        let fenced = "```json\n[\"a\", \"b\"]\n```";
        let parsed: Vec<String> = parse_json_from_text(fenced).unwrap();
        assert_eq!(parsed, ["a", "b"]);
        let bare: Vec<String> = parse_json_from_text("  [\"c\"] ").unwrap();
        assert_eq!(bare, ["c"]);
        let err = parse_json_from_text::<Vec<String>>("not json").unwrap_err();
        assert_eq!(err, AiError::InvalidResponse("Invalid JSON response from AI.".into()));
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<h2>Title</h2><p>Some   <b>bold</b>\ntext</p>"), "Title Some bold text");
        assert_eq!(strip_html(""), "");
    }

    #[tokio::test]
    async fn test_change_tone_prompt_and_trim() {
        let assistant = PromptedAssistant::new(CannedModel::replying("  Hey there!  "));
        let out = assistant.change_tone("Hello.", Tone::Casual).await.unwrap();
        assert_eq!(out, "Hey there!");
        let prompts = assistant.model().prompts.borrow();
        assert!(prompts[0].0.contains("in a casual tone"));
        assert_eq!(prompts[0].1.temperature, Some(0.8));
    }

    #[tokio::test]
    async fn test_outline_validation() {
        let assistant = PromptedAssistant::new(CannedModel::replying(
            r#"```json
[{"type":"h2","text":"Why","children":[{"type":"point","text":"Speed"}]}]
```"#,
        ));
        let outline = assistant.generate_outline("rust").await.unwrap();
        assert_eq!(outline[0].children[0].text, "Speed");

        let assistant = PromptedAssistant::new(CannedModel::replying(r#"[{"title":"nope"}]"#));
        assert_eq!(assistant.generate_outline("rust").await, Err(AiError::InvalidOutline));
    }

    #[tokio::test]
    async fn test_meta_description_strips_quotes() {
        let assistant = PromptedAssistant::new(CannedModel::replying("\"A short \"summary\".\""));
        let meta = assistant
            .generate_meta_description("T", "<p>body</p>")
            .await
            .unwrap();
        assert_eq!(meta, "A short summary.");
    }

    #[tokio::test]
    async fn test_featured_image_failure_is_none() {
        let assistant = PromptedAssistant::new(CannedModel::default());
        assert_eq!(assistant.generate_featured_image("T").await, Ok(None));

        let assistant = PromptedAssistant::new(CannedModel {
            image: Some(b"abc".to_vec()),
            ..Default::default()
        });
        assert_eq!(
            assistant.generate_featured_image("T").await.unwrap().as_deref(),
            Some("data:image/jpeg;base64,YWJj")
        );
    }
}
