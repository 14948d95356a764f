//! Prompt construction for the summarization request.

use serde::Serialize;

use crate::models::{Corpus, Paper};

/// Token in a template that is replaced by the search topic
pub const TOPIC_PLACEHOLDER: &str = "{{topic}}";

/// Template used until the user saves their own
pub const DEFAULT_PROMPT: &str = concat!(
    "Provide a comprehensive summary of the recent developments in {{topic}} based on the following articles. \n",
    "\n",
    "Include key trends, findings, and significant advancements. \n",
    "\n",
    "Present the summary in HTML format, with hyperlinks to the articles. \n",
    "\n",
    "Highlight complex or less commonly understood technical terms, proteins, cell types, or pathways using ",
    "<span class=\"wiki-link\" data-explanation=\"explanation_here\"></span> tags, and provide brief explanations for them.  \n",
    "\n",
    "Use cards formatting and other html tools to make the article elegant and modern. keep different sections in different cards.\n",
    "\n",
    "Write in an entertaining manner, concise and to the point. \n",
    "\n",
    "only reply with the HTML code with no comments before or after.\n",
    "\n",
    "Start with a general overview of what is happening in the field in no more than one or two paragraphs. ",
    "Keep it highly specific to latest developments.",
);

/// The two messages sent to the chat-completion endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptRequest {
    /// Template with the topic substituted
    pub system_prompt: String,
    /// Serialized corpus
    pub user_content: String,
}

/// Build the request from a template, the topic and the corpus.
///
/// Only the first placeholder is substituted. Paper fields are inserted as-is;
/// titles and abstracts that already carry markup reach the model unchanged.
pub fn compose(template: &str, topic: &str, corpus: &Corpus) -> PromptRequest {
    let system_prompt = template.replacen(TOPIC_PLACEHOLDER, topic, 1);
    let user_content = corpus.iter().map(format_paper).collect::<String>();

    tracing::debug!(
        papers = corpus.len(),
        user_bytes = user_content.len(),
        "composed prompt"
    );

    PromptRequest {
        system_prompt,
        user_content,
    }
}

/// Markup snippet for one paper
pub fn format_paper(paper: &Paper) -> String {
    format!(
        "<div class=\"article\">\n    <h3><a href=\"{}\" target=\"_blank\">{}</a></h3>\n    <p><strong>Abstract:</strong> {}</p>\n</div>\n",
        paper.url, paper.title, paper.r#abstract
    )
}
