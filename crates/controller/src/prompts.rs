//! Prompt set shared by the skill handlers.

use doc_agent_core::{template::PromptTemplates, Result};

pub const GENERAL_SYSTEM: &str = "general_system";
pub const GENERAL_USER: &str = "general_user";
pub const DOCUMENT_SYSTEM: &str = "document_system";
pub const DOCUMENT_USER: &str = "document_user";
pub const TITLE_SYSTEM: &str = "title_system";
pub const WEB_SEARCH_SYSTEM: &str = "web_search_system";
pub const WEB_SEARCH_USER: &str = "web_search_user";
pub const URL_SYSTEM: &str = "url_system";
pub const URL_USER: &str = "url_user";
pub const KNOWLEDGE_SYSTEM: &str = "knowledge_system";
pub const KNOWLEDGE_USER: &str = "knowledge_user";

const TEMPLATES: &[(&str, &str)] = &[
    (
        GENERAL_SYSTEM,
        "You are {{ agent_name }}, a helpful assistant. Answer clearly and concisely. \
Reply in the language the user writes in.\
{% if degraded_from %}\n\nThe {{ degraded_from }} capability is unavailable right now, so answer \
from your own knowledge and say briefly that live results could not be fetched.{% endif %}",
    ),
    (
        GENERAL_USER,
        "{% if context %}Context:\n{% for key, value in context %}- {{ key }}: {{ value }}\n{% endfor %}\n{% endif %}\
{{ question }}",
    ),
    (
        DOCUMENT_SYSTEM,
        "You are an expert document writer. Create a comprehensive, well-structured document that \
directly answers the user's request.\n\n\
{% if format == \"html\" %}Return a complete HTML5 document: <!DOCTYPE html>, <html>, <head> with a \
descriptive <title> and a <style> block, and a <body> using semantic elements (header, main, section) \
and a proper heading hierarchy.\
{% elif format == \"markdown\" %}Return Markdown only: a heading hierarchy (#, ##, ###), lists, tables \
and fenced code blocks with a language tag where useful.\
{% else %}Return plain text with short titled sections.{% endif %}\n\
Do not wrap the answer in a code fence.",
    ),
    (
        DOCUMENT_USER,
        "Please create a comprehensive document that answers the following request:\n\n{{ question }}\
{% if context %}\n\nAdditional context:\n{% for key, value in context %}- {{ key }}: {{ value }}\n{% endfor %}{% endif %}",
    ),
    (
        TITLE_SYSTEM,
        "Generate a concise, descriptive title of at most 10 words for a document answering the \
following request. Respond with the title only.",
    ),
    (
        WEB_SEARCH_SYSTEM,
        "You summarize web search results. Combine the results into a direct answer, cite sources \
inline as [n] using the result numbers, and prefer recent and reliable sources. Do not invent sources.",
    ),
    (
        WEB_SEARCH_USER,
        "Search query: {{ query }}\n\nResults:\n{% for r in results %}[{{ loop.index }}] {{ r.title }}\n\
URL: {{ r.url }}\n{{ r.snippet }}\n\n{% endfor %}Answer the query using these results.",
    ),
    (
        URL_SYSTEM,
        "You answer questions about a web page using only the provided summary of its content. \
Mark anything the summary does not support as uncertain.",
    ),
    (
        URL_USER,
        "Page: {{ url }}\n\nPage summary:\n{{ summary }}\n\nQuestion: {{ question }}",
    ),
    (
        KNOWLEDGE_SYSTEM,
        "You are {{ agent_name }}. Answer questions about yourself using the reference notes below. \
Explain your capabilities concretely and include usage examples where they help.",
    ),
    (
        KNOWLEDGE_USER,
        "Reference notes:\n{% if hits %}{% for hit in hits %}- {{ hit.text }}\n{% endfor %}{% else %}(none found)\n{% endif %}\n\
Question: {{ question }}",
    ),
];

/// Load every handler prompt.
pub fn default_prompts() -> Result<PromptTemplates> {
    TEMPLATES
        .iter()
        .try_fold(PromptTemplates::new(), |templates, (name, source)| templates.with(name, source))
}
