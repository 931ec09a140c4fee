use crate::{LoreService, search::RetrievedPassage};

pub(crate) const NO_CONTEXT_ANSWER: &str =
	"No relevant documents were found in the selected workspaces. Upload documents before asking questions.";
const FALLBACK_PREAMBLE: &str =
	"Answer generation is temporarily unavailable. The most relevant passages are:";
const SYSTEM_PROMPT: &str = "You are a question-answering assistant for shared knowledge bases. \
Answer using only the provided context. If the context does not contain the answer, say so \
plainly. Be accurate and concise.";
const PASSAGE_SEPARATOR: &str = "\n\n---\n\n";
const ELLIPSIS: &str = "...";

impl LoreService {
	/// Never fails: a model error or timeout degrades to [`fallback_answer`], which is pure text
	/// formatting over the already-retrieved passages.
	pub(crate) async fn generate_answer(
		&self,
		passages: &[RetrievedPassage],
		question: &str,
	) -> String {
		if passages.is_empty() {
			return NO_CONTEXT_ANSWER.to_string();
		}

		let context = format_context(passages);
		let user_prompt = format!("Context:\n{context}\n\nQuestion: {question}");

		match self
			.providers
			.completion
			.complete(&self.cfg.providers.llm, SYSTEM_PROMPT, &user_prompt)
			.await
		{
			Ok(answer) => answer,
			Err(err) => {
				tracing::warn!(error = %err, "Answer generation degraded to the extractive fallback.");

				fallback_answer(
					passages,
					self.cfg.retrieval.fallback_passages as usize,
					self.cfg.retrieval.fallback_preview_chars as usize,
				)
			},
		}
	}
}

pub(crate) fn format_context(passages: &[RetrievedPassage]) -> String {
	passages
		.iter()
		.map(|passage| passage.content.as_str())
		.collect::<Vec<_>>()
		.join(PASSAGE_SEPARATOR)
}

/// Deterministic extractive fallback: a numbered list of the first few passages, truncated. No
/// network, no model.
pub(crate) fn fallback_answer(
	passages: &[RetrievedPassage],
	max_passages: usize,
	preview_chars: usize,
) -> String {
	let mut out = String::from(FALLBACK_PREAMBLE);

	for (idx, passage) in passages.iter().take(max_passages.max(1)).enumerate() {
		out.push('\n');
		out.push_str(&format!(
			"{}. {}",
			idx + 1,
			truncate_preview(&passage.content, preview_chars)
		));
	}

	out
}

pub(crate) fn truncate_preview(text: &str, max_chars: usize) -> String {
	let mut chars = text.char_indices();

	match chars.nth(max_chars) {
		Some((idx, _)) => format!("{}{ELLIPSIS}", &text[..idx]),
		None => text.to_string(),
	}
}
