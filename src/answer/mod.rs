
use anyhow::Result;
use tracing::debug;

/// Sentence the model is told to emit when the context has no answer
pub const FALLBACK_ANSWER: &str = "answer is not available in the context";

const INSTRUCTIONS: &str = "Answer the question as detailed as possible from the provided context, \
make sure to provide all the details, if the answer is not in\nprovided context just say, \
\"answer is not available in the context\", don't provide the wrong answer";

/// Produces a completion for a fully rendered prompt
pub trait Completer: Send + Sync {
    fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;
}

/// Fill the question-answering template with retrieved context
#[inline]
pub fn build_prompt<S: AsRef<str>>(context_chunks: &[S], question: &str) -> String {
    let context = context_chunks
        .iter()
        .map(|chunk| chunk.as_ref())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{INSTRUCTIONS}\n\nContext:\n {context}?\n\nQuestion:\n{question}\n\nAnswer:\n")
}

/// Stateless single-turn answer generation over retrieved chunks
#[derive(Debug, Clone)]
pub struct AnswerGenerator<C> {
    completer: C,
    temperature: f32,
}

impl<C: Completer> AnswerGenerator<C> {
    #[inline]
    pub fn new(completer: C, temperature: f32) -> Self {
        Self {
            completer,
            temperature,
        }
    }

    #[inline]
    pub fn completer(&self) -> &C {
        &self.completer
    }

    #[inline]
    pub fn generate<S: AsRef<str>>(&self, context_chunks: &[S], question: &str) -> Result<String> {
        let prompt = build_prompt(context_chunks, question);
        debug!(
            "Generating answer from {} context chunks (prompt length: {})",
            context_chunks.len(),
            prompt.len()
        );

        let answer = self.completer.complete(&prompt, self.temperature)?;
        Ok(answer.trim().to_string())
    }
}
