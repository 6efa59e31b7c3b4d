//! Answer synthesis over retrieved documents.
//!
//! The engine never calls the generator itself; this layer composes a
//! prompt from the fused search results and hands it to a
//! [`TextGenerator`]. `ExtractiveGenerator` stands in for an LLM-backed
//! client: it answers by quoting the retrieved passages verbatim, which
//! keeps the command runnable offline and deterministic.

use rankfuse_core::hybrid::RankedResult;
use rankfuse_core::providers::TextGenerator;
use rankfuse_core::Result;

pub fn build_prompt(query: &str, results: &[RankedResult]) -> String {
    let mut prompt = String::new();
    prompt.push_str("Answer the question using only the documents below.\n\n");
    for r in results {
        prompt.push_str(&format!("## {}\n{}\n\n", r.title, r.description));
    }
    prompt.push_str(&format!("Question: {query}\n"));
    prompt
}

#[derive(Debug, Default)]
pub struct ExtractiveGenerator;

impl TextGenerator for ExtractiveGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        // Echo the document sections back as the "answer": every heading
        // and body line between the instruction and the question.
        let mut lines = Vec::new();
        for line in prompt.lines() {
            if line.starts_with("Question:") {
                break;
            }
            if line.starts_with("## ") {
                lines.push(format!("From {}:", &line[3..]));
            } else if !line.trim().is_empty() && !line.starts_with("Answer the question") {
                lines.push(format!("  {line}"));
            }
        }
        if lines.is_empty() {
            return Ok("No supporting documents were retrieved.".to_string());
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, description: &str) -> RankedResult {
        RankedResult {
            doc_id: 1,
            keyword_score: 1.0,
            semantic_score: 1.0,
            fused_score: 2.0,
            title: title.into(),
            description: description.into(),
        }
    }

    #[test]
    fn prompt_contains_query_and_documents() {
        let prompt = build_prompt("who attacks?", &[result("Bear Attack", "A bear attacks.")]);
        assert!(prompt.contains("## Bear Attack"));
        assert!(prompt.contains("Question: who attacks?"));
    }

    #[test]
    fn extractive_generator_quotes_documents() {
        let prompt = build_prompt("who attacks?", &[result("Bear Attack", "A bear attacks.")]);
        let answer = ExtractiveGenerator.generate(&prompt).unwrap();
        assert!(answer.contains("From Bear Attack:"));
        assert!(answer.contains("A bear attacks."));
    }

    #[test]
    fn empty_retrieval_yields_fallback() {
        let prompt = build_prompt("anything?", &[]);
        let answer = ExtractiveGenerator.generate(&prompt).unwrap();
        assert!(answer.contains("No supporting documents"));
    }
}
