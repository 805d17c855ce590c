//! Prompts for turning PRD text into a task hierarchy.
//!
//! All prompt wording lives here so it can be inspected by unit tests and
//! changed without touching retry or parsing logic. Callers can replace the
//! system prompt via [`crate::config::PlanConfig::system_prompt`]; the user
//! prompt always carries the JSON contract the parser expects.

use crate::model::{ESTIMATE_MAX, ESTIMATE_MIN};

/// Default system prompt, used when `PlanConfig::system_prompt` is `None`.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a product analyst assistant. \
You help turn product requirement documents (PRDs) into structured boards for \
development planning. You answer with JSON only.";

/// Build the user message for one chunk of PRD text.
///
/// `part` and `total` are 1-indexed and only mentioned when the document was
/// split, so the model knows it is seeing an excerpt.
pub fn user_prompt(chunk: &str, part: usize, total: usize) -> String {
    let excerpt = if total > 1 {
        format!("This is part {part} of {total} of the PRD. Plan only what this part describes.\n\n")
    } else {
        String::new()
    };
    format!(
        r#"Extract a structured project board from the following PRD.

Rules:
1. Organize features into general, high-level groups that represent broad product
   domains, workflows, or modules. Do not use specific feature names as group titles.
2. Each group contains a list of short task titles (2-5 words) for the key items or
   subtasks of that group.
3. For each task, include a "time_estimation_AI" field: the estimated effort in days,
   as a number. Base it on typical team velocity and similar projects; do not
   under- or over-estimate. Each estimate must be between {min} and {max} days.
4. Do not include descriptions, explanations, or any text outside the JSON.
5. Return only a JSON array in exactly this shape:

[
  {{
    "group": "General Topic Name",
    "items": [
      {{ "task": "Short task name", "time_estimation_AI": 0.5 }}
    ]
  }}
]

{excerpt}Here is the PRD:
---
{chunk}
---"#,
        min = ESTIMATE_MIN,
        max = ESTIMATE_MAX,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_embeds_chunk_and_contract() {
        let p = user_prompt("Users can log in with SSO.", 1, 1);
        assert!(p.contains("Users can log in with SSO."));
        assert!(p.contains("\"time_estimation_AI\""));
        assert!(p.contains("between 0.25 and 3 days"));
        assert!(!p.contains("part 1 of 1"));
    }

    #[test]
    fn user_prompt_marks_excerpts() {
        let p = user_prompt("x", 2, 5);
        assert!(p.contains("part 2 of 5"));
    }
}
