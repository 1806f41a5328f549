/// Outcome of screening a collaborator completion before it reaches a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow(String),
    Degrade { reason_code: &'static str },
}

/// Bounds free text returned by the reasoning collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseGuardrail {
    pub max_sentences: usize,
    pub max_chars: usize,
}

impl ResponseGuardrail {
    pub fn explanation() -> Self {
        Self { max_sentences: 2, max_chars: 600 }
    }

    pub fn chat() -> Self {
        Self { max_sentences: 4, max_chars: 1_200 }
    }

    pub fn evaluate(&self, raw: &str) -> GuardrailDecision {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return GuardrailDecision::Degrade { reason_code: "empty_completion" };
        }

        let sentences = truncate_sentences(&collapsed, self.max_sentences);
        GuardrailDecision::Allow(truncate_chars(sentences, self.max_chars))
    }
}

/// A sentence ends at `.`, `!` or `?` followed by whitespace or end of text,
/// so decimals such as `9.80` never split.
fn truncate_sentences(text: &str, max_sentences: usize) -> &str {
    if max_sentences == 0 {
        return text;
    }

    let mut seen = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        if matches!(ch, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                seen += 1;
                if seen == max_sentences {
                    return &text[..index + ch.len_utf8()];
                }
            }
        }
    }
    text
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{GuardrailDecision, ResponseGuardrail};

    #[test]
    fn empty_completion_degrades() {
        let decision = ResponseGuardrail::explanation().evaluate("  \n\t ");
        assert_eq!(decision, GuardrailDecision::Degrade { reason_code: "empty_completion" });
    }

    #[test]
    fn explanation_is_capped_at_two_sentences_without_splitting_decimals() {
        let decision = ResponseGuardrail::explanation().evaluate(
            "Chicken sits at RM 9.80 in Selangor.  Lagged USD pushed feed costs up! Diesel was flat.",
        );
        assert_eq!(
            decision,
            GuardrailDecision::Allow(
                "Chicken sits at RM 9.80 in Selangor. Lagged USD pushed feed costs up!".to_string()
            )
        );
    }

    #[test]
    fn long_single_sentence_is_cut_by_characters() {
        let guardrail = ResponseGuardrail { max_sentences: 2, max_chars: 10 };
        let decision = guardrail.evaluate("abcdefghij klmnop");
        assert_eq!(decision, GuardrailDecision::Allow("abcdefghij...".to_string()));
    }
}
