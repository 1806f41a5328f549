use anyhow::{Context as _, Result};
use sentinel_core::ExplanationSummary;
use tera::{Context, Tera};

const EXPLANATION_TEMPLATE: &str = "explanation.txt";
const CHAT_TEMPLATE: &str = "chat.txt";

const EXPLANATION_SOURCE: &str = "Explain RM {{ fair_price }} price for {{ item }} in {{ region }}. \
Inputs: USD {{ currency_now }}, Diesel {{ fuel_now }}.\
{% if is_controlled %} The item is under a government price ceiling.{% endif %} \
Cost regime: {{ regime }}. Audit verdict: {{ audit_status }}. Max 2 sentences.";

const CHAT_SOURCE: &str = "You are a commodity price analyst for Malaysian retail markets. \
The current fair price estimate for {{ item }} is RM {{ current_prediction }}. \
Answer the user's question in at most 3 sentences and do not invent new prices.\n\
Question: {{ user_query }}";

/// Renders collaborator prompts from computed fields only.
pub struct PromptRenderer {
    tera: Tera,
}

impl PromptRenderer {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (EXPLANATION_TEMPLATE, EXPLANATION_SOURCE),
            (CHAT_TEMPLATE, CHAT_SOURCE),
        ])
        .context("failed to register prompt templates")?;
        Ok(Self { tera })
    }

    pub fn explanation(&self, summary: &ExplanationSummary) -> Result<String> {
        let mut context = Context::new();
        context.insert("fair_price", &format!("{:.2}", summary.fair_price));
        context.insert("item", &summary.item);
        context.insert("region", &summary.region);
        context.insert("currency_now", &summary.currency_now.to_string());
        context.insert("fuel_now", &summary.fuel_now.to_string());
        context.insert("is_controlled", &summary.is_controlled);
        context.insert("regime", summary.regime.as_str());
        context.insert("audit_status", summary.audit_status.as_str());

        self.tera.render(EXPLANATION_TEMPLATE, &context).context("failed to render explanation prompt")
    }

    pub fn chat(&self, user_query: &str, current_prediction: f64, item: &str) -> Result<String> {
        let mut context = Context::new();
        context.insert("user_query", user_query.trim());
        context.insert("current_prediction", &format!("{current_prediction:.2}"));
        context.insert("item", item);

        self.tera.render(CHAT_TEMPLATE, &context).context("failed to render chat prompt")
    }
}

#[cfg(test)]
mod tests {
    use sentinel_core::pricing::AuditStatus;
    use sentinel_core::{CostRegime, ExplanationSummary};

    use super::PromptRenderer;

    fn summary(is_controlled: bool) -> ExplanationSummary {
        ExplanationSummary {
            item: "AYAM BERSIH - STANDARD".to_string(),
            region: "Selangor".to_string(),
            fair_price: 9.8,
            currency_now: 4.4475,
            fuel_now: 3.35,
            regime: CostRegime::Down,
            audit_status: AuditStatus::HighRisk,
            gap_sen: 53.0,
            is_controlled,
        }
    }

    #[test]
    fn explanation_prompt_carries_computed_fields() {
        let renderer = PromptRenderer::new().expect("templates");
        let prompt = renderer.explanation(&summary(false)).expect("render");

        assert!(prompt.starts_with(
            "Explain RM 9.80 price for AYAM BERSIH - STANDARD in Selangor. Inputs: USD 4.4475, Diesel 3.35."
        ));
        assert!(prompt.contains("Cost regime: DOWN"));
        assert!(prompt.contains("Audit verdict: HIGH_RISK"));
        assert!(prompt.ends_with("Max 2 sentences."));
        assert!(!prompt.contains("price ceiling"));
    }

    #[test]
    fn controlled_items_mention_the_ceiling() {
        let renderer = PromptRenderer::new().expect("templates");
        let prompt = renderer.explanation(&summary(true)).expect("render");
        assert!(prompt.contains("government price ceiling"));
    }

    #[test]
    fn chat_prompt_embeds_question_and_prediction() {
        let renderer = PromptRenderer::new().expect("templates");
        let prompt = renderer.chat("  Why is chicken expensive? ", 9.8, "Ayam").expect("render");

        assert!(prompt.contains("RM 9.80"));
        assert!(prompt.ends_with("Question: Why is chicken expensive?"));
    }
}
