//! Built-in deliverable generator producing a markdown deal brief.

use async_trait::async_trait;

use dealgate_core::catalog::get_item;
use dealgate_core::deals::FactValue;
use dealgate_core::deliverables::{DeliverableGenerator, GenerationJob};
use dealgate_core::league::league_profile;
use dealgate_core::utils::format_cents;
use dealgate_core::{Deal, Result};

/// Renders a deterministic brief from the deal's stored data. Stands in for a
/// model-backed generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct BriefGenerator;

fn render_fact(value: &FactValue) -> String {
    match value {
        FactValue::Bool(true) => "yes".to_string(),
        FactValue::Bool(false) => "no".to_string(),
        FactValue::Number(n) => n.to_string(),
        FactValue::Text(s) => s.clone(),
    }
}

#[async_trait]
impl DeliverableGenerator for BriefGenerator {
    async fn generate(&self, job: &GenerationJob, deal: &Deal) -> Result<String> {
        let item = get_item(&job.item_ref)?;
        let league = match deal.league {
            Some(league) => format!("{} {}", league, league_profile(league).label),
            None => "unclassified".to_string(),
        };

        let mut lines = vec![
            format!("# {}", item.name),
            String::new(),
            format!(
                "Deal {} ({} journey), gate {}: {}",
                deal.id,
                deal.journey,
                deal.current_gate,
                deal.current_gate.title()
            ),
            format!("League: {}", league),
            String::new(),
            "## Profile".to_string(),
        ];

        let text_fields = [("Industry", &deal.industry), ("Location", &deal.location)];
        for (label, value) in text_fields {
            if let Some(v) = value {
                lines.push(format!("- {}: {}", label, v));
            }
        }

        let money_fields = [
            ("Annual revenue", deal.revenue_cents),
            ("SDE", deal.sde_cents),
            ("EBITDA", deal.ebitda_cents),
            ("Asking price", deal.asking_price_cents),
            ("Capital available", deal.capital_available_cents),
            ("Target deal size", deal.target_deal_size_cents),
        ];
        for (label, cents) in money_fields {
            // Non-positive figures are placeholders, not data.
            if let Some(c) = cents.filter(|c| *c > 0) {
                lines.push(format!("- {}: {}", label, format_cents(c)));
            }
        }

        if !deal.financials.is_empty() {
            lines.push(String::new());
            lines.push("## Notes".to_string());
            for (key, value) in deal.financials.iter() {
                lines.push(format!("- {}: {}", key, render_fact(value)));
            }
        }

        let brief = lines.join("\n");
        tracing::debug!(
            "Rendered {} ({} bytes) for deal {}",
            job.item_ref,
            brief.len(),
            deal.id
        );
        Ok(brief)
    }
}
