//! Prompt construction for the draw predictor.

use crate::feed::{next_issue, DrawResult};
use anyhow::{Context, Result};
use std::fmt::Write;

/// System message sent with every prediction request.
pub(crate) const SYSTEM_PROMPT: &str = "You're an intelligent pattern prediction AI.";

/// Build the user prompt for a batch of results, newest first.
///
/// Embeds every result's period, number and color, plus the next expected
/// period (numeric successor of the newest issue).
pub(crate) fn build_prediction_prompt(results: &[DrawResult]) -> Result<String> {
    let newest = results.first().context("Cannot build prompt from an empty batch")?;
    let next_period = next_issue(&newest.issue_number)
        .with_context(|| format!("Issue number is not numeric: {}", newest.issue_number))?;

    let mut formatted = String::new();
    for r in results {
        writeln!(
            formatted,
            "Period: {} | Number: {} | Color: {}",
            r.issue_number, r.number, r.color
        )?;
    }

    Ok(format!(
        r#"You're a master-level AI trained to analyze patterns in fast-paced lottery-style number games. You are given the last {count} results from a game. Each result has:

- Period Number
- Winning Number (0-9)
- Color (Red, Green, Violet)
- Size (Big = 6-9, Small = 0-5)

Your job is to deeply analyze all possible patterns, including:
- Repeating and alternating numbers
- Color cycles and sudden shifts
- Hot vs cold numbers (most and least frequent)
- Big/Small streaks and breaking points
- Odd/Even transitions
- Any combo sequences and hidden signals

Objective: from this deep pattern logic, accurately predict the next result for:
{formatted}
Output strictly in this format:
Period: {next_period}
Number: <number>
Color: <color>
Size: <Big/Small>
Only give prediction - no extra text."#,
        count = results.len(),
    ))
}
