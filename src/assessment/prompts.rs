//! Prompt templates for the three model calls.
//!
//! Every template asks for exactly one JSON object; the caller still
//! validates the reply and never trusts the model to follow the rules.

use super::types::{BehavioralSample, Difficulty, MAX_OPTIONS, MIN_OPTIONS, PerformanceScore};

pub fn challenge_prompt(usage_context: &str, seed: u32) -> String {
    format!(
        r#"You create a single, concise micro-challenge that assesses cognitive skills relevant to this AI usage context: {context}

RULES:
1. The challenge must be a single question or task, short and clear.
2. Decide whether it is open-ended or multiple-choice.
3. If multiple-choice, provide {min} to {max} plausible options in "options" and set "challengeType" to "multipleChoice".
4. If open-ended, omit "options" and set "challengeType" to "open".
5. Use variation seed {seed} so repeated requests produce different challenges.

Respond with one JSON object only:
{{"challengeText": "...", "challengeType": "open" | "multipleChoice", "options": ["..."]}}"#,
        context = usage_context.trim(),
        min = MIN_OPTIONS,
        max = MAX_OPTIONS,
        seed = seed,
    )
}

pub fn difficulty_prompt(
    current: Difficulty,
    performance: PerformanceScore,
    challenge_type: &str,
) -> String {
    format!(
        r#"You are a difficulty adjustment algorithm. Calculate the next difficulty level.

RULES:
1. Start with the current difficulty: {current}.
2. Read the performance score (1 poor, 10 excellent): {performance}.
3. If performance is 8 or higher, increase difficulty by 1.
4. If performance is 4 or lower, decrease difficulty by 1.
5. If performance is between 5 and 7, keep the same difficulty.
6. The new difficulty must stay between 1 and 10.
7. Give a one-sentence reason.

Challenge type: {challenge_type}

Respond with one JSON object only:
{{"newDifficulty": <number>, "reason": "..."}}"#,
        current = current.value(),
        performance = performance.value(),
        challenge_type = challenge_type,
    )
}

/// `averages` holds mean time spent and mean hesitation, in seconds
pub fn interpretation_prompt(
    responses: &[String],
    averages: (f64, f64),
    usage_context: &str,
) -> String {
    let listed = if responses.is_empty() {
        "(no responses)".to_string()
    } else {
        responses
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}. {}", i + 1, r.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        r#"You interpret answers to a set of cognitive micro-challenges together with behavioral data, and describe the user's cognitive strengths and weaknesses.

AI usage context: {context}

Responses:
{listed}

Behavioral data (averaged per challenge):
- time spent: {time:.2} seconds
- hesitation before first interaction: {hesitation:.2} seconds

Respond with one JSON object only:
{{"strengths": ["..."], "weaknesses": ["..."], "insights": "..."}}"#,
        context = usage_context.trim(),
        listed = listed,
        time = averages.0,
        hesitation = averages.1,
    )
}

/// Mean time spent and mean hesitation; zeros for an empty slice
pub fn sample_averages(samples: &[BehavioralSample]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let time: f64 = samples.iter().map(|s| s.time_spent()).sum();
    let hesitation: f64 = samples.iter().map(|s| s.hesitation()).sum();
    (time / n, hesitation / n)
}
