//! Scoring policies over a stimulus and a response.
//!
//! Every policy is computed for every trial; the mode's [`ScoringPolicy`] only picks which one
//! decides pass/fail and the feedback line.

use std::collections::HashMap;

use recall_core::{Item, Response, ScoreResult, ScoringPolicy, Stimulus};

/// Per-position match over `max(len(stimulus), len(response))` positions.
/// An empty slot never matches.
pub fn positional(stimulus: &Stimulus, response: &Response) -> Vec<bool> {
    let len = stimulus.len().max(response.len());
    (0..len)
        .map(|i| match (stimulus.get(i), response.slot(i)) {
            (Some(s), Some(r)) => s == r,
            _ => false,
        })
        .collect()
}

/// Correctness of the first and last positions, `None` for an empty stimulus.
pub fn first_last(stimulus: &Stimulus, response: &Response) -> Option<(bool, bool)> {
    let last = stimulus.len().checked_sub(1)?;
    let hit = |i: usize| stimulus.get(i) == response.slot(i) && response.slot(i).is_some();
    Some((hit(0), hit(last)))
}

/// Position-free credit: per distinct value, `min(count in response, count in stimulus)`.
///
/// Only the first `len(stimulus)` response slots are considered; empty slots earn nothing.
pub fn multiset_credit(stimulus: &Stimulus, response: &Response) -> usize {
    let mut wanted: HashMap<&Item, usize> = HashMap::new();
    for item in stimulus.items() {
        *wanted.entry(item).or_default() += 1;
    }
    let mut given: HashMap<&Item, usize> = HashMap::new();
    for item in response.slots().iter().take(stimulus.len()).flatten() {
        *given.entry(item).or_default() += 1;
    }
    given
        .iter()
        .map(|(item, n)| (*n).min(wanted.get(item).copied().unwrap_or(0)))
        .sum()
}

/// Share of the stimulus positions that got any answer at all.
pub fn completion_rate(stimulus: &Stimulus, response: &Response) -> f64 {
    if stimulus.is_empty() {
        return 0.0;
    }
    let filled = response
        .slots()
        .iter()
        .take(stimulus.len())
        .filter(|s| s.is_some())
        .count();
    filled as f64 / stimulus.len() as f64
}

/// Same length and every position right.
pub fn all_or_nothing(stimulus: &Stimulus, response: &Response) -> bool {
    !stimulus.is_empty()
        && stimulus.len() == response.len()
        && positional(stimulus, response).iter().all(|ok| *ok)
}

pub fn score(stimulus: &Stimulus, response: &Response, policy: ScoringPolicy) -> ScoreResult {
    let length = stimulus.len();
    let correct_positions = positional(stimulus, response)
        .iter()
        .filter(|ok| **ok)
        .count();
    let correct_numbers = multiset_credit(stimulus, response);
    let ends = first_last(stimulus, response);
    ScoreResult {
        policy,
        length,
        correct_positions,
        correct_numbers,
        wrong_numbers: length.saturating_sub(correct_numbers),
        first_correct: ends.map(|(first, _)| first),
        last_correct: ends.map(|(_, last)| last),
        all_or_nothing: all_or_nothing(stimulus, response),
        completion_rate: completion_rate(stimulus, response),
        pattern_mistakes: None,
    }
}

/// One-line feedback for the presentation layer.
pub fn feedback(score: &ScoreResult) -> String {
    let ends = || {
        format!(
            "{} | {}",
            if score.first_correct == Some(true) { "First OK" } else { "First Wrong" },
            if score.last_correct == Some(true) { "Last OK" } else { "Last Wrong" },
        )
    };
    let mut text = match score.policy {
        ScoringPolicy::FirstLast => ends(),
        ScoringPolicy::MultisetCredit => format!(
            "{} | Correct numbers: {} / {}",
            ends(),
            score.correct_numbers,
            score.length
        ),
        ScoringPolicy::Positional => format!(
            "Correct positions: {} / {}",
            score.correct_positions, score.length
        ),
        ScoringPolicy::AllOrNothing if score.all_or_nothing => "Perfect recall".to_string(),
        ScoringPolicy::AllOrNothing => format!(
            "Not quite: {} / {} positions",
            score.correct_positions, score.length
        ),
    };
    if let Some(mistakes) = score.pattern_mistakes {
        text.push_str(&format!(" | Pattern mistakes: {mistakes}"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::ItemKind;

    fn digits(values: &[u8]) -> Stimulus {
        Stimulus::new(ItemKind::Number, values.iter().map(|v| Item::Number(*v)).collect())
    }

    fn answer(values: &[Option<u8>]) -> Response {
        Response::new(values.iter().map(|v| v.map(Item::Number)).collect())
    }

    #[test]
    fn omissions_cost_credit() {
        let s = digits(&[1, 2, 3, 4, 5]);
        let r = answer(&[Some(1), Some(2), None, None, Some(5)]);
        let result = score(&s, &r, ScoringPolicy::MultisetCredit);
        assert_eq!(result.correct_numbers, 3);
        assert_eq!(result.wrong_numbers, 2);
        assert_eq!(result.correct_positions, 3);
        assert_eq!(result.completion_rate, 0.6);
    }

    #[test]
    fn multiset_respects_multiplicity() {
        let s = digits(&[7, 7, 3]);
        let r = answer(&[Some(7), None, Some(7)]);
        assert_eq!(multiset_credit(&s, &r), 2);
        assert_eq!(positional(&s, &r), vec![true, false, false]);

        let over = answer(&[Some(3), Some(3), Some(3)]);
        assert_eq!(multiset_credit(&s, &over), 1);
    }

    #[test]
    fn multiset_credits_misplaced_values() {
        let s = digits(&[1, 2, 3]);
        let r = answer(&[Some(3), Some(1), Some(2)]);
        assert_eq!(multiset_credit(&s, &r), 3);
        assert_eq!(positional(&s, &r).iter().filter(|ok| **ok).count(), 0);
    }

    #[test]
    fn extra_response_slots_are_ignored_by_credit() {
        let s = digits(&[4, 5]);
        let r = answer(&[Some(9), Some(5), Some(4)]);
        assert_eq!(multiset_credit(&s, &r), 1);
        assert_eq!(positional(&s, &r), vec![false, true, false]);
        assert!(!all_or_nothing(&s, &r));
    }

    #[test]
    fn first_last_marks_empty_ends_wrong() {
        let s = digits(&[10, 20, 30]);
        assert_eq!(
            first_last(&s, &answer(&[None, Some(20), Some(30)])),
            Some((false, true))
        );
        assert_eq!(first_last(&s, &answer(&[Some(10)])), Some((true, false)));
    }

    #[test]
    fn all_or_nothing_needs_exact_length() {
        let s = digits(&[1, 2]);
        assert!(all_or_nothing(&s, &answer(&[Some(1), Some(2)])));
        assert!(!all_or_nothing(&s, &answer(&[Some(1), Some(2), None])));
        assert!(!all_or_nothing(&s, &answer(&[Some(1)])));
    }

    #[test]
    fn empty_stimulus_scores_zero() {
        let s = digits(&[]);
        let result = score(&s, &answer(&[Some(1)]), ScoringPolicy::Positional);
        assert_eq!(result.correct_positions, 0);
        assert_eq!(result.correct_numbers, 0);
        assert_eq!(result.wrong_numbers, 0);
        assert_eq!(result.completion_rate, 0.0);
        assert_eq!(result.first_correct, None);
        assert!(!result.all_or_nothing);
    }

    #[test]
    fn feedback_follows_policy() {
        let s = digits(&[1, 2, 3]);
        let r = answer(&[Some(1), Some(3), Some(2)]);
        assert_eq!(
            feedback(&score(&s, &r, ScoringPolicy::FirstLast)),
            "First OK | Last Wrong"
        );
        assert_eq!(
            feedback(&score(&s, &r, ScoringPolicy::MultisetCredit)),
            "First OK | Last Wrong | Correct numbers: 3 / 3"
        );
        let mut positional = score(&s, &r, ScoringPolicy::Positional);
        positional.pattern_mistakes = Some(2);
        assert_eq!(
            feedback(&positional),
            "Correct positions: 1 / 3 | Pattern mistakes: 2"
        );
    }
}
