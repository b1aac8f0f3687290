use std::collections::HashMap;

use crate::payloads::{Review, ReviewState};

/// Collapses a review history into at most one verdict per reviewer.
///
/// Reviews are walked newest first. For each author the newest approval or
/// change request wins; a newer plain comment never overrides it. Authors
/// with neither, but with a comment, keep their newest comment. Output order
/// follows the first appearance of each author in the newest-first walk.
pub fn resolve_verdicts(reviews: &[Review]) -> Vec<&Review> {
    let mut authored: Vec<(&str, &Review)> = reviews
        .iter()
        .filter_map(|review| review.author_login().map(|login| (login, review)))
        .collect();
    authored.sort_by(|a, b| b.1.updated_at.cmp(&a.1.updated_at));

    let mut groups: Vec<Vec<&Review>> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    for (login, review) in authored {
        let slot = *slots.entry(login).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(review);
    }

    groups
        .iter()
        .filter_map(|group| pick_verdict(group))
        .collect()
}

fn pick_verdict<'a>(newest_first: &[&'a Review]) -> Option<&'a Review> {
    newest_first
        .iter()
        .find(|review| review.state.is_decisive())
        .or_else(|| {
            newest_first
                .iter()
                .find(|review| review.state == ReviewState::Commented)
        })
        .copied()
}
