//! Candidate selection policy
//!
//! Decides who may review a pull request. Candidates are always returned in
//! ascending user id order so repeated reassignment over an unchanged team
//! picks the same replacement.

use crate::models::User;

/// Eligible reviewers for a new pull request
///
/// Active members of the author's team, author excluded. Every candidate is
/// assigned.
pub fn new_pr_candidates<'a>(
    members: impl IntoIterator<Item = &'a User>,
    author_id: &str,
) -> Vec<String> {
    select(members, |user| user.user_id != author_id)
}

/// Eligible replacements for a departing reviewer
///
/// Active members of the departing reviewer's team, excluding the author and
/// everyone already on the pull request (the departing reviewer included).
/// Only the first candidate is used.
pub fn reassignment_candidates<'a>(
    members: impl IntoIterator<Item = &'a User>,
    author_id: &str,
    assigned: &[String],
) -> Vec<String> {
    select(members, |user| {
        user.user_id != author_id && !assigned.iter().any(|r| *r == user.user_id)
    })
}

fn select<'a>(
    members: impl IntoIterator<Item = &'a User>,
    keep: impl Fn(&User) -> bool,
) -> Vec<String> {
    let mut ids: Vec<String> = members
        .into_iter()
        .filter(|user| user.is_active && keep(user))
        .map(|user| user.user_id.clone())
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team() -> Vec<User> {
        vec![
            User::new("u3", "carol", "backend"),
            User::new("u1", "alice", "backend"),
            User::new("u2", "bob", "backend"),
            User::new("u5", "eve", "backend").with_active(false),
            User::new("u4", "dave", "backend"),
        ]
    }

    #[test]
    fn test_new_pr_excludes_author_and_inactive() {
        let members = team();
        let candidates = new_pr_candidates(&members, "u1");
        assert_eq!(candidates, vec!["u2", "u3", "u4"]);
    }

    #[test]
    fn test_new_pr_lone_author() {
        let members = vec![User::new("u1", "alice", "solo")];
        assert!(new_pr_candidates(&members, "u1").is_empty());
    }

    #[test]
    fn test_reassignment_excludes_current_reviewers() {
        let members = team();
        let assigned = vec!["u2".to_string(), "u3".to_string()];
        let candidates = reassignment_candidates(&members, "u1", &assigned);
        assert_eq!(candidates, vec!["u4"]);
    }

    #[test]
    fn test_reassignment_exhausted() {
        let members = team();
        let assigned = vec!["u2".to_string(), "u3".to_string(), "u4".to_string()];
        assert!(reassignment_candidates(&members, "u1", &assigned).is_empty());
    }

    #[test]
    fn test_order_is_stable() {
        let mut members = team();
        let first = reassignment_candidates(&members, "u1", &["u2".to_string()]);
        members.reverse();
        let second = reassignment_candidates(&members, "u1", &["u2".to_string()]);
        assert_eq!(first, second);
        assert_eq!(first[0], "u3");
    }
}
