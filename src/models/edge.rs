// Toggle edges: boolean relations stored as (actor, target) join rows.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// follower -> profile
    Follow,
    /// user -> post
    Like,
    /// user -> post
    Save,
    /// voter -> contestant
    Vote,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 4] = [EdgeKind::Follow, EdgeKind::Like, EdgeKind::Save, EdgeKind::Vote];

    pub fn table(&self) -> &'static str {
        match self {
            EdgeKind::Follow => "follows",
            EdgeKind::Like => "likes",
            EdgeKind::Save => "saved",
            EdgeKind::Vote => "votes",
        }
    }

    pub fn actor_column(&self) -> &'static str {
        match self {
            EdgeKind::Follow => "follower_id",
            EdgeKind::Like => "liked_by",
            EdgeKind::Save => "user_id",
            EdgeKind::Vote => "voter_id",
        }
    }

    pub fn target_column(&self) -> &'static str {
        match self {
            EdgeKind::Follow => "profile_id",
            EdgeKind::Like | EdgeKind::Save => "post_id",
            EdgeKind::Vote => "contestant_id",
        }
    }

    pub fn targets_post(&self) -> bool {
        matches!(self, EdgeKind::Like | EdgeKind::Save)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Follow => "follow",
            EdgeKind::Like => "like",
            EdgeKind::Save => "save",
            EdgeKind::Vote => "vote",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Do,
    Undo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub kind: EdgeKind,
    pub action: ToggleAction,
    /// Whether the edge exists after the toggle.
    pub active: bool,
}

impl ToggleOutcome {
    pub fn new(kind: EdgeKind, action: ToggleAction) -> Self {
        Self {
            kind,
            action,
            active: action == ToggleAction::Do,
        }
    }

    pub fn message(&self) -> &'static str {
        match (self.kind, self.action) {
            (EdgeKind::Follow, ToggleAction::Do) => "Followed successfully",
            (EdgeKind::Follow, ToggleAction::Undo) => "Unfollowed successfully",
            (EdgeKind::Like, ToggleAction::Do) => "Post liked successfully",
            (EdgeKind::Like, ToggleAction::Undo) => "Post like removed successfully",
            (EdgeKind::Save, ToggleAction::Do) => "Post added to the saved collection",
            (EdgeKind::Save, ToggleAction::Undo) => "Post removed from saved collection",
            (EdgeKind::Vote, ToggleAction::Do) => "Voted successfully",
            (EdgeKind::Vote, ToggleAction::Undo) => "Unvoted successfully",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_tables_are_distinct() {
        let tables: std::collections::HashSet<_> = EdgeKind::ALL.iter().map(|k| k.table()).collect();
        assert_eq!(tables.len(), EdgeKind::ALL.len());
    }

    #[test]
    fn test_outcome_active_flag() {
        assert!(ToggleOutcome::new(EdgeKind::Like, ToggleAction::Do).active);
        assert!(!ToggleOutcome::new(EdgeKind::Like, ToggleAction::Undo).active);
        assert!(EdgeKind::Save.targets_post());
        assert!(!EdgeKind::Vote.targets_post());
    }
}
