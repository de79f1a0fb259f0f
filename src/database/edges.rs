use std::collections::{HashMap, HashSet};

use sqlx::{QueryBuilder, Sqlite};

use super::users::like_pattern;
use super::{Database, PROFILE_SUMMARY_COLUMNS};
use crate::error::{AppError, AppResult};
use crate::models::{current_time_millis, EdgeKind, Page, PageRequest, ProfileSummary, ToggleAction};

/// Which side of an edge a lookup is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEnd {
    Actor,
    Target,
}

impl EdgeEnd {
    fn column(self, kind: EdgeKind) -> &'static str {
        match self {
            EdgeEnd::Actor => kind.actor_column(),
            EdgeEnd::Target => kind.target_column(),
        }
    }

    fn opposite(self) -> EdgeEnd {
        match self {
            EdgeEnd::Actor => EdgeEnd::Target,
            EdgeEnd::Target => EdgeEnd::Actor,
        }
    }
}

fn push_edge_profile_filters(
    qb: &mut QueryBuilder<'_, Sqlite>,
    kind: EdgeKind,
    anchor: EdgeEnd,
    id: i64,
    query: Option<&str>,
) {
    qb.push(format!(
        " FROM {table} e JOIN users u ON u.id = e.{user_col} WHERE e.{anchor_col} = ",
        table = kind.table(),
        user_col = anchor.opposite().column(kind),
        anchor_col = anchor.column(kind),
    ));
    qb.push_bind(id);
    qb.push(" AND u.status = 'active'");
    if let Some(term) = query.filter(|q| !q.trim().is_empty()) {
        let pattern = like_pattern(term);
        qb.push(" AND (u.username LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" ESCAPE '\\' OR u.display_name LIKE ");
        qb.push_bind(pattern);
        qb.push(" ESCAPE '\\')");
    }
}

impl Database {
    /// Delete the (actor, target) edge if present, otherwise insert it.
    pub async fn toggle_edge(&self, kind: EdgeKind, actor_id: i64, target_id: i64) -> AppResult<ToggleAction> {
        let mut tx = self.begin().await?;

        let delete = format!(
            "DELETE FROM {} WHERE {} = ? AND {} = ?",
            kind.table(),
            kind.actor_column(),
            kind.target_column()
        );
        let removed = sqlx::query(&delete)
            .bind(actor_id)
            .bind(target_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let action = if removed > 0 {
            ToggleAction::Undo
        } else {
            let insert = format!(
                "INSERT INTO {} ({}, {}, created_at) VALUES (?, ?, ?)",
                kind.table(),
                kind.actor_column(),
                kind.target_column()
            );
            sqlx::query(&insert)
                .bind(actor_id)
                .bind(target_id)
                .bind(current_time_millis())
                .execute(&mut *tx)
                .await?;
            ToggleAction::Do
        };

        tx.commit().await?;
        Ok(action)
    }

    pub async fn edge_exists(&self, kind: EdgeKind, actor_id: i64, target_id: i64) -> AppResult<bool> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} = ? AND {} = ?",
            kind.table(),
            kind.actor_column(),
            kind.target_column()
        );
        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .bind(actor_id)
            .bind(target_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.is_some())
    }

    /// Every target the actor has an edge to, e.g. the accounts a user follows.
    pub async fn edge_targets_of(&self, kind: EdgeKind, actor_id: i64) -> AppResult<Vec<i64>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?",
            kind.target_column(),
            kind.table(),
            kind.actor_column()
        );
        let ids: Vec<i64> = sqlx::query_scalar(&sql).bind(actor_id).fetch_all(self.pool()).await?;
        Ok(ids)
    }

    /// Subset of `target_ids` the actor has an edge to.
    pub async fn edge_targets_among(
        &self,
        kind: EdgeKind,
        actor_id: i64,
        target_ids: &[i64],
    ) -> AppResult<HashSet<i64>> {
        if target_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM {} WHERE {} = ",
            kind.target_column(),
            kind.table(),
            kind.actor_column()
        ));
        qb.push_bind(actor_id);
        qb.push(format!(" AND {} IN (", kind.target_column()));
        let mut separated = qb.separated(", ");
        for id in target_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let ids: Vec<i64> = qb.build_query_scalar().fetch_all(self.pool()).await?;
        Ok(ids.into_iter().collect())
    }

    pub async fn count_edges(&self, kind: EdgeKind, end: EdgeEnd, id: i64) -> AppResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?", kind.table(), end.column(kind));
        let count: i64 = sqlx::query_scalar(&sql).bind(id).fetch_one(self.pool()).await?;
        Ok(count)
    }

    /// Like totals per post; posts without likes are absent from the map.
    pub async fn like_counts(&self, post_ids: &[i64]) -> AppResult<HashMap<i64, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT post_id, COUNT(*) FROM likes WHERE post_id IN (");
        let mut separated = qb.separated(", ");
        for id in post_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") GROUP BY post_id");

        let rows: Vec<(i64, i64)> = qb.build_query_as().fetch_all(self.pool()).await?;
        Ok(rows.into_iter().collect())
    }

    /// Users on the far side of edges anchored at `id`, newest edge first.
    ///
    /// `(Follow, Target, profile)` lists followers, `(Follow, Actor, user)` the
    /// accounts followed, `(Like, Target, post)` the likers and `(Vote, Target,
    /// contestant)` the voters.
    pub async fn list_edge_profiles(
        &self,
        kind: EdgeKind,
        anchor: EdgeEnd,
        id: i64,
        query: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Page<ProfileSummary>> {
        let projected = anchor.opposite();
        if projected == EdgeEnd::Target && kind.targets_post() {
            return Err(AppError::Internal(format!(
                "{} edges point at posts, not profiles",
                kind.as_str()
            )));
        }

        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*)");
        push_edge_profile_filters(&mut count_qb, kind, anchor, id, query);
        let total: i64 = count_qb.build_query_scalar().fetch_one(self.pool()).await?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {}", PROFILE_SUMMARY_COLUMNS));
        push_edge_profile_filters(&mut qb, kind, anchor, id, query);
        qb.push(" ORDER BY e.created_at DESC, u.id DESC LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let docs: Vec<ProfileSummary> = qb.build_query_as().fetch_all(self.pool()).await?;
        Ok(Page::new(docs, total, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::users::tests::new_user;
    use crate::models::Role;

    #[tokio::test]
    async fn test_toggle_twice_restores_state() {
        let db = Database::new_in_memory().await.unwrap();
        let a = db.insert_user(new_user("amy", Role::Voter)).await.unwrap();
        let b = db.insert_user(new_user("bob", Role::Contestant)).await.unwrap();

        assert_eq!(db.toggle_edge(EdgeKind::Follow, a.id, b.id).await.unwrap(), ToggleAction::Do);
        assert!(db.edge_exists(EdgeKind::Follow, a.id, b.id).await.unwrap());
        assert_eq!(db.count_edges(EdgeKind::Follow, EdgeEnd::Target, b.id).await.unwrap(), 1);

        assert_eq!(db.toggle_edge(EdgeKind::Follow, a.id, b.id).await.unwrap(), ToggleAction::Undo);
        assert!(!db.edge_exists(EdgeKind::Follow, a.id, b.id).await.unwrap());
        assert_eq!(db.count_edges(EdgeKind::Follow, EdgeEnd::Target, b.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_edge_profiles_and_membership() {
        let db = Database::new_in_memory().await.unwrap();
        let star = db.insert_user(new_user("star", Role::Contestant)).await.unwrap();
        let amy = db.insert_user(new_user("amy", Role::Voter)).await.unwrap();
        let bob = db.insert_user(new_user("bob", Role::Voter)).await.unwrap();
        db.toggle_edge(EdgeKind::Vote, amy.id, star.id).await.unwrap();
        db.toggle_edge(EdgeKind::Vote, bob.id, star.id).await.unwrap();

        let voters = db
            .list_edge_profiles(EdgeKind::Vote, EdgeEnd::Target, star.id, None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(voters.total_docs, 2);

        let filtered = db
            .list_edge_profiles(EdgeKind::Vote, EdgeEnd::Target, star.id, Some("BO"), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(filtered.total_docs, 1);
        assert_eq!(filtered.docs[0].username, "bob");
        assert_eq!(filtered.docs[0].fullname, "bob Tester");

        let among = db
            .edge_targets_among(EdgeKind::Vote, amy.id, &[star.id, bob.id])
            .await
            .unwrap();
        assert!(among.contains(&star.id));
        assert!(!among.contains(&bob.id));
    }

    #[tokio::test]
    async fn test_post_edges_cannot_project_targets() {
        let db = Database::new_in_memory().await.unwrap();
        let err = db
            .list_edge_profiles(EdgeKind::Like, EdgeEnd::Actor, 1, None, PageRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
