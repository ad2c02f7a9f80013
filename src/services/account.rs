use crate::{auth::IdentityVerifier, db::Store, error::AppResult};

/// Deletes the user's stored data, then the identity itself.
///
/// Data goes first so a failed identity deletion never leaves data behind
/// for an account that can still sign in and retry.
pub async fn delete_account(
    store: &dyn Store,
    identity: &dyn IdentityVerifier,
    uid: &str,
) -> AppResult<()> {
    store.delete_user_data(uid).await?;
    tracing::info!(uid, store = store.name(), "User data deleted");

    identity.delete_user(uid).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockIdentityVerifier;
    use crate::db::MockStore;
    use crate::error::AppError;
    use mockall::{predicate::eq, Sequence};

    #[tokio::test]
    async fn test_data_deleted_before_identity() {
        let mut seq = Sequence::new();
        let mut store = MockStore::new();
        let mut identity = MockIdentityVerifier::new();

        store
            .expect_delete_user_data()
            .with(eq("u1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        store.expect_name().return_const("mock");
        identity
            .expect_delete_user()
            .with(eq("u1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        delete_account(&store, &identity, "u1").await.unwrap();
    }

    #[tokio::test]
    async fn test_store_failure_keeps_identity() {
        let mut store = MockStore::new();
        let mut identity = MockIdentityVerifier::new();

        store
            .expect_delete_user_data()
            .returning(|_| Err(AppError::Internal("db down".to_string())));
        identity.expect_delete_user().never();

        assert!(delete_account(&store, &identity, "u1").await.is_err());
    }
}
