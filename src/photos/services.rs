use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::users::model::{User, UserParam, UserPatch};

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Replace the user's single profile photo.
///
/// Ordering is delete-old, upload-new, persist-link. If the upload fails
/// after a successful delete the user is left without either object until
/// the next attempt; if persisting the link fails the fresh object is
/// orphaned in the store. Both partial-failure states are reported to the
/// caller, never papered over.
pub async fn replace_photo(
    state: &AppState,
    user: &User,
    body: Bytes,
    content_type: &str,
) -> Result<String, AppError> {
    if let Some(old_key) = user.photo_key.as_deref() {
        state
            .storage
            .delete(old_key)
            .await
            .map_err(|e| AppError::DeleteFailed(e.to_string()))?;
        info!(user_id = %user.id, key = %old_key, "old photo deleted");
    }

    let ext = ext_from_mime(content_type).unwrap_or("bin");
    let key = format!("users/{}/{}.{}", user.id, Uuid::new_v4(), ext);
    state
        .storage
        .upload(&key, body, content_type)
        .await
        .map_err(|e| AppError::UploadFailed(e.to_string()))?;

    if let Err(e) = state
        .users
        .update_partial(UserPatch::photo(key.clone()), &UserParam::by_id(user.id))
        .await
    {
        warn!(user_id = %user.id, key = %key, error = %e, "photo uploaded but link not persisted; object orphaned");
        return Err(e);
    }

    info!(user_id = %user.id, key = %key, "photo replaced");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_user, test_state};

    #[test]
    fn ext_from_mime_maps_known_types_only() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn first_photo_uploads_once_and_deletes_nothing() {
        let (state, users, store) = test_state();
        let user = users.insert(sample_user("a@x.com"));
        assert!(user.photo_key.is_none());

        let key = replace_photo(&state, &user, Bytes::from_static(b"img"), "image/png")
            .await
            .expect("replace");

        assert_eq!(store.uploads(), vec![key.clone()]);
        assert!(store.deletes().is_empty());
        assert_eq!(users.get_by_email("a@x.com").unwrap().photo_key, Some(key));
    }

    #[tokio::test]
    async fn existing_photo_is_deleted_then_replaced() {
        let (state, users, store) = test_state();
        let mut user = sample_user("a@x.com");
        user.photo_key = Some("users/old.jpg".into());
        let user = users.insert(user);

        let key = replace_photo(&state, &user, Bytes::from_static(b"img"), "image/jpeg")
            .await
            .expect("replace");

        assert_eq!(store.deletes(), vec!["users/old.jpg".to_string()]);
        assert_eq!(store.uploads(), vec![key.clone()]);
        assert_eq!(users.get_by_email("a@x.com").unwrap().photo_key, Some(key));
    }

    #[tokio::test]
    async fn delete_failure_aborts_before_upload() {
        let (state, users, store) = test_state();
        let mut user = sample_user("a@x.com");
        user.photo_key = Some("users/old.jpg".into());
        let user = users.insert(user);
        store.fail_next_delete();

        let err = replace_photo(&state, &user, Bytes::from_static(b"img"), "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DeleteFailed(_)));
        assert!(store.uploads().is_empty());
        assert_eq!(
            users.get_by_email("a@x.com").unwrap().photo_key,
            Some("users/old.jpg".into())
        );
    }

    #[tokio::test]
    async fn upload_failure_leaves_stored_reference_unchanged() {
        let (state, users, store) = test_state();
        let user = users.insert(sample_user("a@x.com"));
        store.fail_next_upload();

        let err = replace_photo(&state, &user, Bytes::from_static(b"img"), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UploadFailed(_)));
        assert_eq!(users.get_by_email("a@x.com").unwrap().photo_key, None);
    }
}
