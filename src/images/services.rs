use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::repo::ProfileRecord;
use crate::{error::AppError, state::AppState};

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Uploads the image, then records it against the user. The object is removed
/// again if the record cannot be written.
pub async fn upload_profile_image(
    st: &AppState,
    user_id: Uuid,
    image: UploadItem,
) -> Result<ProfileRecord, AppError> {
    let id = Uuid::new_v4();
    let ext = ext_from_mime(&image.content_type).unwrap_or("bin");
    let key = format!("profiles/{}/{}.{}", user_id, id, ext);

    let url = st
        .images
        .upload(&key, image.body, &image.content_type)
        .await
        .map_err(AppError::Upload)?;

    match st.profiles.insert(id, user_id, &url).await {
        Ok(record) => {
            info!(%user_id, profile_id = %record.id, "profile image stored");
            Ok(record)
        }
        Err(e) => {
            error!(error = %e, %key, "profile record insert failed");
            if let Err(cleanup) = st.images.remove(&key).await {
                warn!(error = %cleanup, %key, "orphaned profile image");
            }
            Err(e.into())
        }
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use crate::state::Fakes;

    fn png() -> UploadItem {
        UploadItem {
            body: Bytes::from_static(b"\x89PNG fake"),
            content_type: "image/png".into(),
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn upload_links_url_to_user() {
        let (state, Fakes { images, profiles, .. }) = AppState::fake_with(false);
        let user_id = Uuid::new_v4();

        let record = upload_profile_image(&state, user_id, png()).await.unwrap();
        assert_eq!(record.user_id, user_id);
        assert!(record.image_url.starts_with("https://images.test/profiles/"));
        assert!(record.image_url.ends_with(".png"));
        assert_eq!(images.keys().len(), 1);
        assert_eq!(profiles.records.read().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_upload_writes_no_record() {
        let (state, Fakes { images, profiles, .. }) = AppState::fake_with(false);
        images.fail_uploads(true);

        let err = upload_profile_image(&state, Uuid::new_v4(), png()).await.unwrap_err();
        assert!(matches!(err, AppError::Upload(_)));
        assert!(profiles.records.read().await.is_empty());
    }

    #[tokio::test]
    async fn failed_record_removes_uploaded_object() {
        let (state, Fakes { images, profiles, .. }) = AppState::fake_with(false);
        profiles.set_offline(true);

        let err = upload_profile_image(&state, Uuid::new_v4(), png()).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert!(images.keys().is_empty());
    }
}
