//! Key/value metadata attached to asset links.

use tracing::{info, instrument};

use db::models::{AssetLinkMetadataRow, MetadataValueType};
use db::repository::{asset_links as link_repo, link_metadata as meta_repo};
use db::DbPool;

use crate::validation::{validate_metadata_value, MAX_TEXT_LEN};
use crate::EngineError;

/// Metadata operations scoped to existing asset links.
#[derive(Debug, Clone)]
pub struct LinkMetadataService {
    pool: DbPool,
}

impl LinkMetadataService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Attach a new entry to a link.
    ///
    /// # Errors
    /// - [`EngineError::NotFound`] if the link does not exist.
    /// - [`EngineError::InvalidField`] / [`EngineError::InvalidMetadataValue`].
    /// - [`EngineError::DuplicateMetadataKey`] if the key is already set.
    #[instrument(skip(self, metadata_value))]
    pub async fn create(
        &self,
        asset_link_id: &str,
        metadata_key: &str,
        metadata_value: &str,
        metadata_value_type: MetadataValueType,
    ) -> Result<AssetLinkMetadataRow, EngineError> {
        self.require_link(asset_link_id).await?;
        validate_key(metadata_key)?;
        validate_metadata_value(metadata_value, metadata_value_type)?;

        let row = AssetLinkMetadataRow {
            asset_link_id: asset_link_id.to_owned(),
            metadata_key: metadata_key.to_owned(),
            metadata_value: metadata_value.to_owned(),
            metadata_value_type,
        };

        match meta_repo::insert_metadata(&self.pool, &row).await {
            Ok(()) => {}
            Err(e) if e.is_unique_violation() => {
                return Err(EngineError::DuplicateMetadataKey(metadata_key.to_owned()))
            }
            Err(e) => return Err(e.into()),
        }

        info!("metadata '{metadata_key}' added to asset link {asset_link_id}");
        Ok(row)
    }

    /// Every entry of a link, ordered by key.
    pub async fn list(
        &self,
        asset_link_id: &str,
    ) -> Result<Vec<AssetLinkMetadataRow>, EngineError> {
        self.require_link(asset_link_id).await?;
        Ok(meta_repo::list_metadata(&self.pool, asset_link_id).await?)
    }

    /// Replace the value (and type) of an existing entry.
    #[instrument(skip(self, metadata_value))]
    pub async fn update(
        &self,
        asset_link_id: &str,
        metadata_key: &str,
        metadata_value: &str,
        metadata_value_type: MetadataValueType,
    ) -> Result<AssetLinkMetadataRow, EngineError> {
        validate_metadata_value(metadata_value, metadata_value_type)?;

        meta_repo::update_metadata(
            &self.pool,
            asset_link_id,
            metadata_key,
            metadata_value,
            metadata_value_type,
        )
        .await
        .map_err(|e| EngineError::not_found_or(e, metadata_label(asset_link_id, metadata_key)))?;

        Ok(AssetLinkMetadataRow {
            asset_link_id: asset_link_id.to_owned(),
            metadata_key: metadata_key.to_owned(),
            metadata_value: metadata_value.to_owned(),
            metadata_value_type,
        })
    }

    /// Remove one entry.
    pub async fn delete(&self, asset_link_id: &str, metadata_key: &str) -> Result<(), EngineError> {
        meta_repo::delete_metadata(&self.pool, asset_link_id, metadata_key)
            .await
            .map_err(|e| {
                EngineError::not_found_or(e, metadata_label(asset_link_id, metadata_key))
            })?;
        info!("metadata '{metadata_key}' removed from asset link {asset_link_id}");
        Ok(())
    }

    async fn require_link(&self, asset_link_id: &str) -> Result<(), EngineError> {
        link_repo::get_link(&self.pool, asset_link_id)
            .await
            .map(|_| ())
            .map_err(|e| EngineError::not_found_or(e, format!("asset link '{asset_link_id}'")))
    }
}

fn validate_key(metadata_key: &str) -> Result<(), EngineError> {
    let len = metadata_key.chars().count();
    if len == 0 || len > MAX_TEXT_LEN {
        return Err(EngineError::invalid(
            "metadataKey",
            "must be between 1 and 256 characters",
        ));
    }
    Ok(())
}

fn metadata_label(asset_link_id: &str, metadata_key: &str) -> String {
    format!("metadata '{metadata_key}' on asset link '{asset_link_id}'")
}
