//! Asset link graph maintenance.
//!
//! `AssetLinkService` owns every rule about edges between assets:
//! 1. Both endpoints must exist and differ.
//! 2. Each asset carries at most `max_links_per_asset` links.
//! 3. No duplicate edges (see [`AssetLinkService::create_link`]).
//! 4. Parent-child edges never form a cycle.
//! 5. Deleting an edge deletes its metadata with it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use db::models::{AssetLinkRow, AssetRow, RelationshipType};
use db::repository::{asset_links as link_repo, assets as asset_repo};
use db::DbPool;

use crate::models::{
    AssetKey, AssetLinks, AssetTreeNode, ChildLinks, HiddenCounts, LinkedAsset, NewAssetLink,
};
use crate::validation::{validate_asset_id, validate_database_id, validate_string_256};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the link graph.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Maximum number of links (either direction) a single asset may carry.
    pub max_links_per_asset: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            max_links_per_asset: 500,
        }
    }
}

// ---------------------------------------------------------------------------
// AssetLinkService
// ---------------------------------------------------------------------------

/// Creates, lists, and removes links between assets.
#[derive(Debug, Clone)]
pub struct AssetLinkService {
    pool: DbPool,
    config: LinkConfig,
    /// Held from the limit/duplicate/cycle checks through the insert.
    create_lock: Arc<Mutex<()>>,
}

impl AssetLinkService {
    /// Create a new service.
    pub fn new(pool: DbPool, config: LinkConfig) -> Self {
        Self {
            pool,
            config,
            create_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Validate and store a new link, returning the stored row.
    ///
    /// Creations through one service (and its clones) run one at a time, so
    /// the checks below see every link stored before them.
    ///
    /// Duplicate rules: a `related` link between the two assets in either
    /// direction is a duplicate. A `parentChild` link with the same endpoints
    /// and the same alias (or no alias on both) is a duplicate, and any
    /// parent-child link in the reverse direction is rejected.
    ///
    /// # Errors
    /// - [`EngineError::InvalidField`] for malformed IDs, alias, or tags.
    /// - [`EngineError::SelfLink`] if both endpoints are the same asset.
    /// - [`EngineError::UnknownAssetReference`] if an endpoint is missing.
    /// - [`EngineError::LinkLimitExceeded`] if an endpoint is full.
    /// - [`EngineError::DuplicateLink`] / [`EngineError::CycleDetected`].
    #[instrument(skip(self, request), fields(
        from = %request.from_key(),
        to = %request.to_key(),
        relationship = %request.relationship_type,
    ))]
    pub async fn create_link(&self, request: NewAssetLink) -> Result<AssetLinkRow, EngineError> {
        validate_database_id("fromDatabaseId", &request.from_database_id)?;
        validate_asset_id("fromAssetId", &request.from_asset_id)?;
        validate_database_id("toDatabaseId", &request.to_database_id)?;
        validate_asset_id("toAssetId", &request.to_asset_id)?;

        let alias = request
            .asset_link_alias_id
            .clone()
            .filter(|a| !a.trim().is_empty());
        if let Some(alias) = &alias {
            validate_string_256("assetLinkAliasId", alias)?;
        }
        for tag in &request.tags {
            validate_string_256("tags", tag)?;
        }

        let from = request.from_key();
        let to = request.to_key();

        if from == to {
            return Err(EngineError::SelfLink);
        }

        self.require_asset(&from, "from").await?;
        self.require_asset(&to, "to").await?;

        let _guard = self.create_lock.lock().await;

        for key in [&from, &to] {
            let count =
                link_repo::count_links_for_asset(&self.pool, &key.database_id, &key.asset_id)
                    .await?;
            if count as usize >= self.config.max_links_per_asset {
                return Err(EngineError::LinkLimitExceeded {
                    database_id: key.database_id.clone(),
                    asset_id: key.asset_id.clone(),
                    limit: self.config.max_links_per_asset,
                });
            }
        }

        match request.relationship_type {
            RelationshipType::Related => self.check_related_duplicate(&from, &to).await?,
            RelationshipType::ParentChild => {
                self.check_parent_child_duplicate(&from, &to, alias.as_deref())
                    .await?;
                if self.reaches(&to, &from).await? {
                    warn!("rejecting parent-child link that would close a cycle");
                    return Err(EngineError::CycleDetected);
                }
            }
        }

        let row = AssetLinkRow {
            asset_link_id: Uuid::new_v4().to_string(),
            from_database_id: from.database_id,
            from_asset_id: from.asset_id,
            to_database_id: to.database_id,
            to_asset_id: to.asset_id,
            relationship_type: request.relationship_type,
            asset_link_alias_id: alias,
            tags: Json(request.tags),
            created_at: Utc::now(),
        };

        let stored = link_repo::insert_link(&self.pool, &row).await?;
        info!("asset link {} created", stored.asset_link_id);
        Ok(stored)
    }

    /// Fetch a single link.
    pub async fn get_link(&self, asset_link_id: &str) -> Result<AssetLinkRow, EngineError> {
        link_repo::get_link(&self.pool, asset_link_id)
            .await
            .map_err(|e| EngineError::not_found_or(e, format!("asset link '{asset_link_id}'")))
    }

    /// Replace the tags of a link.
    pub async fn update_link_tags(
        &self,
        asset_link_id: &str,
        tags: Vec<String>,
    ) -> Result<AssetLinkRow, EngineError> {
        for tag in &tags {
            validate_string_256("tags", tag)?;
        }
        link_repo::update_link_tags(&self.pool, asset_link_id, &tags)
            .await
            .map_err(|e| EngineError::not_found_or(e, format!("asset link '{asset_link_id}'")))?;
        self.get_link(asset_link_id).await
    }

    /// Remove a link and cascade-delete its metadata.
    #[instrument(skip(self))]
    pub async fn delete_link(&self, asset_link_id: &str) -> Result<(), EngineError> {
        let removed = link_repo::delete_link_cascade(&self.pool, asset_link_id)
            .await
            .map_err(|e| EngineError::not_found_or(e, format!("asset link '{asset_link_id}'")))?;
        info!("asset link {asset_link_id} deleted with {removed} metadata rows");
        Ok(())
    }

    /// Everything linked to `(database_id, asset_id)`, grouped into related,
    /// parents, and children.
    ///
    /// Links whose other end is archived or missing are left out and counted
    /// in [`AssetLinks::hidden`]. With `child_tree_view`, `children` holds
    /// the whole descendant tree instead of the direct children.
    #[instrument(skip(self))]
    pub async fn list_links(
        &self,
        database_id: &str,
        asset_id: &str,
        child_tree_view: bool,
    ) -> Result<AssetLinks, EngineError> {
        let root = AssetKey::new(database_id, asset_id);
        if asset_repo::find_asset(&self.pool, database_id, asset_id)
            .await?
            .is_none()
        {
            return Err(EngineError::NotFound(format!("asset '{root}'")));
        }

        let mut resolver = AssetResolver::new(&self.pool);
        let mut related = Vec::new();
        let mut parents = Vec::new();
        let mut children = Vec::new();
        let mut hidden = HiddenCounts::default();

        for link in link_repo::links_from(&self.pool, database_id, asset_id).await? {
            let other = AssetKey::new(&link.to_database_id, &link.to_asset_id);
            let visible = resolver.visible(&other).await?;
            match (link.relationship_type, visible) {
                (RelationshipType::Related, Some(asset)) => related.push(linked(&link, &asset)),
                (RelationshipType::Related, None) => hidden.related += 1,
                (RelationshipType::ParentChild, Some(asset)) => {
                    children.push(linked(&link, &asset))
                }
                (RelationshipType::ParentChild, None) => hidden.children += 1,
            }
        }

        for link in link_repo::links_to(&self.pool, database_id, asset_id).await? {
            let other = AssetKey::new(&link.from_database_id, &link.from_asset_id);
            let visible = resolver.visible(&other).await?;
            match (link.relationship_type, visible) {
                (RelationshipType::Related, Some(asset)) => related.push(linked(&link, &asset)),
                (RelationshipType::Related, None) => hidden.related += 1,
                (RelationshipType::ParentChild, Some(asset)) => parents.push(linked(&link, &asset)),
                (RelationshipType::ParentChild, None) => hidden.parents += 1,
            }
        }

        let children = if child_tree_view {
            ChildLinks::Tree(self.descendant_tree(&root, children, &mut resolver).await?)
        } else {
            ChildLinks::Flat(children)
        };

        Ok(AssetLinks {
            related,
            parents,
            children,
            hidden,
        })
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    async fn require_asset(
        &self,
        key: &AssetKey,
        side: &'static str,
    ) -> Result<AssetRow, EngineError> {
        asset_repo::find_asset(&self.pool, &key.database_id, &key.asset_id)
            .await?
            .ok_or_else(|| EngineError::UnknownAssetReference {
                database_id: key.database_id.clone(),
                asset_id: key.asset_id.clone(),
                side,
            })
    }

    async fn check_related_duplicate(
        &self,
        from: &AssetKey,
        to: &AssetKey,
    ) -> Result<(), EngineError> {
        let forward = link_repo::links_between(
            &self.pool,
            (&from.database_id, &from.asset_id),
            (&to.database_id, &to.asset_id),
            RelationshipType::Related,
        )
        .await?;
        let backward = link_repo::links_between(
            &self.pool,
            (&to.database_id, &to.asset_id),
            (&from.database_id, &from.asset_id),
            RelationshipType::Related,
        )
        .await?;

        if !forward.is_empty() || !backward.is_empty() {
            return Err(EngineError::DuplicateLink(
                "a relationship already exists between these assets".to_owned(),
            ));
        }
        Ok(())
    }

    async fn check_parent_child_duplicate(
        &self,
        from: &AssetKey,
        to: &AssetKey,
        alias: Option<&str>,
    ) -> Result<(), EngineError> {
        let existing = link_repo::links_between(
            &self.pool,
            (&from.database_id, &from.asset_id),
            (&to.database_id, &to.asset_id),
            RelationshipType::ParentChild,
        )
        .await?;

        if existing
            .iter()
            .any(|link| link.asset_link_alias_id.as_deref() == alias)
        {
            return Err(EngineError::DuplicateLink(
                "a parent-child relationship already exists between these assets with the provided alias"
                    .to_owned(),
            ));
        }

        let reverse = link_repo::links_between(
            &self.pool,
            (&to.database_id, &to.asset_id),
            (&from.database_id, &from.asset_id),
            RelationshipType::ParentChild,
        )
        .await?;

        if !reverse.is_empty() {
            return Err(EngineError::DuplicateLink(
                "a parent-child relationship already exists in the reverse direction".to_owned(),
            ));
        }
        Ok(())
    }

    /// Is `target` reachable from `start` by following parent → child edges?
    /// Aliases are ignored: any edge counts.
    async fn reaches(&self, start: &AssetKey, target: &AssetKey) -> Result<bool, EngineError> {
        let mut visited: HashSet<AssetKey> = HashSet::new();
        let mut queue: VecDeque<AssetKey> = VecDeque::from([start.clone()]);

        while let Some(current) = queue.pop_front() {
            if &current == target {
                return Ok(true);
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            for child in self.child_edges(&current).await? {
                let key = AssetKey::new(&child.to_database_id, &child.to_asset_id);
                if !visited.contains(&key) {
                    queue.push_back(key);
                }
            }
        }

        Ok(false)
    }

    async fn child_edges(&self, parent: &AssetKey) -> Result<Vec<AssetLinkRow>, EngineError> {
        let links = link_repo::links_from(&self.pool, &parent.database_id, &parent.asset_id).await?;
        Ok(links
            .into_iter()
            .filter(|l| l.relationship_type == RelationshipType::ParentChild)
            .collect())
    }

    /// Expand the visible direct children of `root` into a descendant tree.
    /// Each asset is expanded at most once.
    async fn descendant_tree(
        &self,
        root: &AssetKey,
        direct: Vec<LinkedAsset>,
        resolver: &mut AssetResolver<'_>,
    ) -> Result<Vec<AssetTreeNode>, EngineError> {
        let mut adjacency: HashMap<AssetKey, Vec<LinkedAsset>> = HashMap::new();
        let mut visited: HashSet<AssetKey> = HashSet::from([root.clone()]);
        let mut queue: VecDeque<AssetKey> = VecDeque::new();

        for child in &direct {
            let key = AssetKey::new(&child.database_id, &child.asset_id);
            if visited.insert(key.clone()) {
                queue.push_back(key);
            }
        }
        adjacency.insert(root.clone(), direct);

        while let Some(parent) = queue.pop_front() {
            let mut kids = Vec::new();
            for link in self.child_edges(&parent).await? {
                let key = AssetKey::new(&link.to_database_id, &link.to_asset_id);
                let Some(asset) = resolver.visible(&key).await? else {
                    continue;
                };
                kids.push(linked(&link, &asset));
                if visited.insert(key.clone()) {
                    queue.push_back(key);
                }
            }
            adjacency.insert(parent, kids);
        }

        let mut expanded = HashSet::from([root.clone()]);
        Ok(build_tree(root, &adjacency, &mut expanded))
    }
}

fn build_tree(
    parent: &AssetKey,
    adjacency: &HashMap<AssetKey, Vec<LinkedAsset>>,
    expanded: &mut HashSet<AssetKey>,
) -> Vec<AssetTreeNode> {
    let Some(kids) = adjacency.get(parent) else {
        return Vec::new();
    };

    kids.iter()
        .map(|kid| {
            let key = AssetKey::new(&kid.database_id, &kid.asset_id);
            let children = if expanded.insert(key.clone()) {
                build_tree(&key, adjacency, expanded)
            } else {
                Vec::new()
            };
            AssetTreeNode {
                asset: kid.clone(),
                children,
            }
        })
        .collect()
}

fn linked(link: &AssetLinkRow, other: &AssetRow) -> LinkedAsset {
    LinkedAsset {
        asset_link_id: link.asset_link_id.clone(),
        asset_id: other.asset_id.clone(),
        asset_name: other.asset_name.clone(),
        database_id: other.database_id.clone(),
        asset_link_alias_id: link.asset_link_alias_id.clone(),
    }
}

/// Memoised asset lookups for a single listing.
struct AssetResolver<'a> {
    pool: &'a DbPool,
    cache: HashMap<AssetKey, Option<AssetRow>>,
}

impl<'a> AssetResolver<'a> {
    fn new(pool: &'a DbPool) -> Self {
        Self {
            pool,
            cache: HashMap::new(),
        }
    }

    /// The asset if it exists and is not archived.
    async fn visible(&mut self, key: &AssetKey) -> Result<Option<AssetRow>, EngineError> {
        if let Some(cached) = self.cache.get(key) {
            return Ok(cached.clone());
        }
        let row = asset_repo::find_asset(self.pool, &key.database_id, &key.asset_id)
            .await?
            .filter(|a| !a.archived);
        self.cache.insert(key.clone(), row.clone());
        Ok(row)
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_asset, seed_database, setup};
    use db::repository::link_metadata as meta_repo;
    use db::models::{AssetLinkMetadataRow, MetadataValueType};

    fn request(from: &str, to: &str, kind: RelationshipType) -> NewAssetLink {
        NewAssetLink {
            from_database_id: "scans".into(),
            from_asset_id: from.into(),
            to_database_id: "scans".into(),
            to_asset_id: to.into(),
            relationship_type: kind,
            asset_link_alias_id: None,
            tags: vec![],
        }
    }

    async fn service_with(assets: &[&str]) -> AssetLinkService {
        let pool = setup().await;
        seed_database(&pool, "scans").await;
        for id in assets {
            seed_asset(&pool, "scans", id).await;
        }
        AssetLinkService::new(pool, LinkConfig::default())
    }

    #[tokio::test]
    async fn parent_link_shows_up_once_on_each_side() {
        let svc = service_with(&["a", "b"]).await;
        let link = svc
            .create_link(request("a", "b", RelationshipType::ParentChild))
            .await
            .expect("link should be created");

        let a = svc.list_links("scans", "a", false).await.unwrap();
        assert!(a.parents.is_empty());
        assert!(a.related.is_empty());
        match &a.children {
            ChildLinks::Flat(children) => {
                assert_eq!(children.len(), 1);
                assert_eq!(children[0].asset_id, "b");
                assert_eq!(children[0].asset_link_id, link.asset_link_id);
            }
            other => panic!("expected flat children, got {other:?}"),
        }

        let b = svc.list_links("scans", "b", false).await.unwrap();
        assert_eq!(b.parents.len(), 1);
        assert_eq!(b.parents[0].asset_id, "a");
        assert!(b.children.is_empty());
    }

    #[tokio::test]
    async fn related_links_are_symmetric() {
        let svc = service_with(&["a", "b"]).await;
        svc.create_link(request("a", "b", RelationshipType::Related))
            .await
            .unwrap();

        let a = svc.list_links("scans", "a", false).await.unwrap();
        let b = svc.list_links("scans", "b", false).await.unwrap();
        assert_eq!(a.related.len(), 1);
        assert_eq!(b.related.len(), 1);
        assert_eq!(b.related[0].asset_id, "a");

        // Same pair in the other direction is a duplicate.
        let err = svc
            .create_link(request("b", "a", RelationshipType::Related))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateLink(_)));
    }

    #[tokio::test]
    async fn concurrent_related_links_store_one() {
        let svc = service_with(&["a", "b"]).await;
        let other = svc.clone();
        let (ab, ba) = tokio::join!(
            svc.create_link(request("a", "b", RelationshipType::Related)),
            other.create_link(request("b", "a", RelationshipType::Related)),
        );

        assert_eq!([&ab, &ba].iter().filter(|r| r.is_ok()).count(), 1);
        assert!([ab, ba]
            .into_iter()
            .any(|r| matches!(r, Err(EngineError::DuplicateLink(_)))));
        let a = svc.list_links("scans", "a", false).await.unwrap();
        assert_eq!(a.related.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_opposite_parent_links_store_one() {
        let svc = service_with(&["a", "b"]).await;
        let (ab, ba) = tokio::join!(
            svc.create_link(request("a", "b", RelationshipType::ParentChild)),
            svc.create_link(request("b", "a", RelationshipType::ParentChild)),
        );

        assert_eq!([&ab, &ba].iter().filter(|r| r.is_ok()).count(), 1);
        let a = svc.list_links("scans", "a", false).await.unwrap();
        let b = svc.list_links("scans", "b", false).await.unwrap();
        assert_eq!(a.parents.len() + b.parents.len(), 1);
    }

    #[tokio::test]
    async fn self_link_is_rejected() {
        let svc = service_with(&["a"]).await;
        let err = svc
            .create_link(request("a", "a", RelationshipType::Related))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SelfLink));
    }

    #[tokio::test]
    async fn missing_endpoint_is_rejected() {
        let svc = service_with(&["a"]).await;
        let err = svc
            .create_link(request("a", "ghost", RelationshipType::Related))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnknownAssetReference { asset_id, side: "to", .. } if asset_id == "ghost"
        ));
    }

    #[tokio::test]
    async fn parent_child_aliases_allow_parallel_edges() {
        let svc = service_with(&["car", "wheel"]).await;
        let mut front = request("car", "wheel", RelationshipType::ParentChild);
        front.asset_link_alias_id = Some("front-left".into());
        let mut rear = front.clone();
        rear.asset_link_alias_id = Some("rear-left".into());

        svc.create_link(front.clone()).await.unwrap();
        svc.create_link(rear).await.unwrap();
        assert!(matches!(
            svc.create_link(front).await,
            Err(EngineError::DuplicateLink(_))
        ));

        let car = svc.list_links("scans", "car", false).await.unwrap();
        assert_eq!(car.children.len(), 2);
    }

    #[tokio::test]
    async fn reverse_parent_child_is_rejected() {
        let svc = service_with(&["a", "b"]).await;
        svc.create_link(request("a", "b", RelationshipType::ParentChild))
            .await
            .unwrap();
        let err = svc
            .create_link(request("b", "a", RelationshipType::ParentChild))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateLink(_)));
    }

    #[tokio::test]
    async fn indirect_cycle_is_detected() {
        // a → b → c, then c → a would close the loop.
        let svc = service_with(&["a", "b", "c"]).await;
        svc.create_link(request("a", "b", RelationshipType::ParentChild))
            .await
            .unwrap();
        svc.create_link(request("b", "c", RelationshipType::ParentChild))
            .await
            .unwrap();

        let err = svc
            .create_link(request("c", "a", RelationshipType::ParentChild))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::CycleDetected));

        // A related edge between the same assets is fine.
        svc.create_link(request("c", "a", RelationshipType::Related))
            .await
            .expect("related links do not participate in cycle checks");
    }

    #[tokio::test]
    async fn link_limit_is_enforced_per_asset() {
        let pool = setup().await;
        seed_database(&pool, "scans").await;
        for id in ["hub", "x1", "x2", "x3"] {
            seed_asset(&pool, "scans", id).await;
        }
        let svc = AssetLinkService::new(pool, LinkConfig { max_links_per_asset: 2 });

        svc.create_link(request("hub", "x1", RelationshipType::Related)).await.unwrap();
        svc.create_link(request("hub", "x2", RelationshipType::Related)).await.unwrap();
        let err = svc
            .create_link(request("x3", "hub", RelationshipType::Related))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::LinkLimitExceeded { asset_id, limit: 2, .. } if asset_id == "hub"
        ));
    }

    #[tokio::test]
    async fn deleting_a_link_removes_its_metadata() {
        let svc = service_with(&["a", "b"]).await;
        let link = svc
            .create_link(request("a", "b", RelationshipType::Related))
            .await
            .unwrap();

        for key in ["offset", "scale"] {
            meta_repo::insert_metadata(
                &svc.pool,
                &AssetLinkMetadataRow {
                    asset_link_id: link.asset_link_id.clone(),
                    metadata_key: key.into(),
                    metadata_value: "1".into(),
                    metadata_value_type: MetadataValueType::Number,
                },
            )
            .await
            .unwrap();
        }

        svc.delete_link(&link.asset_link_id).await.unwrap();

        let orphans = meta_repo::count_metadata(&svc.pool, &link.asset_link_id).await.unwrap();
        assert_eq!(orphans, 0);
        assert!(matches!(
            svc.get_link(&link.asset_link_id).await,
            Err(EngineError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete_link(&link.asset_link_id).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn archived_counterparts_are_hidden_and_counted() {
        let svc = service_with(&["a", "b", "c"]).await;
        svc.create_link(request("a", "b", RelationshipType::ParentChild)).await.unwrap();
        svc.create_link(request("a", "c", RelationshipType::Related)).await.unwrap();
        asset_repo::set_asset_archived(&svc.pool, "scans", "b", true).await.unwrap();

        let a = svc.list_links("scans", "a", false).await.unwrap();
        assert!(a.children.is_empty());
        assert_eq!(a.hidden.children, 1);
        assert_eq!(a.related.len(), 1);
        assert_eq!(a.hidden.related, 0);
    }

    #[tokio::test]
    async fn tree_view_nests_descendants() {
        //   root
        //   /  \
        //  l    r
        //   \  /
        //   leaf
        let svc = service_with(&["root", "l", "r", "leaf"]).await;
        for (from, to) in [("root", "l"), ("root", "r"), ("l", "leaf"), ("r", "leaf")] {
            svc.create_link(request(from, to, RelationshipType::ParentChild))
                .await
                .unwrap();
        }

        let links = svc.list_links("scans", "root", true).await.unwrap();
        let ChildLinks::Tree(tree) = links.children else {
            panic!("expected a tree");
        };
        assert_eq!(tree.len(), 2);
        let expanded_leaves: usize = tree
            .iter()
            .flat_map(|n| n.children.iter())
            .filter(|leaf| leaf.asset.asset_id == "leaf")
            .count();
        // The shared leaf appears under both parents, but only one copy is expanded.
        assert_eq!(expanded_leaves, 2);
        assert!(tree.iter().all(|n| n.children.iter().all(|c| c.children.is_empty())));
    }

    #[tokio::test]
    async fn listing_an_unknown_asset_is_not_found() {
        let svc = service_with(&[]).await;
        assert!(matches!(
            svc.list_links("scans", "nope", false).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn tags_can_be_replaced() {
        let svc = service_with(&["a", "b"]).await;
        let link = svc
            .create_link(request("a", "b", RelationshipType::Related))
            .await
            .unwrap();
        let updated = svc
            .update_link_tags(&link.asset_link_id, vec!["survey".into(), "2024".into()])
            .await
            .unwrap();
        assert_eq!(updated.tags.0, vec!["survey".to_string(), "2024".to_string()]);
    }
}
