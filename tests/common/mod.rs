use std::sync::{Arc, Mutex};

use axum_test::TestServer;
use serde_json::json;

use boomie_api::{
    auth::IdentityVerifier,
    db::{MemoryStore, Store},
    error::{AppError, AppResult},
    models::CatalogAlbum,
    routes::{create_router, AppState},
    services::{
        agent::{ModelReply, ToolCall, ToolSpec, Turn, SUBMIT_TOOL},
        BoomieAgent, CatalogProvider, LanguageModel, RecommendationService,
    },
};

/// Accepts `token-<uid>` and records deleted identities
#[derive(Default)]
pub struct StaticIdentity {
    pub deleted: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl IdentityVerifier for StaticIdentity {
    async fn verify_id_token(&self, token: &str) -> AppResult<String> {
        token
            .strip_prefix("token-")
            .filter(|uid| !uid.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Unauthorized("bad token".to_string()))
    }

    async fn delete_user(&self, uid: &str) -> AppResult<()> {
        self.deleted.lock().unwrap().push(uid.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Submits the queued (album, artist) pairs in order
pub struct ScriptedModel {
    queue: Mutex<Vec<(String, String)>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(picks: &[(&str, &str)]) -> Self {
        Self {
            queue: Mutex::new(
                picks
                    .iter()
                    .rev()
                    .map(|(album, artist)| (album.to_string(), artist.to_string()))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, conversation: &[Turn], _tools: &[ToolSpec]) -> AppResult<ModelReply> {
        if let Some(Turn::User(prompt)) = conversation.first() {
            self.prompts.lock().unwrap().push(prompt.clone());
        }
        let (album, artist) = self
            .queue
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| AppError::Generation("no scripted picks left".to_string()))?;

        Ok(ModelReply::ToolCalls(vec![ToolCall {
            name: SUBMIT_TOOL.to_string(),
            args: json!({
                "recommendedAlbumName": album,
                "recommendedArtistName": artist,
                "tagline": "Worth your evening",
                "albumDescription": "A landmark record. It still sounds fresh.",
                "whyForUser": "It matches what you loved."
            }),
            signature: None,
        }]))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A fixed in-memory catalog
pub struct StubCatalog {
    albums: Vec<CatalogAlbum>,
}

impl StubCatalog {
    pub fn new(entries: &[(&str, &str, &str)]) -> Self {
        Self {
            albums: entries
                .iter()
                .map(|(id, name, artist)| CatalogAlbum {
                    id: id.to_string(),
                    name: name.to_string(),
                    artist_name: artist.to_string(),
                    artist_id: Some(format!("artist-{}", id)),
                    image_url: format!("https://img.test/{}", id),
                })
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl CatalogProvider for StubCatalog {
    async fn search_albums(&self, query: &str, _limit: u8) -> AppResult<Vec<CatalogAlbum>> {
        let query = query.to_lowercase();
        Ok(self
            .albums
            .iter()
            .filter(|a| query.contains(&a.name.to_lowercase()))
            .cloned()
            .collect())
    }

    async fn get_album(&self, album_id: &str) -> AppResult<Option<CatalogAlbum>> {
        Ok(self.albums.iter().find(|a| a.id == album_id).cloned())
    }

    async fn get_artist_image(&self, artist_id: &str) -> AppResult<String> {
        Ok(format!("https://img.test/{}", artist_id))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<MemoryStore>,
    pub identity: Arc<StaticIdentity>,
    pub model: Arc<ScriptedModel>,
}

pub fn create_test_app(picks: &[(&str, &str)], catalog: &[(&str, &str, &str)]) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let identity = Arc::new(StaticIdentity::default());
    let model = Arc::new(ScriptedModel::new(picks));
    let catalog: Arc<dyn CatalogProvider> = Arc::new(StubCatalog::new(catalog));

    let agent = BoomieAgent::new(model.clone(), catalog.clone(), 3);
    let recommendations = Arc::new(RecommendationService::new(
        store.clone(),
        agent,
        catalog,
        3,
    ));

    let app = create_router(AppState {
        store: store.clone() as Arc<dyn Store>,
        identity: identity.clone(),
        recommendations,
    });

    TestApp {
        server: TestServer::new(app).unwrap(),
        store,
        identity,
        model,
    }
}
