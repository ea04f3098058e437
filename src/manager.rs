use std::{path::Path, sync::Arc};

use tokio::sync::{RwLock, broadcast};

use crate::{event::UiEvent, model::ShowflowModel};

/// Shared handle to the in-memory showflow document. Cheap to clone; all
/// clones see the same document.
#[derive(Clone)]
pub struct ShowflowManager {
    state: Arc<RwLock<ShowflowModel>>,
    event_tx: broadcast::Sender<UiEvent>,
}

impl ShowflowManager {
    pub fn new(event_tx: broadcast::Sender<UiEvent>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ShowflowModel::default())),
            event_tx,
        }
    }

    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, ShowflowModel> {
        self.state.read().await
    }

    pub async fn write_with<F, R>(&self, updater: F) -> R
    where
        F: FnOnce(&mut ShowflowModel) -> R,
    {
        let mut guard = self.state.write().await;
        updater(&mut guard)
    }

    pub async fn load_from_file(&self, path: &Path) -> Result<(), anyhow::Error> {
        let content = tokio::fs::read_to_string(path).await?;

        let new_model: ShowflowModel =
            tokio::task::spawn_blocking(move || serde_json::from_str(&content)).await??;

        self.write_with(|state| {
            *state = new_model;
        })
        .await;

        log::info!("Showflow loaded from: {}", path.display());
        let _ = self.event_tx.send(UiEvent::ShowflowLoaded);
        Ok(())
    }

    pub async fn save_to_file(&self, path: &Path) -> Result<(), anyhow::Error> {
        let model_clone = self.read().await.clone();

        let content =
            tokio::task::spawn_blocking(move || serde_json::to_string_pretty(&model_clone))
                .await??;

        tokio::fs::write(path, content).await?;
        log::info!("Showflow saved to: {}", path.display());
        let _ = self.event_tx.send(UiEvent::ShowflowSaved);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("showflow-manager-{}.json", Uuid::new_v4()))
    }

    fn setup_manager() -> (ShowflowManager, broadcast::Receiver<UiEvent>) {
        let (event_tx, event_rx) = broadcast::channel::<UiEvent>(32);
        (ShowflowManager::new(event_tx), event_rx)
    }

    #[tokio::test]
    async fn save_and_reload_round_trips_the_document() {
        let (manager, mut event_rx) = setup_manager();
        manager
            .write_with(|model| {
                model.show_id = "TXTB".to_string();
                model.fps = 50;
            })
            .await;

        let path = temp_path();
        manager.save_to_file(&path).await.unwrap();
        assert_eq!(event_rx.recv().await.unwrap(), UiEvent::ShowflowSaved);

        let (other, mut other_rx) = setup_manager();
        other.load_from_file(&path).await.unwrap();
        assert_eq!(other_rx.recv().await.unwrap(), UiEvent::ShowflowLoaded);

        let model = other.read().await;
        assert_eq!(model.show_id, "TXTB");
        assert_eq!(model.fps, 50);
        drop(model);
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn load_of_missing_file_is_an_error() {
        let (manager, _event_rx) = setup_manager();
        assert!(
            manager
                .load_from_file(Path::new("/nonexistent/flow.json"))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn clones_share_one_document() {
        let (manager, _event_rx) = setup_manager();
        let clone = manager.clone();
        manager
            .write_with(|model| model.show_id = "shared".to_string())
            .await;
        assert_eq!(clone.read().await.show_id, "shared");
    }
}
