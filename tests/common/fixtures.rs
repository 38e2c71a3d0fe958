use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::oneshot;

use screenflow::{ImageLoad, ImageLoader};

/// JSON for one screen node, with hotspots pointing at `targets`.
pub fn node_json(id: u64, targets: &[u64], links: Vec<Value>) -> Value {
    let hotspots: Vec<Value> = targets
        .iter()
        .map(|target| {
            json!({
                "x": 10, "y": 10, "width": 80, "height": 30,
                "screenID": id, "targetScreenID": target
            })
        })
        .collect();
    let link_ids: Vec<u64> = links
        .iter()
        .filter_map(|link| link["id"].as_u64())
        .collect();

    json!({
        "id": id,
        "screen": {
            "id": id,
            "name": format!("Screen {id}"),
            "clientFilename": format!("screen-{id}.png"),
            "imageUrl": format!("https://cdn.test/{id}.png"),
            "thumbnailUrl": format!("https://cdn.test/{id}-thumb.png"),
            "width": 750,
            "height": 1334
        },
        "hotspots": hotspots,
        "links": links,
        "hardLinkIDs": link_ids,
        "softLinkIDs": []
    })
}

/// Login (1) -> Dashboard (2) -> { Settings (3), Profile (4) };
/// Legacy (8) is not reachable from the root.
pub fn flow_document(project_name: &str) -> Value {
    let settings = node_json(3, &[2], vec![]);
    let profile = node_json(4, &[2, 99], vec![]);
    let dashboard = node_json(2, &[3, 4, 3], vec![settings, profile]);
    let login = node_json(1, &[2], vec![dashboard]);

    json!({
        "project": { "id": 42, "name": project_name },
        "projectOrientation": "portrait",
        "tree": {
            "root": login,
            "unreachable": [node_json(8, &[1], vec![])]
        }
    })
}

/// Writes `<dir>/<version>/data.json` for each document.
/// Returns the temp directory, which must be kept alive.
pub fn write_documents(documents: &[(u32, Value)]) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp directory");
    for (version, document) in documents {
        let version_dir = dir.path().join(version.to_string());
        std::fs::create_dir_all(&version_dir).expect("Failed to create version directory");
        std::fs::write(
            version_dir.join("data.json"),
            serde_json::to_vec_pretty(document).expect("Failed to encode document"),
        )
        .expect("Failed to write document");
    }
    dir
}

/// Image loader whose loads stay in flight for the whole test.
#[derive(Clone, Default)]
pub struct StalledImageLoader {
    started: Arc<Mutex<Vec<String>>>,
    pending: Arc<Mutex<HashMap<String, oneshot::Sender<()>>>>,
}

impl StalledImageLoader {
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

impl ImageLoader for StalledImageLoader {
    fn load(&self, url: &str) -> ImageLoad {
        self.started.lock().unwrap().push(url.to_string());
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(url.to_string(), tx);
        ImageLoad::Pending(Box::pin(async move {
            let _ = rx.await;
        }))
    }
}

/// Waits past the default preload debounce on a paused clock.
pub async fn past_debounce() {
    tokio::time::sleep(std::time::Duration::from_millis(501)).await;
}
