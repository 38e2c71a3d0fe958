use std::sync::Arc;

use tracing::debug;

use crate::preloader::{ImageLoader, ImagePreloader};
use crate::runtime::ScreenFlowRuntime;
use crate::source::DocumentSource;
use crate::store::Subscription;

/// A runtime paired with the preloader that warms images for whatever the
/// current selection links to.
///
/// Selection commands may be issued from any thread; the preloader spawns
/// onto the runtime it was created in.
pub struct FlowSession<S, L> {
    runtime: ScreenFlowRuntime<S>,
    preloader: Arc<ImagePreloader<L>>,
    _subscriptions: Vec<Subscription>,
}

impl<S: DocumentSource, L: ImageLoader> FlowSession<S, L> {
    pub fn new(runtime: ScreenFlowRuntime<S>, preloader: ImagePreloader<L>) -> Self {
        let preloader = Arc::new(preloader);

        let forward = {
            let preloader = Arc::clone(&preloader);
            runtime.watch_related_image_urls(move |urls| {
                if urls.is_empty() {
                    return;
                }
                debug!(count = urls.len(), "warming related screen images");
                preloader.preload_images(urls.iter().cloned());
            })
        };

        Self {
            runtime,
            preloader,
            _subscriptions: vec![forward],
        }
    }

    pub fn runtime(&self) -> &ScreenFlowRuntime<S> {
        &self.runtime
    }

    pub fn preloader(&self) -> &ImagePreloader<L> {
        &self.preloader
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::derive::fixtures::sample_tree;
    use crate::preloader::testing::{RecordingLoader, settle};
    use crate::runtime::testing::{ManualSource, document};

    #[tokio::test(start_paused = true)]
    async fn selection_warms_linked_images() {
        let source = ManualSource::default();
        source.expect(1).send(Ok(document(1, sample_tree()))).unwrap();
        let loader = RecordingLoader::default();
        let session = FlowSession::new(
            ScreenFlowRuntime::new(source),
            ImagePreloader::new(loader.clone()),
        );
        session.runtime().load(1).await.unwrap();

        session.runtime().select_screen_id(1);
        tokio::time::sleep(Duration::from_millis(501)).await;
        assert_eq!(loader.started(), vec!["/images/2.png", "/images/3.png"]);

        // Deselecting emits an empty list, which must not cancel anything.
        session.runtime().unselect_tree_node();
        session.runtime().select_screen_id(2);
        tokio::time::sleep(Duration::from_millis(501)).await;
        settle().await;
        assert_eq!(
            loader.started(),
            vec!["/images/2.png", "/images/3.png", "/images/4.png"]
        );
        assert_eq!(session.preloader().queued(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn selection_from_plain_thread_warms_images() {
        let source = ManualSource::default();
        source.expect(1).send(Ok(document(1, sample_tree()))).unwrap();
        let loader = RecordingLoader::default();
        let session = FlowSession::new(
            ScreenFlowRuntime::new(source),
            ImagePreloader::new(loader.clone()),
        );
        session.runtime().load(1).await.unwrap();

        let runtime = session.runtime().clone();
        let selected = std::thread::spawn(move || runtime.select_screen_id(2))
            .join()
            .unwrap();
        assert!(selected);

        tokio::time::sleep(Duration::from_millis(501)).await;
        assert_eq!(loader.started(), vec!["/images/4.png", "/images/5.png"]);
    }
}
