//! Warms an image cache ahead of navigation.
//!
//! Requests are debounced so rapid selection changes only start loads for the
//! last request, at most `max_concurrent` loads run at once, and a URL is
//! never attempted twice. Failures count as completions. Nothing is reported
//! back to the caller.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

pub const DEFAULT_MAX_CONCURRENT: usize = 3;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// A started image load.
pub enum ImageLoad {
    /// The image was already available; nothing is in flight.
    Ready,
    /// Resolves when the load finishes, successfully or not.
    Pending(BoxFuture<'static, ()>),
}

/// Platform capability for fetching one image.
pub trait ImageLoader: Send + Sync + 'static {
    fn load(&self, url: &str) -> ImageLoad;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadSettings {
    pub max_concurrent: usize,
    pub debounce: Duration,
}

impl Default for PreloadSettings {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Default)]
struct PreloadQueue {
    attempted: HashSet<String>,
    queued: VecDeque<String>,
    in_flight: HashSet<String>,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every request; a timer only drains the queue it was armed for.
    timer_generation: u64,
}

struct Shared<L> {
    loader: L,
    settings: PreloadSettings,
    runtime: Handle,
    queue: Mutex<PreloadQueue>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<L: ImageLoader> Shared<L> {
    /// Runs when a debounce timer fires. A timer that was superseded after it
    /// woke up finds a newer generation and leaves the queue alone.
    fn fire(self: &Arc<Self>, generation: u64) {
        let mut queue = lock(&self.queue);
        if queue.timer_generation != generation {
            trace!(generation, "stale preload timer");
            return;
        }
        queue.timer = None;
        self.start_queued(&mut queue);
    }

    fn finish(self: &Arc<Self>, url: &str) {
        let mut queue = lock(&self.queue);
        queue.in_flight.remove(url);
        trace!(%url, "image preload finished");
        self.start_queued(&mut queue);
    }

    /// Starts queued loads until the concurrency window is full.
    fn start_queued(self: &Arc<Self>, queue: &mut PreloadQueue) {
        while queue.in_flight.len() < self.settings.max_concurrent {
            let Some(url) = queue.queued.pop_front() else {
                break;
            };
            if !queue.attempted.insert(url.clone()) {
                continue;
            }

            match self.loader.load(&url) {
                ImageLoad::Ready => trace!(%url, "image already cached"),
                ImageLoad::Pending(done) => {
                    trace!(%url, "preloading image");
                    queue.in_flight.insert(url.clone());
                    let shared = Arc::downgrade(self);
                    self.runtime.spawn(async move {
                        done.await;
                        if let Some(shared) = shared.upgrade() {
                            shared.finish(&url);
                        }
                    });
                }
            }
        }
    }
}

pub struct ImagePreloader<L> {
    shared: Arc<Shared<L>>,
}

impl<L: ImageLoader> ImagePreloader<L> {
    pub fn new(loader: L) -> Self {
        Self::with_settings(loader, PreloadSettings::default())
    }

    /// Timers and loads run on the Tokio runtime this is created in, so
    /// requests may come from any thread afterwards.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn with_settings(loader: L, settings: PreloadSettings) -> Self {
        Self::with_handle(loader, settings, Handle::current())
    }

    pub fn with_handle(loader: L, settings: PreloadSettings, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                loader,
                settings,
                runtime,
                queue: Mutex::new(PreloadQueue::default()),
            }),
        }
    }

    pub fn loader(&self) -> &L {
        &self.shared.loader
    }

    /// Replaces the pending queue with the URLs not yet attempted and starts
    /// loading them once the debounce delay passes without another request.
    /// Loads already in flight keep running.
    pub fn preload_images<I>(&self, urls: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut queue = lock(&self.shared.queue);
        queue.timer_generation += 1;
        if let Some(timer) = queue.timer.take() {
            timer.abort();
        }

        let fresh: VecDeque<String> = urls
            .into_iter()
            .map(Into::<String>::into)
            .filter(|url| !queue.attempted.contains(url))
            .collect();
        queue.queued = fresh;
        if queue.queued.is_empty() {
            return;
        }

        debug!(queued = queue.queued.len(), "scheduling image preload");
        let shared: Weak<Shared<L>> = Arc::downgrade(&self.shared);
        let delay = self.shared.settings.debounce;
        let generation = queue.timer_generation;
        queue.timer = Some(self.shared.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = shared.upgrade() {
                shared.fire(generation);
            }
        }));
    }

    pub fn in_flight(&self) -> usize {
        lock(&self.shared.queue).in_flight.len()
    }

    pub fn queued(&self) -> usize {
        lock(&self.shared.queue).queued.len()
    }

    pub fn was_attempted(&self, url: &str) -> bool {
        lock(&self.shared.queue).attempted.contains(url)
    }
}

impl<L> Drop for ImagePreloader<L> {
    fn drop(&mut self) {
        let mut queue = lock(&self.shared.queue);
        queue.timer_generation += 1;
        if let Some(timer) = queue.timer.take() {
            timer.abort();
        }
    }
}

/// Fetches images over HTTP and keeps their bytes in memory.
#[derive(Clone, Default)]
pub struct HttpImageLoader {
    client: reqwest::Client,
    cache: Arc<Mutex<HashMap<String, Arc<[u8]>>>>,
}

impl HttpImageLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            cache: Arc::default(),
        }
    }

    pub fn cached(&self, url: &str) -> Option<Arc<[u8]>> {
        lock(&self.cache).get(url).cloned()
    }

    pub fn cached_count(&self) -> usize {
        lock(&self.cache).len()
    }
}

impl ImageLoader for HttpImageLoader {
    fn load(&self, url: &str) -> ImageLoad {
        if lock(&self.cache).contains_key(url) {
            return ImageLoad::Ready;
        }

        let client = self.client.clone();
        let cache = Arc::clone(&self.cache);
        let url = url.to_string();
        ImageLoad::Pending(Box::pin(async move {
            let fetched = async {
                client
                    .get(&url)
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await
            }
            .await;
            match fetched {
                Ok(bytes) => {
                    lock(&cache).insert(url, Arc::from(bytes.as_ref()));
                }
                Err(err) => debug!(%url, error = %err, "image preload failed"),
            }
        }))
    }
}
