//! Model host: load-once lifecycle for the vision-language model.
//!
//! The model is large and accelerator-resident; reloading per request is
//! unacceptable, but the first load must be allowed to fail (missing
//! accelerator dependency, sidecar still booting) without permanently
//! wedging the process. The host therefore caches only *successful* loads:
//! a failed load leaves the slot empty and the next call retries from
//! scratch.
//!
//! The host is an explicit handle owned by the orchestrator and passed to
//! the transcriber — not ambient global state — so tests and embedders can
//! run several hosts side by side with different loaders.

use crate::error::{ModelLoadError, TranscribeError};
use crate::provider::{VisionModel, VisionModelLoader};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tracing::{info, warn};

/// Handle to the (lazily loaded) vision model and its inference gate.
pub struct ModelHost {
    loader: Box<dyn VisionModelLoader>,
    /// Holding this lock across the entire load means two concurrent first
    /// requests cannot both construct the model: the second blocks until
    /// the first finishes, then observes the populated slot.
    slot: Mutex<Option<Arc<dyn VisionModel>>>,
    loaded: AtomicBool,
    /// One permit: the design assumes a single accelerator device, so
    /// concurrent inference calls are queued, not run in parallel.
    inference_gate: Semaphore,
}

impl ModelHost {
    pub fn new<L: VisionModelLoader + 'static>(loader: L) -> Self {
        Self {
            loader: Box::new(loader),
            slot: Mutex::new(None),
            loaded: AtomicBool::new(false),
            inference_gate: Semaphore::new(1),
        }
    }

    /// A host with no vision backend: every load attempt fails with a hint.
    ///
    /// Lets the rest of the pipeline (analysis fallback included) run in
    /// deployments that never configured OCR.
    pub fn unconfigured() -> Self {
        Self::new(UnconfiguredLoader)
    }

    /// Load the model if it is not already loaded, and return it.
    ///
    /// Idempotent: after the first successful load every call returns the
    /// cached handle without touching the loader. A load failure is never
    /// cached — the slot stays empty and the next call retries.
    pub async fn ensure_loaded(&self) -> Result<Arc<dyn VisionModel>, ModelLoadError> {
        let mut slot = self.slot.lock().await;
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        info!("loading vision model");
        match self.loader.load().await {
            Ok(model) => {
                *slot = Some(Arc::clone(&model));
                self.loaded.store(true, Ordering::Release);
                info!("vision model loaded");
                Ok(model)
            }
            Err(e) => {
                warn!("vision model load failed (will retry on next call): {e}");
                Err(e)
            }
        }
    }

    /// Whether a successful load has happened.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Acquire the single inference permit, queueing behind any in-flight
    /// model call.
    pub async fn inference_permit(&self) -> Result<SemaphorePermit<'_>, TranscribeError> {
        self.inference_gate
            .acquire()
            .await
            .map_err(|_| TranscribeError::Inference {
                detail: "inference gate closed".to_string(),
            })
    }
}

struct UnconfiguredLoader;

#[async_trait]
impl VisionModelLoader for UnconfiguredLoader {
    async fn load(&self) -> Result<Arc<dyn VisionModel>, ModelLoadError> {
        Err(ModelLoadError::new(
            "no vision backend configured; set an OCR host URL",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::pipeline::normalize::CanonicalImage;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct StubModel;

    #[async_trait]
    impl VisionModel for StubModel {
        async fn encode_prompt(
            &self,
            _image: &CanonicalImage,
            _instruction: &str,
        ) -> Result<Vec<u32>, ProviderError> {
            Ok(vec![1, 2, 3])
        }

        async fn generate(
            &self,
            prompt_tokens: &[u32],
            _max_new_tokens: usize,
        ) -> Result<Vec<u32>, ProviderError> {
            Ok(prompt_tokens.to_vec())
        }

        async fn decode(&self, _tokens: &[u32]) -> Result<String, ProviderError> {
            Ok(String::new())
        }
    }

    struct CountingLoader {
        loads: Arc<AtomicUsize>,
        fail_first: bool,
    }

    #[async_trait]
    impl VisionModelLoader for CountingLoader {
        async fn load(&self) -> Result<Arc<dyn VisionModel>, ModelLoadError> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(ModelLoadError::new("transient failure"));
            }
            Ok(Arc::new(StubModel))
        }
    }

    #[tokio::test]
    async fn ensure_loaded_constructs_at_most_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let host = ModelHost::new(CountingLoader {
            loads: Arc::clone(&loads),
            fail_first: false,
        });

        assert!(!host.is_loaded());
        host.ensure_loaded().await.unwrap();
        host.ensure_loaded().await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(host.is_loaded());
    }

    #[tokio::test]
    async fn concurrent_first_calls_construct_exactly_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let host = Arc::new(ModelHost::new(CountingLoader {
            loads: Arc::clone(&loads),
            fail_first: false,
        }));

        let a = Arc::clone(&host);
        let b = Arc::clone(&host);
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.ensure_loaded().await.map(|_| ()) }),
            tokio::spawn(async move { b.ensure_loaded().await.map(|_| ()) }),
        );
        ra.unwrap().unwrap();
        rb.unwrap().unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_is_not_cached() {
        let loads = Arc::new(AtomicUsize::new(0));
        let host = ModelHost::new(CountingLoader {
            loads: Arc::clone(&loads),
            fail_first: true,
        });

        assert!(host.ensure_loaded().await.is_err());
        assert!(!host.is_loaded());

        // Next call retries and succeeds.
        host.ensure_loaded().await.unwrap();
        assert!(host.is_loaded());
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn inference_gate_has_a_single_permit() {
        let host = ModelHost::unconfigured();
        let permit = host.inference_permit().await.unwrap();
        assert_eq!(host.inference_gate.available_permits(), 0);
        drop(permit);
        assert_eq!(host.inference_gate.available_permits(), 1);
    }

    #[tokio::test]
    async fn unconfigured_host_fails_with_hint() {
        let host = ModelHost::unconfigured();
        let err = host.ensure_loaded().await.unwrap_err();
        assert!(err.to_string().contains("OCR host"));
    }
}
