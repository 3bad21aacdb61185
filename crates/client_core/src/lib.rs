use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::protocol::{GenerateViewRequest, GenerateViewResponse};

pub mod intake;
pub mod render_client;
pub mod upload;
pub mod visualizer;

pub use intake::{DataUrlEncoder, FileEncoder, FileSource, SelectedFile};
pub use render_client::{HttpRenderService, RenderClientError};
pub use upload::{
    CompletionCallback, FileIntake, IgnoreReason, UploadEvent, UploadOrchestrator, UploadSnapshot,
};
pub use visualizer::{EditorView, VisualizerEvent, VisualizerOrchestrator, VisualizerView};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Ambient "is the user signed in" signal consumed by the upload flow.
pub trait AuthSignal: Send + Sync {
    fn is_signed_in(&self) -> bool;
}

#[derive(Debug, Default)]
pub struct AuthState {
    signed_in: AtomicBool,
}

impl AuthState {
    pub fn new(signed_in: bool) -> Arc<Self> {
        Arc::new(Self {
            signed_in: AtomicBool::new(signed_in),
        })
    }

    pub fn set_signed_in(&self, signed_in: bool) {
        self.signed_in.store(signed_in, Ordering::SeqCst);
    }
}

impl AuthSignal for AuthState {
    fn is_signed_in(&self) -> bool {
        self.signed_in.load(Ordering::SeqCst)
    }
}

/// Remote 3D rendering call. Single-shot, never retried by callers.
#[async_trait]
pub trait RenderService: Send + Sync {
    async fn generate_view(&self, request: GenerateViewRequest) -> Result<GenerateViewResponse>;
}

pub struct MissingRenderService;

#[async_trait]
impl RenderService for MissingRenderService {
    async fn generate_view(&self, _request: GenerateViewRequest) -> Result<GenerateViewResponse> {
        Err(anyhow!("render service is unavailable"))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
