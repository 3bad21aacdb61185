//! Visualizer screen state: hydration-safe mounting and the at-most-once render request.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use serde::Serialize;
use shared::{
    domain::{GenerationStatus, MountState, NavigationState},
    error::GenerationError,
    protocol::GenerateViewRequest,
};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{lock, RenderService, EVENT_CHANNEL_CAPACITY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisualizerView {
    /// First paint before mount completes. Carries no navigation-derived data.
    Shell,
    Editor(EditorView),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorView {
    pub project_name: String,
    pub displayed_image: Option<String>,
    pub original_image: Option<String>,
    pub is_processing: bool,
    pub generation: GenerationStatus,
    pub can_export: bool,
    pub can_share: bool,
}

impl EditorView {
    /// The rendered image if there is one, otherwise the original upload.
    pub fn visible_image(&self) -> Option<&str> {
        self.displayed_image
            .as_deref()
            .or(self.original_image.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualizerEvent {
    MountStateChanged(MountState),
    GenerationStarted,
    GenerationFinished(GenerationStatus),
}

#[derive(Debug, Clone)]
struct GenerationRequest {
    source_image: String,
    status: GenerationStatus,
    rendered_image: Option<String>,
}

#[derive(Debug, Default)]
struct ViewState {
    mount_state: MountState,
    displayed_image: Option<String>,
    is_processing: bool,
    request: Option<GenerationRequest>,
}

struct VisualizerInner {
    navigation: NavigationState,
    renderer: Arc<dyn RenderService>,
    state: Mutex<ViewState>,
    generation_triggered: AtomicBool,
    alive: AtomicBool,
    events: broadcast::Sender<VisualizerEvent>,
}

impl VisualizerInner {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn emit(&self, event: VisualizerEvent) {
        let _ = self.events.send(event);
    }

    fn set_mount_state(&self, mount_state: MountState) {
        lock(&self.state).mount_state = mount_state;
        self.emit(VisualizerEvent::MountStateChanged(mount_state));
    }
}

/// Clears the processing overlay however the render task exits.
struct ProcessingGuard(Arc<VisualizerInner>);

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        lock(&self.0.state).is_processing = false;
    }
}

/// One instance per visualizer mount. Must be driven from inside a Tokio runtime.
pub struct VisualizerOrchestrator {
    inner: Arc<VisualizerInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl VisualizerOrchestrator {
    pub fn new(navigation: NavigationState, renderer: Arc<dyn RenderService>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(VisualizerInner {
                navigation,
                renderer,
                state: Mutex::new(ViewState::default()),
                generation_triggered: AtomicBool::new(false),
                alive: AtomicBool::new(true),
                events,
            }),
            task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VisualizerEvent> {
        self.inner.events.subscribe()
    }

    pub fn mount_state(&self) -> MountState {
        lock(&self.inner.state).mount_state
    }

    pub fn generation_status(&self) -> GenerationStatus {
        lock(&self.inner.state)
            .request
            .as_ref()
            .map(|request| request.status)
            .unwrap_or_default()
    }

    pub fn displayed_image(&self) -> Option<String> {
        lock(&self.inner.state).displayed_image.clone()
    }

    pub fn is_processing(&self) -> bool {
        lock(&self.inner.state).is_processing
    }

    /// Completes `Unmounted -> Mounting -> Mounted`, then evaluates the generation trigger.
    /// Returns whether a render request was issued.
    pub fn mount(&self) -> bool {
        if !self.inner.is_alive() || self.mount_state() != MountState::Unmounted {
            return false;
        }
        self.inner.set_mount_state(MountState::Mounting);
        if let Some(render) = self.inner.navigation.prerendered() {
            lock(&self.inner.state).displayed_image = Some(render.to_string());
        }
        self.inner.set_mount_state(MountState::Mounted);
        debug!(project = %self.inner.navigation.display_name(), "visualizer mounted");
        self.maybe_start_generation()
    }

    /// Re-runs the trigger check, as happens when unrelated state changes.
    pub fn reevaluate(&self) -> bool {
        self.maybe_start_generation()
    }

    pub fn render(&self) -> VisualizerView {
        let state = lock(&self.inner.state);
        if state.mount_state != MountState::Mounted {
            return VisualizerView::Shell;
        }
        let navigation = &self.inner.navigation;
        let has_image = state.displayed_image.is_some();
        VisualizerView::Editor(EditorView {
            project_name: navigation.display_name().to_string(),
            displayed_image: state.displayed_image.clone(),
            original_image: navigation.source_image().map(str::to_string),
            is_processing: state.is_processing,
            generation: state
                .request
                .as_ref()
                .map(|request| request.status)
                .unwrap_or_default(),
            can_export: has_image,
            can_share: has_image,
        })
    }

    /// Waits for the in-flight render request, if any, to settle.
    pub async fn wait_for_generation(&self) {
        let task = lock(&self.task).take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!(error = %err, "generation task ended abnormally");
            }
        }
    }

    /// Marks the screen gone. An in-flight request keeps running; its result is discarded.
    pub fn unmount(&self) {
        if !self.inner.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        self.inner.set_mount_state(MountState::Unmounted);
        debug!("visualizer unmounted");
    }

    fn maybe_start_generation(&self) -> bool {
        if !self.inner.is_alive() {
            return false;
        }
        let source_image = {
            let mut state = lock(&self.inner.state);
            if state.mount_state != MountState::Mounted {
                return false;
            }
            let navigation = &self.inner.navigation;
            let Some(source_image) = navigation.source_image() else {
                return false;
            };
            if navigation.prerendered().is_some() {
                return false;
            }
            if self.inner.generation_triggered.swap(true, Ordering::SeqCst) {
                return false;
            }
            state.is_processing = true;
            state.request = Some(GenerationRequest {
                source_image: source_image.to_string(),
                status: GenerationStatus::Processing,
                rendered_image: None,
            });
            source_image.to_string()
        };
        info!(project = %self.inner.navigation.display_name(), "starting 3D generation");
        self.inner.emit(VisualizerEvent::GenerationStarted);

        let task = tokio::spawn(run_generation(Arc::clone(&self.inner), source_image));
        *lock(&self.task) = Some(task);
        true
    }
}

impl Drop for VisualizerOrchestrator {
    fn drop(&mut self) {
        self.unmount();
    }
}

async fn run_generation(inner: Arc<VisualizerInner>, source_image: String) {
    let _processing = ProcessingGuard(Arc::clone(&inner));
    let result = inner
        .renderer
        .generate_view(GenerateViewRequest { source_image })
        .await;

    if !inner.is_alive() {
        debug!("visualizer unmounted; discarding generation result");
        return;
    }

    let outcome = match result {
        Ok(response) => response
            .rendered_image
            .filter(|image| !image.is_empty())
            .ok_or(GenerationError::EmptyResult),
        Err(err) => Err(GenerationError::Remote(format!("{err:#}"))),
    };

    let status = {
        let mut state = lock(&inner.state);
        state.is_processing = false;
        let status = match outcome {
            Ok(rendered) => {
                state.displayed_image = Some(rendered.clone());
                if let Some(request) = state.request.as_mut() {
                    request.rendered_image = Some(rendered);
                }
                GenerationStatus::Succeeded
            }
            Err(err) => {
                error!(error = %err, kind = ?err.kind(), "generation failed");
                GenerationStatus::Failed
            }
        };
        if let Some(request) = state.request.as_mut() {
            request.status = status;
            debug!(
                source_len = request.source_image.len(),
                rendered = request.rendered_image.is_some(),
                ?status,
                "generation settled"
            );
        }
        status
    };
    inner.emit(VisualizerEvent::GenerationFinished(status));
}

#[cfg(test)]
#[path = "tests/visualizer_tests.rs"]
mod tests;
