use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use client_core::{
    AuthState, DataUrlEncoder, EditorView, FileIntake, HttpRenderService, MissingRenderService,
    RenderService, SelectedFile, UploadEvent, UploadOrchestrator, VisualizerOrchestrator,
    VisualizerView,
};
use serde::Serialize;
use shared::domain::{GenerationStatus, NavigationState, UploadOutcome};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(name = "roomify", about = "Upload a floor plan and render it as a 3D view")]
struct Args {
    /// Floor-plan image to upload.
    file: PathBuf,
    /// Project label shown in the visualizer; defaults to the file name.
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    render_url: Option<String>,
    /// Run as a signed-out user; the upload is ignored.
    #[arg(long)]
    signed_out: bool,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the final view as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct ViewSummary<'a> {
    project_name: &'a str,
    generation: GenerationStatus,
    showing: &'a str,
    image_len: usize,
    can_export: bool,
    can_share: bool,
}

impl<'a> ViewSummary<'a> {
    fn from_view(view: &'a EditorView) -> Self {
        let (showing, image_len) = match (&view.displayed_image, &view.original_image) {
            (Some(rendered), _) => ("render", rendered.len()),
            (None, Some(original)) => ("original", original.len()),
            (None, None) => ("nothing", 0),
        };
        Self {
            project_name: &view.project_name,
            generation: view.generation,
            showing,
            image_len,
            can_export: view.can_export,
            can_share: view.can_share,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(url) = args.render_url {
        settings.render_url = Some(url);
    }
    if args.signed_out {
        settings.signed_in = false;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let file = SelectedFile::from_path(&args.file).await?;
    let project_name = args.name.unwrap_or_else(|| file.stem().to_string());

    let outcome = run_upload(file, settings.signed_in).await?;
    let payload = outcome.into_payload();
    let Some(navigation) = NavigationState::from_upload_payload(&payload, Some(project_name))
    else {
        bail!("upload failed; nothing to visualize");
    };

    let renderer: Arc<dyn RenderService> = match settings.render_url.as_deref() {
        Some(url) => Arc::new(HttpRenderService::new(url, settings.request_timeout())?),
        None => {
            warn!("no render service configured; generation will fail and the original is shown");
            Arc::new(MissingRenderService)
        }
    };

    let visualizer = VisualizerOrchestrator::new(navigation, renderer);
    if visualizer.mount() {
        info!("rendering 3D visualization");
        visualizer.wait_for_generation().await;
    }

    let VisualizerView::Editor(view) = visualizer.render() else {
        bail!("visualizer did not mount");
    };
    let summary = ViewSummary::from_view(&view);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Project: {}\nGeneration: {:?}\nShowing: {} ({} bytes)\nExport: {}  Share: {}",
            summary.project_name,
            summary.generation,
            summary.showing,
            summary.image_len,
            summary.can_export,
            summary.can_share
        );
    }
    visualizer.unmount();
    Ok(())
}

async fn run_upload(file: SelectedFile, signed_in: bool) -> Result<UploadOutcome> {
    let (tx, mut outcomes) = mpsc::unbounded_channel();
    let upload = UploadOrchestrator::new(
        AuthState::new(signed_in),
        Arc::new(DataUrlEncoder),
        Arc::new(move |outcome: UploadOutcome| {
            let _ = tx.send(outcome);
        }),
    );

    let mut events = upload.subscribe();
    let reporter = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(UploadEvent::Progress(progress)) => info!(progress, "upload progress"),
                Ok(UploadEvent::Completed(_)) | Err(RecvError::Closed) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
            }
        }
    });

    match upload.handle_file_selected(Some(file)) {
        FileIntake::Accepted => {}
        FileIntake::Rejected(err) => error!(error = %err, "upload rejected"),
        FileIntake::Ignored(reason) => {
            reporter.abort();
            bail!("upload ignored ({reason:?}); sign in to upload");
        }
    }

    let outcome = outcomes
        .recv()
        .await
        .ok_or_else(|| anyhow!("upload ended without an outcome"))?;
    upload.teardown();
    reporter.abort();
    Ok(outcome)
}
