use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use pdf_margins::{
    AnnotatedDocument, CompositeOptions, ImagePageStore, PageStore, PdfPageStore, composite_single,
    export_document, save_pdf,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{CancellationToken, DocumentId, MarginError, PdfCommand, PdfUpdate, RuntimeError};

static NEXT_DOC_ID: AtomicU64 = AtomicU64::new(1);

type Result<T> = std::result::Result<T, RuntimeError>;

/// A loaded document and its annotations
struct LoadedDocument {
    store: Arc<dyn PageStore>,
    annotations: AnnotatedDocument,
    events: mpsc::UnboundedReceiver<pdf_margins::DocumentEvent>,
}

/// An export running in the background
struct RunningExport {
    handle: JoinHandle<std::result::Result<usize, MarginError>>,
    output_path: PathBuf,
    cancel: CancellationToken,
}

/// State owned by the worker
#[derive(Default)]
struct WorkerState {
    documents: HashMap<DocumentId, LoadedDocument>,
    export: Option<RunningExport>,
}

/// Async worker task that processes PDF commands and sends updates.
///
/// Commands are handled one at a time. An export runs alongside command
/// handling so `CancelExport` can reach it.
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<PdfCommand>,
    update_tx: mpsc::UnboundedSender<PdfUpdate>,
) {
    let mut state = WorkerState::default();

    loop {
        tokio::select! {
            cmd = command_rx.recv() => {
                let Some(cmd) = cmd else { break };
                if let Err(e) = process_command(cmd, &mut state, &update_tx).await {
                    let _ = update_tx.send(PdfUpdate::Error {
                        message: e.to_string(),
                    });
                }
            }
            result = wait_for_export(&mut state.export), if state.export.is_some() => {
                if let Some(export) = state.export.take() {
                    finish_export(result, export.output_path, &update_tx);
                }
            }
        }
    }

    // Channel closed: stop any export still in flight
    if let Some(export) = state.export.take() {
        export.cancel.cancel();
        let _ = export.handle.await;
    }
}

async fn wait_for_export(
    export: &mut Option<RunningExport>,
) -> std::result::Result<std::result::Result<usize, MarginError>, tokio::task::JoinError> {
    match export {
        Some(export) => (&mut export.handle).await,
        None => std::future::pending().await,
    }
}

fn finish_export(
    result: std::result::Result<std::result::Result<usize, MarginError>, tokio::task::JoinError>,
    path: PathBuf,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    let update = match result {
        Ok(Ok(pages)) => {
            log::info!("Export to {} complete ({} pages)", path.display(), pages);
            PdfUpdate::ExportComplete { path, pages }
        }
        Ok(Err(MarginError::CancelledExport)) => {
            log::info!("Export to {} cancelled", path.display());
            PdfUpdate::ExportCancelled
        }
        Ok(Err(e)) => PdfUpdate::Error {
            message: format!("Export failed: {}", e),
        },
        Err(e) => PdfUpdate::Error {
            message: format!("Export task failed: {}", e),
        },
    };
    let _ = update_tx.send(update);
}

async fn process_command(
    cmd: PdfCommand,
    state: &mut WorkerState,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) -> Result<()> {
    match cmd {
        PdfCommand::Load { path } => {
            let store = load_store(&path).await?;
            let page_count = store.page_count();
            let mut annotations = AnnotatedDocument::new(page_count);
            let events = annotations.subscribe();

            let doc_id = DocumentId(NEXT_DOC_ID.fetch_add(1, Ordering::SeqCst));
            state.documents.insert(
                doc_id,
                LoadedDocument {
                    store,
                    annotations,
                    events,
                },
            );
            log::debug!("Loaded {} as {:?}", path.display(), doc_id);
            let _ = update_tx.send(PdfUpdate::Loaded { doc_id, page_count });
        }
        PdfCommand::SetMarginConfig {
            doc_id,
            page_index,
            config,
        } => {
            let doc = document(state, doc_id)?;
            doc.annotations.apply_margin_settings(page_index, config)?;
            forward_events(doc_id, doc, update_tx);
        }
        PdfCommand::SetInk {
            doc_id,
            page_index,
            ink,
        } => {
            let doc = document(state, doc_id)?;
            doc.annotations.set_ink(page_index, ink)?;
            forward_events(doc_id, doc, update_tx);
        }
        PdfCommand::CompositePage {
            doc_id,
            page_index,
            supersample,
        } => {
            let doc = document(state, doc_id)?;
            let store = Arc::clone(&doc.store);
            let snapshot = doc.annotations.snapshot();
            let options = CompositeOptions {
                supersample,
                ..Default::default()
            };

            let surface = tokio::task::spawn_blocking(move || {
                composite_single(store.as_ref(), &snapshot, page_index, &options)
            })
            .await??;

            let _ = update_tx.send(PdfUpdate::PageComposited {
                doc_id,
                page_index,
                width: surface.width() as usize,
                height: surface.height() as usize,
                rgba_data: surface.to_rgba_image().into_raw(),
            });
        }
        PdfCommand::Export {
            doc_id,
            options,
            output_path,
        } => {
            if state.export.is_some() {
                return Err(RuntimeError::ExportInProgress);
            }
            let doc = document(state, doc_id)?;
            let store = Arc::clone(&doc.store);
            let snapshot = doc.annotations.snapshot();
            let cancel = CancellationToken::new();

            let task_cancel = cancel.clone();
            let task_path = output_path.clone();
            let handle = tokio::spawn(async move {
                let output = export_document(store, snapshot, options, task_cancel).await?;
                let pages = output.get_pages().len();
                save_pdf(output, &task_path).await?;
                Ok::<_, MarginError>(pages)
            });

            state.export = Some(RunningExport {
                handle,
                output_path,
                cancel,
            });
        }
        PdfCommand::CancelExport => match &state.export {
            Some(export) => export.cancel.cancel(),
            None => log::debug!("No export to cancel"),
        },
        PdfCommand::Close { doc_id } => {
            state
                .documents
                .remove(&doc_id)
                .ok_or(RuntimeError::UnknownDocument(doc_id))?;
            let _ = update_tx.send(PdfUpdate::Closed { doc_id });
        }
    }
    Ok(())
}

fn document(state: &mut WorkerState, doc_id: DocumentId) -> Result<&mut LoadedDocument> {
    state
        .documents
        .get_mut(&doc_id)
        .ok_or(RuntimeError::UnknownDocument(doc_id))
}

/// Relay annotation events queued by the last change
fn forward_events(
    doc_id: DocumentId,
    doc: &mut LoadedDocument,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    while let Ok(event) = doc.events.try_recv() {
        let _ = update_tx.send(PdfUpdate::DocumentChanged { doc_id, event });
    }
}

async fn load_store(path: &Path) -> Result<Arc<dyn PageStore>> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let store: Arc<dyn PageStore> = if is_pdf {
        Arc::new(PdfPageStore::load(path).await?)
    } else {
        Arc::new(ImagePageStore::load(&[path]).await?)
    };
    Ok(store)
}
