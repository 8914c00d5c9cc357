//! LiveGraph Real-time - live pipeline driver and editor attachments
//!
//! This crate runs the analysis pipeline against a stream of editor changes:
//! edits are debounced, stable text runs through the synchronous stages, and
//! class synthesis runs on spawned tasks whose results are applied
//! last-request-wins.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod editor;
pub mod source;

pub use editor::{EditorClosed, FileEditor, SourceEditor};
pub use source::{debounce, SourceStore};

use chrono::{DateTime, Utc};
use livegraph_core::pipeline::{Advance, StageEvent};
use livegraph_core::synth::{synthesize, SynthesisError, SynthesizedClass};
use livegraph_core::{LiveGraphConfig, ModuleResolver, PipelineState, PropertyGraph, Stage};
use livegraph_utils::logging::{get_logger, Logger};
use serde::Serialize;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{sleep_until, Instant},
};

/// Events emitted by the live pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Editor text became stable
    SourceStabilized {
        source: String,
        timestamp: DateTime<Utc>,
    },
    /// A stage published a new value
    StageUpdated {
        stage: Stage,
        timestamp: DateTime<Utc>,
    },
    /// A stage produced nothing; its previous value stays
    StageSkipped {
        stage: Stage,
        category: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// A class synthesis was started
    SynthesisRequested {
        generation: u64,
        timestamp: DateTime<Utc>,
    },
    /// A synthesis finished after a newer one was requested
    SynthesisDiscarded {
        generation: u64,
        timestamp: DateTime<Utc>,
    },
    /// New per-property graphs are available
    GraphsUpdated {
        graphs: Vec<PropertyGraph>,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    fn from_stage_event(event: StageEvent) -> Self {
        let timestamp = Utc::now();
        match event {
            StageEvent::Updated { stage } => Self::StageUpdated { stage, timestamp },
            StageEvent::Skipped(skipped) => Self::StageSkipped {
                stage: skipped.stage,
                category: skipped.category,
                message: skipped.message,
                timestamp,
            },
            StageEvent::Discarded { generation } => Self::SynthesisDiscarded {
                generation,
                timestamp,
            },
        }
    }
}

type Completion = (u64, Result<SynthesizedClass, SynthesisError>);

/// Live pipeline over an editor's change stream
pub struct LivePipeline {
    config: LiveGraphConfig,
    resolver: Arc<dyn ModuleResolver>,
}

/// A running pipeline. Dropping it stops the pipeline task.
pub struct LiveHandle {
    /// Report edits here
    pub editor: SourceEditor,
    /// Pipeline events, oldest first
    pub events: mpsc::Receiver<PipelineEvent>,
    /// Latest published graphs
    pub graphs: watch::Receiver<Arc<Vec<PropertyGraph>>>,
    task: JoinHandle<()>,
}

impl LiveHandle {
    /// Stop the pipeline and wait for its task to end
    pub async fn shutdown(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
    }
}

impl Drop for LiveHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl LivePipeline {
    pub fn new(config: LiveGraphConfig) -> Self {
        let resolver = Arc::new(config.resolver());
        Self { config, resolver }
    }

    /// Use a different base-module resolver
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Start the pipeline with `initial_text` already stable.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self, initial_text: impl Into<String>) -> LiveHandle {
        let (editor, edits) = SourceEditor::channel();
        let (event_tx, events) = mpsc::channel(1000);
        let (graphs_tx, graphs) = watch::channel(Arc::new(Vec::new()));

        let driver = Driver {
            store: SourceStore::new(initial_text, self.config.debounce()),
            state: PipelineState::new(self.config),
            resolver: self.resolver,
            events: event_tx,
            graphs: graphs_tx,
            logger: get_logger("livegraph.realtime"),
        };
        let task = tokio::spawn(driver.run(edits));

        LiveHandle {
            editor,
            events,
            graphs,
            task,
        }
    }
}

struct Driver {
    store: SourceStore,
    state: PipelineState,
    resolver: Arc<dyn ModuleResolver>,
    events: mpsc::Sender<PipelineEvent>,
    graphs: watch::Sender<Arc<Vec<PropertyGraph>>>,
    logger: Logger,
}

impl Driver {
    async fn run(mut self, mut edits: mpsc::UnboundedReceiver<String>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
        self.logger.info("Live pipeline started");

        let initial = self.store.published().to_string();
        self.stable(initial, &done_tx);

        loop {
            let pending = self.store.deadline();
            let wake = pending.unwrap_or_else(Instant::now);

            tokio::select! {
                edit = edits.recv() => match edit {
                    Some(text) => self.store.edit(text, Instant::now()),
                    None => {
                        self.logger.info("Editor detached");
                        break;
                    }
                },
                _ = sleep_until(wake), if pending.is_some() => {
                    if let Some(text) = self.store.fire(Instant::now()) {
                        self.stable(text, &done_tx);
                    }
                }
                Some((generation, result)) = done_rx.recv() => {
                    let advance = self.state.apply_synthesis(generation, result);
                    self.emit(advance);
                }
            }
        }
    }

    /// Run the synchronous stages for stable text; spawn synthesis if needed
    fn stable(&mut self, text: String, done: &mpsc::UnboundedSender<Completion>) {
        self.send(PipelineEvent::SourceStabilized {
            source: text.clone(),
            timestamp: Utc::now(),
        });
        let mut advance = self.state.apply_stable_source(text);

        if let Some(request) = advance.request.take() {
            self.send(PipelineEvent::SynthesisRequested {
                generation: request.generation,
                timestamp: Utc::now(),
            });
            let resolver = Arc::clone(&self.resolver);
            let done = done.clone();
            // No timeout: a hung resolution only delays this generation.
            tokio::spawn(async move {
                let result = synthesize(resolver.as_ref(), &request).await;
                let _ = done.send((request.generation, result));
            });
        }
        self.emit(advance);
    }

    fn emit(&self, advance: Advance) {
        let graphs_changed = advance.updated(Stage::Graphs);
        for event in advance.events {
            self.send(PipelineEvent::from_stage_event(event));
        }

        if graphs_changed {
            let graphs = self.state.graphs().map(<[PropertyGraph]>::to_vec).unwrap_or_default();
            self.logger.debug(&format!("Publishing {} graphs", graphs.len()));
            self.graphs.send_replace(Arc::new(graphs.clone()));
            self.send(PipelineEvent::GraphsUpdated {
                graphs,
                timestamp: Utc::now(),
            });
        }
    }

    fn send(&self, event: PipelineEvent) {
        if let Err(e) = self.events.try_send(event) {
            self.logger.debug(&format!("Pipeline event dropped: {}", e));
        }
    }
}
