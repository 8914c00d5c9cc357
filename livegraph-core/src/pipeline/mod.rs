//! The reactive analysis pipeline.
//!
//! [`PipelineState`] owns one [`Published`] cell per stage and advances them
//! in upstream-to-downstream order. A stage runs only when its upstream
//! cell actually changed; a failing stage reports [`StageOutcome::Unchanged`]
//! and leaves its previous value in place.
//!
//! Class synthesis is the one asynchronous step. [`PipelineState::apply_stable_source`]
//! hands back a [`SynthesisRequest`] for the driver to run, and the driver
//! feeds the result to [`PipelineState::apply_synthesis`]. Results of
//! superseded requests are discarded there.

use crate::extractors::{get_dependencies, ImportsExtractor, PropDefinitionsExtractor, TreeExtractor};
use crate::graph::{build_property_graphs, PropertyGraph};
use crate::models::{AnalysisFailure, DependencyMap, Published, Stage, StageOutcome};
use crate::synth::{
    synthesize, Instance, ModuleResolver, SynthesisError, SynthesisRequest, SynthesisTracker,
    SynthesizedClass,
};
use crate::syntax::SyntaxTree;
use crate::LiveGraphConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// A stage that produced nothing this round
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedStage {
    pub stage: Stage,
    pub category: String,
    pub message: String,
}

impl SkippedStage {
    fn new(stage: Stage, failure: &AnalysisFailure) -> Self {
        Self {
            stage,
            category: failure.category().to_string(),
            message: failure.to_string(),
        }
    }
}

/// What happened to one stage while advancing the pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StageEvent {
    Updated { stage: Stage },
    Skipped(SkippedStage),
    /// A synthesis result arrived after a newer request was made
    Discarded { generation: u64 },
}

/// Result of one pipeline step
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Advance {
    pub events: Vec<StageEvent>,
    /// Synthesis the driver must run next, if the description changed
    pub request: Option<SynthesisRequest>,
}

impl Advance {
    pub fn updated(&self, stage: Stage) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, StageEvent::Updated { stage: s } if *s == stage))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkippedStage> {
        self.events.iter().filter_map(|e| match e {
            StageEvent::Skipped(skipped) => Some(skipped),
            _ => None,
        })
    }

    fn record<T>(&mut self, stage: Stage, result: Result<T, AnalysisFailure>) -> StageOutcome<T> {
        match result {
            Ok(value) => StageOutcome::Updated(value),
            Err(failure) => {
                debug!(stage = %stage, category = failure.category(), "stage skipped: {}", failure);
                self.events.push(StageEvent::Skipped(SkippedStage::new(stage, &failure)));
                StageOutcome::Unchanged
            }
        }
    }

    fn publish<T: PartialEq>(&mut self, stage: Stage, cell: &mut Published<T>, outcome: StageOutcome<T>) -> bool {
        let changed = cell.publish(outcome);
        if changed {
            self.events.push(StageEvent::Updated { stage });
        }
        changed
    }
}

#[derive(Debug)]
pub struct PipelineState {
    config: LiveGraphConfig,
    source: Published<String>,
    tree: Published<SyntaxTree>,
    prop_definitions: Published<String>,
    imports: Published<Vec<String>>,
    class: Published<Arc<SynthesizedClass>>,
    instance: Published<Instance>,
    dependencies: Published<DependencyMap>,
    graphs: Published<Vec<PropertyGraph>>,
    tracker: SynthesisTracker,
}

impl PipelineState {
    pub fn new(config: LiveGraphConfig) -> Self {
        Self {
            config,
            source: Published::new(),
            tree: Published::new(),
            prop_definitions: Published::new(),
            imports: Published::new(),
            class: Published::new(),
            instance: Published::new(),
            dependencies: Published::new(),
            graphs: Published::new(),
            tracker: SynthesisTracker::new(),
        }
    }

    pub fn config(&self) -> &LiveGraphConfig {
        &self.config
    }

    /// Run the synchronous stages for a newly stable source text
    pub fn apply_stable_source(&mut self, text: impl Into<String>) -> Advance {
        let mut advance = Advance::default();
        let text = text.into();

        if !advance.publish(Stage::Source, &mut self.source, StageOutcome::Updated(text)) {
            return advance;
        }
        let Some(text) = self.source.get() else {
            return advance;
        };

        let parsed = advance.record(Stage::Syntax, SyntaxTree::parse(text));
        if !advance.publish(Stage::Syntax, &mut self.tree, parsed) {
            return advance;
        }
        let Some(tree) = self.tree.get() else {
            return advance;
        };

        let imports = ImportsExtractor::new();
        let outcome = advance.record(Stage::CanDependencies, imports.extract(tree));
        advance.publish(Stage::CanDependencies, &mut self.imports, outcome);

        let props = PropDefinitionsExtractor::new();
        let outcome = advance.record(Stage::PropDefinitions, props.extract(tree));
        if advance.publish(Stage::PropDefinitions, &mut self.prop_definitions, outcome) {
            advance.request = self.next_request();
        }
        advance
    }

    /// Start a synthesis for the current description, superseding any in flight
    fn next_request(&mut self) -> Option<SynthesisRequest> {
        let description = self.prop_definitions.get()?.clone();
        let imports = self
            .imports
            .get()
            .cloned()
            .unwrap_or_else(|| self.config.default_imports.clone());
        let generation = self.tracker.begin();
        debug!(generation, ?imports, "requesting synthesis");
        Some(SynthesisRequest {
            generation,
            description,
            imports,
            module: self.config.base_module.clone(),
            base_class: self.config.base_class.clone(),
        })
    }

    /// Apply a finished synthesis and run every stage below it
    pub fn apply_synthesis(
        &mut self,
        generation: u64,
        result: Result<SynthesizedClass, SynthesisError>,
    ) -> Advance {
        let mut advance = Advance::default();
        if !self.tracker.is_current(generation) {
            debug!(generation, current = self.tracker.current(), "discarding stale synthesis");
            advance.events.push(StageEvent::Discarded { generation });
            return advance;
        }

        let outcome = advance.record(Stage::Synthesis, result.map(Arc::new).map_err(AnalysisFailure::from));
        if !advance.publish(Stage::Synthesis, &mut self.class, outcome) {
            return advance;
        }
        let Some(class) = self.class.get() else {
            return advance;
        };
        info!(properties = class.schema.len(), "class synthesized");

        let constructed = Instance::new(Arc::clone(class), self.config.max_eval_depth)
            .map_err(AnalysisFailure::from);
        let outcome = advance.record(Stage::Dependencies, constructed);
        if !self.instance.publish(outcome) {
            return advance;
        }
        let Some(instance) = self.instance.get() else {
            return advance;
        };

        let outcome = advance.record(
            Stage::Dependencies,
            get_dependencies(instance).map_err(AnalysisFailure::from),
        );
        if !advance.publish(Stage::Dependencies, &mut self.dependencies, outcome) {
            return advance;
        }
        let Some(dependencies) = self.dependencies.get() else {
            return advance;
        };

        let graphs = build_property_graphs(dependencies);
        advance.publish(Stage::Graphs, &mut self.graphs, StageOutcome::Updated(graphs));
        advance
    }

    pub fn source(&self) -> Option<&str> {
        self.source.get().map(String::as_str)
    }

    pub fn tree(&self) -> Option<&SyntaxTree> {
        self.tree.get()
    }

    pub fn prop_definitions(&self) -> Option<&str> {
        self.prop_definitions.get().map(String::as_str)
    }

    pub fn imports(&self) -> Option<&[String]> {
        self.imports.get().map(Vec::as_slice)
    }

    pub fn class(&self) -> Option<&Arc<SynthesizedClass>> {
        self.class.get()
    }

    pub fn instance(&self) -> Option<&Instance> {
        self.instance.get()
    }

    pub fn dependencies(&self) -> Option<&DependencyMap> {
        self.dependencies.get()
    }

    pub fn graphs(&self) -> Option<&[PropertyGraph]> {
        self.graphs.get().map(Vec::as_slice)
    }

    /// Generation of the newest synthesis request
    pub fn generation(&self) -> u64 {
        self.tracker.current()
    }

    /// How many times a stage's published value changed
    pub fn revision(&self, stage: Stage) -> u64 {
        match stage {
            Stage::Source => self.source.revision(),
            Stage::Syntax => self.tree.revision(),
            Stage::PropDefinitions => self.prop_definitions.revision(),
            Stage::CanDependencies => self.imports.revision(),
            Stage::Synthesis => self.class.revision(),
            Stage::Dependencies => self.dependencies.revision(),
            Stage::Graphs => self.graphs.revision(),
        }
    }
}

/// Everything one pass over a source text produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub prop_definitions: Option<String>,
    pub imports: Option<Vec<String>>,
    pub dependencies: Option<DependencyMap>,
    pub graphs: Vec<PropertyGraph>,
    pub skipped: Vec<SkippedStage>,
}

/// Run every stage once over `source`, awaiting the synthesis inline
pub async fn analyze_once(
    source: &str,
    resolver: &dyn ModuleResolver,
    config: LiveGraphConfig,
) -> AnalysisReport {
    let mut state = PipelineState::new(config);
    let mut skipped = Vec::new();

    let advance = state.apply_stable_source(source);
    skipped.extend(advance.skipped().cloned());
    if let Some(request) = advance.request {
        let result = synthesize(resolver, &request).await;
        let advance = state.apply_synthesis(request.generation, result);
        skipped.extend(advance.skipped().cloned());
    }

    AnalysisReport {
        prop_definitions: state.prop_definitions().map(str::to_string),
        imports: state.imports().map(<[String]>::to_vec),
        dependencies: state.dependencies().cloned(),
        graphs: state.graphs().map(<[PropertyGraph]>::to_vec).unwrap_or_default(),
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_SOURCE;
    use crate::synth::BuiltinResolver;

    fn state() -> PipelineState {
        PipelineState::new(LiveGraphConfig::default())
    }

    async fn run(state: &mut PipelineState, text: &str) -> Advance {
        let advance = state.apply_stable_source(text);
        match advance.request.clone() {
            Some(request) => {
                let result = synthesize(&BuiltinResolver::new(), &request).await;
                state.apply_synthesis(request.generation, result)
            }
            None => advance,
        }
    }

    #[tokio::test]
    async fn test_default_source_end_to_end() {
        let mut state = state();
        run(&mut state, DEFAULT_SOURCE).await;

        assert_eq!(state.imports(), Some(&["DefineMap".to_string()][..]));
        let graphs = state.graphs().unwrap();
        let roots: Vec<_> = graphs.iter().map(|g| g.root.as_str()).collect();
        assert_eq!(roots, vec!["first", "last", "name"]);
        assert_eq!(
            graphs[2].graph.labeled_edges(),
            vec![("first", "name"), ("last", "name")]
        );
    }

    #[tokio::test]
    async fn test_parse_failure_keeps_previous_tree() {
        let mut state = state();
        run(&mut state, DEFAULT_SOURCE).await;
        let tree_before = state.tree().cloned();
        let graphs_before = state.graphs().map(<[PropertyGraph]>::to_vec);

        let advance = state.apply_stable_source("import { DefineMap } from \"can\";\nconst ViewModel = DefineMap.extend({");
        assert!(advance.updated(Stage::Source));
        assert!(!advance.updated(Stage::Syntax));
        assert_eq!(advance.skipped().next().map(|s| s.stage), Some(Stage::Syntax));
        assert!(advance.request.is_none());
        assert_eq!(state.tree().cloned(), tree_before);
        assert_eq!(state.graphs().map(<[PropertyGraph]>::to_vec), graphs_before);
        assert_eq!(state.revision(Stage::Syntax), 1);
    }

    #[tokio::test]
    async fn test_deeply_nested_source_is_a_parse_failure() {
        let mut state = state();
        run(&mut state, DEFAULT_SOURCE).await;
        let graphs_before = state.graphs().map(<[PropertyGraph]>::to_vec);

        let source = format!(
            "import {{ DefineMap }} from \"can\";\nconst ViewModel = DefineMap.extend({{ get x() {{ return {}1{}; }} }});",
            "(".repeat(20_000),
            ")".repeat(20_000)
        );
        let advance = state.apply_stable_source(source);
        let skipped = advance.skipped().next().cloned();
        assert_eq!(skipped.as_ref().map(|s| s.stage), Some(Stage::Syntax));
        assert_eq!(skipped.map(|s| s.category).as_deref(), Some("parse"));
        assert!(advance.request.is_none());
        assert_eq!(state.graphs().map(<[PropertyGraph]>::to_vec), graphs_before);
    }

    #[tokio::test]
    async fn test_same_source_twice_does_nothing() {
        let mut state = state();
        run(&mut state, DEFAULT_SOURCE).await;
        let advance = state.apply_stable_source(DEFAULT_SOURCE);
        assert!(advance.events.is_empty());
        assert!(advance.request.is_none());
    }

    #[tokio::test]
    async fn test_layout_edit_does_not_resynthesize() {
        let mut state = state();
        run(&mut state, DEFAULT_SOURCE).await;
        let generation = state.generation();

        let advance = state.apply_stable_source(format!("// edited\n{}\n", DEFAULT_SOURCE));
        assert!(advance.updated(Stage::Syntax));
        assert!(!advance.updated(Stage::PropDefinitions));
        assert!(advance.request.is_none());
        assert_eq!(state.generation(), generation);
    }

    #[tokio::test]
    async fn test_incomplete_getter_keeps_previous_dependencies() {
        let mut state = state();
        run(&mut state, DEFAULT_SOURCE).await;
        let before = state.dependencies().cloned();

        let source = "import { DefineMap } from \"can\";\nconst ViewModel = DefineMap.extend({\n  get foo() { return ret; }\n});";
        let advance = run(&mut state, source).await;
        assert!(advance.updated(Stage::Synthesis));
        assert!(!advance.updated(Stage::Dependencies));
        assert_eq!(state.dependencies().cloned(), before);
    }

    #[tokio::test]
    async fn test_runaway_getter_keeps_previous_dependencies() {
        let mut state = state();
        run(&mut state, DEFAULT_SOURCE).await;
        let before = state.dependencies().cloned();
        assert!(before.is_some());

        let source = "import { DefineMap } from \"can\";\nconst ViewModel = DefineMap.extend({\n  get big() { return 'ab'.repeat(10000).repeat(10000).repeat(10000).length; }\n});";
        let advance = run(&mut state, source).await;
        assert!(advance.updated(Stage::Synthesis));
        assert!(!advance.updated(Stage::Dependencies));
        assert_eq!(advance.skipped().next().map(|s| s.stage), Some(Stage::Dependencies));
        assert_eq!(state.dependencies().cloned(), before);
    }

    #[tokio::test]
    async fn test_stale_synthesis_is_discarded() {
        let mut state = state();
        let a = state
            .apply_stable_source("import { DefineMap } from \"can\";\nconst A = DefineMap.extend({ a: {} });")
            .request
            .unwrap();
        let b = state
            .apply_stable_source("import { DefineMap } from \"can\";\nconst B = DefineMap.extend({ b: {} });")
            .request
            .unwrap();
        let resolver = BuiltinResolver::new();

        let result_b = synthesize(&resolver, &b).await;
        assert!(state.apply_synthesis(b.generation, result_b).updated(Stage::Graphs));
        let result_a = synthesize(&resolver, &a).await;
        let advance = state.apply_synthesis(a.generation, result_a);
        assert_eq!(advance.events, vec![StageEvent::Discarded { generation: a.generation }]);

        let roots: Vec<_> = state.graphs().unwrap().iter().map(|g| g.root.as_str()).collect();
        assert_eq!(roots, vec!["b"]);
    }

    #[tokio::test]
    async fn test_missing_base_import_is_a_synthesis_failure() {
        let report = analyze_once(
            "import { DefineList } from \"can\";\nconst VM = DefineMap.extend({ a: {} });",
            &BuiltinResolver::new(),
            LiveGraphConfig::default(),
        )
        .await;
        assert_eq!(report.prop_definitions.as_deref(), Some("{a:{}}"));
        assert!(report.graphs.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].stage, Stage::Synthesis);
        assert_eq!(report.skipped[0].category, "synthesis");
    }

    #[tokio::test]
    async fn test_default_imports_apply_before_any_import_is_seen() {
        let report = analyze_once(
            "const x = 1;\nconst VM = DefineMap.extend({ a: {} });",
            &BuiltinResolver::new(),
            LiveGraphConfig::default(),
        )
        .await;
        assert_eq!(report.imports, None);
        assert_eq!(report.graphs.len(), 1);
    }
}
