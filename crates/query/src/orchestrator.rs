use extract::{Document, LanguageModel, Translator};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use validate::{DocumentValidator, ValidationOutcome};

use crate::envelope::{AnswerSource, GraphResponse, QueriedGraph, ResultEnvelope};
use crate::error::PipelineError;
use crate::graph_client::KnowledgeGraph;
use crate::synthesizer::AnswerSynthesizer;
use crate::web_search::{self, WebSearch};

/// Position in the answer pipeline, carrying what the next step consumes.
enum Stage {
    Extract,
    Translate { facts: String },
    Validate { draft: Document },
    ExecuteGraph { document: Document },
    Synthesize { document: Document, graph: GraphResponse },
    WebSearch,
    LlmFallback,
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Translate { .. } => "translate",
            Stage::Validate { .. } => "validate",
            Stage::ExecuteGraph { .. } => "execute_graph",
            Stage::Synthesize { .. } => "synthesize",
            Stage::WebSearch => "web_search",
            Stage::LlmFallback => "llm_fallback",
        }
    }
}

/// Answers one question through knowledge graph, then web search, then the bare model.
///
/// Stages of a query run strictly one after another. Nothing is shared between
/// queries except the read-only collaborators, so one orchestrator can serve
/// concurrent requests.
pub struct Orchestrator {
    translator: Translator,
    validator: DocumentValidator,
    graph: Arc<dyn KnowledgeGraph>,
    web: Arc<dyn WebSearch>,
    llm: Arc<dyn LanguageModel>,
    synthesizer: AnswerSynthesizer,
    web_results: usize,
}

impl Orchestrator {
    pub fn new(
        translator: Translator,
        validator: DocumentValidator,
        graph: Arc<dyn KnowledgeGraph>,
        web: Arc<dyn WebSearch>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            translator,
            validator,
            graph,
            web,
            synthesizer: AnswerSynthesizer::new(llm.clone()),
            llm,
            web_results: 5,
        }
    }

    pub fn with_web_results(mut self, web_results: usize) -> Self {
        self.web_results = web_results;
        self
    }

    /// Never fails: whatever happens, the caller gets an envelope holding every
    /// value produced before the pipeline stopped.
    pub async fn answer(&self, query: &str) -> ResultEnvelope {
        info!(query, "Starting annotation query processing");
        let mut envelope = ResultEnvelope::default();
        let mut stage = Stage::Extract;

        loop {
            let current = stage.name();
            match self.step(stage, query, &mut envelope).await {
                Ok(Some(next)) => {
                    debug!(from = current, to = next.name(), "Stage transition");
                    stage = next;
                }
                Ok(None) => {
                    info!(source = ?envelope.source, "Completed query processing");
                    break;
                }
                Err(e) => {
                    error!(stage = current, error = %e, "Query processing aborted");
                    break;
                }
            }
        }

        envelope
    }

    async fn step(
        &self,
        stage: Stage,
        query: &str,
        envelope: &mut ResultEnvelope,
    ) -> Result<Option<Stage>, PipelineError> {
        match stage {
            Stage::Extract => {
                let facts = self.translator
                    .extract_relevant_information(query)
                    .await
                    .map_err(|e| PipelineError::Extraction(format!("{:#}", e)))?;
                envelope.relevant_information = facts.clone();
                Ok(Some(Stage::Translate { facts }))
            }

            Stage::Translate { facts } => {
                let draft = self.translator
                    .convert_to_document(&facts, query)
                    .await
                    .map_err(|e| PipelineError::Translation(format!("{:#}", e)))?;
                envelope.initial_document = Some(draft.clone());
                Ok(Some(Stage::Validate { draft }))
            }

            Stage::Validate { draft } => {
                let ValidationOutcome { document, report } = self.validator.validate(&draft).await;
                let passed = report.is_success();
                let message = report.error_message.clone();
                envelope.validation_report = Some(report);

                if passed {
                    Ok(Some(Stage::ExecuteGraph { document }))
                } else {
                    Ok(Some(fall_back(PipelineError::Validation(message), Stage::WebSearch)))
                }
            }

            Stage::ExecuteGraph { document } => {
                envelope.validated_document = Some(document.clone());
                let result = self.graph.execute(&document).await;

                envelope.reasoning = match self.synthesizer.explain_reasoning(query, &document).await {
                    Ok(reasoning) => reasoning,
                    Err(e) => {
                        warn!(error = %e, "Reasoning unavailable");
                        String::new()
                    }
                };

                match result {
                    Ok(graph) if !graph.nodes.is_empty() => {
                        envelope.queried_graph = Some(QueriedGraph::Response(graph.clone()));
                        Ok(Some(Stage::Synthesize { document, graph }))
                    }
                    Ok(graph) => {
                        envelope.queried_graph = Some(QueriedGraph::Response(graph));
                        let err = PipelineError::GraphExecution("empty result".to_string());
                        Ok(Some(fall_back(err, Stage::WebSearch)))
                    }
                    Err(e) => {
                        let message = format!("{:#}", e);
                        envelope.queried_graph = Some(QueriedGraph::Error { error: message.clone() });
                        Ok(Some(fall_back(PipelineError::GraphExecution(message), Stage::WebSearch)))
                    }
                }
            }

            Stage::Synthesize { document, graph } => {
                envelope.source = AnswerSource::KnowledgeGraph;
                let answer = self.synthesizer
                    .answer_from_graph(query, &document, &graph)
                    .await
                    .map_err(|e| PipelineError::GraphExecution(format!("{:#}", e)))?;
                envelope.answer = answer;
                Ok(None)
            }

            Stage::WebSearch => match self.search_web(query, envelope).await {
                Ok(answer) => {
                    envelope.answer = answer;
                    envelope.source = AnswerSource::Web;
                    info!("Returning answer from web search");
                    Ok(None)
                }
                Err(e) => Ok(Some(fall_back(e, Stage::LlmFallback))),
            },

            Stage::LlmFallback => {
                let answer = self.llm
                    .generate(query)
                    .await
                    .map_err(|e| PipelineError::Fallback(format!("{:#}", e)))?;
                envelope.answer = answer;
                envelope.source = AnswerSource::Llm;
                info!("Returning answer from LLM");
                Ok(None)
            }
        }
    }

    async fn search_web(&self, query: &str, envelope: &mut ResultEnvelope) -> Result<String, PipelineError> {
        let results = match self.web.search(query, self.web_results).await {
            Ok(results) => results,
            Err(e) => {
                envelope.web_search_results = Some(Vec::new());
                return Err(PipelineError::WebSearch(format!("{:#}", e)));
            }
        };
        envelope.web_search_results = Some(results.clone());

        if results.is_empty() {
            return Err(PipelineError::WebSearch("No relevant web search result found".to_string()));
        }

        let prompt = web_search::build_synthesis_prompt(query, &results);
        let answer = self.llm
            .generate(&prompt)
            .await
            .map_err(|e| PipelineError::WebSearch(format!("Failed to synthesize web search results: {:#}", e)))?;

        if web_search::is_no_result(&answer) {
            return Err(PipelineError::WebSearch("search results did not answer the query".to_string()));
        }

        Ok(answer)
    }
}

fn fall_back(reason: PipelineError, next: Stage) -> Stage {
    warn!(error = %reason, next = next.name(), "Falling back");
    next
}
