use query::{AnswerSource, ResultEnvelope, NO_RESULT};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use validate::ValidationStatus;

pub struct Metrics {
    // Counters
    total_queries: AtomicUsize,
    answered_queries: AtomicUsize,
    validation_failures: AtomicUsize,

    // Answers per source
    knowledge_graph_answers: AtomicUsize,
    web_answers: AtomicUsize,
    llm_answers: AtomicUsize,

    // Timing (in microseconds)
    total_query_time_us: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_queries: AtomicUsize::new(0),
            answered_queries: AtomicUsize::new(0),
            validation_failures: AtomicUsize::new(0),
            knowledge_graph_answers: AtomicUsize::new(0),
            web_answers: AtomicUsize::new(0),
            llm_answers: AtomicUsize::new(0),
            total_query_time_us: AtomicU64::new(0),
        })
    }

    pub fn record_query(&self, envelope: &ResultEnvelope, duration: std::time::Duration) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        self.total_query_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);

        if envelope
            .validation_report
            .as_ref()
            .is_some_and(|r| r.status == ValidationStatus::Failed)
        {
            self.validation_failures.fetch_add(1, Ordering::Relaxed);
        }

        // Pipeline stopped before any path produced an answer
        if envelope.answer == NO_RESULT {
            return;
        }

        self.answered_queries.fetch_add(1, Ordering::Relaxed);
        let counter = match envelope.source {
            AnswerSource::KnowledgeGraph => &self.knowledge_graph_answers,
            AnswerSource::Web => &self.web_answers,
            AnswerSource::Llm => &self.llm_answers,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_queries = self.total_queries.load(Ordering::Relaxed);
        let total_us = self.total_query_time_us.load(Ordering::Relaxed) as f64;

        MetricsSnapshot {
            total_queries,
            answered_queries: self.answered_queries.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            knowledge_graph_answers: self.knowledge_graph_answers.load(Ordering::Relaxed),
            web_answers: self.web_answers.load(Ordering::Relaxed),
            llm_answers: self.llm_answers.load(Ordering::Relaxed),
            avg_query_time_ms: if total_queries > 0 {
                total_us / total_queries as f64 / 1000.0 // Convert to ms
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_queries: usize,
    pub answered_queries: usize,
    pub validation_failures: usize,
    pub knowledge_graph_answers: usize,
    pub web_answers: usize,
    pub llm_answers: usize,
    pub avg_query_time_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
