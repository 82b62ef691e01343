//! The continuous speed-test loop.
//!
//! Each iteration forces the translator back to a cold state (unless the
//! warm policy is selected), issues one fixed translate call, times it and
//! dumps the result. The loop has no iteration cap and never retries: the
//! first failure ends the run and cancellation ends it cleanly.

use crate::cancel::CancellationToken;
use crate::error::BenchError;
use crate::report::{BenchSummary, IterationRecord, TimingRecorder};
use nmtbench_decoder::{TranslationRequest, Translator};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetPolicy {
    /// `force_reset()` before every call; measures the full load path.
    #[default]
    Cold,
    /// Never reset; after the first call every iteration reuses loaded state.
    Warm,
}

pub struct BenchmarkLoop<T, W> {
    translator: T,
    output: W,
    request: TranslationRequest,
    policy: ResetPolicy,
    token: CancellationToken,
}

impl<T: Translator, W: Write> BenchmarkLoop<T, W> {
    pub fn new(
        translator: T,
        output: W,
        request: TranslationRequest,
        token: CancellationToken,
    ) -> Self {
        Self {
            translator,
            output,
            request,
            policy: ResetPolicy::Cold,
            token,
        }
    }

    pub fn with_policy(mut self, policy: ResetPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn translator(&self) -> &T {
        &self.translator
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Run until the token is cancelled (returns the summary) or a call
    /// fails (returns the error tagged with its 1-based iteration).
    pub fn run(&mut self) -> Result<BenchSummary, BenchError> {
        let mut recorder = TimingRecorder::new();
        let mut iteration = 0u64;

        info!(
            source = %self.request.source_lang,
            target = %self.request.target_lang,
            policy = ?self.policy,
            "starting benchmark loop"
        );

        while !self.token.is_cancelled() {
            iteration += 1;
            let record = self.step(iteration)?;
            info!(
                iteration,
                load_ms = record.load_ms,
                decode_ms = record.decode_ms,
                wall_ms = record.wall_ms,
                "translate call"
            );
            recorder.record(&record);
        }

        info!(iterations = recorder.len(), "benchmark cancelled");
        let summary = recorder.summary(self.policy);
        summary.log();
        Ok(summary)
    }

    fn step(&mut self, iteration: u64) -> Result<IterationRecord, BenchError> {
        if self.policy == ResetPolicy::Cold {
            self.translator.force_reset();
        }

        let start = Instant::now();
        let result = self
            .translator
            .translate(&self.request)
            .map_err(|source| BenchError::Translate { iteration, source })?;
        let wall = start.elapsed();

        writeln!(self.output, "{:?}", result)?;
        writeln!(self.output, "{}", result.text)?;
        writeln!(self.output, "{:?}", result.alignment)?;
        self.output.flush()?;

        Ok(IterationRecord::new(iteration, &result.timings, wall))
    }
}
