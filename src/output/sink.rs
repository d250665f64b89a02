//! Status sinks for pipeline events

use crate::cert_ops::StatusSink;
use crate::models::{PipelineState, StatusEvent};
use crate::utils::progress::{create_spinner, print_fail, print_info, print_pass};
use indicatif::ProgressBar;
use std::sync::Mutex;

/// Prints stage transitions to the terminal, with a spinner while a stage runs
#[derive(Default)]
pub struct ConsoleSink {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusSink for ConsoleSink {
    fn emit(&self, event: &StatusEvent) {
        tracing::info!(stage = %event.stage, "{}", event.message);

        let mut spinner = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(active) = spinner.take() {
            active.finish_and_clear();
        }

        match event.stage {
            PipelineState::Idle => {}
            PipelineState::Validating => print_info(&event.message),
            PipelineState::Exporting | PipelineState::Decomposing => {
                *spinner = Some(create_spinner(&event.message));
            }
            PipelineState::Complete => print_pass(&event.message),
            PipelineState::Aborted | PipelineState::Failed => print_fail(&event.message),
        }
    }
}

impl Drop for ConsoleSink {
    fn drop(&mut self) {
        if let Ok(mut spinner) = self.spinner.lock() {
            if let Some(active) = spinner.take() {
                active.finish_and_clear();
            }
        }
    }
}

/// Logs events through `tracing` only (JSON and non-interactive runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn emit(&self, event: &StatusEvent) {
        match event.stage {
            PipelineState::Aborted | PipelineState::Failed => {
                tracing::warn!(stage = %event.stage, "{}", event.message)
            }
            _ => tracing::info!(stage = %event.stage, "{}", event.message),
        }
    }
}

/// Keeps every event it receives
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<StatusEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    pub fn stages(&self) -> Vec<PipelineState> {
        self.events().iter().map(|e| e.stage).collect()
    }
}

impl StatusSink for CollectingSink {
    fn emit(&self, event: &StatusEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        sink.emit(&StatusEvent::new(PipelineState::Validating, "validating"));
        sink.emit(&StatusEvent::new(PipelineState::Aborted, "no key"));
        assert_eq!(
            sink.stages(),
            vec![PipelineState::Validating, PipelineState::Aborted]
        );
        assert_eq!(sink.events()[1].message, "no key");
    }
}
