use log::{debug, info, trace, warn};
use std::thread;
use std::time::Duration;
use uuid::Uuid;

use super::generation_task::{GenerationTask, TaskStatus};
use super::settings::Settings;
use crate::error::{GenerationError, Result};
use crate::events::EventEmitter;
use crate::model::{GenerationEvent, GenerationRequest, Puzzle};

const DRAIN_BACKOFF_START: Duration = Duration::from_millis(1);
const DRAIN_BACKOFF_MAX: Duration = Duration::from_millis(64);

/// Owns at most one generation run at a time.
pub struct GenerationHost {
    settings: Settings,
    active: Option<GenerationTask>,
    event_emitter: EventEmitter<GenerationEvent>,
    debug_mode: bool,
}

impl GenerationHost {
    pub fn new(settings: Settings, event_emitter: EventEmitter<GenerationEvent>) -> Self {
        Self {
            settings,
            active: None,
            event_emitter,
            debug_mode: Settings::is_debug_mode(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_run(&self) -> Option<Uuid> {
        self.active.as_ref().map(|task| task.run_id())
    }

    /// Starts a run for `request`, aborting any run still in flight first.
    pub fn start(&mut self, request: &GenerationRequest) -> Result<Uuid> {
        if self.cancel() {
            self.drain();
        }
        let task = GenerationTask::new(request, &self.settings)?
            .with_events(self.event_emitter.clone());
        let run_id = task.run_id();
        info!(target: "scheduler", "Starting run {}", run_id);
        self.active = Some(task);
        Ok(run_id)
    }

    /// Requests an abort of the active run. The run stays active until a poll
    /// observes the request.
    pub fn cancel(&mut self) -> bool {
        match &self.active {
            Some(task) => {
                debug!(target: "scheduler", "Cancelling run {}", task.run_id());
                task.cancellation_token().cancel();
                true
            }
            None => false,
        }
    }

    /// Advances the active run by one budget window. Returns `None` when idle.
    /// The run is released once it completes or fails.
    pub fn poll(&mut self) -> Option<Result<TaskStatus>> {
        let task = self.active.as_mut()?;
        let status = task.poll();
        match &status {
            Ok(TaskStatus::Pending) => (),
            Ok(TaskStatus::Ready(puzzle)) => {
                if self.debug_mode {
                    for line in puzzle.describe_clues() {
                        debug!(target: "scheduler", "{}", line);
                    }
                }
                self.active = None;
            }
            Err(error) => {
                trace!(target: "scheduler", "Run {} stopped: {}", task.run_id(), error);
                self.active = None;
            }
        }
        Some(status)
    }

    /// Starts a run and polls it to completion.
    pub fn generate(&mut self, request: &GenerationRequest) -> Result<Puzzle> {
        let run_id = self.start(request)?;
        loop {
            match self.poll() {
                Some(Ok(TaskStatus::Ready(puzzle))) => return Ok(puzzle),
                Some(Ok(TaskStatus::Pending)) => (),
                Some(Err(error)) => return Err(error),
                None => return Err(GenerationError::Cancelled { run_id }),
            }
        }
    }

    /// Polls a cancelled run with growing pauses until it stops.
    fn drain(&mut self) {
        let mut backoff = DRAIN_BACKOFF_START;
        while let Some(status) = self.poll() {
            match status {
                Err(GenerationError::Cancelled { run_id }) => {
                    debug!(target: "scheduler", "Run {} observed its cancellation", run_id);
                    return;
                }
                Err(error) => {
                    warn!(target: "scheduler", "Cancelled run failed instead: {}", error);
                    return;
                }
                Ok(TaskStatus::Ready(_)) => return,
                Ok(TaskStatus::Pending) => {
                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(DRAIN_BACKOFF_MAX);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::events::Channel;

    fn host(step_budget: u64) -> (GenerationHost, Rc<RefCell<Vec<GenerationEvent>>>) {
        let mut settings = Settings::default();
        settings.step_budget = step_budget;
        let (emitter, observer) = Channel::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        observer.subscribe(move |event: &GenerationEvent| sink.borrow_mut().push(event.clone()));
        (GenerationHost::new(settings, emitter), events)
    }

    #[test]
    fn test_generate_releases_the_run() {
        let (mut host, events) = host(5_000);
        let request = GenerationRequest::new(4, 4, false).with_seed(1);
        let puzzle = host.generate(&request).unwrap();
        assert!(!host.is_busy());
        assert!(host.poll().is_none());
        assert!(matches!(
            events.borrow().last(),
            Some(GenerationEvent::Completed { run_id, .. }) if *run_id == puzzle.run_id
        ));
    }

    #[test]
    fn test_start_aborts_the_active_run() {
        let (mut host, events) = host(1);
        let request = GenerationRequest::new(4, 4, false).with_seed(1);
        let first = host.start(&request).unwrap();
        assert!(matches!(host.poll(), Some(Ok(TaskStatus::Pending))));

        let second = host.start(&request).unwrap();
        assert_ne!(first, second);
        assert_eq!(host.active_run(), Some(second));
        assert!(events
            .borrow()
            .contains(&GenerationEvent::Cancelled { run_id: first }));

        let mut puzzle = None;
        while let Some(status) = host.poll() {
            if let TaskStatus::Ready(ready) = status.unwrap() {
                puzzle = Some(ready);
            }
        }
        assert_eq!(puzzle.map(|puzzle| puzzle.run_id), Some(second));
    }

    #[test]
    fn test_cancel_is_observed_on_next_poll() {
        let (mut host, _events) = host(1);
        let request = GenerationRequest::new(4, 4, false).with_seed(1);
        let run_id = host.start(&request).unwrap();
        assert!(host.cancel());
        assert!(host.is_busy());
        assert!(matches!(
            host.poll(),
            Some(Err(GenerationError::Cancelled { run_id: id })) if id == run_id
        ));
        assert!(!host.is_busy());
        assert!(!host.cancel());
    }

    #[test]
    fn test_invalid_request_leaves_host_idle() {
        let (mut host, _events) = host(5_000);
        let request = GenerationRequest::new(1, 4, false);
        assert!(matches!(
            host.generate(&request),
            Err(GenerationError::InvalidRequest(_))
        ));
        assert!(!host.is_busy());
    }
}
