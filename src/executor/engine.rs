//! The workflow executor: a single-consumer actor owning all engine state.
//!
//! One [`WorkflowExecutor`] per engine instance, driven by exactly one Tokio task:
//! a request-response actor over an mpsc channel, with no locks on shared state.
//! Every [`TransitionRequest`] is serialized through this task; guard evaluation,
//! journal writes, and state mutation all happen on the same task in that order.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::{WorkflowEvent, WorkflowEventBus};
use crate::executor::handlers::{self, HandlerContext};
use crate::guard::matrix::{self, TransitionRule};
use crate::journal::entry::{GuardOutcome, JournalCategory, WorkflowJournalEntry};
use crate::journal::writer::Journal;
use crate::model::context::GuardEvaluationContext;
use crate::model::state::{Trigger, WorkflowState};
use crate::model::study::StudyContext;
use crate::model::transition::{TransitionRequest, TransitionResult};
use crate::ports::aec::AecPort;
use crate::ports::detector::DetectorPort;
use crate::ports::dicom::{MppsPort, StorePort, WorklistPort};
use crate::ports::dose_tracker::DoseTrackerPort;
use crate::ports::hvg::HvgPort;
use crate::ports::safety_port::SafetyPort;
use crate::protocol_repo::ProtocolRepository;
use crate::safety::emergency::EmergencySequencer;
use crate::safety::interlocks::InterlockChain;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, info_span, warn};

/// Every hardware and DICOM collaborator the executor programs against. Concrete
/// vendor adapters live outside this crate; only the trait objects are held here, so
/// tests and `bin/engine_demo.rs` can swap in [`crate::ports::mock`] implementations.
#[derive(Clone)]
pub struct Collaborators {
    pub hvg: Arc<dyn HvgPort>,
    pub detector: Arc<dyn DetectorPort>,
    pub safety: Arc<dyn SafetyPort>,
    pub aec: Arc<dyn AecPort>,
    pub dose_tracker: Arc<dyn DoseTrackerPort>,
    pub worklist: Arc<dyn WorklistPort>,
    pub mpps: Arc<dyn MppsPort>,
    pub store: Arc<dyn StorePort>,
}

pub(crate) enum ExecutorMessage {
    Transition {
        request: TransitionRequest,
        reply: oneshot::Sender<TransitionResult>,
    },
    QueryState {
        reply: oneshot::Sender<WorkflowState>,
    },
}

/// Clonable front door onto a running [`WorkflowExecutor`]. Cheap to clone and share
/// across the public API facade, hardware-callback adapters, and the mid-exposure
/// monitor task — none of them ever touch executor state directly.
#[derive(Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<ExecutorMessage>,
}

impl EngineHandle {
    /// Submits a transition request and awaits its outcome.
    pub async fn submit(&self, request: TransitionRequest) -> TransitionResult {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .sender
            .send(ExecutorMessage::Transition {
                request: request.clone(),
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            return TransitionResult::Errored {
                state: WorkflowState::Idle,
                error: EngineError::ExternalDependencyError(
                    "executor task is no longer running".into(),
                ),
            };
        }
        reply_rx.await.unwrap_or_else(|_| TransitionResult::Errored {
            state: WorkflowState::Idle,
            error: EngineError::ExternalDependencyError(
                "executor dropped the reply channel".into(),
            ),
        })
    }

    /// Fire-and-forget submission for contexts that cannot await a reply on their own
    /// task — hardware interlock callbacks and the mid-exposure monitor. A callback
    /// thread must never apply a transition directly.
    pub fn submit_detached(&self, request: TransitionRequest) {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let (reply_tx, _reply_rx) = oneshot::channel();
            if sender
                .send(ExecutorMessage::Transition {
                    request,
                    reply: reply_tx,
                })
                .await
                .is_err()
            {
                warn!("dropped a detached transition request: executor task is gone");
            }
        });
    }

    pub async fn current_state(&self) -> WorkflowState {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .sender
            .send(ExecutorMessage::QueryState { reply: reply_tx })
            .await
            .is_err()
        {
            return WorkflowState::Idle;
        }
        reply_rx.await.unwrap_or(WorkflowState::Idle)
    }
}

/// Owns the current state, the active study, and every collaborator. Never cloned,
/// never shared — reached only through an [`EngineHandle`].
pub struct WorkflowExecutor {
    current_state: WorkflowState,
    study_context: Option<StudyContext>,
    journal: Box<dyn Journal>,
    events: WorkflowEventBus,
    collaborators: Collaborators,
    config: EngineConfig,
    interlocks: InterlockChain,
    emergency: EmergencySequencer,
    protocol_repo: Arc<ProtocolRepository>,
    handle: EngineHandle,
    monitor_stop: Option<oneshot::Sender<()>>,
}

impl WorkflowExecutor {
    /// Spawns the executor task and returns a handle to it, plus the task's
    /// `JoinHandle` for callers that want to await shutdown.
    pub fn spawn(
        initial_state: WorkflowState,
        initial_study: Option<StudyContext>,
        journal: Box<dyn Journal>,
        events: WorkflowEventBus,
        collaborators: Collaborators,
        config: EngineConfig,
        protocol_repo: Arc<ProtocolRepository>,
    ) -> (EngineHandle, tokio::task::JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(32);
        let handle = EngineHandle { sender };
        let interlocks = InterlockChain::new(
            collaborators.safety.clone(),
            config.interlock_query_timeout(),
        );
        let emergency = EmergencySequencer::new(collaborators.hvg.clone(), collaborators.safety.clone());
        let executor = WorkflowExecutor {
            current_state: initial_state,
            study_context: initial_study,
            journal,
            events,
            collaborators,
            config,
            interlocks,
            emergency,
            protocol_repo,
            handle: handle.clone(),
            monitor_stop: None,
        };
        let join = tokio::spawn(executor.run(receiver));
        (handle, join)
    }

    async fn run(mut self, mut receiver: mpsc::Receiver<ExecutorMessage>) {
        info!(state = %self.current_state, "workflow executor started");
        while let Some(message) = receiver.recv().await {
            match message {
                ExecutorMessage::Transition { request, reply } => {
                    let result = self.handle_transition(request).await;
                    let _ = reply.send(result);
                }
                ExecutorMessage::QueryState { reply } => {
                    let _ = reply.send(self.current_state);
                }
            }
        }
        warn!("workflow executor channel closed; task exiting");
    }

    /// The full per-transition algorithm:
    /// 1. Look up candidate rows for `(current_state, trigger)`.
    /// 2. Evaluate each candidate's guards in declaration order; the first row whose
    ///    guards all pass is chosen.
    /// 3. Construct and durably persist the journal entry.
    /// 4. Mutate `current_state` only after the write is durable.
    /// 5. Publish a `StateChanged` event.
    /// 6. Dispatch to the new state's handler for entry side effects.
    /// 7. Return the outcome.
    ///
    /// `CriticalHardwareError` and `StudyAbortRequested` are special-cased ahead of
    /// step 1: the emergency sequence must complete before the transition to `Idle`
    /// is even attempted, matching the crash-recovery invariant that hardware is
    /// never left live.
    async fn handle_transition(&mut self, mut request: TransitionRequest) -> TransitionResult {
        let span = info_span!("transition", from = %self.current_state, trigger = %request.trigger);
        let _enter = span.enter();

        if matches!(
            request.trigger,
            Trigger::CriticalHardwareError | Trigger::StudyAbortRequested
        ) {
            // A direct operator abort must issue a hardware abort before the state
            // change is even attempted, same as a critical hardware error — cancelling
            // an active exposure without commanding the generator off would leave it
            // live after the console reports Idle.
            self.emergency.execute().await;
            self.stop_mid_exposure_monitor();
        }

        // Hardware-derived guard inputs are never trusted from the caller: re-read
        // them from the source of truth immediately before evaluating guards.
        // Interlock status is always a fresh atomic snapshot.
        request.context.hardware_interlock_ok = self.interlocks.snapshot().await.all_ok();
        if let Ok(status) = self.collaborators.detector.get_status().await {
            request.context.detector_ready =
                matches!(status, crate::ports::detector::DetectorStatus::Ready);
        }

        let candidates = matrix::candidates(self.current_state, request.trigger);
        if candidates.is_empty() {
            warn!("no transition defined for this (state, trigger) pair");
            return TransitionResult::InvalidTransition {
                state: self.current_state,
                requested: request.target_state,
                trigger: request.trigger,
            };
        }

        let safety_touched = self.current_state.is_safety_critical()
            || candidates.iter().any(|r| r.to.is_safety_critical());

        let (chosen, outcomes) = self.select_rule(&candidates, &request);

        let Some(rule) = chosen else {
            let failed_guards: Vec<String> = outcomes
                .iter()
                .filter(|o| !o.passed)
                .map(|o| o.name.clone())
                .collect();
            warn!(failed_guards = ?failed_guards, "guard(s) failed");
            if safety_touched {
                let entry = self.build_entry(
                    self.current_state,
                    self.current_state,
                    request.trigger,
                    outcomes,
                    &request,
                    JournalCategory::Safety,
                );
                if let Err(err) = self.persist(entry).await {
                    warn!(error = %err, "failed to journal a safety-critical guard failure");
                }
            }
            return TransitionResult::GuardFailed {
                state: self.current_state,
                failed_guards,
            };
        };

        let category = if rule.id == matrix::CRITICAL_HARDWARE_ERROR_RULE_ID || safety_touched {
            JournalCategory::Safety
        } else {
            JournalCategory::Workflow
        };

        let entry = self.build_entry(
            self.current_state,
            rule.to,
            request.trigger,
            outcomes,
            &request,
            category,
        );

        if let Err(err) = self.persist(entry.clone()).await {
            return TransitionResult::Errored {
                state: self.current_state,
                error: err,
            };
        }

        let old = self.current_state;
        self.current_state = rule.to;
        info!(from = %old, to = %rule.to, trigger = %request.trigger, "transition applied");

        self.events.publish(WorkflowEvent::StateChanged {
            transition_id: entry.transition_id,
            from: old,
            to: rule.to,
            trigger: request.trigger,
            timestamp: entry.timestamp,
        });

        if let Err(err) = self.dispatch_state_change(old, rule.to, &request).await {
            error!(error = %err, "state-entry handler failed");
            if err.is_critical_hardware() && (old.is_safety_critical() || rule.to.is_safety_critical())
            {
                self.handle.submit_detached(TransitionRequest::new(
                    Trigger::CriticalHardwareError,
                    GuardEvaluationContext::new(),
                ));
            }
            return TransitionResult::Errored {
                state: self.current_state,
                error: err,
            };
        }

        TransitionResult::Success {
            old,
            new: rule.to,
            trigger: request.trigger,
        }
    }

    /// Evaluates every candidate rule in declaration order, returning the first whose
    /// guards all pass along with that rule's outcomes — or, if none pass, the last
    /// candidate's outcomes (the one reported back as the failure).
    fn select_rule<'a>(
        &self,
        candidates: &[&'a TransitionRule],
        request: &TransitionRequest,
    ) -> (Option<&'a TransitionRule>, Vec<GuardOutcome>) {
        let mut outcomes = Vec::new();
        for rule in candidates {
            let rule_outcomes: Vec<GuardOutcome> = rule
                .guards
                .iter()
                .map(|g| GuardOutcome {
                    name: g.name.to_string(),
                    passed: (g.check)(&request.context),
                    reason: None,
                })
                .collect();
            let all_passed = rule_outcomes.iter().all(|o| o.passed);
            outcomes = rule_outcomes;
            if all_passed {
                return (Some(rule), outcomes);
            }
        }
        (None, outcomes)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_entry(
        &self,
        from: WorkflowState,
        to: WorkflowState,
        trigger: Trigger,
        guard_results: Vec<GuardOutcome>,
        request: &TransitionRequest,
        category: JournalCategory,
    ) -> WorkflowJournalEntry {
        WorkflowJournalEntry::new(
            from,
            to,
            trigger,
            guard_results,
            request.operator_id.clone(),
            self.study_context
                .as_ref()
                .map(|s| s.study_instance_uid.clone()),
            category,
            request.context.metadata.clone(),
        )
    }

    /// Durable write with a journal-error fallback: on failure, attempt a second
    /// write of the same entry tagged `System`, carrying the original error in its
    /// metadata, before surfacing the original failure to the caller.
    async fn persist(&mut self, entry: WorkflowJournalEntry) -> EngineResult<()> {
        if let Err(err) = self.journal.append(&entry).await {
            error!(error = %err, "durable journal write failed");
            let mut fallback = entry;
            fallback.category = JournalCategory::System;
            fallback
                .metadata
                .insert("original_error".into(), err.to_string());
            if let Err(second_err) = self.journal.append(&fallback).await {
                error!(error = %second_err, "fallback System-category journal write also failed");
            }
            return Err(err);
        }
        Ok(())
    }

    async fn dispatch_state_change(
        &mut self,
        old: WorkflowState,
        new: WorkflowState,
        request: &TransitionRequest,
    ) -> EngineResult<()> {
        if old == WorkflowState::ExposureTrigger && new != WorkflowState::ExposureTrigger {
            self.stop_mid_exposure_monitor();
        }

        let handler = handlers::handler_for(new);
        let mut ctx = HandlerContext {
            study_context: &mut self.study_context,
            collaborators: &self.collaborators,
            config: &self.config,
            handle: self.handle.clone(),
            events: &self.events,
            protocol_repo: self.protocol_repo.as_ref(),
            interlocks: &self.interlocks,
            monitor_stop: &mut self.monitor_stop,
            trigger: request.trigger,
            operator_id: request.operator_id.clone(),
            payload: request.payload.clone(),
            old_state: old,
        };
        handler.on_enter(&mut ctx).await
    }

    fn stop_mid_exposure_monitor(&mut self) {
        if let Some(stop) = self.monitor_stop.take() {
            let _ = stop.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::writer::InMemoryJournal;
    use crate::ports::mock::{MockAec, MockDetector, MockDoseTracker, MockHvg, MockMpps, MockSafety, MockStore, MockWorklist};

    fn mock_collaborators() -> Collaborators {
        Collaborators {
            hvg: Arc::new(MockHvg::default()),
            detector: Arc::new(MockDetector::default()),
            safety: Arc::new(MockSafety::default()),
            aec: Arc::new(MockAec::default()),
            dose_tracker: Arc::new(MockDoseTracker::default()),
            worklist: Arc::new(MockWorklist::default()),
            mpps: Arc::new(MockMpps::default()),
            store: Arc::new(MockStore::new(0)),
        }
    }

    #[tokio::test]
    async fn invalid_transition_does_not_change_state() {
        let (handle, _join) = WorkflowExecutor::spawn(
            WorkflowState::Idle,
            None,
            Box::new(InMemoryJournal::default()),
            WorkflowEventBus::default(),
            mock_collaborators(),
            EngineConfig::default(),
            Arc::new(ProtocolRepository::new(false)),
        );
        let result = handle
            .submit(TransitionRequest::new(
                Trigger::ImageAccepted,
                GuardEvaluationContext::new(),
            ))
            .await;
        assert!(matches!(result, TransitionResult::InvalidTransition { .. }));
        assert_eq!(handle.current_state().await, WorkflowState::Idle);
    }

    #[tokio::test]
    async fn worklist_sync_requested_advances_state_and_is_durable() {
        let (handle, _join) = WorkflowExecutor::spawn(
            WorkflowState::Idle,
            None,
            Box::new(InMemoryJournal::default()),
            WorkflowEventBus::default(),
            mock_collaborators(),
            EngineConfig::default(),
            Arc::new(ProtocolRepository::new(false)),
        );
        let mut ctx = GuardEvaluationContext::new();
        ctx.network_reachable = true;
        let result = handle
            .submit(TransitionRequest::new(Trigger::WorklistSyncRequested, ctx))
            .await;
        assert!(result.is_success());
        // The WorklistSync handler resolves the query and posts its own follow-up
        // transition asynchronously, so only the directly-requested state change is
        // guaranteed to be visible immediately.
        assert_eq!(handle.current_state().await, WorkflowState::WorklistSync);
    }
}
