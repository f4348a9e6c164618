//! The session controller.
//!
//! Owns the conversation history, turn counter, current scene and error
//! state of the single active play-through, and orchestrates the generation
//! adapter (through the retry policy), scene repair and the snapshot store.
//!
//! State sits behind a `std::sync::Mutex` that is never held across an
//! `.await`. Operations other than `reset` are rejected while another one is
//! in flight. `start`, `continue_game` and `reset` bump an epoch counter; a
//! generation result is only applied if the epoch it was issued under is
//! still current, so a reset during a slow call discards the late answer.
//! Store mutations are serialised behind an async lock and re-check the
//! epoch once it is held, so a write from an abandoned session never lands
//! after the removal that abandoned it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{error, info, instrument, warn};
use xiuxian_core::clock::Clock;
use xiuxian_core::command::Command;
use xiuxian_core::conversation::ConversationTurn;
use xiuxian_core::error::{GenerationError, SessionError};
use xiuxian_core::generation::{GenerationClient, GenerationRequest};
use xiuxian_core::store::SnapshotStore;

use super::illustration::EndingIllustrator;
use super::retry::RetryPolicy;
use super::view::{Phase, SessionView};
use crate::domain::commands::{ContinueSession, ResetSession, SendChoice, StartSession};
use crate::domain::prompts;
use crate::domain::scene::{self, FALLBACK_ENDING_KEYWORD, RepairContext, Scene, SceneState};
use crate::domain::settings::{SessionSettings, TALENT_POINT_BUDGET};
use crate::domain::snapshot::{SNAPSHOT_KEY, SessionSnapshot};
use crate::domain::turn::TurnState;

/// Tunables for a controller instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Points the four attributes must sum to.
    pub talent_budget: u32,
    /// Backoff for overloaded generation calls.
    pub retry: RetryPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            talent_budget: TALENT_POINT_BUDGET,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    phase: Phase,
    epoch: u64,
    error: Option<String>,
    current_scene: Option<Scene>,
    history: Vec<ConversationTurn>,
    turn: TurnState,
    has_save: bool,
}

impl SessionState {
    fn view(&self) -> SessionView {
        SessionView {
            phase: self.phase,
            is_loading: self.phase.is_busy(),
            error: self.error.clone(),
            current_scene: self.current_scene.clone(),
            current_turn: self.turn.current_turn,
            max_turns: self.turn.max_turns,
            has_save: self.has_save,
        }
    }

    /// Clears the session while keeping the epoch and save flag.
    fn clear(&mut self) {
        *self = Self {
            epoch: self.epoch,
            has_save: self.has_save,
            ..Self::default()
        };
    }
}

/// Drives one turn-based narrative session.
pub struct SessionController {
    generation: Arc<dyn GenerationClient>,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    config: ControllerConfig,
    state: Mutex<SessionState>,
    store_writes: AsyncMutex<()>,
    updates: watch::Sender<SessionView>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new(
        generation: Arc<dyn GenerationClient>,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        config: ControllerConfig,
    ) -> Self {
        let (updates, _) = watch::channel(SessionView::default());
        Self {
            generation,
            store,
            clock,
            config,
            state: Mutex::new(SessionState::default()),
            store_writes: AsyncMutex::new(()),
            updates,
        }
    }

    /// Current state, for polling consumers.
    #[must_use]
    pub fn view(&self) -> SessionView {
        self.lock_state().view()
    }

    /// Receiver that observes every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.updates.subscribe()
    }

    /// Probes the store so `has_save` reflects a snapshot left by an earlier
    /// process. Store failures read as "no save".
    pub async fn refresh_has_save(&self) -> bool {
        let has_save = match self.store.get(SNAPSHOT_KEY).await {
            Ok(found) => found.is_some(),
            Err(err) => {
                warn!(error = %err, "could not probe snapshot store");
                false
            }
        };
        self.update(|state| state.has_save = has_save);
        has_save
    }

    /// Starts a new session, discarding any current one and its snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` for settings that break the talent
    /// budget, `SessionError::Busy` while another operation is in flight, and
    /// the generation or parse failure otherwise (also surfaced through the
    /// view's `error`).
    #[instrument(skip_all, fields(max_turns = settings.max_turns))]
    pub async fn start(&self, settings: SessionSettings) -> Result<(), SessionError> {
        let command = StartSession::new(settings);
        info!(
            command_type = command.command_type(),
            correlation_id = %command.correlation_id(),
            "handling command"
        );
        command.settings.validate(self.config.talent_budget)?;

        let epoch = {
            let mut state = self.lock_state();
            if state.phase.is_busy() {
                return Err(SessionError::Busy);
            }
            state.epoch += 1;
            state.clear();
            state.phase = Phase::AwaitingGeneration;
            state.turn = TurnState::new(command.settings.max_turns);
            state.epoch
        };
        self.publish();

        self.remove_snapshot(epoch).await;

        let request = GenerationRequest {
            history: Vec::new(),
            turn: ConversationTurn::user(prompts::opening_prompt(&command.settings)),
            system_instruction: Some(prompts::SYSTEM_INSTRUCTION.to_owned()),
        };
        self.complete_generation(epoch, request, RepairContext::default())
            .await
    }

    /// Submits the player's choice and generates the next scene.
    ///
    /// The turn counter advances before the call and is not refunded if the
    /// call fails. After a failed choice the held scene stays playable.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Busy` while another operation is in flight,
    /// `SessionError::InvalidState` unless an ongoing scene is held,
    /// `SessionError::Validation` for a blank choice, and the generation or
    /// parse failure otherwise.
    #[instrument(skip_all)]
    pub async fn send_choice(&self, choice: &str) -> Result<(), SessionError> {
        let command = SendChoice::new(choice.trim());
        info!(
            command_type = command.command_type(),
            correlation_id = %command.correlation_id(),
            "handling command"
        );
        if command.choice.is_empty() {
            return Err(SessionError::Validation("choice must not be blank".to_owned()));
        }

        let (epoch, request, is_final_turn) = {
            let mut state = self.lock_state();
            if state.phase.is_busy() {
                return Err(SessionError::Busy);
            }
            let ongoing = matches!(state.phase, Phase::SceneReady | Phase::Error)
                && state
                    .current_scene
                    .as_ref()
                    .is_some_and(|scene| scene.state == SceneState::Ongoing);
            if !ongoing {
                return Err(SessionError::InvalidState(
                    "a choice needs an ongoing scene".to_owned(),
                ));
            }

            let new_turn = state.turn.advance();
            let is_final_turn = state.turn.is_final();
            info!(new_turn, max_turns = state.turn.max_turns, is_final_turn, "advancing turn");
            state.phase = Phase::AwaitingGeneration;
            state.error = None;

            let request = GenerationRequest {
                history: state.history.clone(),
                turn: ConversationTurn::user(prompts::choice_prompt(
                    &command.choice,
                    &state.turn,
                    is_final_turn,
                )),
                system_instruction: None,
            };
            (state.epoch, request, is_final_turn)
        };
        self.publish();

        let context = RepairContext {
            force_ending: is_final_turn,
        };
        self.complete_generation(epoch, request, context).await
    }

    /// Restores the persisted session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSaveData` when nothing is stored,
    /// `SessionError::CorruptSave` when the stored value cannot be decoded
    /// (the value is removed), `SessionError::Persistence` when the store
    /// fails, `SessionError::Busy` while another operation is in flight and
    /// `SessionError::InvalidState` while a scene is held.
    #[instrument(skip_all)]
    pub async fn continue_game(&self) -> Result<(), SessionError> {
        let command = ContinueSession::default();
        info!(
            command_type = command.command_type(),
            correlation_id = %command.correlation_id(),
            "handling command"
        );

        let epoch = {
            let mut state = self.lock_state();
            match state.phase {
                Phase::Idle | Phase::Error => {}
                Phase::AwaitingGeneration | Phase::Restoring => return Err(SessionError::Busy),
                Phase::SceneReady => {
                    return Err(SessionError::InvalidState(
                        "reset the current session before continuing".to_owned(),
                    ));
                }
            }
            state.epoch += 1;
            state.clear();
            state.phase = Phase::Restoring;
            state.epoch
        };
        self.publish();

        let restored = match self.store.get(SNAPSHOT_KEY).await {
            Ok(Some(raw)) => SessionSnapshot::decode(&raw),
            Ok(None) => Err(SessionError::NoSaveData),
            Err(err) => Err(SessionError::from(err)),
        };

        if let Err(SessionError::CorruptSave(reason)) = &restored {
            warn!(reason = %reason, "discarding corrupt snapshot");
            self.remove_snapshot(epoch).await;
        }

        let mut state = self.lock_state();
        if state.epoch != epoch {
            return Err(SessionError::Superseded);
        }
        match restored {
            Ok(snapshot) => {
                info!(
                    current_turn = snapshot.turn_state.current_turn,
                    max_turns = snapshot.turn_state.max_turns,
                    saved_at = %snapshot.timestamp,
                    "restored session"
                );
                state.current_scene = Some(snapshot.current_scene);
                state.history = snapshot.conversation_history;
                state.turn = snapshot.turn_state;
                state.phase = Phase::SceneReady;
                state.has_save = true;
                self.updates.send_replace(state.view());
                Ok(())
            }
            Err(err) => {
                if matches!(err, SessionError::NoSaveData | SessionError::CorruptSave(_)) {
                    state.has_save = false;
                }
                error!(error = %err, "could not restore session");
                state.phase = Phase::Error;
                state.error = Some(err.user_message());
                self.updates.send_replace(state.view());
                Err(err)
            }
        }
    }

    /// Abandons the session: removes the snapshot and returns to idle. Any
    /// in-flight generation result is discarded when it arrives.
    #[instrument(skip_all)]
    pub async fn reset(&self) {
        let command = ResetSession::default();
        info!(
            command_type = command.command_type(),
            correlation_id = %command.correlation_id(),
            "handling command"
        );
        let epoch = {
            let mut state = self.lock_state();
            state.epoch += 1;
            state.clear();
            state.epoch
        };
        self.publish();
        self.remove_snapshot(epoch).await;
    }

    /// Looks up an illustration for the ending keyword of the held scene.
    ///
    /// Failures are returned to the caller only; they never touch the
    /// session's error state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless an ended scene is held,
    /// and `SessionError::ImageLookupFailure` when no image is found.
    pub async fn illustrate_ending(
        &self,
        illustrator: &EndingIllustrator,
    ) -> Result<String, SessionError> {
        let keyword = {
            let state = self.lock_state();
            match &state.current_scene {
                Some(scene) if scene.is_ended() => scene
                    .ending_keyword
                    .clone()
                    .unwrap_or_else(|| FALLBACK_ENDING_KEYWORD.to_owned()),
                _ => {
                    return Err(SessionError::InvalidState(
                        "no ending to illustrate".to_owned(),
                    ));
                }
            }
        };
        illustrator.illustrate(&keyword).await.map_err(|err| {
            warn!(keyword = %keyword, error = %err, "ending illustration unavailable");
            SessionError::from(err)
        })
    }

    /// Runs the generation call under the retry policy and applies the
    /// outcome. Nothing but the turn counter changes on failure.
    async fn complete_generation(
        &self,
        epoch: u64,
        request: GenerationRequest,
        context: RepairContext,
    ) -> Result<(), SessionError> {
        let generation = &self.generation;
        let pending = &request;
        let outcome = self
            .config
            .retry
            .run("generate_scene", GenerationError::is_transient, move || {
                generation.generate(pending)
            })
            .await
            .map_err(SessionError::from)
            .and_then(|raw| scene::parse_scene(&raw, context));

        let snapshot = {
            let mut state = self.lock_state();
            if state.epoch != epoch {
                info!("session changed while awaiting generation, discarding result");
                return Err(SessionError::Superseded);
            }
            match outcome {
                Ok(scene) => {
                    state.history.push(request.turn);
                    state
                        .history
                        .push(ConversationTurn::model(scene.history_text()));
                    state.phase = Phase::SceneReady;
                    state.error = None;
                    info!(
                        title = %scene.title,
                        state = ?scene.state,
                        current_turn = state.turn.current_turn,
                        "scene ready"
                    );
                    let snapshot = (!scene.is_ended()).then(|| SessionSnapshot {
                        current_scene: scene.clone(),
                        conversation_history: state.history.clone(),
                        turn_state: state.turn,
                        timestamp: self.clock.now(),
                    });
                    state.current_scene = Some(scene);
                    self.updates.send_replace(state.view());
                    snapshot
                }
                Err(err) => {
                    error!(error = %err, "generation failed");
                    state.phase = Phase::Error;
                    state.error = Some(err.user_message());
                    self.updates.send_replace(state.view());
                    return Err(err);
                }
            }
        };

        match snapshot {
            Some(snapshot) => self.write_snapshot(epoch, &snapshot).await,
            None => self.remove_snapshot(epoch).await,
        }
        Ok(())
    }

    /// Best-effort snapshot write; failures are logged and leave the
    /// in-memory state untouched.
    async fn write_snapshot(&self, epoch: u64, snapshot: &SessionSnapshot) {
        let encoded = match snapshot.encode() {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(error = %err, "could not encode snapshot");
                return;
            }
        };
        let _writes = self.store_writes.lock().await;
        if !self.is_current(epoch) {
            info!("session changed before snapshot write, skipping");
            return;
        }
        match self.store.set(SNAPSHOT_KEY, &encoded).await {
            Ok(()) => self.update_if_current(epoch, |state| state.has_save = true),
            Err(err) => warn!(error = %err, "could not persist snapshot"),
        }
    }

    /// Best-effort snapshot removal. Waits for any write in progress, and is
    /// skipped once a newer operation owns the store.
    async fn remove_snapshot(&self, epoch: u64) {
        let _writes = self.store_writes.lock().await;
        if !self.is_current(epoch) {
            return;
        }
        match self.store.remove(SNAPSHOT_KEY).await {
            Ok(()) => self.update_if_current(epoch, |state| state.has_save = false),
            Err(err) => warn!(error = %err, "could not remove snapshot"),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.lock_state().epoch == epoch
    }

    fn publish(&self) {
        let view = self.lock_state().view();
        self.updates.send_replace(view);
    }

    fn update(&self, apply: impl FnOnce(&mut SessionState)) {
        let mut state = self.lock_state();
        apply(&mut state);
        self.updates.send_replace(state.view());
    }

    fn update_if_current(&self, epoch: u64, apply: impl FnOnce(&mut SessionState)) {
        let mut state = self.lock_state();
        if state.epoch == epoch {
            apply(&mut state);
            self.updates.send_replace(state.view());
        }
    }
}
