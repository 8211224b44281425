use std::sync::Arc;

use research_core::{
    update, AppState, AppViewModel, ConversationId, Msg, OrchestratorSettings,
};
use research_logging::research_warn;
use tokio::sync::{mpsc, watch};

use crate::effects::EffectRunner;
use crate::{ResearchApi, SubmitError};

/// One per client session: owns the job slot and every task it spawns.
///
/// Must be created and driven inside a tokio runtime. Dropping it cancels all
/// outstanding work.
pub struct Orchestrator {
    state: AppState,
    runner: EffectRunner,
    msg_rx: mpsc::UnboundedReceiver<Msg>,
    view_tx: watch::Sender<AppViewModel>,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn ResearchApi>, settings: OrchestratorSettings) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let state = AppState::with_settings(settings);
        let (view_tx, _) = watch::channel(state.view());
        Self {
            state,
            runner: EffectRunner::new(api, msg_tx),
            msg_rx,
            view_tx,
        }
    }

    /// Observable status stream; a new value is published whenever the view
    /// changes.
    pub fn subscribe(&self) -> watch::Receiver<AppViewModel> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn has_active_job(&self) -> bool {
        self.state.has_active_job()
    }

    /// Starts a deep research job for the open conversation.
    ///
    /// Precondition failures are returned here without any network call.
    /// Failures of the creation exchange itself arrive as a notice on the
    /// status stream.
    pub fn submit_job(&mut self, query: &str) -> Result<(), SubmitError> {
        let precondition = self.state.check_submit(query);
        self.dispatch(Msg::SubmitRequested {
            query: query.to_string(),
        });
        precondition.map_err(|rejection| {
            research_warn!("submit_job rejected: {}", rejection);
            SubmitError::from(rejection)
        })
    }

    pub fn switch_conversation(&mut self, conversation_id: ConversationId) {
        self.dispatch(Msg::ConversationSwitched(conversation_id));
    }

    /// Aborts the active job, if any. Safe to call at any time.
    pub fn teardown(&mut self) {
        self.dispatch(Msg::TeardownRequested);
    }

    /// Waits for the next message from a spawned task and applies it.
    ///
    /// Pends forever when nothing is outstanding; check [`Self::is_settled`]
    /// before waiting.
    pub async fn next(&mut self) {
        // The runner keeps a sender alive, so the channel never closes.
        if let Some(msg) = self.msg_rx.recv().await {
            self.dispatch(msg);
        }
    }

    /// Whether no job is active and no completion is still being reconciled.
    pub fn is_settled(&self) -> bool {
        let view = self.state.view();
        !view.scheduler.is_active() && !view.reconciling && self.runner.live_scopes() == 0
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            self.view_tx.send_replace(state.view());
        }
        self.state = state;
        self.runner.run(effects);
    }
}
