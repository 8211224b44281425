use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use research_core::{Effect, Msg, SessionId};
use research_logging::{research_debug, research_trace};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ResearchApi;

/// Executes core effects as tokio tasks that report back through `msg_tx`.
///
/// Every task belonging to a job session runs under that session's token, so
/// one `CancelSession` stops the in-flight exchange, the scheduled tick and the
/// deadline timer together. A completed session's result fetch and history
/// reload run under a separate reconciliation token.
pub(crate) struct EffectRunner {
    api: Arc<dyn ResearchApi>,
    msg_tx: mpsc::UnboundedSender<Msg>,
    root: CancellationToken,
    sessions: HashMap<SessionId, CancellationToken>,
    reconciliations: HashMap<SessionId, CancellationToken>,
}

impl EffectRunner {
    pub(crate) fn new(api: Arc<dyn ResearchApi>, msg_tx: mpsc::UnboundedSender<Msg>) -> Self {
        Self {
            api,
            msg_tx,
            root: CancellationToken::new(),
            sessions: HashMap::new(),
            reconciliations: HashMap::new(),
        }
    }

    pub(crate) fn run(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.execute(effect);
        }
    }

    /// Number of job or reconciliation scopes whose tasks may still be running.
    pub(crate) fn live_scopes(&self) -> usize {
        self.sessions.len() + self.reconciliations.len()
    }

    fn execute(&mut self, effect: Effect) {
        research_trace!("Executing {:?}", effect);
        match effect {
            Effect::CreateJob {
                session,
                query,
                conversation_id,
            } => {
                let api = self.api.clone();
                let token = self.session_token(session);
                self.spawn(token, async move {
                    match api.create_job(&query, &conversation_id).await {
                        Ok(job_id) => Msg::JobCreated { session, job_id },
                        Err(err) => Msg::JobCreationFailed {
                            session,
                            message: err.message,
                        },
                    }
                });
            }
            Effect::FetchStatus { session, job_id } => {
                let api = self.api.clone();
                let token = self.session_token(session);
                self.spawn(token, async move {
                    match api.job_status(&job_id).await {
                        Ok(report) => Msg::StatusReceived { session, report },
                        Err(err) => Msg::StatusFailed {
                            session,
                            message: err.to_string(),
                        },
                    }
                });
            }
            Effect::SchedulePoll { session, delay } => {
                let token = self.session_token(session);
                self.spawn(token, async move {
                    tokio::time::sleep(delay).await;
                    Msg::PollDue { session }
                });
            }
            Effect::ArmDeadline { session, after } => {
                let token = self.session_token(session);
                self.spawn(token, async move {
                    tokio::time::sleep(after).await;
                    Msg::DeadlineExpired { session }
                });
            }
            Effect::CancelSession { session } => {
                if let Some(token) = self.sessions.remove(&session) {
                    research_debug!("Cancelling session {}", session);
                    token.cancel();
                }
            }
            Effect::FetchResult { completion } => {
                let api = self.api.clone();
                let token = self.reconciliation_token(completion.session);
                self.spawn(token, async move {
                    let result = api
                        .job_result(&completion.job_id)
                        .await
                        .map_err(|err| err.to_string());
                    Msg::ResultFetched { completion, result }
                });
            }
            Effect::ReloadHistory {
                completion,
                after,
                fallback,
            } => {
                let api = self.api.clone();
                let token = self.reconciliation_token(completion.session);
                self.spawn(token, async move {
                    tokio::time::sleep(after).await;
                    let outcome = api
                        .conversation_history(&completion.conversation_id)
                        .await
                        .map_err(|err| err.to_string());
                    Msg::HistoryLoaded {
                        completion,
                        outcome,
                        fallback,
                    }
                });
            }
            Effect::CancelReconciliation { session } => {
                if let Some(token) = self.reconciliations.remove(&session) {
                    research_debug!("Ending reconciliation of session {}", session);
                    token.cancel();
                }
            }
            Effect::RefreshConversations => {
                let api = self.api.clone();
                self.spawn(self.root.child_token(), async move {
                    let result = api
                        .list_conversations(None)
                        .await
                        .map_err(|err| err.to_string());
                    Msg::ConversationsRefreshed(result)
                });
            }
        }
    }

    fn session_token(&mut self, session: SessionId) -> CancellationToken {
        Self::scope_token(&self.root, &mut self.sessions, session)
    }

    fn reconciliation_token(&mut self, session: SessionId) -> CancellationToken {
        Self::scope_token(&self.root, &mut self.reconciliations, session)
    }

    fn scope_token(
        root: &CancellationToken,
        scopes: &mut HashMap<SessionId, CancellationToken>,
        session: SessionId,
    ) -> CancellationToken {
        scopes
            .entry(session)
            .or_insert_with(|| root.child_token())
            .clone()
    }

    fn spawn<F>(&self, token: CancellationToken, work: F)
    where
        F: Future<Output = Msg> + Send + 'static,
    {
        let msg_tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let msg = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                msg = work => msg,
            };
            let _ = msg_tx.send(msg);
        });
    }
}

impl Drop for EffectRunner {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
