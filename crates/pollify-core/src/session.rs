//! The interaction session: one mutable handle a UI drives.
//!
//! `PollSession` owns everything a poll screen needs: the connection, an
//! optional signer, the last-read chain state, and the lifecycle of the
//! in-flight submission. State only moves through `&mut self` methods, and
//! every visible effect of a write comes from re-reading the chain after
//! confirmation, never from local guessing.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use sol_rpc::LedgerRpc;

use crate::client::{readonly_client, signer_client, ReadonlyClient, SignerClient, WalletSigner};
use crate::datetime::parse_datetime_local;
use crate::error::CoreError;
use crate::program::{Poll, MAX_DESCRIPTION_LEN};
use crate::reader::{read_all_polls, read_counter, CounterState};
use crate::submit;

/// Where the session is in its load cycle.
///
/// `Loading` only before the first completed [`PollSession::refresh`]; every
/// outcome after that, including a failed read, resolves to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    Loading,
    Ready { initialized: bool },
}

/// Lifecycle of the most recent submission, exposed as data.
///
/// A UI renders this directly; nothing here is tied to a notification
/// mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SubmitStatus {
    Idle,
    Pending,
    Succeeded { signature: String },
    Failed { message: String },
}

/// A live poll screen's state and operations.
pub struct PollSession {
    rpc: Arc<dyn LedgerRpc>,
    reader: ReadonlyClient,
    signer: Option<SignerClient>,
    phase: SessionPhase,
    counter: CounterState,
    polls: Vec<Poll>,
    submit_status: SubmitStatus,
    closed: bool,
}

impl PollSession {
    /// A fresh session on `rpc`, not yet refreshed and with no wallet.
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        let reader = readonly_client(rpc.clone());
        Self {
            rpc,
            reader,
            signer: None,
            phase: SessionPhase::Loading,
            counter: CounterState::Uninitialized,
            polls: Vec::new(),
            submit_status: SubmitStatus::Idle,
            closed: false,
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn counter(&self) -> CounterState {
        self.counter
    }

    /// Polls from the last successful refresh, ascending by id.
    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    pub fn submit_status(&self) -> &SubmitStatus {
        &self.submit_status
    }

    /// The id the next created poll will receive, once initialized.
    pub fn next_poll_id(&self) -> Option<u64> {
        self.counter.count()
    }

    pub fn can_initialize(&self) -> bool {
        !self.closed
            && self.signer.is_some()
            && matches!(self.phase, SessionPhase::Ready { initialized: false })
    }

    pub fn can_create_poll(&self) -> bool {
        !self.closed
            && self.signer.is_some()
            && matches!(self.phase, SessionPhase::Ready { initialized: true })
    }

    // -- wallet and lifetime ------------------------------------------------

    /// Attach or detach a wallet. Chain state is unaffected; only write
    /// eligibility changes.
    pub fn set_wallet(&mut self, wallet: Option<Arc<dyn WalletSigner>>) {
        self.signer = signer_client(self.rpc.clone(), wallet);
    }

    /// Fence the session. Every later refresh or submit call returns without
    /// touching state or the network. In-flight requests are not cancelled,
    /// their results are dropped at the next await boundary.
    pub fn close(&mut self) {
        self.closed = true;
    }

    // -- reads --------------------------------------------------------------

    /// Re-read the counter and the poll listing, concurrently.
    ///
    /// A failed counter read still resolves the phase to
    /// `Ready { initialized: false }` so a UI never hangs in `Loading`; the
    /// previous poll listing is kept on any failure.
    pub async fn refresh(&mut self) -> Result<(), CoreError> {
        if self.closed {
            return Ok(());
        }

        let (counter, polls) = tokio::join!(
            read_counter(&self.reader),
            read_all_polls(&self.reader)
        );

        if self.closed {
            return Ok(());
        }

        match counter {
            Ok(state) => {
                self.counter = state;
                self.phase = SessionPhase::Ready {
                    initialized: state.is_initialized(),
                };
            }
            Err(err) => {
                warn!(%err, "counter read failed");
                self.counter = CounterState::Uninitialized;
                self.phase = SessionPhase::Ready { initialized: false };
                return Err(err);
            }
        }

        match polls {
            Ok(mut list) => {
                list.sort_by_key(|poll| poll.id);
                self.polls = list;
            }
            Err(err) => {
                warn!(%err, "poll listing failed");
                return Err(err);
            }
        }

        Ok(())
    }

    // -- writes -------------------------------------------------------------

    /// Submit the one-time program initialization.
    ///
    /// Requires a wallet and `Ready { initialized: false }`. On success the
    /// session re-reads chain state before returning.
    pub async fn initialize_program(&mut self) -> Result<(), CoreError> {
        if self.closed {
            return Ok(());
        }
        let Some(client) = self.signer.clone() else {
            return Err(self.fail(CoreError::NoSigner));
        };
        match self.phase {
            SessionPhase::Ready { initialized: false } => {}
            SessionPhase::Loading => {
                return Err(self.fail(CoreError::Validation("Session not ready".into())));
            }
            SessionPhase::Ready { initialized: true } => {
                return Err(self.fail(CoreError::Validation(
                    "Program is already initialized".into(),
                )));
            }
        }

        self.submit_status = SubmitStatus::Pending;
        let result = submit::initialize(&client).await;
        self.finish_submit(result).await
    }

    /// Validate inputs, pick the next id from a fresh counter read, and
    /// submit a poll creation.
    ///
    /// Validation failures never touch the network. The id check is the
    /// ledger program's; losing a creation race surfaces as a failed status,
    /// and the follow-up refresh gives the retry a fresh counter.
    pub async fn create_poll(
        &mut self,
        description: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<(), CoreError> {
        if self.closed {
            return Ok(());
        }
        let Some(client) = self.signer.clone() else {
            return Err(self.fail(CoreError::NoSigner));
        };
        match self.phase {
            SessionPhase::Ready { initialized: true } => {}
            SessionPhase::Loading => {
                return Err(self.fail(CoreError::Validation("Session not ready".into())));
            }
            SessionPhase::Ready { initialized: false } => {
                return Err(self.fail(CoreError::Validation(
                    "Please initialize the program first".into(),
                )));
            }
        }

        let description = description.trim();
        if description.is_empty() {
            return Err(self.fail(CoreError::Validation("Please enter a description".into())));
        }
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(self.fail(CoreError::Validation("Description is too long".into())));
        }
        let start = match parse_datetime_local(start_date) {
            Ok(seconds) => seconds,
            Err(err) => return Err(self.fail(err)),
        };
        let end = match parse_datetime_local(end_date) {
            Ok(seconds) => seconds,
            Err(err) => return Err(self.fail(err)),
        };
        if start >= end {
            return Err(self.fail(CoreError::Validation(
                "End date must be after start date".into(),
            )));
        }

        self.submit_status = SubmitStatus::Pending;

        // The id is whatever the counter says right now; the session's own
        // snapshot may be stale.
        let id = match read_counter(&self.reader).await {
            Ok(CounterState::Initialized { count }) => count,
            Ok(CounterState::Uninitialized) => {
                let err = CoreError::Rejected("counter account is missing".into());
                if self.closed {
                    return Ok(());
                }
                return Err(self.fail(err));
            }
            Err(err) => {
                if self.closed {
                    return Ok(());
                }
                return Err(self.fail(err));
            }
        };

        let result = submit::create_poll(&client, id, description, start, end).await;
        self.finish_submit(result).await
    }

    /// Drop a settled status back to `Idle`, for a UI dismissing its surface.
    pub fn reset_submit_status(&mut self) {
        self.submit_status = SubmitStatus::Idle;
    }

    // -- internals ----------------------------------------------------------

    fn fail(&mut self, err: CoreError) -> CoreError {
        self.submit_status = SubmitStatus::Failed {
            message: err.user_message(),
        };
        err
    }

    /// Record a submission outcome and re-read chain state where it matters.
    ///
    /// A rejection also refreshes: the usual cause is a stale counter, and
    /// the retry needs the fresh one.
    async fn finish_submit(&mut self, result: Result<String, CoreError>) -> Result<(), CoreError> {
        if self.closed {
            return Ok(());
        }
        match result {
            Ok(signature) => {
                self.submit_status = SubmitStatus::Succeeded { signature };
                if let Err(err) = self.refresh().await {
                    warn!(%err, "refresh after submission failed");
                }
                Ok(())
            }
            Err(err) => {
                self.submit_status = SubmitStatus::Failed {
                    message: err.user_message(),
                };
                if matches!(err, CoreError::Rejected(_)) {
                    if let Err(refresh_err) = self.refresh().await {
                        warn!(err = %refresh_err, "refresh after rejection failed");
                    }
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LocalWallet;
    use crate::datetime::parse_datetime_local;
    use crate::mock_ledger::MockLedger;
    use crate::reader::read_poll;

    const START: &str = "2026-03-01T10:00";
    const END: &str = "2026-03-02T10:00";

    fn session_for(ledger: &Arc<MockLedger>) -> PollSession {
        PollSession::new(ledger.clone())
    }

    fn wallet(seed: u8) -> Arc<LocalWallet> {
        Arc::new(LocalWallet::from_seed([seed; 32]))
    }

    fn poll(id: u64, description: &str) -> Poll {
        Poll {
            id,
            description: description.to_string(),
            start: 1_000,
            end: 2_000,
            candidate_count: 0,
            owner: [0x55; 32],
        }
    }

    // -- phases -------------------------------------------------------------

    #[tokio::test]
    async fn fresh_session_is_loading_and_idle() {
        let ledger = Arc::new(MockLedger::new());
        let session = session_for(&ledger);

        assert_eq!(session.phase(), SessionPhase::Loading);
        assert_eq!(session.submit_status(), &SubmitStatus::Idle);
        assert!(session.polls().is_empty());
        assert_eq!(session.next_poll_id(), None);
        assert!(!session.can_initialize());
        assert!(!session.can_create_poll());
    }

    #[tokio::test]
    async fn refresh_without_counter_resolves_uninitialized() {
        let ledger = Arc::new(MockLedger::new());
        let mut session = session_for(&ledger);

        session.refresh().await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Ready { initialized: false });
        assert_eq!(session.counter(), CounterState::Uninitialized);
    }

    #[tokio::test]
    async fn refresh_sorts_polls_by_id() {
        let ledger = Arc::new(MockLedger::new());
        ledger.seed_counter(3).await;
        ledger.seed_poll(&poll(2, "third")).await;
        ledger.seed_poll(&poll(0, "first")).await;
        ledger.seed_poll(&poll(1, "second")).await;

        let mut session = session_for(&ledger);
        session.refresh().await.unwrap();

        assert_eq!(session.phase(), SessionPhase::Ready { initialized: true });
        assert_eq!(session.next_poll_id(), Some(3));
        let ids: Vec<u64> = session.polls().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn failed_counter_read_resolves_to_uninitialized() {
        let ledger = Arc::new(MockLedger::new());
        ledger.seed_counter(1).await;
        ledger.seed_poll(&poll(0, "kept")).await;

        let mut session = session_for(&ledger);
        session.refresh().await.unwrap();
        assert_eq!(session.polls().len(), 1);

        // Corrupt the counter in place; the next refresh fails but resolves.
        ledger
            .seed_account(crate::program::counter_pda().unwrap(), vec![0xFF])
            .await;
        let err = session.refresh().await.unwrap_err();
        assert!(matches!(err, CoreError::Decode(_)));
        assert_eq!(session.phase(), SessionPhase::Ready { initialized: false });
        assert_eq!(session.polls().len(), 1, "stale polls are kept");
    }

    // -- initialize ---------------------------------------------------------

    #[tokio::test]
    async fn initialize_flow_drives_phases() {
        let ledger = Arc::new(MockLedger::new());
        let mut session = session_for(&ledger);

        session.refresh().await.unwrap();
        assert!(!session.can_initialize(), "no wallet yet");

        session.set_wallet(Some(wallet(7)));
        assert!(session.can_initialize());

        session.initialize_program().await.unwrap();
        assert!(matches!(
            session.submit_status(),
            SubmitStatus::Succeeded { signature } if !signature.is_empty()
        ));
        assert_eq!(session.phase(), SessionPhase::Ready { initialized: true });
        assert_eq!(session.counter(), CounterState::Initialized { count: 0 });
        assert_eq!(session.next_poll_id(), Some(0));
        assert!(session.can_create_poll());
        assert!(!session.can_initialize());
    }

    #[tokio::test]
    async fn initialize_without_wallet_fails_without_traffic() {
        let ledger = Arc::new(MockLedger::new());
        let mut session = session_for(&ledger);
        session.refresh().await.unwrap();

        let baseline = ledger.request_count().await;
        let err = session.initialize_program().await.unwrap_err();

        assert!(matches!(err, CoreError::NoSigner));
        assert_eq!(
            session.submit_status(),
            &SubmitStatus::Failed {
                message: "Please connect your wallet first".into()
            }
        );
        assert_eq!(ledger.request_count().await, baseline);
    }

    #[tokio::test]
    async fn initialize_while_loading_is_a_validation_error() {
        let ledger = Arc::new(MockLedger::new());
        let mut session = session_for(&ledger);
        session.set_wallet(Some(wallet(7)));

        let err = session.initialize_program().await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(ledger.request_count().await, 0);
    }

    #[tokio::test]
    async fn second_initialize_is_guarded_locally() {
        let ledger = Arc::new(MockLedger::new());
        let mut session = session_for(&ledger);
        session.refresh().await.unwrap();
        session.set_wallet(Some(wallet(7)));
        session.initialize_program().await.unwrap();

        let baseline = ledger.request_count().await;
        let err = session.initialize_program().await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(ledger.request_count().await, baseline);
    }

    #[tokio::test]
    async fn losing_the_initialize_race_resyncs_the_loser() {
        let ledger = Arc::new(MockLedger::new());

        let mut winner = session_for(&ledger);
        winner.refresh().await.unwrap();
        winner.set_wallet(Some(wallet(1)));

        let mut loser = session_for(&ledger);
        loser.refresh().await.unwrap();
        loser.set_wallet(Some(wallet(2)));

        winner.initialize_program().await.unwrap();

        // The loser still believes the program is uninitialized; the ledger
        // rejects, and the follow-up refresh corrects the belief.
        let err = loser.initialize_program().await.unwrap_err();
        assert!(matches!(err, CoreError::Rejected(_)));
        assert_eq!(
            loser.submit_status(),
            &SubmitStatus::Failed {
                message: "The program rejected the transaction, refresh and retry".into()
            }
        );
        assert_eq!(loser.phase(), SessionPhase::Ready { initialized: true });
    }

    // -- create_poll --------------------------------------------------------

    async fn initialized_session(ledger: &Arc<MockLedger>, seed: u8) -> PollSession {
        let mut session = session_for(ledger);
        session.refresh().await.unwrap();
        session.set_wallet(Some(wallet(seed)));
        session.initialize_program().await.unwrap();
        session
    }

    #[tokio::test]
    async fn create_poll_full_flow() {
        let ledger = Arc::new(MockLedger::new());
        let mut session = initialized_session(&ledger, 7).await;

        session
            .create_poll("  Favorite color  ", START, END)
            .await
            .unwrap();

        assert!(matches!(
            session.submit_status(),
            SubmitStatus::Succeeded { .. }
        ));
        assert_eq!(session.counter(), CounterState::Initialized { count: 1 });
        assert_eq!(session.next_poll_id(), Some(1));

        let polls = session.polls();
        assert_eq!(polls.len(), 1);
        assert_eq!(polls[0].id, 0);
        assert_eq!(polls[0].description, "Favorite color", "input is trimmed");
        assert_eq!(polls[0].start, parse_datetime_local(START).unwrap());
        assert_eq!(polls[0].end, parse_datetime_local(END).unwrap());
        assert_eq!(polls[0].owner, wallet(7).public_key());
    }

    #[tokio::test]
    async fn create_poll_validation_failures_send_nothing() {
        let ledger = Arc::new(MockLedger::new());
        let mut session = initialized_session(&ledger, 7).await;
        let baseline = ledger.request_count().await;

        let cases: &[(&str, &str, &str)] = &[
            ("   ", START, END),
            ("ok", "yesterday", END),
            ("ok", START, "2026-13-01T00:00"),
            ("ok", END, START),
            ("ok", START, START),
        ];
        for (description, start, end) in cases {
            let err = session
                .create_poll(description, start, end)
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)), "{description:?}");
        }

        let long = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        let err = session.create_poll(&long, START, END).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        assert_eq!(ledger.request_count().await, baseline);
        assert!(matches!(session.submit_status(), SubmitStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn create_poll_before_initialize_is_guarded() {
        let ledger = Arc::new(MockLedger::new());
        let mut session = session_for(&ledger);
        session.refresh().await.unwrap();
        session.set_wallet(Some(wallet(7)));

        let baseline = ledger.request_count().await;
        let err = session.create_poll("ok", START, END).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(ledger.request_count().await, baseline);
    }

    #[tokio::test]
    async fn stale_session_still_gets_a_fresh_id() {
        let ledger = Arc::new(MockLedger::new());
        let mut first = initialized_session(&ledger, 1).await;

        let mut second = session_for(&ledger);
        second.refresh().await.unwrap();
        second.set_wallet(Some(wallet(2)));
        assert_eq!(second.next_poll_id(), Some(0));

        first.create_poll("First", START, END).await.unwrap();

        // The second session's snapshot still says 0, but the submission
        // re-reads the counter and takes id 1.
        second.create_poll("Second", START, END).await.unwrap();

        let reader = readonly_client(ledger);
        let created = read_poll(&reader, 1).await.unwrap().unwrap();
        assert_eq!(created.description, "Second");
        assert_eq!(created.owner, wallet(2).public_key());
    }

    // -- close --------------------------------------------------------------

    #[tokio::test]
    async fn close_fences_refresh_and_submits() {
        let ledger = Arc::new(MockLedger::new());
        let mut session = session_for(&ledger);
        session.refresh().await.unwrap();
        session.set_wallet(Some(wallet(7)));
        session.close();

        let baseline = ledger.request_count().await;

        session.refresh().await.unwrap();
        session.initialize_program().await.unwrap();
        session.create_poll("ok", START, END).await.unwrap();

        assert_eq!(ledger.request_count().await, baseline);
        assert_eq!(session.submit_status(), &SubmitStatus::Idle);
        assert!(!session.can_initialize());
        assert!(!session.can_create_poll());
    }

    // -- wallet and status --------------------------------------------------

    #[tokio::test]
    async fn detaching_the_wallet_disables_writes() {
        let ledger = Arc::new(MockLedger::new());
        let mut session = session_for(&ledger);
        session.refresh().await.unwrap();

        session.set_wallet(Some(wallet(7)));
        assert!(session.can_initialize());

        session.set_wallet(None);
        assert!(!session.can_initialize());
        let err = session.initialize_program().await.unwrap_err();
        assert!(matches!(err, CoreError::NoSigner));
    }

    #[tokio::test]
    async fn reset_returns_a_settled_status_to_idle() {
        let ledger = Arc::new(MockLedger::new());
        let mut session = session_for(&ledger);
        session.refresh().await.unwrap();

        let _ = session.initialize_program().await;
        assert!(matches!(session.submit_status(), SubmitStatus::Failed { .. }));

        session.reset_submit_status();
        assert_eq!(session.submit_status(), &SubmitStatus::Idle);
    }
}
