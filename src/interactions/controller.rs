use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::state::{CountDelta, InteractionCounts, InteractionKind, InteractionState};
use crate::db::models::CompanionRecord;
use crate::notice::Notice;
use crate::session::SessionContext;
use crate::store::{CatalogStore, StoreError};

/// Called after a write has been accepted, typically to re-fetch the list.
pub type RefreshCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Error, Debug)]
pub enum InteractionError {
    #[error("Sign in required")]
    SignInRequired,
    #[error("An interaction for this companion is already being saved")]
    Busy,
    #[error("Failed to update interaction: {0}")]
    WriteFailed(#[source] StoreError),
}

impl InteractionError {
    /// What the user should see. `Busy` is silent.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            InteractionError::SignInRequired => Some(Notice::sign_in_required()),
            InteractionError::Busy => None,
            InteractionError::WriteFailed(_) => Some(Notice::failure("Failed to update interaction")),
        }
    }
}

/// Flags and counters as the card currently displays them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CardState {
    pub interaction: InteractionState,
    pub counts: InteractionCounts,
}

impl From<&CompanionRecord> for CardState {
    fn from(record: &CompanionRecord) -> Self {
        Self {
            interaction: record.user_interaction.unwrap_or_default().normalized(),
            counts: InteractionCounts::from(&record.companion),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
}

/// Optimistic like/dislike/star state machine for one companion card.
///
/// A toggle is applied locally first, then written through the store as one
/// upsert of the full triple. A successful write replaces the optimistic
/// counters with the ones the store reports; a failed write restores the
/// previous flags and counters. While a write is pending, further toggles are
/// rejected.
pub struct InteractionController {
    companion_id: String,
    store: Arc<dyn CatalogStore>,
    session: SessionContext,
    card: Mutex<CardState>,
    in_flight: AtomicBool,
    on_refresh: Option<RefreshCallback>,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl InteractionController {
    pub fn new(record: &CompanionRecord, store: Arc<dyn CatalogStore>, session: SessionContext) -> Self {
        Self {
            companion_id: record.companion.id.clone(),
            store,
            session,
            card: Mutex::new(CardState::from(record)),
            in_flight: AtomicBool::new(false),
            on_refresh: None,
        }
    }

    pub fn with_refresh(mut self, on_refresh: RefreshCallback) -> Self {
        self.on_refresh = Some(on_refresh);
        self
    }

    pub fn companion_id(&self) -> &str {
        &self.companion_id
    }

    pub fn phase(&self) -> Phase {
        if self.in_flight.load(Ordering::Acquire) {
            Phase::Pending
        } else {
            Phase::Idle
        }
    }

    pub async fn snapshot(&self) -> CardState {
        *self.card.lock().await
    }

    /// Adopts the values of a freshly loaded record, e.g. after a refresh.
    pub async fn sync_from(&self, record: &CompanionRecord) {
        *self.card.lock().await = CardState::from(record);
    }

    pub async fn toggle(&self, kind: InteractionKind) -> Result<CardState, InteractionError> {
        let Some(session) = self.session.current() else {
            info!(companion_id = %self.companion_id, %kind, "Interaction rejected: no signed-in viewer.");
            return Err(InteractionError::SignInRequired);
        };

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(companion_id = %self.companion_id, %kind, "Interaction ignored: write still pending.");
            return Err(InteractionError::Busy);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let (previous, optimistic) = {
            let mut card = self.card.lock().await;
            let previous = *card;
            let interaction = previous.interaction.toggled(kind);
            let delta = CountDelta::between(previous.interaction, interaction);
            *card = CardState {
                interaction,
                counts: previous.counts.apply(delta),
            };
            (previous, *card)
        };

        match self
            .store
            .upsert_interaction(session.user_id(), &self.companion_id, optimistic.interaction)
            .await
        {
            Ok(counts) => {
                let saved = {
                    let mut card = self.card.lock().await;
                    card.counts = counts;
                    *card
                };
                debug!(companion_id = %self.companion_id, %kind, ?counts, "Interaction saved.");
                if let Some(on_refresh) = &self.on_refresh {
                    on_refresh();
                }
                Ok(saved)
            }
            Err(e) => {
                error!(
                    companion_id = %self.companion_id,
                    user_id = %session.user_id(),
                    %kind,
                    error = %e,
                    "Failed to save interaction. Rolling back."
                );
                *self.card.lock().await = previous;
                Err(InteractionError::WriteFailed(e))
            }
        }
    }
}
