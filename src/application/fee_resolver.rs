use crate::domain::fees::{FeeKind, FeeSchedule};
use crate::domain::money::Amount;
use crate::domain::ports::FeeSource;
use crate::error::{Result, WalletError};
use tracing::{debug, warn};

/// Resolves fee schedules, refusing to fall back to zero on failure.
pub struct FeeResolver<'a, S: FeeSource + ?Sized> {
    source: &'a S,
    reference: Amount,
}

impl<'a, S: FeeSource + ?Sized> FeeResolver<'a, S> {
    pub fn new(source: &'a S, reference: Amount) -> Self {
        Self { source, reference }
    }

    /// Fetches the schedule for `kind`.
    ///
    /// Any failure becomes [`WalletError::FeeScheduleUnavailable`] so that a
    /// checkout can never proceed with fees it does not know.
    pub async fn resolve(&self, kind: FeeKind) -> Result<FeeSchedule> {
        match self.source.fee_schedule(kind, self.reference).await {
            Ok(schedule) => {
                debug!(%kind, fee = %schedule.fee, commission = %schedule.commission, "fee schedule resolved");
                Ok(schedule)
            }
            Err(WalletError::FeeScheduleUnavailable(reason)) => {
                warn!(%kind, %reason, "fee schedule unavailable");
                Err(WalletError::FeeScheduleUnavailable(reason))
            }
            Err(e) => {
                warn!(%kind, error = %e, "fee schedule request failed");
                Err(WalletError::FeeScheduleUnavailable(e.user_message()))
            }
        }
    }
}
