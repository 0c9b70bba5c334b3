//! Cancellation checkpoints.

use tokio_util::sync::CancellationToken;

use crate::error::Interrupted;

/// Poll `token` between units of work.
pub fn checkpoint(token: &CancellationToken) -> Result<(), Interrupted> {
    if token.is_cancelled() {
        Err(Interrupted)
    } else {
        Ok(())
    }
}
