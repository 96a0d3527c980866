//! Telephony outlet port - Interface for frames sent back to the caller

use async_trait::async_trait;
use domain::TelephonyCommand;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Writing half of the caller's media stream connection
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TelephonyOutletPort: Send + Sync {
    /// Send one frame to the caller
    async fn send(&self, command: TelephonyCommand) -> Result<(), ApplicationError>;

    /// Close the caller's connection; closing twice is not an error
    async fn close(&self) -> Result<(), ApplicationError>;
}
