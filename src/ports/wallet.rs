//! Wallet port: connection status and the active account.

use crate::domain::Address;

/// Trait for the wallet/account provider.
pub trait Wallet: Send + Sync {
    /// Active account, if connected.
    fn account(&self) -> Option<Address>;

    /// Whether a wallet is connected.
    fn is_connected(&self) -> bool {
        self.account().is_some()
    }

    /// Request a connection.
    fn connect(&self);

    /// Drop the connection.
    fn disconnect(&self);
}
