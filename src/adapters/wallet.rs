//! Local wallet: a single configured account that can be connected and disconnected.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::Address;
use crate::ports::Wallet;

/// Wallet holding one account, disconnected until `connect()` is called.
#[derive(Debug)]
pub struct LocalWallet {
    account: Address,
    connected: AtomicBool,
}

impl LocalWallet {
    #[must_use]
    pub fn new(account: Address) -> Self {
        Self {
            account,
            connected: AtomicBool::new(false),
        }
    }
}

impl Wallet for LocalWallet {
    fn account(&self) -> Option<Address> {
        self.connected
            .load(Ordering::SeqCst)
            .then_some(self.account)
    }

    fn connect(&self) {
        if !self.connected.swap(true, Ordering::SeqCst) {
            tracing::info!("Wallet connected: {}", self.account);
        }
    }

    fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::info!("Wallet disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_cycle() {
        let wallet = LocalWallet::new(Address::derive(b"alice"));
        assert!(!wallet.is_connected());
        assert!(wallet.account().is_none());

        wallet.connect();
        assert_eq!(wallet.account(), Some(Address::derive(b"alice")));

        wallet.disconnect();
        assert!(!wallet.is_connected());
    }
}
