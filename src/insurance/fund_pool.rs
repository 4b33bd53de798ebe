use log::warn;
use serde::{Deserialize, Serialize};

use crate::errors::{SuretyError, SuretyResult};
use crate::ledger::{AccountId, Amount};

/// The single liquidity pool shared by every airline and passenger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundPool {
    balance: Amount,
    total_deposited: Amount,
    total_paid_out: Amount,
}

impl FundPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn total_deposited(&self) -> Amount {
        self.total_deposited
    }

    pub fn total_paid_out(&self) -> Amount {
        self.total_paid_out
    }

    pub fn deposit(&mut self, amount: Amount) -> SuretyResult<()> {
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(SuretyError::ArithmeticOverflow)?;
        let total_deposited = self
            .total_deposited
            .checked_add(amount)
            .ok_or(SuretyError::ArithmeticOverflow)?;
        self.balance = balance;
        self.total_deposited = total_deposited;
        Ok(())
    }

    /// Pay `amount` out of the pool, or fail without touching it
    pub fn withdraw(&mut self, claimant: &AccountId, amount: Amount) -> SuretyResult<()> {
        let Some(balance) = self.balance.checked_sub(amount) else {
            warn!(
                "Withdrawal of {} by {} exceeds pool balance {}",
                amount, claimant, self.balance
            );
            return Err(SuretyError::InsufficientPool {
                owed: amount,
                available: self.balance,
            });
        };
        // Bounded by total_deposited, which already fit.
        self.total_paid_out = self
            .total_paid_out
            .checked_add(amount)
            .ok_or(SuretyError::ArithmeticOverflow)?;
        self.balance = balance;
        Ok(())
    }
}
