//! Gain conservation and the receipt ledger.
//!
//! Gain is the one resource that lets a path out-argmax another, so every
//! operation that creates or moves it is receipted in an append-only ledger.
//!
//! # Conservation Law
//!
//! At every instant:
//!
//! ```text
//! Σ gain_pool + consumed == bootstrap_minted + Σ authorized_minted
//! ```
//!
//! Transfers are zero-sum and do not appear in the sum. [`GainLedger::audit`]
//! checks the law against the live pools; a failure is a programming defect,
//! not a recoverable condition.
//!
//! The ledger is owned by its network - explicit state with the network's
//! lifecycle, never a process-wide global.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gadget::GadgetId;

/// Why a receipt was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReceiptReason {
    /// One-time boot loader grant.
    Bootstrap,
    /// Runtime mint through a validated, authority-granted minter.
    Authorized { minter: GadgetId },
    /// Zero-sum move; the receipt's gadget is the receiving pool.
    Transfer { from: GadgetId },
    /// Amplification spend; permanently removed from circulation.
    Consumed,
}

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GainReceipt {
    /// Position in the ledger, starting at 0.
    pub sequence: u64,
    /// The pool the operation applied to.
    pub gadget: GadgetId,
    pub amount: u64,
    pub reason: ReceiptReason,
    /// Logical timestamp: the network step at which the operation committed.
    pub at: u64,
}

/// Illegal gain operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("bootstrap mint already performed")]
    BootstrapAlreadyDone,
    #[error("gadget {minter:?} holds no mint authority for {target:?}")]
    NotAuthorized { minter: GadgetId, target: GadgetId },
    #[error("gadget {gadget:?} holds {have} gain, needs {need}")]
    InsufficientGain {
        gadget: GadgetId,
        have: u64,
        need: u64,
    },
}

/// Detected violation of the conservation law.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("conservation violated: pools {pools} + consumed {consumed} != minted {minted}")]
pub struct ConservationViolation {
    pub pools: u64,
    pub consumed: u64,
    pub minted: u64,
}

/// Append-only record of every gain-creating or gain-moving operation,
/// plus the mint-authority table.
#[derive(Debug, Default)]
pub struct GainLedger {
    receipts: Vec<GainReceipt>,
    bootstrap_done: bool,
    bootstrap_minted: u64,
    authorized_minted: u64,
    consumed: u64,
    /// (minter, target) pairs allowed to mint.
    authority: Vec<(GadgetId, GadgetId)>,
}

impl GainLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full ordered history.
    pub fn receipts(&self) -> &[GainReceipt] {
        &self.receipts
    }

    pub fn bootstrap_minted(&self) -> u64 {
        self.bootstrap_minted
    }

    pub fn authorized_minted(&self) -> u64 {
        self.authorized_minted
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Mark the one-time bootstrap window open. Fails on the second call.
    pub fn begin_bootstrap(&mut self) -> Result<(), LedgerError> {
        if self.bootstrap_done {
            return Err(LedgerError::BootstrapAlreadyDone);
        }
        self.bootstrap_done = true;
        Ok(())
    }

    /// Record one bootstrap grant. Only callable inside the window opened by
    /// [`Self::begin_bootstrap`] - the network enforces that pairing.
    pub fn record_bootstrap(&mut self, gadget: GadgetId, amount: u64, at: u64) {
        self.bootstrap_minted += amount;
        self.push(gadget, amount, ReceiptReason::Bootstrap, at);
    }

    /// Grant `minter` the authority to mint into `target`'s pool.
    pub fn grant_authority(&mut self, minter: GadgetId, target: GadgetId) {
        if !self.is_authorized(minter, target) {
            self.authority.push((minter, target));
        }
    }

    pub fn is_authorized(&self, minter: GadgetId, target: GadgetId) -> bool {
        self.authority.contains(&(minter, target))
    }

    /// Targets `minter` may mint into, in grant order.
    pub fn targets_of(&self, minter: GadgetId) -> impl Iterator<Item = GadgetId> + '_ {
        self.authority
            .iter()
            .filter(move |(m, _)| *m == minter)
            .map(|(_, t)| *t)
    }

    /// Record an authorized mint. The caller has already checked authority
    /// and the validator signal.
    pub fn record_authorized(&mut self, minter: GadgetId, target: GadgetId, amount: u64, at: u64) {
        self.authorized_minted += amount;
        self.push(target, amount, ReceiptReason::Authorized { minter }, at);
    }

    /// Record a zero-sum transfer into `to`.
    pub fn record_transfer(&mut self, from: GadgetId, to: GadgetId, amount: u64, at: u64) {
        self.push(to, amount, ReceiptReason::Transfer { from }, at);
    }

    /// Record an amplification spend from `gadget`'s own pool.
    pub fn record_consume(&mut self, gadget: GadgetId, amount: u64, at: u64) {
        self.consumed += amount;
        self.push(gadget, amount, ReceiptReason::Consumed, at);
    }

    /// Check the conservation law against the live pool totals.
    pub fn audit<I>(&self, pools: I) -> Result<(), ConservationViolation>
    where
        I: IntoIterator<Item = u64>,
    {
        let pools: u64 = pools.into_iter().sum();
        let minted = self.bootstrap_minted + self.authorized_minted;
        if pools + self.consumed == minted {
            Ok(())
        } else {
            Err(ConservationViolation {
                pools,
                consumed: self.consumed,
                minted,
            })
        }
    }

    fn push(&mut self, gadget: GadgetId, amount: u64, reason: ReceiptReason, at: u64) {
        let sequence = self.receipts.len() as u64;
        self.receipts.push(GainReceipt {
            sequence,
            gadget,
            amount,
            reason,
            at,
        });
    }
}
