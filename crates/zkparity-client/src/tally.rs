//! Tally reader

use std::sync::Arc;

use zkparity_runtime::{Parity, Result, Tally};

use crate::ledger::Ledger;

/// Read-only view of the two counters
pub struct TallyReader<L> {
    ledger: Arc<L>,
}

impl<L: Ledger> TallyReader<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    pub async fn read_tally(&self) -> Result<Tally> {
        let even = self.ledger.votes(Parity::Even.index()).await?;
        let odd = self.ledger.votes(Parity::Odd.index()).await?;
        Ok(Tally::new(even, odd))
    }
}
