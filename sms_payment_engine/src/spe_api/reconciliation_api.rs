use std::{fmt::Debug, future::Future};

use log::*;

use crate::{
    config::{EngineConfig, DEFAULT_MAX_CLAIM_ATTEMPTS},
    db_types::{Amount, Order, OrderId, Provider, Transaction},
    events::{EventProducers, OrderPaidEvent, TransactionProcessedEvent},
    sms::{ExtractionOutcome, MessageExtractor, ParsedTransaction},
    spe_api::reconciliation_objects::{IngestOutcome, MatchResult, OrderSummary},
    traits::{ClaimResult, ReconciliationDatabase, ReconciliationError},
};

/// The result of a single claim attempt on the oldest candidate order.
enum Attempt<T> {
    Won(T),
    Lost,
    Duplicate,
}

enum MatcherOutcome<T> {
    Claimed(T),
    NoCandidate,
    /// The same candidate was lost to a concurrent matcher `max_claim_attempts` times in a row
    Exhausted,
    Duplicate,
}

/// `ReconciliationApi` is the primary API for turning inbound payment notifications into paid orders.
///
/// It is cheap to clone when the backend is, and can be shared between tasks. All concurrency control happens in the
/// database backend.
#[derive(Clone)]
pub struct ReconciliationApi<B> {
    db: B,
    extractor: MessageExtractor,
    max_claim_attempts: u32,
    producers: EventProducers,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi (max claim attempts: {})", self.max_claim_attempts)
    }
}

impl<B> ReconciliationApi<B> {
    /// Creates an API with the default sender whitelist, no content fallback, and the default retry budget.
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, extractor: MessageExtractor::default(), max_claim_attempts: DEFAULT_MAX_CLAIM_ATTEMPTS, producers }
    }

    pub fn from_config(db: B, config: &EngineConfig, producers: EventProducers) -> Self {
        Self::new(db, producers).with_extractor(config.extractor()).with_max_claim_attempts(config.max_claim_attempts)
    }

    pub fn with_extractor(mut self, extractor: MessageExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_max_claim_attempts(mut self, attempts: u32) -> Self {
        self.max_claim_attempts = attempts.max(1);
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn extractor(&self) -> &MessageExtractor {
        &self.extractor
    }

    /// Reads a transaction from `raw_message`. This does not touch the database.
    pub fn extract(&self, raw_message: &str, sender: &str) -> Option<ParsedTransaction> {
        self.extractor.extract(raw_message, sender)
    }

    pub fn classify(&self, raw_message: &str, sender: &str) -> ExtractionOutcome {
        self.extractor.classify(raw_message, sender)
    }
}

impl<B> ReconciliationApi<B>
where B: ReconciliationDatabase
{
    /// Finds the oldest pending order for exactly `amount` via `provider`, and marks it as paid by `transaction_id`.
    ///
    /// This call does not record a transaction. Callers that ingest messages should use [`Self::process_message`],
    /// which also guards against duplicate delivery.
    pub async fn match_payment(
        &self,
        transaction_id: &str,
        amount: Amount,
        provider: Provider,
    ) -> Result<MatchResult, ReconciliationError> {
        let outcome = self
            .claim_oldest(transaction_id, amount, provider, move |order_id| async move {
                match self.db.claim_order(&order_id, transaction_id).await {
                    Ok(claimed) => Ok(claimed.map(Attempt::Won).unwrap_or(Attempt::Lost)),
                    Err(ReconciliationError::TransactionAlreadyExists(_)) => Ok(Attempt::Duplicate),
                    Err(e) => Err(e),
                }
            })
            .await?;
        match outcome {
            MatcherOutcome::Claimed(order) => {
                self.call_order_paid_hook(&order).await;
                Ok(MatchResult::matched(&order))
            },
            MatcherOutcome::Duplicate => {
                info!("🔄️💰️ Transaction {transaction_id} has already paid for an order. It cannot pay for another.");
                Ok(MatchResult::unmatched())
            },
            MatcherOutcome::NoCandidate | MatcherOutcome::Exhausted => Ok(MatchResult::unmatched()),
        }
    }

    /// Ingests one raw payment notification.
    ///
    /// The message is read, checked against previously recorded transactions, matched to the oldest eligible pending
    /// order, and recorded. Events are published for every recorded transaction, and for every paid order.
    ///
    /// Rejected, unreadable and duplicate messages write nothing and are reported through [`IngestOutcome`]. Only
    /// storage failures produce an error.
    pub async fn process_message(
        &self,
        raw_message: &str,
        sender: &str,
    ) -> Result<IngestOutcome, ReconciliationError> {
        let parsed = match self.extractor.classify(raw_message, sender) {
            ExtractionOutcome::Rejected => {
                debug!("🔄️📩️ Message from '{sender}' rejected");
                return Ok(IngestOutcome::Rejected);
            },
            ExtractionOutcome::Unparseable(p) => {
                info!("🔄️📩️ Could not read a transaction from a {} message from '{sender}'", p.provider);
                return Ok(IngestOutcome::ExtractionFailed { provider: p.provider });
            },
            ExtractionOutcome::Extracted(p) => p,
        };
        let txid = parsed.transaction_id.clone();
        if let Some(transaction) = self.db.fetch_transaction(&txid).await? {
            info!("🔄️📩️ Transaction {txid} has already been processed. Ignoring duplicate.");
            return Ok(IngestOutcome::Duplicate { transaction });
        }
        let (amount, provider) = (parsed.amount, parsed.provider);
        let new_transaction = parsed.into_new_transaction(sender);
        let template = &new_transaction;
        let outcome = self
            .claim_oldest(&txid, amount, provider, move |order_id| {
                let transaction = template.clone();
                async move {
                    let attempt = match self.db.claim_order_for_transaction(&order_id, transaction).await? {
                        ClaimResult::Claimed { order, transaction } => Attempt::Won((order, transaction)),
                        ClaimResult::Lost => Attempt::Lost,
                        ClaimResult::Duplicate => Attempt::Duplicate,
                    };
                    Ok::<_, ReconciliationError>(attempt)
                }
            })
            .await?;
        let (transaction, order) = match outcome {
            MatcherOutcome::Claimed((order, transaction)) => (transaction, Some(order)),
            MatcherOutcome::Duplicate => return self.duplicate_of(&txid).await,
            MatcherOutcome::NoCandidate | MatcherOutcome::Exhausted => {
                match self.db.insert_transaction(new_transaction).await {
                    Ok(transaction) => (transaction, None),
                    Err(ReconciliationError::TransactionAlreadyExists(_)) => return self.duplicate_of(&txid).await,
                    Err(e) => return Err(e),
                }
            },
        };
        let match_result = match &order {
            Some(order) => {
                self.call_order_paid_hook(order).await;
                MatchResult::matched(order)
            },
            None => MatchResult::unmatched(),
        };
        self.call_transaction_processed_hook(&transaction, order.as_ref().map(OrderSummary::from)).await;
        debug!("🔄️📩️ Transaction {txid} processed. {match_result}");
        Ok(IngestOutcome::Recorded { transaction, match_result })
    }

    pub async fn fetch_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>, ReconciliationError> {
        self.db.fetch_transaction(transaction_id).await
    }

    /// The FIFO matching loop. `claim` is called with the oldest candidate order. If the claim is lost to a
    /// concurrent matcher, the candidates are selected again.
    ///
    /// A lost claim normally means the candidate was paid or cancelled, and re-selection moves on to the next order.
    /// Only consecutive losses on the same candidate count against `max_claim_attempts`, so the loop always ends when
    /// the candidates run out, and gives up only if the backend keeps offering an order it cannot claim.
    async fn claim_oldest<T, F, Fut>(
        &self,
        transaction_id: &str,
        amount: Amount,
        provider: Provider,
        mut claim: F,
    ) -> Result<MatcherOutcome<T>, ReconciliationError>
    where
        F: FnMut(OrderId) -> Fut,
        Fut: Future<Output = Result<Attempt<T>, ReconciliationError>>,
    {
        let mut contested: Option<OrderId> = None;
        let mut attempts = 0u32;
        loop {
            let candidates = self.db.fetch_pending_orders(amount, provider).await?;
            let Some(target) = candidates.into_iter().next() else {
                debug!("🔄️💰️ No pending {provider} order for {amount}. Transaction {transaction_id} is unmatched.");
                return Ok(MatcherOutcome::NoCandidate);
            };
            if contested.as_ref() != Some(&target.order_id) {
                attempts = 0;
            }
            if attempts >= self.max_claim_attempts {
                warn!(
                    "🔄️💰️ Transaction {transaction_id} lost {attempts} claims in a row on order {}. There is heavy \
                     contention for {provider} orders of {amount}. The transaction will be left unmatched.",
                    target.order_id
                );
                return Ok(MatcherOutcome::Exhausted);
            }
            attempts += 1;
            trace!("🔄️💰️ Transaction {transaction_id} is claiming order {} (attempt {attempts})", target.order_id);
            match claim(target.order_id.clone()).await? {
                Attempt::Won(v) => return Ok(MatcherOutcome::Claimed(v)),
                Attempt::Duplicate => return Ok(MatcherOutcome::Duplicate),
                Attempt::Lost => {
                    let order_id = target.order_id;
                    debug!("🔄️💰️ Transaction {transaction_id} lost the claim on order {order_id}. Re-selecting.");
                    contested = Some(order_id);
                },
            }
        }
    }

    async fn duplicate_of(&self, transaction_id: &str) -> Result<IngestOutcome, ReconciliationError> {
        info!("🔄️📩️ Transaction {transaction_id} was recorded by a concurrent delivery. Ignoring duplicate.");
        let transaction = self.db.fetch_transaction(transaction_id).await?.ok_or_else(|| {
            ReconciliationError::DatabaseError(format!("Transaction {transaction_id} exists but cannot be fetched"))
        })?;
        Ok(IngestOutcome::Duplicate { transaction })
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️📦️ Notifying order paid hook subscribers");
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    async fn call_transaction_processed_hook(&self, transaction: &Transaction, order: Option<OrderSummary>) {
        for emitter in &self.producers.transaction_processed_producer {
            trace!("🔄️📩️ Notifying transaction processed hook subscribers");
            emitter.publish_event(TransactionProcessedEvent::new(transaction, order.clone())).await;
        }
    }
}
