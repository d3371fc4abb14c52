//! Usage metering service: gate, call the provider, charge the ledger

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::domain::account::{Account, AccountId};
use crate::domain::ledger::{LedgerEntry, LedgerStore, TransactionId};
use crate::domain::llm::{LlmProvider, LlmRequest, Message};
use crate::domain::usage::{
    authorize, ChargeQuote, InteractionMode, PlanFeatureFlags, PricingModel, TokenCount,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_metering_charge;

const DEFAULT_EXPLANATION_INSTRUCTION: &str =
    "Explain the following to a student clearly and concisely.";

/// Billing configuration for metered interactions
#[derive(Debug, Clone)]
pub struct MeteringConfig {
    /// Balances at or below this value cannot start an interaction
    pub minimum_operable_balance: Decimal,
    pub pricing: PricingModel,
    pub plan_flags: PlanFeatureFlags,
    /// Provider model used for every interaction
    pub model: String,
    pub max_tokens: Option<u32>,
    pub explanation_instruction: String,
}

impl Default for MeteringConfig {
    fn default() -> Self {
        Self {
            minimum_operable_balance: Decimal::new(5, 2),
            pricing: PricingModel::default(),
            plan_flags: PlanFeatureFlags::default(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: None,
            explanation_instruction: DEFAULT_EXPLANATION_INSTRUCTION.to_string(),
        }
    }
}

/// One AI interaction to authorize and charge
#[derive(Debug, Clone)]
pub struct InteractionParams {
    pub account_id: AccountId,
    pub mode: InteractionMode,
    pub prompt_text: String,
    /// Prior turns, forwarded in chat mode only
    pub history: Vec<Message>,
}

impl InteractionParams {
    pub fn new(account_id: AccountId, mode: InteractionMode, prompt_text: impl Into<String>) -> Self {
        Self {
            account_id,
            mode,
            prompt_text: prompt_text.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }
}

/// Result of a charged interaction
#[derive(Debug, Clone, Serialize)]
pub struct InteractionOutcome {
    pub text: String,
    pub cost: Decimal,
    pub remaining_balance: Decimal,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub tokens_estimated: bool,
    pub transaction_id: TransactionId,
}

/// A debit written for an interaction
#[derive(Debug, Clone)]
pub struct ChargeReceipt {
    pub quote: ChargeQuote,
    pub remaining_balance: Decimal,
    pub transaction_id: TransactionId,
}

/// Trait for the metering service
#[async_trait]
pub trait UsageMeteringServiceTrait: Send + Sync + Debug {
    /// Gate, generate and charge one interaction
    async fn interact(&self, params: InteractionParams) -> Result<InteractionOutcome, DomainError>;

    /// Plan and balance gate; returns the account when the interaction may start
    async fn authorize(
        &self,
        account_id: &AccountId,
        mode: InteractionMode,
    ) -> Result<Account, DomainError>;

    /// Price the tokens and write the debit. The balance is not re-checked.
    async fn charge(
        &self,
        account_id: &AccountId,
        mode: InteractionMode,
        tokens: TokenCount,
    ) -> Result<ChargeReceipt, DomainError>;
}

/// Metering service over the ledger and a text-generation provider
#[derive(Debug)]
pub struct UsageMeteringService {
    ledger: Arc<dyn LedgerStore>,
    provider: Option<Arc<dyn LlmProvider>>,
    config: MeteringConfig,
}

impl UsageMeteringService {
    /// Without a provider every interaction fails with a configuration error
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        provider: Option<Arc<dyn LlmProvider>>,
        config: MeteringConfig,
    ) -> Self {
        Self {
            ledger,
            provider,
            config,
        }
    }

    pub fn config(&self) -> &MeteringConfig {
        &self.config
    }

    fn provider(&self) -> Result<&Arc<dyn LlmProvider>, DomainError> {
        self.provider
            .as_ref()
            .ok_or_else(|| DomainError::configuration("No text-generation provider configured"))
    }

    fn build_request(&self, params: &InteractionParams) -> (LlmRequest, String) {
        let mut builder = LlmRequest::builder();
        let prompt_side = match params.mode {
            InteractionMode::Chat => {
                builder = builder.messages(params.history.iter().cloned());
                params
                    .history
                    .iter()
                    .map(|m| m.content.as_str())
                    .chain(std::iter::once(params.prompt_text.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            InteractionMode::Explanation => {
                builder = builder.system(self.config.explanation_instruction.clone());
                params.prompt_text.clone()
            }
        };

        builder = builder.user(params.prompt_text.clone());
        if let Some(max_tokens) = self.config.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        (builder.build(), prompt_side)
    }

    async fn run(&self, params: InteractionParams) -> Result<InteractionOutcome, DomainError> {
        self.config.pricing.validate()?;
        let provider = self.provider()?;

        self.authorize(&params.account_id, params.mode).await?;

        let (request, prompt_side) = self.build_request(&params);
        let response = provider.chat(&self.config.model, request).await?;

        let text = response.content().to_string();
        let tokens = TokenCount::resolve(response.usage.as_ref(), &prompt_side, &text);
        if tokens.estimated {
            debug!(
                account_id = %params.account_id,
                provider = provider.provider_name(),
                "Provider returned no usage, estimating tokens"
            );
        }

        let receipt = self.charge(&params.account_id, params.mode, tokens).await?;

        Ok(InteractionOutcome {
            text,
            cost: receipt.quote.charge,
            remaining_balance: receipt.remaining_balance,
            tokens_in: tokens.tokens_in,
            tokens_out: tokens.tokens_out,
            tokens_estimated: tokens.estimated,
            transaction_id: receipt.transaction_id,
        })
    }
}

fn outcome_label(error: &DomainError) -> &'static str {
    match error {
        DomainError::PlanNotAllowed { .. } => "plan_denied",
        DomainError::InsufficientBalance { .. } => "insufficient_balance",
        DomainError::AccountNotFound { .. } => "account_not_found",
        DomainError::Configuration { .. } => "config_error",
        DomainError::Provider { .. } => "provider_error",
        _ => "error",
    }
}

#[async_trait]
impl UsageMeteringServiceTrait for UsageMeteringService {
    async fn interact(&self, params: InteractionParams) -> Result<InteractionOutcome, DomainError> {
        let mode = params.mode;
        let account_id = params.account_id.clone();

        match self.run(params).await {
            Ok(outcome) => {
                info!(
                    account_id = %account_id,
                    mode = %mode,
                    charge = %outcome.cost,
                    balance = %outcome.remaining_balance,
                    tokens_in = outcome.tokens_in,
                    tokens_out = outcome.tokens_out,
                    "Interaction charged"
                );
                record_metering_charge(mode.as_str(), "charged", Some(outcome.cost));

                Ok(outcome)
            }
            Err(e) => {
                match &e {
                    DomainError::Configuration { message } => {
                        error!(account_id = %account_id, "Metering misconfigured: {}", message)
                    }
                    DomainError::Provider { .. } => {
                        warn!(account_id = %account_id, mode = %mode, error = %e, "Provider call failed")
                    }
                    _ => debug!(account_id = %account_id, mode = %mode, error = %e, "Interaction denied"),
                }
                record_metering_charge(mode.as_str(), outcome_label(&e), None);

                Err(e)
            }
        }
    }

    async fn authorize(
        &self,
        account_id: &AccountId,
        mode: InteractionMode,
    ) -> Result<Account, DomainError> {
        let account = self
            .ledger
            .get_account(account_id)
            .await?
            .ok_or_else(|| DomainError::account_not_found(account_id.as_str()))?;

        authorize(account.plan_tier(), mode, &self.config.plan_flags)?;

        let threshold = self.config.minimum_operable_balance;
        if account.balance() <= threshold {
            return Err(DomainError::insufficient_balance(account.balance(), threshold));
        }

        Ok(account)
    }

    async fn charge(
        &self,
        account_id: &AccountId,
        mode: InteractionMode,
        tokens: TokenCount,
    ) -> Result<ChargeReceipt, DomainError> {
        self.config.pricing.validate()?;

        let quote = self.config.pricing.quote(tokens.tokens_in, tokens.tokens_out);
        let entry = LedgerEntry::debit(quote.charge, mode.ledger_description())
            .with_tokens_used(tokens.total());

        let receipt = self.ledger.debit_and_log(account_id, entry).await?;

        Ok(ChargeReceipt {
            quote,
            remaining_balance: receipt.balance,
            transaction_id: receipt.transaction.id().clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::PlanTier;
    use crate::domain::ledger::{TransactionKind, TransactionQuery};
    use crate::domain::llm::{LlmResponse, MockLlmProvider, MessageRole, Usage};
    use crate::infrastructure::ledger::InMemoryLedgerStore;
    use rust_decimal_macros::dec;

    fn account_id() -> AccountId {
        AccountId::new("student-1").unwrap()
    }

    async fn ledger_with(tier: PlanTier, balance: Decimal) -> Arc<InMemoryLedgerStore> {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        ledger
            .open_account(Account::open(account_id(), tier))
            .await
            .unwrap();

        if balance > Decimal::ZERO {
            ledger
                .credit_and_log(&account_id(), LedgerEntry::credit(balance, "recharge"))
                .await
                .unwrap();
        }

        ledger
    }

    fn reply(text: &str, usage: Option<Usage>) -> LlmResponse {
        let response = LlmResponse::new(
            "resp-1".to_string(),
            "gpt-4o-mini".to_string(),
            Message::assistant(text),
        );

        match usage {
            Some(usage) => response.with_usage(usage),
            None => response,
        }
    }

    fn provider_replying(response: LlmResponse) -> MockLlmProvider {
        let mut provider = MockLlmProvider::new();
        provider
            .expect_chat()
            .times(1)
            .returning(move |_, _| Ok(response.clone()));
        provider.expect_provider_name().return_const("mock");
        provider
    }

    fn provider_never_called() -> MockLlmProvider {
        let mut provider = MockLlmProvider::new();
        provider.expect_chat().times(0);
        provider
    }

    fn service(
        ledger: Arc<InMemoryLedgerStore>,
        provider: MockLlmProvider,
        flags: PlanFeatureFlags,
    ) -> UsageMeteringService {
        let config = MeteringConfig {
            plan_flags: flags,
            ..MeteringConfig::default()
        };

        UsageMeteringService::new(ledger, Some(Arc::new(provider)), config)
    }

    fn chat(prompt: &str) -> InteractionParams {
        InteractionParams::new(account_id(), InteractionMode::Chat, prompt)
    }

    #[tokio::test]
    async fn test_end_to_end_chat_charge() {
        let ledger = ledger_with(PlanTier::Advanced, dec!(10.00)).await;
        let provider = provider_replying(reply("Sure!", Some(Usage::new(1000, 500))));
        let service = service(ledger.clone(), provider, PlanFeatureFlags::default());

        let outcome = service.interact(chat("Help me")).await.unwrap();

        assert_eq!(outcome.text, "Sure!");
        assert_eq!(outcome.cost, dec!(0.001485));
        assert_eq!(outcome.remaining_balance, dec!(9.998515));
        assert!(!outcome.tokens_estimated);

        let log = ledger
            .transactions(&account_id(), &TransactionQuery::new())
            .await
            .unwrap();
        assert_eq!(log.len(), 2);
        let debit = &log[1];
        assert_eq!(debit.kind, TransactionKind::Debit);
        assert_eq!(debit.amount, dec!(0.001485));
        assert_eq!(debit.tokens_used, Some(1500));
        assert_eq!(debit.description, "AI chat interaction");
        assert_eq!(debit.id(), &outcome.transaction_id);
        assert!(ledger.reconcile(&account_id()).await.unwrap().consistent);
    }

    #[tokio::test]
    async fn test_basic_plan_is_denied_before_provider_call() {
        let ledger = ledger_with(PlanTier::Basic, dec!(10.00)).await;
        let service = service(
            ledger.clone(),
            provider_never_called(),
            PlanFeatureFlags::new(true, true),
        );

        for mode in [InteractionMode::Chat, InteractionMode::Explanation] {
            let result = service
                .interact(InteractionParams::new(account_id(), mode, "hi"))
                .await;
            assert!(matches!(result, Err(DomainError::PlanNotAllowed { .. })));
        }

        assert_eq!(ledger.read_balance(&account_id()).await.unwrap(), dec!(10.00));
    }

    #[tokio::test]
    async fn test_intermediate_plan_follows_flags() {
        let ledger = ledger_with(PlanTier::Intermediate, dec!(10.00)).await;
        let provider = provider_replying(reply("Because...", Some(Usage::new(10, 10))));
        let service = service(ledger, provider, PlanFeatureFlags::new(false, true));

        let denied = service.interact(chat("hi")).await;
        assert!(matches!(denied, Err(DomainError::PlanNotAllowed { .. })));

        let allowed = service
            .interact(InteractionParams::new(
                account_id(),
                InteractionMode::Explanation,
                "Why is the sky blue?",
            ))
            .await;
        assert!(allowed.is_ok());
    }

    #[tokio::test]
    async fn test_balance_at_threshold_is_denied() {
        let ledger = ledger_with(PlanTier::Advanced, dec!(0.05)).await;
        let service = service(ledger, provider_never_called(), PlanFeatureFlags::default());

        let result = service.interact(chat("hi")).await;

        match result {
            Err(DomainError::InsufficientBalance { balance, threshold }) => {
                assert_eq!(balance, dec!(0.05));
                assert_eq!(threshold, dec!(0.05));
            }
            other => panic!("expected insufficient balance, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_balance_just_above_threshold_is_allowed() {
        let ledger = ledger_with(PlanTier::Advanced, dec!(0.0501)).await;
        let provider = provider_replying(reply("ok", Some(Usage::new(1000, 500))));
        let service = service(ledger, provider, PlanFeatureFlags::default());

        let outcome = service.interact(chat("hi")).await.unwrap();

        assert_eq!(outcome.remaining_balance, dec!(0.048615));
    }

    #[tokio::test]
    async fn test_charge_may_push_balance_below_threshold() {
        let ledger = ledger_with(PlanTier::Admin, dec!(0.06)).await;
        let provider = provider_replying(reply("long answer", Some(Usage::new(100_000, 100_000))));
        let service = service(ledger.clone(), provider, PlanFeatureFlags::default());

        let outcome = service.interact(chat("hi")).await.unwrap();

        // 100k * 0.45/1M + 100k * 1.8/1M = 0.225, * 1.10 = 0.2475
        assert_eq!(outcome.cost, dec!(0.2475));
        assert_eq!(outcome.remaining_balance, dec!(-0.1875));
        assert!(ledger.reconcile(&account_id()).await.unwrap().consistent);
    }

    #[tokio::test]
    async fn test_missing_account() {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let service = service(ledger, provider_never_called(), PlanFeatureFlags::default());

        let result = service.interact(chat("hi")).await;

        assert!(matches!(result, Err(DomainError::AccountNotFound { .. })));
    }

    #[tokio::test]
    async fn test_missing_provider_is_configuration_error() {
        let ledger = ledger_with(PlanTier::Advanced, dec!(10.00)).await;
        let service = UsageMeteringService::new(ledger.clone(), None, MeteringConfig::default());

        let result = service.interact(chat("hi")).await;

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
        assert_eq!(ledger.read_balance(&account_id()).await.unwrap(), dec!(10.00));
    }

    #[tokio::test]
    async fn test_invalid_pricing_is_configuration_error() {
        let ledger = ledger_with(PlanTier::Advanced, dec!(10.00)).await;
        let mut config = MeteringConfig::default();
        config.pricing.minimum_charge_floor = Decimal::ZERO;
        let service =
            UsageMeteringService::new(ledger, Some(Arc::new(provider_never_called())), config);

        let result = service.interact(chat("hi")).await;

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_provider_error_leaves_balance_untouched() {
        let ledger = ledger_with(PlanTier::Advanced, dec!(10.00)).await;
        let mut provider = MockLlmProvider::new();
        provider
            .expect_chat()
            .times(1)
            .returning(|_, _| Err(DomainError::provider("openai", "HTTP 500")));
        let service = service(ledger.clone(), provider, PlanFeatureFlags::default());

        let result = service.interact(chat("hi")).await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
        assert_eq!(ledger.read_balance(&account_id()).await.unwrap(), dec!(10.00));
        assert_eq!(
            ledger
                .transactions(&account_id(), &TransactionQuery::new())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_missing_usage_falls_back_to_estimate() {
        let ledger = ledger_with(PlanTier::Advanced, dec!(10.00)).await;
        let provider = provider_replying(reply(&"y".repeat(2000), None));
        let service = service(ledger.clone(), provider, PlanFeatureFlags::default());

        let params = chat(&"x".repeat(3000)).with_history(vec![
            Message::user("a".repeat(499)),
            Message::assistant("b".repeat(499)),
        ]);
        let outcome = service.interact(params).await.unwrap();

        // prompt side: 499 + 1 + 499 + 1 + 3000 chars = 4000 -> 1000 tokens; completion 500
        assert!(outcome.tokens_estimated);
        assert_eq!(outcome.tokens_in, 1000);
        assert_eq!(outcome.tokens_out, 500);
        assert_eq!(outcome.cost, dec!(0.001485));
    }

    #[tokio::test]
    async fn test_chat_forwards_history_and_explanation_uses_instruction() {
        let ledger = ledger_with(PlanTier::Advanced, dec!(10.00)).await;
        let mut provider = MockLlmProvider::new();
        provider
            .expect_chat()
            .withf(|model, request| {
                model.to_string() == "gpt-4o-mini"
                    && request.messages.len() == 3
                    && request.messages[0].role == MessageRole::User
                    && request.messages[2].content == "and now?"
            })
            .times(1)
            .returning(|_, _| Ok(reply("chat", Some(Usage::new(1, 1)))));
        provider
            .expect_chat()
            .withf(|_, request| {
                request.messages.len() == 2 && request.messages[0].role == MessageRole::System
            })
            .times(1)
            .returning(|_, _| Ok(reply("explained", Some(Usage::new(1, 1)))));
        let service = service(ledger, provider, PlanFeatureFlags::default());

        let history = vec![Message::user("hello"), Message::assistant("hi!")];
        let chat_outcome = service
            .interact(chat("and now?").with_history(history.clone()))
            .await
            .unwrap();
        let explanation = service
            .interact(
                InteractionParams::new(account_id(), InteractionMode::Explanation, "photosynthesis")
                    .with_history(history),
            )
            .await
            .unwrap();

        assert_eq!(chat_outcome.text, "chat");
        assert_eq!(explanation.text, "explained");
    }

    #[tokio::test]
    async fn test_explanation_description() {
        let ledger = ledger_with(PlanTier::Advanced, dec!(1.00)).await;
        let service = service(ledger.clone(), provider_never_called(), PlanFeatureFlags::default());

        let receipt = service
            .charge(
                &account_id(),
                InteractionMode::Explanation,
                TokenCount::measured(0, 0),
            )
            .await
            .unwrap();

        assert_eq!(receipt.quote.charge, dec!(0.00001));
        let log = ledger
            .transactions(&account_id(), &TransactionQuery::new())
            .await
            .unwrap();
        assert_eq!(log[1].description, "AI explanation");
        assert_eq!(log[1].tokens_used, Some(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_charges_are_all_recorded() {
        let ledger = ledger_with(PlanTier::Advanced, dec!(10.00)).await;
        let mut provider = MockLlmProvider::new();
        provider
            .expect_chat()
            .times(50)
            .returning(|_, _| Ok(reply("ok", Some(Usage::new(1000, 500)))));
        let service = Arc::new(service(ledger.clone(), provider, PlanFeatureFlags::default()));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.interact(chat("hi")).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // 10.00 - 50 * 0.001485
        assert_eq!(ledger.read_balance(&account_id()).await.unwrap(), dec!(9.92575));
        let report = ledger.reconcile(&account_id()).await.unwrap();
        assert!(report.consistent);
        assert_eq!(report.transaction_count, 51);
    }
}
