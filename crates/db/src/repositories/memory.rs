use std::collections::HashMap;

use tokio::sync::RwLock;

use rately_core::domain::approval::{ApprovalId, QuoteApproval};
use rately_core::domain::lookup::EffortLevel;
use rately_core::domain::pricing::{EffortLevelRange, QuoteCalculationRule, RateProfile};
use rately_core::domain::quote::{Quote, QuoteId};
use rately_core::domain::sla::SlaPolicy;
use rately_core::domain::ticket::TicketId;

use super::{
    ApprovalRepository, CalculationRuleRepository, EffortLevelRepository, QuoteRepository,
    RateProfileRepository, RepositoryError, SlaPolicyRepository,
};

/// Catalog tables held behind one lock so seed loads stay consistent.
#[derive(Default)]
pub struct InMemoryCatalogRepository {
    rate_profiles: RwLock<HashMap<String, RateProfile>>,
    calculation_rules: RwLock<HashMap<String, QuoteCalculationRule>>,
    effort_levels: RwLock<HashMap<EffortLevel, EffortLevelRange>>,
}

#[async_trait::async_trait]
impl RateProfileRepository for InMemoryCatalogRepository {
    async fn list_rate_profiles(&self) -> Result<Vec<RateProfile>, RepositoryError> {
        let profiles = self.rate_profiles.read().await;
        let mut listed: Vec<RateProfile> = profiles.values().cloned().collect();
        listed.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(listed)
    }

    async fn save_rate_profile(&self, profile: RateProfile) -> Result<(), RepositoryError> {
        let mut profiles = self.rate_profiles.write().await;
        profiles.insert(profile.id.0.clone(), profile);
        Ok(())
    }
}

#[async_trait::async_trait]
impl CalculationRuleRepository for InMemoryCatalogRepository {
    async fn list_calculation_rules(
        &self,
    ) -> Result<Vec<QuoteCalculationRule>, RepositoryError> {
        let rules = self.calculation_rules.read().await;
        let mut listed: Vec<QuoteCalculationRule> = rules.values().cloned().collect();
        listed.sort_by(|a, b| {
            a.priority_order.cmp(&b.priority_order).then_with(|| a.id.0.cmp(&b.id.0))
        });
        Ok(listed)
    }

    async fn save_calculation_rule(
        &self,
        rule: QuoteCalculationRule,
    ) -> Result<(), RepositoryError> {
        let mut rules = self.calculation_rules.write().await;
        rules.insert(rule.id.0.clone(), rule);
        Ok(())
    }
}

#[async_trait::async_trait]
impl EffortLevelRepository for InMemoryCatalogRepository {
    async fn list_effort_levels(&self) -> Result<Vec<EffortLevelRange>, RepositoryError> {
        let levels = self.effort_levels.read().await;
        let mut listed: Vec<EffortLevelRange> = levels.values().cloned().collect();
        listed.sort_by(|a, b| a.hours_minimum.cmp(&b.hours_minimum));
        Ok(listed)
    }

    async fn save_effort_level(&self, range: EffortLevelRange) -> Result<(), RepositoryError> {
        let mut levels = self.effort_levels.write().await;
        levels.insert(range.level, range);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySlaPolicyRepository {
    policies: RwLock<HashMap<String, SlaPolicy>>,
}

#[async_trait::async_trait]
impl SlaPolicyRepository for InMemorySlaPolicyRepository {
    async fn list_sla_policies(&self) -> Result<Vec<SlaPolicy>, RepositoryError> {
        let policies = self.policies.read().await;
        let mut listed: Vec<SlaPolicy> = policies.values().cloned().collect();
        listed.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(listed)
    }

    async fn save_sla_policy(&self, policy: SlaPolicy) -> Result<(), RepositoryError> {
        let mut policies = self.policies.write().await;
        policies.insert(policy.id.0.clone(), policy);
        Ok(())
    }
}

/// Version allocation mirrors the SQL repository: next version is computed
/// and the quote stored under one write lock, so concurrent inserts for the
/// same ticket serialize instead of colliding.
#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<HashMap<String, Quote>>,
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn insert_quote(&self, quote: Quote) -> Result<Quote, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        let version = quotes
            .values()
            .filter(|existing| existing.ticket_id == quote.ticket_id)
            .map(|existing| existing.version)
            .max()
            .unwrap_or(0)
            + 1;
        let stored = Quote { version, ..quote };
        quotes.insert(stored.id.0.clone(), stored.clone());
        Ok(stored)
    }

    async fn update_quote(&self, quote: &Quote) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        if let Some(existing) = quotes.get_mut(&quote.id.0) {
            existing.approval_id = quote.approval_id.clone();
            existing.final_cost = quote.final_cost;
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.get(&id.0).cloned())
    }

    async fn find_latest(&self, ticket_id: &TicketId) -> Result<Option<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes
            .values()
            .filter(|quote| &quote.ticket_id == ticket_id)
            .max_by_key(|quote| quote.version)
            .cloned())
    }

    async fn list_for_ticket(
        &self,
        ticket_id: &TicketId,
    ) -> Result<Vec<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        let mut listed: Vec<Quote> =
            quotes.values().filter(|quote| &quote.ticket_id == ticket_id).cloned().collect();
        listed.sort_by_key(|quote| quote.version);
        Ok(listed)
    }
}

#[derive(Default)]
pub struct InMemoryApprovalRepository {
    approvals: RwLock<HashMap<String, QuoteApproval>>,
}

#[async_trait::async_trait]
impl ApprovalRepository for InMemoryApprovalRepository {
    async fn find_by_id(
        &self,
        id: &ApprovalId,
    ) -> Result<Option<QuoteApproval>, RepositoryError> {
        let approvals = self.approvals.read().await;
        Ok(approvals.get(&id.0).cloned())
    }

    async fn save(&self, approval: QuoteApproval) -> Result<(), RepositoryError> {
        let mut approvals = self.approvals.write().await;
        approvals.insert(approval.id.0.clone(), approval);
        Ok(())
    }

    async fn find_by_quote_id(
        &self,
        quote_id: &QuoteId,
    ) -> Result<Vec<QuoteApproval>, RepositoryError> {
        let approvals = self.approvals.read().await;
        let mut listed: Vec<QuoteApproval> = approvals
            .values()
            .filter(|approval| &approval.quote_id == quote_id)
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(listed)
    }
}
