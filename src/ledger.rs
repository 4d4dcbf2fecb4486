use crate::config::Config;
use crate::database::DbClient;
use crate::error::{CreditError, Entity, Result};
use crate::field_update::{ContractPatch, UpdateSemantics};
use crate::models::{
    Contract, ContractDetail, ContractId, ContractTerms, ExportRow, Installment, InstallmentId,
    SettleOutcome,
};
use crate::schedule::{schedule_for, RoundingPolicy};
use crate::settlement;
use crate::store::{ContractStore, MemoryStore, StorageBackend};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::*;

/// Back-office entry point: creates contracts with their schedules, settles
/// installments and applies field edits on top of a `ContractStore`.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn ContractStore>,
    rounding: RoundingPolicy,
    semantics: UpdateSemantics,
}

impl Ledger {
    pub fn new(
        store: Arc<dyn ContractStore>,
        rounding: RoundingPolicy,
        semantics: UpdateSemantics,
    ) -> Self {
        Ledger {
            store,
            rounding,
            semantics,
        }
    }

    /// Opens the configured store and builds a ledger with the configured policies.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn ContractStore> = match config.storage {
            StorageBackend::Postgres => {
                let database_url = config.database_url.as_deref().ok_or_else(|| {
                    CreditError::Config("DATABASE_URL must be set".to_string())
                })?;
                Arc::new(DbClient::new(database_url, config.db_pool_size).await?)
            }
            StorageBackend::Memory => {
                warn!("Using in-memory storage, data is lost on exit");
                Arc::new(MemoryStore::new())
            }
        };
        info!(
            "Ledger: storage={}, rounding={}, updates={}",
            config.storage, config.rounding_policy, config.update_semantics
        );
        Ok(Ledger::new(
            store,
            config.rounding_policy,
            config.update_semantics,
        ))
    }

    /// Creates a contract from a raw form. Empty values are left unset.
    pub async fn create_contract(&self, form: &HashMap<String, String>) -> Result<ContractId> {
        let mut terms = ContractTerms::default();
        ContractPatch::from_form(form, UpdateSemantics::Replace)?.apply(&mut terms);
        Ok(self.create(terms).await?.id)
    }

    /// Creates a contract and, when it has a principal, a count and a start
    /// date, its installment schedule.
    pub async fn create(&self, mut terms: ContractTerms) -> Result<Contract> {
        terms.installments_remaining = terms.installment_count;
        terms.first_due_date = terms.effective_start_date();
        let schedule = schedule_for(&terms, self.rounding)?;

        let contract = self.store.insert_contract(terms, schedule).await?;
        info!(
            "Created contract {} ({} installments)",
            contract.id, contract.terms.installment_count
        );
        Ok(contract)
    }

    pub async fn settle(&self, installment_id: InstallmentId) -> Result<SettleOutcome> {
        let outcome = self.store.settle_installment(installment_id).await?;
        match outcome {
            SettleOutcome::Settled => info!("Settled installment {}", installment_id),
            SettleOutcome::AlreadyPaid => {
                debug!("Installment {} was already paid", installment_id)
            }
        }
        Ok(outcome)
    }

    /// Applies a raw form to a contract. Nothing is written if any value fails to parse.
    pub async fn update_contract(
        &self,
        contract_id: ContractId,
        form: &HashMap<String, String>,
    ) -> Result<Contract> {
        let patch = ContractPatch::from_form(form, self.semantics)?;
        let contract = self.store.update_contract(contract_id, &patch).await?;
        info!("Updated contract {}", contract_id);
        Ok(contract)
    }

    pub async fn get_contract(&self, contract_id: ContractId) -> Result<Contract> {
        self.store
            .get_contract(contract_id)
            .await?
            .ok_or(CreditError::NotFound(Entity::Contract, contract_id))
    }

    pub async fn list_contracts(&self) -> Result<Vec<Contract>> {
        self.store.list_contracts().await
    }

    pub async fn list_installments(&self, contract_id: ContractId) -> Result<Vec<Installment>> {
        self.store.list_installments(contract_id).await
    }

    pub async fn total_paid(&self, contract_id: ContractId) -> Result<Decimal> {
        self.get_contract(contract_id).await?;
        let installments = self.store.list_installments(contract_id).await?;
        Ok(settlement::total_paid(&installments))
    }

    pub async fn contract_detail(&self, contract_id: ContractId) -> Result<ContractDetail> {
        let contract = self.get_contract(contract_id).await?;
        let installments = self.store.list_installments(contract_id).await?;
        let total_paid = settlement::total_paid(&installments);
        Ok(ContractDetail {
            contract,
            installments,
            total_paid,
        })
    }

    pub async fn delete_contracts(&self, ids: &[ContractId]) -> Result<usize> {
        let deleted = self.store.delete_contracts(ids).await?;
        info!("Deleted {} of {} contracts", deleted, ids.len());
        Ok(deleted)
    }

    pub async fn export(&self) -> Result<Vec<ExportRow>> {
        let mut rows = vec![];
        for contract in self.store.list_contracts().await? {
            let installments = self.store.list_installments(contract.id).await?;
            rows.push(ExportRow {
                total_paid: settlement::total_paid(&installments),
                contract,
            });
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;
    use maplit::hashmap;
    use std::str::FromStr as _;

    fn ledger() -> Ledger {
        ledger_with(RoundingPolicy::ReconcileLast, UpdateSemantics::Replace)
    }

    fn ledger_with(rounding: RoundingPolicy, semantics: UpdateSemantics) -> Ledger {
        Ledger::new(Arc::new(MemoryStore::new()), rounding, semantics)
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn standard_contract(ledger: &Ledger) -> ContractId {
        ledger
            .create_contract(&form(&[
                ("client", "Cooperado 1"),
                ("principal", "300"),
                ("installment_count", "3"),
                ("first_due_date", "2024-01-01"),
            ]))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_settle_scenario() {
        let ledger = ledger();
        let id = standard_contract(&ledger).await;

        let installments = ledger.list_installments(id).await.unwrap();
        let due: Vec<_> = installments.iter().map(|i| i.due_date).collect();
        assert_eq!(due, vec![date(2024, 1, 1), date(2024, 1, 31), date(2024, 3, 1)]);
        assert!(installments.iter().all(|i| i.amount == dec("100.00")));
        assert!(installments.iter().all(|i| !i.paid));
        assert_eq!(
            ledger.get_contract(id).await.unwrap().terms.installments_remaining,
            3
        );

        let first = installments.iter().find(|i| i.sequence == 1).unwrap();
        assert_eq!(ledger.settle(first.id).await.unwrap(), SettleOutcome::Settled);
        assert_eq!(ledger.total_paid(id).await.unwrap(), dec("100.00"));
        assert_eq!(
            ledger.get_contract(id).await.unwrap().terms.installments_remaining,
            2
        );
    }

    #[tokio::test]
    async fn test_settle_twice_decrements_once() {
        let ledger = ledger();
        let id = standard_contract(&ledger).await;
        let first = ledger.list_installments(id).await.unwrap()[0].id;

        ledger.settle(first).await.unwrap();
        assert_eq!(ledger.settle(first).await.unwrap(), SettleOutcome::AlreadyPaid);
        let contract = ledger.get_contract(id).await.unwrap();
        assert_eq!(contract.terms.installments_remaining, 2);
        assert_eq!(ledger.total_paid(id).await.unwrap(), dec("100"));
    }

    #[tokio::test]
    async fn test_counter_never_negative() {
        let ledger = ledger();
        let id = standard_contract(&ledger).await;
        // counter edited down by hand, then every installment settled
        ledger
            .update_contract(
                id,
                &form(&[("installments_remaining", "1"), ("principal", "300")]),
            )
            .await
            .unwrap();
        for installment in ledger.list_installments(id).await.unwrap() {
            ledger.settle(installment.id).await.unwrap();
        }
        let contract = ledger.get_contract(id).await.unwrap();
        assert_eq!(contract.terms.installments_remaining, 0);
        assert_eq!(ledger.total_paid(id).await.unwrap(), dec("300"));
    }

    #[tokio::test]
    async fn test_concurrent_settles() {
        let ledger = ledger();
        let id = ledger
            .create_contract(&form(&[
                ("principal", "1200"),
                ("installment_count", "12"),
                ("signing_date", "2024-01-01"),
            ]))
            .await
            .unwrap();
        let installments = ledger.list_installments(id).await.unwrap();

        let mut hdls = vec![];
        for installment in installments.iter().chain(installments.iter()) {
            let ledger = ledger.clone();
            let installment_id = installment.id;
            hdls.push(tokio::spawn(async move { ledger.settle(installment_id).await }));
        }
        let mut settled = 0;
        for hdl in hdls {
            if hdl.await.unwrap().unwrap() == SettleOutcome::Settled {
                settled += 1;
            }
        }
        assert_eq!(settled, 12);
        let contract = ledger.get_contract(id).await.unwrap();
        assert_eq!(contract.terms.installments_remaining, 0);
        assert_eq!(ledger.total_paid(id).await.unwrap(), dec("1200"));
    }

    #[tokio::test]
    async fn test_settle_unknown_installment() {
        let err = ledger().settle(404).await.unwrap_err();
        assert!(matches!(err, CreditError::NotFound(Entity::Installment, 404)));
    }

    #[tokio::test]
    async fn test_create_without_schedule() {
        let ledger = ledger();
        for fields in [
            form(&[("client", "sem valor"), ("installment_count", "3")]),
            form(&[("principal", "100"), ("installment_count", "3")]),
            form(&[("principal", "100"), ("first_due_date", "2024-01-01")]),
        ] {
            let id = ledger.create_contract(&fields).await.unwrap();
            assert!(ledger.list_installments(id).await.unwrap().is_empty());
            assert_eq!(ledger.total_paid(id).await.unwrap(), Decimal::ZERO);
        }
    }

    #[tokio::test]
    async fn test_create_rejects_oversized_count() {
        let ledger = ledger();
        let err = ledger
            .create_contract(&form(&[
                ("principal", "1000"),
                ("installment_count", "4000000"),
                ("first_due_date", "2024-01-01"),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, CreditError::InvalidValue { ref field, .. } if field == "installment_count"));
        assert!(ledger.list_contracts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_derives_first_due_date() {
        let ledger = ledger();
        let id = ledger
            .create_contract(&form(&[
                ("signing_date", "2024-01-10"),
                ("principal", "100.00"),
                ("installment_count", "3"),
                // ignored on creation: always starts at the count
                ("installments_remaining", "1"),
            ]))
            .await
            .unwrap();
        let contract = ledger.get_contract(id).await.unwrap();
        assert_eq!(contract.terms.first_due_date, Some(date(2024, 2, 9)));
        assert_eq!(contract.terms.installments_remaining, 3);

        let amounts: Vec<_> = ledger
            .list_installments(id)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.amount)
            .collect();
        assert_eq!(amounts, vec![dec("33.33"), dec("33.33"), dec("33.34")]);
    }

    #[tokio::test]
    async fn test_uniform_rounding_policy() {
        let ledger = ledger_with(RoundingPolicy::Uniform, UpdateSemantics::Replace);
        let contract = ledger
            .create(ContractTerms {
                principal: Some(dec("100.00")),
                installment_count: 3,
                first_due_date: Some(date(2024, 1, 1)),
                ..Default::default()
            })
            .await
            .unwrap();
        let installments = ledger.list_installments(contract.id).await.unwrap();
        assert!(installments.iter().all(|i| i.amount == dec("33.33")));
    }

    #[tokio::test]
    async fn test_from_config_memory() {
        let config = Config {
            storage: StorageBackend::Memory,
            rounding_policy: RoundingPolicy::Uniform,
            update_semantics: UpdateSemantics::Preserve,
            ..Default::default()
        };
        let ledger = Ledger::from_config(&config).await.unwrap();
        assert_eq!(ledger.rounding, RoundingPolicy::Uniform);
        assert_eq!(ledger.semantics, UpdateSemantics::Preserve);
        assert!(ledger.list_contracts().await.unwrap().is_empty());

        let postgres = Config::default();
        assert!(matches!(
            Ledger::from_config(&postgres).await,
            Err(CreditError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_update_decimal_round_trip() {
        let ledger = ledger();
        let id = standard_contract(&ledger).await;
        ledger
            .update_contract(id, &form(&[("legal_fees", "1234.5")]))
            .await
            .unwrap();
        let contract = ledger.get_contract(id).await.unwrap();
        let fees = contract.terms.legal_fees.unwrap();
        assert_eq!(fees, dec("1234.5"));
        assert_eq!(fees.to_string(), "1234.5");
    }

    #[tokio::test]
    async fn test_update_empty_date_replace() {
        let ledger = ledger();
        let id = standard_contract(&ledger).await;
        let contract = ledger
            .update_contract(id, &form(&[("first_due_date", "")]))
            .await
            .unwrap();
        assert_eq!(contract.terms.first_due_date, None);
        // the schedule is not regenerated
        assert_eq!(ledger.list_installments(id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_empty_date_preserve() {
        let ledger = ledger_with(RoundingPolicy::ReconcileLast, UpdateSemantics::Preserve);
        let id = standard_contract(&ledger).await;
        let contract = ledger
            .update_contract(id, &form(&[("first_due_date", ""), ("notes", "renegociado")]))
            .await
            .unwrap();
        assert_eq!(contract.terms.first_due_date, Some(date(2024, 1, 1)));
        assert_eq!(contract.terms.notes.as_deref(), Some("renegociado"));
    }

    #[tokio::test]
    async fn test_update_invalid_value_writes_nothing() {
        let ledger = ledger();
        let id = standard_contract(&ledger).await;
        let before = ledger.get_contract(id).await.unwrap();

        let err = ledger
            .update_contract(
                id,
                &hashmap! {
                    "client".to_string() => "Outro".to_string(),
                    "principal".to_string() => "abc".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CreditError::InvalidValue { ref field, .. } if field == "principal"));
        assert_eq!(ledger.get_contract(id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_unknown_contract() {
        let err = ledger()
            .update_contract(9, &form(&[("notes", "x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, CreditError::NotFound(Entity::Contract, 9)));
    }

    #[tokio::test]
    async fn test_total_paid_unknown_contract() {
        let err = ledger().total_paid(5).await.unwrap_err();
        assert!(matches!(err, CreditError::NotFound(Entity::Contract, 5)));
    }

    #[tokio::test]
    async fn test_delete_and_export() {
        let ledger = ledger();
        let a = standard_contract(&ledger).await;
        let b = standard_contract(&ledger).await;
        let settled = ledger.list_installments(b).await.unwrap()[1].id;
        ledger.settle(settled).await.unwrap();

        let rows = ledger.export().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].contract.id, a);
        assert_eq!(rows[0].total_paid, Decimal::ZERO);
        assert_eq!(rows[1].total_paid, dec("100"));

        let orphaned = ledger.list_installments(a).await.unwrap()[0].id;
        assert_eq!(ledger.delete_contracts(&[a, 1000]).await.unwrap(), 1);
        let ids: Vec<_> = ledger
            .list_contracts()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![b]);
        assert!(ledger.list_installments(a).await.unwrap().is_empty());
        assert!(matches!(
            ledger.settle(orphaned).await.unwrap_err(),
            CreditError::NotFound(..)
        ));
    }
}
