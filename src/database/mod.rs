pub mod db_models;

use crate::error::{CreditError, Entity, Result};
use crate::field_update::ContractPatch;
use crate::models::{
    Contract, ContractId, ContractTerms, Installment, InstallmentId, NewInstallment, SettleOutcome,
};
use crate::schema::*;
use crate::settlement;
use crate::store::ContractStore;
use async_trait::async_trait;
use chrono::Utc;
use db_models::{ContractRow, ContractValues, InstallmentRow, NewInstallmentRow};
use diesel::sql_types::Integer;
use diesel::ExpressionMethods as _;
use diesel::OptionalExtension as _;
use diesel::QueryDsl as _;
use diesel::QueryableByName;
use diesel::SelectableHelper as _;
use diesel_async::pooled_connection::deadpool::Object;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::AsyncConnection as _;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl as _;
use diesel_async::SimpleAsyncConnection as _;
use tracing::*;

#[derive(Clone)]
pub struct DbClient {
    db: Pool<AsyncPgConnection>,
}

impl DbClient {
    pub async fn new(database_url: &str, pool_size: usize) -> Result<DbClient> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let db = Pool::builder(manager)
            .max_size(pool_size)
            .build()
            .map_err(|e| CreditError::Pool(e.to_string()))?;
        let db = DbClient { db };

        // Check the connection
        {
            let mut conn = db.conn().await?;
            #[derive(QueryableByName)]
            struct Ret {
                #[diesel(sql_type = Integer)]
                value: i32,
            }
            let result: Vec<Ret> = diesel::sql_query("SELECT 1 as value")
                .load(&mut conn)
                .await?;
            if result.len() != 1 || result[0].value != 1 {
                return Err(CreditError::Pool("connection check failed".to_string()));
            }
            info!("Successfully connected to database");
        }
        db.create_schema().await?;
        Ok(db)
    }

    async fn create_schema(&self) -> Result<()> {
        let sql = include_str!("../../credito_schema.sql");
        self.conn().await?.batch_execute(sql).await?;
        Ok(())
    }

    pub async fn conn(&self) -> Result<Object<AsyncPgConnection>> {
        self.db
            .get()
            .await
            .map_err(|e| CreditError::Pool(e.to_string()))
    }

    /// Deletes every row from both tables.
    pub async fn truncate(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        conn.transaction::<_, CreditError, _>(|conn| {
            async move {
                diesel::delete(installments::table).execute(conn).await?;
                diesel::delete(contracts::table).execute(conn).await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }
}

#[async_trait]
impl ContractStore for DbClient {
    async fn insert_contract(
        &self,
        terms: ContractTerms,
        schedule: Vec<NewInstallment>,
    ) -> Result<Contract> {
        debug!("db insert contract, {} installments", schedule.len());
        let values = ContractValues::new(&terms, Utc::now())?;
        let mut conn = self.conn().await?;
        conn.transaction::<_, CreditError, _>(|conn| {
            async move {
                let row: ContractRow = diesel::insert_into(contracts::table)
                    .values(&values)
                    .returning(ContractRow::as_returning())
                    .get_result(conn)
                    .await?;
                let inserts = schedule
                    .iter()
                    .map(|installment| NewInstallmentRow::new(row.id, installment))
                    .collect::<Result<Vec<_>>>()?;
                if !inserts.is_empty() {
                    diesel::insert_into(installments::table)
                        .values(&inserts)
                        .execute(conn)
                        .await?;
                }
                Contract::try_from(row)
            }
            .scope_boxed()
        })
        .await
    }

    async fn get_contract(&self, id: ContractId) -> Result<Option<Contract>> {
        debug!("db get contract: {}", id);
        let row: Option<ContractRow> = contracts::table
            .find(id)
            .select(ContractRow::as_select())
            .first(&mut self.conn().await?)
            .await
            .optional()?;
        row.map(Contract::try_from).transpose()
    }

    async fn list_contracts(&self) -> Result<Vec<Contract>> {
        let rows: Vec<ContractRow> = contracts::table
            .order(contracts::id.asc())
            .select(ContractRow::as_select())
            .load(&mut self.conn().await?)
            .await?;
        rows.into_iter().map(Contract::try_from).collect()
    }

    async fn list_installments(&self, contract_id: ContractId) -> Result<Vec<Installment>> {
        let rows: Vec<InstallmentRow> = installments::table
            .filter(installments::contract_id.eq(contract_id))
            .order(installments::sequence.asc())
            .select(InstallmentRow::as_select())
            .load(&mut self.conn().await?)
            .await?;
        rows.into_iter().map(Installment::try_from).collect()
    }

    async fn update_contract(&self, id: ContractId, patch: &ContractPatch) -> Result<Contract> {
        debug!("db update contract {}: {:?}", id, patch);
        let mut conn = self.conn().await?;
        conn.transaction::<_, CreditError, _>(|conn| {
            async move {
                let row: ContractRow = contracts::table
                    .find(id)
                    .select(ContractRow::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or(CreditError::NotFound(Entity::Contract, id))?;
                let mut contract = Contract::try_from(row)?;
                patch.apply(&mut contract.terms);

                let values = ContractValues::new(&contract.terms, Utc::now())?;
                let row: ContractRow = diesel::update(contracts::table.find(id))
                    .set(&values)
                    .returning(ContractRow::as_returning())
                    .get_result(conn)
                    .await?;
                Contract::try_from(row)
            }
            .scope_boxed()
        })
        .await
    }

    async fn settle_installment(&self, id: InstallmentId) -> Result<SettleOutcome> {
        debug!("db settle installment: {}", id);
        let mut conn = self.conn().await?;
        conn.transaction::<_, CreditError, _>(|conn| {
            async move {
                // lock order: installment, then its contract
                let row: InstallmentRow = installments::table
                    .find(id)
                    .select(InstallmentRow::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or(CreditError::NotFound(Entity::Installment, id))?;
                let mut installment = Installment::try_from(row)?;

                let contract_row: Option<ContractRow> = contracts::table
                    .find(installment.contract_id)
                    .select(ContractRow::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?;
                let mut contract = contract_row.map(Contract::try_from).transpose()?;

                let outcome = settlement::settle(&mut installment, contract.as_mut())?;
                if outcome == SettleOutcome::Settled {
                    diesel::update(installments::table.find(installment.id))
                        .set(installments::paid.eq(true))
                        .execute(conn)
                        .await?;
                    if let Some(contract) = &contract {
                        let remaining = db_models::to_column(
                            "installments_remaining",
                            contract.terms.installments_remaining,
                        )?;
                        diesel::update(contracts::table.find(contract.id))
                            .set((
                                contracts::installments_remaining.eq(remaining),
                                contracts::updated_at.eq(Utc::now()),
                            ))
                            .execute(conn)
                            .await?;
                    }
                }
                Ok(outcome)
            }
            .scope_boxed()
        })
        .await
    }

    async fn delete_contracts(&self, ids: &[ContractId]) -> Result<usize> {
        debug!("db delete contracts: {:?}", ids);
        let ids = ids.to_vec();
        let mut conn = self.conn().await?;
        conn.transaction::<_, CreditError, _>(|conn| {
            async move {
                let existing: Vec<i64> = contracts::table
                    .filter(contracts::id.eq_any(ids))
                    .select(contracts::id)
                    .for_update()
                    .load(conn)
                    .await?;
                diesel::delete(
                    installments::table.filter(installments::contract_id.eq_any(existing.clone())),
                )
                .execute(conn)
                .await?;
                let deleted = diesel::delete(contracts::table.filter(contracts::id.eq_any(existing)))
                    .execute(conn)
                    .await?;
                Ok(deleted)
            }
            .scope_boxed()
        })
        .await
    }
}
