use crate::error::CreditError;
use crate::ledger::Ledger;
use crate::models::{Contract, ContractDetail, ContractId, ExportRow, InstallmentId};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::*;

impl IntoResponse for CreditError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CreditError::NotFound(..) => (StatusCode::NOT_FOUND, self.to_string()),
            CreditError::InvalidValue { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            _ => {
                // details stay in the log
                error!("request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, CreditError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
    pub id: ContractId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub ids: Vec<ContractId>,
}

async fn list_contracts(State(ledger): State<Ledger>) -> ApiResult<Vec<Contract>> {
    Ok(Json(ledger.list_contracts().await?))
}

async fn create_contract(
    State(ledger): State<Ledger>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<(StatusCode, Json<Created>), CreditError> {
    let id = ledger.create_contract(&form).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

async fn get_contract(
    State(ledger): State<Ledger>,
    Path(id): Path<ContractId>,
) -> ApiResult<ContractDetail> {
    Ok(Json(ledger.contract_detail(id).await?))
}

async fn update_contract(
    State(ledger): State<Ledger>,
    Path(id): Path<ContractId>,
    Form(form): Form<HashMap<String, String>>,
) -> ApiResult<Contract> {
    Ok(Json(ledger.update_contract(id, &form).await?))
}

async fn settle_installment(
    State(ledger): State<Ledger>,
    Path(id): Path<InstallmentId>,
) -> ApiResult<serde_json::Value> {
    let outcome = ledger.settle(id).await?;
    Ok(Json(json!({ "outcome": outcome })))
}

async fn delete_contracts(
    State(ledger): State<Ledger>,
    Json(req): Json<DeleteRequest>,
) -> ApiResult<serde_json::Value> {
    let deleted = ledger.delete_contracts(&req.ids).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

async fn export(State(ledger): State<Ledger>) -> ApiResult<Vec<ExportRow>> {
    Ok(Json(ledger.export().await?))
}

pub fn router(ledger: Ledger) -> Router {
    Router::new()
        .route("/api/contracts", get(list_contracts).post(create_contract))
        .route("/api/contracts/delete", post(delete_contracts))
        .route("/api/contracts/{id}", get(get_contract).post(update_contract))
        .route("/api/installments/{id}/settle", post(settle_installment))
        .route("/api/export", get(export))
        .with_state(ledger)
}

pub struct WebApiServer {
    ledger: Ledger,
}

impl WebApiServer {
    pub fn new(ledger: &Ledger) -> Self {
        Self {
            ledger: ledger.clone(),
        }
    }

    pub async fn run(&self, bind_addr: &str) -> std::io::Result<()> {
        info!("Starting server on {}", bind_addr);

        let app = router(self.ledger.clone())
            .fallback_service(ServeDir::new("dist"))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            );

        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        axum::serve(listener, app).await
    }
}
