use std::sync::{Mutex, MutexGuard};

use actix_cors::Cors;
use actix_web::{delete, get, http::header, post, put, web, HttpResponse};
use serde::Deserialize;
use tracing::info;

use crate::builder::BillDraft;
use crate::error::ApiError;
use crate::ledger::{Ledger, SaveOutcome};
use crate::schemas::{BillId, Discount, ParticipantId, Snapshot, Split};
use crate::summary::Summary;

pub type SharedLedger = web::Data<Mutex<Ledger>>;

#[derive(Deserialize)]
struct NewParticipantJson {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BillJson {
    total: f64,
    #[serde(default)]
    splits: Vec<Split>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    discount: Option<Discount>,
}

fn lock(ledger: &SharedLedger) -> Result<MutexGuard<'_, Ledger>, ApiError> {
    ledger
        .lock()
        .map_err(|_| ApiError::Internal("ledger lock poisoned".to_string()))
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[get("/participants")]
async fn list_participants(ledger: SharedLedger) -> Result<HttpResponse, ApiError> {
    let ledger = lock(&ledger)?;
    Ok(HttpResponse::Ok().json(ledger.participants()))
}

#[post("/participants")]
async fn add_participant(
    ledger: SharedLedger,
    json: web::Json<NewParticipantJson>,
) -> Result<HttpResponse, ApiError> {
    let participant = lock(&ledger)?.add_participant(&json.name)?;
    info!(id = participant.id, "Participant added");
    Ok(HttpResponse::Created().json(participant))
}

#[delete("/participants/{id}")]
async fn remove_participant(
    ledger: SharedLedger,
    id: web::Path<ParticipantId>,
) -> Result<HttpResponse, ApiError> {
    let removed = lock(&ledger)?.remove_participant(id.into_inner())?;
    info!(id = removed.id, "Participant removed");
    Ok(HttpResponse::Ok().json(removed))
}

#[get("/bills")]
async fn list_bills(ledger: SharedLedger) -> Result<HttpResponse, ApiError> {
    let ledger = lock(&ledger)?;
    Ok(HttpResponse::Ok().json(ledger.bills()))
}

#[put("/bills/{id}")]
async fn save_bill(
    ledger: SharedLedger,
    id: web::Path<BillId>,
    json: web::Json<BillJson>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let input = json.into_inner();

    let mut draft = BillDraft::new(input.total)?.with_id(id.clone());
    for split in input.splits {
        draft.add_split(split)?;
    }
    if let Some(discount) = input.discount {
        draft.set_discount(discount)?;
    }
    if let Some(description) = &input.description {
        draft.set_description(description);
    }

    let mut ledger = lock(&ledger)?;
    let outcome = ledger.save_bill(draft.build())?;
    let bill = ledger
        .bill(&id)
        .ok_or_else(|| ApiError::Internal(format!("bill {id} missing after save")))?;
    info!(id = %bill.id, total = bill.total, ?outcome, "Bill saved");
    Ok(match outcome {
        SaveOutcome::Created => HttpResponse::Created().json(bill),
        SaveOutcome::Updated => HttpResponse::Ok().json(bill),
    })
}

#[delete("/bills/{id}")]
async fn remove_bill(ledger: SharedLedger, id: web::Path<BillId>) -> Result<HttpResponse, ApiError> {
    let removed = lock(&ledger)?.remove_bill(&id)?;
    info!(id = %removed.id, "Bill removed");
    Ok(HttpResponse::Ok().json(removed))
}

#[get("/bills/{id}/breakdown")]
async fn bill_breakdown(
    ledger: SharedLedger,
    id: web::Path<BillId>,
) -> Result<HttpResponse, ApiError> {
    let breakdown = lock(&ledger)?.bill_breakdown(&id)?;
    Ok(HttpResponse::Ok().json(breakdown))
}

#[get("/balance")]
async fn get_balance(ledger: SharedLedger) -> Result<HttpResponse, ApiError> {
    let balance = lock(&ledger)?.balances();
    Ok(HttpResponse::Ok().json(balance))
}

#[get("/summary")]
async fn get_summary(ledger: SharedLedger) -> Result<HttpResponse, ApiError> {
    let ledger = lock(&ledger)?;
    let summary = Summary::from_balance(ledger.participants(), &ledger.balances(), ledger.bills());
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/snapshot")]
async fn export_snapshot(ledger: SharedLedger) -> Result<HttpResponse, ApiError> {
    let snapshot = lock(&ledger)?.snapshot();
    Ok(HttpResponse::Ok().json(snapshot))
}

#[put("/snapshot")]
async fn import_snapshot(
    ledger: SharedLedger,
    json: web::Json<Snapshot>,
) -> Result<HttpResponse, ApiError> {
    let imported = Ledger::from_snapshot(json.into_inner())?;
    info!(
        participants = imported.participants().len(),
        bills = imported.bills().len(),
        "Snapshot imported"
    );
    let mut ledger = lock(&ledger)?;
    *ledger = imported;
    Ok(HttpResponse::Ok().json(ledger.balances()))
}

#[delete("/snapshot")]
async fn clear_snapshot(ledger: SharedLedger) -> Result<HttpResponse, ApiError> {
    let mut ledger = lock(&ledger)?;
    if !ledger.is_empty() {
        ledger.clear();
        info!("All data cleared");
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Registers every route plus the body and path error handlers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .service(health)
    .service(list_participants)
    .service(add_participant)
    .service(remove_participant)
    .service(list_bills)
    .service(save_bill)
    .service(remove_bill)
    .service(bill_breakdown)
    .service(get_balance)
    .service(get_summary)
    .service(export_snapshot)
    .service(import_snapshot)
    .service(clear_snapshot);
}

/// Any origin when `allowed_origins` is empty, otherwise only the listed ones.
pub fn cors(allowed_origins: &[String]) -> Cors {
    if allowed_origins.is_empty() {
        return Cors::permissive();
    }
    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_header(header::CONTENT_TYPE)
        .max_age(3600)
}
