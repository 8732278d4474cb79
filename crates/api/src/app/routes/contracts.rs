use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use bondly_core::{ContractId, UserId};
use bondly_infra::CreateContract;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn create_contract(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateContractRequest>,
) -> axum::response::Response {
    let creator_id = match parse_user_id(body.creator_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let payer_id = match parse_user_id(body.payer_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let payee_id = match parse_user_id(body.payee_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let input = CreateContract {
        title: body.title,
        creator_id,
        payer_id,
        payee_id,
        payee_email: body.payee_email,
        currency: body.currency,
        terms: body.terms,
        milestones: body.milestones.into_iter().map(Into::into).collect(),
        total_amount: body.total_amount,
    };

    match services.contracts.create(input).await {
        Ok((contract, milestones)) => Json(serde_json::json!({
            "contract": contract,
            "milestones": milestones,
        }))
        .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_contract(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let contract_id: ContractId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid contract id")
        }
    };

    match services.contracts.get(contract_id).await {
        Ok((contract, milestones)) => Json(serde_json::json!({
            "contract": contract,
            "milestones": milestones,
        }))
        .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

fn parse_user_id(raw: Option<String>) -> Result<UserId, axum::response::Response> {
    match raw {
        None => Ok(UserId::new()),
        Some(s) => s.parse().map_err(|_| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id")
        }),
    }
}
