use actix_web::{web, HttpResponse, Result as ActixResult};
use std::time::Instant;

use crate::config::Config;
use crate::error::Error;
use crate::models::{GenerateRequest, GenerateResponse};
use crate::scheduler::{self, TreeArtifacts};
use crate::utils::encode_digest;

pub async fn health() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({"status": "healthy"})))
}

pub async fn generate_tree(
    req: web::Json<GenerateRequest>,
    config: web::Data<Config>,
) -> ActixResult<HttpResponse> {
    let start_time = Instant::now();
    let req = req.into_inner();

    tracing::info!(
        "Received tree request with address_count={}, max_workers={:?}, desired_chunk_size={:?}",
        req.addresses.len(),
        req.max_workers,
        req.desired_chunk_size
    );

    if req.addresses.is_empty() {
        let err_msg = "Request validation failed: at least one address is required. An empty tree has no meaningful root to verify against";
        tracing::error!("{}", err_msg);
        return Err(actix_web::error::ErrorBadRequest(err_msg));
    }

    let opts = config.run_options(req.max_workers, req.desired_chunk_size);
    let addresses = req.addresses;
    let address_count = addresses.len();

    // Hashing tens of thousands of leaves is CPU-bound; keep it off the
    // actix executor.
    let artifacts = web::block(move || scheduler::generate(&addresses, &opts))
        .await
        .map_err(|e| {
            let err_msg = format!("Tree generation task failed to complete: {}", e);
            tracing::error!("{}", err_msg);
            actix_web::error::ErrorInternalServerError(err_msg)
        })?
        .map_err(|e| {
            let err_msg = format!("Tree generation failed: {}", e);
            tracing::error!("{}", err_msg);
            match e {
                Error::EmptyInput | Error::Hex(_) => actix_web::error::ErrorBadRequest(err_msg),
                _ => actix_web::error::ErrorInternalServerError(err_msg),
            }
        })?;

    let response = into_response(artifacts, address_count, start_time);
    tracing::info!(
        "Tree generated: root={}, proofs={}, duration_ms={}",
        response.root,
        response.proofs.len(),
        response.generation_duration_ms
    );
    Ok(HttpResponse::Ok().json(response))
}

fn into_response(
    artifacts: TreeArtifacts,
    address_count: usize,
    start_time: Instant,
) -> GenerateResponse {
    let proofs = artifacts
        .proofs
        .into_iter()
        .map(|(address, siblings)| {
            let encoded = siblings.iter().map(encode_digest).collect();
            (address, encoded)
        })
        .collect();

    GenerateResponse {
        root: encode_digest(&artifacts.root),
        proofs,
        address_count,
        generation_duration_ms: start_time.elapsed().as_millis(),
    }
}
