//! Submission endpoint for signed authorizations.

use gasless_core::{AuthorizationError, GaslessEngine};
use gasless_types::{APIError, DelegatedCallRequest, DispatchResponse};

/// Maps a dispatcher rejection to its HTTP form.
///
/// A bad signature is 401, a signature that cannot be parsed is 400 and a
/// call refused after authentication is 422.
pub fn to_api_error(err: AuthorizationError) -> APIError {
	let message = err.to_string();
	match err {
		AuthorizationError::MalformedSignature(_) => APIError::BadRequest {
			error_type: "MALFORMED_SIGNATURE".to_string(),
			message,
			details: None,
		},
		AuthorizationError::InvalidSignature => APIError::Unauthorized {
			error_type: "INVALID_SIGNATURE".to_string(),
			message,
		},
		AuthorizationError::Expired => APIError::UnprocessableEntity {
			error_type: "EXPIRED".to_string(),
			message,
			details: None,
		},
		AuthorizationError::NonceMismatch { expected, supplied } => {
			APIError::UnprocessableEntity {
				error_type: "NONCE_MISMATCH".to_string(),
				message,
				details: Some(serde_json::json!({
					"expected": expected.to_string(),
					"supplied": supplied.to_string(),
				})),
			}
		}
		AuthorizationError::Action(_) => APIError::UnprocessableEntity {
			error_type: "ACTION_REFUSED".to_string(),
			message,
			details: None,
		},
		AuthorizationError::Storage(_) | AuthorizationError::Encoding(_) => {
			APIError::InternalServerError {
				error_type: "INTERNAL_ERROR".to_string(),
				message,
			}
		}
	}
}

/// Handles POST /api/authorizations.
pub async fn submit_authorization(
	request: DelegatedCallRequest,
	engine: &GaslessEngine,
) -> Result<DispatchResponse, APIError> {
	let signature = request
		.signature_parts()
		.map_err(|e| APIError::BadRequest {
			error_type: "INVALID_SIGNATURE_FORMAT".to_string(),
			message: e.to_string(),
			details: None,
		})?;

	let record = engine
		.dispatcher()
		.delegated_call(
			request.sender,
			request.receivers,
			request.amount,
			request.deadline,
			signature,
		)
		.await
		.map_err(to_api_error)?;

	Ok(DispatchResponse {
		sender: record.call.sender,
		receivers: record.call.receivers,
		amount: record.call.amount,
		nonce: record.nonce,
	})
}
