//! HTTP helper functions for Crux Core
//!
//! This module extracts common HTTP response handling logic from macros
//! into debuggable, testable functions.

use crux_http::Response;

use crate::types::{ConfigSnapshot, SaveOutcome};

/// Base URL for device endpoints.
///
/// NOTE: This is a dummy prefix required because `crux_http` (v0.16.0-rc2) requires
/// absolute URLs and rejects relative paths (`RelativeUrlWithoutBase` error).
/// Shells strip this prefix and resolve the remaining path against the device
/// address (the browser shell sends it relative to the page origin).
pub const BASE_URL: &str = "https://relative";

/// Constructs the full address from a given endpoint.
///
/// # Example
/// ```
/// use iocontrol_ui_core::http_helpers::build_url;
/// let url = build_url("/analogLoad?input=1");
/// assert_eq!(url, "https://relative/analogLoad?input=1");
/// ```
pub fn build_url(endpoint: &str) -> String {
    format!("{BASE_URL}{endpoint}")
}

/// Validates HTTP response.
///
/// Returns `true` if the response status is 2xx.
pub fn is_response_success(response: &Response<Vec<u8>>) -> bool {
    response.status().is_success()
}

/// Extracts error message from HTTP response.
pub fn extract_error_message(action: &str, response: &mut Response<Vec<u8>>) -> String {
    let status = response.status().to_string();

    match response.take_body() {
        Some(body) => {
            if body.is_empty() {
                format!("{action} failed: HTTP {status} (Empty body)")
            } else {
                match String::from_utf8(body) {
                    Ok(msg) => format!("{action} failed: {}", msg.trim()),
                    Err(e) => format!("{action} failed: HTTP {status} (Invalid UTF-8: {e})"),
                }
            }
        }
        None => format!("{action} failed: HTTP {status} (No body)"),
    }
}

/// Prefix transport failures with the action that caused them
pub fn map_http_error(action: &str, error: crux_http::HttpError) -> String {
    format!("{action} failed: {error}")
}

/// Parse JSON from response body.
///
/// Returns error if response is not successful or JSON parsing fails.
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    action: &str,
    response: &mut Response<Vec<u8>>,
) -> Result<T, String> {
    if !is_response_success(response) {
        return Err(extract_error_message(action, response));
    }

    match response.take_body() {
        Some(body) => {
            serde_json::from_slice(&body).map_err(|e| format!("{action}: JSON parse error: {e}"))
        }
        None => Err(format!("{action}: Empty response body")),
    }
}

/// Parse a flat configuration snapshot from response body.
pub fn parse_snapshot_response(
    action: &str,
    response: &mut Response<Vec<u8>>,
) -> Result<ConfigSnapshot, String> {
    if !is_response_success(response) {
        return Err(extract_error_message(action, response));
    }

    match response.take_body() {
        Some(body) => ConfigSnapshot::from_json_slice(&body).map_err(|e| format!("{action}: {e}")),
        None => Err(format!("{action}: Empty response body")),
    }
}

/// Check response status only (no body parsing).
///
/// For endpoints that return status-only responses.
pub fn check_response_status(action: &str, response: &mut Response<Vec<u8>>) -> Result<(), String> {
    if is_response_success(response) {
        Ok(())
    } else {
        Err(extract_error_message(action, response))
    }
}

/// Process HTTP response result and check status only (no JSON parsing)
pub fn process_status_response(
    action: &str,
    result: crux_http::Result<Response<Vec<u8>>>,
) -> Result<(), String> {
    match result {
        Ok(mut response) => check_response_status(action, &mut response),
        Err(e) => Err(map_http_error(action, e)),
    }
}

/// Process HTTP response result and parse JSON
pub fn process_json_response<T: serde::de::DeserializeOwned>(
    action: &str,
    result: crux_http::Result<Response<Vec<u8>>>,
) -> Result<T, String> {
    match result {
        Ok(mut response) => parse_json_response(action, &mut response),
        Err(e) => Err(map_http_error(action, e)),
    }
}

/// Process HTTP response result and parse a configuration snapshot
pub fn process_snapshot_response(
    action: &str,
    result: crux_http::Result<Response<Vec<u8>>>,
) -> Result<ConfigSnapshot, String> {
    match result {
        Ok(mut response) => parse_snapshot_response(action, &mut response),
        Err(e) => Err(map_http_error(action, e)),
    }
}

/// Classify the result of a persist request
pub fn process_save_response(result: crux_http::Result<Response<Vec<u8>>>) -> SaveOutcome {
    match result {
        Ok(response) if is_response_success(&response) => SaveOutcome::Accepted,
        Ok(mut response) => SaveOutcome::Rejected {
            status: u16::from(response.status()),
            message: response
                .take_body()
                .and_then(|body| String::from_utf8(body).ok())
                .map(|msg| msg.trim().to_string())
                .unwrap_or_default(),
        },
        Err(e) => SaveOutcome::TransportError(e.to_string()),
    }
}

/// Handle request creation error - sets error message and returns render command
///
/// This is used when building an HTTP request fails (e.g., body serialization error).
pub fn handle_request_error<M, E>(
    model: &mut M,
    action: &str,
    error: impl std::fmt::Display,
) -> crux_core::Command<crate::Effect, E>
where
    M: crate::model::ModelErrorHandler,
    E: Send + 'static,
{
    model.set_error(format!("Failed to create {action} request: {error}"));
    crux_core::render::render()
}

// Note: Unit tests for these helpers are not included because crux_http::Response
// has a private constructor. They are exercised through the update handler tests,
// which resolve HTTP effects with protocol responses.
