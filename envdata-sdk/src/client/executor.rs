//! Request execution with retry and recovery

use std::str::FromStr;
use std::sync::Arc;

use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

use crate::core::{MultipartPart, RequestBody, RequestDescriptor};
use crate::error::classification::classify_http_status;
use crate::error::{classify, RawFailure, Result, Severity};
use crate::logging::LogLevel;
use crate::resilience::{RecoveryAction, RecoveryPlan, RetryState};
use crate::util::{generate_request_id, measure_time_async, sanitize_for_logging};

use super::navigation::login_redirect_target;
use super::ApiClient;

const API_KEY_HEADER: &str = "x-api-key";

/// Successful exchange: status and parsed body
type Exchange = std::result::Result<(u16, Value), RawFailure>;

impl ApiClient {
    /// Run one logical API call.
    ///
    /// GET requests are attempted up to `max_attempts` times while the
    /// recovery policy allows it; every other method is attempted once.
    /// Returns the parsed JSON body, or `Value::Null` for empty responses.
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<Value> {
        let logger = self.logger();
        let method = request.method();
        logger.set_location(self.navigator.current_path());

        let prepared = request
            .validate()
            .and_then(|_| self.request_url(request))
            .and_then(|url| caller_headers(request).map(|headers| (url, headers)));
        let (url, extra_headers) = match prepared {
            Ok(prepared) => prepared,
            Err(raw) => {
                let error = classify(raw);
                logger.warn(
                    format!("Rejected invalid request: {} {}", method, request.path()),
                    json!({ "type": "validation", "code": error.code(), "error": error.message() }),
                );
                return Err(error);
            }
        };

        let call_id = generate_request_id();
        let log_url = sanitize_for_logging(url.as_str());
        let mut retry = RetryState::for_method(method, self.config.max_attempts);

        loop {
            let attempt = retry.begin_attempt();
            logger.log_request(
                method.as_str(),
                &log_url,
                json!({ "call_id": call_id, "attempt": attempt, "max_attempts": retry.max_attempts() }),
            );

            let (outcome, elapsed) =
                measure_time_async(|| self.send_once(request, &url, &extra_headers)).await;

            let raw = match outcome {
                Ok((status, body)) => {
                    logger.log_response(
                        method.as_str(),
                        &log_url,
                        status,
                        elapsed,
                        json!({ "call_id": call_id, "attempt": attempt }),
                    );
                    return Ok(body);
                }
                Err(raw) => raw,
            };

            let error = classify(raw);
            let plan = self.policy.policy_for(&error);
            let delay = retry.next_delay(&error, &plan);

            let mut context = json!({
                "call_id": call_id,
                "attempt": attempt,
                "code": error.code(),
                "error_type": error.error_type(),
                "severity": error.severity(),
                "error": error.message(),
                "duration_ms": elapsed.as_millis() as u64,
                "recovery": plan.action,
            });
            if let Some(status) = error.status() {
                context["status"] = json!(status);
                context["category"] = json!(classify_http_status(status));
            }
            if let Some(delay) = delay {
                context["delay_ms"] = json!(delay.as_millis() as u64);
            } else if error.is_critical() {
                context["requires_attention"] = json!(true);
            }

            let level = match (delay, error.severity()) {
                (Some(_), _) | (None, Severity::Low | Severity::Medium) => LogLevel::Warn,
                (None, _) => LogLevel::Error,
            };
            logger.log_request_failure(level, method.as_str(), &log_url, context);

            match delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => {
                    self.recover(&plan);
                    return Err(error);
                }
            }
        }
    }

    /// Run a call and decode the body into `R`
    pub async fn request<R: DeserializeOwned>(&self, request: &RequestDescriptor) -> Result<R> {
        let body = self.execute(request).await?;
        serde_json::from_value(body).map_err(|e| classify(RawFailure::from(e)))
    }

    /// One attempt, bounded by the configured timeout
    async fn send_once(&self, request: &RequestDescriptor, url: &Url, extra_headers: &HeaderMap) -> Exchange {
        let headers = self.attempt_headers(request, extra_headers)?;
        let mut builder = self
            .http
            .request(request.method().to_reqwest(), url.clone())
            .headers(headers);

        builder = match request.body() {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(serde_json::to_vec(value)?),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
        };

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, bytes))
        };

        let (status, bytes) = match tokio::time::timeout(self.config.timeout, exchange).await {
            Ok(Ok(exchange)) => exchange,
            Ok(Err(e)) => return Err(RawFailure::from(e)),
            Err(_) => {
                return Err(RawFailure::timeout(format!(
                    "No response within {:?}",
                    self.config.timeout
                )))
            }
        };

        let is_empty = status == reqwest::StatusCode::NO_CONTENT || bytes.iter().all(u8::is_ascii_whitespace);

        if status.is_success() {
            if is_empty {
                return Ok((status.as_u16(), Value::Null));
            }
            let body = serde_json::from_slice(&bytes)?;
            return Ok((status.as_u16(), body));
        }

        let body = if is_empty {
            None
        } else {
            Some(
                serde_json::from_slice(&bytes)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())),
            )
        };
        Err(RawFailure::http(status.as_u16(), body))
    }

    fn request_url(&self, request: &RequestDescriptor) -> std::result::Result<Url, RawFailure> {
        let mut url = Url::parse(&format!("{}{}", self.config.base_url.trim_end_matches('/'), request.path()))
            .map_err(|e| RawFailure::invalid_field("path", e.to_string()))?;

        if !request.query_params().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query_params());
        }
        Ok(url)
    }

    /// Headers for one attempt. The session is read fresh each time so a
    /// concurrent logout takes effect on the next attempt.
    fn attempt_headers(&self, request: &RequestDescriptor, extra: &HeaderMap) -> std::result::Result<HeaderMap, RawFailure> {
        let mut headers = HeaderMap::new();

        if !matches!(request.body(), RequestBody::Multipart(_)) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let api_key = self.config.api_key.clone().or_else(|| self.session().api_key());
        if let Some(api_key) = api_key {
            headers.insert(HeaderName::from_static(API_KEY_HEADER), header_value("X-API-Key", &api_key)?);
        }

        if let Some(token) = self.session().token() {
            headers.insert(AUTHORIZATION, header_value("Authorization", &format!("Bearer {}", token))?);
        }

        for (name, value) in extra {
            headers.insert(name.clone(), value.clone());
        }

        Ok(headers)
    }

    /// Side effects of a terminal failure
    fn recover(&self, plan: &RecoveryPlan) {
        if plan.clear_session {
            debug!("Clearing session after authentication failure");
            self.session().clear();
        }

        if plan.action != RecoveryAction::RedirectToLogin {
            return;
        }

        let login_path = plan
            .redirect_path
            .clone()
            .unwrap_or_else(|| self.policy.config().login_path.clone());
        let target = login_redirect_target(&login_path, &self.navigator.current_path());
        let delay = plan.delay.unwrap_or_default();

        self.logger().info(
            "Redirecting to login",
            json!({ "type": "navigation", "target": target, "delay_ms": delay.as_millis() as u64 }),
        );

        if delay.is_zero() {
            self.navigator.redirect(&target);
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let navigator = Arc::clone(&self.navigator);
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    navigator.redirect(&target);
                });
            }
            Err(_) => self.navigator.redirect(&target),
        }
    }
}

fn caller_headers(request: &RequestDescriptor) -> std::result::Result<HeaderMap, RawFailure> {
    let mut headers = HeaderMap::new();
    for (name, value) in request.headers() {
        let header_name = HeaderName::from_str(name)
            .map_err(|e| RawFailure::invalid_field("headers", format!("Invalid header name {}: {}", name, e)))?;
        headers.insert(header_name, header_value(name, value)?);
    }
    Ok(headers)
}

fn header_value(name: &str, value: &str) -> std::result::Result<HeaderValue, RawFailure> {
    HeaderValue::from_str(value)
        .map_err(|e| RawFailure::invalid_field("headers", format!("Invalid value for header {}: {}", name, e)))
}

fn multipart_form(parts: &[MultipartPart]) -> std::result::Result<Form, RawFailure> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            MultipartPart::Text { name, value } => form.text(name.clone(), value.clone()),
            MultipartPart::File {
                name,
                file_name,
                mime,
                bytes,
            } => {
                let file = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime)
                    .map_err(|e| RawFailure::invalid_field(name.clone(), format!("Invalid MIME type: {}", e)))?;
                form.part(name.clone(), file)
            }
        };
    }
    Ok(form)
}
