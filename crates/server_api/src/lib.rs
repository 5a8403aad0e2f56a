use std::sync::Arc;

use classifier_integration::PoClassifier;
use shared::{
    domain::{ClassificationResult, HistoryEntry, SessionId, EXAMPLE_DESCRIPTIONS},
    error::{ApiError, ErrorCode},
    protocol::{
        ClassifyOutcome, SessionView, UpdateFormRequest, CLASSIFIER_UNAVAILABLE_MESSAGE,
        DOWNLOAD_CONTENT_TYPE, DOWNLOAD_FILENAME, EMPTY_DESCRIPTION_MESSAGE,
        MALFORMED_RESPONSE_MESSAGE,
    },
};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

pub mod cache;
pub mod session;

use session::{SessionState, SessionStore};

#[derive(Clone)]
pub struct ApiContext {
    pub classifier: Arc<dyn PoClassifier>,
    pub sessions: SessionStore,
}

impl ApiContext {
    pub fn new(classifier: Arc<dyn PoClassifier>, cache_capacity: usize) -> Self {
        Self {
            classifier,
            sessions: SessionStore::new(cache_capacity),
        }
    }
}

/// A rendered download: the latest result as a JSON attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

pub fn examples() -> Vec<String> {
    EXAMPLE_DESCRIPTIONS.iter().map(|e| e.to_string()).collect()
}

pub async fn create_session(ctx: &ApiContext) -> SessionId {
    ctx.sessions.create().await
}

pub async fn close_session(ctx: &ApiContext, session_id: SessionId) -> Result<(), ApiError> {
    if ctx.sessions.remove(session_id).await {
        Ok(())
    } else {
        Err(session_not_found())
    }
}

pub async fn session_view(ctx: &ApiContext, session_id: SessionId) -> Result<SessionView, ApiError> {
    let session = lock_session(ctx, session_id).await?;
    Ok(session.view(session_id))
}

pub async fn update_form(
    ctx: &ApiContext,
    session_id: SessionId,
    update: UpdateFormRequest,
) -> Result<SessionView, ApiError> {
    let mut session = lock_session(ctx, session_id).await?;
    session.last_outcome = None;
    if let Some(description) = update.description {
        session.description = description;
    }
    if let Some(supplier) = update.supplier {
        session.supplier = supplier;
    }
    if let Some(debug_raw) = update.debug_raw {
        session.debug_raw = debug_raw;
    }
    Ok(session.view(session_id))
}

/// Fills the description with a fixed example. `index` is 1-based.
pub async fn populate_example(
    ctx: &ApiContext,
    session_id: SessionId,
    index: usize,
) -> Result<SessionView, ApiError> {
    let example = index
        .checked_sub(1)
        .and_then(|idx| EXAMPLE_DESCRIPTIONS.get(idx))
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, format!("no example {index}")))?;
    let mut session = lock_session(ctx, session_id).await?;
    session.last_outcome = None;
    session.description = example.to_string();
    Ok(session.view(session_id))
}

/// Classifies the current form contents.
///
/// The collaborator is called at most once per distinct trimmed
/// (description, supplier) pair within a session; later submissions reuse
/// the cached raw text. Failed calls are not cached.
pub async fn submit_classification(
    ctx: &ApiContext,
    session_id: SessionId,
) -> Result<ClassifyOutcome, ApiError> {
    let mut session = lock_session(ctx, session_id).await?;
    let request = session.request();
    if !request.is_classifiable() {
        session.last_outcome = Some(errored(EMPTY_DESCRIPTION_MESSAGE, None));
        return Err(ApiError::new(
            ErrorCode::Validation,
            EMPTY_DESCRIPTION_MESSAGE,
        ));
    }

    let cached = session.cache.get(&request).map(str::to_owned);
    let raw = match cached {
        Some(raw) => {
            debug!(%session_id, "classification served from cache");
            raw
        }
        None => {
            let called = ctx
                .classifier
                .classify_po(&request.description, &request.supplier)
                .await;
            match called {
                Ok(raw) => {
                    session.cache.insert(request.clone(), raw.clone());
                    raw
                }
                Err(error) => {
                    warn!(%session_id, error = %format!("{error:#}"), "classifier call failed");
                    session.last_outcome = Some(errored(CLASSIFIER_UNAVAILABLE_MESSAGE, None));
                    return Err(ApiError::new(
                        ErrorCode::ClassifierUnavailable,
                        CLASSIFIER_UNAVAILABLE_MESSAGE,
                    ));
                }
            }
        }
    };

    match ClassificationResult::parse(&raw) {
        Ok(result) => {
            let outcome = ClassifyOutcome::Displayed {
                summary: result.summary(),
                result: result.value().clone(),
            };
            session.record(HistoryEntry::new(&request, result));
            session.last_outcome = Some(outcome.clone());
            info!(%session_id, "classification displayed");
            Ok(outcome)
        }
        Err(error) => {
            warn!(%session_id, %error, "classifier response is not valid json");
            let raw_response = session.debug_raw.then_some(raw);
            session.last_outcome = Some(errored(MALFORMED_RESPONSE_MESSAGE, raw_response.clone()));
            let err = ApiError::new(ErrorCode::MalformedResponse, MALFORMED_RESPONSE_MESSAGE);
            Err(match raw_response {
                Some(raw) => err.with_raw_response(raw),
                None => err,
            })
        }
    }
}

pub async fn list_history(
    ctx: &ApiContext,
    session_id: SessionId,
) -> Result<Vec<HistoryEntry>, ApiError> {
    let session = lock_session(ctx, session_id).await?;
    Ok(session.history().cloned().collect())
}

pub async fn download_latest(ctx: &ApiContext, session_id: SessionId) -> Result<Download, ApiError> {
    let session = lock_session(ctx, session_id).await?;
    let latest = session
        .latest()
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "no classification to download"))?;
    Ok(Download {
        filename: DOWNLOAD_FILENAME,
        content_type: DOWNLOAD_CONTENT_TYPE,
        body: latest.result.to_pretty_json(),
    })
}

async fn lock_session(
    ctx: &ApiContext,
    session_id: SessionId,
) -> Result<OwnedMutexGuard<SessionState>, ApiError> {
    ctx.sessions
        .lock(session_id)
        .await
        .ok_or_else(session_not_found)
}

fn session_not_found() -> ApiError {
    ApiError::new(ErrorCode::NotFound, "session not found")
}

fn errored(message: &str, raw_response: Option<String>) -> ClassifyOutcome {
    ClassifyOutcome::Errored {
        message: message.to_string(),
        raw_response,
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
