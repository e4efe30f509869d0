//! Webhook providers.
//!
//! A provider turns a raw webhook delivery (headers + body) into a decision:
//! start a build with a set of [`TriggerApiParams`], skip the event, or fail.
//! Providers are pure: they never do I/O and keep no state between requests.
//!
//! The routing layer first calls [`HookProvider::hook_check`], which only looks
//! at the headers, and only reads the body for [`HookProvider::transform`] once
//! a provider has claimed the request.

use std::fmt;

use actix_web::http::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::trigger_api::TriggerApiParams;

pub mod github;

/// Implemented by every webhook source the service understands.
pub trait HookProvider: Send + Sync {
    /// Header-only check: is this request from this provider, and can the
    /// provider transform its event type?
    fn hook_check(&self, headers: &HeaderMap) -> HookCheckResult;

    /// Decode the body and apply the provider's rules for the event type.
    ///
    /// `body` is `None` when the request carried no body at all.
    fn transform(&self, headers: &HeaderMap, body: Option<&[u8]>) -> TransformResult;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookCheckResult {
    pub is_supported_by_provider: bool,

    /// Set when the request is from this provider but its event type is not
    /// one the provider forwards. The caller should accept and skip it.
    pub cant_transform_reason: Option<String>,
}

impl HookCheckResult {
    pub fn not_supported() -> Self {
        Self {
            is_supported_by_provider: false,
            cant_transform_reason: None,
        }
    }

    pub fn supported() -> Self {
        Self {
            is_supported_by_provider: true,
            cant_transform_reason: None,
        }
    }

    pub fn cant_transform(reason: impl Into<String>) -> Self {
        Self {
            is_supported_by_provider: true,
            cant_transform_reason: Some(reason.into()),
        }
    }
}

/// Outcome of [`HookProvider::transform`]. Exactly one of trigger, skip or
/// failure.
#[derive(Debug)]
pub enum TransformResult {
    Trigger(TriggerApiParams),
    Skip(SkipReason),
    Failed(TransformError),
}

impl TransformResult {
    pub fn should_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }

    pub fn error(&self) -> Option<&TransformError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn trigger_params(&self) -> Option<&TriggerApiParams> {
        match self {
            Self::Trigger(params) => Some(params),
            _ => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Self::Skip(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Business-rule reasons for not starting a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    HeadCommitNotDistinct,
    DeletedRef,
    NotHeadRef(String),
    NoPullRequestAction,
    PullRequestActionNotBuildable(String),
    PullRequestMerged,
    PullRequestNotMergeable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeadCommitNotDistinct => f.write_str("Head Commit is not Distinct"),
            Self::DeletedRef => {
                f.write_str("This is a 'Deleted' event, no build can be started")
            }
            Self::NotHeadRef(git_ref) => write!(f, "Ref ({git_ref}) is not a head ref"),
            Self::NoPullRequestAction => f.write_str("No Pull Request action specified"),
            Self::PullRequestActionNotBuildable(action) => {
                write!(f, "Pull Request action doesn't require a build: {action}")
            }
            Self::PullRequestMerged => f.write_str("Pull Request already merged"),
            Self::PullRequestNotMergeable => f.write_str("Pull Request is not mergeable"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Failed to read content of request body: {0}")]
    Decode(#[from] DecodeError),

    #[error("Missing event type header: {0}")]
    MissingEventHeader(&'static str),

    #[error("Unsupported event type: {0}")]
    UnsupportedEvent(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("no or empty request body")]
    EmptyBody,

    #[error("{0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Deserialize a webhook body. Unknown fields are ignored; an absent or empty
/// body is rejected before any parsing happens.
pub fn decode_body<T: DeserializeOwned>(body: Option<&[u8]>) -> Result<T, DecodeError> {
    match body {
        Some(bytes) if !bytes.is_empty() => Ok(serde_json::from_slice(bytes)?),
        _ => Err(DecodeError::EmptyBody),
    }
}

/// Registered providers, keyed by the service id used in hook URLs.
///
/// Kept in registration order so auto-detection is deterministic.
#[derive(Default)]
pub struct Providers {
    providers: Vec<(&'static str, Box<dyn HookProvider>)>,
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every provider this service ships with.
    pub fn builtin() -> Self {
        let mut providers = Self::new();
        providers.register(github::SERVICE_ID, github::GithubProvider);
        providers
    }

    pub fn register(&mut self, service_id: &'static str, provider: impl HookProvider + 'static) {
        self.providers.push((service_id, Box::new(provider)));
    }

    pub fn get(&self, service_id: &str) -> Option<&dyn HookProvider> {
        self.providers
            .iter()
            .find(|(id, _)| *id == service_id)
            .map(|(_, provider)| provider.as_ref())
    }

    /// Find the first provider that claims the request, along with its check
    /// result.
    pub fn detect(
        &self,
        headers: &HeaderMap,
    ) -> Option<(&'static str, &dyn HookProvider, HookCheckResult)> {
        self.providers.iter().find_map(|(id, provider)| {
            let check = provider.hook_check(headers);
            check
                .is_supported_by_provider
                .then(|| (*id, provider.as_ref(), check))
        })
    }
}
