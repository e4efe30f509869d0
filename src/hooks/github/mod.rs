//! GitHub webhooks: `push` and `pull_request` events.

use actix_web::http::header::{HeaderMap, CONTENT_TYPE};

use tracing::debug;

use super::{decode_body, HookCheckResult, SkipReason, TransformError, TransformResult};
use crate::trigger_api::TriggerApiParams;

pub mod model;

use self::model::{CodePushEventModel, PullRequestEventModel};

pub const SERVICE_ID: &str = "github";

const EVENT_HEADER: &str = "x-github-event";

const HEAD_REF_PREFIX: &str = "refs/heads/";

// Pull request actions that change the code to be built
const BUILD_ACTIONS: [&str; 3] = ["opened", "reopened", "synchronize"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GithubEvent {
    Push,
    PullRequest,
}

impl GithubEvent {
    fn parse(event_type: &str) -> Option<Self> {
        match event_type {
            "push" => Some(Self::Push),
            "pull_request" => Some(Self::PullRequest),
            _ => None,
        }
    }
}

fn event_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(EVENT_HEADER)
        .filter(|value| !value.is_empty())
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GithubProvider;

impl super::HookProvider for GithubProvider {
    fn hook_check(&self, headers: &HeaderMap) -> HookCheckResult {
        let Some(event_type) = event_type(headers) else {
            return HookCheckResult::not_supported();
        };

        if !headers
            .get(CONTENT_TYPE)
            .is_some_and(|value| !value.is_empty())
        {
            return HookCheckResult::not_supported();
        }

        match GithubEvent::parse(&event_type) {
            Some(_) => HookCheckResult::supported(),
            None => HookCheckResult::cant_transform(format!(
                "Unsupported GitHub hook event type: {event_type}"
            )),
        }
    }

    fn transform(&self, headers: &HeaderMap, body: Option<&[u8]>) -> TransformResult {
        let Some(event_type) = event_type(headers) else {
            return TransformResult::Failed(TransformError::MissingEventHeader(EVENT_HEADER));
        };

        debug!("Transforming GitHub {event_type} event");

        match GithubEvent::parse(&event_type) {
            Some(GithubEvent::Push) => match decode_body::<CodePushEventModel>(body) {
                Ok(code_push) => transform_code_push_event(&code_push),
                Err(e) => TransformResult::Failed(e.into()),
            },
            Some(GithubEvent::PullRequest) => match decode_body::<PullRequestEventModel>(body) {
                Ok(pull_request) => transform_pull_request_event(&pull_request),
                Err(e) => TransformResult::Failed(e.into()),
            },
            None => TransformResult::Failed(TransformError::UnsupportedEvent(event_type)),
        }
    }
}

pub fn transform_code_push_event(code_push: &CodePushEventModel) -> TransformResult {
    if !code_push.head_commit.distinct {
        return TransformResult::Skip(SkipReason::HeadCommitNotDistinct);
    }

    if code_push.deleted {
        return TransformResult::Skip(SkipReason::DeletedRef);
    }

    let Some(branch) = code_push.push_ref.strip_prefix(HEAD_REF_PREFIX) else {
        return TransformResult::Skip(SkipReason::NotHeadRef(code_push.push_ref.clone()));
    };

    TransformResult::Trigger(TriggerApiParams {
        commit_hash: code_push.head_commit.commit_hash.clone(),
        commit_message: code_push.head_commit.commit_message.clone(),
        branch: branch.to_string(),
        pull_request_id: None,
    })
}

pub fn transform_pull_request_event(pull_request: &PullRequestEventModel) -> TransformResult {
    let action = pull_request.action.as_str();

    if action.is_empty() {
        return TransformResult::Skip(SkipReason::NoPullRequestAction);
    }

    if !BUILD_ACTIONS.contains(&action) {
        return TransformResult::Skip(SkipReason::PullRequestActionNotBuildable(
            action.to_string(),
        ));
    }

    let info = &pull_request.pull_request_info;

    if info.merged {
        return TransformResult::Skip(SkipReason::PullRequestMerged);
    }

    // An unknown mergeable state still builds: GitHub computes it lazily
    if info.mergeable == Some(false) {
        return TransformResult::Skip(SkipReason::PullRequestNotMergeable);
    }

    let commit_message = if info.body.is_empty() {
        info.title.clone()
    } else {
        format!("{}\n\n{}", info.title, info.body)
    };

    TransformResult::Trigger(TriggerApiParams {
        commit_hash: info.branch_info.commit_hash.clone(),
        commit_message,
        branch: info.branch_info.branch_ref.clone(),
        pull_request_id: Some(pull_request.pull_request_id),
    })
}
