use serde::{Deserialize, Serialize};

/// Provider-agnostic build parameters. Only ever constructed complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerApiParams {
    pub commit_hash: String,

    pub commit_message: String,

    pub branch: String,

    // Only set for builds started by a pull request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookInfo<'a> {
    #[serde(rename = "type")]
    pub hook_type: &'static str,

    pub api_token: &'a str,
}

/// Body of a build start request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerRequest<'a> {
    pub hook_info: HookInfo<'a>,

    pub build_params: &'a TriggerApiParams,

    pub triggered_by: String,
}

impl<'a> TriggerRequest<'a> {
    pub fn new(service_id: &str, api_token: &'a str, build_params: &'a TriggerApiParams) -> Self {
        Self {
            hook_info: HookInfo {
                hook_type: "bitrise",
                api_token,
            },
            build_params,
            triggered_by: format!("webhooks-{service_id}"),
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerApiResponse {
    pub status: String,
    pub message: String,
    pub slug: String,
    pub service: String,
    pub build_slug: String,
    pub build_number: u64,
    pub build_url: String,
    pub triggered_workflow: String,
}
