use serde::{Deserialize, Deserializer};

// GitHub sends `null` for some of these (e.g. `head_commit` on branch deletion,
// `body` on a PR without description); treat that the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommitModel {
    // Whether this commit was new to the repository with this push
    #[serde(deserialize_with = "null_as_default")]
    pub distinct: bool,

    #[serde(rename = "id")]
    pub commit_hash: String,

    #[serde(rename = "message")]
    pub commit_message: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CodePushEventModel {
    #[serde(rename = "ref")]
    pub push_ref: String,

    #[serde(deserialize_with = "null_as_default")]
    pub deleted: bool,

    #[serde(deserialize_with = "null_as_default")]
    pub head_commit: CommitModel,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BranchInfoModel {
    #[serde(rename = "ref")]
    pub branch_ref: String,

    #[serde(rename = "sha")]
    pub commit_hash: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PullRequestInfoModel {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(deserialize_with = "null_as_default")]
    pub body: String,

    #[serde(deserialize_with = "null_as_default")]
    pub merged: bool,

    // None until GitHub has finished computing mergeability
    pub mergeable: Option<bool>,

    #[serde(rename = "head")]
    pub branch_info: BranchInfoModel,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PullRequestEventModel {
    pub action: String,

    #[serde(rename = "number", deserialize_with = "null_as_default")]
    pub pull_request_id: u64,

    #[serde(rename = "pull_request")]
    pub pull_request_info: PullRequestInfoModel,
}
