// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use intake_app::{Candidate, ExternalKind, IssueDraft};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://api.linear.app/graphql";

const PERSONAL_KEY_PREFIX: &str = "lin_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Viewer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Member {
    pub fn shown_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub lead: Option<Member>,
    pub team_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkflowState {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub position: f64,
    #[serde(rename = "type", default)]
    pub state_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueLabel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StateRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub identifier: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<StateRef>,
    #[serde(default)]
    pub assignee: Option<Member>,
    #[serde(default, deserialize_with = "priority_from_number")]
    pub priority: Priority,
    #[serde(default, deserialize_with = "label_nodes")]
    pub labels: Vec<IssueLabel>,
    pub created_at: String,
    pub updated_at: String,
}

/// Tracker priority; the wire value is 0 for none and 1 (urgent) to 4 (low).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Priority {
    #[default]
    None,
    Urgent,
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Self; 5] = [Self::Urgent, Self::High, Self::Medium, Self::Low, Self::None];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(value.trim()))
    }

    pub const fn value(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Urgent => 1,
            Self::High => 2,
            Self::Medium => 3,
            Self::Low => 4,
        }
    }

    pub fn from_value(value: u8) -> Self {
        Self::ALL
            .into_iter()
            .find(|priority| priority.value() == value)
            .unwrap_or_default()
    }
}

/// One narrowing of an issue listing, as picked on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueFilter {
    /// Workflow state by name.
    State(String),
    Priority(Priority),
    /// Label by name.
    Label(String),
    /// Assignee by member id.
    Assignee(String),
    Unassigned,
}

impl IssueFilter {
    /// Parses `state=<name>`, `priority=<level>`, `label=<name>`,
    /// `assignee=<member>` or `unassigned`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("unassigned") {
            return Ok(Self::Unassigned);
        }
        let Some((key, value)) = raw.split_once('=') else {
            bail!("invalid filter {raw:?} -- use key=value, for example label=Bug");
        };
        let value = value.trim();
        if value.is_empty() {
            bail!("filter {raw:?} has no value -- use key=value, for example label=Bug");
        }
        let filter = match key.trim().to_ascii_lowercase().as_str() {
            "state" | "status" => Self::State(value.to_owned()),
            "label" => Self::Label(value.to_owned()),
            "assignee" if value.eq_ignore_ascii_case("unassigned") => Self::Unassigned,
            "assignee" => Self::Assignee(value.to_owned()),
            "priority" => Self::Priority(Priority::parse(value).ok_or_else(|| {
                anyhow!("unknown priority {value:?} -- use urgent, high, medium, low, or none")
            })?),
            other => bail!(
                "unknown filter key {other:?} -- use state, priority, label, assignee, or unassigned"
            ),
        };
        Ok(filter)
    }

    fn apply(&self, filter: &mut Value) {
        match self {
            Self::State(name) => filter["state"] = json!({ "name": { "eq": name } }),
            Self::Priority(priority) => {
                filter["priority"] = json!({ "eq": priority.value() });
            }
            Self::Label(name) => filter["labels"] = json!({ "name": { "eq": name } }),
            Self::Assignee(id) => filter["assignee"] = json!({ "id": { "eq": id } }),
            Self::Unassigned => filter["assignee"] = json!({ "null": { "eq": true } }),
        }
    }
}

/// The `IssueFilter` GraphQL input for a team board. Later filters on the
/// same key replace earlier ones.
pub fn issue_filter(team_id: &str, project_id: Option<&str>, filters: &[IssueFilter]) -> Value {
    let mut filter = json!({ "team": { "id": { "eq": team_id } } });
    if let Some(project_id) = project_id {
        filter["project"] = json!({ "id": { "eq": project_id } });
    }
    for narrowing in filters {
        narrowing.apply(&mut filter);
    }
    filter
}

fn priority_from_number<'de, D>(deserializer: D) -> std::result::Result<Priority, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value
        .filter(|value| (0.0..=4.0).contains(value))
        .map_or(Priority::None, |value| Priority::from_value(value.round() as u8)))
}

fn label_nodes<'de, D>(deserializer: D) -> std::result::Result<Vec<IssueLabel>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Nodes<IssueLabel>>::deserialize(deserializer)?
        .map(|nodes| nodes.nodes)
        .unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub identifier: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Comment {
    pub id: String,
    pub body: String,
}

/// Fields to change on an existing issue; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
}

impl IssueUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.state_id.is_none()
            && self.assignee_id.is_none()
    }
}

/// Tracker records that templates can mention.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerDirectory {
    pub teams: Vec<Team>,
    pub projects: Vec<Project>,
    pub states: Vec<WorkflowState>,
    pub labels: Vec<IssueLabel>,
    pub members: Vec<Member>,
}

impl TrackerDirectory {
    pub fn candidates(&self) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        candidates.extend(
            self.teams
                .iter()
                .map(|team| Candidate::external(ExternalKind::Team, &team.id, &team.name)),
        );
        candidates.extend(
            self.projects
                .iter()
                .map(|project| Candidate::external(ExternalKind::Project, &project.id, &project.name)),
        );
        candidates.extend(
            self.states
                .iter()
                .map(|state| Candidate::external(ExternalKind::WorkflowState, &state.id, &state.name)),
        );
        candidates.extend(
            self.labels
                .iter()
                .map(|label| Candidate::external(ExternalKind::Label, &label.id, &label.name)),
        );
        candidates.extend(self.members.iter().map(|member| {
            Candidate::external(ExternalKind::Member, &member.id, member.shown_name())
        }));
        candidates
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    endpoint: String,
    authorization: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.trim();
        let parsed = Url::parse(endpoint)
            .with_context(|| format!("tracker.endpoint {endpoint:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "tracker.endpoint must use http or https, got {}",
                parsed.scheme()
            );
        }
        let api_key = api_key.trim();
        if api_key.is_empty() {
            bail!("tracker API key is empty -- export it in the variable named by tracker.api_key_env");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            endpoint: endpoint.to_owned(),
            authorization: authorization_header(api_key),
            timeout,
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn viewer(&self) -> Result<Viewer> {
        let data: ViewerData = self.execute("query Viewer { viewer { id name email } }", json!({}))?;
        Ok(data.viewer)
    }

    pub fn list_teams(&self) -> Result<Vec<Team>> {
        let data: TeamsData = self.execute(
            "query Teams { teams { nodes { id name } } }",
            json!({}),
        )?;
        Ok(data.teams.nodes)
    }

    /// Projects, optionally narrowed to those that include `team_id`.
    pub fn list_projects(&self, team_id: Option<&str>) -> Result<Vec<Project>> {
        let data: ProjectsData = self.execute(
            "
            query Projects {
              projects {
                nodes { id name lead { id name displayName } teams { nodes { id name } } }
              }
            }
            ",
            json!({}),
        )?;
        let projects = data
            .projects
            .nodes
            .into_iter()
            .map(|row| Project {
                id: row.id,
                name: row.name,
                lead: row.lead,
                team_ids: row.teams.nodes.into_iter().map(|team| team.id).collect(),
            })
            .filter(|project| team_id.is_none_or(|team| project.team_ids.iter().any(|id| id == team)))
            .collect();
        Ok(projects)
    }

    /// Workflow states of a team in board order.
    pub fn list_workflow_states(&self, team_id: &str) -> Result<Vec<WorkflowState>> {
        let data: TeamStatesData = self.execute(
            "
            query WorkflowStates($teamId: String!) {
              team(id: $teamId) { states { nodes { id name color position type } } }
            }
            ",
            json!({ "teamId": team_id }),
        )?;
        Ok(order_workflow_states(data.team.states.nodes))
    }

    pub fn list_labels(&self, team_id: &str) -> Result<Vec<IssueLabel>> {
        let data: TeamLabelsData = self.execute(
            "
            query Labels($teamId: String!) {
              team(id: $teamId) { labels { nodes { id name color } } }
            }
            ",
            json!({ "teamId": team_id }),
        )?;
        Ok(data.team.labels.nodes)
    }

    pub fn list_members(&self, team_id: &str) -> Result<Vec<Member>> {
        let data: TeamMembersData = self.execute(
            "
            query Members($teamId: String!) {
              team(id: $teamId) { members { nodes { id name displayName } } }
            }
            ",
            json!({ "teamId": team_id }),
        )?;
        Ok(data.team.members.nodes)
    }

    /// The 100 most recently updated issues of a team matching `filters`.
    pub fn list_issues(
        &self,
        team_id: &str,
        project_id: Option<&str>,
        filters: &[IssueFilter],
    ) -> Result<Vec<Issue>> {
        let data: IssuesData = self.execute(
            "
            query Issues($filter: IssueFilter) {
              issues(filter: $filter, first: 100, orderBy: updatedAt) {
                nodes {
                  id identifier title description priority
                  state { id name color }
                  labels { nodes { id name color } }
                  assignee { id name displayName }
                  createdAt updatedAt
                }
              }
            }
            ",
            json!({ "filter": issue_filter(team_id, project_id, filters) }),
        )?;
        Ok(data.issues.nodes)
    }

    /// Teams, plus the team-scoped records when a team is chosen.
    pub fn load_directory(&self, team_id: Option<&str>) -> Result<TrackerDirectory> {
        let mut directory = TrackerDirectory {
            teams: self.list_teams()?,
            ..TrackerDirectory::default()
        };
        if let Some(team_id) = team_id {
            directory.projects = self.list_projects(Some(team_id))?;
            directory.states = self.list_workflow_states(team_id)?;
            directory.labels = self.list_labels(team_id)?;
            directory.members = self.list_members(team_id)?;
        }
        Ok(directory)
    }

    pub fn create_issue(&self, draft: &IssueDraft) -> Result<CreatedIssue> {
        if draft.title.trim().is_empty() {
            bail!("issue title is empty -- check the default title template");
        }
        let mut input = json!({
            "teamId": draft.team_id,
            "title": draft.title,
            "description": draft.description,
        });
        if let Some(project_id) = &draft.project_id {
            input["projectId"] = json!(project_id);
        }
        if let Some(state_id) = &draft.state_id {
            input["stateId"] = json!(state_id);
        }
        if !draft.label_ids.is_empty() {
            input["labelIds"] = json!(draft.label_ids);
        }
        if let Some(assignee_id) = &draft.assignee_id {
            input["assigneeId"] = json!(assignee_id);
        }

        let data: IssueCreateData = self.execute(
            "
            mutation IssueCreate($input: IssueCreateInput!) {
              issueCreate(input: $input) { success issue { id identifier url } }
            }
            ",
            json!({ "input": input }),
        )?;
        let payload = data.issue_create;
        match payload.issue {
            Some(issue) if payload.success => {
                tracing::info!(identifier = %issue.identifier, kind = draft.kind.as_str(), "issue created");
                Ok(issue)
            }
            _ => bail!("tracker did not create the issue -- check the team and project settings"),
        }
    }

    pub fn update_issue(&self, issue_id: &str, update: &IssueUpdate) -> Result<()> {
        if update.is_empty() {
            bail!("nothing to update on issue {issue_id}");
        }
        let data: IssueUpdateData = self.execute(
            "
            mutation IssueUpdate($id: String!, $input: IssueUpdateInput!) {
              issueUpdate(id: $id, input: $input) { success }
            }
            ",
            json!({ "id": issue_id, "input": update }),
        )?;
        if !data.issue_update.success {
            bail!("tracker refused to update issue {issue_id}");
        }
        Ok(())
    }

    pub fn delete_issue(&self, issue_id: &str) -> Result<()> {
        let data: IssueDeleteData = self.execute(
            "
            mutation IssueDelete($id: String!) {
              issueDelete(id: $id) { success }
            }
            ",
            json!({ "id": issue_id }),
        )?;
        if !data.issue_delete.success {
            bail!("tracker refused to delete issue {issue_id}");
        }
        Ok(())
    }

    pub fn create_comment(&self, issue_id: &str, body: &str) -> Result<Comment> {
        let body = body.trim();
        if body.is_empty() {
            bail!("comment body is empty -- write something before posting");
        }
        let data: CommentCreateData = self.execute(
            "
            mutation CommentCreate($input: CommentCreateInput!) {
              commentCreate(input: $input) { success comment { id body } }
            }
            ",
            json!({ "input": { "issueId": issue_id, "body": body } }),
        )?;
        let payload = data.comment_create;
        match payload.comment {
            Some(comment) if payload.success => Ok(comment),
            _ => bail!("tracker did not create the comment on issue {issue_id}"),
        }
    }

    fn execute<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        tracing::debug!(operation = operation_name(query), "tracker request");
        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .map_err(|error| connection_error(&self.endpoint, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let envelope: GraphqlResponse<T> =
            response.json().context("decode tracker response")?;
        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            let message = errors
                .into_iter()
                .map(|error| error.message)
                .collect::<Vec<_>>()
                .join("; ");
            tracing::warn!(operation = operation_name(query), %message, "tracker rejected request");
            bail!("tracker rejected the request: {message}");
        }
        envelope
            .data
            .ok_or_else(|| anyhow!("tracker response carried no data"))
    }
}

/// Personal keys go in the header as-is; anything else is an OAuth token.
pub fn authorization_header(api_key: &str) -> String {
    if api_key.starts_with(PERSONAL_KEY_PREFIX) {
        api_key.to_owned()
    } else {
        format!("Bearer {api_key}")
    }
}

/// Board column group: backlog, unstarted, started, completed, canceled.
/// Unknown types are bucketed by their relative position among all states.
pub fn state_group(state: &WorkflowState, states: &[WorkflowState]) -> usize {
    match state.state_type.to_ascii_lowercase().as_str() {
        "backlog" => 0,
        "unstarted" => 1,
        "started" => 2,
        "completed" => 3,
        "canceled" => 4,
        _ if states.len() <= 1 => 1,
        _ => {
            let mut positions = states.iter().map(|s| s.position).collect::<Vec<_>>();
            positions.sort_by(f64::total_cmp);
            let index = positions
                .iter()
                .position(|position| *position == state.position)
                .unwrap_or_default();
            (index * 5 / states.len()).min(4)
        }
    }
}

pub fn order_workflow_states(states: Vec<WorkflowState>) -> Vec<WorkflowState> {
    let mut keyed = states
        .iter()
        .map(|state| (state_group(state, &states), state.clone()))
        .collect::<Vec<_>>();
    keyed.sort_by(|(left_group, left), (right_group, right)| {
        left_group
            .cmp(right_group)
            .then(left.position.total_cmp(&right.position))
    });
    keyed.into_iter().map(|(_, state)| state).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardColumn {
    pub state: WorkflowState,
    pub issues: Vec<Issue>,
}

pub const OTHER_COLUMN_NAME: &str = "Other";

/// Groups issues into one column per workflow state, keeping state order.
/// Issues in a state outside `states` land in a trailing "Other" column.
pub fn board_columns(states: &[WorkflowState], issues: Vec<Issue>) -> Vec<BoardColumn> {
    let mut columns = states
        .iter()
        .map(|state| BoardColumn {
            state: state.clone(),
            issues: Vec::new(),
        })
        .collect::<Vec<_>>();
    let mut other = Vec::new();
    for issue in issues {
        let column = issue.state.as_ref().and_then(|state| {
            columns
                .iter_mut()
                .find(|column| column.state.id == state.id)
        });
        match column {
            Some(column) => column.issues.push(issue),
            None => {
                tracing::warn!(issue = %issue.identifier, "issue state is not on the board");
                other.push(issue);
            }
        }
    }
    if !other.is_empty() {
        columns.push(BoardColumn {
            state: WorkflowState {
                id: String::new(),
                name: OTHER_COLUMN_NAME.to_owned(),
                color: String::new(),
                position: f64::MAX,
                state_type: String::new(),
            },
            issues: other,
        });
    }
    columns
}

fn operation_name(query: &str) -> &str {
    query
        .split_whitespace()
        .nth(1)
        .map(|word| word.split(['(', '{']).next().unwrap_or(word))
        .unwrap_or("anonymous")
}

fn connection_error(endpoint: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach tracker at {} -- check tracker.endpoint and your network ({})",
        endpoint,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<GraphqlResponse<Value>>(body)
        && let Some(errors) = parsed.errors
        && let Some(first) = errors.into_iter().next()
        && !first.message.is_empty()
    {
        return anyhow!("tracker error ({}): {}", status.as_u16(), first.message);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return anyhow!(
            "tracker rejected the API key ({}) -- check the variable named by tracker.api_key_env",
            status.as_u16()
        );
    }

    if body.len() < 100 && !body.contains('{') {
        return anyhow!("tracker error ({}): {}", status.as_u16(), body);
    }

    anyhow!("tracker returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ViewerData {
    viewer: Viewer,
}

#[derive(Debug, Deserialize)]
struct TeamsData {
    teams: Nodes<Team>,
}

#[derive(Debug, Deserialize)]
struct ProjectsData {
    projects: Nodes<ProjectRow>,
}

#[derive(Debug, Deserialize)]
struct ProjectRow {
    id: String,
    name: String,
    #[serde(default)]
    lead: Option<Member>,
    teams: Nodes<Team>,
}

#[derive(Debug, Deserialize)]
struct TeamStatesData {
    team: TeamStates,
}

#[derive(Debug, Deserialize)]
struct TeamStates {
    states: Nodes<WorkflowState>,
}

#[derive(Debug, Deserialize)]
struct TeamLabelsData {
    team: TeamLabels,
}

#[derive(Debug, Deserialize)]
struct TeamLabels {
    labels: Nodes<IssueLabel>,
}

#[derive(Debug, Deserialize)]
struct TeamMembersData {
    team: TeamMembers,
}

#[derive(Debug, Deserialize)]
struct TeamMembers {
    members: Nodes<Member>,
}

#[derive(Debug, Deserialize)]
struct IssuesData {
    issues: Nodes<Issue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueCreateData {
    issue_create: IssuePayload,
}

#[derive(Debug, Deserialize)]
struct IssuePayload {
    success: bool,
    issue: Option<CreatedIssue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueUpdateData {
    issue_update: SuccessPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueDeleteData {
    issue_delete: SuccessPayload,
}

#[derive(Debug, Deserialize)]
struct SuccessPayload {
    success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentCreateData {
    comment_create: CommentPayload,
}

#[derive(Debug, Deserialize)]
struct CommentPayload {
    success: bool,
    comment: Option<Comment>,
}

#[cfg(test)]
mod tests {
    use super::{
        Issue, IssueFilter, OTHER_COLUMN_NAME, Priority, StateRef, WorkflowState,
        authorization_header, board_columns, issue_filter, operation_name, order_workflow_states,
    };
    use serde_json::json;

    fn state(id: &str, state_type: &str, position: f64) -> WorkflowState {
        WorkflowState {
            id: id.to_owned(),
            name: id.to_owned(),
            color: String::new(),
            position,
            state_type: state_type.to_owned(),
        }
    }

    fn issue(identifier: &str, state_id: &str) -> Issue {
        Issue {
            id: identifier.to_lowercase(),
            identifier: identifier.to_owned(),
            title: identifier.to_owned(),
            description: None,
            state: Some(StateRef {
                id: state_id.to_owned(),
                name: state_id.to_owned(),
                color: String::new(),
            }),
            assignee: None,
            priority: Priority::None,
            labels: Vec::new(),
            created_at: "2026-02-19T12:34:56Z".to_owned(),
            updated_at: "2026-02-19T12:34:56Z".to_owned(),
        }
    }

    fn ids(states: &[WorkflowState]) -> Vec<&str> {
        states.iter().map(|state| state.id.as_str()).collect()
    }

    #[test]
    fn personal_keys_are_sent_raw() {
        assert_eq!(authorization_header("lin_api_123"), "lin_api_123");
        assert_eq!(authorization_header("oauth-token"), "Bearer oauth-token");
    }

    #[test]
    fn states_follow_type_order_then_position() {
        let ordered = order_workflow_states(vec![
            state("done", "completed", 3.0),
            state("todo", "unstarted", 1.0),
            state("wip-b", "started", 5.0),
            state("wip-a", "started", 2.0),
            state("icebox", "backlog", 9.0),
            state("dropped", "canceled", 0.0),
        ]);
        assert_eq!(
            ids(&ordered),
            vec!["icebox", "todo", "wip-a", "wip-b", "done", "dropped"]
        );
    }

    #[test]
    fn unknown_types_bucket_by_relative_position() {
        let ordered = order_workflow_states(vec![
            state("late", "custom", 4.0),
            state("early", "custom", 0.0),
            state("todo", "unstarted", 2.0),
        ]);
        // early: index 0 -> group 0; late: index 2 -> 2*5/3 = 3
        assert_eq!(ids(&ordered), vec!["early", "todo", "late"]);
    }

    #[test]
    fn lone_unknown_state_counts_as_unstarted() {
        let ordered = order_workflow_states(vec![state("only", "mystery", 7.0)]);
        assert_eq!(ids(&ordered), vec!["only"]);
        assert_eq!(super::state_group(&ordered[0], &ordered), 1);
    }

    #[test]
    fn board_groups_issues_by_state() {
        let states = vec![state("todo", "unstarted", 0.0), state("done", "completed", 1.0)];
        let columns = board_columns(
            &states,
            vec![issue("ENG-1", "done"), issue("ENG-2", "todo"), issue("ENG-3", "gone")],
        );
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].issues[0].identifier, "ENG-2");
        assert_eq!(columns[1].issues[0].identifier, "ENG-1");
        assert_eq!(columns[2].state.name, OTHER_COLUMN_NAME);
        assert_eq!(columns[2].issues[0].identifier, "ENG-3");
    }

    #[test]
    fn board_has_no_other_column_when_every_state_is_known() {
        let states = vec![state("todo", "unstarted", 0.0)];
        let columns = board_columns(&states, vec![issue("ENG-1", "todo")]);
        assert_eq!(columns.len(), 1);
    }

    #[test]
    fn filters_parse_from_key_value_pairs() {
        assert_eq!(
            IssueFilter::parse("label=Bug").ok(),
            Some(IssueFilter::Label("Bug".to_owned()))
        );
        assert_eq!(
            IssueFilter::parse("Priority=HIGH").ok(),
            Some(IssueFilter::Priority(Priority::High))
        );
        assert_eq!(
            IssueFilter::parse("status=In Progress").ok(),
            Some(IssueFilter::State("In Progress".to_owned()))
        );
        assert_eq!(
            IssueFilter::parse("assignee=unassigned").ok(),
            Some(IssueFilter::Unassigned)
        );
        assert_eq!(IssueFilter::parse("unassigned").ok(), Some(IssueFilter::Unassigned));

        for bad in ["label", "label=", "priority=p0", "color=red"] {
            assert!(IssueFilter::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn filter_json_narrows_the_team_query() {
        let filter = issue_filter(
            "team-1",
            Some("proj-1"),
            &[
                IssueFilter::Priority(Priority::Urgent),
                IssueFilter::Label("Bug".to_owned()),
                IssueFilter::Unassigned,
            ],
        );
        assert_eq!(
            filter,
            json!({
                "team": { "id": { "eq": "team-1" } },
                "project": { "id": { "eq": "proj-1" } },
                "priority": { "eq": 1 },
                "labels": { "name": { "eq": "Bug" } },
                "assignee": { "null": { "eq": true } },
            })
        );
    }

    #[test]
    fn priority_levels_map_to_wire_values() {
        assert_eq!(Priority::None.value(), 0);
        assert_eq!(Priority::Low.value(), 4);
        assert_eq!(Priority::from_value(2), Priority::High);
        assert_eq!(Priority::from_value(9), Priority::None);
    }

    #[test]
    fn operation_names_come_from_the_query() {
        assert_eq!(operation_name("query Teams { teams { nodes { id } } }"), "Teams");
        assert_eq!(
            operation_name("mutation IssueDelete($id: String!) { x }"),
            "IssueDelete"
        );
    }
}
