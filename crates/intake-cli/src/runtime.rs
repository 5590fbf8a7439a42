// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use intake_app::{Candidate, FormDefinition, FormId, TrackerSettings};
use intake_db::Store;
use intake_tracker::Client;
use intake_tui::InternalEvent;
use std::sync::mpsc::Sender;
use std::thread;

pub struct DbRuntime<'a> {
    store: &'a Store,
    client: Option<Client>,
    form_id: Option<FormId>,
    offline_candidates: Vec<Candidate>,
}

impl<'a> DbRuntime<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            client: None,
            form_id: None,
            offline_candidates: Vec::new(),
        }
    }

    pub fn with_client(mut self, client: Option<Client>) -> Self {
        self.client = client;
        self
    }

    /// Saves go to `form_id` instead of creating a new form.
    pub fn editing(mut self, form_id: Option<FormId>) -> Self {
        self.form_id = form_id;
        self
    }

    /// Candidates served when no tracker client is configured.
    pub fn with_offline_candidates(mut self, candidates: Vec<Candidate>) -> Self {
        self.offline_candidates = candidates;
        self
    }

    pub fn form_id(&self) -> Option<FormId> {
        self.form_id
    }
}

fn fetch_candidates(client: &Client, team_id: Option<&str>) -> Result<Vec<Candidate>> {
    Ok(client.load_directory(team_id)?.candidates())
}

impl intake_tui::AppRuntime for DbRuntime<'_> {
    fn save_form(&mut self, form: &FormDefinition, settings: &TrackerSettings) -> Result<FormId> {
        let id = match self.form_id {
            Some(id) => {
                self.store.update_form(id, form, settings)?;
                id
            }
            None => self.store.save_form(form, settings)?,
        };
        self.form_id = Some(id);
        tracing::info!(form = id.get(), "form saved");
        Ok(id)
    }

    fn load_candidates(&mut self, team_id: Option<&str>) -> Result<Vec<Candidate>> {
        match &self.client {
            Some(client) => fetch_candidates(client, team_id),
            None if !self.offline_candidates.is_empty() => Ok(self.offline_candidates.clone()),
            None => bail!(
                "tracker is not configured -- export the variable named by tracker.api_key_env"
            ),
        }
    }

    fn spawn_candidate_load(
        &mut self,
        request_id: u64,
        team_id: Option<String>,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let Some(client) = self.client.clone() else {
            let result = self
                .load_candidates(team_id.as_deref())
                .map_err(|error| format!("{error:#}"));
            return tx
                .send(InternalEvent::Candidates { request_id, result })
                .map_err(|_| anyhow!("candidate event channel closed"));
        };

        thread::Builder::new()
            .name("intake-candidates".to_owned())
            .spawn(move || {
                let result = fetch_candidates(&client, team_id.as_deref())
                    .map_err(|error| format!("{error:#}"));
                if tx
                    .send(InternalEvent::Candidates { request_id, result })
                    .is_err()
                {
                    tracing::debug!(request_id, "candidate response arrived after exit");
                }
            })
            .map_err(|error| anyhow!("spawn candidate loader: {error}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::DbRuntime;
    use anyhow::{Result, anyhow};
    use intake_app::{FieldType, FormDefinition, TrackerSettings};
    use intake_db::Store;
    use intake_testkit::IntakeFaker;
    use intake_tracker::Client;
    use intake_tui::{AppRuntime, InternalEvent};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};

    fn store() -> Result<Store> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        Ok(store)
    }

    #[test]
    fn first_save_creates_and_later_saves_update() -> Result<()> {
        let store = store()?;
        let mut runtime = DbRuntime::new(&store);
        let mut form = FormDefinition::new("Feature Requests");

        let first = runtime.save_form(&form, &TrackerSettings::default())?;
        form.add_field(FieldType::Email);
        let second = runtime.save_form(&form, &TrackerSettings::default())?;

        assert_eq!(first, second);
        assert_eq!(runtime.form_id(), Some(first));
        let forms = store.list_forms()?;
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].field_count, 3);
        Ok(())
    }

    #[test]
    fn editing_an_existing_form_updates_it() -> Result<()> {
        let store = store()?;
        let id = store.save_form(&FormDefinition::default(), &TrackerSettings::default())?;

        let mut runtime = DbRuntime::new(&store).editing(Some(id));
        let renamed = FormDefinition::new("Bug Reports");
        assert_eq!(runtime.save_form(&renamed, &TrackerSettings::default())?, id);
        assert_eq!(store.load_form(id)?.form.name, "Bug Reports");
        Ok(())
    }

    #[test]
    fn missing_tracker_is_an_actionable_error() -> Result<()> {
        let store = store()?;
        let mut runtime = DbRuntime::new(&store);
        let error = runtime
            .load_candidates(None)
            .expect_err("no tracker configured");
        assert!(error.to_string().contains("tracker.api_key_env"));
        Ok(())
    }

    #[test]
    fn offline_candidates_arrive_through_the_channel() -> Result<()> {
        let store = store()?;
        let candidates = IntakeFaker::new(4).tracker_candidates();
        let mut runtime = DbRuntime::new(&store).with_offline_candidates(candidates.clone());

        let (tx, rx) = mpsc::channel();
        runtime.spawn_candidate_load(3, None, tx)?;
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1))?,
            InternalEvent::Candidates {
                request_id: 3,
                result: Ok(candidates),
            }
        );
        Ok(())
    }

    #[test]
    fn tracker_candidates_load_on_a_worker_thread() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let endpoint = format!("http://{}/graphql", server.server_addr());
        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            let response = Response::from_string(
                r#"{"data":{"teams":{"nodes":[{"id":"t1","name":"Platform"}]}}}"#,
            )
            .with_header(
                Header::from_bytes("Content-Type", "application/json")
                    .expect("valid content type header"),
            );
            request.respond(response).expect("response should succeed");
        });

        let store = store()?;
        let client = Client::new(&endpoint, "lin_key", Duration::from_secs(1))?;
        let mut runtime = DbRuntime::new(&store).with_client(Some(client));

        let (tx, rx) = mpsc::channel();
        runtime.spawn_candidate_load(9, None, tx)?;
        let event = rx.recv_timeout(Duration::from_secs(5))?;
        handle.join().expect("server thread should join");

        let (request_id, result) = match event {
            InternalEvent::Candidates { request_id, result } => (request_id, result),
            other => panic!("expected candidates event, got {other:?}"),
        };
        assert_eq!(request_id, 9);
        let candidates = result.map_err(|error| anyhow!(error))?;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].label, "Platform");
        Ok(())
    }

    #[test]
    fn tracker_failures_are_reported_not_raised() -> Result<()> {
        let store = store()?;
        let client = Client::new("http://127.0.0.1:1/graphql", "lin_key", Duration::from_millis(50))?;
        let mut runtime = DbRuntime::new(&store).with_client(Some(client));

        let (tx, rx) = mpsc::channel();
        runtime.spawn_candidate_load(1, Some("t1".to_owned()), tx)?;
        match rx.recv_timeout(Duration::from_secs(5))? {
            InternalEvent::Candidates { result: Err(message), .. } => {
                assert!(message.contains("check tracker.endpoint"));
            }
            other => panic!("expected failed candidates, got {other:?}"),
        }
        Ok(())
    }
}
