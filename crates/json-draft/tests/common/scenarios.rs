use json_draft::{Draft, DraftConfig, ProvenancePolicy, Session, Value};

pub struct Scenario {
    pub session: Session,
    pub base: Value,
    pub draft: Draft,
}

impl Scenario {
    pub fn new(json: serde_json::Value) -> Self {
        Self::with_config(json, DraftConfig::default())
    }

    pub fn with_policy(json: serde_json::Value, provenance: ProvenancePolicy) -> Self {
        let config = DraftConfig {
            provenance,
            ..DraftConfig::default()
        };
        Self::with_config(json, config)
    }

    pub fn with_config(json: serde_json::Value, config: DraftConfig) -> Self {
        let session = Session::new(config);
        let base = Value::from(json);
        let draft = session
            .create_draft(&base)
            .unwrap_or_else(|e| panic!("create_draft failed: {e}"));
        Self {
            session,
            base,
            draft,
        }
    }

    /// Walk `path` from the root draft, returning the nested draft at its end.
    pub fn nested(&self, path: &[&str]) -> Draft {
        let mut current = Value::Draft(self.draft.clone());
        for key in path {
            current = current
                .get(key)
                .unwrap_or_else(|e| panic!("get {key:?} failed: {e}"));
        }
        match current {
            Value::Draft(draft) => draft,
            other => panic!("expected a draft at {path:?}, got {other:?}"),
        }
    }

    /// Base value at `path`.
    pub fn base_at(&self, path: &[&str]) -> Value {
        let mut current = self.base.clone();
        for key in path {
            current = current.get(key).unwrap_or_default();
        }
        current
    }

    pub fn finish(&self) -> Value {
        self.session
            .finish(&self.draft)
            .unwrap_or_else(|e| panic!("finish failed: {e}"))
    }
}
