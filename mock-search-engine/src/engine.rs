//! The in-memory engine.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use search_deploy_repository::{
    AliasProvider, BulkImportResult, BulkItemResult, IndexProvider, RiverProvider,
    SearchIndexError,
};
use search_deploy_shared::Document;

/// A mutating call recorded by the engine, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateIndex(String),
    DeleteIndex(String),
    PutMapping(String),
    Bulk { index: String, documents: usize },
    Refresh(String),
    CreateAlias { alias: String, index: String },
    SwapAlias { alias: String, from: String, to: String },
    PutRiver(String),
    DeleteRiver(String),
}

/// Calls that can be made to fail with a remote operation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailPoint {
    CreateIndex,
    DeleteIndex,
    Bulk,
    Refresh,
    CreateAlias,
    SwapAlias,
    PutRiver,
    DeleteRiver,
    Count,
}

#[derive(Debug, Default)]
struct IndexState {
    mapping: Value,
    /// Documents visible to counts.
    documents: BTreeMap<String, Value>,
    /// Documents indexed since the last refresh.
    pending: BTreeMap<String, Value>,
}

#[derive(Debug, Default)]
struct EngineState {
    indices: BTreeMap<String, IndexState>,
    aliases: BTreeMap<String, BTreeSet<String>>,
    rivers: BTreeMap<String, Value>,
    operations: Vec<Operation>,
    next_id: u64,
}

impl EngineState {
    /// Concrete indices a name refers to: the index itself, or an alias' targets.
    fn resolve(&self, name: &str) -> Result<Vec<String>, SearchIndexError> {
        if self.indices.contains_key(name) {
            return Ok(vec![name.to_string()]);
        }
        match self.aliases.get(name) {
            Some(targets) => Ok(targets.iter().cloned().collect()),
            None => Err(SearchIndexError::index_not_found(name)),
        }
    }

    fn index_mut(&mut self, name: &str) -> Result<&mut IndexState, SearchIndexError> {
        self.indices
            .get_mut(name)
            .ok_or_else(|| SearchIndexError::index_not_found(name))
    }
}

#[derive(Debug, Default)]
struct Faults {
    unreachable: bool,
    fail_points: BTreeSet<FailPoint>,
    rejected_documents: BTreeSet<String>,
    rejected_mapping_fields: BTreeSet<String>,
    /// Index a simulated concurrent deployer adds to an alias right after
    /// this engine changes it.
    concurrent_alias_target: Option<String>,
}

/// An in-memory search service.
pub struct InMemorySearchEngine {
    endpoint: String,
    state: Mutex<EngineState>,
    faults: Faults,
}

impl InMemorySearchEngine {
    /// Create an empty engine answering on `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            state: Mutex::new(EngineState::default()),
            faults: Faults::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut EngineState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an empty index.
    pub fn with_index(mut self, name: &str) -> Self {
        self.state_mut()
            .indices
            .insert(name.to_string(), IndexState::default());
        self
    }

    /// Seed an index holding already-visible documents.
    pub fn with_documents(mut self, name: &str, documents: &[Value]) -> Self {
        let state = self.state_mut();
        let index = state.indices.entry(name.to_string()).or_default();
        for (i, doc) in documents.iter().enumerate() {
            index.documents.insert(format!("seed-{}", i), doc.clone());
        }
        self
    }

    /// Seed an alias with the given targets (which need not be consistent).
    pub fn with_alias(mut self, alias: &str, targets: &[&str]) -> Self {
        self.state_mut().aliases.insert(
            alias.to_string(),
            targets.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    /// Seed a river.
    pub fn with_river(mut self, name: &str, meta: Value) -> Self {
        self.state_mut().rivers.insert(name.to_string(), meta);
        self
    }

    /// Make every call fail with a connection error.
    pub fn unreachable(mut self) -> Self {
        self.faults.unreachable = true;
        self
    }

    /// Make one kind of call fail with a remote operation error.
    pub fn fail_on(mut self, point: FailPoint) -> Self {
        self.faults.fail_points.insert(point);
        self
    }

    /// Reject the document with this id in bulk requests.
    pub fn reject_document(mut self, id: &str) -> Self {
        self.faults.rejected_documents.insert(id.to_string());
        self
    }

    /// Reject mappings that define this field.
    pub fn reject_mapping_field(mut self, field: &str) -> Self {
        self.faults.rejected_mapping_fields.insert(field.to_string());
        self
    }

    /// After each alias change made through this engine, also add `index`
    /// to the alias, as a racing deployer would.
    pub fn with_concurrent_alias_writer(mut self, index: &str) -> Self {
        self.faults.concurrent_alias_target = Some(index.to_string());
        self
    }

    fn check(&self, point: Option<FailPoint>) -> Result<(), SearchIndexError> {
        if self.faults.unreachable {
            return Err(SearchIndexError::connection("connection refused"));
        }
        if let Some(point) = point {
            if self.faults.fail_points.contains(&point) {
                return Err(SearchIndexError::remote(format!(
                    "{:?} failed with status 500: injected failure",
                    point
                )));
            }
        }
        Ok(())
    }

    fn after_alias_change(&self, state: &mut EngineState, alias: &str) {
        if let Some(ref index) = self.faults.concurrent_alias_target {
            if let Some(targets) = state.aliases.get_mut(alias) {
                targets.insert(index.clone());
            }
        }
    }

    // Inspection helpers for assertions.

    /// Names of all indices.
    pub fn indices(&self) -> Vec<String> {
        self.state().indices.keys().cloned().collect()
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.state().indices.contains_key(name)
    }

    /// Targets of an alias, sorted.
    pub fn alias_targets(&self, alias: &str) -> Option<Vec<String>> {
        self.state()
            .aliases
            .get(alias)
            .map(|targets| targets.iter().cloned().collect())
    }

    /// Visible documents of an index, keyed by id.
    pub fn documents(&self, index: &str) -> BTreeMap<String, Value> {
        self.state()
            .indices
            .get(index)
            .map(|i| i.documents.clone())
            .unwrap_or_default()
    }

    /// Stored mapping of an index.
    pub fn mapping(&self, index: &str) -> Option<Value> {
        self.state().indices.get(index).map(|i| i.mapping.clone())
    }

    /// `_meta` document of a river.
    pub fn river(&self, name: &str) -> Option<Value> {
        self.state().rivers.get(name).cloned()
    }

    /// Names of all rivers.
    pub fn rivers(&self) -> Vec<String> {
        self.state().rivers.keys().cloned().collect()
    }

    /// Every mutating call so far, in order.
    pub fn operations(&self) -> Vec<Operation> {
        self.state().operations.clone()
    }
}

fn merge_properties(target: &mut Value, mapping: &Value) {
    if !target.is_object() {
        *target = json!({});
    }
    if let (Some(target), Some(source)) = (target.as_object_mut(), mapping.as_object()) {
        for (key, value) in source {
            match (key.as_str(), value) {
                ("properties", Value::Object(props)) => {
                    let entry = target
                        .entry("properties")
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Some(existing) = entry.as_object_mut() {
                        for (field, definition) in props {
                            existing.insert(field.clone(), definition.clone());
                        }
                    }
                }
                _ => {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

#[async_trait]
impl IndexProvider for InMemorySearchEngine {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn ping(&self) -> Result<(), SearchIndexError> {
        self.check(None)
    }

    async fn create_index(&self, name: &str, body: &Value) -> Result<(), SearchIndexError> {
        self.check(Some(FailPoint::CreateIndex))?;
        let mut state = self.state();

        if state.indices.contains_key(name) || state.aliases.contains_key(name) {
            return Err(SearchIndexError::remote(format!(
                "create index failed with status 400: resource_already_exists_exception: index [{}] already exists",
                name
            )));
        }

        state.indices.insert(
            name.to_string(),
            IndexState {
                mapping: body.get("mappings").cloned().unwrap_or_else(|| json!({})),
                ..Default::default()
            },
        );
        state.operations.push(Operation::CreateIndex(name.to_string()));
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<(), SearchIndexError> {
        self.check(Some(FailPoint::DeleteIndex))?;
        let mut state = self.state();

        if state.indices.remove(name).is_none() {
            return Err(SearchIndexError::index_not_found(name));
        }
        // Deleting an index drops it from every alias
        for targets in state.aliases.values_mut() {
            targets.remove(name);
        }
        state.aliases.retain(|_, targets| !targets.is_empty());
        state.operations.push(Operation::DeleteIndex(name.to_string()));
        Ok(())
    }

    async fn index_exists(&self, name: &str) -> Result<bool, SearchIndexError> {
        self.check(None)?;
        Ok(self.state().indices.contains_key(name))
    }

    async fn list_indices(&self) -> Result<BTreeSet<String>, SearchIndexError> {
        self.check(None)?;
        let state = self.state();
        let mut names: BTreeSet<String> = state.indices.keys().cloned().collect();
        if !state.rivers.is_empty() {
            names.insert("_river".to_string());
        }
        Ok(names)
    }

    async fn put_mapping(&self, name: &str, mapping: &Value) -> Result<(), SearchIndexError> {
        self.check(None)?;

        if let Some(Value::Object(props)) = mapping.get("properties") {
            if let Some(field) = props
                .keys()
                .find(|f| self.faults.rejected_mapping_fields.contains(*f))
            {
                return Err(SearchIndexError::remote(format!(
                    "put mapping failed with status 400: illegal_argument_exception: mapper [{}] cannot be changed",
                    field
                )));
            }
        }

        let mut state = self.state();
        merge_properties(&mut state.index_mut(name)?.mapping, mapping);
        state.operations.push(Operation::PutMapping(name.to_string()));
        Ok(())
    }

    async fn bulk_index(
        &self,
        name: &str,
        documents: &[Document],
    ) -> Result<BulkImportResult, SearchIndexError> {
        self.check(Some(FailPoint::Bulk))?;
        let mut state = self.state();
        state.index_mut(name)?;

        let mut results = Vec::with_capacity(documents.len());
        for doc in documents {
            let id = match doc.id {
                Some(ref id) => id.clone(),
                None => {
                    state.next_id += 1;
                    format!("auto-{}", state.next_id)
                }
            };

            if self.faults.rejected_documents.contains(&id) {
                results.push(BulkItemResult::failed(
                    Some(id),
                    "mapper_parsing_exception: failed to parse document",
                ));
                continue;
            }

            state.index_mut(name)?.pending.insert(id.clone(), doc.source());
            results.push(BulkItemResult::succeeded(Some(id)));
        }

        state.operations.push(Operation::Bulk {
            index: name.to_string(),
            documents: documents.len(),
        });
        Ok(BulkImportResult::from_results(results))
    }

    async fn refresh(&self, name: &str) -> Result<(), SearchIndexError> {
        self.check(Some(FailPoint::Refresh))?;
        let mut state = self.state();

        for index in state.resolve(name)? {
            let index = state.index_mut(&index)?;
            let pending = std::mem::take(&mut index.pending);
            index.documents.extend(pending);
        }
        state.operations.push(Operation::Refresh(name.to_string()));
        Ok(())
    }

    async fn count(&self, name: &str) -> Result<u64, SearchIndexError> {
        self.check(Some(FailPoint::Count))?;
        let state = self.state();

        let total = state
            .resolve(name)?
            .iter()
            .filter_map(|index| state.indices.get(index))
            .map(|index| index.documents.len() as u64)
            .sum();
        Ok(total)
    }

    async fn service_info(&self) -> Result<String, SearchIndexError> {
        self.check(None)?;
        Ok(json!({
            "name": "in-memory",
            "cluster_name": "mock-search-engine",
            "version": { "distribution": "mock", "number": "0.0.0" },
            "tagline": "The OpenSearch Project: https://opensearch.org/"
        })
        .to_string())
    }

    async fn get_mapping(&self, name: &str) -> Result<String, SearchIndexError> {
        self.check(None)?;
        let state = self.state();

        let mut body = Map::new();
        for index in state.resolve(name)? {
            if let Some(i) = state.indices.get(&index) {
                body.insert(index.clone(), json!({ "mappings": i.mapping }));
            }
        }
        serde_json::to_string_pretty(&body)
            .map_err(|e| SearchIndexError::response_parse(e.to_string()))
    }
}

#[async_trait]
impl AliasProvider for InMemorySearchEngine {
    async fn get_alias(&self, alias: &str) -> Result<Option<Vec<String>>, SearchIndexError> {
        self.check(None)?;
        Ok(self.alias_targets(alias).filter(|t| !t.is_empty()))
    }

    async fn create_alias(&self, alias: &str, index: &str) -> Result<(), SearchIndexError> {
        self.check(Some(FailPoint::CreateAlias))?;
        let mut state = self.state();

        if state.indices.contains_key(alias) {
            return Err(SearchIndexError::remote(format!(
                "create alias failed with status 400: invalid_alias_name_exception: an index exists with the same name as the alias [{}]",
                alias
            )));
        }
        state.index_mut(index)?;

        state
            .aliases
            .entry(alias.to_string())
            .or_default()
            .insert(index.to_string());
        state.operations.push(Operation::CreateAlias {
            alias: alias.to_string(),
            index: index.to_string(),
        });
        self.after_alias_change(&mut state, alias);
        Ok(())
    }

    async fn swap_alias(&self, alias: &str, from: &str, to: &str) -> Result<(), SearchIndexError> {
        self.check(Some(FailPoint::SwapAlias))?;
        let mut state = self.state();

        state.index_mut(to)?;
        let bound = state
            .aliases
            .get(alias)
            .is_some_and(|targets| targets.contains(from));
        if !bound {
            return Err(SearchIndexError::remote(format!(
                "swap alias failed with status 404: aliases_not_found_exception: aliases [{}] missing on [{}]",
                alias, from
            )));
        }

        if let Some(targets) = state.aliases.get_mut(alias) {
            targets.remove(from);
            targets.insert(to.to_string());
        }
        state.operations.push(Operation::SwapAlias {
            alias: alias.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        });
        self.after_alias_change(&mut state, alias);
        Ok(())
    }
}

#[async_trait]
impl RiverProvider for InMemorySearchEngine {
    async fn put_river(&self, name: &str, meta: &Value) -> Result<(), SearchIndexError> {
        self.check(Some(FailPoint::PutRiver))?;
        let mut state = self.state();
        state.rivers.insert(name.to_string(), meta.clone());
        state.operations.push(Operation::PutRiver(name.to_string()));
        Ok(())
    }

    async fn delete_river(&self, name: &str) -> Result<bool, SearchIndexError> {
        self.check(Some(FailPoint::DeleteRiver))?;
        let mut state = self.state();
        let existed = state.rivers.remove(name).is_some();
        if existed {
            state.operations.push(Operation::DeleteRiver(name.to_string()));
        }
        Ok(existed)
    }
}
