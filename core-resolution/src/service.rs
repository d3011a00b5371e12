// =====================================================================================
// File: core-resolution/src/service.rs
// Description: Entity resolution pipeline: ingest, block, compare, merge, split
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use core_reference::SnapshotStore;

use crate::{
    compare::{self, FieldScores},
    error::{ResolutionError, ResolutionResult},
    rules::ResolutionRule,
    types::{
        CandidateStatus, MasterEntity, MatchCandidate, MatchConfidence, MergeHistoryEntry,
        MergeOperation, MergeType, ResolutionStatistics, ResolutionStatus, SourceRecord,
        SplitOperation,
    },
};

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Pairwise score below which a pairing is not even a candidate
    pub min_candidate_score: f64,
    /// Fallback auto-merge threshold when no declarative rule fires
    pub auto_merge_threshold: f64,
    /// Concurrent workers for resolution jobs
    pub job_concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_candidate_score: 0.5,
            auto_merge_threshold: 0.98,
            job_concurrency: 4,
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> ResolutionResult<()> {
        for (field, value) in [
            ("min_candidate_score", self.min_candidate_score),
            ("auto_merge_threshold", self.auto_merge_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ResolutionError::configuration(format!(
                    "{field} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.job_concurrency == 0 {
            return Err(ResolutionError::configuration(
                "job_concurrency must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Per-entity locks serializing resolve/merge/split on the entities they
/// touch.
///
/// Locks are always acquired in sorted ID order, so operations with
/// overlapping entity sets serialize without deadlock while operations on
/// disjoint entities proceed concurrently.
#[derive(Default)]
struct EntityLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl EntityLocks {
    async fn acquire(&self, entity_ids: &[Uuid]) -> Vec<tokio::sync::OwnedMutexGuard<()>> {
        let mut ids = entity_ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            let lock = {
                let mut locks = self.locks.lock().await;
                locks
                    .entry(id)
                    .or_insert_with(|| Arc::new(Mutex::new(())))
                    .clone()
            };
            guards.push(lock.lock_owned().await);
        }
        guards
    }
}

/// Entity resolver: ingest, block, compare, auto-decide, queue or merge.
///
/// Resolve, merge, and split acquire per-entity locks in sorted ID order
/// for every entity they touch, making the operations linearizable per
/// entity while disjoint operations run concurrently.
pub struct EntityResolver {
    config: ResolverConfig,
    rules: SnapshotStore<Vec<ResolutionRule>>,
    entities: RwLock<HashMap<Uuid, MasterEntity>>,
    records: RwLock<HashMap<String, SourceRecord>>,
    candidates: RwLock<HashMap<Uuid, MatchCandidate>>,
    merges: RwLock<Vec<MergeOperation>>,
    splits: RwLock<Vec<SplitOperation>>,
    pub(crate) jobs: RwLock<HashMap<Uuid, crate::jobs::ResolutionJob>>,
    pub(crate) cancel_flags: RwLock<HashMap<Uuid, Arc<std::sync::atomic::AtomicBool>>>,
    entity_locks: EntityLocks,
}

impl EntityResolver {
    pub fn new(config: ResolverConfig) -> ResolutionResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rules: SnapshotStore::new(ResolutionRule::default_rules()),
            entities: RwLock::new(HashMap::new()),
            records: RwLock::new(HashMap::new()),
            candidates: RwLock::new(HashMap::new()),
            merges: RwLock::new(Vec::new()),
            splits: RwLock::new(Vec::new()),
            jobs: RwLock::new(HashMap::new()),
            cancel_flags: RwLock::new(HashMap::new()),
            entity_locks: EntityLocks::default(),
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Active resolution rules in priority order
    pub fn rules(&self) -> Vec<ResolutionRule> {
        let mut rules: Vec<ResolutionRule> = self
            .rules
            .load()
            .iter()
            .filter(|r| r.is_active)
            .cloned()
            .collect();
        rules.sort_by_key(|r| r.priority);
        rules
    }

    /// Store a raw source record awaiting resolution
    pub async fn ingest_source_record(
        &self,
        record: SourceRecord,
    ) -> ResolutionResult<SourceRecord> {
        if record.record_id.trim().is_empty() {
            return Err(ResolutionError::invalid("record_id must not be empty"));
        }
        let mut records = self.records.write().await;
        if records.contains_key(&record.record_id) {
            return Err(ResolutionError::conflict(format!(
                "source record already ingested: {}",
                record.record_id
            )));
        }
        records.insert(record.record_id.clone(), record.clone());
        debug!(record = %record.record_id, system = %record.source_system, "source record ingested");
        Ok(record)
    }

    /// Resolve one source record: block, compare, auto-decide.
    ///
    /// Returns the owning master entity when the record was resolved (new
    /// entity or auto-merge), plus every candidate scored along the way.
    pub async fn resolve_record(
        &self,
        record_id: &str,
    ) -> ResolutionResult<(Option<MasterEntity>, Vec<MatchCandidate>)> {
        let record = {
            let records = self.records.read().await;
            records
                .get(record_id)
                .cloned()
                .ok_or_else(|| {
                    ResolutionError::not_found("source record".to_string(), record_id.to_string())
                })?
        };
        if record.resolution_status != ResolutionStatus::Pending {
            return Err(ResolutionError::invalid(format!(
                "source record {record_id} is already resolved"
            )));
        }

        // Block on entity kind, then score the survivors pairwise.
        let mut scored: Vec<(MatchCandidate, FieldScores)> = Vec::new();
        {
            let entities = self.entities.read().await;
            for entity in entities.values() {
                if entity.entity_kind != record.entity_kind {
                    continue;
                }
                let scores = compare::compare_record_to_entity(&record, entity);
                let overall = scores.overall();
                if overall < self.config.min_candidate_score {
                    continue;
                }
                scored.push((
                    MatchCandidate {
                        candidate_id: Uuid::new_v4(),
                        record_id: record.record_id.clone(),
                        record_source: record.source_system.clone(),
                        entity_id: entity.entity_id,
                        overall_score: overall,
                        confidence: MatchConfidence::from_score(overall),
                        name_score: scores.name,
                        address_score: scores.address,
                        identifier_score: scores.identifier,
                        dob_score: scores.dob,
                        matching_fields: scores.matching_fields.clone(),
                        non_matching_fields: scores.non_matching_fields.clone(),
                        status: CandidateStatus::Pending,
                        resolved_by: None,
                        resolved_at: None,
                        resolution_notes: None,
                        detected_at: Utc::now(),
                    },
                    scores,
                ));
            }
        }
        scored.sort_by(|a, b| {
            b.0.overall_score
                .partial_cmp(&a.0.overall_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.entity_id.cmp(&b.0.entity_id))
        });

        if scored.is_empty() {
            let entity = self.create_entity_from_record(record_id).await?;
            return Ok((Some(entity), Vec::new()));
        }

        let candidates: Vec<MatchCandidate> = scored.iter().map(|(c, _)| c.clone()).collect();
        let (best, best_scores) = &scored[0];

        if self.permits_auto_merge(&record, best, best_scores) {
            let _locks = self.entity_locks.acquire(&[best.entity_id]).await;
            if self.entities.read().await.get(&best.entity_id).is_none() {
                return Err(ResolutionError::conflict(format!(
                    "master entity {} was merged concurrently; refetch and retry",
                    best.entity_id
                )));
            }
            let entity = self
                .merge_record_into_entity(record_id, best.entity_id, best.overall_score, "system")
                .await?;
            info!(
                record = %record_id,
                entity = %entity.entity_id,
                score = best.overall_score,
                "record auto-merged"
            );
            return Ok((Some(entity), candidates));
        }

        // Queue for human review.
        let mut stored = self.candidates.write().await;
        for candidate in &candidates {
            stored.insert(candidate.candidate_id, candidate.clone());
        }
        Ok((None, candidates))
    }

    /// Whether the best candidate clears a firing rule's auto-merge bar
    fn permits_auto_merge(
        &self,
        record: &SourceRecord,
        best: &MatchCandidate,
        best_scores: &FieldScores,
    ) -> bool {
        let field_map = best_scores.as_map();
        for rule in self.rules() {
            if rule.entity_kind != record.entity_kind {
                continue;
            }
            let rule_score = rule.score(&field_map);
            if rule_score < rule.threshold {
                continue;
            }
            // First firing rule decides.
            return rule.auto_merge_enabled && best.overall_score >= rule.auto_merge_threshold;
        }
        best.overall_score >= self.config.auto_merge_threshold
    }

    /// Create a new master entity from an unmatched source record
    pub async fn create_entity_from_record(
        &self,
        record_id: &str,
    ) -> ResolutionResult<MasterEntity> {
        let mut records = self.records.write().await;
        let record = records.get_mut(record_id).ok_or_else(|| {
            ResolutionError::not_found("source record".to_string(), record_id.to_string())
        })?;
        if record.resolution_status != ResolutionStatus::Pending {
            return Err(ResolutionError::conflict(format!(
                "source record {record_id} was resolved concurrently"
            )));
        }

        let mut name_variants = record.names.clone();
        ensure_single_primary(&mut name_variants);

        let now = Utc::now();
        let mut entity = MasterEntity {
            entity_id: Uuid::new_v4(),
            entity_kind: record.entity_kind,
            primary_name: record.display_name().to_string(),
            name_variants,
            date_of_birth: record.date_of_birth,
            nationalities: record.nationalities.clone(),
            addresses: record.addresses.clone(),
            identifiers: record.identifiers.clone(),
            relationships: Vec::new(),
            source_record_ids: vec![record.record_id.clone()],
            source_systems: vec![record.source_system.clone()],
            completeness_score: 0.0,
            overall_quality_score: 0.0,
            is_pep: false,
            is_sanctioned: false,
            is_on_watchlist: false,
            merge_history: Vec::new(),
            created_at: now,
            updated_at: now,
            last_resolved_at: Some(now),
        };
        entity.completeness_score = completeness(&entity);
        entity.overall_quality_score = entity.completeness_score;

        record.master_entity_id = Some(entity.entity_id);
        record.resolution_status = ResolutionStatus::AutoResolved;
        record.resolution_confidence = 1.0;
        record.resolved_at = Some(now);
        drop(records);

        self.entities
            .write()
            .await
            .insert(entity.entity_id, entity.clone());
        info!(entity = %entity.entity_id, name = %entity.primary_name, "master entity created");
        Ok(entity)
    }

    /// Union-with-dedup merge of one source record into a master entity
    pub async fn merge_record_into_entity(
        &self,
        record_id: &str,
        entity_id: Uuid,
        confidence: f64,
        _merged_by: &str,
    ) -> ResolutionResult<MasterEntity> {
        let mut records = self.records.write().await;
        let record = records.get_mut(record_id).ok_or_else(|| {
            ResolutionError::not_found("source record".to_string(), record_id.to_string())
        })?;
        if record.resolution_status != ResolutionStatus::Pending {
            return Err(ResolutionError::conflict(format!(
                "source record {record_id} was resolved concurrently"
            )));
        }

        let mut entities = self.entities.write().await;
        let entity = entities.get_mut(&entity_id).ok_or_else(|| {
            ResolutionError::not_found("master entity".to_string(), entity_id.to_string())
        })?;

        merge_record_data(entity, record);

        let now = Utc::now();
        record.master_entity_id = Some(entity_id);
        record.resolution_status = ResolutionStatus::AutoResolved;
        record.resolution_confidence = confidence;
        record.resolved_at = Some(now);

        entity.updated_at = now;
        entity.last_resolved_at = Some(now);
        entity.completeness_score = completeness(entity);
        entity.overall_quality_score = entity.completeness_score;
        Ok(entity.clone())
    }

    /// Merge several master entities into one surviving entity
    pub async fn merge_entities(
        &self,
        entity_ids: &[Uuid],
        surviving_entity_id: Uuid,
        merged_by: &str,
    ) -> ResolutionResult<MergeOperation> {
        let mut lock_ids = entity_ids.to_vec();
        lock_ids.push(surviving_entity_id);
        let _locks = self.entity_locks.acquire(&lock_ids).await;

        let mut entities = self.entities.write().await;
        if !entities.contains_key(&surviving_entity_id) {
            return Err(ResolutionError::not_found(
                "master entity".to_string(),
                surviving_entity_id.to_string(),
            ));
        }

        let mut merged_ids = Vec::new();
        let mut repointed_records = Vec::new();
        for entity_id in entity_ids {
            if *entity_id == surviving_entity_id || !entities.contains_key(entity_id) {
                continue;
            }
            let merged = entities.remove(entity_id).expect("checked above");
            let surviving = entities
                .get_mut(&surviving_entity_id)
                .expect("checked above");

            merge_entity_data(surviving, &merged);
            surviving.merge_history.push(MergeHistoryEntry {
                merged_entity_id: *entity_id,
                merged_at: Utc::now(),
                merged_by: merged_by.to_string(),
                confidence: 1.0,
            });
            merged_ids.push(*entity_id);
            repointed_records.extend(merged.source_record_ids.clone());
        }

        if !merged_ids.is_empty() {
            let surviving = entities
                .get_mut(&surviving_entity_id)
                .expect("checked above");
            let now = Utc::now();
            surviving.updated_at = now;
            surviving.last_resolved_at = Some(now);
            surviving.completeness_score = completeness(surviving);
            surviving.overall_quality_score = surviving.completeness_score;
        }
        drop(entities);

        // Re-point the absorbed entities' source records. Lock order is
        // records before entities everywhere else, so this runs after the
        // entity lock is released.
        if !repointed_records.is_empty() {
            let mut records = self.records.write().await;
            for record_id in &repointed_records {
                if let Some(record) = records.get_mut(record_id) {
                    record.master_entity_id = Some(surviving_entity_id);
                }
            }
        }

        let operation = MergeOperation {
            merge_id: Uuid::new_v4(),
            merge_type: MergeType::Manual,
            surviving_entity_id,
            merged_entity_ids: merged_ids.clone(),
            merge_confidence: 1.0,
            performed_by: merged_by.to_string(),
            performed_at: Utc::now(),
        };
        if !merged_ids.is_empty() {
            info!(
                surviving = %surviving_entity_id,
                merged = merged_ids.len(),
                "entities merged"
            );
            self.merges.write().await.push(operation.clone());
        }
        Ok(operation)
    }

    /// Split one master entity into new entities by record assignment.
    ///
    /// `assignments` maps each source record id to a named group; one new
    /// entity is created per group and the original entity is removed.
    pub async fn split_entity(
        &self,
        entity_id: Uuid,
        assignments: HashMap<String, String>,
        split_by: &str,
        reason: &str,
    ) -> ResolutionResult<SplitOperation> {
        let _locks = self.entity_locks.acquire(&[entity_id]).await;

        let original = self
            .entities
            .read()
            .await
            .get(&entity_id)
            .cloned()
            .ok_or_else(|| {
                ResolutionError::not_found("master entity".to_string(), entity_id.to_string())
            })?;

        if assignments.is_empty() {
            return Err(ResolutionError::invalid(
                "split requires at least one record assignment",
            ));
        }
        for record_id in assignments.keys() {
            if !original.source_record_ids.contains(record_id) {
                return Err(ResolutionError::invalid(format!(
                    "record {record_id} does not belong to entity {entity_id}"
                )));
            }
        }

        // Group deterministically so new entity ids are stable per group
        // order.
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (record_id, group) in &assignments {
            groups.entry(group.clone()).or_default().push(record_id.clone());
        }
        for records in groups.values_mut() {
            records.sort();
        }

        // Reset assigned records to pending so they can seed new entities.
        {
            let mut records = self.records.write().await;
            for record_ids in groups.values() {
                for record_id in record_ids {
                    if let Some(record) = records.get_mut(record_id) {
                        record.resolution_status = ResolutionStatus::Pending;
                        record.master_entity_id = None;
                    }
                }
            }
        }

        let mut new_entity_ids = Vec::new();
        for (group_name, record_ids) in &groups {
            let mut entity = self.create_entity_from_record(&record_ids[0]).await?;
            entity.primary_name = group_name.clone();
            self.entities
                .write()
                .await
                .get_mut(&entity.entity_id)
                .expect("just created")
                .primary_name = group_name.clone();

            for record_id in &record_ids[1..] {
                self.merge_record_into_entity(record_id, entity.entity_id, 1.0, split_by)
                    .await?;
            }
            new_entity_ids.push(entity.entity_id);
        }

        self.entities.write().await.remove(&entity_id);

        // Records of the original entity that were not reassigned are
        // orphaned by the split and go back to the pending queue.
        {
            let mut records = self.records.write().await;
            for record_id in &original.source_record_ids {
                if assignments.contains_key(record_id) {
                    continue;
                }
                if let Some(record) = records.get_mut(record_id) {
                    record.resolution_status = ResolutionStatus::Split;
                    record.master_entity_id = None;
                }
            }
        }

        let operation = SplitOperation {
            split_id: Uuid::new_v4(),
            original_entity_id: entity_id,
            new_entity_ids,
            split_reason: reason.to_string(),
            record_assignments: assignments,
            performed_by: split_by.to_string(),
            performed_at: Utc::now(),
        };
        info!(
            original = %entity_id,
            new_entities = operation.new_entity_ids.len(),
            "entity split"
        );
        self.splits.write().await.push(operation.clone());
        Ok(operation)
    }

    /// Apply a human decision to a queued match candidate
    pub async fn review_candidate(
        &self,
        candidate_id: Uuid,
        decision: CandidateStatus,
        reviewed_by: &str,
        notes: Option<String>,
    ) -> ResolutionResult<MatchCandidate> {
        if decision == CandidateStatus::Pending {
            return Err(ResolutionError::invalid(
                "review decision cannot be pending",
            ));
        }

        let mut candidate = {
            let candidates = self.candidates.read().await;
            candidates.get(&candidate_id).cloned().ok_or_else(|| {
                ResolutionError::not_found(
                    "match candidate".to_string(),
                    candidate_id.to_string(),
                )
            })?
        };
        if candidate.status != CandidateStatus::Pending {
            return Err(ResolutionError::invalid("candidate is already reviewed"));
        }

        match decision {
            CandidateStatus::Confirmed => {
                let _locks = self.entity_locks.acquire(&[candidate.entity_id]).await;
                if self.entities.read().await.get(&candidate.entity_id).is_none() {
                    return Err(ResolutionError::conflict(format!(
                        "master entity {} was merged concurrently; refetch and retry",
                        candidate.entity_id
                    )));
                }
                let entity = self
                    .merge_record_into_entity(
                        &candidate.record_id,
                        candidate.entity_id,
                        candidate.overall_score,
                        reviewed_by,
                    )
                    .await?;
                let mut records = self.records.write().await;
                if let Some(record) = records.get_mut(&candidate.record_id) {
                    record.resolution_status = ResolutionStatus::ManuallyResolved;
                }
                debug!(record = %candidate.record_id, entity = %entity.entity_id, "candidate confirmed");
            }
            CandidateStatus::Rejected => {
                {
                    let mut records = self.records.write().await;
                    if let Some(record) = records.get_mut(&candidate.record_id) {
                        record.resolution_status = ResolutionStatus::Pending;
                    }
                }
                self.create_entity_from_record(&candidate.record_id).await?;
            }
            CandidateStatus::Pending => unreachable!("rejected above"),
        }

        candidate.status = decision;
        candidate.resolved_by = Some(reviewed_by.to_string());
        candidate.resolved_at = Some(Utc::now());
        candidate.resolution_notes = notes;
        self.candidates
            .write()
            .await
            .insert(candidate.candidate_id, candidate.clone());
        Ok(candidate)
    }

    pub async fn get_entity(&self, entity_id: Uuid) -> Option<MasterEntity> {
        self.entities.read().await.get(&entity_id).cloned()
    }

    pub async fn get_record(&self, record_id: &str) -> Option<SourceRecord> {
        self.records.read().await.get(record_id).cloned()
    }

    pub async fn pending_candidates(&self) -> Vec<MatchCandidate> {
        self.candidates
            .read()
            .await
            .values()
            .filter(|c| c.status == CandidateStatus::Pending)
            .cloned()
            .collect()
    }

    pub async fn pending_record_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.resolution_status == ResolutionStatus::Pending)
            .map(|r| r.record_id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub async fn statistics(&self) -> ResolutionStatistics {
        let mut stats = ResolutionStatistics::default();

        // Locks are taken one at a time; holding both would invert the
        // records-then-entities order used by the merge path.
        {
            let records = self.records.read().await;
            stats.total_source_records = records.len();
            for record in records.values() {
                if record.resolution_status == ResolutionStatus::Pending {
                    stats.unresolved_records += 1;
                }
                *stats
                    .by_source_system
                    .entry(record.source_system.clone())
                    .or_insert(0) += 1;
            }
        }
        {
            let entities = self.entities.read().await;
            stats.total_master_entities = entities.len();
            for entity in entities.values() {
                *stats
                    .by_entity_kind
                    .entry(format!("{:?}", entity.entity_kind).to_lowercase())
                    .or_insert(0) += 1;
            }
            if !entities.is_empty() {
                stats.average_quality_score = entities
                    .values()
                    .map(|e| e.overall_quality_score)
                    .sum::<f64>()
                    / entities.len() as f64;
            }
        }
        stats.pending_review = self
            .candidates
            .read()
            .await
            .values()
            .filter(|c| c.status == CandidateStatus::Pending)
            .count();
        stats.total_merges = self.merges.read().await.len();
        stats.total_splits = self.splits.read().await.len();
        stats
    }
}

/// Completeness over {primary name, DOB, identifier, address, nationality},
/// nationality at half weight
pub fn completeness(entity: &MasterEntity) -> f64 {
    const TOTAL_WEIGHT: f64 = 4.5;
    let mut present = 0.0;
    if !entity.primary_name.trim().is_empty() {
        present += 1.0;
    }
    if entity.date_of_birth.is_some() {
        present += 1.0;
    }
    if !entity.identifiers.is_empty() {
        present += 1.0;
    }
    if !entity.addresses.is_empty() {
        present += 1.0;
    }
    if !entity.nationalities.is_empty() {
        present += 0.5;
    }
    present / TOTAL_WEIGHT * 100.0
}

fn ensure_single_primary(variants: &mut [crate::types::NameVariant]) {
    let mut seen_primary = false;
    for variant in variants.iter_mut() {
        if variant.is_primary {
            if seen_primary {
                variant.is_primary = false;
            }
            seen_primary = true;
        }
    }
}

fn merge_record_data(entity: &mut MasterEntity, record: &SourceRecord) {
    for name in &record.names {
        if !entity
            .name_variants
            .iter()
            .any(|n| n.full_name == name.full_name)
        {
            let mut name = name.clone();
            if entity.name_variants.iter().any(|n| n.is_primary) {
                name.is_primary = false;
            }
            entity.name_variants.push(name);
        }
    }
    for address in &record.addresses {
        if !entity
            .addresses
            .iter()
            .any(|a| a.line1 == address.line1 && a.city == address.city)
        {
            entity.addresses.push(address.clone());
        }
    }
    for identifier in &record.identifiers {
        if !entity
            .identifiers
            .iter()
            .any(|i| i.dedup_key() == identifier.dedup_key())
        {
            entity.identifiers.push(identifier.clone());
        }
    }
    for nationality in &record.nationalities {
        if !entity.nationalities.contains(nationality) {
            entity.nationalities.push(nationality.clone());
        }
    }
    if entity.date_of_birth.is_none() {
        entity.date_of_birth = record.date_of_birth;
    }
    if !entity.source_record_ids.contains(&record.record_id) {
        entity.source_record_ids.push(record.record_id.clone());
    }
    if !entity.source_systems.contains(&record.source_system) {
        entity.source_systems.push(record.source_system.clone());
    }
}

fn merge_entity_data(surviving: &mut MasterEntity, merged: &MasterEntity) {
    for name in &merged.name_variants {
        if !surviving
            .name_variants
            .iter()
            .any(|n| n.full_name == name.full_name)
        {
            let mut name = name.clone();
            if surviving.name_variants.iter().any(|n| n.is_primary) {
                name.is_primary = false;
            }
            surviving.name_variants.push(name);
        }
    }
    for address in &merged.addresses {
        if !surviving
            .addresses
            .iter()
            .any(|a| a.line1 == address.line1 && a.city == address.city)
        {
            surviving.addresses.push(address.clone());
        }
    }
    for identifier in &merged.identifiers {
        if !surviving
            .identifiers
            .iter()
            .any(|i| i.dedup_key() == identifier.dedup_key())
        {
            surviving.identifiers.push(identifier.clone());
        }
    }
    for relationship in &merged.relationships {
        if !surviving
            .relationships
            .iter()
            .any(|r| r.relationship_id == relationship.relationship_id)
        {
            surviving.relationships.push(relationship.clone());
        }
    }
    for nationality in &merged.nationalities {
        if !surviving.nationalities.contains(nationality) {
            surviving.nationalities.push(nationality.clone());
        }
    }
    if surviving.date_of_birth.is_none() {
        surviving.date_of_birth = merged.date_of_birth;
    }
    for record_id in &merged.source_record_ids {
        if !surviving.source_record_ids.contains(record_id) {
            surviving.source_record_ids.push(record_id.clone());
        }
    }
    for system in &merged.source_systems {
        if !surviving.source_systems.contains(system) {
            surviving.source_systems.push(system.clone());
        }
    }
}
