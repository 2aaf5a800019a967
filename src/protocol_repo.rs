//! Procedure-code mapping and the protocol repository.

use crate::model::protocol::Protocol;
use crate::model::study::StudyContext;
use crate::ports::dicom::WorklistItem;
use std::collections::HashMap;
use tracing::info;

/// Read-mostly store of [`Protocol`]s, indexed by composite key for O(1) lookup.
/// Writes are confined to the privileged configuration path (`load`/`upsert`), never
/// exposed to the clinical workflow.
pub struct ProtocolRepository {
    by_key: HashMap<(String, String, String), Protocol>,
    /// Scheduled-procedure-code -> protocol_id, N-to-1.
    procedure_map: HashMap<String, String>,
    fuzzy: bool,
}

impl ProtocolRepository {
    pub fn new(fuzzy: bool) -> Self {
        Self {
            by_key: HashMap::new(),
            procedure_map: HashMap::new(),
            fuzzy,
        }
    }

    pub fn load(protocols: Vec<Protocol>, fuzzy: bool) -> Self {
        let mut repo = Self::new(fuzzy);
        for protocol in protocols {
            repo.upsert(protocol);
        }
        repo
    }

    pub fn upsert(&mut self, protocol: Protocol) {
        for code in &protocol.procedure_codes {
            self.procedure_map
                .insert(code.clone(), protocol.protocol_id.clone());
        }
        self.by_key.insert(protocol.key(), protocol);
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Composite-key lookup, `(body_part, projection, device_model)`.
    pub fn lookup(&self, body_part: &str, projection: &str, device_model: &str) -> Option<&Protocol> {
        self.by_key.get(&(
            body_part.to_string(),
            projection.to_string(),
            device_model.to_string(),
        ))
    }

    pub fn all_active(&self) -> Vec<&Protocol> {
        self.by_key.values().filter(|p| p.is_active).collect()
    }

    /// Resolves a scheduled-procedure code to its highest-confidence protocol. An
    /// unmapped code never blocks entry to `ProtocolSelect`: the caller falls back to
    /// [`ProtocolRepository::all_active`] and the unmapped code is logged here.
    pub fn resolve_procedure_code(&self, code: &str) -> Option<&Protocol> {
        if let Some(protocol_id) = self.procedure_map.get(code) {
            return self.by_key.values().find(|p| &p.protocol_id == protocol_id);
        }
        if self.fuzzy {
            if let Some(protocol_id) = self
                .procedure_map
                .iter()
                .find(|(mapped, _)| mapped.eq_ignore_ascii_case(code))
                .map(|(_, id)| id.clone())
            {
                return self.by_key.values().find(|p| p.protocol_id == protocol_id);
            }
        }
        info!(procedure_code = code, "unmapped scheduled procedure code; offering unfiltered list");
        None
    }

    /// Updates an emergency study's metadata from a worklist item found later,
    /// without re-acquisition.
    pub fn reconcile_emergency_study(study: &mut StudyContext, item: &WorklistItem) {
        study.worklist_item_uid = Some(item.worklist_item_uid.clone());
        study.accession_number = item.accession_number.clone();
        if study.patient_name.is_empty() {
            study.patient_name = item.patient_name.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol(id: &str, body_part: &str, projection: &str, codes: &[&str]) -> Protocol {
        let mut p = Protocol::new(id, body_part, projection, "DeviceX");
        p.procedure_codes = codes.iter().map(|c| c.to_string()).collect();
        p
    }

    #[test]
    fn composite_key_lookup_is_exact() {
        let repo = ProtocolRepository::load(
            vec![protocol("P1", "CHEST", "PA", &[]), protocol("P2", "CHEST", "LAT", &[])],
            false,
        );
        assert_eq!(repo.lookup("CHEST", "PA", "DeviceX").unwrap().protocol_id, "P1");
        assert!(repo.lookup("CHEST", "AP", "DeviceX").is_none());
    }

    #[test]
    fn unmapped_procedure_code_falls_back_to_none() {
        let repo = ProtocolRepository::load(vec![protocol("P1", "CHEST", "PA", &["RPID1"])], false);
        assert!(repo.resolve_procedure_code("UNKNOWN").is_none());
        assert!(repo.resolve_procedure_code("RPID1").is_some());
    }

    #[test]
    fn fuzzy_match_is_opt_in() {
        let repo = ProtocolRepository::load(vec![protocol("P1", "CHEST", "PA", &["RPID1"])], false);
        assert!(repo.resolve_procedure_code("rpid1").is_none());

        let fuzzy_repo = ProtocolRepository::load(vec![protocol("P1", "CHEST", "PA", &["RPID1"])], true);
        assert!(fuzzy_repo.resolve_procedure_code("rpid1").is_some());
    }

    #[test]
    fn lookup_scales_to_five_hundred_protocols() {
        let protocols: Vec<Protocol> = (0..500)
            .map(|i| protocol(&format!("P{i}"), "CHEST", &format!("PROJ{i}"), &[]))
            .collect();
        let repo = ProtocolRepository::load(protocols, false);
        let start = std::time::Instant::now();
        let found = repo.lookup("CHEST", "PROJ499", "DeviceX");
        assert!(found.is_some());
        assert!(start.elapsed() < std::time::Duration::from_millis(50));
    }
}
