//! Classification, conflict resolution, and collection assembly.
//!
//! Turns the scanner's flat file list into an [`IngestPlan`]: which file
//! fills which slot of which subject group, and which files make up the
//! collection. Pure and single-pass; no filesystem access.
//!
//! ## Routing
//!
//! Each file goes to exactly one bucket:
//!
//! 1. Camera-named raws (`IMG_0007.jpg`) → others. Camera-named derivatives
//!    are dropped.
//! 2. Slotted names ([`naming::parse_name`]) with the `collection` subject →
//!    the collection candidate map, keyed by slot.
//! 3. Other slotted names → `subject.slots[slot]`.
//! 4. Unmatched raws → others; unmatched derivatives are dropped.
//!
//! ## Conflict resolution
//!
//! Two files can claim the same slot, typically a raw source and the
//! derivative a previous run produced from it. The raw file always wins over
//! a derivative; otherwise the first file in discovery order keeps the slot.
//! Because this rule converges on the same winner every run, re-running the
//! pipeline on an unchanged directory reproduces the same manifest.
//!
//! ## Slot cap
//!
//! Slots above [`MAX_SLOTS`] are stored during classification but never
//! planned: a subject group shows at most three items.

use crate::naming::{self, COLLECTION_SUBJECT};
use crate::scan::RawFile;
use std::collections::BTreeMap;

/// Maximum items per subject group, and the collection chunk size.
pub const MAX_SLOTS: u32 = 3;

/// Files collected for one named subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectGroup {
    /// Normalized lowercase name.
    pub name: String,
    /// Slot index (1-based) → winning file. May hold indices above the cap.
    pub slots: BTreeMap<u32, RawFile>,
}

/// Raw routing result before assembly.
#[derive(Debug, Default)]
pub struct Classification {
    /// Subject groups in order of first appearance.
    pub subjects: Vec<SubjectGroup>,
    /// Explicit collection files, keyed by slot.
    pub collection: BTreeMap<u32, RawFile>,
    /// Unnamed sources in discovery order.
    pub others: Vec<RawFile>,
    /// Files that address nothing (derivatives without a slot, slot 0).
    pub dropped: Vec<RawFile>,
}

/// One file scheduled for transcoding.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedItem {
    pub file: RawFile,
    pub subject: String,
    pub slot: u32,
}

impl PlannedItem {
    /// Filename of the derivative this item produces.
    pub fn derivative_name(&self) -> String {
        naming::derivative_name(&self.subject, self.slot, self.file.kind)
    }
}

/// A subject group's planned items, slots 1–3 in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedGroup {
    pub subject: String,
    pub items: Vec<PlannedItem>,
}

/// Everything the batch run will transcode, in output order.
#[derive(Debug, Default)]
pub struct IngestPlan {
    pub groups: Vec<PlannedGroup>,
    pub collection: Vec<PlannedItem>,
    /// Stored slots above the cap, kept for reporting.
    pub over_cap: Vec<PlannedItem>,
    pub dropped: Vec<RawFile>,
}

impl IngestPlan {
    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum::<usize>() + self.collection.len()
    }
}

/// Decide whether `incoming` should take a slot held by `existing`.
///
/// Only a raw file displacing a derivative changes the slot.
pub fn should_replace(existing: &RawFile, incoming: &RawFile) -> bool {
    existing.is_derivative() && !incoming.is_derivative()
}

/// Put `file` into `slots[slot]`, honoring the raw-beats-derivative rule.
fn place(slots: &mut BTreeMap<u32, RawFile>, slot: u32, file: RawFile) {
    match slots.get(&slot) {
        Some(existing) if should_replace(existing, &file) => {
            tracing::debug!(
                slot,
                raw = %file.filename,
                derivative = %existing.filename,
                "raw source replaces derivative"
            );
            slots.insert(slot, file);
        }
        Some(existing) => {
            tracing::debug!(slot, kept = %existing.filename, ignored = %file.filename, "slot taken");
        }
        None => {
            slots.insert(slot, file);
        }
    }
}

/// Route every file into its bucket.
pub fn classify(files: Vec<RawFile>) -> Classification {
    let mut out = Classification::default();

    for file in files {
        if naming::is_upload_output(&file.filename) {
            out.dropped.push(file);
            continue;
        }

        if naming::is_camera_name(&file.filename) {
            if file.is_derivative() {
                out.dropped.push(file);
            } else {
                out.others.push(file);
            }
            continue;
        }

        let Some(parsed) = naming::parse_name(&file.filename) else {
            if file.is_derivative() {
                out.dropped.push(file);
            } else {
                out.others.push(file);
            }
            continue;
        };

        if parsed.slot == 0 {
            tracing::debug!(file = %file.filename, "slot 0 addresses nothing");
            out.dropped.push(file);
            continue;
        }

        if parsed.is_collection {
            place(&mut out.collection, parsed.slot, file);
            continue;
        }

        let idx = match out.subjects.iter().position(|g| g.name == parsed.subject) {
            Some(idx) => idx,
            None => {
                out.subjects.push(SubjectGroup {
                    name: parsed.subject,
                    slots: BTreeMap::new(),
                });
                out.subjects.len() - 1
            }
        };
        place(&mut out.subjects[idx].slots, parsed.slot, file);
    }

    out
}

/// Merge "others" with explicit collection files into one ordered list.
///
/// Slot `i` (1-based) takes `others[i-1]` when it exists, else the
/// collection candidate at `i`, else stays empty. Fresh unnamed uploads thus
/// surface ahead of older tagged overflow files, which only fill slots the
/// others do not reach.
pub fn assemble_collection(
    collection: &BTreeMap<u32, RawFile>,
    others: &[RawFile],
) -> Vec<PlannedItem> {
    let planned = |slot: u32, file: &RawFile| PlannedItem {
        file: file.clone(),
        subject: COLLECTION_SUBJECT.to_string(),
        slot,
    };

    // Only occupied slots are visited; indices can be as large as u32::MAX.
    let reached = u32::try_from(others.len()).unwrap_or(u32::MAX);
    let from_others = (1..=reached).zip(others).map(|(slot, file)| planned(slot, file));
    let from_collection = collection
        .range(reached.saturating_add(1)..)
        .map(|(&slot, file)| planned(slot, file));

    from_others.chain(from_collection).collect()
}

/// Classify and assemble in one step.
pub fn plan(files: Vec<RawFile>) -> IngestPlan {
    let classification = classify(files);
    let mut plan = IngestPlan {
        collection: assemble_collection(&classification.collection, &classification.others),
        dropped: classification.dropped,
        ..Default::default()
    };

    for group in classification.subjects {
        let mut items = Vec::new();
        for (slot, file) in group.slots {
            let item = PlannedItem {
                file,
                subject: group.name.clone(),
                slot,
            };
            if slot <= MAX_SLOTS {
                items.push(item);
            } else {
                plan.over_cap.push(item);
            }
        }
        plan.groups.push(PlannedGroup {
            subject: group.name,
            items,
        });
    }

    plan
}
