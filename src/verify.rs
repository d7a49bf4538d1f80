// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::config::{ExportSettings, ReportMode, RootKeyPolicy};
use crate::error::MappingError;
use crate::mapping::{MappingModel, MultiSamplePart, PartId, SlotAddress};
use crate::paths::{PathResolver, ResolvedPaths};

/// Severity level for a verification issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single verification issue found during checking.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub severity: Severity,
    pub category: &'static str,
    /// The key the issue belongs to, if any.
    pub key: Option<u8>,
    pub message: String,
    pub error: MappingError,
}

impl Issue {
    fn new(severity: Severity, key: Option<u8>, error: MappingError) -> Issue {
        Issue {
            severity,
            category: error.category(),
            key,
            message: error.to_string(),
            error,
        }
    }
}

/// Result of verifying a mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationReport {
    pub issues: Vec<Issue>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// The first blocking violation, in check order.
    pub fn first_error(&self) -> Option<&MappingError> {
        self.issues
            .iter()
            .find(|i| i.severity == Severity::Error)
            .map(|i| &i.error)
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: VerificationReport) {
        self.issues.extend(other.issues);
    }
}

/// A mapping that passed verification, with every part's path resolved.
#[derive(Debug, Clone)]
pub struct Verified {
    pub paths: ResolvedPaths,
    /// Non-blocking findings.
    pub warnings: VerificationReport,
}

/// Checks a mapping before it is encoded. Nothing is repaired or clamped.
///
/// Checks run in this order: key and velocity bounds, segments against the
/// source length, part identities, then path resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    root_key_policy: RootKeyPolicy,
    report_mode: ReportMode,
}

impl Validator {
    pub fn new(root_key_policy: RootKeyPolicy, report_mode: ReportMode) -> Validator {
        Validator {
            root_key_policy,
            report_mode,
        }
    }

    pub fn from_settings(settings: &ExportSettings) -> Validator {
        Validator::new(settings.root_key_policy(), settings.report_mode())
    }

    /// Runs every check and returns the resolved paths when nothing blocks the
    /// export. Warnings are logged.
    pub fn validate(
        &self,
        model: &MappingModel,
        resolver: &PathResolver,
    ) -> Result<Verified, VerificationReport> {
        let (report, paths) = self.run(model, resolver);
        if report.has_errors() {
            return Err(report);
        }
        for issue in &report.issues {
            warn!(key = ?issue.key, category = issue.category, "{}", issue.message);
        }
        Ok(Verified {
            paths,
            warnings: report,
        })
    }

    /// Runs every check and returns the full report.
    pub fn check(&self, model: &MappingModel, resolver: &PathResolver) -> VerificationReport {
        self.run(model, resolver).0
    }

    fn run(&self, model: &MappingModel, resolver: &PathResolver) -> (VerificationReport, ResolvedPaths) {
        let mut collector = Collector {
            mode: self.report_mode,
            report: VerificationReport::default(),
        };

        if model.is_empty() {
            collector.error(None, MappingError::EmptyMapping);
        }

        let slots: Vec<SlotAddress> = model.slots().collect();
        self.check_ranges(model, &slots, &mut collector);
        check_segments(model, &slots, &mut collector);
        check_identities(model, &slots, &mut collector);

        let (paths, problems) = resolver.resolve_with_problems(model);
        for problem in problems {
            collector.error(owning_key(model, &slots, &problem), problem);
        }

        (collector.report, paths)
    }

    fn check_ranges(&self, model: &MappingModel, slots: &[SlotAddress], out: &mut Collector) {
        for key in model.keys() {
            for (index, layer) in key.layers().iter().enumerate() {
                let context = format!("key {} layer {}", key.number(), index);
                for problem in layer.range().problems(&context) {
                    out.error(Some(key.number()), problem);
                }
            }
        }

        for slot in slots {
            let Some(part) = model.part(slot.part) else {
                continue;
            };
            let context = part_context(slot, part);
            for problem in part.key_range().problems(&context) {
                out.error(Some(slot.key), problem);
            }
            for problem in part.velocity().problems(&context) {
                out.error(Some(slot.key), problem);
            }
            if let Some(root) = part.root_key() {
                if !part.root_key_in_range() {
                    let problem = MappingError::out_of_range(
                        "root key",
                        root as u64,
                        part.key_range().min as u64,
                        part.key_range().max as u64,
                        context,
                    );
                    match self.root_key_policy {
                        RootKeyPolicy::Warn => out.warning(Some(slot.key), problem),
                        RootKeyPolicy::Error => out.error(Some(slot.key), problem),
                    }
                }
            }
        }
    }
}

fn check_segments(model: &MappingModel, slots: &[SlotAddress], out: &mut Collector) {
    for slot in slots {
        let Some(part) = model.part(slot.part) else {
            continue;
        };
        for problem in part.segment_problems() {
            out.error(Some(slot.key), problem);
        }
        let rate = part.source().sample_rate();
        if !rate.is_finite() || rate <= 0.0 {
            out.error(
                Some(slot.key),
                MappingError::out_of_range(
                    "sample rate",
                    rate.max(0.0) as u64,
                    1,
                    u32::MAX as u64,
                    part_context(slot, part),
                ),
            );
        }
    }
}

fn check_identities(model: &MappingModel, slots: &[SlotAddress], out: &mut Collector) {
    let mut seen: HashMap<PartId, usize> = HashMap::new();
    for slot in slots {
        let count = seen.entry(slot.part).or_default();
        *count += 1;
        if *count == 2 {
            out.error(Some(slot.key), MappingError::IdentityCollision(slot.part));
        }
        if model.part(slot.part).is_none() {
            out.error(Some(slot.key), MappingError::UnknownPart(slot.part));
        }
    }
}

/// The key of the first slot a path problem points at.
fn owning_key(model: &MappingModel, slots: &[SlotAddress], problem: &MappingError) -> Option<u8> {
    let path = match problem {
        MappingError::DuplicateSampleName { second, .. } => second,
        MappingError::UnsupportedFormat(path) => path,
        MappingError::UnresolvedPath(id) => {
            return slots.iter().find(|slot| slot.part == *id).map(|slot| slot.key)
        }
        _ => return None,
    };
    slots
        .iter()
        .find(|slot| {
            model
                .part(slot.part)
                .is_some_and(|part| part.source().path() == path.as_path())
        })
        .map(|slot| slot.key)
}

fn part_context(slot: &SlotAddress, part: &MultiSamplePart) -> String {
    format!(
        "key {} layer {} slot {}, {} \"{}\"",
        slot.key,
        slot.layer_index,
        slot.slot,
        slot.part,
        part.name()
    )
}

struct Collector {
    mode: ReportMode,
    report: VerificationReport,
}

impl Collector {
    fn stopped(&self) -> bool {
        self.mode == ReportMode::First && self.report.has_errors()
    }

    fn error(&mut self, key: Option<u8>, error: MappingError) {
        if !self.stopped() {
            self.report.issues.push(Issue::new(Severity::Error, key, error));
        }
    }

    fn warning(&mut self, key: Option<u8>, error: MappingError) {
        if !self.stopped() {
            self.report
                .issues
                .push(Issue::new(Severity::Warning, key, error));
        }
    }
}

/// Prints a verification report grouped by key.
pub fn print_report(report: &VerificationReport, model: &MappingModel) {
    if report.is_clean() {
        println!(
            "\u{2705} All {} sample part(s) passed verification.",
            model.part_count()
        );
        return;
    }

    // Group issues by key.
    let mut by_key: BTreeMap<Option<u8>, Vec<&Issue>> = BTreeMap::new();
    for issue in &report.issues {
        by_key.entry(issue.key).or_default().push(issue);
    }

    for (key, issues) in &by_key {
        let has_errors = issues.iter().any(|i| i.severity == Severity::Error);
        let icon = if has_errors {
            "\u{274c}"
        } else {
            "\u{26a0}\u{fe0f} "
        };
        let heading = match key.and_then(|key| model.key(key)) {
            Some(key) => format!("key {} ({})", key.number(), key.note_name()),
            None => model.name().to_string(),
        };
        println!("{} {}", icon, heading);
        for issue in issues {
            let severity_icon = match issue.severity {
                Severity::Warning => "\u{26a0}\u{fe0f} ",
                Severity::Error => "\u{274c}",
            };
            println!(
                "   {} [{}] {}",
                severity_icon, issue.category, issue.message
            );
        }
    }

    println!(
        "\nSummary: {} issue(s) found, {} blocking.",
        report.issues.len(),
        report.error_count()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{KeyRange, PitchSettings, VelocityRange};
    use crate::testutil::sample_file;

    fn resolver() -> PathResolver {
        PathResolver::for_directory("/presets")
    }

    fn valid_model() -> MappingModel {
        let mut model = MappingModel::new("kit");
        model.add_sample(36, sample_file("/tmp/kick.wav", 4410)).unwrap();
        model.add_sample(38, sample_file("/tmp/snare.wav", 4410)).unwrap();
        model
    }

    #[test]
    fn test_valid_model() {
        let model = valid_model();
        let verified = Validator::default().validate(&model, &resolver()).unwrap();
        assert!(verified.warnings.is_clean());
        assert_eq!(verified.paths.len(), 2);
    }

    #[test]
    fn test_empty_mapping() {
        let report = Validator::default().check(&MappingModel::new("empty"), &resolver());
        assert_eq!(report.first_error(), Some(&MappingError::EmptyMapping));
    }

    #[test]
    fn test_batches_every_problem() {
        let mut model = valid_model();
        let kick = model.parts().next().unwrap().id();
        model.add_sample(40, sample_file("/other/kick.wav", 10)).unwrap();
        {
            let part = model.part_mut(kick).unwrap();
            part.set_segment(crate::mapping::Segment { start: 0, end: 9999 });
        }
        let snare = model
            .parts()
            .find(|part| part.name() == "snare")
            .unwrap()
            .id();
        model
            .part_mut(snare)
            .unwrap()
            .set_pitch(KeyRange { min: 80, max: 20 }, None);

        let report = Validator::default().check(&model, &resolver());
        let categories: Vec<&str> = report.issues.iter().map(|i| i.category).collect();
        assert_eq!(
            categories,
            vec!["out-of-range", "out-of-range", "duplicate-sample-name"]
        );
        // Range checks come before segment checks.
        assert!(report.issues[0].message.contains("key range min"));
        assert!(report.issues[1].message.contains("segment end"));
        assert_eq!(report.issues[2].key, Some(40));
        assert_eq!(report.error_count(), 3);
    }

    #[test]
    fn test_first_mode_stops() {
        let mut model = valid_model();
        model.add_sample(40, sample_file("/other/kick.wav", 10)).unwrap();
        model.add_sample(41, sample_file("/third/kick.wav", 10)).unwrap();

        let batch = Validator::default().check(&model, &resolver());
        assert_eq!(batch.error_count(), 2);

        let first = Validator::new(RootKeyPolicy::Warn, ReportMode::First).check(&model, &resolver());
        assert_eq!(first.issues.len(), 1);
        assert_eq!(first.first_error(), batch.first_error());
    }

    #[test]
    fn test_root_key_policy() {
        let mut model = MappingModel::new("piano");
        let layer = model
            .add_velocity_layer(60, VelocityRange::full())
            .unwrap();
        model
            .assign_round_robin_slot(layer, 0, sample_file("/tmp/c4.wav", 100))
            .unwrap();
        model
            .apply_pitch_settings(
                layer,
                PitchSettings::Pitched {
                    root_key: Some(30),
                    key_range: KeyRange { min: 48, max: 72 },
                },
            )
            .unwrap();

        let verified = Validator::default().validate(&model, &resolver()).unwrap();
        assert_eq!(verified.warnings.issues.len(), 1);
        assert_eq!(verified.warnings.issues[0].severity, Severity::Warning);

        let strict = Validator::new(RootKeyPolicy::Error, ReportMode::Batch);
        let report = strict.validate(&model, &resolver()).unwrap_err();
        assert!(matches!(
            report.first_error(),
            Some(MappingError::OutOfRangeValue { field: "root key", .. })
        ));
    }

    #[test]
    fn test_identity_collision() {
        let mut model = valid_model();
        let kick = model.parts().next().unwrap().id();
        let layer = model
            .add_velocity_layer(50, VelocityRange::full())
            .unwrap();
        model.force_slot(layer, 0, kick);
        let report = Validator::default().check(&model, &resolver());
        assert_eq!(report.first_error(), Some(&MappingError::IdentityCollision(kick)));
        assert_eq!(report.issues[0].key, Some(50));
    }

    #[test]
    fn test_dangling_slot() {
        let mut model = valid_model();
        let layer = model
            .add_velocity_layer(50, VelocityRange::full())
            .unwrap();
        model.force_slot(layer, 0, PartId(99));
        let report = Validator::default().check(&model, &resolver());
        assert_eq!(report.first_error(), Some(&MappingError::UnknownPart(PartId(99))));
    }

    #[test]
    fn test_report_merge() {
        let mut report_a = VerificationReport::default();
        report_a.issues.push(Issue::new(
            Severity::Warning,
            Some(60),
            MappingError::EmptyMapping,
        ));
        assert!(!report_a.has_errors());
        let mut report_b = VerificationReport::default();
        report_b
            .issues
            .push(Issue::new(Severity::Error, None, MappingError::EmptyMapping));
        report_a.merge(report_b);
        assert_eq!(report_a.issues.len(), 2);
        assert!(report_a.has_errors());
        assert_eq!(report_a.first_error(), Some(&MappingError::EmptyMapping));
    }
}
