//! Action behaviors and behavior sets.

use std::fmt;

/// A single declared behavior of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Behavior {
    /// Changes values of one column
    ValuesColumn,
    /// Changes values of every column
    ValuesAll,
    /// Changes values of several columns
    ValuesMultipleColumns,
    MetadataChangeType,
    MetadataChangeName,
    MetadataCreateColumns,
    MetadataCopyColumns,
    MetadataDeleteColumns,
    NeedStatisticsQuality,
    NeedStatisticsFrequency,
    NeedStatisticsPattern,
    /// Needs up to date invalid flags on the rows it receives
    NeedStatisticsInvalid,
    DeleteRows,
    /// Must see the whole dataset in order; never run per partition
    ForbidDistributed,
}

impl Behavior {
    /// Get all behaviors
    pub fn all() -> &'static [Behavior] {
        &[
            Behavior::ValuesColumn,
            Behavior::ValuesAll,
            Behavior::ValuesMultipleColumns,
            Behavior::MetadataChangeType,
            Behavior::MetadataChangeName,
            Behavior::MetadataCreateColumns,
            Behavior::MetadataCopyColumns,
            Behavior::MetadataDeleteColumns,
            Behavior::NeedStatisticsQuality,
            Behavior::NeedStatisticsFrequency,
            Behavior::NeedStatisticsPattern,
            Behavior::NeedStatisticsInvalid,
            Behavior::DeleteRows,
            Behavior::ForbidDistributed,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Behavior::ValuesColumn => "values_column",
            Behavior::ValuesAll => "values_all",
            Behavior::ValuesMultipleColumns => "values_multiple_columns",
            Behavior::MetadataChangeType => "metadata_change_type",
            Behavior::MetadataChangeName => "metadata_change_name",
            Behavior::MetadataCreateColumns => "metadata_create_columns",
            Behavior::MetadataCopyColumns => "metadata_copy_columns",
            Behavior::MetadataDeleteColumns => "metadata_delete_columns",
            Behavior::NeedStatisticsQuality => "need_statistics_quality",
            Behavior::NeedStatisticsFrequency => "need_statistics_frequency",
            Behavior::NeedStatisticsPattern => "need_statistics_pattern",
            Behavior::NeedStatisticsInvalid => "need_statistics_invalid",
            Behavior::DeleteRows => "delete_rows",
            Behavior::ForbidDistributed => "forbid_distributed",
        }
    }

    #[inline]
    const fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// Compact set of behaviors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BehaviorSet(u32);

impl BehaviorSet {
    pub const EMPTY: BehaviorSet = BehaviorSet(0);

    /// Build a set from a list, usable in `const` context
    pub const fn of(behaviors: &[Behavior]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < behaviors.len() {
            bits |= behaviors[i].bit();
            i += 1;
        }
        BehaviorSet(bits)
    }

    #[inline]
    pub fn contains(self, behavior: Behavior) -> bool {
        self.0 & behavior.bit() != 0
    }

    pub fn with(self, behavior: Behavior) -> Self {
        BehaviorSet(self.0 | behavior.bit())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Behavior> {
        Behavior::all().iter().copied().filter(move |b| self.contains(*b))
    }

    fn any(self, behaviors: &[Behavior]) -> bool {
        behaviors.iter().any(|b| self.contains(*b))
    }

    /// Needs quality, frequency or pattern statistics of its input
    pub fn needs_statistics(self) -> bool {
        self.any(&[
            Behavior::NeedStatisticsQuality,
            Behavior::NeedStatisticsFrequency,
            Behavior::NeedStatisticsPattern,
        ])
    }

    /// Needs invalid flags on its input rows
    pub fn needs_invalid_flags(self) -> bool {
        self.contains(Behavior::NeedStatisticsInvalid)
    }

    /// Creates, copies or deletes columns
    pub fn changes_columns(self) -> bool {
        self.any(&[
            Behavior::MetadataCreateColumns,
            Behavior::MetadataCopyColumns,
            Behavior::MetadataDeleteColumns,
        ])
    }

    pub fn changes_type(self) -> bool {
        self.contains(Behavior::MetadataChangeType)
    }

    pub fn forbids_distributed(self) -> bool {
        self.contains(Behavior::ForbidDistributed)
    }
}

impl FromIterator<Behavior> for BehaviorSet {
    fn from_iter<I: IntoIterator<Item = Behavior>>(iter: I) -> Self {
        iter.into_iter().fold(BehaviorSet::EMPTY, BehaviorSet::with)
    }
}

impl fmt::Display for BehaviorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|b| b.name()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

impl fmt::Debug for BehaviorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BehaviorSet{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_const_set() {
        const SET: BehaviorSet =
            BehaviorSet::of(&[Behavior::ValuesColumn, Behavior::NeedStatisticsQuality]);
        assert!(SET.contains(Behavior::ValuesColumn));
        assert!(!SET.contains(Behavior::DeleteRows));
        assert!(SET.needs_statistics());
        assert!(!SET.needs_invalid_flags());
    }

    #[test]
    fn test_derived_predicates() {
        let set: BehaviorSet = [Behavior::MetadataCopyColumns, Behavior::MetadataChangeType]
            .into_iter()
            .collect();
        assert!(set.changes_columns());
        assert!(set.changes_type());
        assert!(!set.forbids_distributed());
        assert!(BehaviorSet::EMPTY.is_empty());
    }

    #[test]
    fn test_display_lists_names_in_order() {
        let set = BehaviorSet::of(&[Behavior::DeleteRows, Behavior::ValuesAll]);
        assert_eq!(set.to_string(), "[values_all, delete_rows]");
    }
}
