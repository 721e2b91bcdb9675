// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Flag values of dependency and file tags. */

use {
    crate::tag::IndexTag,
    tugger_package::{Constraint, DependencyKind, ResourceFlags},
};

pub const SENSE_LESS: i32 = 2;
pub const SENSE_GREATER: i32 = 4;
pub const SENSE_EQUAL: i32 = 8;
const SENSE_MASK: i32 = SENSE_LESS | SENSE_GREATER | SENSE_EQUAL;

pub const FILE_CONFIG: i32 = 1;
pub const FILE_DOC: i32 = 2;
pub const FILE_GHOST: i32 = 64;
pub const FILE_LICENSE: i32 = 128;
pub const FILE_README: i32 = 256;

const FILE_FLAGS: [(ResourceFlags, i32); 5] = [
    (ResourceFlags::CONFIG, FILE_CONFIG),
    (ResourceFlags::DOC, FILE_DOC),
    (ResourceFlags::GHOST, FILE_GHOST),
    (ResourceFlags::LICENSE, FILE_LICENSE),
    (ResourceFlags::README, FILE_README),
];

/// The `(name, version, flags)` tags recording dependencies of a kind.
///
/// `None` for kinds RPM has no notion of.
pub fn dependency_tags(kind: DependencyKind) -> Option<(IndexTag, IndexTag, IndexTag)> {
    match kind {
        DependencyKind::Requires => Some((
            IndexTag::RequireName,
            IndexTag::RequireVersion,
            IndexTag::RequireFlags,
        )),
        DependencyKind::Provides => Some((
            IndexTag::ProvideName,
            IndexTag::ProvideVersion,
            IndexTag::ProvideFlags,
        )),
        DependencyKind::Conflicts => Some((
            IndexTag::ConflictName,
            IndexTag::ConflictVersion,
            IndexTag::ConflictFlags,
        )),
        DependencyKind::Obsoletes => Some((
            IndexTag::ObsoleteName,
            IndexTag::ObsoleteVersion,
            IndexTag::ObsoleteFlags,
        )),
        DependencyKind::Recommends => Some((
            IndexTag::RecommendName,
            IndexTag::RecommendVersion,
            IndexTag::RecommendFlags,
        )),
        DependencyKind::Suggests => Some((
            IndexTag::SuggestName,
            IndexTag::SuggestVersion,
            IndexTag::SuggestFlags,
        )),
        DependencyKind::Enhances => Some((
            IndexTag::EnhanceName,
            IndexTag::EnhanceVersion,
            IndexTag::EnhanceFlags,
        )),
        DependencyKind::Replaces | DependencyKind::Breaks => None,
    }
}

pub fn constraint_flags(constraint: Constraint) -> i32 {
    match constraint {
        Constraint::Any => 0,
        Constraint::Equal => SENSE_EQUAL,
        Constraint::Less => SENSE_LESS,
        Constraint::LessEqual => SENSE_LESS | SENSE_EQUAL,
        Constraint::Greater => SENSE_GREATER,
        Constraint::GreaterEqual => SENSE_GREATER | SENSE_EQUAL,
    }
}

/// Resolve sense bits to a constraint. Bits other than the sense bits are ignored.
pub fn flags_constraint(flags: i32) -> Constraint {
    match flags & SENSE_MASK {
        SENSE_EQUAL => Constraint::Equal,
        SENSE_LESS => Constraint::Less,
        x if x == SENSE_LESS | SENSE_EQUAL => Constraint::LessEqual,
        SENSE_GREATER => Constraint::Greater,
        x if x == SENSE_GREATER | SENSE_EQUAL => Constraint::GreaterEqual,
        _ => Constraint::Any,
    }
}

pub fn file_flags(flags: ResourceFlags) -> i32 {
    FILE_FLAGS
        .iter()
        .filter(|(resource, _)| flags.contains(*resource))
        .fold(0, |acc, (_, value)| acc | value)
}

pub fn resource_flags(flags: i32) -> ResourceFlags {
    FILE_FLAGS
        .iter()
        .filter(|(_, value)| flags & value != 0)
        .fold(ResourceFlags::empty(), |acc, (resource, _)| acc | *resource)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn senses() {
        assert_eq!(constraint_flags(Constraint::Any), 0);
        assert_eq!(constraint_flags(Constraint::GreaterEqual), 12);
        assert_eq!(constraint_flags(Constraint::Less), 2);

        for constraint in [
            Constraint::Any,
            Constraint::Equal,
            Constraint::Less,
            Constraint::LessEqual,
            Constraint::Greater,
            Constraint::GreaterEqual,
        ] {
            assert_eq!(flags_constraint(constraint_flags(constraint)), constraint);
        }

        // RPMSENSE_INTERP and friends do not affect the comparison.
        assert_eq!(flags_constraint(0x100 | SENSE_EQUAL), Constraint::Equal);
    }

    #[test]
    fn files() {
        assert_eq!(
            file_flags(ResourceFlags::REGULAR | ResourceFlags::CONFIG | ResourceFlags::DOC),
            3
        );
        assert_eq!(file_flags(ResourceFlags::LICENSE), 128);
        assert_eq!(
            resource_flags(FILE_README | FILE_GHOST),
            ResourceFlags::README | ResourceFlags::GHOST
        );
    }

    #[test]
    fn unmapped_kinds() {
        assert!(dependency_tags(DependencyKind::Breaks).is_none());
        assert_eq!(
            dependency_tags(DependencyKind::Requires).map(|t| t.0),
            Some(IndexTag::RequireName)
        );
    }
}
