// Document sections
//
//  Copyright (C) 2020-2023 The LPhyBEAST Developers.
//
//  This file is part of LPhyBEAST.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Routing of fragments into document sections.

use crate::gen::{FragmentId, Placement, Section};

/// Fragments emitted at the slot of each [`Section`],
///   in the order they were produced.
///
/// Inline fragments have no slot;
///   they are emitted where they are first used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    data: Vec<FragmentId>,
    model: Vec<FragmentId>,
    operators: Vec<FragmentId>,
    loggers: Vec<FragmentId>,
}

impl Sections {
    /// Record `id` in the section of `placement`,
    ///   returning whether it has a slot.
    pub fn route(&mut self, placement: Placement, id: FragmentId) -> bool {
        if placement.inline {
            return false;
        }

        self.slot_mut(placement.section).push(id);
        true
    }

    pub fn get(&self, section: Section) -> &[FragmentId] {
        match section {
            Section::Data => &self.data,
            Section::Model => &self.model,
            Section::Operators => &self.operators,
            Section::Loggers => &self.loggers,
        }
    }

    fn slot_mut(&mut self, section: Section) -> &mut Vec<FragmentId> {
        match section {
            Section::Data => &mut self.data,
            Section::Model => &mut self.model,
            Section::Operators => &mut self.operators,
            Section::Loggers => &mut self.loggers,
        }
    }

    /// Total number of fragments with a slot.
    pub fn len(&self) -> usize {
        self.data.len()
            + self.model.len()
            + self.operators.len()
            + self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn id(i: usize) -> FragmentId {
        FragmentId::new(i)
    }

    #[test]
    fn routes_by_section_in_order() {
        let mut sections = Sections::default();

        assert!(sections.route(Placement::MODEL, id(0)));
        assert!(sections.route(Placement::DATA, id(1)));
        assert!(sections.route(Placement::OPERATORS, id(2)));
        assert!(sections.route(Placement::MODEL, id(3)));
        assert!(sections.route(Placement::LOGGERS, id(4)));

        assert_eq!(&[id(1)], sections.get(Section::Data));
        assert_eq!(&[id(0), id(3)], sections.get(Section::Model));
        assert_eq!(&[id(2)], sections.get(Section::Operators));
        assert_eq!(&[id(4)], sections.get(Section::Loggers));
        assert_eq!(5, sections.len());
    }

    #[test]
    fn inline_fragments_have_no_slot() {
        let mut sections = Sections::default();

        assert!(!sections.route(Placement::INLINE, id(0)));
        assert!(sections.is_empty());
        assert!(sections.get(Section::Model).is_empty());
    }
}
