// LPhyBEAST library
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

//! Translation of LPhy model graphs into BEAST 2 XML.
//!
//! The translator is a small compiler pipeline:
//!
//!   1. An already-parsed LPhy model arrives as an interchange document
//!        and is loaded into a [`model::Model`] graph;
//!   2. A [`gen::Registry`] is populated with built-in generators and with
//!        the generators contributed by [extensions](ext);
//!   3. The [translation engine](translate) walks the graph in
//!        dependency order,
//!          invokes a generator for each node,
//!          and accumulates fragments into a [`translate::Document`];
//!   4. The [emitter](emit) assigns stable identifiers and lowers the
//!        document into an [XIR](xir) token stream,
//!          which is finally written as XML.
//!
//! The [`driver`] runs these steps for the `lphybeast` program.
//! Any failure before the final write aborts the run;
//!   a partially translated configuration is never produced.

// We build docs for private items.
#![allow(rustdoc::private_intra_doc_links)]

pub mod global;

pub mod config;
pub mod diagnose;
pub mod driver;
pub mod emit;
pub mod ext;
pub mod gen;
pub mod model;
pub mod span;
pub mod trace;
pub mod translate;
pub mod xir;

#[cfg(test)]
pub mod test;
