// Stable element ids
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

//! Assignment of stable element ids.
//!
//! Ids are derived from fragment labels alone,
//!   never from memory addresses or hash iteration order,
//!   so translating the same model twice yields the same ids.
//!
//! The id of a fragment is the name of its originating node followed by
//!   the fragment suffix,
//!     if any
//!       (`kappa`, `kappa.prior`, `kappa.scale`).
//! Fixed labels of the assembled run (`posterior`, `mcmc`) are reserved
//!   first,
//!     followed by any literal `id` attribute a generator wrote itself
//!       (such as the taxa of a trait set).
//! If an id is already taken by another node,
//!   the canonical node identifier is appended to the name;
//!     if it is taken by the same node,
//!     or still taken,
//!   an ordinal is appended (`kappa.scale.2`).

use crate::{
    gen::{AttrValue, Child, Element, FragmentId},
    translate::{Document, IdLabel},
};
use fxhash::FxHashMap;
use std::borrow::Cow;

/// Id of each fragment of `doc`,
///   indexed by fragment.
pub fn assign(doc: &Document) -> Vec<String> {
    let unicode = doc.unicode_ids();
    let mut ids = vec![String::new(); doc.len()];

    // Owning node of each taken id;
    //   fixed ids have no owner.
    let mut taken: FxHashMap<String, Option<&str>> = FxHashMap::default();

    for (i, frag) in doc.fragments().iter().enumerate() {
        if let IdLabel::Fixed(name) = frag.label {
            taken.insert(name.into(), None);
            ids[i] = name.into();
        }
    }

    for frag in doc.fragments() {
        reserve_literal(&frag.fragment.element, &mut taken);
    }

    for (i, frag) in doc.fragments().iter().enumerate() {
        let IdLabel::Node { base, node, suffix } = &frag.label else {
            continue;
        };

        let base = canonical(base, unicode);
        let first = join(&base, suffix.as_deref());

        let id = match taken.get(&first) {
            None => first,
            Some(owner) if *owner == Some(node.as_str()) => {
                ordinal(&first, &taken)
            }
            Some(_) => {
                let qualified = join(
                    &format!("{base}.{}", canonical(node, unicode)),
                    suffix.as_deref(),
                );

                if taken.contains_key(&qualified) {
                    ordinal(&qualified, &taken)
                } else {
                    qualified
                }
            }
        };

        taken.insert(id.clone(), Some(node.as_str()));
        ids[i] = id;
    }

    ids
}

/// Reserve every literal `id` attribute of `el` and its descendants.
fn reserve_literal<'a>(
    el: &'a Element<FragmentId>,
    taken: &mut FxHashMap<String, Option<&'a str>>,
) {
    for (name, value) in &el.attrs {
        if let (AttrValue::Text(id), "id") = (value, name.as_str()) {
            taken.entry(id.clone()).or_insert(None);
        }
    }

    for child in &el.children {
        if let Child::Element(nested) = child {
            reserve_literal(nested, taken);
        }
    }
}

fn join(base: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{base}.{suffix}"),
        None => base.into(),
    }
}

fn ordinal(stem: &str, taken: &FxHashMap<String, Option<&str>>) -> String {
    let mut n = 2;

    loop {
        let candidate = format!("{stem}.{n}");

        if !taken.contains_key(&candidate) {
            break candidate;
        }

        n += 1;
    }
}

/// Spell out Greek letters in `name` unless `unicode` is set.
///
/// Many tools reading the generated logs cannot handle non-ASCII column
///   names.
pub fn canonical(name: &str, unicode: bool) -> Cow<str> {
    if unicode || name.is_ascii() {
        return Cow::Borrowed(name);
    }

    let mut out = String::with_capacity(name.len() * 2);

    for c in name.chars() {
        match greek_name(c) {
            Some(spelled) => out.push_str(spelled),
            None => out.push(c),
        }
    }

    Cow::Owned(out)
}

fn greek_name(c: char) -> Option<&'static str> {
    Some(match c {
        'α' => "alpha",
        'β' => "beta",
        'γ' => "gamma",
        'δ' => "delta",
        'ε' => "epsilon",
        'ζ' => "zeta",
        'η' => "eta",
        'θ' => "theta",
        'ι' => "iota",
        'κ' => "kappa",
        'λ' => "lambda",
        'μ' => "mu",
        'ν' => "nu",
        'ξ' => "xi",
        'ο' => "omicron",
        'π' => "pi",
        'ρ' => "rho",
        'σ' | 'ς' => "sigma",
        'τ' => "tau",
        'υ' => "upsilon",
        'φ' => "phi",
        'χ' => "chi",
        'ψ' => "psi",
        'ω' => "omega",
        'Α' => "Alpha",
        'Β' => "Beta",
        'Γ' => "Gamma",
        'Δ' => "Delta",
        'Ε' => "Epsilon",
        'Ζ' => "Zeta",
        'Η' => "Eta",
        'Θ' => "Theta",
        'Ι' => "Iota",
        'Κ' => "Kappa",
        'Λ' => "Lambda",
        'Μ' => "Mu",
        'Ν' => "Nu",
        'Ξ' => "Xi",
        'Ο' => "Omicron",
        'Π' => "Pi",
        'Ρ' => "Rho",
        'Σ' => "Sigma",
        'Τ' => "Tau",
        'Υ' => "Upsilon",
        'Φ' => "Phi",
        'Χ' => "Chi",
        'Ψ' => "Psi",
        'Ω' => "Omega",
        _ => return None,
    })
}
