// Model values
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

//! Typed values carried by model nodes.
//!
//! Each [`Value`] variant has a concrete class name
//!   (see [`Value::class`])
//!   matching the type names of the LPhy runtime.
//! Class names are the concrete-class half of a
//!   [`GeneratorKey`](crate::gen::GeneratorKey) and double as the `type`
//!   tag of the interchange format.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    #[serde(rename = "Boolean")]
    Boolean(bool),
    #[serde(rename = "Integer")]
    Integer(i64),
    #[serde(rename = "Double")]
    Real(f64),
    #[serde(rename = "String")]
    Text(String),
    #[serde(rename = "Boolean[]")]
    BooleanArray(Vec<bool>),
    #[serde(rename = "Integer[]")]
    IntegerArray(Vec<i64>),
    #[serde(rename = "Double[]")]
    RealArray(Vec<f64>),
    #[serde(rename = "String[]")]
    TextArray(Vec<String>),
    #[serde(rename = "Double[][]")]
    RealMatrix(Vec<Vec<f64>>),
    #[serde(rename = "Alignment")]
    Alignment(Alignment),
    #[serde(rename = "TimeTree")]
    Tree(TimeTree),
    #[serde(rename = "Taxa")]
    Taxa(Vec<Taxon>),
}

impl Value {
    /// Concrete class name of this value.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "Boolean",
            Self::Integer(_) => "Integer",
            Self::Real(_) => "Double",
            Self::Text(_) => "String",
            Self::BooleanArray(_) => "Boolean[]",
            Self::IntegerArray(_) => "Integer[]",
            Self::RealArray(_) => "Double[]",
            Self::TextArray(_) => "String[]",
            Self::RealMatrix(_) => "Double[][]",
            Self::Alignment(_) => "Alignment",
            Self::Tree(_) => "TimeTree",
            Self::Taxa(_) => "Taxa",
        }
    }

    /// Number of free dimensions this value contributes when estimated.
    ///
    /// Trees contribute their internal node count.
    /// Values that cannot be estimated contribute nothing.
    pub fn dimension(&self) -> usize {
        match self {
            Self::Boolean(_) | Self::Integer(_) | Self::Real(_) => 1,
            Self::BooleanArray(xs) => xs.len(),
            Self::IntegerArray(xs) => xs.len(),
            Self::RealArray(xs) => xs.len(),
            Self::RealMatrix(rows) => rows.iter().map(Vec::len).sum(),
            Self::Tree(tree) => tree.internal_node_count(),
            Self::Text(_)
            | Self::TextArray(_)
            | Self::Alignment(_)
            | Self::Taxa(_) => 0,
        }
    }

    /// Space-delimited rendering of numeric and boolean values,
    ///   as expected by parameter `value` attributes.
    ///
    /// Matrices are flattened in row-major order.
    /// Returns [`None`] for values that are not parameters.
    pub fn parameter_text(&self) -> Option<String> {
        fn join<T, F: Fn(&T) -> String>(xs: &[T], f: F) -> String {
            xs.iter().map(f).collect::<Vec<_>>().join(" ")
        }

        match self {
            Self::Boolean(x) => Some(x.to_string()),
            Self::Integer(x) => Some(x.to_string()),
            Self::Real(x) => Some(real_text(*x)),
            Self::BooleanArray(xs) => Some(join(xs, bool::to_string)),
            Self::IntegerArray(xs) => Some(join(xs, i64::to_string)),
            Self::RealArray(xs) => Some(join(xs, |x| real_text(*x))),
            Self::RealMatrix(rows) => Some(
                rows.iter()
                    .map(|row| join(row, |x| real_text(*x)))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(x) => Some(*x),
            Self::Integer(x) => Some(*x as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_text_array(&self) -> Option<&[String]> {
        match self {
            Self::TextArray(xs) => Some(xs),
            _ => None,
        }
    }
}

/// Render a real number such that it is always recognizable as one
///   (`1.0` rather than `1`).
pub fn real_text(x: f64) -> String {
    format!("{x:?}")
}

/// A multiple sequence alignment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Alignment {
    /// LPhy sequence type,
    ///   e.g. `nucleotide` or `aminoacid`.
    #[serde(rename = "sequenceType", default = "nucleotide")]
    pub sequence_type: String,
    pub sequences: Vec<Sequence>,
}

fn nucleotide() -> String {
    "nucleotide".into()
}

impl Alignment {
    pub fn taxa_count(&self) -> usize {
        self.sequences.len()
    }

    /// Number of sites,
    ///   taken from the first sequence.
    pub fn site_count(&self) -> usize {
        self.sequences
            .first()
            .map(|seq| seq.data.chars().count())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Sequence {
    pub taxon: String,
    pub data: String,
}

/// A time tree in Newick notation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeTree {
    pub newick: String,
}

impl TimeTree {
    /// Number of leaves of the tree.
    ///
    /// A leaf begins wherever a label follows an opening parenthesis or a
    ///   comma;
    ///     a tree without parentheses is a single leaf.
    pub fn leaf_count(&self) -> usize {
        let mut prev = None;
        let mut leaves = 0;

        for c in self.newick.chars().filter(|c| !c.is_whitespace()) {
            if c != '(' && matches!(prev, Some('(') | Some(',')) {
                leaves += 1;
            }
            prev = Some(c);
        }

        if self.newick.contains('(') {
            leaves
        } else {
            1
        }
    }

    /// Number of internal nodes of a bifurcating tree,
    ///   never less than one.
    pub fn internal_node_count(&self) -> usize {
        self.leaf_count().saturating_sub(1).max(1)
    }

    /// Labels of the leaves in the order they appear.
    ///
    /// [`None`] if the tree cannot be read.
    pub fn leaf_labels(&self) -> Option<Vec<String>> {
        self.scan().map(|(labels, _)| labels)
    }

    /// Greatest distance from the root to a leaf.
    ///
    /// Missing branch lengths count as zero;
    ///   [`None`] if the tree cannot be read.
    pub fn root_height(&self) -> Option<f64> {
        self.scan().map(|(_, height)| height)
    }

    fn scan(&self) -> Option<(Vec<String>, f64)> {
        let chars = self
            .newick
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<Vec<_>>();

        let until = |mut i: usize, stop: &[char]| {
            while i < chars.len() && !stop.contains(&chars[i]) {
                i += 1;
            }
            i
        };

        let mut labels: Vec<String> = Vec::new();
        let mut root = None;

        // Greatest height beneath each open clade.
        let mut open: Vec<f64> = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '(' => {
                    open.push(0.0);
                    i += 1;
                }
                ',' => i += 1,
                ';' => break,
                c => {
                    let internal = c == ')';
                    let below = if internal {
                        i += 1;
                        open.pop()?
                    } else {
                        0.0
                    };

                    let end = until(i, &[':', ',', ')', '(', ';']);
                    if !internal {
                        labels.push(chars[i..end].iter().collect());
                    }
                    i = end;

                    let mut length = 0.0;
                    if chars.get(i) == Some(&':') {
                        let end = until(i + 1, &[',', ')', ';']);
                        length = chars[i + 1..end]
                            .iter()
                            .collect::<String>()
                            .parse()
                            .ok()?;
                        i = end;
                    }

                    match open.last_mut() {
                        Some(height) => *height = height.max(below + length),
                        None => root = Some(below),
                    }
                }
            }
        }

        match open.is_empty() {
            true => root.map(|height| (labels, height)),
            false => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Taxon {
    pub name: String,
    #[serde(default)]
    pub age: Option<f64>,
}
