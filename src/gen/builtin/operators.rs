// Default MCMC operators for state nodes
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

//! Default proposal operators for state nodes.
//!
//! Every latent random variable needs at least one operator,
//!   or the chain will never move it.
//! The distribution generating a variable knows its support,
//!   and so chooses the operator.
//!
//! Operator weights grow sub-linearly with the dimension of the state
//!   node:
//!     `dimension^0.7`,
//!     or `dimension^0.2` for the expensive topology moves.

use crate::{
    gen::{Element, Fragment, FragmentRef, Placement},
    global::{OPERATOR_WEIGHT_POW, OPERATOR_WEIGHT_POW_LOW},
    model::real_text,
};

/// Support of a distribution over parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    /// Positive reals.
    Positive,
    /// The real line or a bounded interval of it.
    Real,
    /// Non-negative reals summing to one.
    Simplex,
    Integer,
    Boolean,
}

const SCALE_FACTOR: &str = "0.75";

const DISTANCE_WINDOW: &str = "0.1";

/// Weight of an operator on a state node of `dimension` free dimensions.
pub fn weight(dimension: usize) -> f64 {
    (dimension.max(1) as f64).powf(OPERATOR_WEIGHT_POW)
}

fn low_weight(dimension: usize) -> f64 {
    (dimension.max(1) as f64).powf(OPERATOR_WEIGHT_POW_LOW)
}

fn operator(suffix: &str, el: Element, weight: f64) -> Fragment {
    Fragment::new(el.attr("weight", real_text(weight)))
        .suffix(suffix)
        .placement(Placement::OPERATORS)
}

/// Operator for the parameter `param` drawn from a distribution with the
///   given support.
pub fn parameter_operator(
    param: FragmentRef,
    support: Support,
    dimension: usize,
) -> Fragment {
    let el = |spec: &str| Element::spec("operator", spec).attr_ref("parameter", param);

    match support {
        Support::Positive => operator(
            "scale",
            el("kernel.BactrianScaleOperator").attr("scaleFactor", SCALE_FACTOR),
            weight(dimension),
        ),
        Support::Real => operator(
            "randomWalk",
            el("kernel.BactrianRandomWalkOperator"),
            weight(dimension),
        ),
        Support::Simplex => operator(
            "deltaExchange",
            el("kernel.BactrianDeltaExchangeOperator")
                .attr("delta", real_text(1.0 / dimension.max(1) as f64)),
            weight(dimension.saturating_sub(1)),
        ),
        Support::Integer => operator(
            "randomWalk",
            el("IntRandomWalkOperator").attr("windowSize", "1"),
            weight(dimension),
        ),
        Support::Boolean => {
            operator("bitFlip", el("BitFlipOperator"), weight(dimension))
        }
    }
}

/// The standard set of operators on a time tree with `internal_nodes`
///   internal nodes.
pub fn tree_operators(tree: FragmentRef, internal_nodes: usize) -> Vec<Fragment> {
    let el = |spec: &str| Element::spec("operator", spec).attr_ref("tree", tree);
    let n = internal_nodes;

    vec![
        operator(
            "scale",
            el("kernel.BactrianScaleOperator").attr("scaleFactor", SCALE_FACTOR),
            weight(n),
        ),
        operator(
            "rootAgeScale",
            el("kernel.BactrianScaleOperator")
                .attr("scaleFactor", SCALE_FACTOR)
                .attr("rootOnly", "true"),
            1.0,
        ),
        operator("uniform", el("kernel.BactrianNodeOperator"), weight(n)),
        operator("subtreeSlide", el("kernel.BactrianSubtreeSlide"), weight(n)),
        operator(
            "narrowExchange",
            el("Exchange").attr("isNarrow", "true"),
            weight(n),
        ),
        operator(
            "wideExchange",
            el("Exchange").attr("isNarrow", "false"),
            low_weight(n),
        ),
        operator("wilsonBalding", el("WilsonBalding"), low_weight(n)),
    ]
}

/// [`tree_operators`] less those moving the root,
///   for a tree whose root age is fixed.
pub fn fixed_root_tree_operators(
    tree: FragmentRef,
    internal_nodes: usize,
) -> Vec<Fragment> {
    tree_operators(tree, internal_nodes)
        .into_iter()
        .filter(|op| {
            !matches!(op.suffix.as_deref(), Some("scale" | "rootAgeScale"))
        })
        .collect()
}

/// Operators moving the branch `rates` of a relaxed `clock` jointly with
///   the node heights of `tree`,
///     keeping branch distances constant.
///
/// Node height windows are a tenth of `root_height`.
pub fn relaxed_clock_operators(
    clock: FragmentRef,
    tree: FragmentRef,
    rates: FragmentRef,
    root_height: f64,
    nodes: usize,
) -> Vec<Fragment> {
    let twindow = real_text(root_height / 10.0);
    let el = |spec: &str| {
        Element::spec("operator", spec)
            .attr_ref("tree", tree)
            .attr_ref("rates", rates)
    };

    vec![
        operator(
            "inConstantDistanceOperator",
            el("consoperators.InConstantDistanceOperator")
                .attr_ref("clockModel", clock)
                .attr("twindowSize", twindow.clone()),
            weight(nodes),
        ),
        operator(
            "simpleDistance",
            el("consoperators.SimpleDistance")
                .attr_ref("clockModel", clock)
                .attr("twindowSize", twindow.clone()),
            weight(2),
        ),
        operator(
            "bigPulley",
            el("consoperators.BigPulley")
                .attr("twindowSize", twindow)
                .attr("dwindowSize", DISTANCE_WINDOW),
            weight(2),
        ),
        operator(
            "smallPulley",
            el("consoperators.SmallPulley")
                .attr_ref("clockModel", clock)
                .attr("dwindowSize", DISTANCE_WINDOW),
            weight(2),
        ),
    ]
}

/// Operator scaling `up` and `down` in opposite directions,
///   such as a clock rate against the tree it applies to.
pub fn up_down_operator(up: FragmentRef, down: FragmentRef) -> Fragment {
    operator(
        "upDown",
        Element::spec("operator", "kernel.BactrianUpDownOperator")
            .attr("scaleFactor", SCALE_FACTOR)
            .child_ref("up", up)
            .child_ref("down", down),
        weight(1),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gen::Section;

    const X: FragmentRef = FragmentRef::Local(7);

    #[test]
    fn weight_grows_sublinearly() {
        assert_eq!(1.0, weight(1));
        assert_eq!(1.0, weight(0));
        assert!(weight(10) > 1.0 && weight(10) < 10.0);
        assert!(low_weight(10) < weight(10));
    }

    #[test]
    fn positive_support_scales() {
        let op = parameter_operator(X, Support::Positive, 1);

        assert_eq!(Some("scale".into()), op.suffix);
        assert_eq!(Section::Operators, op.placement.section);
        assert!(!op.placement.inline);
        assert_eq!(
            Some("kernel.BactrianScaleOperator"),
            op.element.attr_text("spec")
        );
        assert_eq!(Some("1.0"), op.element.attr_text("weight"));
        assert_eq!(vec![X], op.element.refs());
    }

    #[test]
    fn simplex_exchanges_with_reduced_weight() {
        let op = parameter_operator(X, Support::Simplex, 4);

        assert_eq!(Some("deltaExchange".into()), op.suffix);
        assert_eq!(Some("0.25"), op.element.attr_text("delta"));
        assert_eq!(
            Some(real_text(weight(3)).as_str()),
            op.element.attr_text("weight")
        );
    }

    #[test]
    fn integer_and_boolean_operators() {
        let int = parameter_operator(X, Support::Integer, 2);
        assert_eq!(Some("IntRandomWalkOperator"), int.element.attr_text("spec"));
        assert_eq!(Some("1"), int.element.attr_text("windowSize"));

        let flip = parameter_operator(X, Support::Boolean, 2);
        assert_eq!(Some("bitFlip".into()), flip.suffix);
    }

    #[test]
    fn tree_operator_set() {
        let ops = tree_operators(X, 3);

        let suffixes = ops
            .iter()
            .map(|op| op.suffix.clone().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(
            vec![
                "scale",
                "rootAgeScale",
                "uniform",
                "subtreeSlide",
                "narrowExchange",
                "wideExchange",
                "wilsonBalding",
            ],
            suffixes,
        );

        assert!(ops.iter().all(|op| op.element.refs() == vec![X]));
        assert_eq!(Some("1.0"), ops[1].element.attr_text("weight"));
        assert_eq!(
            Some(real_text(low_weight(3)).as_str()),
            ops[5].element.attr_text("weight")
        );
    }

    #[test]
    fn fixed_root_leaves_heights_of_root_alone() {
        let suffixes = fixed_root_tree_operators(X, 3)
            .iter()
            .map(|op| op.suffix.clone().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(
            vec![
                "uniform",
                "subtreeSlide",
                "narrowExchange",
                "wideExchange",
                "wilsonBalding",
            ],
            suffixes,
        );
    }

    #[test]
    fn relaxed_clock_operator_windows() {
        const CLOCK: FragmentRef = FragmentRef::Local(1);
        const TREE: FragmentRef = FragmentRef::Local(2);

        let ops = relaxed_clock_operators(CLOCK, TREE, X, 5.0, 5);

        assert_eq!(4, ops.len());
        assert!(ops.iter().all(|op| op.placement.section == Section::Operators));

        assert_eq!(
            Some("consoperators.InConstantDistanceOperator"),
            ops[0].element.attr_text("spec")
        );
        assert_eq!(Some("0.5"), ops[0].element.attr_text("twindowSize"));
        assert_eq!(
            Some(real_text(weight(5)).as_str()),
            ops[0].element.attr_text("weight")
        );

        // The big pulley moves rates and heights without the clock.
        assert!(!ops[2].element.refs().contains(&CLOCK));
        assert_eq!(Some("0.1"), ops[2].element.attr_text("dwindowSize"));
        assert_eq!(None, ops[3].element.attr_text("twindowSize"));
    }
}
