// Test translation engine
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

use super::*;
use crate::{
    config::Mc3Config,
    ext::{load_extensions, Catalog, Contributions, Extension, ExtensionError},
    gen::{AttrValue, Child, Element, GeneratorKey, Roles, Section},
    model::{ModelBuilder, Value},
    span::Span,
    test::{alignment, hky_model, tree},
};

fn builtins() -> Registry {
    Registry::with_builtins()
}

fn with_extensions(catalog: &Catalog) -> Registry {
    let mut registry = builtins();
    let reports = load_extensions(catalog, &mut registry);

    assert!(reports.iter().all(|r| r.is_loaded()));
    registry
}

fn translate_default(model: &Model) -> Result<Document, TranslateError> {
    translate(model, &builtins(), &RunConfig::default())
}

/// Fragment translated from the node with base name `base`,
///   distinguished by `suffix`.
fn find(doc: &Document, base: &str, suffix: Option<&str>) -> FragmentId {
    doc.fragments()
        .iter()
        .position(|frag| match &frag.label {
            IdLabel::Node {
                base: b, suffix: s, ..
            } => b == base && s.as_deref() == suffix,
            IdLabel::Fixed(_) => false,
        })
        .map(FragmentId::new)
        .unwrap_or_else(|| panic!("no fragment {base} {suffix:?}"))
}

fn element(doc: &Document, id: FragmentId) -> &Element<FragmentId> {
    &doc.get(id).fragment.element
}

fn fixed(doc: &Document, name: &'static str) -> FragmentId {
    doc.fragments()
        .iter()
        .position(|frag| frag.label == IdLabel::Fixed(name))
        .map(FragmentId::new)
        .unwrap_or_else(|| panic!("no fragment {name}"))
}

fn attr_ref(el: &Element<FragmentId>, name: &str) -> Option<FragmentId> {
    el.attrs.iter().find_map(|(k, v)| match v {
        AttrValue::Ref(target) if k == name => Some(*target),
        _ => None,
    })
}

fn loggers(doc: &Document) -> Vec<&Element<FragmentId>> {
    doc.sections()
        .get(Section::Loggers)
        .iter()
        .map(|id| element(doc, *id))
        .collect()
}

fn exp_model(name: &str) -> ModelBuilder {
    ModelBuilder::new()
        .constant("c", Value::Real(1.0))
        .distribution("d", "Exp", [("mean", "c")])
        .random(name, "d", Some(Value::Real(0.5)))
}

fn yule_model() -> ModelBuilder {
    ModelBuilder::new()
        .data_block()
        .value("aln", alignment(&["A", "B", "C", "D"]))
        .model_block()
        .constant("lambda", Value::Real(0.1))
        .distribution("d_tree", "Yule", [("lambda", "lambda")])
        .random("tree", "d_tree", Some(tree("((A:1.0,B:1.0):1.0,(C:1.0,D:1.0):1.0);")))
}

#[test]
fn hky_model_sections() {
    let doc = translate_default(&hky_model().build().unwrap()).unwrap();
    let sections = doc.sections();

    assert_eq!(&[find(&doc, "aln", None)], sections.get(Section::Data));
    assert_eq!(&[find(&doc, "kappa", None)], sections.get(Section::Model));
    assert_eq!(
        &[find(&doc, "kappa", Some("scale"))],
        sections.get(Section::Operators),
    );

    // screen and trace
    assert_eq!(2, sections.get(Section::Loggers).len());
    assert_eq!(Some("hky.lphy"), doc.source());
}

#[test]
fn prior_nested_and_referencing_variable_and_rate() {
    let doc = translate_default(&hky_model().build().unwrap()).unwrap();

    let kappa = find(&doc, "kappa", None);
    let prior = find(&doc, "kappa", Some("prior"));
    let frag = &doc.get(prior).fragment;

    assert!(frag.placement.inline);
    assert_eq!(Roles::PRIOR, frag.roles);
    assert_eq!(Some(kappa), attr_ref(&frag.element, "x"));

    let refs = frag.element.refs();
    assert!(refs.contains(&find(&doc, "m", None)));
    assert!(refs.contains(&find(&doc, "s", None)));

    // The substitution model refers to the same state node.
    let subst = find(&doc, "Q", None);
    assert_eq!(Some(kappa), attr_ref(element(&doc, subst), "kappa"));
}

#[test]
fn observed_variable_aliases_its_data() {
    let doc = translate_default(&hky_model().build().unwrap()).unwrap();

    let aln = find(&doc, "aln", None);
    let lik = find(&doc, "D", Some("treeLikelihood"));

    assert_eq!(Some(aln), attr_ref(element(&doc, lik), "data"));

    // Nothing is produced for the observed variable itself.
    assert!(!doc.fragments().iter().any(|frag| matches!(
        &frag.label,
        IdLabel::Node { node, .. } if node == "D"
    )));
}

#[test]
fn shared_parameter_translated_once() {
    let model = ModelBuilder::new()
        .constant("sd", Value::Real(0.5))
        .constant("mm", Value::Real(0.0))
        .distribution("d_mu", "Normal", [("mean", "mm"), ("sd", "sd")])
        .random("mu", "d_mu", Some(Value::Real(0.1)))
        .distribution("d_x", "LogNormal", [("meanlog", "mu"), ("sdlog", "sd")])
        .random("x", "d_x", Some(Value::Real(1.0)))
        .distribution("d_y", "LogNormal", [("meanlog", "mu"), ("sdlog", "sd")])
        .random("y", "d_y", Some(Value::Real(2.0)))
        .build()
        .unwrap();

    let doc = translate_default(&model).unwrap();

    let mu = find(&doc, "mu", None);
    let sd = find(&doc, "sd", None);

    let mu_count = doc
        .fragments()
        .iter()
        .filter(|frag| {
            matches!(&frag.label, IdLabel::Node { base, suffix: None, .. } if base == "mu")
        })
        .count();
    assert_eq!(1, mu_count);

    for var in ["x", "y"] {
        let refs = element(&doc, find(&doc, var, Some("prior"))).refs();

        assert!(refs.contains(&mu), "{var} prior does not reference mu");
        assert!(refs.contains(&sd), "{var} prior does not reference sd");
    }

    assert_eq!(
        &[mu, find(&doc, "x", None), find(&doc, "y", None)],
        doc.sections().get(Section::Model),
    );
}

/// Extension contributing a distribution core LPhy does not provide.
struct Pareto;

impl Extension for Pareto {
    fn name(&self) -> &str {
        "pareto"
    }

    fn register(&self, contrib: &mut Contributions) -> Result<(), ExtensionError> {
        contrib.generator_fn(GeneratorKey::distribution("Pareto"), "Pareto", |_, ctx| {
            let x = ctx.reference("variate", ctx.variate()?)?;

            let mut gen = Generated::none();
            gen.push_primary(
                Fragment::new(
                    Element::spec("distribution", "Prior")
                        .attr_ref("x", x)
                        .child(Element::spec("distr", "beast.math.distributions.Pareto")),
                )
                .suffix("prior")
                .roles(Roles::PRIOR),
            );

            Ok(gen)
        });

        Ok(())
    }
}

fn pareto() -> Result<Box<dyn Extension>, ExtensionError> {
    Ok(Box::new(Pareto))
}

fn pareto_model() -> Model {
    ModelBuilder::new()
        .distribution("d", "Pareto", [] as [(&str, &str); 0])
        .at(3, 6)
        .random("x", "d", Some(Value::Real(1.0)))
        .build()
        .unwrap()
}

#[test]
fn extension_distribution_translated_when_loaded() {
    let registry = with_extensions(&Catalog::new().with("pareto", pareto));
    let doc = translate(&pareto_model(), &registry, &RunConfig::default()).unwrap();

    let prior = find(&doc, "x", Some("prior"));
    assert_eq!(
        Some("beast.math.distributions.Pareto"),
        match element(&doc, prior).children.first() {
            Some(Child::Element(distr)) => distr.attr_text("spec"),
            _ => None,
        }
    );
}

#[test]
fn extension_distribution_unsupported_without_extension() {
    match translate_default(&pareto_model()) {
        Err(TranslateError::Unsupported(UnsupportedConstruct { node })) => {
            assert_eq!("d", node.id);
            assert_eq!(Some("Pareto".into()), node.class);
            assert_eq!(Span::new(3, 6), node.span);
        }
        other => panic!("expected unsupported construct: {other:?}"),
    }
}

fn mascot_model() -> Model {
    ModelBuilder::new()
        .constant("Theta", Value::RealArray(vec![1.0, 2.0]))
        .constant("mig", Value::RealArray(vec![0.1, 0.2]))
        .function(
            "M",
            "migrationMatrix",
            [("theta", "Theta"), ("m", "mig")],
            Some(Value::RealMatrix(vec![vec![1.0, 0.1], vec![0.2, 2.0]])),
        )
        .constant("taxa", Value::TextArray(vec!["A".into(), "B".into(), "C".into()]))
        .constant("demes", Value::TextArray(vec!["x".into(), "y".into(), "y".into()]))
        .distribution(
            "d_psi",
            "StructuredCoalescent",
            [("M", "M"), ("taxa", "taxa"), ("demes", "demes")],
        )
        .random("ψ", "d_psi", Some(tree("((A:1.0,B:1.0):1.0,C:2.0);")))
        .build()
        .unwrap()
}

#[test]
fn mascot_translated_with_extension() {
    let registry = with_extensions(&Catalog::builtin());
    let doc = translate(&mascot_model(), &registry, &RunConfig::default()).unwrap();

    let psi = find(&doc, "ψ", None);
    let prior = find(&doc, "ψ", Some("prior"));
    let el = element(&doc, prior);

    assert_eq!(Some("mascot.distribution.Mascot"), el.attr_text("spec"));
    assert_eq!(Some(psi), attr_ref(el, "tree"));
    assert!(el.refs().contains(&find(&doc, "Theta", None)));
    assert_eq!(&[psi], doc.sections().get(Section::Model));
}

#[test]
fn mascot_unsupported_without_extension() {
    assert!(matches!(
        translate_default(&mascot_model()),
        Err(TranslateError::Unsupported(_)),
    ));
}

#[test]
fn fragments_refer_only_to_earlier_fragments() {
    let doc = translate_default(&hky_model().build().unwrap()).unwrap();

    for (i, frag) in doc.fragments().iter().enumerate() {
        for target in frag.fragment.element.refs() {
            assert!(
                target.index() < i,
                "fragment {i} refers forward to {}",
                target.index()
            );
        }
    }
}

#[test]
fn translation_is_deterministic() {
    let first = translate_default(&hky_model().build().unwrap()).unwrap();
    let second = translate_default(&hky_model().build().unwrap()).unwrap();

    assert_eq!(first.fragments(), second.fragments());
    assert_eq!(first.sections(), second.sections());
}

fn gamma_site_rates_model() -> Model {
    ModelBuilder::new()
        .data_block()
        .value("aln", alignment(&["A", "B", "C", "D"]))
        .model_block()
        .function("Q", "jukesCantor", [] as [(&str, &str); 0], None)
        .value("tree", tree("((A:1.0,B:1.0):1.0,(C:1.0,D:1.0):1.0);"))
        .constant("c", Value::Real(1.0))
        .distribution("d_shape", "Exp", [("mean", "c")])
        .random("shape", "d_shape", Some(Value::Real(0.5)))
        .constant("ncat", Value::Integer(4))
        .distribution(
            "d_rates",
            "DiscretizedGamma",
            [("shape", "shape"), ("ncat", "ncat")],
        )
        .random("rates", "d_rates", Some(Value::RealArray(vec![1.0; 10])))
        .distribution(
            "d_D",
            "PhyloCTMC",
            [("tree", "tree"), ("Q", "Q"), ("siteRates", "rates")],
        )
        .observed("D", "d_D", "aln")
        .build()
        .unwrap()
}

#[test]
fn site_rates_absorbed_into_site_model() {
    let doc = translate_default(&gamma_site_rates_model()).unwrap();

    // Only the gamma shape is estimated.
    assert_eq!(
        vec![find(&doc, "shape", None)],
        element(&doc, fixed(&doc, "state")).refs()
    );

    assert!(doc.fragments().iter().all(|frag| match &frag.label {
        IdLabel::Node { base, .. } => base != "rates",
        IdLabel::Fixed(_) => true,
    }));
}

#[test]
fn unreachable_nodes_dropped() {
    let model = hky_model()
        .constant("unused", Value::Real(3.0))
        .distribution("d_z", "Exp", [("mean", "unused")])
        .random("z", "d_z", Some(Value::Real(1.0)))
        .root("D")
        .build()
        .unwrap();

    let doc = translate_default(&model).unwrap();

    assert!(!doc.fragments().iter().any(|frag| matches!(
        &frag.label,
        IdLabel::Node { node, .. } if ["z", "d_z", "unused"].contains(&node.as_str())
    )));
    assert_eq!(
        &[find(&doc, "kappa", None)],
        doc.sections().get(Section::Model)
    );
}

#[test]
fn cycle_is_model_error() {
    let model = exp_model("x")
        .function("f", "exp", [("x", "g")], None)
        .at(1, 1)
        .function("g", "log", [("x", "f")], None)
        .build()
        .unwrap();

    assert!(matches!(
        translate_default(&model),
        Err(TranslateError::Model(ModelError::Cycle { id, .. })) if id == "f",
    ));
}

#[test]
fn generator_failure_aborts_naming_node() {
    let model = ModelBuilder::new()
        .constant("c", Value::Real(1.0))
        .distribution("d", "Gamma", [("shape", "c")])
        .at(4, 2)
        .random("x", "d", Some(Value::Real(1.0)))
        .build()
        .unwrap();

    match translate_default(&model) {
        Err(TranslateError::Generator {
            node,
            generator,
            err,
        }) => {
            assert_eq!("d", node.id);
            assert_eq!(Span::new(4, 2), node.span);
            assert_eq!("Gamma", generator);
            assert_eq!(GenError::MissingParam("scale".into()), err);
        }
        other => panic!("expected generator error: {other:?}"),
    }
}

#[test]
fn generator_error_describes_node() {
    let model = exp_model("x").build().unwrap();
    let err = TranslateError::Generator {
        node: model.get(model.lookup("d").unwrap()).describe(),
        generator: "Exp".into(),
        err: GenError::MissingValue,
    };

    let desc = err.describe();
    assert_eq!(2, desc.len());
    assert!(err.to_string().starts_with("cannot translate "));
}

#[test]
fn model_without_latent_variables_has_no_state() {
    let model = ModelBuilder::new()
        .data_block()
        .value("aln", alignment(&["A", "B"]))
        .model_block()
        .constant("c", Value::Real(1.0))
        .build()
        .unwrap();

    assert!(matches!(translate_default(&model), Err(TranslateError::NoState)));
}

#[test]
fn distribution_without_variate_skipped() {
    let model = exp_model("x")
        .distribution("d_orphan", "Gamma", [("shape", "c")])
        .build()
        .unwrap();

    // Gamma without a scale would fail if it were translated.
    let doc = translate_default(&model).unwrap();

    assert!(!doc.fragments().iter().any(|frag| matches!(
        &frag.label,
        IdLabel::Node { node, .. } if node == "d_orphan"
    )));
}

#[test]
fn invalid_config_rejected_before_translation() {
    let config = RunConfig {
        chain_length: 100,
        ..Default::default()
    };

    assert!(matches!(
        translate(&exp_model("x").build().unwrap(), &builtins(), &config),
        Err(TranslateError::Config(ConfigError::ChainTooShort(100))),
    ));
}

#[test]
fn screen_log_frequency_saturates() {
    let config = RunConfig {
        chain_length: u64::MAX,
        log_every: Some(u64::MAX / 10),
        ..Default::default()
    };

    let doc = translate(&hky_model().build().unwrap(), &builtins(), &config)
        .unwrap();

    let screen = &doc.get(fixed(&doc, "ScreenLogger")).fragment.element;
    let trace = &doc.get(fixed(&doc, "Logger")).fragment.element;

    assert_eq!(Some(u64::MAX.to_string().as_str()), screen.attr_text("logEvery"));
    assert_eq!(
        Some((u64::MAX / 10).to_string().as_str()),
        trace.attr_text("logEvery")
    );
}

#[test]
fn run_holds_state_and_posterior() {
    let doc = translate_default(&hky_model().build().unwrap()).unwrap();

    let run = doc.get(doc.run());
    assert_eq!(IdLabel::Fixed("mcmc"), run.label);
    assert!(run.fragment.placement.inline);

    let el = &run.fragment.element;
    assert_eq!(Some("MCMC"), el.attr_text("spec"));
    assert_eq!(Some("1000000"), el.attr_text("chainLength"));
    assert_eq!(Some("10"), el.attr_text("preBurnin"));
    assert_eq!(None, el.attr_text("sampleFromPrior"));
    assert_eq!(vec![fixed(&doc, "state"), fixed(&doc, "posterior")], el.refs());

    assert_eq!(
        vec![find(&doc, "kappa", None)],
        element(&doc, fixed(&doc, "state")).refs()
    );
    assert_eq!(
        vec![fixed(&doc, "prior"), fixed(&doc, "likelihood")],
        element(&doc, fixed(&doc, "posterior")).refs()
    );
    assert_eq!(
        Some("true"),
        element(&doc, fixed(&doc, "likelihood")).attr_text("useThreads")
    );
}

#[test]
fn empty_likelihood_omitted() {
    let doc = translate_default(&exp_model("x").build().unwrap()).unwrap();

    assert_eq!(
        vec![fixed(&doc, "prior")],
        element(&doc, fixed(&doc, "posterior")).refs()
    );
    assert!(!doc
        .fragments()
        .iter()
        .any(|frag| frag.label == IdLabel::Fixed("likelihood")));
}

#[test]
fn trace_logs_summary_and_logged_fragments() {
    let doc = translate_default(&hky_model().build().unwrap()).unwrap();
    let loggers = loggers(&doc);

    let screen = loggers[0];
    assert_eq!(None, screen.attr_text("fileName"));
    assert_eq!(Some("50000"), screen.attr_text("logEvery"));

    let trace = loggers[1];
    assert_eq!(Some("lphybeast.log"), trace.attr_text("fileName"));
    assert_eq!(Some("500"), trace.attr_text("logEvery"));
    assert_eq!(
        vec![
            fixed(&doc, "posterior"),
            fixed(&doc, "likelihood"),
            fixed(&doc, "prior"),
            find(&doc, "kappa", None),
            find(&doc, "D", Some("treeLikelihood")),
        ],
        trace.refs()
    );
}

#[test]
fn run_options_applied() {
    let config = RunConfig {
        chain_length: 20_000,
        log_every: Some(1000),
        pre_burnin: Some(0),
        sample_from_prior: true,
        file_stem: "run1".into(),
        ..Default::default()
    };

    let doc = translate(&exp_model("x").build().unwrap(), &builtins(), &config)
        .unwrap();

    let run = element(&doc, doc.run());
    assert_eq!(Some("20000"), run.attr_text("chainLength"));
    assert_eq!(None, run.attr_text("preBurnin"));
    assert_eq!(Some("true"), run.attr_text("sampleFromPrior"));

    let loggers = loggers(&doc);
    assert_eq!(Some("100000"), loggers[0].attr_text("logEvery"));
    assert_eq!(Some("1000"), loggers[1].attr_text("logEvery"));
    assert_eq!(Some("run1.log"), loggers[1].attr_text("fileName"));
}

#[test]
fn coupled_mcmc_run() {
    let config = RunConfig {
        mc3: Some(Mc3Config::with_chains(4)),
        ..Default::default()
    };

    let doc = translate(&exp_model("x").build().unwrap(), &builtins(), &config)
        .unwrap();

    let run = doc.get(doc.run());
    assert_eq!(IdLabel::Fixed("mcmcmc"), run.label);

    let el = &run.fragment.element;
    assert_eq!(Some("beast.coupledMCMC.CoupledMCMC"), el.attr_text("spec"));
    assert_eq!(Some("4"), el.attr_text("chains"));
    assert_eq!(Some("0.1"), el.attr_text("deltaTemperature"));
    assert_eq!(Some("1000"), el.attr_text("resampleEvery"));
    assert_eq!(Some("0.234"), el.attr_text("target"));
}

#[test]
fn random_tree_logged_to_tree_file() {
    let doc = translate_default(&yule_model().build().unwrap()).unwrap();

    let tree = find(&doc, "tree", None);
    let stat = find(&doc, "tree", Some("treeStat"));
    let loggers = loggers(&doc);

    assert_eq!(3, loggers.len());
    assert!(loggers[1].refs().contains(&stat));
    assert_eq!(Some(tree), attr_ref(element(&doc, stat), "tree"));

    let trees = loggers[2];
    assert_eq!(Some("tree"), trees.attr_text("mode"));
    assert_eq!(Some("lphybeast.trees"), trees.attr_text("fileName"));
    assert_eq!(vec![tree], trees.refs());
}

#[test]
fn several_trees_logged_to_separate_files() {
    let model = yule_model()
        .distribution("d_tree2", "Yule", [("lambda", "lambda")])
        .random("tree2", "d_tree2", Some(tree("((A:2.0,C:2.0):1.0,(B:1.0,D:1.0):2.0);")))
        .build()
        .unwrap();

    let doc = translate_default(&model).unwrap();

    let files = loggers(&doc)
        .iter()
        .filter_map(|el| el.attr_text("fileName"))
        .collect::<Vec<_>>();

    assert_eq!(
        vec!["lphybeast.log", "lphybeast.tree.trees", "lphybeast.tree2.trees"],
        files
    );
}

#[test]
fn id_label_derivation() {
    let label = IdLabel::Node {
        base: "tree".into(),
        node: "t".into(),
        suffix: Some("prior".into()),
    };

    assert_eq!(
        IdLabel::Node {
            base: "tree".into(),
            node: "t".into(),
            suffix: Some("treeStat".into()),
        },
        label.derive("treeStat"),
    );

    assert_eq!(
        IdLabel::Node {
            base: "posterior".into(),
            node: "posterior".into(),
            suffix: Some("x".into()),
        },
        IdLabel::Fixed("posterior").derive("x"),
    );
}
