// Test extension loading
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
    gen::Generated,
    model::{LogicalType, ModelBuilder, Value},
};

struct Failing;

impl Extension for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn register(&self, contrib: &mut Contributions) -> Result<(), ExtensionError> {
        contrib.generator_fn(GeneratorKey::distribution("Cauchy"), "cauchy", |_, _| {
            Ok(Generated::none())
        });

        Err(ExtensionError::Failed("missing dependency".into()))
    }
}

fn failing() -> Result<Box<dyn Extension>, ExtensionError> {
    Ok(Box::new(Failing))
}

fn panicking() -> Result<Box<dyn Extension>, ExtensionError> {
    panic!("extension exploded")
}

fn refusing() -> Result<Box<dyn Extension>, ExtensionError> {
    Err(ExtensionError::Failed("unsupported platform".into()))
}

/// Extension overriding the LogNormal prior with a generator named after
///   itself.
struct Override(&'static str);

impl Extension for Override {
    fn name(&self) -> &str {
        self.0
    }

    fn register(&self, contrib: &mut Contributions) -> Result<(), ExtensionError> {
        let name = self.0;

        contrib.generator_fn(GeneratorKey::distribution("LogNormal"), name, |_, _| {
            Ok(Generated::none())
        });

        Ok(())
    }
}

fn override_a() -> Result<Box<dyn Extension>, ExtensionError> {
    Ok(Box::new(Override("override-a")))
}

fn override_b() -> Result<Box<dyn Extension>, ExtensionError> {
    Ok(Box::new(Override("override-b")))
}

fn lognormal_generator(registry: &Registry) -> String {
    let model = ModelBuilder::new()
        .constant("m", Value::Real(0.0))
        .constant("s", Value::Real(1.0))
        .distribution("d", "LogNormal", [("meanlog", "m"), ("sdlog", "s")])
        .random("x", "d", Some(Value::Real(1.0)))
        .build()
        .unwrap();

    let d = model.get(model.lookup("d").unwrap());
    registry.resolve(d).unwrap().name().to_string()
}

#[test]
fn builtin_catalog_loads_mascot() {
    let mut registry = Registry::with_builtins();
    let reports = load_extensions(&Catalog::builtin(), &mut registry);

    assert_eq!(1, reports.len());
    assert_eq!(mascot::NAME, reports[0].name);
    assert!(reports[0].is_loaded());
    assert_eq!(
        vec![
            GeneratorKey::distribution("StructuredCoalescent"),
            GeneratorKey::function("migrationMatrix"),
        ],
        reports[0].keys,
    );

    assert_eq!(
        Some("Mascot"),
        registry
            .lookup(&GeneratorKey::distribution("StructuredCoalescent"))
            .map(|gen| gen.name()),
    );
}

#[test]
fn panicking_extension_does_not_prevent_others() {
    let catalog = Catalog::new()
        .with("exploding", panicking)
        .with(mascot::NAME, mascot::extension);

    let mut registry = Registry::with_builtins();
    let reports = load_extensions(&catalog, &mut registry);

    assert_eq!(2, reports.len());

    assert!(!reports[0].is_loaded());
    assert!(reports[0].keys.is_empty());
    assert_eq!(
        vec![ExtensionLoadWarning {
            extension: "exploding".into(),
            cause: ExtensionError::Panicked("extension exploded".into()),
        }],
        reports[0].warnings,
    );

    assert!(reports[1].is_loaded());
    assert!(registry
        .lookup(&GeneratorKey::distribution("StructuredCoalescent"))
        .is_some());
}

#[test]
fn failed_registration_discards_staged_generators() {
    let mut registry = Registry::with_builtins();
    let before = registry.len();

    let reports =
        load_extensions(&Catalog::new().with("failing", failing), &mut registry);

    assert_eq!(
        ExtensionError::Failed("missing dependency".into()),
        reports[0].warnings[0].cause,
    );
    assert_eq!(before, registry.len());
    assert!(registry
        .lookup(&GeneratorKey::distribution("Cauchy"))
        .is_none());
}

#[test]
fn constructor_error_is_a_warning() {
    let mut registry = Registry::new();
    let reports =
        load_extensions(&Catalog::new().with("refusing", refusing), &mut registry);

    assert_eq!(
        "extension `refusing` was not loaded: unsupported platform",
        reports[0].warnings[0].to_string(),
    );
    assert!(registry.is_empty());
}

#[test]
fn extension_overrides_builtin() {
    let mut registry = Registry::with_builtins();
    assert_eq!("LogNormal", lognormal_generator(&registry));

    load_extensions(&Catalog::new().with("a", override_a), &mut registry);

    assert_eq!("override-a", lognormal_generator(&registry));
}

#[test]
fn later_extension_overrides_earlier() {
    let mut registry = Registry::with_builtins();
    let catalog = Catalog::new().with("a", override_a).with("b", override_b);

    load_extensions(&catalog, &mut registry);
    assert_eq!("override-b", lognormal_generator(&registry));

    // Reversing catalog order reverses precedence.
    let mut registry = Registry::with_builtins();
    let catalog = Catalog::new().with("b", override_b).with("a", override_a);

    load_extensions(&catalog, &mut registry);
    assert_eq!("override-a", lognormal_generator(&registry));
}

#[test]
fn select_retains_catalog_order() {
    let catalog = Catalog::new()
        .with("a", override_a)
        .with("b", override_b)
        .with(mascot::NAME, mascot::extension)
        .select(&["mascot", "a"])
        .unwrap();

    assert_eq!(vec!["a", "mascot"], catalog.names().collect::<Vec<_>>());
}

#[test]
fn select_rejects_unknown_extension() {
    assert_eq!(
        Some(ExtensionError::Unknown("beastier".into())),
        Catalog::builtin().select(&["beastier"]).err(),
    );
}

#[test]
fn empty_selection_disables_all() {
    let catalog = Catalog::builtin().select::<&str>(&[]).unwrap();
    assert!(catalog.is_empty());

    let mut registry = Registry::with_builtins();
    assert!(load_extensions(&catalog, &mut registry).is_empty());
    assert!(registry
        .lookup(&GeneratorKey::logical(LogicalType::Distribution))
        .is_none());
}
