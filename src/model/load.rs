// Load model graphs from interchange documents
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

//! Loading of [`Model`]s from interchange documents.
//!
//! The LPhy parser and runtime are not part of this crate.
//! They hand over an already-evaluated model as a JSON document listing
//!   the data block and model block in declaration order:
//!
//! ```
//! use lphybeast::model::load::load_str;
//!
//! let model = load_str(r#"{
//!   "model": [
//!     { "id": "c", "kind": "value", "value": { "type": "Double", "value": 3.0 } },
//!     { "id": "d", "kind": "distribution", "distribution": "Exp",
//!       "params": [ { "name": "mean", "node": "c" } ] },
//!     { "id": "x", "kind": "random", "distribution": "d",
//!       "value": { "type": "Double", "value": 0.5 } }
//!   ]
//! }"#).unwrap();
//!
//! assert_eq!(3, model.len());
//! assert_eq!(Some("x"), model.get(model.lookup("x").unwrap()).name());
//! ```
//!
//! A distribution node names its distribution with the `distribution`
//!   key,
//!     while a random variable uses that same key to reference the id of
//!     its distribution node.
//! References between nodes are by id and may point forward;
//!   they are resolved and validated by [`ModelBuilder::build`].

use super::{Decl, DeclKind, Model, ModelBuilder, ModelError, Value};
use crate::{
    diagnose::{Annotate, AnnotatedSpan, Diagnostic},
    span::Span,
};
use serde::Deserialize;
use std::{
    error::Error,
    fmt::{self, Display},
    io::Read,
};

#[derive(Debug, Deserialize)]
struct Interchange {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    data: Vec<NodeDecl>,
    #[serde(default)]
    model: Vec<NodeDecl>,
    #[serde(default)]
    roots: Vec<String>,
    #[serde(default)]
    outputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct NodeDecl {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    span: Span,
    #[serde(flatten)]
    kind: KindDecl,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum KindDecl {
    Random {
        distribution: String,
        #[serde(default)]
        observed: Option<String>,
        #[serde(default)]
        value: Option<Value>,
    },
    Distribution {
        #[serde(rename = "distribution")]
        name: String,
        #[serde(default)]
        params: Vec<ArgDecl>,
    },
    Function {
        function: String,
        #[serde(default)]
        args: Vec<ArgDecl>,
        #[serde(default)]
        value: Option<Value>,
    },
    Value {
        value: Value,
    },
}

#[derive(Debug, Deserialize)]
struct ArgDecl {
    name: String,
    node: String,
}

impl From<NodeDecl> for Decl {
    fn from(decl: NodeDecl) -> Self {
        let pairs = |args: Vec<ArgDecl>| {
            args.into_iter().map(|arg| (arg.name, arg.node)).collect()
        };

        let (name, kind) = match decl.kind {
            // Random variables are always named in LPhy.
            KindDecl::Random {
                distribution,
                observed,
                value,
            } => (
                decl.name.or_else(|| Some(decl.id.clone())),
                DeclKind::Random {
                    distribution,
                    observed,
                    value,
                },
            ),
            KindDecl::Distribution { name, params } => (
                decl.name,
                DeclKind::Distribution {
                    name,
                    params: pairs(params),
                },
            ),
            KindDecl::Function {
                function,
                args,
                value,
            } => (
                decl.name,
                DeclKind::Function {
                    function,
                    args: pairs(args),
                    value,
                },
            ),
            KindDecl::Value { value } => (decl.name, DeclKind::Value(value)),
        };

        Decl {
            id: decl.id,
            name,
            span: decl.span,
            kind,
        }
    }
}

impl From<Interchange> for ModelBuilder {
    fn from(doc: Interchange) -> Self {
        let mut builder = ModelBuilder::new();

        if let Some(source) = doc.source {
            builder.set_source(source);
        }

        builder.set_data_block(true);
        doc.data.into_iter().for_each(|decl| builder.push(decl.into()));

        builder.set_data_block(false);
        doc.model.into_iter().for_each(|decl| builder.push(decl.into()));

        doc.roots.into_iter().for_each(|id| builder.add_root(id));
        doc.outputs.into_iter().for_each(|id| builder.add_output(id));

        builder
    }
}

/// Load a model from an interchange document held in memory.
pub fn load_str(src: &str) -> Result<Model, LoadError> {
    let doc: Interchange = serde_json::from_str(src)?;
    Ok(ModelBuilder::from(doc).build()?)
}

/// Load a model from an interchange document read from `reader`.
pub fn from_reader<R: Read>(reader: R) -> Result<Model, LoadError> {
    let doc: Interchange = serde_json::from_reader(reader)?;
    Ok(ModelBuilder::from(doc).build()?)
}

/// The interchange document could not be loaded.
#[derive(Debug)]
pub enum LoadError {
    /// The document is not well-formed,
    ///   or does not have the expected shape.
    Json(serde_json::Error),

    /// The document describes a malformed model.
    Model(ModelError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "malformed interchange document: {e}"),
            Self::Model(e) => Display::fmt(e, f),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Model(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<ModelError> for LoadError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl Diagnostic for LoadError {
    fn describe(&self) -> Vec<AnnotatedSpan> {
        match self {
            // The span here is within the interchange document itself,
            //   not the LPhy source.
            Self::Json(e) if e.line() > 0 => {
                vec![Span::new(e.line() as u32, e.column() as u32)
                    .error("while reading this document")]
            }
            Self::Json(_) => vec![],
            Self::Model(e) => e.describe(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::NodeKind;

    const HKY: &str = r#"{
      "source": "hky.lphy",
      "data": [
        { "id": "L", "name": "L", "kind": "value",
          "value": { "type": "Integer", "value": 200 } }
      ],
      "model": [
        { "id": "kappa", "kind": "random", "distribution": "kappa.dist",
          "value": { "type": "Double", "value": 2.0 },
          "span": { "line": 3, "column": 1 } },
        { "id": "kappa.dist", "kind": "distribution", "distribution": "LogNormal",
          "params": [ { "name": "meanlog", "node": "m" },
                      { "name": "sdlog", "node": "s" } ] },
        { "id": "Q", "name": "Q", "kind": "function", "function": "hky",
          "args": [ { "name": "kappa", "node": "kappa" } ] },
        { "id": "m", "kind": "value", "value": { "type": "Double", "value": 1 } },
        { "id": "s", "kind": "value", "value": { "type": "Double", "value": 0.5 } }
      ],
      "outputs": [ "Q" ]
    }"#;

    #[test]
    fn loads_blocks_in_declaration_order() {
        let model = load_str(HKY).unwrap();

        assert_eq!(Some("hky.lphy"), model.source());
        assert_eq!(6, model.len());

        let ids = model
            .nodes()
            .map(|node| model.get(node).id())
            .collect::<Vec<_>>();

        assert_eq!(vec!["L", "kappa", "kappa.dist", "Q", "m", "s"], ids);
        assert!(model.in_data_block(model.lookup("L").unwrap()));
        assert_eq!(&[model.lookup("Q").unwrap()], model.outputs());
    }

    #[test]
    fn random_variables_named_after_id() {
        let model = load_str(HKY).unwrap();
        let kappa = model.get(model.lookup("kappa").unwrap());

        assert_eq!(Some("kappa"), kappa.name());
        assert_eq!(Span::new(3, 1), kappa.span());

        // Anonymous values stay anonymous.
        assert_eq!(None, model.get(model.lookup("m").unwrap()).name());
    }

    #[test]
    fn integral_json_numbers_accepted_as_reals() {
        let model = load_str(HKY).unwrap();
        let m = model.get(model.lookup("m").unwrap());

        assert_eq!(&NodeKind::DataValue(Value::Real(1.0)), m.kind());
    }

    #[test]
    fn loads_from_reader() {
        let model = from_reader(HKY.as_bytes()).unwrap();
        assert_eq!(6, model.len());
    }

    #[test]
    fn unknown_value_type_is_json_error() {
        let src = r#"{ "model": [
          { "id": "x", "kind": "value", "value": { "type": "Quaternion", "value": 1 } }
        ] }"#;

        assert!(matches!(load_str(src), Err(LoadError::Json(_))));
    }

    #[test]
    fn unknown_node_kind_is_json_error() {
        let src = r#"{ "model": [ { "id": "x", "kind": "mystery" } ] }"#;
        let err = load_str(src).unwrap_err();

        assert!(matches!(err, LoadError::Json(_)));
        assert_eq!(1, err.describe().len());
    }

    #[test]
    fn structural_errors_surface_as_model_errors() {
        let src = r#"{ "model": [
          { "id": "x", "kind": "random", "distribution": "nowhere" }
        ] }"#;

        assert!(matches!(
            load_str(src),
            Err(LoadError::Model(ModelError::DanglingRef { .. }))
        ));
    }
}
