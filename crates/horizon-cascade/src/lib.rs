//! Streaming, plugin-driven CSS parser, AST library and code generator.
//!
//! Parsing happens in two phases. The raw pass splits the source into
//! coarse units (rules, selectors, declarations, at-rules) carrying
//! verbatim fragments, broadcasting each unit to the registered plugins as
//! it completes. Refinement is the on-demand second pass that validates a
//! unit's grammar into typed sub-trees, either eagerly through
//! [`plugin::AutoRefine`] or lazily when a plugin asks for it. The writer
//! serializes the assembled tree back to CSS in one of three modes.
//!
//! # Example
//!
//! ```
//! use horizon_cascade::writer::StyleWriter;
//!
//! let processed = horizon_cascade::source(".a { color: red }").process()?;
//! let css = processed.write(&StyleWriter::compressed());
//! assert_eq!(css, ".a{color:red}");
//! # Ok::<(), horizon_cascade::Error>(())
//! ```
//!
//! With plugins and refinement:
//!
//! ```
//! use horizon_cascade::plugin::AutoRefine;
//! use horizon_cascade::writer::StyleWriter;
//!
//! let processed = horizon_cascade::source("p { margin: 10px 20px }")
//!     .add(AutoRefine::all())
//!     .process()?;
//! let css = processed.write(&StyleWriter::verbose());
//! assert_eq!(css, "p {\n  margin: 10px 20px;\n}");
//! # Ok::<(), horizon_cascade::Error>(())
//! ```
//!
//! This library is not thread-safe by design: one document is processed by
//! one engine on one thread. Independent documents may be processed
//! concurrently with independent engines.

pub mod ast;
pub mod broadcast;
pub mod data;
mod error;
mod parser;
pub mod plugin;
pub mod refine;
pub mod source;
pub mod tree;
pub mod writer;

pub use error::{
    CollectingErrorManager, Error, ErrorKind, ErrorManager, ParseError, Result,
    ThrowingErrorManager,
};

use std::any::TypeId;
use std::collections::HashMap;

use plugin::emitter::Engine;
use plugin::{Plugin, TreeBuilder};
use tree::{NodeId, SyntaxTree};
use writer::StyleWriter;

/// Commonly used types.
pub mod prelude {
    pub use crate::ast::UnitKind;
    pub use crate::data::{Browser, Prefix, SupportMatrix};
    pub use crate::plugin::{
        AutoRefine, Phase, Plugin, PluginContext, Prefixer, Registrar, Requirement,
        Subscriptions, TreeBuilder,
    };
    pub use crate::tree::{NodeId, Slot, Status, SyntaxTree};
    pub use crate::writer::{StyleWriter, WriterMode};
    pub use crate::{source, CollectingErrorManager, Error, ErrorKind, ParseError, Processed,
        Request, Result};
}

/// Starts a processing request for the given CSS source.
pub fn source(css: impl Into<String>) -> Request {
    Request::new(css.into())
}

/// A builder coupling a source document with plugins and an error manager.
///
/// The built-in tree-assembly subscriber is always registered first.
/// Calling [`Request::process`] parses the document, delivering every unit
/// to the registered plugins, and returns the assembled stylesheet.
pub struct Request {
    source: String,
    engine: Engine,
}

impl Request {
    fn new(source: String) -> Self {
        let mut engine = Engine::new(Box::new(ThrowingErrorManager));
        engine.add_boxed(Box::new(TreeBuilder::default()));
        Self { source, engine }
    }

    /// Registers a plugin. Registration order is delivery order; a second
    /// plugin of an already-registered type is ignored.
    pub fn add<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.engine.add_boxed(Box::new(plugin));
        self
    }

    /// Replaces the error manager. The default aborts on the first error.
    pub fn error_manager(mut self, manager: impl ErrorManager + 'static) -> Self {
        self.engine.set_error_manager(Box::new(manager));
        self
    }

    /// Processes the document: parses, broadcasts, runs plugin hooks, and
    /// returns the stylesheet together with any collected errors.
    pub fn process(mut self) -> Result<Processed> {
        let mut tree = SyntaxTree::new();
        self.engine.run_before_hooks(&mut tree)?;

        let mut src = source::Source::new(&self.source);
        parser::raw::parse_stylesheet(&mut src, &mut tree, &mut self.engine)?;

        self.engine.run_after_hooks(&mut tree)?;

        let stylesheet = self
            .engine
            .plugin::<TreeBuilder>()
            .and_then(TreeBuilder::stylesheet)
            .expect("the tree builder is always registered");
        let errors = self.engine.take_errors();
        let (plugins, by_type) = self.engine.into_parts();

        Ok(Processed { tree, stylesheet, plugins, by_type, errors })
    }
}

/// The outcome of [`Request::process`].
pub struct Processed {
    tree: SyntaxTree,
    stylesheet: NodeId,
    plugins: Vec<Box<dyn Plugin>>,
    by_type: HashMap<TypeId, usize>,
    errors: Vec<ParseError>,
}

impl Processed {
    /// The document tree.
    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// Mutable access to the document tree.
    pub fn tree_mut(&mut self) -> &mut SyntaxTree {
        &mut self.tree
    }

    /// The stylesheet root.
    pub fn stylesheet(&self) -> NodeId {
        self.stylesheet
    }

    /// Errors recorded by a collecting error manager, in order.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Typed access to a registered plugin, for retrieving plugin state
    /// after processing.
    pub fn plugin<P: Plugin + 'static>(&self) -> Option<&P> {
        let index = *self.by_type.get(&TypeId::of::<P>())?;
        self.plugins[index].as_any().downcast_ref()
    }

    /// Serializes the stylesheet with the given writer.
    pub fn write(&self, writer: &StyleWriter) -> String {
        writer.write(&self.tree, self.stylesheet)
    }
}
